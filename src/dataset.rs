use std::path::Path;

use chrono::{Datelike, Duration, NaiveDate};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::MAX_REVENUE_MONTHS;
use crate::error::{Result, RetentionError};
use crate::models::{MemberRecord, MemberRiskInput, PaymentRecord};

fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| RetentionError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

    let mut rows = Vec::new();
    for result in reader.deserialize::<T>() {
        let row = result.map_err(|source| RetentionError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        rows.push(row);
    }

    debug!(path = %path.display(), rows = rows.len(), "loaded csv");
    Ok(rows)
}

pub fn load_members(path: &Path) -> Result<Vec<MemberRecord>> {
    read_csv(path)
}

pub fn load_payments(path: &Path) -> Result<Vec<PaymentRecord>> {
    let payments: Vec<PaymentRecord> = read_csv(path)?;
    let skipped = payments.iter().filter(|p| !p.amount.is_finite()).count();
    if skipped > 0 {
        warn!(skipped, "payments with non-finite amounts will count as zero");
    }
    Ok(payments)
}

pub fn is_active(member: &MemberRecord, as_of: NaiveDate) -> bool {
    member.end_date.map_or(true, |end| end >= as_of)
}

pub fn member_risk_input(member: &MemberRecord, as_of: NaiveDate) -> MemberRiskInput {
    let pending_amount = finite_or_zero(member.pending_amount);
    MemberRiskInput {
        id: member.id,
        days_until_expiry: member.end_date.map(|end| (end - as_of).num_days()),
        has_pending_balance: pending_amount > 0.0,
        last_payment_days_ago: member
            .last_payment_date
            .map(|paid| (as_of - paid).num_days()),
        pending_amount,
        total_amount: finite_or_zero(member.total_amount),
    }
}

/// Risk inputs for members still active on `as_of`.
pub fn active_risk_inputs(members: &[MemberRecord], as_of: NaiveDate) -> Vec<MemberRiskInput> {
    members
        .iter()
        .filter(|member| is_active(member, as_of))
        .map(|member| member_risk_input(member, as_of))
        .collect()
}

/// Revenue per calendar month for the `months` months ending with the
/// month of `as_of`, oldest first. Months without payments are zero.
/// The window is capped at `MAX_REVENUE_MONTHS`.
pub fn monthly_revenue(payments: &[PaymentRecord], as_of: NaiveDate, months: usize) -> Vec<f64> {
    let months = months.min(MAX_REVENUE_MONTHS);
    let mut totals = vec![0.0; months];
    if months == 0 {
        return totals;
    }

    let current = month_index(as_of);
    let oldest = current - (months as i64 - 1);

    for payment in payments {
        let index = month_index(payment.paid_on);
        if index < oldest || index > current || payment.paid_on > as_of {
            continue;
        }
        totals[(index - oldest) as usize] += finite_or_zero(payment.amount);
    }

    totals
}

pub fn expiring_count(members: &[MemberRecord], as_of: NaiveDate, within_days: i64) -> usize {
    let horizon = as_of
        .checked_add_signed(Duration::days(within_days.clamp(0, 3650)))
        .unwrap_or(NaiveDate::MAX);
    members
        .iter()
        .filter(|member| {
            member
                .end_date
                .is_some_and(|end| end >= as_of && end <= horizon)
        })
        .count()
}

/// Share of members with an end date whose membership is still running.
pub fn renewal_rate_percent(members: &[MemberRecord], as_of: NaiveDate) -> Option<f64> {
    let dated: Vec<&MemberRecord> = members.iter().filter(|m| m.end_date.is_some()).collect();
    if dated.is_empty() {
        return None;
    }
    let renewed = dated.iter().filter(|m| is_active(m, as_of)).count();
    Some(renewed as f64 / dated.len() as f64 * 100.0)
}

fn month_index(date: NaiveDate) -> i64 {
    date.year() as i64 * 12 + date.month0() as i64
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
