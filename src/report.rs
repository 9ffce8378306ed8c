use std::collections::HashMap;
use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::actions::ActionRecommender;
use crate::commentary::CommentaryGenerator;
use crate::config::EngineConfig;
use crate::dataset;
use crate::error::Result;
use crate::models::{
    DashboardSnapshot, MemberRecord, PaymentRecord, ProjectionResult, RecommendedAction,
    RiskClient, RiskTier, UnpaidClient,
};
use crate::projection;
use crate::risk::RiskScorer;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtRiskMember {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub tier: RiskTier,
    pub percent: u8,
    pub reason: String,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierSummary {
    pub tier: RiskTier,
    pub count: usize,
    pub avg_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetentionReport {
    pub as_of: NaiveDate,
    pub monthly_revenue: Vec<f64>,
    pub projection: ProjectionResult,
    pub active_members: usize,
    pub at_risk: Vec<AtRiskMember>,
    pub tiers: Vec<TierSummary>,
    pub revenue_at_risk: f64,
    pub expiring_count: usize,
    pub renewal_rate_percent: Option<f64>,
    pub actions: Vec<RecommendedAction>,
    pub revenue_commentary: String,
    pub benchmark_message: Option<String>,
    pub insights: Vec<String>,
}

pub fn summarize_by_tier(at_risk: &[AtRiskMember]) -> Vec<TierSummary> {
    let mut map: HashMap<RiskTier, (usize, u32)> = HashMap::new();

    for member in at_risk {
        let entry = map.entry(member.tier).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += member.percent as u32;
    }

    let mut summaries: Vec<TierSummary> = map
        .into_iter()
        .map(|(tier, (count, total_percent))| TierSummary {
            tier,
            count,
            avg_percent: if count == 0 {
                0.0
            } else {
                total_percent as f64 / count as f64
            },
        })
        .collect();

    summaries.sort_by(|a, b| b.tier.cmp(&a.tier));
    summaries
}

/// Run every engine component over one tenant's exported facts.
pub fn analyze(
    members: &[MemberRecord],
    payments: &[PaymentRecord],
    as_of: NaiveDate,
    config: &EngineConfig,
) -> RetentionReport {
    let scorer = RiskScorer::from_config(config);
    let recommender = ActionRecommender::from_config(config);
    let commentary = CommentaryGenerator::from_config(config);

    let active: Vec<&MemberRecord> = members
        .iter()
        .filter(|member| dataset::is_active(member, as_of))
        .collect();
    let by_id: HashMap<Uuid, &MemberRecord> = active.iter().map(|m| (m.id, *m)).collect();

    let inputs: Vec<_> = active
        .iter()
        .map(|member| dataset::member_risk_input(member, as_of))
        .collect();

    let at_risk: Vec<AtRiskMember> = scorer
        .rank_at_risk(&inputs)
        .into_iter()
        .filter_map(|result| {
            let member = by_id.get(&result.id)?;
            Some(AtRiskMember {
                id: result.id,
                full_name: member.full_name.clone(),
                email: member.email.clone(),
                tier: result.tier,
                percent: result.percent,
                reason: result.reason,
                total_amount: member.total_amount,
            })
        })
        .collect();

    let revenue_at_risk: f64 = at_risk
        .iter()
        .map(|member| member.total_amount)
        .filter(|amount| amount.is_finite())
        .sum();

    let risk_clients: Vec<RiskClient> = at_risk
        .iter()
        .map(|member| RiskClient {
            id: member.id,
            full_name: member.full_name.clone(),
            risk_percent: Some(member.percent),
        })
        .collect();

    let unpaid_clients: Vec<UnpaidClient> = active
        .iter()
        .zip(inputs.iter())
        .filter(|(_, input)| input.has_pending_balance)
        .map(|(member, _)| UnpaidClient {
            id: member.id,
            full_name: member.full_name.clone(),
        })
        .collect();

    let expiring_count =
        dataset::expiring_count(members, as_of, config.window.expiring_within_days);
    let actions = recommender.recommend(&risk_clients, &unpaid_clients, expiring_count);

    let monthly_revenue =
        dataset::monthly_revenue(payments, as_of, config.window.revenue_months);
    let projection = projection::project_next_month(&monthly_revenue);
    let revenue_commentary = commentary.revenue_commentary(
        projection.projected,
        projection.growth_percent,
        revenue_at_risk,
        expiring_count,
    );

    let renewal_rate_percent = dataset::renewal_rate_percent(members, as_of);
    let benchmark_message = renewal_rate_percent.map(|rate| commentary.benchmark_message(rate));

    // net refunds can push a month below zero
    let revenue_this_month = projection::sanitize(monthly_revenue.last().copied().unwrap_or(0.0));
    let previous_month = projection::sanitize(
        monthly_revenue
            .iter()
            .rev()
            .nth(1)
            .copied()
            .unwrap_or(0.0),
    );
    let snapshot = DashboardSnapshot {
        revenue_this_month,
        revenue_growth_percent: projection::growth_percent(previous_month, revenue_this_month),
        monthly_revenue: monthly_revenue.clone(),
        expired_clients: members.len() - active.len(),
        pending_payments: unpaid_clients.len(),
        active_clients: active.len(),
    };
    let insights = commentary.dashboard_insights(&snapshot);

    info!(
        %as_of,
        active = active.len(),
        at_risk = at_risk.len(),
        actions = actions.len(),
        projected = projection.projected,
        "retention analysis complete"
    );

    RetentionReport {
        as_of,
        monthly_revenue,
        projection,
        active_members: active.len(),
        tiers: summarize_by_tier(&at_risk),
        at_risk,
        revenue_at_risk,
        expiring_count,
        renewal_rate_percent,
        actions,
        revenue_commentary,
        benchmark_message,
        insights,
    }
}

pub fn to_json(report: &RetentionReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn render_markdown(report: &RetentionReport, top: usize) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Retention & Revenue Report");
    let _ = writeln!(
        output,
        "Generated as of {} across {} active members",
        report.as_of, report.active_members
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Revenue Outlook");
    let _ = writeln!(
        output,
        "- Projected next month: {:.2} ({:+.1}%)",
        report.projection.projected, report.projection.growth_percent
    );
    let _ = writeln!(output, "- Revenue at risk: {:.2}", report.revenue_at_risk);
    let _ = writeln!(output);
    let _ = writeln!(output, "{}", report.revenue_commentary);

    if let (Some(rate), Some(message)) = (report.renewal_rate_percent, &report.benchmark_message) {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Renewal Benchmark");
        let _ = writeln!(output, "- Renewal rate: {rate:.1}%");
        let _ = writeln!(output, "{message}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Mix");

    if report.tiers.is_empty() {
        let _ = writeln!(output, "No active members show risk factors.");
    } else {
        for summary in report.tiers.iter() {
            let _ = writeln!(
                output,
                "- {}: {} members (avg risk {:.1}%)",
                summary.tier.as_str(),
                summary.count,
                summary.avg_percent
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Risk Members");

    if report.at_risk.is_empty() {
        let _ = writeln!(output, "No members at risk as of this date.");
    } else {
        for member in report.at_risk.iter().take(top) {
            let _ = writeln!(
                output,
                "- {} ({}) {}% {} risk: {}",
                member.full_name,
                member.email,
                member.percent,
                member.tier.as_str(),
                member.reason
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recommended Actions");

    if report.actions.is_empty() {
        let _ = writeln!(output, "Nothing needs attention right now.");
    } else {
        for action in report.actions.iter() {
            let _ = write!(output, "- {}", action.label);
            if let Some(sublabel) = &action.sublabel {
                let _ = write!(output, " ({sublabel})");
            }
            let _ = writeln!(output);
            for entry in action.preview.iter() {
                match &entry.meta {
                    Some(meta) => {
                        let _ = writeln!(output, "  - {} ({meta})", entry.name);
                    }
                    None => {
                        let _ = writeln!(output, "  - {}", entry.name);
                    }
                }
            }
            if !action.preview.is_empty() && action.remaining() > 0 {
                let _ = writeln!(output, "  - +{} more", action.remaining());
            }
        }
    }

    if !report.insights.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Insights");
        for insight in report.insights.iter() {
            let _ = writeln!(output, "- {insight}");
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn member(name: &str, end_date: Option<NaiveDate>, pending: f64, last_paid: Option<NaiveDate>) -> MemberRecord {
        MemberRecord {
            id: Uuid::new_v4(),
            full_name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            end_date,
            pending_amount: pending,
            total_amount: 300.0,
            last_payment_date: last_paid,
        }
    }

    fn sample_members(as_of: NaiveDate) -> Vec<MemberRecord> {
        vec![
            member("Avery", Some(as_of), 50.0, Some(date(2025, 9, 1))),
            member("Jules", Some(date(2026, 2, 3)), 0.0, Some(date(2026, 1, 20))),
            member("Kiara", None, 20.0, Some(date(2026, 1, 25))),
            member("Noor", Some(date(2026, 6, 1)), 0.0, Some(date(2026, 1, 28))),
            member("Omar", Some(date(2026, 1, 15)), 0.0, Some(date(2025, 12, 15))),
        ]
    }

    fn sample_payments() -> Vec<PaymentRecord> {
        [
            (date(2025, 9, 5), 100.0),
            (date(2025, 10, 5), 100.0),
            (date(2025, 11, 5), 100.0),
            (date(2025, 12, 5), 200.0),
            (date(2026, 1, 5), 200.0),
            (date(2026, 2, 1), 200.0),
        ]
        .into_iter()
        .map(|(paid_on, amount)| PaymentRecord {
            member_id: Uuid::new_v4(),
            amount,
            paid_on,
        })
        .collect()
    }

    #[test]
    fn analysis_combines_every_component() {
        let as_of = date(2026, 2, 1);
        let members = sample_members(as_of);
        let report = analyze(&members, &sample_payments(), as_of, &EngineConfig::default());

        assert_eq!(report.active_members, 4);
        assert_eq!(report.monthly_revenue, vec![100.0, 100.0, 100.0, 200.0, 200.0, 200.0]);
        assert!((report.projection.projected - 400.0).abs() < 1e-9);

        // Avery: 40 + 30 + 30, Jules: expiry in 2 days (32), Kiara: pending (30)
        let percents: Vec<u8> = report.at_risk.iter().map(|m| m.percent).collect();
        assert_eq!(percents, vec![100, 32, 30]);
        assert_eq!(report.at_risk[0].full_name, "Avery");
        assert_eq!(report.at_risk[1].reason, "Expires in 2 days");
        assert!((report.revenue_at_risk - 900.0).abs() < 1e-9);

        assert_eq!(report.expiring_count, 2);
        assert_eq!(report.renewal_rate_percent, Some(75.0));
        assert!(report
            .benchmark_message
            .as_deref()
            .is_some_and(|m| m.contains("in line with typical")));

        let types: Vec<&str> = report.actions.iter().map(|a| a.action_type.as_str()).collect();
        assert_eq!(types, vec!["send_reminder", "follow_up_payment", "offer_discount"]);
        assert_eq!(report.actions[1].count, 2);

        assert!(report.revenue_commentary.contains("at-risk members"));
    }

    #[test]
    fn empty_tenant_produces_well_formed_report() {
        let as_of = date(2026, 2, 1);
        let report = analyze(&[], &[], as_of, &EngineConfig::default());
        assert!(report.at_risk.is_empty());
        assert!(report.actions.is_empty());
        assert_eq!(report.projection.projected, 0.0);
        assert_eq!(report.renewal_rate_percent, None);
        assert_eq!(report.insights, vec!["No active memberships right now.".to_string()]);

        let markdown = render_markdown(&report, 10);
        assert!(markdown.contains("Nothing needs attention right now."));
        assert!(!markdown.contains("## Renewal Benchmark"));

        let json = to_json(&report).unwrap();
        assert!(json.contains("\"actions\": []"));
    }

    #[test]
    fn markdown_lists_previews_and_overflow() {
        let as_of = date(2026, 2, 1);
        let members: Vec<MemberRecord> = (0..5)
            .map(|i| member(&format!("M{i}"), Some(as_of), 0.0, None))
            .collect();
        let report = analyze(&members, &[], as_of, &EngineConfig::default());
        let markdown = render_markdown(&report, 10);

        assert!(markdown.contains("- Send renewal reminders to 5 at-risk members"));
        assert!(markdown.contains("  - M0 (40% risk)"));
        assert!(markdown.contains("  - +2 more"));
        assert!(!markdown.contains("## Insights"));
    }

    #[test]
    fn refund_month_does_not_flip_growth() {
        let as_of = date(2026, 2, 15);
        let payments: Vec<PaymentRecord> = [
            (date(2026, 1, 5), 50.0),
            (date(2026, 1, 20), -100.0),
            (date(2026, 2, 3), 100.0),
        ]
        .into_iter()
        .map(|(paid_on, amount)| PaymentRecord {
            member_id: Uuid::new_v4(),
            amount,
            paid_on,
        })
        .collect();
        let members = vec![member("Avery", None, 0.0, Some(date(2026, 2, 3)))];

        let report = analyze(&members, &payments, as_of, &EngineConfig::default());
        assert_eq!(report.monthly_revenue, vec![0.0, 0.0, 0.0, 0.0, -50.0, 100.0]);
        assert_eq!(
            report.insights,
            vec![
                "Revenue is up 100.0% compared to last month.".to_string(),
                "This is your best month in the last 6 months.".to_string(),
            ]
        );
        assert!(report.insights.iter().all(|line| !line.contains("down")));
    }

    #[test]
    fn tier_summary_orders_high_first() {
        let at_risk = vec![
            AtRiskMember {
                id: Uuid::new_v4(),
                full_name: "A".to_string(),
                email: "a@example.com".to_string(),
                tier: RiskTier::Medium,
                percent: 40,
                reason: "Has a pending balance".to_string(),
                total_amount: 0.0,
            },
            AtRiskMember {
                id: Uuid::new_v4(),
                full_name: "B".to_string(),
                email: "b@example.com".to_string(),
                tier: RiskTier::High,
                percent: 90,
                reason: "Expires today".to_string(),
                total_amount: 0.0,
            },
            AtRiskMember {
                id: Uuid::new_v4(),
                full_name: "C".to_string(),
                email: "c@example.com".to_string(),
                tier: RiskTier::Medium,
                percent: 60,
                reason: "Has a pending balance".to_string(),
                total_amount: 0.0,
            },
        ];
        let summaries = summarize_by_tier(&at_risk);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].tier, RiskTier::High);
        assert_eq!(summaries[1].count, 2);
        assert!((summaries[1].avg_percent - 50.0).abs() < 0.001);
    }
}
