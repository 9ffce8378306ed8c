use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One member row as exported from the membership store.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MemberRecord {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub pending_amount: f64,
    #[serde(default)]
    pub total_amount: f64,
    pub last_payment_date: Option<NaiveDate>,
}

/// One ledger entry as exported from the payments store.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PaymentRecord {
    pub member_id: Uuid,
    pub amount: f64,
    pub paid_on: NaiveDate,
}

/// Per-member facts the risk scorer works from.
///
/// `days_until_expiry` is `None` when the member has no subscription end
/// date; negative values mean the membership has already lapsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberRiskInput {
    pub id: Uuid,
    pub days_until_expiry: Option<i64>,
    pub has_pending_balance: bool,
    pub last_payment_days_ago: Option<i64>,
    pub pending_amount: f64,
    pub total_amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskResult {
    pub id: Uuid,
    pub tier: RiskTier,
    pub percent: u8,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    SendReminder,
    FollowUpPayment,
    OfferDiscount,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::SendReminder => "send_reminder",
            ActionType::FollowUpPayment => "follow_up_payment",
            ActionType::OfferDiscount => "offer_discount",
        }
    }

    /// Lower sorts first when two actions carry the same count.
    pub fn priority(&self) -> u8 {
        match self {
            ActionType::SendReminder => 0,
            ActionType::FollowUpPayment => 1,
            ActionType::OfferDiscount => 2,
        }
    }
}

/// A member flagged by the scorer, as handed to the recommender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskClient {
    pub id: Uuid,
    pub full_name: String,
    pub risk_percent: Option<u8>,
}

/// A member carrying an outstanding balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnpaidClient {
    pub id: Uuid,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewEntry {
    pub name: String,
    pub meta: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedAction {
    pub id: String,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub label: String,
    pub sublabel: Option<String>,
    pub count: usize,
    pub client_ids: Vec<Uuid>,
    pub preview: Vec<PreviewEntry>,
}

impl RecommendedAction {
    /// Members in `client_ids` not shown in the preview.
    pub fn remaining(&self) -> usize {
        self.count.saturating_sub(self.preview.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub projected: f64,
    pub growth_percent: f64,
}

/// Aggregate figures the dashboard insight rules evaluate.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub revenue_this_month: f64,
    pub revenue_growth_percent: f64,
    pub monthly_revenue: Vec<f64>,
    pub expired_clients: usize,
    pub pending_payments: usize,
    pub active_clients: usize,
}
