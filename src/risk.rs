use tracing::trace;

use crate::config::{EngineConfig, RiskWeights, TierThresholds};
use crate::models::{MemberRiskInput, RiskResult, RiskTier};

pub const STABLE_REASON: &str = "Stable — no risk factors detected";

/// Factors in tie-break order: earlier wins when contributions are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskFactor {
    Expiry,
    PendingBalance,
    PaymentRecency,
}

/// Points each factor adds to the risk percent before clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Contributions {
    pub expiry: i64,
    pub pending_balance: i64,
    pub payment_recency: i64,
}

impl Contributions {
    pub fn total(&self) -> i64 {
        self.expiry
            .saturating_add(self.pending_balance)
            .saturating_add(self.payment_recency)
    }

    /// The largest contributing factor, or `None` when nothing contributes.
    pub fn dominant(&self) -> Option<RiskFactor> {
        let ordered = [
            (RiskFactor::Expiry, self.expiry),
            (RiskFactor::PendingBalance, self.pending_balance),
            (RiskFactor::PaymentRecency, self.payment_recency),
        ];

        let mut best: Option<(RiskFactor, i64)> = None;
        for (factor, value) in ordered {
            if value <= 0 {
                continue;
            }
            if best.map_or(true, |(_, top)| value > top) {
                best = Some((factor, value));
            }
        }
        best.map(|(factor, _)| factor)
    }
}

struct ReasonContext<'a> {
    input: &'a MemberRiskInput,
    contributions: Contributions,
    weights: &'a RiskWeights,
}

struct ReasonRule {
    applies: fn(&ReasonContext) -> bool,
    render: fn(&ReasonContext) -> String,
}

/// Evaluated top to bottom; the first matching rule names the reason.
const REASON_RULES: &[ReasonRule] = &[
    ReasonRule {
        applies: |ctx| ctx.contributions.dominant().is_none(),
        render: |_| STABLE_REASON.to_string(),
    },
    ReasonRule {
        applies: |ctx| ctx.contributions.dominant() == Some(RiskFactor::Expiry),
        render: |ctx| expiry_phrase(ctx.input.days_until_expiry.unwrap_or(0)),
    },
    ReasonRule {
        applies: |ctx| ctx.contributions.dominant() == Some(RiskFactor::PendingBalance),
        render: |_| "Has a pending balance".to_string(),
    },
    ReasonRule {
        applies: |ctx| ctx.contributions.dominant() == Some(RiskFactor::PaymentRecency),
        render: |ctx| {
            let days = ctx.input.last_payment_days_ago.unwrap_or(0);
            if days > ctx.weights.recency_critical_days {
                format!("No payment in {}+ days", ctx.weights.recency_critical_days)
            } else {
                format!("No payment in {}+ days", ctx.weights.recency_warn_days)
            }
        },
    },
];

fn expiry_phrase(days: i64) -> String {
    match days {
        d if d < -1 => format!("Expired {} days ago", -d),
        -1 => "Expired yesterday".to_string(),
        0 => "Expires today".to_string(),
        1 => "Expires in 1 day".to_string(),
        d => format!("Expires in {d} days"),
    }
}

/// Scores single members. Stateless apart from its thresholds.
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    weights: RiskWeights,
    tiers: TierThresholds,
}

impl RiskScorer {
    pub fn new(weights: RiskWeights, tiers: TierThresholds) -> Self {
        Self { weights, tiers }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.risk.clone(), config.tiers.clone())
    }

    pub fn contributions(&self, input: &MemberRiskInput) -> Contributions {
        Contributions {
            expiry: self.expiry_contribution(input.days_until_expiry),
            pending_balance: if input.has_pending_balance {
                self.weights.pending_balance
            } else {
                0
            },
            payment_recency: self.recency_penalty(input.last_payment_days_ago),
        }
    }

    fn expiry_contribution(&self, days_until_expiry: Option<i64>) -> i64 {
        match days_until_expiry {
            None => 0,
            Some(days) => {
                let decay = days.max(0).saturating_mul(self.weights.expiry_per_day);
                self.weights.expiry_max.saturating_sub(decay).max(0)
            }
        }
    }

    pub fn recency_penalty(&self, last_payment_days_ago: Option<i64>) -> i64 {
        match last_payment_days_ago {
            Some(days) if days > self.weights.recency_critical_days => {
                self.weights.recency_critical_penalty
            }
            Some(days) if days > self.weights.recency_warn_days => {
                self.weights.recency_warn_penalty
            }
            _ => 0,
        }
    }

    pub fn percent(&self, input: &MemberRiskInput) -> u8 {
        self.contributions(input).total().clamp(0, 100) as u8
    }

    pub fn tier_for_percent(&self, percent: u8) -> RiskTier {
        if percent >= self.tiers.high {
            RiskTier::High
        } else if percent >= self.tiers.medium {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }

    pub fn tier(&self, input: &MemberRiskInput) -> RiskTier {
        self.tier_for_percent(self.percent(input))
    }

    pub fn reason(&self, input: &MemberRiskInput) -> String {
        self.reason_for(input, self.contributions(input))
    }

    fn reason_for(&self, input: &MemberRiskInput, contributions: Contributions) -> String {
        let ctx = ReasonContext {
            input,
            contributions,
            weights: &self.weights,
        };
        REASON_RULES
            .iter()
            .find(|rule| (rule.applies)(&ctx))
            .map(|rule| (rule.render)(&ctx))
            .unwrap_or_else(|| STABLE_REASON.to_string())
    }

    /// One scoring pass producing tier, percent and reason together.
    pub fn score(&self, input: &MemberRiskInput) -> RiskResult {
        let contributions = self.contributions(input);
        let percent = contributions.total().clamp(0, 100) as u8;
        let result = RiskResult {
            id: input.id,
            tier: self.tier_for_percent(percent),
            percent,
            reason: self.reason_for(input, contributions),
        };
        trace!(member = %input.id, percent, tier = result.tier.as_str(), "scored member");
        result
    }

    /// Score every input, drop `low` results and order the rest by
    /// percent descending. Equal percents keep their input order.
    pub fn rank_at_risk(&self, inputs: &[MemberRiskInput]) -> Vec<RiskResult> {
        let mut results: Vec<RiskResult> = inputs
            .iter()
            .map(|input| self.score(input))
            .filter(|result| result.tier != RiskTier::Low)
            .collect();
        results.sort_by(|a, b| b.percent.cmp(&a.percent));
        results
    }
}

pub fn score_tier(input: &MemberRiskInput) -> RiskTier {
    RiskScorer::default().tier(input)
}

pub fn score_percent(input: &MemberRiskInput) -> u8 {
    RiskScorer::default().percent(input)
}

pub fn score_reason(input: &MemberRiskInput) -> String {
    RiskScorer::default().reason(input)
}

pub fn score(input: &MemberRiskInput) -> RiskResult {
    RiskScorer::default().score(input)
}
