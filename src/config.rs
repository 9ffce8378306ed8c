//! Tunable thresholds for the retention engine.
//!
//! Every constant the scorer, recommender and commentary rules use lives
//! here. `EngineConfig::default()` carries the reference values; a JSON
//! file passed with `--config` may override any subset of them.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RetentionError};

/// Longest trailing revenue window, in months.
pub const MAX_REVENUE_MONTHS: usize = 120;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub risk: RiskWeights,
    pub tiers: TierThresholds,
    pub actions: ActionSettings,
    pub benchmark: BenchmarkBands,
    pub commentary: CommentaryThresholds,
    pub insights: InsightThresholds,
    pub window: WindowSettings,
}

/// Additive contributions to the 0-100 risk percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RiskWeights {
    /// Contribution when the membership expires today.
    pub expiry_max: i64,
    /// Points shaved off the expiry contribution per remaining day.
    pub expiry_per_day: i64,
    pub pending_balance: i64,
    /// Payments older than this many days start to count.
    pub recency_warn_days: i64,
    pub recency_warn_penalty: i64,
    /// Payments older than this many days count fully.
    pub recency_critical_days: i64,
    pub recency_critical_penalty: i64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            expiry_max: 40,
            expiry_per_day: 4,
            pending_balance: 30,
            recency_warn_days: 30,
            recency_warn_penalty: 15,
            recency_critical_days: 90,
            recency_critical_penalty: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TierThresholds {
    pub high: u8,
    pub medium: u8,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            high: 70,
            medium: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActionSettings {
    pub preview_limit: usize,
}

impl Default for ActionSettings {
    fn default() -> Self {
        Self { preview_limit: 3 }
    }
}

/// Renewal-rate bands. Boundary values belong to the higher band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchmarkBands {
    pub above: f64,
    pub typical: f64,
}

impl Default for BenchmarkBands {
    fn default() -> Self {
        Self {
            above: 85.0,
            typical: 60.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommentaryThresholds {
    /// Share of projected revenue tied to at-risk members that switches
    /// the commentary to a risk-forward message.
    pub material_risk_share: f64,
    pub strong_growth_percent: f64,
    pub sharp_decline_percent: f64,
}

impl Default for CommentaryThresholds {
    fn default() -> Self {
        Self {
            material_risk_share: 0.2,
            strong_growth_percent: 10.0,
            sharp_decline_percent: -10.0,
        }
    }
}

/// Dashboard bullet thresholds. A bullet fires only when its figure is
/// strictly past the threshold; a value equal to it stays quiet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InsightThresholds {
    pub growth_percent: f64,
    pub decline_percent: f64,
    /// Minimum months of history before the best-month bullet fires.
    pub best_month_min_history: usize,
    pub expired_clients: usize,
    pub pending_payments: usize,
    /// Expired share of all members (0-1) that triggers the churn bullet.
    pub churn_share: f64,
    pub max_insights: usize,
}

impl Default for InsightThresholds {
    fn default() -> Self {
        Self {
            growth_percent: 10.0,
            decline_percent: -10.0,
            best_month_min_history: 3,
            expired_clients: 5,
            pending_payments: 3,
            churn_share: 0.25,
            max_insights: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSettings {
    pub revenue_months: usize,
    pub expiring_within_days: i64,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            revenue_months: 6,
            expiring_within_days: 7,
        }
    }
}

impl EngineConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| RetentionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: EngineConfig =
            serde_json::from_str(&raw).map_err(|source| RetentionError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        debug!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    /// Load `path` when given, otherwise fall back to the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let tiers = &self.tiers;
        if tiers.medium == 0 || tiers.medium >= tiers.high || tiers.high > 100 {
            return Err(RetentionError::InvalidConfig(format!(
                "tier thresholds must satisfy 0 < medium < high <= 100 (got medium={}, high={})",
                tiers.medium, tiers.high
            )));
        }

        let bands = &self.benchmark;
        if !(bands.typical.is_finite() && bands.above.is_finite()) || bands.typical >= bands.above {
            return Err(RetentionError::InvalidConfig(format!(
                "benchmark bands must satisfy typical < above (got typical={}, above={})",
                bands.typical, bands.above
            )));
        }

        let risk = &self.risk;
        if risk.expiry_max < 0
            || risk.expiry_per_day < 0
            || risk.pending_balance < 0
            || risk.recency_warn_penalty < 0
            || risk.recency_critical_penalty < risk.recency_warn_penalty
            || risk.recency_critical_days < risk.recency_warn_days
        {
            return Err(RetentionError::InvalidConfig(
                "risk weights must be non-negative and recency bands ascending".to_string(),
            ));
        }

        if self.actions.preview_limit == 0 {
            return Err(RetentionError::InvalidConfig(
                "actions.preview_limit must be at least 1".to_string(),
            ));
        }

        if !(1..=MAX_REVENUE_MONTHS).contains(&self.window.revenue_months) {
            return Err(RetentionError::InvalidConfig(format!(
                "window.revenue_months must be between 1 and {MAX_REVENUE_MONTHS} (got {})",
                self.window.revenue_months
            )));
        }

        if !(0..=3650).contains(&self.window.expiring_within_days) {
            return Err(RetentionError::InvalidConfig(format!(
                "window.expiring_within_days must be between 0 and 3650 (got {})",
                self.window.expiring_within_days
            )));
        }

        Ok(())
    }
}
