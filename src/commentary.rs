//! Templated narrative for the reporting dashboard.
//!
//! Each generator is an ordered table of `(predicate, template)` rules
//! evaluated top to bottom. Revenue commentary and the benchmark message
//! stop at the first match; dashboard insights collect every match in
//! table order.

use crate::config::{BenchmarkBands, CommentaryThresholds, EngineConfig, InsightThresholds};
use crate::models::DashboardSnapshot;

struct Rule<C> {
    applies: fn(&C) -> bool,
    render: fn(&C) -> String,
}

fn first_match<C>(rules: &[Rule<C>], ctx: &C) -> Option<String> {
    rules
        .iter()
        .find(|rule| (rule.applies)(ctx))
        .map(|rule| (rule.render)(ctx))
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

struct RevenueContext<'a> {
    projected: f64,
    growth_percent: f64,
    revenue_at_risk: f64,
    expiring_count: usize,
    thresholds: &'a CommentaryThresholds,
}

impl RevenueContext<'_> {
    fn risk_share(&self) -> f64 {
        if self.projected > 0.0 {
            self.revenue_at_risk / self.projected
        } else {
            0.0
        }
    }

    fn expiring_suffix(&self) -> String {
        match self.expiring_count {
            0 => String::new(),
            1 => " 1 membership expires soon.".to_string(),
            n => format!(" {n} memberships expire soon."),
        }
    }
}

fn revenue_rules<'a>() -> [Rule<RevenueContext<'a>>; 7] {
    [
        Rule {
            applies: |ctx| ctx.projected <= 0.0,
            render: |_| {
                "Not enough recent revenue to project next month yet.".to_string()
            },
        },
        Rule {
            applies: |ctx| ctx.risk_share() > ctx.thresholds.material_risk_share,
            render: |ctx| {
                format!(
                    "{:.0} of the projected {:.0} ({:.0}%) comes from at-risk members. \
                     Prioritize renewals before chasing growth.{}",
                    ctx.revenue_at_risk,
                    ctx.projected,
                    ctx.risk_share() * 100.0,
                    ctx.expiring_suffix()
                )
            },
        },
        Rule {
            applies: |ctx| ctx.growth_percent >= ctx.thresholds.strong_growth_percent,
            render: |ctx| {
                format!(
                    "Strong momentum: revenue is on track to grow {:.1}% to {:.0} next month.",
                    ctx.growth_percent, ctx.projected
                )
            },
        },
        Rule {
            applies: |ctx| ctx.growth_percent > 0.0,
            render: |ctx| {
                format!(
                    "Revenue is projected to rise {:.1}% to {:.0} next month.",
                    ctx.growth_percent, ctx.projected
                )
            },
        },
        Rule {
            applies: |ctx| ctx.growth_percent <= ctx.thresholds.sharp_decline_percent,
            render: |ctx| {
                format!(
                    "Revenue is projected to fall {:.1}% to {:.0} next month.{}",
                    ctx.growth_percent.abs(),
                    ctx.projected,
                    ctx.expiring_suffix()
                )
            },
        },
        Rule {
            applies: |ctx| ctx.growth_percent < 0.0,
            render: |ctx| {
                format!(
                    "Revenue is projected to dip {:.1}% to {:.0} next month.",
                    ctx.growth_percent.abs(),
                    ctx.projected
                )
            },
        },
        Rule {
            applies: |_| true,
            render: |ctx| {
                format!("Revenue is projected to hold steady at {:.0} next month.", ctx.projected)
            },
        },
    ]
}

struct InsightContext<'a> {
    snapshot: &'a DashboardSnapshot,
    revenue_this_month: f64,
    growth_percent: f64,
    thresholds: &'a InsightThresholds,
}

impl InsightContext<'_> {
    fn expired_share(&self) -> f64 {
        let total = self.snapshot.active_clients + self.snapshot.expired_clients;
        if total == 0 {
            0.0
        } else {
            self.snapshot.expired_clients as f64 / total as f64
        }
    }

    fn is_best_month(&self) -> bool {
        let history = &self.snapshot.monthly_revenue;
        if history.len() < self.thresholds.best_month_min_history || self.revenue_this_month <= 0.0
        {
            return false;
        }
        history
            .iter()
            .map(|value| finite_or_zero(*value))
            .all(|value| value <= self.revenue_this_month)
    }
}

fn insight_rules<'a>() -> [Rule<InsightContext<'a>>; 7] {
    [
        Rule {
            applies: |ctx| ctx.growth_percent > ctx.thresholds.growth_percent,
            render: |ctx| format!("Revenue is up {:.1}% compared to last month.", ctx.growth_percent),
        },
        Rule {
            applies: |ctx| ctx.growth_percent < ctx.thresholds.decline_percent,
            render: |ctx| {
                format!(
                    "Revenue is down {:.1}% compared to last month.",
                    ctx.growth_percent.abs()
                )
            },
        },
        Rule {
            applies: InsightContext::is_best_month,
            render: |ctx| {
                format!(
                    "This is your best month in the last {} months.",
                    ctx.snapshot.monthly_revenue.len()
                )
            },
        },
        Rule {
            applies: |ctx| ctx.snapshot.expired_clients > ctx.thresholds.expired_clients,
            render: |ctx| {
                format!(
                    "{} memberships have expired. A win-back offer could bring them back.",
                    ctx.snapshot.expired_clients
                )
            },
        },
        Rule {
            applies: |ctx| {
                ctx.snapshot.expired_clients > 0 && ctx.expired_share() > ctx.thresholds.churn_share
            },
            render: |ctx| {
                format!(
                    "{:.0}% of your members have lapsed. Review renewal reminders and pricing.",
                    ctx.expired_share() * 100.0
                )
            },
        },
        Rule {
            applies: |ctx| ctx.snapshot.pending_payments > ctx.thresholds.pending_payments,
            render: |ctx| {
                format!(
                    "{} members have pending payments. Follow up to collect outstanding balances.",
                    ctx.snapshot.pending_payments
                )
            },
        },
        Rule {
            applies: |ctx| ctx.snapshot.active_clients == 0,
            render: |_| "No active memberships right now.".to_string(),
        },
    ]
}

/// Narrative generator bound to a set of thresholds.
#[derive(Debug, Clone, Default)]
pub struct CommentaryGenerator {
    commentary: CommentaryThresholds,
    benchmark: BenchmarkBands,
    insights: InsightThresholds,
}

impl CommentaryGenerator {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            commentary: config.commentary.clone(),
            benchmark: config.benchmark.clone(),
            insights: config.insights.clone(),
        }
    }

    pub fn revenue_commentary(
        &self,
        projected: f64,
        growth_percent: f64,
        revenue_at_risk: f64,
        expiring_count: usize,
    ) -> String {
        let ctx = RevenueContext {
            projected: finite_or_zero(projected),
            growth_percent: finite_or_zero(growth_percent),
            revenue_at_risk: finite_or_zero(revenue_at_risk).max(0.0),
            expiring_count,
            thresholds: &self.commentary,
        };
        // the table ends in a catch-all, so a match always exists
        first_match(&revenue_rules(), &ctx).unwrap_or_default()
    }

    pub fn benchmark_message(&self, renewal_rate_percent: f64) -> String {
        let rate = finite_or_zero(renewal_rate_percent);
        let phrase = if rate >= self.benchmark.above {
            "above typical"
        } else if rate >= self.benchmark.typical {
            "in line with typical"
        } else {
            "below typical"
        };
        format!("Your renewal rate of {rate:.1}% is {phrase} for membership businesses.")
    }

    pub fn dashboard_insights(&self, snapshot: &DashboardSnapshot) -> Vec<String> {
        let ctx = InsightContext {
            snapshot,
            revenue_this_month: finite_or_zero(snapshot.revenue_this_month),
            growth_percent: finite_or_zero(snapshot.revenue_growth_percent),
            thresholds: &self.insights,
        };
        insight_rules()
            .iter()
            .filter(|rule| (rule.applies)(&ctx))
            .map(|rule| (rule.render)(&ctx))
            .take(self.insights.max_insights)
            .collect()
    }
}

pub fn revenue_commentary(
    projected: f64,
    growth_percent: f64,
    revenue_at_risk: f64,
    expiring_count: usize,
) -> String {
    CommentaryGenerator::default().revenue_commentary(
        projected,
        growth_percent,
        revenue_at_risk,
        expiring_count,
    )
}

pub fn benchmark_message(renewal_rate_percent: f64) -> String {
    CommentaryGenerator::default().benchmark_message(renewal_rate_percent)
}

pub fn dashboard_insights(snapshot: &DashboardSnapshot) -> Vec<String> {
    CommentaryGenerator::default().dashboard_insights(snapshot)
}
