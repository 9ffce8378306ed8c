//! Retention risk and revenue forecasting for membership businesses.
//!
//! The engine is a set of deterministic functions over in-memory facts:
//! - [`projection`] extrapolates next month's revenue from a trailing window
//! - [`risk`] scores a member's cancellation risk with a one-line reason
//! - [`actions`] batches at-risk and unpaid members into ranked interventions
//! - [`commentary`] turns the figures into short dashboard narrative
//!
//! [`dataset`] and [`report`] assemble those inputs from CSV exports and
//! render the results.

pub mod actions;
pub mod commentary;
pub mod config;
pub mod dataset;
pub mod error;
pub mod models;
pub mod projection;
pub mod report;
pub mod risk;

pub use actions::{recommend_actions, ActionRecommender};
pub use commentary::{benchmark_message, dashboard_insights, revenue_commentary, CommentaryGenerator};
pub use config::EngineConfig;
pub use error::{Result, RetentionError};
pub use models::{
    ActionType, DashboardSnapshot, MemberRiskInput, ProjectionResult, RecommendedAction,
    RiskResult, RiskTier,
};
pub use projection::project_next_month;
pub use risk::{score, score_percent, score_reason, score_tier, RiskScorer};
