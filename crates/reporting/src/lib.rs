//! Campaign reporting — trailing weekly aggregation, funnel conversion
//! breakdowns, and actual-vs-ideal metric evaluation.
//!
//! Everything here is pure: functions of (campaign, history, now) with no
//! caching, recomputed on every request.

pub mod evaluation;
pub mod funnel;
pub mod weekly;

pub use evaluation::{campaign_rollup, evaluate_campaign, CampaignRollup, MetricEvaluation};
pub use funnel::{campaign_funnel, conversion_pct, FunnelStage};
pub use weekly::{weekly_summary, WeeklySlot};
