//! Derived views computed from already-normalized upstream data.
//!
//! Everything here is a pure function of its inputs; the API layer does
//! the fetching and hands over parsed lists.

pub mod activity;
pub mod agents;
pub mod brief;
pub mod dashboard;

pub use activity::{ActivityEvent, ActivityKind, build_activity_feed};
pub use agents::{AgentSummary, build_agent_roster};
pub use brief::{MorningBrief, build_morning_brief};
pub use dashboard::{DASHBOARD_HISTORY_DAYS, Dashboard, build_dashboard};
