//! Moderation decision reconciliation
//!
//! Every reply in the feed gets at most one effective moderation action,
//! picked from three sources:
//!
//! - **Live**: actions pushed over the [`ModerationChannel`](crate::channel::ModerationChannel)
//!   during this session, plus the backend's snapshot of actions applied earlier
//! - **Preloaded**: actions synthesized from the batch analysis payload
//! - **Static default**: actions synthesized from the reply's own sentiment label
//!
//! A reply whose own data marks it hidden is always hidden, whatever the
//! layers say.
//!
//! # Example
//!
//! ```
//! # use hateraide::moderation::*;
//! let mut live = ActionLayer::new();
//! let preloaded = ActionLayer::new();
//! live.insert(
//!     "r2".into(),
//!     ModerationAction::synthesize("r2", Sentiment::Harmful, Some("Threat"), "", "applied").unwrap(),
//! );
//! let action = resolve("r2", &live, &preloaded).unwrap();
//! assert_eq!(action.action_type, ActionType::Hide);
//! assert!(matches!(Verdict::of(Some(&action)), Verdict::Hide { .. }));
//! ```

mod decision;
mod fetch;
mod moderatable;
mod payload;
mod store;
mod types;

#[cfg(test)]
mod tests;

pub use decision::{
    ActionLayer, HIDDEN_REASON, ResolveIterExt, STATUS_DEFAULT, STATUS_HIDDEN, resolve,
    resolve_all, resolve_decision, static_default,
};
pub use fetch::{check_health, fetch_analysis_payload, fetch_applied_actions, fetch_feed};
pub use moderatable::{Moderatable, StaticFacts};
pub use payload::{
    AnalysisPayload, AnalysisResult, ReplyAnalysis, ReplyAnalyzerResults, STATUS_PRELOADED,
};
pub use store::{ActivationReport, LIVE_SUBSCRIPTION, ModerationStore};
pub use types::{
    ActionType, Decision, DecisionSource, ModerationAction, Sentiment, Verdict, content_warning,
};
