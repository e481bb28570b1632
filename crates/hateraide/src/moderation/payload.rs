//! Batch analysis payload
//!
//! The reply analyzer writes one document per analysis run. Only
//! `reply_analyzer_results.reply_analyses[]` matters for moderation; the
//! session and post context blocks around it are ignored.

use super::{ActionLayer, ModerationAction, Sentiment};
use serde::Deserialize;
use smol_str::SmolStr;
use std::collections::HashSet;

/// Status stamped onto actions synthesized from the batch payload
pub const STATUS_PRELOADED: &str = "preloaded";

/// Top-level analysis document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisPayload {
    /// Reply analyzer output
    #[serde(default)]
    pub reply_analyzer_results: ReplyAnalyzerResults,
}

/// Output block of the reply analyzer
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplyAnalyzerResults {
    /// When the analysis ran
    #[serde(default)]
    pub analysis_timestamp: Option<SmolStr>,
    /// One entry per analysed reply
    #[serde(default)]
    pub reply_analyses: Vec<ReplyAnalysis>,
}

/// Analysis of a single reply
#[derive(Debug, Clone, Deserialize)]
pub struct ReplyAnalysis {
    /// Reply the analysis refers to
    pub reply_id: SmolStr,
    /// The classifier output
    #[serde(default)]
    pub analysis_result: AnalysisResult,
}

/// Classifier output for one reply
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisResult {
    /// Sentiment label; unrecognised labels read as unknown
    #[serde(default)]
    pub sentiment: Sentiment,
    /// Why the classifier chose the label
    #[serde(default)]
    pub justification: Option<String>,
    /// Reply author is a notable account (highlighting only)
    #[serde(default)]
    pub author_important: bool,
}

impl AnalysisPayload {
    /// Build the preloaded layer
    ///
    /// Only `harmful` and `unfriendly` entries produce an action; every other
    /// entry is left out of the layer entirely.
    pub fn preloaded_actions(&self) -> ActionLayer {
        let results = &self.reply_analyzer_results;
        let stamp = results.analysis_timestamp.clone().unwrap_or_default();
        results
            .reply_analyses
            .iter()
            .filter_map(|entry| {
                let result = &entry.analysis_result;
                ModerationAction::synthesize(
                    entry.reply_id.clone(),
                    result.sentiment,
                    result.justification.as_deref(),
                    stamp.clone(),
                    STATUS_PRELOADED,
                )
            })
            .map(|action| (action.item_id.clone(), action))
            .collect()
    }

    /// Replies whose authors the analysis marked important
    pub fn important_authors(&self) -> HashSet<SmolStr> {
        self.reply_analyzer_results
            .reply_analyses
            .iter()
            .filter(|entry| entry.analysis_result.author_important)
            .map(|entry| entry.reply_id.clone())
            .collect()
    }
}
