//! Presentation of moderated replies
//!
//! The store decides; the view only decides whether to honor the decision.
//! Revealing a blurred reply is local to the [`FeedView`] and never touches
//! the store.

use crate::content::Reply;
use crate::moderation::{ModerationStore, Verdict, content_warning};
use smol_str::SmolStr;
use std::collections::HashSet;

/// How a reply should be rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    /// No moderation applies
    Show,
    /// Rendered behind a blur with a warning overlay
    Blurred {
        /// Why the reply is blurred
        reason: String,
        /// Warning text for the overlay
        warning: &'static str,
    },
    /// Not rendered
    Hidden {
        /// Why the reply is hidden
        reason: String,
    },
    /// Moderated, but the user chose to see it anyway
    Revealed {
        /// What would otherwise apply
        verdict: Verdict,
    },
}

/// Per-render state of a feed
#[derive(Debug, Clone, Default)]
pub struct FeedView {
    revealed: HashSet<SmolStr>,
}

impl FeedView {
    /// Empty view with nothing revealed
    pub fn new() -> Self {
        Self::default()
    }

    /// Show a moderated reply despite its decision
    pub fn reveal(&mut self, id: impl Into<SmolStr>) {
        self.revealed.insert(id.into());
    }

    /// Put a revealed reply back under moderation
    pub fn conceal(&mut self, id: &str) {
        self.revealed.remove(id);
    }

    /// Whether the user revealed this reply
    pub fn is_revealed(&self, id: &str) -> bool {
        self.revealed.contains(id)
    }

    /// Forget every reveal
    pub fn reset(&mut self) {
        self.revealed.clear();
    }

    /// Presentation of one reply under the store's current decisions
    pub fn presentation<C>(&self, store: &ModerationStore<C>, reply: &Reply) -> Presentation {
        let action = store.get(&reply.id);
        let verdict = Verdict::of(action.as_ref());
        if verdict.is_moderated() && self.is_revealed(&reply.id) {
            return Presentation::Revealed { verdict };
        }
        match verdict {
            Verdict::Reveal => Presentation::Show,
            Verdict::Blur { reason } => Presentation::Blurred {
                reason,
                warning: content_warning(
                    action.map(|a| a.sentiment).unwrap_or(reply.sentiment),
                ),
            },
            Verdict::Hide { reason } => Presentation::Hidden { reason },
        }
    }
}
