use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

/// Sentiment label attached to a reply by the analysis backend
///
/// Ordered by severity for the default policy:
/// `harmful > unfriendly > friendly = in-jest > unknown`.
/// Labels the client does not recognise deserialize as [`Sentiment::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sentiment {
    /// Abusive or threatening content
    Harmful,
    /// Negative but not abusive
    Unfriendly,
    /// Positive or neutral
    Friendly,
    /// Teasing that reads as a joke
    InJest,
    /// No analysis available
    #[default]
    #[serde(other)]
    Unknown,
}

impl Sentiment {
    /// Severity rank used for the default policy
    pub const fn severity(&self) -> u8 {
        match self {
            Sentiment::Harmful => 3,
            Sentiment::Unfriendly => 2,
            Sentiment::Friendly | Sentiment::InJest => 1,
            Sentiment::Unknown => 0,
        }
    }

    /// Action the default policy takes for this label
    ///
    /// `harmful` hides, `unfriendly` blurs, everything else is left alone.
    pub fn default_action(&self) -> Option<ActionType> {
        match self.severity() {
            s if s >= Sentiment::Harmful.severity() => Some(ActionType::Hide),
            s if s >= Sentiment::Unfriendly.severity() => Some(ActionType::Blur),
            _ => None,
        }
    }

    /// Wire name of the label
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Harmful => "harmful",
            Sentiment::Unfriendly => "unfriendly",
            Sentiment::Friendly => "friendly",
            Sentiment::InJest => "in-jest",
            Sentiment::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with a moderated item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// Show behind a blur the user can click through
    Blur,
    /// Remove from the feed
    Hide,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::Blur => f.write_str("blur"),
            ActionType::Hide => f.write_str("hide"),
        }
    }
}

/// A moderation decision for one content item
///
/// Field names on the wire follow the backend's push messages
/// (`reply_id`, `timestamp`). Actions are never edited in place; a newer
/// action for the same item replaces the old one wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationAction {
    /// Item the action applies to
    #[serde(rename = "reply_id")]
    pub item_id: SmolStr,
    /// Blur or hide
    pub action_type: ActionType,
    /// Human-readable explanation
    pub reason: String,
    /// Label that triggered the action
    #[serde(default)]
    pub sentiment: Sentiment,
    /// When the action was decided, as sent by the backend
    #[serde(rename = "timestamp", default)]
    pub decided_at: SmolStr,
    /// Backend status string (`applied` for live actions)
    #[serde(default)]
    pub status: SmolStr,
}

impl ModerationAction {
    /// Build an action from a sentiment label using the default policy
    ///
    /// Returns `None` for labels the policy does not act on.
    pub fn synthesize(
        item_id: impl Into<SmolStr>,
        sentiment: Sentiment,
        reason: Option<&str>,
        decided_at: impl Into<SmolStr>,
        status: impl Into<SmolStr>,
    ) -> Option<Self> {
        let action_type = sentiment.default_action()?;
        Some(Self {
            item_id: item_id.into(),
            action_type,
            reason: reason
                .filter(|r| !r.trim().is_empty())
                .map(str::to_owned)
                .unwrap_or_else(|| format!("Content flagged as {}", sentiment)),
            sentiment,
            decided_at: decided_at.into(),
            status: status.into(),
        })
    }

    /// Parse the `decided_at` field
    ///
    /// Accepts RFC 3339 and the naive ISO 8601 form the backend emits, which is
    /// treated as UTC.
    pub fn decided_at_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.decided_at.as_str();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// The tagged presentation for this action
    pub fn verdict(&self) -> Verdict {
        match self.action_type {
            ActionType::Blur => Verdict::Blur {
                reason: self.reason.clone(),
            },
            ActionType::Hide => Verdict::Hide {
                reason: self.reason.clone(),
            },
        }
    }
}

/// Which layer an effective decision came from
///
/// Listed in descending precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionSource {
    /// The item's own data marks it hidden
    Hidden,
    /// Received over the push channel this session
    Live,
    /// Derived from the batch analysis payload
    Preloaded,
    /// Derived from the item's own sentiment label
    StaticDefault,
}

/// The effective decision for an item together with its source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Winning layer
    pub source: DecisionSource,
    /// The action from that layer, untouched
    pub action: ModerationAction,
}

/// Presentation verdict decided once per item
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Verdict {
    /// Display normally
    #[default]
    Reveal,
    /// Display behind a blur
    Blur {
        /// Why the item is blurred
        reason: String,
    },
    /// Do not display
    Hide {
        /// Why the item is hidden
        reason: String,
    },
}

impl Verdict {
    /// Verdict for an optional effective action
    pub fn of(action: Option<&ModerationAction>) -> Self {
        action.map(ModerationAction::verdict).unwrap_or_default()
    }

    /// Whether any moderation is applied
    pub fn is_moderated(&self) -> bool {
        !matches!(self, Verdict::Reveal)
    }
}

/// Warning text shown over blurred content
pub fn content_warning(sentiment: Sentiment) -> &'static str {
    match sentiment {
        Sentiment::Harmful => "This content may contain harmful language",
        Sentiment::Unfriendly => "This content may be negative or unfriendly",
        _ => "This content may be sensitive",
    }
}
