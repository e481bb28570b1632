use super::{Decision, DecisionSource, Moderatable, ModerationAction, Sentiment};
use smol_str::SmolStr;
use std::collections::HashMap;

/// Keyed layer of moderation actions
pub type ActionLayer = HashMap<SmolStr, ModerationAction>;

/// Reason attached to items whose own data hides them
pub const HIDDEN_REASON: &str = "This content has been hidden";

/// Status stamped onto actions produced by the static hidden override
pub const STATUS_HIDDEN: &str = "hidden";
/// Status stamped onto actions synthesized from an item's own sentiment label
pub const STATUS_DEFAULT: &str = "default";

/// Compute the single effective action for an item
///
/// Precedence, first match wins:
///
/// 0. the item's own data marks it hidden: always hide, with [`HIDDEN_REASON`]
/// 1. a live action for the item
/// 2. a preloaded action for the item
/// 3. an action synthesized from the item's own sentiment label
///
/// Whole actions come from exactly one layer. This never fails; `None` means
/// the item displays normally.
///
/// # Example
///
/// ```
/// # use hateraide::moderation::*;
/// let live = ActionLayer::new();
/// let preloaded = ActionLayer::new();
/// assert!(resolve("r1", &live, &preloaded).is_none());
/// ```
pub fn resolve<T: Moderatable + ?Sized>(
    item: &T,
    live: &ActionLayer,
    preloaded: &ActionLayer,
) -> Option<ModerationAction> {
    resolve_decision(item, live, preloaded).map(|decision| decision.action)
}

/// Same as [`resolve`], but also reports which layer won
pub fn resolve_decision<T: Moderatable + ?Sized>(
    item: &T,
    live: &ActionLayer,
    preloaded: &ActionLayer,
) -> Option<Decision> {
    let id = item.item_id();

    if item.is_hidden() {
        return Some(Decision {
            source: DecisionSource::Hidden,
            action: hidden_action(item),
        });
    }

    if let Some(action) = live.get(id) {
        return Some(Decision {
            source: DecisionSource::Live,
            action: action.clone(),
        });
    }

    if let Some(action) = preloaded.get(id) {
        return Some(Decision {
            source: DecisionSource::Preloaded,
            action: action.clone(),
        });
    }

    static_default(item).map(|action| Decision {
        source: DecisionSource::StaticDefault,
        action,
    })
}

/// Action derived from the item's own sentiment label, if any
pub fn static_default<T: Moderatable + ?Sized>(item: &T) -> Option<ModerationAction> {
    let sentiment = item.sentiment()?;
    ModerationAction::synthesize(
        item.item_id(),
        sentiment,
        None,
        item.timestamp().unwrap_or_default(),
        STATUS_DEFAULT,
    )
}

fn hidden_action<T: Moderatable + ?Sized>(item: &T) -> ModerationAction {
    ModerationAction {
        item_id: SmolStr::new(item.item_id()),
        action_type: super::ActionType::Hide,
        reason: HIDDEN_REASON.to_owned(),
        sentiment: item.sentiment().unwrap_or(Sentiment::Unknown),
        decided_at: item.timestamp().map(SmolStr::new).unwrap_or_default(),
        status: SmolStr::new_static(STATUS_HIDDEN),
    }
}

/// Resolve every item in a slice
///
/// # Example
///
/// ```
/// # use hateraide::moderation::*;
/// # use hateraide::content::Reply;
/// # fn example(replies: &[Reply], live: &ActionLayer, preloaded: &ActionLayer) {
/// for (reply, action) in resolve_all(replies, live, preloaded) {
///     if action.is_some() {
///         // render with moderation applied
///     }
/// }
/// # }
/// ```
pub fn resolve_all<'a, T: Moderatable>(
    items: &'a [T],
    live: &ActionLayer,
    preloaded: &ActionLayer,
) -> Vec<(&'a T, Option<ModerationAction>)> {
    items
        .iter()
        .map(|item| (item, resolve(item, live, preloaded)))
        .collect()
}

/// Extension trait for resolving decisions over iterators
pub trait ResolveIterExt<'a, T: Moderatable + 'a>: Iterator<Item = &'a T> + Sized {
    /// Pair each item with its effective action
    fn with_decisions(
        self,
        live: &'a ActionLayer,
        preloaded: &'a ActionLayer,
    ) -> impl Iterator<Item = (&'a T, Option<ModerationAction>)> {
        self.map(move |item| (item, resolve(item, live, preloaded)))
    }

    /// Drop items whose effective action hides them
    fn filter_hidden(
        self,
        live: &'a ActionLayer,
        preloaded: &'a ActionLayer,
    ) -> impl Iterator<Item = &'a T> {
        self.filter(move |item| {
            !matches!(
                resolve(*item, live, preloaded),
                Some(ModerationAction {
                    action_type: super::ActionType::Hide,
                    ..
                })
            )
        })
    }
}

impl<'a, T: Moderatable + 'a, I: Iterator<Item = &'a T>> ResolveIterExt<'a, T> for I {}
