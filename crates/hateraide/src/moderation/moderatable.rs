use super::Sentiment;
use crate::content::Reply;
use smol_str::SmolStr;

/// Content that can be run through the resolver
///
/// Supplies the static half of the decision: the item's id, the sentiment
/// label embedded in its own data, and whether its data marks it hidden.
pub trait Moderatable {
    /// Id used to look the item up in the live and preloaded layers
    fn item_id(&self) -> &str;

    /// Sentiment label carried by the item itself, if the content model has one
    fn sentiment(&self) -> Option<Sentiment> {
        None
    }

    /// Whether the item's own data hides it unconditionally
    fn is_hidden(&self) -> bool {
        false
    }

    /// Timestamp stamped onto actions synthesized from this item
    fn timestamp(&self) -> Option<&str> {
        None
    }
}

impl Moderatable for Reply {
    fn item_id(&self) -> &str {
        &self.id
    }

    fn sentiment(&self) -> Option<Sentiment> {
        Some(self.sentiment)
    }

    fn is_hidden(&self) -> bool {
        self.hidden
    }

    fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }
}

impl Moderatable for str {
    fn item_id(&self) -> &str {
        self
    }
}

impl Moderatable for SmolStr {
    fn item_id(&self) -> &str {
        self
    }
}

/// Static facts about an item, captured when content is registered with a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFacts {
    /// Item id
    pub id: SmolStr,
    /// Embedded sentiment label
    pub sentiment: Option<Sentiment>,
    /// Statically hidden
    pub hidden: bool,
    /// Item timestamp
    pub timestamp: Option<SmolStr>,
}

impl StaticFacts {
    /// Capture the static facts of any moderatable item
    pub fn of<T: Moderatable + ?Sized>(item: &T) -> Self {
        Self {
            id: SmolStr::new(item.item_id()),
            sentiment: item.sentiment(),
            hidden: item.is_hidden(),
            timestamp: item.timestamp().map(SmolStr::new),
        }
    }
}

impl Moderatable for StaticFacts {
    fn item_id(&self) -> &str {
        &self.id
    }

    fn sentiment(&self) -> Option<Sentiment> {
        self.sentiment
    }

    fn is_hidden(&self) -> bool {
        self.hidden
    }

    fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }
}
