use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ItemId;

/// Prefix of every per-item form field, e.g. `item_12`.
pub const FIELD_KEY_PREFIX: &str = "item_";

/// The form field key under which an item's answer travels, e.g. `"item_12"`.
///
/// Used as keys in `PageAnswers`. Keys order by item id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldKey {
    item_id: ItemId,
}

/// Error returned when a string is not a valid `item_<id>` field key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid form field key: {0:?}")]
pub struct InvalidFieldKey(pub String);

impl FieldKey {
    /// Create the field key for an item.
    pub fn new(item_id: ItemId) -> Self {
        Self { item_id }
    }

    /// Get the item this key refers to.
    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    /// Parse a field key, returning `None` for anything that is not `item_<id>`.
    pub fn parse(key: &str) -> Option<Self> {
        key.strip_prefix(FIELD_KEY_PREFIX)?
            .parse::<i64>()
            .ok()
            .map(|id| Self::new(ItemId(id)))
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", FIELD_KEY_PREFIX, self.item_id)
    }
}

impl FromStr for FieldKey {
    type Err = InvalidFieldKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| InvalidFieldKey(s.to_string()))
    }
}

impl TryFrom<String> for FieldKey {
    type Error = InvalidFieldKey;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<FieldKey> for String {
    fn from(key: FieldKey) -> Self {
        key.to_string()
    }
}

impl From<ItemId> for FieldKey {
    fn from(item_id: ItemId) -> Self {
        Self::new(item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let key = FieldKey::new(ItemId(12));
        assert_eq!(format!("{}", key), "item_12");
    }

    #[test]
    fn parse() {
        let key = FieldKey::parse("item_5").unwrap();
        assert_eq!(key.item_id(), ItemId(5));
    }

    #[test]
    fn parse_rejects_foreign_keys() {
        assert!(FieldKey::parse("redirectId").is_none());
        assert!(FieldKey::parse("item_").is_none());
        assert!(FieldKey::parse("item_abc").is_none());
        assert!("navigation".parse::<FieldKey>().is_err());
    }

    #[test]
    fn serde_as_string() {
        let key = FieldKey::new(ItemId(3));
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"item_3\"");
        let back: FieldKey = serde_json::from_str("\"item_3\"").unwrap();
        assert_eq!(back, key);
    }
}
