use std::collections::BTreeMap;
use std::fmt;

use log::debug;
use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{AnswerId, AnswerValue, FieldKey, ItemId};

/// Error type for typed answer access.
#[derive(Debug, thiserror::Error)]
pub enum AnswerAccessError {
    #[error("Missing answer for field: {0}")]
    MissingField(FieldKey),

    #[error("Type mismatch at field '{field}': expected {expected}, got {actual}")]
    TypeMismatch {
        field: FieldKey,
        expected: &'static str,
        actual: &'static str,
    },
}

/// One form field's payload: the answer plus the id of the stored answer it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormAnswer {
    pub answer: AnswerValue,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AnswerId>,
}

impl FormAnswer {
    /// A fresh answer that has never been persisted.
    pub fn new(answer: impl Into<AnswerValue>) -> Self {
        Self {
            answer: answer.into(),
            id: None,
        }
    }

    /// An answer pre-filled from a stored answer.
    pub fn stored(answer: impl Into<AnswerValue>, id: AnswerId) -> Self {
        Self {
            answer: answer.into(),
            id: Some(id),
        }
    }
}

/// The answers of a single page, keyed by form field (`item_<id>`).
///
/// This is both the shape of a page submission and the shape of the defaults
/// handed back when a participant revisits a page. Serializes as a JSON object
/// `{ "item_3": { "answer": ..., "id": ... } }`. When deserializing, keys that
/// are not `item_<id>` (`navigation`, `redirectId`, ...) are skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PageAnswers {
    values: BTreeMap<FieldKey, FormAnswer>,
}

impl PageAnswers {
    /// Create a new empty collection.
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Insert a fresh answer for the given item.
    pub fn insert(&mut self, item_id: ItemId, value: impl Into<AnswerValue>) {
        self.values
            .insert(FieldKey::new(item_id), FormAnswer::new(value));
    }

    /// Insert a full form payload for the given item.
    pub fn insert_form(&mut self, item_id: ItemId, answer: FormAnswer) {
        self.values.insert(FieldKey::new(item_id), answer);
    }

    /// Builder-style insert.
    pub fn with(mut self, item_id: ItemId, value: impl Into<AnswerValue>) -> Self {
        self.insert(item_id, value);
        self
    }

    /// Get the form payload for an item.
    pub fn get(&self, item_id: ItemId) -> Option<&FormAnswer> {
        self.values.get(&FieldKey::new(item_id))
    }

    /// Get just the answer value for an item.
    pub fn value(&self, item_id: ItemId) -> Option<&AnswerValue> {
        self.get(item_id).map(|form| &form.answer)
    }

    /// Check if an answer exists for the given item.
    pub fn contains(&self, item_id: ItemId) -> bool {
        self.values.contains_key(&FieldKey::new(item_id))
    }

    /// Remove the answer for the given item.
    pub fn remove(&mut self, item_id: ItemId) -> Option<FormAnswer> {
        self.values.remove(&FieldKey::new(item_id))
    }

    /// Iterate over all field-answer pairs in item id order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, &FormAnswer)> {
        self.values.iter()
    }

    /// Get the number of answers.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no answers.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Merge another collection into this one. Entries of `other` win.
    pub fn extend(&mut self, other: PageAnswers) {
        self.values.extend(other.values);
    }

    /// Keep only the answers whose item satisfies the predicate.
    pub fn retain_items(&mut self, mut keep: impl FnMut(ItemId) -> bool) {
        self.values.retain(|key, _| keep(key.item_id()));
    }

    // === Convenience accessors ===

    /// Get a text answer for the given item.
    pub fn get_text(&self, item_id: ItemId) -> Result<&str, AnswerAccessError> {
        match self.value(item_id) {
            Some(AnswerValue::Text(s)) => Ok(s),
            Some(other) => Err(type_mismatch(item_id, "text", other)),
            None => Err(AnswerAccessError::MissingField(FieldKey::new(item_id))),
        }
    }

    /// Get a numeric answer for the given item.
    pub fn get_number(&self, item_id: ItemId) -> Result<f64, AnswerAccessError> {
        match self.value(item_id) {
            Some(AnswerValue::Number(n)) => Ok(*n),
            Some(other) => Err(type_mismatch(item_id, "number", other)),
            None => Err(AnswerAccessError::MissingField(FieldKey::new(item_id))),
        }
    }

    /// Get a text list answer for the given item.
    pub fn get_text_list(&self, item_id: ItemId) -> Result<&[String], AnswerAccessError> {
        match self.value(item_id) {
            Some(AnswerValue::TextList(list)) => Ok(list),
            Some(other) => Err(type_mismatch(item_id, "list of text", other)),
            None => Err(AnswerAccessError::MissingField(FieldKey::new(item_id))),
        }
    }

    /// Get a number list answer for the given item.
    pub fn get_number_list(&self, item_id: ItemId) -> Result<&[f64], AnswerAccessError> {
        match self.value(item_id) {
            Some(AnswerValue::NumberList(list)) => Ok(list),
            Some(other) => Err(type_mismatch(item_id, "list of numbers", other)),
            None => Err(AnswerAccessError::MissingField(FieldKey::new(item_id))),
        }
    }
}

fn type_mismatch(item_id: ItemId, expected: &'static str, actual: &AnswerValue) -> AnswerAccessError {
    AnswerAccessError::TypeMismatch {
        field: FieldKey::new(item_id),
        expected,
        actual: actual.type_name(),
    }
}

impl<'de> Deserialize<'de> for PageAnswers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(PageAnswersVisitor)
    }
}

struct PageAnswersVisitor;

impl<'de> Visitor<'de> for PageAnswersVisitor {
    type Value = PageAnswers;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of form fields")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<PageAnswers, A::Error> {
        let mut values = BTreeMap::new();
        while let Some(key) = map.next_key::<String>()? {
            match FieldKey::parse(&key) {
                Some(field) => {
                    values.insert(field, map.next_value::<FormAnswer>()?);
                }
                None => {
                    map.next_value::<IgnoredAny>()?;
                    debug!("skipping form field {key:?}");
                }
            }
        }
        Ok(PageAnswers { values })
    }
}

impl IntoIterator for PageAnswers {
    type Item = (FieldKey, FormAnswer);
    type IntoIter = std::collections::btree_map::IntoIter<FieldKey, FormAnswer>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<'a> IntoIterator for &'a PageAnswers {
    type Item = (&'a FieldKey, &'a FormAnswer);
    type IntoIter = std::collections::btree_map::Iter<'a, FieldKey, FormAnswer>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut answers = PageAnswers::new();
        answers.insert(ItemId(1), "Alice");
        answers.insert(ItemId(2), 4);

        assert_eq!(answers.get_text(ItemId(1)).unwrap(), "Alice");
        assert_eq!(answers.get_number(ItemId(2)).unwrap(), 4.0);
        assert!(answers.get(ItemId(1)).unwrap().id.is_none());
    }

    #[test]
    fn type_mismatch_error() {
        let answers = PageAnswers::new().with(ItemId(1), 30);

        let result = answers.get_text(ItemId(1));
        assert!(matches!(result, Err(AnswerAccessError::TypeMismatch { .. })));
        assert!(matches!(
            answers.get_number(ItemId(9)),
            Err(AnswerAccessError::MissingField(_))
        ));
    }

    #[test]
    fn deserializes_form_payload() {
        let json = r#"{
            "item_3": { "answer": 4, "id": 17 },
            "item_5": { "answer": ["a", "b"] }
        }"#;
        let answers: PageAnswers = serde_json::from_str(json).unwrap();

        assert_eq!(answers.len(), 2);
        assert_eq!(answers.get(ItemId(3)).unwrap().id, Some(AnswerId(17)));
        assert_eq!(answers.get_text_list(ItemId(5)).unwrap(), &["a", "b"]);
    }

    #[test]
    fn skips_non_item_form_fields() {
        let json = r#"{
            "item_3": { "answer": 4 },
            "redirectId": 2,
            "navigation": "finish",
            "item_x": { "answer": "not an item" }
        }"#;
        let answers: PageAnswers = serde_json::from_str(json).unwrap();

        assert_eq!(answers.len(), 1);
        assert_eq!(answers.get_number(ItemId(3)).unwrap(), 4.0);
    }

    #[test]
    fn rejects_malformed_item_payload() {
        let json = r#"{ "item_3": 4 }"#;
        assert!(serde_json::from_str::<PageAnswers>(json).is_err());
    }

    #[test]
    fn retain_items() {
        let mut answers = PageAnswers::new().with(ItemId(1), "a").with(ItemId(2), "b");
        answers.retain_items(|id| id == ItemId(2));
        assert!(!answers.contains(ItemId(1)));
        assert!(answers.contains(ItemId(2)));
    }
}
