use std::fmt;

use serde::{Deserialize, Serialize};

/// A single answer value submitted for, or stored against, an item.
///
/// Serialized untagged, so it travels as plain JSON: `"text"`, `3`,
/// `["a", "b"]` or `[1, 2]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    /// A string value (free text, single choice).
    Text(String),

    /// A numeric value (scale, likert scale).
    Number(f64),

    /// A list of strings (multiple choice with several selections).
    TextList(Vec<String>),

    /// A list of numbers (one rating per statement of a matrix scale).
    NumberList(Vec<f64>),
}

/// The structural shape an answer value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnswerShape {
    Text,
    Number,
    TextList,
    NumberList,
}

impl AnswerShape {
    /// Human readable name used in validation messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::TextList => "list of text",
            Self::NumberList => "list of numbers",
        }
    }
}

impl fmt::Display for AnswerShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl AnswerValue {
    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Try to get this value as a list of strings.
    pub fn as_text_list(&self) -> Option<&[String]> {
        match self {
            Self::TextList(list) => Some(list),
            _ => None,
        }
    }

    /// Try to get this value as a list of numbers.
    pub fn as_number_list(&self) -> Option<&[f64]> {
        match self {
            Self::NumberList(list) => Some(list),
            _ => None,
        }
    }

    /// The shape of this value.
    pub fn shape(&self) -> AnswerShape {
        match self {
            Self::Text(_) => AnswerShape::Text,
            Self::Number(_) => AnswerShape::Number,
            Self::TextList(_) => AnswerShape::TextList,
            Self::NumberList(_) => AnswerShape::NumberList,
        }
    }

    /// Check whether this value has the given shape.
    ///
    /// An empty JSON array carries no element type, so it matches both list shapes.
    pub fn matches(&self, shape: AnswerShape) -> bool {
        match (self, shape) {
            (Self::TextList(list), AnswerShape::NumberList) => list.is_empty(),
            (Self::NumberList(list), AnswerShape::TextList) => list.is_empty(),
            _ => self.shape() == shape,
        }
    }

    /// Get the type name of this value for error messages.
    pub fn type_name(&self) -> &'static str {
        self.shape().name()
    }
}

impl From<String> for AnswerValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for AnswerValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<f64> for AnswerValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for AnswerValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<i32> for AnswerValue {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<Vec<String>> for AnswerValue {
    fn from(list: Vec<String>) -> Self {
        Self::TextList(list)
    }
}

impl From<Vec<&str>> for AnswerValue {
    fn from(list: Vec<&str>) -> Self {
        Self::TextList(list.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<f64>> for AnswerValue {
    fn from(list: Vec<f64>) -> Self {
        Self::NumberList(list)
    }
}
