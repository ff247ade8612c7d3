use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ItemId, PageId};

/// What kind of content block an item is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// A question the participant answers.
    Question,

    /// A static block of text.
    StaticText,

    /// An embedded image.
    Image,

    /// An embedded video.
    Video,
}

impl ItemType {
    /// The wire name of this item type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::StaticText => "static_text",
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of question, determining the answer shape and its constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Free text input.
    FreeText,

    /// Pick exactly one of `options`.
    MultipleChoiceSingle,

    /// Pick any number of `options`.
    MultipleChoiceMultiple,

    /// A number between `scale_min` and `scale_max`.
    Scale,

    /// One rating per statement, each on the `matrix_options` scale.
    MatrixScale,

    /// A single rating on the scale given by `options`.
    LikertScale,
}

impl QuestionType {
    /// Every question type, in declaration order.
    pub const ALL: [QuestionType; 6] = [
        Self::FreeText,
        Self::MultipleChoiceSingle,
        Self::MultipleChoiceMultiple,
        Self::Scale,
        Self::MatrixScale,
        Self::LikertScale,
    ];

    /// The wire name of this question type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FreeText => "free_text",
            Self::MultipleChoiceSingle => "multiple_choice_single",
            Self::MultipleChoiceMultiple => "multiple_choice_multiple",
            Self::Scale => "scale",
            Self::MatrixScale => "matrix_scale",
            Self::LikertScale => "likert_scale",
        }
    }

    /// Whether items of this type must carry a non-empty `options` list.
    pub fn requires_options(self) -> bool {
        matches!(
            self,
            Self::MultipleChoiceSingle | Self::MultipleChoiceMultiple | Self::LikertScale
        )
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single question or static content block within a page.
///
/// The type-specific fields are optional on the wire; which of them must be
/// present depends on `item_type` and `question_type` and is checked when the
/// item is authored, not when it is answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,

    pub page_id: PageId,

    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    pub item_type: ItemType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_type: Option<QuestionType>,

    /// Choices for multiple choice and likert questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_min: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_max: Option<i64>,

    /// Rows of a matrix scale question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statements: Option<Vec<String>>,

    /// Columns of a matrix scale question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix_options: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
}

impl Item {
    /// Create an item of the given type with every optional field unset.
    pub fn new(id: ItemId, page_id: PageId, title: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            id,
            page_id,
            title: title.into(),
            prompt: None,
            item_type,
            question_type: None,
            options: None,
            scale_min: None,
            scale_max: None,
            statements: None,
            matrix_options: None,
            image_url: None,
            video_url: None,
            text_content: None,
        }
    }

    /// Create a question item.
    pub fn question(
        id: ItemId,
        page_id: PageId,
        title: impl Into<String>,
        question_type: QuestionType,
    ) -> Self {
        Self {
            question_type: Some(question_type),
            ..Self::new(id, page_id, title, ItemType::Question)
        }
    }

    /// Create a static text item.
    pub fn static_text(
        id: ItemId,
        page_id: PageId,
        title: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            text_content: Some(text.into()),
            ..Self::new(id, page_id, title, ItemType::StaticText)
        }
    }

    /// Create an image item.
    pub fn image(id: ItemId, page_id: PageId, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            image_url: Some(url.into()),
            ..Self::new(id, page_id, title, ItemType::Image)
        }
    }

    /// Create a video item.
    pub fn video(id: ItemId, page_id: PageId, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            video_url: Some(url.into()),
            ..Self::new(id, page_id, title, ItemType::Video)
        }
    }

    /// Set the prompt shown under the title.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Set the choice options.
    pub fn with_options<S: Into<String>>(mut self, options: impl IntoIterator<Item = S>) -> Self {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    /// Set the scale bounds.
    pub fn with_scale(mut self, min: i64, max: i64) -> Self {
        self.scale_min = Some(min);
        self.scale_max = Some(max);
        self
    }

    /// Set the matrix statements (rows) and options (columns).
    pub fn with_matrix<S: Into<String>, O: Into<String>>(
        mut self,
        statements: impl IntoIterator<Item = S>,
        options: impl IntoIterator<Item = O>,
    ) -> Self {
        self.statements = Some(statements.into_iter().map(Into::into).collect());
        self.matrix_options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    /// Whether this item collects an answer: a question with a known question type.
    ///
    /// Static text, images and videos are never answerable.
    pub fn is_answerable(&self) -> bool {
        self.item_type == ItemType::Question && self.question_type.is_some()
    }

    /// Number of matrix statements, zero when unset.
    pub fn statement_count(&self) -> usize {
        self.statements.as_ref().map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answerable_items() {
        let page = PageId(1);
        assert!(Item::question(ItemId(1), page, "Q", QuestionType::FreeText).is_answerable());
        assert!(!Item::static_text(ItemId(2), page, "T", "hello").is_answerable());
        assert!(!Item::image(ItemId(3), page, "I", "http://img").is_answerable());
        assert!(!Item::video(ItemId(4), page, "V", "http://vid").is_answerable());
        assert!(!Item::new(ItemId(5), page, "Q", ItemType::Question).is_answerable());
    }

    #[test]
    fn deserializes_wire_item() {
        let json = r#"{
            "id": 4,
            "page_id": 2,
            "title": "How much?",
            "item_type": "question",
            "question_type": "matrix_scale",
            "statements": ["a", "b", "c"],
            "matrix_options": ["low", "high"]
        }"#;
        let item: Item = serde_json::from_str(json).unwrap();

        assert_eq!(item.question_type, Some(QuestionType::MatrixScale));
        assert_eq!(item.statement_count(), 3);
        assert!(item.scale_min.is_none());
    }

    #[test]
    fn wire_names() {
        for question_type in QuestionType::ALL {
            let json = serde_json::to_string(&question_type).unwrap();
            assert_eq!(json, format!("\"{}\"", question_type.as_str()));
        }
        assert_eq!(ItemType::StaticText.to_string(), "static_text");
    }
}
