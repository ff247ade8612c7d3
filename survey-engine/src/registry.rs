//! Item type registry: what an answer to each question type must look like.

use survey_engine_types::{AnswerShape, Item, QuestionType};

/// Scale bounds used when an item leaves `scale_min` unset.
pub const DEFAULT_SCALE_MIN: i64 = 0;

/// Scale bounds used when an item leaves `scale_max` unset.
pub const DEFAULT_SCALE_MAX: i64 = 10;

/// The structural constraint an answer to one item must satisfy.
///
/// One variant per question type; each carries the payload its check needs.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerConstraint {
    FreeText,
    SingleChoice,
    MultipleChoice,
    /// A number within `[min, max]`.
    Scale { min: i64, max: i64 },
    /// One number per statement.
    MatrixScale { statements: usize },
    LikertScale,
}

impl AnswerConstraint {
    /// The value shape this constraint accepts.
    pub fn shape(&self) -> AnswerShape {
        match self {
            Self::FreeText | Self::SingleChoice => AnswerShape::Text,
            Self::MultipleChoice => AnswerShape::TextList,
            Self::Scale { .. } | Self::LikertScale => AnswerShape::Number,
            Self::MatrixScale { .. } => AnswerShape::NumberList,
        }
    }
}

/// Whether an item contributes an entry to its page's contract.
pub fn is_answerable(item: &Item) -> bool {
    item.is_answerable()
}

/// Look up the answer constraint for an item.
///
/// `None` for items that are not answerable: non-question items and
/// questions without a question type.
pub fn resolve(item: &Item) -> Option<AnswerConstraint> {
    if !is_answerable(item) {
        return None;
    }
    item.question_type
        .map(|question_type| constraint_for(question_type, item))
}

/// Total mapping from question type to constraint.
pub fn constraint_for(question_type: QuestionType, item: &Item) -> AnswerConstraint {
    match question_type {
        QuestionType::FreeText => AnswerConstraint::FreeText,
        QuestionType::MultipleChoiceSingle => AnswerConstraint::SingleChoice,
        QuestionType::MultipleChoiceMultiple => AnswerConstraint::MultipleChoice,
        QuestionType::Scale => AnswerConstraint::Scale {
            min: item.scale_min.unwrap_or(DEFAULT_SCALE_MIN),
            max: item.scale_max.unwrap_or(DEFAULT_SCALE_MAX),
        },
        QuestionType::MatrixScale => AnswerConstraint::MatrixScale {
            statements: item.statement_count(),
        },
        QuestionType::LikertScale => AnswerConstraint::LikertScale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_engine_types::{ItemId, ItemType, PageId};

    fn question(question_type: QuestionType) -> Item {
        Item::question(ItemId(1), PageId(1), "Q", question_type)
    }

    #[test]
    fn every_question_type_resolves() {
        for question_type in QuestionType::ALL {
            assert!(resolve(&question(question_type)).is_some(), "{question_type}");
        }
    }

    #[test]
    fn scale_defaults_to_zero_ten() {
        let constraint = resolve(&question(QuestionType::Scale)).unwrap();
        assert_eq!(constraint, AnswerConstraint::Scale { min: 0, max: 10 });

        let bounded = question(QuestionType::Scale).with_scale(1, 5);
        assert_eq!(
            resolve(&bounded).unwrap(),
            AnswerConstraint::Scale { min: 1, max: 5 }
        );
    }

    #[test]
    fn matrix_counts_statements() {
        let item = question(QuestionType::MatrixScale).with_matrix(["a", "b", "c"], ["x", "y"]);
        assert_eq!(
            resolve(&item).unwrap(),
            AnswerConstraint::MatrixScale { statements: 3 }
        );
    }

    #[test]
    fn non_questions_are_skipped() {
        assert!(resolve(&Item::static_text(ItemId(1), PageId(1), "T", "text")).is_none());
        assert!(resolve(&Item::new(ItemId(2), PageId(1), "Q", ItemType::Question)).is_none());
    }

    #[test]
    fn shapes() {
        assert_eq!(AnswerConstraint::MultipleChoice.shape(), AnswerShape::TextList);
        assert_eq!(AnswerConstraint::LikertScale.shape(), AnswerShape::Number);
        assert_eq!(
            AnswerConstraint::MatrixScale { statements: 2 }.shape(),
            AnswerShape::NumberList
        );
    }
}
