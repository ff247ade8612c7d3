//! Authoring-time rules: which type-specific fields an item must carry.
//!
//! These run when an item, page or survey is created or edited, never when a
//! participant answers. Every rule is evaluated and all violations are
//! returned together so an editor sees every problem in one pass.

use survey_engine_types::{AuthoringErrors, Item, ItemId, ItemType, Page, QuestionType, Survey};

/// Authoring failures of a page: `None` for the page's own fields, the item id otherwise.
pub type PageAuthoringErrors = Vec<(Option<ItemId>, AuthoringErrors)>;

/// Check that an item is well-formed for its item and question type.
pub fn validate_item(item: &Item) -> Result<(), AuthoringErrors> {
    let mut errors = AuthoringErrors::default();

    if item.title.trim().is_empty() {
        errors.push("title", "Title is required");
    }

    match item.item_type {
        ItemType::Question => match item.question_type {
            Some(question_type) => check_question_fields(item, question_type, &mut errors),
            None => errors.push(
                "question_type",
                "Question type is required for question items",
            ),
        },
        ItemType::StaticText => {
            if is_blank(&item.text_content) {
                errors.push(
                    "text_content",
                    "Text content is required for static text items",
                );
            }
        }
        ItemType::Image => {
            if is_blank(&item.image_url) {
                errors.push("image_url", "Image URL is required for image items");
            }
        }
        ItemType::Video => {
            if is_blank(&item.video_url) {
                errors.push("video_url", "Video URL is required for video items");
            }
        }
    }

    errors.into_result()
}

fn check_question_fields(item: &Item, question_type: QuestionType, errors: &mut AuthoringErrors) {
    if question_type.requires_options() && is_empty_list(&item.options) {
        errors.push(
            "options",
            "Options are required for multiple choice and Likert scale questions",
        );
    }

    match question_type {
        QuestionType::Scale => match (item.scale_min, item.scale_max) {
            (Some(min), Some(max)) if min > max => {
                errors.push(
                    "scale_min",
                    format!("Scale min ({min}) must not exceed scale max ({max})"),
                );
            }
            (Some(_), Some(_)) => {}
            (min, max) => {
                let message = "Scale min and max are required for scale questions";
                if min.is_none() {
                    errors.push("scale_min", message);
                }
                if max.is_none() {
                    errors.push("scale_max", message);
                }
            }
        },
        QuestionType::MatrixScale => {
            if is_empty_list(&item.statements) || is_empty_list(&item.matrix_options) {
                let message =
                    "Statements and matrix options are required for matrix scale questions";
                errors.push("statements", message);
                errors.push("matrix_options", message);
            }
        }
        QuestionType::FreeText
        | QuestionType::MultipleChoiceSingle
        | QuestionType::MultipleChoiceMultiple
        | QuestionType::LikertScale => {}
    }
}

/// Check a page's own fields and every item on it.
pub fn validate_page(page: &Page) -> Result<(), PageAuthoringErrors> {
    let mut failures = Vec::new();

    let mut own = AuthoringErrors::default();
    if page.name.trim().is_empty() {
        own.push("name", "Name is required");
    }
    if !own.is_empty() {
        failures.push((None, own));
    }

    for item in &page.items {
        if let Err(errors) = validate_item(item) {
            failures.push((Some(item.id), errors));
        }
    }

    if failures.is_empty() { Ok(()) } else { Err(failures) }
}

/// Check a survey's own fields.
pub fn validate_survey(survey: &Survey) -> Result<(), AuthoringErrors> {
    let mut errors = AuthoringErrors::default();
    if survey.title.trim().is_empty() {
        errors.push("title", "Title is required");
    }
    errors.into_result()
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|s| s.trim().is_empty())
}

fn is_empty_list(value: &Option<Vec<String>>) -> bool {
    value.as_ref().is_none_or(Vec::is_empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_engine_types::{PageId, ProjectId, SurveyId};

    fn item(item_type: ItemType) -> Item {
        Item::new(ItemId(1), PageId(1), "Title", item_type)
    }

    fn question(question_type: QuestionType) -> Item {
        Item::question(ItemId(1), PageId(1), "Title", question_type)
    }

    #[test]
    fn question_requires_question_type() {
        let errors = validate_item(&item(ItemType::Question)).unwrap_err();
        assert_eq!(errors.fields(), vec!["question_type"]);
    }

    #[test]
    fn content_items_require_their_payload() {
        assert_eq!(
            validate_item(&item(ItemType::StaticText)).unwrap_err().fields(),
            vec!["text_content"]
        );
        assert_eq!(
            validate_item(&item(ItemType::Image)).unwrap_err().fields(),
            vec!["image_url"]
        );
        assert_eq!(
            validate_item(&item(ItemType::Video)).unwrap_err().fields(),
            vec!["video_url"]
        );
        assert!(validate_item(&Item::image(ItemId(1), PageId(1), "I", "https://img")).is_ok());
    }

    #[test]
    fn choice_questions_require_options() {
        for question_type in [
            QuestionType::MultipleChoiceSingle,
            QuestionType::MultipleChoiceMultiple,
            QuestionType::LikertScale,
        ] {
            let errors = validate_item(&question(question_type)).unwrap_err();
            assert_eq!(errors.fields(), vec!["options"]);

            let empty = question(question_type).with_options(Vec::<String>::new());
            assert!(validate_item(&empty).is_err());

            let filled = question(question_type).with_options(["a", "b"]);
            assert!(validate_item(&filled).is_ok());
        }
    }

    #[test]
    fn scale_requires_both_bounds() {
        let errors = validate_item(&question(QuestionType::Scale)).unwrap_err();
        assert_eq!(errors.fields(), vec!["scale_min", "scale_max"]);

        let mut half = question(QuestionType::Scale);
        half.scale_min = Some(1);
        assert_eq!(validate_item(&half).unwrap_err().fields(), vec!["scale_max"]);

        let mut lower_missing = question(QuestionType::Scale);
        lower_missing.scale_max = Some(7);
        assert_eq!(
            validate_item(&lower_missing).unwrap_err().fields(),
            vec!["scale_min"]
        );

        assert!(validate_item(&question(QuestionType::Scale).with_scale(1, 5)).is_ok());
        assert!(validate_item(&question(QuestionType::Scale).with_scale(5, 1)).is_err());
    }

    #[test]
    fn matrix_requires_statements_and_options() {
        let errors = validate_item(&question(QuestionType::MatrixScale)).unwrap_err();
        assert_eq!(errors.fields(), vec!["statements", "matrix_options"]);

        let ok = question(QuestionType::MatrixScale).with_matrix(["s"], ["o"]);
        assert!(validate_item(&ok).is_ok());
    }

    #[test]
    fn reports_all_violations_at_once() {
        let mut broken = question(QuestionType::Scale);
        broken.title = "  ".into();
        let errors = validate_item(&broken).unwrap_err();
        assert_eq!(errors.fields(), vec!["title", "scale_min", "scale_max"]);
    }

    #[test]
    fn free_text_needs_nothing_else() {
        assert!(validate_item(&question(QuestionType::FreeText)).is_ok());
    }

    #[test]
    fn page_and_survey_fields() {
        let page = Page::new(PageId(1), SurveyId(1), 1, "")
            .with_item(question(QuestionType::FreeText))
            .with_item(Item::new(ItemId(2), PageId(1), "Broken", ItemType::Question));
        let failures = validate_page(&page).unwrap_err();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].0, None);
        assert_eq!(failures[1].0, Some(ItemId(2)));

        let survey = Survey::new(SurveyId(1), ProjectId(1), "", Vec::new()).unwrap();
        assert!(validate_survey(&survey).unwrap_err().has_field("title"));
    }
}
