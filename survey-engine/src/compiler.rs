//! Compiles a page into the validation contract for its answers.

use log::debug;
use survey_engine_types::{AnswerErrors, AnswerValue, ItemId, Page, PageAnswers, PageId};

use crate::registry::{self, AnswerConstraint};

/// One answerable item of a page and what its answer must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractEntry {
    pub item_id: ItemId,
    pub constraint: AnswerConstraint,
}

/// The validation contract for one page.
///
/// Covers exactly the answerable items of the page, in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct PageContract {
    page_id: PageId,
    entries: Vec<ContractEntry>,
}

/// Build the contract for a page.
pub fn compile(page: &Page) -> PageContract {
    let entries: Vec<_> = page
        .items
        .iter()
        .filter_map(|item| {
            registry::resolve(item).map(|constraint| ContractEntry {
                item_id: item.id,
                constraint,
            })
        })
        .collect();
    debug!(
        "compiled contract for page {}: {} of {} item(s) answerable",
        page.id,
        entries.len(),
        page.items.len()
    );
    PageContract {
        page_id: page.id,
        entries,
    }
}

impl PageContract {
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn entries(&self) -> &[ContractEntry] {
        &self.entries
    }

    /// The constraint for one item, if it is part of the contract.
    pub fn constraint(&self, item_id: ItemId) -> Option<&AnswerConstraint> {
        self.entries
            .iter()
            .find(|entry| entry.item_id == item_id)
            .map(|entry| &entry.constraint)
    }

    pub fn covers(&self, item_id: ItemId) -> bool {
        self.constraint(item_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check a submission against the contract.
    ///
    /// Every item is checked and all failures are reported together. Fields
    /// for items outside the contract are dropped from the returned answers.
    pub fn validate(&self, submitted: &PageAnswers) -> Result<PageAnswers, AnswerErrors> {
        let mut errors = AnswerErrors::default();
        for entry in &self.entries {
            match submitted.value(entry.item_id) {
                Some(value) => {
                    if let Err(message) = check_value(&entry.constraint, value) {
                        errors.push(entry.item_id, message);
                    }
                }
                None => errors.push(entry.item_id, "an answer is required"),
            }
        }

        if !errors.is_empty() {
            debug!(
                "page {} submission rejected: {} invalid answer(s)",
                self.page_id,
                errors.errors.len()
            );
            return Err(errors);
        }

        let mut accepted = submitted.clone();
        accepted.retain_items(|item_id| self.covers(item_id));
        if accepted.len() < submitted.len() {
            debug!(
                "page {}: ignored {} field(s) outside the contract",
                self.page_id,
                submitted.len() - accepted.len()
            );
        }
        Ok(accepted)
    }
}

/// Check one value against one constraint.
pub fn check_value(constraint: &AnswerConstraint, value: &AnswerValue) -> Result<(), String> {
    let shape = constraint.shape();
    if !value.matches(shape) {
        return Err(format!("expected {}, got {}", shape, value.type_name()));
    }

    match (constraint, value) {
        (AnswerConstraint::Scale { min, max }, AnswerValue::Number(n)) => {
            if *n < *min as f64 || *n > *max as f64 {
                return Err(format!("must be between {min} and {max}, got {n}"));
            }
        }
        (AnswerConstraint::MatrixScale { statements }, value) => {
            let len = value
                .as_number_list()
                .map(<[f64]>::len)
                .or_else(|| value.as_text_list().map(<[String]>::len))
                .unwrap_or(0);
            if len != *statements {
                return Err(format!(
                    "expected one rating per statement ({statements}), got {len}"
                ));
            }
        }
        _ => {}
    }
    Ok(())
}
