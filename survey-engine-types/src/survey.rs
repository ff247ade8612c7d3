use serde::{Deserialize, Serialize};

use crate::{Item, ItemId, PageId, PageOrderError, ProjectId, SurveyId};

/// An ordered step within a survey, presented as one screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,

    pub survey_id: SurveyId,

    /// 1-based position within the survey.
    pub order: u32,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub application_enabled: bool,

    /// When set, participants standing on this page cannot go back.
    #[serde(default)]
    pub back_button_disabled: bool,

    /// Items in display order.
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Page {
    /// Create an empty page.
    pub fn new(id: PageId, survey_id: SurveyId, order: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            survey_id,
            order,
            name: name.into(),
            description: None,
            application_enabled: false,
            back_button_disabled: false,
            items: Vec::new(),
        }
    }

    /// Set the items.
    pub fn with_items(mut self, items: Vec<Item>) -> Self {
        self.items = items;
        self
    }

    /// Add a single item.
    pub fn with_item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }

    /// Disable (or re-enable) the back button on this page.
    pub fn with_back_button_disabled(mut self, disabled: bool) -> Self {
        self.back_button_disabled = disabled;
        self
    }

    /// Get an item by id.
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Items that collect an answer, in display order.
    pub fn answerable_items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(|item| item.is_answerable())
    }
}

/// A survey: a title plus an arena of pages ordered by their `order` field.
///
/// Page orders are always unique and contiguous from 1. This is checked when
/// a survey is built or deserialized and after every mutation; mutations
/// renumber pages to keep the sequence contiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SurveyRecord")]
pub struct Survey {
    pub id: SurveyId,

    pub project_id: ProjectId,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pages: Vec<Page>,
}

/// Unchecked wire form of a survey.
#[derive(Deserialize)]
struct SurveyRecord {
    id: SurveyId,
    project_id: ProjectId,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    pages: Vec<Page>,
}

impl TryFrom<SurveyRecord> for Survey {
    type Error = PageOrderError;

    fn try_from(record: SurveyRecord) -> Result<Self, Self::Error> {
        let mut survey = Survey::new(record.id, record.project_id, record.title, record.pages)?;
        survey.description = record.description;
        Ok(survey)
    }
}

impl Survey {
    /// Create a survey from pages in any order.
    ///
    /// Pages are sorted by `order`; the orders must be exactly `1..=N`.
    pub fn new(
        id: SurveyId,
        project_id: ProjectId,
        title: impl Into<String>,
        mut pages: Vec<Page>,
    ) -> Result<Self, PageOrderError> {
        pages.sort_by_key(|page| page.order);
        check_page_order(&pages)?;
        Ok(Self {
            id,
            project_id,
            title: title.into(),
            description: None,
            pages,
        })
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// All pages, in order.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Get the page at a 1-based position.
    pub fn page(&self, order: u32) -> Option<&Page> {
        let index = usize::try_from(order).ok()?.checked_sub(1)?;
        self.pages.get(index)
    }

    /// Get a page by id.
    pub fn page_by_id(&self, id: PageId) -> Option<&Page> {
        self.pages.iter().find(|page| page.id == id)
    }

    /// Number of pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Check if the survey has no pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Append a page at the end, assigning it the next order.
    pub fn push_page(&mut self, mut page: Page) -> Result<(), PageOrderError> {
        page.survey_id = self.id;
        self.pages.push(page);
        self.renumber()
    }

    /// Remove the page at a 1-based position and close the gap.
    pub fn remove_page(&mut self, order: u32) -> Result<Page, PageOrderError> {
        let index = self.index_of(order)?;
        let page = self.pages.remove(index);
        self.renumber()?;
        Ok(page)
    }

    /// Move the page at position `from` to position `to`, shifting the others.
    pub fn move_page(&mut self, from: u32, to: u32) -> Result<(), PageOrderError> {
        let from_index = self.index_of(from)?;
        let to_index = self.index_of(to)?;
        let page = self.pages.remove(from_index);
        self.pages.insert(to_index, page);
        self.renumber()
    }

    fn index_of(&self, order: u32) -> Result<usize, PageOrderError> {
        match self.page(order) {
            Some(_) => Ok(order as usize - 1),
            None => Err(PageOrderError::OutOfRange {
                order,
                len: self.pages.len(),
            }),
        }
    }

    fn renumber(&mut self) -> Result<(), PageOrderError> {
        for (position, page) in (1u32..).zip(self.pages.iter_mut()) {
            page.order = position;
        }
        check_page_order(&self.pages)
    }
}

/// Check that sorted pages carry the orders `1..=N` exactly once each.
pub fn check_page_order(pages: &[Page]) -> Result<(), PageOrderError> {
    for (expected, page) in (1u32..).zip(pages) {
        if page.order == expected {
            continue;
        }
        if expected > 1 && page.order == expected - 1 {
            return Err(PageOrderError::Duplicate(page.order));
        }
        return Err(PageOrderError::Gap {
            expected,
            found: page.order,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(id: i64, order: u32) -> Page {
        Page::new(PageId(id), SurveyId(1), order, format!("Page {order}"))
    }

    fn survey(pages: Vec<Page>) -> Result<Survey, PageOrderError> {
        Survey::new(SurveyId(1), ProjectId(1), "Survey", pages)
    }

    #[test]
    fn sorts_pages_by_order() {
        let survey = survey(vec![page(20, 2), page(10, 1)]).unwrap();
        assert_eq!(survey.page(1).unwrap().id, PageId(10));
        assert_eq!(survey.page(2).unwrap().id, PageId(20));
        assert!(survey.page(0).is_none());
        assert!(survey.page(3).is_none());
    }

    #[test]
    fn rejects_duplicate_orders() {
        let result = survey(vec![page(1, 1), page(2, 1)]);
        assert_eq!(result.unwrap_err(), PageOrderError::Duplicate(1));
    }

    #[test]
    fn rejects_gaps() {
        let result = survey(vec![page(1, 1), page(2, 3)]);
        assert_eq!(
            result.unwrap_err(),
            PageOrderError::Gap {
                expected: 2,
                found: 3
            }
        );
        assert!(survey(vec![page(1, 2)]).is_err());
    }

    #[test]
    fn mutations_keep_orders_contiguous() {
        let mut survey = survey(vec![page(1, 1), page(2, 2), page(3, 3)]).unwrap();

        survey.push_page(page(4, 99)).unwrap();
        assert_eq!(survey.page(4).unwrap().id, PageId(4));

        let removed = survey.remove_page(2).unwrap();
        assert_eq!(removed.id, PageId(2));
        let orders: Vec<_> = survey.pages().iter().map(|p| (p.id.get(), p.order)).collect();
        assert_eq!(orders, vec![(1, 1), (3, 2), (4, 3)]);

        survey.move_page(3, 1).unwrap();
        let ids: Vec<_> = survey.pages().iter().map(|p| p.id.get()).collect();
        assert_eq!(ids, vec![4, 1, 3]);
        assert!(check_page_order(survey.pages()).is_ok());

        assert!(survey.remove_page(7).is_err());
    }

    #[test]
    fn deserialization_checks_order() {
        let json = r#"{"id":1,"project_id":2,"title":"S","pages":[
            {"id":5,"survey_id":1,"order":1,"name":"a"},
            {"id":6,"survey_id":1,"order":1,"name":"b"}
        ]}"#;
        assert!(serde_json::from_str::<Survey>(json).is_err());

        let json = r#"{"id":1,"project_id":2,"title":"S","pages":[
            {"id":6,"survey_id":1,"order":2,"name":"b"},
            {"id":5,"survey_id":1,"order":1,"name":"a","back_button_disabled":true}
        ]}"#;
        let survey: Survey = serde_json::from_str(json).unwrap();
        assert_eq!(survey.len(), 2);
        assert!(survey.page(1).unwrap().back_button_disabled);
    }
}
