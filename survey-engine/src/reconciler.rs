//! Maps between stored answers and page form data.
//!
//! The read path turns stored answers into form defaults so a revisited page
//! shows prior responses. The write path turns a validated submission into
//! create/update calls, keyed by (item, participant) so resubmitting never
//! duplicates answers.

use std::collections::HashMap;

use log::{debug, warn};
use survey_engine_types::{
    Answer, AnswerId, EngineError, FormAnswer, ItemId, NewAnswer, Page, PageAnswers,
    ParticipantId, SurveyStore,
};

/// One persistence call decided by the write path.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerWrite {
    Create(NewAnswer),
    Update { id: AnswerId, answer: NewAnswer },
}

impl AnswerWrite {
    pub fn item_id(&self) -> ItemId {
        self.answer().item_id
    }

    pub fn answer(&self) -> &NewAnswer {
        match self {
            Self::Create(answer) | Self::Update { answer, .. } => answer,
        }
    }
}

/// Index of a participant's stored answers by item.
///
/// When the store holds several answers for one item (two first submissions
/// racing each other), the one with the highest id is kept.
fn latest_by_item(
    participant_id: ParticipantId,
    stored: &[Answer],
) -> HashMap<ItemId, &Answer> {
    let mut latest: HashMap<ItemId, &Answer> = HashMap::new();
    for answer in stored
        .iter()
        .filter(|answer| answer.participant_id == participant_id)
    {
        latest
            .entry(answer.item_id)
            .and_modify(|current| {
                if answer.id > current.id {
                    *current = answer;
                }
            })
            .or_insert(answer);
    }
    latest
}

/// Form defaults for a page from the participant's stored answers.
///
/// Only answers whose (item, page) pair belongs to this page are used.
pub fn prefill(page: &Page, participant_id: ParticipantId, stored: &[Answer]) -> PageAnswers {
    let latest = latest_by_item(participant_id, stored);
    let mut defaults = PageAnswers::new();
    for item in &page.items {
        if let Some(answer) = latest.get(&item.id).filter(|a| a.page_id == page.id) {
            defaults.insert_form(item.id, FormAnswer::stored(answer.value.clone(), answer.id));
        }
    }
    debug!(
        "prefilled {} of {} item(s) on page {} for participant {}",
        defaults.len(),
        page.items.len(),
        page.id,
        participant_id
    );
    defaults
}

/// Decide create-vs-update for every answered item of a validated submission.
///
/// Writes come out in the page's item order. The id to update is taken from
/// the stored answers; an id sent by the client is only a hint and is ignored
/// when it disagrees.
pub fn plan(
    page: &Page,
    participant_id: ParticipantId,
    validated: &PageAnswers,
    stored: &[Answer],
) -> Vec<AnswerWrite> {
    let latest = latest_by_item(participant_id, stored);
    let mut writes = Vec::new();

    for item in page.answerable_items() {
        let Some(form) = validated.get(item.id) else {
            continue;
        };
        let answer = NewAnswer {
            item_id: item.id,
            participant_id,
            page_id: page.id,
            value: form.answer.clone(),
        };
        let known = latest.get(&item.id).map(|stored| stored.id);

        if let Some(client_id) = form.id
            && known != Some(client_id)
        {
            warn!(
                "ignoring answer id {} sent for item {}; stored id is {:?}",
                client_id, item.id, known
            );
        }

        writes.push(match known {
            Some(id) => AnswerWrite::Update { id, answer },
            None => AnswerWrite::Create(answer),
        });
    }
    writes
}

/// Execute planned writes in order, stopping at the first failure.
///
/// Returns the persisted answers. A failure names the item and page whose
/// write broke; writes after it are not attempted.
pub async fn apply<S>(store: &S, writes: Vec<AnswerWrite>) -> Result<Vec<Answer>, EngineError>
where
    S: SurveyStore + ?Sized,
{
    let mut saved = Vec::with_capacity(writes.len());
    for write in writes {
        let result = match &write {
            AnswerWrite::Create(answer) => store.create_answer(answer).await,
            AnswerWrite::Update { id, answer } => store.update_answer(*id, answer).await,
        };
        match result {
            Ok(answer) => saved.push(answer),
            Err(source) => {
                let answer = write.answer();
                warn!(
                    "aborting submission after {} saved answer(s): {}",
                    saved.len(),
                    source
                );
                return Err(EngineError::AnswerWrite {
                    item_id: answer.item_id,
                    page_id: answer.page_id,
                    source,
                });
            }
        }
    }
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_engine_types::{AnswerValue, Item, PageId, QuestionType, SurveyId};

    const ALICE: ParticipantId = ParticipantId(1);
    const BOB: ParticipantId = ParticipantId(2);

    fn page() -> Page {
        let page_id = PageId(10);
        Page::new(page_id, SurveyId(1), 1, "Page").with_items(vec![
            Item::question(ItemId(1), page_id, "Name", QuestionType::FreeText),
            Item::static_text(ItemId(2), page_id, "Intro", "Hi"),
            Item::question(ItemId(3), page_id, "Rate", QuestionType::Scale).with_scale(1, 5),
        ])
    }

    fn stored(id: i64, item: i64, participant: ParticipantId, page: i64, value: AnswerValue) -> Answer {
        Answer {
            id: AnswerId(id),
            item_id: ItemId(item),
            participant_id: participant,
            page_id: PageId(page),
            value,
        }
    }

    #[test]
    fn prefill_matches_item_and_page() {
        let answers = vec![
            stored(100, 1, ALICE, 10, "Alice".into()),
            stored(101, 3, ALICE, 99, 4.into()),
            stored(102, 7, ALICE, 10, "other item".into()),
            stored(103, 3, BOB, 10, 2.into()),
        ];
        let defaults = prefill(&page(), ALICE, &answers);

        assert_eq!(defaults.len(), 1);
        assert_eq!(
            defaults.get(ItemId(1)),
            Some(&FormAnswer::stored("Alice", AnswerId(100)))
        );
    }

    #[test]
    fn plan_creates_then_updates() {
        let submission = PageAnswers::new().with(ItemId(1), "Alice").with(ItemId(3), 4);

        let writes = plan(&page(), ALICE, &submission, &[]);
        assert!(writes.iter().all(|w| matches!(w, AnswerWrite::Create(_))));
        assert_eq!(
            writes.iter().map(AnswerWrite::item_id).collect::<Vec<_>>(),
            vec![ItemId(1), ItemId(3)]
        );

        let answers = vec![stored(100, 1, ALICE, 10, "Al".into())];
        let writes = plan(&page(), ALICE, &submission, &answers);
        assert!(matches!(writes[0], AnswerWrite::Update { id: AnswerId(100), .. }));
        assert!(matches!(writes[1], AnswerWrite::Create(_)));
    }

    #[test]
    fn plan_ignores_foreign_client_ids() {
        let mut submission = PageAnswers::new();
        submission.insert_form(ItemId(1), FormAnswer::stored("Alice", AnswerId(555)));

        let answers = vec![stored(103, 1, BOB, 10, "Bob".into())];
        let writes = plan(&page(), ALICE, &submission, &answers);
        assert!(matches!(writes[0], AnswerWrite::Create(_)));
    }

    #[test]
    fn plan_uses_latest_duplicate() {
        let submission = PageAnswers::new().with(ItemId(1), "Alice");
        let answers = vec![
            stored(100, 1, ALICE, 10, "a".into()),
            stored(104, 1, ALICE, 10, "b".into()),
            stored(102, 1, ALICE, 10, "c".into()),
        ];
        let writes = plan(&page(), ALICE, &submission, &answers);
        assert!(matches!(writes[0], AnswerWrite::Update { id: AnswerId(104), .. }));
    }

    #[test]
    fn plan_skips_non_answerable_and_missing() {
        let submission = PageAnswers::new().with(ItemId(2), "x").with(ItemId(3), 2);
        let writes = plan(&page(), ALICE, &submission, &[]);
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].item_id(), ItemId(3));
        assert_eq!(writes[0].answer().page_id, PageId(10));
    }
}
