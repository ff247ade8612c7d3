//! In-memory store for running the engine without a backend.
//!
//! `MemoryStore` implements both [`SurveyStore`] and [`SessionIssuer`] over
//! plain collections. It can be told to fail chosen operations, which makes
//! it the workhorse of the engine's tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use survey_engine::{MemoryStore, StoreOperation, SurveyEngine};
//!
//! let store = MemoryStore::new()
//!     .with_survey(survey)
//!     .with_publication(publication)
//!     .failing_after(StoreOperation::CreateAnswer, 1);
//!
//! let engine = SurveyEngine::new(store.clone(), store);
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use log::trace;
use tokio::sync::Mutex;
use uuid::Uuid;

use survey_engine_types::{
    Answer, AnswerId, Deployment, Item, ItemId, NewAnswer, NewParticipant, Page, PageId,
    Participant, ParticipantId, ProjectId, Publication, PublicationId, Session, SessionCookie,
    SessionIssuer, StoreError, StoreOperation, Survey, SurveyStore,
};

/// Name of the session cookie handed out by [`MemoryStore`].
pub const SESSION_COOKIE: &str = "authjs.session-token";

/// A store that keeps every record in memory.
///
/// Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,

    /// Operation -> number of calls that succeed before it starts failing.
    failures: HashMap<StoreOperation, usize>,
}

#[derive(Debug, Default)]
struct State {
    surveys: HashMap<ProjectId, Survey>,
    publications: HashMap<Uuid, Publication>,
    unpublished: HashSet<Uuid>,
    answers: BTreeMap<AnswerId, Answer>,
    participants: BTreeMap<ParticipantId, Participant>,
    idempotency_keys: HashMap<String, ParticipantId>,
    endpoint_suffixes: Vec<String>,
    calls: HashMap<StoreOperation, usize>,
    next_answer_id: i64,
    next_participant_id: i64,
    participants_created: usize,
    answers_created: usize,
    answers_updated: usize,
    sessions_issued: usize,
    deployments: usize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a survey, keyed by its project.
    pub fn with_survey(self, survey: Survey) -> Self {
        self.seed(|state| {
            state.surveys.insert(survey.project_id, survey);
        })
    }

    /// Add a publication reachable by its link.
    pub fn with_publication(self, publication: Publication) -> Self {
        self.seed(|state| {
            state.publications.insert(publication.link_uuid, publication);
        })
    }

    /// Add a link whose publication is withdrawn; resolving it is forbidden.
    pub fn with_unpublished_link(self, link_id: Uuid) -> Self {
        self.seed(|state| {
            state.unpublished.insert(link_id);
        })
    }

    /// Add an application endpoint; deployments report it as `<participant id><suffix>`.
    pub fn with_endpoint(self, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        self.seed(|state| state.endpoint_suffixes.push(suffix))
    }

    /// Seed an answer that already exists in the store.
    pub fn with_answer(self, answer: Answer) -> Self {
        self.seed(|state| {
            state.next_answer_id = state.next_answer_id.max(answer.id.get());
            state.answers.insert(answer.id, answer);
        })
    }

    /// Seeding must not overlap a call in flight on a clone of this store.
    fn seed(self, f: impl FnOnce(&mut State)) -> Self {
        let mut state = self
            .state
            .try_lock()
            .expect("MemoryStore seeded while a call was in flight");
        f(&mut state);
        drop(state);
        self
    }

    /// Make every call of `operation` fail.
    pub fn failing(self, operation: StoreOperation) -> Self {
        self.failing_after(operation, 0)
    }

    /// Let `successes` calls of `operation` through, then fail every later one.
    pub fn failing_after(mut self, operation: StoreOperation, successes: usize) -> Self {
        self.failures.insert(operation, successes);
        self
    }

    /// Number of participants created so far.
    pub async fn participants_created(&self) -> usize {
        self.state.lock().await.participants_created
    }

    /// Number of answers created so far.
    pub async fn answers_created(&self) -> usize {
        self.state.lock().await.answers_created
    }

    /// Number of answer updates so far.
    pub async fn answers_updated(&self) -> usize {
        self.state.lock().await.answers_updated
    }

    /// Number of sessions issued so far.
    pub async fn sessions_issued(&self) -> usize {
        self.state.lock().await.sessions_issued
    }

    /// Number of successful publication deployments so far.
    pub async fn deployments(&self) -> usize {
        self.state.lock().await.deployments
    }

    pub async fn participant(&self, id: ParticipantId) -> Option<Participant> {
        self.state.lock().await.participants.get(&id).cloned()
    }

    /// Every stored answer, in id order.
    pub async fn answers(&self) -> Vec<Answer> {
        self.state.lock().await.answers.values().cloned().collect()
    }

    /// Count the call and fail it if `operation` is configured to fail by now.
    fn check(&self, state: &mut State, operation: StoreOperation) -> Result<(), StoreError> {
        let calls = state.calls.entry(operation).or_default();
        *calls += 1;
        trace!("{operation} call #{calls}");
        match self.failures.get(&operation) {
            Some(&successes) if *calls > successes => Err(StoreError::Upstream {
                operation,
                status: 503,
                message: "injected failure".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

impl State {
    fn find_page(&self, page_id: PageId) -> Option<&Page> {
        self.surveys
            .values()
            .find_map(|survey| survey.page_by_id(page_id))
    }

    fn find_item(&self, item_id: ItemId) -> Option<&Item> {
        self.surveys
            .values()
            .flat_map(|survey| survey.pages())
            .find_map(|page| page.item(item_id))
    }
}

#[async_trait]
impl SurveyStore for MemoryStore {
    async fn get_survey(&self, project_id: ProjectId) -> Result<Survey, StoreError> {
        let mut state = self.state.lock().await;
        self.check(&mut state, StoreOperation::GetSurvey)?;
        state.surveys.get(&project_id).cloned().ok_or_else(|| {
            StoreError::not_found(StoreOperation::GetSurvey, format!("project {project_id}"))
        })
    }

    async fn get_page(&self, page_id: PageId) -> Result<Page, StoreError> {
        let mut state = self.state.lock().await;
        self.check(&mut state, StoreOperation::GetPage)?;
        state
            .find_page(page_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(StoreOperation::GetPage, format!("page {page_id}")))
    }

    async fn get_item(&self, item_id: ItemId) -> Result<Item, StoreError> {
        let mut state = self.state.lock().await;
        self.check(&mut state, StoreOperation::GetItem)?;
        state
            .find_item(item_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(StoreOperation::GetItem, format!("item {item_id}")))
    }

    async fn list_answers(&self, participant_id: ParticipantId) -> Result<Vec<Answer>, StoreError> {
        let mut state = self.state.lock().await;
        self.check(&mut state, StoreOperation::ListAnswers)?;
        Ok(state
            .answers
            .values()
            .filter(|answer| answer.participant_id == participant_id)
            .cloned()
            .collect())
    }

    async fn create_answer(&self, answer: &NewAnswer) -> Result<Answer, StoreError> {
        let mut state = self.state.lock().await;
        self.check(&mut state, StoreOperation::CreateAnswer)?;
        state.next_answer_id += 1;
        let saved = answer.clone().persisted(AnswerId(state.next_answer_id));
        state.answers.insert(saved.id, saved.clone());
        state.answers_created += 1;
        Ok(saved)
    }

    async fn update_answer(
        &self,
        answer_id: AnswerId,
        answer: &NewAnswer,
    ) -> Result<Answer, StoreError> {
        let mut state = self.state.lock().await;
        self.check(&mut state, StoreOperation::UpdateAnswer)?;
        let Some(slot) = state.answers.get_mut(&answer_id) else {
            return Err(StoreError::not_found(
                StoreOperation::UpdateAnswer,
                format!("answer {answer_id}"),
            ));
        };
        *slot = answer.clone().persisted(answer_id);
        let saved = slot.clone();
        state.answers_updated += 1;
        Ok(saved)
    }

    async fn create_participant(
        &self,
        participant: &NewParticipant,
    ) -> Result<Participant, StoreError> {
        let mut state = self.state.lock().await;
        self.check(&mut state, StoreOperation::CreateParticipant)?;

        let key = participant.idempotency_key();
        if let Some(existing) = key
            .as_ref()
            .and_then(|key| state.idempotency_keys.get(key))
            .and_then(|id| state.participants.get(id))
        {
            return Ok(existing.clone());
        }

        state.next_participant_id += 1;
        let created = Participant {
            id: ParticipantId(state.next_participant_id),
            external_id: participant.external_id.clone(),
            external_survey_id: participant.external_survey_id.clone(),
            external_session_id: participant.external_session_id.clone(),
        };
        if let Some(key) = key {
            state.idempotency_keys.insert(key, created.id);
        }
        state.participants.insert(created.id, created.clone());
        state.participants_created += 1;
        Ok(created)
    }

    async fn get_publication_by_link_id(&self, link_id: Uuid) -> Result<Publication, StoreError> {
        let mut state = self.state.lock().await;
        self.check(&mut state, StoreOperation::GetPublication)?;
        if state.unpublished.contains(&link_id) {
            return Err(StoreError::Forbidden {
                operation: StoreOperation::GetPublication,
            });
        }
        state.publications.get(&link_id).cloned().ok_or_else(|| {
            StoreError::not_found(StoreOperation::GetPublication, format!("link {link_id}"))
        })
    }

    async fn deploy_publication(
        &self,
        publication_id: PublicationId,
        participant_id: ParticipantId,
    ) -> Result<Deployment, StoreError> {
        let operation = StoreOperation::DeployPublication;
        let mut state = self.state.lock().await;
        self.check(&mut state, operation)?;

        let allow_anonymous = state
            .publications
            .values()
            .find(|publication| publication.id == publication_id)
            .map(|publication| publication.allow_anonymous)
            .ok_or_else(|| {
                StoreError::not_found(operation, format!("publication {publication_id}"))
            })?;
        let participant = state.participants.get(&participant_id).ok_or_else(|| {
            StoreError::not_found(operation, format!("participant {participant_id}"))
        })?;
        if !allow_anonymous && participant.external_id.is_none() {
            return Err(StoreError::Forbidden { operation });
        }

        let endpoints = state
            .endpoint_suffixes
            .iter()
            .map(|suffix| format!("{participant_id}{suffix}"))
            .collect();
        state.deployments += 1;
        Ok(Deployment { endpoints })
    }
}

#[async_trait]
impl SessionIssuer for MemoryStore {
    async fn issue(&self, participant_id: ParticipantId) -> Result<Session, StoreError> {
        let mut state = self.state.lock().await;
        self.check(&mut state, StoreOperation::IssueSession)?;
        if !state.participants.contains_key(&participant_id) {
            return Err(StoreError::not_found(
                StoreOperation::IssueSession,
                format!("participant {participant_id}"),
            ));
        }
        state.sessions_issued += 1;
        let token = format!("session-{participant_id}-{}", state.sessions_issued);
        Ok(Session {
            participant_id,
            cookies: vec![SessionCookie::new(SESSION_COOKIE, token)],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_engine_types::{AnswerValue, SurveyId};

    fn new_answer(item: i64) -> NewAnswer {
        NewAnswer {
            item_id: ItemId(item),
            participant_id: ParticipantId(1),
            page_id: PageId(1),
            value: AnswerValue::from("x"),
        }
    }

    #[tokio::test]
    async fn failing_after_lets_calls_through_first() {
        let store = MemoryStore::new().failing_after(StoreOperation::CreateAnswer, 1);

        assert!(store.create_answer(&new_answer(1)).await.is_ok());
        let err = store.create_answer(&new_answer(2)).await.unwrap_err();
        assert_eq!(err.operation(), StoreOperation::CreateAnswer);
        assert_eq!(store.answers_created().await, 1);
    }

    #[tokio::test]
    async fn idempotent_participant_creation() {
        let store = MemoryStore::new();
        let link = NewParticipant::from_link_params([("participant_id", "ext-1")]);

        let first = store.create_participant(&link).await.unwrap();
        let second = store.create_participant(&link).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.participants_created().await, 1);

        let anonymous = NewParticipant::anonymous();
        let a = store.create_participant(&anonymous).await.unwrap();
        let b = store.create_participant(&anonymous).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn unpublished_link_is_forbidden() {
        let link = Uuid::new_v4();
        let store = MemoryStore::new().with_unpublished_link(link);

        let err = store.get_publication_by_link_id(link).await.unwrap_err();
        assert!(err.is_forbidden());
        let err = store
            .get_publication_by_link_id(Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn pages_and_items_are_found_through_surveys() {
        let page = Page::new(PageId(5), SurveyId(1), 1, "Only")
            .with_item(Item::static_text(ItemId(9), PageId(5), "Hi", "Hello"));
        let survey = Survey::new(SurveyId(1), ProjectId(3), "S", vec![page]).unwrap();
        let store = MemoryStore::new().with_survey(survey);

        assert_eq!(store.get_page(PageId(5)).await.unwrap().name, "Only");
        assert_eq!(store.get_item(ItemId(9)).await.unwrap().title, "Hi");
        assert!(store.get_item(ItemId(10)).await.unwrap_err().is_not_found());
        assert!(store.get_survey(ProjectId(4)).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn deploy_refuses_anonymous_participants_when_disallowed() {
        let link = Uuid::new_v4();
        let mut publication = Publication::new(PublicationId(4), ProjectId(1), link);
        publication.allow_anonymous = false;
        let store = MemoryStore::new()
            .with_publication(publication)
            .with_endpoint(".app.local");

        let anonymous = store
            .create_participant(&NewParticipant::anonymous())
            .await
            .unwrap();
        let err = store
            .deploy_publication(PublicationId(4), anonymous.id)
            .await
            .unwrap_err();
        assert!(err.is_forbidden());
        assert_eq!(err.operation(), StoreOperation::DeployPublication);

        let panel = store
            .create_participant(&NewParticipant::from_link_params([("participant_id", "p-1")]))
            .await
            .unwrap();
        let deployment = store
            .deploy_publication(PublicationId(4), panel.id)
            .await
            .unwrap();
        assert_eq!(deployment.endpoints, vec![format!("{}.app.local", panel.id)]);
        assert_eq!(store.deployments().await, 1);

        let err = store
            .deploy_publication(PublicationId(5), panel.id)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn seeding_reaches_every_clone() {
        let store = MemoryStore::new();
        let observer = store.clone();
        let link = Uuid::new_v4();

        let _store = store.with_publication(Publication::new(PublicationId(1), ProjectId(1), link));
        assert!(observer.get_publication_by_link_id(link).await.is_ok());
    }
}
