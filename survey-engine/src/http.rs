//! `reqwest` implementations of the collaborators against the REST API.

use anyhow::Context;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{HeaderMap, SET_COOKIE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use survey_engine_types::{
    Answer, AnswerId, Deployment, Item, ItemId, NewAnswer, NewParticipant, Page, PageId,
    Participant, ParticipantId, ProjectId, Publication, PublicationId, Session, SessionCookie,
    SessionIssuer, StoreError, StoreOperation, Survey, SurveyStore,
};

use crate::config::EngineConfig;

/// Header carrying the key that makes participant creation repeatable.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Longest upstream error body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

fn client_builder(config: &EngineConfig) -> reqwest::ClientBuilder {
    Client::builder()
        .timeout(config.request_timeout())
        .connect_timeout(config.connect_timeout())
        .user_agent(config.user_agent.clone())
}

/// Survey store backed by the REST API.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    config: EngineConfig,
}

impl HttpStore {
    pub fn from_config(config: EngineConfig) -> anyhow::Result<Self> {
        let client = client_builder(&config)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(client, config))
    }

    /// Use an existing client; timeouts in `config` are then up to that client.
    pub fn with_client(client: Client, config: EngineConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        self.config.api_url(path)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        operation: StoreOperation,
        resource: String,
        request: RequestBuilder,
    ) -> Result<T, StoreError> {
        debug!("{operation}: {resource}");
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::transport(operation, e))?;
        let response = check_status(operation, &resource, response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::transport(operation, e))
    }
}

/// Turn a non-success response into the matching error.
async fn check_status(
    operation: StoreOperation,
    resource: &str,
    response: Response,
) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(operation, resource, status, &body))
}

fn status_error(
    operation: StoreOperation,
    resource: &str,
    status: StatusCode,
    body: &str,
) -> StoreError {
    warn!("{operation}: {resource} answered {status}");
    match status {
        StatusCode::NOT_FOUND => StoreError::not_found(operation, resource),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Forbidden { operation },
        _ => {
            let mut message: String = body.trim().chars().take(MAX_ERROR_BODY).collect();
            if message.is_empty() {
                message = status.canonical_reason().unwrap_or("no reason").to_string();
            }
            StoreError::Upstream {
                operation,
                status: status.as_u16(),
                message,
            }
        }
    }
}

#[async_trait]
impl SurveyStore for HttpStore {
    async fn get_survey(&self, project_id: ProjectId) -> Result<Survey, StoreError> {
        let url = self.url(&format!("/api/projects/{project_id}/survey"));
        self.fetch(
            StoreOperation::GetSurvey,
            format!("survey of project {project_id}"),
            self.client.get(url),
        )
        .await
    }

    async fn get_page(&self, page_id: PageId) -> Result<Page, StoreError> {
        let url = self.url(&format!("/api/pages/{page_id}"));
        self.fetch(
            StoreOperation::GetPage,
            format!("page {page_id}"),
            self.client.get(url),
        )
        .await
    }

    async fn get_item(&self, item_id: ItemId) -> Result<Item, StoreError> {
        let url = self.url(&format!("/api/items/{item_id}"));
        self.fetch(
            StoreOperation::GetItem,
            format!("item {item_id}"),
            self.client.get(url),
        )
        .await
    }

    async fn list_answers(&self, participant_id: ParticipantId) -> Result<Vec<Answer>, StoreError> {
        let url = self.url(&format!("/api/participants/{participant_id}/answers/"));
        let records: Vec<Value> = self
            .fetch(
                StoreOperation::ListAnswers,
                format!("answers of participant {participant_id}"),
                self.client.get(url),
            )
            .await?;
        Ok(decode_answers(participant_id, records))
    }

    async fn create_answer(&self, answer: &NewAnswer) -> Result<Answer, StoreError> {
        let url = self.url("/api/answers/");
        self.fetch(
            StoreOperation::CreateAnswer,
            format!("answer to item {}", answer.item_id),
            self.client.post(url).json(answer),
        )
        .await
    }

    async fn update_answer(
        &self,
        answer_id: AnswerId,
        answer: &NewAnswer,
    ) -> Result<Answer, StoreError> {
        let url = self.url(&format!("/api/answers/{answer_id}"));
        self.fetch(
            StoreOperation::UpdateAnswer,
            format!("answer {answer_id}"),
            self.client.put(url).json(answer),
        )
        .await
    }

    async fn create_participant(
        &self,
        participant: &NewParticipant,
    ) -> Result<Participant, StoreError> {
        let mut request = self.client.post(self.url("/api/participants/")).json(participant);
        if let Some(key) = participant.idempotency_key() {
            request = request.header(IDEMPOTENCY_KEY_HEADER, key);
        }
        self.fetch(
            StoreOperation::CreateParticipant,
            "participant".to_string(),
            request,
        )
        .await
    }

    async fn get_publication_by_link_id(&self, link_id: Uuid) -> Result<Publication, StoreError> {
        let url = self.url(&format!("/api/publications/uuid/{link_id}"));
        self.fetch(
            StoreOperation::GetPublication,
            format!("publication {link_id}"),
            self.client.get(url),
        )
        .await
    }

    async fn deploy_publication(
        &self,
        publication_id: PublicationId,
        participant_id: ParticipantId,
    ) -> Result<Deployment, StoreError> {
        let url = self.url(&format!(
            "/api/publications/{publication_id}/deploy/{participant_id}"
        ));
        self.fetch(
            StoreOperation::DeployPublication,
            format!("publication {publication_id} for participant {participant_id}"),
            self.client.get(url),
        )
        .await
    }
}

/// Decode stored answer records one by one.
///
/// The store accepts any JSON as an answer value; records whose value is not
/// one of the answer shapes are skipped so the rest stay usable.
fn decode_answers(participant_id: ParticipantId, records: Vec<Value>) -> Vec<Answer> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<Answer>(record) {
            Ok(answer) => Some(answer),
            Err(e) => {
                warn!("skipping stored answer of participant {participant_id}: {e}");
                None
            }
        })
        .collect()
}

/// Session issuer that calls the credentials callback of the auth provider.
#[derive(Debug, Clone)]
pub struct HttpSessionIssuer {
    client: Client,
    callback_url: String,
}

impl HttpSessionIssuer {
    /// The client does not follow redirects: the callback answers with one,
    /// and its `Set-Cookie` headers are the session.
    pub fn from_config(config: &EngineConfig) -> anyhow::Result<Self> {
        let client = client_builder(config)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            callback_url: config.auth_callback_url.clone(),
        })
    }
}

#[async_trait]
impl SessionIssuer for HttpSessionIssuer {
    async fn issue(&self, participant_id: ParticipantId) -> Result<Session, StoreError> {
        let operation = StoreOperation::IssueSession;
        debug!("{operation}: participant {participant_id}");
        let response = self
            .client
            .post(&self.callback_url)
            .form(&[("id", participant_id.to_string())])
            .send()
            .await
            .map_err(|e| StoreError::transport(operation, e))?;

        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(
                operation,
                &format!("session for participant {participant_id}"),
                status,
                &body,
            ));
        }
        session_from_headers(participant_id, response.headers())
    }
}

/// Collect the `Set-Cookie` headers of a callback response into a session.
fn session_from_headers(
    participant_id: ParticipantId,
    headers: &HeaderMap,
) -> Result<Session, StoreError> {
    let cookies: Vec<_> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(SessionCookie::parse)
        .collect();
    if cookies.is_empty() {
        return Err(StoreError::Upstream {
            operation: StoreOperation::IssueSession,
            status: 200,
            message: "response set no session cookie".to_string(),
        });
    }
    Ok(Session {
        participant_id,
        cookies,
    })
}
