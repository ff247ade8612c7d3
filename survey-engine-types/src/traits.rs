use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    Answer, AnswerId, Deployment, Item, ItemId, NewAnswer, NewParticipant, Page, PageId,
    Participant, ParticipantId, ProjectId, Publication, PublicationId, StoreError, Survey,
};

/// The remote store holding every durable record the engine reads or writes.
///
/// Each method is a single request/response exchange. Implementations must
/// not retry: a non-success outcome is returned as-is and fails the current
/// engine operation.
#[async_trait]
pub trait SurveyStore: Send + Sync {
    /// Load the survey of a project, with its pages and their items.
    async fn get_survey(&self, project_id: ProjectId) -> Result<Survey, StoreError>;

    /// Load a single page with its items.
    async fn get_page(&self, page_id: PageId) -> Result<Page, StoreError>;

    /// Load a single item.
    async fn get_item(&self, item_id: ItemId) -> Result<Item, StoreError>;

    /// All answers a participant has given so far, across pages.
    async fn list_answers(&self, participant_id: ParticipantId) -> Result<Vec<Answer>, StoreError>;

    /// Persist a new answer and return it with its assigned id.
    async fn create_answer(&self, answer: &NewAnswer) -> Result<Answer, StoreError>;

    /// Replace the value of an existing answer.
    async fn update_answer(
        &self,
        answer_id: AnswerId,
        answer: &NewAnswer,
    ) -> Result<Answer, StoreError>;

    /// Create a participant record.
    ///
    /// When `participant.idempotency_key()` is `Some`, a repeated call with the
    /// same key should yield the participant created by the first call.
    async fn create_participant(
        &self,
        participant: &NewParticipant,
    ) -> Result<Participant, StoreError>;

    /// Resolve a public link to its publication. Unpublished links are `Forbidden`.
    async fn get_publication_by_link_id(&self, link_id: Uuid) -> Result<Publication, StoreError>;

    /// Start the publication's application for a participant.
    ///
    /// `Forbidden` when the publication is inactive or does not admit the
    /// participant (anonymous participants on a publication that disallows them).
    async fn deploy_publication(
        &self,
        publication_id: PublicationId,
        participant_id: ParticipantId,
    ) -> Result<Deployment, StoreError>;
}

/// Issues the session that binds a browser to a participant.
///
/// Token minting itself belongs to the authentication provider; this is only
/// the request that asks for it.
#[async_trait]
pub trait SessionIssuer: Send + Sync {
    async fn issue(&self, participant_id: ParticipantId) -> Result<Session, StoreError>;
}

/// A cookie the caller must attach to the outgoing response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,

    /// Raw cookie attributes (`Path=/; HttpOnly; ...`), possibly empty.
    pub attributes: String,
}

impl SessionCookie {
    /// Create a cookie scoped to the whole site.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            attributes: "Path=/".to_string(),
        }
    }

    /// Parse a `Set-Cookie` header value.
    pub fn parse(header: &str) -> Option<Self> {
        let (pair, attributes) = match header.split_once(';') {
            Some((pair, rest)) => (pair, rest.trim()),
            None => (header, ""),
        };
        let (name, value) = pair.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            value: value.trim().to_string(),
            attributes: attributes.to_string(),
        })
    }

    /// Render as a `Set-Cookie` header value.
    pub fn to_header(&self) -> String {
        if self.attributes.is_empty() {
            format!("{}={}", self.name, self.value)
        } else {
            format!("{}={}; {}", self.name, self.value, self.attributes)
        }
    }
}

/// An established session for one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub participant_id: ParticipantId,
    pub cookies: Vec<SessionCookie>,
}

impl Session {
    /// `Set-Cookie` header values to attach to the response.
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.cookies.iter().map(SessionCookie::to_header).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_set_cookie() {
        let cookie =
            SessionCookie::parse("authjs.session-token=abc.def; Path=/; HttpOnly").unwrap();
        assert_eq!(cookie.name, "authjs.session-token");
        assert_eq!(cookie.value, "abc.def");
        assert_eq!(cookie.attributes, "Path=/; HttpOnly");
        assert_eq!(
            cookie.to_header(),
            "authjs.session-token=abc.def; Path=/; HttpOnly"
        );

        assert!(SessionCookie::parse("no-equals-sign").is_none());
        assert!(SessionCookie::parse("=value").is_none());
    }
}
