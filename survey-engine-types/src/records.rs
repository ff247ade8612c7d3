use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AnswerId, AnswerValue, ItemId, PageId, ParticipantId, ProjectId, PublicationId};

/// Link query parameter carrying the originating system's participant id.
pub const EXTERNAL_ID_PARAM: &str = "participant_id";

/// Link query parameter carrying the originating system's survey id.
pub const EXTERNAL_SURVEY_ID_PARAM: &str = "survey_id";

/// Link query parameter carrying the originating system's session id.
pub const EXTERNAL_SESSION_ID_PARAM: &str = "session_id";

/// A persisted answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    pub item_id: ItemId,
    pub participant_id: ParticipantId,
    pub page_id: PageId,
    pub value: AnswerValue,
}

/// An answer that has not been persisted yet; also the body of an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAnswer {
    pub item_id: ItemId,
    pub participant_id: ParticipantId,
    pub page_id: PageId,
    pub value: AnswerValue,
}

impl NewAnswer {
    /// Attach the id assigned by the store.
    pub fn persisted(self, id: AnswerId) -> Answer {
        Answer {
            id,
            item_id: self.item_id,
            participant_id: self.participant_id,
            page_id: self.page_id,
            value: self.value,
        }
    }
}

/// The respondent identity for one survey-taking session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,

    #[serde(default)]
    pub external_id: Option<String>,

    #[serde(default)]
    pub external_survey_id: Option<String>,

    #[serde(default)]
    pub external_session_id: Option<String>,
}

/// Request body for creating a participant.
///
/// The external identifiers correlate the participant with the system that
/// sent them to the public link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewParticipant {
    pub external_id: Option<String>,
    pub external_survey_id: Option<String>,
    pub external_session_id: Option<String>,
}

impl NewParticipant {
    /// Anonymous participant without external identifiers.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Collect the external identifiers from a public link's query parameters.
    ///
    /// Unknown parameters and empty values are ignored.
    pub fn from_link_params<'a>(params: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut participant = Self::default();
        for (key, value) in params {
            if value.is_empty() {
                continue;
            }
            let slot = match key {
                EXTERNAL_ID_PARAM => &mut participant.external_id,
                EXTERNAL_SURVEY_ID_PARAM => &mut participant.external_survey_id,
                EXTERNAL_SESSION_ID_PARAM => &mut participant.external_session_id,
                _ => continue,
            };
            *slot = Some(value.to_string());
        }
        participant
    }

    /// Check if any external identifier is present.
    pub fn has_external_ids(&self) -> bool {
        self.external_id.is_some()
            || self.external_survey_id.is_some()
            || self.external_session_id.is_some()
    }

    /// Key that identifies repeated creation requests for the same visitor.
    ///
    /// Derived from the external identifier triple; `None` for anonymous
    /// visitors, who have nothing stable to derive it from.
    pub fn idempotency_key(&self) -> Option<String> {
        if !self.has_external_ids() {
            return None;
        }
        let part = |value: &Option<String>| value.as_deref().unwrap_or("-").replace('|', "%7C");
        Some(format!(
            "participant|{}|{}|{}",
            part(&self.external_id),
            part(&self.external_survey_id),
            part(&self.external_session_id)
        ))
    }
}

/// A published, externally linkable instance of a project's survey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub id: PublicationId,

    #[serde(default)]
    pub name: String,

    pub project_id: ProjectId,

    pub link_uuid: Uuid,

    /// Only the application is served; no survey pages.
    #[serde(default)]
    pub application_only: bool,

    #[serde(default)]
    pub collect_data: bool,

    /// Participants without an external id may take part.
    #[serde(default)]
    pub allow_anonymous: bool,

    #[serde(default)]
    pub redirect_url: Option<String>,
}

impl Publication {
    /// An open publication: anonymous participants allowed, data collected, no redirect.
    pub fn new(id: PublicationId, project_id: ProjectId, link_uuid: Uuid) -> Self {
        Self {
            id,
            name: String::new(),
            project_id,
            link_uuid,
            application_only: false,
            collect_data: true,
            allow_anonymous: true,
            redirect_url: None,
        }
    }

    pub fn with_redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = Some(url.into());
        self
    }

    /// The redirect destination after the last page, if a non-empty one is configured.
    pub fn redirect_target(&self) -> Option<&str> {
        self.redirect_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// The answer to deploying a publication for one participant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Hostnames of the application instances started for the participant.
    #[serde(default)]
    pub endpoints: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_params() {
        let participant = NewParticipant::from_link_params([
            ("participant_id", "p-1"),
            ("survey_id", ""),
            ("session_id", "s-9"),
            ("utm_source", "mail"),
        ]);

        assert_eq!(participant.external_id.as_deref(), Some("p-1"));
        assert!(participant.external_survey_id.is_none());
        assert_eq!(participant.external_session_id.as_deref(), Some("s-9"));
    }

    #[test]
    fn idempotency_key() {
        assert!(NewParticipant::anonymous().idempotency_key().is_none());

        let a = NewParticipant::from_link_params([("session_id", "abc")]);
        let b = NewParticipant::from_link_params([("session_id", "abc")]);
        let c = NewParticipant::from_link_params([("session_id", "abd")]);
        assert_eq!(a.idempotency_key(), b.idempotency_key());
        assert_ne!(a.idempotency_key(), c.idempotency_key());
    }

    #[test]
    fn redirect_target_ignores_blank_urls() {
        let mut publication =
            Publication::new(PublicationId(1), ProjectId(1), Uuid::nil()).with_redirect_url("   ");
        assert!(publication.redirect_target().is_none());

        publication.redirect_url = Some("https://example.org/done".into());
        assert_eq!(publication.redirect_target(), Some("https://example.org/done"));
    }

    #[test]
    fn publication_from_store_json() {
        let publication: Publication = serde_json::from_str(
            r#"{
                "id": 3,
                "name": "Wave 1",
                "project_id": 7,
                "link_uuid": "00000000-0000-0000-0000-00000000beef",
                "application_only": false,
                "start_date": "2024-05-01T00:00:00",
                "collect_data": true,
                "redirect_url": null,
                "allow_anonymous": false
            }"#,
        )
        .unwrap();
        assert_eq!(publication.id, PublicationId(3));
        assert!(!publication.allow_anonymous);
        assert!(publication.collect_data);
        assert!(publication.redirect_target().is_none());

        let deployment: Deployment =
            serde_json::from_str(r#"{"endpoints": ["4app8080.apps.example"]}"#).unwrap();
        assert_eq!(deployment.endpoints, vec!["4app8080.apps.example"]);
    }
}
