//! Participant identity bootstrap for public links.
//!
//! Runs before any page is served. A request that already carries a
//! participant keeps it. Otherwise exactly one participant is created (phase
//! 1) and then a session is issued for it (phase 2). The session must reach
//! the response before any page content, or a refresh would create a second
//! participant.

use log::{debug, info, warn};
use survey_engine_types::{
    IdentityBootstrapError, NewParticipant, Participant, ParticipantId, Session, SessionIssuer,
    StoreError, StoreOperation, SurveyStore,
};

/// Progress of the bootstrap. `Pending` is observable between the two phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapState {
    /// The request already carried an identity; nothing was created.
    Reused(ParticipantId),

    /// Phase 1 done: the participant exists but no session points at it yet.
    Pending { participant: Participant },

    /// Both phases done: the session must be attached to the response.
    Established {
        participant: Participant,
        session: Session,
    },
}

impl BootstrapState {
    pub fn participant_id(&self) -> ParticipantId {
        match self {
            Self::Reused(id) => *id,
            Self::Pending { participant } | Self::Established { participant, .. } => {
                participant.id
            }
        }
    }

    /// The session to attach to the outgoing response, if one was issued.
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Established { session, .. } => Some(session),
            _ => None,
        }
    }

    /// Check if this request created a participant.
    pub fn created_participant(&self) -> bool {
        !matches!(self, Self::Reused(_))
    }

    /// Check if the identity is usable for serving pages.
    pub fn is_complete(&self) -> bool {
        !matches!(self, Self::Pending { .. })
    }
}

/// Drives the bootstrap against the store and the session issuer.
pub struct Bootstrap<'a, S: ?Sized, I: ?Sized> {
    store: &'a S,
    issuer: &'a I,
}

impl<'a, S, I> Bootstrap<'a, S, I>
where
    S: SurveyStore + ?Sized,
    I: SessionIssuer + ?Sized,
{
    pub fn new(store: &'a S, issuer: &'a I) -> Self {
        Self { store, issuer }
    }

    /// Run both phases as needed.
    ///
    /// `existing` is the participant carried by the request's session, if any.
    pub async fn run(
        &self,
        existing: Option<ParticipantId>,
        link: &NewParticipant,
    ) -> Result<BootstrapState, IdentityBootstrapError> {
        if let Some(participant_id) = existing {
            debug!("reusing participant {participant_id} from session");
            return Ok(BootstrapState::Reused(participant_id));
        }
        let pending = self.create_participant(link).await?;
        self.establish_session(pending).await
    }

    /// Phase 1: create the participant.
    pub async fn create_participant(
        &self,
        link: &NewParticipant,
    ) -> Result<BootstrapState, IdentityBootstrapError> {
        let participant = self.store.create_participant(link).await.map_err(|source| {
            warn!("participant creation failed: {source}");
            IdentityBootstrapError::ParticipantCreation(source)
        })?;
        info!(
            "created participant {} (external id {:?})",
            participant.id, participant.external_id
        );
        Ok(BootstrapState::Pending { participant })
    }

    /// Phase 2: issue the session for a pending participant.
    ///
    /// States other than `Pending` are returned unchanged.
    pub async fn establish_session(
        &self,
        state: BootstrapState,
    ) -> Result<BootstrapState, IdentityBootstrapError> {
        let BootstrapState::Pending { participant } = state else {
            return Ok(state);
        };

        let session_error = |source| {
            warn!(
                "participant {} is orphaned, session issuance failed: {}",
                participant.id, source
            );
            IdentityBootstrapError::SessionIssuance {
                participant_id: participant.id,
                source,
            }
        };

        let session = self
            .issuer
            .issue(participant.id)
            .await
            .map_err(session_error)?;
        if session.participant_id != participant.id {
            return Err(session_error(StoreError::Upstream {
                operation: StoreOperation::IssueSession,
                status: 200,
                message: format!(
                    "session issued for participant {} instead of {}",
                    session.participant_id, participant.id
                ),
            }));
        }

        debug!(
            "session established for participant {} ({} cookie(s))",
            participant.id,
            session.cookies.len()
        );
        Ok(BootstrapState::Established {
            participant,
            session,
        })
    }
}
