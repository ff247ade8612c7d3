use std::fmt;

use crate::{ItemId, PageId, ParticipantId, PublicationId};

/// A collaborator operation, named so failures can say which call broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    GetSurvey,
    GetPage,
    GetItem,
    ListAnswers,
    CreateAnswer,
    UpdateAnswer,
    CreateParticipant,
    GetPublication,
    DeployPublication,
    IssueSession,
}

impl StoreOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GetSurvey => "GetSurvey",
            Self::GetPage => "GetPage",
            Self::GetItem => "GetItem",
            Self::ListAnswers => "ListAnswers",
            Self::CreateAnswer => "CreateAnswer",
            Self::UpdateAnswer => "UpdateAnswer",
            Self::CreateParticipant => "CreateParticipant",
            Self::GetPublication => "GetPublicationByLinkId",
            Self::DeployPublication => "DeployPublication",
            Self::IssueSession => "IssueSession",
        }
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single collaborator call. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested resource does not exist.
    #[error("{operation}: {resource} not found")]
    NotFound {
        operation: StoreOperation,
        resource: String,
    },

    /// The collaborator refused access (e.g. an unpublished link).
    #[error("{operation}: access forbidden")]
    Forbidden { operation: StoreOperation },

    /// The collaborator answered with a non-success status.
    #[error("{operation} failed with status {status}: {message}")]
    Upstream {
        operation: StoreOperation,
        status: u16,
        message: String,
    },

    /// The call did not complete (connection, timeout, undecodable body, ...).
    #[error("{operation} failed: {source}")]
    Transport {
        operation: StoreOperation,
        #[source]
        source: anyhow::Error,
    },
}

impl StoreError {
    /// Create a not-found error.
    pub fn not_found(operation: StoreOperation, resource: impl Into<String>) -> Self {
        Self::NotFound {
            operation,
            resource: resource.into(),
        }
    }

    /// Create a transport error from any error type.
    pub fn transport(operation: StoreOperation, err: impl Into<anyhow::Error>) -> Self {
        Self::Transport {
            operation,
            source: err.into(),
        }
    }

    /// The operation that failed.
    pub fn operation(&self) -> StoreOperation {
        match self {
            Self::NotFound { operation, .. }
            | Self::Forbidden { operation }
            | Self::Upstream { operation, .. }
            | Self::Transport { operation, .. } => *operation,
        }
    }

    /// Check if this error means the resource is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error means access was refused.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden { .. })
    }
}

/// A single authoring rule violation on one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every authoring rule an item (or page, or survey) violates, collected in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("{} authoring error(s): {}", .errors.len(), join(.errors))]
pub struct AuthoringErrors {
    pub errors: Vec<FieldError>,
}

impl AuthoringErrors {
    /// Record a violation.
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Check if any violation was recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Check if the given field has a violation.
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|error| error.field == field)
    }

    /// Names of all offending fields, in the order they were reported.
    pub fn fields(&self) -> Vec<&'static str> {
        self.errors.iter().map(|error| error.field).collect()
    }

    /// `Ok(())` when nothing was recorded, the collected errors otherwise.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// A submitted answer that fails the page contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemError {
    pub item_id: ItemId,
    pub message: String,
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item {}: {}", self.item_id, self.message)
    }
}

/// Every per-item failure of a page submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("{} invalid answer(s): {}", .errors.len(), join(.errors))]
pub struct AnswerErrors {
    pub errors: Vec<ItemError>,
}

impl AnswerErrors {
    /// Record a failure for an item.
    pub fn push(&mut self, item_id: ItemId, message: impl Into<String>) {
        self.errors.push(ItemError {
            item_id,
            message: message.into(),
        });
    }

    /// Check if any failure was recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Messages recorded for one item.
    pub fn for_item(&self, item_id: ItemId) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|error| error.item_id == item_id)
            .map(|error| error.message.as_str())
            .collect()
    }
}

fn join<T: fmt::Display>(errors: &[T]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Page orders of a survey are not unique and contiguous from 1.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageOrderError {
    #[error("page order {0} is used more than once")]
    Duplicate(u32),

    #[error("page order {found} found where {expected} was expected")]
    Gap { expected: u32, found: u32 },

    #[error("page order {order} is out of range for a survey of {len} page(s)")]
    OutOfRange { order: u32, len: usize },
}

/// A navigation request the page state machine does not allow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("page {requested} is not reachable from page {current}")]
    Unreachable { current: u32, requested: u32 },

    #[error("back navigation is disabled on page {0}")]
    BackDisabled(u32),

    #[error("page {0} is the first page")]
    AtFirstPage(u32),

    #[error("page {current} is not the last page, cannot finish")]
    NotLastPage { current: u32 },

    #[error("the survey is already finished")]
    AlreadyFinished,
}

/// Failure to establish a participant identity for a public link.
///
/// The two variants let operators tell "nobody was created" apart from
/// "a participant exists but no session points at it".
#[derive(Debug, thiserror::Error)]
pub enum IdentityBootstrapError {
    #[error("participant could not be created: {0}")]
    ParticipantCreation(#[source] StoreError),

    #[error("participant {participant_id} was created but no session was established: {source}")]
    SessionIssuance {
        participant_id: ParticipantId,
        #[source]
        source: StoreError,
    },
}

/// Error type for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Submitted page data fails the page contract. Nothing was persisted.
    #[error(transparent)]
    AnswerValidation(#[from] AnswerErrors),

    /// The survey, page, item or publication is not available.
    #[error("{what} is not available")]
    NotFound { what: String },

    /// A collaborator call failed.
    #[error(transparent)]
    Upstream(#[from] StoreError),

    /// Persisting one answer failed; the remaining writes were not attempted.
    #[error("saving the answer to item {item_id} on page {page_id} failed: {source}")]
    AnswerWrite {
        item_id: ItemId,
        page_id: PageId,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error(transparent)]
    IdentityBootstrap(#[from] IdentityBootstrapError),

    /// The publication refused to deploy for this participant. Publications
    /// that disallow anonymous users refuse participants without an external id.
    #[error("publication {publication_id} does not allow anonymous participant {participant_id}")]
    AnonymousNotAllowed {
        publication_id: PublicationId,
        participant_id: ParticipantId,
    },
}

impl EngineError {
    /// Create a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Check if this error should surface as "not available".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The collaborator operation behind this error, if any.
    pub fn failed_operation(&self) -> Option<StoreOperation> {
        match self {
            Self::Upstream(source) | Self::AnswerWrite { source, .. } => Some(source.operation()),
            Self::IdentityBootstrap(IdentityBootstrapError::ParticipantCreation(source))
            | Self::IdentityBootstrap(IdentityBootstrapError::SessionIssuance { source, .. }) => {
                Some(source.operation())
            }
            Self::AnonymousNotAllowed { .. } => Some(StoreOperation::DeployPublication),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authoring_errors_collect_every_field() {
        let mut errors = AuthoringErrors::default();
        errors.push("scale_min", "required");
        errors.push("scale_max", "required");

        assert_eq!(errors.fields(), vec!["scale_min", "scale_max"]);
        assert!(errors.has_field("scale_max"));
        assert!(errors.clone().into_result().is_err());
        assert!(errors.to_string().starts_with("2 authoring error(s)"));
    }

    #[test]
    fn failed_operation() {
        let err = EngineError::AnswerWrite {
            item_id: ItemId(1),
            page_id: PageId(2),
            source: StoreError::Forbidden {
                operation: StoreOperation::UpdateAnswer,
            },
        };
        assert_eq!(err.failed_operation(), Some(StoreOperation::UpdateAnswer));
        assert!(EngineError::not_found("survey").is_not_found());

        let refused = EngineError::AnonymousNotAllowed {
            publication_id: PublicationId(1),
            participant_id: ParticipantId(2),
        };
        assert_eq!(
            refused.failed_operation(),
            Some(StoreOperation::DeployPublication)
        );
    }
}
