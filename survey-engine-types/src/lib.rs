//! Core types for the survey-engine crate.
//!
//! This crate provides the foundational types of the survey response engine:
//! - `Survey`, `Page` and `Item` - The survey definition as delivered by the store
//! - `AnswerValue`, `PageAnswers` and `FieldKey` - Submitted and pre-filled page data
//! - `Answer`, `Participant` and `Publication` - Records owned by the remote store
//! - `SurveyStore` and `SessionIssuer` traits - The collaborators the engine talks to
//! - `EngineError` and friends - The error taxonomy

mod ids;
pub use ids::{AnswerId, ItemId, PageId, ParticipantId, ProjectId, PublicationId, SurveyId};

mod field_key;
pub use field_key::{FIELD_KEY_PREFIX, FieldKey, InvalidFieldKey};

mod answer_value;
pub use answer_value::{AnswerShape, AnswerValue};

mod page_answers;
pub use page_answers::{AnswerAccessError, FormAnswer, PageAnswers};

mod item;
pub use item::{Item, ItemType, QuestionType};

mod survey;
pub use survey::{Page, Survey, check_page_order};

mod records;
pub use records::{
    Answer, Deployment, EXTERNAL_ID_PARAM, EXTERNAL_SESSION_ID_PARAM, EXTERNAL_SURVEY_ID_PARAM,
    NewAnswer, NewParticipant, Participant, Publication,
};

mod error;
pub use error::{
    AnswerErrors, AuthoringErrors, EngineError, FieldError, IdentityBootstrapError, ItemError,
    NavigationError, PageOrderError, StoreError, StoreOperation,
};

mod traits;
pub use traits::{Session, SessionCookie, SessionIssuer, SurveyStore};
