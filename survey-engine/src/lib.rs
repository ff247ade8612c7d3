//! # survey-engine
//!
//! Serves surveys to participants: compiles pages into answer contracts,
//! walks participants through pages, and saves their answers idempotently.
//!
//! The durable records live in a remote store reached through the
//! [`SurveyStore`] trait; sessions come from a [`SessionIssuer`]. Both have a
//! REST implementation in [`http`] and an in-memory one in [`memory_store`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use survey_engine::{
//!     EngineConfig, HttpSessionIssuer, HttpStore, NavigationRequest, NewParticipant,
//!     PageAnswers, SurveyEngine,
//! };
//!
//! let config = EngineConfig::from_file("survey-engine.toml")?;
//! let engine = SurveyEngine::new(
//!     HttpStore::from_config(config.clone())?,
//!     HttpSessionIssuer::from_config(&config)?,
//! );
//!
//! // First visit: creates a participant and issues a session.
//! let entry = engine
//!     .open_link(link_id, None, &NewParticipant::from_link_params(query))
//!     .await?;
//! let participant = entry.participant_id();
//!
//! let view = engine.view_page(link_id, participant, 1).await?;
//! let answers = PageAnswers::new().with(item_id, 3);
//! let outcome = engine
//!     .submit_page(link_id, participant, 1, &answers, NavigationRequest::Page(2))
//!     .await?;
//! ```
//!
//! ## Modules
//!
//! - [`registry`] - Which items take answers and what shape those answers have
//! - [`compiler`] - Page contracts and submission validation
//! - [`authoring`] - Rules for well-formed items, pages and surveys
//! - [`reconciler`] - Stored answers to form defaults and back
//! - [`navigator`] - The page state machine
//! - [`bootstrap`] - Participant identity for public links

// Re-export all types from survey-engine-types
pub use survey_engine_types::*;

pub mod authoring;
pub mod bootstrap;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod http;
pub mod memory_store;
pub mod navigator;
pub mod reconciler;
pub mod registry;

pub use authoring::{validate_item, validate_page, validate_survey};
pub use bootstrap::{Bootstrap, BootstrapState};
pub use compiler::{PageContract, compile};
pub use config::EngineConfig;
pub use engine::{LinkEntry, PageView, SubmitOutcome, SurveyEngine};
pub use http::{HttpSessionIssuer, HttpStore};
pub use memory_store::MemoryStore;
pub use navigator::{Completion, NavState, Navigation, NavigationRequest, Navigator};
pub use reconciler::AnswerWrite;
pub use registry::AnswerConstraint;
