//! NixAI Common - answer validation core for NixOS assistant output
//!
//! Pattern validators, tool-backed quality scoring, community and fact
//! checks, cross-referencing and confidence scoring, tied together by
//! [`EnhancedValidator`]. External tools and HTTP services sit behind the
//! traits in [`collaborators`].

pub mod collaborators;
pub mod community;
pub mod confidence;
pub mod config;
pub mod context;
pub mod cross_reference;
pub mod error;
pub mod extract;
pub mod fact_checker;
pub mod format;
pub mod orchestrator;
pub mod patterns;
pub mod precheck;
pub mod quality_scorer;
pub mod types;

pub use confidence::{AnswerConfidence, ConfidenceLevel, ConfidenceScorer};
pub use config::ValidatorConfig;
pub use context::CallContext;
pub use error::{CollaboratorError, ConfigError};
pub use orchestrator::{
    decide_quality_level, Capabilities, EnhancedValidationResult, EnhancedValidator, EnhancedValidatorBuilder,
    QualitySignals,
};
pub use types::{QualityLevel, Severity, ValidationIssue};
