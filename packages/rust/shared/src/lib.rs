//! Shared types, error model, and configuration for the eKYC workspace.
//!
//! This crate is the foundation depended on by all other eKYC crates.
//! It provides:
//! - [`EkycError`]: the unified error type
//! - Domain types ([`ExtractedFields`], [`ValidationResult`], [`OnboardingDecision`],
//!   [`CustomerRecord`], [`StatusCode`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ExtractionConfig, NotifyConfig, OnboardingConfig, StorageConfig, config_dir,
    config_file_path, expand_home, init_config, load_config, load_config_from, validate_notify,
};
pub use error::{EkycError, Result};
pub use types::{
    ADULT_AGE, Action, CustomerRecord, CustomerStatus, ExtractedFields, FailureReason,
    IdentityRecord, OnboardingDecision, RunId, StatusCode, ValidationResult, ValidationStatus,
    mask_id,
};
