//! Onboarding workflow for eKYC.
//!
//! This crate ties together field extraction, registry validation, the
//! age-based onboarding decision and its dispatch into an end-to-end
//! [`Pipeline`]. Collaborators (registry, policy index, customer store,
//! escalation) are traits so each stage can be exercised on its own.

pub mod age;
pub mod decision;
pub mod dispatch;
pub mod pipeline;
pub mod policy;
pub mod token;
pub mod validator;

pub use age::{age_as_of, parse_date, parse_dob};
pub use decision::{Decision, DecisionEngine, policy_query};
pub use dispatch::{ActionResult, CustomerStore, Dispatcher, Escalation, NotifyEscalation};
pub use pipeline::{OnboardingOutcome, Pipeline, ProgressReporter, SilentProgress, Stage};
pub use policy::{CHUNK_OVERLAP, CHUNK_SIZE, PolicyLookup, chunk_text, index_policy_text};
pub use validator::{IdentityRegistry, RegistryValidator};
