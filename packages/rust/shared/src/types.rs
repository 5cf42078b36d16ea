//! Core domain types for identity extraction and onboarding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Age at which a customer is onboarded without human review.
pub const ADULT_AGE: u32 = 18;

// ---------------------------------------------------------------------------
// StatusCode
// ---------------------------------------------------------------------------

/// Closed set of status codes reported by the onboarding workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    Success,
    #[serde(rename = "ERR97")]
    Err97,
    NotFound,
    FieldMismatch,
    DobParseError,
    DispatcherError,
    InsertFailed,
}

impl StatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Err97 => "ERR97",
            Self::NotFound => "NOT_FOUND",
            Self::FieldMismatch => "FIELD_MISMATCH",
            Self::DobParseError => "DOB_PARSE_ERROR",
            Self::DispatcherError => "DISPATCHER_ERROR",
            Self::InsertFailed => "INSERT_FAILED",
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ExtractedFields
// ---------------------------------------------------------------------------

/// Best-effort fields recovered from document text. Any subset may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFields {
    pub name: Option<String>,
    /// Date of birth in its textual `DD/MM/YYYY` (or `DD-MM-YYYY`) form.
    pub dob: Option<String>,
    /// Twelve ASCII digits, no grouping.
    pub id_number: Option<String>,
}

impl ExtractedFields {
    /// `true` when not a single field was recovered.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.dob.is_none() && self.id_number.is_none()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Overall validation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Success,
    Failure,
}

/// Why a validation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    /// The identity number is not in the registry.
    NotFound,
    /// The identity number exists but name or date of birth differ.
    FieldMismatch,
}

impl FailureReason {
    pub fn code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NotFound,
            Self::FieldMismatch => StatusCode::FieldMismatch,
        }
    }

    /// Operator-facing description used in notifications.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::NotFound => "No record found",
            Self::FieldMismatch => "Name or DOB mismatch",
        }
    }
}

/// Registry verdict for one extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
    pub fields: ExtractedFields,
}

impl ValidationResult {
    pub fn success(fields: ExtractedFields) -> Self {
        Self {
            status: ValidationStatus::Success,
            reason: None,
            fields,
        }
    }

    pub fn failure(reason: FailureReason, fields: ExtractedFields) -> Self {
        Self {
            status: ValidationStatus::Failure,
            reason: Some(reason),
            fields,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ValidationStatus::Success
    }

    pub fn code(&self) -> StatusCode {
        self.reason.map_or(StatusCode::Success, |r| r.code())
    }
}

// ---------------------------------------------------------------------------
// Onboarding decision
// ---------------------------------------------------------------------------

/// Action the dispatcher must execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    InsertRequired,
    HumanLoopRequired,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsertRequired => "INSERT_REQUIRED",
            Self::HumanLoopRequired => "HUMAN_LOOP_REQUIRED",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "INSERT_REQUIRED" => Ok(Self::InsertRequired),
            "HUMAN_LOOP_REQUIRED" => Ok(Self::HumanLoopRequired),
            other => Err(format!("unknown action {other:?}")),
        }
    }
}

/// Outcome of the decision engine for one validated customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingDecision {
    pub action: Action,
    pub name: String,
    pub dob: String,
    pub id_number: String,
    pub age: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Entry in the identity registry (system of record).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    #[serde(alias = "aadhaar")]
    pub id_number: String,
    pub name: String,
    pub dob: String,
}

/// Lifecycle status of a customer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerStatus {
    Onboarded,
}

impl CustomerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Onboarded => "ONBOARDED",
        }
    }
}

/// An onboarded customer, keyed by identity number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRecord {
    pub id_number: String,
    pub name: String,
    pub dob: String,
    pub age: i32,
    pub status: CustomerStatus,
    pub onboarded_at: DateTime<Utc>,
}

impl CustomerRecord {
    /// Build the record written when an adult is onboarded.
    pub fn onboarded(decision: &OnboardingDecision) -> Self {
        Self {
            id_number: decision.id_number.clone(),
            name: decision.name.clone(),
            dob: decision.dob.clone(),
            age: decision.age,
            status: CustomerStatus::Onboarded,
            onboarded_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 identifier for one onboarding run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mask an identity number for logs, keeping the last four digits.
pub fn mask_id(id_number: &str) -> String {
    let visible = id_number.chars().count().saturating_sub(4);
    id_number
        .chars()
        .enumerate()
        .map(|(i, c)| if i < visible { 'X' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracted_fields_use_camel_case() {
        let fields = ExtractedFields {
            name: Some("Asha Verma".into()),
            dob: None,
            id_number: Some("736960267850".into()),
        };
        let json = serde_json::to_value(&fields).expect("serialize");
        assert_eq!(json["idNumber"], "736960267850");
        assert!(json["dob"].is_null());
    }

    #[test]
    fn empty_fields_detected() {
        assert!(ExtractedFields::default().is_empty());
        let fields = ExtractedFields {
            dob: Some("01/01/2000".into()),
            ..Default::default()
        };
        assert!(!fields.is_empty());
    }

    #[test]
    fn validation_result_codes() {
        let ok = ValidationResult::success(ExtractedFields::default());
        assert!(ok.is_success());
        assert_eq!(ok.code(), StatusCode::Success);

        let miss = ValidationResult::failure(FailureReason::FieldMismatch, ExtractedFields::default());
        assert!(!miss.is_success());
        assert_eq!(miss.code().as_str(), "FIELD_MISMATCH");
    }

    #[test]
    fn status_code_serializes_err97() {
        let json = serde_json::to_string(&StatusCode::Err97).expect("serialize");
        assert_eq!(json, "\"ERR97\"");
        let json = serde_json::to_string(&StatusCode::DobParseError).expect("serialize");
        assert_eq!(json, "\"DOB_PARSE_ERROR\"");
    }

    #[test]
    fn action_parses_from_wire_name() {
        assert_eq!("INSERT_REQUIRED".parse::<Action>(), Ok(Action::InsertRequired));
        assert!("DELETE_REQUIRED".parse::<Action>().is_err());
    }

    #[test]
    fn mask_keeps_last_four() {
        assert_eq!(mask_id("736960267850"), "XXXXXXXX7850");
        assert_eq!(mask_id("12"), "12");
    }
}
