//! End-to-end onboarding: text → extract → validate → decide → dispatch.
//!
//! Every finished run, successful or not, is appended to the audit trail.
//! Outcomes that carry a status code (`ERR97`, `NOT_FOUND`, ...) are
//! returned as an [`OnboardingOutcome`]; storage and I/O failures propagate
//! as errors.

use chrono::{NaiveDate, Utc};
use ekyc_extract::FieldExtractor;
use ekyc_notify::{Notification, Notifier};
use ekyc_shared::{
    AppConfig, EkycError, ExtractedFields, OnboardingDecision, Result, RunId, StatusCode,
    ValidationResult,
};
use ekyc_storage::{PolicyExcerpt, RunRecord, Storage};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use crate::decision::DecisionEngine;
use crate::dispatch::{ActionResult, Dispatcher, NotifyEscalation};
use crate::token;
use crate::validator::RegistryValidator;

/// Pipeline stage a run reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extract,
    Validate,
    Decide,
    Dispatch,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Validate => "validate",
            Self::Decide => "decide",
            Self::Dispatch => "dispatch",
        }
    }
}

/// Result of one onboarding run.
#[derive(Debug, Clone, Serialize)]
pub struct OnboardingOutcome {
    pub run_id: RunId,
    /// Last stage entered.
    pub stage: Stage,
    pub code: StatusCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ExtractedFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<OnboardingDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ActionResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub advisories: Vec<PolicyExcerpt>,
    /// Failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl OnboardingOutcome {
    fn new() -> Self {
        Self {
            run_id: RunId::new(),
            stage: Stage::Extract,
            code: StatusCode::Success,
            fields: None,
            validation: None,
            decision: None,
            token: None,
            result: None,
            advisories: Vec::new(),
            detail: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == StatusCode::Success
    }

    /// Record a coded failure. Errors without a status code are returned.
    fn fail(&mut self, err: EkycError) -> Result<()> {
        match err.code() {
            Some(code) => {
                self.code = code;
                self.detail = Some(err.to_string());
                Ok(())
            }
            None => Err(err),
        }
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a stage.
    fn stage(&self, stage: Stage);
    /// Called once the run is finished and audited.
    fn done(&self, outcome: &OnboardingOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage(&self, _stage: Stage) {}
    fn done(&self, _outcome: &OnboardingOutcome) {}
}

/// The onboarding workflow over one database and one notifier.
pub struct Pipeline<'a, N> {
    extractor: FieldExtractor,
    validator: RegistryValidator<&'a Storage>,
    engine: DecisionEngine<&'a Storage>,
    dispatcher: Dispatcher<&'a Storage, NotifyEscalation<&'a N>>,
    notifier: &'a N,
    recipient: String,
    storage: &'a Storage,
}

impl<'a, N: Notifier> Pipeline<'a, N> {
    pub fn new(config: &AppConfig, storage: &'a Storage, notifier: &'a N) -> Self {
        Self {
            extractor: FieldExtractor::new(&config.extraction),
            validator: RegistryValidator::new(storage),
            engine: DecisionEngine::new(storage, &config.onboarding),
            dispatcher: Dispatcher::new(
                storage,
                NotifyEscalation::new(notifier, config.notify.recipient.clone()),
            ),
            notifier,
            recipient: config.notify.recipient.clone(),
            storage,
        }
    }

    /// Onboard the customer described by `text`.
    #[instrument(skip_all, fields(len = text.len(), today = %today))]
    pub async fn run(
        &self,
        text: &str,
        phone: Option<&str>,
        today: NaiveDate,
        progress: &dyn ProgressReporter,
    ) -> Result<OnboardingOutcome> {
        let mut outcome = OnboardingOutcome::new();
        let digest = {
            let mut hasher = Sha256::new();
            hasher.update(text.as_bytes());
            format!("{:x}", hasher.finalize())
        };
        info!(run_id = %outcome.run_id, "starting onboarding run");

        // --- Extract ---
        progress.stage(Stage::Extract);
        let fields = match self.extractor.extract(text) {
            Ok(fields) => fields,
            Err(e) => {
                outcome.fail(e)?;
                return self.finish(outcome, &digest, progress).await;
            }
        };
        outcome.fields = Some(fields.clone());

        // --- Validate ---
        progress.stage(Stage::Validate);
        outcome.stage = Stage::Validate;
        let validation = self.validator.validate(&fields).await?;
        outcome.validation = Some(validation.clone());
        if let Some(reason) = validation.reason {
            outcome.code = reason.code();
            outcome.detail = Some(reason.describe().to_string());
            let notification = Notification::validation_failure(
                &self.recipient,
                fields.name.as_deref().unwrap_or("UNKNOWN"),
                fields.id_number.as_deref().unwrap_or(""),
                phone,
                reason.describe(),
            );
            if let Err(e) = self.notifier.send(&notification).await {
                warn!(error = %e, "validation failure notification failed");
            }
            return self.finish(outcome, &digest, progress).await;
        }

        // --- Decide ---
        progress.stage(Stage::Decide);
        outcome.stage = Stage::Decide;
        let decision = match self.engine.decide(&validation, phone, today).await {
            Ok(d) => d,
            Err(e) => {
                outcome.fail(e)?;
                return self.finish(outcome, &digest, progress).await;
            }
        };
        outcome.token = Some(token::encode(&decision.decision));
        outcome.advisories = decision.advisories;
        outcome.decision = Some(decision.decision.clone());

        // --- Dispatch ---
        progress.stage(Stage::Dispatch);
        outcome.stage = Stage::Dispatch;
        match self.dispatcher.execute(&decision.decision).await {
            Ok(result) => outcome.result = Some(result),
            Err(e) => outcome.fail(e)?,
        }

        self.finish(outcome, &digest, progress).await
    }

    async fn finish(
        &self,
        outcome: OnboardingOutcome,
        digest: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<OnboardingOutcome> {
        let record = RunRecord {
            id: outcome.run_id.to_string(),
            document_sha256: digest.to_string(),
            stage: outcome.stage.as_str().to_string(),
            code: outcome.code.as_str().to_string(),
            action: outcome.decision.as_ref().map(|d| d.action.as_str().to_string()),
            token: outcome.token.clone(),
            detail: outcome.detail.clone(),
            created_at: Utc::now(),
        };
        if let Err(e) = self.storage.insert_run(&record).await {
            warn!(error = %e, run_id = %outcome.run_id, "failed to write audit row");
        }

        info!(
            run_id = %outcome.run_id,
            stage = outcome.stage.as_str(),
            code = %outcome.code,
            "onboarding run finished"
        );
        progress.done(&outcome);
        Ok(outcome)
    }
}
