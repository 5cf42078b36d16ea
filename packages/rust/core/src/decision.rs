//! Onboarding decision: adult customers are inserted, minors go to a human.

use chrono::NaiveDate;
use ekyc_shared::{
    Action, EkycError, OnboardingConfig, OnboardingDecision, Result, ValidationResult, mask_id,
};
use ekyc_storage::PolicyExcerpt;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::age::age_as_of;
use crate::policy::PolicyLookup;

/// A decision together with the policy excerpts consulted for it.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub decision: OnboardingDecision,
    /// Advisory only; never changes the action.
    pub advisories: Vec<PolicyExcerpt>,
}

/// The policy question asked for a customer of `age`.
pub fn policy_query(age: i32) -> String {
    format!("What happens if the customer is {age} years old?")
}

pub struct DecisionEngine<P> {
    policy: P,
    adult_age: u32,
    policy_results: u32,
}

impl<P: PolicyLookup> DecisionEngine<P> {
    pub fn new(policy: P, config: &OnboardingConfig) -> Self {
        Self {
            policy,
            adult_age: config.adult_age,
            policy_results: config.policy_results,
        }
    }

    /// Decide the action for a successful validation.
    ///
    /// Policy lookup failures are logged and leave the advisories empty.
    #[instrument(skip_all, fields(id_number = validation.fields.id_number.as_deref().map(mask_id)))]
    pub async fn decide(
        &self,
        validation: &ValidationResult,
        phone: Option<&str>,
        today: NaiveDate,
    ) -> Result<Decision> {
        if !validation.is_success() {
            return Err(EkycError::validation(format!(
                "cannot decide on a {} verdict",
                validation.code()
            )));
        }
        let fields = &validation.fields;
        let (Some(name), Some(dob), Some(id_number)) = (
            fields.name.as_deref(),
            fields.dob.as_deref(),
            fields.id_number.as_deref(),
        ) else {
            return Err(EkycError::validation("validated fields are incomplete"));
        };

        let age = age_as_of(dob, today)?;
        // A date of birth after `today` gives a negative age and goes to review.
        let action = if i64::from(age) < i64::from(self.adult_age) {
            Action::HumanLoopRequired
        } else {
            Action::InsertRequired
        };

        let advisories = match self.policy.search(&policy_query(age), self.policy_results).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "policy lookup failed");
                Vec::new()
            }
        };

        info!(%action, age, advisories = advisories.len(), "onboarding decision");

        Ok(Decision {
            decision: OnboardingDecision {
                action,
                name: name.to_string(),
                dob: dob.to_string(),
                id_number: id_number.to_string(),
                age,
                phone: phone.map(str::to_string),
            },
            advisories,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekyc_shared::{ExtractedFields, FailureReason, StatusCode};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPolicy {
        queries: Mutex<Vec<String>>,
        fail: bool,
    }

    impl PolicyLookup for RecordingPolicy {
        async fn search(&self, query: &str, limit: u32) -> Result<Vec<PolicyExcerpt>> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.fail {
                return Err(EkycError::Storage("index unavailable".into()));
            }
            Ok((0..limit)
                .map(|i| PolicyExcerpt {
                    source: "sop.txt".into(),
                    chunk_index: i,
                    content: "guardian consent".into(),
                    score: -1.0,
                })
                .collect())
        }
    }

    fn validated(dob: &str) -> ValidationResult {
        ValidationResult::success(ExtractedFields {
            name: Some("A B".into()),
            dob: Some(dob.into()),
            id_number: Some("123412341234".into()),
        })
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 19).unwrap()
    }

    #[tokio::test]
    async fn minor_requires_human_loop() {
        let policy = RecordingPolicy::default();
        let engine = DecisionEngine::new(&policy, &OnboardingConfig::default());
        let d = engine.decide(&validated("01/01/2010"), None, today()).await.unwrap();
        assert_eq!(d.decision.action, Action::HumanLoopRequired);
        assert_eq!(d.decision.age, 15);
        assert_eq!(d.advisories.len(), 2);
        assert_eq!(
            policy.queries.lock().unwrap().as_slice(),
            ["What happens if the customer is 15 years old?"]
        );
    }

    #[tokio::test]
    async fn adult_is_inserted() {
        let policy = RecordingPolicy::default();
        let engine = DecisionEngine::new(&policy, &OnboardingConfig::default());
        let d = engine
            .decide(&validated("19/06/2007"), Some("9840821235"), today())
            .await
            .unwrap();
        assert_eq!(d.decision.action, Action::InsertRequired);
        assert_eq!(d.decision.age, 18);
        assert_eq!(d.decision.phone.as_deref(), Some("9840821235"));
    }

    #[tokio::test]
    async fn policy_failure_does_not_change_branch() {
        let policy = RecordingPolicy {
            fail: true,
            ..Default::default()
        };
        let engine = DecisionEngine::new(&policy, &OnboardingConfig::default());
        let d = engine.decide(&validated("01/01/2010"), None, today()).await.unwrap();
        assert_eq!(d.decision.action, Action::HumanLoopRequired);
        assert!(d.advisories.is_empty());
    }

    #[tokio::test]
    async fn configured_adult_age() {
        let policy = RecordingPolicy::default();
        let config = OnboardingConfig {
            adult_age: 21,
            policy_results: 1,
        };
        let engine = DecisionEngine::new(&policy, &config);
        let d = engine.decide(&validated("01/01/2005"), None, today()).await.unwrap();
        assert_eq!(d.decision.action, Action::HumanLoopRequired);
        assert_eq!(d.advisories.len(), 1);
    }

    #[tokio::test]
    async fn future_dob_requires_human_loop() {
        let policy = RecordingPolicy::default();
        let engine = DecisionEngine::new(&policy, &OnboardingConfig::default());
        let d = engine.decide(&validated("20/06/2025"), None, today()).await.unwrap();
        assert_eq!(d.decision.action, Action::HumanLoopRequired);
        assert_eq!(d.decision.age, -1);
    }

    #[tokio::test]
    async fn bad_dob_is_parse_error() {
        let policy = RecordingPolicy::default();
        let engine = DecisionEngine::new(&policy, &OnboardingConfig::default());
        let err = engine
            .decide(&validated("01-01-2010"), None, today())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(StatusCode::DobParseError));
        assert!(policy.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_validation_is_rejected() {
        let policy = RecordingPolicy::default();
        let engine = DecisionEngine::new(&policy, &OnboardingConfig::default());
        let failed = ValidationResult::failure(FailureReason::NotFound, ExtractedFields::default());
        let err = engine.decide(&failed, None, today()).await.unwrap_err();
        assert!(matches!(err, EkycError::Validation { .. }));
    }
}
