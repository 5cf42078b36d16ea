//! Execution of onboarding decisions.
//!
//! The [`Dispatcher`] inserts adult customers into the customer store and
//! escalates minors to a human reviewer. Both collaborators are injected.

use std::future::Future;

use ekyc_notify::{Notification, Notifier};
use ekyc_shared::{Action, CustomerRecord, EkycError, OnboardingDecision, Result, mask_id};
use ekyc_storage::Storage;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::token;

/// Write access to the customer master.
pub trait CustomerStore: Send + Sync {
    fn upsert(&self, customer: &CustomerRecord) -> impl Future<Output = Result<()>> + Send;
}

impl<T: CustomerStore> CustomerStore for &T {
    fn upsert(&self, customer: &CustomerRecord) -> impl Future<Output = Result<()>> + Send {
        (**self).upsert(customer)
    }
}

impl CustomerStore for Storage {
    async fn upsert(&self, customer: &CustomerRecord) -> Result<()> {
        self.upsert_customer(customer).await
    }
}

/// Hands a decision to a human reviewer.
pub trait Escalation: Send + Sync {
    fn escalate(
        &self,
        decision: &OnboardingDecision,
        reason: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

impl<T: Escalation> Escalation for &T {
    fn escalate(
        &self,
        decision: &OnboardingDecision,
        reason: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        (**self).escalate(decision, reason)
    }
}

/// Escalates by sending a minor-review notification.
pub struct NotifyEscalation<N> {
    notifier: N,
    recipient: String,
}

impl<N: Notifier> NotifyEscalation<N> {
    pub fn new(notifier: N, recipient: impl Into<String>) -> Self {
        Self {
            notifier,
            recipient: recipient.into(),
        }
    }
}

impl<N: Notifier> Escalation for NotifyEscalation<N> {
    async fn escalate(&self, decision: &OnboardingDecision, reason: &str) -> Result<()> {
        let notification = Notification::minor_review(
            &self.recipient,
            &decision.name,
            &decision.dob,
            &decision.id_number,
            decision.phone.as_deref(),
            reason,
        );
        self.notifier.send(&notification).await
    }
}

/// What the dispatcher did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ActionResult {
    /// Customer record written.
    Inserted { id_number: String },
    /// Escalation issued; `notified` is false when the transport failed.
    HumanLoopTriggered { notified: bool },
}

pub struct Dispatcher<S, E> {
    store: S,
    escalation: E,
}

impl<S: CustomerStore, E: Escalation> Dispatcher<S, E> {
    pub fn new(store: S, escalation: E) -> Self {
        Self { store, escalation }
    }

    /// Decode a token and execute it. Nothing is executed when decoding fails.
    pub async fn dispatch(&self, token: &str) -> Result<ActionResult> {
        let decision = token::decode(token)?;
        self.execute(&decision).await
    }

    /// Execute a decision. Neither action is retried.
    #[instrument(skip_all, fields(action = %decision.action, id_number = %mask_id(&decision.id_number)))]
    pub async fn execute(&self, decision: &OnboardingDecision) -> Result<ActionResult> {
        match decision.action {
            Action::HumanLoopRequired => {
                let reason = format!(
                    "Customer is {} years old and cannot be onboarded automatically",
                    decision.age
                );
                let notified = match self.escalation.escalate(decision, &reason).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "escalation notification failed");
                        false
                    }
                };
                info!(notified, "human review triggered");
                Ok(ActionResult::HumanLoopTriggered { notified })
            }
            Action::InsertRequired => {
                let customer = CustomerRecord::onboarded(decision);
                self.store
                    .upsert(&customer)
                    .await
                    .map_err(|e| EkycError::InsertFailed {
                        id_number: mask_id(&decision.id_number),
                        message: e.to_string(),
                    })?;
                info!(age = decision.age, "customer onboarded");
                Ok(ActionResult::Inserted {
                    id_number: decision.id_number.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekyc_shared::StatusCode;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingStore {
        calls: AtomicUsize,
        fail: bool,
        written: Mutex<Vec<CustomerRecord>>,
    }

    impl CustomerStore for CountingStore {
        async fn upsert(&self, customer: &CustomerRecord) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(EkycError::Storage("disk full".into()));
            }
            self.written.lock().unwrap().push(customer.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingEscalation {
        calls: AtomicUsize,
        fail: bool,
    }

    impl Escalation for CountingEscalation {
        async fn escalate(&self, _decision: &OnboardingDecision, _reason: &str) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(EkycError::Notify("smtp down".into()));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct CapturingNotifier {
        sent: Mutex<Vec<Notification>>,
    }

    impl Notifier for CapturingNotifier {
        async fn send(&self, notification: &Notification) -> Result<()> {
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    const MINOR: &str =
        "HUMAN_LOOP_REQUIRED|name:A B,dob:01/01/2010,idNumber:123412341234,age:15";
    const ADULT: &str = "INSERT_REQUIRED|name:A B,dob:01/01/1990,idNumber:123412341234,age:35";

    #[tokio::test]
    async fn human_loop_escalates_once_despite_transport_failure() {
        let store = CountingStore::default();
        let escalation = CountingEscalation {
            fail: true,
            ..Default::default()
        };
        let dispatcher = Dispatcher::new(&store, &escalation);

        let result = dispatcher.dispatch(MINOR).await.unwrap();
        assert_eq!(result, ActionResult::HumanLoopTriggered { notified: false });
        assert_eq!(escalation.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn garbage_token_invokes_nothing() {
        let store = CountingStore::default();
        let escalation = CountingEscalation::default();
        let dispatcher = Dispatcher::new(&store, &escalation);

        let err = dispatcher.dispatch("garbage-no-pipe").await.unwrap_err();
        assert_eq!(err.code(), Some(StatusCode::DispatcherError));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
        assert_eq!(escalation.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn insert_writes_onboarded_customer() {
        let store = CountingStore::default();
        let escalation = CountingEscalation::default();
        let dispatcher = Dispatcher::new(&store, &escalation);

        let result = dispatcher.dispatch(ADULT).await.unwrap();
        assert_eq!(
            result,
            ActionResult::Inserted {
                id_number: "123412341234".into()
            }
        );
        let written = store.written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].age, 35);
        assert_eq!(escalation.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn insert_failure_is_reported_once() {
        let store = CountingStore {
            fail: true,
            ..Default::default()
        };
        let escalation = CountingEscalation::default();
        let dispatcher = Dispatcher::new(&store, &escalation);

        let err = dispatcher.dispatch(ADULT).await.unwrap_err();
        assert_eq!(err.code(), Some(StatusCode::InsertFailed));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn notify_escalation_sends_minor_review() {
        let notifier = CapturingNotifier::default();
        let escalation = NotifyEscalation::new(&notifier, "ops@example.com");
        let dispatcher = Dispatcher::new(CountingStore::default(), escalation);

        let result = dispatcher.dispatch(MINOR).await.unwrap();
        assert_eq!(result, ActionResult::HumanLoopTriggered { notified: true });

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "ops@example.com");
        assert!(sent[0].body.contains("15 years old"));
        assert!(sent[0].body.contains("Phone: N/A"));
    }
}
