//! Cross-checking extracted fields against the identity registry.

use std::future::Future;

use ekyc_shared::{ExtractedFields, FailureReason, IdentityRecord, Result, ValidationResult, mask_id};
use ekyc_storage::Storage;
use tracing::{info, instrument};

/// Read access to the system of record.
pub trait IdentityRegistry: Send + Sync {
    fn lookup(&self, id_number: &str)
    -> impl Future<Output = Result<Option<IdentityRecord>>> + Send;
}

impl<T: IdentityRegistry> IdentityRegistry for &T {
    fn lookup(
        &self,
        id_number: &str,
    ) -> impl Future<Output = Result<Option<IdentityRecord>>> + Send {
        (**self).lookup(id_number)
    }
}

impl IdentityRegistry for Storage {
    async fn lookup(&self, id_number: &str) -> Result<Option<IdentityRecord>> {
        self.lookup_identity(id_number).await
    }
}

/// Compares extracted fields with the registry entry for their identity number.
pub struct RegistryValidator<R> {
    registry: R,
}

impl<R: IdentityRegistry> RegistryValidator<R> {
    pub fn new(registry: R) -> Self {
        Self { registry }
    }

    /// Names compare case-insensitively, dates of birth exactly.
    ///
    /// A missing identity number cannot be looked up and is `NOT_FOUND`. A
    /// registry hit with a missing name or date of birth is `FIELD_MISMATCH`.
    #[instrument(skip_all, fields(id_number = fields.id_number.as_deref().map(mask_id)))]
    pub async fn validate(&self, fields: &ExtractedFields) -> Result<ValidationResult> {
        let Some(id_number) = fields.id_number.as_deref() else {
            info!("no identity number to look up");
            return Ok(ValidationResult::failure(FailureReason::NotFound, fields.clone()));
        };

        let Some(record) = self.registry.lookup(id_number).await? else {
            info!("identity number not in registry");
            return Ok(ValidationResult::failure(FailureReason::NotFound, fields.clone()));
        };

        let name_matches = fields
            .name
            .as_deref()
            .is_some_and(|n| n.to_lowercase() == record.name.to_lowercase());
        let dob_matches = fields.dob.as_deref() == Some(record.dob.as_str());

        if name_matches && dob_matches {
            info!("registry match");
            Ok(ValidationResult::success(fields.clone()))
        } else {
            info!(name_matches, dob_matches, "registry mismatch");
            Ok(ValidationResult::failure(FailureReason::FieldMismatch, fields.clone()))
        }
    }
}
