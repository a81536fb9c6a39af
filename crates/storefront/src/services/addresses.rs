//! Saved shipping addresses.

use std::sync::Arc;

use tracing::instrument;

use boighor_core::AddressId;

use crate::api::{Address, AddressInput, Backend};
use crate::error::AppError;
use crate::notify::Notifier;
use crate::services::session::SessionStore;

/// Check the fields the backend insists on.
///
/// # Errors
///
/// Returns `AppError::Validation` naming the first blank required field.
pub fn validate_address(input: &AddressInput) -> Result<(), AppError> {
    let required = [
        ("Full name", &input.full_name),
        ("Phone", &input.phone),
        ("Address line 1", &input.address_line1),
        ("City", &input.city),
        ("State", &input.state),
        ("Country", &input.country),
        ("Postal code", &input.postal_code),
    ];

    match required.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((label, _)) => Err(AppError::Validation(format!("{label} is required"))),
        None => Ok(()),
    }
}

#[derive(Clone)]
pub struct AddressBook {
    backend: Arc<dyn Backend>,
    session: SessionStore,
    notifier: Notifier,
}

impl AddressBook {
    #[must_use]
    pub const fn new(backend: Arc<dyn Backend>, session: SessionStore, notifier: Notifier) -> Self {
        Self {
            backend,
            session,
            notifier,
        }
    }

    /// # Errors
    ///
    /// Returns `AppError::Unauthenticated` when signed out, or the backend
    /// error.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Address>, AppError> {
        self.require_session()?;
        self.backend
            .addresses()
            .await
            .or_else(|e| self.fail(e.into()))
    }

    /// # Errors
    ///
    /// Returns `AppError::Unauthenticated` when signed out, or the backend
    /// error.
    #[instrument(skip(self), fields(address = %id))]
    pub async fn get(&self, id: &AddressId) -> Result<Address, AppError> {
        self.require_session()?;
        self.backend
            .address(id)
            .await
            .or_else(|e| self.fail(e.into()))
    }

    /// Save a new address and return the refreshed list.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` without calling the backend when a
    /// required field is blank, otherwise the backend error.
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: &AddressInput) -> Result<Vec<Address>, AppError> {
        self.require_session()?;
        if let Err(e) = validate_address(input) {
            return self.fail(e);
        }

        match self.backend.create_address(input).await {
            Ok(response) => self.notifier.success_or(response.message, "Address added"),
            Err(e) => return self.fail(e.into()),
        }
        self.list().await
    }

    /// Delete an address and return the refreshed list.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    #[instrument(skip(self), fields(address = %id))]
    pub async fn delete(&self, id: &AddressId) -> Result<Vec<Address>, AppError> {
        self.require_session()?;
        match self.backend.delete_address(id).await {
            Ok(response) => self.notifier.success_or(response.message, "Address deleted"),
            Err(e) => return self.fail(e.into()),
        }
        self.list().await
    }

    fn require_session(&self) -> Result<(), AppError> {
        match self.session.require_auth() {
            Ok(_) => Ok(()),
            Err(e) => self.fail(e),
        }
    }

    fn fail<T>(&self, err: AppError) -> Result<T, AppError> {
        self.notifier.error(&err);
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> AddressInput {
        AddressInput {
            full_name: "Apu Roy".to_string(),
            phone: "9000000000".to_string(),
            address_line1: "12 College Street".to_string(),
            city: "Kolkata".to_string(),
            state: "West Bengal".to_string(),
            country: "India".to_string(),
            postal_code: "700073".to_string(),
            ..AddressInput::default()
        }
    }

    #[test]
    fn test_complete_address_is_valid() {
        assert!(validate_address(&complete()).is_ok());
    }

    #[test]
    fn test_blank_required_field_is_named() {
        let input = AddressInput {
            city: "   ".to_string(),
            ..complete()
        };
        match validate_address(&input) {
            Err(AppError::Validation(message)) => assert_eq!(message, "City is required"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_optional_fields_may_be_blank() {
        let input = AddressInput {
            alternate_phone: String::new(),
            address_line2: String::new(),
            landmark: String::new(),
            ..complete()
        };
        assert!(validate_address(&input).is_ok());
    }
}
