//! # Validation Module
//!
//! Required-field checks run by the forms before any gateway write.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Form (rebonnte-session)                                      │
//! │  └── THIS MODULE: required fields, first failure wins                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Gateway (rebonnte-db)                                        │
//! │  └── Duplicate-name check → false                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── UNIQUE name indexes                                               │
//! │  └── CHECK (quantity >= 0)                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rebonnte_core::validation::validate_aisle_form;
//!
//! assert!(validate_aisle_form("Fridge", "Cold storage").is_ok());
//! let err = validate_aisle_form("", "Cold storage").unwrap_err();
//! assert_eq!(err.to_string(), "Aisle name is required.");
//! ```

use crate::error::ValidationError;
use crate::types::NewMedicine;
use crate::MIN_PASSWORD_LENGTH;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn require(value: &str, field: &str, message: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field, message));
    }
    Ok(())
}

// =============================================================================
// Form Validators
// =============================================================================

/// Validates the add-aisle form.
///
/// ## Rules
/// - Name must not be blank
/// - Description must not be blank
pub fn validate_aisle_form(name: &str, description: &str) -> ValidationResult<()> {
    require(name, "name", "Aisle name is required.")?;
    require(description, "description", "Aisle description is required.")?;
    Ok(())
}

/// Validates the add-medicine form.
///
/// ## Rules
/// Every descriptive field is required, checked in form order, and an aisle
/// must be chosen. The first failure is returned.
pub fn validate_medicine_form(
    medicine: &NewMedicine,
    aisle_id: Option<&str>,
) -> ValidationResult<()> {
    require(&medicine.name, "name", "Medicine name is required.")?;
    require(
        &medicine.active_ingredient,
        "active_ingredient",
        "Active substance is required.",
    )?;
    require(&medicine.manufacturer, "manufacturer", "Manufacturer is required.")?;
    require(&medicine.description, "description", "Description is required.")?;
    require(&medicine.indication, "indication", "Indication is required.")?;
    require(&medicine.usage, "usage", "Usage is required.")?;
    require(&medicine.warning, "warning", "Warning is required.")?;
    require(&medicine.dosage, "dosage", "Dosage is required.")?;
    require(aisle_id.unwrap_or(""), "aisle_id", "Set the aisle of the medicine.")?;
    Ok(())
}

// =============================================================================
// Credential Validators
// =============================================================================

/// Validates an email address.
///
/// ## Rules
/// - Must not be blank
/// - Must have a non-empty local part and a dotted domain
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    require(email, "email", "Email is required.")?;

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "expected name@domain.tld".to_string(),
        });
    }

    Ok(())
}

/// Validates a password.
///
/// ## Rules
/// - At least [`MIN_PASSWORD_LENGTH`] characters
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_medicine() -> NewMedicine {
        NewMedicine {
            name: "Ibuprofen".to_string(),
            description: "Anti-inflammatory".to_string(),
            dosage: "200mg".to_string(),
            manufacturer: "Pharma SA".to_string(),
            indication: "Pain".to_string(),
            active_ingredient: "Ibuprofen".to_string(),
            usage: "Oral".to_string(),
            warning: "Take with food".to_string(),
        }
    }

    #[test]
    fn test_validate_aisle_form() {
        assert!(validate_aisle_form("Fridge", "Cold storage").is_ok());

        let err = validate_aisle_form("  ", "Cold storage").unwrap_err();
        assert_eq!(err.to_string(), "Aisle name is required.");

        let err = validate_aisle_form("Fridge", "").unwrap_err();
        assert_eq!(err.to_string(), "Aisle description is required.");
    }

    #[test]
    fn test_validate_medicine_form_accepts_complete_input() {
        assert!(validate_medicine_form(&complete_medicine(), Some("Fridge")).is_ok());
    }

    #[test]
    fn test_validate_medicine_form_reports_first_missing_field() {
        let mut medicine = complete_medicine();
        medicine.manufacturer.clear();
        medicine.dosage.clear();

        let err = validate_medicine_form(&medicine, Some("Fridge")).unwrap_err();
        assert_eq!(err.to_string(), "Manufacturer is required.");
        assert_eq!(err.field(), "manufacturer");
    }

    #[test]
    fn test_validate_medicine_form_checks_order() {
        let cases: [(fn(&mut NewMedicine), &str); 7] = [
            (|m| m.name.clear(), "Medicine name is required."),
            (|m| m.active_ingredient.clear(), "Active substance is required."),
            (|m| m.description.clear(), "Description is required."),
            (|m| m.indication.clear(), "Indication is required."),
            (|m| m.usage.clear(), "Usage is required."),
            (|m| m.warning.clear(), "Warning is required."),
            (|m| m.dosage.clear(), "Dosage is required."),
        ];

        for (clear, expected) in cases {
            let mut medicine = complete_medicine();
            clear(&mut medicine);
            let err = validate_medicine_form(&medicine, Some("Fridge")).unwrap_err();
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_validate_medicine_form_requires_aisle() {
        let medicine = complete_medicine();
        let err = validate_medicine_form(&medicine, None).unwrap_err();
        assert_eq!(err.to_string(), "Set the aisle of the medicine.");

        let err = validate_medicine_form(&medicine, Some("")).unwrap_err();
        assert_eq!(err.to_string(), "Set the aisle of the medicine.");
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("pharma@rebonnte.fr").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@rebonnte.fr").is_err());
        assert!(validate_email("a@localhost").is_err());
        assert!(validate_email("a@b@c.fr").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret").is_ok());
        assert!(validate_password("12345").is_err());
    }
}
