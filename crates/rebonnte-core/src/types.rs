//! # Domain Types
//!
//! Core domain records used throughout Rebonnte.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Aisle       │   │    Medicine     │   │      Stock      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  aisle_id       │◄──┼─────────────────┼───│  aisle_id       │       │
//! │  │  name (unique)  │   │  medicine_id    │◄──│  medicine_id    │       │
//! │  │  description    │   │  name (unique)  │   │  quantity >= 0  │       │
//! │  └─────────────────┘   └────────┬────────┘   └─────────────────┘       │
//! │                                 │                                       │
//! │                                 ▼                                       │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      User       │   │  StockHistory   │   │MedicineWithStock│       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (auth UID)  │   │  append-only    │   │  medicine +     │       │
//! │  │  email ─────────┼──►│  author         │   │  quantity       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Document Schema
//! Records serialize with the field names of the logical document schema
//! (`medicineId`, `fabricant`, `principeActif`, ...). Rust field names stay
//! descriptive; serde renames bridge the two.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{HISTORY_DATE_FORMAT, HISTORY_TIME_FORMAT};

// =============================================================================
// Aisle
// =============================================================================

/// A named storage location grouping medicines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Aisle {
    /// Document identifier.
    pub aisle_id: String,

    /// Display name, unique among aisles.
    pub name: String,

    pub description: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Aisle {
    /// Creates a new aisle with a fresh id, stamped now.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Aisle {
            aisle_id: generate_id(),
            name: name.into(),
            description: description.into(),
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Medicine
// =============================================================================

/// A medicine stocked by the pharmacy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    pub medicine_id: String,

    /// Display name, unique among medicines.
    pub name: String,

    pub description: String,
    pub dosage: String,

    #[serde(rename = "fabricant")]
    pub manufacturer: String,

    pub indication: String,

    #[serde(rename = "principeActif")]
    pub active_ingredient: String,

    #[serde(rename = "utilisation")]
    pub usage: String,

    pub warning: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for creating a medicine.
///
/// Carries the descriptive fields only: identity and creation time are
/// assigned by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewMedicine {
    pub name: String,
    pub description: String,
    pub dosage: String,
    #[serde(rename = "fabricant")]
    pub manufacturer: String,
    pub indication: String,
    #[serde(rename = "principeActif")]
    pub active_ingredient: String,
    #[serde(rename = "utilisation")]
    pub usage: String,
    pub warning: String,
}

impl NewMedicine {
    /// Materializes the medicine record with its assigned identity.
    pub fn into_medicine(self, medicine_id: String, created_at: DateTime<Utc>) -> Medicine {
        Medicine {
            medicine_id,
            name: self.name,
            description: self.description,
            dosage: self.dosage,
            manufacturer: self.manufacturer,
            indication: self.indication,
            active_ingredient: self.active_ingredient,
            usage: self.usage,
            warning: self.warning,
            created_at,
        }
    }
}

// =============================================================================
// Medicine With Stock
// =============================================================================

/// Projection joining a medicine with its current stock quantity.
///
/// This is what list and detail screens render. It is rebuilt from the
/// database on every refresh and never written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MedicineWithStock {
    pub medicine_id: String,
    pub name: String,
    pub description: String,
    pub dosage: String,
    #[serde(rename = "fabricant")]
    pub manufacturer: String,
    pub indication: String,
    #[serde(rename = "principeActif")]
    pub active_ingredient: String,
    #[serde(rename = "utilisation")]
    pub usage: String,
    pub warning: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub quantity: i64,
}

impl MedicineWithStock {
    /// Joins a medicine with a quantity.
    pub fn from_parts(medicine: Medicine, quantity: i64) -> Self {
        MedicineWithStock {
            medicine_id: medicine.medicine_id,
            name: medicine.name,
            description: medicine.description,
            dosage: medicine.dosage,
            manufacturer: medicine.manufacturer,
            indication: medicine.indication,
            active_ingredient: medicine.active_ingredient,
            usage: medicine.usage,
            warning: medicine.warning,
            created_at: medicine.created_at,
            quantity,
        }
    }
}

// =============================================================================
// Stock
// =============================================================================

/// The quantity-tracking join record between a medicine and its aisle.
///
/// Exactly one row exists per medicine. `quantity` never drops below zero:
/// it only moves through [`apply_delta`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Stock {
    pub medicine_id: String,
    pub aisle_id: String,
    pub quantity: i64,
}

/// Applies a signed delta to a stock quantity, clamped at zero.
///
/// ## Example
/// ```rust
/// use rebonnte_core::types::apply_delta;
///
/// assert_eq!(apply_delta(2, 3), 5);
/// assert_eq!(apply_delta(2, -5), 0);
/// ```
pub fn apply_delta(current: i64, delta: i64) -> i64 {
    current.saturating_add(delta).max(0)
}

// =============================================================================
// Stock Action
// =============================================================================

/// Direction of a stock movement, derived from the delta sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum StockAction {
    Add,
    Remove,
}

impl StockAction {
    /// `Add` for a positive delta, `Remove` otherwise (zero included).
    pub fn from_delta(delta: i64) -> Self {
        if delta > 0 {
            StockAction::Add
        } else {
            StockAction::Remove
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockAction::Add => "ADD",
            StockAction::Remove => "REMOVE",
        }
    }
}

impl std::fmt::Display for StockAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Stock History
// =============================================================================

/// An immutable audit entry for one persisted stock movement.
///
/// ## Snapshot Pattern
/// `medicine_name` is frozen at write time, so the entry still reads
/// correctly after the medicine is renamed or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockHistory {
    pub history_id: String,
    pub medicine_id: String,
    pub medicine_name: String,

    /// Signed delta of the batch, not the resulting quantity.
    pub quantity: i64,

    pub action: StockAction,
    pub description: String,

    /// Resolved email of the acting user, or "Unknown".
    pub author: String,

    /// `dd-MM-yyyy` in local time.
    pub date: String,

    /// `HH:mm:ss` in local time.
    pub time: String,

    /// Instant used for ordering.
    #[ts(as = "String")]
    pub recorded_at: DateTime<Utc>,
}

impl StockHistory {
    /// Builds the audit entry for a delta applied at `at`.
    pub fn record(
        medicine_id: impl Into<String>,
        medicine_name: impl Into<String>,
        delta: i64,
        description: impl Into<String>,
        author: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        let local = at.with_timezone(&Local);
        StockHistory {
            history_id: generate_id(),
            medicine_id: medicine_id.into(),
            medicine_name: medicine_name.into(),
            quantity: delta,
            action: StockAction::from_delta(delta),
            description: description.into(),
            author: author.into(),
            date: local.format(HISTORY_DATE_FORMAT).to_string(),
            time: local.format(HISTORY_TIME_FORMAT).to_string(),
            recorded_at: at,
        }
    }
}

// =============================================================================
// User
// =============================================================================

/// A user profile mirrored from the authentication identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    /// Authentication provider UID.
    pub id: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
}

impl User {
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        firstname: impl Into<String>,
        lastname: impl Into<String>,
    ) -> Self {
        User {
            id: id.into(),
            firstname: firstname.into(),
            lastname: lastname.into(),
            email: email.into(),
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Generates a new document id.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Lowercases `value`, then title-cases its first character.
///
/// ## Example
/// ```rust
/// use rebonnte_core::types::capitalize_first_letter;
///
/// assert_eq!(capitalize_first_letter("jEAN"), "Jean");
/// ```
pub fn capitalize_first_letter(value: &str) -> String {
    let lower = value.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, TimeZone};

    fn sample_new_medicine() -> NewMedicine {
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
    fn test_apply_delta_clamps_at_zero() {
        assert_eq!(apply_delta(0, 1), 1);
        assert_eq!(apply_delta(2, -5), 0);
        assert_eq!(apply_delta(10, -10), 0);
        assert_eq!(apply_delta(3, 0), 3);
        assert_eq!(apply_delta(i64::MAX, 1), i64::MAX);
    }

    #[test]
    fn test_action_from_delta_sign() {
        assert_eq!(StockAction::from_delta(1), StockAction::Add);
        assert_eq!(StockAction::from_delta(-1), StockAction::Remove);
        assert_eq!(StockAction::from_delta(0), StockAction::Remove);
        assert_eq!(StockAction::Add.to_string(), "ADD");
    }

    #[test]
    fn test_history_record_formats_date_and_time() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let entry = StockHistory::record("med-1", "Ibuprofen", -5, "Sold", "a@b.c", at);

        assert_eq!(entry.quantity, -5);
        assert_eq!(entry.action, StockAction::Remove);
        assert_eq!(entry.recorded_at, at);
        assert!(NaiveDate::parse_from_str(&entry.date, "%d-%m-%Y").is_ok());
        assert!(NaiveTime::parse_from_str(&entry.time, "%H:%M:%S").is_ok());
        assert_eq!(entry.date.len(), 10);
        assert_eq!(entry.time.len(), 8);
    }

    #[test]
    fn test_medicine_serializes_with_document_field_names() {
        let medicine = sample_new_medicine().into_medicine("med-1".to_string(), Utc::now());
        let json = serde_json::to_value(&medicine).unwrap();

        assert_eq!(json["medicineId"], "med-1");
        assert_eq!(json["fabricant"], "Pharma SA");
        assert_eq!(json["principeActif"], "Ibuprofen");
        assert_eq!(json["utilisation"], "Oral");
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_history_action_serializes_uppercase() {
        let json = serde_json::to_value(StockAction::Remove).unwrap();
        assert_eq!(json, "REMOVE");
    }

    #[test]
    fn test_medicine_with_stock_from_parts() {
        let medicine = sample_new_medicine().into_medicine("med-1".to_string(), Utc::now());
        let joined = MedicineWithStock::from_parts(medicine.clone(), 7);

        assert_eq!(joined.medicine_id, medicine.medicine_id);
        assert_eq!(joined.manufacturer, medicine.manufacturer);
        assert_eq!(joined.quantity, 7);
    }

    #[test]
    fn test_capitalize_first_letter() {
        assert_eq!(capitalize_first_letter("jean"), "Jean");
        assert_eq!(capitalize_first_letter("DUPONT"), "Dupont");
        assert_eq!(capitalize_first_letter("éLODIE"), "Élodie");
        assert_eq!(capitalize_first_letter(""), "");
    }

    #[test]
    fn test_new_aisle_has_fresh_id() {
        let a = Aisle::new("Fridge", "Cold storage");
        let b = Aisle::new("Fridge", "Cold storage");
        assert_ne!(a.aisle_id, b.aisle_id);
    }
}
