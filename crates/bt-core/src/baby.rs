//! Baby records and caregiver-configurable settings.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A baby being tracked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baby {
    pub id: Uuid,
    pub name: String,
    pub birth_date: NaiveDate,
    pub primary_caregiver_id: Uuid,
    pub settings: BabySettings,
    pub created_at: DateTime<Utc>,
}

impl Baby {
    /// Creates a baby record with default settings.
    pub fn new(
        name: impl Into<String>,
        birth_date: NaiveDate,
        primary_caregiver_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            birth_date,
            primary_caregiver_id,
            settings: BabySettings::default(),
            created_at,
        }
    }

    /// Age in whole days as of the given date. Zero for future birth dates.
    pub fn age_in_days(&self, today: NaiveDate) -> i64 {
        (today - self.birth_date).num_days().max(0)
    }
}

/// Caregiver-configurable settings for a baby.
///
/// `refrigerated_expiry_hours` is clamped to `[1, 24]` at construction and
/// deserialization; downstream code relies on the bound without re-checking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BabySettings {
    /// Default bottle size in ounces.
    pub default_bottle_size_oz: f64,
    /// How long a refrigerated bottle keeps, in hours.
    #[serde(deserialize_with = "clamp_expiry_hours")]
    pub refrigerated_expiry_hours: i64,
    /// Whether amounts display in milliliters instead of ounces.
    pub use_metric_units: bool,
}

impl BabySettings {
    pub const MIN_EXPIRY_HOURS: i64 = 1;
    pub const MAX_EXPIRY_HOURS: i64 = 24;

    /// Creates settings, clamping the expiry policy into `[1, 24]` hours.
    pub fn new(
        default_bottle_size_oz: f64,
        refrigerated_expiry_hours: i64,
        use_metric_units: bool,
    ) -> Self {
        Self {
            default_bottle_size_oz,
            refrigerated_expiry_hours: refrigerated_expiry_hours
                .clamp(Self::MIN_EXPIRY_HOURS, Self::MAX_EXPIRY_HOURS),
            use_metric_units,
        }
    }

    /// Formats an ounce amount according to the unit preference.
    pub fn display_amount(&self, oz: f64) -> String {
        if self.use_metric_units {
            format!("{:.0} ml", oz * 29.5735)
        } else {
            format!("{oz:.1} oz")
        }
    }
}

impl Default for BabySettings {
    fn default() -> Self {
        Self::new(4.0, 24, false)
    }
}

fn clamp_expiry_hours<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let hours = i64::deserialize(deserializer)?;
    Ok(hours.clamp(BabySettings::MIN_EXPIRY_HOURS, BabySettings::MAX_EXPIRY_HOURS))
}

/// The role a caregiver has for a baby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaregiverRole {
    Primary,
    Caregiver,
}

impl CaregiverRole {
    /// Whether this role can remove the baby or other caregivers.
    pub const fn can_manage_baby(self) -> bool {
        matches!(self, Self::Primary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_hours_clamped_at_construction() {
        assert_eq!(BabySettings::new(4.0, 0, false).refrigerated_expiry_hours, 1);
        assert_eq!(BabySettings::new(4.0, 48, false).refrigerated_expiry_hours, 24);
        assert_eq!(BabySettings::new(4.0, 12, false).refrigerated_expiry_hours, 12);
    }

    #[test]
    fn expiry_hours_clamped_on_deserialize() {
        let json = r#"{"default_bottle_size_oz":4.0,"refrigerated_expiry_hours":99,"use_metric_units":false}"#;
        let settings: BabySettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.refrigerated_expiry_hours, 24);
    }

    #[test]
    fn age_in_days_never_negative() {
        let baby = Baby::new(
            "Robin",
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            Uuid::new_v4(),
            Utc::now(),
        );
        assert_eq!(baby.age_in_days(NaiveDate::from_ymd_opt(2025, 3, 29).unwrap()), 28);
        assert_eq!(baby.age_in_days(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()), 0);
    }

    #[test]
    fn display_amount_respects_units() {
        let imperial = BabySettings::default();
        assert_eq!(imperial.display_amount(4.0), "4.0 oz");

        let metric = BabySettings::new(4.0, 24, true);
        assert_eq!(metric.display_amount(4.0), "118 ml");
    }
}
