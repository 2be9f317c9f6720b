use super::{Result, StoreError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Upper bound accepted for `weight`, in kilograms.
pub const MAX_WEIGHT_KG: f64 = 300.0;

/// Upper bound accepted for `sleep_hours`.
pub const MAX_SLEEP_HOURS: f64 = 24.0;

/// One day of health metrics.
///
/// `date` is the key the dashboard upserts by; the store itself never
/// deduplicates, so two records may share a date on disk if a caller saves
/// them that way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub date: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<u64>,

    #[serde(
        rename = "sleepHours",
        alias = "sleep_hours",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sleep_hours: Option<f64>,
}

impl HealthRecord {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            weight: None,
            steps: None,
            sleep_hours: None,
        }
    }

    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn steps(mut self, steps: u64) -> Self {
        self.steps = Some(steps);
        self
    }

    pub fn sleep_hours(mut self, hours: f64) -> Self {
        self.sleep_hours = Some(hours);
        self
    }

    /// Returns true when the record carries none of the metrics.
    pub fn is_empty(&self) -> bool {
        self.weight.is_none() && self.steps.is_none() && self.sleep_hours.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(weight) = self.weight {
            check_range(self.date, "weight", weight, MAX_WEIGHT_KG)?;
        }
        if let Some(hours) = self.sleep_hours {
            check_range(self.date, "sleepHours", hours, MAX_SLEEP_HOURS)?;
        }
        Ok(())
    }
}

fn check_range(date: NaiveDate, field: &str, value: f64, max: f64) -> Result<()> {
    if !value.is_finite() || !(0.0..=max).contains(&value) {
        return Err(StoreError::InvalidRecord {
            date: date.to_string(),
            reason: format!("{} must be between 0 and {}, got {}", field, max, value),
        });
    }
    Ok(())
}

/// Sorts by date, newest first. Stable, so records sharing a date keep their
/// relative order.
pub fn sort_newest_first(records: &mut [HealthRecord]) {
    records.sort_by_key(|record| Reverse(record.date));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_serializes_camel_case_and_skips_absent_fields() {
        let record = HealthRecord::new(date("2024-01-02")).weight(70.5).sleep_hours(7.5);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"date": "2024-01-02", "weight": 70.5, "sleepHours": 7.5})
        );
    }

    #[test]
    fn test_accepts_snake_case_sleep_key() {
        let record: HealthRecord =
            serde_json::from_str(r#"{"date":"2024-03-01","steps":4200,"sleep_hours":6.25}"#)
                .unwrap();
        assert_eq!(record.sleep_hours, Some(6.25));
        assert_eq!(record.steps, Some(4200));
        assert_eq!(record.weight, None);
    }

    #[test]
    fn test_rejects_malformed_date() {
        let parsed = serde_json::from_str::<HealthRecord>(r#"{"date":"2024/03/01"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_rejects_negative_steps() {
        let parsed = serde_json::from_str::<HealthRecord>(r#"{"date":"2024-03-01","steps":-5}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_validate_ranges() {
        let d = date("2024-01-01");
        assert!(HealthRecord::new(d).weight(300.0).validate().is_ok());
        assert!(HealthRecord::new(d).weight(0.0).sleep_hours(24.0).validate().is_ok());
        assert!(HealthRecord::new(d).weight(300.1).validate().is_err());
        assert!(HealthRecord::new(d).weight(-1.0).validate().is_err());
        assert!(HealthRecord::new(d).weight(f64::NAN).validate().is_err());
        assert!(HealthRecord::new(d).sleep_hours(24.5).validate().is_err());
    }

    #[test]
    fn test_invalid_record_names_field() {
        let err = HealthRecord::new(date("2024-01-01"))
            .sleep_hours(-2.0)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("sleepHours"));
        assert!(err.to_string().contains("2024-01-01"));
    }

    #[test]
    fn test_sort_newest_first_is_stable() {
        let mut records = vec![
            HealthRecord::new(date("2024-01-01")).steps(1),
            HealthRecord::new(date("2024-01-03")).steps(2),
            HealthRecord::new(date("2024-01-01")).steps(3),
            HealthRecord::new(date("2024-01-02")).steps(4),
        ];
        sort_newest_first(&mut records);
        let steps: Vec<_> = records.iter().map(|r| r.steps.unwrap()).collect();
        assert_eq!(steps, vec![2, 4, 1, 3]);
    }
}
