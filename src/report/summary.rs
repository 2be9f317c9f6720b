use crate::core::HealthRecord;
use chrono::NaiveDate;

/// Aggregate figures for the dashboard header.
///
/// Each metric is averaged only over the records that carry it; a metric no
/// record carries comes out as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub entries: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub average_weight: Option<f64>,
    pub min_weight: Option<f64>,
    pub max_weight: Option<f64>,
    pub latest_weight: Option<f64>,
    /// Latest weight minus earliest weight.
    pub weight_change: Option<f64>,
    /// Saturates at `u64::MAX`.
    pub total_steps: u64,
    pub average_steps: Option<f64>,
    pub average_sleep_hours: Option<f64>,
}

impl Summary {
    pub fn compute<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a HealthRecord>,
    {
        let mut summary = Summary::default();
        let mut weights: Vec<(NaiveDate, f64)> = Vec::new();
        let mut steps_days = 0usize;
        let mut sleep_total = 0.0;
        let mut sleep_days = 0usize;

        for record in records {
            summary.entries += 1;
            summary.first_date = Some(summary.first_date.map_or(record.date, |d| d.min(record.date)));
            summary.last_date = Some(summary.last_date.map_or(record.date, |d| d.max(record.date)));

            if let Some(weight) = record.weight {
                weights.push((record.date, weight));
            }
            if let Some(steps) = record.steps {
                summary.total_steps = summary.total_steps.saturating_add(steps);
                steps_days += 1;
            }
            if let Some(hours) = record.sleep_hours {
                sleep_total += hours;
                sleep_days += 1;
            }
        }

        if !weights.is_empty() {
            weights.sort_by_key(|(date, _)| *date);
            let values = weights.iter().map(|(_, w)| *w);
            summary.average_weight = Some(values.clone().sum::<f64>() / weights.len() as f64);
            summary.min_weight = values.clone().reduce(f64::min);
            summary.max_weight = values.reduce(f64::max);

            let earliest = weights[0].1;
            let latest = weights[weights.len() - 1].1;
            summary.latest_weight = Some(latest);
            summary.weight_change = Some(latest - earliest);
        }

        if steps_days > 0 {
            summary.average_steps = Some(summary.total_steps as f64 / steps_days as f64);
        }
        if sleep_days > 0 {
            summary.average_sleep_hours = Some(sleep_total / sleep_days as f64);
        }

        summary
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }
}
