use crate::core::HealthRecord;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Weight,
    Steps,
    Sleep,
}

impl Metric {
    pub fn value_of(self, record: &HealthRecord) -> Option<f64> {
        match self {
            Metric::Weight => record.weight,
            Metric::Steps => record.steps.map(|s| s as f64),
            Metric::Sleep => record.sleep_hours,
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::Weight => "kg",
            Metric::Steps => "steps",
            Metric::Sleep => "h",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Weight => write!(f, "weight"),
            Metric::Steps => write!(f, "steps"),
            Metric::Sleep => write!(f, "sleep"),
        }
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "weight" => Ok(Metric::Weight),
            "steps" => Ok(Metric::Steps),
            "sleep" | "sleephours" | "sleep_hours" => Ok(Metric::Sleep),
            other => Err(format!("unknown metric '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Chart series for one metric, oldest first. Records without the metric are
/// skipped rather than plotted as zero.
pub fn trend<'a, I>(records: I, metric: Metric) -> Vec<TrendPoint>
where
    I: IntoIterator<Item = &'a HealthRecord>,
{
    let mut points: Vec<TrendPoint> = records
        .into_iter()
        .filter_map(|record| {
            metric.value_of(record).map(|value| TrendPoint {
                date: record.date,
                value,
            })
        })
        .collect();
    points.sort_by_key(|p| p.date);
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_trend_is_oldest_first_and_skips_gaps() {
        let records = vec![
            HealthRecord::new(date("2024-01-03")).steps(300),
            HealthRecord::new(date("2024-01-02")).weight(70.0),
            HealthRecord::new(date("2024-01-01")).steps(100),
        ];
        let points = trend(&records, Metric::Steps);
        assert_eq!(
            points,
            vec![
                TrendPoint { date: date("2024-01-01"), value: 100.0 },
                TrendPoint { date: date("2024-01-03"), value: 300.0 },
            ]
        );
    }

    #[test]
    fn test_metric_parsing() {
        assert_eq!("Weight".parse::<Metric>(), Ok(Metric::Weight));
        assert_eq!("sleep_hours".parse::<Metric>(), Ok(Metric::Sleep));
        assert!("mood".parse::<Metric>().is_err());
    }
}
