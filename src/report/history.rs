use crate::core::HealthRecord;
use chrono::NaiveDate;

/// Inclusive date window; an open side is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    /// The `days` days ending at `today`, both ends included.
    pub fn last_days(today: NaiveDate, days: u32) -> Self {
        let span = days.saturating_sub(1) as u64;
        let from = today.checked_sub_days(chrono::Days::new(span));
        Self { from, to: Some(today) }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }
}

/// Records inside `range`, newest first, at most `limit` of them.
pub fn history<'a>(
    records: &'a [HealthRecord],
    range: DateRange,
    limit: Option<usize>,
) -> Vec<&'a HealthRecord> {
    let mut selected: Vec<&HealthRecord> =
        records.iter().filter(|r| range.contains(r.date)).collect();
    selected.sort_by(|a, b| b.date.cmp(&a.date));
    if let Some(limit) = limit {
        selected.truncate(limit);
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample() -> Vec<HealthRecord> {
        ["2024-01-01", "2024-01-04", "2024-01-02", "2024-01-03"]
            .iter()
            .map(|d| HealthRecord::new(date(d)))
            .collect()
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let range = DateRange::new(Some(date("2024-01-02")), Some(date("2024-01-03")));
        assert!(range.contains(date("2024-01-02")));
        assert!(range.contains(date("2024-01-03")));
        assert!(!range.contains(date("2024-01-04")));
        assert!(DateRange::all().contains(date("1999-12-31")));
    }

    #[test]
    fn test_last_days() {
        let range = DateRange::last_days(date("2024-03-07"), 7);
        assert_eq!(range.from, Some(date("2024-03-01")));
        assert_eq!(range.to, Some(date("2024-03-07")));
    }

    #[test]
    fn test_history_filters_sorts_and_limits() {
        let records = sample();
        let range = DateRange::new(Some(date("2024-01-02")), None);
        let dates: Vec<String> = history(&records, range, Some(2))
            .iter()
            .map(|r| r.date.to_string())
            .collect();
        assert_eq!(dates, vec!["2024-01-04", "2024-01-03"]);
    }
}
