use crate::core::HealthRecord;
use std::fmt;

/// Plain-text table of records, one row per record in the given order.
#[derive(Debug)]
pub struct RecordTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RecordTable {
    pub fn new<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a HealthRecord>,
    {
        let columns = ["date", "weight (kg)", "steps", "sleep (h)"]
            .iter()
            .map(|c| c.to_string())
            .collect();

        let rows = records
            .into_iter()
            .map(|record| {
                vec![
                    record.date.to_string(),
                    optional(record.weight.map(|w| format!("{:.1}", w))),
                    optional(record.steps.map(|s| s.to_string())),
                    optional(record.sleep_hours.map(|h| format!("{:.1}", h))),
                ]
            })
            .collect();

        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn optional(value: Option<String>) -> String {
    value.unwrap_or_else(|| "-".to_string())
}

impl fmt::Display for RecordTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows.is_empty() {
            return writeln!(f, "No records");
        }

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.len()).collect();
        for row in &self.rows {
            for (i, value) in row.iter().enumerate() {
                widths[i] = widths[i].max(value.len());
            }
        }

        let header: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{:width$}", col, width = widths[i]))
            .collect();
        writeln!(f, "{}", header.join(" | "))?;

        let separator: String = widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-");
        writeln!(f, "{}", separator)?;

        for row in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, val)| format!("{:width$}", val, width = widths[i]))
                .collect();
            writeln!(f, "{}", cells.join(" | "))?;
        }

        write!(f, "\n{} record(s)", self.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_renders_missing_values_as_dash() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let records = vec![HealthRecord::new(date).weight(70.5).steps(8000)];
        let table = RecordTable::new(&records);
        let text = table.to_string();

        assert_eq!(table.row_count(), 1);
        assert!(text.starts_with("date       | weight (kg) | steps | sleep (h)"));
        assert!(text.contains("2024-01-02 | 70.5"));
        assert!(text.contains("| -"));
        assert!(text.ends_with("1 record(s)"));
    }

    #[test]
    fn test_empty_table() {
        let table = RecordTable::new(&Vec::<HealthRecord>::new());
        assert!(table.is_empty());
        assert_eq!(table.to_string(), "No records\n");
    }
}
