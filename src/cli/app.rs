use super::args::{AddArgs, Command, RangeArgs};
use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use healthtrack::report::{DateRange, Metric, RecordTable, Summary, history, trend};
use healthtrack::{HealthRecord, HealthSession, LoadSource, OverwritePolicy, UpsertOutcome};
use std::io::Write;

pub struct App {
    session: HealthSession,
    today: NaiveDate,
}

impl App {
    pub fn new(session: HealthSession) -> Self {
        Self {
            session,
            today: Local::now().date_naive(),
        }
    }

    #[cfg(test)]
    fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Load warnings collected when the session opened, for the caller to
    /// show on stderr.
    pub fn load_warnings(&self) -> Vec<String> {
        self.session
            .load_warnings()
            .iter()
            .map(|w| w.to_string())
            .collect()
    }

    pub fn run(&mut self, command: Command, out: &mut impl Write) -> Result<()> {
        match command {
            Command::Add(args) => self.add(args, out),
            Command::List { range, limit } => self.list(range, limit, out),
            Command::Summary { range } => self.summary(range, out),
            Command::Trend { metric, range } => self.trend(metric, range, out),
            Command::Check => self.check(out),
        }
    }

    fn add(&mut self, args: AddArgs, out: &mut impl Write) -> Result<()> {
        let date = args.date.unwrap_or(self.today);
        let mut record = HealthRecord::new(date);
        record.weight = args.weight;
        record.steps = args.steps;
        record.sleep_hours = args.sleep;
        if record.is_empty() {
            bail!("nothing to record: pass at least one of --weight, --steps, --sleep");
        }

        let policy = if args.overwrite {
            OverwritePolicy::Overwrite
        } else {
            OverwritePolicy::Ask
        };

        match self.session.upsert(record, policy)? {
            UpsertOutcome::Conflict { existing } => {
                bail!(
                    "{} already has a record ({}); pass --overwrite to replace it",
                    date,
                    describe(&existing)
                );
            }
            UpsertOutcome::Replaced { .. } => {
                self.commit()?;
                writeln!(out, "Updated record for {}", date)?;
            }
            UpsertOutcome::Inserted => {
                self.commit()?;
                writeln!(out, "Saved record for {}", date)?;
            }
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let path = self.session.store().paths().primary.clone();
        self.session
            .commit()
            .with_context(|| format!("Failed to save '{}'", path.display()))?;
        Ok(())
    }

    fn list(&self, range: RangeArgs, limit: Option<usize>, out: &mut impl Write) -> Result<()> {
        let selected = history(self.session.records(), self.range(range), limit);
        write!(out, "{}", RecordTable::new(selected))?;
        writeln!(out)?;
        Ok(())
    }

    fn summary(&self, range: RangeArgs, out: &mut impl Write) -> Result<()> {
        let selected = history(self.session.records(), self.range(range), None);
        let summary = Summary::compute(selected);
        if summary.is_empty() {
            writeln!(out, "No records")?;
            return Ok(());
        }

        if let (Some(first), Some(last)) = (summary.first_date, summary.last_date) {
            writeln!(out, "Entries:        {} ({} to {})", summary.entries, first, last)?;
        }
        writeln!(out, "Avg weight:     {}", fixed(summary.average_weight, " kg"))?;
        writeln!(out, "Min/max weight: {} / {}", fixed(summary.min_weight, ""), fixed(summary.max_weight, ""))?;
        writeln!(out, "Latest weight:  {}", fixed(summary.latest_weight, " kg"))?;
        writeln!(out, "Weight change:  {}", signed(summary.weight_change))?;
        writeln!(out, "Total steps:    {}", summary.total_steps)?;
        writeln!(
            out,
            "Avg steps:      {}",
            summary
                .average_steps
                .map_or_else(|| "-".to_string(), |s| format!("{:.0}", s))
        )?;
        writeln!(out, "Avg sleep:      {}", fixed(summary.average_sleep_hours, " h"))?;
        Ok(())
    }

    fn trend(&self, metric: Metric, range: RangeArgs, out: &mut impl Write) -> Result<()> {
        let selected = history(self.session.records(), self.range(range), None);
        let points = trend(selected, metric);
        if points.is_empty() {
            writeln!(out, "No {} data", metric)?;
            return Ok(());
        }
        for point in points {
            writeln!(out, "{}\t{}\t{}", point.date, point.value, metric.unit())?;
        }
        Ok(())
    }

    fn check(&self, out: &mut impl Write) -> Result<()> {
        let paths = self.session.store().paths();
        let source = match self.session.load_source() {
            LoadSource::Empty => "empty",
            LoadSource::Primary => "data file",
            LoadSource::Backup => "backup (data file repaired)",
        };
        writeln!(out, "Data file: {}", paths.primary.display())?;
        writeln!(out, "Loaded {} records from {}", self.session.records().len(), source)?;
        let warnings = self.session.load_warnings();
        if warnings.is_empty() {
            writeln!(out, "No problems found")?;
        }
        for warning in warnings {
            writeln!(out, "warning: {}", warning)?;
        }
        Ok(())
    }

    fn range(&self, args: RangeArgs) -> DateRange {
        match args.days {
            Some(days) => DateRange::last_days(self.today, days),
            None => DateRange::new(args.from, args.to),
        }
    }
}

fn describe(record: &HealthRecord) -> String {
    let mut parts = Vec::new();
    if let Some(w) = record.weight {
        parts.push(format!("weight {:.1} kg", w));
    }
    if let Some(s) = record.steps {
        parts.push(format!("{} steps", s));
    }
    if let Some(h) = record.sleep_hours {
        parts.push(format!("sleep {:.1} h", h));
    }
    parts.join(", ")
}

fn fixed(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.1}{}", v, unit))
}

fn signed(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:+.1} kg", v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::Cli;
    use clap::Parser;
    use healthtrack::{RecordStore, StoreConfig};
    use tempfile::TempDir;

    fn app_in(temp_dir: &TempDir) -> App {
        let store = RecordStore::open(StoreConfig::new(temp_dir.path())).unwrap();
        App::new(HealthSession::open(store)).with_today(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap())
    }

    fn run(app: &mut App, args: &[&str]) -> Result<String> {
        let mut argv = vec!["healthtrack"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv)?;
        let mut out = Vec::new();
        app.run(cli.command, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn test_add_then_list() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = app_in(&temp_dir);

        let output = run(&mut app, &["add", "--date", "2024-01-02", "--weight", "70.5"]).unwrap();
        assert_eq!(output, "Saved record for 2024-01-02\n");
        run(&mut app, &["add", "--steps", "4000"]).unwrap();

        let listing = run(&mut app, &["list"]).unwrap();
        let first_row = listing.lines().nth(2).unwrap();
        assert!(first_row.starts_with("2024-01-10"));
        assert!(listing.contains("2 record(s)"));
    }

    #[test]
    fn test_add_refuses_silent_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = app_in(&temp_dir);
        run(&mut app, &["add", "--date", "2024-01-02", "--weight", "70.5"]).unwrap();

        let err = run(&mut app, &["add", "--date", "2024-01-02", "--weight", "69.0"]).unwrap_err();
        assert!(err.to_string().contains("--overwrite"));

        let output = run(
            &mut app,
            &["add", "--date", "2024-01-02", "--weight", "69.0", "--overwrite"],
        )
        .unwrap();
        assert_eq!(output, "Updated record for 2024-01-02\n");
    }

    #[test]
    fn test_add_requires_a_metric() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = app_in(&temp_dir);
        assert!(run(&mut app, &["add", "--date", "2024-01-02"]).is_err());
    }

    #[test]
    fn test_summary_and_trend() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = app_in(&temp_dir);
        run(&mut app, &["add", "--date", "2024-01-01", "--weight", "72", "--steps", "6000"]).unwrap();
        run(&mut app, &["add", "--date", "2024-01-02", "--weight", "71", "--steps", "8000"]).unwrap();

        let summary = run(&mut app, &["summary"]).unwrap();
        assert!(summary.contains("Avg weight:     71.5 kg"));
        assert!(summary.contains("Weight change:  -1.0 kg"));
        assert!(summary.contains("Total steps:    14000"));

        let series = run(&mut app, &["trend", "weight", "--days", "9"]).unwrap();
        assert_eq!(series, "2024-01-02\t71\tkg\n");
    }

    #[test]
    fn test_check_on_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = app_in(&temp_dir);
        let output = run(&mut app, &["check"]).unwrap();
        assert!(output.contains("Loaded 0 records from empty"));
        assert!(output.contains("No problems found"));
    }
}
