use std::collections::BTreeSet;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, Local, NaiveDate, TimeZone, Weekday};
use log::info;

use crate::config::Config;
use crate::datetime::{self, DateRange};
use crate::time_entry::TimeEntry;
use crate::toggl::TogglRepository;

/// 月次の目標時間と実績の集計結果。
#[derive(Debug, PartialEq)]
pub struct MonthlySummary {
    /// 月初から当日までの平日の日数。
    pub working_days: usize,
    /// タイムエントリーが存在する日数。
    pub days_worked: usize,
    pub target_hours: f64,
    pub actual_hours: f64,
}

impl MonthlySummary {
    pub fn balance_hours(&self) -> f64 {
        self.actual_hours - self.target_hours
    }
}

/// `target`サブコマンドの処理を行う。
pub struct TargetCommand<'a, T: TogglRepository> {
    toggl_client: &'a T,
    config: &'a Config,
}

impl<'a, T: TogglRepository> TargetCommand<'a, T> {
    /// 新しい`TargetCommand`を返す。
    pub fn new(toggl_client: &'a T, config: &'a Config) -> Self {
        Self {
            toggl_client,
            config,
        }
    }

    /// 今月の目標時間と実績を表示する。
    ///
    /// Localタイムゾーンで月初から当日までのタイムエントリーを取得し、各エントリーをJSONで表示した上で集計する。
    pub async fn run<W: Write>(&self, writer: &mut W) -> Result<()> {
        let today = datetime::now().with_timezone(&Local).date_naive();
        let first = today.with_day(1).context("Failed to set day")?;

        writeln!(writer, "month start: {}", first).context("Failed to write month start")?;
        writeln!(writer, "today end: {}", today).context("Failed to write today end")?;
        writeln!(writer, "target hours per day: {}", self.config.hours_per_day)
            .context("Failed to write target hours")?;

        let range = DateRange::days(first, today);
        info!("Start at: {}, End at: {}", range.start_param(), range.end_param());
        let time_entries = self
            .toggl_client
            .read_time_entries(&range)
            .await
            .context("Failed to retrieve time entries")?;
        info!("Time entries retrieved successfully.");
        for entry in &time_entries {
            let raw = serde_json::to_string_pretty(entry)
                .with_context(|| format!("Failed to serialize time entry: {:?}", entry))?;
            writeln!(writer, "{}", raw).context("Failed to write time entry")?;
        }

        let summary = summarize(&time_entries, first, today, self.config.hours_per_day, &Local);
        show_summary(writer, &summary)
    }
}

/// 月初`first`から`last`までのタイムエントリーを集計する。
///
/// 実行中のエントリーは集計対象外とする。
/// 日付は`at`(無い場合は`start`)を`tz`で変換したものとする。
pub fn summarize<Tz: TimeZone>(
    time_entries: &[TimeEntry],
    first: NaiveDate,
    last: NaiveDate,
    hours_per_day: f64,
    tz: &Tz,
) -> MonthlySummary {
    let finished: Vec<(&TimeEntry, Duration)> = time_entries
        .iter()
        .filter_map(|entry| entry.worked().map(|worked| (entry, worked)))
        .collect();

    let days_worked = finished
        .iter()
        .map(|(entry, _)| entry.at.unwrap_or(entry.start).with_timezone(tz).date_naive())
        .collect::<BTreeSet<_>>()
        .len();
    let worked_seconds: i64 = finished.iter().map(|(_, worked)| worked.num_seconds()).sum();
    let working_days = count_working_days(first, last);

    MonthlySummary {
        working_days,
        days_worked,
        target_hours: working_days as f64 * hours_per_day,
        actual_hours: worked_seconds as f64 / 3600.0,
    }
}

/// `first`から`last`までの月曜日から金曜日の日数を数える。
fn count_working_days(first: NaiveDate, last: NaiveDate) -> usize {
    first
        .iter_days()
        .take_while(|date| *date <= last)
        .filter(|date| !matches!(date.weekday(), Weekday::Sat | Weekday::Sun))
        .count()
}

/// 集計結果を表示する。
///
/// 表示は時間単位で行う。
fn show_summary<W: Write>(writer: &mut W, summary: &MonthlySummary) -> Result<()> {
    writeln!(writer, "working days this month: {}", summary.working_days)
        .and_then(|_| writeln!(writer, "days worked: {}", summary.days_worked))
        .and_then(|_| writeln!(writer, "target hours: {:.2}", summary.target_hours))
        .and_then(|_| writeln!(writer, "actual hours: {:.2}", summary.actual_hours))
        .and_then(|_| writeln!(writer, "balance: {:+.2}", summary.balance_hours()))
        .context("Failed to write summary")
}
