use std::fmt::Display;
use std::io::Write;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};

use crate::time_entry::TimeEntry;

/// レポートの表示形式。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    /// 1日の開始、休憩時間、終了を1行で表示する。
    StartStopPause,
    /// エントリーごとに開始と終了を表示する。
    StartStop,
}

/// Consoleにtime entryを表示するためのtrait。
pub trait ConsolePresenter {
    /// タイムエントリーを表示する。
    ///
    /// # Arguments
    ///
    /// * `time_entries` - 表示するタイムエントリー。APIが返した順に並んでいること。
    fn show_time_entries(&mut self, time_entries: &[TimeEntry]) -> Result<()>;
}

/// 1日の開始時刻、休憩時間(分)、終了時刻を`DD.MM.YYYY | HH:MM | PPP | HH:MM`形式で表示する。
///
/// 休憩時間は連続するエントリー間の空き時間を分単位で切り上げて合計したもの。
/// エントリーが重なっている場合はエラーを返す。
pub struct ConsoleStartStopPause<'a, W: Write, Tz: TimeZone> {
    writer: &'a mut W,
    tz: Tz,
}

impl<'a, W: Write, Tz: TimeZone> ConsoleStartStopPause<'a, W, Tz> {
    /// 新しい`ConsoleStartStopPause`を返す。
    pub fn new(writer: &'a mut W, tz: Tz) -> Self {
        Self { writer, tz }
    }
}

impl<'a, W: Write, Tz: TimeZone> ConsolePresenter for ConsoleStartStopPause<'a, W, Tz>
where
    Tz::Offset: Display,
{
    fn show_time_entries(&mut self, time_entries: &[TimeEntry]) -> Result<()> {
        let (first, last) = match (time_entries.first(), time_entries.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Ok(()),
        };

        let pause = pause_minutes(time_entries)?;
        writeln!(
            self.writer,
            "{} | {} | {:03} | {}",
            format_day(&first.start, &self.tz),
            format_clock(&first.start, &self.tz),
            pause,
            format_stop(last.effective_stop(), &self.tz)
        )
        .with_context(|| format!("Failed to write report for entries starting {}", first.start))?;

        Ok(())
    }
}

/// タイムエントリーごとに`DD.MM.YYYY | HH:MM | HH:MM`形式で1行ずつ表示する。
pub struct ConsoleStartStop<'a, W: Write, Tz: TimeZone> {
    writer: &'a mut W,
    tz: Tz,
}

impl<'a, W: Write, Tz: TimeZone> ConsoleStartStop<'a, W, Tz> {
    /// 新しい`ConsoleStartStop`を返す。
    pub fn new(writer: &'a mut W, tz: Tz) -> Self {
        Self { writer, tz }
    }
}

impl<'a, W: Write, Tz: TimeZone> ConsolePresenter for ConsoleStartStop<'a, W, Tz>
where
    Tz::Offset: Display,
{
    fn show_time_entries(&mut self, time_entries: &[TimeEntry]) -> Result<()> {
        for entry in time_entries {
            writeln!(
                self.writer,
                "{} | {} | {}",
                format_day(&entry.start, &self.tz),
                format_clock(&entry.start, &self.tz),
                format_stop(entry.effective_stop(), &self.tz)
            )
            .with_context(|| format!("Failed to write time entry: {:?}", entry))?;
        }

        Ok(())
    }
}

/// 連続するエントリー間の休憩時間を分単位で合計する。
///
/// 各区間は分単位で切り上げる。
fn pause_minutes(time_entries: &[TimeEntry]) -> Result<i64> {
    let mut pause = 0;
    for pair in time_entries.windows(2) {
        let (previous, next) = (&pair[0], &pair[1]);
        let previous_stop = match previous.effective_stop() {
            Some(stop) => stop,
            None => bail!(
                "time entry {} is still running but followed by time entry {}. please check on the website",
                previous.id,
                next.id
            ),
        };
        if previous_stop > next.start {
            bail!(
                "time entries {} and {} overlap. please check on the website",
                previous.id,
                next.id
            );
        }

        let milliseconds = (next.start - previous_stop).num_milliseconds();
        pause += (milliseconds + 59_999) / 60_000;
    }

    Ok(pause)
}

fn format_day<Tz: TimeZone>(datetime: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    datetime.with_timezone(tz).format("%d.%m.%Y").to_string()
}

fn format_clock<Tz: TimeZone>(datetime: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    datetime.with_timezone(tz).format("%H:%M").to_string()
}

fn format_stop<Tz: TimeZone>(stop: Option<DateTime<Utc>>, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    stop.map(|stop| format_clock(&stop, tz))
        .unwrap_or_else(|| "now".to_string())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use rstest::rstest;

    use super::{ConsolePresenter, ConsoleStartStop, ConsoleStartStopPause};
    use crate::time_entry::TimeEntry;

    /// テスト用に2016-08-26のダミーのTimeEntryを作成する。
    fn dummy_entry(id: u64, start: (u32, u32, u32), seconds: i64) -> TimeEntry {
        let start = Utc
            .with_ymd_and_hms(2016, 8, 26, start.0, start.1, start.2)
            .unwrap();
        TimeEntry {
            id,
            project_id: None,
            description: None,
            start,
            stop: Some(start + Duration::seconds(seconds)),
            duration: seconds,
            duration_only: false,
            billable: false,
            at: None,
            user_id: None,
        }
    }

    /// 終了時刻はそのままで開始時刻だけを`milliseconds`遅らせる。
    fn delayed(mut entry: TimeEntry, milliseconds: i64) -> TimeEntry {
        entry.start = entry.start + Duration::milliseconds(milliseconds);
        entry
    }

    fn show_start_stop_pause(entries: &[TimeEntry]) -> anyhow::Result<String> {
        let mut writer = Vec::new();
        ConsoleStartStopPause::new(&mut writer, Utc).show_time_entries(entries)?;
        Ok(String::from_utf8(writer).unwrap())
    }

    fn show_start_stop(entries: &[TimeEntry]) -> String {
        let mut writer = Vec::new();
        ConsoleStartStop::new(&mut writer, Utc)
            .show_time_entries(entries)
            .unwrap();
        String::from_utf8(writer).unwrap()
    }

    #[rstest]
    #[case::no_entry(&[], "")]
    #[case::single(
        &[dummy_entry(1, (9, 0, 0), 2 * 3600)],
        "26.08.2016 | 09:00 | 000 | 11:00\n",
    )]
    #[case::one_hour_pause(
        &[dummy_entry(1, (9, 0, 0), 2 * 3600), dummy_entry(2, (12, 0, 0), 3600)],
        "26.08.2016 | 09:00 | 060 | 13:00\n",
    )]
    #[case::round_up_each_gap(
        &[
            dummy_entry(1, (9, 0, 0), 3600),
            dummy_entry(2, (10, 0, 1), 3600),
            dummy_entry(3, (11, 0, 2), 3600),
        ],
        "26.08.2016 | 09:00 | 002 | 12:00\n",
    )]
    #[case::sub_second_gap(
        &[dummy_entry(1, (9, 0, 0), 3600), delayed(dummy_entry(2, (10, 0, 0), 3600), 500)],
        "26.08.2016 | 09:00 | 001 | 11:00\n",
    )]
    #[case::adjacent(
        &[dummy_entry(1, (9, 0, 0), 3600), dummy_entry(2, (10, 0, 0), 3600)],
        "26.08.2016 | 09:00 | 000 | 11:00\n",
    )]
    fn test_start_stop_pause(#[case] input: &[TimeEntry], #[case] expected: &str) {
        assert_eq!(show_start_stop_pause(input).unwrap(), expected);
    }

    /// duration_onlyのエントリーは開始時刻とdurationから終了時刻を求める。
    #[test]
    fn test_start_stop_pause_duration_only() {
        let mut vacation = dummy_entry(1, (10, 0, 0), 27720);
        vacation.stop = None;
        vacation.duration_only = true;

        assert_eq!(
            show_start_stop_pause(&[vacation]).unwrap(),
            "26.08.2016 | 10:00 | 000 | 17:42\n"
        );
    }

    #[test]
    fn test_start_stop_pause_running() {
        let mut running = dummy_entry(2, (12, 0, 0), 0);
        running.stop = None;
        running.duration = -1472212800;

        assert_eq!(
            show_start_stop_pause(&[dummy_entry(1, (9, 0, 0), 3600), running]).unwrap(),
            "26.08.2016 | 09:00 | 120 | now\n"
        );
    }

    /// エントリーが重なっている場合は負の休憩時間を計算せずにエラーとする。
    #[rstest]
    #[case::overlap(&[dummy_entry(1, (9, 0, 0), 2 * 3600), dummy_entry(2, (10, 0, 0), 3600)])]
    #[case::overlap_later_pair(&[
        dummy_entry(1, (8, 0, 0), 3600),
        dummy_entry(2, (9, 30, 0), 3600),
        dummy_entry(3, (10, 29, 59), 3600),
    ])]
    fn test_start_stop_pause_overlap(#[case] input: &[TimeEntry]) {
        let error = show_start_stop_pause(input).unwrap_err();

        assert!(error.to_string().contains("overlap"));
    }

    #[test]
    fn test_start_stop_pause_idempotent() {
        let entries = [
            dummy_entry(1, (9, 0, 0), 2 * 3600),
            dummy_entry(2, (12, 0, 0), 3600),
        ];

        assert_eq!(
            show_start_stop_pause(&entries).unwrap(),
            show_start_stop_pause(&entries).unwrap()
        );
    }

    #[rstest]
    #[case::no_entry(&[], "")]
    #[case::single(
        &[dummy_entry(1, (9, 0, 0), 2 * 3600)],
        "26.08.2016 | 09:00 | 11:00\n",
    )]
    #[case::not_aggregated(
        &[dummy_entry(1, (9, 0, 0), 2 * 3600), dummy_entry(2, (12, 0, 0), 3600)],
        "26.08.2016 | 09:00 | 11:00\n26.08.2016 | 12:00 | 13:00\n",
    )]
    #[case::overlap_is_not_checked(
        &[dummy_entry(1, (9, 0, 0), 2 * 3600), dummy_entry(2, (10, 0, 0), 3600)],
        "26.08.2016 | 09:00 | 11:00\n26.08.2016 | 10:00 | 11:00\n",
    )]
    fn test_start_stop(#[case] input: &[TimeEntry], #[case] expected: &str) {
        let output = show_start_stop(input);

        assert_eq!(output.lines().count(), input.len());
        assert_eq!(output, expected);
    }
}
