use std::fmt::Display;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::TimeZone;
use log::{info, warn};

use crate::console::{ConsolePresenter, ConsoleStartStop, ConsoleStartStopPause, ReportFormat};
use crate::datetime::{parse_date, DateRange};
use crate::toggl::TogglRepository;

/// `report`と`times`サブコマンドの処理を行う。
pub struct ReportCommand<'a, T: TogglRepository, Tz: TimeZone> {
    toggl_client: &'a T,
    tz: Tz,
}

impl<'a, T: TogglRepository, Tz: TimeZone> ReportCommand<'a, T, Tz>
where
    Tz::Offset: Display,
{
    /// 新しい`ReportCommand`を返す。
    ///
    /// # Arguments
    /// * `toggl_client` - Toggl APIと通信するためのリポジトリ
    /// * `tz` - 日付と時刻の表示に利用するタイムゾーン
    pub fn new(toggl_client: &'a T, tz: Tz) -> Self {
        Self { toggl_client, tz }
    }

    /// 指定された日付のタイムエントリーを取得し、`format`の形式で表示する。
    ///
    /// 期間はUTCで指定日の00:00:00.000から23:59:59.999までとする。
    ///
    /// # Arguments
    ///
    /// * `date` - `YYYY-MM-DD`形式の日付
    /// * `format` - 表示形式
    /// * `writer` - 出力先
    pub async fn run<W: Write>(
        &self,
        date: &str,
        format: ReportFormat,
        writer: &mut W,
    ) -> Result<()> {
        let date = parse_date(date)?;
        let range = DateRange::day(date);
        info!("Start at: {}, End at: {}", range.start_param(), range.end_param());

        let time_entries = self
            .toggl_client
            .read_time_entries(&range)
            .await
            .with_context(|| format!("Failed to retrieve time entries for {}", date))?;
        if time_entries.is_empty() {
            warn!("No time entries for {}", date);
            return Ok(());
        }

        let result = match format {
            ReportFormat::StartStopPause => {
                ConsoleStartStopPause::new(writer, self.tz.clone()).show_time_entries(&time_entries)
            }
            ReportFormat::StartStop => {
                ConsoleStartStop::new(writer, self.tz.clone()).show_time_entries(&time_entries)
            }
        };
        result.with_context(|| format!("Failed to report time entries for {}", date))
    }
}
