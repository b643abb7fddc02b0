use std::io::Write;

use anyhow::{bail, Context, Result};
use log::info;

use crate::config::Config;
use crate::datetime::parse_date;
use crate::time_entry::NewTimeEntry;
use crate::toggl::{CreateTimeEntryRequest, TogglRepository};

/// `vacation`サブコマンドの処理を行う。
pub struct VacationCommand<'a, T: TogglRepository> {
    toggl_client: &'a T,
    config: &'a Config,
}

impl<'a, T: TogglRepository> VacationCommand<'a, T> {
    /// 新しい`VacationCommand`を返す。
    pub fn new(toggl_client: &'a T, config: &'a Config) -> Self {
        Self {
            toggl_client,
            config,
        }
    }

    /// 指定された日付に休暇のタイムエントリーを登録する。
    ///
    /// 送信したペイロードとレスポンスのステータス、ヘッダー、ボディを`writer`に出力する。
    /// 2xx以外のステータスの場合はエラーを返す。
    pub async fn run<W: Write>(&self, date: &str, writer: &mut W) -> Result<()> {
        let date = parse_date(date)?;
        let entry = NewTimeEntry::vacation(date, self.config);
        let payload = serde_json::to_string(&CreateTimeEntryRequest::from(&entry))
            .context("Failed to serialize time entry")?;
        writeln!(writer, "{}", payload).context("Failed to write payload")?;

        let response = self
            .toggl_client
            .create_time_entry(&entry)
            .await
            .with_context(|| format!("Failed to create vacation for {}", date))?;

        writeln!(writer, "statusCode: {}", response.status).context("Failed to write status")?;
        writeln!(writer, "headers:").context("Failed to write headers")?;
        for (name, value) in &response.headers {
            writeln!(writer, "  {}: {}", name, value).context("Failed to write headers")?;
        }
        writeln!(writer, "{}", response.body).context("Failed to write body")?;

        if !response.is_success() {
            bail!("error ({}): {}", response.status, response.body);
        }
        info!("Vacation created for {}", date);

        Ok(())
    }
}
