use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use log::info;
#[cfg(test)]
use mockall::automock;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::datetime::DateRange;
use crate::time_entry::{NewTimeEntry, TimeEntry};

/// Toggl APIのレスポンスをデシリアライズするための構造体。
#[derive(Debug, Deserialize)]
struct TogglTimeEntry {
    id: u64,
    pid: Option<u64>,
    description: Option<String>,
    start: String,
    stop: Option<String>,
    duration: i64,
    #[serde(default)]
    duronly: bool,
    #[serde(default)]
    billable: bool,
    at: Option<String>,
    uid: Option<u64>,
}

impl TryFrom<TogglTimeEntry> for TimeEntry {
    type Error = anyhow::Error;

    fn try_from(entry: TogglTimeEntry) -> Result<Self> {
        Ok(TimeEntry {
            id: entry.id,
            project_id: entry.pid,
            description: entry.description,
            start: parse_timestamp(&entry.start)?,
            stop: entry.stop.as_deref().map(parse_timestamp).transpose()?,
            duration: entry.duration,
            duration_only: entry.duronly,
            billable: entry.billable,
            at: entry.at.as_deref().map(parse_timestamp).transpose()?,
            user_id: entry.uid,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let datetime = DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Failed to parse timestamp: {}", s))?;
    Ok(datetime.to_utc())
}

/// タイムエントリー作成時のリクエストボディ。
#[derive(Debug, Serialize)]
pub struct CreateTimeEntryRequest<'a> {
    time_entry: &'a NewTimeEntry,
}

impl<'a> From<&'a NewTimeEntry> for CreateTimeEntryRequest<'a> {
    fn from(time_entry: &'a NewTimeEntry) -> Self {
        Self { time_entry }
    }
}

/// 加工していないAPIのレスポンス。
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Toggl APIへの操作を表すtrait。
#[cfg_attr(test, automock)]
pub trait TogglRepository {
    /// タイムエントリーを作成し、レスポンスをそのまま返す。
    async fn create_time_entry(&self, entry: &NewTimeEntry) -> Result<ApiResponse>;

    /// 指定された期間のタイムエントリーをAPIが返した順に取得する。
    async fn read_time_entries(&self, range: &DateRange) -> Result<Vec<TimeEntry>>;
}

/// Toggl APIと通信するためのクライアント。
///
/// # Examples
///
/// ```
/// let client = TogglClient::new(&config);
/// let time_entries = client.read_time_entries(&range).await.unwrap();
/// ```
pub struct TogglClient {
    client: Client,
    api_url: String,
    api_token: String,
}

impl TogglClient {
    /// 新しい`TogglClient`を返す。
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        }
    }

    fn time_entries_url(&self) -> String {
        format!("{}/time_entries", self.api_url)
    }
}

impl TogglRepository for TogglClient {
    async fn create_time_entry(&self, entry: &NewTimeEntry) -> Result<ApiResponse> {
        let response = self
            .client
            .post(self.time_entries_url())
            .basic_auth(&self.api_token, Some("api_token"))
            .header(CONTENT_TYPE, "application/json")
            .json(&CreateTimeEntryRequest::from(entry))
            .send()
            .await
            .with_context(|| format!("Failed to send request to Toggl API at {}", self.api_url))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }

    async fn read_time_entries(&self, range: &DateRange) -> Result<Vec<TimeEntry>> {
        let response = self
            .client
            .get(self.time_entries_url())
            .basic_auth(&self.api_token, Some("api_token"))
            .header(CONTENT_TYPE, "application/json")
            .query(&[
                ("start_date", range.start_param()),
                ("end_date", range.end_param()),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to send request to Toggl API at {}", self.api_url))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            bail!("error ({}): {}", status.as_u16(), message);
        }

        let toggl_time_entries = response
            .json::<Vec<TogglTimeEntry>>()
            .await
            .context("Failed to deserialize response")?;
        info!("length of time entries: {}", toggl_time_entries.len());

        toggl_time_entries
            .into_iter()
            .map(TimeEntry::try_from)
            .collect()
    }
}
