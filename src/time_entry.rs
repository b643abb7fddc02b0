use chrono::{DateTime, Duration, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use crate::config::Config;

/// Toggl上の1件のタイムエントリー。
///
/// シリアライズ時はAPIと同じフィールド名を利用する。
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimeEntry {
    pub id: u64,
    #[serde(rename = "pid")]
    pub project_id: Option<u64>,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub stop: Option<DateTime<Utc>>,
    /// 秒単位の長さ。実行中のエントリーでは負の値になる。
    pub duration: i64,
    #[serde(rename = "duronly")]
    pub duration_only: bool,
    pub billable: bool,
    /// 最終更新日時。
    pub at: Option<DateTime<Utc>>,
    #[serde(rename = "uid")]
    pub user_id: Option<u64>,
}

impl TimeEntry {
    /// 実際の終了日時を返す。
    ///
    /// `duration_only`の場合は`start + duration`、それ以外は`stop`を利用する。
    /// 実行中のエントリーと、終了日時が表現できない長さのエントリーは`None`を返す。
    pub fn effective_stop(&self) -> Option<DateTime<Utc>> {
        if self.duration_only {
            if self.duration < 0 {
                return None;
            }
            return Duration::try_seconds(self.duration)
                .and_then(|duration| self.start.checked_add_signed(duration));
        }
        self.stop
    }

    /// 終了済みのエントリーの長さを返す。
    pub fn worked(&self) -> Option<Duration> {
        self.effective_stop().map(|stop| stop - self.start)
    }
}

/// 新しく作成するタイムエントリー。
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewTimeEntry {
    pub pid: u64,
    pub description: String,
    #[serde(serialize_with = "serialize_millis")]
    pub start: DateTime<Utc>,
    pub duration: i64,
    pub created_with: String,
    pub duronly: bool,
}

impl NewTimeEntry {
    /// 指定日の休暇エントリーを返す。
    ///
    /// 開始はUTCの10:00、長さは設定された1日あたりの時間とする。
    pub fn vacation(date: NaiveDate, config: &Config) -> Self {
        let start = (date.and_time(NaiveTime::MIN) + Duration::hours(10)).and_utc();

        Self {
            pid: config.vacation_project_id,
            description: config.vacation_description.clone(),
            start,
            duration: (config.hours_per_day * 3600.0).round() as i64,
            created_with: config.created_with.clone(),
            duronly: true,
        }
    }
}

fn serialize_millis<S: Serializer>(
    datetime: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&datetime.to_rfc3339_opts(SecondsFormat::Millis, true))
}
