use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, SecondsFormat, Utc};

#[cfg(not(test))]
/// 現在のUTC時間を取得する。
pub fn now() -> DateTime<Utc> {
    Utc::now()
}


#[cfg(test)]
pub use mock_datetime::now;

/// 問い合わせに利用する期間。両端を含む。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// UTCで指定日の00:00:00.000から23:59:59.999までの期間を返す。
    pub fn day(date: NaiveDate) -> Self {
        Self::days(date, date)
    }

    /// UTCで`first`の00:00:00.000から`last`の23:59:59.999までの期間を返す。
    pub fn days(first: NaiveDate, last: NaiveDate) -> Self {
        let start = first.and_time(NaiveTime::MIN).and_utc();
        let end = last.and_time(NaiveTime::MIN).and_utc() + Duration::days(1)
            - Duration::milliseconds(1);
        Self { start, end }
    }

    /// APIのクエリパラメータ形式で開始日時を返す。
    pub fn start_param(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// APIのクエリパラメータ形式で終了日時を返す。
    pub fn end_param(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// `YYYY-MM-DD`形式の日付をパースする。
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("Failed to parse date: {}", s))
}
