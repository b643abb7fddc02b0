use std::env;
use std::ffi::OsString;
use std::fmt::Display;
use std::io::{self, Write};

use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use clap::{CommandFactory, ErrorKind, Parser, Subcommand};
use log::{error, warn};

mod config;
mod console;
mod datetime;
mod logger;
mod report_command;
mod target_command;
mod time_entry;
mod toggl;
mod vacation_command;

use config::Config;
use console::ReportFormat;
use report_command::ReportCommand;
use target_command::TargetCommand;
use toggl::{TogglClient, TogglRepository};
use vacation_command::VacationCommand;

/// Togglへ休暇を登録し、日毎、月毎のレポートを表示するCLIアプリケーション。
///
/// # Examples
/// ```
/// $ cargo run -- vacation 2016-08-26 2016-08-27
/// $ cargo run -- report 2016-08-26
/// $ cargo run -- target
/// ```
#[derive(Debug, Parser)]
#[clap(version, about, arg_required_else_help = true)]
struct Args {
    #[clap(subcommand)]
    subcommand: SubCommands,
}

/// サブコマンドを表す列挙型。
#[derive(Debug, PartialEq, Subcommand)]
enum SubCommands {
    /// Add a vacation time entry for each date
    #[clap(visible_alias = "v")]
    Vacation(DatesArgs),
    /// Print a start-pause-stop report for each date
    #[clap(visible_alias = "r")]
    Report(DatesArgs),
    /// Print the start and stop of every time entry for each date
    #[clap(visible_alias = "t")]
    Times(DatesArgs),
    /// Print the monthly target vs actual hours
    Target,
}

/// 日付を受け取るサブコマンドの引数。
#[derive(Debug, PartialEq, clap::Args)]
struct DatesArgs {
    #[clap(value_name = "DATE", help = "Dates in the format YYYY-MM-DD")]
    dates: Vec<String>,
}

/// 引数をパースする。
///
/// 操作が不明または未指定の場合は警告と使い方を出力し、`None`を返す。
fn parse_args<I, S, W>(argv: I, writer: &mut W) -> Result<Option<SubCommands>>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString> + Clone,
    W: Write,
{
    let error = match Args::try_parse_from(argv) {
        Ok(args) => return Ok(Some(args.subcommand)),
        Err(error) => error,
    };

    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            write!(writer, "{}", error).context("Failed to write help")?;
            return Ok(None);
        }
        ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand | ErrorKind::MissingSubcommand => {
            warn!("no operation supplied. nothing to do.");
        }
        _ => {
            let message = error.to_string();
            warn!("{}", message.lines().next().unwrap_or("unknown operation"));
        }
    }

    Args::command()
        .write_help(writer)
        .context("Failed to write usage")?;
    writeln!(writer).context("Failed to write usage")?;

    Ok(None)
}

/// サブコマンドを実行する。
///
/// 日付ごとに引数の順で処理し、失敗した日付はログに出力して次の日付の処理を続ける。
async fn dispatch<T, Tz, W>(
    subcommand: SubCommands,
    toggl_client: &T,
    config: &Config,
    tz: Tz,
    writer: &mut W,
) where
    T: TogglRepository,
    Tz: TimeZone,
    Tz::Offset: Display,
    W: Write,
{
    match subcommand {
        SubCommands::Vacation(args) => {
            let command = VacationCommand::new(toggl_client, config);
            for date in &args.dates {
                if let Err(e) = command.run(date, writer).await {
                    error!("{:#}", e);
                }
            }
        }
        SubCommands::Report(args) => {
            report_dates(&args.dates, ReportFormat::StartStopPause, toggl_client, tz, writer).await
        }
        SubCommands::Times(args) => {
            report_dates(&args.dates, ReportFormat::StartStop, toggl_client, tz, writer).await
        }
        SubCommands::Target => {
            let command = TargetCommand::new(toggl_client, config);
            if let Err(e) = command.run(writer).await {
                error!("{:#}", e);
            }
        }
    }
}

async fn report_dates<T, Tz, W>(
    dates: &[String],
    format: ReportFormat,
    toggl_client: &T,
    tz: Tz,
    writer: &mut W,
) where
    T: TogglRepository,
    Tz: TimeZone,
    Tz::Offset: Display,
    W: Write,
{
    let command = ReportCommand::new(toggl_client, tz);
    for date in dates {
        if let Err(e) = command.run(date, format, writer).await {
            error!("{:#}", e);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init(logger::level_from(env::var("RUST_LOG").ok().as_deref()))?;

    let mut stdout = io::stdout();
    let subcommand = match parse_args(env::args_os(), &mut stdout)? {
        Some(subcommand) => subcommand,
        None => return Ok(()),
    };

    let config = Config::load().context("Failed to load config")?;
    let client = TogglClient::new(&config);
    dispatch(subcommand, &client, &config, Local, &mut stdout).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use chrono::{Duration, Utc};
    use clap::CommandFactory;
    use rstest::rstest;

    use super::{dispatch, parse_args, Args, DatesArgs, SubCommands};
    use crate::config::Config;
    use crate::time_entry::TimeEntry;
    use crate::toggl::{ApiResponse, MockTogglRepository};

    fn dates(dates: &[&str]) -> DatesArgs {
        DatesArgs {
            dates: dates.iter().map(|date| date.to_string()).collect(),
        }
    }

    #[test]
    fn test_command() {
        Args::command().debug_assert();
    }

    #[rstest]
    #[case::vacation(&["toggl-times", "vacation", "2016-08-26"], SubCommands::Vacation(dates(&["2016-08-26"])))]
    #[case::vacation_alias(&["toggl-times", "v", "2016-08-26", "2016-08-27"], SubCommands::Vacation(dates(&["2016-08-26", "2016-08-27"])))]
    #[case::report_alias(&["toggl-times", "r", "2016-08-26"], SubCommands::Report(dates(&["2016-08-26"])))]
    #[case::times_alias(&["toggl-times", "t"], SubCommands::Times(dates(&[])))]
    #[case::target(&["toggl-times", "target"], SubCommands::Target)]
    fn test_parse_args(#[case] argv: &[&str], #[case] expected: SubCommands) {
        let mut writer = Vec::new();

        let subcommand = parse_args(argv.iter().copied(), &mut writer).unwrap();

        assert_eq!(subcommand, Some(expected));
        assert!(writer.is_empty());
    }

    /// 不明または未指定の操作は使い方を表示し、何も実行しない。
    #[rstest]
    #[case::unknown(&["toggl-times", "holiday", "2016-08-26"])]
    #[case::missing(&["toggl-times"])]
    #[case::target_with_date(&["toggl-times", "target", "2016-08-26"])]
    fn test_parse_args_usage(#[case] argv: &[&str]) {
        let mut writer = Vec::new();

        let subcommand = parse_args(argv.iter().copied(), &mut writer).unwrap();

        assert_eq!(subcommand, None);
        let output = String::from_utf8(writer).unwrap();
        assert!(output.contains("vacation"));
        assert!(output.contains("target"));
    }

    #[tokio::test]
    async fn test_dispatch_without_dates() {
        let config = Config::with_token("secret");
        let mut toggl = MockTogglRepository::new();
        toggl.expect_read_time_entries().times(0);
        toggl.expect_create_time_entry().times(0);

        let mut writer = Vec::new();
        dispatch(SubCommands::Report(dates(&[])), &toggl, &config, Utc, &mut writer).await;
        dispatch(SubCommands::Vacation(dates(&[])), &toggl, &config, Utc, &mut writer).await;

        assert!(writer.is_empty());
    }

    /// 失敗した日付があっても残りの日付を引数の順に処理する。
    #[tokio::test]
    async fn test_dispatch_continues_after_failure() {
        let config = Config::with_token("secret");
        let mut toggl = MockTogglRepository::new();
        toggl
            .expect_read_time_entries()
            .times(2)
            .returning(|range| {
                if range.start_param().starts_with("2016-08-26") {
                    return Err(anyhow!("error (500): boom"));
                }
                let start = range.start + Duration::hours(9);
                Ok(vec![TimeEntry {
                    id: 1,
                    project_id: None,
                    description: None,
                    start,
                    stop: Some(start + Duration::hours(1)),
                    duration: 3600,
                    duration_only: false,
                    billable: false,
                    at: None,
                    user_id: None,
                }])
            });

        let mut writer = Vec::new();
        dispatch(
            SubCommands::Times(dates(&["2016-08-26", "not-a-date", "2016-08-29"])),
            &toggl,
            &config,
            Utc,
            &mut writer,
        )
        .await;

        assert_eq!(
            String::from_utf8(writer).unwrap(),
            "29.08.2016 | 09:00 | 10:00\n"
        );
    }

    #[tokio::test]
    async fn test_dispatch_vacation_each_date() {
        let config = Config::with_token("secret");
        let mut toggl = MockTogglRepository::new();
        toggl.expect_create_time_entry().times(2).returning(|_| {
            Ok(ApiResponse {
                status: 200,
                headers: vec![],
                body: "{}".to_string(),
            })
        });

        let mut writer = Vec::new();
        dispatch(
            SubCommands::Vacation(dates(&["2016-08-26", "2016-08-27"])),
            &toggl,
            &config,
            Utc,
            &mut writer,
        )
        .await;

        let output = String::from_utf8(writer).unwrap();
        assert_eq!(output.matches("statusCode: 200").count(), 2);
        assert!(output.find("2016-08-26T10").unwrap() < output.find("2016-08-27T10").unwrap());
    }
}
