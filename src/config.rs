use std::{env, fmt, fs, path::PathBuf};

use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde::Deserialize;

const DEFAULT_API_URL: &str = "https://www.toggl.com/api/v8";
const DEFAULT_HOURS_PER_DAY: f64 = 7.7;
const DEFAULT_VACATION_PROJECT_ID: u64 = 16179964;

/// アプリケーションの設定。
///
/// 各コマンドとクライアントには生成時に明示的に渡す。
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_token: String,
    pub api_url: String,
    /// 1日あたりの目標時間。
    pub hours_per_day: f64,
    pub vacation_project_id: u64,
    pub vacation_description: String,
    pub created_with: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            hours_per_day: DEFAULT_HOURS_PER_DAY,
            vacation_project_id: DEFAULT_VACATION_PROJECT_ID,
            vacation_description: "vacation".to_string(),
            created_with: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_token", &"***")
            .field("api_url", &self.api_url)
            .field("hours_per_day", &self.hours_per_day)
            .field("vacation_project_id", &self.vacation_project_id)
            .field("vacation_description", &self.vacation_description)
            .field("created_with", &self.created_with)
            .finish()
    }
}

impl Config {
    /// 設定ファイルと環境変数から設定を読み込む。
    ///
    /// `config.json`が存在すれば読み込み、その後`TOGGL_API_TOKEN`、`TOGGL_API_URL`、
    /// `TOGGL_HOURS_PER_DAY`で上書きする。API tokenが無い場合はエラーを返す。
    pub fn load() -> Result<Self> {
        let config = match config_path() {
            Some(path) if path.exists() => {
                info!("Load config from {}", path.display());
                let content = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config: {}", path.display()))?;
                Self::from_json(&content)
                    .with_context(|| format!("Failed to parse config: {}", path.display()))?
            }
            _ => Self::default(),
        };

        let config = config.with_overrides(|key| env::var(key).ok())?;
        debug!("{:?}", config);
        config.validate()?;

        Ok(config)
    }

    /// JSON文字列から設定を作成する。指定の無い項目はデフォルト値とする。
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Invalid config json")
    }

    /// `lookup`で取得した値で設定を上書きする。
    fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("TOGGL_API_TOKEN") {
            self.api_token = token;
        }
        if let Some(url) = lookup("TOGGL_API_URL") {
            self.api_url = url;
        }
        if let Some(hours) = lookup("TOGGL_HOURS_PER_DAY") {
            self.hours_per_day = hours
                .parse()
                .with_context(|| format!("TOGGL_HOURS_PER_DAY must be a number: {}", hours))?;
        }

        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.api_token.is_empty() {
            bail!("TOGGL_API_TOKEN must be set");
        }
        if self.hours_per_day.is_nan() || self.hours_per_day <= 0.0 {
            bail!("hours_per_day must be positive: {}", self.hours_per_day);
        }
        Ok(())
    }

    /// 指定したtokenとデフォルト値で設定を作成する。
    #[cfg(test)]
    pub fn with_token(token: &str) -> Self {
        Self {
            api_token: token.to_string(),
            ..Self::default()
        }
    }
}

/// 設定ファイルのパスを返す。
fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(env!("CARGO_PKG_NAME")).join("config.json"))
}
