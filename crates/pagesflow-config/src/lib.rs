pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const ENV_STATIC_DIR: &str = "PAGESFLOW_STATIC_DIR";
pub const ENV_ACCOUNT_ID: &str = "CLOUDFLARE_ACCOUNT_ID";
pub const ENV_API_TOKEN: &str = "CLOUDFLARE_API_TOKEN";
pub const ENV_PROJECT: &str = "CLOUDFLARE_PAGES_PROJECT";
pub const ENV_TRIGGER_FILE: &str = "PAGESFLOW_TRIGGER_FILE";
pub const ENV_DEPLOY_SCRIPT: &str = "PAGESFLOW_DEPLOY_SCRIPT";
pub const ENV_STRATEGY: &str = "PAGESFLOW_STRATEGY";
pub const ENV_STRICT_MISSING: &str = "PAGESFLOW_STRICT_MISSING";
pub const ENV_LOCK_DIR: &str = "PAGESFLOW_LOCK_DIR";
pub const ENV_API_BASE: &str = "CLOUDFLARE_API_BASE";

pub const DEFAULT_STATIC_DIR: &str = "/var/www/html/static-output";
pub const DEFAULT_API_BASE: &str = "https://api.cloudflare.com/client/v4";
const DEFAULT_TRIGGER_FILE_NAME: &str = "pagesflow-trigger.json";

/// 静的ファイルの公開方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeployStrategy {
    /// Cloudflare Pages Direct Upload API に直接アップロード
    #[default]
    DirectUpload,
    /// 外部デプロイスクリプト（wrangler ラッパー）に委譲
    Script,
    /// トリガーファイルを書き出してホスト側の監視プロセスに任せる
    Trigger,
}

impl FromStr for DeployStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" | "direct-upload" => Ok(Self::DirectUpload),
            "script" | "wrangler" => Ok(Self::Script),
            "trigger" | "notify" => Ok(Self::Trigger),
            _ => Err(ConfigError::InvalidValue {
                var: ENV_STRATEGY,
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for DeployStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployStrategy::DirectUpload => write!(f, "direct"),
            DeployStrategy::Script => write!(f, "script"),
            DeployStrategy::Trigger => write!(f, "trigger"),
        }
    }
}

/// Cloudflare Pages への認証情報
///
/// `Debug` 出力では API トークンを伏せる。
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account_id: String,
    pub api_token: String,
    pub project_name: String,
}

impl Credentials {
    /// 空の値を拒否して認証情報を作成
    pub fn new(
        account_id: impl Into<String>,
        api_token: impl Into<String>,
        project_name: impl Into<String>,
    ) -> Result<Self> {
        let account_id = account_id.into();
        let api_token = api_token.into();
        let project_name = project_name.into();

        if account_id.trim().is_empty() {
            return Err(ConfigError::MissingVar(ENV_ACCOUNT_ID));
        }
        if api_token.trim().is_empty() {
            return Err(ConfigError::MissingVar(ENV_API_TOKEN));
        }
        if project_name.trim().is_empty() {
            return Err(ConfigError::MissingVar(ENV_PROJECT));
        }

        Ok(Self {
            account_id,
            api_token,
            project_name,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("api_token", &"***")
            .field("project_name", &self.project_name)
            .finish()
    }
}

/// PagesFlow の設定
///
/// ライブラリ側は環境変数を直接読まない。環境からの読み込みは
/// [`DeployConfig::from_env`] だけが行う。
#[derive(Clone)]
pub struct DeployConfig {
    pub static_dir: PathBuf,
    pub account_id: String,
    pub api_token: String,
    pub project: String,
    pub trigger_file_path: PathBuf,
    pub script_path: Option<PathBuf>,
    pub strategy: DeployStrategy,
    pub strict_missing_hashes: bool,
    pub lock_dir: PathBuf,
    pub api_base: String,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            account_id: String::new(),
            api_token: String::new(),
            project: String::new(),
            trigger_file_path: std::env::temp_dir().join(DEFAULT_TRIGGER_FILE_NAME),
            script_path: None,
            strategy: DeployStrategy::default(),
            strict_missing_hashes: false,
            lock_dir: std::env::temp_dir(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl fmt::Debug for DeployConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployConfig")
            .field("static_dir", &self.static_dir)
            .field("account_id", &self.account_id)
            .field("api_token", &if self.api_token.is_empty() { "" } else { "***" })
            .field("project", &self.project)
            .field("trigger_file_path", &self.trigger_file_path)
            .field("script_path", &self.script_path)
            .field("strategy", &self.strategy)
            .field("strict_missing_hashes", &self.strict_missing_hashes)
            .field("lock_dir", &self.lock_dir)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl DeployConfig {
    /// 環境変数から設定を読み込む
    ///
    /// 空文字列は未設定として扱う。
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意の参照関数から設定を読み込む
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let strategy = match get(ENV_STRATEGY) {
            Some(value) => value.parse()?,
            None => defaults.strategy,
        };

        let strict_missing_hashes = match get(ENV_STRICT_MISSING) {
            Some(value) => parse_bool(ENV_STRICT_MISSING, &value)?,
            None => defaults.strict_missing_hashes,
        };

        Ok(Self {
            static_dir: get(ENV_STATIC_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            account_id: get(ENV_ACCOUNT_ID).unwrap_or_default(),
            api_token: get(ENV_API_TOKEN).unwrap_or_default(),
            project: get(ENV_PROJECT).unwrap_or_default(),
            trigger_file_path: get(ENV_TRIGGER_FILE)
                .map(PathBuf::from)
                .unwrap_or(defaults.trigger_file_path),
            script_path: get(ENV_DEPLOY_SCRIPT).map(PathBuf::from),
            strategy,
            strict_missing_hashes,
            lock_dir: get(ENV_LOCK_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.lock_dir),
            api_base: get(ENV_API_BASE)
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
        })
    }

    /// 認証情報を取り出す
    ///
    /// 最初に見つかった未設定の環境変数名をエラーとして返す。
    pub fn credentials(&self) -> Result<Credentials> {
        Credentials::new(&self.account_id, &self.api_token, &self.project)
    }

    /// 設定状況（秘密情報は含まない）
    pub fn status(&self) -> ConfigStatus {
        ConfigStatus {
            account_id_set: !self.account_id.trim().is_empty(),
            api_token_set: !self.api_token.trim().is_empty(),
            project: Some(self.project.clone()).filter(|p| !p.trim().is_empty()),
            static_dir: self.static_dir.clone(),
            strategy: self.strategy,
            trigger_file_path: self.trigger_file_path.clone(),
            script_path: self.script_path.clone(),
        }
    }
}

/// 設定の充足状況
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigStatus {
    pub account_id_set: bool,
    pub api_token_set: bool,
    pub project: Option<String>,
    pub static_dir: PathBuf,
    pub strategy: DeployStrategy,
    pub trigger_file_path: PathBuf,
    pub script_path: Option<PathBuf>,
}

impl ConfigStatus {
    /// Cloudflare の認証情報がすべて揃っているか
    pub fn is_complete(&self) -> bool {
        self.account_id_set && self.api_token_set && self.project.is_some()
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        }),
    }
}
