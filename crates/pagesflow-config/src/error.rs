use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("環境変数 {0} が設定されていません")]
    MissingVar(&'static str),

    #[error("環境変数 {var} の値が不正です: {value}")]
    InvalidValue { var: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
