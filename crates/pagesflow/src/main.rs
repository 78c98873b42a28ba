mod commands;
mod utils;

use clap::{Parser, Subcommand};
use pagesflow_config::{DeployConfig, DeployStrategy};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pagesflow")]
#[command(about = "書き出した静的サイトを、そのまま Cloudflare Pages へ。", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 静的ファイルを Cloudflare Pages にデプロイ
    Deploy {
        /// 静的ファイルのディレクトリ（省略時は PAGESFLOW_STATIC_DIR）
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// 公開方法 (direct, script)
        #[arg(long)]
        strategy: Option<DeployStrategy>,
        /// ローカルに無いファイルを要求されたら失敗にする
        #[arg(long)]
        strict: bool,
    },
    /// エクスポート完了フックから呼び出す
    /// 成功時のみ設定された公開方法を実行
    Complete {
        /// エクスポートツールが渡した値（ステータスまたはアーカイブのパス）
        #[arg(default_value = "")]
        status: String,
    },
    /// トリガーファイルを書き出し、デプロイスクリプトを起動
    Notify {
        /// 静的ファイルのディレクトリ（省略時は PAGESFLOW_STATIC_DIR）
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// アーカイブのディレクトリ
        #[arg(long)]
        archive_dir: Option<String>,
    },
    /// マニフェスト（パス → ハッシュ）を表示（アップロードはしない）
    Manifest {
        /// 静的ファイルのディレクトリ（省略時は PAGESFLOW_STATIC_DIR）
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// 設定状況を表示
    Config,
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログはstderrに出力（stdoutはマニフェスト等の出力に使う）
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Versionコマンドは設定不要
    if matches!(cli.command, Commands::Version) {
        println!("pagesflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut config = DeployConfig::from_env()?;

    // コマンドディスパッチ
    match cli.command {
        Commands::Deploy {
            dir,
            strategy,
            strict,
        } => {
            if let Some(dir) = dir {
                config.static_dir = dir;
            }
            if let Some(strategy) = strategy {
                config.strategy = strategy;
            }
            if strict {
                config.strict_missing_hashes = true;
            }
            commands::deploy::handle(&config).await?;
        }
        Commands::Complete { status } => {
            commands::complete::handle(&config, &status).await?;
        }
        Commands::Notify { dir, archive_dir } => {
            if let Some(dir) = dir {
                config.static_dir = dir;
            }
            commands::notify::handle(&config, archive_dir.as_deref()).await?;
        }
        Commands::Manifest { dir } => {
            let dir = dir.unwrap_or_else(|| config.static_dir.clone());
            commands::manifest::handle(&dir).await?;
        }
        Commands::Config => {
            commands::config::handle(&config);
        }
        Commands::Version => {
            unreachable!("Version is handled before config loading");
        }
    }

    Ok(())
}
