use super::{deploy, notify};
use crate::utils;
use colored::Colorize;
use pagesflow_config::{DeployConfig, DeployStrategy};
use pagesflow_core::CompletionEvent;

/// エクスポート完了フックのハンドラ
///
/// 成功以外のステータスではログを残して何もしない。
pub async fn handle(config: &DeployConfig, raw_status: &str) -> anyhow::Result<()> {
    let event = CompletionEvent::from_raw(raw_status);
    tracing::info!(
        "Export finished: status={} archive={:?}",
        event.status,
        event.archive_hint
    );

    if !event.is_success() {
        tracing::warn!("Export did not succeed ({:?}), skipping publish", raw_status);
        println!(
            "{}",
            format!("エクスポートが成功していないためスキップします: {}", event.status).yellow()
        );
        return Ok(());
    }

    match config.strategy {
        DeployStrategy::Trigger => {
            // 出力の無いエクスポートを監視側に渡さない
            utils::ensure_static_dir(&config.static_dir)?;
            notify::handle(config, event.archive_hint.as_deref()).await
        }
        // 認証情報 → ディレクトリの順に確認
        DeployStrategy::DirectUpload | DeployStrategy::Script => deploy::handle(config).await,
    }
}
