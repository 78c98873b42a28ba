use colored::Colorize;
use pagesflow_config::DeployConfig;
use pagesflow_core::{ScriptLaunch, TriggerNotifier};

pub async fn handle(config: &DeployConfig, archive_dir: Option<&str>) -> anyhow::Result<()> {
    let notifier = TriggerNotifier::from_config(config);
    let outcome = notifier.notify(&config.static_dir, archive_dir).await?;

    println!(
        "{} {}",
        "✓ トリガーファイルを書き出しました:".green(),
        notifier.trigger_path().display().to_string().cyan()
    );
    println!("  生成日時 (UTC): {}", outcome.record.generated_at_utc);

    match outcome.script {
        ScriptLaunch::Started => {
            println!("  デプロイスクリプトをバックグラウンドで起動しました");
        }
        ScriptLaunch::Skipped(reason) => {
            println!("  {} {}", "⚠ デプロイスクリプトをスキップ:".yellow(), reason);
        }
        ScriptLaunch::NotConfigured => {}
    }

    Ok(())
}
