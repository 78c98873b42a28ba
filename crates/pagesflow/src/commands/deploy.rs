use crate::utils;
use colored::Colorize;
use pagesflow_config::DeployConfig;

pub async fn handle(config: &DeployConfig) -> anyhow::Result<()> {
    // 認証情報を先に確認（ディレクトリの走査や通信より前）
    let publisher = utils::build_publisher(config)?;
    utils::ensure_static_dir(&config.static_dir)?;

    println!(
        "{} {} ({})",
        "🚀 デプロイ中:".blue(),
        config.static_dir.display().to_string().cyan(),
        publisher.name()
    );

    let outcome = publisher.publish(&config.static_dir).await?;

    println!("{}", "✓ デプロイが完了しました！".green().bold());
    println!("  URL: {}", outcome.url.cyan());
    if let Some(id) = &outcome.deployment_id {
        println!("  デプロイID: {}", id);
    }

    Ok(())
}
