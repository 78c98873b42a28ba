use colored::Colorize;
use pagesflow_config::{DeployConfig, ENV_ACCOUNT_ID, ENV_API_TOKEN, ENV_PROJECT};

fn mark(set: bool) -> String {
    if set {
        "✓ 設定済み".green().to_string()
    } else {
        "✗ 未設定".red().to_string()
    }
}

/// 設定状況を表示（秘密情報は表示しない）
pub fn handle(config: &DeployConfig) {
    let status = config.status();

    println!("{}", "設定".bold());
    println!("  静的ファイルディレクトリ:  {}", status.static_dir.display().to_string().cyan());
    println!("  公開方法:                  {}", status.strategy.to_string().cyan());
    println!("  Cloudflare Account ID:     {}", mark(status.account_id_set));
    println!("  Cloudflare API Token:      {}", mark(status.api_token_set));
    println!(
        "  Cloudflare Pages Project:  {}",
        status
            .project
            .as_deref()
            .map(|p| p.cyan().to_string())
            .unwrap_or_else(|| mark(false))
    );
    println!("  トリガーファイル:          {}", status.trigger_file_path.display());
    println!(
        "  デプロイスクリプト:        {}",
        status
            .script_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(なし)".to_string())
    );

    if !status.is_complete() {
        println!();
        println!("{}", "⚠ Cloudflare が設定されていません。以下の環境変数を設定してください:".yellow());
        println!("  {}  Cloudflare ダッシュボードの URL に含まれるアカウントID", ENV_ACCOUNT_ID);
        println!("  {}   \"Cloudflare Pages: Edit\" 権限を持つトークン", ENV_API_TOKEN);
        println!("  {}  Pages プロジェクト名", ENV_PROJECT);
    }
}
