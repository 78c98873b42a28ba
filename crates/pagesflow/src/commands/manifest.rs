use pagesflow_cloudflare::SiteBundle;
use pagesflow_core::PublishError;
use std::path::Path;

/// マニフェストを標準出力に JSON で表示（ドライラン）
pub async fn handle(dir: &Path) -> anyhow::Result<()> {
    let root = dir.to_path_buf();
    let bundle = tokio::task::spawn_blocking(move || SiteBundle::load(&root)).await??;

    if bundle.is_empty() {
        return Err(PublishError::NoFiles(dir.to_path_buf()).into());
    }

    println!("{}", serde_json::to_string_pretty(&bundle.manifest())?);
    eprintln!("{}個のファイル", bundle.len());
    Ok(())
}
