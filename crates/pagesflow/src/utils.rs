use pagesflow_cloudflare::{DirectUploadPublisher, ScriptPublisher};
use pagesflow_config::{DeployConfig, DeployStrategy};
use pagesflow_core::{GuardedPublisher, Publisher};
use std::path::Path;

/// 設定された公開方法に対応する Publisher を作成
///
/// 認証情報の確認はここで行い、ネットワークやスクリプトの実行より前に失敗させる。
pub fn build_publisher(config: &DeployConfig) -> anyhow::Result<Box<dyn Publisher>> {
    let publisher: Box<dyn Publisher> = match config.strategy {
        DeployStrategy::DirectUpload => Box::new(GuardedPublisher::new(
            DirectUploadPublisher::from_config(config)?,
            &config.lock_dir,
        )),
        DeployStrategy::Script => Box::new(GuardedPublisher::new(
            ScriptPublisher::from_config(config)?,
            &config.lock_dir,
        )),
        DeployStrategy::Trigger => {
            anyhow::bail!(
                "公開方法 trigger はデプロイを行いません。`pagesflow notify` を使用してください"
            );
        }
    };
    Ok(publisher)
}

/// 静的ファイルのディレクトリが存在し、空でないことを確認
pub fn ensure_static_dir(dir: &Path) -> anyhow::Result<()> {
    let has_entries = dir.is_dir()
        && std::fs::read_dir(dir)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);

    if !has_entries {
        anyhow::bail!(
            "静的ファイルのディレクトリが空か存在しません: {}",
            dir.display()
        );
    }
    Ok(())
}
