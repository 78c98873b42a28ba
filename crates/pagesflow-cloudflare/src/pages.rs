//! Cloudflare Pages Direct Upload client
//!
//! Two calls per publish: create a deployment from the manifest, then
//! upload only the content hashes the service reports as missing. Uses
//! Bearer token authentication instead of wrangler CLI.

use crate::bundle::{FileEntry, SiteBundle};
use crate::error::{CloudflareError, Result};
use crate::mime::mime_for_path;
use async_trait::async_trait;
use pagesflow_config::{Credentials, DEFAULT_API_BASE, DeployConfig};
use pagesflow_core::{PublishError, PublishOutcome, Publisher, default_pages_url};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Deployment creation only carries the manifest
pub const CREATE_TIMEOUT: Duration = Duration::from_secs(60);
/// Upload volume grows with the site
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

const MANIFEST_FIELD: &str = "manifest";
const FILES_FIELD: &str = "files";

/// Deployment as reported by the create call
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Deployment {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub missing_hashes: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Cloudflare Pages API client
pub struct PagesClient {
    client: reqwest::Client,
    api_base: String,
    credentials: Credentials,
    create_timeout: Duration,
    upload_timeout: Duration,
}

impl PagesClient {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            credentials,
            create_timeout: CREATE_TIMEOUT,
            upload_timeout: UPLOAD_TIMEOUT,
        }
    }

    /// Build a client from configuration, failing on missing credentials
    pub fn from_config(config: &DeployConfig) -> pagesflow_config::Result<Self> {
        Ok(Self::new(config.credentials()?).with_api_base(&config.api_base))
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeouts(mut self, create: Duration, upload: Duration) -> Self {
        self.create_timeout = create;
        self.upload_timeout = upload;
        self
    }

    pub fn project(&self) -> &str {
        &self.credentials.project_name
    }

    fn deployments_url(&self) -> String {
        format!(
            "{}/accounts/{}/pages/projects/{}/deployments",
            self.api_base, self.credentials.account_id, self.credentials.project_name
        )
    }

    fn files_url(&self, deployment_id: &str) -> String {
        format!("{}/{}/files", self.deployments_url(), deployment_id)
    }

    /// Create a deployment for `manifest` (path → content hash)
    pub async fn create_deployment(&self, manifest: &BTreeMap<String, String>) -> Result<Deployment> {
        let manifest_json = serde_json::to_string(manifest)?;
        let form = Form::new().part(
            MANIFEST_FIELD,
            Part::text(manifest_json).mime_str("application/json")?,
        );

        let response = self
            .client
            .post(self.deployments_url())
            .bearer_auth(&self.credentials.api_token)
            .timeout(self.create_timeout)
            .multipart(form)
            .send()
            .await?;

        let deployment: Deployment = read_api_response(response, "create")
            .await?
            .ok_or_else(|| {
                CloudflareError::InvalidResponse("deployment result missing".to_string())
            })?;

        if deployment.id.is_empty() {
            return Err(CloudflareError::InvalidResponse(
                "deployment id missing".to_string(),
            ));
        }

        Ok(deployment)
    }

    /// Upload file contents for an existing deployment
    ///
    /// Each part is named `files` with the content hash as its filename.
    pub async fn upload_files(&self, deployment_id: &str, files: &[&FileEntry]) -> Result<()> {
        let mut form = Form::new();
        for file in files {
            let part = Part::bytes(file.content.clone())
                .file_name(file.content_hash.clone())
                .mime_str(mime_for_path(&file.relative_path))?;
            form = form.part(FILES_FIELD, part);
        }

        let response = self
            .client
            .post(self.files_url(deployment_id))
            .bearer_auth(&self.credentials.api_token)
            .timeout(self.upload_timeout)
            .multipart(form)
            .send()
            .await?;

        read_api_response::<serde_json::Value>(response, "upload").await?;
        Ok(())
    }
}

/// What to do when the service asks for a hash with no local file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingHashPolicy {
    /// Log and leave it out of the upload
    #[default]
    Skip,
    /// Abort the publish before uploading anything
    Fail,
}

/// Publisher speaking the Direct Upload protocol
pub struct DirectUploadPublisher {
    client: PagesClient,
    policy: MissingHashPolicy,
}

impl DirectUploadPublisher {
    pub fn new(client: PagesClient) -> Self {
        Self {
            client,
            policy: MissingHashPolicy::default(),
        }
    }

    pub fn from_config(config: &DeployConfig) -> pagesflow_core::Result<Self> {
        let policy = if config.strict_missing_hashes {
            MissingHashPolicy::Fail
        } else {
            MissingHashPolicy::Skip
        };
        Ok(Self::new(PagesClient::from_config(config)?).with_policy(policy))
    }

    pub fn with_policy(mut self, policy: MissingHashPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> MissingHashPolicy {
        self.policy
    }

    /// Run the full create + upload sequence for `directory`
    pub async fn deploy(&self, directory: &Path) -> Result<PublishOutcome> {
        let bundle = load_bundle(directory).await?;
        if bundle.is_empty() {
            return Err(PublishError::NoFiles(directory.to_path_buf()).into());
        }

        tracing::info!("Found {} files to upload", bundle.len());

        let deployment = self.client.create_deployment(&bundle.manifest()).await?;
        tracing::info!(
            "Deployment created: {}, need to upload {} files",
            deployment.id,
            deployment.missing_hashes.len()
        );

        let missing = bundle.resolve_missing(&deployment.missing_hashes);
        if !missing.unknown.is_empty() {
            match self.policy {
                MissingHashPolicy::Skip => {
                    for hash in &missing.unknown {
                        tracing::warn!("No local file for requested hash {}, skipping", hash);
                    }
                }
                MissingHashPolicy::Fail => {
                    return Err(PublishError::MissingLocalContent(missing.unknown).into());
                }
            }
        }

        if !missing.found.is_empty() {
            self.client
                .upload_files(&deployment.id, &missing.found)
                .await?;
            tracing::info!("Uploaded {} files", missing.found.len());
        }

        let url = deployment
            .url
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| default_pages_url(self.client.project()));
        tracing::info!("Deployment complete! URL: {}", url);

        Ok(PublishOutcome::new(url, Some(deployment.id)))
    }
}

#[async_trait]
impl Publisher for DirectUploadPublisher {
    fn name(&self) -> &str {
        "direct-upload"
    }

    fn project(&self) -> &str {
        self.client.project()
    }

    async fn publish(&self, directory: &Path) -> pagesflow_core::Result<PublishOutcome> {
        Ok(self.deploy(directory).await?)
    }
}

async fn load_bundle(directory: &Path) -> Result<SiteBundle> {
    let root: PathBuf = directory.to_path_buf();
    let bundle = tokio::task::spawn_blocking(move || SiteBundle::load(&root))
        .await
        .map_err(std::io::Error::other)??;
    Ok(bundle)
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(default)]
    success: bool,
    #[serde(default = "Option::default")]
    result: Option<T>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[allow(dead_code)]
    #[serde(default)]
    code: Option<i64>,
    message: String,
}

/// Check HTTP status and the `success` flag, returning `result`
async fn read_api_response<T: DeserializeOwned>(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<Option<T>> {
    let status = response.status();
    let body = response.text().await?;
    let parsed = serde_json::from_str::<ApiResponse<T>>(&body);

    match parsed {
        Ok(api) if status.is_success() && api.success => Ok(api.result),
        Ok(api) => {
            let message = api
                .errors
                .first()
                .map(|e| e.message.clone())
                .unwrap_or(body);
            Err(remote_error(operation, message, status.as_u16()))
        }
        Err(e) if status.is_success() => Err(CloudflareError::InvalidResponse(format!(
            "{} response could not be decoded: {}",
            operation, e
        ))),
        Err(_) => Err(remote_error(operation, body, status.as_u16())),
    }
}

fn remote_error(operation: &'static str, message: String, status: u16) -> CloudflareError {
    PublishError::Remote {
        operation,
        message,
        status,
    }
    .into()
}
