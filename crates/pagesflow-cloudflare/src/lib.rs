//! Cloudflare Pages publishers for PagesFlow
//!
//! This crate implements the `Publisher` trait for Cloudflare Pages in two
//! ways:
//!
//! - **Direct Upload**: hash every file, create a deployment from the
//!   manifest, then upload only the content the service does not have yet
//! - **Deploy script**: delegate to an external executable (typically a
//!   wrangler wrapper) and read the URL it prints
//!
//! # Requirements
//!
//! - `CLOUDFLARE_ACCOUNT_ID`, `CLOUDFLARE_API_TOKEN` (with "Cloudflare
//!   Pages: Edit") and `CLOUDFLARE_PAGES_PROJECT`
//! - For the script strategy: `PAGESFLOW_DEPLOY_SCRIPT`
//!
//! # Example
//!
//! ```ignore
//! use pagesflow_cloudflare::DirectUploadPublisher;
//! use pagesflow_config::DeployConfig;
//! use pagesflow_core::Publisher;
//!
//! let config = DeployConfig::from_env()?;
//! let publisher = DirectUploadPublisher::from_config(&config)?;
//!
//! let outcome = publisher.publish(&config.static_dir).await?;
//! println!("Deployed to {}", outcome.url);
//! ```

pub mod bundle;
pub mod deploy_script;
pub mod error;
pub mod mime;
pub mod pages;

pub use bundle::{FileEntry, SiteBundle, content_hash};
pub use deploy_script::ScriptPublisher;
pub use error::{CloudflareError, Result};
pub use mime::{DEFAULT_MIME, mime_for_extension, mime_for_path};
pub use pages::{Deployment, DirectUploadPublisher, MissingHashPolicy, PagesClient};
