//! PagesFlow core
//!
//! Publisher abstraction shared by every way PagesFlow gets a finished
//! static export onto Cloudflare Pages, plus the pieces around it that do
//! not depend on a particular transport.
//!
//! ```text
//!      export finished (completion hook)
//!                  │
//!        CompletionEvent::from_raw
//!                  │
//!     ┌────────────┼──────────────────┐
//!     │            │                  │
//! ┌───▼──────┐ ┌───▼──────┐   ┌───────▼────────┐
//! │  direct  │ │  script  │   │ TriggerNotifier│
//! │  upload  │ │ publisher│   │ (hand-off only)│
//! └───┬──────┘ └───┬──────┘   └────────────────┘
//!     └─────┬──────┘
//!   trait Publisher (+ GuardedPublisher)
//! ```

pub mod error;
pub mod event;
pub mod guard;
pub mod publisher;
pub mod script;
pub mod trigger;

// Re-exports
pub use error::{PublishError, Result};
pub use event::{CompletionEvent, ExportStatus};
pub use guard::{GuardedPublisher, PublishGuard};
pub use publisher::{PublishOutcome, Publisher, default_pages_url};
pub use script::check_script;
pub use trigger::{NotifyOutcome, ScriptLaunch, TriggerNotifier, TriggerRecord};
