//! # cotlog Core
//!
//! Foundational pieces shared by every cotlog pass:
//!
//! - **Errors**: the [`CotLogError`] taxonomy (`NotAFile`, `MalformedEvent`,
//!   `InvalidTimeFormat`, `SizeLimitExceeded`, `EmptyStream`, ...).
//! - **Configuration**: YAML files with `COTLOG__` environment overrides.
//! - **Session**: the explicit, caller-owned list of selected log files.
//! - **Progress**: the sink interface passes report progress through.
//!
//! ## Example
//!
//! ```
//! use cotlog_core::config::AppConfig;
//!
//! let config = AppConfig::default();
//! assert!(config.validate().is_ok());
//! assert_eq!(config.processing.identity_attribute, "uid");
//! ```

pub mod config;
pub mod error;
pub mod progress;
pub mod session;

pub use config::{AppConfig, LogFormat, LoggingConfig, ProcessingConfig};
pub use error::{ConfigError, CotLogError, Result, MAX_CHUNK_MIB};
pub use progress::{Cadence, NoProgress, ProgressSink, TracingProgress};
pub use session::{require_file, Session};
