//! # Flow Client
//!
//! Client services around [`flow_core`]: everything an app needs besides
//! rendering.
//!
//! ## Services
//!
//! - **Config**: fetch the flow over HTTP, cache it, fall back to the cache offline
//! - **Identity**: persistent device id plus an optional identified user
//! - **Telemetry**: bounded event queue uploaded in batches with retry
//! - **Status**: whether onboarding was completed on this device
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              OnboardingClient                │
//! │  ┌────────────┐ ┌──────────┐ ┌────────────┐  │
//! │  │ConfigCache │ │ Identity │ │EventBatcher│  │
//! │  └─────┬──────┘ └────┬─────┘ └─────┬──────┘  │
//! │        └─────── ClientStore ───────┘         │
//! └────────┬──────────────────────────┬──────────┘
//!          │ ConfigSource             │ EventTransport
//!          └────────── HttpTransport ─┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batcher;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod status;
pub mod store;
pub mod transport;

pub use batcher::{EventBatcher, EventEnvelope, FlushReport, FlushTask};
pub use cache::{CachedConfig, ConfigCache};
pub use client::{ConfigOrigin, LoadedConfig, OnboardingClient};
pub use config::{RetryConfig, SdkConfig};
pub use error::{ClientError, ClientResult};
pub use http::{HttpTransport, API_KEY_HEADER};
pub use identity::{IdentifyRequest, Identity, UserIdentity};
pub use status::{OnboardingStatus, StatusStore};
pub use store::ClientStore;
pub use transport::{ConfigSource, EventTransport};
