//! Offline caching worker for the steeple church dashboard.
//!
//! Every request the web app makes passes through [`CacheController`], which
//! classifies it and answers from the network, from a versioned cache
//! namespace, or from a blend of both. The controller also owns cache
//! lifecycle (install/activate), a small control channel, and the push
//! notification bridge.
//!
//! The host runtime is abstracted behind three traits so the controller can
//! run and be tested outside a browser:
//! - [`CacheStore`] for the named cache namespaces
//! - [`Network`] for the real transport
//! - [`Platform`] for skip-waiting, client claiming and notifications

pub mod classifier;
pub mod config;
pub mod control;
pub mod controller;
pub mod error;
pub mod keepalive;
pub mod lifecycle;
pub mod network;
pub mod platform;
pub mod push;
pub mod request;
pub mod store;
pub mod strategy;

#[cfg(test)]
mod testing;

pub use classifier::{Classification, Classifier};
pub use config::{NotificationConfig, OfflineConfig};
pub use control::{ControlMessage, ControlReply};
pub use controller::{CacheController, WorkerHooks, WorkerState};
pub use error::{NetworkError, OfflineError, StoreError};
pub use keepalive::KeepAlive;
pub use lifecycle::{ActivateReport, ClearReport, InstallReport, PrecacheFailure};
pub use network::{FetchOptions, HttpNetwork, Network};
pub use platform::{Notification, Platform};
pub use request::{CacheKey, InterceptedRequest, RequestMode, Response};
pub use store::{CacheStore, CachedData, DiskStore, MemoryStore};
pub use strategy::{Strategy, StrategyEngine};

// Re-exported so hosts can build requests without depending on reqwest/url directly
pub use reqwest::Method;
pub use url::Url;
