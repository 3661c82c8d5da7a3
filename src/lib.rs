//! # ddns-watch
//!
//! A dynamic DNS watcher written in Rust.
//!
//! ## Features
//!
//! - DDNS providers: OVH DynHost, Google, DuckDNS
//! - One watcher per provider account, running concurrently
//! - Freshly updated names are left alone while the change propagates
//! - Graceful shutdown on SIGINT, SIGTERM and SIGQUIT
//!
//! ## Usage
//!
//! ```bash
//! # Watch and update until interrupted
//! ddns-watch run
//!
//! # Show the public address and what every name resolves to
//! ddns-watch status
//!
//! # Run a single pass
//! ddns-watch update
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod pending;
pub mod providers;
pub mod resolver;
pub mod supervisor;
pub mod watcher;

pub use config::Config;
pub use error::{DdnsError, Result};
pub use pending::PendingSet;
pub use resolver::{AddressResolver, HttpResolver};
pub use supervisor::Supervisor;
pub use watcher::Watcher;
