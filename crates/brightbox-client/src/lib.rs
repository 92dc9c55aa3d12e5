//! Brightbox REST API Client
//!
//! A Rust client library for the parts of the Brightbox Cloud API used to run
//! load balancers: Cloud IPs, load balancers, server groups, firewall policies
//! and firewall rules.
//!
//! # Example
//!
//! ```no_run
//! use brightbox_client::{BrightboxClient, BrightboxClientTrait, ClientConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = BrightboxClient::connect(ClientConfig::from_env()?).await?;
//!
//! for cip in client.list_cloud_ips().await? {
//!     println!("{} {} {}", cip.id, cip.public_ipv4, cip.reverse_dns);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **OAuth2**: client-credentials and password grants, tokens refreshed on expiry
//! - **Typed models**: closed enums for protocols, policies and states
//! - **`test-util`**: an in-memory [`MockBrightboxClient`] for engine tests

#[path = "trait.rs"]
pub mod brightbox_trait;
pub mod client;
pub mod common;
pub mod config;
pub mod error;
pub mod models;
#[cfg(feature = "test-util")]
pub mod mock;

pub use brightbox_trait::BrightboxClientTrait;
pub use client::BrightboxClient;
pub use common::HttpClient;
pub use config::{ClientConfig, Credentials};
pub use error::BrightboxError;
pub use models::*;
#[cfg(feature = "test-util")]
pub use mock::MockBrightboxClient;
