//! Brightbox Load Balancer Controller
//!
//! Reconciles the Brightbox resources behind a Kubernetes `LoadBalancer`
//! service: a Cloud IP, a load balancer, and a perimeter made of a server
//! group plus a firewall policy with a single rule.
//!
//! The host control loop converts its objects with
//! [`ServiceSpec::from_service`] and [`ClusterNode::from`], names them with
//! [`load_balancer_name`], and calls the [`Reconciler`] entry points:
//!
//! - [`Reconciler::ensure_load_balancer`]
//! - [`Reconciler::update_load_balancer`]
//! - [`Reconciler::ensure_load_balancer_deleted`]
//! - [`Reconciler::get_load_balancer`]
//!
//! # Example
//!
//! ```no_run
//! use brightbox_client::{BrightboxClient, ClientConfig};
//! use load_balancer_controller::{EngineConfig, Reconciler, ServiceSpec, ClusterNode};
//!
//! # async fn example(spec: ServiceSpec, nodes: Vec<ClusterNode>) -> Result<(), Box<dyn std::error::Error>> {
//! let client = BrightboxClient::connect(ClientConfig::from_env()?).await?;
//! let reconciler = Reconciler::new(Box::new(client), EngineConfig::from_env()?)?;
//!
//! let status = reconciler
//!     .ensure_load_balancer("web.default.kubernetes", &spec, &nodes)
//!     .await?;
//! println!("{:?}", status.ingress);
//! # Ok(())
//! # }
//! ```

pub mod annotations;
pub mod backoff;
pub mod config;
pub mod error;
mod reconcile_helpers;
pub mod reconciler;
pub mod service;
pub mod status;
pub mod validation;

#[cfg(test)]
mod test_utils;

pub use backoff::RetryPolicy;
pub use config::EngineConfig;
pub use error::{ControllerError, ValidationError};
pub use reconciler::domains::{DomainResolver, SystemResolver};
pub use reconciler::Reconciler;
pub use service::{load_balancer_name, ClusterNode, ServiceSpec};
pub use status::to_load_balancer_status;
