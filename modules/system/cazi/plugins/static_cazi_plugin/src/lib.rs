#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Static CAZI plugin
//!
//! An [`AuthorizationPort`](cazi_sdk::AuthorizationPort) whose policy is fixed
//! configuration: users may create objects, read only the objects they own,
//! and list only their own objects. Ownership is expressed as a conditional
//! filter, so the plugin never sees resource data.

pub mod config;
pub mod domain;

pub use config::{ConfigError, PolicyMode, StaticCaziPluginConfig};
pub use domain::service::Service;
