//! # VictorOps Client
//!
//! A Rust client library for sending alerts to the [VictorOps REST endpoint](https://help.victorops.com/knowledge-base/rest-endpoint-integration-guide/).
//!
//! ## Features
//!
//! - `critical`, `warn`, `info`, `ack` and `recovery` alerts
//! - Identity fields (`entity_id`, `entity_display_name`, `monitoring_tool`)
//!   derived from host and client name, with per-client overrides
//! - Caller-defined fields passed through to the payload, `null`s dropped
//! - Pluggable [`DeliveryObserver`] for persisting or auditing deliveries
//!
//! ## Example
//!
//! ```rust,no_run
//! use victorops_client::{AlertData, SettingsOptions, VictorOpsClient};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = SettingsOptions::new(
//!         "https://alert.victorops.com/integrations/generic/20131114/alert/api-key/",
//!         "database",
//!     )
//!     .with_host("db1.example.com")
//!     .with_name("replication-check");
//!
//!     let client = VictorOpsClient::from_options(options, Duration::from_secs(10))?;
//!
//!     client
//!         .critical(AlertData::new().with_message("Replication lag above 5 minutes"))
//!         .await?;
//!
//!     client
//!         .ack(AlertData::new().with_message("Looking into it").with_author("alice"))
//!         .await?;
//!
//!     client.recovery(AlertData::new().with_message("Caught up")).await?;
//!     Ok(())
//! }
//! ```

mod client;
mod errors;
mod observer;
mod payload;
mod response;
mod settings;

pub use client::VictorOpsClient;
pub use errors::{PostFailure, Result, VictorOpsError};
pub use observer::{Delivery, DeliveryObserver};
pub use payload::{AlertData, AlertPayload, AlertVerb, PayloadBuilder};
pub use response::AlertResponse;
pub use settings::{DerivedField, Settings, SettingsOptions, DEFAULT_HOST, DEFAULT_NAME};
