//! Query contracts for the remote collaborators.
//!
//! The engine only ever talks to the log-stream, DNS-zone, load-balancer,
//! and network-interface services through these traits, so tests substitute
//! in-memory fakes and the pipeline never reaches for a global client
//! handle. All listings are cursor-paginated ([`Page`]); credentials and
//! retries are out of scope.

pub mod http;

use crate::paging::Page;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub use http::HttpProviders;

/// Failure of a single remote call. Scoped to the job/stream/zone that
/// triggered it; the rest of the run continues.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream response malformed: {0}")]
    Malformed(String),

    #[error("Upstream fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// A log stream as listed by the provider. Streams that never received an
/// event carry no first-event timestamp and are skipped by the harvester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSummary {
    pub name: String,
    #[serde(default)]
    pub first_event_timestamp: Option<i64>,
}

impl StreamSummary {
    pub fn has_events(&self) -> bool {
        self.first_event_timestamp.is_some()
    }
}

/// One log event inside a stream page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    pub message: String,
    pub timestamp_millis: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneSummary {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSet {
    pub name: String,
    pub records: Vec<RecordValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordValue {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerSummary {
    pub network_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    pub interface_id: String,
    pub description: String,
    pub primary_address: String,
    #[serde(default)]
    pub secondary_addresses: Vec<SecondaryAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryAddress {
    pub address: String,
    #[serde(default)]
    pub public_address: Option<String>,
}

#[async_trait]
pub trait LogStreamProvider: Send + Sync {
    async fn list_streams(
        &self,
        group: &str,
        prefix: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<Page<StreamSummary>, FetchError>;

    /// Fetches one page of events. `start_from_oldest` is set only for the
    /// first page of a stream; follow-up pages resume from `cursor`.
    async fn get_events(
        &self,
        group: &str,
        stream: &str,
        cursor: Option<&str>,
        start_from_oldest: bool,
    ) -> Result<Page<LogEvent>, FetchError>;
}

#[async_trait]
pub trait DnsProvider: Send + Sync {
    async fn list_zones(&self, cursor: Option<&str>) -> Result<Page<ZoneSummary>, FetchError>;

    async fn list_record_sets(
        &self,
        zone_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RecordSet>, FetchError>;
}

#[async_trait]
pub trait LoadBalancerProvider: Send + Sync {
    async fn list_load_balancers(
        &self,
        cursor: Option<&str>,
    ) -> Result<Page<LoadBalancerSummary>, FetchError>;
}

#[async_trait]
pub trait NetworkInterfaceProvider: Send + Sync {
    /// Lists interfaces attached to any of the given networks.
    async fn list_interfaces(
        &self,
        network_ids: &[String],
        cursor: Option<&str>,
    ) -> Result<Page<NetworkInterface>, FetchError>;
}
