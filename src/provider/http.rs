//! HTTP/JSON implementation of the provider contracts.
//!
//! All four collaborators live behind one paged JSON API under a single
//! base URL; cursors travel as the `cursor` query parameter and come back
//! in the `nextCursor` body field. The client sends no credentials
//! (authentication is outside this tool's scope).

use super::{
    DnsProvider, FetchError, LoadBalancerProvider, LoadBalancerSummary, LogEvent,
    LogStreamProvider, NetworkInterface, NetworkInterfaceProvider, RecordSet, StreamSummary,
    ZoneSummary,
};
use crate::paging::Page;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Wire envelope shared by every paged listing endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct PageBody<T> {
    #[serde(default)]
    items: Vec<T>,
    #[serde(default)]
    next_cursor: Option<String>,
}

impl<T> From<PageBody<T>> for Page<T> {
    fn from(body: PageBody<T>) -> Self {
        Page::new(body.items, body.next_cursor)
    }
}

#[derive(Debug, Clone)]
pub struct HttpProviders {
    client: reqwest::Client,
    base: Url,
}

impl HttpProviders {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, FetchError> {
        let base = Url::parse(endpoint)
            .map_err(|e| FetchError::Malformed(format!("invalid endpoint '{endpoint}': {e}")))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url, FetchError> {
        self.base
            .join(path)
            .map_err(|e| FetchError::Malformed(format!("invalid path '{path}': {e}")))
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Page<T>, FetchError> {
        let url = self.endpoint(path)?;
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;

        // Deserialize from the raw body so a malformed payload surfaces as a
        // scoped fetch error instead of poisoning the success path.
        let body = response.text().await?;
        let page: PageBody<T> =
            serde_json::from_str(&body).map_err(|e| FetchError::Malformed(e.to_string()))?;
        Ok(page.into())
    }
}

#[async_trait]
impl LogStreamProvider for HttpProviders {
    async fn list_streams(
        &self,
        group: &str,
        prefix: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<Page<StreamSummary>, FetchError> {
        let mut query = vec![("group", group)];
        if let Some(prefix) = prefix {
            query.push(("prefix", prefix));
        }
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }
        self.get_page("streams", &query).await
    }

    async fn get_events(
        &self,
        group: &str,
        stream: &str,
        cursor: Option<&str>,
        start_from_oldest: bool,
    ) -> Result<Page<LogEvent>, FetchError> {
        let oldest = if start_from_oldest { "true" } else { "false" };
        let mut query = vec![("group", group), ("stream", stream), ("fromOldest", oldest)];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }
        self.get_page("events", &query).await
    }
}

#[async_trait]
impl DnsProvider for HttpProviders {
    async fn list_zones(&self, cursor: Option<&str>) -> Result<Page<ZoneSummary>, FetchError> {
        let mut query = Vec::new();
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }
        self.get_page("zones", &query).await
    }

    async fn list_record_sets(
        &self,
        zone_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RecordSet>, FetchError> {
        let mut query = vec![("zone", zone_id)];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }
        self.get_page("record-sets", &query).await
    }
}

#[async_trait]
impl LoadBalancerProvider for HttpProviders {
    async fn list_load_balancers(
        &self,
        cursor: Option<&str>,
    ) -> Result<Page<LoadBalancerSummary>, FetchError> {
        let mut query = Vec::new();
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }
        self.get_page("load-balancers", &query).await
    }
}

#[async_trait]
impl NetworkInterfaceProvider for HttpProviders {
    async fn list_interfaces(
        &self,
        network_ids: &[String],
        cursor: Option<&str>,
    ) -> Result<Page<NetworkInterface>, FetchError> {
        let networks = network_ids.join(",");
        let mut query = vec![("networks", networks.as_str())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }
        self.get_page("interfaces", &query).await
    }
}
