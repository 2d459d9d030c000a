//! Per-stream log harvesting through the throttled queue.
//!
//! Every page fetch is one queued job carrying an explicit [`HarvestState`];
//! a non-terminal page re-submits the follow-up fetch instead of looping,
//! so pagination across all streams shares the queue's per-tick budget.

use crate::domain::RawLogLine;
use crate::harvest::queue::ThrottledWorkQueue;
use crate::paging;
use crate::provider::{FetchError, LogStreamProvider, StreamSummary};
use chrono::{Local, TimeZone};
use regex::Regex;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;

pub const DEFAULT_LINE_CAP: usize = 5000;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Marker the harvester rejects lines on, regardless of method match.
const CONNECT_FAILURE_MARKER: &str = "connect() failed";

#[derive(Debug, Clone)]
pub struct HarvestSettings {
    /// Retained-line cap per stream; checked after each page, so the final
    /// page may push a stream slightly past it.
    pub line_cap: usize,
    /// Deadline for a single page fetch.
    pub fetch_timeout: Duration,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            line_cap: DEFAULT_LINE_CAP,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Retains only lines that look like HTTP access-log requests: a quote
/// immediately followed by a method token, and no connection-failure marker.
#[derive(Debug, Clone)]
pub struct LineFilter {
    request: Regex,
}

impl LineFilter {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            request: Regex::new(r#""(GET|PUT|POST)"#)?,
        })
    }

    pub fn retains(&self, message: &str) -> bool {
        self.request.is_match(message) && !message.contains(CONNECT_FAILURE_MARKER)
    }
}

/// Everything harvesting produced for one run: the retained lines across
/// all streams plus the oldest-observed date marker per exhausted stream.
#[derive(Debug, Default)]
pub struct HarvestReport {
    pub lines: Vec<RawLogLine>,
    pub oldest_seen: BTreeMap<String, String>,
}

/// Failure of a single stream's harvest. Other streams are unaffected.
#[derive(Error, Debug)]
#[error("stream '{stream_name}': {source}")]
pub struct StreamFailure {
    pub stream_name: String,
    #[source]
    pub source: FetchError,
}

#[derive(Debug)]
struct StreamHarvest {
    stream_name: String,
    lines: Vec<RawLogLine>,
    oldest_seen: Option<String>,
}

type StreamResult = Result<StreamHarvest, StreamFailure>;

pub struct StreamHarvester<P> {
    provider: Arc<P>,
    queue: ThrottledWorkQueue,
    group: String,
    prefix: Option<String>,
    filter: Arc<LineFilter>,
    settings: HarvestSettings,
}

impl<P: LogStreamProvider + 'static> StreamHarvester<P> {
    pub fn new(
        provider: Arc<P>,
        queue: ThrottledWorkQueue,
        group: impl Into<String>,
        prefix: Option<String>,
        settings: HarvestSettings,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            provider,
            queue,
            group: group.into(),
            prefix,
            filter: Arc::new(LineFilter::new()?),
            settings,
        })
    }

    /// Lists the group's streams, keeping only those that ever received an
    /// event.
    pub async fn list_streams(&self) -> Result<Vec<StreamSummary>, FetchError> {
        let provider = Arc::clone(&self.provider);
        let group = self.group.clone();
        let prefix = self.prefix.clone();
        let streams = paging::drain_pages(move |cursor| {
            let provider = Arc::clone(&provider);
            let group = group.clone();
            let prefix = prefix.clone();
            async move {
                provider
                    .list_streams(&group, prefix.as_deref(), cursor.as_deref())
                    .await
            }
        })
        .await?;

        Ok(streams
            .into_iter()
            .filter(StreamSummary::has_events)
            .collect())
    }

    /// Harvests every stream of the group through the throttled queue.
    ///
    /// Streams settle independently: a failed stream is logged and dropped,
    /// the rest still contribute (partial results over none). Streams that
    /// retained zero lines are dropped from the line set but still report
    /// their oldest-seen marker.
    pub async fn harvest_all(&self) -> Result<HarvestReport, FetchError> {
        let streams = self.list_streams().await?;
        tracing::info!(streams = streams.len(), group = %self.group, "harvest starting");

        let drain = self.queue.start();
        let mut receivers = Vec::with_capacity(streams.len());
        for stream in streams {
            let (done, rx) = oneshot::channel();
            let ctx = JobContext {
                provider: Arc::clone(&self.provider),
                queue: self.queue.clone(),
                group: self.group.clone(),
                filter: Arc::clone(&self.filter),
                settings: self.settings.clone(),
            };
            ctx.submit(HarvestState::new(stream.name), done);
            receivers.push(rx);
        }

        let settled = futures::future::join_all(receivers).await;
        self.queue.shutdown();
        drain.await.ok();

        let mut report = HarvestReport::default();
        for outcome in settled {
            match outcome {
                Ok(Ok(harvest)) => {
                    if let Some(marker) = harvest.oldest_seen {
                        report.oldest_seen.insert(harvest.stream_name, marker);
                    }
                    report.lines.extend(harvest.lines);
                }
                Ok(Err(failure)) => {
                    tracing::warn!(error = %failure, "stream harvest failed");
                }
                Err(_) => {
                    tracing::warn!("stream harvest job dropped before completion");
                }
            }
        }
        Ok(report)
    }
}

/// Pagination state for one stream, threaded through queue steps.
#[derive(Debug)]
struct HarvestState {
    stream_name: String,
    cursor: Option<String>,
    first_page: bool,
    retained: Vec<RawLogLine>,
    last_event_millis: Option<i64>,
}

impl HarvestState {
    fn new(stream_name: String) -> Self {
        Self {
            stream_name,
            cursor: None,
            first_page: true,
            retained: Vec::new(),
            last_event_millis: None,
        }
    }

    fn into_harvest(self) -> StreamHarvest {
        StreamHarvest {
            stream_name: self.stream_name,
            lines: self.retained,
            oldest_seen: self.last_event_millis.and_then(format_local_date),
        }
    }
}

struct JobContext<P> {
    provider: Arc<P>,
    queue: ThrottledWorkQueue,
    group: String,
    filter: Arc<LineFilter>,
    settings: HarvestSettings,
}

impl<P: LogStreamProvider + 'static> JobContext<P> {
    fn submit(self, state: HarvestState, done: oneshot::Sender<StreamResult>) {
        let queue = self.queue.clone();
        queue.submit(self.run_page(state, done));
    }

    /// One pagination step. Boxed because a non-terminal page re-submits the
    /// same function for the follow-up fetch.
    fn run_page(
        self,
        mut state: HarvestState,
        done: oneshot::Sender<StreamResult>,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>> {
        Box::pin(async move {
            let fetched = tokio::time::timeout(
                self.settings.fetch_timeout,
                self.provider.get_events(
                    &self.group,
                    &state.stream_name,
                    state.cursor.as_deref(),
                    state.first_page,
                ),
            )
            .await;

            let page = match fetched {
                Ok(Ok(page)) => page,
                Ok(Err(source)) => {
                    let _ = done.send(Err(StreamFailure {
                        stream_name: state.stream_name,
                        source,
                    }));
                    return;
                }
                Err(_) => {
                    let _ = done.send(Err(StreamFailure {
                        stream_name: state.stream_name,
                        source: FetchError::Timeout(self.settings.fetch_timeout),
                    }));
                    return;
                }
            };

            if let Some(last) = page.items.last() {
                state.last_event_millis = Some(last.timestamp_millis);
            }
            for event in &page.items {
                if self.filter.retains(&event.message) {
                    state.retained.push(RawLogLine {
                        stream_name: state.stream_name.clone(),
                        message: event.message.clone(),
                        timestamp_millis: event.timestamp_millis,
                    });
                }
            }

            // Termination checks, in priority order: empty page, no cursor
            // progress, retained-line cap.
            let next = paging::advance(state.cursor.as_deref(), page.next_cursor.as_deref());
            if page.is_empty() || next.is_none() || state.retained.len() >= self.settings.line_cap {
                let _ = done.send(Ok(state.into_harvest()));
                return;
            }

            state.cursor = next;
            state.first_page = false;
            self.submit(state, done);
        })
    }
}

/// `YYYY/M/D` in local time, month and day unpadded.
fn format_local_date(millis: i64) -> Option<String> {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.format("%Y/%-m/%-d").to_string())
}
