use serde::{Deserialize, Serialize};

/// One retained access-log line, tagged with its origin stream.
///
/// Transient within a run: produced by the harvester, consumed by the
/// aggregator, then discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLogLine {
    pub stream_name: String,
    pub message: String,
    pub timestamp_millis: i64,
}
