//! Traffic aggregation: raw access-log lines into per-IP path hit counts.

use crate::domain::RawLogLine;
use regex::Regex;
use std::collections::HashMap;

/// Hit counter for one request path under one IP. `first_seen` is a
/// run-global sequence number used to break ranking ties deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathHits {
    pub hits: u64,
    first_seen: u64,
}

/// IP → request path → hit count. Increments are commutative, so input line
/// order never affects the final counts.
#[derive(Debug, Clone, Default)]
pub struct IpTrafficRecord {
    hits: HashMap<String, HashMap<String, PathHits>>,
    next_seq: u64,
}

impl IpTrafficRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one hit of `path` by `ip`.
    pub fn record(&mut self, ip: &str, path: &str) {
        let paths = self.hits.entry(ip.to_string()).or_default();
        let seq = self.next_seq;
        let entry = paths.entry(path.to_string()).or_insert(PathHits {
            hits: 0,
            first_seen: seq,
        });
        if entry.hits == 0 {
            self.next_seq += 1;
        }
        entry.hits += 1;
    }

    pub fn ips(&self) -> impl Iterator<Item = &str> {
        self.hits.keys().map(String::as_str)
    }

    pub fn hits_for(&self, ip: &str, path: &str) -> u64 {
        self.hits
            .get(ip)
            .and_then(|paths| paths.get(path))
            .map_or(0, |entry| entry.hits)
    }

    pub fn ip_count(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// The `k` most-hit paths for an IP, descending by hit count, ties
    /// broken by first-seen order.
    pub fn top_paths(&self, ip: &str, k: usize) -> Vec<(String, u64)> {
        let Some(paths) = self.hits.get(ip) else {
            return Vec::new();
        };
        let mut ranked: Vec<(&String, &PathHits)> = paths.iter().collect();
        ranked.sort_by(|(_, a), (_, b)| {
            b.hits.cmp(&a.hits).then(a.first_seen.cmp(&b.first_seen))
        });
        ranked
            .into_iter()
            .take(k)
            .map(|(path, entry)| (path.clone(), entry.hits))
            .collect()
    }
}

/// Extracts (IP, path) pairs from retained log lines in a single pass.
///
/// A line contributes nothing unless it has at least one IP-shaped
/// substring and a request path; that mismatch is a silent skip, never an
/// error. A line carrying several IPs (client plus forwarded-for) counts
/// one hit for each distinct IP against the same path.
pub struct TrafficAggregator {
    // 3 to 5 dot-separated digit groups, tolerating malformed compound
    // fields around real dotted quads.
    ip_pattern: Regex,
    // Longest /segment run immediately preceding the HTTP token.
    path_pattern: Regex,
}

impl TrafficAggregator {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            ip_pattern: Regex::new(r"\d+(?:\.\d+){2,4}")?,
            path_pattern: Regex::new(r"((?:/[\w-]+)+)\s+HTTP")?,
        })
    }

    pub fn aggregate<'a, I>(&self, lines: I) -> IpTrafficRecord
    where
        I: IntoIterator<Item = &'a RawLogLine>,
    {
        let mut record = IpTrafficRecord::new();
        for line in lines {
            self.accumulate(&mut record, &line.message);
        }
        record
    }

    fn accumulate(&self, record: &mut IpTrafficRecord, message: &str) {
        let Some(path) = self
            .path_pattern
            .captures(message)
            .and_then(|captures| captures.get(1))
        else {
            return;
        };

        let mut seen = Vec::new();
        for ip in self.ip_pattern.find_iter(message) {
            let ip = ip.as_str();
            if !seen.contains(&ip) {
                seen.push(ip);
            }
        }
        for ip in seen {
            record.record(ip, path.as_str());
        }
    }
}
