//! Correlation of harvested traffic against the infrastructure registry,
//! and the human-readable run report.

use crate::aggregate::IpTrafficRecord;
use crate::registry::{InfrastructureIpEntry, IpRegistry};
use std::collections::BTreeMap;
use std::fmt::Write as _;

pub const DEFAULT_TOP_PATHS: usize = 10;

/// One traffic IP that is also known infrastructure.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationResult {
    pub ip: String,
    pub entry: InfrastructureIpEntry,
    /// Most-hit paths, descending by count, ties by first-seen order,
    /// at most `top_paths` long.
    pub top_paths: Vec<(String, u64)>,
}

pub struct CorrelationReporter {
    top_paths: usize,
}

impl Default for CorrelationReporter {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_PATHS)
    }
}

impl CorrelationReporter {
    pub fn new(top_paths: usize) -> Self {
        Self { top_paths }
    }

    /// Joins traffic against the registry. Traffic IPs absent from the
    /// registry produce no output. Results are ordered by IP so the report
    /// is stable across runs.
    pub fn correlate(
        &self,
        traffic: &IpTrafficRecord,
        registry: &IpRegistry,
    ) -> Vec<CorrelationResult> {
        let mut results: Vec<CorrelationResult> = traffic
            .ips()
            .filter_map(|ip| {
                registry.get(ip).map(|entry| CorrelationResult {
                    ip: ip.to_string(),
                    entry: entry.clone(),
                    top_paths: traffic.top_paths(ip, self.top_paths),
                })
            })
            .collect();
        results.sort_by(|a, b| a.ip.cmp(&b.ip));
        results
    }

    /// Renders the full run report: one block per correlated IP, then the
    /// oldest-observed marker per harvested stream.
    pub fn render(
        &self,
        results: &[CorrelationResult],
        oldest_seen: &BTreeMap<String, String>,
    ) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Infrastructure traffic correlation");
        let _ = writeln!(out);

        if results.is_empty() {
            let _ = writeln!(out, "  (no harvested traffic matched the registry)");
        }
        for result in results {
            let _ = writeln!(out, "{}", result.ip);
            for source in &result.entry.sources {
                let _ = writeln!(out, "  known via {source}");
            }
            for (path, hits) in &result.top_paths {
                let _ = writeln!(out, "  {hits:>6}  {path}");
            }
            let _ = writeln!(out);
        }

        let _ = writeln!(out, "Oldest observed events per stream");
        if oldest_seen.is_empty() {
            let _ = writeln!(out, "  (no streams exhausted)");
        }
        for (stream, date) in oldest_seen {
            let _ = writeln!(out, "  {stream}: {date}");
        }
        out
    }
}
