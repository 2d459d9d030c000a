//! Known-infrastructure IP registry.
//!
//! One entry per IP, each carrying every source it was discovered through.
//! `upsert` appends sources rather than replacing them, so DNS entries
//! survive interface-discovery merges and vice versa; `merge` is
//! commutative up to source-list order.

pub mod builder;

pub use builder::IpRegistryBuilder;

use serde::Serialize;
use std::collections::HashMap;

/// Where a registry IP was discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IpSource {
    Dns { zone: String, record_name: String },
    Interface { interface_id: String, description: String },
}

impl std::fmt::Display for IpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IpSource::Dns { zone, record_name } => {
                write!(f, "dns zone {zone}, record {record_name}")
            }
            IpSource::Interface {
                interface_id,
                description,
            } => write!(f, "interface {interface_id} ({description})"),
        }
    }
}

/// A known-infrastructure IP and every source that claimed it. The source
/// list is never empty once the entry exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfrastructureIpEntry {
    pub ip: String,
    pub sources: Vec<IpSource>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IpRegistry {
    entries: HashMap<String, InfrastructureIpEntry>,
}

impl IpRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source for an IP, creating the entry on first sight and
    /// appending on every later one.
    pub fn upsert(&mut self, ip: &str, source: IpSource) {
        self.entries
            .entry(ip.to_string())
            .or_insert_with(|| InfrastructureIpEntry {
                ip: ip.to_string(),
                sources: Vec::new(),
            })
            .sources
            .push(source);
    }

    /// Union over the IP key; colliding entries concatenate their sources.
    pub fn merge(&mut self, other: IpRegistry) {
        for (ip, entry) in other.entries {
            for source in entry.sources {
                self.upsert(&ip, source);
            }
        }
    }

    pub fn get(&self, ip: &str) -> Option<&InfrastructureIpEntry> {
        self.entries.get(ip)
    }

    pub fn contains(&self, ip: &str) -> bool {
        self.entries.contains_key(ip)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InfrastructureIpEntry> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dns(zone: &str, record: &str) -> IpSource {
        IpSource::Dns {
            zone: zone.to_string(),
            record_name: record.to_string(),
        }
    }

    fn iface(id: &str) -> IpSource {
        IpSource::Interface {
            interface_id: id.to_string(),
            description: "test".to_string(),
        }
    }

    #[test]
    fn upsert_appends_sources_instead_of_replacing() {
        let mut registry = IpRegistry::new();
        registry.upsert("10.0.0.1", dns("internal", "api"));
        registry.upsert("10.0.0.1", iface("eni-1"));

        let entry = registry.get("10.0.0.1").unwrap();
        assert_eq!(entry.sources.len(), 2);
        assert_eq!(entry.sources[0], dns("internal", "api"));
        assert_eq!(entry.sources[1], iface("eni-1"));
    }

    #[test]
    fn merge_is_a_union_keeping_both_sides_sources() {
        let mut dns_side = IpRegistry::new();
        dns_side.upsert("10.0.0.1", dns("internal", "api"));
        dns_side.upsert("10.0.0.2", dns("internal", "db"));

        let mut iface_side = IpRegistry::new();
        iface_side.upsert("10.0.0.1", iface("eni-1"));
        iface_side.upsert("10.0.0.3", iface("eni-2"));

        dns_side.merge(iface_side);
        assert_eq!(dns_side.len(), 3);
        assert_eq!(dns_side.get("10.0.0.1").unwrap().sources.len(), 2);
        assert!(dns_side.contains("10.0.0.2"));
        assert!(dns_side.contains("10.0.0.3"));
    }
}
