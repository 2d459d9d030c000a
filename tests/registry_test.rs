use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use traffic_correlator::paging::Page;
use traffic_correlator::provider::{
    DnsProvider, FetchError, LoadBalancerProvider, LoadBalancerSummary, NetworkInterface,
    NetworkInterfaceProvider, RecordSet, RecordValue, SecondaryAddress, ZoneSummary,
};
use traffic_correlator::registry::{IpRegistry, IpRegistryBuilder, IpSource};

struct FakeInventory {
    zones: Vec<ZoneSummary>,
    record_sets: Vec<(String, RecordSet)>,
    balancers: Vec<LoadBalancerSummary>,
    interfaces: Vec<NetworkInterface>,
    failing_zone: Option<String>,
}

impl FakeInventory {
    fn empty() -> Self {
        Self {
            zones: Vec::new(),
            record_sets: Vec::new(),
            balancers: Vec::new(),
            interfaces: Vec::new(),
            failing_zone: None,
        }
    }

    fn zone(mut self, id: &str, display_name: &str) -> Self {
        self.zones.push(ZoneSummary {
            id: id.to_string(),
            display_name: display_name.to_string(),
        });
        self
    }

    fn records(mut self, zone_id: &str, name: &str, values: &[&str]) -> Self {
        self.record_sets.push((
            zone_id.to_string(),
            RecordSet {
                name: name.to_string(),
                records: values
                    .iter()
                    .map(|v| RecordValue {
                        value: (*v).to_string(),
                    })
                    .collect(),
            },
        ));
        self
    }

    fn balancer(mut self, network_id: &str) -> Self {
        self.balancers.push(LoadBalancerSummary {
            network_id: network_id.to_string(),
        });
        self
    }

    fn interface(mut self, interface: NetworkInterface) -> Self {
        self.interfaces.push(interface);
        self
    }

    fn failing_zone(mut self, zone_id: &str) -> Self {
        self.failing_zone = Some(zone_id.to_string());
        self
    }
}

#[async_trait]
impl DnsProvider for FakeInventory {
    async fn list_zones(&self, _cursor: Option<&str>) -> Result<Page<ZoneSummary>, FetchError> {
        Ok(Page::new(self.zones.clone(), None))
    }

    async fn list_record_sets(
        &self,
        zone_id: &str,
        _cursor: Option<&str>,
    ) -> Result<Page<RecordSet>, FetchError> {
        if self.failing_zone.as_deref() == Some(zone_id) {
            return Err(FetchError::Malformed(format!(
                "scripted failure for zone {zone_id}"
            )));
        }
        let sets = self
            .record_sets
            .iter()
            .filter(|(zone, _)| zone == zone_id)
            .map(|(_, set)| set.clone())
            .collect();
        Ok(Page::new(sets, None))
    }
}

#[async_trait]
impl LoadBalancerProvider for FakeInventory {
    async fn list_load_balancers(
        &self,
        _cursor: Option<&str>,
    ) -> Result<Page<LoadBalancerSummary>, FetchError> {
        Ok(Page::new(self.balancers.clone(), None))
    }
}

#[async_trait]
impl NetworkInterfaceProvider for FakeInventory {
    async fn list_interfaces(
        &self,
        network_ids: &[String],
        _cursor: Option<&str>,
    ) -> Result<Page<NetworkInterface>, FetchError> {
        // The builder must pass the distinct network set.
        let distinct: HashSet<&String> = network_ids.iter().collect();
        assert_eq!(distinct.len(), network_ids.len());
        Ok(Page::new(self.interfaces.clone(), None))
    }
}

fn nic(id: &str, primary: &str, secondaries: &[(&str, Option<&str>)]) -> NetworkInterface {
    NetworkInterface {
        interface_id: id.to_string(),
        description: format!("{id} description"),
        primary_address: primary.to_string(),
        secondary_addresses: secondaries
            .iter()
            .map(|(address, public)| SecondaryAddress {
                address: (*address).to_string(),
                public_address: public.map(str::to_string),
            })
            .collect(),
    }
}

async fn build(inventory: FakeInventory) -> IpRegistry {
    let inventory = Arc::new(inventory);
    IpRegistryBuilder::new(
        Arc::clone(&inventory),
        Arc::clone(&inventory),
        Arc::clone(&inventory),
    )
    .build()
    .await
}

#[tokio::test]
async fn dns_and_interface_sources_merge_on_the_same_ip() {
    let registry = build(
        FakeInventory::empty()
            .zone("z1", "internal.example")
            .records("z1", "api", &["10.0.0.1"])
            .balancer("net-1")
            .interface(nic("eni-1", "10.0.0.1", &[])),
    )
    .await;

    let entry = registry.get("10.0.0.1").unwrap();
    assert_eq!(entry.sources.len(), 2);
    assert!(entry.sources.iter().any(|s| matches!(s, IpSource::Dns { .. })));
    assert!(
        entry
            .sources
            .iter()
            .any(|s| matches!(s, IpSource::Interface { .. }))
    );
}

#[tokio::test]
async fn non_address_record_values_are_skipped() {
    let registry = build(
        FakeInventory::empty()
            .zone("z1", "internal.example")
            .records("z1", "web", &["10.0.0.2", "web.internal.example", "2001:db8::7"]),
    )
    .await;

    assert!(registry.contains("10.0.0.2"));
    assert!(registry.contains("2001:db8::7"));
    assert!(!registry.contains("web.internal.example"));
}

#[tokio::test]
async fn record_sets_sharing_a_name_accumulate_values() {
    let registry = build(
        FakeInventory::empty()
            .zone("z1", "internal.example")
            .records("z1", "api", &["10.0.0.3"])
            .records("z1", "api", &["10.0.0.4"]),
    )
    .await;

    assert!(registry.contains("10.0.0.3"));
    assert!(registry.contains("10.0.0.4"));
}

#[tokio::test]
async fn interface_collection_covers_secondary_and_public_addresses() {
    let registry = build(
        FakeInventory::empty()
            .balancer("net-1")
            .balancer("net-1") // duplicate network must be deduplicated
            .interface(nic(
                "eni-2",
                "10.0.1.1",
                &[("10.0.1.2", Some("52.10.0.2")), ("10.0.1.3", None)],
            )),
    )
    .await;

    for ip in ["10.0.1.1", "10.0.1.2", "52.10.0.2", "10.0.1.3"] {
        assert!(registry.contains(ip), "missing {ip}");
    }
    assert_eq!(registry.len(), 4);
}

#[tokio::test]
async fn no_load_balancers_means_no_interface_entries() {
    let registry = build(
        FakeInventory::empty().interface(nic("eni-3", "10.0.2.1", &[])),
    )
    .await;
    assert!(registry.is_empty());
}

#[tokio::test]
async fn a_failing_zone_is_skipped_without_losing_the_rest() {
    let registry = build(
        FakeInventory::empty()
            .zone("z1", "internal.example")
            .zone("z2", "other.example")
            .records("z1", "api", &["10.0.0.5"])
            .records("z2", "db", &["10.0.0.6"])
            .failing_zone("z2"),
    )
    .await;

    assert!(registry.contains("10.0.0.5"));
    assert!(!registry.contains("10.0.0.6"));
}

#[tokio::test]
async fn merge_order_does_not_change_the_final_mapping() {
    let mut dns_first = IpRegistry::new();
    dns_first.upsert(
        "10.0.0.1",
        IpSource::Dns {
            zone: "internal.example".to_string(),
            record_name: "api".to_string(),
        },
    );
    let mut iface_first = IpRegistry::new();
    iface_first.upsert(
        "10.0.0.1",
        IpSource::Interface {
            interface_id: "eni-1".to_string(),
            description: "edge".to_string(),
        },
    );

    let mut forward = dns_first.clone();
    forward.merge(iface_first.clone());
    let mut reverse = iface_first;
    reverse.merge(dns_first);

    assert_eq!(forward.len(), reverse.len());
    let entry_fwd = forward.get("10.0.0.1").unwrap();
    let entry_rev = reverse.get("10.0.0.1").unwrap();
    // Identical up to source-list order.
    assert_eq!(entry_fwd.sources.len(), entry_rev.sources.len());
    for source in &entry_fwd.sources {
        assert!(entry_rev.sources.contains(source));
    }
}
