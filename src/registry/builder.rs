//! Builds the infrastructure IP registry from the DNS and network-interface
//! inventories. The two sub-builds are independent and run concurrently;
//! their merge is commutative, so completion order never changes the result.

use super::{IpRegistry, IpSource};
use crate::paging;
use crate::provider::{
    DnsProvider, FetchError, LoadBalancerProvider, NetworkInterface, NetworkInterfaceProvider,
    ZoneSummary,
};
use std::collections::BTreeSet;
use std::sync::Arc;

pub struct IpRegistryBuilder<D, L, N> {
    dns: Arc<D>,
    load_balancers: Arc<L>,
    interfaces: Arc<N>,
}

impl<D, L, N> IpRegistryBuilder<D, L, N>
where
    D: DnsProvider,
    L: LoadBalancerProvider,
    N: NetworkInterfaceProvider,
{
    pub fn new(dns: Arc<D>, load_balancers: Arc<L>, interfaces: Arc<N>) -> Self {
        Self {
            dns,
            load_balancers,
            interfaces,
        }
    }

    /// Runs both sub-builds concurrently and merges their results. A failed
    /// sub-build contributes nothing; the other still feeds correlation.
    pub async fn build(&self) -> IpRegistry {
        let (dns_part, interface_part) = tokio::join!(self.build_dns(), self.build_interfaces());

        let mut registry = match dns_part {
            Ok(part) => part,
            Err(error) => {
                tracing::warn!(%error, "dns registry sub-build failed");
                IpRegistry::new()
            }
        };
        match interface_part {
            Ok(part) => registry.merge(part),
            Err(error) => tracing::warn!(%error, "interface registry sub-build failed"),
        }

        tracing::info!(entries = registry.len(), "infrastructure registry built");
        registry
    }

    /// Every record value across every zone that parses as an IP address.
    /// Zones are fetched concurrently; a failed zone is skipped with a
    /// warning while the rest still contribute.
    async fn build_dns(&self) -> Result<IpRegistry, FetchError> {
        let zones = {
            let dns = Arc::clone(&self.dns);
            paging::drain_pages(move |cursor| {
                let dns = Arc::clone(&dns);
                async move { dns.list_zones(cursor.as_deref()).await }
            })
            .await?
        };

        let per_zone = futures::future::join_all(
            zones.iter().map(|zone| self.collect_zone(zone)),
        )
        .await;

        let mut registry = IpRegistry::new();
        for (zone, result) in zones.iter().zip(per_zone) {
            match result {
                Ok(part) => registry.merge(part),
                Err(error) => {
                    tracing::warn!(zone = %zone.display_name, %error, "zone listing failed");
                }
            }
        }
        Ok(registry)
    }

    async fn collect_zone(&self, zone: &ZoneSummary) -> Result<IpRegistry, FetchError> {
        let record_sets = {
            let dns = Arc::clone(&self.dns);
            let zone_id = zone.id.clone();
            paging::drain_pages(move |cursor| {
                let dns = Arc::clone(&dns);
                let zone_id = zone_id.clone();
                async move { dns.list_record_sets(&zone_id, cursor.as_deref()).await }
            })
            .await?
        };

        let mut registry = IpRegistry::new();
        for record_set in record_sets {
            for record in record_set.records {
                // CNAME and friends point at names; only address values
                // enter the registry.
                if record.value.parse::<std::net::IpAddr>().is_ok() {
                    registry.upsert(
                        &record.value,
                        IpSource::Dns {
                            zone: zone.display_name.clone(),
                            record_name: record_set.name.clone(),
                        },
                    );
                }
            }
        }
        Ok(registry)
    }

    /// Every private address of every interface on a network that carries a
    /// load balancer, plus public addresses where secondaries have one.
    async fn build_interfaces(&self) -> Result<IpRegistry, FetchError> {
        let balancers = {
            let provider = Arc::clone(&self.load_balancers);
            paging::drain_pages(move |cursor| {
                let provider = Arc::clone(&provider);
                async move { provider.list_load_balancers(cursor.as_deref()).await }
            })
            .await?
        };

        let networks: BTreeSet<String> =
            balancers.into_iter().map(|lb| lb.network_id).collect();
        if networks.is_empty() {
            return Ok(IpRegistry::new());
        }
        let networks: Vec<String> = networks.into_iter().collect();

        let interfaces = {
            let provider = Arc::clone(&self.interfaces);
            let networks = networks.clone();
            paging::drain_pages(move |cursor| {
                let provider = Arc::clone(&provider);
                let networks = networks.clone();
                async move { provider.list_interfaces(&networks, cursor.as_deref()).await }
            })
            .await?
        };

        let mut registry = IpRegistry::new();
        for interface in interfaces {
            for address in interface_addresses(&interface) {
                registry.upsert(
                    &address,
                    IpSource::Interface {
                        interface_id: interface.interface_id.clone(),
                        description: interface.description.clone(),
                    },
                );
            }
        }
        Ok(registry)
    }
}

fn interface_addresses(interface: &NetworkInterface) -> Vec<String> {
    let mut addresses = vec![interface.primary_address.clone()];
    for secondary in &interface.secondary_addresses {
        addresses.push(secondary.address.clone());
        if let Some(public) = &secondary.public_address {
            addresses.push(public.clone());
        }
    }
    addresses
}
