//! Passerelle NAT pilotée par un service de connexion WAN UPnP.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::{Host, Url};

use super::{Nat, Protocol, in_gateway_local_ip};
use crate::config_ext::NatConfig;
use crate::errors::NatError;
use crate::upnp::{
    AddPortMappingRequest, GetSpecificPortMappingEntryResponse, GetStatusInfoResponse,
    PortMappingClient, RootDevice,
};

pub const NAT_TYPE_UPNP_IP1: &str = "UPNP(IP1)";
pub const NAT_TYPE_UPNP_IP2: &str = "UPNP(IP2)";
pub const NAT_TYPE_UPNP_PPP1: &str = "UPNP(PPP1)";

/// Passerelle UPnP IGD.
///
/// Sans état entre deux appels ; le device racine est partagé avec les
/// autres passerelles construites depuis la même description.
#[derive(Clone)]
pub struct UpnpNat {
    client: Arc<dyn PortMappingClient>,
    nat_type: &'static str,
    location: Url,
    device_name: String,
    root_device: Arc<RootDevice>,
    attempts: u32,
    retry_backoff: Duration,
    default_description: String,
}

impl UpnpNat {
    pub fn new(
        client: Arc<dyn PortMappingClient>,
        nat_type: &'static str,
        root_device: Arc<RootDevice>,
        config: &NatConfig,
    ) -> Self {
        Self {
            client,
            nat_type,
            location: root_device.url_base.clone(),
            device_name: root_device.device.friendly_name.clone(),
            root_device,
            attempts: config.port_mapping_attempts.max(1),
            retry_backoff: config.retry_backoff,
            default_description: config.mapping_description.clone(),
        }
    }

    pub fn root_device(&self) -> &Arc<RootDevice> {
        &self.root_device
    }

    pub fn client(&self) -> &Arc<dyn PortMappingClient> {
        &self.client
    }
}

impl fmt::Debug for UpnpNat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpnpNat")
            .field("nat_type", &self.nat_type)
            .field("service_type", &self.client.service_type())
            .field("location", &self.location.as_str())
            .field("device_name", &self.device_name)
            .finish()
    }
}

#[async_trait]
impl Nat for UpnpNat {
    fn nat_type(&self) -> &str {
        self.nat_type
    }

    fn device_name(&self) -> &str {
        &self.device_name
    }

    fn location(&self) -> &Url {
        &self.location
    }

    async fn get_device_address(&self) -> Result<Ipv4Addr, NatError> {
        let unresolved = || NatError::UnresolvedDeviceAddress(self.location.to_string());
        match self.location.host() {
            Some(Host::Ipv4(addr)) => Ok(addr),
            Some(Host::Domain(domain)) => {
                let port = self.location.port_or_known_default().unwrap_or(80);
                let addrs = tokio::net::lookup_host((domain, port)).await?;
                addrs
                    .filter_map(|addr| match addr.ip() {
                        IpAddr::V4(v4) => Some(v4),
                        IpAddr::V6(_) => None,
                    })
                    .next()
                    .ok_or_else(unresolved)
            }
            Some(Host::Ipv6(_)) | None => Err(unresolved()),
        }
    }

    async fn get_external_address(&self) -> Result<IpAddr, NatError> {
        let address = self.client.get_external_ip_address().await?;
        address
            .trim()
            .parse()
            .map_err(|_| NatError::NoExternalAddress)
    }

    async fn get_internal_address(&self) -> Result<Ipv4Addr, NatError> {
        let gateway = self.get_device_address().await?;
        in_gateway_local_ip(gateway)
    }

    async fn add_port_mapping(
        &self,
        protocol: &str,
        internal_port: u16,
        external_port: u16,
        lease_duration: u32,
        description: &str,
    ) -> Result<(), NatError> {
        let protocol = Protocol::parse(protocol)?;
        let internal_client = self.get_internal_address().await?;
        let description = if description.is_empty() {
            self.default_description.as_str()
        } else {
            description
        };

        let request = AddPortMappingRequest {
            remote_host: String::new(),
            external_port,
            protocol: protocol.to_string(),
            internal_port,
            internal_client: internal_client.to_string(),
            enabled: true,
            description: description.to_string(),
            lease_duration,
        };

        let mut attempt = 1;
        loop {
            match self.client.add_port_mapping(&request).await {
                Ok(()) => {
                    debug!(
                        "{} port mapping {}:{} -> {}:{} added on {}",
                        protocol,
                        self.location.host_str().unwrap_or_default(),
                        external_port,
                        internal_client,
                        internal_port,
                        self.device_name
                    );
                    return Ok(());
                }
                Err(e) if attempt >= self.attempts => return Err(e.into()),
                Err(e) => {
                    warn!(
                        "AddPortMapping attempt {}/{} on {} failed: {}",
                        attempt, self.attempts, self.device_name, e
                    );
                    attempt += 1;
                    tokio::time::sleep(self.retry_backoff).await;
                }
            }
        }
    }

    async fn delete_port_mapping(
        &self,
        protocol: &str,
        external_port: u16,
    ) -> Result<(), NatError> {
        let protocol = Protocol::parse(protocol)?;
        self.client
            .delete_port_mapping("", external_port, protocol.as_str())
            .await?;
        Ok(())
    }

    async fn get_port_mapping(
        &self,
        protocol: &str,
        external_port: u16,
    ) -> Result<GetSpecificPortMappingEntryResponse, NatError> {
        let protocol = Protocol::parse(protocol)?;
        Ok(self
            .client
            .get_specific_port_mapping_entry("", external_port, protocol.as_str())
            .await?)
    }

    async fn get_device_status(&self) -> Result<GetStatusInfoResponse, NatError> {
        Ok(self.client.get_status_info().await?)
    }
}
