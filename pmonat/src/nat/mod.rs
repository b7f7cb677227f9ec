//! # Module NAT - Façade de redirection de ports
//!
//! Ce module expose une vue simplifiée d'une passerelle NAT découverte :
//! adresses (passerelle, externe, interne), création et suppression de
//! redirections, état de la connexion.
//!
//! ## Architecture
//!
//! - [`Nat`] : trait de la façade, un objet par service WAN trouvé
//! - [`UpnpNat`] : implémentation au-dessus d'un [`PortMappingClient`]
//! - [`Discover`] : découverte concurrente des passerelles
//!
//! ## Example
//!
//! ```ignore
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! for nat in pmonat::discover_nats(&cancel).await? {
//!     println!("{} {} {}", nat.nat_type(), nat.device_name(), nat.location());
//!     nat.add_port_mapping("udp", 17269, 17269, 3600, "").await?;
//! }
//! ```
//!
//! [`PortMappingClient`]: crate::upnp::PortMappingClient

mod discover;
mod upnp_nat;

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use async_trait::async_trait;
use url::Url;

use crate::errors::NatError;
use crate::upnp::{GetSpecificPortMappingEntryResponse, GetStatusInfoResponse};

pub use discover::{Discover, collect_nat_services, discover_nats};
pub use upnp_nat::{NAT_TYPE_UPNP_IP1, NAT_TYPE_UPNP_IP2, NAT_TYPE_UPNP_PPP1, UpnpNat};

/// Protocole d'une redirection de port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    /// Analyse un nom de protocole, sans tenir compte de la casse.
    pub fn parse(protocol: &str) -> Result<Self, NatError> {
        protocol.parse()
    }

    /// Nom attendu par la passerelle (`TCP` ou `UDP`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        }
    }
}

impl FromStr for Protocol {
    type Err = NatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TCP" => Ok(Protocol::Tcp),
            "UDP" => Ok(Protocol::Udp),
            _ => Err(NatError::unsupported_protocol(s)),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Passerelle NAT pilotable.
///
/// Les méthodes de redirection valident le protocole avant tout appel
/// réseau.
#[async_trait]
pub trait Nat: Send + Sync {
    /// Type de passerelle, par exemple `UPNP(IP1)`.
    fn nat_type(&self) -> &str;

    /// Nom convivial du device racine.
    fn device_name(&self) -> &str;

    /// Base des URL de la description de la passerelle.
    fn location(&self) -> &Url;

    /// Adresse de la passerelle, résolue depuis l'hôte de [`Nat::location`].
    async fn get_device_address(&self) -> Result<Ipv4Addr, NatError>;

    /// Adresse publique rapportée par la passerelle.
    async fn get_external_address(&self) -> Result<IpAddr, NatError>;

    /// Adresse locale sur le sous-réseau de la passerelle.
    async fn get_internal_address(&self) -> Result<Ipv4Addr, NatError>;

    /// Redirige `external_port` vers `internal_port` de cette machine.
    ///
    /// Une description vide est remplacée par la description par défaut.
    async fn add_port_mapping(
        &self,
        protocol: &str,
        internal_port: u16,
        external_port: u16,
        lease_duration: u32,
        description: &str,
    ) -> Result<(), NatError>;

    async fn delete_port_mapping(&self, protocol: &str, external_port: u16)
    -> Result<(), NatError>;

    async fn get_port_mapping(
        &self,
        protocol: &str,
        external_port: u16,
    ) -> Result<GetSpecificPortMappingEntryResponse, NatError>;

    async fn get_device_status(&self) -> Result<GetStatusInfoResponse, NatError>;
}

/// Première adresse locale dont le sous-réseau contient `gateway`.
pub fn in_gateway_local_ip(gateway: Ipv4Addr) -> Result<Ipv4Addr, NatError> {
    pmoutils::local_ip_for_gateway(gateway)?.ok_or(NatError::NoInternalAddress)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_parse_is_case_insensitive() {
        assert_eq!(Protocol::parse("udp").unwrap(), Protocol::Udp);
        assert_eq!(Protocol::parse("Tcp").unwrap(), Protocol::Tcp);
        assert_eq!(Protocol::Udp.to_string(), "UDP");
        assert!(matches!(
            Protocol::parse("sctp"),
            Err(NatError::UnsupportedProtocol(p)) if p == "sctp"
        ));
        assert!(Protocol::parse("").is_err());
    }

    #[test]
    fn test_loopback_gateway_maps_to_loopback() {
        assert_eq!(
            in_gateway_local_ip(Ipv4Addr::LOCALHOST).unwrap(),
            Ipv4Addr::LOCALHOST
        );
    }
}
