//! # Module SSDP - Simple Service Discovery Protocol
//!
//! Côté *control point* uniquement : envoi de requêtes `M-SEARCH` en
//! multicast et collecte des réponses unicast `HTTP/1.1 200 OK`.
//!
//! ## Architecture
//!
//! - [`SsdpConn`] : socket UDP multicast, abonnée au groupe sur chaque
//!   interface IPv4 utilisable
//! - [`search`] / [`search_with_timeout`] : une recherche complète, filtrée
//!   et dédoublonnée
//!
//! Le socket est lié sur un port éphémère (`0.0.0.0:0`) et jamais sur 1900 :
//! les réponses aux `M-SEARCH` arrivent en unicast sur le port source.

mod conn;
mod search;

use std::net::{Ipv4Addr, SocketAddrV4};

use thiserror::Error;

pub use conn::{ConnOptions, SsdpConn, SsdpResponse};
pub use search::{
    SearchRequest, Service, process_responses, search, search_with_options, search_with_timeout,
};

/// Adresse multicast SSDP
pub const SSDP_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);

/// Port SSDP
pub const SSDP_PORT: u16 = 1900;

/// Cible de recherche couvrant tous les devices et services.
pub const SSDP_ALL: &str = "ssdp:all";

/// Cible de recherche couvrant tous les root devices.
pub const UPNP_ROOT_DEVICE: &str = "upnp:rootdevice";

pub(crate) const SSDP_DISCOVER: &str = "\"ssdp:discover\"";

/// Destination des requêtes de recherche.
pub fn ssdp_multicast_addr() -> SocketAddrV4 {
    SocketAddrV4::new(SSDP_MULTICAST_ADDR, SSDP_PORT)
}

/// Erreurs du transport et de la recherche SSDP
#[derive(Debug, Error)]
pub enum SsdpError {
    #[error("SSDP socket error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no interfaces had joined to group {0}")]
    NoInterfaceJoined(Ipv4Addr),
    #[error("ssdp: request timeout must be at least 1s, got {0}")]
    InvalidWait(u32),
    #[error("SSDP search cancelled")]
    Cancelled,
}
