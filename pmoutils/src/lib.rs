//! Utilitaires système partagés par les crates PMONat.
//!
//! # Fonctions principales
//!
//! - [`ipv4_interfaces`] : liste les adresses IPv4 des interfaces locales avec leur masque
//! - [`multicast_interfaces`] : interfaces candidates pour rejoindre un groupe multicast
//! - [`local_ip_for_gateway`] : adresse locale située dans le même sous-réseau qu'une passerelle
//! - [`get_os_string`] : description courte du système pour les en-têtes `User-Agent`
mod ip_utils;

pub use ip_utils::{Ipv4Interface, ipv4_interfaces, local_ip_for_gateway, multicast_interfaces};

/// Retourne une chaîne décrivant le système d'exploitation et sa version.
///
/// Utilise la crate `os_info` pour obtenir de manière portable et fiable
/// les informations sur le système d'exploitation courant.
///
/// # Format
/// - macOS: "macOS/15.1" ou "Mac OS/10.15.7"
/// - Linux: "Linux/6.5.0" ou "Ubuntu/22.04"
/// - Windows: "Windows/10.0.19045"
/// - Autre: "{OS}/Unknown"
///
/// # Exemples
///
/// ```
/// use pmoutils::get_os_string;
///
/// let os = get_os_string();
/// assert!(os.contains('/'));
/// ```
pub fn get_os_string() -> String {
    let info = os_info::get();
    let os_type = format!("{:?}", info.os_type());

    let version = info.version();
    if version != &os_info::Version::Unknown {
        format!("{}/{}", os_type, version)
    } else {
        format!("{}/Unknown", os_type)
    }
}
