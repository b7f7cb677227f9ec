use get_if_addrs::{IfAddr, get_if_addrs};
use std::io;
use std::net::Ipv4Addr;

/// Adresse IPv4 portée par une interface réseau locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Interface {
    /// Nom de l'interface (ex: `"eth0"`, `"wlan0"`, `"en0"`)
    pub name: String,
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
}

impl Ipv4Interface {
    /// Indique si `addr` appartient au sous-réseau de cette interface.
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let mask = u32::from(self.netmask);
        u32::from(self.ip) & mask == u32::from(addr) & mask
    }

    pub fn is_loopback(&self) -> bool {
        self.ip.is_loopback()
    }
}

/// Liste toutes les adresses IPv4 des interfaces locales, loopback comprise.
///
/// L'ordre est celui rapporté par le système.
pub fn ipv4_interfaces() -> io::Result<Vec<Ipv4Interface>> {
    let interfaces = get_if_addrs()?;
    Ok(interfaces
        .into_iter()
        .filter_map(|iface| match iface.addr {
            IfAddr::V4(v4) => Some(Ipv4Interface {
                name: iface.name,
                ip: v4.ip,
                netmask: v4.netmask,
            }),
            IfAddr::V6(_) => None,
        })
        .collect())
}

/// Interfaces candidates pour le multicast SSDP.
///
/// On écarte la loopback et les adresses non spécifiées (`0.0.0.0`).
/// `get_if_addrs` ne dit rien de l'état du lien : une interface inactive
/// peut figurer dans la liste, c'est l'adhésion au groupe qui la filtre.
pub fn multicast_interfaces() -> io::Result<Vec<Ipv4Interface>> {
    Ok(ipv4_interfaces()?
        .into_iter()
        .filter(|iface| !iface.is_loopback() && !iface.ip.is_unspecified())
        .collect())
}

/// Cherche l'adresse locale dont le sous-réseau contient `gateway`.
///
/// La première interface qui correspond l'emporte. Retourne `Ok(None)` si
/// aucune interface ne convient.
pub fn local_ip_for_gateway(gateway: Ipv4Addr) -> io::Result<Option<Ipv4Addr>> {
    Ok(ipv4_interfaces()?
        .into_iter()
        .find(|iface| iface.contains(gateway))
        .map(|iface| iface.ip))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iface(ip: [u8; 4], mask: [u8; 4]) -> Ipv4Interface {
        Ipv4Interface {
            name: "test0".to_string(),
            ip: Ipv4Addr::from(ip),
            netmask: Ipv4Addr::from(mask),
        }
    }

    #[test]
    fn test_contains_same_subnet() {
        let lan = iface([192, 168, 1, 42], [255, 255, 255, 0]);
        assert!(lan.contains(Ipv4Addr::new(192, 168, 1, 1)));
        assert!(lan.contains(Ipv4Addr::new(192, 168, 1, 254)));
    }

    #[test]
    fn test_contains_other_subnet() {
        let lan = iface([192, 168, 1, 42], [255, 255, 255, 0]);
        assert!(!lan.contains(Ipv4Addr::new(192, 168, 2, 1)));
        assert!(!lan.contains(Ipv4Addr::new(10, 0, 0, 1)));
    }

    #[test]
    fn test_multicast_interfaces_exclude_loopback() {
        let ifaces = multicast_interfaces().unwrap();
        for iface in ifaces {
            assert!(!iface.ip.is_loopback(), "{} is loopback", iface.name);
            assert!(!iface.ip.is_unspecified());
        }
    }

    #[test]
    fn test_local_ip_for_loopback_gateway() {
        // La loopback (127.0.0.0/8) est toujours présente sur les machines de test
        let local = local_ip_for_gateway(Ipv4Addr::LOCALHOST).unwrap();
        assert!(local.is_some_and(|ip| ip.is_loopback()));
    }

    #[test]
    fn test_local_ip_for_unknown_gateway() {
        // TEST-NET-3, jamais configuré sur une interface
        let local = local_ip_for_gateway(Ipv4Addr::new(203, 0, 113, 7)).unwrap();
        assert!(local.is_none());
    }
}
