//! Transport SSDP : socket multicast et lecture des datagrammes.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use socket2::{Domain, Protocol, SockRef, Socket, Type};
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::{SearchRequest, SsdpError};

/// Options de création de [`SsdpConn`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnOptions {
    /// TTL des datagrammes émis. `None` garde la valeur du système.
    pub ttl: Option<u32>,
    /// Rejoint le groupe via l'interface choisie par le système plutôt
    /// qu'interface par interface.
    pub system_assigned_interface: bool,
}

/// Connexion SSDP abonnée à un groupe multicast.
///
/// Le socket est fermé quand la connexion est libérée.
#[derive(Debug)]
pub struct SsdpConn {
    socket: UdpSocket,
    dest: SocketAddrV4,
    local: SocketAddr,
    interfaces: Vec<Ipv4Addr>,
}

impl SsdpConn {
    /// Ouvre un socket sur un port éphémère et rejoint le groupe de `dest`.
    ///
    /// Le groupe est rejoint sur chaque interface IPv4 utilisable ; si aucune
    /// n'est trouvée (ou si `system_assigned_interface` est demandé),
    /// l'interface choisie par le système est utilisée. Échoue quand aucune
    /// adhésion n'a réussi. Une destination unicast ne rejoint aucun groupe.
    ///
    /// Doit être appelée depuis un runtime tokio.
    pub fn new(dest: SocketAddrV4, options: ConnOptions) -> Result<Self, SsdpError> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)).into())?;
        socket.set_multicast_loop_v4(true)?;

        let interfaces = if options.system_assigned_interface {
            Vec::new()
        } else {
            match pmoutils::multicast_interfaces() {
                Ok(list) => list.into_iter().map(|itf| itf.ip).collect(),
                Err(e) => {
                    warn!("SSDP: cannot list interfaces, using system assigned one: {}", e);
                    Vec::new()
                }
            }
        };

        // Seules les interfaces qui ont rejoint le groupe servent aux envois
        let interfaces = if dest.ip().is_multicast() {
            join_group(&socket, *dest.ip(), &interfaces)?
        } else {
            interfaces
        };

        if let Some(ttl) = options.ttl.filter(|ttl| *ttl > 0) {
            socket.set_ttl(ttl)?;
            socket.set_multicast_ttl_v4(ttl)?;
        }

        socket.set_nonblocking(true)?;
        let socket = UdpSocket::from_std(socket.into())?;
        let local = socket.local_addr()?;
        debug!("SSDP: connection ready on {} towards {}", local, dest);

        Ok(Self {
            socket,
            dest,
            local,
            interfaces,
        })
    }

    /// Adresse locale du socket.
    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    /// Interfaces sur lesquelles le groupe a été rejoint. Vide quand
    /// l'interface système est utilisée.
    pub fn interfaces(&self) -> &[Ipv4Addr] {
        &self.interfaces
    }

    /// Envoie `data` à `to`.
    ///
    /// Une destination unicast reçoit un seul datagramme. Une destination
    /// multicast en reçoit un par interface, l'interface de sortie étant
    /// fixée avant chaque envoi. Retourne le total des octets envoyés.
    pub async fn write_to(&self, data: &[u8], to: SocketAddrV4) -> Result<usize, SsdpError> {
        if !to.ip().is_multicast() || self.interfaces.is_empty() {
            if to.ip().is_multicast() {
                SockRef::from(&self.socket).set_multicast_if_v4(&Ipv4Addr::UNSPECIFIED)?;
            }
            return Ok(self.socket.send_to(data, to).await?);
        }

        let mut sum = 0;
        let mut last_error = None;
        for ip in &self.interfaces {
            let sent = match SockRef::from(&self.socket).set_multicast_if_v4(ip) {
                Ok(()) => self.socket.send_to(data, to).await,
                Err(e) => Err(e),
            };
            match sent {
                Ok(n) => sum += n,
                Err(e) => {
                    warn!("SSDP: cannot send to {} on {}: {}", to, ip, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if sum == 0 => Err(e.into()),
            _ => Ok(sum),
        }
    }

    /// Lit les datagrammes jusqu'à l'échéance et les passe à `handler`.
    ///
    /// L'expiration du délai termine la lecture sans erreur. Une erreur
    /// retournée par `handler` interrompt la lecture.
    pub async fn read_packets<F>(&self, timeout: Duration, mut handler: F) -> Result<(), SsdpError>
    where
        F: FnMut(SocketAddr, &[u8]) -> Result<(), SsdpError>,
    {
        let deadline = Instant::now() + timeout;
        let mut buf = vec![0u8; 65535];
        loop {
            match tokio::time::timeout_at(deadline, self.socket.recv_from(&mut buf)).await {
                Err(_) => return Ok(()),
                Ok(Ok((n, from))) => handler(from, &buf[..n])?,
                Ok(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Envoie la requête vers la destination de la connexion puis collecte
    /// les réponses HTTP reçues pendant `timeout`.
    ///
    /// Les datagrammes qui ne sont pas des réponses HTTP sont ignorés.
    pub async fn do_request(
        &self,
        request: &SearchRequest,
        timeout: Duration,
    ) -> Result<Vec<SsdpResponse>, SsdpError> {
        let message = request.to_bytes();
        let sent = self.write_to(&message, self.dest).await?;
        debug!(
            "📤 M-SEARCH sent (ST={}, MX={}, {} bytes)",
            request.search_type(),
            request.mx(),
            sent
        );

        let mut responses = Vec::new();
        self.read_packets(timeout, |from, data| {
            match SsdpResponse::parse(data) {
                Some(response) => responses.push(response),
                None => trace!(
                    "SSDP datagram from {} is not an HTTP response:\n{}",
                    from,
                    String::from_utf8_lossy(data)
                ),
            }
            Ok(())
        })
        .await?;
        Ok(responses)
    }
}

/// Rejoint `group` sur chaque interface et retourne celles qui ont réussi.
fn join_group(
    socket: &Socket,
    group: Ipv4Addr,
    interfaces: &[Ipv4Addr],
) -> Result<Vec<Ipv4Addr>, SsdpError> {
    if interfaces.is_empty() {
        return socket
            .join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)
            .map(|()| Vec::new())
            .map_err(|e| {
                warn!("SSDP: system assigned interface cannot join {}: {}", group, e);
                SsdpError::NoInterfaceJoined(group)
            });
    }

    let mut joined = Vec::with_capacity(interfaces.len());
    for ip in interfaces {
        match socket.join_multicast_v4(&group, ip) {
            Ok(()) => {
                debug!("SSDP: joined {} on {}", group, ip);
                joined.push(*ip);
            }
            Err(e) => warn!("SSDP: failed to join {} on {}: {}", group, ip, e),
        }
    }

    if joined.is_empty() {
        return Err(SsdpError::NoInterfaceJoined(group));
    }
    Ok(joined)
}

/// Réponse HTTP reçue sur le socket SSDP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsdpResponse {
    pub status: u16,
    pub reason: String,
    headers: HashMap<String, String>,
}

impl SsdpResponse {
    /// Analyse un datagramme `HTTP/1.x <code> <raison>` suivi de ses en-têtes.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(data).ok()?;
        let mut lines = text.lines();

        let status_line = lines.next()?.trim();
        let mut parts = status_line.splitn(3, ' ');
        let version = parts.next()?;
        if !version.to_ascii_uppercase().starts_with("HTTP/") {
            return None;
        }
        let status = parts.next()?.parse::<u16>().ok()?;
        let reason = parts.next().unwrap_or_default().trim().to_string();

        Some(Self {
            status,
            reason,
            headers: parse_headers(lines),
        })
    }

    /// Valeur d'un en-tête, nom insensible à la casse. Chaîne vide si absent.
    pub fn header(&self, name: &str) -> &str {
        self.headers
            .get(&name.to_ascii_uppercase())
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn st(&self) -> &str {
        self.header("ST")
    }

    pub fn usn(&self) -> &str {
        self.header("USN")
    }

    pub fn server(&self) -> &str {
        self.header("SERVER")
    }

    pub fn location(&self) -> &str {
        self.header("LOCATION")
    }
}

fn parse_headers<'a, I>(lines: I) -> HashMap<String, String>
where
    I: Iterator<Item = &'a str>,
{
    let mut headers = HashMap::new();
    for line in lines {
        let line = line.trim();

        // Empty line marks end of headers
        if line.is_empty() {
            break;
        }

        // Split on first ':' only (values may contain ':')
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_ascii_uppercase();
            if name.is_empty() {
                continue;
            }
            // Première occurrence conservée
            headers
                .entry(name)
                .or_insert_with(|| value.trim().to_string());
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssdp::SSDP_MULTICAST_ADDR;

    fn test_socket() -> Socket {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).unwrap();
        socket
            .bind(&SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)).into())
            .unwrap();
        socket
    }

    #[test]
    fn join_fails_on_foreign_address() {
        let socket = test_socket();
        let foreign = Ipv4Addr::new(203, 0, 113, 7);

        let err = join_group(&socket, SSDP_MULTICAST_ADDR, &[foreign]).unwrap_err();
        assert!(matches!(err, SsdpError::NoInterfaceJoined(group) if group == SSDP_MULTICAST_ADDR));
    }

    #[test]
    fn failed_joins_are_dropped_from_interfaces() {
        let socket = test_socket();
        let foreign = Ipv4Addr::new(203, 0, 113, 7);
        let mut candidates = vec![foreign];
        candidates.extend(
            pmoutils::multicast_interfaces()
                .unwrap_or_default()
                .into_iter()
                .map(|itf| itf.ip),
        );

        match join_group(&socket, SSDP_MULTICAST_ADDR, &candidates) {
            Ok(joined) => {
                assert!(!joined.is_empty());
                assert!(!joined.contains(&foreign));
            }
            // machine sans interface multicast
            Err(SsdpError::NoInterfaceJoined(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn parse_search_response() {
        let data = b"HTTP/1.1 200 OK\r\n\
            CACHE-CONTROL: max-age=120\r\n\
            st: urn:schemas-upnp-org:device:WANConnectionDevice:1\r\n\
            Location: http://192.168.1.1:5000/rootDesc.xml\r\n\
            USN: uuid:abc::urn:schemas-upnp-org:device:WANConnectionDevice:1\r\n\
            SERVER: Linux UPnP/1.1 MiniUPnPd/2.2\r\n\
            EXT:\r\n\
            \r\n";

        let response = SsdpResponse::parse(data).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.reason, "OK");
        assert_eq!(response.st(), "urn:schemas-upnp-org:device:WANConnectionDevice:1");
        assert_eq!(response.location(), "http://192.168.1.1:5000/rootDesc.xml");
        assert_eq!(response.server(), "Linux UPnP/1.1 MiniUPnPd/2.2");
        assert_eq!(response.header("ext"), "");
        assert_eq!(response.header("missing"), "");
    }

    #[test]
    fn non_http_datagrams_are_rejected() {
        assert!(SsdpResponse::parse(b"NOTIFY * HTTP/1.1\r\nNT: upnp:rootdevice\r\n\r\n").is_none());
        assert!(SsdpResponse::parse(b"M-SEARCH * HTTP/1.1\r\n\r\n").is_none());
        assert!(SsdpResponse::parse(b"HTTP/1.1 abc\r\n\r\n").is_none());
        assert!(SsdpResponse::parse(&[0xff, 0xfe, 0x00]).is_none());
    }

    #[test]
    fn first_header_occurrence_wins() {
        let response =
            SsdpResponse::parse(b"HTTP/1.1 200 OK\r\nST: first\r\nST: second\r\n\r\n").unwrap();
        assert_eq!(response.st(), "first");
    }

    #[tokio::test]
    async fn unicast_request_collects_responses_until_deadline() {
        let responder = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let dest = match responder.local_addr().unwrap() {
            SocketAddr::V4(addr) => addr,
            SocketAddr::V6(_) => unreachable!(),
        };

        let server = tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let (n, from) = responder.recv_from(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            responder.send_to(b"garbage", from).await.unwrap();
            responder
                .send_to(
                    b"HTTP/1.1 200 OK\r\nST: ssdp:all\r\nLOCATION: http://127.0.0.1/d.xml\r\n\r\n",
                    from,
                )
                .await
                .unwrap();
            request
        });

        let conn = SsdpConn::new(dest, ConnOptions::default()).unwrap();
        let request = SearchRequest::new("ssdp:all", 1).unwrap();
        let responses = conn
            .do_request(&request, Duration::from_millis(300))
            .await
            .unwrap();

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].location(), "http://127.0.0.1/d.xml");
        let sent = server.await.unwrap();
        assert!(sent.starts_with("M-SEARCH * HTTP/1.1\r\n"));
    }

    #[tokio::test]
    async fn read_packets_ends_cleanly_on_deadline() {
        let dest = SocketAddrV4::new(Ipv4Addr::LOCALHOST, 9);
        let conn = SsdpConn::new(dest, ConnOptions::default()).unwrap();
        let mut count = 0;
        conn.read_packets(Duration::from_millis(50), |_, _| {
            count += 1;
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(count, 0);
        assert_ne!(conn.local_addr().port(), 0);
    }
}
