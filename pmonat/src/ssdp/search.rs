//! Recherche SSDP : requête `M-SEARCH`, filtrage et dédoublonnage.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use url::Url;

use super::{
    ConnOptions, SSDP_ALL, SSDP_DISCOVER, SSDP_MULTICAST_ADDR, SSDP_PORT, SsdpConn, SsdpError,
    SsdpResponse, UPNP_ROOT_DEVICE, ssdp_multicast_addr,
};

/// Service annoncé par une réponse de recherche.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub st: String,
    pub usn: String,
    pub server: String,
    pub location: Url,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ST: {}, USN: {}, SERVER: {}, LOCATION: {}",
            self.st, self.usn, self.server, self.location
        )
    }
}

/// Requête `M-SEARCH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    search_type: String,
    mx: u32,
}

impl SearchRequest {
    /// `mx` est la fenêtre de réponse annoncée, en secondes, au moins 1.
    pub fn new(search_type: impl Into<String>, mx: u32) -> Result<Self, SsdpError> {
        if mx < 1 {
            return Err(SsdpError::InvalidWait(mx));
        }
        Ok(Self {
            search_type: search_type.into(),
            mx,
        })
    }

    pub fn search_type(&self) -> &str {
        &self.search_type
    }

    pub fn mx(&self) -> u32 {
        self.mx
    }

    /// Octets exacts du datagramme envoyé.
    pub fn to_bytes(&self) -> Vec<u8> {
        format!(
            "M-SEARCH * HTTP/1.1\r\n\
             HOST: {}:{}\r\n\
             MAN: {}\r\n\
             MX: {}\r\n\
             ST: {}\r\n\
             \r\n",
            SSDP_MULTICAST_ADDR, SSDP_PORT, SSDP_DISCOVER, self.mx, self.search_type
        )
        .into_bytes()
    }
}

/// Recherche avec une fenêtre d'une seconde.
pub async fn search(
    cancel: &CancellationToken,
    search_type: &str,
) -> Result<Vec<Service>, SsdpError> {
    search_with_timeout(cancel, search_type, 1).await
}

/// Recherche avec une fenêtre de `max_wait_seconds` secondes (au moins 1).
pub async fn search_with_timeout(
    cancel: &CancellationToken,
    search_type: &str,
    max_wait_seconds: u32,
) -> Result<Vec<Service>, SsdpError> {
    search_with_options(cancel, search_type, max_wait_seconds, ConnOptions::default()).await
}

/// Recherche complète avec les options de socket données.
///
/// Le socket n'est pas ouvert si le jeton est déjà annulé ; une annulation
/// pendant la fenêtre de lecture abandonne la recherche.
pub async fn search_with_options(
    cancel: &CancellationToken,
    search_type: &str,
    max_wait_seconds: u32,
    options: ConnOptions,
) -> Result<Vec<Service>, SsdpError> {
    let request = SearchRequest::new(search_type, max_wait_seconds)?;
    if cancel.is_cancelled() {
        return Err(SsdpError::Cancelled);
    }

    let conn = SsdpConn::new(ssdp_multicast_addr(), options)?;
    let window = Duration::from_secs(u64::from(max_wait_seconds));
    let responses = tokio::select! {
        _ = cancel.cancelled() => return Err(SsdpError::Cancelled),
        responses = conn.do_request(&request, window) => responses?,
    };

    let services = process_responses(search_type, &responses);
    debug!(
        "SSDP search {} : {} responses, {} services",
        search_type,
        responses.len(),
        services.len()
    );
    Ok(services)
}

/// Filtre et dédoublonne les réponses d'une recherche.
///
/// Seules les réponses `200` sont gardées ; pour une cible concrète, l'en-tête
/// `ST` doit lui être égal. Les réponses sans `LOCATION` exploitable sont
/// écartées. La clé de dédoublonnage est `(LOCATION, USN)`, la première
/// réponse l'emporte et l'ordre d'arrivée est conservé.
pub fn process_responses(search_type: &str, responses: &[SsdpResponse]) -> Vec<Service> {
    let is_exact_search = search_type != SSDP_ALL && search_type != UPNP_ROOT_DEVICE;
    let mut seen = HashSet::new();
    let mut services = Vec::new();

    for response in responses {
        if response.status != 200 {
            continue;
        }
        if is_exact_search && response.st() != search_type {
            continue;
        }
        let location = match Url::parse(response.location()) {
            Ok(location) => location,
            Err(e) => {
                trace!("SSDP response with bad LOCATION {:?}: {}", response.location(), e);
                continue;
            }
        };

        let id = format!("{}\0{}", location, response.usn());
        if seen.insert(id) {
            services.push(Service {
                st: response.st().to_string(),
                usn: response.usn().to_string(),
                server: response.server().to_string(),
                location,
            });
        }
    }
    services
}
