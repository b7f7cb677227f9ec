//! Découverte concurrente des passerelles NAT.
//!
//! Trois stratégies tournent chacune dans leur tâche :
//!
//! 1. recherche `WANConnectionDevice:1`
//! 2. recherche `WANConnectionDevice:2`
//! 3. repli : recherche `ssdp:all`, pour les routeurs qui ne répondent pas
//!    aux recherches ciblées
//!
//! Les résultats des deux premières sont fusionnés dans leur ordre
//! d'arrivée. Le repli n'est consulté que si elles n'ont rien trouvé.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use super::Nat;
use super::upnp_nat::{NAT_TYPE_UPNP_IP1, NAT_TYPE_UPNP_IP2, NAT_TYPE_UPNP_PPP1, UpnpNat};
use crate::config_ext::NatConfig;
use crate::errors::NatError;
use crate::logger::{Logger, NoopLogger};
use crate::ssdp::{self, ConnOptions, SSDP_ALL};
use crate::upnp::{
    DescriptionError, PortMappingClient, RootDevice, URN_DEVICE_WAN_CONNECTION_DEVICE_1,
    URN_DEVICE_WAN_CONNECTION_DEVICE_2, URN_SERVICE_WAN_IP_CONNECTION_1,
    URN_SERVICE_WAN_IP_CONNECTION_2, URN_SERVICE_WAN_PPP_CONNECTION_1, WanIpConnection1,
    WanIpConnection2, WanPppConnection1, device_by_url, is_internet_gateway_device,
};

type Nats = Vec<Arc<dyn Nat>>;

/// Découverte des passerelles NAT du réseau local.
#[derive(Clone)]
pub struct Discover {
    logger: Arc<dyn Logger>,
    config: NatConfig,
}

impl Default for Discover {
    fn default() -> Self {
        Self::new(Arc::new(NoopLogger), NatConfig::default())
    }
}

impl Discover {
    pub fn new(logger: Arc<dyn Logger>, config: NatConfig) -> Self {
        Self { logger, config }
    }

    pub fn config(&self) -> &NatConfig {
        &self.config
    }

    /// Lance les trois stratégies et retourne les passerelles trouvées.
    ///
    /// Les échecs de stratégie sont journalisés et n'apportent aucun
    /// résultat. L'annulation du jeton termine la découverte avec ce qui a
    /// déjà été reçu.
    pub async fn discover_nats(&self, cancel: &CancellationToken) -> Result<Nats, NatError> {
        let (primary_tx, mut primary_rx) = mpsc::channel::<Nats>(2);
        let (fallback_tx, mut fallback_rx) = mpsc::channel::<Nats>(1);

        self.spawn_strategy("WANConnectionDevice:1", cancel, primary_tx.clone(), |d, c| {
            async move {
                d.search_with_type(&c, URN_DEVICE_WAN_CONNECTION_DEVICE_1)
                    .await
            }
        });
        self.spawn_strategy("WANConnectionDevice:2", cancel, primary_tx, |d, c| async move {
            d.search_with_type(&c, URN_DEVICE_WAN_CONNECTION_DEVICE_2)
                .await
        });
        self.spawn_strategy("ssdp:all", cancel, fallback_tx, |d, c| async move {
            d.search_other_gateways(&c).await
        });

        let mut nats = Nats::new();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("NAT discovery cancelled with {} results", nats.len());
                    return Ok(nats);
                }
                received = primary_rx.recv() => match received {
                    Some(found) => nats.extend(found),
                    None => break,
                },
            }
        }

        if nats.is_empty() {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(self.config.fallback_grace) => {
                    debug!("no fallback result within {:?}", self.config.fallback_grace);
                }
                received = fallback_rx.recv() => {
                    if let Some(found) = received {
                        nats.extend(found);
                    }
                }
            }
        }

        Ok(nats)
    }

    /// Récupère la description à `location` et construit une passerelle par
    /// service WAN reconnu.
    pub async fn nats_from_location(
        &self,
        cancel: &CancellationToken,
        location: &Url,
    ) -> Result<Nats, NatError> {
        let root = device_by_url(cancel, location, self.config.description_timeout).await?;
        let root = Arc::new(root);
        let mut nats = Nats::new();
        collect_nat_services(cancel, &root, &self.config, &mut nats);
        Ok(nats)
    }

    /// Exécute une stratégie dans une tâche supervisée.
    ///
    /// Le résultat n'est envoyé qu'en cas de succès ; une erreur ou une
    /// panique est journalisée. L'émetteur est libéré à la fin de la tâche.
    fn spawn_strategy<F, Fut>(
        &self,
        name: &'static str,
        cancel: &CancellationToken,
        tx: mpsc::Sender<Nats>,
        strategy: F,
    ) where
        F: FnOnce(Discover, CancellationToken) -> Fut,
        Fut: Future<Output = Result<Nats, NatError>> + Send + 'static,
    {
        let logger = self.logger.clone();
        let task = tokio::spawn(strategy(self.clone(), cancel.clone()));

        tokio::spawn(async move {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => Err(NatError::TaskFailed(name, e.to_string())),
            };

            match result {
                Ok(nats) => {
                    debug!("discovery {} found {} NAT", name, nats.len());
                    // Le récepteur peut être parti après annulation
                    let _ = tx.send(nats).await;
                }
                Err(e) if e.is_cancelled() => {
                    debug!("discovery {} cancelled", name);
                }
                Err(e) => {
                    logger.errorf(format_args!("async discover {} error {}", name, e));
                }
            }
        });
    }

    fn search_options(&self) -> ConnOptions {
        ConnOptions {
            ttl: Some(self.config.multicast_ttl),
            ..ConnOptions::default()
        }
    }

    async fn search_with_type(
        &self,
        cancel: &CancellationToken,
        search_type: &str,
    ) -> Result<Nats, NatError> {
        let services = ssdp::search_with_options(
            cancel,
            search_type,
            self.config.search_wait_secs(),
            self.search_options(),
        )
        .await?;

        let mut nats = Nats::new();
        for service in &services {
            self.visit_location(cancel, &service.location, &mut nats)
                .await?;
        }
        Ok(nats)
    }

    async fn search_other_gateways(&self, cancel: &CancellationToken) -> Result<Nats, NatError> {
        let services = ssdp::search_with_options(
            cancel,
            SSDP_ALL,
            self.config.search_wait_secs(),
            self.search_options(),
        )
        .await?;

        let mut locations = HashSet::new();
        let mut nats = Nats::new();
        for service in &services {
            self.logger.infof(format_args!(
                "found device location={} st={}",
                service.location, service.st
            ));
            if is_internet_gateway_device(&service.st) {
                continue;
            }
            if !locations.insert(service.location.as_str()) {
                continue;
            }
            self.visit_location(cancel, &service.location, &mut nats)
                .await?;
        }
        Ok(nats)
    }

    /// Ajoute les passerelles d'une description ; une description
    /// illisible est ignorée, seule l'annulation interrompt la stratégie.
    async fn visit_location(
        &self,
        cancel: &CancellationToken,
        location: &Url,
        nats: &mut Nats,
    ) -> Result<(), NatError> {
        match self.nats_from_location(cancel, location).await {
            Ok(found) => nats.extend(found),
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                self.logger
                    .warnf(format_args!("skip device {}: {}", location, e));
            }
        }
        Ok(())
    }
}

/// Découverte avec la configuration par défaut et sans logger.
pub async fn discover_nats(cancel: &CancellationToken) -> Result<Nats, NatError> {
    Discover::default().discover_nats(cancel).await
}

/// Construit une passerelle pour chaque service WAN de l'arbre.
///
/// Le jeton est vérifié avant chaque service. Un service
/// `WANIPConnection:2` déclaré par un `WANConnectionDevice:1`, ou sous un
/// device racine de ce type, est ignoré.
pub fn collect_nat_services(
    cancel: &CancellationToken,
    root: &Arc<RootDevice>,
    config: &NatConfig,
    out: &mut Nats,
) {
    let root_is_v1 = root.device.device_type == URN_DEVICE_WAN_CONNECTION_DEVICE_1;

    root.visit_device_services(|device, service| {
        if cancel.is_cancelled() {
            return;
        }

        let timeout = config.soap_timeout;
        let client: Result<(Arc<dyn PortMappingClient>, &'static str), DescriptionError> =
            match service.service_type.as_str() {
                URN_SERVICE_WAN_IP_CONNECTION_1 => WanIpConnection1::from_service(service, timeout)
                    .map(|c| (Arc::new(c) as Arc<dyn PortMappingClient>, NAT_TYPE_UPNP_IP1)),
                URN_SERVICE_WAN_IP_CONNECTION_2 => {
                    if root_is_v1 || device.device_type == URN_DEVICE_WAN_CONNECTION_DEVICE_1 {
                        debug!("ignoring {} on a V1 device {}", service, device.friendly_name);
                        return;
                    }
                    WanIpConnection2::from_service(service, timeout)
                        .map(|c| (Arc::new(c) as Arc<dyn PortMappingClient>, NAT_TYPE_UPNP_IP2))
                }
                URN_SERVICE_WAN_PPP_CONNECTION_1 => {
                    WanPppConnection1::from_service(service, timeout)
                        .map(|c| (Arc::new(c) as Arc<dyn PortMappingClient>, NAT_TYPE_UPNP_PPP1))
                }
                _ => return,
            };

        match client {
            Ok((client, nat_type)) => {
                out.push(Arc::new(UpnpNat::new(client, nat_type, root.clone(), config)));
            }
            Err(e) => warn!("ignoring {} on {}: {}", service, root.url_base, e),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::tests::RecordingLogger;
    use std::time::{Duration, Instant};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn description(root_type: &str, connection_type: &str, service_type: &str) -> String {
        format!(
            r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <specVersion><major>1</major><minor>0</minor></specVersion>
  <device>
    <deviceType>{root_type}</deviceType>
    <friendlyName>Test Router</friendlyName>
    <deviceList>
      <device>
        <deviceType>urn:schemas-upnp-org:device:WANDevice:1</deviceType>
        <friendlyName>WAN</friendlyName>
        <deviceList>
          <device>
            <deviceType>{connection_type}</deviceType>
            <friendlyName>WAN Connection</friendlyName>
            <serviceList>
              <service>
                <serviceType>{service_type}</serviceType>
                <serviceId>urn:upnp-org:serviceId:WANConn1</serviceId>
                <SCPDURL>/scpd.xml</SCPDURL>
                <controlURL>/ctl/conn</controlURL>
                <eventSubURL>/evt/conn</eventSubURL>
              </service>
            </serviceList>
          </device>
        </deviceList>
      </device>
    </deviceList>
  </device>
</root>"#
        )
    }

    fn root(xml: &str) -> Arc<RootDevice> {
        let location = Url::parse("http://192.168.1.1:5000/rootDesc.xml").unwrap();
        Arc::new(RootDevice::from_xml(xml.as_bytes(), &location).unwrap())
    }

    const IGD_1: &str = "urn:schemas-upnp-org:device:InternetGatewayDevice:1";

    #[test]
    fn test_collect_ip1_and_ppp1() {
        let cancel = CancellationToken::new();
        let mut nats = Nats::new();

        let ip1 = root(&description(
            IGD_1,
            URN_DEVICE_WAN_CONNECTION_DEVICE_1,
            URN_SERVICE_WAN_IP_CONNECTION_1,
        ));
        collect_nat_services(&cancel, &ip1, &NatConfig::default(), &mut nats);

        let ppp1 = root(&description(
            IGD_1,
            URN_DEVICE_WAN_CONNECTION_DEVICE_1,
            URN_SERVICE_WAN_PPP_CONNECTION_1,
        ));
        collect_nat_services(&cancel, &ppp1, &NatConfig::default(), &mut nats);

        let types: Vec<&str> = nats.iter().map(|n| n.nat_type()).collect();
        assert_eq!(types, vec!["UPNP(IP1)", "UPNP(PPP1)"]);
        assert_eq!(nats[0].device_name(), "Test Router");
        assert_eq!(nats[0].location().as_str(), "http://192.168.1.1:5000/rootDesc.xml");
    }

    #[test]
    fn test_v2_service_on_v1_device_is_rejected() {
        let cancel = CancellationToken::new();
        let config = NatConfig::default();

        let mut nats = Nats::new();
        let on_v1 = root(&description(
            IGD_1,
            URN_DEVICE_WAN_CONNECTION_DEVICE_1,
            URN_SERVICE_WAN_IP_CONNECTION_2,
        ));
        collect_nat_services(&cancel, &on_v1, &config, &mut nats);
        assert!(nats.is_empty());

        let root_v1 = root(&description(
            URN_DEVICE_WAN_CONNECTION_DEVICE_1,
            URN_DEVICE_WAN_CONNECTION_DEVICE_2,
            URN_SERVICE_WAN_IP_CONNECTION_2,
        ));
        collect_nat_services(&cancel, &root_v1, &config, &mut nats);
        assert!(nats.is_empty());

        let on_v2 = root(&description(
            IGD_1,
            URN_DEVICE_WAN_CONNECTION_DEVICE_2,
            URN_SERVICE_WAN_IP_CONNECTION_2,
        ));
        collect_nat_services(&cancel, &on_v2, &config, &mut nats);
        assert_eq!(nats.len(), 1);
        assert_eq!(nats[0].nat_type(), "UPNP(IP2)");
    }

    #[test]
    fn test_cancelled_token_collects_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut nats = Nats::new();
        let ip1 = root(&description(
            IGD_1,
            URN_DEVICE_WAN_CONNECTION_DEVICE_1,
            URN_SERVICE_WAN_IP_CONNECTION_1,
        ));
        collect_nat_services(&cancel, &ip1, &NatConfig::default(), &mut nats);
        assert!(nats.is_empty());
    }

    #[test]
    fn test_unresolved_control_url_is_skipped() {
        let cancel = CancellationToken::new();
        let xml = description(
            IGD_1,
            URN_DEVICE_WAN_CONNECTION_DEVICE_1,
            URN_SERVICE_WAN_IP_CONNECTION_1,
        )
        .replace("<controlURL>/ctl/conn</controlURL>", "<controlURL></controlURL>");
        let mut nats = Nats::new();
        collect_nat_services(&cancel, &root(&xml), &NatConfig::default(), &mut nats);
        assert!(nats.is_empty());
    }

    #[tokio::test]
    async fn test_nats_from_location() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rootDesc.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(description(
                IGD_1,
                URN_DEVICE_WAN_CONNECTION_DEVICE_1,
                URN_SERVICE_WAN_IP_CONNECTION_1,
            )))
            .mount(&server)
            .await;

        let location = Url::parse(&format!("{}/rootDesc.xml", server.uri())).unwrap();
        let nats = Discover::default()
            .nats_from_location(&CancellationToken::new(), &location)
            .await
            .unwrap();

        assert_eq!(nats.len(), 1);
        assert_eq!(nats[0].location(), &location);
    }

    #[tokio::test]
    async fn test_unreadable_description_is_logged_and_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let logger = Arc::new(RecordingLogger::default());
        let discover = Discover::new(logger.clone(), NatConfig::default());
        let location = Url::parse(&format!("{}/rootDesc.xml", server.uri())).unwrap();

        let mut nats = Nats::new();
        discover
            .visit_location(&CancellationToken::new(), &location, &mut nats)
            .await
            .unwrap();

        assert!(nats.is_empty());
        let lines = logger.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("WARN skip device"));
        assert!(lines[0].contains("404"));
    }

    #[tokio::test]
    async fn test_panicking_strategy_is_logged_and_contributes_nothing() {
        let logger = Arc::new(RecordingLogger::default());
        let discover = Discover::new(logger.clone(), NatConfig::default());
        let (tx, mut rx) = mpsc::channel::<Nats>(1);

        discover.spawn_strategy("panicking", &CancellationToken::new(), tx, |_, _| async move {
            if true {
                panic!("boom");
            }
            Ok::<Nats, NatError>(Nats::new())
        });

        // Le seul émetteur disparaît avec la tâche de supervision
        assert!(rx.recv().await.is_none());

        let lines = logger.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("ERROR async discover panicking error"));
        assert!(lines[0].contains("discovery task panicking failed"));
    }

    #[tokio::test]
    async fn test_healthy_strategy_sends_its_result() {
        let logger = Arc::new(RecordingLogger::default());
        let discover = Discover::new(logger.clone(), NatConfig::default());
        let (tx, mut rx) = mpsc::channel::<Nats>(1);

        discover.spawn_strategy("healthy", &CancellationToken::new(), tx, |_, _| async move {
            Ok::<Nats, NatError>(Nats::new())
        });

        assert!(rx.recv().await.is_some_and(|nats| nats.is_empty()));
        assert!(rx.recv().await.is_none());
        assert!(logger.lines().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_discovery_returns_promptly() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let started = Instant::now();
        let nats = Discover::default().discover_nats(&cancel).await.unwrap();
        assert!(nats.is_empty());
        assert!(started.elapsed() < Duration::from_millis(500));
    }
}
