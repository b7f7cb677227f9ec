//! Description des devices UPnP : arbre `root` / `device` / `service`.
//!
//! La description est récupérée par HTTP puis analysée avec `xmltree` en ne
//! considérant que les noms locaux des éléments. Toutes les URL de l'arbre
//! sont résolues contre l'URL de base (`URLBase` ou, à défaut, l'adresse de
//! la description).

use std::fmt;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;
use xmltree::{Element, XMLNode};

use super::scpd::Scpd;
use super::DescriptionError;
use crate::soap::{SoapClient, child_element, element_text};

/// Namespace par défaut des descriptions de device
pub const DEVICE_XML_NAMESPACE: &str = "urn:schemas-upnp-org:device-1-0";

/// URL lue dans une description, résolue ou non.
///
/// `url()` vaut `None` tant que la référence n'a pas été résolue contre une
/// base, ou si elle est vide ou invalide. Elle ne doit pas être utilisée
/// dans cet état.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlField {
    raw: String,
    url: Option<Url>,
}

impl UrlField {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            url: None,
        }
    }

    /// Référence telle qu'écrite dans la description.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.url.is_some()
    }

    /// URL résolue, ou erreur nommant le champ.
    pub fn resolved(&self, field: &'static str) -> Result<&Url, DescriptionError> {
        self.url
            .as_ref()
            .ok_or(DescriptionError::UnresolvedUrl(field))
    }

    /// Résout la référence contre `base`.
    ///
    /// Une référence sans `://` et sans `/` initial est préfixée par `/`
    /// avant résolution. Une référence vide reste non résolue.
    pub fn set_url_base(&mut self, base: &Url) {
        let reference = self.raw.trim();
        if reference.is_empty() {
            self.url = None;
            return;
        }

        let resolved = if !reference.contains("://") && !reference.starts_with('/') {
            base.join(&format!("/{reference}"))
        } else {
            base.join(reference)
        };
        self.url = resolved.ok();
    }
}

/// Version de la spécification annoncée par la description
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpecVersion {
    pub major: i32,
    pub minor: i32,
}

/// Icône d'un device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Icon {
    pub mimetype: String,
    pub width: i32,
    pub height: i32,
    pub depth: i32,
    pub url: UrlField,
}

/// Service déclaré par un device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Service {
    pub service_type: String,
    pub service_id: String,
    pub scpd_url: UrlField,
    pub control_url: UrlField,
    pub event_sub_url: UrlField,
}

impl Service {
    fn set_url_base(&mut self, base: &Url) {
        self.scpd_url.set_url_base(base);
        self.control_url.set_url_base(base);
        self.event_sub_url.set_url_base(base);
    }

    /// Client SOAP lié à l'URL de contrôle du service.
    pub fn soap_client(&self, timeout: Duration) -> Result<SoapClient, DescriptionError> {
        let control_url = self.control_url.resolved("control")?;
        Ok(SoapClient::new(control_url.clone(), timeout)?)
    }

    /// Récupère et analyse le SCPD (actions et variables d'état) du service.
    pub async fn request_scpd(
        &self,
        cancel: &CancellationToken,
        timeout: Duration,
    ) -> Result<Scpd, DescriptionError> {
        let scpd_url = self.scpd_url.resolved("SCPD")?;
        let body = request_xml(cancel, scpd_url, timeout).await?;
        Scpd::from_xml(&body)
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service ID {} : {}", self.service_id, self.service_type)
    }
}

/// Device UPnP, éventuellement parent d'autres devices
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Device {
    pub device_type: String,
    pub friendly_name: String,
    pub manufacturer: String,
    pub manufacturer_url: UrlField,
    pub model_description: String,
    pub model_name: String,
    pub model_number: String,
    pub model_type: String,
    pub model_url: UrlField,
    pub serial_number: String,
    pub udn: String,
    pub upc: String,
    pub icons: Vec<Icon>,
    pub services: Vec<Service>,
    pub devices: Vec<Device>,
    pub presentation_url: UrlField,
}

impl Device {
    /// Visite le device puis ses descendants, en profondeur d'abord.
    pub fn visit_devices<'a, F>(&'a self, visitor: &mut F)
    where
        F: FnMut(&'a Device),
    {
        visitor(self);
        for child in &self.devices {
            child.visit_devices(visitor);
        }
    }

    /// Visite tous les services, device par device puis dans l'ordre de
    /// déclaration.
    pub fn visit_services<'a, F>(&'a self, mut visitor: F)
    where
        F: FnMut(&'a Service),
    {
        self.visit_device_services(|_, service| visitor(service));
    }

    /// Comme [`Device::visit_services`], avec le device qui déclare le service.
    pub fn visit_device_services<'a, F>(&'a self, mut visitor: F)
    where
        F: FnMut(&'a Device, &'a Service),
    {
        self.visit_devices(&mut |device: &'a Device| {
            for service in &device.services {
                visitor(device, service);
            }
        });
    }

    /// Tous les services de ce type dans le sous-arbre.
    pub fn find_service(&self, service_type: &str) -> Vec<&Service> {
        let mut services = Vec::new();
        self.visit_services(|service| {
            if service.service_type == service_type {
                services.push(service);
            }
        });
        services
    }

    fn set_url_base(&mut self, base: &Url) {
        self.manufacturer_url.set_url_base(base);
        self.model_url.set_url_base(base);
        self.presentation_url.set_url_base(base);
        for icon in &mut self.icons {
            icon.url.set_url_base(base);
        }
        for service in &mut self.services {
            service.set_url_base(base);
        }
        for device in &mut self.devices {
            device.set_url_base(base);
        }
    }

    fn from_element(elem: &Element) -> Result<Self, DescriptionError> {
        let icons = list_items(elem, "iconList", "icon")
            .map(|icon| -> Result<Icon, DescriptionError> {
                Ok(Icon {
                    mimetype: element_text(icon, "mimetype"),
                    width: int_field(icon, "width")?,
                    height: int_field(icon, "height")?,
                    depth: int_field(icon, "depth")?,
                    url: url_field(icon, "url"),
                })
            })
            .collect::<Result<Vec<_>, DescriptionError>>()?;

        let services = list_items(elem, "serviceList", "service")
            .map(|service| Service {
                service_type: element_text(service, "serviceType"),
                service_id: element_text(service, "serviceId"),
                scpd_url: url_field(service, "SCPDURL"),
                control_url: url_field(service, "controlURL"),
                event_sub_url: url_field(service, "eventSubURL"),
            })
            .collect();

        let devices = list_items(elem, "deviceList", "device")
            .map(Device::from_element)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            device_type: element_text(elem, "deviceType"),
            friendly_name: element_text(elem, "friendlyName"),
            manufacturer: element_text(elem, "manufacturer"),
            manufacturer_url: url_field(elem, "manufacturerURL"),
            model_description: element_text(elem, "modelDescription"),
            model_name: element_text(elem, "modelName"),
            model_number: element_text(elem, "modelNumber"),
            model_type: element_text(elem, "modelType"),
            model_url: url_field(elem, "modelURL"),
            serial_number: element_text(elem, "serialNumber"),
            udn: element_text(elem, "UDN"),
            upc: element_text(elem, "UPC"),
            icons,
            services,
            devices,
            presentation_url: url_field(elem, "presentationURL"),
        })
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Device ID {} : {} ({})",
            self.udn, self.device_type, self.friendly_name
        )
    }
}

/// Description complète d'un root device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDevice {
    pub spec_version: SpecVersion,
    /// Base de résolution de toutes les URL de l'arbre.
    pub url_base: Url,
    /// Base effective sous forme de texte.
    pub url_base_raw: String,
    pub device: Device,
}

impl RootDevice {
    /// Analyse une description et résout ses URL.
    ///
    /// La base est l'élément `URLBase` s'il est présent, sinon `location`.
    pub fn from_xml(xml: &[u8], location: &Url) -> Result<Self, DescriptionError> {
        let root = Element::parse(xml)?;
        if root.name != "root" {
            return Err(DescriptionError::UnexpectedRoot {
                expected: "root",
                found: root.name,
            });
        }

        let spec_version = match child_element(&root, "specVersion") {
            Some(spec) => SpecVersion {
                major: int_field(spec, "major")?,
                minor: int_field(spec, "minor")?,
            },
            None => SpecVersion::default(),
        };

        let device = child_element(&root, "device")
            .ok_or(DescriptionError::MissingField("device"))
            .and_then(Device::from_element)?;

        let url_base_raw = element_text(&root, "URLBase");
        let url_base = if url_base_raw.is_empty() {
            location.clone()
        } else {
            Url::parse(&url_base_raw)
                .map_err(|e| DescriptionError::Url(url_base_raw.clone(), e))?
        };

        let mut root_device = Self {
            spec_version,
            url_base: url_base.clone(),
            url_base_raw,
            device,
        };
        root_device.set_url_base(&url_base);
        Ok(root_device)
    }

    /// Change la base et résout à nouveau toutes les URL de l'arbre.
    pub fn set_url_base(&mut self, base: &Url) {
        self.url_base = base.clone();
        self.url_base_raw = base.to_string();
        self.device.set_url_base(base);
    }

    pub fn visit_devices<'a, F>(&'a self, mut visitor: F)
    where
        F: FnMut(&'a Device),
    {
        self.device.visit_devices(&mut visitor);
    }

    pub fn visit_services<'a, F>(&'a self, visitor: F)
    where
        F: FnMut(&'a Service),
    {
        self.device.visit_services(visitor);
    }

    pub fn visit_device_services<'a, F>(&'a self, visitor: F)
    where
        F: FnMut(&'a Device, &'a Service),
    {
        self.device.visit_device_services(visitor);
    }

    pub fn find_service(&self, service_type: &str) -> Vec<&Service> {
        self.device.find_service(service_type)
    }
}

/// Récupère et analyse la description d'un root device.
///
/// Une réponse autre que 200, un XML invalide ou l'annulation du jeton
/// échouent sans arbre partiel.
pub async fn device_by_url(
    cancel: &CancellationToken,
    location: &Url,
    timeout: Duration,
) -> Result<RootDevice, DescriptionError> {
    let body = request_xml(cancel, location, timeout).await?;
    let root = RootDevice::from_xml(&body, location)?;
    debug!("UPnP description {} : {}", location, root.device);
    Ok(root)
}

pub(crate) async fn request_xml(
    cancel: &CancellationToken,
    url: &Url,
    timeout: Duration,
) -> Result<Vec<u8>, DescriptionError> {
    let client = crate::http::build_client(timeout)?;
    let fetch = async {
        let response = client.get(url.clone()).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(DescriptionError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok::<_, DescriptionError>(response.bytes().await?.to_vec())
    };

    tokio::select! {
        _ = cancel.cancelled() => Err(DescriptionError::Cancelled),
        body = fetch => body,
    }
}

pub(crate) fn list_items<'a>(
    elem: &'a Element,
    list: &'a str,
    item: &'a str,
) -> impl Iterator<Item = &'a Element> + 'a {
    child_element(elem, list)
        .into_iter()
        .flat_map(|list| list.children.iter().filter_map(XMLNode::as_element))
        .filter(move |child| child.name == item)
}

fn url_field(elem: &Element, name: &str) -> UrlField {
    UrlField::new(element_text(elem, name))
}

pub(crate) fn int_field(elem: &Element, name: &'static str) -> Result<i32, DescriptionError> {
    let text = element_text(elem, name);
    if text.is_empty() {
        return Ok(0);
    }
    text.parse().map_err(|_| DescriptionError::InvalidValue {
        field: name,
        value: text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTION: &str = r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <specVersion><major>1</major><minor>0</minor></specVersion>
  <device>
    <deviceType>urn:schemas-upnp-org:device:InternetGatewayDevice:1</deviceType>
    <friendlyName>Test Router</friendlyName>
    <UDN>uuid:igd</UDN>
    <iconList>
      <icon><mimetype>image/png</mimetype><width>48</width><height>48</height><depth>24</depth><url>icon.png</url></icon>
    </iconList>
    <serviceList>
      <service>
        <serviceType>urn:schemas-upnp-org:service:Layer3Forwarding:1</serviceType>
        <serviceId>urn:upnp-org:serviceId:L3Forwarding1</serviceId>
        <SCPDURL>/L3F.xml</SCPDURL>
        <controlURL>/ctl/L3F</controlURL>
        <eventSubURL></eventSubURL>
      </service>
    </serviceList>
    <deviceList>
      <device>
        <deviceType>urn:schemas-upnp-org:device:WANDevice:1</deviceType>
        <UDN>uuid:wan</UDN>
        <deviceList>
          <device>
            <deviceType>urn:schemas-upnp-org:device:WANConnectionDevice:1</deviceType>
            <UDN>uuid:wanconn</UDN>
            <serviceList>
              <service>
                <serviceType>urn:schemas-upnp-org:service:WANIPConnection:1</serviceType>
                <serviceId>urn:upnp-org:serviceId:WANIPConn1</serviceId>
                <SCPDURL>WANIPCn.xml</SCPDURL>
                <controlURL>ctl/IPConn</controlURL>
                <eventSubURL>http://10.0.0.1:9000/evt/IPConn</eventSubURL>
              </service>
            </serviceList>
          </device>
        </deviceList>
      </device>
      <device>
        <deviceType>urn:schemas-upnp-org:device:LANDevice:1</deviceType>
        <UDN>uuid:lan</UDN>
      </device>
    </deviceList>
    <presentationURL>http://192.168.1.1/</presentationURL>
  </device>
</root>"#;

    fn location() -> Url {
        Url::parse("http://192.168.1.1:5000/rootDesc.xml").unwrap()
    }

    #[test]
    fn devices_are_visited_in_pre_order() {
        let root = RootDevice::from_xml(DESCRIPTION.as_bytes(), &location()).unwrap();
        let mut udns = Vec::new();
        root.visit_devices(|device| udns.push(device.udn.as_str()));
        assert_eq!(udns, vec!["uuid:igd", "uuid:wan", "uuid:wanconn", "uuid:lan"]);
    }

    #[test]
    fn services_are_the_union_in_device_order() {
        let root = RootDevice::from_xml(DESCRIPTION.as_bytes(), &location()).unwrap();
        let mut types = Vec::new();
        root.visit_services(|service| types.push(service.service_type.as_str()));
        assert_eq!(
            types,
            vec![
                "urn:schemas-upnp-org:service:Layer3Forwarding:1",
                "urn:schemas-upnp-org:service:WANIPConnection:1"
            ]
        );

        let mut owners = Vec::new();
        root.visit_device_services(|device, _| owners.push(device.udn.as_str()));
        assert_eq!(owners, vec!["uuid:igd", "uuid:wanconn"]);

        let found = root.find_service("urn:schemas-upnp-org:service:WANIPConnection:1");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].service_id, "urn:upnp-org:serviceId:WANIPConn1");
    }

    #[test]
    fn urls_resolve_against_location() {
        let root = RootDevice::from_xml(DESCRIPTION.as_bytes(), &location()).unwrap();
        assert_eq!(root.url_base, location());
        assert_eq!(root.url_base_raw, "http://192.168.1.1:5000/rootDesc.xml");

        let l3f = &root.device.services[0];
        assert_eq!(
            l3f.control_url.url().map(Url::as_str),
            Some("http://192.168.1.1:5000/ctl/L3F")
        );
        // Référence vide : jamais résolue
        assert!(!l3f.event_sub_url.is_ok());
        assert!(matches!(
            l3f.event_sub_url.resolved("eventSub"),
            Err(DescriptionError::UnresolvedUrl("eventSub"))
        ));

        let ip = root.find_service("urn:schemas-upnp-org:service:WANIPConnection:1")[0];
        // Référence relative sans '/' : préfixée puis résolue depuis la racine
        assert_eq!(
            ip.control_url.url().map(Url::as_str),
            Some("http://192.168.1.1:5000/ctl/IPConn")
        );
        assert_eq!(
            ip.event_sub_url.url().map(Url::as_str),
            Some("http://10.0.0.1:9000/evt/IPConn")
        );

        let icon = &root.device.icons[0];
        assert_eq!((icon.width, icon.height, icon.depth), (48, 48, 24));
        assert_eq!(
            icon.url.url().map(Url::as_str),
            Some("http://192.168.1.1:5000/icon.png")
        );
        assert_eq!(root.spec_version, SpecVersion { major: 1, minor: 0 });
    }

    #[test]
    fn explicit_url_base_wins_and_can_be_reset() {
        let xml = DESCRIPTION.replace(
            "<specVersion>",
            "<URLBase>http://10.1.1.1:80/base/</URLBase><specVersion>",
        );
        let mut root = RootDevice::from_xml(xml.as_bytes(), &location()).unwrap();
        assert_eq!(root.url_base.as_str(), "http://10.1.1.1/base/");
        assert_eq!(
            root.device.services[0].control_url.url().map(Url::as_str),
            Some("http://10.1.1.1/ctl/L3F")
        );

        let other = Url::parse("http://172.16.0.1:1900/").unwrap();
        root.set_url_base(&other);
        assert_eq!(root.url_base_raw, "http://172.16.0.1:1900/");
        assert_eq!(
            root.device.services[0].control_url.url().map(Url::as_str),
            Some("http://172.16.0.1:1900/ctl/L3F")
        );
    }

    #[test]
    fn bad_documents_are_rejected() {
        assert!(matches!(
            RootDevice::from_xml(b"<scpd/>", &location()),
            Err(DescriptionError::UnexpectedRoot { found, .. }) if found == "scpd"
        ));
        assert!(matches!(
            RootDevice::from_xml(b"<root></root>", &location()),
            Err(DescriptionError::MissingField("device"))
        ));
        assert!(matches!(
            RootDevice::from_xml(b"<root><device>", &location()),
            Err(DescriptionError::Xml(_))
        ));
        let xml = DESCRIPTION.replace("<width>48</width>", "<width>wide</width>");
        assert!(matches!(
            RootDevice::from_xml(xml.as_bytes(), &location()),
            Err(DescriptionError::InvalidValue { field: "width", .. })
        ));
    }

    #[test]
    fn unresolved_control_url_cannot_build_a_client() {
        let service = Service::default();
        assert!(matches!(
            service.soap_client(Duration::from_secs(1)),
            Err(DescriptionError::UnresolvedUrl("control"))
        ));
    }
}
