//! # Module UPnP - Description des devices et clients WAN
//!
//! Ce module couvre la partie "contrôle" d'une passerelle Internet Gateway
//! Device : lecture de la description XML (arbre de devices et services),
//! des SCPD, et clients typés des services de connexion WAN.
//!
//! ## Clients WAN
//!
//! - [`WanIpConnection1`] : `urn:schemas-upnp-org:service:WANIPConnection:1`
//! - [`WanIpConnection2`] : `urn:schemas-upnp-org:service:WANIPConnection:2`
//! - [`WanPppConnection1`] : `urn:schemas-upnp-org:service:WANPPPConnection:1`
//!
//! Les trois partagent un [`WanConnection`] pour les actions communes et
//! implémentent [`PortMappingClient`], utilisé par la couche NAT.

mod action_params;
mod device;
mod scpd;
mod wan_connection;
mod wan_ip_connection1;
mod wan_ip_connection2;
mod wan_ppp_connection1;

use thiserror::Error;

use crate::soap::SoapError;

pub use action_params::*;
pub use device::{
    DEVICE_XML_NAMESPACE, Device, Icon, RootDevice, Service, SpecVersion, UrlField, device_by_url,
};
pub use scpd::{Direction, SCPD_XML_NAMESPACE, Scpd, ScpdAction, ScpdArgument, StateVariable};
pub use wan_connection::{IpConnectionActions, PortMappingClient, WanConnection};
pub use wan_ip_connection1::WanIpConnection1;
pub use wan_ip_connection2::WanIpConnection2;
pub use wan_ppp_connection1::WanPppConnection1;

// Devices
pub const URN_DEVICE_INTERNET_GATEWAY_DEVICE: &str =
    "urn:schemas-upnp-org:device:InternetGatewayDevice";
pub const URN_DEVICE_LAN_DEVICE_1: &str = "urn:schemas-upnp-org:device:LANDevice:1";
pub const URN_DEVICE_WAN_CONNECTION_DEVICE_1: &str =
    "urn:schemas-upnp-org:device:WANConnectionDevice:1";
pub const URN_DEVICE_WAN_CONNECTION_DEVICE_2: &str =
    "urn:schemas-upnp-org:device:WANConnectionDevice:2";
pub const URN_DEVICE_WAN_DEVICE_1: &str = "urn:schemas-upnp-org:device:WANDevice:1";
pub const URN_DEVICE_WAN_DEVICE_2: &str = "urn:schemas-upnp-org:device:WANDevice:2";

// Services
pub const URN_SERVICE_DEVICE_PROTECTION_1: &str =
    "urn:schemas-upnp-org:service:DeviceProtection:1";
pub const URN_SERVICE_LAN_HOST_CONFIG_MANAGEMENT_1: &str =
    "urn:schemas-upnp-org:service:LANHostConfigManagement:1";
pub const URN_SERVICE_LAYER3_FORWARDING_1: &str =
    "urn:schemas-upnp-org:service:Layer3Forwarding:1";
pub const URN_SERVICE_WAN_CABLE_LINK_CONFIG_1: &str =
    "urn:schemas-upnp-org:service:WANCableLinkConfig:1";
pub const URN_SERVICE_WAN_COMMON_INTERFACE_CONFIG_1: &str =
    "urn:schemas-upnp-org:service:WANCommonInterfaceConfig:1";
pub const URN_SERVICE_WAN_DSL_LINK_CONFIG_1: &str =
    "urn:schemas-upnp-org:service:WANDSLLinkConfig:1";
pub const URN_SERVICE_WAN_ETHERNET_LINK_CONFIG_1: &str =
    "urn:schemas-upnp-org:service:WANEthernetLinkConfig:1";
pub const URN_SERVICE_WAN_IPV6_FIREWALL_CONTROL_1: &str =
    "urn:schemas-upnp-org:service:WANIPv6FirewallControl:1";
pub const URN_SERVICE_WAN_POTS_LINK_CONFIG_1: &str =
    "urn:schemas-upnp-org:service:WANPOTSLinkConfig:1";
pub const URN_SERVICE_WAN_IP_CONNECTION_1: &str =
    "urn:schemas-upnp-org:service:WANIPConnection:1";
pub const URN_SERVICE_WAN_IP_CONNECTION_2: &str =
    "urn:schemas-upnp-org:service:WANIPConnection:2";
pub const URN_SERVICE_WAN_PPP_CONNECTION_1: &str =
    "urn:schemas-upnp-org:service:WANPPPConnection:1";

// Actions
pub const ACTION_ADD_PORT_MAPPING: &str = "AddPortMapping";
pub const ACTION_ADD_ANY_PORT_MAPPING: &str = "AddAnyPortMapping";
pub const ACTION_DELETE_PORT_MAPPING: &str = "DeletePortMapping";
pub const ACTION_DELETE_PORT_MAPPING_RANGE: &str = "DeletePortMappingRange";
pub const ACTION_GET_GENERIC_PORT_MAPPING_ENTRY: &str = "GetGenericPortMappingEntry";
pub const ACTION_GET_SPECIFIC_PORT_MAPPING_ENTRY: &str = "GetSpecificPortMappingEntry";
pub const ACTION_GET_EXTERNAL_IP_ADDRESS: &str = "GetExternalIPAddress";
pub const ACTION_GET_STATUS_INFO: &str = "GetStatusInfo";
pub const ACTION_GET_PPP_COMPRESSION_PROTOCOL: &str = "GetPPPCompressionProtocol";
pub const ACTION_GET_CONNECTION_TYPE_INFO: &str = "GetConnectionTypeInfo";
pub const ACTION_FORCE_TERMINATION: &str = "ForceTermination";
pub const ACTION_GET_LIST_OF_PORT_MAPPINGS: &str = "GetListOfPortMappings";
pub const ACTION_GET_NAT_RSIP_STATUS: &str = "GetNATRSIPStatus";
pub const ACTION_REQUEST_CONNECTION: &str = "RequestConnection";
pub const ACTION_REQUEST_TERMINATION: &str = "RequestTermination";
pub const ACTION_GET_IDLE_DISCONNECT_TIME: &str = "GetIdleDisconnectTime";
pub const ACTION_SET_IDLE_DISCONNECT_TIME: &str = "SetIdleDisconnectTime";
pub const ACTION_GET_WARN_DISCONNECT_DELAY: &str = "GetWarnDisconnectDelay";
pub const ACTION_SET_WARN_DISCONNECT_DELAY: &str = "SetWarnDisconnectDelay";
pub const ACTION_GET_AUTO_DISCONNECT_TIME: &str = "GetAutoDisconnectTime";
pub const ACTION_SET_AUTO_DISCONNECT_TIME: &str = "SetAutoDisconnectTime";
pub const ACTION_SET_CONNECTION_TYPE: &str = "SetConnectionType";

/// Vrai si le type de recherche SSDP désigne une InternetGatewayDevice,
/// quelle que soit sa version.
pub fn is_internet_gateway_device(search_type: &str) -> bool {
    search_type.contains("InternetGatewayDevice")
}

/// Erreur de récupération ou d'analyse d'une description
#[derive(Debug, Error)]
pub enum DescriptionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("XML parse error: {0}")]
    Xml(#[from] xmltree::ParseError),

    #[error("unexpected root element <{found}>, expected <{expected}>")]
    UnexpectedRoot {
        expected: &'static str,
        found: String,
    },

    #[error("missing element <{0}>")]
    MissingField(&'static str),

    #[error("invalid URL {0:?}: {1}")]
    Url(String, url::ParseError),

    #[error("{0} URL is not resolved")]
    UnresolvedUrl(&'static str),

    #[error("invalid value {value:?} for <{field}>")]
    InvalidValue { field: &'static str, value: String },

    #[error(transparent)]
    Soap(#[from] SoapError),

    #[error("description request cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_gateway_search_types() {
        assert!(is_internet_gateway_device(
            "urn:schemas-upnp-org:device:InternetGatewayDevice:1"
        ));
        assert!(is_internet_gateway_device(
            "urn:schemas-upnp-org:device:InternetGatewayDevice:2"
        ));
        assert!(is_internet_gateway_device(
            "urn:dslforum-org:device:InternetGatewayDevice:1"
        ));
        assert!(!is_internet_gateway_device(URN_DEVICE_WAN_CONNECTION_DEVICE_1));
        assert!(!is_internet_gateway_device("upnp:rootdevice"));
    }
}
