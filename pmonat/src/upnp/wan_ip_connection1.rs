//! Client `urn:schemas-upnp-org:service:WANIPConnection:1`.

use std::time::Duration;

use super::device::Service;
use super::wan_connection::{IpConnectionActions, WanConnection, impl_wan_client};
use super::{DescriptionError, URN_SERVICE_WAN_IP_CONNECTION_1};
use crate::soap::SoapClient;

#[derive(Debug, Clone)]
pub struct WanIpConnection1 {
    connection: WanConnection,
}

impl WanIpConnection1 {
    pub fn new(soap: SoapClient) -> Self {
        Self {
            connection: WanConnection::new(soap, URN_SERVICE_WAN_IP_CONNECTION_1),
        }
    }

    pub fn from_service(service: &Service, timeout: Duration) -> Result<Self, DescriptionError> {
        Ok(Self::new(service.soap_client(timeout)?))
    }
}

impl_wan_client!(WanIpConnection1);

impl IpConnectionActions for WanIpConnection1 {
    fn connection(&self) -> &WanConnection {
        &self.connection
    }
}
