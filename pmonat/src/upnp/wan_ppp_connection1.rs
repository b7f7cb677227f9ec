//! Client `urn:schemas-upnp-org:service:WANPPPConnection:1`.

use std::time::Duration;

use super::action_params::GetPppCompressionProtocolResponse;
use super::device::Service;
use super::wan_connection::{WanConnection, impl_wan_client};
use super::{ACTION_GET_PPP_COMPRESSION_PROTOCOL, DescriptionError, URN_SERVICE_WAN_PPP_CONNECTION_1};
use crate::soap::{SoapClient, SoapError};

#[derive(Debug, Clone)]
pub struct WanPppConnection1 {
    connection: WanConnection,
}

impl WanPppConnection1 {
    pub fn new(soap: SoapClient) -> Self {
        Self {
            connection: WanConnection::new(soap, URN_SERVICE_WAN_PPP_CONNECTION_1),
        }
    }

    pub fn from_service(service: &Service, timeout: Duration) -> Result<Self, DescriptionError> {
        Ok(Self::new(service.soap_client(timeout)?))
    }

    pub async fn get_ppp_compression_protocol(&self) -> Result<String, SoapError> {
        let response: GetPppCompressionProtocolResponse = self
            .connection
            .call(ACTION_GET_PPP_COMPRESSION_PROTOCOL, &())
            .await?;
        Ok(response.compression_protocol)
    }
}

impl_wan_client!(WanPppConnection1);
