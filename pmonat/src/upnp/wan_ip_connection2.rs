//! Client `urn:schemas-upnp-org:service:WANIPConnection:2`.
//!
//! Reprend les actions de la version 1 et ajoute la réservation d'un port
//! libre, la suppression par plage et le listing des redirections.

use std::time::Duration;

use super::action_params::{
    AddAnyPortMappingRequest, AddAnyPortMappingResponse, DeletePortMappingRangeRequest,
    GetListOfPortMappingsRequest, GetListOfPortMappingsResponse,
};
use super::device::Service;
use super::wan_connection::{IpConnectionActions, WanConnection, impl_wan_client};
use super::{
    ACTION_ADD_ANY_PORT_MAPPING, ACTION_DELETE_PORT_MAPPING_RANGE,
    ACTION_GET_LIST_OF_PORT_MAPPINGS, DescriptionError, URN_SERVICE_WAN_IP_CONNECTION_2,
};
use crate::soap::{SoapClient, SoapError};

#[derive(Debug, Clone)]
pub struct WanIpConnection2 {
    connection: WanConnection,
}

impl WanIpConnection2 {
    pub fn new(soap: SoapClient) -> Self {
        Self {
            connection: WanConnection::new(soap, URN_SERVICE_WAN_IP_CONNECTION_2),
        }
    }

    pub fn from_service(service: &Service, timeout: Duration) -> Result<Self, DescriptionError> {
        Ok(Self::new(service.soap_client(timeout)?))
    }

    /// Crée une redirection et retourne le port externe réservé, qui peut
    /// différer du port demandé.
    pub async fn add_any_port_mapping(
        &self,
        request: &AddAnyPortMappingRequest,
    ) -> Result<u16, SoapError> {
        let response: AddAnyPortMappingResponse = self
            .connection
            .call(ACTION_ADD_ANY_PORT_MAPPING, request)
            .await?;
        Ok(response.reserved_port)
    }

    /// Supprime les redirections de `start_port` à `end_port` inclus.
    ///
    /// Avec `manage`, les redirections des autres clients sont aussi
    /// supprimées si la passerelle l'autorise.
    pub async fn delete_port_mapping_range(
        &self,
        start_port: u16,
        end_port: u16,
        protocol: &str,
        manage: bool,
    ) -> Result<(), SoapError> {
        let request = DeletePortMappingRangeRequest {
            start_port,
            end_port,
            protocol: protocol.to_string(),
            manage,
        };
        self.connection
            .call(ACTION_DELETE_PORT_MAPPING_RANGE, &request)
            .await
    }

    /// Document `PortMappingList` brut.
    pub async fn get_list_of_port_mappings(
        &self,
        request: &GetListOfPortMappingsRequest,
    ) -> Result<String, SoapError> {
        let response: GetListOfPortMappingsResponse = self
            .connection
            .call(ACTION_GET_LIST_OF_PORT_MAPPINGS, request)
            .await?;
        Ok(response.port_listing)
    }
}

impl_wan_client!(WanIpConnection2);

impl IpConnectionActions for WanIpConnection2 {
    fn connection(&self) -> &WanConnection {
        &self.connection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;
    use wiremock::matchers::{body_string_contains, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> WanIpConnection2 {
        let url = Url::parse(&format!("{}/ctl/IPConn2", server.uri())).unwrap();
        WanIpConnection2::new(SoapClient::new(url, Duration::from_secs(5)).unwrap())
    }

    #[tokio::test]
    async fn test_add_any_port_mapping_returns_reserved_port() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header(
                "SOAPAction",
                "\"urn:schemas-upnp-org:service:WANIPConnection:2#AddAnyPortMapping\"",
            ))
            .and(body_string_contains("<NewExternalPort>17269</NewExternalPort>"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><u:AddAnyPortMappingResponse xmlns:u="urn:schemas-upnp-org:service:WANIPConnection:2"><NewReservedPort>17270</NewReservedPort></u:AddAnyPortMappingResponse></s:Body></s:Envelope>"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let request = AddAnyPortMappingRequest {
            external_port: 17269,
            protocol: "TCP".into(),
            internal_port: 17269,
            internal_client: "192.168.1.20".into(),
            enabled: true,
            lease_duration: 60,
            ..Default::default()
        };
        let port = client(&server).add_any_port_mapping(&request).await.unwrap();
        assert_eq!(port, 17270);
    }

    #[tokio::test]
    async fn test_delete_range_sends_manage_flag() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains(
                "<NewStartPort>1000</NewStartPort><NewEndPort>1010</NewEndPort>\
                 <NewProtocol>UDP</NewProtocol><NewManage>1</NewManage>",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><u:DeletePortMappingRangeResponse xmlns:u="urn:schemas-upnp-org:service:WANIPConnection:2"/></s:Body></s:Envelope>"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .delete_port_mapping_range(1000, 1010, "UDP", true)
            .await
            .unwrap();
    }
}
