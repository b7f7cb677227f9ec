//! Actions communes aux services de connexion WAN.

use std::time::Duration;

use async_trait::async_trait;

use super::action_params::*;
use super::device::Service;
use super::{
    ACTION_ADD_PORT_MAPPING, ACTION_DELETE_PORT_MAPPING, ACTION_FORCE_TERMINATION,
    ACTION_GET_AUTO_DISCONNECT_TIME, ACTION_GET_CONNECTION_TYPE_INFO,
    ACTION_GET_EXTERNAL_IP_ADDRESS, ACTION_GET_GENERIC_PORT_MAPPING_ENTRY,
    ACTION_GET_IDLE_DISCONNECT_TIME, ACTION_GET_NAT_RSIP_STATUS,
    ACTION_GET_SPECIFIC_PORT_MAPPING_ENTRY, ACTION_GET_STATUS_INFO,
    ACTION_GET_WARN_DISCONNECT_DELAY, ACTION_REQUEST_CONNECTION, ACTION_REQUEST_TERMINATION,
    ACTION_SET_AUTO_DISCONNECT_TIME, ACTION_SET_CONNECTION_TYPE, ACTION_SET_IDLE_DISCONNECT_TIME,
    ACTION_SET_WARN_DISCONNECT_DELAY, DescriptionError,
};
use crate::soap::{FromSoapArgs, SoapArgs, SoapClient, SoapError};

/// Client des actions partagées par WANIPConnection et WANPPPConnection.
///
/// Chaque client de service en possède un et lui délègue ces actions.
#[derive(Debug, Clone)]
pub struct WanConnection {
    soap: SoapClient,
    service_type: String,
}

impl WanConnection {
    pub fn new(soap: SoapClient, service_type: impl Into<String>) -> Self {
        Self {
            soap,
            service_type: service_type.into(),
        }
    }

    /// Connexion vers l'URL de contrôle d'un service décrit.
    pub fn from_service(
        service: &Service,
        service_type: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DescriptionError> {
        Ok(Self::new(service.soap_client(timeout)?, service_type))
    }

    pub fn service_type(&self) -> &str {
        &self.service_type
    }

    pub fn soap_client(&self) -> &SoapClient {
        &self.soap
    }

    pub(crate) async fn call<I, O>(&self, action: &str, input: &I) -> Result<O, SoapError>
    where
        I: SoapArgs + ?Sized,
        O: FromSoapArgs,
    {
        self.soap.call(&self.service_type, action, input).await
    }

    pub async fn add_port_mapping(&self, request: &AddPortMappingRequest) -> Result<(), SoapError> {
        self.call(ACTION_ADD_PORT_MAPPING, request).await
    }

    pub async fn delete_port_mapping(
        &self,
        remote_host: &str,
        external_port: u16,
        protocol: &str,
    ) -> Result<(), SoapError> {
        let request = DeletePortMappingRequest {
            remote_host: remote_host.to_string(),
            external_port,
            protocol: protocol.to_string(),
        };
        self.call(ACTION_DELETE_PORT_MAPPING, &request).await
    }

    pub async fn get_external_ip_address(&self) -> Result<String, SoapError> {
        let response: GetExternalIpAddressResponse =
            self.call(ACTION_GET_EXTERNAL_IP_ADDRESS, &()).await?;
        Ok(response.external_ip_address)
    }

    pub async fn get_connection_type_info(
        &self,
    ) -> Result<GetConnectionTypeInfoResponse, SoapError> {
        self.call(ACTION_GET_CONNECTION_TYPE_INFO, &()).await
    }

    /// Entrée numéro `index` de la table des redirections.
    ///
    /// La passerelle répond par le fault 713 (SpecifiedArrayIndexInvalid)
    /// au-delà de la dernière entrée.
    pub async fn get_generic_port_mapping_entry(
        &self,
        index: u16,
    ) -> Result<GetGenericPortMappingEntryResponse, SoapError> {
        let request = GetGenericPortMappingEntryRequest { index };
        self.call(ACTION_GET_GENERIC_PORT_MAPPING_ENTRY, &request)
            .await
    }

    pub async fn get_specific_port_mapping_entry(
        &self,
        remote_host: &str,
        external_port: u16,
        protocol: &str,
    ) -> Result<GetSpecificPortMappingEntryResponse, SoapError> {
        let request = GetSpecificPortMappingEntryRequest {
            remote_host: remote_host.to_string(),
            external_port,
            protocol: protocol.to_string(),
        };
        self.call(ACTION_GET_SPECIFIC_PORT_MAPPING_ENTRY, &request)
            .await
    }

    pub async fn get_status_info(&self) -> Result<GetStatusInfoResponse, SoapError> {
        self.call(ACTION_GET_STATUS_INFO, &()).await
    }
}

/// Actions de redirection de ports utilisées par la couche NAT.
///
/// Implémenté par les trois clients de connexion WAN.
#[async_trait]
pub trait PortMappingClient: Send + Sync {
    /// URN du service appelé.
    fn service_type(&self) -> &str;

    async fn get_external_ip_address(&self) -> Result<String, SoapError>;

    async fn add_port_mapping(&self, request: &AddPortMappingRequest) -> Result<(), SoapError>;

    async fn delete_port_mapping(
        &self,
        remote_host: &str,
        external_port: u16,
        protocol: &str,
    ) -> Result<(), SoapError>;

    async fn get_specific_port_mapping_entry(
        &self,
        remote_host: &str,
        external_port: u16,
        protocol: &str,
    ) -> Result<GetSpecificPortMappingEntryResponse, SoapError>;

    async fn get_status_info(&self) -> Result<GetStatusInfoResponse, SoapError>;
}

/// Actions propres à WANIPConnection (v1 et v2).
#[async_trait]
pub trait IpConnectionActions: Send + Sync {
    fn connection(&self) -> &WanConnection;

    async fn force_termination(&self) -> Result<(), SoapError> {
        self.connection().call(ACTION_FORCE_TERMINATION, &()).await
    }

    async fn request_connection(&self) -> Result<(), SoapError> {
        self.connection().call(ACTION_REQUEST_CONNECTION, &()).await
    }

    async fn request_termination(&self) -> Result<(), SoapError> {
        self.connection().call(ACTION_REQUEST_TERMINATION, &()).await
    }

    async fn get_nat_rsip_status(&self) -> Result<GetNatRsipStatusResponse, SoapError> {
        self.connection().call(ACTION_GET_NAT_RSIP_STATUS, &()).await
    }

    /// Délai d'inactivité avant déconnexion, en secondes.
    async fn get_idle_disconnect_time(&self) -> Result<u32, SoapError> {
        let response: IdleDisconnectTimeArgs = self
            .connection()
            .call(ACTION_GET_IDLE_DISCONNECT_TIME, &())
            .await?;
        Ok(response.idle_disconnect_time)
    }

    async fn set_idle_disconnect_time(&self, seconds: u32) -> Result<(), SoapError> {
        let request = IdleDisconnectTimeArgs {
            idle_disconnect_time: seconds,
        };
        self.connection()
            .call(ACTION_SET_IDLE_DISCONNECT_TIME, &request)
            .await
    }

    async fn get_warn_disconnect_delay(&self) -> Result<u32, SoapError> {
        let response: WarnDisconnectDelayArgs = self
            .connection()
            .call(ACTION_GET_WARN_DISCONNECT_DELAY, &())
            .await?;
        Ok(response.warn_disconnect_delay)
    }

    async fn set_warn_disconnect_delay(&self, seconds: u32) -> Result<(), SoapError> {
        let request = WarnDisconnectDelayArgs {
            warn_disconnect_delay: seconds,
        };
        self.connection()
            .call(ACTION_SET_WARN_DISCONNECT_DELAY, &request)
            .await
    }

    async fn get_auto_disconnect_time(&self) -> Result<u32, SoapError> {
        let response: AutoDisconnectTimeArgs = self
            .connection()
            .call(ACTION_GET_AUTO_DISCONNECT_TIME, &())
            .await?;
        Ok(response.auto_disconnect_time)
    }

    async fn set_auto_disconnect_time(&self, seconds: u32) -> Result<(), SoapError> {
        let request = AutoDisconnectTimeArgs {
            auto_disconnect_time: seconds,
        };
        self.connection()
            .call(ACTION_SET_AUTO_DISCONNECT_TIME, &request)
            .await
    }

    /// `IP_Routed`, `IP_Bridged`, ...
    async fn set_connection_type(&self, connection_type: &str) -> Result<(), SoapError> {
        let request = ConnectionTypeArgs {
            connection_type: connection_type.to_string(),
        };
        self.connection()
            .call(ACTION_SET_CONNECTION_TYPE, &request)
            .await
    }
}

/// Génère, pour un client de service possédant un champ `connection`,
/// les méthodes déléguées à [`WanConnection`] et l'implémentation de
/// [`PortMappingClient`].
macro_rules! impl_wan_client {
    ($client:ty) => {
        impl $client {
            pub fn connection(&self) -> &$crate::upnp::WanConnection {
                &self.connection
            }

            pub fn service_type(&self) -> &str {
                self.connection.service_type()
            }

            pub async fn add_port_mapping(
                &self,
                request: &$crate::upnp::AddPortMappingRequest,
            ) -> Result<(), $crate::soap::SoapError> {
                self.connection.add_port_mapping(request).await
            }

            pub async fn delete_port_mapping(
                &self,
                remote_host: &str,
                external_port: u16,
                protocol: &str,
            ) -> Result<(), $crate::soap::SoapError> {
                self.connection
                    .delete_port_mapping(remote_host, external_port, protocol)
                    .await
            }

            pub async fn get_external_ip_address(
                &self,
            ) -> Result<String, $crate::soap::SoapError> {
                self.connection.get_external_ip_address().await
            }

            pub async fn get_connection_type_info(
                &self,
            ) -> Result<$crate::upnp::GetConnectionTypeInfoResponse, $crate::soap::SoapError>
            {
                self.connection.get_connection_type_info().await
            }

            pub async fn get_generic_port_mapping_entry(
                &self,
                index: u16,
            ) -> Result<
                $crate::upnp::GetGenericPortMappingEntryResponse,
                $crate::soap::SoapError,
            > {
                self.connection.get_generic_port_mapping_entry(index).await
            }

            pub async fn get_specific_port_mapping_entry(
                &self,
                remote_host: &str,
                external_port: u16,
                protocol: &str,
            ) -> Result<
                $crate::upnp::GetSpecificPortMappingEntryResponse,
                $crate::soap::SoapError,
            > {
                self.connection
                    .get_specific_port_mapping_entry(remote_host, external_port, protocol)
                    .await
            }

            pub async fn get_status_info(
                &self,
            ) -> Result<$crate::upnp::GetStatusInfoResponse, $crate::soap::SoapError> {
                self.connection.get_status_info().await
            }
        }

        #[async_trait::async_trait]
        impl $crate::upnp::PortMappingClient for $client {
            fn service_type(&self) -> &str {
                self.connection.service_type()
            }

            async fn get_external_ip_address(&self) -> Result<String, $crate::soap::SoapError> {
                self.connection.get_external_ip_address().await
            }

            async fn add_port_mapping(
                &self,
                request: &$crate::upnp::AddPortMappingRequest,
            ) -> Result<(), $crate::soap::SoapError> {
                self.connection.add_port_mapping(request).await
            }

            async fn delete_port_mapping(
                &self,
                remote_host: &str,
                external_port: u16,
                protocol: &str,
            ) -> Result<(), $crate::soap::SoapError> {
                self.connection
                    .delete_port_mapping(remote_host, external_port, protocol)
                    .await
            }

            async fn get_specific_port_mapping_entry(
                &self,
                remote_host: &str,
                external_port: u16,
                protocol: &str,
            ) -> Result<
                $crate::upnp::GetSpecificPortMappingEntryResponse,
                $crate::soap::SoapError,
            > {
                self.connection
                    .get_specific_port_mapping_entry(remote_host, external_port, protocol)
                    .await
            }

            async fn get_status_info(
                &self,
            ) -> Result<$crate::upnp::GetStatusInfoResponse, $crate::soap::SoapError> {
                self.connection.get_status_info().await
            }
        }
    };
}

pub(crate) use impl_wan_client;
