//! Arguments des actions WANIPConnection / WANPPPConnection.
//!
//! Les champs suivent l'ordre des arguments de l'action dans les SCPD
//! standard, ordre dans lequel ils sont écrits sur le fil.

use crate::define_soap_args;

define_soap_args! {
    /// Requête AddPortMapping
    pub struct AddPortMappingRequest : "AddPortMapping" {
        /// Hôte distant, vide pour tout hôte
        "NewRemoteHost" => remote_host: String,
        "NewExternalPort" => external_port: u16,
        /// `TCP` ou `UDP`
        "NewProtocol" => protocol: String,
        "NewInternalPort" => internal_port: u16,
        "NewInternalClient" => internal_client: String,
        "NewEnabled" => enabled: bool,
        "NewPortMappingDescription" => description: String,
        /// Durée du bail en secondes, 0 pour un bail permanent
        "NewLeaseDuration" => lease_duration: u32,
    }
}

define_soap_args! {
    /// Requête AddAnyPortMapping (WANIPConnection:2)
    pub struct AddAnyPortMappingRequest : "AddAnyPortMapping" {
        "NewRemoteHost" => remote_host: String,
        "NewExternalPort" => external_port: u16,
        "NewProtocol" => protocol: String,
        "NewInternalPort" => internal_port: u16,
        "NewInternalClient" => internal_client: String,
        "NewEnabled" => enabled: bool,
        "NewPortMappingDescription" => description: String,
        "NewLeaseDuration" => lease_duration: u32,
    }
}

define_soap_args! {
    pub struct AddAnyPortMappingResponse {
        /// Port externe effectivement réservé par la passerelle
        "NewReservedPort" => reserved_port: u16,
    }
}

define_soap_args! {
    /// Requête DeletePortMapping
    pub struct DeletePortMappingRequest : "DeletePortMapping" {
        "NewRemoteHost" => remote_host: String,
        "NewExternalPort" => external_port: u16,
        "NewProtocol" => protocol: String,
    }
}

define_soap_args! {
    /// Requête DeletePortMappingRange (WANIPConnection:2)
    pub struct DeletePortMappingRangeRequest : "DeletePortMappingRange" {
        "NewStartPort" => start_port: u16,
        "NewEndPort" => end_port: u16,
        "NewProtocol" => protocol: String,
        "NewManage" => manage: bool,
    }
}

define_soap_args! {
    pub struct GetGenericPortMappingEntryRequest : "GetGenericPortMappingEntry" {
        "NewPortMappingIndex" => index: u16,
    }
}

define_soap_args! {
    /// Entrée de la table des redirections, par index
    pub struct GetGenericPortMappingEntryResponse {
        "NewRemoteHost" => remote_host: String,
        "NewExternalPort" => external_port: u16,
        "NewProtocol" => protocol: String,
        "NewInternalPort" => internal_port: u16,
        "NewInternalClient" => internal_client: String,
        "NewEnabled" => enabled: bool,
        "NewPortMappingDescription" => description: String,
        "NewLeaseDuration" => lease_duration: u32,
    }
}

define_soap_args! {
    pub struct GetSpecificPortMappingEntryRequest : "GetSpecificPortMappingEntry" {
        "NewRemoteHost" => remote_host: String,
        "NewExternalPort" => external_port: u16,
        "NewProtocol" => protocol: String,
    }
}

define_soap_args! {
    /// Redirection existante pour un couple (port externe, protocole)
    pub struct GetSpecificPortMappingEntryResponse {
        "NewInternalPort" => internal_port: u16,
        "NewInternalClient" => internal_client: String,
        "NewEnabled" => enabled: bool,
        "NewPortMappingDescription" => description: String,
        "NewLeaseDuration" => lease_duration: u32,
    }
}

define_soap_args! {
    pub struct GetStatusInfoResponse {
        /// `Connected`, `Disconnected`, ...
        "NewConnectionStatus" => connection_status: String,
        "NewLastConnectionError" => last_connection_error: String,
        /// Secondes depuis l'établissement de la connexion
        "NewUptime" => uptime: u32,
    }
}

define_soap_args! {
    pub struct GetExternalIpAddressResponse {
        "NewExternalIPAddress" => external_ip_address: String,
    }
}

define_soap_args! {
    pub struct GetConnectionTypeInfoResponse {
        "NewConnectionType" => connection_type: String,
        /// Liste séparée par des virgules
        "NewPossibleConnectionTypes" => possible_connection_types: String,
    }
}

define_soap_args! {
    pub struct GetPppCompressionProtocolResponse {
        "NewPPPCompressionProtocol" => compression_protocol: String,
    }
}

define_soap_args! {
    /// Requête GetListOfPortMappings (WANIPConnection:2)
    pub struct GetListOfPortMappingsRequest : "GetListOfPortMappings" {
        "NewStartPort" => start_port: u16,
        "NewEndPort" => end_port: u16,
        "NewProtocol" => protocol: String,
        "NewManage" => manage: bool,
        "NewNumberOfPorts" => number_of_ports: u16,
    }
}

define_soap_args! {
    pub struct GetListOfPortMappingsResponse {
        /// Document XML `PortMappingList`, renvoyé tel quel
        "NewPortListing" => port_listing: String,
    }
}

define_soap_args! {
    pub struct GetNatRsipStatusResponse {
        "NewRSIPAvailable" => rsip_available: bool,
        "NewNATEnabled" => nat_enabled: bool,
    }
}

define_soap_args! {
    pub struct IdleDisconnectTimeArgs {
        "NewIdleDisconnectTime" => idle_disconnect_time: u32,
    }
}

define_soap_args! {
    pub struct WarnDisconnectDelayArgs {
        "NewWarnDisconnectDelay" => warn_disconnect_delay: u32,
    }
}

define_soap_args! {
    pub struct AutoDisconnectTimeArgs {
        "NewAutoDisconnectTime" => auto_disconnect_time: u32,
    }
}

define_soap_args! {
    pub struct ConnectionTypeArgs {
        "NewConnectionType" => connection_type: String,
    }
}
