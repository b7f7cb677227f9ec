use thiserror::Error;

use crate::soap::{Fault, SoapError};
use crate::ssdp::SsdpError;
use crate::upnp::DescriptionError;

/// Erreur de la façade NAT.
///
/// Les erreurs SOAP sont reclassées en `Transport`, `Decode` ou `Fault`
/// afin que l'appelant puisse réagir sans inspecter la couche SOAP.
#[derive(Error, Debug)]
pub enum NatError {
    #[error("not support protocol: {0:?}")]
    UnsupportedProtocol(String),
    #[error("no external address")]
    NoExternalAddress,
    #[error("no internal address")]
    NoInternalAddress,
    #[error("cannot resolve gateway address {0:?}")]
    UnresolvedDeviceAddress(String),
    #[error("transport error: {0}")]
    Transport(SoapError),
    #[error("decode error: {0}")]
    Decode(SoapError),
    #[error(transparent)]
    Fault(Fault),
    #[error(transparent)]
    Description(#[from] DescriptionError),
    #[error(transparent)]
    Ssdp(#[from] SsdpError),
    #[error("network interfaces: {0}")]
    Io(#[from] std::io::Error),
    #[error("NAT discovery cancelled")]
    Cancelled,
    #[error("discovery task {0} failed: {1}")]
    TaskFailed(&'static str, String),
}

impl NatError {
    pub fn unsupported_protocol(protocol: &str) -> Self {
        NatError::UnsupportedProtocol(protocol.to_string())
    }

    /// Vrai si la passerelle a répondu par une faute SOAP.
    pub fn is_fault(&self) -> bool {
        matches!(self, NatError::Fault(_))
    }

    /// Vrai si l'opération a été abandonnée par annulation du jeton, quelle
    /// que soit la couche qui l'a constaté.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            NatError::Cancelled
                | NatError::Ssdp(SsdpError::Cancelled)
                | NatError::Description(DescriptionError::Cancelled)
        )
    }

    /// Retourne la faute SOAP portée par l'erreur, s'il y en a une.
    pub fn as_fault(&self) -> Option<&Fault> {
        match self {
            NatError::Fault(fault) => Some(fault),
            _ => None,
        }
    }
}

impl From<SoapError> for NatError {
    fn from(err: SoapError) -> Self {
        match err {
            SoapError::Fault(fault) => NatError::Fault(fault),
            err if err.is_transport() => NatError::Transport(err),
            err => NatError::Decode(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soap::UpnpError;

    #[test]
    fn soap_errors_are_classified() {
        let fault = Fault {
            code: "s:Client".to_string(),
            string: "UPnPError".to_string(),
            actor: String::new(),
            detail: UpnpError {
                error_code: "718".to_string(),
                error_description: "ConflictInMappingEntry".to_string(),
            },
        };
        let err = NatError::from(SoapError::Fault(fault));
        assert!(err.is_fault());
        assert_eq!(err.as_fault().map(|f| f.error_code()), Some(Some(718)));

        let err = NatError::from(SoapError::HttpStatus(500));
        assert!(matches!(err, NatError::Transport(_)));

        let err = NatError::from(SoapError::MissingBody);
        assert!(matches!(err, NatError::Decode(_)));
        assert!(!err.is_fault());
    }
}
