//! # Module SOAP - Simple Object Access Protocol
//!
//! Codec et transport SOAP 1.1 des actions UPnP côté client.
//!
//! ## Architecture
//!
//! - [`Action`] : action à envoyer (namespace, nom, arguments)
//! - [`ActionArgs`] : arguments, structure déclarée ou liste clé/valeur
//! - [`encode_action`] / [`decode_envelope`] : codec de l'enveloppe
//! - [`Fault`] : erreur SOAP renvoyée par la passerelle
//! - [`SoapClient`] : POST HTTP vers l'URL de contrôle d'un service
//!
//! ## Example
//!
//! ```ignore
//! use pmonat::soap::{ActionArgs, SoapClient};
//!
//! let client = SoapClient::new(control_url, std::time::Duration::from_secs(10))?;
//! let out: Vec<(String, String)> = client
//!     .call(
//!         "urn:schemas-upnp-org:service:WANIPConnection:1",
//!         "GetExternalIPAddress",
//!         &ActionArgs::empty(),
//!     )
//!     .await?;
//! ```

mod args;
mod client;
mod envelope;
mod fault;

use thiserror::Error;

pub use args::{
    ActionArgs, DecodedArgs, FromSoapArgs, SoapArgs, SoapValue, StructArgs, decode_map,
};
pub use client::SoapClient;
pub use envelope::{
    Action, Envelope, SOAP_ENCODING_STYLE, SOAP_ENVELOPE_NS, decode_action, decode_envelope,
    encode_action,
};
pub use fault::{Fault, UPNP_CONTROL_NS, UpnpError, build_soap_fault};

pub(crate) use envelope::{child_element, element_text};

/// Erreur du codec ou du transport SOAP
#[derive(Debug, Error)]
pub enum SoapError {
    #[error("XML parse error: {0}")]
    Xml(#[from] xmltree::ParseError),

    #[error("XML write error: {0}")]
    Encode(String),

    #[error("invalid XML element name {0:?}")]
    InvalidName(String),

    #[error("Missing SOAP Envelope, found <{0}>")]
    MissingEnvelope(String),

    #[error("Missing SOAP Body")]
    MissingBody,

    #[error("SOAP action arg does not support attributes, got {0}")]
    UnexpectedAttribute(String),

    #[error("SOAP action arg does not support non-empty namespace, got {0:?}")]
    UnexpectedNamespace(String),

    #[error("SOAP action args contained stray text: {0:?}")]
    StrayText(String),

    #[error("SOAP action args contained unexpected token {0}")]
    UnexpectedToken(String),

    #[error("SOAP action arg {name:?} errored while decoding: {reason}")]
    InvalidValue { name: String, reason: String },

    #[error("http do request fault: {0}")]
    Http(#[from] reqwest::Error),

    #[error("soap http request fault: status {0}")]
    HttpStatus(u16),

    #[error(transparent)]
    Fault(#[from] Fault),
}

impl SoapError {
    /// Vrai si la passerelle a répondu par un fault SOAP.
    pub fn is_fault(&self) -> bool {
        matches!(self, SoapError::Fault(_))
    }

    /// Vrai pour les échecs HTTP (connexion, timeout, statut sans corps).
    pub fn is_transport(&self) -> bool {
        matches!(self, SoapError::Http(_) | SoapError::HttpStatus(_))
    }

    pub fn as_fault(&self) -> Option<&Fault> {
        match self {
            SoapError::Fault(fault) => Some(fault),
            _ => None,
        }
    }
}
