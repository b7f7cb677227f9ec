//! Transport SOAP : POST d'une action vers l'URL de contrôle.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use tracing::{debug, trace};
use url::Url;

use super::args::{DecodedArgs, FromSoapArgs, SoapArgs};
use super::envelope::{Action, decode_envelope, encode_action};
use super::SoapError;

const SOAP_CONTENT_TYPE: &str = "text/xml; charset=\"utf-8\"";

/// Client SOAP lié à l'URL de contrôle d'un service.
///
/// Sans état entre deux appels, il peut être cloné et partagé entre tâches.
#[derive(Debug, Clone)]
pub struct SoapClient {
    control_url: Url,
    http: reqwest::Client,
}

impl SoapClient {
    /// Crée un client dont chaque requête est bornée par `timeout`.
    pub fn new(control_url: Url, timeout: Duration) -> Result<Self, SoapError> {
        Ok(Self::with_http_client(
            control_url,
            crate::http::build_client(timeout)?,
        ))
    }

    /// Crée un client réutilisant un client HTTP existant.
    pub fn with_http_client(control_url: Url, http: reqwest::Client) -> Self {
        Self { control_url, http }
    }

    pub fn control_url(&self) -> &Url {
        &self.control_url
    }

    /// Appelle `action_name` et décode la réponse vers `O`.
    ///
    /// Une réponse sans élément d'action donne la valeur construite depuis
    /// des arguments vides.
    pub async fn call<I, O>(
        &self,
        namespace: &str,
        action_name: &str,
        input: &I,
    ) -> Result<O, SoapError>
    where
        I: SoapArgs + ?Sized,
        O: FromSoapArgs,
    {
        let action = Action::new(namespace, input.to_args()).with_name(action_name);
        match self.call_action(&action).await? {
            Some(args) => O::from_args(&args),
            None => O::from_args(&DecodedArgs::default()),
        }
    }

    /// Envoie l'action et retourne les arguments de la réponse.
    ///
    /// Une erreur HTTP, ou un statut autre que 200 avec un corps vide, est
    /// une erreur de transport. Un fault SOAP devient [`SoapError::Fault`].
    /// Aucune nouvelle tentative n'est faite.
    pub async fn call_action(&self, action: &Action) -> Result<Option<DecodedArgs>, SoapError> {
        let body = encode_action(action)?;
        trace!("SOAP request to {}:\n{}", self.control_url, body);

        let response = self
            .http
            .post(self.control_url.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static(SOAP_CONTENT_TYPE))
            .header("SOAPAction", action.soap_action_header())
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        debug!(
            "SOAP {} on {} -> {} ({} bytes)",
            action.name(),
            self.control_url,
            status,
            bytes.len()
        );

        if status != StatusCode::OK && bytes.is_empty() {
            return Err(SoapError::HttpStatus(status.as_u16()));
        }

        trace!("SOAP response:\n{}", String::from_utf8_lossy(&bytes));
        decode_envelope(&bytes)?.into_result()
    }
}
