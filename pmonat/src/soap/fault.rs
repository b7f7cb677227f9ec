//! SOAP Faults pour UPnP

use std::fmt;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use xmltree::Element;

use super::envelope::{SOAP_ENCODING_STYLE, SOAP_ENVELOPE_NS, child_element, element_text};
use super::SoapError;

/// Namespace de l'élément `UPnPError`
pub const UPNP_CONTROL_NS: &str = "urn:schemas-upnp-org:control-1-0";

/// Erreur UPnP spécifique, portée par le `detail` d'un fault
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpnpError {
    /// Code d'erreur UPnP (ex: "401", "718")
    pub error_code: String,

    /// Description de l'erreur
    pub error_description: String,
}

impl UpnpError {
    pub fn is_empty(&self) -> bool {
        self.error_code.is_empty() && self.error_description.is_empty()
    }
}

/// Erreur SOAP (Fault) renvoyée par une passerelle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fault {
    /// Code du fault (ex: "s:Client")
    pub code: String,

    /// Description du fault (souvent "UPnPError")
    pub string: String,

    pub actor: String,

    /// Détails UPnP, vides si la passerelle n'en fournit pas
    pub detail: UpnpError,
}

impl Fault {
    /// Crée un fault SOAP simple
    pub fn new(code: impl Into<String>, string: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            string: string.into(),
            ..Self::default()
        }
    }

    /// Crée un fault SOAP avec erreur UPnP
    pub fn with_upnp_error(
        code: impl Into<String>,
        string: impl Into<String>,
        error_code: impl Into<String>,
        error_description: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            string: string.into(),
            actor: String::new(),
            detail: UpnpError {
                error_code: error_code.into(),
                error_description: error_description.into(),
            },
        }
    }

    /// Code d'erreur UPnP numérique, s'il est présent et valide.
    pub fn error_code(&self) -> Option<u32> {
        self.detail.error_code.trim().parse().ok()
    }

    pub(crate) fn from_element(elem: &Element) -> Self {
        let upnp_error = child_element(elem, "detail")
            .and_then(|detail| child_element(detail, "UPnPError"))
            .map(|err| UpnpError {
                error_code: element_text(err, "errorCode"),
                error_description: element_text(err, "errorDescription"),
            })
            .unwrap_or_default();

        Self {
            code: element_text(elem, "faultcode"),
            string: element_text(elem, "faultstring"),
            actor: element_text(elem, "faultactor"),
            detail: upnp_error,
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.detail.is_empty() {
            write!(
                f,
                "SOAP fault code={} message={}",
                self.detail.error_code, self.detail.error_description
            )
        } else {
            write!(f, "SOAP fault code={}: message={}", self.code, self.string)
        }
    }
}

impl std::error::Error for Fault {}

/// Construit l'enveloppe XML d'un SOAP Fault
///
/// # Arguments
///
/// * `fault_code` - Code du fault (ex: "s:Client")
/// * `fault_string` - Message d'erreur
/// * `upnp_error_code` - Code d'erreur UPnP optionnel (ex: "401")
/// * `upnp_error_desc` - Description d'erreur UPnP optionnelle
pub fn build_soap_fault(
    fault_code: &str,
    fault_string: &str,
    upnp_error_code: Option<&str>,
    upnp_error_desc: Option<&str>,
) -> Result<String, SoapError> {
    let mut writer = Writer::new(Vec::new());

    let mut envelope = BytesStart::new("s:Envelope");
    envelope.push_attribute(("xmlns:s", SOAP_ENVELOPE_NS));
    envelope.push_attribute(("s:encodingStyle", SOAP_ENCODING_STYLE));
    write(&mut writer, Event::Start(envelope))?;
    write(&mut writer, Event::Start(BytesStart::new("s:Body")))?;
    write(&mut writer, Event::Start(BytesStart::new("s:Fault")))?;

    text_element(&mut writer, "faultcode", fault_code)?;
    text_element(&mut writer, "faultstring", fault_string)?;

    if let (Some(code), Some(desc)) = (upnp_error_code, upnp_error_desc) {
        write(&mut writer, Event::Start(BytesStart::new("detail")))?;
        let mut upnp_error = BytesStart::new("UPnPError");
        upnp_error.push_attribute(("xmlns", UPNP_CONTROL_NS));
        write(&mut writer, Event::Start(upnp_error))?;
        text_element(&mut writer, "errorCode", code)?;
        text_element(&mut writer, "errorDescription", desc)?;
        write(&mut writer, Event::End(BytesEnd::new("UPnPError")))?;
        write(&mut writer, Event::End(BytesEnd::new("detail")))?;
    }

    write(&mut writer, Event::End(BytesEnd::new("s:Fault")))?;
    write(&mut writer, Event::End(BytesEnd::new("s:Body")))?;
    write(&mut writer, Event::End(BytesEnd::new("s:Envelope")))?;

    let mut xml = super::envelope::XML_HEADER.to_string();
    xml.push_str(&String::from_utf8_lossy(&writer.into_inner()));
    Ok(xml)
}

pub(crate) fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), SoapError> {
    writer
        .write_event(event)
        .map_err(|e| SoapError::Encode(e.to_string()))
}

pub(crate) fn text_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    value: &str,
) -> Result<(), SoapError> {
    write(writer, Event::Start(BytesStart::new(name)))?;
    write(writer, Event::Text(BytesText::new(value)))?;
    write(writer, Event::End(BytesEnd::new(name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_simple_fault() {
        let xml = build_soap_fault("s:Client", "Invalid Action", None, None).unwrap();

        assert!(xml.contains("<s:Fault>"));
        assert!(xml.contains("<faultcode>s:Client</faultcode>"));
        assert!(xml.contains("<faultstring>Invalid Action</faultstring>"));
        assert!(!xml.contains("UPnPError"));
    }

    #[test]
    fn test_build_upnp_fault() {
        let xml = build_soap_fault("s:Client", "UPnPError", Some("718"), Some("ConflictInMappingEntry"))
            .unwrap();

        assert!(xml.contains("<detail>"));
        assert!(xml.contains(r#"<UPnPError xmlns="urn:schemas-upnp-org:control-1-0">"#));
        assert!(xml.contains("<errorCode>718</errorCode>"));
        assert!(xml.contains("<errorDescription>ConflictInMappingEntry</errorDescription>"));
    }

    #[test]
    fn display_prefers_upnp_detail() {
        let plain = Fault::new("s:Server", "Internal");
        assert_eq!(plain.to_string(), "SOAP fault code=s:Server: message=Internal");
        assert_eq!(plain.error_code(), None);

        let upnp = Fault::with_upnp_error("s:Client", "UPnPError", "714", "NoSuchEntryInArray");
        assert_eq!(upnp.to_string(), "SOAP fault code=714 message=NoSuchEntryInArray");
        assert_eq!(upnp.error_code(), Some(714));
    }
}
