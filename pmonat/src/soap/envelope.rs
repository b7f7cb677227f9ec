//! Enveloppe SOAP : encodage des requêtes et décodage des réponses.

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use xmltree::{Element, XMLNode};

use super::args::{ActionArgs, DecodedArgs, FromSoapArgs};
use super::fault::{Fault, text_element, write};
use super::SoapError;

/// Namespace de l'enveloppe SOAP 1.1
pub const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Style d'encodage SOAP annoncé sur l'enveloppe
pub const SOAP_ENCODING_STYLE: &str = "http://schemas.xmlsoap.org/soap/encoding/";

pub(crate) const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

const ENVELOPE_OPEN: &str = concat!(
    "<s:Envelope xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\" ",
    "s:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\"><s:Body>"
);

const ENVELOPE_CLOSE: &str = "</s:Body></s:Envelope>";

/// Action SOAP à envoyer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    namespace: String,
    name: Option<String>,
    args: ActionArgs,
}

impl Action {
    /// Action dont le nom est déduit des arguments.
    pub fn new(namespace: impl Into<String>, args: ActionArgs) -> Self {
        Self {
            namespace: namespace.into(),
            name: None,
            args,
        }
    }

    /// Fixe explicitement le nom d'action, prioritaire sur tout le reste.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into()).filter(|n: &String| !n.is_empty());
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Nom effectif : nom explicite, puis nom porté par les arguments.
    /// Chaîne vide si aucun n'est disponible.
    pub fn name(&self) -> &str {
        self.name
            .as_deref()
            .or_else(|| self.args.implicit_name())
            .unwrap_or_default()
    }

    pub fn args(&self) -> &ActionArgs {
        &self.args
    }

    /// Valeur de l'en-tête `SOAPAction`, guillemets compris.
    pub fn soap_action_header(&self) -> String {
        format!("\"{}#{}\"", self.namespace(), self.name())
    }
}

/// Encode une requête SOAP complète.
///
/// L'en-tête et le pied de l'enveloppe sont fixes ; tous les arguments sont
/// écrits dans l'ordre, valeurs nulles comprises.
pub fn encode_action(action: &Action) -> Result<String, SoapError> {
    let name = action.name();
    if !is_xml_name(name) {
        return Err(SoapError::InvalidName(name.to_string()));
    }

    let qname = format!("u:{name}");
    let mut writer = Writer::new(Vec::new());

    let mut start = BytesStart::new(qname.as_str());
    start.push_attribute(("xmlns:u", action.namespace()));
    write(&mut writer, Event::Start(start))?;

    for (key, value) in action.args().entries() {
        if !is_xml_name(key) {
            return Err(SoapError::InvalidName(key.to_string()));
        }
        text_element(&mut writer, key, value)?;
    }

    write(&mut writer, Event::End(BytesEnd::new(qname.as_str())))?;

    let body = String::from_utf8(writer.into_inner())
        .map_err(|e| SoapError::Encode(e.to_string()))?;

    let mut xml = String::with_capacity(
        XML_HEADER.len() + ENVELOPE_OPEN.len() + body.len() + ENVELOPE_CLOSE.len(),
    );
    xml.push_str(XML_HEADER);
    xml.push_str(ENVELOPE_OPEN);
    xml.push_str(&body);
    xml.push_str(ENVELOPE_CLOSE);
    Ok(xml)
}

/// Nom d'élément acceptable tel quel dans le XML produit.
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Enveloppe SOAP décodée.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    pub encoding_style: Option<String>,
    pub fault: Option<Fault>,
    /// Premier élément du Body qui n'est pas un Fault.
    pub action: Option<Element>,
}

impl Envelope {
    /// Enveloppe sans fault ni action (réponse vide).
    pub fn is_empty(&self) -> bool {
        self.fault.is_none() && self.action.is_none()
    }

    /// Le fault l'emporte sur le payload d'action.
    pub fn into_result(self) -> Result<Option<DecodedArgs>, SoapError> {
        if let Some(fault) = self.fault {
            return Err(SoapError::Fault(fault));
        }
        self.action
            .as_ref()
            .map(DecodedArgs::from_element)
            .transpose()
    }
}

/// Décode une réponse SOAP.
///
/// Un corps vide (ou blanc) donne une enveloppe vide. Sinon l'élément racine
/// doit être `Envelope` et contenir un `Body`.
pub fn decode_envelope(xml: &[u8]) -> Result<Envelope, SoapError> {
    if xml.iter().all(u8::is_ascii_whitespace) {
        return Ok(Envelope::default());
    }

    let root = Element::parse(xml)?;
    if root.name != "Envelope" {
        return Err(SoapError::MissingEnvelope(root.name));
    }

    let body = child_element(&root, "Body").ok_or(SoapError::MissingBody)?;

    let mut envelope = Envelope {
        encoding_style: root
            .attributes
            .iter()
            .find(|(name, _)| name.ends_with("encodingStyle"))
            .map(|(_, value)| value.clone()),
        ..Envelope::default()
    };

    for child in body.children.iter().filter_map(XMLNode::as_element) {
        if child.name == "Fault" {
            if envelope.fault.is_none() {
                envelope.fault = Some(Fault::from_element(child));
            }
        } else if envelope.action.is_none() {
            envelope.action = Some(child.clone());
        }
    }

    Ok(envelope)
}

/// Décode une réponse SOAP vers le type de sortie attendu.
///
/// Sans élément d'action, la sortie est construite depuis des arguments
/// vides.
pub fn decode_action<T: FromSoapArgs>(xml: &[u8]) -> Result<T, SoapError> {
    match decode_envelope(xml)?.into_result()? {
        Some(args) => T::from_args(&args),
        None => T::from_args(&DecodedArgs::default()),
    }
}

/// Premier enfant direct portant ce nom local.
pub(crate) fn child_element<'a>(elem: &'a Element, name: &str) -> Option<&'a Element> {
    elem.children
        .iter()
        .filter_map(XMLNode::as_element)
        .find(|child| child.name == name)
}

/// Texte (sans blancs autour) du premier enfant portant ce nom local,
/// chaîne vide s'il est absent.
pub(crate) fn element_text(elem: &Element, name: &str) -> String {
    child_element(elem, name)
        .and_then(|child| child.get_text())
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}
