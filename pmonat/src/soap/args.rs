//! Arguments d'actions SOAP : encodage des valeurs et décodage strict.
//!
//! Un payload est soit une structure déclarée avec [`define_soap_args!`]
//! (champs ordonnés, nom d'élément XML par champ), soit une liste
//! clé/valeur. Les deux passent par [`ActionArgs`] avant d'être écrits.

use std::collections::{BTreeMap, HashMap};

use xmltree::{Element, XMLNode};

use super::SoapError;

/// Conversion d'une valeur Rust vers et depuis le texte d'un argument SOAP.
pub trait SoapValue: Sized {
    fn to_soap(&self) -> String;
    fn from_soap(text: &str) -> Result<Self, String>;
}

impl SoapValue for String {
    fn to_soap(&self) -> String {
        self.clone()
    }

    fn from_soap(text: &str) -> Result<Self, String> {
        Ok(text.to_string())
    }
}

impl SoapValue for bool {
    fn to_soap(&self) -> String {
        String::from(if *self { "1" } else { "0" })
    }

    fn from_soap(text: &str) -> Result<Self, String> {
        match text.trim() {
            "" => Ok(false),
            "1" | "t" | "T" | "true" | "TRUE" | "True" | "yes" => Ok(true),
            "0" | "f" | "F" | "false" | "FALSE" | "False" | "no" => Ok(false),
            other => Err(format!("invalid boolean {other:?}")),
        }
    }
}

macro_rules! impl_soap_value_int {
    ($($ty:ty),*) => {
        $(
            impl SoapValue for $ty {
                fn to_soap(&self) -> String {
                    self.to_string()
                }

                fn from_soap(text: &str) -> Result<Self, String> {
                    let text = text.trim();
                    if text.is_empty() {
                        return Ok(0);
                    }
                    text.parse::<$ty>().map_err(|e| format!("{text:?}: {e}"))
                }
            }
        )*
    };
}

impl_soap_value_int!(u8, u16, u32, u64, i32, i64);

/// Payload issu d'une structure déclarée.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructArgs {
    /// Nom du type Rust, dernier recours pour le nom d'action.
    pub type_name: &'static str,
    /// Nom d'action déclaré avec la structure.
    pub action_tag: Option<&'static str>,
    /// Nom d'action fourni à l'exécution, prioritaire sur le tag.
    pub action_override: Option<String>,
    /// Champs dans l'ordre de déclaration : (élément XML, texte).
    pub fields: Vec<(&'static str, String)>,
}

impl StructArgs {
    pub fn with_action_name(mut self, name: impl Into<String>) -> Self {
        self.action_override = Some(name.into());
        self
    }
}

/// Arguments d'une action, structure ou liste clé/valeur.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionArgs {
    Struct(StructArgs),
    /// Les clés sont des noms d'éléments ; l'ordre est celui d'écriture.
    Map(Vec<(String, String)>),
}

impl Default for ActionArgs {
    fn default() -> Self {
        ActionArgs::Struct(StructArgs::default())
    }
}

impl ActionArgs {
    /// Payload vide.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Payload clé/valeur, dans l'ordre de l'itérateur.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: SoapValue,
        I: IntoIterator<Item = (K, V)>,
    {
        ActionArgs::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.to_soap()))
                .collect(),
        )
    }

    /// Nom d'action porté par le payload lui-même : surcharge, puis tag,
    /// puis nom du type. Une liste clé/valeur n'en porte aucun.
    pub fn implicit_name(&self) -> Option<&str> {
        match self {
            ActionArgs::Struct(args) => args
                .action_override
                .as_deref()
                .filter(|name| !name.is_empty())
                .or(args.action_tag)
                .or(Some(args.type_name).filter(|name| !name.is_empty())),
            ActionArgs::Map(_) => None,
        }
    }

    /// Paires (élément, texte) dans l'ordre d'écriture.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        match self {
            ActionArgs::Struct(args) => args
                .fields
                .iter()
                .map(|(k, v)| (*k, v.as_str()))
                .collect(),
            ActionArgs::Map(entries) => entries
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
        }
    }
}

/// Types utilisables comme arguments d'entrée.
pub trait SoapArgs {
    fn to_args(&self) -> ActionArgs;
}

impl SoapArgs for () {
    fn to_args(&self) -> ActionArgs {
        ActionArgs::empty()
    }
}

impl SoapArgs for ActionArgs {
    fn to_args(&self) -> ActionArgs {
        self.clone()
    }
}

impl<V: SoapValue> SoapArgs for Vec<(String, V)> {
    fn to_args(&self) -> ActionArgs {
        ActionArgs::Map(self.iter().map(|(k, v)| (k.clone(), v.to_soap())).collect())
    }
}

impl<V: SoapValue> SoapArgs for BTreeMap<String, V> {
    fn to_args(&self) -> ActionArgs {
        ActionArgs::Map(self.iter().map(|(k, v)| (k.clone(), v.to_soap())).collect())
    }
}

/// L'ordre d'écriture suit l'itération de la table, il n'est pas garanti.
impl<V: SoapValue> SoapArgs for HashMap<String, V> {
    fn to_args(&self) -> ActionArgs {
        ActionArgs::Map(self.iter().map(|(k, v)| (k.clone(), v.to_soap())).collect())
    }
}

/// Arguments extraits de l'élément d'action d'une réponse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedArgs {
    /// Nom local de l'élément d'action (ex: "GetExternalIPAddressResponse").
    pub action: String,
    pub namespace: Option<String>,
    entries: Vec<(String, String)>,
}

impl DecodedArgs {
    /// Lit les arguments enfants de l'élément d'action.
    ///
    /// Refuse les attributs et les namespaces sur les arguments, le texte
    /// non blanc hors des arguments, les instructions de traitement et les
    /// éléments imbriqués. Les commentaires sont ignorés.
    pub fn from_element(elem: &Element) -> Result<Self, SoapError> {
        let mut entries = Vec::new();

        for node in &elem.children {
            match node {
                XMLNode::Element(arg) => {
                    if !arg.attributes.is_empty() {
                        return Err(SoapError::UnexpectedAttribute(format!(
                            "{:?}",
                            arg.attributes
                        )));
                    }
                    if let Some(ns) = arg.namespace.as_deref().filter(|ns| !ns.is_empty()) {
                        return Err(SoapError::UnexpectedNamespace(ns.to_string()));
                    }
                    entries.push((arg.name.clone(), arg_text(arg)?));
                }
                XMLNode::Text(text) | XMLNode::CData(text) => {
                    if !text.trim().is_empty() {
                        return Err(SoapError::StrayText(text.clone()));
                    }
                }
                XMLNode::Comment(_) => {}
                XMLNode::ProcessingInstruction(name, _) => {
                    return Err(SoapError::UnexpectedToken(format!("<?{name}?>")));
                }
            }
        }

        Ok(Self {
            action: elem.name.clone(),
            namespace: elem.namespace.clone(),
            entries,
        })
    }

    /// Texte brut d'un argument.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Valeur typée d'un argument, `None` s'il est absent.
    pub fn value<V: SoapValue>(&self, name: &str) -> Result<Option<V>, SoapError> {
        self.get(name)
            .map(|text| {
                V::from_soap(text).map_err(|reason| SoapError::InvalidValue {
                    name: name.to_string(),
                    reason,
                })
            })
            .transpose()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn arg_text(arg: &Element) -> Result<String, SoapError> {
    let mut text = String::new();
    for node in &arg.children {
        match node {
            XMLNode::Text(t) | XMLNode::CData(t) => text.push_str(t),
            XMLNode::Comment(_) => {}
            XMLNode::Element(nested) => {
                return Err(SoapError::UnexpectedToken(format!(
                    "<{}> inside argument {}",
                    nested.name, arg.name
                )));
            }
            XMLNode::ProcessingInstruction(name, _) => {
                return Err(SoapError::UnexpectedToken(format!("<?{name}?>")));
            }
        }
    }
    Ok(text)
}

/// Convertit chaque argument vers le type de valeur `V`, dans l'ordre.
pub fn decode_map<V: SoapValue>(args: &DecodedArgs) -> Result<Vec<(String, V)>, SoapError> {
    args.iter()
        .map(|(name, text)| {
            V::from_soap(text)
                .map(|value| (name.to_string(), value))
                .map_err(|reason| SoapError::InvalidValue {
                    name: name.to_string(),
                    reason,
                })
        })
        .collect()
}

/// Types constructibles depuis les arguments d'une réponse.
pub trait FromSoapArgs: Sized {
    fn from_args(args: &DecodedArgs) -> Result<Self, SoapError>;
}

impl FromSoapArgs for () {
    fn from_args(_args: &DecodedArgs) -> Result<Self, SoapError> {
        Ok(())
    }
}

impl FromSoapArgs for DecodedArgs {
    fn from_args(args: &DecodedArgs) -> Result<Self, SoapError> {
        Ok(args.clone())
    }
}

impl<V: SoapValue> FromSoapArgs for Vec<(String, V)> {
    fn from_args(args: &DecodedArgs) -> Result<Self, SoapError> {
        decode_map(args)
    }
}

impl<V: SoapValue> FromSoapArgs for BTreeMap<String, V> {
    fn from_args(args: &DecodedArgs) -> Result<Self, SoapError> {
        Ok(decode_map(args)?.into_iter().collect())
    }
}

impl<V: SoapValue> FromSoapArgs for HashMap<String, V> {
    fn from_args(args: &DecodedArgs) -> Result<Self, SoapError> {
        Ok(decode_map(args)?.into_iter().collect())
    }
}

/// Déclare une structure d'arguments SOAP
///
/// # Syntaxe
///
/// ```ignore
/// define_soap_args! {
///     /// Requête DeletePortMapping
///     pub struct DeletePortMappingRequest : "DeletePortMapping" {
///         "NewRemoteHost" => remote_host: String,
///         "NewExternalPort" => external_port: u16,
///         "NewProtocol" => protocol: String,
///     }
/// }
/// ```
///
/// Le nom d'action après `:` est optionnel ; sans lui, le nom du type sert
/// de nom d'action implicite. Les champs sont écrits dans l'ordre déclaré,
/// valeurs nulles comprises. Au décodage, un champ absent garde sa valeur
/// par défaut.
#[macro_export]
macro_rules! define_soap_args {
    // Helpers internes pour le tag d'action
    (@tag) => {
        None
    };

    (@tag $action:literal) => {
        Some($action)
    };

    (
        $(#[$meta:meta])*
        pub struct $name:ident $(: $action:literal)? {
            $(
                $(#[$fmeta:meta])*
                $xml:literal => $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name {
            $(
                $(#[$fmeta])*
                pub $field: $ty,
            )*
        }

        impl $crate::soap::SoapArgs for $name {
            fn to_args(&self) -> $crate::soap::ActionArgs {
                $crate::soap::ActionArgs::Struct($crate::soap::StructArgs {
                    type_name: stringify!($name),
                    action_tag: $crate::define_soap_args!(@tag $($action)?),
                    action_override: None,
                    fields: vec![
                        $( ($xml, $crate::soap::SoapValue::to_soap(&self.$field)), )*
                    ],
                })
            }
        }

        impl $crate::soap::FromSoapArgs for $name {
            fn from_args(
                args: &$crate::soap::DecodedArgs,
            ) -> Result<Self, $crate::soap::SoapError> {
                #[allow(unused_mut)]
                let mut out = Self::default();
                $(
                    if let Some(value) = args.value($xml)? {
                        out.$field = value;
                    }
                )*
                let _ = args;
                Ok(out)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::define_soap_args! {
        /// Structure sans tag d'action
        pub struct PlainArgs {
            "Foo" => foo: String,
            "Count" => count: u32,
            "Flag" => flag: bool,
        }
    }

    crate::define_soap_args! {
        pub struct TaggedArgs : "DoThing" {
            "Foo" => foo: String,
        }
    }

    fn parse(xml: &str) -> Element {
        Element::parse(xml.as_bytes()).unwrap()
    }

    #[test]
    fn struct_fields_keep_declaration_order_and_zero_values() {
        let args = PlainArgs {
            foo: "bar".to_string(),
            ..PlainArgs::default()
        }
        .to_args();

        assert_eq!(
            args.entries(),
            vec![("Foo", "bar"), ("Count", "0"), ("Flag", "0")]
        );
    }

    #[test]
    fn implicit_name_resolution_order() {
        assert_eq!(PlainArgs::default().to_args().implicit_name(), Some("PlainArgs"));
        assert_eq!(TaggedArgs::default().to_args().implicit_name(), Some("DoThing"));

        let overridden = match TaggedArgs::default().to_args() {
            ActionArgs::Struct(args) => ActionArgs::Struct(args.with_action_name("Other")),
            other => other,
        };
        assert_eq!(overridden.implicit_name(), Some("Other"));

        assert_eq!(ActionArgs::map([("Foo", 1u8)]).implicit_name(), None);
        assert_eq!(ActionArgs::empty().implicit_name(), None);
    }

    #[test]
    fn struct_decoding_fills_present_fields() {
        let elem = parse(
            r#"<u:R xmlns:u="urn:x"><!-- c --><Foo>bar</Foo><Count> 42 </Count><Unknown>x</Unknown></u:R>"#,
        );
        let decoded = DecodedArgs::from_element(&elem).unwrap();
        assert_eq!(decoded.action, "R");
        assert_eq!(decoded.namespace.as_deref(), Some("urn:x"));

        let args = PlainArgs::from_args(&decoded).unwrap();
        assert_eq!(
            args,
            PlainArgs {
                foo: "bar".to_string(),
                count: 42,
                flag: false
            }
        );
    }

    #[test]
    fn invalid_value_names_the_argument() {
        let elem = parse(r#"<u:R xmlns:u="urn:x"><Count>many</Count></u:R>"#);
        let decoded = DecodedArgs::from_element(&elem).unwrap();
        match PlainArgs::from_args(&decoded) {
            Err(SoapError::InvalidValue { name, .. }) => assert_eq!(name, "Count"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn map_decoding_requires_concrete_values() {
        let elem = parse(r#"<u:R xmlns:u="urn:x"><A>1</A><B>2</B></u:R>"#);
        let decoded = DecodedArgs::from_element(&elem).unwrap();

        let values: Vec<(String, u16)> = decode_map(&decoded).unwrap();
        assert_eq!(values, vec![("A".to_string(), 1), ("B".to_string(), 2)]);

        let elem = parse(r#"<u:R xmlns:u="urn:x"><A>1</A><B>deux</B></u:R>"#);
        let decoded = DecodedArgs::from_element(&elem).unwrap();
        assert!(decode_map::<u16>(&decoded).is_err());
        assert_eq!(decode_map::<String>(&decoded).unwrap().len(), 2);
    }

    #[test]
    fn strict_decoding_rejects_attributes() {
        let elem = parse(r#"<u:R xmlns:u="urn:x"><A kind="x">1</A></u:R>"#);
        assert!(matches!(
            DecodedArgs::from_element(&elem),
            Err(SoapError::UnexpectedAttribute(_))
        ));
    }

    #[test]
    fn strict_decoding_rejects_namespaced_args() {
        let elem = parse(r#"<u:R xmlns:u="urn:x"><u:A>1</u:A></u:R>"#);
        assert!(matches!(
            DecodedArgs::from_element(&elem),
            Err(SoapError::UnexpectedNamespace(ns)) if ns == "urn:x"
        ));
    }

    #[test]
    fn strict_decoding_rejects_stray_text() {
        let elem = parse(r#"<u:R xmlns:u="urn:x">oops<A>1</A></u:R>"#);
        assert!(matches!(
            DecodedArgs::from_element(&elem),
            Err(SoapError::StrayText(text)) if text == "oops"
        ));
    }

    #[test]
    fn bool_and_int_values() {
        assert_eq!(true.to_soap(), "1");
        assert!(bool::from_soap("true").unwrap());
        assert!(!bool::from_soap(" 0 ").unwrap());
        assert!(bool::from_soap("maybe").is_err());
        assert_eq!(u16::from_soap("").unwrap(), 0);
        assert!(u8::from_soap("300").is_err());
        assert_eq!(i64::from_soap("-5").unwrap(), -5);
    }
}
