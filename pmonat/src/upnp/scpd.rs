//! SCPD : description des actions et variables d'état d'un service.

use xmltree::Element;

use super::device::{SpecVersion, int_field, list_items};
use super::DescriptionError;
use crate::soap::{child_element, element_text};

/// Namespace par défaut des documents SCPD
pub const SCPD_XML_NAMESPACE: &str = "urn:schemas-upnp-org:service-1-0";

/// Sens d'un argument d'action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScpdArgument {
    pub name: String,
    pub direction: Direction,
    pub related_state_variable: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScpdAction {
    pub name: String,
    pub arguments: Vec<ScpdArgument>,
}

impl ScpdAction {
    pub fn inputs(&self) -> impl Iterator<Item = &ScpdArgument> {
        self.arguments.iter().filter(|a| a.direction == Direction::In)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &ScpdArgument> {
        self.arguments.iter().filter(|a| a.direction == Direction::Out)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateVariable {
    pub name: String,
    pub data_type: String,
    pub send_events: bool,
    pub default_value: Option<String>,
    pub allowed_values: Vec<String>,
}

/// Document SCPD d'un service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scpd {
    pub spec_version: SpecVersion,
    pub actions: Vec<ScpdAction>,
    pub state_variables: Vec<StateVariable>,
}

impl Scpd {
    pub fn from_xml(xml: &[u8]) -> Result<Self, DescriptionError> {
        let root = Element::parse(xml)?;
        if root.name != "scpd" {
            return Err(DescriptionError::UnexpectedRoot {
                expected: "scpd",
                found: root.name,
            });
        }

        let spec_version = match child_element(&root, "specVersion") {
            Some(spec) => SpecVersion {
                major: int_field(spec, "major")?,
                minor: int_field(spec, "minor")?,
            },
            None => SpecVersion::default(),
        };

        let actions = list_items(&root, "actionList", "action")
            .map(|action| -> Result<ScpdAction, DescriptionError> {
                let arguments = list_items(action, "argumentList", "argument")
                    .map(|arg| -> Result<ScpdArgument, DescriptionError> {
                        let direction = match element_text(arg, "direction").as_str() {
                            "in" => Direction::In,
                            "out" => Direction::Out,
                            other => {
                                return Err(DescriptionError::InvalidValue {
                                    field: "direction",
                                    value: other.to_string(),
                                });
                            }
                        };
                        Ok(ScpdArgument {
                            name: element_text(arg, "name"),
                            direction,
                            related_state_variable: element_text(arg, "relatedStateVariable"),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ScpdAction {
                    name: element_text(action, "name"),
                    arguments,
                })
            })
            .collect::<Result<Vec<_>, DescriptionError>>()?;

        let state_variables = list_items(&root, "serviceStateTable", "stateVariable")
            .map(|var| StateVariable {
                name: element_text(var, "name"),
                data_type: element_text(var, "dataType"),
                send_events: var
                    .attributes
                    .get("sendEvents")
                    .is_some_and(|v| v.trim().eq_ignore_ascii_case("yes")),
                default_value: child_element(var, "defaultValue")
                    .map(|_| element_text(var, "defaultValue")),
                allowed_values: list_items(var, "allowedValueList", "allowedValue")
                    .filter_map(|v| v.get_text())
                    .map(|v| v.trim().to_string())
                    .collect(),
            })
            .collect();

        Ok(Self {
            spec_version,
            actions,
            state_variables,
        })
    }

    pub fn action(&self, name: &str) -> Option<&ScpdAction> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn state_variable(&self, name: &str) -> Option<&StateVariable> {
        self.state_variables.iter().find(|v| v.name == name)
    }
}
