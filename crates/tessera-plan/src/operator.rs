use serde::{Deserialize, Serialize};

/// A named port on an operator.
///
/// The position of a port within its operator's input or output list is the
/// ordinal the backend uses to address it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortDescriptor {
  #[serde(rename = "portID")]
  pub port_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub display_name: Option<String>,
  #[serde(default)]
  pub allow_multi_inputs: bool,
  #[serde(default)]
  pub is_dynamic_port: bool,
}

impl PortDescriptor {
  pub fn new(port_id: impl Into<String>) -> Self {
    Self {
      port_id: port_id.into(),
      display_name: None,
      allow_multi_inputs: false,
      is_dynamic_port: false,
    }
  }
}

/// An operator as the editor holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorPredicate {
  #[serde(rename = "operatorID")]
  pub operator_id: String,
  pub operator_type: String,
  #[serde(default)]
  pub operator_properties: serde_json::Map<String, serde_json::Value>,
  #[serde(default)]
  pub input_ports: Vec<PortDescriptor>,
  #[serde(default)]
  pub output_ports: Vec<PortDescriptor>,
  /// Disabled operators stay on the canvas but are never submitted.
  #[serde(default)]
  pub is_disabled: bool,
}

impl OperatorPredicate {
  pub fn new(operator_id: impl Into<String>, operator_type: impl Into<String>) -> Self {
    Self {
      operator_id: operator_id.into(),
      operator_type: operator_type.into(),
      operator_properties: serde_json::Map::new(),
      input_ports: Vec::new(),
      output_ports: Vec::new(),
      is_disabled: false,
    }
  }

  pub fn with_input_port(mut self, port_id: impl Into<String>) -> Self {
    self.input_ports.push(PortDescriptor::new(port_id));
    self
  }

  pub fn with_output_port(mut self, port_id: impl Into<String>) -> Self {
    self.output_ports.push(PortDescriptor::new(port_id));
    self
  }

  pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
    self.operator_properties.insert(key.into(), value);
    self
  }

  /// Position of the named input port, if present.
  pub fn input_port_ordinal(&self, port_id: &str) -> Option<usize> {
    self.input_ports.iter().position(|p| p.port_id == port_id)
  }

  /// Position of the named output port, if present.
  pub fn output_port_ordinal(&self, port_id: &str) -> Option<usize> {
    self.output_ports.iter().position(|p| p.port_id == port_id)
  }
}

/// One end of a link: an operator and one of its named ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEndpoint {
  #[serde(rename = "operatorID")]
  pub operator_id: String,
  #[serde(rename = "portID")]
  pub port_id: String,
}

/// A link between two operator ports as the editor holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorLink {
  #[serde(rename = "linkID")]
  pub link_id: String,
  pub source: LinkEndpoint,
  pub target: LinkEndpoint,
}

impl OperatorLink {
  pub fn new(
    link_id: impl Into<String>,
    source: (&str, &str),
    target: (&str, &str),
  ) -> Self {
    Self {
      link_id: link_id.into(),
      source: LinkEndpoint {
        operator_id: source.0.to_string(),
        port_id: source.1.to_string(),
      },
      target: LinkEndpoint {
        operator_id: target.0.to_string(),
        port_id: target.1.to_string(),
      },
    }
  }
}
