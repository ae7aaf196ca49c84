//! Reader for the synthesis JSON netlist schema.
//!
//! The document's top level is `{"modules": {name: {"ports": …, "cells": …,
//! "netnames": …}}}`. Connection bits are integers ≥ 2 (module-local signal
//! indices) or the strings `"0"`, `"1"`, `"x"`, `"z"` for constants.
//! Attribute and parameter numbers must be integers: a fractional value
//! cannot round-trip through its string form and is rejected at parse time.

use crate::reader::{ModuleReader, SigBit};
use kestrel_netlist::{PortDir, Property};
use serde_json::Value;

/// Errors from loading a JSON netlist.
#[derive(Debug, thiserror::Error)]
pub enum JsonError {
    /// The document is not valid JSON.
    #[error("netlist is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// The document does not follow the netlist schema.
    #[error("netlist schema error at {path}: {reason}")]
    Schema {
        /// Where in the document.
        path: String,
        /// What was wrong.
        reason: String,
    },

    /// A numeric attribute or parameter value is not an integer.
    #[error("non-integer number for {path}: {value} cannot round-trip to a string")]
    FractionalNumber {
        /// The attribute/parameter path.
        path: String,
        /// The offending value.
        value: f64,
    },
}

/// A parsed JSON netlist implementing [`ModuleReader`].
#[derive(Debug)]
pub struct JsonReader {
    doc: Value,
}

impl JsonReader {
    /// Parses and validates a JSON netlist document.
    pub fn from_str(text: &str) -> Result<Self, JsonError> {
        let doc: Value = serde_json::from_str(text)?;
        let modules = doc.get("modules").ok_or_else(|| JsonError::Schema {
            path: "$".to_string(),
            reason: "missing \"modules\" object".to_string(),
        })?;
        let Some(modules) = modules.as_object() else {
            return Err(JsonError::Schema {
                path: "$.modules".to_string(),
                reason: "\"modules\" is not an object".to_string(),
            });
        };
        // Validate every attribute/parameter number up front so the
        // infallible reader callbacks never meet a bad value.
        for (mod_name, module) in modules {
            for section in ["attributes", "parameters"] {
                if let Some(map) = module.get(section).and_then(Value::as_object) {
                    for (key, value) in map {
                        check_number(value, &format!("{mod_name}.{section}.{key}"))?;
                    }
                }
            }
            if let Some(cells) = module.get("cells").and_then(Value::as_object) {
                for (cell_name, cell) in cells {
                    for section in ["attributes", "parameters"] {
                        if let Some(map) = cell.get(section).and_then(Value::as_object) {
                            for (key, value) in map {
                                check_number(
                                    value,
                                    &format!("{mod_name}.{cell_name}.{section}.{key}"),
                                )?;
                            }
                        }
                    }
                }
            }
        }
        Ok(Self { doc })
    }

    fn modules(&self) -> &serde_json::Map<String, Value> {
        // Checked during from_str.
        self.doc["modules"].as_object().unwrap_or_else(|| {
            unreachable!("modules object validated at parse time")
        })
    }
}

fn check_number(value: &Value, path: &str) -> Result<(), JsonError> {
    if let Value::Number(n) = value {
        if n.as_i64().is_none() && n.as_u64().is_none() {
            return Err(JsonError::FractionalNumber {
                path: path.to_string(),
                value: n.as_f64().unwrap_or(f64::NAN),
            });
        }
    }
    Ok(())
}

fn to_property(value: &Value) -> Property {
    match value {
        Value::Number(n) => Property::Int(n.as_i64().unwrap_or(0)),
        Value::String(s) => Property::Str(s.clone()),
        Value::Bool(b) => Property::Int(*b as i64),
        other => Property::Str(other.to_string()),
    }
}

fn to_dir(s: &str) -> PortDir {
    match s {
        "input" => PortDir::In,
        "output" => PortDir::Out,
        _ => PortDir::InOut,
    }
}

fn to_bits(value: &Value) -> Vec<SigBit> {
    let Some(array) = value.as_array() else {
        return Vec::new();
    };
    array
        .iter()
        .map(|bit| match bit {
            Value::Number(n) => SigBit::Net(n.as_i64().unwrap_or(0) as i32),
            Value::String(s) => SigBit::Const(s.chars().next().unwrap_or('x')),
            _ => SigBit::Const('x'),
        })
        .collect()
}

fn attrs_of(obj: &Value, section: &str, f: &mut dyn FnMut(&str, &Property)) {
    if let Some(map) = obj.get(section).and_then(Value::as_object) {
        for (key, value) in map {
            f(key, &to_property(value));
        }
    }
}

impl ModuleReader for JsonReader {
    type Module = Value;
    type Port = Value;
    type Cell = Value;
    type NetName = Value;

    fn for_each_module(&self, f: &mut dyn FnMut(&str, &Value)) {
        for (name, module) in self.modules() {
            f(name, module);
        }
    }

    fn for_each_port(&self, module: &Value, f: &mut dyn FnMut(&str, &Value)) {
        if let Some(ports) = module.get("ports").and_then(Value::as_object) {
            for (name, port) in ports {
                f(name, port);
            }
        }
    }

    fn for_each_cell(&self, module: &Value, f: &mut dyn FnMut(&str, &Value)) {
        if let Some(cells) = module.get("cells").and_then(Value::as_object) {
            for (name, cell) in cells {
                f(name, cell);
            }
        }
    }

    fn for_each_netname(&self, module: &Value, f: &mut dyn FnMut(&str, &Value)) {
        if let Some(nets) = module.get("netnames").and_then(Value::as_object) {
            for (name, net) in nets {
                f(name, net);
            }
        }
    }

    fn for_each_module_attr(&self, module: &Value, f: &mut dyn FnMut(&str, &Property)) {
        attrs_of(module, "attributes", f);
    }

    fn is_blackbox(&self, module: &Value) -> bool {
        module
            .get("attributes")
            .and_then(|a| a.get("blackbox").or_else(|| a.get("whitebox")))
            .and_then(Value::as_i64)
            .unwrap_or(0)
            != 0
    }

    fn port_dir(&self, port: &Value) -> PortDir {
        to_dir(port.get("direction").and_then(Value::as_str).unwrap_or(""))
    }

    fn port_bits(&self, port: &Value) -> Vec<SigBit> {
        port.get("bits").map(to_bits).unwrap_or_default()
    }

    fn port_offset(&self, port: &Value) -> i32 {
        port.get("offset").and_then(Value::as_i64).unwrap_or(0) as i32
    }

    fn port_upto(&self, port: &Value) -> bool {
        port.get("upto").and_then(Value::as_i64).unwrap_or(0) != 0
    }

    fn cell_type(&self, cell: &Value) -> String {
        cell.get("type")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string()
    }

    fn for_each_cell_port_dir(&self, cell: &Value, f: &mut dyn FnMut(&str, PortDir)) {
        if let Some(dirs) = cell.get("port_directions").and_then(Value::as_object) {
            for (name, dir) in dirs {
                f(name, to_dir(dir.as_str().unwrap_or("")));
            }
        }
    }

    fn for_each_cell_conn(&self, cell: &Value, f: &mut dyn FnMut(&str, &[SigBit])) {
        if let Some(conns) = cell.get("connections").and_then(Value::as_object) {
            for (name, bits) in conns {
                f(name, &to_bits(bits));
            }
        }
    }

    fn for_each_cell_attr(&self, cell: &Value, f: &mut dyn FnMut(&str, &Property)) {
        attrs_of(cell, "attributes", f);
    }

    fn for_each_cell_param(&self, cell: &Value, f: &mut dyn FnMut(&str, &Property)) {
        attrs_of(cell, "parameters", f);
    }

    fn netname_bits(&self, net: &Value) -> Vec<SigBit> {
        net.get("bits").map(to_bits).unwrap_or_default()
    }

    fn netname_offset(&self, net: &Value) -> i32 {
        net.get("offset").and_then(Value::as_i64).unwrap_or(0) as i32
    }

    fn netname_upto(&self, net: &Value) -> bool {
        net.get("upto").and_then(Value::as_i64).unwrap_or(0) != 0
    }

    fn for_each_net_attr(&self, net: &Value, f: &mut dyn FnMut(&str, &Property)) {
        attrs_of(net, "attributes", f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::GenericFrontend;
    use kestrel_arch::ScampArch;
    use kestrel_context::{verify, Context};

    const INVERTER: &str = r#"{
      "modules": {
        "top": {
          "ports": {
            "din": { "direction": "input", "bits": [2] },
            "dout": { "direction": "output", "bits": [3] }
          },
          "cells": {
            "inv": {
              "type": "LUT4",
              "port_directions": { "I0": "input", "O": "output" },
              "connections": { "I0": [2], "O": [3] },
              "parameters": { "INIT": 21845 }
            }
          },
          "netnames": {
            "din": { "bits": [2] },
            "dout": { "bits": [3] }
          }
        }
      }
    }"#;

    #[test]
    fn parse_and_import_inverter() {
        let reader = JsonReader::from_str(INVERTER).unwrap();
        let mut ctx = Context::new(ScampArch::new(4, 4).build_chipdb());
        GenericFrontend::import(&mut ctx, &reader, None).unwrap();
        assert_eq!(ctx.design.cells.len(), 3);
        let inv = ctx.design.cell_id(ctx.id("inv")).unwrap();
        let init = ctx.design.cells[inv].params[&kestrel_common::constids::INIT].clone();
        assert_eq!(init.as_int(), Some(21845));
        verify::assert_valid(&ctx);
    }

    #[test]
    fn missing_modules_is_schema_error() {
        let err = JsonReader::from_str("{}").unwrap_err();
        assert!(matches!(err, JsonError::Schema { .. }));
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let err = JsonReader::from_str("not json").unwrap_err();
        assert!(matches!(err, JsonError::Parse(_)));
    }

    #[test]
    fn fractional_parameter_is_fatal() {
        let text = r#"{
          "modules": {
            "top": {
              "cells": {
                "c": { "type": "LUT4", "parameters": { "GAIN": 1.5 } }
              }
            }
          }
        }"#;
        let err = JsonReader::from_str(text).unwrap_err();
        match err {
            JsonError::FractionalNumber { path, value } => {
                assert!(path.contains("GAIN"));
                assert_eq!(value, 1.5);
            }
            other => panic!("expected FractionalNumber, got {other:?}"),
        }
    }

    #[test]
    fn constant_bits_parse_as_consts() {
        let reader = JsonReader::from_str(
            r#"{
          "modules": {
            "top": {
              "ports": { "q": { "direction": "output", "bits": ["1"] } }
            }
          }
        }"#,
        )
        .unwrap();
        let mut found = Vec::new();
        reader.for_each_module(&mut |_, module| {
            reader.for_each_port(module, &mut |_, port| {
                found = reader.port_bits(port);
            });
        });
        assert_eq!(found, vec![SigBit::Const('1')]);
    }

    #[test]
    fn blackbox_detection() {
        let reader = JsonReader::from_str(
            r#"{
          "modules": {
            "bb": { "attributes": { "blackbox": 1 } },
            "top": {}
          }
        }"#,
        )
        .unwrap();
        let mut boxes = Vec::new();
        reader.for_each_module(&mut |name, module| {
            if reader.is_blackbox(module) {
                boxes.push(name.to_string());
            }
        });
        assert_eq!(boxes, vec!["bb"]);
    }
}
