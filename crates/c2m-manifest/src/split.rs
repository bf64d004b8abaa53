//! Wire format of a deployment manifest.
//!
//! The edge runtime reads create-options as JSON text spread over at most
//! eight string fields of 512 bytes each: `createOptions`, `createOptions01`
//! up to `createOptions07`. This module turns a manifest template into that
//! form.

use std::io;

use c2m_common::constants::{
    CREATE_OPTIONS_BLOCK_SIZE, CREATE_OPTIONS_FIELD, CREATE_OPTIONS_LIMIT, SCHEMA_TEMPLATE_KEY,
};
use c2m_common::error::{ConvertError, Result};
use serde::Serialize;
use serde_json::{Map, Value};

const AGENT_DESIRED: &str = "/modulesContent/$edgeAgent/properties.desired";

/// Escapes every non-ASCII character as `\uXXXX` so byte and character
/// lengths agree.
struct AsciiFormatter;

impl serde_json::ser::Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut units = [0u16; 2];
        for c in fragment.chars() {
            if c.is_ascii() {
                let mut buf = [0u8; 1];
                writer.write_all(c.encode_utf8(&mut buf).as_bytes())?;
            } else {
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}

/// Serializes a value as compact, ASCII-only JSON.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
pub fn wire_string(value: &Value) -> Result<String> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, AsciiFormatter);
    value.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|e| ConvertError::Config {
        message: format!("create-options serialized to invalid UTF-8: {e}"),
    })
}

/// Splits serialized create-options into `(field name, chunk)` pairs.
///
/// # Errors
///
/// Returns [`ConvertError::SizeLimit`] if `serialized` is not strictly
/// shorter than the runtime limit, or [`ConvertError::Config`] if it is not
/// ASCII (see [`wire_string`]).
pub fn split_create_options(module: &str, serialized: &str) -> Result<Vec<(String, String)>> {
    if !serialized.is_ascii() {
        return Err(ConvertError::Config {
            message: format!("createOptions of module \"{module}\" must be ASCII-escaped before splitting"),
        });
    }
    if serialized.len() >= CREATE_OPTIONS_LIMIT {
        return Err(ConvertError::SizeLimit {
            module: module.to_string(),
            size: serialized.len(),
            limit: CREATE_OPTIONS_LIMIT,
        });
    }
    Ok(chunks(serialized, CREATE_OPTIONS_BLOCK_SIZE)
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| (field_name(i), chunk.to_string()))
        .collect())
}

/// Name of the `index`-th create-options field.
pub fn field_name(index: usize) -> String {
    if index == 0 {
        CREATE_OPTIONS_FIELD.to_string()
    } else {
        format!("{CREATE_OPTIONS_FIELD}{index:02}")
    }
}

fn chunks(s: &str, size: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = s;
    while !rest.is_empty() {
        let mut end = size.min(rest.len());
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        let (head, tail) = rest.split_at(end);
        out.push(head);
        rest = tail;
    }
    out
}

/// Converts a manifest template into its wire form.
///
/// Removes the template marker, splits every module's create-options, and
/// blanks user module images that still hold an unresolved `$` placeholder.
///
/// # Errors
///
/// Returns an error if the template lacks the edge agent section or if any
/// module's create-options exceed the size limit.
pub fn to_wire(mut manifest: Value) -> Result<Value> {
    if let Some(root) = manifest.as_object_mut() {
        let _ = root.remove(SCHEMA_TEMPLATE_KEY);
    }
    let desired = manifest
        .pointer_mut(AGENT_DESIRED)
        .and_then(Value::as_object_mut)
        .ok_or_else(|| ConvertError::Config {
            message: "manifest has no modulesContent.$edgeAgent.properties.desired".into(),
        })?;

    if let Some(system) = desired.get_mut("systemModules").and_then(Value::as_object_mut) {
        for (name, module) in system.iter_mut() {
            split_module(name, module, false)?;
        }
    }
    if let Some(modules) = desired.get_mut("modules").and_then(Value::as_object_mut) {
        for (name, module) in modules.iter_mut() {
            split_module(name, module, true)?;
        }
    }
    Ok(manifest)
}

fn split_module(name: &str, module: &mut Value, user_module: bool) -> Result<()> {
    let Some(settings) = module.get_mut("settings").and_then(Value::as_object_mut) else {
        return Err(ConvertError::Config {
            message: format!("module \"{name}\" has no settings"),
        });
    };

    if user_module {
        let unresolved = settings
            .get("image")
            .and_then(Value::as_str)
            .is_some_and(|image| image.starts_with('$'));
        if unresolved {
            tracing::warn!(module = name, "image placeholder was never resolved, blanking it");
            let _ = settings.insert("image".into(), Value::String(String::new()));
        }
    }

    let options = take_create_options(settings)?;
    let serialized = wire_string(&options)?;
    for (field, chunk) in split_create_options(name, &serialized)? {
        let _ = settings.insert(field, Value::String(chunk));
    }
    tracing::debug!(module = name, bytes = serialized.len(), "split createOptions");
    Ok(())
}

/// Removes every create-options field and returns the document they held.
///
/// Already split text is parsed back, so running the split twice is harmless.
fn take_create_options(settings: &mut Map<String, Value>) -> Result<Value> {
    let mut parts: Vec<(String, Value)> = Vec::new();
    let keys: Vec<String> = settings
        .keys()
        .filter(|k| k.starts_with(CREATE_OPTIONS_FIELD))
        .cloned()
        .collect();
    for key in keys {
        if let Some(v) = settings.remove(&key) {
            parts.push((key, v));
        }
    }
    parts.sort_by(|a, b| a.0.cmp(&b.0));

    match parts.as_slice() {
        [] => Ok(Value::Object(Map::new())),
        [(_, Value::String(_)), ..] => {
            let text: String = parts
                .iter()
                .filter_map(|(_, v)| v.as_str())
                .collect();
            Ok(serde_json::from_str(&text)?)
        }
        [(_, value)] => Ok(value.clone()),
        _ => Err(ConvertError::Config {
            message: "createOptions fields mix documents and text".into(),
        }),
    }
}
