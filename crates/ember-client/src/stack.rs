//! Typed stack-value decoding
//!
//! Query results arrive as a stack of `[typeTag, payload]` pairs with a
//! string tag and an opaque payload. Decoding maps each pair into the
//! `StackValue` union and never panics, never throws past this boundary:
//! anything that cannot be interpreted lands in `Unrecognized` (a normal,
//! forward-compatible outcome) or `Cell` (raw passthrough for caller-level
//! fallback).
//!
//! Text stored in cells may sit inline as the trailing bytes of the root
//! cell or behind one level of indirection in its first reference,
//! depending on how the originating program encoded it, so the cell path
//! tries both before giving up.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use ember_cell::{boc, Cell};
use ember_core::{EmberError, EmberResult};

/// One wire stack item: `[typeTag, payload]`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StackEntry(pub String, pub Value);

impl StackEntry {
    /// Numeric argument for an outbound query call
    pub fn num(value: i64) -> Self {
        StackEntry("num".into(), Value::String(value.to_string()))
    }
}

/// Decoded result value; exactly one variant is ever active
#[derive(Clone, Debug, PartialEq)]
pub enum StackValue {
    /// Integer result (decimal or hex on the wire)
    Int(i128),
    /// Text, either sent directly or extracted from a cell
    Text(String),
    /// Cell that could not be interpreted as text; kept for the caller
    Cell(Cell),
    /// Slice payload, deliberately left undecoded
    Slice(Value),
    /// Null result
    Absent,
    /// Unknown tag or uninterpretable payload; not an error
    Unrecognized { tag: String, payload: Value },
}

impl StackValue {
    /// Render as user-facing text without ever failing
    ///
    /// Malformed or unexpected values become an explanatory placeholder
    /// rather than a crash.
    pub fn as_text_lossy(&self) -> String {
        match self {
            StackValue::Text(s) => s.clone(),
            StackValue::Int(n) => n.to_string(),
            StackValue::Cell(cell) => format!(
                "unreadable cell data ({} bits, {} refs)",
                cell.bit_len(),
                cell.refs().len()
            ),
            StackValue::Slice(_) => "undecoded slice value".into(),
            StackValue::Absent => "no value".into(),
            StackValue::Unrecognized { tag, .. } => {
                format!("unrecognized value of type '{}'", tag)
            }
        }
    }
}

/// Decode one tagged stack item into a typed value
pub fn decode_entry(entry: &StackEntry) -> StackValue {
    let StackEntry(tag, payload) = entry;
    match tag.as_str() {
        "int" | "num" => match parse_int(payload) {
            Ok(n) => StackValue::Int(n),
            Err(e) => {
                tracing::warn!("unparseable numeric stack item: {}", e);
                StackValue::Unrecognized {
                    tag: tag.clone(),
                    payload: payload.clone(),
                }
            }
        },
        "string" => match payload.as_str() {
            Some(s) => StackValue::Text(s.to_owned()),
            None => StackValue::Unrecognized {
                tag: tag.clone(),
                payload: payload.clone(),
            },
        },
        "cell" => decode_cell(tag, payload),
        "slice" => StackValue::Slice(payload.clone()),
        "null" => StackValue::Absent,
        _ => StackValue::Unrecognized {
            tag: tag.clone(),
            payload: payload.clone(),
        },
    }
}

/// Cell decoding with the text-extraction fallback chain:
/// container parse -> trailing string -> first-reference string -> raw
fn decode_cell(tag: &str, payload: &Value) -> StackValue {
    let Some(encoded) = cell_bytes(payload) else {
        return StackValue::Unrecognized {
            tag: tag.to_owned(),
            payload: payload.clone(),
        };
    };
    let cell = match boc::from_base64(encoded) {
        Ok(cell) => cell,
        Err(e) => {
            // Keep the raw payload for diagnostics; never escalate
            tracing::warn!("malformed cell container in stack item: {}", e);
            return StackValue::Unrecognized {
                tag: tag.to_owned(),
                payload: payload.clone(),
            };
        }
    };
    match extract_text(&cell) {
        Some(text) => StackValue::Text(text),
        None => StackValue::Cell(cell),
    }
}

/// The payload for a cell item is either `{"bytes": <base64>}` or a bare
/// base64 string; both occur on the wire.
fn cell_bytes(payload: &Value) -> Option<&str> {
    payload
        .get("bytes")
        .and_then(Value::as_str)
        .or_else(|| payload.as_str())
}

/// Try the root's trailing string, then the first reference's
///
/// An empty root tail counts as a miss: programs that store text behind a
/// reference leave the root with no direct bits.
fn extract_text(cell: &Cell) -> Option<String> {
    if let Ok(text) = cell.begin_parse().load_string_tail() {
        if !text.is_empty() {
            return Some(text);
        }
    }
    let first_ref = cell.refs().first()?;
    first_ref.begin_parse().load_string_tail().ok()
}

/// Parse a wire numeric literal: decimal or `0x`-prefixed hex, either as
/// a JSON string or a bare JSON number
fn parse_int(payload: &Value) -> EmberResult<i128> {
    if let Some(n) = payload.as_i64() {
        return Ok(n as i128);
    }
    if let Some(n) = payload.as_u64() {
        return Ok(n as i128);
    }
    let s = payload
        .as_str()
        .ok_or_else(|| EmberError::Parse(format!("expected numeric literal, got {}", payload)))?
        .trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let magnitude = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i128::from_str_radix(hex, 16)
    } else {
        digits.parse::<i128>()
    }
    .map_err(|e| EmberError::Parse(format!("'{}': {}", s, e)))?;
    Ok(if negative { -magnitude } else { magnitude })
}
