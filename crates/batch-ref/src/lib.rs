//! Resolves `{"$ref": "#/..."}` placeholders inside batch item payloads.
//!
//! A batch item can point at the output of an earlier item, e.g. create a
//! farmer and then assign boxes to the freshly created id:
//!
//! ```json
//! {"farmer_id": {"$ref": "#/items/new_farmer/data/id"}}
//! ```
//!
//! The pointer is a JSON pointer (RFC 6901) evaluated against the batch
//! context. An optional `"$default"` sibling is used when the pointer does
//! not resolve.

use serde_json::{Map, Value};

const REF_KEY: &str = "$ref";
const DEFAULT_KEY: &str = "$default";
const MAX_DEPTH: usize = 64;

pub fn resolve_batch_refs(input: Value, ctx: &Value) -> Result<Value, String> {
    resolve(input, ctx, 0)
}

fn resolve(value: Value, ctx: &Value, depth: usize) -> Result<Value, String> {
    if depth > MAX_DEPTH {
        return Err(format!("$ref nesting exceeds {MAX_DEPTH} levels"));
    }
    match value {
        Value::Object(map) => {
            if let Some(target) = ref_target(&map)? {
                return lookup(target, &map, ctx);
            }
            let mut out = Map::with_capacity(map.len());
            for (key, inner) in map {
                out.insert(key, resolve(inner, ctx, depth + 1)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items
            .into_iter()
            .map(|item| resolve(item, ctx, depth + 1))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Ok(other),
    }
}

fn ref_target(map: &Map<String, Value>) -> Result<Option<&str>, String> {
    let Some(raw) = map.get(REF_KEY) else {
        return Ok(None);
    };
    if map.keys().any(|k| k != REF_KEY && k != DEFAULT_KEY) {
        return Err("$ref objects may only carry $ref and $default".to_string());
    }
    let Some(raw) = raw.as_str() else {
        return Err("$ref must be a string".to_string());
    };
    let Some(pointer) = raw.strip_prefix('#') else {
        return Err(format!("$ref must start with '#': {raw}"));
    };
    Ok(Some(pointer))
}

fn lookup(pointer: &str, map: &Map<String, Value>, ctx: &Value) -> Result<Value, String> {
    if let Some(found) = ctx.pointer(pointer) {
        return Ok(found.clone());
    }
    match map.get(DEFAULT_KEY) {
        Some(default) => Ok(default.clone()),
        None => Err(format!("$ref not found: #{pointer}")),
    }
}
