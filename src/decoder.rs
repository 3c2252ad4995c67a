//! Normalizes one raw catalog-item payload into a [`CatalogItem`].
//!
//! Each required field is decoded against a small typed schema and a failure
//! names the field that was absent or wrong-shaped. A record carries one or
//! two non-empty type tags. Unknown stat names and
//! unknown type tags are logged and otherwise ignored so new upstream data
//! does not break decoding.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;

use crate::error::DecodeError;
use crate::models::{is_known_type, CatalogItem};

// ---------------------------------------------------------------------------
// Wire schema
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct NamedRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TypeSlot {
    #[serde(rename = "type")]
    kind: NamedRef,
}

#[derive(Debug, Deserialize)]
struct StatSlot {
    base_stat: u32,
    stat: NamedRef,
}

#[derive(Debug, Deserialize)]
struct Sprites {
    front_default: Option<String>,
    front_shiny: Option<String>,
}

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Decode a raw JSON body.
///
/// Bodies that are not valid JSON objects fail with [`DecodeError::NotAnObject`].
pub fn decode_slice(body: &[u8]) -> Result<CatalogItem, DecodeError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| DecodeError::NotAnObject)?;
    decode(&value)
}

/// Decode an already parsed payload. Pure and deterministic.
pub fn decode(payload: &Value) -> Result<CatalogItem, DecodeError> {
    let obj = payload.as_object().ok_or(DecodeError::NotAnObject)?;

    let id: u32 = field(obj, "id")?;
    if id == 0 {
        return Err(DecodeError::MissingField("id"));
    }

    let name: String = field(obj, "name")?;
    if name.is_empty() {
        return Err(DecodeError::MissingField("name"));
    }

    let slots: Vec<TypeSlot> = field(obj, "types")?;
    if slots.is_empty() || slots.len() > 2 || slots.iter().any(|s| s.kind.name.is_empty()) {
        return Err(DecodeError::MissingField("types"));
    }
    let types: Vec<String> = slots.into_iter().map(|s| s.kind.name).collect();
    for tag in &types {
        if !is_known_type(tag) {
            tracing::warn!(id, tag = %tag, "unknown type tag");
        }
    }

    let sprites: Sprites = field(obj, "sprites")?;

    let mut item = CatalogItem {
        id,
        name,
        types,
        hp: 0,
        attack: 0,
        defense: 0,
        special_attack: 0,
        special_defense: 0,
        speed: 0,
        sprite_url: sprite_url(sprites.front_default, "sprites.front_default")?,
        shiny_sprite_url: sprite_url(sprites.front_shiny, "sprites.front_shiny")?,
    };

    // A payload with no stats list at all keeps every stat at zero.
    let stats: Vec<StatSlot> = match obj.get("stats") {
        None | Some(Value::Null) => Vec::new(),
        Some(_) => field(obj, "stats")?,
    };
    for slot in stats {
        let target = match slot.stat.name.as_str() {
            "hp" => &mut item.hp,
            "attack" => &mut item.attack,
            "defense" => &mut item.defense,
            "special-attack" => &mut item.special_attack,
            "special-defense" => &mut item.special_defense,
            "speed" => &mut item.speed,
            other => {
                tracing::warn!(id, stat = other, "unexpected stat encountered");
                continue;
            }
        };
        *target = slot.base_stat;
    }

    Ok(item)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Decode a required top-level field.
fn field<T: DeserializeOwned>(
    obj: &Map<String, Value>,
    key: &'static str,
) -> Result<T, DecodeError> {
    let raw = obj.get(key).ok_or(DecodeError::MissingField(key))?;
    T::deserialize(raw).map_err(|_| DecodeError::MissingField(key))
}

/// Validate one sprite URL: present, absolute and served over HTTP(S).
fn sprite_url(raw: Option<String>, path: &'static str) -> Result<Url, DecodeError> {
    let raw = raw.ok_or(DecodeError::MissingField(path))?;
    let url = Url::parse(&raw).map_err(|_| DecodeError::MissingField(path))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(DecodeError::MissingField(path)),
    }
}
