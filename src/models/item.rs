use serde::{Deserialize, Serialize};
use url::Url;

/// The closed vocabulary of type tags used by the catalog.
pub const KNOWN_TYPES: [&str; 18] = [
    "normal", "fire", "water", "electric", "grass", "ice", "fighting", "poison", "ground",
    "flying", "psychic", "bug", "rock", "ghost", "dragon", "dark", "steel", "fairy",
];

pub fn is_known_type(tag: &str) -> bool {
    KNOWN_TYPES.contains(&tag)
}

// ---------------------------------------------------------------------------
// CatalogItem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: u32,
    pub name: String,
    /// 1-2 type tags, in source order.
    pub types: Vec<String>,
    #[serde(default)]
    pub hp: u32,
    #[serde(default)]
    pub attack: u32,
    #[serde(default)]
    pub defense: u32,
    #[serde(default)]
    pub special_attack: u32,
    #[serde(default)]
    pub special_defense: u32,
    #[serde(default)]
    pub speed: u32,
    #[serde(rename = "spriteURL")]
    pub sprite_url: Url,
    #[serde(rename = "shinySpriteURL")]
    pub shiny_sprite_url: Url,
}
