use serde::{Deserialize, Serialize};
use url::Url;

use super::item::CatalogItem;

// ---------------------------------------------------------------------------
// PersistedRecord
// ---------------------------------------------------------------------------

/// A catalog entry as held by the local store.
///
/// Everything except `favorite` is fixed once the record is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRecord {
    pub id: u32,
    pub name: String,
    pub types: Vec<String>,
    pub hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub special_attack: u32,
    pub special_defense: u32,
    pub speed: u32,
    #[serde(rename = "spriteURL")]
    pub sprite_url: Url,
    #[serde(rename = "shinySpriteURL")]
    pub shiny_sprite_url: Url,
    #[serde(default)]
    pub favorite: bool,
}

impl PersistedRecord {
    /// Build the record committed for a freshly fetched item.
    ///
    /// `favorite` always starts out false, and types are reordered so that a
    /// dual-type entry never leads with `normal`.
    pub fn from_item(item: CatalogItem) -> Self {
        let mut types = item.types;
        organize_types(&mut types);
        Self {
            id: item.id,
            name: item.name,
            types,
            hp: item.hp,
            attack: item.attack,
            defense: item.defense,
            special_attack: item.special_attack,
            special_defense: item.special_defense,
            speed: item.speed,
            sprite_url: item.sprite_url,
            shiny_sprite_url: item.shiny_sprite_url,
            favorite: false,
        }
    }

    /// The leading type tag, which drives classification downstream.
    pub fn primary_type(&self) -> Option<&str> {
        self.types.first().map(String::as_str)
    }

    /// Classification bucket keyed on the leading type, used to pick a
    /// background asset. Unknown or missing types map to `""`.
    pub fn background(&self) -> &'static str {
        match self.primary_type() {
            Some("normal" | "grass" | "electric" | "poison" | "fairy") => {
                "normalgrasselectricpoisonfairy"
            }
            Some("rock" | "ground" | "steel" | "fighting" | "ghost" | "dark" | "psychic") => {
                "rockgroundsteelfightingghostdarkpsychic"
            }
            Some("fire" | "dragon") => "firedragon",
            Some("flying" | "bug") => "flyingbug",
            Some("ice") => "ice",
            Some("water") => "water",
            _ => "",
        }
    }

    /// The six base stats in display order.
    pub fn stats(&self) -> [Stat; 6] {
        [
            Stat::new(1, "HP", self.hp),
            Stat::new(2, "Attack", self.attack),
            Stat::new(3, "Defense", self.defense),
            Stat::new(4, "Special Attack", self.special_attack),
            Stat::new(5, "Special Defense", self.special_defense),
            Stat::new(6, "Speed", self.speed),
        ]
    }

    /// The largest base stat; the first one wins on ties.
    pub fn highest_stat(&self) -> Stat {
        let stats = self.stats();
        let mut best = stats[0];
        for stat in &stats[1..] {
            if stat.value > best.value {
                best = *stat;
            }
        }
        best
    }
}

impl From<CatalogItem> for PersistedRecord {
    fn from(item: CatalogItem) -> Self {
        Self::from_item(item)
    }
}

/// Swap a `["normal", x]` pair to `[x, "normal"]`.
pub fn organize_types(types: &mut [String]) {
    if types.len() == 2 && types[0] == "normal" {
        types.swap(0, 1);
    }
}

/// One labelled base stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stat {
    pub id: u8,
    pub label: &'static str,
    pub value: u32,
}

impl Stat {
    fn new(id: u8, label: &'static str, value: u32) -> Self {
        Self { id, label, value }
    }
}
