//! Formulas ("blocks"): the scheduling units inside an itinerary day.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use super::item::Item;

/// What a block represents in the day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Text,
    Activity,
    Transport,
    Accommodation,
    Roadbook,
    Service,
}

impl FromStr for BlockKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(BlockKind::Text),
            "activity" => Ok(BlockKind::Activity),
            "transport" => Ok(BlockKind::Transport),
            "accommodation" => Ok(BlockKind::Accommodation),
            "roadbook" => Ok(BlockKind::Roadbook),
            // Transversal services are stored under both names
            "service" | "transversal" => Ok(BlockKind::Service),
            other => Err(format!("unknown block kind '{}'", other)),
        }
    }
}

/// Meal flags carried by accommodation blocks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealFlags {
    #[serde(default)]
    pub breakfast: bool,
    #[serde(default)]
    pub lunch: bool,
    #[serde(default)]
    pub dinner: bool,
}

impl MealFlags {
    pub fn union(self, other: MealFlags) -> MealFlags {
        MealFlags {
            breakfast: self.breakfast || other.breakfast,
            lunch: self.lunch || other.lunch,
            dinner: self.dinner || other.dinner,
        }
    }
}

/// Typed metadata for a block.
///
/// Legacy rows keep this as a JSON object inside the description column;
/// [`BlockMeta::from_description`] reads it back without ever failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockMeta {
    Accommodation {
        hotel_id: Option<Uuid>,
        room_category_id: Option<Uuid>,
        #[serde(default = "default_nights")]
        nights: u32,
        #[serde(default)]
        breakfast: bool,
        #[serde(default)]
        lunch: bool,
        #[serde(default)]
        dinner: bool,
    },
    Activity {
        supplier_id: Option<Uuid>,
        duration_minutes: Option<u32>,
        meeting_point: Option<String>,
    },
    Transport {
        vehicle: Option<String>,
        origin: Option<String>,
        destination: Option<String>,
    },
}

fn default_nights() -> u32 {
    1
}

impl BlockMeta {
    /// Parse the metadata blob of a block of the given kind.
    ///
    /// The stored JSON usually lacks the `type` tag, so it is injected from
    /// the block kind before deserializing. Anything that isn't a JSON object
    /// yields `None`.
    pub fn from_description(kind: BlockKind, description: &str) -> Option<Self> {
        let tag = match kind {
            BlockKind::Accommodation => "accommodation",
            BlockKind::Activity => "activity",
            BlockKind::Transport => "transport",
            _ => return None,
        };

        let mut value: serde_json::Value = serde_json::from_str(description.trim()).ok()?;
        let object = value.as_object_mut()?;
        object.insert("type".to_string(), serde_json::Value::from(tag));
        serde_json::from_value(value).ok()
    }

    /// Meals included by an accommodation block
    pub fn meals(&self) -> Option<MealFlags> {
        match self {
            BlockMeta::Accommodation {
                breakfast,
                lunch,
                dinner,
                ..
            } => Some(MealFlags {
                breakfast: *breakfast,
                lunch: *lunch,
                dinner: *dinner,
            }),
            _ => None,
        }
    }
}

/// A block inside a day with its ordered items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formula {
    pub id: Uuid,
    pub day_id: Uuid,
    pub kind: BlockKind,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub condition_id: Option<Uuid>,
    #[serde(default)]
    pub condition_option_id: Option<Uuid>,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Formula {
    pub fn meta(&self) -> Option<BlockMeta> {
        BlockMeta::from_description(self.kind, &self.description)
    }
}

/// Formula row from circuit_formulas
#[derive(Debug, Clone, FromRow)]
pub struct FormulaRow {
    pub id: Uuid,
    pub day_id: Uuid,
    pub kind: String,
    pub name: String,
    pub description: Option<String>,
    pub condition_id: Option<Uuid>,
    pub condition_option_id: Option<Uuid>,
    pub position: i32,
}

impl FormulaRow {
    pub fn into_formula(self, items: Vec<Item>) -> Formula {
        let kind = self.kind.parse().unwrap_or_else(|e| {
            tracing::warn!("Formula {}: {}, treating as text", self.id, e);
            BlockKind::Text
        });

        Formula {
            id: self.id,
            day_id: self.day_id,
            kind,
            name: self.name,
            description: self.description.unwrap_or_default(),
            condition_id: self.condition_id,
            condition_option_id: self.condition_option_id,
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accommodation_meta_from_untagged_json() {
        let hotel = Uuid::new_v4();
        let description = format!(
            r#"{{"hotel_id":"{}","room_category_id":null,"nights":2,"breakfast":true}}"#,
            hotel
        );

        let meta = BlockMeta::from_description(BlockKind::Accommodation, &description);

        assert_eq!(
            meta,
            Some(BlockMeta::Accommodation {
                hotel_id: Some(hotel),
                room_category_id: None,
                nights: 2,
                breakfast: true,
                lunch: false,
                dinner: false,
            })
        );
    }

    #[test]
    fn test_meta_from_plain_text_is_none() {
        assert_eq!(
            BlockMeta::from_description(BlockKind::Accommodation, "Riad in the medina"),
            None
        );
        assert_eq!(BlockMeta::from_description(BlockKind::Text, "{}"), None);
    }

    #[test]
    fn test_transport_meta_ignores_stale_tag() {
        let description = r#"{"type":"activity","vehicle":"4x4","origin":"Marrakech","destination":"Merzouga"}"#;
        assert_eq!(
            BlockMeta::from_description(BlockKind::Transport, description),
            Some(BlockMeta::Transport {
                vehicle: Some("4x4".to_string()),
                origin: Some("Marrakech".to_string()),
                destination: Some("Merzouga".to_string()),
            })
        );
    }

    #[test]
    fn test_accommodation_meals_merge_into_day() {
        let meals = BlockMeta::from_description(BlockKind::Accommodation, r#"{"dinner":true}"#)
            .and_then(|m| m.meals())
            .unwrap();
        let day = MealFlags {
            breakfast: true,
            ..MealFlags::default()
        };
        assert_eq!(
            day.union(meals),
            MealFlags {
                breakfast: true,
                lunch: false,
                dinner: true,
            }
        );
    }

    #[test]
    fn test_block_kind_accepts_transversal_alias() {
        assert_eq!("transversal".parse::<BlockKind>(), Ok(BlockKind::Service));
        assert!("hotel".parse::<BlockKind>().is_err());
    }
}
