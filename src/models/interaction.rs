use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Display;

use super::ItemKey;
use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    View,
    Like,
    Dislike,
    Rate,
}

impl Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ActionType::View => "view",
            ActionType::Like => "like",
            ActionType::Dislike => "dislike",
            ActionType::Rate => "rate",
        };
        f.write_str(name)
    }
}

/// Star rating between 1 and 5
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub fn new(stars: u8) -> Result<Self, ClientError> {
        if (1..=5).contains(&stars) {
            Ok(Self(stars))
        } else {
            Err(ClientError::InvalidInput(format!(
                "Rating must be between 1 and 5, got {}",
                stars
            )))
        }
    }

    pub fn stars(&self) -> u8 {
        self.0
    }
}

/// A user action against one item, as posted to the interaction log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionEvent {
    pub item_id: i64,
    pub domain: super::Domain,
    pub action_type: ActionType,
    pub metadata: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
}

impl InteractionEvent {
    pub fn new(key: ItemKey, action_type: ActionType, metadata: Map<String, Value>) -> Self {
        Self {
            item_id: key.item_id,
            domain: key.domain,
            action_type,
            metadata,
            rating: None,
        }
    }

    /// A `rate` event; the rating is mirrored into the metadata for the server's aggregator
    pub fn rated(key: ItemKey, rating: Rating, mut metadata: Map<String, Value>) -> Self {
        metadata.insert("rating".to_string(), Value::from(rating.stars()));
        Self {
            rating: Some(rating),
            ..Self::new(key, ActionType::Rate, metadata)
        }
    }

    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.domain, self.item_id)
    }
}
