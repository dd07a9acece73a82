use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use crate::error::ClientError;

pub mod interaction;
pub mod preferences;
pub mod user;

pub use interaction::{ActionType, InteractionEvent, Rating};
pub use preferences::{
    BudgetRange, ExperienceLevel, MultiField, PreferenceDocument, PreferenceProfile,
    PreferenceProjection, SingleChoice,
};
pub use user::{AccessToken, AuthResponse, Credentials, Session, SignupRequest, User};

/// One of the four recommendable content categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Movies,
    Products,
    Music,
    Courses,
}

impl Domain {
    pub const ALL: [Domain; 4] = [
        Domain::Movies,
        Domain::Products,
        Domain::Music,
        Domain::Courses,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Movies => "movies",
            Domain::Products => "products",
            Domain::Music => "music",
            Domain::Courses => "courses",
        }
    }
}

impl Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "movies" | "movie" => Ok(Domain::Movies),
            "products" | "product" => Ok(Domain::Products),
            "music" => Ok(Domain::Music),
            "courses" | "course" => Ok(Domain::Courses),
            other => Err(ClientError::InvalidInput(format!("Unknown domain: {}", other))),
        }
    }
}

/// Which slice of recommendations the feed shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DomainFilter {
    #[default]
    Unified,
    Single(Domain),
}

impl Display for DomainFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainFilter::Unified => f.write_str("unified"),
            DomainFilter::Single(domain) => write!(f, "{}", domain),
        }
    }
}

impl FromStr for DomainFilter {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("unified") {
            Ok(DomainFilter::Unified)
        } else {
            s.parse().map(DomainFilter::Single)
        }
    }
}

/// Canonical identity of a recommendation item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    pub domain: Domain,
    pub item_id: i64,
}

impl ItemKey {
    pub fn new(domain: Domain, item_id: i64) -> Self {
        Self { domain, item_id }
    }
}

impl Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.domain, self.item_id)
    }
}

/// A scored recommendation after ingestion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationItem {
    pub key: ItemKey,
    pub title: String,
    /// Always within [0, 1]
    pub score: f64,
    pub metadata: Map<String, Value>,
    pub exploration: bool,
    pub rl_boost: Option<f64>,
}

impl RecommendationItem {
    pub fn domain(&self) -> Domain {
        self.key.domain
    }

    /// Score rendered as a whole-number match percentage
    pub fn match_percent(&self) -> u8 {
        (self.score * 100.0).round() as u8
    }

    /// First `limit` metadata entries rendered as display text
    pub fn metadata_preview(&self, limit: usize) -> Vec<(String, String)> {
        self.metadata
            .iter()
            .take(limit)
            .map(|(key, value)| (key.replace('_', " "), scalar_text(value)))
            .collect()
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(values) => values
            .iter()
            .map(scalar_text)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Recommendation as returned by the service, before identity normalization.
///
/// Depending on which model produced it, an item names its identifier `item_id`,
/// `id`, or one of the domain-specific `*_id` fields.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecommendation {
    #[serde(default)]
    pub item_id: Option<i64>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub track_id: Option<i64>,
    #[serde(default)]
    pub movie_id: Option<i64>,
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub course_id: Option<i64>,
    #[serde(default)]
    pub title: String,
    pub domain: String,
    pub score: f64,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default, alias = "is_exploration")]
    pub exploration: bool,
    #[serde(default)]
    pub rl_boost: Option<f64>,
}

impl RawRecommendation {
    /// Resolves the identifier, trying each known field in a fixed order
    fn resolve_id(&self) -> Option<i64> {
        self.item_id
            .or(self.id)
            .or(self.track_id)
            .or(self.movie_id)
            .or(self.product_id)
            .or(self.course_id)
    }
}

impl TryFrom<RawRecommendation> for RecommendationItem {
    type Error = ClientError;

    fn try_from(raw: RawRecommendation) -> Result<Self, Self::Error> {
        let item_id = raw.resolve_id().ok_or_else(|| {
            ClientError::InvalidInput(format!("Recommendation '{}' has no identifier", raw.title))
        })?;
        let domain: Domain = raw.domain.parse()?;

        if !raw.score.is_finite() {
            return Err(ClientError::InvalidInput(format!(
                "Recommendation {}:{} has a non-finite score",
                domain, item_id
            )));
        }

        Ok(RecommendationItem {
            key: ItemKey::new(domain, item_id),
            title: raw.title,
            score: raw.score.clamp(0.0, 1.0),
            metadata: raw.metadata,
            exploration: raw.exploration,
            rl_boost: raw.rl_boost,
        })
    }
}

/// Server-side summary of the user's cross-domain profile, displayed verbatim
pub type ProfileSummary = Map<String, Value>;

/// Raw recommendations response
#[derive(Debug, Clone, Deserialize)]
pub struct RawFeedPage {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub recommendations: Vec<RawRecommendation>,
    #[serde(default)]
    pub profile_summary: Option<ProfileSummary>,
}

/// A page of normalized recommendations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedPage {
    pub items: Vec<RecommendationItem>,
    pub profile_summary: Option<ProfileSummary>,
}

impl From<RawFeedPage> for FeedPage {
    fn from(raw: RawFeedPage) -> Self {
        let received = raw.recommendations.len();
        let items: Vec<RecommendationItem> = raw
            .recommendations
            .into_iter()
            .filter_map(|rec| match RecommendationItem::try_from(rec) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping malformed recommendation");
                    None
                }
            })
            .collect();

        tracing::debug!(
            received = received,
            kept = items.len(),
            user_id = ?raw.user_id,
            "Normalized recommendations page"
        );

        FeedPage {
            items,
            profile_summary: raw.profile_summary,
        }
    }
}

/// Service health as reported by `GET /`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub status: String,
    #[serde(default)]
    pub models_loaded: BTreeMap<String, bool>,
}

impl ServiceStatus {
    pub fn loaded_models(&self) -> impl Iterator<Item = &str> {
        self.models_loaded
            .iter()
            .filter(|(_, loaded)| **loaded)
            .map(|(name, _)| name.as_str())
    }
}
