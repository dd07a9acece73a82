use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Display,
    str::FromStr,
};

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl ExperienceLevel {
    pub const ALL: [ExperienceLevel; 3] = [
        ExperienceLevel::Beginner,
        ExperienceLevel::Intermediate,
        ExperienceLevel::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Beginner => "beginner",
            ExperienceLevel::Intermediate => "intermediate",
            ExperienceLevel::Advanced => "advanced",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExperienceLevel::Beginner => "Beginner - Just getting started",
            ExperienceLevel::Intermediate => "Intermediate - Comfortable navigating",
            ExperienceLevel::Advanced => "Advanced - Power user",
        }
    }
}

impl FromStr for ExperienceLevel {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExperienceLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| ClientError::InvalidInput(format!("Unknown experience level: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetRange {
    Low,
    #[default]
    Medium,
    High,
}

impl BudgetRange {
    pub const ALL: [BudgetRange; 3] = [BudgetRange::Low, BudgetRange::Medium, BudgetRange::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetRange::Low => "low",
            BudgetRange::Medium => "medium",
            BudgetRange::High => "high",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BudgetRange::Low => "Budget-friendly",
            BudgetRange::Medium => "Moderate",
            BudgetRange::High => "Premium",
        }
    }
}

impl FromStr for BudgetRange {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BudgetRange::ALL
            .into_iter()
            .find(|range| range.as_str() == s)
            .ok_or_else(|| ClientError::InvalidInput(format!("Unknown budget range: {}", s)))
    }
}

/// The multi-select fields of a [`PreferenceDocument`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MultiField {
    MovieGenres,
    MusicGenres,
    ShoppingInterests,
    LearningTopics,
}

impl MultiField {
    pub const ALL: [MultiField; 4] = [
        MultiField::MovieGenres,
        MultiField::MusicGenres,
        MultiField::ShoppingInterests,
        MultiField::LearningTopics,
    ];

    /// Wire name of the field
    pub fn key(&self) -> &'static str {
        match self {
            MultiField::MovieGenres => "favorite_movie_genres",
            MultiField::MusicGenres => "favorite_music_genres",
            MultiField::ShoppingInterests => "shopping_interests",
            MultiField::LearningTopics => "learning_topics",
        }
    }

    /// Options a user may pick for this field
    pub fn options(&self) -> &'static [&'static str] {
        match self {
            MultiField::MovieGenres => &[
                "Action",
                "Comedy",
                "Drama",
                "Horror",
                "Romance",
                "Sci-Fi",
                "Thriller",
                "Documentary",
                "Animation",
                "Fantasy",
            ],
            MultiField::MusicGenres => &[
                "Pop",
                "Rock",
                "Hip Hop",
                "Jazz",
                "Classical",
                "Electronic",
                "Country",
                "R&B",
                "Indie",
                "Metal",
            ],
            MultiField::ShoppingInterests => &[
                "Electronics",
                "Fashion",
                "Books",
                "Home & Garden",
                "Sports",
                "Beauty",
                "Toys",
                "Food",
                "Health",
                "Automotive",
            ],
            MultiField::LearningTopics => &[
                "Programming",
                "Business",
                "Design",
                "Marketing",
                "Data Science",
                "Languages",
                "Music",
                "Photography",
                "Finance",
                "Health",
            ],
        }
    }
}

impl Display for MultiField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A value for one of the single-select fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleChoice {
    Experience(ExperienceLevel),
    Budget(BudgetRange),
}

/// The user's stated preferences, as collected by onboarding
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PreferenceDocument {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub favorite_movie_genres: BTreeSet<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub favorite_music_genres: BTreeSet<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub shopping_interests: BTreeSet<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub learning_topics: BTreeSet<String>,
    #[serde(default, deserialize_with = "known_or_default")]
    pub experience_level: ExperienceLevel,
    #[serde(default, deserialize_with = "known_or_default")]
    pub budget_range: BudgetRange,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeSet<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reads a single-select answer, falling back to the default for null or values
/// this client does not know
fn known_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
    T::Err: Display,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value.as_ref().and_then(Value::as_str) {
        Some(raw) => Ok(raw.parse().unwrap_or_else(|e: T::Err| {
            tracing::warn!(error = %e, "Using default for unreadable preference");
            T::default()
        })),
        None => Ok(T::default()),
    }
}

impl PreferenceDocument {
    pub fn selections(&self, field: MultiField) -> &BTreeSet<String> {
        match field {
            MultiField::MovieGenres => &self.favorite_movie_genres,
            MultiField::MusicGenres => &self.favorite_music_genres,
            MultiField::ShoppingInterests => &self.shopping_interests,
            MultiField::LearningTopics => &self.learning_topics,
        }
    }

    fn selections_mut(&mut self, field: MultiField) -> &mut BTreeSet<String> {
        match field {
            MultiField::MovieGenres => &mut self.favorite_movie_genres,
            MultiField::MusicGenres => &mut self.favorite_music_genres,
            MultiField::ShoppingInterests => &mut self.shopping_interests,
            MultiField::LearningTopics => &mut self.learning_topics,
        }
    }

    /// Flips membership of `value` in `field`.
    ///
    /// Removing is always allowed; adding requires `value` to be one of the field's
    /// options. Returns whether the value is selected afterwards.
    pub fn toggle(&mut self, field: MultiField, value: &str) -> Result<bool, ClientError> {
        let selected = self.selections_mut(field);
        if selected.remove(value) {
            return Ok(false);
        }
        if !field.options().contains(&value) {
            return Err(ClientError::InvalidInput(format!(
                "'{}' is not an option for {}",
                value, field
            )));
        }
        selected.insert(value.to_string());
        Ok(true)
    }

    pub fn set_single(&mut self, choice: SingleChoice) {
        match choice {
            SingleChoice::Experience(level) => self.experience_level = level,
            SingleChoice::Budget(range) => self.budget_range = range,
        }
    }
}

/// Server-computed, display-ready projection of a [`PreferenceDocument`].
///
/// The client never derives this itself; it only stores, shows and round-trips it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreferenceProjection(pub BTreeMap<String, Value>);

impl PreferenceProjection {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, category: &str) -> Option<&Value> {
        self.0.get(category)
    }

    /// Category labels with their values rendered as text, lists comma-joined
    pub fn display_entries(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(key, value)| {
                let text = match value {
                    Value::Array(items) => items
                        .iter()
                        .map(|item| match item {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(", "),
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.replace('_', " "), text)
            })
            .collect()
    }
}

/// Raw quiz responses and their projection, replaced together.
///
/// Every write produces a new revision holding both halves, so a reader never
/// observes a projection that belongs to a different set of responses.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PreferenceProfile {
    #[serde(default)]
    quiz_responses: PreferenceDocument,
    #[serde(default)]
    preferences: PreferenceProjection,
    #[serde(skip)]
    revision: u64,
}

impl PreferenceProfile {
    pub fn new(quiz_responses: PreferenceDocument, preferences: PreferenceProjection) -> Self {
        Self {
            quiz_responses,
            preferences,
            revision: 0,
        }
    }

    pub fn quiz_responses(&self) -> &PreferenceDocument {
        &self.quiz_responses
    }

    pub fn preferences(&self) -> &PreferenceProjection {
        &self.preferences
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// New revision after the user re-stated their preferences
    pub fn with_responses(
        &self,
        quiz_responses: PreferenceDocument,
        preferences: PreferenceProjection,
    ) -> Self {
        Self {
            quiz_responses,
            preferences,
            revision: self.revision + 1,
        }
    }

    /// New revision after the server re-derived the projection from interactions
    pub fn with_projection(&self, preferences: PreferenceProjection) -> Self {
        Self {
            quiz_responses: self.quiz_responses.clone(),
            preferences,
            revision: self.revision + 1,
        }
    }
}
