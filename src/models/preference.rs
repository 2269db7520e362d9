use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use crate::error::{AppError, AppResult};

const MAX_VALUE_LEN: usize = 100;
const MAX_WEIGHT: f64 = 10.0;

/// Which book attribute a preference matches against
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceKind {
    Genre,
    Author,
}

impl PreferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenceKind::Genre => "genre",
            PreferenceKind::Author => "author",
        }
    }
}

impl Display for PreferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PreferenceKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "genre" => Ok(PreferenceKind::Genre),
            "author" => Ok(PreferenceKind::Author),
            other => Err(AppError::Internal(format!(
                "Unknown preference kind: {}",
                other
            ))),
        }
    }
}

/// A single stored preference row
#[derive(Debug, Clone, PartialEq)]
pub struct Preference {
    pub kind: PreferenceKind,
    /// Lowercased attribute value, e.g. `science fiction`
    pub value: String,
    pub weight: f64,
}

/// Preferences as exchanged over the API: one weight map per attribute
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserPreferences {
    #[serde(default)]
    pub genres: HashMap<String, f64>,
    #[serde(default)]
    pub authors: HashMap<String, f64>,
}

impl UserPreferences {
    /// Creates empty user preferences
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the weight for a genre, replacing any previous weight
    pub fn set_genre(&mut self, genre: &str, weight: f64) {
        self.genres.insert(normalize(genre), weight);
    }

    /// Sets the weight for an author, replacing any previous weight
    pub fn set_author(&mut self, author: &str, weight: f64) {
        self.authors.insert(normalize(author), weight);
    }

    pub fn is_empty(&self) -> bool {
        self.genres.is_empty() && self.authors.is_empty()
    }

    /// Normalizes keys and checks weights. Keys that collide after
    /// normalization keep the larger weight.
    pub fn validated(self) -> AppResult<Self> {
        let mut out = UserPreferences::new();
        for (kind, map) in [
            (PreferenceKind::Genre, self.genres),
            (PreferenceKind::Author, self.authors),
        ] {
            for (key, weight) in map {
                let key = normalize(&key);
                if key.is_empty() {
                    return Err(AppError::InvalidInput(format!(
                        "{} name must not be empty",
                        kind
                    )));
                }
                if key.chars().count() > MAX_VALUE_LEN {
                    return Err(AppError::InvalidInput(format!(
                        "{} name must be at most {} characters",
                        kind, MAX_VALUE_LEN
                    )));
                }
                if !weight.is_finite() || weight <= 0.0 || weight > MAX_WEIGHT {
                    return Err(AppError::InvalidInput(format!(
                        "Weight for {} '{}' must be greater than 0 and at most {}",
                        kind, key, MAX_WEIGHT
                    )));
                }

                let target = match kind {
                    PreferenceKind::Genre => &mut out.genres,
                    PreferenceKind::Author => &mut out.authors,
                };
                let entry = target.entry(key).or_insert(weight);
                if weight > *entry {
                    *entry = weight;
                }
            }
        }
        Ok(out)
    }

    /// Flattens the maps into storable rows
    pub fn to_rows(&self) -> Vec<Preference> {
        let genres = self.genres.iter().map(|(value, weight)| Preference {
            kind: PreferenceKind::Genre,
            value: value.clone(),
            weight: *weight,
        });
        let authors = self.authors.iter().map(|(value, weight)| Preference {
            kind: PreferenceKind::Author,
            value: value.clone(),
            weight: *weight,
        });
        genres.chain(authors).collect()
    }

    pub fn from_rows(rows: impl IntoIterator<Item = Preference>) -> Self {
        let mut prefs = UserPreferences::new();
        for row in rows {
            match row.kind {
                PreferenceKind::Genre => prefs.genres.insert(row.value, row.weight),
                PreferenceKind::Author => prefs.authors.insert(row.value, row.weight),
            };
        }
        prefs
    }

    /// Sum of the weights whose attribute matches the book
    pub fn match_weight(&self, genre: &str, author: &str) -> f64 {
        let genre_weight = self.genres.get(&normalize(genre)).copied().unwrap_or(0.0);
        let author_weight = self.authors.get(&normalize(author)).copied().unwrap_or(0.0);
        genre_weight + author_weight
    }
}

/// Attribute values are compared case-insensitively
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}
