use serde::{Deserialize, Serialize};

use super::Book;

/// Which strategy surfaced a recommendation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    /// Matched the user's explicit or rating-derived preferences
    Content,
    /// Rated highly by users with similar taste
    Collaborative,
    /// Found by both strategies
    Both,
    /// Popularity fallback when nothing personalised was found
    Popular,
}

/// A book surfaced to a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub genre: String,
    /// Strategy score; scales differ between sources
    pub score: f64,
    pub source: RecommendationSource,
}

impl Recommendation {
    pub fn from_book(book: &Book, score: f64, source: RecommendationSource) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            genre: book.genre.clone(),
            score,
            source,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationResponse {
    pub user_id: i64,
    pub recommendations: Vec<Recommendation>,
}
