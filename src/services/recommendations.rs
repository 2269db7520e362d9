use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

use crate::{
    error::{AppError, AppResult},
    models::{
        preference::normalize, Book, Rating, Recommendation, RecommendationSource,
        UserPreferences,
    },
    services::{preferences, similarity::pearson},
};

/// Tuning knobs for the recommendation strategies
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationSettings {
    /// Maximum results per strategy
    pub limit: usize,
    /// Books two users must both have rated before they can be compared
    pub min_common_ratings: usize,
    /// Neighbours need a similarity strictly above this
    pub similarity_threshold: f64,
    pub max_neighbors: usize,
    /// How many rating-derived genres count as preferred
    pub top_genres: usize,
    /// Caps how much a large number of ratings boosts a genre
    pub genre_count_cap: usize,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self {
            limit: 5,
            min_common_ratings: 3,
            similarity_threshold: 0.3,
            max_neighbors: 5,
            top_genres: 2,
            genre_count_cap: 5,
        }
    }
}

/// Data the recommendation engine reads
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecommendationData: Send + Sync {
    async fn user_exists(&self, user_id: i64) -> AppResult<bool>;

    async fn books(&self) -> AppResult<Vec<Book>>;

    /// Every rating in the system
    async fn ratings(&self) -> AppResult<Vec<Rating>>;

    async fn preferences(&self, user_id: i64) -> AppResult<UserPreferences>;
}

/// [`RecommendationData`] backed by the application database
pub struct SqliteRecommendationData {
    pool: SqlitePool,
}

impl SqliteRecommendationData {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecommendationData for SqliteRecommendationData {
    async fn user_exists(&self, user_id: i64) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn books(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            "SELECT id, title, author, genre, description, published_year FROM books",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    async fn ratings(&self) -> AppResult<Vec<Rating>> {
        let ratings = sqlx::query_as::<_, Rating>(
            "SELECT id, user_id, book_id, score, created_at FROM ratings",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ratings)
    }

    async fn preferences(&self, user_id: i64) -> AppResult<UserPreferences> {
        preferences::get_preferences(&self.pool, user_id).await
    }
}

/// Generates personalised book recommendations for a user
///
/// Combines a content strategy (explicit preferences plus genres derived from
/// the user's ratings) with user-user collaborative filtering, and falls back
/// to the most popular unrated books when neither finds anything. Books the
/// user already rated are never recommended.
pub async fn recommend(
    data: &dyn RecommendationData,
    user_id: i64,
    settings: &RecommendationSettings,
) -> AppResult<Vec<Recommendation>> {
    let start = Instant::now();

    if !data.user_exists(user_id).await? {
        return Err(AppError::NotFound(format!("User {} not found", user_id)));
    }

    let books = data.books().await?;
    let ratings = data.ratings().await?;
    let prefs = data.preferences(user_id).await?;

    let recommendations = rank(user_id, &books, &ratings, &prefs, settings);

    tracing::info!(
        user_id,
        books = books.len(),
        ratings = ratings.len(),
        recommended = recommendations.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Recommendations computed"
    );

    Ok(recommendations)
}

/// Pure ranking over an in-memory snapshot of the catalog
pub fn rank(
    user_id: i64,
    books: &[Book],
    ratings: &[Rating],
    prefs: &UserPreferences,
    settings: &RecommendationSettings,
) -> Vec<Recommendation> {
    let books_by_id: HashMap<i64, &Book> = books.iter().map(|b| (b.id, b)).collect();

    let mut by_user: HashMap<i64, HashMap<i64, f64>> = HashMap::new();
    for rating in ratings {
        by_user
            .entry(rating.user_id)
            .or_default()
            .insert(rating.book_id, rating.score as f64);
    }

    let empty = HashMap::new();
    let own = by_user.get(&user_id).unwrap_or(&empty);

    let content = content_based(own, books, &books_by_id, prefs, settings);
    let collaborative = collaborative(user_id, own, &by_user, &books_by_id, settings);

    tracing::debug!(
        user_id,
        content = content.len(),
        collaborative = collaborative.len(),
        "Strategy results"
    );

    let merged = merge(content, collaborative);
    if !merged.is_empty() {
        return merged;
    }

    popular(own, ratings, &books_by_id, settings)
}

/// Genres the user rates best, weighted by `avg * min(count, cap)`
fn derived_genres(
    own: &HashMap<i64, f64>,
    books_by_id: &HashMap<i64, &Book>,
    settings: &RecommendationSettings,
) -> HashSet<String> {
    let mut totals: HashMap<String, (f64, usize)> = HashMap::new();
    for (book_id, score) in own {
        if let Some(book) = books_by_id.get(book_id) {
            let entry = totals.entry(normalize(&book.genre)).or_insert((0.0, 0));
            entry.0 += score;
            entry.1 += 1;
        }
    }

    let mut scored: Vec<(String, f64)> = totals
        .into_iter()
        .map(|(genre, (sum, count))| {
            let avg = sum / count as f64;
            (genre, avg * count.min(settings.genre_count_cap) as f64)
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    scored
        .into_iter()
        .take(settings.top_genres)
        .map(|(genre, _)| genre)
        .collect()
}

fn content_based(
    own: &HashMap<i64, f64>,
    books: &[Book],
    books_by_id: &HashMap<i64, &Book>,
    prefs: &UserPreferences,
    settings: &RecommendationSettings,
) -> Vec<Recommendation> {
    let preferred_genres = derived_genres(own, books_by_id, settings);
    if preferred_genres.is_empty() && prefs.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(&Book, f64)> = books
        .iter()
        .filter(|book| !own.contains_key(&book.id))
        .filter_map(|book| {
            let mut score = prefs.match_weight(&book.genre, &book.author);
            if preferred_genres.contains(&normalize(&book.genre)) {
                score += 1.0;
            }
            (score > 0.0).then_some((book, score))
        })
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id)));
    scored
        .into_iter()
        .take(settings.limit)
        .map(|(book, score)| Recommendation::from_book(book, score, RecommendationSource::Content))
        .collect()
}

fn collaborative(
    user_id: i64,
    own: &HashMap<i64, f64>,
    by_user: &HashMap<i64, HashMap<i64, f64>>,
    books_by_id: &HashMap<i64, &Book>,
    settings: &RecommendationSettings,
) -> Vec<Recommendation> {
    if own.is_empty() {
        return Vec::new();
    }

    let mut neighbors: Vec<(i64, f64)> = by_user
        .iter()
        .filter(|(other_id, _)| **other_id != user_id)
        .map(|(other_id, theirs)| (*other_id, pearson(own, theirs, settings.min_common_ratings)))
        .filter(|(_, similarity)| *similarity > settings.similarity_threshold)
        .collect();
    neighbors.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    neighbors.truncate(settings.max_neighbors);

    tracing::debug!(user_id, neighbors = neighbors.len(), "Similar users found");

    let mut candidates: HashMap<i64, (f64, usize)> = HashMap::new();
    for (neighbor_id, _) in &neighbors {
        for (book_id, score) in &by_user[neighbor_id] {
            if own.contains_key(book_id) {
                continue;
            }
            let entry = candidates.entry(*book_id).or_insert((0.0, 0));
            entry.0 += score;
            entry.1 += 1;
        }
    }

    let mut scored: Vec<(&Book, f64)> = candidates
        .into_iter()
        .filter_map(|(book_id, (sum, count))| {
            books_by_id
                .get(&book_id)
                .map(|book| (*book, sum / count as f64))
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id)));

    scored
        .into_iter()
        .take(settings.limit)
        .map(|(book, score)| {
            Recommendation::from_book(book, score, RecommendationSource::Collaborative)
        })
        .collect()
}

/// Content results keep their order; collaborative results are appended
/// unless already present, in which case the existing entry becomes `Both`.
fn merge(content: Vec<Recommendation>, collaborative: Vec<Recommendation>) -> Vec<Recommendation> {
    let mut merged = content;
    for rec in collaborative {
        match merged.iter_mut().find(|existing| existing.id == rec.id) {
            Some(existing) => existing.source = RecommendationSource::Both,
            None => merged.push(rec),
        }
    }
    merged
}

fn popular(
    own: &HashMap<i64, f64>,
    ratings: &[Rating],
    books_by_id: &HashMap<i64, &Book>,
    settings: &RecommendationSettings,
) -> Vec<Recommendation> {
    let mut totals: HashMap<i64, (f64, usize)> = HashMap::new();
    for rating in ratings {
        if own.contains_key(&rating.book_id) {
            continue;
        }
        let entry = totals.entry(rating.book_id).or_insert((0.0, 0));
        entry.0 += rating.score as f64;
        entry.1 += 1;
    }

    let mut scored: Vec<(&Book, f64, usize)> = totals
        .into_iter()
        .filter_map(|(book_id, (sum, count))| {
            books_by_id
                .get(&book_id)
                .map(|book| (*book, sum / count as f64, count))
        })
        .collect();
    scored.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| b.2.cmp(&a.2))
            .then_with(|| a.0.id.cmp(&b.0.id))
    });

    scored
        .into_iter()
        .take(settings.limit)
        .map(|(book, score, _)| Recommendation::from_book(book, score, RecommendationSource::Popular))
        .collect()
}
