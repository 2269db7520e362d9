use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

const MAX_TITLE_LEN: usize = 100;
const MAX_AUTHOR_LEN: usize = 100;
const MAX_GENRE_LEN: usize = 50;

/// A book in the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub description: Option<String>,
    pub published_year: Option<i32>,
}

/// Compact representation used in listings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookSummary {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub genre: String,
}

impl From<&Book> for BookSummary {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            genre: book.genre.clone(),
        }
    }
}

/// Full book record with its aggregated rating
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookDetail {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub description: Option<String>,
    pub published_year: Option<i32>,
    /// Mean score over all ratings, 0 when the book is unrated
    pub average_rating: f64,
    pub rating_count: i64,
}

impl BookDetail {
    pub fn new(book: Book, average_rating: f64, rating_count: i64) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            genre: book.genre,
            description: book.description,
            published_year: book.published_year,
            average_rating,
            rating_count,
        }
    }
}

/// Request body for adding a book
#[derive(Debug, Clone, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub genre: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub published_year: Option<i32>,
}

impl NewBook {
    /// Trims the text fields and checks their lengths
    pub fn validated(self) -> AppResult<Self> {
        Ok(Self {
            title: required_field("title", &self.title, MAX_TITLE_LEN)?,
            author: required_field("author", &self.author, MAX_AUTHOR_LEN)?,
            genre: required_field("genre", &self.genre, MAX_GENRE_LEN)?,
            description: self.description,
            published_year: self.published_year,
        })
    }
}

/// Partial update; only the fields present are changed
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub published_year: Option<i32>,
}

impl BookUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.genre.is_none()
            && self.description.is_none()
            && self.published_year.is_none()
    }

    pub fn validated(self) -> AppResult<Self> {
        if self.is_empty() {
            return Err(AppError::InvalidInput("No data provided".to_string()));
        }

        Ok(Self {
            title: self
                .title
                .map(|t| required_field("title", &t, MAX_TITLE_LEN))
                .transpose()?,
            author: self
                .author
                .map(|a| required_field("author", &a, MAX_AUTHOR_LEN))
                .transpose()?,
            genre: self
                .genre
                .map(|g| required_field("genre", &g, MAX_GENRE_LEN))
                .transpose()?,
            description: self.description,
            published_year: self.published_year,
        })
    }

    /// Applies the present fields to an existing record
    pub fn apply(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if let Some(genre) = self.genre {
            book.genre = genre;
        }
        if let Some(description) = self.description {
            book.description = Some(description);
        }
        if let Some(year) = self.published_year {
            book.published_year = Some(year);
        }
    }
}

/// One page of the catalog
#[derive(Debug, Serialize, Deserialize)]
pub struct BookPage {
    pub books: Vec<BookSummary>,
    pub total: i64,
    pub pages: i64,
    pub current_page: i64,
}

fn required_field(name: &str, value: &str, max_len: usize) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(format!("{} must not be empty", name)));
    }
    if trimmed.chars().count() > max_len {
        return Err(AppError::InvalidInput(format!(
            "{} must be at most {} characters",
            name, max_len
        )));
    }
    Ok(trimmed.to_string())
}
