use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookDetail, BookPage, BookSummary, BookUpdate, NewBook},
};

const DEFAULT_PER_PAGE: i64 = 10;
const MAX_PER_PAGE: i64 = 50;
const DEFAULT_RANDOM_COUNT: i64 = 3;
const MAX_RANDOM_COUNT: i64 = 10;

/// Catalog listing parameters
#[derive(Debug, Default, Deserialize)]
pub struct BookQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Case-insensitive substring match on genre
    pub genre: Option<String>,
    /// Case-insensitive substring match on author
    pub author: Option<String>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, query: &BookQuery) {
    qb.push(" WHERE 1 = 1");
    if let Some(genre) = query.genre.as_deref().filter(|g| !g.is_empty()) {
        push_contains(qb, "genre", genre);
    }
    if let Some(author) = query.author.as_deref().filter(|a| !a.is_empty()) {
        push_contains(qb, "author", author);
    }
}

/// `instr` keeps `%` and `_` in the needle literal, unlike `LIKE`
fn push_contains(qb: &mut QueryBuilder<'_, Sqlite>, column: &str, needle: &str) {
    qb.push(format!(" AND instr(lower({}), ", column))
        .push_bind(needle.to_lowercase())
        .push(") > 0");
}

/// Returns one page of the catalog, ordered by id
pub async fn list_books(pool: &SqlitePool, query: &BookQuery) -> AppResult<BookPage> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query
        .per_page
        .unwrap_or(DEFAULT_PER_PAGE)
        .clamp(1, MAX_PER_PAGE);

    let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM books");
    push_filters(&mut count_qb, query);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT id, title, author, genre, description, published_year FROM books",
    );
    push_filters(&mut qb, query);
    qb.push(" ORDER BY id LIMIT ")
        .push_bind(per_page)
        .push(" OFFSET ")
        .push_bind((page - 1).saturating_mul(per_page));
    let books: Vec<Book> = qb.build_query_as().fetch_all(pool).await?;

    Ok(BookPage {
        books: books.iter().map(BookSummary::from).collect(),
        total,
        pages: (total + per_page - 1) / per_page,
        current_page: page,
    })
}

pub async fn find_book(pool: &SqlitePool, id: i64) -> AppResult<Option<Book>> {
    let book = sqlx::query_as::<_, Book>(
        "SELECT id, title, author, genre, description, published_year FROM books WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(book)
}

async fn require_book(pool: &SqlitePool, id: i64) -> AppResult<Book> {
    find_book(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
}

/// Returns a book with its average rating and rating count
pub async fn get_book(pool: &SqlitePool, id: i64) -> AppResult<BookDetail> {
    let book = require_book(pool, id).await?;

    let (average, count): (f64, i64) = sqlx::query_as(
        "SELECT COALESCE(AVG(score), 0.0), COUNT(*) FROM ratings WHERE book_id = ?",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;

    Ok(BookDetail::new(book, average, count))
}

pub async fn create_book(pool: &SqlitePool, new_book: NewBook) -> AppResult<BookDetail> {
    let new_book = new_book.validated()?;

    let id = sqlx::query(
        "INSERT INTO books (title, author, genre, description, published_year) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&new_book.title)
    .bind(&new_book.author)
    .bind(&new_book.genre)
    .bind(&new_book.description)
    .bind(new_book.published_year)
    .execute(pool)
    .await?
    .last_insert_rowid();

    tracing::info!(book_id = id, title = %new_book.title, "Book created");

    let book = Book {
        id,
        title: new_book.title,
        author: new_book.author,
        genre: new_book.genre,
        description: new_book.description,
        published_year: new_book.published_year,
    };
    Ok(BookDetail::new(book, 0.0, 0))
}

/// Applies a partial update and returns the updated record
pub async fn update_book(pool: &SqlitePool, id: i64, update: BookUpdate) -> AppResult<Book> {
    let update = update.validated()?;
    let mut book = require_book(pool, id).await?;
    update.apply(&mut book);

    sqlx::query(
        "UPDATE books SET title = ?, author = ?, genre = ?, description = ?, published_year = ? WHERE id = ?",
    )
    .bind(&book.title)
    .bind(&book.author)
    .bind(&book.genre)
    .bind(&book.description)
    .bind(book.published_year)
    .bind(book.id)
    .execute(pool)
    .await?;

    tracing::info!(book_id = id, "Book updated");
    Ok(book)
}

/// Returns a random selection of books
pub async fn random_books(pool: &SqlitePool, count: Option<i64>) -> AppResult<Vec<BookSummary>> {
    let count = count
        .unwrap_or(DEFAULT_RANDOM_COUNT)
        .clamp(1, MAX_RANDOM_COUNT);

    let books = sqlx::query_as::<_, Book>(
        "SELECT id, title, author, genre, description, published_year FROM books ORDER BY RANDOM() LIMIT ?",
    )
    .bind(count)
    .fetch_all(pool)
    .await?;

    Ok(books.iter().map(BookSummary::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn seeded_pool() -> SqlitePool {
        let pool = db::create_pool("sqlite::memory:").await.unwrap();
        db::migrate(&pool).await.unwrap();
        db::seed_sample_books(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_pagination_clamps_and_counts_pages() {
        let pool = seeded_pool().await;

        let page = list_books(
            &pool,
            &BookQuery {
                page: Some(2),
                per_page: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.pages, 3);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.books.len(), 2);
        assert_eq!(page.books[0].id, 3);

        let page = list_books(
            &pool,
            &BookQuery {
                page: Some(0),
                per_page: Some(500),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(page.current_page, 1);
        assert_eq!(page.books.len(), 5);
    }

    #[tokio::test]
    async fn test_filters_are_case_insensitive_substrings() {
        let pool = seeded_pool().await;

        let page = list_books(
            &pool,
            &BookQuery {
                genre: Some("dystop".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.books[0].title, "1984");

        let page = list_books(
            &pool,
            &BookQuery {
                author: Some("AUSTEN".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(page.books[0].title, "Pride and Prejudice");
    }

    #[tokio::test]
    async fn test_filters_treat_wildcards_literally() {
        let pool = seeded_pool().await;

        for needle in ["_", "%", "f%n"] {
            let page = list_books(
                &pool,
                &BookQuery {
                    genre: Some(needle.to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
            assert_eq!(page.total, 0, "genre filter {:?}", needle);
        }

        let page = list_books(
            &pool,
            &BookQuery {
                author: Some("ORWELL".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_get_book_without_ratings() {
        let pool = seeded_pool().await;
        let detail = get_book(&pool, 1).await.unwrap();
        assert_eq!(detail.title, "The Great Gatsby");
        assert_eq!(detail.average_rating, 0.0);
        assert_eq!(detail.rating_count, 0);

        assert!(matches!(
            get_book(&pool, 999).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_and_update_book() {
        let pool = seeded_pool().await;

        let created = create_book(
            &pool,
            NewBook {
                title: "Dune".to_string(),
                author: "Frank Herbert".to_string(),
                genre: "Science Fiction".to_string(),
                description: None,
                published_year: Some(1965),
            },
        )
        .await
        .unwrap();
        assert_eq!(created.id, 6);

        let updated = update_book(
            &pool,
            created.id,
            BookUpdate {
                description: Some("Spice".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.title, "Dune");
        assert_eq!(updated.description.as_deref(), Some("Spice"));

        let reloaded = get_book(&pool, created.id).await.unwrap();
        assert_eq!(reloaded.description.as_deref(), Some("Spice"));
    }

    #[tokio::test]
    async fn test_random_books_respects_bounds() {
        let pool = seeded_pool().await;
        assert_eq!(random_books(&pool, None).await.unwrap().len(), 3);
        assert_eq!(random_books(&pool, Some(100)).await.unwrap().len(), 5);
        assert_eq!(random_books(&pool, Some(-4)).await.unwrap().len(), 1);
    }
}
