use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;

/// Creates a SQLite connection pool
///
/// Creates the database file if it does not exist and enables foreign key
/// enforcement on every connection. In-memory databases are private to a
/// single connection, so their pool is pinned to one connection that is
/// never recycled.
pub async fn create_pool(database_url: &str) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?
    };

    Ok(pool)
}

/// Applies the embedded schema migrations
pub async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Inserts a handful of well-known books when the catalog is empty.
/// Returns the number of books inserted.
pub async fn seed_sample_books(pool: &SqlitePool) -> anyhow::Result<usize> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(0);
    }

    let samples = [
        ("The Great Gatsby", "F. Scott Fitzgerald", "Classic", 1925),
        ("To Kill a Mockingbird", "Harper Lee", "Fiction", 1960),
        ("1984", "George Orwell", "Dystopian", 1949),
        ("Pride and Prejudice", "Jane Austen", "Romance", 1813),
        ("The Catcher in the Rye", "J.D. Salinger", "Coming-of-Age", 1951),
    ];

    let mut tx = pool.begin().await?;
    for (title, author, genre, year) in samples {
        sqlx::query("INSERT INTO books (title, author, genre, published_year) VALUES (?, ?, ?, ?)")
            .bind(title)
            .bind(author)
            .bind(genre)
            .bind(year)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    tracing::info!(count = samples.len(), "Sample books added to database");
    Ok(samples.len())
}
