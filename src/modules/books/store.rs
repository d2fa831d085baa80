use sqlx::SqlitePool;

use super::models::{Book, BookChanges};

const COLUMNS: &str = "isbn, amazon_url, author, language, pages, publisher, title, year";

/// Persistence for books. Every call is a single parameterized statement
/// run on a connection borrowed from the pool for the duration of the call.
#[derive(Debug, Clone)]
pub struct BookStore {
    pool: SqlitePool,
}

impl BookStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Book>, sqlx::Error> {
        sqlx::query_as::<_, Book>(&format!("SELECT {COLUMNS} FROM books ORDER BY rowid"))
            .fetch_all(&self.pool)
            .await
    }

    pub async fn find(&self, isbn: &str) -> Result<Option<Book>, sqlx::Error> {
        sqlx::query_as::<_, Book>(&format!("SELECT {COLUMNS} FROM books WHERE isbn = ?"))
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn insert(&self, book: &Book) -> Result<Book, sqlx::Error> {
        sqlx::query_as::<_, Book>(&format!(
            "INSERT INTO books ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
        ))
        .bind(&book.isbn)
        .bind(&book.amazon_url)
        .bind(&book.author)
        .bind(&book.language)
        .bind(book.pages)
        .bind(&book.publisher)
        .bind(&book.title)
        .bind(book.year)
        .fetch_one(&self.pool)
        .await
    }

    /// Overwrite every non-key column. `None` when no row has `isbn`.
    pub async fn update(
        &self,
        isbn: &str,
        changes: &BookChanges,
    ) -> Result<Option<Book>, sqlx::Error> {
        sqlx::query_as::<_, Book>(&format!(
            "UPDATE books \
             SET amazon_url = ?, author = ?, language = ?, pages = ?, \
                 publisher = ?, title = ?, year = ? \
             WHERE isbn = ? \
             RETURNING {COLUMNS}"
        ))
        .bind(&changes.amazon_url)
        .bind(&changes.author)
        .bind(&changes.language)
        .bind(changes.pages)
        .bind(&changes.publisher)
        .bind(&changes.title)
        .bind(changes.year)
        .bind(isbn)
        .fetch_optional(&self.pool)
        .await
    }

    /// Returns whether a row was removed.
    pub async fn delete(&self, isbn: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM books WHERE isbn = ?")
            .bind(isbn)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
