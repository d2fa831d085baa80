//! The book resource service: validation, persistence and outcome mapping,
//! independent of any transport.

use serde_json::Value;
use thiserror::Error;

use super::models::{Book, BookChanges};
use super::schema::BOOK_SCHEMA;
use super::store::BookStore;

#[derive(Error, Debug)]
pub enum BookError {
    #[error("invalid book payload: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("no book with isbn '{0}'")]
    NotFound(String),

    #[error("a book with isbn '{0}' already exists")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type BookResult<T> = Result<T, BookError>;

#[derive(Debug, Clone)]
pub struct BookService {
    store: BookStore,
}

impl BookService {
    pub fn new(store: BookStore) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> BookResult<Vec<Book>> {
        let books = self.store.list().await?;
        tracing::debug!(count = books.len(), "listed books");
        Ok(books)
    }

    pub async fn get(&self, isbn: &str) -> BookResult<Book> {
        self.store
            .find(isbn)
            .await?
            .ok_or_else(|| BookError::NotFound(isbn.to_string()))
    }

    /// Validate `payload` and insert it. Nothing is written when validation fails.
    pub async fn create(&self, payload: Value) -> BookResult<Book> {
        let book: Book = BOOK_SCHEMA.parse(payload).map_err(BookError::Validation)?;

        let created = self.store.insert(&book).await.map_err(|e| {
            if is_unique_violation(&e) {
                BookError::Conflict(book.isbn.clone())
            } else {
                BookError::Database(e)
            }
        })?;

        tracing::info!(isbn = %created.isbn, "book created");
        Ok(created)
    }

    /// Validate `payload` and overwrite the book keyed by `isbn`. The payload
    /// is checked like a create, but only the path key selects the row.
    pub async fn update(&self, isbn: &str, payload: Value) -> BookResult<Book> {
        let changes: BookChanges = BOOK_SCHEMA.parse(payload).map_err(BookError::Validation)?;

        let updated = self
            .store
            .update(isbn, &changes)
            .await?
            .ok_or_else(|| BookError::NotFound(isbn.to_string()))?;

        tracing::info!(isbn = %updated.isbn, "book updated");
        Ok(updated)
    }

    pub async fn delete(&self, isbn: &str) -> BookResult<()> {
        if !self.store.delete(isbn).await? {
            return Err(BookError::NotFound(isbn.to_string()));
        }

        tracing::info!(%isbn, "book deleted");
        Ok(())
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::BooksModule;
    use bookshelf_kernel::Module;
    use serde_json::json;
    use sqlx::SqlitePool;

    async fn service() -> (BookService, SqlitePool) {
        let pool = bookshelf_db::connect_url("sqlite::memory:", 1).await.unwrap();
        let module = BooksModule::new(pool.clone());
        let migrations: Vec<_> = module
            .migrations()
            .into_iter()
            .map(|migration| (module.name().to_string(), migration))
            .collect();
        bookshelf_db::migrate(&pool, &migrations).await.unwrap();
        (BookService::new(BookStore::new(pool.clone())), pool)
    }

    async fn row_count(pool: &SqlitePool) -> i64 {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM books")
            .fetch_one(pool)
            .await
            .unwrap();
        count
    }

    fn payload(isbn: &str) -> Value {
        json!({
            "isbn": isbn,
            "amazon_url": "https://amazon.com/cat",
            "author": "Test Author",
            "language": "ENG",
            "pages": 100,
            "publisher": "Test Publishers",
            "title": "Test Title",
            "year": 2000
        })
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let (service, _pool) = service().await;

        let created = service.create(payload("123456789")).await.unwrap();
        let fetched = service.get("123456789").await.unwrap();

        assert_eq!(created, fetched);
        assert_eq!(fetched.title, "Test Title");
    }

    #[tokio::test]
    async fn duplicate_isbn_is_a_conflict() {
        let (service, _pool) = service().await;
        service.create(payload("123456789")).await.unwrap();

        let err = service.create(payload("123456789")).await.unwrap_err();
        assert!(matches!(err, BookError::Conflict(isbn) if isbn == "123456789"));
    }

    #[tokio::test]
    async fn invalid_create_writes_nothing() {
        let (service, pool) = service().await;
        let mut body = payload("123456789");
        body.as_object_mut().unwrap().remove("title");

        let err = service.create(body).await.unwrap_err();
        assert!(
            matches!(err, BookError::Validation(ref messages) if messages == &["title is required"])
        );
        assert_eq!(row_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let (service, _pool) = service().await;

        assert!(matches!(service.get("0").await, Err(BookError::NotFound(_))));
        assert!(matches!(
            service.update("0", payload("0")).await,
            Err(BookError::NotFound(_))
        ));
        assert!(matches!(service.delete("0").await, Err(BookError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_requires_isbn_in_body_but_keys_by_path() {
        let (service, _pool) = service().await;
        service.create(payload("123456789")).await.unwrap();

        let mut body = payload("123456789");
        body.as_object_mut().unwrap().remove("isbn");
        let err = service.update("123456789", body).await.unwrap_err();
        assert!(
            matches!(err, BookError::Validation(ref messages) if messages == &["isbn is required"])
        );

        let updated = service.update("123456789", payload("246810")).await.unwrap();
        assert_eq!(updated.isbn, "123456789");
        assert!(matches!(service.get("246810").await, Err(BookError::NotFound(_))));
    }

    #[tokio::test]
    async fn invalid_update_is_rejected_before_lookup() {
        let (service, _pool) = service().await;
        let err = service.update("0", json!({})).await.unwrap_err();
        match err {
            BookError::Validation(messages) => assert_eq!(messages.len(), 8),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
