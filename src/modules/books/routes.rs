use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bookshelf_http::AppError;
use serde_json::Value;

use super::models::{BookResponse, BooksResponse, MessageResponse};
use super::service::{BookError, BookService};

impl From<BookError> for AppError {
    fn from(error: BookError) -> Self {
        match error {
            BookError::Validation(messages) => AppError::validation(messages),
            e @ BookError::NotFound(_) => AppError::not_found(e.to_string()),
            e @ BookError::Conflict(_) => AppError::conflict(e.to_string()),
            BookError::Database(e) => AppError::Internal(anyhow::Error::new(e)),
        }
    }
}

/// Routes for the books resource, relative to the module mount point.
pub fn router(service: BookService) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route(
            "/{isbn}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(service)
}

async fn list_books(State(service): State<BookService>) -> Result<Json<BooksResponse>, AppError> {
    let books = service.list().await?;
    Ok(Json(BooksResponse { books }))
}

async fn get_book(
    State(service): State<BookService>,
    Path(isbn): Path<String>,
) -> Result<Json<BookResponse>, AppError> {
    let book = service.get(&isbn).await?;
    Ok(Json(BookResponse { book }))
}

async fn create_book(
    State(service): State<BookService>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<BookResponse>), AppError> {
    let Json(payload) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;
    let book = service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(BookResponse { book })))
}

async fn update_book(
    State(service): State<BookService>,
    Path(isbn): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BookResponse>, AppError> {
    let Json(payload) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;
    let book = service.update(&isbn, payload).await?;
    Ok(Json(BookResponse { book }))
}

async fn delete_book(
    State(service): State<BookService>,
    Path(isbn): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    service.delete(&isbn).await?;
    Ok(Json(MessageResponse {
        message: "Book deleted".to_string(),
    }))
}
