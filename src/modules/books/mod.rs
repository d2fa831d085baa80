pub mod models;
pub mod routes;
pub mod schema;
pub mod service;
pub mod store;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{InitCtx, Migration, Module};
use serde_json::json;
use sqlx::SqlitePool;

use service::BookService;
use store::BookStore;

/// The books resource: CRUD over the `books` table keyed by ISBN
pub struct BooksModule {
    service: BookService,
}

impl BooksModule {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            service: BookService::new(BookStore::new(pool)),
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let book_envelope = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/BookEnvelope" }
                    }
                }
            })
        };
        let isbn_param = json!({
            "name": "isbn",
            "in": "path",
            "required": true,
            "schema": { "type": "string" }
        });
        let payload = json!({
            "required": true,
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/Book" }
                }
            }
        });

        let book_properties = json!({
            "isbn": { "type": "string", "description": "ISBN, the book's unique key" },
            "amazon_url": { "type": "string" },
            "author": { "type": "string" },
            "language": { "type": "string" },
            "pages": { "type": "integer", "format": "int32", "minimum": 1 },
            "publisher": { "type": "string" },
            "title": { "type": "string" },
            "year": { "type": "integer", "format": "int32" }
        });

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "Every stored book",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/BookList" }
                                    }
                                }
                            },
                            "500": error("Internal server error")
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": payload,
                        "responses": {
                            "201": book_envelope("The created book"),
                            "400": error("Payload failed validation"),
                            "409": error("A book with this ISBN already exists"),
                            "500": error("Internal server error")
                        }
                    }
                },
                "/{isbn}": {
                    "get": {
                        "summary": "Get a book by ISBN",
                        "tags": ["Books"],
                        "parameters": [isbn_param],
                        "responses": {
                            "200": book_envelope("The book"),
                            "404": error("No book with this ISBN")
                        }
                    },
                    "put": {
                        "summary": "Replace a book's details; the ISBN itself never changes",
                        "tags": ["Books"],
                        "parameters": [isbn_param],
                        "requestBody": payload,
                        "responses": {
                            "200": book_envelope("The updated book"),
                            "400": error("Payload failed validation"),
                            "404": error("No book with this ISBN")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "parameters": [isbn_param],
                        "responses": {
                            "200": {
                                "description": "Book deleted",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": { "message": { "type": "string" } },
                                            "required": ["message"]
                                        }
                                    }
                                }
                            },
                            "404": error("No book with this ISBN")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": book_properties,
                        "required": [
                            "isbn", "amazon_url", "author", "language",
                            "pages", "publisher", "title", "year"
                        ]
                    },
                    "BookEnvelope": {
                        "type": "object",
                        "properties": { "book": { "$ref": "#/components/schemas/Book" } },
                        "required": ["book"]
                    },
                    "BookList": {
                        "type": "object",
                        "properties": {
                            "books": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/Book" }
                            }
                        },
                        "required": ["books"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_create_books",
            up: r#"
                CREATE TABLE IF NOT EXISTS books (
                    isbn       TEXT    PRIMARY KEY NOT NULL,
                    amazon_url TEXT    NOT NULL,
                    author     TEXT    NOT NULL,
                    language   TEXT    NOT NULL,
                    pages      INTEGER NOT NULL,
                    publisher  TEXT    NOT NULL,
                    title      TEXT    NOT NULL,
                    year       INTEGER NOT NULL
                );
                "#,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(pool: SqlitePool) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new(pool))
}
