use crate::models::{
    Book, BookDetails, CreateBookError, CreateBookRequest, DeleteBookError, DeleteBookRequest,
    FilterValue, FindAllBooksError, FindAllBooksRequest, FindBookError, FindBookRequest, Isbn,
    UpdateBookError, UpdateBookRequest,
};
use crate::repositories::BookRepository;
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteRow};
use sqlx::{FromRow, Row, Sqlite, SqlitePool};
use std::str::FromStr;

static MIGRATOR: Migrator = sqlx::migrate!();

const BOOK_COLUMNS: &str = "isbn, amazon_url, author, language, pages, publisher, title, year";

/// Opens the pool, creating the database file if needed, and brings the schema up to date.
pub async fn establish_pool(path: &str) -> anyhow::Result<SqlitePool> {
    let opts = SqliteConnectOptions::from_str(path)
        .with_context(|| format!("Invalid database path {path}"))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);
    let pool = SqlitePool::connect_with(opts)
        .await
        .with_context(|| format!("Failed to open database at {path}"))?;

    MIGRATOR
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}

#[derive(Debug)]
pub struct SqliteBookRepository {
    pool: SqlitePool,
}

impl SqliteBookRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl<'r> FromRow<'r, SqliteRow> for Book {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let isbn: String = row.try_get("isbn")?;
        let details = BookDetails {
            amazon_url: row.try_get("amazon_url")?,
            author: row.try_get("author")?,
            language: row.try_get("language")?,
            pages: row.try_get("pages")?,
            publisher: row.try_get("publisher")?,
            title: row.try_get("title")?,
            year: row.try_get("year")?,
        };

        Ok(Self::new(Isbn::new(&isbn), details))
    }
}

#[async_trait]
impl BookRepository for SqliteBookRepository {
    async fn create_book(&self, req: &CreateBookRequest) -> Result<Book, CreateBookError> {
        let details = req.details();
        let sql = format!(
            "INSERT INTO books ({BOOK_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {BOOK_COLUMNS}"
        );
        let book = sqlx::query_as(&sql)
            .bind(req.isbn().as_str())
            .bind(details.amazon_url.as_str())
            .bind(details.author.as_str())
            .bind(details.language.as_str())
            .bind(details.pages)
            .bind(details.publisher.as_str())
            .bind(details.title.as_str())
            .bind(details.year)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    CreateBookError::Duplicate {
                        isbn: req.isbn().clone(),
                    }
                } else {
                    let err = anyhow!(err).context(format!(
                        r#"Failed to create book with isbn "{}""#,
                        req.isbn()
                    ));
                    CreateBookError::Other(err)
                }
            })?;

        Ok(book)
    }

    async fn find_book(&self, req: &FindBookRequest) -> Result<Book, FindBookError> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE isbn = ?");
        let book = sqlx::query_as(&sql)
            .bind(req.isbn().as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                if matches!(err, sqlx::Error::RowNotFound) {
                    FindBookError::NotFound {
                        isbn: req.isbn().clone(),
                    }
                } else {
                    let err = anyhow!(err).context(format!(
                        r#"Failed to retrieve book with isbn "{}""#,
                        req.isbn()
                    ));
                    FindBookError::Other(err)
                }
            })?;

        Ok(book)
    }

    async fn find_all_books(
        &self,
        req: &FindAllBooksRequest,
    ) -> Result<Vec<Book>, FindAllBooksError> {
        let filter = req.filter();
        let mut sql = format!("SELECT {BOOK_COLUMNS} FROM books");
        if !filter.is_empty() {
            let parts: Vec<String> = filter
                .conditions()
                .iter()
                .map(|(column, _)| format!("{} = ?", column.name()))
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&parts.join(" AND "));
        }

        let mut query = sqlx::query_as::<Sqlite, Book>(&sql);
        for (_, value) in filter.conditions() {
            query = match value {
                FilterValue::Text(text) => query.bind(text.as_str()),
                FilterValue::Integer(number) => query.bind(*number),
            };
        }

        let books = query.fetch_all(&self.pool).await.map_err(|err| {
            let err = anyhow!(err).context("Failed to retrieve books");
            FindAllBooksError(err)
        })?;

        Ok(books)
    }

    async fn update_book(&self, req: &UpdateBookRequest) -> Result<Book, UpdateBookError> {
        let details = req.details();
        let sql = format!(
            "UPDATE books SET amazon_url = ?, author = ?, language = ?, pages = ?, \
             publisher = ?, title = ?, year = ? WHERE isbn = ? RETURNING {BOOK_COLUMNS}"
        );
        let book = sqlx::query_as(&sql)
            .bind(details.amazon_url.as_str())
            .bind(details.author.as_str())
            .bind(details.language.as_str())
            .bind(details.pages)
            .bind(details.publisher.as_str())
            .bind(details.title.as_str())
            .bind(details.year)
            .bind(req.isbn().as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                if matches!(err, sqlx::Error::RowNotFound) {
                    UpdateBookError::NotFound {
                        isbn: req.isbn().clone(),
                    }
                } else {
                    let err = anyhow!(err).context(format!(
                        r#"Failed to update book with isbn "{}""#,
                        req.isbn()
                    ));
                    UpdateBookError::Other(err)
                }
            })?;

        Ok(book)
    }

    async fn delete_book(&self, req: &DeleteBookRequest) -> Result<(), DeleteBookError> {
        sqlx::query("DELETE FROM books WHERE isbn = ? RETURNING isbn")
            .bind(req.isbn().as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                if matches!(err, sqlx::Error::RowNotFound) {
                    DeleteBookError::NotFound {
                        isbn: req.isbn().clone(),
                    }
                } else {
                    let err = anyhow!(err).context(format!(
                        r#"Failed to delete book with isbn "{}""#,
                        req.isbn()
                    ));
                    DeleteBookError::Other(err)
                }
            })?;

        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.is_unique_violation();
    }

    false
}
