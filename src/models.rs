use thiserror::Error;

/// Natural key of a book record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Isbn(String);

impl Isbn {
    pub fn new(raw: &str) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Isbn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Every field of a book except its key. Updates overwrite all of them at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDetails {
    pub amazon_url: String,
    pub author: String,
    pub language: String,
    pub pages: i64,
    pub publisher: String,
    pub title: String,
    pub year: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    isbn: Isbn,
    details: BookDetails,
}

impl Book {
    pub const fn new(isbn: Isbn, details: BookDetails) -> Self {
        Self { isbn, details }
    }

    pub const fn isbn(&self) -> &Isbn {
        &self.isbn
    }

    pub const fn details(&self) -> &BookDetails {
        &self.details
    }

    pub fn into_parts(self) -> (Isbn, BookDetails) {
        (self.isbn, self.details)
    }
}

/// Columns a listing may be narrowed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookColumn {
    Isbn,
    AmazonUrl,
    Author,
    Language,
    Pages,
    Publisher,
    Title,
    Year,
}

impl BookColumn {
    pub const ALL: [Self; 8] = [
        Self::Isbn,
        Self::AmazonUrl,
        Self::Author,
        Self::Language,
        Self::Pages,
        Self::Publisher,
        Self::Title,
        Self::Year,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Isbn => "isbn",
            Self::AmazonUrl => "amazon_url",
            Self::Author => "author",
            Self::Language => "language",
            Self::Pages => "pages",
            Self::Publisher => "publisher",
            Self::Title => "title",
            Self::Year => "year",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|column| column.name() == name)
    }

    const fn is_integer(self) -> bool {
        matches!(self, Self::Pages | Self::Year)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Integer(i64),
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("filter {column} must be an integer, got \"{value}\"")]
pub struct FilterValueError {
    column: &'static str,
    value: String,
}

/// Exact-match conditions, combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    conditions: Vec<(BookColumn, FilterValue)>,
}

impl BookFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality condition, parsing `raw` according to the column type.
    pub fn push(&mut self, column: BookColumn, raw: &str) -> Result<(), FilterValueError> {
        let value = if column.is_integer() {
            let parsed = raw.trim().parse().map_err(|_| FilterValueError {
                column: column.name(),
                value: raw.into(),
            })?;
            FilterValue::Integer(parsed)
        } else {
            FilterValue::Text(raw.into())
        };
        self.conditions.push((column, value));
        Ok(())
    }

    pub fn conditions(&self) -> &[(BookColumn, FilterValue)] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

#[derive(Debug)]
pub struct CreateBookRequest {
    isbn: Isbn,
    details: BookDetails,
}

impl CreateBookRequest {
    pub const fn new(isbn: Isbn, details: BookDetails) -> Self {
        Self { isbn, details }
    }

    pub const fn isbn(&self) -> &Isbn {
        &self.isbn
    }

    pub const fn details(&self) -> &BookDetails {
        &self.details
    }
}

#[derive(Error, Debug)]
pub enum CreateBookError {
    #[error("Book with isbn \"{isbn}\" already exists")]
    Duplicate { isbn: Isbn },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Debug)]
pub struct FindBookRequest {
    isbn: Isbn,
}

impl FindBookRequest {
    pub const fn new(isbn: Isbn) -> Self {
        Self { isbn }
    }

    pub const fn isbn(&self) -> &Isbn {
        &self.isbn
    }
}

#[derive(Error, Debug)]
pub enum FindBookError {
    #[error("There is no book with an isbn of \"{isbn}\"")]
    NotFound { isbn: Isbn },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Debug, Default)]
pub struct FindAllBooksRequest {
    filter: BookFilter,
}

impl FindAllBooksRequest {
    pub const fn new(filter: BookFilter) -> Self {
        Self { filter }
    }

    pub const fn filter(&self) -> &BookFilter {
        &self.filter
    }
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct FindAllBooksError(#[from] pub anyhow::Error);

#[derive(Debug)]
pub struct UpdateBookRequest {
    isbn: Isbn,
    details: BookDetails,
}

impl UpdateBookRequest {
    pub const fn new(isbn: Isbn, details: BookDetails) -> Self {
        Self { isbn, details }
    }

    pub const fn isbn(&self) -> &Isbn {
        &self.isbn
    }

    pub const fn details(&self) -> &BookDetails {
        &self.details
    }
}

#[derive(Error, Debug)]
pub enum UpdateBookError {
    #[error("There is no book with an isbn of \"{isbn}\"")]
    NotFound { isbn: Isbn },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Debug)]
pub struct DeleteBookRequest {
    isbn: Isbn,
}

impl DeleteBookRequest {
    pub const fn new(isbn: Isbn) -> Self {
        Self { isbn }
    }

    pub const fn isbn(&self) -> &Isbn {
        &self.isbn
    }
}

#[derive(Error, Debug)]
pub enum DeleteBookError {
    #[error("There is no book with an isbn of \"{isbn}\"")]
    NotFound { isbn: Isbn },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
