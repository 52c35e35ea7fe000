use crate::http::AppState;
use crate::models::{
    Book, BookColumn, BookDetails, BookFilter, CreateBookError, CreateBookRequest,
    DeleteBookError, DeleteBookRequest, FilterValueError, FindAllBooksError, FindAllBooksRequest,
    FindBookError, FindBookRequest, Isbn, UpdateBookError, UpdateBookRequest,
};
use crate::repositories::BookRepository;
use crate::schema::{NEW_BOOK, Schema, SchemaError, UPDATE_BOOK};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug)]
pub struct ApiSuccess<T: Serialize>(StatusCode, Json<T>);

impl<T: Serialize> ApiSuccess<T> {
    pub const fn new(status: StatusCode, data: T) -> Self {
        Self(status, Json(data))
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> axum::response::Response {
        (self.0, self.1).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    status: u16,
    messages: Vec<String>,
}

impl ApiErrorResponse {
    fn new(status: StatusCode, messages: Vec<String>) -> Self {
        Self {
            error: ApiErrorBody {
                status: status.as_u16(),
                messages,
            },
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(Vec<String>),
    NotFound(String),
    MethodNotAllowed,
    Conflict(String),
    InternalServerError(String),
}

impl ApiError {
    fn internal(cause: &anyhow::Error) -> Self {
        tracing::error!(error = ?cause, "unexpected store failure");
        Self::InternalServerError("Internal server error".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, messages) = match self {
            Self::BadRequest(messages) => (StatusCode::BAD_REQUEST, messages),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, vec![msg]),
            Self::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                vec!["Method Not Allowed".to_string()],
            ),
            Self::Conflict(msg) => (StatusCode::CONFLICT, vec![msg]),
            Self::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, vec![msg]),
        };
        (status, Json(ApiErrorResponse::new(status, messages))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(vec![rejection.body_text()])
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(vec![rejection.body_text()])
    }
}

impl From<SchemaError> for ApiError {
    fn from(err: SchemaError) -> Self {
        Self::BadRequest(err.into_messages())
    }
}

impl From<FilterValueError> for ApiError {
    fn from(err: FilterValueError) -> Self {
        Self::BadRequest(vec![err.to_string()])
    }
}

impl From<CreateBookError> for ApiError {
    fn from(err: CreateBookError) -> Self {
        match err {
            CreateBookError::Duplicate { .. } => Self::Conflict(err.to_string()),
            CreateBookError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<FindBookError> for ApiError {
    fn from(err: FindBookError) -> Self {
        match err {
            FindBookError::NotFound { .. } => Self::NotFound(err.to_string()),
            FindBookError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<FindAllBooksError> for ApiError {
    fn from(err: FindAllBooksError) -> Self {
        Self::internal(&err.0)
    }
}

impl From<UpdateBookError> for ApiError {
    fn from(err: UpdateBookError) -> Self {
        match err {
            UpdateBookError::NotFound { .. } => Self::NotFound(err.to_string()),
            UpdateBookError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<DeleteBookError> for ApiError {
    fn from(err: DeleteBookError) -> Self {
        match err {
            DeleteBookError::NotFound { .. } => Self::NotFound(err.to_string()),
            DeleteBookError::Other(cause) => Self::internal(&cause),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BookDetailsHttpRequest {
    amazon_url: String,
    author: String,
    language: String,
    pages: i64,
    publisher: String,
    title: String,
    year: i64,
}

impl From<BookDetailsHttpRequest> for BookDetails {
    fn from(value: BookDetailsHttpRequest) -> Self {
        Self {
            amazon_url: value.amazon_url,
            author: value.author,
            language: value.language,
            pages: value.pages,
            publisher: value.publisher,
            title: value.title,
            year: value.year,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateBookHttpRequest {
    isbn: String,
    #[serde(flatten)]
    details: BookDetailsHttpRequest,
}

impl From<CreateBookHttpRequest> for CreateBookRequest {
    fn from(value: CreateBookHttpRequest) -> Self {
        Self::new(Isbn::new(&value.isbn), value.details.into())
    }
}

#[derive(Debug, Serialize)]
pub struct BookHttpResponse {
    isbn: String,
    amazon_url: String,
    author: String,
    language: String,
    pages: i64,
    publisher: String,
    title: String,
    year: i64,
}

impl From<Book> for BookHttpResponse {
    fn from(value: Book) -> Self {
        let (isbn, details) = value.into_parts();
        Self {
            isbn: isbn.to_string(),
            amazon_url: details.amazon_url,
            author: details.author,
            language: details.language,
            pages: details.pages,
            publisher: details.publisher,
            title: details.title,
            year: details.year,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SingleBookHttpResponse {
    book: BookHttpResponse,
}

impl From<Book> for SingleBookHttpResponse {
    fn from(value: Book) -> Self {
        Self { book: value.into() }
    }
}

#[derive(Debug, Serialize)]
pub struct BookListHttpResponse {
    books: Vec<BookHttpResponse>,
}

#[derive(Debug, Serialize)]
pub struct MessageHttpResponse {
    message: &'static str,
}

/// Checks `payload` against `schema`, then deserializes it.
fn parse_payload<T: DeserializeOwned>(
    schema: &Schema,
    mut payload: Value,
) -> Result<T, ApiError> {
    schema.validate(&payload)?;
    schema.normalize(&mut payload);
    serde_json::from_value(payload).map_err(|err| ApiError::BadRequest(vec![err.to_string()]))
}

fn parse_filter(params: Vec<(String, String)>) -> Result<BookFilter, FilterValueError> {
    let mut filter = BookFilter::new();
    for (key, value) in params {
        match BookColumn::from_name(&key) {
            Some(column) => filter.push(column, &value)?,
            None => tracing::debug!(%key, "ignoring unknown filter"),
        }
    }
    Ok(filter)
}

pub async fn list_books<BR: BookRepository>(
    State(state): State<AppState<BR>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<ApiSuccess<BookListHttpResponse>, ApiError> {
    let req = FindAllBooksRequest::new(parse_filter(params)?);
    let books = state.book_repo.find_all_books(&req).await?;
    let books = books.into_iter().map(BookHttpResponse::from).collect();
    Ok(ApiSuccess::new(StatusCode::OK, BookListHttpResponse { books }))
}

pub async fn find_book<BR: BookRepository>(
    State(state): State<AppState<BR>>,
    isbn: Result<Path<String>, PathRejection>,
) -> Result<ApiSuccess<SingleBookHttpResponse>, ApiError> {
    let Path(isbn) = isbn?;
    let req = FindBookRequest::new(Isbn::new(&isbn));
    state
        .book_repo
        .find_book(&req)
        .await
        .map_err(ApiError::from)
        .map(|book| ApiSuccess::new(StatusCode::OK, book.into()))
}

pub async fn create_book<BR: BookRepository>(
    State(state): State<AppState<BR>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<ApiSuccess<SingleBookHttpResponse>, ApiError> {
    let Json(payload) = payload?;
    let body: CreateBookHttpRequest = parse_payload(&NEW_BOOK, payload)?;
    let req = body.into();
    state
        .book_repo
        .create_book(&req)
        .await
        .map_err(ApiError::from)
        .map(|book| ApiSuccess::new(StatusCode::CREATED, book.into()))
}

pub async fn update_book<BR: BookRepository>(
    State(state): State<AppState<BR>>,
    isbn: Result<Path<String>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<ApiSuccess<SingleBookHttpResponse>, ApiError> {
    let Path(isbn) = isbn?;
    let Json(payload) = payload?;
    if payload.get("isbn").is_some() {
        return Err(ApiError::BadRequest(vec!["Not Allowed.".to_string()]));
    }

    let body: BookDetailsHttpRequest = parse_payload(&UPDATE_BOOK, payload)?;
    let req = UpdateBookRequest::new(Isbn::new(&isbn), body.into());
    state
        .book_repo
        .update_book(&req)
        .await
        .map_err(ApiError::from)
        .map(|book| ApiSuccess::new(StatusCode::OK, book.into()))
}

pub async fn delete_book<BR: BookRepository>(
    State(state): State<AppState<BR>>,
    isbn: Result<Path<String>, PathRejection>,
) -> Result<ApiSuccess<MessageHttpResponse>, ApiError> {
    let Path(isbn) = isbn?;
    let req = DeleteBookRequest::new(Isbn::new(&isbn));
    state.book_repo.delete_book(&req).await?;
    Ok(ApiSuccess::new(
        StatusCode::OK,
        MessageHttpResponse {
            message: "Book deleted",
        },
    ))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not Found".to_string())
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
