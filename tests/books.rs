use anyhow::anyhow;
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use books_api::database::{SqliteBookRepository, establish_pool};
use books_api::http::{AppState, router};
use books_api::models::{
    Book, CreateBookError, CreateBookRequest, DeleteBookError, DeleteBookRequest,
    FindAllBooksError, FindAllBooksRequest, FindBookError, FindBookRequest, UpdateBookError,
    UpdateBookRequest,
};
use books_api::repositories::BookRepository;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

const BOOKS_ROUTE: &str = "/books";
const BOOK_ISBN: &str = "11111";
const BOOK_PROPERTIES: [&str; 8] = [
    "isbn",
    "amazon_url",
    "author",
    "language",
    "pages",
    "publisher",
    "title",
    "year",
];

struct TestApp {
    _dir: Option<TempDir>,
    app: Router,
}

impl TestApp {
    async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let url = format!("sqlite://{}", dir.path().join("books.db").display());
        let pool = establish_pool(&url)
            .await
            .expect("Failed to open test database");

        sqlx::query(
            "INSERT INTO books (isbn, amazon_url, author, language, pages, publisher, title, year)
             VALUES ('11111', 'amazon.com', 'author', 'language', 100, 'publisher', 'the title', 1999)",
        )
        .execute(&pool)
        .await
        .expect("Failed to seed test database");

        let app = router(AppState::new(SqliteBookRepository::new(pool)));
        Self {
            _dir: Some(dir),
            app,
        }
    }

    fn with_repository<BR: BookRepository>(repo: BR) -> Self {
        let app = router(AppState::new(repo));
        Self { _dir: None, app }
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);
        assert_eq!(content_type.as_deref(), Some("application/json"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }
}

fn book_data() -> Value {
    json!({
        "isbn": "123",
        "amazon_url": "amz.com",
        "author": "test author",
        "language": "test lang",
        "pages": 999,
        "publisher": "test publisher",
        "title": "test title",
        "year": 1000
    })
}

fn updated_book_data() -> Value {
    let mut data = book_data();
    data.as_object_mut().unwrap().remove("isbn");
    data
}

const STORE_FAILURE: &str = "disk I/O error on books table";

/// Repository whose every operation fails with an unexpected error.
struct BrokenRepository;

#[async_trait]
impl BookRepository for BrokenRepository {
    async fn create_book(&self, _req: &CreateBookRequest) -> Result<Book, CreateBookError> {
        Err(CreateBookError::Other(anyhow!(STORE_FAILURE)))
    }

    async fn find_book(&self, _req: &FindBookRequest) -> Result<Book, FindBookError> {
        Err(FindBookError::Other(anyhow!(STORE_FAILURE)))
    }

    async fn find_all_books(
        &self,
        _req: &FindAllBooksRequest,
    ) -> Result<Vec<Book>, FindAllBooksError> {
        Err(FindAllBooksError(anyhow!(STORE_FAILURE)))
    }

    async fn update_book(&self, _req: &UpdateBookRequest) -> Result<Book, UpdateBookError> {
        Err(UpdateBookError::Other(anyhow!(STORE_FAILURE)))
    }

    async fn delete_book(&self, _req: &DeleteBookRequest) -> Result<(), DeleteBookError> {
        Err(DeleteBookError::Other(anyhow!(STORE_FAILURE)))
    }
}

#[tokio::test]
async fn lists_books() {
    let app = TestApp::new().await;

    let (status, body) = app.send("GET", BOOKS_ROUTE, None).await;

    assert_eq!(status, StatusCode::OK);
    let books = body["books"].as_array().unwrap();
    assert_eq!(books.len(), 1);
    for property in BOOK_PROPERTIES {
        assert!(books[0].get(property).is_some(), "missing {property}");
    }
    assert_eq!(
        books[0],
        json!({
            "isbn": "11111",
            "amazon_url": "amazon.com",
            "author": "author",
            "language": "language",
            "pages": 100,
            "publisher": "publisher",
            "title": "the title",
            "year": 1999
        })
    );
}

#[tokio::test]
async fn lists_books_matching_filters() {
    let app = TestApp::new().await;
    app.send("POST", BOOKS_ROUTE, Some(book_data())).await;

    let (status, body) = app.send("GET", "/books?author=test%20author", None).await;
    assert_eq!(status, StatusCode::OK);
    let books = body["books"].as_array().unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["isbn"], "123");

    let (status, body) = app.send("GET", "/books?year=1999&pages=100", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["books"].as_array().unwrap().len(), 1);
    assert_eq!(body["books"][0]["isbn"], BOOK_ISBN);

    let (status, body) = app.send("GET", "/books?title=nothing", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["books"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn rejects_non_numeric_integer_filter() {
    let app = TestApp::new().await;

    let (status, _) = app.send("GET", "/books?year=recent", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn gets_one_book() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send("GET", &format!("{BOOKS_ROUTE}/{BOOK_ISBN}"), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    for property in BOOK_PROPERTIES {
        assert!(body["book"].get(property).is_some(), "missing {property}");
    }
    assert_eq!(body["book"]["isbn"], BOOK_ISBN);
}

#[tokio::test]
async fn get_of_missing_book_is_404() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send("GET", &format!("{BOOKS_ROUTE}/INVALID"), None)
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["status"], 404);
}

#[tokio::test]
async fn creates_a_book() {
    let app = TestApp::new().await;

    let (status, body) = app.send("POST", BOOKS_ROUTE, Some(book_data())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["book"], book_data());

    let (status, body) = app.send("GET", &format!("{BOOKS_ROUTE}/123"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["book"], book_data());
}

#[tokio::test]
async fn create_with_missing_fields_is_400() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send("POST", BOOKS_ROUTE, Some(json!({ "title": "test title" })))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["messages"].as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn create_with_duplicate_isbn_is_409() {
    let app = TestApp::new().await;
    let mut data = book_data();
    data["isbn"] = json!(BOOK_ISBN);

    let (status, _) = app.send("POST", BOOKS_ROUTE, Some(data)).await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn create_with_malformed_json_is_400() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .method("POST")
        .uri(BOOKS_ROUTE)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn updates_a_book() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(
            "PUT",
            &format!("{BOOKS_ROUTE}/{BOOK_ISBN}"),
            Some(updated_book_data()),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let mut expected = updated_book_data();
    expected["isbn"] = json!(BOOK_ISBN);
    assert_eq!(body["book"], expected);
}

#[tokio::test]
async fn update_with_isbn_in_body_is_400() {
    let app = TestApp::new().await;

    let (status, _) = app
        .send(
            "PUT",
            &format!("{BOOKS_ROUTE}/{BOOK_ISBN}"),
            Some(book_data()),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            "PUT",
            &format!("{BOOKS_ROUTE}/{BOOK_ISBN}"),
            Some(json!({ "isbn": "123" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app
        .send("GET", &format!("{BOOKS_ROUTE}/{BOOK_ISBN}"), None)
        .await;
    assert_eq!(body["book"]["title"], "the title");
}

#[tokio::test]
async fn update_with_invalid_fields_is_400() {
    let app = TestApp::new().await;
    let mut data = updated_book_data();
    data["pages"] = json!("lots");

    let (status, body) = app
        .send("PUT", &format!("{BOOKS_ROUTE}/{BOOK_ISBN}"), Some(data))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"]["messages"],
        json!(["instance.pages is not of a type(s) integer"])
    );
}

#[tokio::test]
async fn update_of_missing_book_is_404() {
    let app = TestApp::new().await;

    let (status, _) = app
        .send(
            "PUT",
            &format!("{BOOKS_ROUTE}/INVALID"),
            Some(updated_book_data()),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deletes_a_book() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send("DELETE", &format!("{BOOKS_ROUTE}/{BOOK_ISBN}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Book deleted" }));

    let (status, _) = app
        .send("GET", &format!("{BOOKS_ROUTE}/{BOOK_ISBN}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_of_missing_book_is_404() {
    let app = TestApp::new().await;

    let (status, _) = app
        .send("DELETE", &format!("{BOOKS_ROUTE}/INVALID"), None)
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let app = TestApp::new().await;

    let (status, body) = app.send("GET", "/authors", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["messages"], json!(["Not Found"]));
}

#[tokio::test]
async fn creates_a_book_with_whole_float_numbers() {
    let app = TestApp::new().await;
    let mut data = book_data();
    data["pages"] = json!(100.0);
    data["year"] = json!(1000.0);

    let (status, body) = app.send("POST", BOOKS_ROUTE, Some(data)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["book"]["pages"], json!(100));
    assert_eq!(body["book"]["year"], json!(1000));
}

#[tokio::test]
async fn create_with_fractional_pages_is_400() {
    let app = TestApp::new().await;
    let mut data = book_data();
    data["pages"] = json!(19.5);

    let (status, body) = app.send("POST", BOOKS_ROUTE, Some(data)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"]["messages"],
        json!(["instance.pages is not of a type(s) integer"])
    );
}

#[tokio::test]
async fn update_with_isbn_in_body_reports_not_allowed() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(
            "PUT",
            &format!("{BOOKS_ROUTE}/{BOOK_ISBN}"),
            Some(book_data()),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["messages"], json!(["Not Allowed."]));
}

#[tokio::test]
async fn store_failures_are_generic_500s() {
    let app = TestApp::with_repository(BrokenRepository);
    let requests = [
        ("GET", BOOKS_ROUTE.to_string(), None),
        ("GET", format!("{BOOKS_ROUTE}/{BOOK_ISBN}"), None),
        ("POST", BOOKS_ROUTE.to_string(), Some(book_data())),
        (
            "PUT",
            format!("{BOOKS_ROUTE}/{BOOK_ISBN}"),
            Some(updated_book_data()),
        ),
        ("DELETE", format!("{BOOKS_ROUTE}/{BOOK_ISBN}"), None),
    ];

    for (method, uri, body) in requests {
        let (status, response) = app.send(method, &uri, body).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{method} {uri}");
        assert_eq!(
            response,
            json!({ "error": { "status": 500, "messages": ["Internal server error"] } }),
            "{method} {uri}"
        );
        assert!(!response.to_string().contains(STORE_FAILURE));
    }
}

#[tokio::test]
async fn unsupported_method_is_json_405() {
    let app = TestApp::new().await;

    let (status, body) = app.send("PATCH", BOOKS_ROUTE, None).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"]["status"], 405);
    assert_eq!(body["error"]["messages"], json!(["Method Not Allowed"]));
}

#[tokio::test]
async fn undecodable_isbn_is_json_400() {
    let app = TestApp::new().await;

    for method in ["GET", "DELETE"] {
        let (status, body) = app
            .send(method, &format!("{BOOKS_ROUTE}/%FF"), None)
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{method}");
        assert_eq!(body["error"]["status"], 400);
    }

    let (status, _) = app
        .send(
            "PUT",
            &format!("{BOOKS_ROUTE}/%FF"),
            Some(updated_book_data()),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
