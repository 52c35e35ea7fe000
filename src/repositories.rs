use crate::models::{
    Book, CreateBookError, CreateBookRequest, DeleteBookError, DeleteBookRequest,
    FindAllBooksError, FindAllBooksRequest, FindBookError, FindBookRequest, UpdateBookError,
    UpdateBookRequest,
};
use async_trait::async_trait;

#[async_trait]
pub trait BookRepository: Send + Sync + 'static {
    async fn create_book(&self, req: &CreateBookRequest) -> Result<Book, CreateBookError>;

    async fn find_book(&self, req: &FindBookRequest) -> Result<Book, FindBookError>;

    async fn find_all_books(&self, req: &FindAllBooksRequest)
    -> Result<Vec<Book>, FindAllBooksError>;

    async fn update_book(&self, req: &UpdateBookRequest) -> Result<Book, UpdateBookError>;

    async fn delete_book(&self, req: &DeleteBookRequest) -> Result<(), DeleteBookError>;
}
