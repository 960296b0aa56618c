use crate::error::StoreError;
use crate::models::Book;

/// Durable home of a user's collection.
///
/// `upsert` is a full-record replace keyed on `(owner, id)`: records without
/// an id get one, new records get a `created_at` later than everything already
/// stored, and the whole call either commits or leaves the store untouched.
/// `query_all` returns the collection in insertion order.
pub trait CollectionStore {
    fn upsert(&mut self, owner: &str, records: Vec<Book>) -> Result<Vec<Book>, StoreError>;

    fn query_all(&self, owner: &str) -> Result<Vec<Book>, StoreError>;

    /// Saves one interactively edited record.
    fn save(&mut self, owner: &str, book: Book) -> Result<Book, StoreError> {
        let id = book.id.clone();
        self.upsert(owner, vec![book])?
            .pop()
            .ok_or_else(|| StoreError::InvalidRecord {
                id,
                reason: "store returned no record".to_string(),
            })
    }
}
