use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Book, Genre, Rating, ReadingStatus};
use crate::settings::GoalSettings;
use crate::store::CollectionStore;

/// Schema steps in the order they are applied. Ids are recorded in
/// `schema_migrations` and never reused.
const MIGRATIONS: &[(&str, &str)] = &[
    ("0000_books", include_str!("../migrations/0000_books.sql")),
    ("0001_goal_settings", include_str!("../migrations/0001_goal_settings.sql")),
];

const DATE_FORMAT: &str = "%Y-%m-%d";

const BOOK_COLUMNS: &str = "id, title, author, genre, pages, isbn, start_date, end_date, rating, \
     genre_rating, review, private_notes, quotes, recommended_by, spine_color, status, created_at";

/// SQLite-backed collection store.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<SqliteStore, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        log::info!("opened collection store at {}", path.display());
        SqliteStore::init(conn)
    }

    pub fn open_in_memory() -> Result<SqliteStore, StoreError> {
        SqliteStore::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<SqliteStore, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
              id TEXT PRIMARY KEY NOT NULL,
              applied_at INTEGER NOT NULL
            );",
        )?;
        for (id, sql) in MIGRATIONS {
            migrate(&mut conn, id, sql)?;
        }
        Ok(SqliteStore { conn })
    }

    pub fn get_goal_settings(&self, owner: &str) -> Result<GoalSettings, StoreError> {
        let row: Option<(u32, u32)> = self
            .conn
            .query_row(
                "SELECT books_target, pages_target FROM goal_settings WHERE owner_id = ?1",
                params![owner],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(match row {
            Some((books_per_year, pages_per_year)) => GoalSettings {
                books_per_year,
                pages_per_year,
            },
            None => GoalSettings::default(),
        })
    }

    pub fn set_goal_settings(&self, owner: &str, settings: GoalSettings) -> Result<(), StoreError> {
        let now = chrono::Utc::now().timestamp_millis();
        self.conn.execute(
            "INSERT INTO goal_settings (owner_id, books_target, pages_target, updated_at) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(owner_id) DO UPDATE SET books_target = excluded.books_target, \
             pages_target = excluded.pages_target, updated_at = excluded.updated_at",
            params![owner, settings.books_per_year, settings.pages_per_year, now],
        )?;
        Ok(())
    }
}

impl CollectionStore for SqliteStore {
    fn upsert(&mut self, owner: &str, records: Vec<Book>) -> Result<Vec<Book>, StoreError> {
        let tx = self.conn.transaction()?;
        let mut last_created: i64 = tx.query_row(
            "SELECT COALESCE(MAX(created_at), 0) FROM books WHERE owner_id = ?1",
            params![owner],
            |row| row.get(0),
        )?;
        let now = chrono::Utc::now().timestamp_millis();
        let mut stored = Vec::with_capacity(records.len());
        let mut inserted = 0usize;

        for mut book in records {
            if book.id.trim().is_empty() {
                book.id = Uuid::new_v4().to_string();
            }
            book.validate()
                .map_err(|reason| StoreError::InvalidRecord {
                    id: book.id.clone(),
                    reason,
                })?;
            book.created_at = match existing_created_at(&tx, owner, &book.id)? {
                Some(created_at) => Some(created_at),
                None => {
                    last_created = now.max(last_created + 1);
                    inserted += 1;
                    Some(last_created)
                }
            };
            write_book(&tx, owner, &book, now)?;
            stored.push(book);
        }

        tx.commit()?;
        log::info!(
            "stored {} records for {} ({} new)",
            stored.len(),
            owner,
            inserted
        );
        Ok(stored)
    }

    fn query_all(&self, owner: &str) -> Result<Vec<Book>, StoreError> {
        let sql = format!(
            "SELECT {} FROM books WHERE owner_id = ?1 ORDER BY created_at ASC, rowid ASC",
            BOOK_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner], |row| {
            Ok(StoredBook {
                id: row.get(0)?,
                title: row.get(1)?,
                author: row.get(2)?,
                genre: row.get(3)?,
                pages: row.get(4)?,
                isbn: row.get(5)?,
                start_date: row.get(6)?,
                end_date: row.get(7)?,
                rating: row.get(8)?,
                genre_rating: row.get(9)?,
                review: row.get(10)?,
                private_notes: row.get(11)?,
                quotes: row.get(12)?,
                recommended_by: row.get(13)?,
                spine_color: row.get(14)?,
                status: row.get(15)?,
                created_at: row.get(16)?,
            })
        })?;

        let mut books = Vec::new();
        for row in rows {
            books.push(Book::try_from(row?)?);
        }
        Ok(books)
    }
}

/// Runs one schema step together with its bookkeeping row, so a failing
/// step leaves neither half-built tables nor a record claiming it ran.
fn migrate(conn: &mut Connection, id: &str, sql: &str) -> Result<bool, StoreError> {
    let tx = conn.transaction()?;
    let applied = tx
        .query_row(
            "SELECT applied_at FROM schema_migrations WHERE id = ?1",
            params![id],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    if applied.is_some() {
        return Ok(false);
    }
    tx.execute_batch(sql)?;
    tx.execute(
        "INSERT INTO schema_migrations (id, applied_at) VALUES (?1, ?2)",
        params![id, chrono::Utc::now().timestamp_millis()],
    )?;
    tx.commit()?;
    log::debug!("schema step {} applied", id);
    Ok(true)
}

fn existing_created_at(
    tx: &Transaction<'_>,
    owner: &str,
    id: &str,
) -> Result<Option<i64>, StoreError> {
    Ok(tx
        .query_row(
            "SELECT created_at FROM books WHERE owner_id = ?1 AND id = ?2",
            params![owner, id],
            |row| row.get(0),
        )
        .optional()?)
}

fn write_book(tx: &Transaction<'_>, owner: &str, book: &Book, now: i64) -> Result<(), StoreError> {
    tx.execute(
        "INSERT INTO books (owner_id, id, title, author, genre, pages, isbn, start_date, end_date, \
         rating, genre_rating, review, private_notes, quotes, recommended_by, spine_color, status, \
         created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19) \
         ON CONFLICT(owner_id, id) DO UPDATE SET \
            title = excluded.title, \
            author = excluded.author, \
            genre = excluded.genre, \
            pages = excluded.pages, \
            isbn = excluded.isbn, \
            start_date = excluded.start_date, \
            end_date = excluded.end_date, \
            rating = excluded.rating, \
            genre_rating = excluded.genre_rating, \
            review = excluded.review, \
            private_notes = excluded.private_notes, \
            quotes = excluded.quotes, \
            recommended_by = excluded.recommended_by, \
            spine_color = excluded.spine_color, \
            status = excluded.status, \
            updated_at = excluded.updated_at",
        params![
            owner,
            book.id,
            book.title,
            book.author,
            book.genre.label(),
            book.pages,
            book.isbn,
            book.start_date.map(|date| date.format(DATE_FORMAT).to_string()),
            book.end_date.map(|date| date.format(DATE_FORMAT).to_string()),
            book.rating.map(Rating::value),
            book.genre_rating.map(Rating::value),
            book.review,
            book.private_notes,
            book.quotes,
            book.recommended_by,
            book.spine_color,
            book.status.map(ReadingStatus::as_str),
            book.created_at,
            now,
        ],
    )?;
    Ok(())
}

struct StoredBook {
    id: String,
    title: String,
    author: String,
    genre: String,
    pages: Option<u32>,
    isbn: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    rating: Option<u8>,
    genre_rating: Option<u8>,
    review: Option<String>,
    private_notes: Option<String>,
    quotes: String,
    recommended_by: Option<String>,
    spine_color: String,
    status: Option<String>,
    created_at: i64,
}

impl TryFrom<StoredBook> for Book {
    type Error = StoreError;

    fn try_from(row: StoredBook) -> Result<Book, StoreError> {
        let genre = row.genre.parse::<Genre>().map_err(|_| StoreError::Corrupt {
            column: "genre",
            value: row.genre.clone(),
        })?;
        Ok(Book {
            id: row.id,
            title: row.title,
            author: row.author,
            genre,
            pages: row.pages,
            isbn: row.isbn,
            start_date: stored_date("start_date", row.start_date)?,
            end_date: stored_date("end_date", row.end_date)?,
            rating: stored_rating("rating", row.rating)?,
            genre_rating: stored_rating("genre_rating", row.genre_rating)?,
            review: row.review,
            private_notes: row.private_notes,
            quotes: row.quotes,
            recommended_by: row.recommended_by,
            spine_color: row.spine_color,
            status: ReadingStatus::from_stored(row.status.as_deref()),
            created_at: Some(row.created_at),
        })
    }
}

fn stored_date(column: &'static str, value: Option<String>) -> Result<Option<NaiveDate>, StoreError> {
    match value {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(&raw, DATE_FORMAT)
            .map(Some)
            .map_err(|_| StoreError::Corrupt { column, value: raw }),
    }
}

fn stored_rating(column: &'static str, value: Option<u8>) -> Result<Option<Rating>, StoreError> {
    match value {
        None => Ok(None),
        Some(raw) => Rating::new(raw).map(Some).ok_or(StoreError::Corrupt {
            column,
            value: raw.to_string(),
        }),
    }
}
