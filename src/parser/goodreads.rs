use chrono::{DateTime, NaiveDate, Utc};

use super::tabular::{Row, Table};
use crate::models::{palette_color, Book, Genre, Rating, ReadingStatus};

pub const COL_TITLE: &str = "Title";
pub const COL_AUTHOR: &str = "Author";
pub const COL_PAGES: &str = "Number of Pages";
pub const COL_DATE_READ: &str = "Date Read";
pub const COL_RATING: &str = "My Rating";
pub const COL_REVIEW: &str = "My Review";
pub const COL_SHELF: &str = "Exclusive Shelf";
pub const COL_ISBN13: &str = "ISBN13";
pub const COL_ISBN: &str = "ISBN";

/// Shelf value marking a finished book in the export.
pub const READ_SHELF: &str = "read";

/// The export carries no genre that fits our picklist.
pub const IMPORTED_GENRE: Genre = Genre::Fiction;

const DATE_FORMATS: [&str; 2] = ["%Y/%m/%d", "%Y-%m-%d"];

/// One export row with its columns already typed. Unparsable values are
/// `None`; nothing here is an error.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GoodreadsRow {
    pub title: Option<String>,
    pub author: Option<String>,
    pub pages: Option<u32>,
    pub date_read: Option<NaiveDate>,
    pub my_rating: Option<f64>,
    pub review: Option<String>,
    pub shelf: Option<String>,
    pub isbn: Option<String>,
}

impl GoodreadsRow {
    pub fn from_row(row: &Row<'_>) -> GoodreadsRow {
        GoodreadsRow {
            title: row.non_empty(COL_TITLE).map(str::to_string),
            author: row.non_empty(COL_AUTHOR).map(str::to_string),
            pages: row.non_empty(COL_PAGES).and_then(parse_pages),
            date_read: row.non_empty(COL_DATE_READ).and_then(parse_date),
            my_rating: row
                .non_empty(COL_RATING)
                .and_then(|value| value.parse::<f64>().ok()),
            review: row.non_empty(COL_REVIEW).map(str::to_string),
            shelf: row.non_empty(COL_SHELF).map(str::to_string),
            isbn: row
                .non_empty(COL_ISBN13)
                .and_then(clean_isbn)
                .or_else(|| row.non_empty(COL_ISBN).and_then(clean_isbn)),
        }
    }

    pub fn is_importable(&self) -> bool {
        self.title.is_some() && self.shelf.as_deref() == Some(READ_SHELF)
    }

    /// Converts the 0-5 star value to the 0-10 scale. Zero means "not
    /// rated" in the export and maps to `None`.
    pub fn rating(&self) -> Option<Rating> {
        let stars = self.my_rating?;
        if !stars.is_finite() {
            return None;
        }
        let scaled = (stars * 2.0).round();
        if scaled <= 0.0 || scaled > f64::from(Rating::MAX) {
            return None;
        }
        Rating::new(scaled as u8)
    }
}

/// Per-import values shared by every candidate of one batch.
#[derive(Debug, Clone, Copy)]
pub struct ImportContext {
    pub started_at: DateTime<Utc>,
}

impl ImportContext {
    pub fn now() -> ImportContext {
        ImportContext {
            started_at: Utc::now(),
        }
    }

    fn candidate_id(&self, index: usize) -> String {
        format!("gr-{}-{}", self.started_at.timestamp_millis(), index)
    }
}

/// Turns the rows of an export into finished-book candidates. Rows without a
/// title or not on the read shelf are dropped without error.
pub fn map_table(table: &Table<'_>, context: &ImportContext) -> Vec<Book> {
    let rows: Vec<GoodreadsRow> = table.rows().map(|row| GoodreadsRow::from_row(&row)).collect();
    map_rows(rows, context)
}

pub fn map_rows<I>(rows: I, context: &ImportContext) -> Vec<Book>
where
    I: IntoIterator<Item = GoodreadsRow>,
{
    let mut dropped = 0usize;
    let books: Vec<Book> = rows
        .into_iter()
        .filter(|row| {
            let keep = row.is_importable();
            if !keep {
                dropped += 1;
            }
            keep
        })
        .enumerate()
        .map(|(index, row)| to_candidate(row, index, context))
        .collect();
    log::debug!(
        "mapped {} import candidates, {} rows not on the read shelf or untitled",
        books.len(),
        dropped
    );
    books
}

fn to_candidate(row: GoodreadsRow, index: usize, context: &ImportContext) -> Book {
    let rating = row.rating();
    Book {
        id: context.candidate_id(index),
        title: row.title.unwrap_or_default(),
        author: row.author.unwrap_or_default(),
        genre: IMPORTED_GENRE,
        pages: row.pages,
        isbn: row.isbn,
        start_date: row.date_read,
        end_date: row.date_read,
        rating,
        genre_rating: rating,
        review: row.review,
        private_notes: None,
        quotes: String::new(),
        recommended_by: None,
        spine_color: palette_color(index).to_string(),
        status: Some(ReadingStatus::Finished),
        created_at: None,
    }
}

fn parse_pages(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok()
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

/// The export wraps identifiers as `="978..."` to stop spreadsheets from
/// mangling them; by the time we see them the quotes are already gone.
fn clean_isbn(value: &str) -> Option<String> {
    let cleaned = value.trim().trim_start_matches('=').trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
