use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Spine colours handed out to books that were not coloured by the user.
pub const SPINE_PALETTE: [&str; 10] = [
    "#2C3E6B", "#4A6B8A", "#7A1520", "#1E3A5F", "#5C3D6B", "#2A4A5A", "#6B2030", "#1A3048",
    "#4A3560", "#2E5068",
];

/// Separator between individual passages inside `Book::quotes`.
pub const PASSAGE_SEPARATOR: &str = "\n\n";

pub fn palette_color(index: usize) -> &'static str {
    SPINE_PALETTE[index % SPINE_PALETTE.len()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Genre {
    #[serde(rename = "Fiction")]
    Fiction,
    #[serde(rename = "Literary Fiction")]
    LiteraryFiction,
    #[serde(rename = "Mystery")]
    Mystery,
    #[serde(rename = "Sci-Fi")]
    SciFi,
    #[serde(rename = "Fantasy")]
    Fantasy,
    #[serde(rename = "Non-Fiction")]
    NonFiction,
    #[serde(rename = "History")]
    History,
    #[serde(rename = "Biography")]
    Biography,
    #[serde(rename = "Essays")]
    Essays,
    #[serde(rename = "Poetry")]
    Poetry,
    #[serde(rename = "Romance")]
    Romance,
    #[serde(rename = "Thriller")]
    Thriller,
    #[serde(rename = "Self-Help")]
    SelfHelp,
    #[serde(rename = "Science")]
    Science,
    #[serde(rename = "Other")]
    Other,
}

impl Genre {
    pub const ALL: [Genre; 15] = [
        Genre::Fiction,
        Genre::LiteraryFiction,
        Genre::Mystery,
        Genre::SciFi,
        Genre::Fantasy,
        Genre::NonFiction,
        Genre::History,
        Genre::Biography,
        Genre::Essays,
        Genre::Poetry,
        Genre::Romance,
        Genre::Thriller,
        Genre::SelfHelp,
        Genre::Science,
        Genre::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Genre::Fiction => "Fiction",
            Genre::LiteraryFiction => "Literary Fiction",
            Genre::Mystery => "Mystery",
            Genre::SciFi => "Sci-Fi",
            Genre::Fantasy => "Fantasy",
            Genre::NonFiction => "Non-Fiction",
            Genre::History => "History",
            Genre::Biography => "Biography",
            Genre::Essays => "Essays",
            Genre::Poetry => "Poetry",
            Genre::Romance => "Romance",
            Genre::Thriller => "Thriller",
            Genre::SelfHelp => "Self-Help",
            Genre::Science => "Science",
            Genre::Other => "Other",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Genre {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Genre::ALL
            .iter()
            .copied()
            .find(|genre| genre.label().eq_ignore_ascii_case(value))
            .ok_or_else(|| format!("unknown genre: {}", value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingStatus {
    Finished,
    Reading,
    Wishlist,
}

impl ReadingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReadingStatus::Finished => "finished",
            ReadingStatus::Reading => "reading",
            ReadingStatus::Wishlist => "wishlist",
        }
    }

    /// Stored values are lenient: an empty value means "no status".
    pub fn from_stored(value: Option<&str>) -> Option<ReadingStatus> {
        value.and_then(|raw| raw.parse().ok())
    }
}

impl FromStr for ReadingStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "finished" => Ok(ReadingStatus::Finished),
            "reading" => Ok(ReadingStatus::Reading),
            "wishlist" => Ok(ReadingStatus::Wishlist),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

/// A score on the 0..=10 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MAX: u8 = 10;

    pub fn new(value: u8) -> Option<Rating> {
        if value <= Self::MAX {
            Some(Rating(value))
        } else {
            None
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rating::new(value).ok_or_else(|| format!("rating out of range: {}", value))
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> u8 {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub pages: Option<u32>,
    pub isbn: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub rating: Option<Rating>,
    pub genre_rating: Option<Rating>,
    pub review: Option<String>,
    pub private_notes: Option<String>,
    /// Raw passages, separated by a blank line.
    pub quotes: String,
    pub recommended_by: Option<String>,
    pub spine_color: String,
    pub status: Option<ReadingStatus>,
    /// Milliseconds since the epoch, assigned by the store on first insert.
    pub created_at: Option<i64>,
}

impl Book {
    /// Empty record for the interactive editor. The id is left blank so the
    /// store assigns one on save.
    pub fn draft() -> Book {
        Book {
            id: String::new(),
            title: String::new(),
            author: String::new(),
            genre: Genre::ALL[0],
            pages: None,
            isbn: None,
            start_date: None,
            end_date: None,
            rating: None,
            genre_rating: None,
            review: None,
            private_notes: None,
            quotes: String::new(),
            recommended_by: None,
            spine_color: SPINE_PALETTE[0].to_string(),
            status: Some(ReadingStatus::Finished),
            created_at: None,
        }
    }

    /// Missing status counts as finished for older records.
    pub fn is_finished(&self) -> bool {
        matches!(self.status, None | Some(ReadingStatus::Finished))
    }

    pub fn passages(&self) -> Vec<&str> {
        self.quotes
            .split(PASSAGE_SEPARATOR)
            .map(str::trim)
            .filter(|passage| !passage.is_empty())
            .collect()
    }

    pub fn has_quotes(&self) -> bool {
        !self.passages().is_empty()
    }

    pub fn add_passage(&mut self, passage: &str) {
        let passage = passage.trim();
        if passage.is_empty() {
            return;
        }
        if self.quotes.trim().is_empty() {
            self.quotes = passage.to_string();
        } else {
            self.quotes.push_str(PASSAGE_SEPARATOR);
            self.quotes.push_str(passage);
        }
    }

    /// Ratings only count for finished books.
    pub fn effective_rating(&self) -> Option<Rating> {
        if self.is_finished() {
            self.rating
        } else {
            None
        }
    }

    pub fn recommended_by(&self) -> Option<&str> {
        self.recommended_by
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title is required".to_string());
        }
        Ok(())
    }
}
