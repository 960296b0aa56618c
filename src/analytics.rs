//! Read-only views over a collection snapshot.
//!
//! Every function takes the collection in canonical insertion order (the
//! order `CollectionStore::query_all` returns) and never mutates it. Ties
//! are always broken by that order: sorts are stable and frequency tables
//! keep the position where each key was first seen.

use chrono::Datelike;
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;

use crate::models::{Book, Genre};

pub const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const RECAP_TOP_GENRES: usize = 3;
const LOVED_RATING: u8 = 9;
const RECOMMENDED_MIN_RATING: u8 = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifetimeStats {
    pub total_books_read: usize,
    pub total_pages: u64,
    /// Mean over rated finished books; unrated finished books are left out
    /// rather than counted as zero. `None` when no finished book carries a rating.
    pub average_rating: Option<f64>,
    /// `None` when nothing is finished.
    pub average_pages: Option<u64>,
    pub recent_books: Vec<Book>,
    pub top_rated_books: Vec<Book>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenreCount {
    pub genre: Genre,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorCount {
    pub author: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualRecap {
    pub year: i32,
    pub total_books: usize,
    pub total_pages: u64,
    /// Same rule as [`LifetimeStats::average_rating`], over the year's books.
    pub average_rating: Option<f64>,
    pub books_with_quotes: usize,
    pub books_per_month: [usize; 12],
    /// Zero-based month index, `None` for an empty year.
    pub peak_month: Option<usize>,
    pub top_book: Option<Book>,
    pub top_author: Option<AuthorCount>,
    pub top_genres: Vec<GenreCount>,
    pub longest_book: Option<Book>,
}

impl AnnualRecap {
    pub fn peak_month_name(&self) -> Option<&'static str> {
        self.peak_month.map(|index| MONTHS[index])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedQuote {
    pub book_id: String,
    pub book_title: String,
    pub passage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoritesView {
    pub top_book: Option<Book>,
    pub top_author: Option<AuthorCount>,
    pub top_genre: Option<GenreCount>,
    pub random_quote: Option<SavedQuote>,
    pub loved: Vec<Book>,
    pub recommended: Vec<Book>,
}

/// Where the favourites view gets its one random pick from.
pub trait QuoteSource {
    /// Returns an index in `0..len`. Never called with `len == 0`.
    fn pick(&mut self, len: usize) -> usize;
}

/// [`QuoteSource`] backed by any `rand` generator.
pub struct RngQuoteSource<R: Rng>(pub R);

impl RngQuoteSource<rand::rngs::ThreadRng> {
    pub fn thread() -> Self {
        RngQuoteSource(rand::thread_rng())
    }
}

impl<R: Rng> QuoteSource for RngQuoteSource<R> {
    fn pick(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len)
    }
}

fn finished<'a>(books: &'a [Book]) -> impl Iterator<Item = &'a Book> + 'a {
    books.iter().filter(|book| book.is_finished())
}

pub fn lifetime_stats(books: &[Book], list_size: usize) -> LifetimeStats {
    let done: Vec<&Book> = finished(books).collect();
    let total_pages = sum_pages(&done);
    LifetimeStats {
        total_books_read: done.len(),
        total_pages,
        average_rating: average_rating(&done),
        average_pages: if done.is_empty() {
            None
        } else {
            Some((total_pages as f64 / done.len() as f64).round() as u64)
        },
        recent_books: done.iter().rev().take(list_size).map(|&book| book.clone()).collect(),
        top_rated_books: by_rating_desc(&done)
            .into_iter()
            .take(list_size)
            .cloned()
            .collect(),
    }
}

pub fn genre_breakdown(books: &[Book]) -> Vec<GenreCount> {
    rank_by_frequency(finished(books).map(|book| book.genre))
        .into_iter()
        .map(|(genre, count)| GenreCount { genre, count })
        .collect()
}

pub fn annual_recap(books: &[Book], year: i32) -> AnnualRecap {
    let in_year: Vec<&Book> = finished(books)
        .filter(|book| book.end_date.map(|date| date.year()) == Some(year))
        .collect();

    let mut books_per_month = [0usize; 12];
    for date in in_year.iter().filter_map(|book| book.end_date) {
        books_per_month[date.month0() as usize] += 1;
    }

    AnnualRecap {
        year,
        total_books: in_year.len(),
        total_pages: sum_pages(&in_year),
        average_rating: average_rating(&in_year),
        books_with_quotes: in_year.iter().filter(|book| book.has_quotes()).count(),
        books_per_month,
        peak_month: if in_year.is_empty() {
            None
        } else {
            peak_index(&books_per_month)
        },
        top_book: top_rated(&in_year).cloned(),
        top_author: top_author(&in_year),
        top_genres: rank_by_frequency(in_year.iter().map(|book| book.genre))
            .into_iter()
            .take(RECAP_TOP_GENRES)
            .map(|(genre, count)| GenreCount { genre, count })
            .collect(),
        longest_book: longest(&in_year).cloned(),
    }
}

pub fn favorites<Q>(books: &[Book], quotes: &mut Q) -> FavoritesView
where
    Q: QuoteSource + ?Sized,
{
    let done: Vec<&Book> = finished(books).collect();

    let all_quotes: Vec<SavedQuote> = done
        .iter()
        .flat_map(|book| {
            book.passages().into_iter().map(move |passage| SavedQuote {
                book_id: book.id.clone(),
                book_title: book.title.clone(),
                passage: passage.to_string(),
            })
        })
        .collect();
    let random_quote = if all_quotes.is_empty() {
        None
    } else {
        let index = quotes.pick(all_quotes.len()).min(all_quotes.len() - 1);
        all_quotes.into_iter().nth(index)
    };

    let ranked = by_rating_desc(&done);
    let loved = ranked
        .iter()
        .filter(|book| rating_at_least(book, LOVED_RATING))
        .map(|&book| book.clone())
        .collect();
    let recommended = ranked
        .iter()
        .filter(|book| book.recommended_by().is_some())
        .filter(|book| rating_at_least(book, RECOMMENDED_MIN_RATING))
        .map(|&book| book.clone())
        .collect();

    FavoritesView {
        top_book: top_rated(&done).cloned(),
        top_author: top_author(&done),
        top_genre: rank_by_frequency(done.iter().map(|book| book.genre))
            .into_iter()
            .next()
            .map(|(genre, count)| GenreCount { genre, count }),
        random_quote,
        loved,
        recommended,
    }
}

/// Counts keys and orders them by count, highest first. Equal counts keep
/// the order in which the keys first appeared.
pub fn rank_by_frequency<K, I>(keys: I) -> Vec<(K, usize)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut counts: Vec<(K, usize)> = Vec::new();
    for key in keys {
        match slots.get(&key) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                slots.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

fn sum_pages(books: &[&Book]) -> u64 {
    books
        .iter()
        .map(|book| u64::from(book.pages.unwrap_or(0)))
        .sum()
}

fn average_rating(books: &[&Book]) -> Option<f64> {
    let ratings: Vec<f64> = books
        .iter()
        .filter_map(|book| book.effective_rating())
        .map(|rating| f64::from(rating.value()))
        .collect();
    if ratings.is_empty() {
        None
    } else {
        Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
    }
}

fn rating_at_least(book: &Book, minimum: u8) -> bool {
    book.effective_rating()
        .map(|rating| rating.value() >= minimum)
        .unwrap_or(false)
}

/// Unrated books sort after every rated one.
fn by_rating_desc<'a>(books: &[&'a Book]) -> Vec<&'a Book> {
    let mut sorted = books.to_vec();
    sorted.sort_by(|a, b| b.effective_rating().cmp(&a.effective_rating()));
    sorted
}

fn top_rated<'a>(books: &[&'a Book]) -> Option<&'a Book> {
    by_rating_desc(books)
        .into_iter()
        .next()
        .filter(|book| book.effective_rating().is_some())
}

fn top_author(books: &[&Book]) -> Option<AuthorCount> {
    rank_by_frequency(
        books
            .iter()
            .map(|book| book.author.trim())
            .filter(|author| !author.is_empty()),
    )
    .into_iter()
    .next()
    .map(|(author, count)| AuthorCount {
        author: author.to_string(),
        count,
    })
}

/// First book with the highest known page count.
fn longest<'a>(books: &[&'a Book]) -> Option<&'a Book> {
    let mut best: Option<&'a Book> = None;
    for &book in books {
        let Some(pages) = book.pages else {
            continue;
        };
        if best.and_then(|current| current.pages).map_or(true, |max| pages > max) {
            best = Some(book);
        }
    }
    best
}

fn peak_index(buckets: &[usize]) -> Option<usize> {
    let max = *buckets.iter().max()?;
    buckets.iter().position(|&count| count == max)
}

#[cfg(test)]
mod tests {
    use super::{
        annual_recap, favorites, genre_breakdown, lifetime_stats, rank_by_frequency, QuoteSource,
        RngQuoteSource,
    };
    use crate::models::{Book, Genre, Rating, ReadingStatus};
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct FixedPick(usize);

    impl QuoteSource for FixedPick {
        fn pick(&mut self, _len: usize) -> usize {
            self.0
        }
    }

    fn book(id: &str) -> Book {
        let mut book = Book::draft();
        book.id = id.to_string();
        book.title = format!("Title {}", id);
        book.author = "Anon".to_string();
        book
    }

    fn with(
        id: &str,
        pages: Option<u32>,
        rating: Option<u8>,
        end: Option<(i32, u32, u32)>,
        status: Option<ReadingStatus>,
    ) -> Book {
        let mut book = book(id);
        book.pages = pages;
        book.rating = rating.and_then(Rating::new);
        book.end_date = end.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d));
        book.status = status;
        book
    }

    fn ids(books: &[Book]) -> Vec<&str> {
        books.iter().map(|book| book.id.as_str()).collect()
    }

    fn two_finished() -> Vec<Book> {
        vec![
            with("a", Some(300), Some(8), Some((2024, 3, 1)), Some(ReadingStatus::Finished)),
            with("b", Some(450), Some(10), Some((2024, 7, 1)), Some(ReadingStatus::Finished)),
        ]
    }

    #[test]
    fn lifetime_stats_for_two_finished_books() {
        let stats = lifetime_stats(&two_finished(), 5);

        assert_eq!(stats.total_books_read, 2);
        assert_eq!(stats.total_pages, 750);
        assert_eq!(stats.average_rating, Some(9.0));
        assert_eq!(stats.average_pages, Some(375));
        assert_eq!(ids(&stats.recent_books), vec!["b", "a"]);
        assert_eq!(ids(&stats.top_rated_books), vec!["b", "a"]);
    }

    #[test]
    fn lifetime_stats_ignore_unfinished_and_unrated() {
        let collection = vec![
            with("a", Some(100), Some(6), None, None),
            with("b", None, None, None, Some(ReadingStatus::Finished)),
            with("c", Some(900), Some(10), None, Some(ReadingStatus::Reading)),
            with("d", Some(50), None, None, Some(ReadingStatus::Wishlist)),
        ];
        let stats = lifetime_stats(&collection, 10);

        assert_eq!(stats.total_books_read, 2);
        assert_eq!(stats.total_pages, 100);
        assert_eq!(stats.average_rating, Some(6.0));
        assert_eq!(ids(&stats.top_rated_books), vec!["a", "b"]);
    }

    #[test]
    fn average_rating_leaves_out_unrated_finished_books() {
        let collection = vec![
            with("rated", Some(100), Some(8), Some((2024, 1, 2)), None),
            with("unrated-1", Some(100), None, Some((2024, 1, 3)), None),
            with("unrated-2", Some(100), None, Some((2024, 1, 4)), None),
        ];

        assert_eq!(lifetime_stats(&collection, 5).average_rating, Some(8.0));
        assert_eq!(annual_recap(&collection, 2024).average_rating, Some(8.0));
    }

    #[test]
    fn lifetime_stats_on_empty_collection() {
        let stats = lifetime_stats(&[], 5);

        assert_eq!(stats.total_books_read, 0);
        assert_eq!(stats.total_pages, 0);
        assert_eq!(stats.average_rating, None);
        assert_eq!(stats.average_pages, None);
        assert!(stats.recent_books.is_empty());
        assert!(stats.top_rated_books.is_empty());
    }

    #[test]
    fn top_rated_ties_keep_insertion_order_and_truncate() {
        let collection = vec![
            with("a", None, Some(7), None, None),
            with("b", None, Some(9), None, None),
            with("c", None, Some(7), None, None),
            with("d", None, Some(9), None, None),
        ];
        let stats = lifetime_stats(&collection, 3);

        assert_eq!(ids(&stats.top_rated_books), vec!["b", "d", "a"]);
        assert_eq!(ids(&stats.recent_books), vec!["d", "c", "b"]);
    }

    #[test]
    fn genre_breakdown_orders_by_count_then_first_seen() {
        let mut collection = Vec::new();
        for (id, genre) in [
            ("1", Genre::Poetry),
            ("2", Genre::Mystery),
            ("3", Genre::Mystery),
            ("4", Genre::History),
            ("5", Genre::Poetry),
            ("6", Genre::Science),
        ] {
            let mut entry = book(id);
            entry.genre = genre;
            collection.push(entry);
        }
        let mut wishlist = book("7");
        wishlist.genre = Genre::Science;
        wishlist.status = Some(ReadingStatus::Wishlist);
        collection.push(wishlist);

        let breakdown = genre_breakdown(&collection);
        let order: Vec<_> = breakdown.iter().map(|entry| (entry.genre, entry.count)).collect();

        assert_eq!(
            order,
            vec![
                (Genre::Poetry, 2),
                (Genre::Mystery, 2),
                (Genre::History, 1),
                (Genre::Science, 1)
            ]
        );
        let total: usize = breakdown.iter().map(|entry| entry.count).sum();
        assert_eq!(total, collection.iter().filter(|b| b.is_finished()).count());
    }

    #[test]
    fn rank_by_frequency_is_stable() {
        let ranked = rank_by_frequency(vec!["b", "a", "c", "a", "b", "d"]);
        assert_eq!(ranked, vec![("b", 2), ("a", 2), ("c", 1), ("d", 1)]);
        assert!(rank_by_frequency(Vec::<&str>::new()).is_empty());
    }

    #[test]
    fn annual_recap_for_two_finished_books() {
        let recap = annual_recap(&two_finished(), 2024);

        assert_eq!(recap.total_books, 2);
        assert_eq!(recap.total_pages, 750);
        assert_eq!(recap.average_rating, Some(9.0));
        assert_eq!(recap.books_per_month[2], 1);
        assert_eq!(recap.books_per_month[6], 1);
        assert_eq!(recap.peak_month, Some(2));
        assert_eq!(recap.peak_month_name(), Some("Mar"));
        assert_eq!(recap.top_book.as_ref().map(|b| b.id.as_str()), Some("b"));
        assert_eq!(recap.longest_book.as_ref().map(|b| b.id.as_str()), Some("b"));
    }

    #[test]
    fn annual_recap_excludes_books_without_end_date() {
        let collection = vec![
            with("dated", Some(100), Some(6), Some((2024, 5, 5)), None),
            with("undated", Some(900), Some(10), None, Some(ReadingStatus::Finished)),
            with("other-year", Some(900), Some(10), Some((2023, 5, 5)), None),
            with("reading", Some(900), Some(10), Some((2024, 5, 6)), Some(ReadingStatus::Reading)),
        ];
        let recap = annual_recap(&collection, 2024);

        assert_eq!(recap.total_books, 1);
        assert_eq!(recap.total_pages, 100);
        assert_eq!(recap.top_book.map(|b| b.id), Some("dated".to_string()));
    }

    #[test]
    fn annual_recap_peak_prefers_earliest_month_and_counts_quotes() {
        let mut collection = vec![
            with("nov-1", Some(10), None, Some((2024, 11, 1)), None),
            with("feb-1", Some(500), Some(4), Some((2024, 2, 1)), None),
            with("nov-2", Some(500), Some(4), Some((2024, 11, 2)), None),
            with("feb-2", None, None, Some((2024, 2, 20)), None),
        ];
        collection[0].quotes = "line\n\nanother".to_string();
        collection[3].quotes = "   ".to_string();
        collection[0].author = "Le Guin".to_string();
        collection[2].author = "Le Guin".to_string();
        collection[3].author = "Le Guin".to_string();

        let recap = annual_recap(&collection, 2024);

        assert_eq!(recap.peak_month, Some(1));
        assert_eq!(recap.books_with_quotes, 1);
        assert_eq!(recap.top_book.map(|b| b.id), Some("feb-1".to_string()));
        assert_eq!(recap.longest_book.map(|b| b.id), Some("feb-1".to_string()));
        let author = recap.top_author.unwrap();
        assert_eq!((author.author.as_str(), author.count), ("Le Guin", 3));
        assert_eq!(recap.top_genres.len(), 1);
        assert_eq!(recap.top_genres[0].count, 4);
    }

    #[test]
    fn annual_recap_for_empty_year_is_well_formed() {
        let recap = annual_recap(&two_finished(), 1999);

        assert_eq!(recap.total_books, 0);
        assert_eq!(recap.average_rating, None);
        assert_eq!(recap.books_per_month, [0; 12]);
        assert_eq!(recap.peak_month, None);
        assert!(recap.top_book.is_none());
        assert!(recap.top_author.is_none());
        assert!(recap.top_genres.is_empty());
        assert!(recap.longest_book.is_none());
    }

    #[test]
    fn favorites_picks_injected_quote_and_filters_lists() {
        let mut collection = vec![
            with("a", None, Some(10), None, None),
            with("b", None, Some(7), None, None),
            with("c", None, Some(9), None, None),
            with("d", None, Some(6), None, None),
            with("e", None, Some(10), None, Some(ReadingStatus::Reading)),
        ];
        collection[0].quotes = "first\n\nsecond".to_string();
        collection[2].quotes = "third".to_string();
        collection[4].quotes = "never shown".to_string();
        collection[1].recommended_by = Some("Sam".to_string());
        collection[3].recommended_by = Some("Kim".to_string());
        collection[2].recommended_by = Some("  ".to_string());

        let view = favorites(&collection, &mut FixedPick(2));

        let quote = view.random_quote.unwrap();
        assert_eq!(quote.passage, "third");
        assert_eq!(quote.book_id, "c");
        assert_eq!(view.top_book.map(|b| b.id), Some("a".to_string()));
        assert_eq!(ids(&view.loved), vec!["a", "c"]);
        assert_eq!(ids(&view.recommended), vec!["b"]);
        assert_eq!(view.top_author.unwrap().count, 4);
        assert_eq!(view.top_genre.unwrap().count, 4);
    }

    #[test]
    fn favorites_on_empty_collection() {
        let view = favorites(&[], &mut FixedPick(0));

        assert!(view.top_book.is_none());
        assert!(view.top_author.is_none());
        assert!(view.top_genre.is_none());
        assert!(view.random_quote.is_none());
        assert!(view.loved.is_empty());
        assert!(view.recommended.is_empty());
    }

    #[test]
    fn seeded_rng_source_stays_in_range() {
        let mut source = RngQuoteSource(StdRng::seed_from_u64(7));
        for len in 1..50 {
            assert!(source.pick(len) < len);
        }
    }

    #[test]
    fn views_do_not_mutate_snapshot() {
        let collection = two_finished();
        let before = collection.clone();
        let _ = lifetime_stats(&collection, 1);
        let _ = annual_recap(&collection, 2024);
        let _ = favorites(&collection, &mut FixedPick(0));

        assert_eq!(collection, before);
    }
}
