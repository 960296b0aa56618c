use anyhow::Context;
use chrono::{Datelike, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::path::PathBuf;

use crate::analytics::{self, QuoteSource, RngQuoteSource};
use crate::db::SqliteStore;
use crate::goals::{goal_progress, GoalReport, GoalTracker};
use crate::importer::{self, MergePolicy};
use crate::models::{Book, Genre, Rating, ReadingStatus};
use crate::parser::goodreads::ImportContext;
use crate::store::CollectionStore;

#[derive(Parser, Debug)]
#[command(name = "readlog", version, about = "Personal reading log: import, stats and goals")]
pub struct Cli {
    /// SQLite database holding the collection
    #[arg(long, env = "READLOG_DB", default_value = "readlog.db")]
    pub db: PathBuf,

    /// Owner whose collection is read and written
    #[arg(long, env = "READLOG_OWNER", default_value = "local")]
    pub owner: String,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import a Goodreads library export
    Import {
        file: PathBuf,
        /// Add every read row even if the book is already in the collection
        #[arg(long)]
        append_all: bool,
    },
    /// Lifetime totals plus recent and top-rated books
    Stats {
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
    /// Finished books per genre
    Genres,
    /// Year in review
    Recap {
        #[arg(long)]
        year: Option<i32>,
    },
    /// Favourite book, author, genre and a random saved passage
    Favorites {
        /// Seed for the passage pick
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Yearly goal progress; optionally update the stored targets.
    /// Each run is a new session, so the goal-reached message repeats while a goal stays met
    Goals {
        #[arg(long)]
        set_books: Option<u32>,
        #[arg(long)]
        set_pages: Option<u32>,
        #[arg(long)]
        year: Option<i32>,
    },
    /// Save a book by hand
    Add {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        author: String,
        #[arg(long, default_value = "Fiction")]
        genre: Genre,
        #[arg(long)]
        pages: Option<u32>,
        #[arg(long)]
        end_date: Option<NaiveDate>,
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=10))]
        rating: Option<u8>,
        #[arg(long, default_value = "finished")]
        status: ReadingStatus,
        #[arg(long)]
        recommended_by: Option<String>,
        /// Saved passage; repeat for several
        #[arg(long = "quote")]
        quotes: Vec<String>,
    },
}

pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let mut store = SqliteStore::open(&cli.db)
        .with_context(|| format!("failed to open {}", cli.db.display()))?;
    let owner = cli.owner.as_str();
    let current_year = Utc::now().year();

    match cli.command {
        Command::Import { file, append_all } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let policy = if append_all {
                MergePolicy::AppendAll
            } else {
                MergePolicy::NaturalKey
            };
            let summary =
                importer::import_export(&mut store, owner, &text, policy, &ImportContext::now())
                    .context("couldn't import that file; make sure it is a Goodreads export CSV")?;
            print_json(&summary)
        }
        Command::Stats { top } => {
            let books = store.query_all(owner)?;
            print_json(&analytics::lifetime_stats(&books, top))
        }
        Command::Genres => {
            let books = store.query_all(owner)?;
            print_json(&analytics::genre_breakdown(&books))
        }
        Command::Recap { year } => {
            let books = store.query_all(owner)?;
            print_json(&analytics::annual_recap(&books, year.unwrap_or(current_year)))
        }
        Command::Favorites { seed } => {
            let books = store.query_all(owner)?;
            let mut source: Box<dyn QuoteSource> = match seed {
                Some(seed) => Box::new(RngQuoteSource(StdRng::seed_from_u64(seed))),
                None => Box::new(RngQuoteSource::thread()),
            };
            print_json(&analytics::favorites(&books, source.as_mut()))
        }
        Command::Goals {
            set_books,
            set_pages,
            year,
        } => {
            let stored = store.get_goal_settings(owner)?;
            let settings = stored.with_overrides(set_books, set_pages);
            let targets = settings.targets()?;
            if settings != stored {
                store.set_goal_settings(owner, settings)?;
                log::info!(
                    "goal targets updated: {} books, {} pages",
                    settings.books_per_year,
                    settings.pages_per_year
                );
            }

            let year = year.unwrap_or(current_year);
            let books = store.query_all(owner)?;
            let progress = goal_progress(&books, year);
            let mut tracker = GoalTracker::new(targets);
            if tracker.observe(progress).is_some() {
                println!("you hit your reading goal!");
            }
            print_json(&GoalReport::new(year, targets, progress))
        }
        Command::Add {
            title,
            author,
            genre,
            pages,
            end_date,
            rating,
            status,
            recommended_by,
            quotes,
        } => {
            let mut book = Book::draft();
            book.title = title;
            book.author = author;
            book.genre = genre;
            book.pages = pages;
            book.end_date = end_date;
            book.rating = rating.and_then(Rating::new);
            book.genre_rating = book.rating;
            book.status = Some(status);
            book.recommended_by = recommended_by;
            for quote in &quotes {
                book.add_passage(quote);
            }
            let saved = store.save(owner, book)?;
            print_json(&saved)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
