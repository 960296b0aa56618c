//! Import and analytics core of a personal reading log.
//!
//! The write path is `parser::tabular` → `parser::goodreads` →
//! `importer` → [`store::CollectionStore`]. The read path takes a
//! collection snapshot from the store and feeds it to [`analytics`] and
//! [`goals`].

use clap::Parser;

pub mod analytics;
pub mod cli;
pub mod db;
pub mod error;
pub mod goals;
pub mod importer;
pub mod models;
pub mod parser;
pub mod settings;
pub mod store;

pub use error::{ConfigError, ImportError, ParseError, StoreError};
pub use models::{Book, Genre, Rating, ReadingStatus};
pub use store::CollectionStore;

pub fn run() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    cli::init_logging(args.verbose);
    cli::execute(args)
}
