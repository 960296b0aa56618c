use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::ImportError;
use crate::models::Book;
use crate::parser::goodreads::{self, ImportContext};
use crate::parser::tabular;
use crate::store::CollectionStore;

/// How candidates are checked against the collection before persisting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Skip a candidate whose natural key is already in the collection or
    /// earlier in the same batch. Re-importing a file adds nothing.
    #[default]
    NaturalKey,
    /// Every candidate is new. Re-importing a file duplicates its books.
    AppendAll,
}

/// Content identity of a book: title, author and end date. Text is compared
/// case-insensitively with whitespace collapsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey {
    title: String,
    author: String,
    end_date: Option<NaiveDate>,
}

impl NaturalKey {
    pub fn of(book: &Book) -> NaturalKey {
        NaturalKey {
            title: normalize(&book.title),
            author: normalize(&book.author),
            end_date: book.end_date,
        }
    }
}

fn normalize(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone, Default)]
pub struct MergePlan {
    pub to_insert: Vec<Book>,
    pub skipped: Vec<Book>,
}

/// Decides which candidates are new. Existing records are never touched: a
/// candidate whose id is already taken is re-keyed before it is queued, so
/// the store can only ever add rows for an import.
pub fn merge(candidates: Vec<Book>, existing: &[Book], policy: MergePolicy) -> MergePlan {
    let mut plan = MergePlan::default();
    let mut taken_ids: HashSet<String> = existing.iter().map(|book| book.id.clone()).collect();
    let mut seen: HashSet<NaturalKey> = match policy {
        MergePolicy::NaturalKey => existing.iter().map(NaturalKey::of).collect(),
        MergePolicy::AppendAll => HashSet::new(),
    };
    for mut candidate in candidates {
        if policy == MergePolicy::NaturalKey && !seen.insert(NaturalKey::of(&candidate)) {
            plan.skipped.push(candidate);
            continue;
        }
        if taken_ids.contains(&candidate.id) {
            let fresh = Uuid::new_v4().to_string();
            log::debug!("import id {} already taken, using {}", candidate.id, fresh);
            candidate.id = fresh;
        }
        taken_ids.insert(candidate.id.clone());
        plan.to_insert.push(candidate);
    }
    plan
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub rows_read: usize,
    pub rows_filtered: usize,
    pub candidates: usize,
    pub inserted: usize,
    pub skipped_duplicates: usize,
}

/// Runs one import end to end: parse, map, merge against the owner's
/// collection and persist the new records as a single batch. A parse failure
/// returns before the store is touched; a store failure leaves nothing behind.
pub fn import_export<S>(
    store: &mut S,
    owner: &str,
    text: &str,
    policy: MergePolicy,
    context: &ImportContext,
) -> Result<ImportSummary, ImportError>
where
    S: CollectionStore + ?Sized,
{
    let table = tabular::parse(text)?;
    let candidates = goodreads::map_table(&table, context);
    let mut summary = ImportSummary {
        rows_read: table.len(),
        rows_filtered: table.len() - candidates.len(),
        candidates: candidates.len(),
        ..ImportSummary::default()
    };

    let existing = store.query_all(owner)?;
    let existing_ids: HashSet<&str> = existing.iter().map(|book| book.id.as_str()).collect();
    let plan = merge(candidates, &existing, policy);
    summary.skipped_duplicates = plan.skipped.len();

    if !plan.to_insert.is_empty() {
        let stored = store.upsert(owner, plan.to_insert)?;
        summary.inserted = stored
            .iter()
            .filter(|book| !existing_ids.contains(book.id.as_str()))
            .count();
    }

    log::info!(
        "import for {}: {} rows, {} candidates, {} inserted, {} duplicates skipped",
        owner,
        summary.rows_read,
        summary.candidates,
        summary.inserted,
        summary.skipped_duplicates
    );
    Ok(summary)
}
