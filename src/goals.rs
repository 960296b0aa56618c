use chrono::Datelike;
use serde::Serialize;

use crate::error::ConfigError;
use crate::models::Book;

/// Yearly reading targets. Both values are always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalTargets {
    books: u32,
    pages: u32,
}

impl GoalTargets {
    pub fn new(books: u32, pages: u32) -> Result<GoalTargets, ConfigError> {
        if books == 0 {
            return Err(ConfigError::NonPositiveTarget("books"));
        }
        if pages == 0 {
            return Err(ConfigError::NonPositiveTarget("pages"));
        }
        Ok(GoalTargets { books, pages })
    }

    pub fn books(&self) -> u32 {
        self.books
    }

    pub fn pages(&self) -> u32 {
        self.pages
    }

    /// Either target is enough.
    pub fn is_met(&self, progress: &GoalProgress) -> bool {
        progress.books >= u64::from(self.books) || progress.pages >= u64::from(self.pages)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub books: u64,
    pub pages: u64,
}

/// Finished books whose end date falls in `year`.
pub fn goal_progress(books: &[Book], year: i32) -> GoalProgress {
    books
        .iter()
        .filter(|book| book.is_finished())
        .filter(|book| book.end_date.map(|date| date.year()) == Some(year))
        .fold(GoalProgress::default(), |acc, book| GoalProgress {
            books: acc.books + 1,
            pages: acc.pages + u64::from(book.pages.unwrap_or(0)),
        })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalReport {
    pub year: i32,
    pub targets: GoalTargets,
    pub progress: GoalProgress,
    pub books_remaining: u64,
    pub pages_remaining: u64,
    pub books_percent: f64,
    pub pages_percent: f64,
    pub reached: bool,
}

impl GoalReport {
    pub fn new(year: i32, targets: GoalTargets, progress: GoalProgress) -> GoalReport {
        let percent = |done: u64, target: u32| {
            (done as f64 / f64::from(target) * 100.0).min(100.0)
        };
        GoalReport {
            year,
            targets,
            progress,
            books_remaining: u64::from(targets.books).saturating_sub(progress.books),
            pages_remaining: u64::from(targets.pages).saturating_sub(progress.pages),
            books_percent: percent(progress.books, targets.books),
            pages_percent: percent(progress.pages, targets.pages),
            reached: targets.is_met(&progress),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalState {
    Unarmed,
    Armed,
    Fired,
}

/// Emitted once per session, the first time a target is met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalReached {
    pub progress: GoalProgress,
    pub targets: GoalTargets,
}

/// Celebration latch for one session.
///
/// The tracker lives exactly as long as the session that owns it. `Fired`
/// is terminal: later recomputations, data edits and target changes never
/// re-arm it. Nothing is persisted, so a new session starts `Unarmed` again
/// and will fire once more if the goal is still met.
#[derive(Debug, Clone)]
pub struct GoalTracker {
    targets: GoalTargets,
    state: GoalState,
}

impl GoalTracker {
    pub fn new(targets: GoalTargets) -> GoalTracker {
        GoalTracker {
            targets,
            state: GoalState::Unarmed,
        }
    }

    pub fn state(&self) -> GoalState {
        self.state
    }

    pub fn targets(&self) -> GoalTargets {
        self.targets
    }

    /// New targets apply from the next observation on.
    pub fn set_targets(&mut self, targets: GoalTargets) {
        self.targets = targets;
    }

    /// Feeds freshly computed progress into the latch. Returns the signal
    /// only on the transition into `Fired`.
    pub fn observe(&mut self, progress: GoalProgress) -> Option<GoalReached> {
        match self.state {
            GoalState::Fired => None,
            GoalState::Unarmed | GoalState::Armed => {
                if self.targets.is_met(&progress) {
                    self.state = GoalState::Fired;
                    log::info!(
                        "reading goal reached: {} books, {} pages",
                        progress.books,
                        progress.pages
                    );
                    Some(GoalReached {
                        progress,
                        targets: self.targets,
                    })
                } else {
                    self.state = GoalState::Armed;
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{goal_progress, GoalProgress, GoalReport, GoalState, GoalTargets, GoalTracker};
    use crate::error::ConfigError;
    use crate::models::{Book, ReadingStatus};
    use chrono::NaiveDate;

    fn books(count: u64) -> GoalProgress {
        GoalProgress {
            books: count,
            pages: 0,
        }
    }

    fn finished(pages: u32, end: Option<(i32, u32, u32)>, status: Option<ReadingStatus>) -> Book {
        let mut book = Book::draft();
        book.title = "T".to_string();
        book.pages = Some(pages);
        book.end_date = end.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d));
        book.status = status;
        book
    }

    #[test]
    fn fires_exactly_once() {
        let mut tracker = GoalTracker::new(GoalTargets::new(2, 999_999).unwrap());
        assert_eq!(tracker.state(), GoalState::Unarmed);

        assert!(tracker.observe(books(1)).is_none());
        assert_eq!(tracker.state(), GoalState::Armed);

        let fired = tracker.observe(books(2)).expect("second update should fire");
        assert_eq!(fired.progress.books, 2);
        assert_eq!(tracker.state(), GoalState::Fired);

        assert!(tracker.observe(books(2)).is_none());
        assert_eq!(tracker.state(), GoalState::Fired);
    }

    #[test]
    fn page_target_alone_is_enough() {
        let mut tracker = GoalTracker::new(GoalTargets::new(50, 1000).unwrap());
        tracker.observe(GoalProgress { books: 1, pages: 400 });

        let fired = tracker.observe(GoalProgress {
            books: 3,
            pages: 1200,
        });
        assert!(fired.is_some());
    }

    #[test]
    fn fired_does_not_rearm_when_progress_drops() {
        let mut tracker = GoalTracker::new(GoalTargets::new(1, 10).unwrap());
        assert!(tracker.observe(books(0)).is_none());
        assert!(tracker.observe(books(1)).is_some());
        assert!(tracker.observe(books(0)).is_none());
        assert_eq!(tracker.state(), GoalState::Fired);
        assert!(tracker.observe(books(5)).is_none());
    }

    #[test]
    fn first_observation_already_met_fires() {
        let mut tracker = GoalTracker::new(GoalTargets::new(1, 10).unwrap());
        assert!(tracker.observe(books(3)).is_some());
    }

    #[test]
    fn raised_targets_do_not_rearm() {
        let mut tracker = GoalTracker::new(GoalTargets::new(1, 10).unwrap());
        tracker.observe(books(1));
        tracker.set_targets(GoalTargets::new(5, 100).unwrap());
        assert!(tracker.observe(books(6)).is_none());
    }

    #[test]
    fn rejects_zero_targets() {
        assert_eq!(
            GoalTargets::new(0, 10),
            Err(ConfigError::NonPositiveTarget("books"))
        );
        assert_eq!(
            GoalTargets::new(10, 0),
            Err(ConfigError::NonPositiveTarget("pages"))
        );
    }

    #[test]
    fn progress_counts_finished_books_ending_in_year() {
        let collection = vec![
            finished(300, Some((2024, 3, 1)), Some(ReadingStatus::Finished)),
            finished(200, Some((2024, 12, 31)), None),
            finished(999, Some((2023, 12, 31)), None),
            finished(500, None, Some(ReadingStatus::Finished)),
            finished(700, Some((2024, 5, 5)), Some(ReadingStatus::Reading)),
        ];

        assert_eq!(
            goal_progress(&collection, 2024),
            GoalProgress {
                books: 2,
                pages: 500
            }
        );
    }

    #[test]
    fn report_clamps_remaining_and_percent() {
        let targets = GoalTargets::new(2, 1000).unwrap();
        let report = GoalReport::new(2024, targets, GoalProgress { books: 3, pages: 250 });

        assert_eq!(report.books_remaining, 0);
        assert_eq!(report.pages_remaining, 750);
        assert_eq!(report.books_percent, 100.0);
        assert_eq!(report.pages_percent, 25.0);
        assert!(report.reached);
    }
}
