use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::goals::GoalTargets;

pub const DEFAULT_BOOKS_GOAL: u32 = 24;
pub const DEFAULT_PAGES_GOAL: u32 = 7500;

/// Per-owner goal configuration as stored and as edited by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSettings {
    pub books_per_year: u32,
    pub pages_per_year: u32,
}

impl Default for GoalSettings {
    fn default() -> Self {
        GoalSettings {
            books_per_year: DEFAULT_BOOKS_GOAL,
            pages_per_year: DEFAULT_PAGES_GOAL,
        }
    }
}

impl GoalSettings {
    /// Applies optional overrides on top of the stored values.
    pub fn with_overrides(self, books: Option<u32>, pages: Option<u32>) -> GoalSettings {
        GoalSettings {
            books_per_year: books.unwrap_or(self.books_per_year),
            pages_per_year: pages.unwrap_or(self.pages_per_year),
        }
    }

    pub fn targets(&self) -> Result<GoalTargets, ConfigError> {
        GoalTargets::new(self.books_per_year, self.pages_per_year)
    }
}
