//! Home-screen tutorial list: filtering and sorting.
//!
//! Both steps are pure. Filtering keeps a tutorial when it matches the search
//! text, category, progress status and difficulty; sorting runs afterwards.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::model::{Difficulty, LearningStatus, ProgressFilter, Tutorial, TutorialId};

/// Category selector value that matches every tutorial.
pub const ALL_CATEGORIES: &str = "Semua";

/// Categories offered by the category picker.
pub const CATEGORIES: [&str; 6] = [
    ALL_CATEGORIES,
    "Pertukangan Kayu",
    "Pengecatan",
    "Listrik",
    "Plambing",
    "Perawatan",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    DurationShort,
    DurationLong,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSortKeyError(String);

impl fmt::Display for ParseSortKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown sort key: {}", self.0)
    }
}

impl std::error::Error for ParseSortKeyError {}

impl FromStr for SortKey {
    type Err = ParseSortKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "newest" => Ok(SortKey::Newest),
            "oldest" => Ok(SortKey::Oldest),
            "duration-short" => Ok(SortKey::DurationShort),
            "duration-long" => Ok(SortKey::DurationLong),
            other => Err(ParseSortKeyError(other.to_owned())),
        }
    }
}

/// Everything the learner can set on the home screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub search: String,
    /// `None` (or `"Semua"`) matches every category.
    pub category: Option<String>,
    pub progress: ProgressFilter,
    pub difficulty: Option<Difficulty>,
    pub sort: SortKey,
}

impl CatalogQuery {
    /// The chosen category, or `None` when every category is shown.
    #[must_use]
    pub fn selected_category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && *c != ALL_CATEGORIES)
    }
}

/// Locally known status per tutorial for the signed-in learner.
///
/// `None` means nobody is signed in, in which case the progress filter is
/// ignored entirely.
pub type StatusLookup = Option<HashMap<TutorialId, LearningStatus>>;

fn matches_search(tutorial: &Tutorial, needle: &str) -> bool {
    needle.is_empty()
        || tutorial.title.to_lowercase().contains(needle)
        || tutorial.description.to_lowercase().contains(needle)
}

fn matches_progress(
    tutorial: &Tutorial,
    filter: ProgressFilter,
    lookup: Option<&HashMap<TutorialId, LearningStatus>>,
) -> bool {
    let Some(lookup) = lookup else {
        return true;
    };
    match filter {
        ProgressFilter::All => true,
        ProgressFilter::Ongoing => lookup.get(&tutorial.id) == Some(&LearningStatus::Ongoing),
        ProgressFilter::Completed => lookup.get(&tutorial.id) == Some(&LearningStatus::Completed),
    }
}

/// Keep the tutorials matching every criterion of `query`.
#[must_use]
pub fn filter_tutorials<'a>(
    tutorials: &'a [Tutorial],
    query: &CatalogQuery,
    statuses: &StatusLookup,
) -> Vec<&'a Tutorial> {
    let needle = query.search.to_lowercase();
    let category = query.selected_category();
    tutorials
        .iter()
        .filter(|t| matches_search(t, &needle))
        .filter(|t| category.is_none_or(|c| t.category == c))
        .filter(|t| matches_progress(t, query.progress, statuses.as_ref()))
        .filter(|t| query.difficulty.is_none_or(|d| t.difficulty == d))
        .collect()
}

/// Order tutorials by `key`. Ties keep their filtered order.
pub fn sort_tutorials(tutorials: &mut [&Tutorial], key: SortKey) {
    match key {
        SortKey::Newest => tutorials.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortKey::Oldest => tutorials.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortKey::DurationShort => tutorials.sort_by_key(|t| t.duration_minutes()),
        SortKey::DurationLong => {
            tutorials.sort_by(|a, b| b.duration_minutes().cmp(&a.duration_minutes()));
        }
    }
}

/// Filter, then sort.
#[must_use]
pub fn apply<'a>(
    tutorials: &'a [Tutorial],
    query: &CatalogQuery,
    statuses: &StatusLookup,
) -> Vec<&'a Tutorial> {
    let mut list = filter_tutorials(tutorials, query, statuses);
    sort_tutorials(&mut list, query.sort);
    list
}
