//! Filter/sort engine for the profile grid.
//!
//! `FilterEngine` owns the parsed `ProfileRecord`s of one page view,
//! narrows them with a `FilterCriteria`, orders the survivors by a
//! `SortKey`, and pushes visibility and order to a `CardView`.

pub mod criteria;
pub mod engine;
pub mod view;

pub use criteria::{
    AgeBucket, CountRange, FilterCriteria, SortKey, SponsorCriterion, FIVE_YEARS_DAYS,
    MAX_COUNT_SENTINEL, MAX_FOLLOWERS_SENTINEL,
};
pub use engine::{FilterEngine, NOTHING_TO_PICK};
pub use view::{CardView, RenderSummary, ResultsMessage, HIGHLIGHT_DURATION, NO_RESULTS_MESSAGE};
