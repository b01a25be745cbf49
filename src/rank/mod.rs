//! Issue classification and ranking.
//!
//! Pure functions that turn a stored [`Issue`](crate::board::models::Issue)
//! into the display-facing [`IssueView`]. Nothing here touches storage or the
//! clock: the evaluation instant is always passed in, so the same input and
//! instant produce the same category, summary and rank.
//!
//! | Module     | Responsibility                                         |
//! |------------|--------------------------------------------------------|
//! | `category` | `category_id` → display name, "Other" fallback         |
//! | `vocab`    | UI status/priority synonyms → storage vocabulary       |
//! | `score`    | additive 0..=100 rank                                  |
//! | `summary`  | one-line synthesized description                       |
//! | `view`     | assembles `IssueView`, rank ordering                   |

pub mod category;
pub mod score;
pub mod summary;
pub mod view;
pub mod vocab;

pub use category::{CATEGORIES, category_name};
pub use score::ai_rank;
pub use summary::ai_summary;
pub use view::{IssueView, SortOrder, sort_views, to_view, to_views};
pub use vocab::{map_ui_priority, map_ui_status};
