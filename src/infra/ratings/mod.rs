//! User-rating backends.
//!
//! [`SqlRatingStore`] reads the `reviews` table through sqlx.
//! [`RatingFile`] serves samples from a JSON file, for offline runs and demos.

mod file;
mod sql;

pub use file::RatingFile;
pub use sql::SqlRatingStore;
