//! Seams to collaborators that live outside this crate.

pub mod rating_source;

pub use rating_source::{NoRatings, RatingSample, RatingSource};
