//! Grade data aggregation and score blending.
//!
//! This module reads cleaned grade exports, folds them into per-course and
//! per-professor aggregates with a CSV-only GPA, and blends that GPA with user
//! ratings at query time.

pub mod aggregate;
pub mod analyzer;
pub mod fusion;
pub mod grade;
pub mod types;
pub mod utility;
