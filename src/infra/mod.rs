//! Concrete backends for the traits in [`crate::services`].

pub mod ratings;
