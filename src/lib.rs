pub mod analyzers;
pub mod catalog;
pub mod config;
pub mod infra;
pub mod output;
pub mod parser;
pub mod query;
pub mod services;
