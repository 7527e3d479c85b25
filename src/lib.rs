pub mod app;
pub mod config;
pub mod diff;
pub mod domain;
pub mod error;
pub mod migrate;
pub mod output;
pub mod table;
