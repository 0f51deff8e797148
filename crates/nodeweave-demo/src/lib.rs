//! nodeweave-demo: the Users and Movies walkthrough.
//!
//! Registers the `User` and `Movie` models, fills a graph with a handful of
//! users, movies, and likes, then reads it back through the query composer.

pub mod config;
pub mod error;
pub mod models;
pub mod populate;
pub mod report;
