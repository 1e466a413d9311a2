//! Query-Forge Library
//!
//! Natural-language questions in, MySQL or MongoDB results out.
//! The HTTP binary is in src/main.rs.

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod llm;
pub mod service;
