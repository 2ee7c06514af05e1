//! gk: construction book (GK) sheets
//!
//! Periodic progress sheets recorded against a project's bill of
//! quantities, with a role-gated edit workflow and an SQLite store.

pub mod cli;
pub mod core;
pub mod entities;
