//! Command implementations

pub mod boq;
pub mod completions;
pub mod init;
pub mod project;
pub mod sheet;
pub mod team;
