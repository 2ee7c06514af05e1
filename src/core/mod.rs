//! Core module - domain rules, persistence and configuration

pub mod access;
pub mod batch;
pub mod book;
pub mod boq_import;
pub mod config;
pub mod error;
pub mod identity;
pub mod quantity;
pub mod store;
pub mod team;
pub mod workflow;
pub mod workspace;

pub use access::{can_perform, Action};
pub use batch::{plan_batch, BatchPlan};
pub use book::Book;
pub use boq_import::ImportStats;
pub use config::Config;
pub use error::{GkError, Result, ValidationError};
pub use identity::{EntityId, EntityPrefix, IdParseError};
pub use quantity::{Price, Quantity, QuantityError};
pub use store::Store;
pub use team::{Actor, Role};
pub use workflow::SheetStatus;
pub use workspace::{Workspace, WorkspaceError};
