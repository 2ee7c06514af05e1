//! Domain records
//!
//! - [`Project`] - Contract scope owning BoQ items and sheets
//! - [`BoqItem`] - Bill-of-quantities line with contracted quantity and unit price
//! - [`Sheet`] - Periodic construction book sheet with a workflow status
//! - [`Entry`] - Quantity recorded on a sheet against one BoQ item

pub mod boq_item;
pub mod entry;
pub mod project;
pub mod sheet;

pub use boq_item::{BoqItem, BoqItemChanges, NewBoqItem};
pub use entry::{Entry, EntryInput, EntryLine};
pub use project::{NewProject, Project};
pub use sheet::{NewSheet, Sheet, SheetDetail, SheetFilter, SheetSummary};
