//! Cell-related types
//!
//! - [`CellValue`] - the value stored in a cell
//! - [`CellAddress`] / [`CellRange`] - locations such as `A1` and `A1:B10`
//! - [`CellData`] / [`CellStorage`] - value plus style index, stored sparsely

mod address;
mod storage;
mod value;

pub use address::{CellAddress, CellRange};
pub use storage::{CellData, CellStorage};
pub use value::{CellError, CellValue, CoercionError, SharedString};
