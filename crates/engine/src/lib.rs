pub mod display;
pub mod error;
pub mod extract;
pub mod grid;
pub mod history;
pub mod layout;
pub mod save;
pub mod session;
pub mod view;
pub mod years;

#[cfg(test)]
pub mod harness;

pub use error::{EngineError, GridError};
pub use grid::{Grid, MemoryGrid};
pub use layout::{DataCoord, GridCoord};
pub use session::{EditSession, SessionState};
