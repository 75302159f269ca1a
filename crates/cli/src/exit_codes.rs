//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args)               |
//! | 3       | Universal        | I/O error (unreadable file, bad CSV)     |
//! | 10-19   | save             | Extraction, validation and persistence   |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `engine_exit_code` or the relevant command

use gridedit_engine::EngineError;

// =============================================================================
// Universal (0-3)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unknown column, bad row number.
pub const EXIT_USAGE: u8 = 2;

/// I/O error - input file missing, unreadable or not CSV.
pub const EXIT_IO: u8 = 3;

// =============================================================================
// Save (10-19)
// =============================================================================

/// A row's width differs from the header; nothing was sent.
pub const EXIT_SCHEMA_MISMATCH: u8 = 10;

/// Every extraction strategy failed or the table is empty; nothing was sent.
pub const EXIT_NO_DATA: u8 = 11;

/// Server unreachable, non-2xx, or answered `success: false`.
pub const EXIT_PERSISTENCE: u8 = 12;

/// Map an engine error to its exit code.
pub fn engine_exit_code(err: &EngineError) -> u8 {
    match err {
        EngineError::SchemaMismatch { .. } | EngineError::EmptyHeader => EXIT_SCHEMA_MISMATCH,
        EngineError::NoDataExtracted { .. } => EXIT_NO_DATA,
        EngineError::PersistenceFailure(_) => EXIT_PERSISTENCE,
        EngineError::StaleCoordinate(_)
        | EngineError::SyntheticColumn(_)
        | EngineError::MisalignedRow { .. }
        | EngineError::NotEditing
        | EngineError::SaveInFlight => EXIT_USAGE,
        EngineError::Grid(_) => EXIT_ERROR,
    }
}
