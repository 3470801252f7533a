//! CLI Exit Code Registry
//!
//! Single source of truth for all CLI exit codes. Exit codes are part of
//! the shell contract; scripts rely on them.
//!
//! | Range   | Domain    | Description                              |
//! |---------|-----------|------------------------------------------|
//! | 0       | Universal | Success                                  |
//! | 1       | Universal | General error (unspecified)              |
//! | 2       | Universal | Usage error (bad args, missing/bad file) |
//! | 10-19   | assistant | Assistant configuration/request codes    |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing or invalid input file.
pub const EXIT_USAGE: u8 = 2;

/// Assistant endpoint or API key not configured.
pub const EXIT_ASSISTANT_NOT_CONFIGURED: u8 = 10;
