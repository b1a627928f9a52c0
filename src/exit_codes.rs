//! Exit code constants for the parley CLI.
//!
//! - 0: Success (a reply was printed, possibly a fallback apology)
//! - 1: User error (bad args, unreadable input, invalid configuration)
//! - 2: Dispatch failure (the dispatcher could not produce any reply)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, unreadable files, or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// Dispatch failure: no reply could be produced, not even a fallback message.
pub const DISPATCH_FAILURE: i32 = 2;
