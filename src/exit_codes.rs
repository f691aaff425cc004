//! Exit codes shared by every ticket subcommand.

pub const INVALID_INPUT: i32 = 1;
pub const INVALID_CREDENTIALS: i32 = 200;
pub const BAD_REQUEST: i32 = 201;
pub const UNKNOWN_ERROR: i32 = 249;
