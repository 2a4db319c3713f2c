//! Low-level primitives and utilities
//!
//! Pure helpers with no knowledge of vertices or terminals: ANSI handling,
//! display widths, unit formatting and the bounded log ring.

pub mod ansi;
pub mod display_width;
pub mod log_ring;
pub mod units;
