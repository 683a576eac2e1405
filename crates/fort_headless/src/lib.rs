//! Headless build processor for tools, bots and CI.
//!
//! This crate puts a single build world behind a JSON-lines protocol:
//! commands arrive one per line on stdin and each gets exactly one response
//! on stdout. Because one [`Session`] owns the world and handles commands one
//! at a time, every placement and cascade is a complete transaction before
//! the next request is looked at.
//!
//! - **stdin**: Commands (place, remove, query_area, ...)
//! - **stdout**: Responses (JSON)
//! - **stderr**: Logs (human-readable)
//!
//! See [`protocol`] module for the full command/response specification.
//!
//! # Example
//!
//! ```bash
//! # Run interactively
//! echo '{"cmd":"place","kind":"floor","x":0,"z":0,"level":0}' | cargo run -p fort_headless
//!
//! # Run a recorded command file
//! cargo run -p fort_headless -- script --input build.jsonl
//!
//! # Validate a config file
//! cargo run -p fort_headless -- check-config build.ron
//! ```

pub mod protocol;
pub mod session;

pub use protocol::{Command, Response};
pub use session::{Session, SessionError, SessionStats};
