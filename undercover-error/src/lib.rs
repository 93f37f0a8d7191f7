//! # undercover-error
//!
//! Unified error handling for every crate in the workspace.
//!
//! - **ErrorKind**: what went wrong (e.g. `RateLimited`, `MalformedResponse`)
//! - **ErrorStatus**: how to react (`Permanent`, `Temporary`, `Persistent`)
//! - **Context**: operation name plus key/value pairs for locating the cause
//! - **Source**: the wrapped underlying error, never leaked as a raw type
//!
//! ```rust
//! use undercover_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::MalformedResponse, "response missing statement field")
//!         .with_operation("player::generate_statement")
//!         .with_context("player_id", "3"))
//! }
//! ```
//!
//! All functions return `Result<T, undercover_error::Error>`. External errors
//! are wrapped with `set_source(err)`; once an error has been handled, callers
//! only append context.

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using the workspace Error
pub type Result<T> = std::result::Result<T, Error>;
