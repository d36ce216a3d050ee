//! External script hooks.
//!
//! Both hook points (destination resolution and work transformation)
//! share one contract: the file's URI is written to the script's stdin
//! as a single line, and the script must print exactly one line to
//! stdout and exit zero within the configured timeout.

mod error;
mod executor;

pub use error::ScriptError;
pub use executor::{invoke_script, split_args};
