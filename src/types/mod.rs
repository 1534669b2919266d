//! Strongly-typed domain types for safer APIs.
//!
//! The eroder is configured in *years* (the external time unit) but all
//! internal rates are per *second*.
//!
//! # Example
//!
//! ```
//! use sedflux_rs::types::{Seconds, Years, SECONDS_PER_YEAR};
//!
//! let dt = Years::new(100.0);
//! let secs: Seconds = dt.into();
//! assert_eq!(secs.get(), 100.0 * SECONDS_PER_YEAR);
//! ```

mod time;

pub use time::{SECONDS_PER_HOUR, SECONDS_PER_YEAR, Seconds, Years};
