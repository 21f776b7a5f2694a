//! # netprobe-common
//!
//! Types shared by every layer of the scanner: the request/result model, the
//! technique enumeration, input validation, the error taxonomy and runtime
//! configuration. No I/O happens in this crate.

pub mod config;
pub mod error;
pub mod input;
pub mod request;
pub mod results;
pub mod technique;
