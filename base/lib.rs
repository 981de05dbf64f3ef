// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod duration;
mod error;
pub mod tracing_setup;

pub use crate::error::{Error, ErrorKind, ResultExt};
