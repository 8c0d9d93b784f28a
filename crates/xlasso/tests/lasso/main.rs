//! End-to-end tests for xlasso.
//!
//! Each test builds the in-memory workbook it needs, registers it with a
//! `SheetsFactory` and lassoes reference strings against it.

mod common;
mod filters;
mod properties;
mod recursion;
mod scenarios;

pub use common::*;
