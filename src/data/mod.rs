// src/data/mod.rs

//! Typed parameter data.
//!
//! - [`value`] defines [`ParameterValue`], one typed datum.
//! - [`bag`] defines [`DataBag`], the named set of values a filter or a node
//!   input is resolved against.

pub mod bag;
pub mod value;

pub use bag::{DataBag, RawDataBag};
pub use value::{FileId, ParameterValue};
