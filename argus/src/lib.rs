#![allow(dead_code)]

mod common;
mod filter;
mod gpu;
mod image;
mod ops;
mod processing_context;

pub mod prelude;

pub use prelude::*;
