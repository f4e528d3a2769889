//! Request extractors that report failures through [`AppError`](crate::AppError).

pub mod json;

pub use json::{JsonBody, ValidatedJson};
