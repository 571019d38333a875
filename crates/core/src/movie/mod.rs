//! Movie entities: the domain value, its cached form, and the remote wire shape.

mod types;

pub use types::*;
