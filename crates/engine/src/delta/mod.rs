//! Delta-token generation: weak-hash index, matcher, and script helpers.

pub mod generator;
pub mod index;
pub mod script;
