//! Argument type system
//!
//! The registry of value types an annotation can declare, with their
//! aliases, validators and CLI shapes.

pub mod registry;

pub use registry::{CliShape, TypeHandler, TypeId, TypeRegistry, Value};
