//! Dataflow over method bodies
//!
//! The only property tracked is the one rewriting constructors depends on: which registers still
//! hold the receiver before its superclass (or same-class) constructor has run. This is the
//! `uninitializedThis` verification type of the platform verifier, computed the same way: a
//! forward analysis over the instruction stream, merging at branch targets until nothing changes.

mod uninitialized;

pub use uninitialized::*;
