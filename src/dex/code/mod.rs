//! Method bodies
//!
//! ### Structure
//!
//! A method body is a flat stream of [`Instruction`]s, with branch targets marked by the
//! `Label` pseudo-instruction. Registers are addressed relative to their bank (see
//! [`RegisterSpace`]), which is what lets a rewrite prepend code using fresh scratch locals
//! without touching how the original instructions address the method parameters.
//!
//! ### Code generation
//!
//! [`CodeBuilder`] emits instructions top to bottom. When rewriting an existing body, the builder
//! is seeded from that body's label generator so new labels never collide with old ones, and the
//! final register counts are recomputed from what the instructions actually use.

mod code;
mod code_builder;
mod instruction;
mod label;
mod register;

pub use code::*;
pub use code_builder::*;
pub use instruction::*;
pub use label::*;
pub use register::*;
