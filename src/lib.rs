//! Bytecode instrumentation for Android hot-patching
//!
//! The [`dex`] module models the register-based bytecode of a linked application: classes,
//! members, descriptors and method bodies. The [`instrument`] module rewrites that model so that
//! a separately shipped patch can later take over any method, constructor or static initializer
//! through a runtime interceptor.

pub mod dex;
pub mod instrument;
pub mod util;
