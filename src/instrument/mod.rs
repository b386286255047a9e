//! Instrumentation passes
//!
//! ### Overview
//!
//! Every method body that can carry code is rewritten so that it first checks a static `$ic`
//! slot on its class. The slot is empty in the shipped application, so the original body runs.
//! A patch installs an interceptor in the slot, and from then on the instrumented method offers
//! every call to the interceptor first:
//!
//!   * ordinary methods pass their arguments either boxed into an `Object[]` (`invokeCommon`) or
//!     as they are, to an overload dedicated to their parameter shape (`invoke<Shape>`)
//!   * constructors go through a two-phase protocol, since nothing may touch the object before
//!     its `this(...)`/`super(...)` call has run
//!   * static initializers ask a process-wide interceptor instead, since they run before anyone
//!     could have filled `$ic`
//!
//! For patches that replace whole component classes ("full" mode), a genesis class is also
//! inserted between every platform component class and the program classes extending it.
//!
//! [`Instrumenter::run`] runs all of this in order over a class graph.

mod access;
mod code_builder_exts;
mod components;
mod constructor;
mod dispatch;
mod errors;
mod fields;
mod filter;
mod genesis;
mod init_analyzer;
mod instrumenter;
mod marks;
mod method_ids;
mod normal_method;
pub mod runtime;
mod settings;
mod static_init;

pub use access::*;
pub use code_builder_exts::*;
pub use components::*;
pub use constructor::*;
pub use dispatch::*;
pub use errors::*;
pub use fields::*;
pub use filter::*;
pub use genesis::*;
pub use init_analyzer::*;
pub use instrumenter::*;
pub use marks::*;
pub use method_ids::*;
pub use normal_method::*;
pub use settings::*;
pub use static_init::*;
