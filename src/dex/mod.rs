//! Model of register-based (Dalvik) bytecode
//!
//! This is deliberately the part of a dex toolchain that the instrumentation pass needs and no
//! more: there is no reading or writing of the binary container here. Classes live in an
//! arena-backed [`class_graph::ClassGraph`], method bodies are streams of
//! [`code::Instruction`] addressing registers as locals (`v0`, `v1`, ...) followed by parameters
//! (`p0`, `p1`, ...).
//!
//! ### Simple example
//!
//! Declaring a class with a static method `int twice(int x) { return x + x; }`:
//!
//! ```
//! use titan_instrument::dex::class_graph::*;
//! use titan_instrument::dex::code::*;
//! use titan_instrument::dex::*;
//!
//! # fn declare() -> Result<(), Error> {
//! let arenas = ClassGraphArenas::new();
//! let class_graph = ClassGraph::new(&arenas);
//! let object = class_graph.add_class(ClassData::new(
//!     BinaryName::OBJECT,
//!     ClassKind::Library,
//!     None,
//!     ClassAccessFlags::PUBLIC,
//! ))?;
//! let class = class_graph.add_class(ClassData::new(
//!     BinaryName::from_string(String::from("com/example/Maths")).unwrap(),
//!     ClassKind::Program,
//!     Some(object),
//!     ClassAccessFlags::PUBLIC,
//! ))?;
//!
//! let mut code = CodeBuilder::new();
//! code.push(Instruction::Binary(
//!     BinaryOp::Add,
//!     NumericType::Int,
//!     Register::local(0),
//!     Register::param(0),
//!     Register::param(0),
//! ));
//! code.push(Instruction::Return(ValueKind::Single, Register::local(0)));
//!
//! let descriptor = MethodDescriptor::parse("(I)I").unwrap();
//! let parameter_registers = descriptor.parameter_length(false) as u16;
//! class_graph.add_method(
//!     MethodData::new(
//!         class,
//!         UnqualifiedName::from_string(String::from("twice")).unwrap(),
//!         descriptor,
//!         MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
//!     )
//!     .with_code(code.result(parameter_registers)?),
//! )?;
//! # Ok(())
//! # }
//! ```

mod access_flags;
pub mod class_graph;
pub mod code;
mod descriptors;
mod errors;
mod names;
pub mod verifier;

pub use access_flags::*;
pub use descriptors::*;
pub use errors::*;
pub use names::*;
