use crate::dex::class_graph::MethodData;
use std::collections::BTreeSet;
use std::fmt;

/// Protocol by which an instrumented method hands control to its interceptor
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Dispatch {
    /// Arguments boxed into an `Object[]` and passed to `invokeCommon`
    Common,

    /// Arguments passed as they are to the `invoke<Shape>` overload for this shape
    Special(String),

    /// Two-phase constructor protocol (`invokeUnInit` then `invokeInitBody`)
    Init,
}

impl Dispatch {
    /// Decide how a method dispatches
    ///
    /// Constructors always use the init protocol. Other methods use a dedicated overload when
    /// their parameter shape is configured as special, and fall back to the common protocol.
    pub fn classify(method: &MethodData<'_>, special_shapes: &BTreeSet<String>) -> Dispatch {
        if method.is_constructor() {
            return Dispatch::Init;
        }
        let shape = method.descriptor.short_parameters();
        if special_shapes.contains(&shape) {
            Dispatch::Special(shape)
        } else {
            Dispatch::Common
        }
    }
}

impl fmt::Display for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatch::Common => f.write_str("common"),
            Dispatch::Special(shape) => write!(f, "special({})", shape),
            Dispatch::Init => f.write_str("init"),
        }
    }
}
