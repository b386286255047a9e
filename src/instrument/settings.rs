use super::{AcceptAll, InstrumentFilter};
use crate::dex::class_graph::ComponentType;
use crate::dex::BinaryName;
use std::collections::{BTreeMap, BTreeSet};

/// Which kind of patch the instrumented application must be able to receive
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum InstrumentType {
    /// Patches replace method bodies
    Light,

    /// Patches may also replace whole component classes, which needs genesis classes
    Full,
}

pub struct Settings {
    pub instrument_type: InstrumentType,

    /// Widen non-private instance methods to public
    ///
    /// Patch code lives in other classes (and packages), so anything it calls has to be visible.
    /// Private instance methods are left alone since widening them would turn `invoke-direct`
    /// call sites into virtual dispatch.
    pub make_virtual_methods_public: bool,

    /// Instrument plain constructors at all
    pub instrument_init_methods: bool,

    /// Parameter shapes that get a dedicated `invoke<Shape>` interceptor overload
    ///
    /// A shape has one character per parameter (`Z B S C I J F D`, with objects and arrays
    /// collapsed to `L`), or is `V` for methods without parameters. Any shape not in the set falls
    /// back to `invokeCommon`, which is always correct.
    pub special_parameter_shapes: BTreeSet<String>,

    /// Leave the Meizu push SDK untouched
    ///
    /// The SDK checks the integrity of its own classes at runtime.
    pub filter_meizu_push: bool,

    /// Classes and methods to exclude from instrumentation
    pub filter: Box<dyn InstrumentFilter>,

    /// Component classes declared in the application manifest
    pub components: BTreeMap<ComponentType, Vec<BinaryName>>,
}

impl Settings {
    /// Shapes hot enough in typical applications to deserve their own overload
    pub const DEFAULT_SPECIAL_PARAMETER_SHAPES: [&'static str; 29] = [
        "V", "L", "LL", "LLL", "LLLL", "LLLLL", "I", "II", "III", "IIII", "Z", "J", "LI", "IL",
        "LZ", "ZL", "LJ", "JL", "LLI", "LII", "LIL", "ILL", "IIL", "LLZ", "LIII", "LLLI", "LLII",
        "LLIL", "LILL",
    ];

    pub fn new(instrument_type: InstrumentType) -> Settings {
        Settings {
            instrument_type,
            make_virtual_methods_public: true,
            instrument_init_methods: true,
            special_parameter_shapes: Self::DEFAULT_SPECIAL_PARAMETER_SHAPES
                .iter()
                .copied()
                .map(String::from)
                .collect(),
            filter_meizu_push: true,
            filter: Box::new(AcceptAll),
            components: BTreeMap::new(),
        }
    }

    /// Declare a manifest component
    pub fn add_component(&mut self, component: ComponentType, class: BinaryName) {
        self.components.entry(component).or_default().push(class);
    }

    pub fn is_full(&self) -> bool {
        self.instrument_type == InstrumentType::Full
    }
}
