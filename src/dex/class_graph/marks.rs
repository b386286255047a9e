use bitflags::bitflags;
use std::fmt;

/// Kinds of Android components, as declared in the application manifest
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum ComponentType {
    Application,
    Activity,
    Service,
    Receiver,
    Provider,
}

impl ComponentType {
    pub const ALL: [ComponentType; 5] = [
        ComponentType::Application,
        ComponentType::Activity,
        ComponentType::Service,
        ComponentType::Receiver,
        ComponentType::Provider,
    ];

    /// Position of this component's flags in [`ComponentFlags`]
    const fn shift(self) -> u32 {
        ComponentFlag::BITS_PER_TYPE
            * match self {
                ComponentType::Application => 0,
                ComponentType::Activity => 1,
                ComponentType::Service => 2,
                ComponentType::Receiver => 3,
                ComponentType::Provider => 4,
            }
    }
}

bitflags! {
    /// Role of a class with respect to one component type
    pub struct ComponentFlag: u32 {
        /// Declared in the manifest
        const DIRECT = 1 << 0;
        /// Superclass of a declared class
        const SUPER = 1 << 1;
        const GENESIS = 1 << 2;
        const BUDDY = 1 << 3;
    }
}

impl ComponentFlag {
    const BITS_PER_TYPE: u32 = 4;
    const MASK: u32 = (1 << Self::BITS_PER_TYPE) - 1;
}

/// Component flags for every component type, packed four bits per type
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct ComponentFlags(u32);

impl ComponentFlags {
    pub const NONE: ComponentFlags = ComponentFlags(0);

    /// Flags for one component type
    pub fn get(self, component: ComponentType) -> ComponentFlag {
        ComponentFlag::from_bits_truncate((self.0 >> component.shift()) & ComponentFlag::MASK)
    }

    pub fn with(self, component: ComponentType, flag: ComponentFlag) -> ComponentFlags {
        ComponentFlags(self.0 | (flag.bits() << component.shift()))
    }

    pub fn has(self, component: ComponentType, flag: ComponentFlag) -> bool {
        self.get(component).intersects(flag)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ComponentFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for component in ComponentType::ALL {
            let flag = self.get(component);
            if !flag.is_empty() {
                map.entry(&component, &flag);
            }
        }
        map.finish()
    }
}

/// How the instrumentation has to treat a constructor
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ConstructorRole {
    /// Any constructor not otherwise classified
    Plain,

    /// No-argument constructor of a manifest-declared component, called by the platform
    ComponentDirect,

    /// Synthesized `<init>(BuddyInitContext)` bridge, never instrumented
    Wormhole,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn flags_are_packed_per_component() {
        let flags = ComponentFlags::NONE
            .with(ComponentType::Activity, ComponentFlag::DIRECT)
            .with(ComponentType::Provider, ComponentFlag::SUPER)
            .with(ComponentType::Activity, ComponentFlag::SUPER);
        assert_eq!(flags.bits(), (0b11 << 4) | (0b10 << 16));
        assert!(flags.has(ComponentType::Activity, ComponentFlag::DIRECT));
        assert!(!flags.has(ComponentType::Service, ComponentFlag::DIRECT | ComponentFlag::SUPER));
        assert_eq!(flags.get(ComponentType::Provider), ComponentFlag::SUPER);
        assert!(ComponentFlags::NONE.is_empty());
    }
}
