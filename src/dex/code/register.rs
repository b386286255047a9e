use crate::util::Width;
use std::fmt;

/// Which bank a register is addressed in
///
/// Parameters always sit directly above the locals, so `p0` is the register right after the last
/// local. Keeping the two banks apart means adding scratch locals to a method never requires
/// renumbering the parameters it reads.
#[derive(Copy, Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Debug)]
pub enum RegisterSpace {
    Local,
    Parameter,
}

/// A register operand
///
/// Wide registers (holding a `long` or `double`) implicitly cover the next register too.
#[derive(Copy, Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct Register {
    pub space: RegisterSpace,
    pub index: u16,
    pub wide: bool,
}

impl Register {
    pub const fn local(index: u16) -> Register {
        Register {
            space: RegisterSpace::Local,
            index,
            wide: false,
        }
    }

    pub const fn local_wide(index: u16) -> Register {
        Register {
            space: RegisterSpace::Local,
            index,
            wide: true,
        }
    }

    pub const fn param(index: u16) -> Register {
        Register {
            space: RegisterSpace::Parameter,
            index,
            wide: false,
        }
    }

    pub const fn param_wide(index: u16) -> Register {
        Register {
            space: RegisterSpace::Parameter,
            index,
            wide: true,
        }
    }

    /// Same register, with the given width
    pub const fn with_wide(self, wide: bool) -> Register {
        Register { wide, ..self }
    }

    /// Same register, narrowed to a single slot
    pub const fn narrow(self) -> Register {
        self.with_wide(false)
    }

    pub fn is_local(&self) -> bool {
        self.space == RegisterSpace::Local
    }

    /// Index in the whole frame, given how many locals precede the parameters
    pub fn absolute(&self, local_registers: u16) -> u16 {
        match self.space {
            RegisterSpace::Local => self.index,
            RegisterSpace::Parameter => local_registers + self.index,
        }
    }

    /// Single-slot registers covered by this register (two for wide registers)
    pub fn slots(&self) -> impl Iterator<Item = Register> {
        let first = self.narrow();
        let second = if self.wide {
            Some(Register {
                index: self.index + 1,
                ..first
            })
        } else {
            None
        };
        std::iter::once(first).chain(second)
    }
}

impl Width for Register {
    fn width(&self) -> usize {
        if self.wide {
            2
        } else {
            1
        }
    }
}

impl fmt::Debug for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.space {
            RegisterSpace::Local => 'v',
            RegisterSpace::Parameter => 'p',
        };
        if self.wide {
            write!(f, "{}{}:{}{}", prefix, self.index, prefix, self.index + 1)
        } else {
            write!(f, "{}{}", prefix, self.index)
        }
    }
}

/// Ordered register operands of an invoke
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct RegisterList(pub Vec<Register>);

impl RegisterList {
    pub fn new() -> RegisterList {
        RegisterList(vec![])
    }

    pub fn push(&mut self, register: Register) {
        self.0.push(register)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Register> {
        self.0.iter()
    }

    /// Total number of register slots, counting wide registers twice
    pub fn slot_count(&self) -> usize {
        self.0.iter().map(Width::width).sum()
    }

    /// Absolute indices of every slot, in order
    pub fn absolute_slots(&self, local_registers: u16) -> Vec<u16> {
        self.0
            .iter()
            .flat_map(Register::slots)
            .map(|slot| slot.absolute(local_registers))
            .collect()
    }

    /// Do the slots form one run of consecutive registers?
    pub fn is_contiguous(&self, local_registers: u16) -> bool {
        self.absolute_slots(local_registers)
            .windows(2)
            .all(|pair| pair[1] == pair[0] + 1)
    }
}

impl From<Vec<Register>> for RegisterList {
    fn from(registers: Vec<Register>) -> RegisterList {
        RegisterList(registers)
    }
}
