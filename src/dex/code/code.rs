use super::{Instruction, InvokeKind, Register, SynLabel, SynLabelGenerator};
use crate::dex::Error;
use std::collections::HashMap;

/// Largest number of register slots an invoke can address in its fixed (non-range) form
pub const MAX_FIXED_INVOKE_SLOTS: usize = 5;

/// Semantic representation of a method body
#[derive(Clone, Debug)]
pub struct Code {
    /// Number of local registers (`v0`, `v1`, ...)
    pub local_registers: u16,

    /// Number of parameter registers, including the receiver of instance methods
    pub parameter_registers: u16,

    /// Instructions, in program order
    pub instructions: Vec<Instruction>,

    /// Generator to produce the next label
    pub label_generator: SynLabelGenerator,
}

impl Code {
    /// Size of the whole register frame
    pub fn total_registers(&self) -> u32 {
        self.local_registers as u32 + self.parameter_registers as u32
    }

    /// Absolute index of a register in this frame
    pub fn absolute(&self, register: Register) -> u16 {
        register.absolute(self.local_registers)
    }

    /// Recompute the local register count from the registers used by the instructions
    ///
    /// The count never drops below `minimum_locals`, so rewriters can reserve scratch space.
    pub fn recompute_registers(&mut self, parameter_registers: u16, minimum_locals: u16) {
        self.parameter_registers = parameter_registers;
        self.local_registers = minimum_locals.max(used_locals(&self.instructions));
    }

    /// Position (in `instructions`) of every placed label
    pub fn label_positions(&self) -> Result<HashMap<SynLabel, usize>, Error> {
        let mut positions = HashMap::new();
        for (idx, instruction) in self.instructions.iter().enumerate() {
            if let Instruction::Label(label) = instruction {
                if positions.insert(*label, idx).is_some() {
                    return Err(Error::DuplicateLabel(*label));
                }
            }
        }
        Ok(positions)
    }

    /// Check that invoke register lists fit their encoding and that jumps have targets
    pub fn validate(&self) -> Result<(), Error> {
        let positions = self.label_positions()?;
        for instruction in &self.instructions {
            for target in instruction.branch_targets() {
                if !positions.contains_key(&target) {
                    return Err(Error::UnplacedLabel(target));
                }
            }

            if let Instruction::Invoke {
                kind,
                range,
                args,
                method,
            } = instruction
            {
                let expected = method
                    .descriptor
                    .parameter_length(*kind != InvokeKind::Static);
                if expected != args.slot_count() {
                    return Err(Error::ArgumentMismatch {
                        method: format!("{:?}", method),
                        expected,
                        found: args.slot_count(),
                    });
                }

                if *range {
                    if !args.is_contiguous(self.local_registers) {
                        return Err(Error::NonContiguousRange {
                            method: format!("{:?}", method),
                        });
                    }
                } else if args.slot_count() > MAX_FIXED_INVOKE_SLOTS {
                    return Err(Error::RegisterListOverflow {
                        method: format!("{:?}", method),
                        slots: args.slot_count(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Smallest local register count that covers every local used by these instructions
pub fn used_locals(instructions: &[Instruction]) -> u16 {
    instructions
        .iter()
        .flat_map(Instruction::registers)
        .filter(Register::is_local)
        .map(|register| register.index + if register.wide { 2 } else { 1 })
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dex::code::{LabelGenerator, MethodRef, RegisterList, ValueKind};
    use crate::dex::{BinaryName, MethodDescriptor, ParseDescriptor, UnqualifiedName};

    fn method(descriptor: &str) -> MethodRef {
        MethodRef::new(
            BinaryName::INTERCEPTABLE,
            UnqualifiedName::INVOKECOMMON,
            MethodDescriptor::parse(descriptor).unwrap(),
        )
    }

    #[test]
    fn locals_follow_widest_use() {
        let mut code = Code {
            local_registers: 0,
            parameter_registers: 0,
            instructions: vec![
                Instruction::ConstWide(Register::local_wide(2), 7),
                Instruction::Return(ValueKind::Wide, Register::local_wide(2)),
            ],
            label_generator: SynLabelGenerator::default(),
        };
        code.recompute_registers(1, 0);
        assert_eq!(code.local_registers, 4);
        code.recompute_registers(1, 6);
        assert_eq!(code.local_registers, 6);
        assert_eq!(code.absolute(Register::param(0)), 6);
    }

    #[test]
    fn fixed_invoke_limited_to_five_slots() {
        let args: Vec<Register> = (0..6).map(Register::local).collect();
        let code = Code {
            local_registers: 6,
            parameter_registers: 0,
            instructions: vec![
                Instruction::invoke(InvokeKind::Static, args, method("(IIIIII)V")),
                Instruction::ReturnVoid,
            ],
            label_generator: SynLabelGenerator::default(),
        };
        assert!(matches!(
            code.validate(),
            Err(Error::RegisterListOverflow { slots: 6, .. })
        ));
    }

    #[test]
    fn range_invoke_must_be_contiguous() {
        let args = RegisterList(vec![Register::local(0), Register::local(2)]);
        let code = Code {
            local_registers: 3,
            parameter_registers: 0,
            instructions: vec![
                Instruction::invoke_range(InvokeKind::Static, args, method("(II)V")),
                Instruction::ReturnVoid,
            ],
            label_generator: SynLabelGenerator::default(),
        };
        assert!(matches!(
            code.validate(),
            Err(Error::NonContiguousRange { .. })
        ));
    }

    #[test]
    fn jumps_need_placed_labels() {
        let mut labels = SynLabelGenerator::default();
        let missing = labels.fresh_label();
        let code = Code {
            local_registers: 0,
            parameter_registers: 0,
            instructions: vec![Instruction::Goto(missing)],
            label_generator: labels,
        };
        assert!(matches!(code.validate(), Err(Error::UnplacedLabel(_))));
    }
}
