use super::{used_locals, Code, Instruction, LabelGenerator, SynLabel, SynLabelGenerator};
use crate::dex::Error;

/// This provides a slightly simplified interface for building up method bodies
///
/// Labels handed out by the builder are unique within the body. When rewriting existing code,
/// start from [`CodeBuilder::rewriting`] so that the labels of the original instructions stay
/// valid alongside the new ones.
pub struct CodeBuilder {
    instructions: Vec<Instruction>,
    label_generator: SynLabelGenerator,

    /// Lower bound on the number of locals in the result
    minimum_locals: u16,
}

impl CodeBuilder {
    /// Create a builder for a new method
    pub fn new() -> CodeBuilder {
        CodeBuilder {
            instructions: vec![],
            label_generator: SynLabelGenerator::default(),
            minimum_locals: 0,
        }
    }

    /// Create a builder for a replacement of `code`
    ///
    /// None of the original instructions are included yet (see [`CodeBuilder::extend`]), but the
    /// original local register count is kept as a lower bound.
    pub fn rewriting(code: &Code) -> CodeBuilder {
        CodeBuilder {
            instructions: vec![],
            label_generator: code.label_generator.clone(),
            minimum_locals: code.local_registers,
        }
    }

    /// Reserve at least this many local registers
    pub fn reserve_locals(&mut self, locals: u16) {
        self.minimum_locals = self.minimum_locals.max(locals);
    }

    /// Number of locals the result will have if nothing else gets emitted
    pub fn local_registers(&self) -> u16 {
        self.minimum_locals.max(used_locals(&self.instructions))
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub fn extend(&mut self, instructions: impl IntoIterator<Item = Instruction>) {
        self.instructions.extend(instructions);
    }

    /// Place a label at the current position
    pub fn place_label(&mut self, label: SynLabel) {
        self.instructions.push(Instruction::Label(label));
    }

    /// Turn the builder into a method body, checking it along the way
    pub fn result(self, parameter_registers: u16) -> Result<Code, Error> {
        let mut code = Code {
            local_registers: 0,
            parameter_registers,
            instructions: self.instructions,
            label_generator: self.label_generator,
        };
        code.recompute_registers(parameter_registers, self.minimum_locals);
        code.validate()?;
        Ok(code)
    }
}

impl Default for CodeBuilder {
    fn default() -> Self {
        CodeBuilder::new()
    }
}

impl LabelGenerator<SynLabel> for CodeBuilder {
    fn fresh_label(&mut self) -> SynLabel {
        self.label_generator.fresh_label()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dex::code::{Comparison, Register, ValueKind};

    #[test]
    fn rewriting_keeps_labels_fresh() {
        let mut original = CodeBuilder::new();
        let done = original.fresh_label();
        original.push(Instruction::IfZero(Comparison::Eq, Register::param(0), done));
        original.push(Instruction::Const(Register::local(0), 1));
        original.push(Instruction::Return(ValueKind::Single, Register::local(0)));
        original.place_label(done);
        original.push(Instruction::Return(ValueKind::Single, Register::param(0)));
        let original = original.result(1).unwrap();
        assert_eq!(original.local_registers, 1);

        let mut rewritten = CodeBuilder::rewriting(&original);
        rewritten.reserve_locals(4);
        let fresh = rewritten.fresh_label();
        assert_ne!(fresh, done);
        rewritten.push(Instruction::Goto(fresh));
        rewritten.place_label(fresh);
        rewritten.extend(original.instructions.iter().cloned());
        let rewritten = rewritten.result(1).unwrap();
        assert_eq!(rewritten.local_registers, 4);
        assert_eq!(rewritten.absolute(Register::param(0)), 4);
    }
}
