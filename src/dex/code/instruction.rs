use super::{Register, RegisterList, SynLabel};
use crate::dex::{BaseType, BinaryName, FieldType, MethodDescriptor, RefType, RenderDescriptor, UnqualifiedName};
use std::fmt;

/// Symbolic reference to a method
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub class: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,
}

impl MethodRef {
    pub fn new(
        class: BinaryName,
        name: UnqualifiedName,
        descriptor: MethodDescriptor<BinaryName>,
    ) -> MethodRef {
        MethodRef {
            class,
            name,
            descriptor,
        }
    }

    /// Same name and descriptor, owned by another class
    pub fn with_class(&self, class: BinaryName) -> MethodRef {
        MethodRef {
            class,
            name: self.name.clone(),
            descriptor: self.descriptor.clone(),
        }
    }
}

impl fmt::Debug for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}->{}{}",
            self.class.render(),
            self.name,
            self.descriptor.render()
        )
    }
}

/// Symbolic reference to a field
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub class: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: FieldType<BinaryName>,
}

impl FieldRef {
    pub fn new(class: BinaryName, name: UnqualifiedName, descriptor: FieldType<BinaryName>) -> FieldRef {
        FieldRef {
            class,
            name,
            descriptor,
        }
    }
}

impl fmt::Debug for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}->{}:{}",
            self.class.render(),
            self.name,
            self.descriptor.render()
        )
    }
}

/// Shape of the value moved or returned (`move`/`move-wide`/`move-object`, ...)
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ValueKind {
    Single,
    Wide,
    Object,
}

impl ValueKind {
    pub fn of(field_type: &FieldType<BinaryName>) -> ValueKind {
        match field_type {
            FieldType::Ref(_) => ValueKind::Object,
            FieldType::Base(BaseType::Long | BaseType::Double) => ValueKind::Wide,
            FieldType::Base(_) => ValueKind::Single,
        }
    }
}

/// Flavour of array and field accesses (`iget`, `iget-wide`, `iget-object`, `iget-boolean`, ...)
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum AccessKind {
    Plain,
    Wide,
    Object,
    Boolean,
    Byte,
    Char,
    Short,
}

impl AccessKind {
    pub fn of(field_type: &FieldType<BinaryName>) -> AccessKind {
        match field_type {
            FieldType::Ref(_) => AccessKind::Object,
            FieldType::Base(BaseType::Long | BaseType::Double) => AccessKind::Wide,
            FieldType::Base(BaseType::Boolean) => AccessKind::Boolean,
            FieldType::Base(BaseType::Byte) => AccessKind::Byte,
            FieldType::Base(BaseType::Char) => AccessKind::Char,
            FieldType::Base(BaseType::Short) => AccessKind::Short,
            FieldType::Base(BaseType::Int | BaseType::Float) => AccessKind::Plain,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum InvokeKind {
    Virtual,
    Super,
    Direct,
    Static,
    Interface,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Ge,
    Gt,
    Le,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Ushr,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum NumericType {
    Int,
    Long,
    Float,
    Double,
}

/// Instruction in a method body
///
/// Register operands are listed destination first, following the smali order. Branch targets are
/// labels, which get placed in the stream with the `Label` pseudo-instruction.
#[derive(Clone, PartialEq, Debug)]
pub enum Instruction {
    /// Pseudo-instruction marking a branch target
    Label(SynLabel),
    Nop,

    Move(ValueKind, Register, Register),
    MoveResult(ValueKind, Register),
    MoveException(Register),

    ReturnVoid,
    Return(ValueKind, Register),

    Const(Register, i32),
    ConstWide(Register, i64),
    ConstString(Register, String),
    ConstClass(Register, RefType<BinaryName>),

    CheckCast(Register, RefType<BinaryName>),
    InstanceOf(Register, Register, RefType<BinaryName>),
    ArrayLength(Register, Register),
    NewInstance(Register, BinaryName),
    /// Destination, size, array type
    NewArray(Register, Register, RefType<BinaryName>),
    Throw(Register),

    Goto(SynLabel),
    If(Comparison, Register, Register, SynLabel),
    IfZero(Comparison, Register, SynLabel),
    /// Jump table starting at the given key (falls through when no case matches)
    PackedSwitch(Register, i32, Vec<SynLabel>),
    /// Keyed jump table (falls through when no case matches)
    SparseSwitch(Register, Vec<(i32, SynLabel)>),

    /// Value, array, index
    ArrayGet(AccessKind, Register, Register, Register),
    ArrayPut(AccessKind, Register, Register, Register),
    /// Value, object
    InstanceGet(AccessKind, Register, Register, FieldRef),
    InstancePut(AccessKind, Register, Register, FieldRef),
    StaticGet(AccessKind, Register, FieldRef),
    StaticPut(AccessKind, Register, FieldRef),

    Invoke {
        kind: InvokeKind,
        range: bool,
        args: RegisterList,
        method: MethodRef,
    },

    Binary(BinaryOp, NumericType, Register, Register, Register),
    /// Integer operation with a literal second operand
    BinaryLit(BinaryOp, Register, Register, i16),
}

impl Instruction {
    /// Fixed-form invoke
    pub fn invoke(kind: InvokeKind, args: impl Into<RegisterList>, method: MethodRef) -> Self {
        Instruction::Invoke {
            kind,
            range: false,
            args: args.into(),
            method,
        }
    }

    /// Range-form invoke
    pub fn invoke_range(kind: InvokeKind, args: impl Into<RegisterList>, method: MethodRef) -> Self {
        Instruction::Invoke {
            kind,
            range: true,
            args: args.into(),
            method,
        }
    }

    /// Register (if any) whose previous value is overwritten
    pub fn written_register(&self) -> Option<Register> {
        match self {
            Instruction::Move(_, dst, _)
            | Instruction::MoveResult(_, dst)
            | Instruction::MoveException(dst)
            | Instruction::Const(dst, _)
            | Instruction::ConstWide(dst, _)
            | Instruction::ConstString(dst, _)
            | Instruction::ConstClass(dst, _)
            | Instruction::InstanceOf(dst, _, _)
            | Instruction::ArrayLength(dst, _)
            | Instruction::NewInstance(dst, _)
            | Instruction::NewArray(dst, _, _)
            | Instruction::ArrayGet(_, dst, _, _)
            | Instruction::InstanceGet(_, dst, _, _)
            | Instruction::StaticGet(_, dst, _)
            | Instruction::Binary(_, _, dst, _, _)
            | Instruction::BinaryLit(_, dst, _, _) => Some(*dst),

            Instruction::Label(_)
            | Instruction::Nop
            | Instruction::ReturnVoid
            | Instruction::Return(_, _)
            | Instruction::CheckCast(_, _)
            | Instruction::Throw(_)
            | Instruction::Goto(_)
            | Instruction::If(_, _, _, _)
            | Instruction::IfZero(_, _, _)
            | Instruction::PackedSwitch(_, _, _)
            | Instruction::SparseSwitch(_, _)
            | Instruction::ArrayPut(_, _, _, _)
            | Instruction::InstancePut(_, _, _, _)
            | Instruction::StaticPut(_, _, _)
            | Instruction::Invoke { .. } => None,
        }
    }

    /// Every register operand, read or written
    pub fn registers(&self) -> Vec<Register> {
        match self {
            Instruction::Label(_)
            | Instruction::Nop
            | Instruction::ReturnVoid
            | Instruction::Goto(_) => vec![],

            Instruction::MoveResult(_, reg)
            | Instruction::MoveException(reg)
            | Instruction::Return(_, reg)
            | Instruction::Const(reg, _)
            | Instruction::ConstWide(reg, _)
            | Instruction::ConstString(reg, _)
            | Instruction::ConstClass(reg, _)
            | Instruction::CheckCast(reg, _)
            | Instruction::NewInstance(reg, _)
            | Instruction::Throw(reg)
            | Instruction::IfZero(_, reg, _)
            | Instruction::PackedSwitch(reg, _, _)
            | Instruction::SparseSwitch(reg, _)
            | Instruction::StaticGet(_, reg, _)
            | Instruction::StaticPut(_, reg, _) => vec![*reg],

            Instruction::Move(_, a, b)
            | Instruction::InstanceOf(a, b, _)
            | Instruction::ArrayLength(a, b)
            | Instruction::NewArray(a, b, _)
            | Instruction::If(_, a, b, _)
            | Instruction::InstanceGet(_, a, b, _)
            | Instruction::InstancePut(_, a, b, _)
            | Instruction::BinaryLit(_, a, b, _) => vec![*a, *b],

            Instruction::ArrayGet(_, a, b, c)
            | Instruction::ArrayPut(_, a, b, c)
            | Instruction::Binary(_, _, a, b, c) => vec![*a, *b, *c],

            Instruction::Invoke { args, .. } => args.0.clone(),
        }
    }

    /// Labels this instruction may jump to
    pub fn branch_targets(&self) -> Vec<SynLabel> {
        match self {
            Instruction::Goto(target)
            | Instruction::If(_, _, _, target)
            | Instruction::IfZero(_, _, target) => vec![*target],
            Instruction::PackedSwitch(_, _, targets) => targets.clone(),
            Instruction::SparseSwitch(_, cases) => cases.iter().map(|(_, label)| *label).collect(),
            _ => vec![],
        }
    }

    /// Can control reach the next instruction in the stream?
    pub fn can_fall_through(&self) -> bool {
        !matches!(
            self,
            Instruction::Goto(_)
                | Instruction::ReturnVoid
                | Instruction::Return(_, _)
                | Instruction::Throw(_)
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn written_register_of_field_get() {
        let field = FieldRef::new(
            BinaryName::INTERCEPT_RESULT,
            UnqualifiedName::OBJVALUE,
            FieldType::OBJECT,
        );
        let insn = Instruction::InstanceGet(
            AccessKind::Object,
            Register::local(1),
            Register::local(0),
            field,
        );
        assert_eq!(insn.written_register(), Some(Register::local(1)));
        assert_eq!(
            insn.registers(),
            vec![Register::local(1), Register::local(0)]
        );
    }

    #[test]
    fn terminators_do_not_fall_through() {
        assert!(!Instruction::ReturnVoid.can_fall_through());
        assert!(!Instruction::Throw(Register::local(0)).can_fall_through());
        let label = SynLabel::START;
        assert!(Instruction::IfZero(Comparison::Eq, Register::local(0), label).can_fall_through());
        assert_eq!(
            Instruction::SparseSwitch(Register::local(0), vec![(7, label)]).branch_targets(),
            vec![label]
        );
    }
}
