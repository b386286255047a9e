use super::runtime;
use crate::dex::code::{
    AccessKind, CodeBuilder, Comparison, FieldRef, Instruction, InvokeKind, LabelGenerator,
    Register, SynLabel, ValueKind,
};
use crate::dex::{BinaryName, FieldType, MethodDescriptor, RefType};
use crate::util::Width;

/// Code snippets shared by the instrumenters
pub trait CodeBuilderExts {
    /// Load an interceptor slot into `interceptor` and jump to a fresh `intercept` label when it
    /// is set
    ///
    /// The returned `origin` label is already placed, right after the branch, so whatever gets
    /// emitted next is the path taken when there is no interceptor.
    fn branch_on_interceptor(&mut self, interceptor: Register, slot: FieldRef) -> InterceptLabels;

    /// Convert a value to a reference, boxing primitives into `scratch`
    ///
    /// Returns the register holding the reference (`value` itself for references).
    fn box_value(
        &mut self,
        scratch: Register,
        value: Register,
        typ: &FieldType<BinaryName>,
    ) -> Register;

    /// Store a parameter into a slot of an `Object[]`, boxing it if needed
    fn store_boxed(
        &mut self,
        array: Register,
        index_reg: Register,
        scratch: Register,
        index: i32,
        value: Register,
        typ: &FieldType<BinaryName>,
    );

    /// Load element `index` of an `Object[]` into `dst` as a value of type `typ`
    ///
    /// Primitives are unboxed, references get cast (unless they are plain `Object`s). Wide values
    /// end up in `dst` and the register after it.
    fn load_unboxed(
        &mut self,
        dst: Register,
        array: Register,
        index_reg: Register,
        index: i32,
        typ: &FieldType<BinaryName>,
    );

    /// Return `value` (or nothing) according to a return type
    fn return_value(&mut self, return_type: Option<&FieldType<BinaryName>>, value: Register);
}

/// Labels of the two paths out of an interceptor check
#[derive(Copy, Clone, Debug)]
pub struct InterceptLabels {
    /// Unmodified original body
    pub origin: SynLabel,

    /// Dispatch to the interceptor
    pub intercept: SynLabel,
}

impl CodeBuilderExts for CodeBuilder {
    fn branch_on_interceptor(&mut self, interceptor: Register, slot: FieldRef) -> InterceptLabels {
        let origin = self.fresh_label();
        let intercept = self.fresh_label();
        self.push(Instruction::StaticGet(AccessKind::Object, interceptor, slot));
        self.push(Instruction::IfZero(Comparison::Ne, interceptor, intercept));
        self.place_label(origin);
        InterceptLabels { origin, intercept }
    }

    fn box_value(
        &mut self,
        scratch: Register,
        value: Register,
        typ: &FieldType<BinaryName>,
    ) -> Register {
        match typ {
            FieldType::Ref(_) => value,
            FieldType::Base(base_type) => {
                self.push(Instruction::invoke(
                    InvokeKind::Static,
                    vec![value.with_wide(typ.is_wide())],
                    runtime::box_method(*base_type),
                ));
                self.push(Instruction::MoveResult(ValueKind::Object, scratch));
                scratch
            }
        }
    }

    fn store_boxed(
        &mut self,
        array: Register,
        index_reg: Register,
        scratch: Register,
        index: i32,
        value: Register,
        typ: &FieldType<BinaryName>,
    ) {
        self.push(Instruction::Const(index_reg, index));
        let boxed = self.box_value(scratch, value, typ);
        self.push(Instruction::ArrayPut(AccessKind::Object, boxed, array, index_reg));
    }

    fn load_unboxed(
        &mut self,
        dst: Register,
        array: Register,
        index_reg: Register,
        index: i32,
        typ: &FieldType<BinaryName>,
    ) {
        let dst = dst.narrow();
        self.push(Instruction::Const(index_reg, index));
        self.push(Instruction::ArrayGet(AccessKind::Object, dst, array, index_reg));
        match typ {
            FieldType::Ref(ref_type) => {
                if !typ.is_object() {
                    self.push(Instruction::CheckCast(dst, ref_type.clone()));
                }
            }
            FieldType::Base(base_type) => {
                self.push(Instruction::CheckCast(
                    dst,
                    RefType::Object(base_type.boxed_class()),
                ));
                self.push(Instruction::invoke(
                    InvokeKind::Virtual,
                    vec![dst],
                    runtime::unbox_method(*base_type),
                ));
                let kind = ValueKind::of(typ);
                self.push(Instruction::MoveResult(kind, dst.with_wide(typ.is_wide())));
            }
        }
    }

    fn return_value(&mut self, return_type: Option<&FieldType<BinaryName>>, value: Register) {
        match return_type {
            None => self.push(Instruction::ReturnVoid),
            Some(typ) => self.push(Instruction::Return(
                ValueKind::of(typ),
                value.with_wide(typ.is_wide()),
            )),
        }
    }
}

/// Registers holding the declared parameters of a method (the receiver is not included)
pub fn parameter_registers(
    descriptor: &MethodDescriptor<BinaryName>,
    has_this: bool,
) -> Vec<(Register, &FieldType<BinaryName>)> {
    let mut next = if has_this { 1 } else { 0 };
    descriptor
        .parameters
        .iter()
        .map(|typ| {
            let register = Register::param(next).with_wide(typ.is_wide());
            next += typ.width() as u16;
            (register, typ)
        })
        .collect()
}
