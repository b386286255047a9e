use super::code_builder_exts::CodeBuilderExts;
use super::{runtime, Error};
use crate::dex::class_graph::MethodData;
use crate::dex::code::{
    AccessKind, BinaryOp, CodeBuilder, Comparison, Instruction, InvokeKind, LabelGenerator,
    Register, ValueKind,
};
use crate::dex::RenderDescriptor;

/// `v0` interceptor, `v1` type hash, `v2` type descriptor, `v3` class interceptor, `v4` result,
/// `v5` flags
const MIN_LOCALS: u16 = 6;

/// Rewrite a static initializer so a patch can replace it
///
/// When the process-wide static initializer interceptor is installed, it is asked about this
/// class first. Its answer may carry an interceptor for the class, which gets stored in `$ic`
/// right away, and may say that the static initializer itself changed, in which case
/// `invokePostClinit` runs instead of the original body.
pub fn instrument_static_initializer(method: &MethodData<'_>) -> Result<(), Error> {
    let mut code = method.code.borrow_mut();
    let original = match code.as_ref() {
        Some(original) => original,
        None => return Ok(()),
    };
    let class = method.class;
    let descriptor = class.name.render();

    let interceptor = Register::local(0);
    let type_hash = Register::local(1);
    let type_descriptor = Register::local(2);
    let class_interceptor = Register::local(3);
    let result = Register::local(4);
    let flags = Register::local(5);

    let mut builder = CodeBuilder::rewriting(original);
    builder.reserve_locals(MIN_LOCALS);
    let labels = builder.branch_on_interceptor(interceptor, runtime::clinit_interceptor_field());
    builder.extend(original.instructions.iter().cloned());
    builder.place_label(labels.intercept);

    builder.push(Instruction::Const(type_hash, runtime::type_hash(&descriptor)));
    builder.push(Instruction::ConstString(type_descriptor, descriptor));
    builder.push(Instruction::invoke(
        InvokeKind::Interface,
        vec![interceptor, type_hash, type_descriptor],
        runtime::invoke_clinit(),
    ));
    builder.push(Instruction::MoveResult(ValueKind::Object, result));
    builder.push(Instruction::IfZero(Comparison::Eq, result, labels.origin));

    // Install the class interceptor handed back, if any
    let check_flags = builder.fresh_label();
    builder.push(Instruction::InstanceGet(
        AccessKind::Object,
        class_interceptor,
        result,
        runtime::result_interceptor(),
    ));
    builder.push(Instruction::IfZero(Comparison::Eq, class_interceptor, check_flags));
    builder.push(Instruction::StaticPut(
        AccessKind::Object,
        class_interceptor,
        runtime::interceptor_field(&class.name),
    ));
    builder.place_label(check_flags);

    // Only the method bodies changed: run the original static initializer
    builder.push(Instruction::InstanceGet(
        AccessKind::Plain,
        flags,
        result,
        runtime::result_flags(),
    ));
    builder.push(Instruction::BinaryLit(
        BinaryOp::And,
        flags,
        flags,
        runtime::INTERCEPT_RESULT_FLAG_INTERCEPTED,
    ));
    builder.push(Instruction::IfZero(Comparison::Eq, flags, labels.origin));

    builder.push(Instruction::invoke(
        InvokeKind::Interface,
        vec![interceptor, type_hash, type_descriptor],
        runtime::invoke_post_clinit(),
    ));
    builder.push(Instruction::ReturnVoid);

    *code = Some(builder.result(0)?);
    log::trace!("Instrumented static initializer of {:?}", class);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dex::class_graph::{ClassData, ClassGraph, ClassGraphArenas, ClassKind};
    use crate::dex::{
        BinaryName, ClassAccessFlags, MethodAccessFlags, MethodDescriptor, Name, UnqualifiedName,
    };

    #[test]
    fn hash_and_descriptor_are_passed() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        let class = graph
            .add_class(ClassData::new(
                BinaryName::from_string(String::from("com/example/Config")).unwrap(),
                ClassKind::Program,
                None,
                ClassAccessFlags::PUBLIC,
            ))
            .unwrap();
        let mut code = CodeBuilder::new();
        code.push(Instruction::Const(Register::local(0), 42));
        code.push(Instruction::ReturnVoid);
        let method = graph
            .add_method(
                MethodData::new(
                    class,
                    UnqualifiedName::CLINIT,
                    MethodDescriptor::void(vec![]),
                    MethodAccessFlags::STATIC | MethodAccessFlags::CONSTRUCTOR,
                )
                .with_code(code.result(0).unwrap()),
            )
            .unwrap();

        instrument_static_initializer(method).unwrap();
        let code = method.code.borrow();
        let code = code.as_ref().unwrap();
        assert_eq!(code.local_registers, MIN_LOCALS);
        assert_eq!(code.parameter_registers, 0);
        assert!(code.instructions.contains(&Instruction::Const(
            Register::local(1),
            -1_536_786_150
        )));
        assert!(code.instructions.contains(&Instruction::ConstString(
            Register::local(2),
            String::from("Lcom/example/Config;")
        )));
        // original body is kept right after the check
        assert_eq!(
            &code.instructions[3..5],
            &[
                Instruction::Const(Register::local(0), 42),
                Instruction::ReturnVoid
            ]
        );
    }
}
