use super::code_builder_exts::{parameter_registers, CodeBuilderExts, InterceptLabels};
use super::{runtime, Dispatch, Error};
use crate::dex::class_graph::MethodData;
use crate::dex::code::{
    AccessKind, CodeBuilder, Comparison, Instruction, InvokeKind, Register, ValueKind,
};
use crate::dex::{FieldType, RefType};

/// Scratch locals the interception block needs, on top of whatever the method already uses
///
///   * `v0` interceptor, then the `InterceptResult`
///   * `v1` method id, array index, then the unpacked return value (two slots if wide)
///   * `v2` receiver, boxed argument
///   * `v3` argument array
const MIN_LOCALS: u16 = 4;

/// Rewrite an ordinary method so that an installed interceptor can take it over
///
/// The original body is kept intact behind a check of the class's `$ic` slot. When the slot is
/// set, the arguments go to the interceptor, and if it returns a result the method returns the
/// value unpacked from that result instead of running the original body.
pub fn instrument_method(method: &MethodData<'_>, dispatch: &Dispatch) -> Result<(), Error> {
    let method_id = method
        .method_id()
        .ok_or_else(|| Error::MissingMethodId(format!("{:?}", method)))?;
    let mut code = method.code.borrow_mut();
    let original = match code.as_ref() {
        Some(original) => original,
        None => return Ok(()),
    };

    let mut builder = CodeBuilder::rewriting(original);
    builder.reserve_locals(MIN_LOCALS);

    let interceptor = Register::local(0);
    let slot = runtime::interceptor_field(&method.class.name);
    let labels = builder.branch_on_interceptor(interceptor, slot);
    builder.extend(original.instructions.iter().cloned());
    builder.place_label(labels.intercept);

    match dispatch {
        Dispatch::Special(shape) => invoke_special(&mut builder, method, method_id, shape),
        Dispatch::Common | Dispatch::Init => invoke_common(&mut builder, method, method_id),
    }
    return_intercepted(&mut builder, method, labels);

    let rewritten = builder.result(method.parameter_registers())?;
    log::trace!(
        "Instrumented {:?} ({}), {} locals",
        method,
        dispatch,
        rewritten.local_registers
    );
    *code = Some(rewritten);
    Ok(())
}

/// `$ic.invokeCommon(methodId, this or null, new Object[] { args... })`
fn invoke_common(builder: &mut CodeBuilder, method: &MethodData<'_>, method_id: u32) {
    let interceptor = Register::local(0);
    let index = Register::local(1);
    let scratch = Register::local(2);
    let array = Register::local(3);

    let parameters = parameter_registers(&method.descriptor, !method.is_static());
    builder.push(Instruction::Const(array, parameters.len() as i32));
    builder.push(Instruction::NewArray(array, array, RefType::object_array()));
    for (idx, (register, typ)) in parameters.into_iter().enumerate() {
        builder.store_boxed(array, index, scratch, idx as i32, register, typ);
    }

    let method_id_reg = index;
    let receiver = scratch;
    builder.push(Instruction::Const(method_id_reg, method_id as i32));
    if method.is_static() {
        builder.push(Instruction::Const(receiver, 0));
    } else {
        builder.push(Instruction::Move(ValueKind::Object, receiver, Register::param(0)));
    }
    builder.push(Instruction::invoke(
        InvokeKind::Interface,
        vec![interceptor, method_id_reg, receiver, array],
        runtime::invoke_common(),
    ));
}

/// `$ic.invoke<Shape>(methodId, this or null, args...)`
///
/// Arguments are passed in place, so the call has to use the range form: the interceptor and
/// method id (and the null receiver of static methods) go in the last locals, which sit right
/// below the parameters.
fn invoke_special(builder: &mut CodeBuilder, method: &MethodData<'_>, method_id: u32, shape: &str) {
    let interceptor = Register::local(0);
    let locals = builder.local_registers();
    let first = if method.is_static() { locals - 3 } else { locals - 2 };

    let interceptor_copy = Register::local(first);
    if interceptor_copy != interceptor {
        builder.push(Instruction::Move(ValueKind::Object, interceptor_copy, interceptor));
    }
    let method_id_reg = Register::local(first + 1);
    builder.push(Instruction::Const(method_id_reg, method_id as i32));

    let mut args = vec![interceptor_copy, method_id_reg];
    if method.is_static() {
        let null_receiver = Register::local(first + 2);
        builder.push(Instruction::Const(null_receiver, 0));
        args.push(null_receiver);
    } else {
        args.push(Register::param(0));
    }
    args.extend(
        parameter_registers(&method.descriptor, !method.is_static())
            .into_iter()
            .map(|(register, _)| register),
    );

    builder.push(Instruction::invoke_range(
        InvokeKind::Interface,
        args,
        runtime::invoke_special(shape),
    ));
}

/// Return what the interceptor produced, or run the original body if it produced nothing
fn return_intercepted(builder: &mut CodeBuilder, method: &MethodData<'_>, labels: InterceptLabels) {
    let result = Register::local(0);
    let value = Register::local(1);

    builder.push(Instruction::MoveResult(ValueKind::Object, result));
    builder.push(Instruction::IfZero(Comparison::Eq, result, labels.origin));

    let return_type = method.descriptor.return_type.as_ref();
    if let Some(typ) = return_type {
        let field = runtime::result_value_field(typ);
        builder.push(Instruction::InstanceGet(
            AccessKind::of(&field.descriptor),
            value.with_wide(typ.is_wide()),
            result,
            field,
        ));
        if let FieldType::Ref(ref_type) = typ {
            if !typ.is_object() {
                builder.push(Instruction::CheckCast(value, ref_type.clone()));
            }
        }
    }
    builder.return_value(return_type, value);
}
