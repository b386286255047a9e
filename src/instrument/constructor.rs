use super::code_builder_exts::{parameter_registers, CodeBuilderExts};
use super::init_analyzer::find_delegated_init;
use super::{runtime, Error};
use crate::dex::class_graph::MethodData;
use crate::dex::code::{
    AccessKind, BinaryOp, CodeBuilder, Comparison, Instruction, InvokeKind, LabelGenerator,
    MethodRef, Register, ValueKind, MAX_FIXED_INVOKE_SLOTS,
};
use crate::dex::{self, RefType, UnqualifiedName};
use crate::util::Width;

/// Scratch locals of the init protocol
///
///   * `v0` interceptor
///   * `v1` `InitContext`
///   * `v2` argument array, then method id
///   * `v3` array index, flags, then the delegated call arguments
///   * `v4` boxed argument, masked flags, then array index
///
/// Unpacked arguments of the delegated call start at `v5`.
const MIN_LOCALS: u16 = 5;

/// Which flavour of the two-phase protocol a constructor gets
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum InitForm {
    /// Constructor of an ordinary application class
    Normal,

    /// No-argument constructor of a manifest component, which the platform calls itself
    ///
    /// The superclass is always expected to have a `<init>(BuddyInitContext)` constructor, since
    /// the genesis builder has placed one on every class between the component and the platform.
    DirectComponent,
}

/// Rewrite a constructor for the two-phase init protocol
///
/// When an interceptor is installed, the arguments are handed to `invokeUnInit`, which decides
/// whether the patch takes over. If it does, the delegated `this(...)`/`super(...)` call is made
/// with the arguments the patch left in `InitContext.callArgs` (or the superclass's buddy
/// constructor is called instead), and `invokeInitBody` then runs on the initialized object.
/// Otherwise the original body runs untouched.
pub fn instrument_constructor(method: &MethodData<'_>, form: InitForm) -> Result<(), Error> {
    let method_id = method
        .method_id()
        .ok_or_else(|| Error::MissingMethodId(format!("{:?}", method)))?;
    let mut code = method.code.borrow_mut();
    let original = match code.as_ref() {
        Some(original) => original,
        None => return Ok(()),
    };
    let delegated = find_delegated_init(method, original)?;

    let class = method.class;
    let buddy_init = match form {
        InitForm::DirectComponent => {
            let superclass = class
                .superclass()
                .ok_or_else(|| dex::Error::MissingClass(class.name.clone()))?;
            Some(runtime::buddy_constructor(&superclass.name))
        }
        InitForm::Normal => class.superclass().and_then(|superclass| {
            superclass
                .find_method(&UnqualifiedName::INIT, &runtime::buddy_constructor_descriptor())
                .map(MethodData::to_ref)
        }),
    };

    let interceptor = Register::local(0);
    let context = Register::local(1);
    let method_id_reg = Register::local(2);
    let flags = Register::local(3);
    let masked = Register::local(4);

    let mut builder = CodeBuilder::rewriting(original);
    builder.reserve_locals(MIN_LOCALS);
    let slot = runtime::interceptor_field(&class.name);
    let labels = builder.branch_on_interceptor(interceptor, slot);
    builder.extend(original.instructions.iter().cloned());
    builder.place_label(labels.intercept);

    // context = TitanRuntime.newInitContext(); context.initArgs = new Object[] { args... }
    builder.push(Instruction::invoke(
        InvokeKind::Static,
        vec![],
        runtime::new_init_context(),
    ));
    builder.push(Instruction::MoveResult(ValueKind::Object, context));
    let parameters = parameter_registers(&method.descriptor, true);
    if !parameters.is_empty() {
        let array = Register::local(2);
        builder.push(Instruction::Const(array, parameters.len() as i32));
        builder.push(Instruction::NewArray(array, array, RefType::object_array()));
        builder.push(Instruction::InstancePut(
            AccessKind::Object,
            array,
            context,
            runtime::init_args(),
        ));
        for (idx, (register, typ)) in parameters.into_iter().enumerate() {
            builder.store_boxed(array, Register::local(3), Register::local(4), idx as i32, register, typ);
        }
    }

    builder.push(Instruction::Const(method_id_reg, method_id as i32));
    builder.push(Instruction::invoke(
        InvokeKind::Interface,
        vec![interceptor, method_id_reg, context],
        runtime::invoke_un_init(),
    ));

    // Not taken over by the patch: run the original body
    builder.push(Instruction::InstanceGet(
        AccessKind::Plain,
        flags,
        context,
        runtime::init_flag(),
    ));
    builder.push(Instruction::BinaryLit(
        BinaryOp::And,
        masked,
        flags,
        runtime::INIT_CONTEXT_FLAG_INTERCEPTED,
    ));
    builder.push(Instruction::IfZero(Comparison::Eq, masked, labels.origin));

    match buddy_init {
        Some(buddy_init) => {
            let call_buddy = builder.fresh_label();
            let init_body = builder.fresh_label();
            builder.push(Instruction::BinaryLit(
                BinaryOp::And,
                masked,
                flags,
                runtime::INIT_CONTEXT_FLAG_BUDDY,
            ));
            builder.push(Instruction::IfZero(Comparison::Ne, masked, call_buddy));
            call_init(&mut builder, &delegated.method);
            builder.push(Instruction::Goto(init_body));
            builder.place_label(call_buddy);
            call_init(&mut builder, &buddy_init);
            builder.place_label(init_body);
        }
        None => call_init(&mut builder, &delegated.method),
    }

    // context.thisArg = this; $ic.invokeInitBody(methodId, context)
    builder.push(Instruction::InstancePut(
        AccessKind::Object,
        Register::param(0),
        context,
        runtime::this_arg(),
    ));
    builder.push(Instruction::invoke(
        InvokeKind::Interface,
        vec![interceptor, method_id_reg, context],
        runtime::invoke_init_body(),
    ));
    builder.push(Instruction::ReturnVoid);

    let rewritten = builder.result(method.parameter_registers())?;
    log::trace!(
        "Instrumented {:?} ({:?} init, delegating to {:?})",
        method,
        form,
        delegated.method
    );
    *code = Some(rewritten);
    Ok(())
}

/// Call a constructor on `p0`, with arguments unpacked from `InitContext.callArgs`
fn call_init(builder: &mut CodeBuilder, target: &MethodRef) {
    let context = Register::local(1);
    let call_args = Register::local(3);
    let index = Register::local(4);

    let range = target.descriptor.parameter_length(true) > MAX_FIXED_INVOKE_SLOTS;
    let mut next = 5;
    let mut args = vec![];
    if range {
        let receiver = Register::local(next);
        builder.push(Instruction::Move(ValueKind::Object, receiver, Register::param(0)));
        args.push(receiver);
        next += 1;
    } else {
        args.push(Register::param(0));
    }

    if !target.descriptor.parameters.is_empty() {
        builder.push(Instruction::InstanceGet(
            AccessKind::Object,
            call_args,
            context,
            runtime::call_args(),
        ));
        for (idx, typ) in target.descriptor.parameters.iter().enumerate() {
            let arg = Register::local(next).with_wide(typ.is_wide());
            builder.load_unboxed(arg, call_args, index, idx as i32, typ);
            args.push(arg);
            next += typ.width() as u16;
        }
    }

    let call = if range {
        Instruction::invoke_range(InvokeKind::Direct, args, target.clone())
    } else {
        Instruction::invoke(InvokeKind::Direct, args, target.clone())
    };
    builder.push(call);
}
