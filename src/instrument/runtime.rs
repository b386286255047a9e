//! Names and signatures of the Titan runtime
//!
//! Instrumented code calls into a small runtime library that ships with the application. None of
//! these classes are part of the class graph: they are only ever referenced symbolically.

use crate::dex::code::{FieldRef, MethodRef};
use crate::dex::{BaseType, BinaryName, FieldType, MethodDescriptor, UnqualifiedName};

/// Package prefix of the runtime itself, which is never instrumented
pub const TITAN_SDK_PACKAGE: &str = "com/baidu/titan/sdk/";

/// `InitContext.flag`: the constructor is taken over by the patch
pub const INIT_CONTEXT_FLAG_INTERCEPTED: i16 = 1;

/// `InitContext.flag`: delegate to the `<init>(BuddyInitContext)` superclass constructor
pub const INIT_CONTEXT_FLAG_BUDDY: i16 = 2;

/// `InterceptResult.flags`: the static initializer itself changed
pub const INTERCEPT_RESULT_FLAG_INTERCEPTED: i16 = 1;

fn object(class: BinaryName) -> FieldType<BinaryName> {
    FieldType::object(class)
}

/// `$ic` slot through which a patch installs the interceptor of `class`
pub fn interceptor_field(class: &BinaryName) -> FieldRef {
    FieldRef::new(
        class.clone(),
        UnqualifiedName::INTERCEPTOR_FIELD,
        object(BinaryName::INTERCEPTABLE),
    )
}

/// `$fh` slot holding fields added by a full patch
pub fn field_holder_field(class: &BinaryName) -> FieldRef {
    FieldRef::new(
        class.clone(),
        UnqualifiedName::FIELD_HOLDER_FIELD,
        object(BinaryName::FIELD_HOLDER),
    )
}

/// `InterceptResult invokeCommon(int methodId, Object receiver, Object[] args)`
pub fn invoke_common() -> MethodRef {
    MethodRef::new(
        BinaryName::INTERCEPTABLE,
        UnqualifiedName::INVOKECOMMON,
        MethodDescriptor {
            parameters: vec![
                FieldType::int(),
                FieldType::OBJECT,
                FieldType::array(FieldType::OBJECT),
            ],
            return_type: Some(object(BinaryName::INTERCEPT_RESULT)),
        },
    )
}

/// Shape-specific overload, like `InterceptResult invokeLI(int, Object, Object, int)`
///
/// References are erased to `Object`, and the `V` shape takes no extra arguments.
pub fn invoke_special(shape: &str) -> MethodRef {
    let mut parameters = vec![FieldType::int(), FieldType::OBJECT];
    for code in shape.chars() {
        let parameter = match code {
            'Z' => FieldType::Base(BaseType::Boolean),
            'B' => FieldType::Base(BaseType::Byte),
            'S' => FieldType::Base(BaseType::Short),
            'C' => FieldType::Base(BaseType::Char),
            'I' => FieldType::Base(BaseType::Int),
            'J' => FieldType::Base(BaseType::Long),
            'F' => FieldType::Base(BaseType::Float),
            'D' => FieldType::Base(BaseType::Double),
            'V' => continue,
            _ => FieldType::OBJECT,
        };
        parameters.push(parameter);
    }
    MethodRef::new(
        BinaryName::INTERCEPTABLE,
        UnqualifiedName::INVOKE.concat(shape),
        MethodDescriptor {
            parameters,
            return_type: Some(object(BinaryName::INTERCEPT_RESULT)),
        },
    )
}

fn init_protocol_method(name: UnqualifiedName) -> MethodRef {
    MethodRef::new(
        BinaryName::INTERCEPTABLE,
        name,
        MethodDescriptor::void(vec![FieldType::int(), object(BinaryName::INIT_CONTEXT)]),
    )
}

/// `void invokeUnInit(int methodId, InitContext context)`
pub fn invoke_un_init() -> MethodRef {
    init_protocol_method(UnqualifiedName::INVOKEUNINIT)
}

/// `void invokeInitBody(int methodId, InitContext context)`
pub fn invoke_init_body() -> MethodRef {
    init_protocol_method(UnqualifiedName::INVOKEINITBODY)
}

/// `static InitContext TitanRuntime.newInitContext()`
pub fn new_init_context() -> MethodRef {
    MethodRef::new(
        BinaryName::TITAN_RUNTIME,
        UnqualifiedName::NEWINITCONTEXT,
        MethodDescriptor {
            parameters: vec![],
            return_type: Some(object(BinaryName::INIT_CONTEXT)),
        },
    )
}

/// `Object[] InitContext.initArgs`: arguments the constructor was called with
pub fn init_args() -> FieldRef {
    FieldRef::new(
        BinaryName::INIT_CONTEXT,
        UnqualifiedName::INITARGS,
        FieldType::array(FieldType::OBJECT),
    )
}

/// `Object[] InitContext.callArgs`: arguments for the delegated `this(...)`/`super(...)` call
pub fn call_args() -> FieldRef {
    FieldRef::new(
        BinaryName::INIT_CONTEXT,
        UnqualifiedName::CALLARGS,
        FieldType::array(FieldType::OBJECT),
    )
}

/// `Object InitContext.thisArg`
pub fn this_arg() -> FieldRef {
    FieldRef::new(
        BinaryName::INIT_CONTEXT,
        UnqualifiedName::THISARG,
        FieldType::OBJECT,
    )
}

/// `int InitContext.flag`
pub fn init_flag() -> FieldRef {
    FieldRef::new(BinaryName::INIT_CONTEXT, UnqualifiedName::FLAG, FieldType::int())
}

/// Field of `InterceptResult` carrying a return value of the given type
pub fn result_value_field(return_type: &FieldType<BinaryName>) -> FieldRef {
    let (name, descriptor) = match return_type {
        FieldType::Ref(_) => (UnqualifiedName::OBJVALUE, FieldType::OBJECT),
        FieldType::Base(base_type) => {
            let name = match base_type {
                BaseType::Boolean => UnqualifiedName::BOOLEANVALUE,
                BaseType::Byte => UnqualifiedName::BYTEVALUE,
                BaseType::Char => UnqualifiedName::CHARVALUE,
                BaseType::Short => UnqualifiedName::SHORTVALUE,
                BaseType::Int => UnqualifiedName::INTVALUE,
                BaseType::Long => UnqualifiedName::LONGVALUE,
                BaseType::Float => UnqualifiedName::FLOATVALUE,
                BaseType::Double => UnqualifiedName::DOUBLEVALUE,
            };
            (name, FieldType::Base(*base_type))
        }
    };
    FieldRef::new(BinaryName::INTERCEPT_RESULT, name, descriptor)
}

/// `Interceptable InterceptResult.interceptor`
pub fn result_interceptor() -> FieldRef {
    FieldRef::new(
        BinaryName::INTERCEPT_RESULT,
        UnqualifiedName::INTERCEPTOR,
        object(BinaryName::INTERCEPTABLE),
    )
}

/// `int InterceptResult.flags`
pub fn result_flags() -> FieldRef {
    FieldRef::new(
        BinaryName::INTERCEPT_RESULT,
        UnqualifiedName::FLAGS,
        FieldType::int(),
    )
}

/// Process-wide static initializer interceptor slot
pub fn clinit_interceptor_field() -> FieldRef {
    FieldRef::new(
        BinaryName::CLINIT_INTERCEPTOR_STORAGE,
        UnqualifiedName::INTERCEPTOR_FIELD,
        object(BinaryName::CLINIT_INTERCEPTABLE),
    )
}

fn clinit_protocol_method(name: UnqualifiedName) -> MethodRef {
    MethodRef::new(
        BinaryName::CLINIT_INTERCEPTABLE,
        name,
        MethodDescriptor {
            parameters: vec![FieldType::int(), FieldType::STRING],
            return_type: Some(object(BinaryName::INTERCEPT_RESULT)),
        },
    )
}

/// `InterceptResult invokeClinit(int typeHash, String typeDescriptor)`
pub fn invoke_clinit() -> MethodRef {
    clinit_protocol_method(UnqualifiedName::INVOKECLINIT)
}

/// `InterceptResult invokePostClinit(int typeHash, String typeDescriptor)`
pub fn invoke_post_clinit() -> MethodRef {
    clinit_protocol_method(UnqualifiedName::INVOKEPOSTCLINIT)
}

/// `int BuddyInitContext.initMethodId`
pub fn buddy_init_method_id() -> FieldRef {
    FieldRef::new(
        BinaryName::BUDDY_INIT_CONTEXT,
        UnqualifiedName::INITMETHODID,
        FieldType::int(),
    )
}

/// `BuddyInitHolder BuddyInitContext.current()`
pub fn buddy_current() -> MethodRef {
    MethodRef::new(
        BinaryName::BUDDY_INIT_CONTEXT,
        UnqualifiedName::CURRENT,
        MethodDescriptor {
            parameters: vec![],
            return_type: Some(object(BinaryName::BUDDY_INIT_HOLDER)),
        },
    )
}

/// `Object[] BuddyInitHolder.paras`
pub fn buddy_holder_paras() -> FieldRef {
    FieldRef::new(
        BinaryName::BUDDY_INIT_HOLDER,
        UnqualifiedName::PARAS,
        FieldType::array(FieldType::OBJECT),
    )
}

/// Descriptor `(Lcom/baidu/titan/sdk/runtime/BuddyInitContext;)V`
pub fn buddy_constructor_descriptor() -> MethodDescriptor<BinaryName> {
    MethodDescriptor::void(vec![object(BinaryName::BUDDY_INIT_CONTEXT)])
}

/// `<init>(BuddyInitContext)` declared on `class`
pub fn buddy_constructor(class: &BinaryName) -> MethodRef {
    MethodRef::new(
        class.clone(),
        UnqualifiedName::INIT,
        buddy_constructor_descriptor(),
    )
}

/// `static Integer Integer.valueOf(int)` and friends
pub fn box_method(base_type: BaseType) -> MethodRef {
    let boxed = base_type.boxed_class();
    MethodRef::new(
        boxed.clone(),
        UnqualifiedName::VALUEOF,
        MethodDescriptor {
            parameters: vec![FieldType::Base(base_type)],
            return_type: Some(object(boxed)),
        },
    )
}

/// `int Integer.intValue()` and friends
pub fn unbox_method(base_type: BaseType) -> MethodRef {
    let value_field = result_value_field(&FieldType::Base(base_type));
    MethodRef::new(
        base_type.boxed_class(),
        value_field.name,
        MethodDescriptor {
            parameters: vec![],
            return_type: Some(FieldType::Base(base_type)),
        },
    )
}

/// Hash identifying a class to the static initializer interceptor
///
/// This is `String.hashCode` spelled out (`h = 31 * h + c` over UTF-16 code units), so that the
/// instrumented application and patches generated later agree on it.
pub fn type_hash(descriptor: &str) -> i32 {
    descriptor
        .encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32))
}
