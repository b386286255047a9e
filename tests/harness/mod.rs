//! Interpreter for the instruction model, with just enough of the runtime library mocked out to
//! run instrumented code

#![allow(dead_code)]

use std::collections::HashMap;
use titan_instrument::dex::class_graph::{
    ClassData, ClassGraph, ClassKind, MethodData,
};
use titan_instrument::dex::code::{
    BinaryOp, CodeBuilder, Comparison, Instruction, InvokeKind, MethodRef, NumericType, Register,
};
use titan_instrument::dex::{
    BaseType, BinaryName, ClassAccessFlags, FieldType, MethodAccessFlags, MethodDescriptor, Name,
    ParseDescriptor, UnqualifiedName,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn name(name: &str) -> BinaryName {
    BinaryName::from_string(name.to_owned()).unwrap()
}

pub fn unqualified(name: &str) -> UnqualifiedName {
    UnqualifiedName::from_string(name.to_owned()).unwrap()
}

pub fn descriptor(descriptor: &str) -> MethodDescriptor<BinaryName> {
    MethodDescriptor::parse(descriptor).unwrap()
}

/// Add a class to the graph
pub fn class<'g>(
    graph: &ClassGraph<'g>,
    class_name: &str,
    kind: ClassKind,
    superclass: Option<&'g ClassData<'g>>,
) -> &'g ClassData<'g> {
    graph
        .add_class(ClassData::new(
            name(class_name),
            kind,
            superclass,
            ClassAccessFlags::PUBLIC,
        ))
        .unwrap()
}

/// Add a method to the graph, with a body unless `body` is `None`
pub fn method<'g>(
    graph: &ClassGraph<'g>,
    class: &'g ClassData<'g>,
    method_name: &str,
    method_descriptor: &str,
    access_flags: MethodAccessFlags,
    body: Option<Vec<Instruction>>,
) -> &'g MethodData<'g> {
    let mut method = MethodData::new(
        class,
        unqualified(method_name),
        descriptor(method_descriptor),
        access_flags,
    );
    if let Some(body) = body {
        let mut code = CodeBuilder::new();
        code.extend(body);
        let parameter_registers = method.parameter_registers();
        method = method.with_code(code.result(parameter_registers).unwrap());
    }
    graph.add_method(method).unwrap()
}

/// `invoke-direct {p0} <class>.<init>()V`
pub fn super_init(class: &BinaryName) -> Instruction {
    Instruction::invoke(
        InvokeKind::Direct,
        vec![Register::param(0)],
        MethodRef::new(class.clone(), UnqualifiedName::INIT, MethodDescriptor::void(vec![])),
    )
}

/// Value in a register, array slot or field
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Value {
    Int(i32),
    Long(i64),
    Ref(Option<usize>),

    /// Second half of a wide value, or a register never written
    Top,
}

impl Value {
    pub const NULL: Value = Value::Ref(None);

    fn default_for(typ: &FieldType<BinaryName>) -> Value {
        match typ {
            FieldType::Ref(_) => Value::NULL,
            FieldType::Base(BaseType::Long | BaseType::Double) => Value::Long(0),
            FieldType::Base(_) => Value::Int(0),
        }
    }

    /// `const 0` doubles as `null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Ref(None) | Value::Int(0))
    }

    pub fn object(&self) -> Option<usize> {
        match self {
            Value::Ref(obj) => *obj,
            Value::Int(0) => None,
            other => panic!("expected a reference, found {:?}", other),
        }
    }

    pub fn int(&self) -> i32 {
        match self {
            Value::Int(value) => *value,
            other => panic!("expected an int, found {:?}", other),
        }
    }

    pub fn long(&self) -> i64 {
        match self {
            Value::Long(value) => *value,
            other => panic!("expected a long, found {:?}", other),
        }
    }
}

pub enum ObjectKind {
    Plain,
    Array(Vec<Value>),
    String(String),
    Boxed(Value),

    /// Mock interceptor, indexing into [`Vm::interceptors`]
    Interceptor(usize),
}

pub struct Object {
    pub class: BinaryName,
    pub kind: ObjectKind,
    pub fields: HashMap<UnqualifiedName, Value>,
}

#[derive(Default)]
pub struct Heap {
    pub objects: Vec<Object>,
}

impl Heap {
    pub fn alloc(&mut self, class: BinaryName, kind: ObjectKind) -> Value {
        self.objects.push(Object {
            class,
            kind,
            fields: HashMap::new(),
        });
        Value::Ref(Some(self.objects.len() - 1))
    }

    pub fn new_object(&mut self, class: BinaryName) -> Value {
        self.alloc(class, ObjectKind::Plain)
    }

    pub fn new_array(&mut self, elements: Vec<Value>) -> Value {
        self.alloc(BinaryName::OBJECT, ObjectKind::Array(elements))
    }

    pub fn new_string(&mut self, value: &str) -> Value {
        self.alloc(BinaryName::STRING, ObjectKind::String(value.to_owned()))
    }

    pub fn boxed(&mut self, class: BinaryName, value: Value) -> Value {
        self.alloc(class, ObjectKind::Boxed(value))
    }

    pub fn object(&self, value: Value) -> &Object {
        let idx = value.object().expect("null dereference");
        &self.objects[idx]
    }

    fn object_mut(&mut self, value: Value) -> &mut Object {
        let idx = value.object().expect("null dereference");
        &mut self.objects[idx]
    }

    pub fn class_of(&self, value: Value) -> &BinaryName {
        &self.object(value).class
    }

    pub fn field(&self, value: Value, field: &UnqualifiedName) -> Option<Value> {
        self.object(value).fields.get(field).copied()
    }

    pub fn set_field(&mut self, value: Value, field: &UnqualifiedName, to: Value) {
        self.object_mut(value).fields.insert(field.clone(), to);
    }

    pub fn array(&self, value: Value) -> &Vec<Value> {
        match &self.object(value).kind {
            ObjectKind::Array(elements) => elements,
            _ => panic!("not an array"),
        }
    }

    fn array_mut(&mut self, value: Value) -> &mut Vec<Value> {
        match &mut self.object_mut(value).kind {
            ObjectKind::Array(elements) => elements,
            _ => panic!("not an array"),
        }
    }

    pub fn unbox(&self, value: Value) -> Value {
        match &self.object(value).kind {
            ObjectKind::Boxed(inner) => *inner,
            _ => panic!("not a boxed value"),
        }
    }

    pub fn string(&self, value: Value) -> &str {
        match &self.object(value).kind {
            ObjectKind::String(string) => string,
            _ => panic!("not a string"),
        }
    }

    /// `InterceptResult` carrying a value in the given field
    pub fn intercept_result(&mut self, field: &UnqualifiedName, value: Value) -> Value {
        let result = self.new_object(BinaryName::INTERCEPT_RESULT);
        self.set_field(result, field, value);
        result
    }
}

/// A Java exception escaping the interpreted code
#[derive(Clone, PartialEq, Debug)]
pub struct Thrown {
    pub class: BinaryName,
    pub message: Option<String>,
}

pub type Interceptor<'a> = Box<dyn FnMut(&mut Heap, &MethodRef, &[Value]) -> Option<Value> + 'a>;

/// Interpreter state
pub struct Vm<'a, 'g> {
    class_graph: &'a ClassGraph<'g>,
    pub heap: Heap,
    pub statics: HashMap<(BinaryName, UnqualifiedName), Value>,
    interceptors: Vec<Interceptor<'a>>,

    /// Calls that reached methods without a body (platform code)
    pub trace: Vec<String>,
}

impl<'a, 'g> Vm<'a, 'g> {
    pub fn new(class_graph: &'a ClassGraph<'g>) -> Vm<'a, 'g> {
        Vm {
            class_graph,
            heap: Heap::default(),
            statics: HashMap::new(),
            interceptors: vec![],
            trace: vec![],
        }
    }

    fn add_interceptor(&mut self, class: BinaryName, interceptor: Interceptor<'a>) -> Value {
        self.interceptors.push(interceptor);
        self.heap
            .alloc(class, ObjectKind::Interceptor(self.interceptors.len() - 1))
    }

    /// Fill the `$ic` slot of a class
    pub fn install_interceptor(
        &mut self,
        class: &str,
        interceptor: impl FnMut(&mut Heap, &MethodRef, &[Value]) -> Option<Value> + 'a,
    ) -> Value {
        let object = self.add_interceptor(BinaryName::INTERCEPTABLE, Box::new(interceptor));
        self.statics
            .insert((name(class), UnqualifiedName::INTERCEPTOR_FIELD), object);
        object
    }

    /// Create an interceptor object without installing it anywhere
    pub fn interceptor_object(
        &mut self,
        interceptor: impl FnMut(&mut Heap, &MethodRef, &[Value]) -> Option<Value> + 'a,
    ) -> Value {
        self.add_interceptor(BinaryName::INTERCEPTABLE, Box::new(interceptor))
    }

    /// Fill the process-wide static initializer interceptor slot
    pub fn install_clinit_interceptor(
        &mut self,
        interceptor: impl FnMut(&mut Heap, &MethodRef, &[Value]) -> Option<Value> + 'a,
    ) {
        let object = self.add_interceptor(BinaryName::CLINIT_INTERCEPTABLE, Box::new(interceptor));
        self.statics.insert(
            (
                BinaryName::CLINIT_INTERCEPTOR_STORAGE,
                UnqualifiedName::INTERCEPTOR_FIELD,
            ),
            object,
        );
    }

    pub fn static_field(&self, class: &str, field: &str) -> Option<Value> {
        self.statics.get(&(name(class), unqualified(field))).copied()
    }

    pub fn call_static(
        &mut self,
        class: &str,
        method_name: &str,
        method_descriptor: &str,
        args: &[Value],
    ) -> Result<Option<Value>, Thrown> {
        let method = MethodRef::new(name(class), unqualified(method_name), descriptor(method_descriptor));
        self.invoke(InvokeKind::Static, &method, args.to_vec())
    }

    pub fn call_virtual(
        &mut self,
        receiver: Value,
        method_name: &str,
        method_descriptor: &str,
        args: &[Value],
    ) -> Result<Option<Value>, Thrown> {
        let class = self.heap.class_of(receiver).clone();
        let method = MethodRef::new(class, unqualified(method_name), descriptor(method_descriptor));
        let mut all_args = vec![receiver];
        all_args.extend_from_slice(args);
        self.invoke(InvokeKind::Virtual, &method, all_args)
    }

    /// `new <class>(args...)`
    pub fn construct(
        &mut self,
        class: &str,
        method_descriptor: &str,
        args: &[Value],
    ) -> Result<Value, Thrown> {
        let object = self.heap.new_object(name(class));
        let method = MethodRef::new(name(class), UnqualifiedName::INIT, descriptor(method_descriptor));
        let mut all_args = vec![object];
        all_args.extend_from_slice(args);
        self.invoke(InvokeKind::Direct, &method, all_args)?;
        Ok(object)
    }

    pub fn run_static_initializer(&mut self, class: &str) -> Result<(), Thrown> {
        self.call_static(class, "<clinit>", "()V", &[])?;
        Ok(())
    }

    /// Find the method with a body that a call resolves to
    fn resolve(&self, kind: InvokeKind, method: &MethodRef, args: &[Value]) -> Option<&'g MethodData<'g>> {
        let start = match kind {
            InvokeKind::Virtual | InvokeKind::Interface => self.heap.class_of(args[0]).clone(),
            _ => method.class.clone(),
        };
        let class = self.class_graph.lookup_class(&start)?;
        let chain: Vec<&'g ClassData<'g>> = match kind {
            InvokeKind::Direct | InvokeKind::Static => vec![class],
            _ => std::iter::once(class).chain(class.superclasses()).collect(),
        };
        chain
            .into_iter()
            .find_map(|class| class.find_method(&method.name, &method.descriptor))
            .filter(|method| method.has_code())
    }

    /// Perform a call, with one argument per register (wide values are not split)
    pub fn invoke(
        &mut self,
        kind: InvokeKind,
        method: &MethodRef,
        args: Vec<Value>,
    ) -> Result<Option<Value>, Thrown> {
        if kind == InvokeKind::Interface {
            let interceptor = match self.heap.object(args[0]).kind {
                ObjectKind::Interceptor(idx) => Some(idx),
                _ => None,
            };
            if let Some(idx) = interceptor {
                let interceptor = &mut self.interceptors[idx];
                return Ok(interceptor(&mut self.heap, method, &args[1..]));
            }
        }

        match self.resolve(kind, method, &args) {
            Some(target) => self.execute(target, args),
            None => self.builtin(method, args),
        }
    }

    /// Methods of the platform and of the runtime library
    fn builtin(&mut self, method: &MethodRef, args: Vec<Value>) -> Result<Option<Value>, Thrown> {
        let is_box = |class: &BinaryName| {
            [
                BinaryName::BOOLEAN,
                BinaryName::BYTE,
                BinaryName::CHARACTER,
                BinaryName::SHORT,
                BinaryName::INTEGER,
                BinaryName::LONG,
                BinaryName::FLOAT,
                BinaryName::DOUBLE,
            ]
            .contains(class)
        };

        if is_box(&method.class) && method.name == UnqualifiedName::VALUEOF {
            return Ok(Some(self.heap.boxed(method.class.clone(), args[0])));
        }
        if is_box(&method.class) && method.descriptor.parameters.is_empty() {
            return Ok(Some(self.heap.unbox(args[0])));
        }
        if method.class == BinaryName::TITAN_RUNTIME && method.name == UnqualifiedName::NEWINITCONTEXT {
            return Ok(Some(self.heap.new_object(BinaryName::INIT_CONTEXT)));
        }
        if method.class == BinaryName::BUDDY_INIT_CONTEXT && method.name == UnqualifiedName::CURRENT {
            return Ok(self.heap.field(args[0], &unqualified("holder")));
        }
        if method.class == BinaryName::ILLEGALSTATEEXCEPTION && method.name.is_init() {
            let message = self.heap.string(args[1]).to_owned();
            let message_value = self.heap.new_string(&message);
            self.heap.set_field(args[0], &unqualified("message"), message_value);
            return Ok(None);
        }

        self.trace.push(format!("{}.{}", method.class, method.name));
        Ok(method
            .descriptor
            .return_type
            .as_ref()
            .map(Value::default_for))
    }

    fn execute(&mut self, method: &MethodData<'g>, args: Vec<Value>) -> Result<Option<Value>, Thrown> {
        let code = method.code.borrow().clone().expect("method without code");
        let labels = code.label_positions().expect("bad labels");
        let locals = code.local_registers;
        let mut registers = vec![Value::Top; code.total_registers() as usize];

        let mut slot = locals as usize;
        for arg in args {
            registers[slot] = arg;
            slot += if matches!(arg, Value::Long(_)) { 2 } else { 1 };
        }

        let read = |registers: &Vec<Value>, register: &Register| registers[register.absolute(locals) as usize];
        let write = |registers: &mut Vec<Value>, register: &Register, value: Value| {
            let idx = register.absolute(locals) as usize;
            registers[idx] = value;
            if register.wide {
                registers[idx + 1] = Value::Top;
            }
        };
        let is_zero = |value: Value| match value {
            Value::Int(value) => value == 0,
            Value::Long(value) => value == 0,
            Value::Ref(obj) => obj.is_none(),
            Value::Top => panic!("reading an unset register"),
        };

        let mut pc = 0;
        let mut last_result: Option<Value> = None;
        loop {
            let instruction = &code.instructions[pc];
            pc += 1;
            match instruction {
                Instruction::Label(_) | Instruction::Nop | Instruction::CheckCast(_, _) => (),
                Instruction::Move(_, dst, src) => {
                    let value = read(&registers, src);
                    write(&mut registers, dst, value);
                }
                Instruction::MoveResult(_, dst) => {
                    let value = last_result.take().expect("no result to move");
                    write(&mut registers, dst, value);
                }
                Instruction::ReturnVoid => return Ok(None),
                Instruction::Return(_, src) => return Ok(Some(read(&registers, src))),
                Instruction::Const(dst, value) => write(&mut registers, dst, Value::Int(*value)),
                Instruction::ConstWide(dst, value) => write(&mut registers, dst, Value::Long(*value)),
                Instruction::ConstString(dst, value) => {
                    let string = self.heap.new_string(value);
                    write(&mut registers, dst, string);
                }
                Instruction::NewInstance(dst, class) => {
                    let object = self.heap.new_object(class.clone());
                    write(&mut registers, dst, object);
                }
                Instruction::NewArray(dst, size, _) => {
                    let size = read(&registers, size).int() as usize;
                    let array = self.heap.new_array(vec![Value::NULL; size]);
                    write(&mut registers, dst, array);
                }
                Instruction::ArrayLength(dst, array) => {
                    let length = self.heap.array(read(&registers, array)).len() as i32;
                    write(&mut registers, dst, Value::Int(length));
                }
                Instruction::Throw(src) => {
                    let exception = read(&registers, src);
                    let message = self
                        .heap
                        .field(exception, &unqualified("message"))
                        .map(|message| self.heap.string(message).to_owned());
                    return Err(Thrown {
                        class: self.heap.class_of(exception).clone(),
                        message,
                    });
                }
                Instruction::Goto(label) => pc = labels[label],
                Instruction::If(comparison, a, b, label) => {
                    let (a, b) = (read(&registers, a), read(&registers, b));
                    let taken = match (a, b) {
                        (Value::Int(a), Value::Int(b)) => compare(*comparison, a.cmp(&b)),
                        (a, b) => compare(*comparison, a.object().cmp(&b.object())),
                    };
                    if taken {
                        pc = labels[label];
                    }
                }
                Instruction::IfZero(comparison, src, label) => {
                    let value = read(&registers, src);
                    let ordering = if is_zero(value) {
                        std::cmp::Ordering::Equal
                    } else {
                        match value {
                            Value::Int(value) => value.cmp(&0),
                            _ => std::cmp::Ordering::Greater,
                        }
                    };
                    if compare(*comparison, ordering) {
                        pc = labels[label];
                    }
                }
                Instruction::PackedSwitch(src, first_key, targets) => {
                    let key = read(&registers, src).int();
                    let offset = key.wrapping_sub(*first_key);
                    if offset >= 0 && (offset as usize) < targets.len() {
                        pc = labels[&targets[offset as usize]];
                    }
                }
                Instruction::SparseSwitch(src, cases) => {
                    let key = read(&registers, src).int();
                    if let Some((_, label)) = cases.iter().find(|(case, _)| *case == key) {
                        pc = labels[label];
                    }
                }
                Instruction::ArrayGet(_, dst, array, index) => {
                    let index = read(&registers, index).int() as usize;
                    let value = self.heap.array(read(&registers, array))[index];
                    write(&mut registers, dst, value);
                }
                Instruction::ArrayPut(_, src, array, index) => {
                    let index = read(&registers, index).int() as usize;
                    let value = read(&registers, src);
                    self.heap.array_mut(read(&registers, array))[index] = value;
                }
                Instruction::InstanceGet(_, dst, object, field) => {
                    let value = self
                        .heap
                        .field(read(&registers, object), &field.name)
                        .unwrap_or_else(|| Value::default_for(&field.descriptor));
                    write(&mut registers, dst, value);
                }
                Instruction::InstancePut(_, src, object, field) => {
                    let value = read(&registers, src);
                    self.heap.set_field(read(&registers, object), &field.name, value);
                }
                Instruction::StaticGet(_, dst, field) => {
                    let value = self
                        .statics
                        .get(&(field.class.clone(), field.name.clone()))
                        .copied()
                        .unwrap_or_else(|| Value::default_for(&field.descriptor));
                    write(&mut registers, dst, value);
                }
                Instruction::StaticPut(_, src, field) => {
                    let value = read(&registers, src);
                    self.statics
                        .insert((field.class.clone(), field.name.clone()), value);
                }
                Instruction::Invoke {
                    kind, args, method, ..
                } => {
                    let values: Vec<Value> = args.iter().map(|arg| read(&registers, arg)).collect();
                    last_result = self.invoke(*kind, method, values)?;
                }
                Instruction::Binary(op, numeric, dst, a, b) => {
                    let (a, b) = (read(&registers, a), read(&registers, b));
                    let value = match numeric {
                        NumericType::Int => Value::Int(int_op(*op, a.int(), b.int())),
                        NumericType::Long => Value::Long(long_op(*op, a.long(), b.long())),
                        other => panic!("unsupported arithmetic on {:?}", other),
                    };
                    write(&mut registers, dst, value);
                }
                Instruction::BinaryLit(op, dst, src, literal) => {
                    let value = int_op(*op, read(&registers, src).int(), *literal as i32);
                    write(&mut registers, dst, Value::Int(value));
                }
                other => panic!("unsupported instruction {:?}", other),
            }
        }
    }
}

fn compare(comparison: Comparison, ordering: std::cmp::Ordering) -> bool {
    use std::cmp::Ordering::*;
    match comparison {
        Comparison::Eq => ordering == Equal,
        Comparison::Ne => ordering != Equal,
        Comparison::Lt => ordering == Less,
        Comparison::Ge => ordering != Less,
        Comparison::Gt => ordering == Greater,
        Comparison::Le => ordering != Greater,
    }
}

fn int_op(op: BinaryOp, a: i32, b: i32) -> i32 {
    match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div => a / b,
        BinaryOp::Rem => a % b,
        BinaryOp::And => a & b,
        BinaryOp::Or => a | b,
        BinaryOp::Xor => a ^ b,
        BinaryOp::Shl => a << (b & 31),
        BinaryOp::Shr => a >> (b & 31),
        BinaryOp::Ushr => ((a as u32) >> (b & 31)) as i32,
    }
}

fn long_op(op: BinaryOp, a: i64, b: i64) -> i64 {
    match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div => a / b,
        BinaryOp::Rem => a % b,
        BinaryOp::And => a & b,
        BinaryOp::Or => a | b,
        BinaryOp::Xor => a ^ b,
        BinaryOp::Shl => a << (b & 63),
        BinaryOp::Shr => a >> (b & 63),
        BinaryOp::Ushr => ((a as u64) >> (b & 63)) as i64,
    }
}
