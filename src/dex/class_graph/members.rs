use super::{Annotation, AnnotationValue, ClassData, ConstructorRole};
use crate::dex::code::{Code, FieldRef, MethodRef};
use crate::dex::{
    BinaryName, Error, FieldAccessFlags, FieldType, MethodAccessFlags, MethodDescriptor,
    RenderDescriptor, UnqualifiedName,
};
use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;

pub struct MethodData<'g> {
    /// Class
    ///
    /// Note: this is a pointer back to the class (so don't derive `Debug`)
    pub class: &'g ClassData<'g>,

    /// Name of the method
    pub name: UnqualifiedName,

    /// Type of the method
    pub descriptor: MethodDescriptor<BinaryName>,

    access_flags: Cell<MethodAccessFlags>,

    pub annotations: RefCell<Vec<Annotation>>,

    /// Body, absent for abstract and native methods
    pub code: RefCell<Option<Code>>,

    /// Per-class identifier, assigned once the class is closed
    method_id: OnceCell<u32>,

    /// Method is left untouched by instrumentation
    pub disable_intercept: Cell<bool>,

    pub role: Cell<ConstructorRole>,

    /// Identifier of a constructor redeclared on a genesis class
    pub genesis_init_id: Cell<Option<u32>>,
}

impl<'g> MethodData<'g> {
    pub fn new(
        class: &'g ClassData<'g>,
        name: UnqualifiedName,
        descriptor: MethodDescriptor<BinaryName>,
        access_flags: MethodAccessFlags,
    ) -> MethodData<'g> {
        MethodData {
            class,
            name,
            descriptor,
            access_flags: Cell::new(access_flags),
            annotations: RefCell::new(vec![]),
            code: RefCell::new(None),
            method_id: OnceCell::new(),
            disable_intercept: Cell::new(false),
            role: Cell::new(ConstructorRole::Plain),
            genesis_init_id: Cell::new(None),
        }
    }

    pub fn with_code(self, code: Code) -> MethodData<'g> {
        self.code.replace(Some(code));
        self
    }

    pub fn with_annotation(self, annotation: Annotation) -> MethodData<'g> {
        self.annotations.borrow_mut().push(annotation);
        self
    }

    pub fn access_flags(&self) -> MethodAccessFlags {
        self.access_flags.get()
    }

    /// Change access flags, which is only allowed while the class is open
    pub fn set_access_flags(&self, access_flags: MethodAccessFlags) -> Result<(), Error> {
        self.class
            .check_open(|| format!("access flags of {}", self.name))?;
        self.access_flags.set(access_flags);
        Ok(())
    }

    pub fn is_static(&self) -> bool {
        self.access_flags().contains(MethodAccessFlags::STATIC)
    }

    pub fn is_abstract(&self) -> bool {
        self.access_flags().contains(MethodAccessFlags::ABSTRACT)
    }

    pub fn is_native(&self) -> bool {
        self.access_flags().contains(MethodAccessFlags::NATIVE)
    }

    pub fn is_synthetic(&self) -> bool {
        self.access_flags().contains(MethodAccessFlags::SYNTHETIC)
    }

    /// Instance initializer (`<init>`)
    pub fn is_constructor(&self) -> bool {
        self.name.is_init() && !self.is_static()
    }

    /// Static initializer (`<clinit>`)
    pub fn is_static_initializer(&self) -> bool {
        self.name.is_clinit()
    }

    pub fn has_code(&self) -> bool {
        self.code.borrow().is_some()
    }

    /// Number of parameter registers, including the receiver
    pub fn parameter_registers(&self) -> u16 {
        self.descriptor.parameter_length(!self.is_static()) as u16
    }

    pub fn method_id(&self) -> Option<u32> {
        self.method_id.get().copied()
    }

    /// Record the per-class identifier (only succeeds once)
    pub fn assign_method_id(&self, method_id: u32) -> Result<(), Error> {
        self.method_id
            .set(method_id)
            .map_err(|_| Error::MemberSetClosed {
                class: self.class.name.clone(),
                member: format!("method id of {}", self.name),
            })
    }

    pub fn has_annotation(&self, typ: &BinaryName) -> bool {
        self.annotations
            .borrow()
            .iter()
            .any(|annotation| &annotation.typ == typ)
    }

    /// Integer element of an annotation on this method
    pub fn annotation_int(&self, typ: &BinaryName, element: &UnqualifiedName) -> Option<i32> {
        self.annotations
            .borrow()
            .iter()
            .filter(|annotation| &annotation.typ == typ)
            .find_map(|annotation| match annotation.element(element) {
                Some(AnnotationValue::Int(value)) => Some(*value),
                _ => None,
            })
    }

    /// Symbolic reference to this method
    pub fn to_ref(&self) -> MethodRef {
        MethodRef::new(
            self.class.name.clone(),
            self.name.clone(),
            self.descriptor.clone(),
        )
    }
}

impl<'g> fmt::Debug for MethodData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!(
            "{}.{}:{}",
            self.class.name,
            self.name,
            self.descriptor.render(),
        ))
    }
}

pub struct FieldData<'g> {
    /// Class
    ///
    /// Note: this is a pointer back to the class (so don't derive `Debug`)
    pub class: &'g ClassData<'g>,

    /// Name of the field
    pub name: UnqualifiedName,

    /// Type of the field
    pub descriptor: FieldType<BinaryName>,

    access_flags: Cell<FieldAccessFlags>,
}

impl<'g> FieldData<'g> {
    pub fn new(
        class: &'g ClassData<'g>,
        name: UnqualifiedName,
        descriptor: FieldType<BinaryName>,
        access_flags: FieldAccessFlags,
    ) -> FieldData<'g> {
        FieldData {
            class,
            name,
            descriptor,
            access_flags: Cell::new(access_flags),
        }
    }

    pub fn access_flags(&self) -> FieldAccessFlags {
        self.access_flags.get()
    }

    pub fn set_access_flags(&self, access_flags: FieldAccessFlags) -> Result<(), Error> {
        self.class
            .check_open(|| format!("access flags of {}", self.name))?;
        self.access_flags.set(access_flags);
        Ok(())
    }

    pub fn is_static(&self) -> bool {
        self.access_flags().contains(FieldAccessFlags::STATIC)
    }

    pub fn to_ref(&self) -> FieldRef {
        FieldRef::new(
            self.class.name.clone(),
            self.name.clone(),
            self.descriptor.clone(),
        )
    }
}

impl<'g> fmt::Debug for FieldData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!(
            "{}.{}:{}",
            self.class.name,
            self.name,
            self.descriptor.render(),
        ))
    }
}
