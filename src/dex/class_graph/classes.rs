use super::{Annotation, ComponentFlags, FieldData, MethodData};
use crate::dex::{
    BinaryName, ClassAccessFlags, Error, MethodDescriptor, RenderDescriptor, UnqualifiedName,
};
use elsa::FrozenVec;
use std::cell::{Cell, RefCell};
use std::fmt;

/// Where a class comes from
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ClassKind {
    /// Application code, which may be rewritten
    Program,

    /// Platform or library code, which is only linked against
    Library,
}

pub struct ClassData<'g> {
    /// Name of the class
    pub name: BinaryName,

    pub kind: ClassKind,

    access_flags: Cell<ClassAccessFlags>,

    /// Superclass is only ever missing for `java/lang/Object` itself
    superclass: Cell<Option<&'g ClassData<'g>>>,

    /// Interfaces implemented (or super-interfaces)
    pub interfaces: FrozenVec<&'g ClassData<'g>>,

    /// Direct subclasses, maintained by the class graph
    subclasses: RefCell<Vec<&'g ClassData<'g>>>,

    pub annotations: RefCell<Vec<Annotation>>,

    /// Methods
    pub methods: FrozenVec<&'g MethodData<'g>>,

    /// Fields
    pub fields: FrozenVec<&'g FieldData<'g>>,

    /// Class is left untouched by instrumentation
    pub disable_intercept: Cell<bool>,

    /// Class belongs to the Meizu push SDK
    pub meizu_push: Cell<bool>,

    /// Android component roles of this class
    pub component: Cell<ComponentFlags>,

    /// Class was synthesized as a genesis class
    pub is_genesis: Cell<bool>,

    /// Once set, members may no longer be added and access flags may no longer change
    members_closed: Cell<bool>,
}

impl<'g> ClassData<'g> {
    pub fn new(
        name: BinaryName,
        kind: ClassKind,
        superclass: Option<&'g ClassData<'g>>,
        access_flags: ClassAccessFlags,
    ) -> ClassData<'g> {
        ClassData {
            name,
            kind,
            access_flags: Cell::new(access_flags),
            superclass: Cell::new(superclass),
            interfaces: FrozenVec::new(),
            subclasses: RefCell::new(vec![]),
            annotations: RefCell::new(vec![]),
            methods: FrozenVec::new(),
            fields: FrozenVec::new(),
            disable_intercept: Cell::new(false),
            meizu_push: Cell::new(false),
            component: Cell::new(ComponentFlags::NONE),
            is_genesis: Cell::new(false),
            members_closed: Cell::new(false),
        }
    }

    pub fn is_program(&self) -> bool {
        self.kind == ClassKind::Program
    }

    pub fn is_library(&self) -> bool {
        self.kind == ClassKind::Library
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags().contains(ClassAccessFlags::INTERFACE)
    }

    pub fn access_flags(&self) -> ClassAccessFlags {
        self.access_flags.get()
    }

    pub fn set_access_flags(&self, access_flags: ClassAccessFlags) -> Result<(), Error> {
        self.check_open(|| String::from("class access flags"))?;
        self.access_flags.set(access_flags);
        Ok(())
    }

    pub fn superclass(&self) -> Option<&'g ClassData<'g>> {
        self.superclass.get()
    }

    /// Only the class graph moves classes, so that subclass lists stay in sync
    pub(super) fn set_superclass(&self, superclass: Option<&'g ClassData<'g>>) {
        self.superclass.set(superclass)
    }

    /// All transitive superclasses, nearest first
    pub fn superclasses(&self) -> impl Iterator<Item = &'g ClassData<'g>> {
        std::iter::successors(self.superclass(), |class| class.superclass())
    }

    /// Snapshot of the direct subclasses
    pub fn subclasses(&self) -> Vec<&'g ClassData<'g>> {
        self.subclasses.borrow().clone()
    }

    pub(super) fn add_subclass(&self, subclass: &'g ClassData<'g>) {
        self.subclasses.borrow_mut().push(subclass)
    }

    pub(super) fn remove_subclass(&self, subclass: &'g ClassData<'g>) {
        self.subclasses
            .borrow_mut()
            .retain(|existing| !std::ptr::eq(*existing, subclass))
    }

    pub fn has_annotation(&self, typ: &BinaryName) -> bool {
        self.annotations
            .borrow()
            .iter()
            .any(|annotation| &annotation.typ == typ)
    }

    pub fn add_annotation(&self, annotation: Annotation) {
        self.annotations.borrow_mut().push(annotation)
    }

    pub fn find_method(
        &'g self,
        name: &UnqualifiedName,
        descriptor: &MethodDescriptor<BinaryName>,
    ) -> Option<&'g MethodData<'g>> {
        self.methods
            .iter()
            .find(|method| &method.name == name && &method.descriptor == descriptor)
    }

    pub fn find_field(&'g self, name: &UnqualifiedName) -> Option<&'g FieldData<'g>> {
        self.fields.iter().find(|field| &field.name == name)
    }

    /// Close the member set
    pub fn close_members(&self) {
        self.members_closed.set(true)
    }

    pub fn members_closed(&self) -> bool {
        self.members_closed.get()
    }

    /// Error out if the member set is closed
    pub fn check_open(&self, member: impl FnOnce() -> String) -> Result<(), Error> {
        if self.members_closed() {
            Err(Error::MemberSetClosed {
                class: self.name.clone(),
                member: member(),
            })
        } else {
            Ok(())
        }
    }
}

impl<'g> PartialEq for ClassData<'g> {
    fn eq(&self, other: &ClassData<'g>) -> bool {
        self.name == other.name
    }
}

impl<'g> Eq for ClassData<'g> {}

impl<'g> RenderDescriptor for ClassData<'g> {
    fn render_to(&self, write_to: &mut String) {
        self.name.render_to(write_to)
    }
}

impl<'g> fmt::Debug for ClassData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.as_ref())
    }
}
