//! Arena-backed graph of classes and their members
//!
//! Every class, method and field of the program (and of the libraries it links against) is
//! allocated once, in [`ClassGraphArenas`], and referred to by `&'g` references afterwards. This
//! is what makes it possible to hold on to a class while its members, marks and superclass are
//! still being modified: anything that changes after allocation lives behind a `Cell`,
//! `RefCell` or an append-only `elsa` container.

use super::{BinaryName, Error};
use elsa::map::FrozenMap;
use std::cell::RefCell;
use typed_arena::Arena;

mod annotations;
mod classes;
mod marks;
mod members;

pub use annotations::*;
pub use classes::*;
pub use marks::*;
pub use members::*;

pub struct ClassGraphArenas<'g> {
    class_arena: Arena<ClassData<'g>>,
    method_arena: Arena<MethodData<'g>>,
    field_arena: Arena<FieldData<'g>>,
}

impl<'g> ClassGraphArenas<'g> {
    pub fn new() -> Self {
        ClassGraphArenas {
            class_arena: Arena::new(),
            method_arena: Arena::new(),
            field_arena: Arena::new(),
        }
    }
}

impl<'g> Default for ClassGraphArenas<'g> {
    fn default() -> Self {
        ClassGraphArenas::new()
    }
}

/// Tracks the relationships between classes and the members on those classes
///
/// Superclass and subclass edges are kept in sync by the graph itself: adding a class links it
/// under its superclass, and [`ClassGraph::reparent`] moves it. Consumers can therefore walk the
/// hierarchy in either direction without a separate hierarchy-filling step.
pub struct ClassGraph<'g> {
    arenas: &'g ClassGraphArenas<'g>,
    classes: FrozenMap<BinaryName, &'g ClassData<'g>>,

    /// Classes in the order they were added
    order: RefCell<Vec<&'g ClassData<'g>>>,
}

impl<'g> ClassGraph<'g> {
    /// New empty graph
    pub fn new(arenas: &'g ClassGraphArenas<'g>) -> Self {
        ClassGraph {
            arenas,
            classes: FrozenMap::new(),
            order: RefCell::new(vec![]),
        }
    }

    pub fn lookup_class(&self, name: &BinaryName) -> Option<&'g ClassData<'g>> {
        self.classes.map_get(name, |class| *class)
    }

    /// Snapshot of all classes, in insertion order
    pub fn classes(&self) -> Vec<&'g ClassData<'g>> {
        self.order.borrow().clone()
    }

    /// Snapshot of the program classes, in insertion order
    pub fn program_classes(&self) -> Vec<&'g ClassData<'g>> {
        self.order
            .borrow()
            .iter()
            .copied()
            .filter(|class| class.is_program())
            .collect()
    }

    /// Add a new class to the class graph, under its superclass
    pub fn add_class(&self, data: ClassData<'g>) -> Result<&'g ClassData<'g>, Error> {
        if self.lookup_class(&data.name).is_some() {
            return Err(Error::DuplicateClass(data.name));
        }
        let data = &*self.arenas.class_arena.alloc(data);
        self.classes.insert(data.name.clone(), data);
        self.order.borrow_mut().push(data);
        if let Some(superclass) = data.superclass() {
            superclass.add_subclass(data);
        }
        Ok(data)
    }

    /// Add a method to the class graph and to its class
    ///
    /// If the class already declares a method with the same name and descriptor, that method is
    /// returned instead and `method` is dropped.
    pub fn add_method(&self, method: MethodData<'g>) -> Result<&'g MethodData<'g>, Error> {
        let class = method.class;
        if let Some(existing) = class.find_method(&method.name, &method.descriptor) {
            return Ok(existing);
        }
        class.check_open(|| format!("method {}", method.name))?;
        let data = &*self.arenas.method_arena.alloc(method);
        class.methods.push(data);
        Ok(data)
    }

    /// Add a field to the class graph and to its class
    ///
    /// If the class already declares a field with the same name, that field is returned instead.
    pub fn add_field(&self, field: FieldData<'g>) -> Result<&'g FieldData<'g>, Error> {
        let class = field.class;
        if let Some(existing) = class.find_field(&field.name) {
            return Ok(existing);
        }
        class.check_open(|| format!("field {}", field.name))?;
        let data = &*self.arenas.field_arena.alloc(field);
        class.fields.push(data);
        Ok(data)
    }

    /// Move a class under a new superclass, keeping subclass lists in sync
    pub fn reparent(&self, class: &'g ClassData<'g>, new_superclass: &'g ClassData<'g>) {
        if let Some(old_superclass) = class.superclass() {
            old_superclass.remove_subclass(class);
        }
        class.set_superclass(Some(new_superclass));
        new_superclass.add_subclass(class);
    }
}
