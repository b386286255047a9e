use crate::dex::{BinaryName, UnqualifiedName};

/// Constant element value of an annotation
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum AnnotationValue {
    Int(i32),
    Bool(bool),
    String(String),
}

/// Annotation on a class or a method
///
/// Only the annotations the instrumentation reads or writes are modelled, so elements are limited
/// to constants.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Annotation {
    pub typ: BinaryName,
    pub elements: Vec<(UnqualifiedName, AnnotationValue)>,
}

impl Annotation {
    /// Annotation without elements
    pub fn marker(typ: BinaryName) -> Annotation {
        Annotation {
            typ,
            elements: vec![],
        }
    }

    pub fn with_element(mut self, name: UnqualifiedName, value: AnnotationValue) -> Annotation {
        self.elements.push((name, value));
        self
    }

    pub fn element(&self, name: &UnqualifiedName) -> Option<&AnnotationValue> {
        self.elements
            .iter()
            .find(|(element, _)| element == name)
            .map(|(_, value)| value)
    }
}
