use super::Error;
use crate::dex::class_graph::{ClassGraph, ComponentFlag, ComponentType, MethodData};
use crate::dex::code::{CodeBuilder, Instruction};
use crate::dex::{BinaryName, MethodAccessFlags, MethodDescriptor, UnqualifiedName};
use std::collections::BTreeMap;

/// Platform class every component of this type extends (the application class has none)
pub fn platform_root(component: ComponentType) -> Option<BinaryName> {
    match component {
        ComponentType::Application => None,
        ComponentType::Activity => Some(BinaryName::ACTIVITY),
        ComponentType::Service => Some(BinaryName::SERVICE),
        ComponentType::Receiver => Some(BinaryName::BROADCAST_RECEIVER),
        ComponentType::Provider => Some(BinaryName::CONTENT_PROVIDER),
    }
}

/// Flag manifest components as `DIRECT` and all of their superclasses as `SUPER`
///
/// Returns the number of declared components found in the class graph.
pub fn mark_components<'g>(
    class_graph: &ClassGraph<'g>,
    components: &BTreeMap<ComponentType, Vec<BinaryName>>,
) -> usize {
    let mut marked = 0;
    for (component, classes) in components {
        for name in classes {
            let class = match class_graph.lookup_class(name) {
                Some(class) => class,
                None => {
                    log::warn!("Declared {:?} {} is not in the class graph", component, name);
                    continue;
                }
            };
            class
                .component
                .set(class.component.get().with(*component, ComponentFlag::DIRECT));
            for superclass in class.superclasses() {
                superclass
                    .component
                    .set(superclass.component.get().with(*component, ComponentFlag::SUPER));
            }
            marked += 1;
        }
    }
    log::debug!("Marked {} component classes", marked);
    marked
}

/// Give instrumented component classes an (empty) static initializer if they have none
///
/// A patch can only install the interceptor of a class lazily from its static initializer, and
/// component classes are the ones a full patch replaces.
pub fn add_missing_static_initializers<'g>(class_graph: &ClassGraph<'g>) -> Result<usize, Error> {
    let descriptor = MethodDescriptor::void(vec![]);
    let mut added = 0;
    for class in class_graph.program_classes() {
        if class.component.get().is_empty()
            || class.disable_intercept.get()
            || class.find_method(&UnqualifiedName::CLINIT, &descriptor).is_some()
        {
            continue;
        }
        let mut code = CodeBuilder::new();
        code.push(Instruction::ReturnVoid);
        class_graph.add_method(
            MethodData::new(
                class,
                UnqualifiedName::CLINIT,
                descriptor.clone(),
                MethodAccessFlags::STATIC | MethodAccessFlags::CONSTRUCTOR,
            )
            .with_code(code.result(0)?),
        )?;
        added += 1;
    }
    log::debug!("Added {} static initializers", added);
    Ok(added)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dex::class_graph::{ClassData, ClassGraphArenas, ClassKind};
    use crate::dex::{ClassAccessFlags, Name};

    fn name(name: &str) -> BinaryName {
        BinaryName::from_string(name.to_owned()).unwrap()
    }

    #[test]
    fn superclasses_are_marked_super() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        let object = graph
            .add_class(ClassData::new(BinaryName::OBJECT, ClassKind::Library, None, ClassAccessFlags::PUBLIC))
            .unwrap();
        let activity = graph
            .add_class(ClassData::new(BinaryName::ACTIVITY, ClassKind::Library, Some(object), ClassAccessFlags::PUBLIC))
            .unwrap();
        let base = graph
            .add_class(ClassData::new(name("a/BaseActivity"), ClassKind::Program, Some(activity), ClassAccessFlags::PUBLIC))
            .unwrap();
        let main = graph
            .add_class(ClassData::new(name("a/MainActivity"), ClassKind::Program, Some(base), ClassAccessFlags::PUBLIC))
            .unwrap();
        let helper = graph
            .add_class(ClassData::new(name("a/Helper"), ClassKind::Program, Some(object), ClassAccessFlags::PUBLIC))
            .unwrap();

        let mut components = BTreeMap::new();
        components.insert(
            ComponentType::Activity,
            vec![name("a/MainActivity"), name("a/Missing")],
        );
        assert_eq!(mark_components(&graph, &components), 1);

        let activity_flags = |class: &ClassData<'_>| class.component.get().get(ComponentType::Activity);
        assert_eq!(activity_flags(main), ComponentFlag::DIRECT);
        assert_eq!(activity_flags(base), ComponentFlag::SUPER);
        assert_eq!(activity_flags(activity), ComponentFlag::SUPER);
        assert_eq!(activity_flags(object), ComponentFlag::SUPER);
        assert!(helper.component.get().is_empty());

        assert_eq!(add_missing_static_initializers(&graph).unwrap(), 2);
        assert!(main
            .find_method(&UnqualifiedName::CLINIT, &MethodDescriptor::void(vec![]))
            .is_some());
        assert!(helper.methods.is_empty());
    }
}
