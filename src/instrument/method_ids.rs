use super::Error;
use crate::dex::class_graph::{ClassData, MethodData};
use crate::dex::RenderDescriptor;

/// Close the member set of a class and number its methods
///
/// Methods that can carry code (so not abstract, not native, and not declared on an interface)
/// are sorted by name then descriptor and numbered from zero. Once this has run, the class cannot
/// gain members and its access flags are frozen. Returns the numbered methods in id order.
pub fn assign_method_ids<'g>(
    class: &'g ClassData<'g>,
) -> Result<Vec<&'g MethodData<'g>>, Error> {
    class.close_members();

    let mut retained: Vec<(String, &'g MethodData<'g>)> = class
        .methods
        .iter()
        .filter(|method| !class.is_interface() && !method.is_abstract() && !method.is_native())
        .map(|method| (method.descriptor.render(), method))
        .collect();
    retained.sort_by(|(desc1, method1), (desc2, method2)| {
        (&method1.name, desc1).cmp(&(&method2.name, desc2))
    });

    let mut methods = Vec::with_capacity(retained.len());
    for (method_id, (_, method)) in retained.into_iter().enumerate() {
        method.assign_method_id(method_id as u32)?;
        methods.push(method);
    }
    log::debug!("Assigned {} method ids in {:?}", methods.len(), class);
    Ok(methods)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dex::class_graph::{ClassGraph, ClassGraphArenas, ClassKind, FieldData};
    use crate::dex::{
        BinaryName, ClassAccessFlags, FieldAccessFlags, FieldType, MethodAccessFlags,
        MethodDescriptor, Name, ParseDescriptor, UnqualifiedName,
    };

    #[test]
    fn ids_are_dense_sorted_and_final() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        let class = graph
            .add_class(ClassData::new(
                BinaryName::from_string(String::from("a/Main")).unwrap(),
                ClassKind::Program,
                None,
                ClassAccessFlags::PUBLIC | ClassAccessFlags::ABSTRACT,
            ))
            .unwrap();
        let add = |name: &str, descriptor: &str, flags: MethodAccessFlags| {
            graph
                .add_method(MethodData::new(
                    class,
                    UnqualifiedName::from_string(name.to_owned()).unwrap(),
                    MethodDescriptor::parse(descriptor).unwrap(),
                    flags,
                ))
                .unwrap()
        };
        let run_long = add("run", "(J)V", MethodAccessFlags::PUBLIC);
        let run_int = add("run", "(I)V", MethodAccessFlags::PUBLIC);
        let check = add("check", "()Z", MethodAccessFlags::PUBLIC);
        let abstract_method = add(
            "render",
            "()V",
            MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT,
        );
        let native_method = add(
            "hash",
            "()I",
            MethodAccessFlags::PUBLIC | MethodAccessFlags::NATIVE,
        );

        let methods = assign_method_ids(class).unwrap();
        assert_eq!(methods.len(), 3);
        assert_eq!(check.method_id(), Some(0));
        assert_eq!(run_int.method_id(), Some(1));
        assert_eq!(run_long.method_id(), Some(2));
        assert_eq!(abstract_method.method_id(), None);
        assert_eq!(native_method.method_id(), None);

        // the member set is closed now
        assert!(graph
            .add_field(FieldData::new(
                class,
                UnqualifiedName::from_string(String::from("late")).unwrap(),
                FieldType::int(),
                FieldAccessFlags::PUBLIC,
            ))
            .is_err());
        assert!(check.assign_method_id(7).is_err());
        assert!(assign_method_ids(class).is_err());
    }
}
