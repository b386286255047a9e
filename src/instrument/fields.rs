use super::{runtime, Error};
use crate::dex::class_graph::{ClassData, ClassGraph, FieldData};
use crate::dex::code::FieldRef;
use crate::dex::FieldAccessFlags;

/// Classes that get synthetic fields: program classes (genesis classes included) that are not
/// disabled
fn instrumentable<'g>(class_graph: &ClassGraph<'g>) -> impl Iterator<Item = &'g ClassData<'g>> {
    class_graph
        .program_classes()
        .into_iter()
        .filter(|class| !class.disable_intercept.get())
}

fn add_field<'g>(
    class_graph: &ClassGraph<'g>,
    class: &'g ClassData<'g>,
    field: FieldRef,
    access_flags: FieldAccessFlags,
) -> Result<(), Error> {
    class_graph.add_field(FieldData::new(
        class,
        field.name,
        field.descriptor,
        access_flags,
    ))?;
    Ok(())
}

/// Add the `$fh` instance field, where a full patch keeps the fields it adds to a class
pub fn add_field_holders<'g>(class_graph: &ClassGraph<'g>) -> Result<usize, Error> {
    let mut added = 0;
    for class in instrumentable(class_graph) {
        add_field(
            class_graph,
            class,
            runtime::field_holder_field(&class.name),
            FieldAccessFlags::PUBLIC | FieldAccessFlags::SYNTHETIC | FieldAccessFlags::TRANSIENT,
        )?;
        added += 1;
    }
    log::debug!("Added {} field holders", added);
    Ok(added)
}

/// Add the static `$ic` slot through which a patch installs the interceptor of a class
pub fn add_interceptor_fields<'g>(class_graph: &ClassGraph<'g>) -> Result<usize, Error> {
    let mut added = 0;
    for class in instrumentable(class_graph) {
        add_field(
            class_graph,
            class,
            runtime::interceptor_field(&class.name),
            FieldAccessFlags::PUBLIC | FieldAccessFlags::STATIC | FieldAccessFlags::SYNTHETIC,
        )?;
        added += 1;
    }
    log::debug!("Added {} interceptor fields", added);
    Ok(added)
}
