use super::Error;
use crate::dex::class_graph::ClassGraph;
use crate::dex::{ClassAccessFlags, MethodAccessFlags, Visibility};

/// Make program classes and their members visible to patch code
///
/// Patches live in classes of their own, often in other packages, and call straight into the
/// application:
///
///   * classes become public (a private class is rejected, since it cannot exist in a dex file)
///   * static methods become public
///   * non-private instance methods become public, if `make_virtual_methods_public`
///   * fields become public
///
/// Private instance methods are never widened: calls to them are `invoke-direct`, and widening
/// would make them virtual. Meizu push classes are left alone.
pub fn widen_access<'g>(
    class_graph: &ClassGraph<'g>,
    make_virtual_methods_public: bool,
) -> Result<(), Error> {
    for class in class_graph.program_classes() {
        if class.meizu_push.get() {
            continue;
        }

        let flags = class.access_flags();
        match flags.visibility() {
            Visibility::Private => return Err(Error::PrivateClass(class.name.clone())),
            Visibility::PackagePrivate | Visibility::Protected => class.set_access_flags(
                (flags - ClassAccessFlags::PROTECTED) | ClassAccessFlags::PUBLIC,
            )?,
            Visibility::Public => (),
        }

        for method in class.methods.iter() {
            let flags = method.access_flags();
            let widen = if method.is_static_initializer() {
                false
            } else if method.is_static() {
                true
            } else {
                make_virtual_methods_public && flags.visibility() != Visibility::Private
            };
            if widen && flags.visibility() != Visibility::Public {
                method.set_access_flags(flags.widened())?;
            }
        }

        for field in class.fields.iter() {
            let flags = field.access_flags();
            if flags.widened() != flags {
                field.set_access_flags(flags.widened())?;
            }
        }
        log::trace!("Widened access in {:?}", class);
    }
    Ok(())
}
