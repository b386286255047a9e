use super::{runtime, InstrumentFilter};
use crate::dex::class_graph::{ClassData, ClassGraph, MethodData};
use crate::dex::{BinaryName, Name};

/// Package prefix of the Meizu push SDK
pub const MEIZU_PUSH_PACKAGE: &str = "com/meizu/cloud/pushsdk";

/// Mark the program classes of the Meizu push SDK
pub fn mark_meizu_push<'g>(class_graph: &ClassGraph<'g>) -> usize {
    let mut marked = 0;
    for class in class_graph.program_classes() {
        if class.name.as_str().starts_with(MEIZU_PUSH_PACKAGE) {
            class.meizu_push.set(true);
            marked += 1;
        }
    }
    log::debug!("Marked {} Meizu push classes", marked);
    marked
}

/// Decide which program classes and methods instrumentation leaves alone
///
/// Returns the number of disabled classes and of disabled methods (in the remaining classes).
pub fn mark_disabled<'g>(
    class_graph: &ClassGraph<'g>,
    filter: &dyn InstrumentFilter,
) -> (usize, usize) {
    let mut classes = 0;
    let mut methods = 0;
    for class in class_graph.program_classes() {
        if class_disabled(class_graph, class, filter) {
            class.disable_intercept.set(true);
            classes += 1;
            log::trace!("Not instrumenting {:?}", class);
            continue;
        }
        for method in class.methods.iter() {
            if method_disabled(method, filter) {
                method.disable_intercept.set(true);
                methods += 1;
                log::trace!("Not instrumenting {:?}", method);
            }
        }
    }
    log::debug!("Disabled {} classes and {} methods", classes, methods);
    (classes, methods)
}

fn class_disabled<'g>(
    class_graph: &ClassGraph<'g>,
    class: &ClassData<'g>,
    filter: &dyn InstrumentFilter,
) -> bool {
    class.name.as_str().starts_with(runtime::TITAN_SDK_PACKAGE)
        || class.is_interface()
        || class.has_annotation(&BinaryName::DISABLE_INTERCEPT)
        || class_graph
            .lookup_class(&class.name.package_info())
            .map_or(false, |info| info.has_annotation(&BinaryName::DISABLE_INTERCEPT))
        || !filter.accept_class(&class.name)
        || class.meizu_push.get()
}

fn method_disabled(method: &MethodData<'_>, filter: &dyn InstrumentFilter) -> bool {
    method.is_abstract()
        || method.is_native()
        || method.is_synthetic()
        || method.class.is_interface()
        || method.has_annotation(&BinaryName::DISABLE_INTERCEPT)
        || !filter.accept_method(method)
}
