use super::Error;
use crate::dex::class_graph::MethodData;
use crate::dex::code::Code;
use crate::dex::verifier::{DelegatedInit, UninitializedThis};

/// Find the `this(...)`/`super(...)` call of a constructor
///
/// Every `<init>` call on the uninitialized receiver counts, and there must be exactly one. That
/// call must then target a constructor of the class itself or of its direct superclass.
pub fn find_delegated_init(method: &MethodData<'_>, code: &Code) -> Result<DelegatedInit, Error> {
    let class = method.class;
    let analysis = UninitializedThis::analyze(code)?;
    let init = match analysis.delegated_inits() {
        [init] => init,
        inits => {
            return Err(Error::StructuralAnalysis {
                method: format!("{:?}", method),
                candidates: inits.len(),
            })
        }
    };

    let owner = &init.method.class;
    let own_or_super = owner == &class.name
        || class
            .superclass()
            .map_or(false, |superclass| owner == &superclass.name);
    if !own_or_super {
        return Err(Error::ForeignDelegatedInit {
            method: format!("{:?}", method),
            target: format!("{:?}", init.method),
        });
    }
    log::trace!("{:?} delegates to {:?}", method, init.method);
    Ok(init.clone())
}
