use crate::dex::class_graph::MethodData;
use crate::dex::{BinaryName, Name};

/// Decides which classes and methods instrumentation may touch
///
/// Rejected classes and methods are marked `disable_intercept` and left completely untouched.
pub trait InstrumentFilter {
    fn accept_class(&self, class: &BinaryName) -> bool;

    fn accept_method(&self, method: &MethodData<'_>) -> bool;
}

/// Doesn't filter anything
pub struct AcceptAll;

impl InstrumentFilter for AcceptAll {
    fn accept_class(&self, _class: &BinaryName) -> bool {
        true
    }

    fn accept_method(&self, _method: &MethodData<'_>) -> bool {
        true
    }
}

/// Rejects every class in the given packages (and their subpackages)
pub struct ExcludePackages(Vec<String>);

impl ExcludePackages {
    /// Packages are written with slashes, like `com/example/internal`
    pub fn new<S: Into<String>>(packages: impl IntoIterator<Item = S>) -> ExcludePackages {
        ExcludePackages(
            packages
                .into_iter()
                .map(|package| {
                    let mut package = package.into();
                    if !package.ends_with('/') {
                        package.push('/');
                    }
                    package
                })
                .collect(),
        )
    }
}

impl InstrumentFilter for ExcludePackages {
    fn accept_class(&self, class: &BinaryName) -> bool {
        !self
            .0
            .iter()
            .any(|package| class.as_str().starts_with(package.as_str()))
    }

    fn accept_method(&self, method: &MethodData<'_>) -> bool {
        self.accept_class(&method.class.name)
    }
}
