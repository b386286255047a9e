use crate::dex;
use crate::dex::BinaryName;
use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// Malformed model or generated code
    Dex(dex::Error),

    /// The delegated `this(...)`/`super(...)` call of a constructor could not be determined
    StructuralAnalysis { method: String, candidates: usize },

    /// The one delegated constructor call targets neither the class nor its direct superclass
    ForeignDelegatedInit { method: String, target: String },

    /// Method reached code generation without an assigned id
    MissingMethodId(String),

    /// Genesis constructor without its `@GenesisInitMethod` id
    MissingGenesisConstructorId(String),

    /// Private classes cannot be made visible to patch code
    PrivateClass(BinaryName),

    /// Manifest component without a no-argument constructor
    MissingDirectComponentConstructor(BinaryName),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Dex(err) => write!(f, "{}", err),
            Error::StructuralAnalysis { method, candidates } => write!(
                f,
                "expected exactly one delegated constructor call in {}, found {}",
                method, candidates
            ),
            Error::ForeignDelegatedInit { method, target } => write!(
                f,
                "{} delegates to {}, which is not a constructor of the class or its superclass",
                method, target
            ),
            Error::MissingMethodId(method) => write!(f, "no method id assigned to {}", method),
            Error::MissingGenesisConstructorId(method) => {
                write!(f, "genesis constructor {} has no id", method)
            }
            Error::PrivateClass(class) => write!(f, "cannot instrument private class {}", class),
            Error::MissingDirectComponentConstructor(class) => {
                write!(f, "component {} has no no-argument constructor", class)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<dex::Error> for Error {
    fn from(err: dex::Error) -> Error {
        Error::Dex(err)
    }
}
