use super::code::SynLabel;
use super::BinaryName;
use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// A type or method descriptor could not be parsed
    BadDescriptor {
        descriptor: String,
        position: usize,
        reason: &'static str,
    },

    /// A class with this name is already in the graph
    DuplicateClass(BinaryName),
    MissingClass(BinaryName),
    MissingMember(String),

    /// Members (or access flags) of a class were modified after its member set was closed
    MemberSetClosed { class: BinaryName, member: String },

    /// Fixed-form invoke with more register slots than the encoding allows
    RegisterListOverflow { method: String, slots: usize },

    /// Invoke whose register slots do not match the callee descriptor
    ArgumentMismatch {
        method: String,
        expected: usize,
        found: usize,
    },

    /// Range-form invoke whose registers are not consecutive
    NonContiguousRange { method: String },

    /// A label is jumped to but never placed
    UnplacedLabel(SynLabel),

    /// Two `Label` pseudo-instructions carry the same label (indicates a bug)
    DuplicateLabel(SynLabel),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadDescriptor {
                descriptor,
                position,
                reason,
            } => write!(
                f,
                "bad descriptor '{}' at offset {}: {}",
                descriptor, position, reason
            ),
            Error::DuplicateClass(name) => write!(f, "duplicate class {}", name),
            Error::MissingClass(name) => write!(f, "missing class {}", name),
            Error::MissingMember(member) => write!(f, "missing member {}", member),
            Error::MemberSetClosed { class, member } => write!(
                f,
                "cannot modify {} after members of {} were closed",
                member, class
            ),
            Error::RegisterListOverflow { method, slots } => write!(
                f,
                "invoke of {} uses {} register slots in the fixed form",
                method, slots
            ),
            Error::ArgumentMismatch {
                method,
                expected,
                found,
            } => write!(
                f,
                "invoke of {} passes {} register slots instead of {}",
                method, found, expected
            ),
            Error::NonContiguousRange { method } => {
                write!(f, "range invoke of {} has non-contiguous registers", method)
            }
            Error::UnplacedLabel(label) => write!(f, "label {:?} is never placed", label),
            Error::DuplicateLabel(label) => write!(f, "label {:?} is placed twice", label),
        }
    }
}
