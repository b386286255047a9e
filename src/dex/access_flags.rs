use bitflags::bitflags;

bitflags! {
    /// Access flags on classes
    ///
    /// [0]: https://source.android.com/docs/core/runtime/dex-format#access-flags
    pub struct ClassAccessFlags: u32 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
    }
}

bitflags! {
    /// Access flags on methods
    ///
    /// Unlike class files, dex marks initializers with an explicit `CONSTRUCTOR` flag.
    pub struct MethodAccessFlags: u32 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
        const CONSTRUCTOR = 0x10000;
        const DECLARED_SYNCHRONIZED = 0x20000;
    }
}

bitflags! {
    /// Access flags on fields
    pub struct FieldAccessFlags: u32 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
        const SYNTHETIC = 0x1000;
        const ENUM = 0x4000;
    }
}

/// Coarse visibility level, decoded from access flags
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Visibility {
    Private,
    PackagePrivate,
    Protected,
    Public,
}

impl Visibility {
    fn from_bits(bits: u32) -> Visibility {
        if bits & 0x0002 != 0 {
            Visibility::Private
        } else if bits & 0x0004 != 0 {
            Visibility::Protected
        } else if bits & 0x0001 != 0 {
            Visibility::Public
        } else {
            Visibility::PackagePrivate
        }
    }
}

impl ClassAccessFlags {
    pub fn visibility(&self) -> Visibility {
        Visibility::from_bits(self.bits())
    }
}

impl MethodAccessFlags {
    pub fn visibility(&self) -> Visibility {
        Visibility::from_bits(self.bits())
    }

    /// Make the method public, dropping any narrower visibility
    pub fn widened(self) -> MethodAccessFlags {
        (self - MethodAccessFlags::PRIVATE - MethodAccessFlags::PROTECTED) | MethodAccessFlags::PUBLIC
    }
}

impl FieldAccessFlags {
    /// Make the field public, dropping any narrower visibility
    pub fn widened(self) -> FieldAccessFlags {
        (self - FieldAccessFlags::PRIVATE - FieldAccessFlags::PROTECTED) | FieldAccessFlags::PUBLIC
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn visibility_decoding() {
        assert_eq!(ClassAccessFlags::empty().visibility(), Visibility::PackagePrivate);
        assert_eq!(
            (MethodAccessFlags::PROTECTED | MethodAccessFlags::FINAL).visibility(),
            Visibility::Protected
        );
        assert_eq!(
            (MethodAccessFlags::PRIVATE | MethodAccessFlags::STATIC).visibility(),
            Visibility::Private
        );
    }

    #[test]
    fn widening_keeps_other_flags() {
        let flags = MethodAccessFlags::PROTECTED | MethodAccessFlags::FINAL;
        assert_eq!(
            flags.widened(),
            MethodAccessFlags::PUBLIC | MethodAccessFlags::FINAL
        );
        let field = FieldAccessFlags::PRIVATE | FieldAccessFlags::STATIC;
        assert_eq!(
            field.widened(),
            FieldAccessFlags::PUBLIC | FieldAccessFlags::STATIC
        );
    }
}
