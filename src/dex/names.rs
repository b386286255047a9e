use std::borrow::Cow;
use std::fmt;

/// Simple names of methods and fields (`onCreate`, `$ic`, `<init>`)
#[derive(Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct UnqualifiedName(Cow<'static, str>);

/// Names of classes and interfaces, written with `/` separators (eg. `android/app/Activity`)
#[derive(Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct BinaryName(Cow<'static, str>);

/// Validated string names
///
/// Names are checked once, when built from a runtime string. The predefined constants skip the
/// check, which is how `<init>` and friends exist at all as method names.
pub trait Name: Sized {
    /// Underlying string of the name
    fn as_str(&self) -> &str;

    /// Build a name, rejecting strings that could not appear in a dex file
    fn from_string(name: String) -> Result<Self, String>;
}

/// Characters a dex simple name may never contain
const RESERVED: &[char] = &['.', ';', '[', '/', '<', '>'];

fn check_simple(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err(String::from("empty name segment"));
    }
    if name == "<init>" || name == "<clinit>" {
        return Ok(());
    }
    match name.find(RESERVED) {
        Some(offset) => Err(format!(
            "'{}' has reserved character '{}' at offset {}",
            name,
            &name[offset..offset + 1],
            offset
        )),
        None => Ok(()),
    }
}

impl Name for UnqualifiedName {
    fn as_str(&self) -> &str {
        &self.0
    }

    fn from_string(name: String) -> Result<Self, String> {
        check_simple(&name).map_err(|err| format!("bad member name: {}", err))?;
        Ok(UnqualifiedName(Cow::Owned(name)))
    }
}

impl Name for BinaryName {
    fn as_str(&self) -> &str {
        &self.0
    }

    fn from_string(name: String) -> Result<Self, String> {
        for segment in name.split('/') {
            if segment == "<init>" || segment == "<clinit>" {
                return Err(format!("bad class name '{}': '{}' is a method name", name, segment));
            }
            check_simple(segment).map_err(|err| format!("bad class name '{}': {}", name, err))?;
        }
        Ok(BinaryName(Cow::Owned(name)))
    }
}

macro_rules! string_like {
    ($name:ident) => {
        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_like!(UnqualifiedName);
string_like!(BinaryName);

impl UnqualifiedName {
    /// Concatenate the contents of two unqualified names to produce a third
    pub fn concat(&self, other: &str) -> UnqualifiedName {
        UnqualifiedName(Cow::Owned(format!("{}{}", self.as_str(), other)))
    }

    /// Is this the instance initializer name `<init>`?
    pub fn is_init(&self) -> bool {
        self == &UnqualifiedName::INIT
    }

    /// Is this the static initializer name `<clinit>`?
    pub fn is_clinit(&self) -> bool {
        self == &UnqualifiedName::CLINIT
    }

    const fn name(value: &'static str) -> UnqualifiedName {
        UnqualifiedName(Cow::Borrowed(value))
    }

    pub const INIT: Self = Self::name("<init>");
    pub const CLINIT: Self = Self::name("<clinit>");

    // Boxing and unboxing
    pub const VALUEOF: Self = Self::name("valueOf");
    pub const BOOLEANVALUE: Self = Self::name("booleanValue");
    pub const BYTEVALUE: Self = Self::name("byteValue");
    pub const CHARVALUE: Self = Self::name("charValue");
    pub const SHORTVALUE: Self = Self::name("shortValue");
    pub const INTVALUE: Self = Self::name("intValue");
    pub const LONGVALUE: Self = Self::name("longValue");
    pub const FLOATVALUE: Self = Self::name("floatValue");
    pub const DOUBLEVALUE: Self = Self::name("doubleValue");

    // Titan runtime members
    pub const INTERCEPTOR_FIELD: Self = Self::name("$ic");
    pub const FIELD_HOLDER_FIELD: Self = Self::name("$fh");
    pub const BUDDY_OBJ: Self = Self::name("$buddyObj");
    pub const INVOKE: Self = Self::name("invoke");
    pub const INVOKECOMMON: Self = Self::name("invokeCommon");
    pub const INVOKEUNINIT: Self = Self::name("invokeUnInit");
    pub const INVOKEINITBODY: Self = Self::name("invokeInitBody");
    pub const INVOKECLINIT: Self = Self::name("invokeClinit");
    pub const INVOKEPOSTCLINIT: Self = Self::name("invokePostClinit");
    pub const NEWINITCONTEXT: Self = Self::name("newInitContext");
    pub const CURRENT: Self = Self::name("current");
    pub const INITMETHODID: Self = Self::name("initMethodId");
    pub const PARAS: Self = Self::name("paras");
    pub const INITARGS: Self = Self::name("initArgs");
    pub const CALLARGS: Self = Self::name("callArgs");
    pub const THISARG: Self = Self::name("thisArg");
    pub const FLAG: Self = Self::name("flag");
    pub const FLAGS: Self = Self::name("flags");
    pub const INTERCEPTOR: Self = Self::name("interceptor");
    pub const OBJVALUE: Self = Self::name("objValue");
    pub const METHODID: Self = Self::name("methodId");
}

impl BinaryName {
    /// Append a suffix to the last segment of the name (eg. `a/B` with `$genesis` is
    /// `a/B$genesis`)
    pub fn with_suffix(&self, suffix: &str) -> BinaryName {
        BinaryName(Cow::Owned(format!("{}{}", self.as_str(), suffix)))
    }

    /// Package part of the name (`a/b` for `a/b/C`, empty for `C`)
    pub fn package(&self) -> &str {
        match self.as_str().rfind('/') {
            Some(idx) => &self.as_str()[..idx],
            None => "",
        }
    }

    /// Name of the `package-info` class of the package this class is in
    pub fn package_info(&self) -> BinaryName {
        let package = self.package();
        if package.is_empty() {
            BinaryName::name("package-info")
        } else {
            BinaryName(Cow::Owned(format!("{}/package-info", package)))
        }
    }

    const fn name(value: &'static str) -> BinaryName {
        BinaryName(Cow::Borrowed(value))
    }

    // JDK types
    pub const OBJECT: Self = Self::name("java/lang/Object");
    pub const STRING: Self = Self::name("java/lang/String");
    pub const BOOLEAN: Self = Self::name("java/lang/Boolean");
    pub const BYTE: Self = Self::name("java/lang/Byte");
    pub const CHARACTER: Self = Self::name("java/lang/Character");
    pub const SHORT: Self = Self::name("java/lang/Short");
    pub const INTEGER: Self = Self::name("java/lang/Integer");
    pub const LONG: Self = Self::name("java/lang/Long");
    pub const FLOAT: Self = Self::name("java/lang/Float");
    pub const DOUBLE: Self = Self::name("java/lang/Double");
    pub const ILLEGALSTATEEXCEPTION: Self = Self::name("java/lang/IllegalStateException");

    // Android component base types
    pub const ACTIVITY: Self = Self::name("android/app/Activity");
    pub const SERVICE: Self = Self::name("android/app/Service");
    pub const BROADCAST_RECEIVER: Self = Self::name("android/content/BroadcastReceiver");
    pub const CONTENT_PROVIDER: Self = Self::name("android/content/ContentProvider");

    // Titan runtime types
    pub const INTERCEPTABLE: Self = Self::name("com/baidu/titan/sdk/runtime/Interceptable");
    pub const INTERCEPT_RESULT: Self = Self::name("com/baidu/titan/sdk/runtime/InterceptResult");
    pub const INIT_CONTEXT: Self = Self::name("com/baidu/titan/sdk/runtime/InitContext");
    pub const BUDDY_INIT_CONTEXT: Self = Self::name("com/baidu/titan/sdk/runtime/BuddyInitContext");
    pub const BUDDY_INIT_HOLDER: Self = Self::name("com/baidu/titan/sdk/runtime/BuddyInitHolder");
    pub const FIELD_HOLDER: Self = Self::name("com/baidu/titan/sdk/runtime/FieldHolder");
    pub const TITAN_RUNTIME: Self = Self::name("com/baidu/titan/sdk/runtime/TitanRuntime");
    pub const CLINIT_INTERCEPTABLE: Self =
        Self::name("com/baidu/titan/sdk/runtime/ClassClinitInterceptable");
    pub const CLINIT_INTERCEPTOR_STORAGE: Self =
        Self::name("com/baidu/titan/sdk/runtime/ClassClinitInterceptorStorage");
    pub const DISABLE_INTERCEPT: Self =
        Self::name("com/baidu/titan/sdk/runtime/annotation/DisableIntercept");
    pub const GENESIS_TYPE: Self = Self::name("com/baidu/titan/sdk/runtime/annotation/GenesisType");
    pub const GENESIS_INIT_METHOD: Self =
        Self::name("com/baidu/titan/sdk/runtime/annotation/GenesisInitMethod");
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn package_info_names() {
        let name = BinaryName::from_string(String::from("com/example/ui/Home")).unwrap();
        assert_eq!(name.package(), "com/example/ui");
        assert_eq!(name.package_info().as_str(), "com/example/ui/package-info");

        let top_level = BinaryName::from_string(String::from("Home")).unwrap();
        assert_eq!(top_level.package(), "");
        assert_eq!(top_level.package_info().as_str(), "package-info");
    }

    #[test]
    fn invalid_names() {
        assert!(UnqualifiedName::from_string(String::from("a/b")).is_err());
        assert!(UnqualifiedName::from_string(String::new()).is_err());
        assert!(BinaryName::from_string(String::from("a//b")).is_err());
        assert!(BinaryName::from_string(String::from("a/b$genesis")).is_ok());
    }

    #[test]
    fn initializer_names_are_members_only() {
        assert!(UnqualifiedName::from_string(String::from("<init>")).is_ok());
        assert!(UnqualifiedName::from_string(String::from("<clinit>")).is_ok());
        assert!(UnqualifiedName::from_string(String::from("<run>")).is_err());
        assert!(BinaryName::from_string(String::from("a/<init>")).is_err());

        let err = UnqualifiedName::from_string(String::from("get;Value")).unwrap_err();
        assert_eq!(err, "bad member name: 'get;Value' has reserved character ';' at offset 3");
    }
}
