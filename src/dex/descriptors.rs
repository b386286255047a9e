use super::{BinaryName, Error, Name};
use crate::util::Width;

/// Dex type descriptors can nest arrays at most this deep
pub const MAX_ARRAY_DIMENSIONS: usize = 255;

/// Conversion of types to their descriptor strings
pub trait RenderDescriptor {
    fn render(&self) -> String {
        let mut string = String::new();
        self.render_to(&mut string);
        string
    }

    fn render_to(&self, write_to: &mut String);
}

/// Conversion of descriptor strings to types
pub trait ParseDescriptor: Sized {
    /// Parse a complete descriptor (trailing characters are an error)
    fn parse(source: &str) -> Result<Self, Error> {
        let mut reader = DescriptorReader::new(source);
        let parsed = Self::read(&mut reader)?;
        if reader.peek().is_some() {
            return Err(reader.error("trailing characters"));
        }
        Ok(parsed)
    }

    /// Parse a descriptor from the front of the reader
    fn read(reader: &mut DescriptorReader<'_>) -> Result<Self, Error>;
}

/// Cursor over a descriptor string
///
/// Every character the grammar cares about is ASCII, so the reader works on bytes and only ever
/// slices the source at ASCII positions.
pub struct DescriptorReader<'s> {
    source: &'s str,
    position: usize,
}

impl<'s> DescriptorReader<'s> {
    pub fn new(source: &'s str) -> DescriptorReader<'s> {
        DescriptorReader {
            source,
            position: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.source.as_bytes().get(self.position).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let next = self.peek()?;
        self.position += 1;
        Some(next)
    }

    fn expect(&mut self, expected: u8, reason: &'static str) -> Result<(), Error> {
        if self.peek() == Some(expected) {
            self.position += 1;
            Ok(())
        } else {
            Err(self.error(reason))
        }
    }

    /// Everything up to (and excluding) the next `terminator`, which gets consumed
    fn take_until(&mut self, terminator: u8, reason: &'static str) -> Result<&'s str, Error> {
        let rest = &self.source.as_bytes()[self.position..];
        let length = rest
            .iter()
            .position(|byte| *byte == terminator)
            .ok_or_else(|| self.error(reason))?;
        let taken = &self.source[self.position..self.position + length];
        self.position += length + 1;
        Ok(taken)
    }

    fn error(&self, reason: &'static str) -> Error {
        Error::BadDescriptor {
            descriptor: self.source.to_owned(),
            position: self.position,
            reason,
        }
    }
}

/// Primitive value types
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BaseType {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl Width for BaseType {
    fn width(&self) -> usize {
        match self {
            BaseType::Long | BaseType::Double => 2,
            _ => 1,
        }
    }
}

impl BaseType {
    /// One character type code (which is also the descriptor)
    pub const fn short_descriptor(&self) -> char {
        match self {
            BaseType::Boolean => 'Z',
            BaseType::Byte => 'B',
            BaseType::Short => 'S',
            BaseType::Char => 'C',
            BaseType::Int => 'I',
            BaseType::Long => 'J',
            BaseType::Float => 'F',
            BaseType::Double => 'D',
        }
    }

    const fn from_code(code: u8) -> Option<BaseType> {
        Some(match code {
            b'Z' => BaseType::Boolean,
            b'B' => BaseType::Byte,
            b'S' => BaseType::Short,
            b'C' => BaseType::Char,
            b'I' => BaseType::Int,
            b'J' => BaseType::Long,
            b'F' => BaseType::Float,
            b'D' => BaseType::Double,
            _ => return None,
        })
    }

    /// Class used to box values of this type
    pub const fn boxed_class(&self) -> BinaryName {
        match self {
            BaseType::Boolean => BinaryName::BOOLEAN,
            BaseType::Byte => BinaryName::BYTE,
            BaseType::Short => BinaryName::SHORT,
            BaseType::Char => BinaryName::CHARACTER,
            BaseType::Int => BinaryName::INTEGER,
            BaseType::Long => BinaryName::LONG,
            BaseType::Float => BinaryName::FLOAT,
            BaseType::Double => BinaryName::DOUBLE,
        }
    }
}

impl RenderDescriptor for BaseType {
    fn render_to(&self, write_to: &mut String) {
        write_to.push(self.short_descriptor());
    }
}

impl ParseDescriptor for BaseType {
    fn read(reader: &mut DescriptorReader<'_>) -> Result<Self, Error> {
        match reader.peek().and_then(BaseType::from_code) {
            Some(base_type) => {
                reader.bump();
                Ok(base_type)
            }
            None => Err(reader.error("expected a primitive type")),
        }
    }
}

impl RenderDescriptor for BinaryName {
    fn render_to(&self, write_to: &mut String) {
        write_to.push('L');
        write_to.push_str(self.as_str());
        write_to.push(';');
    }
}

impl ParseDescriptor for BinaryName {
    fn read(reader: &mut DescriptorReader<'_>) -> Result<Self, Error> {
        reader.expect(b'L', "expected a class type")?;
        let start = reader.position;
        let name = reader.take_until(b';', "unterminated class type")?;
        BinaryName::from_string(name.to_owned()).map_err(|_| {
            reader.position = start;
            reader.error("invalid class name")
        })
    }
}

/// Reference type
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum RefType<Class> {
    Object(Class),
    Array(Box<FieldType<Class>>),
}

impl<C> RefType<C> {
    pub fn array(element_type: FieldType<C>) -> RefType<C> {
        RefType::Array(Box::new(element_type))
    }

    /// Number of array dimensions (zero for class types)
    pub fn dimensions(&self) -> usize {
        match self {
            RefType::Object(_) => 0,
            RefType::Array(element_type) => match element_type.as_ref() {
                FieldType::Ref(element_type) => 1 + element_type.dimensions(),
                FieldType::Base(_) => 1,
            },
        }
    }
}

impl RefType<BinaryName> {
    pub const OBJECT: RefType<BinaryName> = RefType::Object(BinaryName::OBJECT);

    /// `java.lang.Object[]`
    pub fn object_array() -> RefType<BinaryName> {
        RefType::array(FieldType::OBJECT)
    }
}

impl<C: RenderDescriptor> RenderDescriptor for RefType<C> {
    fn render_to(&self, write_to: &mut String) {
        match self {
            RefType::Object(class) => class.render_to(write_to),
            RefType::Array(element_type) => {
                write_to.push('[');
                element_type.render_to(write_to);
            }
        }
    }
}

impl<C: ParseDescriptor> ParseDescriptor for RefType<C> {
    fn read(reader: &mut DescriptorReader<'_>) -> Result<Self, Error> {
        let mut dimensions = 0;
        while reader.peek() == Some(b'[') {
            reader.bump();
            dimensions += 1;
            if dimensions > MAX_ARRAY_DIMENSIONS {
                return Err(reader.error("too many array dimensions"));
            }
        }

        let mut ref_type = if dimensions == 0 {
            RefType::Object(C::read(reader)?)
        } else {
            RefType::array(FieldType::read(reader)?)
        };
        for _ in 1..dimensions {
            ref_type = RefType::array(FieldType::Ref(ref_type));
        }
        Ok(ref_type)
    }
}

/// Type of a field, parameter, or return value
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum FieldType<Class> {
    Base(BaseType),
    Ref(RefType<Class>),
}

impl<C> Width for FieldType<C> {
    fn width(&self) -> usize {
        match self {
            FieldType::Base(base_type) => base_type.width(),
            FieldType::Ref(_) => 1,
        }
    }
}

impl<C> FieldType<C> {
    pub fn array(element_type: FieldType<C>) -> FieldType<C> {
        FieldType::Ref(RefType::array(element_type))
    }

    pub const fn object(class_name: C) -> FieldType<C> {
        FieldType::Ref(RefType::Object(class_name))
    }

    pub const fn int() -> FieldType<C> {
        FieldType::Base(BaseType::Int)
    }

    pub const fn long() -> FieldType<C> {
        FieldType::Base(BaseType::Long)
    }

    pub const fn double() -> FieldType<C> {
        FieldType::Base(BaseType::Double)
    }

    /// Does this type take two registers?
    pub fn is_wide(&self) -> bool {
        self.width() == 2
    }

    /// One character type code, with arrays and objects collapsed to `L`
    pub fn short_descriptor(&self) -> char {
        match self {
            FieldType::Base(base_type) => base_type.short_descriptor(),
            FieldType::Ref(_) => 'L',
        }
    }
}

impl FieldType<BinaryName> {
    pub const OBJECT: FieldType<BinaryName> = FieldType::object(BinaryName::OBJECT);
    pub const STRING: FieldType<BinaryName> = FieldType::object(BinaryName::STRING);

    /// Is this exactly `java.lang.Object`?
    pub fn is_object(&self) -> bool {
        self == &FieldType::OBJECT
    }
}

impl<C: RenderDescriptor> RenderDescriptor for FieldType<C> {
    fn render_to(&self, write_to: &mut String) {
        match self {
            FieldType::Base(base_type) => base_type.render_to(write_to),
            FieldType::Ref(ref_type) => ref_type.render_to(write_to),
        }
    }
}

impl<C: ParseDescriptor> ParseDescriptor for FieldType<C> {
    fn read(reader: &mut DescriptorReader<'_>) -> Result<Self, Error> {
        match reader.peek() {
            Some(b'L' | b'[') => RefType::read(reader).map(FieldType::Ref),
            Some(_) => BaseType::read(reader).map(FieldType::Base),
            None => Err(reader.error("missing type")),
        }
    }
}

/// Signature of a method
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct MethodDescriptor<Class> {
    pub parameters: Vec<FieldType<Class>>,

    /// `None` for `void`
    pub return_type: Option<FieldType<Class>>,
}

impl<C> MethodDescriptor<C> {
    /// Number of parameter registers (wide types take two)
    pub fn parameter_length(&self, has_this_param: bool) -> usize {
        let this_param = usize::from(has_this_param);
        this_param + self.parameters.iter().map(Width::width).sum::<usize>()
    }

    /// Short form of the parameter list: one character per parameter, arrays and objects
    /// collapsed to `L`, and `V` for an empty list
    pub fn short_parameters(&self) -> String {
        if self.parameters.is_empty() {
            String::from("V")
        } else {
            self.parameters
                .iter()
                .map(FieldType::short_descriptor)
                .collect()
        }
    }
}

impl MethodDescriptor<BinaryName> {
    pub fn void(parameters: Vec<FieldType<BinaryName>>) -> Self {
        MethodDescriptor {
            parameters,
            return_type: None,
        }
    }
}

impl<C: RenderDescriptor> RenderDescriptor for MethodDescriptor<C> {
    fn render_to(&self, write_to: &mut String) {
        write_to.push('(');
        for parameter in &self.parameters {
            parameter.render_to(write_to);
        }
        write_to.push(')');
        match &self.return_type {
            None => write_to.push('V'),
            Some(typ) => typ.render_to(write_to),
        };
    }
}

impl<C: ParseDescriptor> ParseDescriptor for MethodDescriptor<C> {
    fn read(reader: &mut DescriptorReader<'_>) -> Result<Self, Error> {
        reader.expect(b'(', "expected '(' to open the parameters")?;
        let mut parameters = vec![];
        loop {
            match reader.peek() {
                Some(b')') => break,
                None => return Err(reader.error("unterminated parameter list")),
                Some(_) => parameters.push(FieldType::read(reader)?),
            }
        }
        reader.bump();

        let return_type = if reader.peek() == Some(b'V') {
            reader.bump();
            None
        } else {
            Some(FieldType::read(reader)?)
        };
        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    type Descriptor = MethodDescriptor<BinaryName>;

    #[test]
    fn parse_method_descriptor() {
        let descriptor = Descriptor::parse("(IJ[Ljava/lang/String;[[D)Ljava/lang/Object;").unwrap();
        assert_eq!(
            descriptor.parameters,
            vec![
                FieldType::int(),
                FieldType::long(),
                FieldType::array(FieldType::STRING),
                FieldType::array(FieldType::array(FieldType::double())),
            ]
        );
        assert_eq!(descriptor.return_type, Some(FieldType::OBJECT));
        assert_eq!(
            descriptor.render(),
            "(IJ[Ljava/lang/String;[[D)Ljava/lang/Object;"
        );
    }

    #[test]
    fn errors_point_at_the_offending_character() {
        let position = |source: &str| match Descriptor::parse(source) {
            Err(Error::BadDescriptor { position, .. }) => position,
            other => panic!("expected a bad descriptor, got {:?}", other),
        };
        assert_eq!(position("(I"), 2);
        assert_eq!(position("I)V"), 0);
        assert_eq!(position("(Ljava/lang/String)V"), 2);
        assert_eq!(position("(Q)V"), 1);
        assert_eq!(position("()VV"), 3);
        assert_eq!(position("(La//b;)V"), 2);
    }

    #[test]
    fn array_dimensions_are_bounded() {
        let deepest = format!("{}I", "[".repeat(MAX_ARRAY_DIMENSIONS));
        let parsed = FieldType::<BinaryName>::parse(&deepest).unwrap();
        match &parsed {
            FieldType::Ref(ref_type) => assert_eq!(ref_type.dimensions(), MAX_ARRAY_DIMENSIONS),
            FieldType::Base(_) => panic!("expected an array"),
        }
        assert_eq!(parsed.render(), deepest);

        let too_deep = format!("[{}", deepest);
        assert!(FieldType::<BinaryName>::parse(&too_deep).is_err());
    }

    #[test]
    fn parameter_slots_count_wide_types_twice() {
        let descriptor = Descriptor::parse("(JILjava/lang/Object;D)V").unwrap();
        assert_eq!(descriptor.parameter_length(false), 6);
        assert_eq!(descriptor.parameter_length(true), 7);
    }

    #[test]
    fn short_parameters_collapse_references() {
        let descriptor = Descriptor::parse("(I[ILjava/lang/String;ZJ)V").unwrap();
        assert_eq!(descriptor.short_parameters(), "ILLZJ");
        assert_eq!(Descriptor::parse("()I").unwrap().short_parameters(), "V");
    }
}
