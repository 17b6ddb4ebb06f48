//! Erased JVM field types.

use std::str::FromStr;

use itertools::Itertools;

use crate::{jvm::references::ClassRef, macros::see_jvm_spec};

use super::{Descriptor, method_descriptor::InvalidDescriptor};

/// A primitive type in Java.
#[doc = see_jvm_spec!(4, 3, 2)]
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, derive_more::Display)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum PrimitiveType {
    /// The `boolean` type.
    #[display("boolean")]
    Boolean,
    /// The `char` type.
    #[display("char")]
    Char,
    /// The `float` type.
    #[display("float")]
    Float,
    /// The `double` type.
    #[display("double")]
    Double,
    /// The `byte` type.
    #[display("byte")]
    Byte,
    /// The `short` type.
    #[display("short")]
    Short,
    /// The `int` type.
    #[display("int")]
    Int,
    /// The `long` type.
    #[display("long")]
    Long,
}

impl TryFrom<char> for PrimitiveType {
    type Error = InvalidDescriptor;

    fn try_from(descriptor: char) -> Result<Self, Self::Error> {
        match descriptor {
            'Z' => Ok(Self::Boolean),
            'C' => Ok(Self::Char),
            'F' => Ok(Self::Float),
            'D' => Ok(Self::Double),
            'B' => Ok(Self::Byte),
            'S' => Ok(Self::Short),
            'I' => Ok(Self::Int),
            'J' => Ok(Self::Long),
            _ => Err(InvalidDescriptor),
        }
    }
}

impl PrimitiveType {
    /// Returns the single-character descriptor of the primitive type.
    #[must_use]
    pub const fn descriptor_char(self) -> char {
        match self {
            Self::Boolean => 'Z',
            Self::Char => 'C',
            Self::Float => 'F',
            Self::Double => 'D',
            Self::Byte => 'B',
            Self::Short => 'S',
            Self::Int => 'I',
            Self::Long => 'J',
        }
    }
}

impl Descriptor for PrimitiveType {
    fn descriptor(&self) -> String {
        self.descriptor_char().to_string()
    }
}

/// The type of a field, a parameter, a local variable, or a value.
#[doc = see_jvm_spec!(4, 3, 2)]
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, derive_more::IsVariant)]
pub enum FieldType {
    /// A primitive type.
    Base(PrimitiveType),
    /// A class or interface type.
    Object(ClassRef),
    /// An array type.
    Array(Box<FieldType>),
}

impl FieldType {
    /// The type of `java.lang.Object`.
    #[must_use]
    pub fn object() -> Self {
        Self::Object(ClassRef::new(ClassRef::OBJECT))
    }

    /// Creates an array type with the given element type and number of dimensions.
    #[must_use]
    pub fn array_of(element_type: FieldType, dimensions: u8) -> Self {
        (0..dimensions).fold(element_type, |inner, _| inner.into_array_type())
    }

    /// Wraps the type into a one-dimensional array of it.
    #[must_use]
    pub fn into_array_type(self) -> Self {
        Self::Array(Box::new(self))
    }

    /// Checks whether a value of this type is a reference, i.e., whether it can be `null`.
    #[must_use]
    pub const fn is_reference(&self) -> bool {
        !matches!(self, Self::Base(_))
    }

    /// Returns the component type if this is an array type.
    /// For `[[I` the component type is `[I`.
    #[must_use]
    pub fn component_type(&self) -> Option<&FieldType> {
        match self {
            Self::Array(inner) => Some(inner),
            _ => None,
        }
    }

    /// Returns the element type of an array type after removing all the dimensions.
    /// Non-array types are their own element type.
    #[must_use]
    pub fn element_type(&self) -> &FieldType {
        match self {
            Self::Array(inner) => inner.element_type(),
            it => it,
        }
    }

    /// Returns the number of array dimensions.
    #[must_use]
    pub fn array_dimensions(&self) -> usize {
        match self {
            Self::Array(inner) => 1 + inner.array_dimensions(),
            _ => 0,
        }
    }
}

impl Descriptor for FieldType {
    fn descriptor(&self) -> String {
        match self {
            Self::Base(it) => it.descriptor(),
            Self::Object(ClassRef { binary_name }) => format!("L{binary_name};"),
            Self::Array(inner) => format!("[{}", inner.descriptor()),
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Base(it) => it.fmt(f),
            Self::Object(it) => write!(f, "{}", it.binary_name.replace('/', ".")),
            Self::Array(inner) => write!(f, "{inner}[]"),
        }
    }
}

impl FromStr for FieldType {
    type Err = InvalidDescriptor;

    fn from_str(descriptor: &str) -> Result<Self, Self::Err> {
        let mut chars = descriptor.chars();
        let field_type = Self::parse_prefix(&mut chars)?;
        match chars.next() {
            None => Ok(field_type),
            Some(_) => Err(InvalidDescriptor),
        }
    }
}

impl FieldType {
    /// Parses one field type from the front of `remaining` and advances it past the type.
    /// Array dimensions are counted in a loop, and more than 255 of them are rejected.
    pub(crate) fn parse_prefix(
        remaining: &mut std::str::Chars<'_>,
    ) -> Result<Self, InvalidDescriptor> {
        let mut dimensions: u8 = 0;
        let prefix = loop {
            match remaining.next().ok_or(InvalidDescriptor)? {
                '[' => dimensions = dimensions.checked_add(1).ok_or(InvalidDescriptor)?,
                other => break other,
            }
        };
        let element_type = if let Ok(p) = PrimitiveType::try_from(prefix) {
            Self::Base(p)
        } else if prefix == 'L' {
            let binary_name: String = remaining.take_while_ref(|c| *c != ';').collect();
            match remaining.next() {
                Some(';') if !binary_name.is_empty() => Self::Object(ClassRef::new(binary_name)),
                _ => return Err(InvalidDescriptor),
            }
        } else {
            return Err(InvalidDescriptor);
        };
        Ok(Self::array_of(element_type, dimensions))
    }
}
