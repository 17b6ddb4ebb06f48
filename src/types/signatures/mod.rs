//! Generic type signatures in the JVM.
//!
//! Signatures carry the generic type information that is erased from descriptors, e.g.,
//! `(Ljava/util/Set<+Ljava/lang/Object;>;)V` for `void m(Set<? extends Object> s)`.
//!
//! See the [JVM Specification §4.7.9.1](https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7.9.1) for more information.

use std::fmt::{Display, Formatter};

use itertools::Itertools;

use crate::jvm::references::ClassRef;

use super::{
    Descriptor,
    field_type::{FieldType, PrimitiveType},
};

mod parser;

/// The variance marker of a type argument.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, derive_more::Display)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum Wildcard {
    /// No wildcard, e.g., `Set<Object>`.
    /// Types outside of a type argument list (parameters, return types, bounds) are also exact.
    #[display("=")]
    Exact,
    /// A covariant type argument, e.g., `Set<? extends Object>`.
    #[display("+")]
    Extends,
    /// A contravariant type argument, e.g., `Set<? super Object>`.
    #[display("-")]
    Super,
    /// An unbounded type argument, e.g., `Set<?>`.
    #[display("*")]
    Unbounded,
}

impl Wildcard {
    /// Returns the indicator written in front of a type argument in a signature.
    #[must_use]
    pub const fn indicator(self) -> Option<char> {
        match self {
            Self::Exact => None,
            Self::Extends => Some('+'),
            Self::Super => Some('-'),
            Self::Unbounded => Some('*'),
        }
    }
}

/// One segment of a class type signature.
/// `Ljava/util/Map<TK;TV;>.Entry<TK;TV;>;` has the segments `java/util/Map<TK;TV;>` and
/// `Entry<TK;TV;>`.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct ClassTypeSegment {
    /// The name of the segment.
    /// The first segment carries the package path, e.g., `java/util/Map`.
    pub name: String,
    /// The type arguments applied to this segment.
    pub type_arguments: Vec<TypeArgument>,
}

/// A class type in a generic signature.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct ClassType {
    /// The outermost class comes first. Never empty.
    pub segments: Vec<ClassTypeSegment>,
}

impl ClassType {
    /// Creates a class type without type arguments.
    pub fn raw(binary_name: impl Into<String>) -> Self {
        Self {
            segments: vec![ClassTypeSegment {
                name: binary_name.into(),
                type_arguments: Vec::new(),
            }],
        }
    }

    /// Returns the binary name of the class.
    /// Inner classes are joined with `$`, e.g., `java/util/Map$Entry`.
    #[must_use]
    pub fn binary_name(&self) -> String {
        self.segments.iter().map(|it| it.name.as_str()).join("$")
    }

    /// Returns a [`ClassRef`] to the erased class.
    #[must_use]
    pub fn make_ref(&self) -> ClassRef {
        ClassRef::new(self.binary_name())
    }

    /// Returns the type arguments of the innermost segment.
    #[must_use]
    pub fn type_arguments(&self) -> &[TypeArgument] {
        self.segments
            .last()
            .map(|it| it.type_arguments.as_slice())
            .unwrap_or_default()
    }
}

/// The element of a concrete type after all array dimensions are removed.
#[derive(Debug, PartialEq, Eq, Hash, Clone, derive_more::From)]
pub enum ElementType {
    /// A primitive type.
    Base(PrimitiveType),
    /// A class or interface type.
    Class(ClassType),
}

/// A type appearing in a signature together with its variance.
///
/// The tree is immutable once the parser has built it.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum TypeArgument {
    /// A primitive, class or array type.
    Concrete {
        /// The variance of the type.
        wildcard: Wildcard,
        /// The element type.
        element: ElementType,
        /// The number of array dimensions wrapping the element type.
        array_dimensions: u8,
    },
    /// A reference to a type variable, e.g., `TT;`.
    TypeVariable {
        /// The variance of the type.
        wildcard: Wildcard,
        /// The name of the type variable.
        name: String,
        /// The number of array dimensions wrapping the type variable.
        array_dimensions: u8,
    },
}

impl TypeArgument {
    /// Creates an exact concrete type.
    pub fn concrete(element: impl Into<ElementType>) -> Self {
        Self::Concrete {
            wildcard: Wildcard::Exact,
            element: element.into(),
            array_dimensions: 0,
        }
    }

    /// Creates an exact reference to a type variable.
    pub fn type_variable(name: impl Into<String>) -> Self {
        Self::TypeVariable {
            wildcard: Wildcard::Exact,
            name: name.into(),
            array_dimensions: 0,
        }
    }

    /// The placeholder standing for `?`.
    /// It is a `java/lang/Object` tagged with [`Wildcard::Unbounded`] so that consumers
    /// always get a concrete type to inspect.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::Concrete {
            wildcard: Wildcard::Unbounded,
            element: ElementType::Class(ClassType::raw(ClassRef::OBJECT)),
            array_dimensions: 0,
        }
    }

    /// Returns the variance of the type.
    #[must_use]
    pub const fn wildcard(&self) -> Wildcard {
        match self {
            Self::Concrete { wildcard, .. } | Self::TypeVariable { wildcard, .. } => *wildcard,
        }
    }

    /// Returns the number of array dimensions.
    #[must_use]
    pub const fn array_dimensions(&self) -> u8 {
        match self {
            Self::Concrete {
                array_dimensions, ..
            }
            | Self::TypeVariable {
                array_dimensions, ..
            } => *array_dimensions,
        }
    }

    /// Returns a copy of the type with a different variance.
    #[must_use]
    pub fn with_wildcard(self, wildcard: Wildcard) -> Self {
        match self {
            Self::Concrete {
                element,
                array_dimensions,
                ..
            } => Self::Concrete {
                wildcard,
                element,
                array_dimensions,
            },
            Self::TypeVariable {
                name,
                array_dimensions,
                ..
            } => Self::TypeVariable {
                wildcard,
                name,
                array_dimensions,
            },
        }
    }

    /// Wraps the type into one more array dimension.
    /// Returns [`None`] if the type already has 255 dimensions.
    #[must_use]
    pub fn into_array_type(self) -> Option<Self> {
        match self {
            Self::Concrete {
                wildcard,
                element,
                array_dimensions,
            } => array_dimensions
                .checked_add(1)
                .map(|array_dimensions| Self::Concrete {
                    wildcard,
                    element,
                    array_dimensions,
                }),
            Self::TypeVariable {
                wildcard,
                name,
                array_dimensions,
            } => array_dimensions
                .checked_add(1)
                .map(|array_dimensions| Self::TypeVariable {
                    wildcard,
                    name,
                    array_dimensions,
                }),
        }
    }

    /// Returns the type arguments of the class type, if any.
    /// Arrays expose the type arguments of their element type.
    #[must_use]
    pub fn type_arguments(&self) -> &[TypeArgument] {
        match self {
            Self::Concrete {
                element: ElementType::Class(class_type),
                ..
            } => class_type.type_arguments(),
            _ => &[],
        }
    }

    /// Returns the class type of a concrete, non-array type.
    #[must_use]
    pub fn as_class_type(&self) -> Option<&ClassType> {
        match self {
            Self::Concrete {
                element: ElementType::Class(class_type),
                array_dimensions: 0,
                ..
            } => Some(class_type),
            _ => None,
        }
    }

    /// Returns the name of the referenced type variable.
    #[must_use]
    pub fn as_type_variable(&self) -> Option<&str> {
        match self {
            Self::TypeVariable { name, .. } => Some(name),
            Self::Concrete { .. } => None,
        }
    }

    /// Returns the erased type.
    /// Type variables have no erased type on their own; see [`MethodSignature::erasure_of`].
    #[must_use]
    pub fn descriptor(&self) -> Option<FieldType> {
        match self {
            Self::Concrete {
                element,
                array_dimensions,
                ..
            } => {
                let element_type = match element {
                    ElementType::Base(it) => FieldType::Base(*it),
                    ElementType::Class(class_type) => FieldType::Object(class_type.make_ref()),
                };
                Some(FieldType::array_of(element_type, *array_dimensions))
            }
            Self::TypeVariable { .. } => None,
        }
    }
}

/// A formal type parameter, e.g., `T:Ljava/lang/Object;`.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct TypeParameter {
    /// The name of the type parameter.
    pub name: String,
    /// The class bound. It is absent when the only bounds are interfaces.
    pub class_bound: Option<TypeArgument>,
    /// The interface bounds.
    pub interface_bounds: Vec<TypeArgument>,
}

impl TypeParameter {
    /// Returns all the bounds in declaration order.
    pub fn bounds(&self) -> impl Iterator<Item = &TypeArgument> {
        self.class_bound.iter().chain(self.interface_bounds.iter())
    }
}

/// The return type in a method signature.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum GenericReturnType {
    /// The method returns a value of the given type.
    Some(TypeArgument),
    /// The method returns `void`.
    Void,
}

/// A parsed method signature.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct MethodSignature {
    /// The formal type parameters.
    pub type_parameters: Vec<TypeParameter>,
    /// The types of the parameters.
    pub parameter_types: Vec<TypeArgument>,
    /// The return type.
    pub return_type: GenericReturnType,
    /// The types in the `throws` clause.
    pub exception_types: Vec<TypeArgument>,
}

/// Upper bound on the chain `T extends U extends ...` followed by [`erase`].
const MAX_ERASURE_DEPTH: usize = 64;

/// Erases a type variable to the erased type of its first bound.
fn erase(type_parameters: &[TypeParameter], name: &str) -> FieldType {
    let mut name = name;
    for _ in 0..MAX_ERASURE_DEPTH {
        let Some(first_bound) = type_parameters
            .iter()
            .find(|it| it.name == name)
            .and_then(|it| it.bounds().next())
        else {
            break;
        };
        match first_bound {
            TypeArgument::TypeVariable {
                name: bound_name,
                array_dimensions: 0,
                ..
            } => name = bound_name,
            bound => return bound.descriptor().unwrap_or_else(FieldType::object),
        }
    }
    FieldType::object()
}

impl MethodSignature {
    /// Returns the names of the formal type parameters in declaration order.
    pub fn type_parameter_names(&self) -> impl Iterator<Item = &str> {
        self.type_parameters.iter().map(|it| it.name.as_str())
    }

    /// Returns the erased type of a type variable declared by this method.
    /// Undeclared type variables (e.g., the ones declared by the enclosing class) erase to
    /// `java/lang/Object`.
    #[must_use]
    pub fn erasure_of(&self, type_variable: &str) -> FieldType {
        erase(&self.type_parameters, type_variable)
    }
}

/// A parsed field signature.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct FieldSignature {
    /// The type of the field.
    pub field_type: TypeArgument,
}

/// A parsed class signature.
#[instability::unstable(feature = "class-signatures")]
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct ClassSignature {
    /// The formal type parameters.
    pub type_parameters: Vec<TypeParameter>,
    /// The superclass.
    pub super_class: ClassType,
    /// The implemented interfaces.
    pub interfaces: Vec<ClassType>,
}

/// An error indicating that a signature does not follow the grammar.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
#[error("Malformed signature `{signature}` at {position}: {kind}")]
pub struct MalformedSignature {
    /// The text being parsed.
    pub signature: String,
    /// The byte offset where parsing stopped.
    pub position: usize,
    /// What went wrong.
    pub kind: MalformedKind,
}

/// The reasons for a [`MalformedSignature`].
#[derive(Debug, PartialEq, Eq, Clone, Copy, derive_more::Display)]
pub enum MalformedKind {
    /// The signature ends in the middle of a construct.
    #[display("unexpected end of signature")]
    PrematureEnd,
    /// A character cannot start or continue the construct at the position.
    #[display("unexpected character `{_0}`")]
    UnexpectedCharacter(char),
    /// The signature has data after a complete construct.
    #[display("unexpected data after the end of signature")]
    TrailingData,
    /// An array type has more than 255 dimensions.
    #[display("too many array dimensions")]
    TooManyDimensions,
    /// Type argument lists are nested deeper than the parser accepts.
    #[display("type arguments nested too deeply")]
    TooDeeplyNested,
}

impl Display for ClassType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "L")?;
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", segment.name)?;
            if !segment.type_arguments.is_empty() {
                write!(f, "<{}>", segment.type_arguments.iter().join(""))?;
            }
        }
        write!(f, ";")
    }
}

impl Display for TypeArgument {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.wildcard() == Wildcard::Unbounded {
            return write!(f, "*");
        }
        if let Some(indicator) = self.wildcard().indicator() {
            write!(f, "{indicator}")?;
        }
        write!(f, "{}", "[".repeat(usize::from(self.array_dimensions())))?;
        match self {
            Self::Concrete {
                element: ElementType::Base(it),
                ..
            } => write!(f, "{}", it.descriptor()),
            Self::Concrete {
                element: ElementType::Class(class_type),
                ..
            } => class_type.fmt(f),
            Self::TypeVariable { name, .. } => write!(f, "T{name};"),
        }
    }
}

impl Display for TypeParameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:", self.name)?;
        if let Some(class_bound) = &self.class_bound {
            class_bound.fmt(f)?;
        }
        for interface_bound in &self.interface_bounds {
            write!(f, ":{interface_bound}")?;
        }
        Ok(())
    }
}

fn fmt_type_parameters(
    type_parameters: &[TypeParameter],
    f: &mut Formatter<'_>,
) -> std::fmt::Result {
    if type_parameters.is_empty() {
        Ok(())
    } else {
        write!(f, "<{}>", type_parameters.iter().join(""))
    }
}

impl Display for GenericReturnType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Some(it) => it.fmt(f),
            Self::Void => write!(f, "V"),
        }
    }
}

impl Display for MethodSignature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fmt_type_parameters(&self.type_parameters, f)?;
        write!(
            f,
            "({}){}",
            self.parameter_types.iter().join(""),
            self.return_type
        )?;
        for exception_type in &self.exception_types {
            write!(f, "^{exception_type}")?;
        }
        Ok(())
    }
}

impl Display for FieldSignature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.field_type.fmt(f)
    }
}

impl Display for ClassSignature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fmt_type_parameters(&self.type_parameters, f)?;
        self.super_class.fmt(f)?;
        for interface in &self.interfaces {
            interface.fmt(f)?;
        }
        Ok(())
    }
}
