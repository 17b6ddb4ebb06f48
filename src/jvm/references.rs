//! References to JVM elements.
use std::fmt::Display;

use crate::types::{field_type::FieldType, method_descriptor::MethodDescriptor};

/// A reference to a class.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash)]
pub struct ClassRef {
    /// The binary name of the class.
    pub binary_name: String,
}

impl ClassRef {
    /// The binary name of `java.lang.Object`.
    pub const OBJECT: &'static str = "java/lang/Object";

    /// Creates a new [`ClassRef`] from a binary name.
    pub fn new<S: Into<String>>(binary_name: S) -> Self {
        ClassRef {
            binary_name: binary_name.into(),
        }
    }

    /// Returns the package containing the class.
    #[must_use]
    pub fn package(&self) -> PackageRef {
        let package_name = self
            .binary_name
            .rsplit_once('/')
            .map(|(package, _)| package)
            .unwrap_or_default();
        PackageRef::new(package_name)
    }
}

impl Display for ClassRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.binary_name)
    }
}

/// A reference to a field.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
pub struct FieldRef {
    /// A reference to the class that contains the field.
    pub owner: ClassRef,
    /// The name of the field.
    pub name: String,
    /// The type of the field.
    pub field_type: FieldType,
}

impl Display for FieldRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.owner, self.name)
    }
}

/// A reference to a method.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
pub struct MethodRef {
    /// The reference to the class containing the method.
    pub owner: ClassRef,
    /// The name of the method.
    pub name: String,
    /// The descriptor of the method.
    pub descriptor: MethodDescriptor,
}

impl Display for MethodRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}{}", self.owner, self.name, self.descriptor)
    }
}

/// A reference to a package.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash)]
pub struct PackageRef {
    /// The binary name of the package, e.g., `java/lang`.
    /// The unnamed package has an empty name.
    pub binary_name: String,
}

impl PackageRef {
    /// The simple name of the class holding package annotations.
    pub const PACKAGE_INFO: &'static str = "package-info";

    /// Creates a new [`PackageRef`] from a binary name.
    pub fn new<S: Into<String>>(binary_name: S) -> Self {
        PackageRef {
            binary_name: binary_name.into(),
        }
    }

    /// Returns the `package-info` class of the package.
    #[must_use]
    pub fn package_info(&self) -> ClassRef {
        if self.binary_name.is_empty() {
            ClassRef::new(Self::PACKAGE_INFO)
        } else {
            ClassRef::new(format!("{}/{}", self.binary_name, Self::PACKAGE_INFO))
        }
    }
}

impl Display for PackageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.binary_name)
    }
}

/// The identity of a declaration whose nullness can be resolved.
#[derive(
    Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, derive_more::From, derive_more::Display,
)]
pub enum MemberRef {
    /// A method.
    Method(MethodRef),
    /// A field.
    Field(FieldRef),
}

impl MemberRef {
    /// Returns the class declaring the member.
    #[must_use]
    pub const fn owner(&self) -> &ClassRef {
        match self {
            Self::Method(it) => &it.owner,
            Self::Field(it) => &it.owner,
        }
    }
}
