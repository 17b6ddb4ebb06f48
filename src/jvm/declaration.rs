//! Metadata of member declarations as seen by the nullness analyses.
//!
//! The host that reads class files fills these structures with the raw strings found in the
//! `Signature`, `RuntimeVisibleAnnotations` and `RuntimeVisibleTypeAnnotations` attributes.

use std::str::FromStr;

use crate::{
    macros::see_jvm_spec,
    types::{
        field_type::FieldType,
        method_descriptor::{InvalidDescriptor, MethodDescriptor, ReturnType},
    },
};

use super::references::{ClassRef, FieldRef, MemberRef, MethodRef};

/// The location of a type annotation inside the declaration of a member.
#[doc = see_jvm_spec!(4, 7, 20, 1)]
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum TypeUseTarget {
    /// The return type of a method.
    Return,
    /// The type of a field.
    Field,
    /// The receiver type of a method.
    Receiver,
    /// The type of a formal parameter of a method.
    FormalParameter(u8),
    /// A bound of a formal type parameter of a method.
    TypeParameterBound {
        /// The index of the type parameter.
        type_parameter: u8,
        /// The index of the bound.
        bound: u8,
    },
}

/// Identifies a part of a type that is annotated.
#[doc = see_jvm_spec!(4, 7, 20, 2)]
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum TypePathElement {
    /// Annotation is deeper in an array type.
    Array,
    /// Annotation is deeper in a nested type.
    Nested,
    /// Annotation is on the bound of a wildcard type argument of a parameterized type.
    Bound,
    /// Annotation is on a type argument of a parameterized type.
    TypeArgument(u8),
}

/// An annotation on a type use.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct TypeAnnotation {
    /// Which type in the declaration is annotated.
    pub target: TypeUseTarget,
    /// The path to the annotated part of the type. Empty for the type itself.
    pub type_path: Vec<TypePathElement>,
    /// The type of the annotation, in any of the source, binary or descriptor spellings.
    pub annotation_type: String,
}

impl TypeAnnotation {
    /// Creates an annotation on the target type itself.
    pub fn new(target: TypeUseTarget, annotation_type: impl Into<String>) -> Self {
        Self {
            target,
            type_path: Vec::new(),
            annotation_type: annotation_type.into(),
        }
    }

    /// Creates an annotation on a part of the target type.
    pub fn with_path(
        target: TypeUseTarget,
        type_path: impl Into<Vec<TypePathElement>>,
        annotation_type: impl Into<String>,
    ) -> Self {
        Self {
            target,
            type_path: type_path.into(),
            annotation_type: annotation_type.into(),
        }
    }
}

/// The declaration of a method.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct MethodDeclaration {
    /// The identity of the method.
    pub method: MethodRef,
    /// The generic signature, if the method has one.
    pub signature: Option<String>,
    /// The types of the annotations on the method, in declaration order.
    pub annotations: Vec<String>,
    /// The type annotations in the method declaration.
    pub type_annotations: Vec<TypeAnnotation>,
}

impl MethodDeclaration {
    /// Creates a declaration without signature and annotations.
    ///
    /// # Errors
    /// See [`InvalidDescriptor`].
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: &str,
    ) -> Result<Self, InvalidDescriptor> {
        Ok(Self {
            method: MethodRef {
                owner: ClassRef::new(owner),
                name: name.into(),
                descriptor: MethodDescriptor::from_str(descriptor)?,
            },
            signature: None,
            annotations: Vec::new(),
            type_annotations: Vec::new(),
        })
    }

    /// Sets the generic signature.
    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Adds an annotation on the method.
    #[must_use]
    pub fn with_annotation(mut self, annotation_type: impl Into<String>) -> Self {
        self.annotations.push(annotation_type.into());
        self
    }

    /// Adds a type annotation.
    #[must_use]
    pub fn with_type_annotation(mut self, type_annotation: TypeAnnotation) -> Self {
        self.type_annotations.push(type_annotation);
        self
    }
}

/// The declaration of a field.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct FieldDeclaration {
    /// The identity of the field.
    pub field: FieldRef,
    /// The generic signature, if the field has one.
    pub signature: Option<String>,
    /// The types of the annotations on the field, in declaration order.
    pub annotations: Vec<String>,
    /// The type annotations in the field declaration.
    pub type_annotations: Vec<TypeAnnotation>,
}

impl FieldDeclaration {
    /// Creates a declaration without signature and annotations.
    ///
    /// # Errors
    /// See [`InvalidDescriptor`].
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: &str,
    ) -> Result<Self, InvalidDescriptor> {
        Ok(Self {
            field: FieldRef {
                owner: ClassRef::new(owner),
                name: name.into(),
                field_type: FieldType::from_str(descriptor)?,
            },
            signature: None,
            annotations: Vec::new(),
            type_annotations: Vec::new(),
        })
    }

    /// Sets the generic signature.
    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Adds an annotation on the field.
    #[must_use]
    pub fn with_annotation(mut self, annotation_type: impl Into<String>) -> Self {
        self.annotations.push(annotation_type.into());
        self
    }

    /// Adds a type annotation.
    #[must_use]
    pub fn with_type_annotation(mut self, type_annotation: TypeAnnotation) -> Self {
        self.type_annotations.push(type_annotation);
        self
    }
}

/// A member declaration whose nullness can be resolved.
#[derive(Debug, PartialEq, Eq, Hash, Clone, derive_more::From)]
pub enum Declaration {
    /// A method.
    Method(MethodDeclaration),
    /// A field.
    Field(FieldDeclaration),
}

impl Declaration {
    /// Returns the identity of the declaration.
    #[must_use]
    pub fn make_ref(&self) -> MemberRef {
        match self {
            Self::Method(it) => MemberRef::Method(it.method.clone()),
            Self::Field(it) => MemberRef::Field(it.field.clone()),
        }
    }

    /// Returns the class declaring the member.
    #[must_use]
    pub const fn owner(&self) -> &ClassRef {
        match self {
            Self::Method(it) => &it.method.owner,
            Self::Field(it) => &it.field.owner,
        }
    }

    /// Returns the annotations on the declaration.
    #[must_use]
    pub fn annotations(&self) -> &[String] {
        match self {
            Self::Method(it) => &it.annotations,
            Self::Field(it) => &it.annotations,
        }
    }

    /// Returns the type annotations in the declaration.
    #[must_use]
    pub fn type_annotations(&self) -> &[TypeAnnotation] {
        match self {
            Self::Method(it) => &it.type_annotations,
            Self::Field(it) => &it.type_annotations,
        }
    }

    /// Returns the erased type of the value the declaration produces:
    /// the return type of a method or the type of a field.
    #[must_use]
    pub fn value_type(&self) -> ReturnType {
        match self {
            Self::Method(it) => it.method.descriptor.return_type.clone(),
            Self::Field(it) => ReturnType::Some(it.field.field_type.clone()),
        }
    }

    /// Returns the [`TypeUseTarget`] of the value type.
    #[must_use]
    pub const fn value_target(&self) -> TypeUseTarget {
        match self {
            Self::Method(_) => TypeUseTarget::Return,
            Self::Field(_) => TypeUseTarget::Field,
        }
    }
}
