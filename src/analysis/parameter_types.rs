//! Resolving the declared types of method parameters.
//!
//! Methods compiled with generic information carry a signature next to their erased
//! descriptor. The [`ParameterTypeResolver`] picks the richer source once per method and
//! answers the type of every parameter from it.

use std::str::FromStr;

use crate::{
    jvm::declaration::MethodDeclaration,
    types::{
        field_type::FieldType,
        method_descriptor::{InvalidDescriptor, MethodDescriptor},
        signatures::{MalformedSignature, MethodSignature, TypeArgument},
    },
};

/// An error that occurs when resolving parameter types.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
pub enum Error {
    /// The requested parameter does not exist.
    #[error("The method has only {count} parameters but the parameter #{index} is requested")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The number of parameters.
        count: usize,
    },
    /// The requested type parameter bound does not exist.
    #[error("The method has no bound #{bound} on the type parameter #{type_parameter}")]
    BoundOutOfRange {
        /// The requested type parameter index.
        type_parameter: usize,
        /// The requested bound index.
        bound: usize,
    },
    /// The signature cannot be parsed.
    #[error(transparent)]
    MalformedSignature(#[from] MalformedSignature),
    /// The descriptor cannot be parsed.
    #[error("Fail to parse descriptor: {0}")]
    InvalidDescriptor(#[from] InvalidDescriptor),
    /// The signature and the descriptor disagree on the number of parameters.
    #[error(
        "The signature declares {signature} parameters but the descriptor declares {descriptor}"
    )]
    ParameterCountMismatch {
        /// The number of parameters in the signature.
        signature: usize,
        /// The number of parameters in the descriptor.
        descriptor: usize,
    },
}

/// The declared type of a parameter.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct ParameterType {
    /// The erased type of the parameter.
    pub base_type: FieldType,
    /// The type arguments applied to the parameter type. Empty for non-generic types.
    pub type_arguments: Vec<TypeArgument>,
}

#[derive(Debug, Clone)]
enum Source {
    Signature(MethodSignature),
    Descriptor(Vec<FieldType>),
}

/// Resolves the declared types of the parameters of one method.
#[derive(Debug, Clone)]
pub struct ParameterTypeResolver {
    source: Source,
}

impl ParameterTypeResolver {
    /// Creates a resolver for a method with the given descriptor and optional signature.
    ///
    /// # Errors
    /// - [`Error::MalformedSignature`] if the signature cannot be parsed. The caller should
    ///   use a resolver built without the signature instead.
    /// - [`Error::ParameterCountMismatch`] if the signature and the descriptor disagree.
    pub fn new(descriptor: &MethodDescriptor, signature: Option<&str>) -> Result<Self, Error> {
        let Some(signature) = signature else {
            return Ok(Self {
                source: Source::Descriptor(descriptor.parameters_types.clone()),
            });
        };
        let signature = MethodSignature::from_str(signature)?;
        let signature_count = signature.parameter_types.len();
        let descriptor_count = descriptor.parameters_types.len();
        if signature_count != descriptor_count {
            tracing::warn!(
                %descriptor,
                %signature,
                "the signature and the descriptor disagree on the number of parameters"
            );
            return Err(Error::ParameterCountMismatch {
                signature: signature_count,
                descriptor: descriptor_count,
            });
        }
        Ok(Self {
            source: Source::Signature(signature),
        })
    }

    /// Creates a resolver from the raw descriptor and signature strings.
    ///
    /// # Errors
    /// See [`Error`].
    pub fn from_strs(descriptor: &str, signature: Option<&str>) -> Result<Self, Error> {
        let descriptor = MethodDescriptor::from_str(descriptor)?;
        Self::new(&descriptor, signature)
    }

    /// Creates a resolver for a method declaration.
    ///
    /// # Errors
    /// See [`ParameterTypeResolver::new`].
    pub fn for_declaration(declaration: &MethodDeclaration) -> Result<Self, Error> {
        Self::new(
            &declaration.method.descriptor,
            declaration.signature.as_deref(),
        )
    }

    /// Creates a resolver for a method declaration, ignoring a signature that cannot be used.
    #[must_use]
    pub fn for_declaration_or_erased(declaration: &MethodDeclaration) -> Self {
        Self::for_declaration(declaration).unwrap_or_else(|error| {
            tracing::debug!(
                method = %declaration.method,
                %error,
                "falling back to the erased descriptor"
            );
            Self {
                source: Source::Descriptor(declaration.method.descriptor.parameters_types.clone()),
            }
        })
    }

    /// Returns the parsed signature, if the resolver uses one.
    #[must_use]
    pub const fn signature(&self) -> Option<&MethodSignature> {
        match &self.source {
            Source::Signature(it) => Some(it),
            Source::Descriptor(_) => None,
        }
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        match &self.source {
            Source::Signature(it) => it.parameter_types.len(),
            Source::Descriptor(it) => it.len(),
        }
    }

    /// Returns the type of the parameter at `index`, counting from zero.
    ///
    /// # Errors
    /// [`Error::IndexOutOfRange`] if the method has no such parameter.
    pub fn resolve(&self, index: usize) -> Result<ParameterType, Error> {
        let out_of_range = || Error::IndexOutOfRange {
            index,
            count: self.parameter_count(),
        };
        match &self.source {
            Source::Descriptor(parameters) => {
                let base_type = parameters.get(index).ok_or_else(out_of_range)?;
                Ok(ParameterType {
                    base_type: base_type.clone(),
                    type_arguments: Vec::new(),
                })
            }
            Source::Signature(signature) => {
                let parameter = signature
                    .parameter_types
                    .get(index)
                    .ok_or_else(out_of_range)?;
                Ok(ParameterType {
                    base_type: erased_type(signature, parameter),
                    type_arguments: parameter.type_arguments().to_vec(),
                })
            }
        }
    }

    /// Returns the bound at `bound` of the formal type parameter at `type_parameter`.
    /// The class bound, when present, comes first.
    ///
    /// # Errors
    /// [`Error::BoundOutOfRange`] if there is no such bound, which is always the case for a
    /// method without signature.
    pub fn resolve_type_parameter_bound(
        &self,
        type_parameter: usize,
        bound: usize,
    ) -> Result<&TypeArgument, Error> {
        self.signature()
            .and_then(|it| it.type_parameters.get(type_parameter))
            .and_then(|it| it.bounds().nth(bound))
            .ok_or(Error::BoundOutOfRange {
                type_parameter,
                bound,
            })
    }
}

fn erased_type(signature: &MethodSignature, parameter: &TypeArgument) -> FieldType {
    match parameter {
        TypeArgument::TypeVariable {
            name,
            array_dimensions,
            ..
        } => FieldType::array_of(signature.erasure_of(name), *array_dimensions),
        concrete => concrete.descriptor().unwrap_or_else(FieldType::object),
    }
}
