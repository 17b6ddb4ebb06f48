//! Resolution of the effective nullness of a declaration.
//!
//! The nullness of a reference type is taken from the first of the following that carries a
//! recognized annotation:
//! 1. the member itself,
//! 2. the class declaring the member,
//! 3. the `package-info` of the package containing the class.
//!
//! Supertypes are not consulted.

use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
    ops::Deref,
    sync::Arc,
};

use tracing::{debug, warn};

use crate::{
    analysis::cache::NullnessCache,
    jvm::{
        declaration::{Declaration, TypePathElement, TypeUseTarget},
        references::{ClassRef, PackageRef},
    },
    types::{field_type::FieldType, method_descriptor::ReturnType},
};

use super::{
    Nullness,
    annotations::{NullnessAnnotations, binary_name},
};

/// An error occurred when looking up the annotations of a class.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// The class is not available.
    #[error("Class not found: {0}")]
    NotFound(String),
    /// Other errors raised by the host.
    #[error("Failed to look up annotations: {0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Provides the annotations on classes and packages.
pub trait AnnotationLookup {
    /// Returns the types of the annotations on `class`, in declaration order.
    ///
    /// # Errors
    /// [`LookupError::NotFound`] if the class is not available.
    fn class_annotations(&self, class: &ClassRef) -> Result<Vec<String>, LookupError>;

    /// Returns the types of the annotations on `package`, in declaration order.
    /// By default, they are the annotations on the `package-info` class of the package.
    ///
    /// # Errors
    /// [`LookupError::NotFound`] if the package has no `package-info` available.
    fn package_annotations(&self, package: &PackageRef) -> Result<Vec<String>, LookupError> {
        self.class_annotations(&package.package_info())
    }

    /// Checks whether `class` is an enum.
    ///
    /// # Errors
    /// [`LookupError::NotFound`] if the class is not available.
    fn is_enum(&self, _class: &ClassRef) -> Result<bool, LookupError> {
        Ok(false)
    }
}

impl<T> AnnotationLookup for T
where
    T: Deref,
    <T as Deref>::Target: AnnotationLookup,
{
    fn class_annotations(&self, class: &ClassRef) -> Result<Vec<String>, LookupError> {
        self.deref().class_annotations(class)
    }

    fn package_annotations(&self, package: &PackageRef) -> Result<Vec<String>, LookupError> {
        self.deref().package_annotations(package)
    }

    fn is_enum(&self, class: &ClassRef) -> Result<bool, LookupError> {
        self.deref().is_enum(class)
    }
}

#[derive(Debug, Clone, Default)]
struct ClassMetadata {
    annotations: Vec<String>,
    is_enum: bool,
}

/// An [`AnnotationLookup`] backed by a map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLookup {
    classes: HashMap<ClassRef, ClassMetadata>,
}

impl InMemoryLookup {
    /// Creates a lookup that knows no class.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `class` with the given annotations.
    pub fn insert_class<I, S>(&mut self, class: ClassRef, annotations: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let metadata = self.classes.entry(class).or_default();
        metadata.annotations = annotations.into_iter().map(Into::into).collect();
    }

    /// Registers the `package-info` of `package` with the given annotations.
    pub fn insert_package<I, S>(&mut self, package: &PackageRef, annotations: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert_class(package.package_info(), annotations);
    }

    /// Marks `class` as an enum, registering it if needed.
    pub fn mark_enum(&mut self, class: ClassRef) {
        self.classes.entry(class).or_default().is_enum = true;
    }

    /// Forgets `class`. Returns whether it was registered.
    pub fn remove_class(&mut self, class: &ClassRef) -> bool {
        self.classes.remove(class).is_some()
    }

    /// Same as [`InMemoryLookup::insert_class`], but in a builder style.
    #[must_use]
    pub fn with_class<I, S>(mut self, class: impl Into<String>, annotations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert_class(ClassRef::new(class), annotations);
        self
    }

    /// Same as [`InMemoryLookup::insert_package`], but in a builder style.
    #[must_use]
    pub fn with_package<I, S>(mut self, package: impl Into<String>, annotations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert_package(&PackageRef::new(package), annotations);
        self
    }

    /// Same as [`InMemoryLookup::mark_enum`], but in a builder style.
    #[must_use]
    pub fn with_enum(mut self, class: impl Into<String>) -> Self {
        self.mark_enum(ClassRef::new(class));
        self
    }
}

impl AnnotationLookup for InMemoryLookup {
    fn class_annotations(&self, class: &ClassRef) -> Result<Vec<String>, LookupError> {
        self.classes
            .get(class)
            .map(|it| it.annotations.clone())
            .ok_or_else(|| LookupError::NotFound(class.binary_name.clone()))
    }

    fn is_enum(&self, class: &ClassRef) -> Result<bool, LookupError> {
        self.classes
            .get(class)
            .map(|it| it.is_enum)
            .ok_or_else(|| LookupError::NotFound(class.binary_name.clone()))
    }
}

/// Where a resolved nullness comes from.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, derive_more::Display)]
pub enum Scope {
    /// The type is primitive (or `void`) and therefore never `null`.
    #[display("primitive type")]
    Primitive,
    /// An annotation on the member.
    #[display("member")]
    Member,
    /// An annotation on the declaring class.
    #[display("class")]
    Class,
    /// An annotation on the package of the declaring class.
    #[display("package")]
    Package,
    /// Nothing in scope is annotated.
    #[display("none")]
    None,
}

/// More than one recognized nullness annotation on the same site.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
#[error(
    "The {scope} {site} has conflicting nullness annotations [{}], {chosen} is used",
    annotations.join(", ")
)]
pub struct ConflictingAnnotations {
    /// The scope of the site.
    pub scope: Scope,
    /// The annotated member, class or package.
    pub site: String,
    /// The recognized annotations, in declaration order.
    pub annotations: Vec<String>,
    /// The nullness taken from the first recognized annotation.
    pub chosen: Nullness,
}

/// The result of resolving the nullness of a declaration.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Resolution {
    /// The effective nullness.
    pub nullness: Nullness,
    /// Where the nullness comes from.
    pub source: Scope,
    /// The sites with conflicting annotations that were visited.
    pub conflicts: Vec<ConflictingAnnotations>,
    /// The classes whose annotations could not be looked up.
    pub missing_classes: Vec<ClassRef>,
}

impl Resolution {
    const fn primitive() -> Self {
        Self {
            nullness: Nullness::NotNull,
            source: Scope::Primitive,
            conflicts: Vec::new(),
            missing_classes: Vec::new(),
        }
    }

    /// Checks whether any visited site has conflicting annotations.
    #[must_use]
    pub fn is_conflicting(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Checks whether all the scopes that were needed could be looked up.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_classes.is_empty()
    }
}

/// Diagnostics collected while walking the scopes.
#[derive(Debug, Default)]
struct Diagnostics {
    conflicts: Vec<ConflictingAnnotations>,
    missing_classes: Vec<ClassRef>,
}

impl Diagnostics {
    fn missing(&mut self, class: ClassRef, error: &LookupError) {
        match error {
            LookupError::NotFound(_) => debug!(%class, "annotations unavailable"),
            LookupError::Other(_) => warn!(%class, %error, "annotations unavailable"),
        }
        self.missing_classes.push(class);
    }
}

/// A nullness-like annotation on a type that is never `null`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NeedlessAnnotation {
    /// The type of the annotation, as spelled in the declaration.
    pub annotation_type: String,
    /// The nullness the annotation declares.
    pub nullness: Nullness,
}

/// Resolves the nullness of declarations.
#[derive(Debug, Clone)]
pub struct NullnessResolver<L> {
    lookup: L,
    annotations: NullnessAnnotations,
}

impl<L: AnnotationLookup> NullnessResolver<L> {
    /// Creates a resolver recognizing the annotations in `annotations`.
    pub fn new(lookup: L, annotations: NullnessAnnotations) -> Self {
        Self {
            lookup,
            annotations,
        }
    }

    /// Returns the table of recognized annotations.
    pub fn annotations(&self) -> &NullnessAnnotations {
        &self.annotations
    }

    /// Returns the underlying [`AnnotationLookup`].
    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Resolves the nullness of the value produced by `declaration`, i.e., the return value
    /// of a method or the value of a field.
    pub fn resolve(&self, declaration: &Declaration) -> Resolution {
        self.resolve_type_use(declaration, declaration.value_target(), &[])
    }

    /// Same as [`NullnessResolver::resolve`], but reuses the result stored in `cache` if the
    /// declaration has not changed since it was computed.
    pub fn resolve_cached(
        &self,
        declaration: &Declaration,
        cache: &NullnessCache,
    ) -> Arc<Resolution> {
        cache.get_or_resolve(declaration, || self.resolve(declaration))
    }

    /// Resolves the nullness of the type at `type_path` in the `target` type of
    /// `declaration`.
    pub fn resolve_type_use(
        &self,
        declaration: &Declaration,
        target: TypeUseTarget,
        type_path: &[TypePathElement],
    ) -> Resolution {
        if is_primitive_use(declaration, target, type_path) {
            return Resolution::primitive();
        }
        let owner = declaration.owner();
        let mut diagnostics = Diagnostics::default();
        let resolved = [Scope::Member, Scope::Class, Scope::Package]
            .into_iter()
            .find_map(|scope| {
                let nullness = match scope {
                    Scope::Member => {
                        self.member_nullness(declaration, target, type_path, &mut diagnostics)
                    }
                    Scope::Class => self.class_nullness(owner, &mut diagnostics),
                    Scope::Package => self.package_nullness(&owner.package(), &mut diagnostics),
                    Scope::Primitive | Scope::None => None,
                };
                nullness.map(|it| (it, scope))
            });
        let (nullness, source) = resolved.unwrap_or((Nullness::NoExplicitConfig, Scope::None));
        debug!(
            member = %declaration.make_ref(),
            ?target,
            %nullness,
            %source,
            "resolved nullness"
        );
        Resolution {
            nullness,
            source,
            conflicts: diagnostics.conflicts,
            missing_classes: diagnostics.missing_classes,
        }
    }

    /// Lists the nullness annotations on the value type of `declaration` that have no effect
    /// because the type is primitive or an enum.
    pub fn needless_annotations(&self, declaration: &Declaration) -> Vec<NeedlessAnnotation> {
        let ReturnType::Some(value_type) = declaration.value_type() else {
            return Vec::new();
        };
        let is_enum = match &value_type {
            FieldType::Object(class) => self.lookup.is_enum(class).unwrap_or_else(|error| {
                debug!(%class, %error, "assuming the class is not an enum");
                false
            }),
            FieldType::Base(_) | FieldType::Array(_) => false,
        };
        direct_annotations(declaration, declaration.value_target(), &[])
            .filter_map(|annotation_type| {
                self.annotations
                    .is_needless(&value_type, annotation_type, is_enum)
                    .map(|nullness| NeedlessAnnotation {
                        annotation_type: annotation_type.to_owned(),
                        nullness,
                    })
            })
            .collect()
    }

    fn member_nullness(
        &self,
        declaration: &Declaration,
        target: TypeUseTarget,
        type_path: &[TypePathElement],
        diagnostics: &mut Diagnostics,
    ) -> Option<Nullness> {
        self.site_nullness(
            Scope::Member,
            declaration.make_ref(),
            direct_annotations(declaration, target, type_path),
            diagnostics,
        )
    }

    fn class_nullness(&self, class: &ClassRef, diagnostics: &mut Diagnostics) -> Option<Nullness> {
        match self.lookup.class_annotations(class) {
            Ok(annotations) => self.site_nullness(
                Scope::Class,
                class,
                annotations.iter().map(String::as_str),
                diagnostics,
            ),
            Err(error) => {
                diagnostics.missing(class.clone(), &error);
                None
            }
        }
    }

    fn package_nullness(
        &self,
        package: &PackageRef,
        diagnostics: &mut Diagnostics,
    ) -> Option<Nullness> {
        match self.lookup.package_annotations(package) {
            Ok(annotations) => self.site_nullness(
                Scope::Package,
                package.package_info(),
                annotations.iter().map(String::as_str),
                diagnostics,
            ),
            Err(error) => {
                diagnostics.missing(package.package_info(), &error);
                None
            }
        }
    }

    /// Returns the nullness of the first recognized annotation, recording a conflict if
    /// there is more than one.
    /// An annotation type appearing more than once counts only once.
    fn site_nullness<'a>(
        &self,
        scope: Scope,
        site: impl Display,
        annotations: impl Iterator<Item = &'a str>,
        diagnostics: &mut Diagnostics,
    ) -> Option<Nullness> {
        let mut seen = HashSet::new();
        let recognized: Vec<_> = annotations
            .filter_map(|it| self.annotations.nullness_of(it).map(|nullness| (it, nullness)))
            .filter(|&(it, _)| seen.insert(binary_name(it)))
            .collect();
        let &(_, chosen) = recognized.first()?;
        if recognized.len() > 1 {
            let conflict = ConflictingAnnotations {
                scope,
                site: site.to_string(),
                annotations: recognized.iter().map(|(it, _)| (*it).to_owned()).collect(),
                chosen,
            };
            warn!("{conflict}");
            diagnostics.conflicts.push(conflict);
        }
        Some(chosen)
    }
}

/// The annotations placed directly on the `target` type at `type_path`.
/// Declaration annotations apply to the value type itself.
fn direct_annotations<'a>(
    declaration: &'a Declaration,
    target: TypeUseTarget,
    type_path: &'a [TypePathElement],
) -> impl Iterator<Item = &'a str> {
    let on_value_type = type_path.is_empty() && target == declaration.value_target();
    let declaration_annotations = declaration
        .annotations()
        .iter()
        .filter(move |_| on_value_type)
        .map(String::as_str);
    let type_annotations = declaration
        .type_annotations()
        .iter()
        .filter(move |it| it.target == target && it.type_path == type_path)
        .map(|it| it.annotation_type.as_str());
    declaration_annotations.chain(type_annotations)
}

/// Checks whether the type use is known to be primitive from the erased types.
/// Type arguments, wildcard bounds and type parameter bounds are always reference types.
fn is_primitive_use(
    declaration: &Declaration,
    target: TypeUseTarget,
    type_path: &[TypePathElement],
) -> bool {
    let erased = match (target, declaration) {
        (TypeUseTarget::Return | TypeUseTarget::Field, _)
            if target == declaration.value_target() =>
        {
            match declaration.value_type() {
                ReturnType::Some(it) => it,
                ReturnType::Void => return type_path.is_empty(),
            }
        }
        (TypeUseTarget::FormalParameter(index), Declaration::Method(method)) => {
            match method.method.descriptor.parameters_types.get(usize::from(index)) {
                Some(it) => it.clone(),
                None => return false,
            }
        }
        _ => return false,
    };
    let mut current = &erased;
    for step in type_path {
        match (step, current.component_type()) {
            (TypePathElement::Array, Some(component)) => current = component,
            _ => return false,
        }
    }
    !current.is_reference()
}
