//! The table of recognized nullness annotations.

use std::{borrow::Cow, collections::HashMap};

use crate::types::field_type::FieldType;

use super::Nullness;

/// JSpecify annotations in the current and the legacy packages.
const JSPECIFY: &[(&str, Nullness)] = &[
    ("org/jspecify/annotations/Nullable", Nullness::Nullable),
    ("org/jspecify/annotations/NonNull", Nullness::NotNull),
    ("org/jspecify/annotations/NullMarked", Nullness::NotNull),
    ("org/jspecify/annotations/NullUnmarked", Nullness::Unknown),
    ("org/jspecify/annotations/NullnessUnspecified", Nullness::Unknown),
    ("org/jspecify/annotations/DefaultNonNull", Nullness::NotNull),
    ("org/jspecify/nullness/Nullable", Nullness::Nullable),
    ("org/jspecify/nullness/NullMarked", Nullness::NotNull),
    ("org/jspecify/nullness/NullnessUnspecified", Nullness::Unknown),
];

/// The experimental code analysis annotations.
const CODE_ANALYSIS: &[(&str, Nullness)] = &[
    ("codeanalysis/experimental/annotations/NullnessUnknown", Nullness::Unknown),
    ("codeanalysis/experimental/annotations/Nullable", Nullness::Nullable),
    ("codeanalysis/experimental/annotations/NotNull", Nullness::NotNull),
];

/// Converts any spelling of an annotation type to its binary name.
/// - `Lorg/jspecify/annotations/Nullable;` (descriptor)
/// - `org/jspecify/annotations/Nullable` (binary name)
/// - `org.jspecify.annotations.Nullable` (source name)
pub(crate) fn binary_name(identifier: &str) -> Cow<'_, str> {
    let identifier = identifier
        .strip_prefix('L')
        .and_then(|it| it.strip_suffix(';'))
        .unwrap_or(identifier);
    if identifier.contains('.') {
        Cow::Owned(identifier.replace('.', "/"))
    } else {
        Cow::Borrowed(identifier)
    }
}

/// Maps annotation types to the nullness they declare.
///
/// Lookups accept the source, binary and descriptor spellings of an annotation type as
/// synonyms.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(
        from = "HashMap<String, Nullness>",
        into = "HashMap<String, Nullness>"
    )
)]
pub struct NullnessAnnotations {
    by_binary_name: HashMap<String, Nullness>,
}

impl Default for NullnessAnnotations {
    /// Recognizes the JSpecify annotations and the experimental code analysis annotations.
    fn default() -> Self {
        JSPECIFY.iter().chain(CODE_ANALYSIS).copied().collect()
    }
}

impl NullnessAnnotations {
    /// Creates a table recognizing no annotation.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            by_binary_name: HashMap::new(),
        }
    }

    /// Recognizes `identifier` as declaring `nullness`.
    /// Mapping to [`Nullness::NoExplicitConfig`] removes the annotation from the table.
    pub fn insert(&mut self, identifier: &str, nullness: Nullness) {
        let name = binary_name(identifier).into_owned();
        if nullness.is_explicit() {
            self.by_binary_name.insert(name, nullness);
        } else {
            self.by_binary_name.remove(&name);
        }
    }

    /// Returns the nullness declared by the annotation, or [`None`] if it is not recognized.
    #[must_use]
    pub fn nullness_of(&self, identifier: &str) -> Option<Nullness> {
        self.by_binary_name
            .get(binary_name(identifier).as_ref())
            .copied()
    }

    /// Checks whether `identifier` is a nullable-like annotation on a type that can never be
    /// `null` (a primitive or an enum), and returns its nullness if so.
    #[must_use]
    pub fn is_needless(
        &self,
        annotated_type: &FieldType,
        identifier: &str,
        is_enum: bool,
    ) -> Option<Nullness> {
        let intrinsically_not_null = !annotated_type.is_reference() || is_enum;
        self.nullness_of(identifier)
            .filter(|it| intrinsically_not_null && it.can_be_null())
    }

    /// Returns the number of recognized annotation types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_binary_name.len()
    }

    /// Checks whether the table recognizes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_binary_name.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<(S, Nullness)> for NullnessAnnotations {
    fn from_iter<I: IntoIterator<Item = (S, Nullness)>>(iter: I) -> Self {
        let mut table = Self::empty();
        for (identifier, nullness) in iter {
            table.insert(identifier.as_ref(), nullness);
        }
        table
    }
}

impl From<HashMap<String, Nullness>> for NullnessAnnotations {
    fn from(value: HashMap<String, Nullness>) -> Self {
        value.into_iter().collect()
    }
}

impl From<NullnessAnnotations> for HashMap<String, Nullness> {
    fn from(value: NullnessAnnotations) -> Self {
        value.by_binary_name
    }
}
