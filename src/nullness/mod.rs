//! Nullness of JVM declarations, as declared with JSpecify-style annotations.
//!
//! [`NullnessAnnotations`] recognizes the annotations, and [`NullnessResolver`] combines the
//! annotations on a member, its class and its package into a single [`Nullness`].

pub mod annotations;
pub mod resolution;

pub use annotations::NullnessAnnotations;
pub use resolution::{NullnessResolver, Resolution, Scope};

/// The declared nullness of a reference type.
#[derive(
    Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Default, derive_more::Display,
)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Nullness {
    /// Nothing in scope says anything about the nullness.
    #[default]
    #[display("no explicit config")]
    NoExplicitConfig,
    /// The nullness is explicitly unspecified, e.g., `@NullnessUnspecified` or `@NullUnmarked`.
    #[display("unknown")]
    Unknown,
    /// The value may be `null`.
    #[display("nullable")]
    Nullable,
    /// The value is never `null`.
    #[display("not null")]
    NotNull,
}

impl Nullness {
    /// Checks whether a value of this nullness may be `null`.
    /// Only [`Nullness::NotNull`] rules it out.
    #[must_use]
    pub const fn can_be_null(self) -> bool {
        !matches!(self, Self::NotNull)
    }

    /// Checks whether the nullness comes from an annotation.
    #[must_use]
    pub const fn is_explicit(self) -> bool {
        !matches!(self, Self::NoExplicitConfig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn only_not_null_excludes_null(nullness in any::<Nullness>()) {
            assert_eq!(nullness.can_be_null(), nullness != Nullness::NotNull);
            assert_eq!(nullness.is_explicit(), nullness != Nullness::NoExplicitConfig);
        }
    }

    #[test]
    fn default_is_no_explicit_config() {
        assert_eq!(Nullness::default(), Nullness::NoExplicitConfig);
        assert!(Nullness::default().can_be_null());
    }
}
