//! [`VirtualValue`]: a value that may be known inline, known only by its
//! digest, or not yet resolvable at all.
//!
//! The function version attached to a call is itself sometimes the result
//! of another call (a version computed by, say, a build-info lookup) that
//! hasn't resolved yet. `VirtualValue` is the tri-state the resolution
//! algorithm threads through that case instead of forcing every version
//! field to be a concrete, already-known value. Construction goes through
//! the named constructors below rather than public variants so a caller
//! can't build a `Digest` state without a digest or silently conflate
//! "not yet resolved" with "resolved to nothing".

use crate::digest::Digest;
use crate::error::{ProvenanceError, Result};

/// Tri-state wrapper. See module docs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VirtualValue<T> {
    /// The value itself, already in hand.
    Inline(T),
    /// Only the digest of the value is known; the value has not been
    /// fetched or has been deliberately deflated.
    ByDigest(Digest),
    /// Not yet resolvable — the upstream call this depends on hasn't run.
    Unresolved,
}

impl<T> VirtualValue<T> {
    pub fn inline(value: T) -> Self {
        Self::Inline(value)
    }

    pub fn by_digest(digest: Digest) -> Self {
        Self::ByDigest(digest)
    }

    pub fn unresolved() -> Self {
        Self::Unresolved
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Inline(_))
    }

    pub fn as_inline(&self) -> Option<&T> {
        match self {
            Self::Inline(value) => Some(value),
            _ => None,
        }
    }

    /// Require the inline value, naming `function_name` in the error if
    /// this is `Unresolved` or only `ByDigest`.
    pub fn require_inline(&self, function_name: &str) -> Result<&T> {
        self.as_inline()
            .ok_or_else(|| ProvenanceError::UnresolvedVersion {
                function_name: function_name.to_string(),
            })
    }

    pub fn digest(&self) -> Option<Digest> {
        match self {
            Self::ByDigest(d) => Some(*d),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> VirtualValue<U> {
        match self {
            Self::Inline(value) => VirtualValue::Inline(f(value)),
            Self::ByDigest(d) => VirtualValue::ByDigest(d),
            Self::Unresolved => VirtualValue::Unresolved,
        }
    }
}

impl<T> From<T> for VirtualValue<T> {
    fn from(value: T) -> Self {
        Self::Inline(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_is_resolved() {
        let v = VirtualValue::inline(5_i64);
        assert!(v.is_resolved());
        assert_eq!(v.as_inline(), Some(&5));
    }

    #[test]
    fn unresolved_requires_inline_fails_with_function_name() {
        let v: VirtualValue<i64> = VirtualValue::unresolved();
        let err = v.require_inline("add").unwrap_err();
        assert!(matches!(
            err,
            ProvenanceError::UnresolvedVersion { function_name } if function_name == "add"
        ));
    }

    #[test]
    fn by_digest_is_not_resolved_but_carries_its_digest() {
        let d = Digest::of_bytes(b"x");
        let v: VirtualValue<i64> = VirtualValue::by_digest(d);
        assert!(!v.is_resolved());
        assert_eq!(v.digest(), Some(d));
    }

    #[test]
    fn map_preserves_variant() {
        let v = VirtualValue::inline(2_i64).map(|n| n * 10);
        assert_eq!(v.as_inline(), Some(&20));
    }
}
