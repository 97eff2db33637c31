//! Deterministic bidirectional `T <-> bytes`, plus a canonical class-name
//! string used as an out-of-band type tag.
//!
//! Additional codecs (e.g. over `bincode`) are a downstream plugin point —
//! [`JsonCodec`] is the one implementation this crate ships, serializing
//! through the canonical-JSON digesting rule in [`crate::digest`] so that
//! two processes serializing the same value always agree on its digest
//! regardless of struct field order.

use std::any::TypeId;
use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::digest::{digest_json, Digest};
use crate::error::{ProvenanceError, Result};

/// An encoder/decoder pair plus a class-name tag for a specific type.
///
/// The class name is a type tag carried out of band of the bytes
/// themselves; a name emitted by a writer must resolve to the same type in
/// any reader that has it linked in (that's the contract
/// [`crate::registry::FunctionRegistry`] depends on).
pub trait Codec<T>: Send + Sync {
    fn serialize(&self, value: &T) -> Result<Vec<u8>>;
    fn deserialize(&self, bytes: &[u8]) -> Result<T>;
    fn class_name(&self) -> &'static str;
}

/// Digest raw bytes directly. Use this for byte payloads you already have —
/// never re-wrap them through [`digest_object`], which digests the JSON
/// encoding of a value, not a pre-serialized byte array.
pub fn digest_bytes(bytes: &[u8]) -> Digest {
    Digest::of_bytes(bytes)
}

/// `digest(serialize(value))`.
///
/// Refuses `T = Vec<u8>` outright: a byte payload re-wrapped through a codec
/// would digest the JSON encoding of the bytes (a base64 string or number
/// array) rather than the bytes themselves, silently producing a different
/// digest than [`digest_bytes`] would. Callers holding raw bytes must use
/// [`digest_bytes`] directly.
pub fn digest_object<T: 'static>(codec: &dyn Codec<T>, value: &T) -> Result<Digest> {
    if TypeId::of::<T>() == TypeId::of::<Vec<u8>>() {
        return Err(ProvenanceError::CodecFailure {
            class_name: codec.class_name().to_string(),
            message: "digest_object refuses Vec<u8>; use digest_bytes on the raw bytes instead"
                .to_string(),
        });
    }
    let bytes = codec.serialize(value)?;
    Ok(digest_bytes(&bytes))
}

/// `(serialize(value), digest(serialize(value)))` in one pass.
pub fn serialize_and_digest<T>(codec: &dyn Codec<T>, value: &T) -> Result<(Vec<u8>, Digest)> {
    let bytes = codec.serialize(value)?;
    let digest = digest_bytes(&bytes);
    Ok((bytes, digest))
}

/// Deserialize `bytes`, re-serialize the result, and confirm byte-equality
/// with `bytes`. Fatal for writes; for reads a mismatch is recoverable if a
/// second round-trip self-stabilizes (callers decide which).
pub fn check_consistency<T>(codec: &dyn Codec<T>, bytes: &[u8], digest: &Digest) -> Result<T> {
    let value = codec.deserialize(bytes)?;
    let re_serialized = codec.serialize(&value)?;
    let actual = digest_bytes(&re_serialized);
    if actual != *digest {
        warn!(
            class_name = codec.class_name(),
            expected = %digest.to_hex(),
            actual = %actual.to_hex(),
            "deserialize-then-reserialize did not reproduce the stored bytes"
        );
        return Err(ProvenanceError::InconsistentDigest {
            class_name: codec.class_name().to_string(),
            expected: digest.to_hex(),
            actual: actual.to_hex(),
        });
    }
    Ok(value)
}

/// JSON codec for any `Serialize + DeserializeOwned` type, digested through
/// the canonical-JSON rule so that field reordering never changes a value's
/// digest.
pub struct JsonCodec<T> {
    class_name: &'static str,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub const fn new(class_name: &'static str) -> Self {
        Self {
            class_name,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T> Codec<T> for JsonCodec<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    fn serialize(&self, value: &T) -> Result<Vec<u8>> {
        let json = serde_json::to_value(value)?;
        Ok(crate::digest::canonical_json(&json)?.into_bytes())
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<T> {
        let value: serde_json::Value = serde_json::from_slice(bytes).map_err(|e| {
            ProvenanceError::CodecFailure {
                class_name: self.class_name.to_string(),
                message: e.to_string(),
            }
        })?;
        serde_json::from_value(value).map_err(|e| ProvenanceError::CodecFailure {
            class_name: self.class_name.to_string(),
            message: e.to_string(),
        })
    }

    fn class_name(&self) -> &'static str {
        self.class_name
    }
}

/// `digest_json` re-exported under the name the object-digesting guard in
/// [`digest_object`] warns against bypassing for raw bytes.
pub fn digest_value(value: &serde_json::Value) -> Result<Digest> {
    Ok(digest_json(value)?)
}

/// The set of output class names a process can decode, mirroring
/// [`crate::registry::FunctionRegistry`]'s shape one level down: a call
/// record names a function, a result record's output is read back out
/// through a class name tagged onto that call. Checked during inflate — a
/// transported record naming a class this process never linked a codec in
/// for fails with `ClassNotFound` rather than returning undecodable bytes.
#[derive(Default)]
pub struct CodecRegistry {
    class_names: HashSet<String>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self {
            class_names: HashSet::new(),
        }
    }

    pub fn register(&mut self, class_name: impl Into<String>) {
        self.class_names.insert(class_name.into());
    }

    /// Register a [`Codec`]'s own class name, so a registry never drifts
    /// out of sync with the codec it was built from.
    pub fn register_codec<T>(&mut self, codec: &dyn Codec<T>) {
        self.class_names.insert(codec.class_name().to_string());
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.class_names.contains(class_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Point {
        x: i64,
        y: i64,
    }

    #[test]
    fn json_codec_roundtrips() {
        let codec = JsonCodec::<Point>::new("Point");
        let p = Point { x: 1, y: 2 };
        let bytes = codec.serialize(&p).unwrap();
        let back = codec.deserialize(&bytes).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn digest_is_field_order_invariant() {
        let codec = JsonCodec::<serde_json::Value>::new("Value");
        let a = serde_json::json!({"x": 1, "y": 2});
        let b = serde_json::json!({"y": 2, "x": 1});
        assert_eq!(
            digest_object(&codec, &a).unwrap(),
            digest_object(&codec, &b).unwrap()
        );
    }

    #[test]
    fn check_consistency_accepts_well_formed_round_trip() {
        let codec = JsonCodec::<Point>::new("Point");
        let p = Point { x: 1, y: 2 };
        let (bytes, digest) = serialize_and_digest(&codec, &p).unwrap();
        let back = check_consistency(&codec, &bytes, &digest).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn check_consistency_rejects_tampered_digest() {
        let codec = JsonCodec::<Point>::new("Point");
        let p = Point { x: 1, y: 2 };
        let bytes = codec.serialize(&p).unwrap();
        let wrong_digest = digest_bytes(b"not the real bytes");
        let err = check_consistency(&codec, &bytes, &wrong_digest).unwrap_err();
        assert!(matches!(err, ProvenanceError::InconsistentDigest { .. }));
    }

    #[test]
    fn digest_object_refuses_raw_byte_arrays() {
        let codec = JsonCodec::<Vec<u8>>::new("Bytes");
        let err = digest_object(&codec, &vec![1u8, 2, 3]).unwrap_err();
        assert!(matches!(err, ProvenanceError::CodecFailure { .. }));
    }

    #[test]
    fn codec_registry_reflects_registration_state() {
        let mut registry = CodecRegistry::new();
        assert!(!registry.contains("Point"));
        let codec = JsonCodec::<Point>::new("Point");
        registry.register_codec(&codec);
        assert!(registry.contains("Point"));
        assert!(!registry.contains("SomethingElse"));
    }
}
