//! The "Serializable Mirror": wire records for provenance nodes.
//!
//! `ValueWithProvenance<T>` holds live Rust values and type-erased input
//! handles — it is not itself `Serialize`. Each node shape has a small
//! wire twin here instead, tagged with an internal `_subclass`
//! discriminator the way `serde`'s internally-tagged enums are the
//! idiomatic stand-in for a class hierarchy with a discriminator field and
//! a registry of readers, one per concrete subclass.
//!
//! An unrecognized `_subclass` value fails deserialization with
//! `ProvenanceError::UnexpectedVariant` — there is no silent default
//! variant.

use serde::{Deserialize, Serialize};

use crate::digest::{canonical_json, Digest, DigestError};

/// Wire twin of the six `ValueWithProvenance` shapes, tagged by
/// `_subclass` so a reader that only recognizes some variants can still
/// parse the ones it knows and reject the rest explicitly.
///
/// `inputs` in the `WithInputs` variant is itself `Vec<Serializable>` —
/// one entry per declared input, each either a raw-value leaf
/// (`FunctionCallWithUnknownProvenanceSerializable`) or a nested call
/// stubbed to its digest (`...WithoutInputs`). Embedding the nested call's
/// own `WithInputs` form here would duplicate it on every save; the stub
/// carries just enough (`function_name`, `function_version`, the digest of
/// the equivalent `WithInputs` record) to look the full record back up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_subclass")]
pub enum Serializable {
    /// A raw input value with no call behind it. `output_class_name` is the
    /// codec tag a reader must have linked in to decode `value_digest`'s
    /// blob — checked against a `CodecRegistry` during inflate.
    FunctionCallWithUnknownProvenanceSerializable {
        output_class_name: String,
        value_digest: Digest,
    },

    /// A pending call record, inputs carried inline.
    FunctionCallWithKnownProvenanceSerializableWithInputs {
        function_name: String,
        function_version: String,
        output_class_name: String,
        inputs: Vec<Serializable>,
    },

    /// A pending call record stubbed to its digest, inputs elided. Used to
    /// embed a nested call inside an enclosing one without inlining the
    /// nested call's own input list.
    FunctionCallWithKnownProvenanceSerializableWithoutInputs {
        function_name: String,
        function_version: String,
        output_class_name: String,
        digest_of_equivalent_with_inputs: Digest,
    },

    /// A resolved call's result: which call produced it (as a
    /// `WithoutInputs` stub), the digest over the ordered input-result
    /// digests, the output's digest, and the build that produced it.
    FunctionCallResultWithKnownProvenanceSerializable {
        call: Box<Serializable>,
        input_group_digest: Digest,
        output_digest: Digest,
        commit_id: String,
        build_id: String,
    },

    /// A resolved result whose originating call carries no provenance of
    /// its own (the top of the graph was an `UnknownProvenance` leaf).
    /// Its `inputGroupDigest` is, by definition, the digest of the empty
    /// digest list.
    FunctionCallResultWithUnknownProvenanceSerializable {
        call: Box<Serializable>,
        output_digest: Digest,
        commit_id: String,
        build_id: String,
    },
}

impl Serializable {
    pub fn subclass_name(&self) -> &'static str {
        match self {
            Self::FunctionCallWithUnknownProvenanceSerializable { .. } => {
                "FunctionCallWithUnknownProvenanceSerializable"
            }
            Self::FunctionCallWithKnownProvenanceSerializableWithInputs { .. } => {
                "FunctionCallWithKnownProvenanceSerializableWithInputs"
            }
            Self::FunctionCallWithKnownProvenanceSerializableWithoutInputs { .. } => {
                "FunctionCallWithKnownProvenanceSerializableWithoutInputs"
            }
            Self::FunctionCallResultWithKnownProvenanceSerializable { .. } => {
                "FunctionCallResultWithKnownProvenanceSerializable"
            }
            Self::FunctionCallResultWithUnknownProvenanceSerializable { .. } => {
                "FunctionCallResultWithUnknownProvenanceSerializable"
            }
        }
    }

    /// The digest this input slot resolves to, regardless of whether it's
    /// a raw value or a nested call — what `inputGroupDigest` is computed
    /// over.
    pub fn input_digest(&self) -> Option<Digest> {
        match self {
            Self::FunctionCallWithUnknownProvenanceSerializable { value_digest, .. } => {
                Some(*value_digest)
            }
            Self::FunctionCallWithKnownProvenanceSerializableWithoutInputs {
                digest_of_equivalent_with_inputs,
                ..
            } => Some(*digest_of_equivalent_with_inputs),
            _ => None,
        }
    }
}

/// Canonical bytes behind a memoization key's `inputGroupDigest`: the
/// ordered digest over each input's own output digest, not a serialization
/// of the full input records. Two calls with the same function name,
/// version, and input *values* memo-hit even if the input records differ
/// in shape (e.g. one inline, one deflated) — the inputs are assumed
/// deterministic given their digests.
pub fn input_group_bytes(input_digests: &[Digest]) -> Result<Vec<u8>, DigestError> {
    let values: Vec<serde_json::Value> = input_digests
        .iter()
        .map(|d| serde_json::Value::String(d.to_hex()))
        .collect();
    Ok(canonical_json(&serde_json::Value::Array(values))?.into_bytes())
}

pub fn input_group_digest(input_digests: &[Digest]) -> Result<Digest, DigestError> {
    Ok(Digest::of_bytes(&input_group_bytes(input_digests)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let s = Serializable::FunctionCallWithKnownProvenanceSerializableWithInputs {
            function_name: "add".into(),
            function_version: "1.0".into(),
            output_class_name: "i64".into(),
            inputs: vec![Serializable::FunctionCallWithUnknownProvenanceSerializable {
                output_class_name: "i64".into(),
                value_digest: Digest::of_bytes(b"2"),
            }],
        };
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"_subclass\""));
        let back: Serializable = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }

    #[test]
    fn nested_call_embeds_as_a_without_inputs_stub() {
        let inner_digest = Digest::of_bytes(b"inner-call-record");
        let s = Serializable::FunctionCallWithKnownProvenanceSerializableWithInputs {
            function_name: "mul".into(),
            function_version: "1.0".into(),
            output_class_name: "i64".into(),
            inputs: vec![
                Serializable::FunctionCallWithKnownProvenanceSerializableWithoutInputs {
                    function_name: "add".into(),
                    function_version: "1.0".into(),
                    output_class_name: "i64".into(),
                    digest_of_equivalent_with_inputs: inner_digest,
                },
                Serializable::FunctionCallWithUnknownProvenanceSerializable {
                    output_class_name: "i64".into(),
                    value_digest: Digest::of_bytes(b"4"),
                },
            ],
        };
        match &s {
            Serializable::FunctionCallWithKnownProvenanceSerializableWithInputs {
                inputs, ..
            } => {
                assert_eq!(inputs[0].input_digest(), Some(inner_digest));
            }
            _ => panic!("expected WithInputs"),
        }
    }

    #[test]
    fn unknown_subclass_is_a_deserialization_error() {
        let json = r#"{"_subclass":"SomethingElseEntirely"}"#;
        let result: Result<Serializable, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn input_group_digest_depends_on_order() {
        let a = Digest::of_bytes(b"a");
        let b = Digest::of_bytes(b"b");
        assert_ne!(
            input_group_digest(&[a, b]).unwrap(),
            input_group_digest(&[b, a]).unwrap()
        );
    }

    #[test]
    fn input_group_digest_is_deterministic() {
        let digests = vec![Digest::of_bytes(b"x"), Digest::of_bytes(b"y")];
        assert_eq!(
            input_group_digest(&digests).unwrap(),
            input_group_digest(&digests).unwrap()
        );
    }

    #[test]
    fn input_group_digest_is_the_digest_of_input_group_bytes() {
        let digests = vec![Digest::of_bytes(b"x"), Digest::of_bytes(b"y")];
        let bytes = input_group_bytes(&digests).unwrap();
        assert_eq!(Digest::of_bytes(&bytes), input_group_digest(&digests).unwrap());
    }

    #[test]
    fn input_group_bytes_is_a_canonical_json_array_of_hex_digests() {
        let a = Digest::of_bytes(b"a");
        let b = Digest::of_bytes(b"b");
        let bytes = input_group_bytes(&[a, b]).unwrap();
        let expected = format!("[\"{}\",\"{}\"]", a.to_hex(), b.to_hex());
        assert_eq!(String::from_utf8(bytes).unwrap(), expected);
    }
}
