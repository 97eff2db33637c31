//! Rehydration: turning stored records back into typed values.
//!
//! The inverse of [`crate::erased`] — given digests that a previous
//! resolution (possibly in another process) left behind, read the call and
//! result records back out of a `ResultTracker` and decode them into the
//! closed graph representation (`ValueWithProvenance<T>`), not just the
//! raw wire `Serializable`. A `_subclass` this process doesn't recognize,
//! or a function name that isn't registered, fails closed rather than
//! guessing. A missing record is a storage miss (`StorageError::NotFound`);
//! a recognized record whose output class or function this process hasn't
//! linked in is a codec/registry failure (`ClassNotFound`/`UnknownFunction`).

use std::sync::Arc;

use tracing::instrument;

use prov_core::{
    check_consistency, Codec, CodecRegistry, Digest, FunctionRegistry, ProvenanceError,
    Serializable, ValueWithProvenance, Version,
};
use prov_store::{MemoKey, ResultTracker, StorageError};

use crate::error::Result;

/// Load and parse a call record, verifying that this process has both a
/// codec for its declared output class and a registration for its
/// function, then reconstruct the digest-only
/// [`ValueWithProvenance::FunctionCallWithProvenanceDeflated`] shape for it.
#[instrument(skip(tracker, registry, codec_registry))]
pub async fn inflate_call<T: Clone>(
    call_digest: Digest,
    tracker: &dyn ResultTracker,
    registry: &FunctionRegistry,
    codec_registry: &CodecRegistry,
) -> Result<ValueWithProvenance<T>> {
    let bytes = tracker
        .load_call_record(&call_digest)
        .await?
        .ok_or_else(|| StorageError::NotFound {
            digest: call_digest.to_hex(),
        })?;
    let record: Serializable = serde_json::from_slice(&bytes)?;
    let (function_name, function_version, output_class_name) = match &record {
        Serializable::FunctionCallWithKnownProvenanceSerializableWithInputs {
            function_name,
            function_version,
            output_class_name,
            ..
        }
        | Serializable::FunctionCallWithKnownProvenanceSerializableWithoutInputs {
            function_name,
            function_version,
            output_class_name,
            ..
        } => (function_name.clone(), function_version.clone(), output_class_name.clone()),
        other => {
            return Err(ProvenanceError::UnexpectedVariant(other.subclass_name().to_string()).into())
        }
    };
    if !codec_registry.contains(&output_class_name) {
        return Err(ProvenanceError::ClassNotFound {
            class_name: output_class_name,
        }
        .into());
    }
    if !registry.contains(&function_name) {
        return Err(ProvenanceError::UnknownFunction(function_name).into());
    }
    Ok(ValueWithProvenance::FunctionCallWithProvenanceDeflated(
        ValueWithProvenance::<T>::deflate_call(
            call_digest,
            function_name,
            Version::new(function_version),
            output_class_name,
        ),
    ))
}

/// Load a result record by its own digest and reconstruct the digest-only
/// [`ValueWithProvenance::FunctionCallResultWithProvenanceDeflated`] shape,
/// without fetching or decoding the output blob itself.
#[instrument(skip(tracker))]
pub async fn inflate_result<T: Clone>(
    result_digest: Digest,
    tracker: &dyn ResultTracker,
) -> Result<ValueWithProvenance<T>> {
    let bytes = tracker
        .load_result_record(&result_digest)
        .await?
        .ok_or_else(|| StorageError::NotFound {
            digest: result_digest.to_hex(),
        })?;
    let record: Serializable = serde_json::from_slice(&bytes)?;
    let output_digest = match record {
        Serializable::FunctionCallResultWithKnownProvenanceSerializable { output_digest, .. }
        | Serializable::FunctionCallResultWithUnknownProvenanceSerializable {
            output_digest, ..
        } => output_digest,
        other => {
            return Err(ProvenanceError::UnexpectedVariant(other.subclass_name().to_string()).into())
        }
    };
    Ok(ValueWithProvenance::FunctionCallResultWithProvenanceDeflated(
        ValueWithProvenance::<T>::deflate_result(result_digest, output_digest),
    ))
}

/// Load an output blob by digest and decode it with `codec`, rejecting it
/// if deserialize-then-reserialize doesn't reproduce the same bytes.
pub async fn inflate_output<T>(
    output_digest: Digest,
    tracker: &dyn ResultTracker,
    codec: &dyn Codec<T>,
) -> Result<T> {
    let bytes = tracker.load_blob(&output_digest).await?;
    Ok(check_consistency(codec, &bytes, &output_digest)?)
}

/// Rehydrate `node`, with a no-copy shortcut: a node that isn't one of the
/// two deflated stubs is already inflated, so this returns the same `Arc`
/// untouched rather than issuing storage reads to reconstruct an
/// equivalent node. Only an actual deflated stub reaches `inflate_call`/
/// `inflate_result` and allocates a new node.
#[instrument(skip(node, tracker, registry, codec_registry))]
pub async fn inflate_node<T: Clone>(
    node: Arc<ValueWithProvenance<T>>,
    tracker: &dyn ResultTracker,
    registry: &FunctionRegistry,
    codec_registry: &CodecRegistry,
) -> Result<Arc<ValueWithProvenance<T>>> {
    match node.as_ref() {
        ValueWithProvenance::FunctionCallWithProvenanceDeflated(n) => Ok(Arc::new(
            inflate_call(n.call_digest, tracker, registry, codec_registry).await?,
        )),
        ValueWithProvenance::FunctionCallResultWithProvenanceDeflated(n) => {
            Ok(Arc::new(inflate_result(n.call_digest, tracker).await?))
        }
        _ => Ok(node),
    }
}

/// Probe the memo index for `(function_name, function_version,
/// input_group_digest)` and, on a hit, decode the memoized output.
/// Returns `Ok(None)` on a miss — there is nothing to inflate, not an
/// error.
pub async fn inflate_memoized<T>(
    function_name: &str,
    function_version: &Version,
    input_group_digest: Digest,
    tracker: &dyn ResultTracker,
    codec: &dyn Codec<T>,
) -> Result<Option<T>> {
    let key = MemoKey::new(function_name, function_version.to_string(), input_group_digest);
    match tracker.find_memo(&key).await? {
        Some(entry) => Ok(Some(
            inflate_output(entry.output_digest, tracker, codec).await?,
        )),
        None => Ok(None),
    }
}
