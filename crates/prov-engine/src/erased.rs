//! Type-erased pending computation nodes, and the recursive resolution
//! algorithm that walks them.
//!
//! `prov_core::ValueWithProvenance<T>` is the *closed* representation: a
//! node whose shape is already decided, stored as plain data. The nodes in
//! this module are the *open* representation a caller builds up before
//! anything has been resolved — a [`Leaf`] value or a pending [`Call`],
//! erased behind `Arc<dyn ErasedNode>` so a call's inputs don't all have to
//! share one concrete type.
//!
//! [`ErasedNode`] is defined here, not in `prov_core`, precisely so it can
//! be implemented for `prov_core::ValueWithProvenance<T>` — a foreign type
//! this crate does not own — without breaking Rust's orphan rule. That
//! blanket impl at the bottom of this file is what lets an already-resolved
//! node flow back in as an input to a new call.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use prov_core::{
    digest_bytes, input_group_digest, serialize_and_digest, BuildInfo, Codec, Digest,
    FunctionRegistry, JsonCodec, ProvenanceError, Serializable, ValueWithProvenance, Version,
    VirtualValue,
};
use prov_store::{MemoKey, ResultTracker};

use crate::error::{EngineError, Result};

/// A resolved node's known provenance, if it has any — the function name,
/// version, the digest of its `WithInputs` call record, and the build
/// context that produced it (stamped fresh on a memo miss, recovered from
/// the stored result record on a hit). `None` for a leaf value that was
/// never wrapped in a call.
#[derive(Debug, Clone)]
pub struct CallProvenance {
    pub function_name: String,
    pub function_version: String,
    pub call_digest: Digest,
    pub build_info: BuildInfo,
}

/// The outcome of resolving one node: enough to either hand the value back
/// to a caller or feed it into an enclosing call as an already-resolved
/// input.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub output_digest: Digest,
    pub output_bytes: Vec<u8>,
    pub output_class_name: String,
    /// `None` for a leaf value that was never wrapped in a call.
    pub provenance: Option<CallProvenance>,
}

impl Resolved {
    /// The call digest alone, for callers that don't need the rest of
    /// [`CallProvenance`].
    pub fn call_digest(&self) -> Option<Digest> {
        self.provenance.as_ref().map(|p| p.call_digest)
    }

    /// This input's wire form as an entry in an enclosing call's
    /// `inputList`: a raw-value leaf if this node carries no provenance of
    /// its own, or a `WithoutInputs` stub naming the nested call if it does.
    fn as_input_serializable(&self) -> Serializable {
        match &self.provenance {
            None => Serializable::FunctionCallWithUnknownProvenanceSerializable {
                output_class_name: self.output_class_name.clone(),
                value_digest: self.output_digest,
            },
            Some(p) => Serializable::FunctionCallWithKnownProvenanceSerializableWithoutInputs {
                function_name: p.function_name.clone(),
                function_version: p.function_version.clone(),
                output_class_name: self.output_class_name.clone(),
                digest_of_equivalent_with_inputs: p.call_digest,
            },
        }
    }
}

/// A node in the pending computation graph.
#[async_trait]
pub trait ErasedNode: Send + Sync {
    fn class_name(&self) -> &'static str;

    /// Resolve this node against `tracker`/`registry`: recursively resolve
    /// inputs, probe the memo index, and only invoke the underlying
    /// function on a miss.
    async fn resolve(
        &self,
        tracker: &dyn ResultTracker,
        registry: &FunctionRegistry,
    ) -> Result<Resolved>;
}

/// A plain value with no call behind it.
pub struct Leaf<T> {
    value: T,
    codec: JsonCodec<T>,
}

impl<T> Leaf<T> {
    pub fn new(value: T, class_name: &'static str) -> Self {
        Self {
            value,
            codec: JsonCodec::new(class_name),
        }
    }
}

#[async_trait]
impl<T> ErasedNode for Leaf<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    fn class_name(&self) -> &'static str {
        self.codec.class_name()
    }

    #[instrument(skip_all, fields(class_name = self.class_name()))]
    async fn resolve(
        &self,
        tracker: &dyn ResultTracker,
        _registry: &FunctionRegistry,
    ) -> Result<Resolved> {
        let (bytes, digest) = serialize_and_digest(&self.codec, &self.value)?;
        tracker.save_blob(&bytes).await?;
        debug!(%digest, "leaf resolved");
        Ok(Resolved {
            output_digest: digest,
            output_bytes: bytes,
            output_class_name: self.class_name().to_string(),
            provenance: None,
        })
    }
}

/// A pending function call: named, versioned, with a list of input nodes
/// (each itself a [`Leaf`], a [`Call`], or a previously-resolved
/// `ValueWithProvenance<U>`).
pub struct Call<T> {
    function_name: String,
    function_version: VirtualValue<Version>,
    inputs: Vec<Arc<dyn ErasedNode>>,
    codec: JsonCodec<T>,
}

impl<T> Call<T> {
    pub fn new(
        function_name: impl Into<String>,
        function_version: VirtualValue<Version>,
        inputs: Vec<Arc<dyn ErasedNode>>,
        class_name: &'static str,
    ) -> Self {
        Self {
            function_name: function_name.into(),
            function_version,
            inputs,
            codec: JsonCodec::new(class_name),
        }
    }
}

#[async_trait]
impl<T> ErasedNode for Call<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    fn class_name(&self) -> &'static str {
        self.codec.class_name()
    }

    #[instrument(skip_all, fields(function_name = %self.function_name))]
    async fn resolve(
        &self,
        tracker: &dyn ResultTracker,
        registry: &FunctionRegistry,
    ) -> Result<Resolved> {
        // Step 1: the function's own version must be resolved before
        // anything else — a call whose version is itself a pending call
        // cannot be memo-keyed yet.
        let version = self
            .function_version
            .require_inline(&self.function_name)?
            .clone();

        // Step 2: resolve every input. Siblings are independent, so this
        // runs in parallel rather than left-to-right.
        let resolved_inputs: Vec<Resolved> = futures::future::try_join_all(
            self.inputs.iter().map(|input| input.resolve(tracker, registry)),
        )
        .await?;

        // Step 3: the memo key depends only on the inputs' output digests,
        // not on how each input happened to be represented — two calls
        // with digest-identical inputs memo-hit even if one arrived
        // inline and another arrived already-deflated.
        let input_digests: Vec<Digest> =
            resolved_inputs.iter().map(|r| r.output_digest).collect();
        let group_digest = input_group_digest(&input_digests)?;
        let memo_key = MemoKey::new(self.function_name.clone(), version.to_string(), group_digest);

        // Step 4: record the call itself regardless of memo outcome — a
        // call is worth keeping even when its result was already known.
        // Each input embeds as a leaf (unknown provenance) or a
        // `WithoutInputs` stub (a nested call), never its own full
        // `WithInputs` form — that form is saved separately, once, under
        // its own digest.
        let input_records: Vec<Serializable> = resolved_inputs
            .iter()
            .map(Resolved::as_input_serializable)
            .collect();
        let output_class_name = self.class_name().to_string();
        let call_record = Serializable::FunctionCallWithKnownProvenanceSerializableWithInputs {
            function_name: self.function_name.clone(),
            function_version: version.to_string(),
            output_class_name: output_class_name.clone(),
            inputs: input_records,
        };
        let call_bytes = serde_json::to_vec(&call_record)?;
        let call_digest = digest_bytes(&call_bytes);
        tracker.save_call_record(call_digest, call_bytes).await?;

        let call_stub = Serializable::FunctionCallWithKnownProvenanceSerializableWithoutInputs {
            function_name: self.function_name.clone(),
            function_version: version.to_string(),
            output_class_name: output_class_name.clone(),
            digest_of_equivalent_with_inputs: call_digest,
        };

        // Step 5: memo probe. A hit never re-invokes the function — but it
        // still needs to recover the `BuildInfo` that produced the cached
        // result, by loading the result record the memo entry points at.
        if let Some(entry) = tracker.find_memo(&memo_key).await? {
            debug!(output_digest = %entry.output_digest, "memo hit, skipping invocation");
            let output_bytes = tracker.load_blob(&entry.output_digest).await?;
            let result_bytes = tracker
                .load_result_record(&entry.result_digest)
                .await?
                .ok_or_else(|| {
                    EngineError::Provenance(ProvenanceError::UnexpectedVariant(format!(
                        "memo entry for {} points at a missing result record",
                        self.function_name
                    )))
                })?;
            let result_record: Serializable = serde_json::from_slice(&result_bytes)?;
            let (commit_id, build_id) = match result_record {
                Serializable::FunctionCallResultWithKnownProvenanceSerializable {
                    commit_id,
                    build_id,
                    ..
                }
                | Serializable::FunctionCallResultWithUnknownProvenanceSerializable {
                    commit_id,
                    build_id,
                    ..
                } => (commit_id, build_id),
                other => {
                    return Err(EngineError::Provenance(ProvenanceError::UnexpectedVariant(
                        other.subclass_name().to_string(),
                    )))
                }
            };
            let provenance = CallProvenance {
                function_name: self.function_name.clone(),
                function_version: version.to_string(),
                call_digest,
                build_info: BuildInfo::new(commit_id, build_id),
            };
            return Ok(Resolved {
                output_digest: entry.output_digest,
                output_bytes,
                output_class_name,
                provenance: Some(provenance),
            });
        }

        // Step 6: miss — invoke the function, then persist output, result
        // record, and (last) the memo entry.
        debug!("memo miss, invoking function");
        let function = registry.resolve(&self.function_name)?;
        let inputs_json = resolved_inputs
            .iter()
            .map(|r| serde_json::from_slice(&r.output_bytes))
            .collect::<std::result::Result<Vec<serde_json::Value>, _>>()?;
        let output_json = function.call(inputs_json).await?;
        let canonical = prov_core::canonical_json(&output_json)?;
        let output_bytes = canonical.into_bytes();
        let output_digest = digest_bytes(&output_bytes);
        tracker.save_blob(&output_bytes).await?;

        let build_info = tracker.current_build_info().clone();
        tracker.save_build_info(&build_info).await?;
        let result_record = Serializable::FunctionCallResultWithKnownProvenanceSerializable {
            call: Box::new(call_stub),
            input_group_digest: group_digest,
            output_digest,
            commit_id: build_info.commit_id.clone(),
            build_id: build_info.build_id.clone(),
        };
        let result_bytes = serde_json::to_vec(&result_record)?;
        let result_digest = digest_bytes(&result_bytes);
        tracker
            .save_result_record(result_digest, result_bytes, memo_key, output_digest)
            .await?;

        let provenance = CallProvenance {
            function_name: self.function_name.clone(),
            function_version: version.to_string(),
            call_digest,
            build_info,
        };
        Ok(Resolved {
            output_digest,
            output_bytes,
            output_class_name,
            provenance: Some(provenance),
        })
    }
}

/// An already-resolved `ValueWithProvenance<T>` can feed back in as an
/// input to a new call without rewrapping — it re-saves its value (a
/// cheap no-op if the blob already exists) so it's durable in whichever
/// tracker it's being resolved against.
#[async_trait]
impl<T> ErasedNode for ValueWithProvenance<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + std::fmt::Debug,
{
    fn class_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    #[instrument(skip_all)]
    async fn resolve(
        &self,
        tracker: &dyn ResultTracker,
        _registry: &FunctionRegistry,
    ) -> Result<Resolved> {
        match self.output() {
            Some(value) => {
                let codec = JsonCodec::<T>::new(self.class_name());
                let (bytes, digest) = serialize_and_digest(&codec, value)?;
                tracker.save_blob(&bytes).await?;
                // A `FunctionCallResultWithProvenance` already knows the
                // call that produced it; every other resolved shape
                // (`UnknownProvenance[Resolved]`, deflated stubs) feeds
                // back in as a plain leaf.
                let provenance = match self {
                    ValueWithProvenance::FunctionCallResultWithProvenance(result) => {
                        Some(CallProvenance {
                            function_name: result.function_name.clone(),
                            function_version: result.function_version.to_string(),
                            call_digest: result.call_digest,
                            build_info: result.build_info.clone(),
                        })
                    }
                    _ => None,
                };
                Ok(Resolved {
                    output_digest: digest,
                    output_bytes: bytes,
                    output_class_name: self.class_name().to_string(),
                    provenance,
                })
            }
            None => Err(EngineError::Provenance(ProvenanceError::UnresolvedVersion {
                function_name: "detached pending call (no resolver attached)".to_string(),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prov_store::InMemoryResultTracker;

    fn tracker() -> InMemoryResultTracker {
        InMemoryResultTracker::new(prov_core::BuildInfo::new("c1", "b1"))
    }

    struct Identity;

    #[async_trait]
    impl prov_core::Function for Identity {
        fn name(&self) -> &str {
            "identity"
        }

        fn version(&self) -> Version {
            Version::new("1.0")
        }

        async fn call(&self, inputs: Vec<serde_json::Value>) -> prov_core::Result<serde_json::Value> {
            Ok(inputs.into_iter().next().unwrap_or(serde_json::Value::Null))
        }
    }

    #[tokio::test]
    async fn a_memo_miss_persists_the_build_info_blob() {
        let t = tracker();
        let mut registry = FunctionRegistry::new();
        registry.register(Arc::new(Identity));

        let leaf: Arc<dyn ErasedNode> = Arc::new(Leaf::new(1_i64, "i64"));
        let call = Call::<i64>::new(
            "identity",
            VirtualValue::inline(Version::new("1.0")),
            vec![leaf],
            "i64",
        );
        call.resolve(&t, &registry).await.unwrap();

        let build_bytes = serde_json::to_vec(&prov_core::BuildInfo::new("c1", "b1")).unwrap();
        let build_digest = digest_bytes(&build_bytes);
        assert!(t.has_blob(&build_digest).await.unwrap());
    }

    #[tokio::test]
    async fn leaf_resolves_to_a_stable_digest() {
        let t = tracker();
        let registry = FunctionRegistry::new();
        let leaf = Leaf::new(2_i64, "i64");
        let resolved = leaf.resolve(&t, &registry).await.unwrap();
        assert!(resolved.call_digest().is_none());
        assert_eq!(
            resolved.output_digest,
            digest_bytes(&resolved.output_bytes)
        );
    }

    #[tokio::test]
    async fn already_resolved_value_round_trips_as_an_input() {
        let t = tracker();
        let registry = FunctionRegistry::new();
        let node: ValueWithProvenance<i64> = ValueWithProvenance::unknown(7);
        let resolved = node.resolve(&t, &registry).await.unwrap();
        assert!(resolved.call_digest().is_none());
        assert_eq!(t.load_blob(&resolved.output_digest).await.unwrap(), resolved.output_bytes);
    }

    #[tokio::test]
    async fn pending_call_detached_from_its_inputs_cannot_resolve() {
        let t = tracker();
        let registry = FunctionRegistry::new();
        let node: ValueWithProvenance<i64> =
            ValueWithProvenance::call("add", VirtualValue::inline(Version::new("1.0")), vec![]);
        let err = node.resolve(&t, &registry).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Provenance(ProvenanceError::UnresolvedVersion { .. })
        ));
    }
}
