//! Thin entry points over [`crate::erased::ErasedNode::resolve`] for
//! callers that want a typed, closed `ValueWithProvenance<T>` back rather
//! than the raw type-erased [`Resolved`].

use serde::de::DeserializeOwned;

use prov_core::{FunctionCallResultNode, FunctionRegistry, Version, ValueWithProvenance};
use prov_store::ResultTracker;

use crate::erased::{ErasedNode, Resolved};
use crate::error::Result;

/// Resolve `node` and return the raw digests/bytes, without attempting to
/// decode the output into any particular type.
pub async fn resolve(
    node: &dyn ErasedNode,
    tracker: &dyn ResultTracker,
    registry: &FunctionRegistry,
) -> Result<Resolved> {
    node.resolve(tracker, registry).await
}

/// Resolve `node` and decode its output into the closed graph
/// representation: a [`ValueWithProvenance::FunctionCallResultWithProvenance`]
/// when the node resolved behind a tracked call, or an
/// [`ValueWithProvenance::unknown_resolved`] leaf otherwise.
pub async fn resolve_typed<T: DeserializeOwned>(
    node: &dyn ErasedNode,
    tracker: &dyn ResultTracker,
    registry: &FunctionRegistry,
) -> Result<ValueWithProvenance<T>> {
    let resolved = node.resolve(tracker, registry).await?;
    let value: T = serde_json::from_slice(&resolved.output_bytes)?;
    Ok(match resolved.provenance {
        Some(p) => ValueWithProvenance::FunctionCallResultWithProvenance(FunctionCallResultNode {
            call_digest: p.call_digest,
            function_name: p.function_name,
            function_version: Version::new(p.function_version),
            output: value,
            output_digest: resolved.output_digest,
            build_info: p.build_info,
        }),
        None => ValueWithProvenance::unknown_resolved(value, resolved.output_digest),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erased::{Call, Leaf};
    use async_trait::async_trait;
    use prov_core::{Function, Version};
    use prov_core::BuildInfo;
    use prov_store::InMemoryResultTracker;
    use serde_json::Value;
    use std::sync::Arc;

    struct Add;

    #[async_trait]
    impl Function for Add {
        fn name(&self) -> &str {
            "add"
        }

        fn version(&self) -> Version {
            Version::new("1.0")
        }

        async fn call(&self, inputs: Vec<Value>) -> prov_core::Result<Value> {
            let sum: i64 = inputs.iter().map(|v| v.as_i64().unwrap_or(0)).sum();
            Ok(Value::from(sum))
        }
    }

    fn setup() -> (InMemoryResultTracker, FunctionRegistry) {
        let tracker = InMemoryResultTracker::new(BuildInfo::new("c1", "b1"));
        let mut registry = FunctionRegistry::new();
        registry.register(Arc::new(Add));
        (tracker, registry)
    }

    #[tokio::test]
    async fn resolving_add_two_and_three_invokes_the_function_once() {
        let (tracker, registry) = setup();
        let call = Call::<i64>::new(
            "add",
            prov_core::VirtualValue::inline(Version::new("1.0")),
            vec![
                Arc::new(Leaf::new(2_i64, "i64")),
                Arc::new(Leaf::new(3_i64, "i64")),
            ],
            "i64",
        );

        let resolved = resolve_typed::<i64>(&call, &tracker, &registry).await.unwrap();
        assert_eq!(*resolved.output().unwrap(), 5);
        assert!(resolved.call_digest().is_some());
    }

    #[tokio::test]
    async fn repeated_resolution_hits_the_memo_without_reinvoking() {
        let (tracker, registry) = setup();
        let build_call = || {
            Call::<i64>::new(
                "add",
                prov_core::VirtualValue::inline(Version::new("1.0")),
                vec![
                    Arc::new(Leaf::new(2_i64, "i64")) as Arc<dyn ErasedNode>,
                    Arc::new(Leaf::new(3_i64, "i64")),
                ],
                "i64",
            )
        };

        let first = resolve_typed::<i64>(&build_call(), &tracker, &registry).await.unwrap();
        let second = resolve_typed::<i64>(&build_call(), &tracker, &registry).await.unwrap();
        assert_eq!(*first.output().unwrap(), 5);
        assert_eq!(*second.output().unwrap(), 5);
    }
}
