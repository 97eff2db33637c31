//! The provenance graph algebra: `ValueWithProvenance<T>` and its six
//! shapes. Pure data — no I/O here. Resolving a pending call, running a
//! function, and persisting records all live in `prov_engine`; this module
//! only knows how to hold, inspect, and deflate the graph once it exists.

use std::fmt;
use std::sync::Arc;

use crate::build::BuildInfo;
use crate::digest::Digest;
use crate::version::Version;
use crate::virtual_value::VirtualValue;

/// Anything that can sit in a call's input slot. Implemented for
/// `ValueWithProvenance<T>` itself (below) so a call's inputs can be a
/// heterogeneous `Vec<Arc<dyn ProvenanceNode>>` without every input sharing
/// one concrete `T`.
///
/// `prov_engine::ErasedNode` extends this with the async resolve/save
/// methods that need a `ResultTracker` and `FunctionRegistry`; keeping
/// those off this trait is what lets this crate stay I/O-free.
pub trait ProvenanceNode: Send + Sync + fmt::Debug {
    /// The content digest of this node's value, if it's known without
    /// doing any I/O (i.e. the node isn't a not-yet-resolved call).
    fn known_digest(&self) -> Option<Digest>;
}

/// A value with no provenance: supplied directly by a caller rather than
/// produced by a tracked function call. Not yet digested.
#[derive(Debug, Clone)]
pub struct UnknownProvenanceNode<T> {
    pub value: T,
}

/// An [`UnknownProvenanceNode`] whose digest has since been computed.
#[derive(Debug, Clone)]
pub struct UnknownProvenanceResolvedNode<T> {
    pub value: T,
    pub digest: Digest,
}

/// A pending function call: named, versioned (possibly not yet resolved
/// itself), with a list of input nodes. Has not been executed, memoized,
/// or assigned a digest.
#[derive(Debug, Clone)]
pub struct FunctionCallNode<T> {
    pub function_name: String,
    pub function_version: VirtualValue<Version>,
    pub inputs: Vec<Arc<dyn ProvenanceNode>>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> FunctionCallNode<T> {
    pub fn new(
        function_name: impl Into<String>,
        function_version: VirtualValue<Version>,
        inputs: Vec<Arc<dyn ProvenanceNode>>,
    ) -> Self {
        Self {
            function_name: function_name.into(),
            function_version,
            inputs,
            _marker: std::marker::PhantomData,
        }
    }
}

/// The resolved result of a [`FunctionCallNode`]: the call's own digest,
/// the output value, the output's digest, and the build context that
/// produced it — either stamped fresh on a memo miss or recovered from the
/// stored result record on a memo hit.
#[derive(Debug, Clone)]
pub struct FunctionCallResultNode<T> {
    pub call_digest: Digest,
    pub function_name: String,
    pub function_version: Version,
    pub output: T,
    pub output_digest: Digest,
    pub build_info: BuildInfo,
}

/// A call known only by its digest — inputs have been deflated away. This
/// is the "WithoutInputs" shape used to stub out nested calls embedded in
/// an enclosing call record. `output_class_name` is the codec tag the call's
/// output was persisted under, carried along so this stub alone is enough
/// to know which codec a reader needs before it ever loads the full record.
#[derive(Debug, Clone)]
pub struct FunctionCallDeflatedNode<T> {
    pub call_digest: Digest,
    pub function_name: String,
    pub function_version: Version,
    pub output_class_name: String,
    _marker: std::marker::PhantomData<fn() -> T>,
}

/// A call result known only by digests, with no inline output value.
#[derive(Debug, Clone)]
pub struct FunctionCallResultDeflatedNode<T> {
    pub call_digest: Digest,
    pub output_digest: Digest,
    _marker: std::marker::PhantomData<fn() -> T>,
}

/// The six shapes a value's provenance can take. Generic over the output
/// type `T`; `inputs` in the call variants are type-erased because a
/// call's inputs need not all share `T`.
#[derive(Debug, Clone)]
pub enum ValueWithProvenance<T> {
    UnknownProvenance(UnknownProvenanceNode<T>),
    UnknownProvenanceResolved(UnknownProvenanceResolvedNode<T>),
    FunctionCallWithProvenance(FunctionCallNode<T>),
    FunctionCallResultWithProvenance(FunctionCallResultNode<T>),
    FunctionCallWithProvenanceDeflated(FunctionCallDeflatedNode<T>),
    FunctionCallResultWithProvenanceDeflated(FunctionCallResultDeflatedNode<T>),
}

impl<T> ValueWithProvenance<T> {
    pub fn unknown(value: T) -> Self {
        Self::UnknownProvenance(UnknownProvenanceNode { value })
    }

    pub fn unknown_resolved(value: T, digest: Digest) -> Self {
        Self::UnknownProvenanceResolved(UnknownProvenanceResolvedNode { value, digest })
    }

    pub fn call(
        function_name: impl Into<String>,
        function_version: VirtualValue<Version>,
        inputs: Vec<Arc<dyn ProvenanceNode>>,
    ) -> Self {
        Self::FunctionCallWithProvenance(FunctionCallNode::new(
            function_name,
            function_version,
            inputs,
        ))
    }

    /// The output value, if this node carries one inline (everything but
    /// the two deflated, digest-only shapes).
    pub fn output(&self) -> Option<&T> {
        match self {
            Self::UnknownProvenance(n) => Some(&n.value),
            Self::UnknownProvenanceResolved(n) => Some(&n.value),
            Self::FunctionCallResultWithProvenance(n) => Some(&n.output),
            Self::FunctionCallWithProvenance(_)
            | Self::FunctionCallWithProvenanceDeflated(_)
            | Self::FunctionCallResultWithProvenanceDeflated(_) => None,
        }
    }

    /// Digest of the *value*, not the call record, when already known
    /// without I/O.
    pub fn value_digest(&self) -> Option<Digest> {
        match self {
            Self::UnknownProvenance(_) => None,
            Self::UnknownProvenanceResolved(n) => Some(n.digest),
            Self::FunctionCallWithProvenance(_) => None,
            Self::FunctionCallResultWithProvenance(n) => Some(n.output_digest),
            Self::FunctionCallWithProvenanceDeflated(_) => None,
            Self::FunctionCallResultWithProvenanceDeflated(n) => Some(n.output_digest),
        }
    }

    pub fn is_deflated(&self) -> bool {
        matches!(
            self,
            Self::FunctionCallWithProvenanceDeflated(_)
                | Self::FunctionCallResultWithProvenanceDeflated(_)
        )
    }

    pub fn is_resolved_call(&self) -> bool {
        matches!(
            self,
            Self::FunctionCallResultWithProvenance(_)
                | Self::FunctionCallResultWithProvenanceDeflated(_)
        )
    }

    /// The digest of the call record that produced this value, when this
    /// node remembers one — `None` for a leaf with no call behind it.
    pub fn call_digest(&self) -> Option<Digest> {
        match self {
            Self::FunctionCallResultWithProvenance(n) => Some(n.call_digest),
            Self::FunctionCallWithProvenanceDeflated(n) => Some(n.call_digest),
            Self::FunctionCallResultWithProvenanceDeflated(n) => Some(n.call_digest),
            _ => None,
        }
    }
}

impl<T: fmt::Debug + Send + Sync> ProvenanceNode for ValueWithProvenance<T> {
    fn known_digest(&self) -> Option<Digest> {
        self.value_digest()
    }
}

impl<T: Clone> ValueWithProvenance<T> {
    /// Strip a resolved call down to its digest-only form, dropping the
    /// inline output and any input references. Requires the call to
    /// already be resolved (has a `call_digest`); callers resolve first.
    pub fn deflate_result(
        call_digest: Digest,
        output_digest: Digest,
    ) -> FunctionCallResultDeflatedNode<T> {
        FunctionCallResultDeflatedNode {
            call_digest,
            output_digest,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn deflate_call(
        call_digest: Digest,
        function_name: String,
        function_version: Version,
        output_class_name: String,
    ) -> FunctionCallDeflatedNode<T> {
        FunctionCallDeflatedNode {
            call_digest,
            function_name,
            function_version,
            output_class_name,
            _marker: std::marker::PhantomData,
        }
    }

    /// No-copy: a node already in one of the two deflated shapes is
    /// returned as the same `Arc`, not a structurally-identical copy.
    /// Only `FunctionCallResultWithProvenance` actually deflates into a
    /// new allocation; every other shape has nothing to drop and passes
    /// through unchanged.
    pub fn deflate(node: Arc<Self>) -> Arc<Self> {
        if node.is_deflated() {
            return node;
        }
        match node.as_ref() {
            Self::FunctionCallResultWithProvenance(n) => Arc::new(
                Self::FunctionCallResultWithProvenanceDeflated(Self::deflate_result(
                    n.call_digest,
                    n.output_digest,
                )),
            ),
            _ => node,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_provenance_has_no_digest_until_resolved() {
        let node: ValueWithProvenance<i64> = ValueWithProvenance::unknown(42);
        assert_eq!(node.value_digest(), None);
        assert_eq!(node.output(), Some(&42));
    }

    #[test]
    fn unknown_provenance_resolved_carries_its_digest() {
        let d = Digest::of_bytes(b"42");
        let node: ValueWithProvenance<i64> = ValueWithProvenance::unknown_resolved(42, d);
        assert_eq!(node.value_digest(), Some(d));
    }

    #[test]
    fn pending_call_has_no_output_or_digest() {
        let node: ValueWithProvenance<i64> =
            ValueWithProvenance::call("add", VirtualValue::inline(Version::new("1.0")), vec![]);
        assert_eq!(node.output(), None);
        assert_eq!(node.value_digest(), None);
        assert!(!node.is_resolved_call());
    }

    #[test]
    fn deflated_result_reports_is_deflated_and_is_resolved() {
        let node: ValueWithProvenance<i64> =
            ValueWithProvenance::FunctionCallResultWithProvenanceDeflated(
                ValueWithProvenance::<i64>::deflate_result(
                    Digest::of_bytes(b"call"),
                    Digest::of_bytes(b"5"),
                ),
            );
        assert!(node.is_deflated());
        assert!(node.is_resolved_call());
        assert_eq!(node.output(), None);
    }

    #[test]
    fn deflated_call_carries_its_output_class_name_and_digest() {
        let call_digest = Digest::of_bytes(b"call");
        let node: ValueWithProvenance<i64> = ValueWithProvenance::FunctionCallWithProvenanceDeflated(
            ValueWithProvenance::<i64>::deflate_call(
                call_digest,
                "add".to_string(),
                Version::new("1.0"),
                "i64".to_string(),
            ),
        );
        assert_eq!(node.call_digest(), Some(call_digest));
        assert!(node.is_deflated());
        assert!(!node.is_resolved_call());
    }

    #[test]
    fn deflate_is_a_no_copy_no_op_on_an_already_deflated_node() {
        let node = Arc::new(ValueWithProvenance::<i64>::FunctionCallResultWithProvenanceDeflated(
            ValueWithProvenance::<i64>::deflate_result(
                Digest::of_bytes(b"call"),
                Digest::of_bytes(b"5"),
            ),
        ));
        let deflated = ValueWithProvenance::deflate(Arc::clone(&node));
        assert!(Arc::ptr_eq(&node, &deflated));
    }

    #[test]
    fn deflate_allocates_a_new_node_for_a_resolved_call_result() {
        let node = Arc::new(ValueWithProvenance::FunctionCallResultWithProvenance(
            FunctionCallResultNode {
                call_digest: Digest::of_bytes(b"call"),
                function_name: "add".to_string(),
                function_version: Version::new("1.0"),
                output: 5_i64,
                output_digest: Digest::of_bytes(b"5"),
                build_info: BuildInfo::new("c1", "b1"),
            },
        ));
        let deflated = ValueWithProvenance::deflate(Arc::clone(&node));
        assert!(!Arc::ptr_eq(&node, &deflated));
        assert!(deflated.is_deflated());
        assert_eq!(deflated.call_digest(), node.call_digest());
    }

    #[test]
    fn deflate_passes_through_a_value_with_nothing_to_deflate() {
        let node: Arc<ValueWithProvenance<i64>> = Arc::new(ValueWithProvenance::unknown(42));
        let deflated = ValueWithProvenance::deflate(Arc::clone(&node));
        assert!(Arc::ptr_eq(&node, &deflated));
    }
}
