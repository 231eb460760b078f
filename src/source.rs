//! The type-erased currency that flows between resolvers, property
//! accessors, and scalar (de)serialization.
//!
//! Per Design Note §9 ("User context is opaque... carry as a type-erased
//! handle"), the same trick is used here for the value a resolver returns
//! and the value a [`crate::schema::meta::PropertyAccessor`] reads off of
//! it: both are arbitrary host-defined Rust types, type-erased behind
//! [`Source`], downcast by the host's own accessors/scalar callbacks which
//! know the concrete shape. The execution core itself never downcasts —
//! it only ever moves `Source` handles around and asks the schema's
//! callbacks to interpret them.

use std::any::Any;
use std::sync::Arc;

/// A type-erased, reference-counted handle to a resolved value.
///
/// Cloning a [`Source`] is an `Arc` clone, not a deep copy — cheap, and
/// safe to share across the concurrently-scheduled siblings the executor
/// fans out to (see spec.md §5).
pub type Source = Arc<dyn Any + Send + Sync>;

/// Wraps a concrete value as a [`Source`] handle.
pub fn source<T: Any + Send + Sync>(value: T) -> Source {
    Arc::new(value)
}

/// Downcasts a [`Source`] back to a concrete type, for host-supplied
/// callbacks (accessors, scalar `serialize`/`parseValue`) that know what
/// they put in.
pub fn downcast_ref<T: Any>(source: &Source) -> Option<&T> {
    source.downcast_ref::<T>()
}
