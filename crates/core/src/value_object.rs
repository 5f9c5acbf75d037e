//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity and are immutable: a unit cost of 0.50 is
/// interchangeable with any other unit cost of 0.50. To "modify" one, build a
/// new value through its validating constructor.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
