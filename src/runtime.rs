//! Runtime field-value access contracts.
//!
//! These traits are the seam between this crate and whichever backend
//! performs actual bit-stream I/O: the expression evaluator reads scalars
//! through [`NumericValue`], and backends expose parsed structures and
//! arrays through [`StructAccess`] and [`ArrayAccess`]. The I/O itself is
//! out of scope here.

use std::fmt;

/// Numeric view of one parsed field value.
pub trait NumericValue {
    /// Value as a 32-bit signed integer.
    fn as_int(&self) -> i32;
    /// Value as a 64-bit signed integer.
    fn as_long(&self) -> i64;
    /// Value as a 32-bit float.
    fn as_float(&self) -> f32;
    /// Value as a 64-bit float.
    fn as_double(&self) -> f64;
    /// Value as a boolean (non-zero is true).
    fn as_bool(&self) -> bool;
}

impl NumericValue for i32 {
    fn as_int(&self) -> i32 {
        *self
    }

    fn as_long(&self) -> i64 {
        i64::from(*self)
    }

    fn as_float(&self) -> f32 {
        *self as f32
    }

    fn as_double(&self) -> f64 {
        f64::from(*self)
    }

    fn as_bool(&self) -> bool {
        *self != 0
    }
}

impl NumericValue for i64 {
    fn as_int(&self) -> i32 {
        *self as i32
    }

    fn as_long(&self) -> i64 {
        *self
    }

    fn as_float(&self) -> f32 {
        *self as f32
    }

    fn as_double(&self) -> f64 {
        *self as f64
    }

    fn as_bool(&self) -> bool {
        *self != 0
    }
}

/// Failure mode of a unique-field lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupError {
    /// No field with the requested name exists.
    Missing,
    /// More than one field carries the requested name.
    Ambiguous,
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("no field with that name"),
            Self::Ambiguous => f.write_str("more than one field with that name"),
        }
    }
}

impl std::error::Error for LookupError {}

/// Name-based access into one parsed structure.
pub trait StructAccess {
    /// First field with the given name, in declaration order.
    fn field_first(&self, name: &str) -> Option<&dyn NumericValue>;

    /// Last field with the given name, in declaration order.
    fn field_last(&self, name: &str) -> Option<&dyn NumericValue>;

    /// The single field with the given name; missing and duplicated names
    /// are distinct errors.
    fn field_unique(&self, name: &str) -> Result<&dyn NumericValue, LookupError>;
}

/// Index-based access into one parsed array field.
pub trait ArrayAccess {
    /// Number of elements.
    fn len(&self) -> usize;

    /// True when the array holds no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`, or `None` past the end.
    fn element_at(&self, index: usize) -> Option<&dyn NumericValue>;
}
