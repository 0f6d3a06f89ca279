//! # MIR Type System
//!
//! This module defines the type system for MIR. It is self-contained and
//! lifetime-free so that types can be stored alongside MIR values.
//!
//! Tuple types are structural: two tuples with the same element-type sequence
//! are the same type, and elements may themselves be tuples to arbitrary
//! depth. Every non-tuple type is a *leaf* occupying exactly one value slot.

/// A type in the MIR layer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MirType {
    /// Boolean type
    Bool,

    /// 32-bit signed integer type
    I32,

    /// 64-bit signed integer type
    I64,

    /// Tuple type with element types, any of which may be a tuple itself
    Tuple(Vec<MirType>),

    /// Unknown type (for incomplete analysis)
    Unknown,
}

impl MirType {
    /// Creates a boolean type
    pub const fn bool() -> Self {
        Self::Bool
    }

    /// Creates a 32-bit integer type
    pub const fn i32() -> Self {
        Self::I32
    }

    /// Creates a 64-bit integer type
    pub const fn i64() -> Self {
        Self::I64
    }

    /// Creates a tuple type
    pub const fn tuple(types: Vec<Self>) -> Self {
        Self::Tuple(types)
    }

    /// Creates the empty tuple type
    pub const fn unit() -> Self {
        Self::Tuple(Vec::new())
    }

    /// Creates an unknown type
    pub const fn unknown() -> Self {
        Self::Unknown
    }

    /// Returns true if this is a tuple type
    pub const fn is_tuple(&self) -> bool {
        matches!(self, Self::Tuple(_))
    }

    /// Returns true if this type has no internal structure (one value slot)
    pub const fn is_leaf(&self) -> bool {
        !self.is_tuple()
    }

    /// Gets the element types of a tuple, or None for leaf types
    pub fn tuple_elements(&self) -> Option<&[Self]> {
        match self {
            Self::Tuple(types) => Some(types),
            _ => None,
        }
    }

    /// Gets the type of a tuple element by index
    /// Returns None if the index is out of bounds or this is not a tuple type
    pub fn tuple_element_type(&self, index: usize) -> Option<&Self> {
        match self {
            Self::Tuple(types) => types.get(index),
            _ => None,
        }
    }

    /// Number of leaf slots this type decomposes into
    ///
    /// A leaf counts as one slot; a tuple counts as the sum over its
    /// elements, so the empty tuple occupies zero slots.
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Tuple(types) => types.iter().map(Self::leaf_count).sum(),
            _ => 1,
        }
    }

    /// Appends the fully flattened leaf types of this type, depth first
    ///
    /// For a leaf type this is the type itself; for a tuple it is the
    /// concatenation of the flattened element types in order.
    pub fn flattened_leaf_types(&self, result: &mut Vec<Self>) {
        match self {
            Self::Tuple(types) => {
                for ty in types {
                    ty.flattened_leaf_types(result);
                }
            }
            _ => result.push(self.clone()),
        }
    }
}

impl std::fmt::Display for MirType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::I32 => write!(f, "i32"),
            Self::I64 => write!(f, "i64"),
            Self::Tuple(types) => {
                write!(f, "(")?;
                for (i, ty) in types.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{ty}")?;
                }
                write!(f, ")")
            }
            Self::Unknown => write!(f, "<unknown>"),
        }
    }
}
