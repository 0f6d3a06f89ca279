//! # MIR Values
//!
//! This module defines values and operands in the MIR system.
//! Values represent data that flows through the program.

use crate::{MirType, PrettyPrint};

/// Represents any value in the program: literals, variables, temporaries, etc.
///
/// Values in MIR can be either immediate constants or references to computed
/// values. This design supports both efficient constant propagation and
/// general computation.
///
/// # Design Notes
///
/// - Literals are embedded directly for efficiency
/// - Operands reference values computed by instructions or block parameters
/// - The type is Copy for efficient passing around
/// - Error values support graceful error recovery
#[derive(Debug, Clone, PartialEq, Eq, Hash, Copy)]
pub enum Value {
    /// A constant literal value
    Literal(Literal),

    /// An operand that references a computed value (variable, temporary, etc.)
    /// The `ValueId` points to the instruction or parameter that produces this value
    Operand(crate::ValueId),

    /// A placeholder for unresolved or error values
    /// Used for error recovery during MIR construction
    Error,
}

/// Literal constant values
///
/// These represent compile-time known scalar constants that can be embedded
/// directly in the MIR without requiring computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Copy)]
pub enum Literal {
    /// Integer literal
    Int(i64),

    /// Boolean literal
    Bool(bool),
}

impl Value {
    /// Creates a new integer literal value
    pub const fn integer(value: i64) -> Self {
        Self::Literal(Literal::Int(value))
    }

    /// Creates a new boolean literal value
    pub const fn boolean(value: bool) -> Self {
        Self::Literal(Literal::Bool(value))
    }

    /// Creates a new operand value
    pub const fn operand(id: crate::ValueId) -> Self {
        Self::Operand(id)
    }

    /// Creates an error value for error recovery
    pub const fn error() -> Self {
        Self::Error
    }

    /// Returns true if this is a literal value
    pub const fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Returns true if this is an operand reference
    pub const fn is_operand(&self) -> bool {
        matches!(self, Self::Operand(_))
    }

    /// Returns the literal value if this is a literal
    pub const fn as_literal(&self) -> Option<Literal> {
        match self {
            Self::Literal(lit) => Some(*lit),
            _ => None,
        }
    }

    /// Returns the operand ID if this is an operand
    pub const fn as_operand(&self) -> Option<crate::ValueId> {
        match self {
            Self::Operand(id) => Some(*id),
            _ => None,
        }
    }
}

impl Literal {
    /// Returns the integer value if this is an integer literal
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Bool(value) => Some(*value as i64),
        }
    }

    /// Returns the boolean value if this is a boolean literal
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

impl PrettyPrint for Value {
    fn pretty_print(&self, _indent: usize) -> String {
        match self {
            Self::Literal(lit) => lit.pretty_print(0),
            Self::Operand(id) => format!("%{}", id.index()),
            Self::Error => "<error>".to_string(),
        }
    }
}

impl PrettyPrint for Literal {
    fn pretty_print(&self, _indent: usize) -> String {
        match self {
            Self::Int(value) => value.to_string(),
            Self::Bool(value) => value.to_string(),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pretty_print(0))
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pretty_print(0))
    }
}

// Convenience conversion methods
impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::integer(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::boolean(value)
    }
}

impl From<crate::ValueId> for Value {
    fn from(id: crate::ValueId) -> Self {
        Self::operand(id)
    }
}

impl From<Literal> for Value {
    fn from(lit: Literal) -> Self {
        Self::Literal(lit)
    }
}

/// A nested tuple constant, used by the `const_tuple` instruction
///
/// The shape mirrors tuple types: a node is either a typed scalar or an
/// ordered list of sub-literals, recursively to arbitrary depth.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TupleLiteral {
    /// A scalar leaf carrying its type
    Scalar { value: Literal, ty: MirType },

    /// A nested tuple of sub-literals
    Tuple(Vec<TupleLiteral>),
}

impl TupleLiteral {
    /// Creates a scalar leaf literal
    pub const fn scalar(value: Literal, ty: MirType) -> Self {
        Self::Scalar { value, ty }
    }

    /// Creates an integer leaf literal
    pub const fn int(value: i64, ty: MirType) -> Self {
        Self::Scalar {
            value: Literal::Int(value),
            ty,
        }
    }

    /// Creates a nested tuple literal
    pub const fn tuple(elements: Vec<TupleLiteral>) -> Self {
        Self::Tuple(elements)
    }

    /// Derives the type of this literal from its contents
    ///
    /// Returns None if any scalar leaf carries an unknown type, in which case
    /// the literal cannot be materialized.
    pub fn derived_type(&self) -> Option<MirType> {
        match self {
            Self::Scalar { ty, .. } => {
                if matches!(ty, MirType::Unknown) {
                    None
                } else {
                    Some(ty.clone())
                }
            }
            Self::Tuple(elements) => {
                let mut types = Vec::with_capacity(elements.len());
                for element in elements {
                    types.push(element.derived_type()?);
                }
                Some(MirType::Tuple(types))
            }
        }
    }

    /// Appends the scalar leaves of this literal in left-to-right,
    /// depth-first order, mirroring type flattening
    pub fn flattened_scalars(&self, result: &mut Vec<(Literal, MirType)>) {
        match self {
            Self::Scalar { value, ty } => result.push((*value, ty.clone())),
            Self::Tuple(elements) => {
                for element in elements {
                    element.flattened_scalars(result);
                }
            }
        }
    }
}

impl PrettyPrint for TupleLiteral {
    fn pretty_print(&self, _indent: usize) -> String {
        match self {
            Self::Scalar { value, .. } => value.pretty_print(0),
            Self::Tuple(elements) => {
                let inner = elements
                    .iter()
                    .map(|e| e.pretty_print(0))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({inner})")
            }
        }
    }
}

impl std::fmt::Display for TupleLiteral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pretty_print(0))
    }
}
