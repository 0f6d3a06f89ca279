//! # MIR Instructions
//!
//! This module defines the instruction types for MIR.
//! Instructions perform computations but do not transfer control flow.

use std::collections::HashSet;

use chumsky::span::SimpleSpan;
use smallvec::SmallVec;

use crate::{MirType, PrettyPrint, TupleLiteral, Value, ValueId};

/// Binary operations available in MIR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Neq,
}

/// An instruction performs an operation but does NOT transfer control
///
/// Instructions always fall through to the next instruction in the block.
/// Control flow changes are handled exclusively by terminators.
///
/// # Design Notes
///
/// - All instructions follow three-address code (TAC) format
/// - Each instruction has at most one operation
/// - Most instructions define one value; `call` and `to_elements` define several
/// - Source location is preserved for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// The kind of instruction and its operands
    pub kind: InstructionKind,

    /// Source location for diagnostics and debugging
    pub source_span: Option<SimpleSpan<usize>>,

    /// Optional comment for debugging
    pub comment: Option<String>,
}

/// The different kinds of instructions available in MIR
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionKind {
    /// Simple assignment: `dest = source`
    Assign { dest: ValueId, source: Value },

    /// Binary operation: `dest = left op right`
    BinaryOp {
        op: BinaryOp,
        dest: ValueId,
        left: Value,
        right: Value,
    },

    /// Scalar constant: `dest = const value: ty`
    Const {
        dest: ValueId,
        value: crate::Literal,
        ty: MirType,
    },

    /// Function call: `dests = call callee(args)`
    /// For calling functions that return zero or more values
    Call {
        dests: Vec<ValueId>,
        callee: crate::FunctionId,
        args: Vec<Value>,
    },

    /// Tuple construction: `dest = make_tuple e0, e1, ...`
    /// Builds a tuple from one value per element type
    MakeTuple { dest: ValueId, elements: Vec<Value> },

    /// Tuple destructuring: `d0, d1, ... = to_elements tuple`
    /// Yields one value per immediate element (one level, not recursive)
    TupleToElements { dests: Vec<ValueId>, tuple: Value },

    /// Element read: `dest = extract_tuple tuple, index`
    ExtractTupleElement {
        dest: ValueId,
        tuple: Value,
        index: usize,
        element_ty: MirType,
    },

    /// Sub-tuple read: `dest = extract_slice tuple, [i0, i1, ...]`
    /// Assembles a tuple from the elements at the given ordered positions;
    /// positions may repeat or be non-contiguous
    ExtractTupleSlice {
        dest: ValueId,
        tuple: Value,
        indices: Vec<usize>,
        slice_ty: MirType,
    },

    /// Functional element update: `dest = insert_tuple tuple, index, new_value`
    /// Produces a tuple equal to the input except at `index`
    InsertTupleElement {
        dest: ValueId,
        tuple: Value,
        index: usize,
        new_value: Value,
        tuple_ty: MirType,
    },

    /// Functional multi-element update: `dest = insert_slice tuple, [i0, ...], slice`
    /// Replaces the listed positions element-wise from `slice`, whose element
    /// types must equal the tuple's element types at those positions
    InsertTupleSlice {
        dest: ValueId,
        tuple: Value,
        indices: Vec<usize>,
        slice: Value,
        tuple_ty: MirType,
    },

    /// Tuple concatenation: `dest = concat lhs, rhs`
    ConcatTuples {
        dest: ValueId,
        lhs: Value,
        rhs: Value,
    },

    /// Tuple constant: `dest = const_tuple literal: ty`
    /// Materializes a nested tuple literal; `tuple_ty` is the declared self
    /// type and must match the type derived from the literal's contents
    ConstTuple {
        dest: ValueId,
        literal: TupleLiteral,
        tuple_ty: MirType,
    },
}

impl Instruction {
    /// Creates a new assignment instruction
    pub const fn assign(dest: ValueId, source: Value) -> Self {
        Self {
            kind: InstructionKind::Assign { dest, source },
            source_span: None,
            comment: None,
        }
    }

    /// Creates a new binary operation instruction
    pub const fn binary_op(op: BinaryOp, dest: ValueId, left: Value, right: Value) -> Self {
        Self {
            kind: InstructionKind::BinaryOp {
                op,
                dest,
                left,
                right,
            },
            source_span: None,
            comment: None,
        }
    }

    /// Creates a new scalar constant instruction
    pub const fn const_scalar(dest: ValueId, value: crate::Literal, ty: MirType) -> Self {
        Self {
            kind: InstructionKind::Const { dest, value, ty },
            source_span: None,
            comment: None,
        }
    }

    /// Creates a new call instruction
    pub const fn call(dests: Vec<ValueId>, callee: crate::FunctionId, args: Vec<Value>) -> Self {
        Self {
            kind: InstructionKind::Call {
                dests,
                callee,
                args,
            },
            source_span: None,
            comment: None,
        }
    }

    /// Creates a new tuple construction instruction
    pub const fn make_tuple(dest: ValueId, elements: Vec<Value>) -> Self {
        Self {
            kind: InstructionKind::MakeTuple { dest, elements },
            source_span: None,
            comment: None,
        }
    }

    /// Creates a new tuple destructuring instruction
    pub const fn tuple_to_elements(dests: Vec<ValueId>, tuple: Value) -> Self {
        Self {
            kind: InstructionKind::TupleToElements { dests, tuple },
            source_span: None,
            comment: None,
        }
    }

    /// Creates a new tuple element extraction instruction
    pub const fn extract_tuple_element(
        dest: ValueId,
        tuple: Value,
        index: usize,
        element_ty: MirType,
    ) -> Self {
        Self {
            kind: InstructionKind::ExtractTupleElement {
                dest,
                tuple,
                index,
                element_ty,
            },
            source_span: None,
            comment: None,
        }
    }

    /// Creates a new tuple slice extraction instruction
    pub const fn extract_tuple_slice(
        dest: ValueId,
        tuple: Value,
        indices: Vec<usize>,
        slice_ty: MirType,
    ) -> Self {
        Self {
            kind: InstructionKind::ExtractTupleSlice {
                dest,
                tuple,
                indices,
                slice_ty,
            },
            source_span: None,
            comment: None,
        }
    }

    /// Creates a new tuple element insertion instruction
    pub const fn insert_tuple_element(
        dest: ValueId,
        tuple: Value,
        index: usize,
        new_value: Value,
        tuple_ty: MirType,
    ) -> Self {
        Self {
            kind: InstructionKind::InsertTupleElement {
                dest,
                tuple,
                index,
                new_value,
                tuple_ty,
            },
            source_span: None,
            comment: None,
        }
    }

    /// Creates a new tuple slice insertion instruction
    pub const fn insert_tuple_slice(
        dest: ValueId,
        tuple: Value,
        indices: Vec<usize>,
        slice: Value,
        tuple_ty: MirType,
    ) -> Self {
        Self {
            kind: InstructionKind::InsertTupleSlice {
                dest,
                tuple,
                indices,
                slice,
                tuple_ty,
            },
            source_span: None,
            comment: None,
        }
    }

    /// Creates a new tuple concatenation instruction
    pub const fn concat_tuples(dest: ValueId, lhs: Value, rhs: Value) -> Self {
        Self {
            kind: InstructionKind::ConcatTuples { dest, lhs, rhs },
            source_span: None,
            comment: None,
        }
    }

    /// Creates a new tuple constant instruction
    pub const fn const_tuple(dest: ValueId, literal: TupleLiteral, tuple_ty: MirType) -> Self {
        Self {
            kind: InstructionKind::ConstTuple {
                dest,
                literal,
                tuple_ty,
            },
            source_span: None,
            comment: None,
        }
    }

    /// Infers the result type of concatenating two tuple types
    ///
    /// Returns None if either side is not a tuple.
    pub fn concat_result_type(lhs_ty: &MirType, rhs_ty: &MirType) -> Option<MirType> {
        let (MirType::Tuple(lhs), MirType::Tuple(rhs)) = (lhs_ty, rhs_ty) else {
            return None;
        };
        let mut elements = Vec::with_capacity(lhs.len() + rhs.len());
        elements.extend(lhs.iter().cloned());
        elements.extend(rhs.iter().cloned());
        Some(MirType::Tuple(elements))
    }

    /// Sets the source span for this instruction
    pub const fn with_span(mut self, span: SimpleSpan<usize>) -> Self {
        self.source_span = Some(span);
        self
    }

    /// Sets a comment for this instruction
    pub fn with_comment(mut self, comment: String) -> Self {
        self.comment = Some(comment);
        self
    }

    /// Returns the destination values if this instruction defines any
    pub fn destinations(&self) -> Vec<ValueId> {
        match &self.kind {
            InstructionKind::Assign { dest, .. }
            | InstructionKind::BinaryOp { dest, .. }
            | InstructionKind::Const { dest, .. }
            | InstructionKind::MakeTuple { dest, .. }
            | InstructionKind::ExtractTupleElement { dest, .. }
            | InstructionKind::ExtractTupleSlice { dest, .. }
            | InstructionKind::InsertTupleElement { dest, .. }
            | InstructionKind::InsertTupleSlice { dest, .. }
            | InstructionKind::ConcatTuples { dest, .. }
            | InstructionKind::ConstTuple { dest, .. } => vec![*dest],

            InstructionKind::Call { dests, .. }
            | InstructionKind::TupleToElements { dests, .. } => dests.clone(),
        }
    }

    /// Returns the destination value if this instruction defines exactly one
    pub fn destination(&self) -> Option<ValueId> {
        let dests = self.destinations();
        if dests.len() == 1 {
            Some(dests[0])
        } else {
            None
        }
    }

    /// Returns the input values of this instruction, in operand order
    ///
    /// The order is significant: rewrite rules address operands by index.
    pub fn operand_values(&self) -> SmallVec<[Value; 4]> {
        let mut operands = SmallVec::new();
        match &self.kind {
            InstructionKind::Assign { source, .. } => operands.push(*source),
            InstructionKind::BinaryOp { left, right, .. } => {
                operands.push(*left);
                operands.push(*right);
            }
            InstructionKind::Const { .. } | InstructionKind::ConstTuple { .. } => {}
            InstructionKind::Call { args, .. } => operands.extend(args.iter().copied()),
            InstructionKind::MakeTuple { elements, .. } => {
                operands.extend(elements.iter().copied());
            }
            InstructionKind::TupleToElements { tuple, .. }
            | InstructionKind::ExtractTupleElement { tuple, .. }
            | InstructionKind::ExtractTupleSlice { tuple, .. } => operands.push(*tuple),
            InstructionKind::InsertTupleElement {
                tuple, new_value, ..
            } => {
                operands.push(*tuple);
                operands.push(*new_value);
            }
            InstructionKind::InsertTupleSlice { tuple, slice, .. } => {
                operands.push(*tuple);
                operands.push(*slice);
            }
            InstructionKind::ConcatTuples { lhs, rhs, .. } => {
                operands.push(*lhs);
                operands.push(*rhs);
            }
        }
        operands
    }

    /// Visits every input value of this instruction mutably
    ///
    /// Destinations are not visited; this is for operand rewriting only.
    pub fn visit_values_mut<F: FnMut(&mut Value)>(&mut self, f: &mut F) {
        match &mut self.kind {
            InstructionKind::Assign { source, .. } => f(source),
            InstructionKind::BinaryOp { left, right, .. } => {
                f(left);
                f(right);
            }
            InstructionKind::Const { .. } | InstructionKind::ConstTuple { .. } => {}
            InstructionKind::Call { args, .. } => {
                for arg in args {
                    f(arg);
                }
            }
            InstructionKind::MakeTuple { elements, .. } => {
                for element in elements {
                    f(element);
                }
            }
            InstructionKind::TupleToElements { tuple, .. }
            | InstructionKind::ExtractTupleElement { tuple, .. }
            | InstructionKind::ExtractTupleSlice { tuple, .. } => f(tuple),
            InstructionKind::InsertTupleElement {
                tuple, new_value, ..
            } => {
                f(tuple);
                f(new_value);
            }
            InstructionKind::InsertTupleSlice { tuple, slice, .. } => {
                f(tuple);
                f(slice);
            }
            InstructionKind::ConcatTuples { lhs, rhs, .. } => {
                f(lhs);
                f(rhs);
            }
        }
    }

    /// Returns all values used by this instruction
    pub fn used_values(&self) -> HashSet<ValueId> {
        self.operand_values()
            .iter()
            .filter_map(Value::as_operand)
            .collect()
    }

    /// Returns true if this is one of the structural tuple instructions
    pub const fn is_tuple_op(&self) -> bool {
        matches!(
            self.kind,
            InstructionKind::MakeTuple { .. }
                | InstructionKind::TupleToElements { .. }
                | InstructionKind::ExtractTupleElement { .. }
                | InstructionKind::ExtractTupleSlice { .. }
                | InstructionKind::InsertTupleElement { .. }
                | InstructionKind::InsertTupleSlice { .. }
                | InstructionKind::ConcatTuples { .. }
                | InstructionKind::ConstTuple { .. }
        )
    }

    /// Validates this instruction
    pub fn validate(&self) -> Result<(), String> {
        match &self.kind {
            InstructionKind::ConstTuple {
                literal, tuple_ty, ..
            } => {
                if let Some(derived) = literal.derived_type() {
                    if derived != *tuple_ty {
                        return Err(format!(
                            "const_tuple type must be {derived}, not {tuple_ty}"
                        ));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Returns true if this instruction has side effects
    pub const fn has_side_effects(&self) -> bool {
        matches!(self.kind, InstructionKind::Call { .. })
    }

    /// Returns true if this instruction is pure (no side effects, result only depends on inputs)
    pub const fn is_pure(&self) -> bool {
        !self.has_side_effects()
    }
}

fn format_dests(dests: &[ValueId]) -> String {
    dests
        .iter()
        .map(|d| d.pretty_print(0))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_indices(indices: &[usize]) -> String {
    let inner = indices
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{inner}]")
}

impl PrettyPrint for Instruction {
    fn pretty_print(&self, _indent: usize) -> String {
        let mut result = String::new();

        // Add comment if present
        if let Some(comment) = &self.comment {
            result.push_str(&format!("// {comment}\n"));
        }

        match &self.kind {
            InstructionKind::Assign { dest, source } => {
                result.push_str(&format!(
                    "{} = {}",
                    dest.pretty_print(0),
                    source.pretty_print(0)
                ));
            }

            InstructionKind::BinaryOp {
                op,
                dest,
                left,
                right,
            } => {
                result.push_str(&format!(
                    "{} = {} {:?} {}",
                    dest.pretty_print(0),
                    left.pretty_print(0),
                    op,
                    right.pretty_print(0)
                ));
            }

            InstructionKind::Const { dest, value, ty } => {
                result.push_str(&format!(
                    "{} = const {}: {}",
                    dest.pretty_print(0),
                    value.pretty_print(0),
                    ty
                ));
            }

            InstructionKind::Call {
                dests,
                callee,
                args,
            } => {
                let args_str = args
                    .iter()
                    .map(|arg| arg.pretty_print(0))
                    .collect::<Vec<_>>()
                    .join(", ");

                if dests.is_empty() {
                    result.push_str(&format!("call {callee:?}({args_str})"));
                } else {
                    result.push_str(&format!(
                        "{} = call {:?}({})",
                        format_dests(dests),
                        callee,
                        args_str
                    ));
                }
            }

            InstructionKind::MakeTuple { dest, elements } => {
                let elements_str = elements
                    .iter()
                    .map(|e| e.pretty_print(0))
                    .collect::<Vec<_>>()
                    .join(", ");
                result.push_str(&format!(
                    "{} = make_tuple {}",
                    dest.pretty_print(0),
                    elements_str
                ));
            }

            InstructionKind::TupleToElements { dests, tuple } => {
                result.push_str(&format!(
                    "{} = to_elements {}",
                    format_dests(dests),
                    tuple.pretty_print(0)
                ));
            }

            InstructionKind::ExtractTupleElement {
                dest, tuple, index, ..
            } => {
                result.push_str(&format!(
                    "{} = extract_tuple {}, {}",
                    dest.pretty_print(0),
                    tuple.pretty_print(0),
                    index
                ));
            }

            InstructionKind::ExtractTupleSlice {
                dest,
                tuple,
                indices,
                ..
            } => {
                result.push_str(&format!(
                    "{} = extract_slice {}, {}",
                    dest.pretty_print(0),
                    tuple.pretty_print(0),
                    format_indices(indices)
                ));
            }

            InstructionKind::InsertTupleElement {
                dest,
                tuple,
                index,
                new_value,
                ..
            } => {
                result.push_str(&format!(
                    "{} = insert_tuple {}, {}, {}",
                    dest.pretty_print(0),
                    tuple.pretty_print(0),
                    index,
                    new_value.pretty_print(0)
                ));
            }

            InstructionKind::InsertTupleSlice {
                dest,
                tuple,
                indices,
                slice,
                ..
            } => {
                result.push_str(&format!(
                    "{} = insert_slice {}, {}, {}",
                    dest.pretty_print(0),
                    tuple.pretty_print(0),
                    format_indices(indices),
                    slice.pretty_print(0)
                ));
            }

            InstructionKind::ConcatTuples { dest, lhs, rhs } => {
                result.push_str(&format!(
                    "{} = concat {}, {}",
                    dest.pretty_print(0),
                    lhs.pretty_print(0),
                    rhs.pretty_print(0)
                ));
            }

            InstructionKind::ConstTuple {
                dest,
                literal,
                tuple_ty,
            } => {
                result.push_str(&format!(
                    "{} = const_tuple {}: {}",
                    dest.pretty_print(0),
                    literal.pretty_print(0),
                    tuple_ty
                ));
            }
        }

        result
    }
}

impl PrettyPrint for ValueId {
    fn pretty_print(&self, _indent: usize) -> String {
        format!("%{}", self.index())
    }
}
