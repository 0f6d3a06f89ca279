//! # Tuple Decomposition Pass
//!
//! This pass eliminates every tuple-typed value (arbitrarily nested) from a
//! function, replacing each by the equivalent flat sequence of leaf values
//! threaded through the same operations.
//!
//! ## Algorithm Overview
//!
//! The pass plugs three pieces into the generic one-to-many conversion
//! engine in [`crate::conversion`]:
//!
//! 1. **[`TupleFlattener`]** converts a tuple type into the ordered list of
//!    leaf types it decomposes into (leaf types convert to themselves). The
//!    flattening of a type is memoized for the duration of one run.
//!
//! 2. **[`DecomposeTuplesRewriter`]** rewrites each structural instruction
//!    purely in terms of flat value sequences and the position index of
//!    [`crate::conversion::TypeMapping`]:
//!    - `make_tuple`, `to_elements`, `concat` forward their (already flat)
//!      operand sequences; no new instructions are needed
//!    - `extract_tuple` / `extract_slice` slice the operand's flat sequence
//!      by position; repeated positions contribute their leaves again
//!    - `insert_tuple` / `insert_slice` copy the operand's flat sequence and
//!      overwrite the mapped sub-ranges element-wise, skipping positions that
//!      occupy no slots (empty nested tuples)
//!    - `const_tuple` expands the nested literal into one scalar constant
//!      per leaf, in left-to-right depth-first order
//!
//! 3. The flattener's materializations reconcile converted and unconverted
//!    regions: a structured value is rebuilt from its leaves with nested
//!    `make_tuple`s (innermost first), and a structured value from an
//!    unconverted producer is taken apart with nested `to_elements`.
//!
//! Whether function signatures and block parameter lists participate is
//! controlled by [`ConversionConfig`]; boundaries that stay structured are
//! bridged by the materializations above.
//!
//! Any detected inconsistency (out-of-bounds position, underivable literal
//! type, mismatched slice arity) aborts the conversion and the function is
//! left untouched; [`DecomposeTuplesPass::run_on_module`] commits either
//! every function or none.

use std::cell::RefCell;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::conversion::driver::FlatValues;
use crate::conversion::{
    apply_one_to_n_conversion, ConversionConfig, ConversionError, OneToNRewritePattern,
    OneToNTypeConverter, RewriteAction, RewriteBuilder, RewriteCtx,
};
use crate::passes::MirPass;
use crate::{Instruction, InstructionKind, MirFunction, MirModule, MirType, Value};

/// Type converter that flattens tuple types into their leaf types
///
/// Leaf types convert to themselves; tuple types convert to the ordered list
/// of leaf types obtained by full recursive flattening, so the empty tuple
/// converts to nothing at all. Flattenings are memoized per type shape for
/// the duration of one conversion run (the pass is single-threaded, so a
/// `RefCell` suffices).
#[derive(Debug, Default)]
pub struct TupleFlattener {
    cache: RefCell<FxHashMap<MirType, Vec<MirType>>>,
}

impl TupleFlattener {
    /// Create a new flattener with an empty memo cache
    pub fn new() -> Self {
        Self::default()
    }
}

impl OneToNTypeConverter for TupleFlattener {
    fn convert_type(
        &self,
        ty: &MirType,
        results: &mut Vec<MirType>,
    ) -> Result<(), ConversionError> {
        if ty.is_leaf() {
            results.push(ty.clone());
            return Ok(());
        }

        if let Some(cached) = self.cache.borrow().get(ty) {
            results.extend_from_slice(cached);
            return Ok(());
        }

        let mut flat = Vec::new();
        ty.flattened_leaf_types(&mut flat);
        results.extend_from_slice(&flat);
        self.cache.borrow_mut().insert(ty.clone(), flat);
        Ok(())
    }

    /// Rebuilds a structured value of `target_ty` from its flat leaves
    ///
    /// Nested tuple elements are rebuilt first from their mapped sub-ranges,
    /// then a single `make_tuple` assembles the element values.
    fn materialize_structured(
        &self,
        builder: &mut RewriteBuilder<'_>,
        target_ty: &MirType,
        inputs: &[Value],
    ) -> Result<Value, ConversionError> {
        let MirType::Tuple(element_types) = target_ty else {
            // A leaf is its own flat form.
            if inputs.len() != 1 {
                return Err(ConversionError::failure(format!(
                    "cannot build a value of leaf type {target_ty} from {} values",
                    inputs.len()
                )));
            }
            return Ok(inputs[0]);
        };

        let mapping = self.convert_types(element_types)?;
        if inputs.len() != mapping.total_converted() {
            return Err(ConversionError::failure(format!(
                "cannot build a value of type {target_ty} from {} values, expected {}",
                inputs.len(),
                mapping.total_converted()
            )));
        }

        let mut elements = Vec::with_capacity(element_types.len());
        for (i, element_ty) in element_types.iter().enumerate() {
            let element_inputs = mapping.converted_values(inputs, i);
            elements.push(self.materialize_structured(builder, element_ty, element_inputs)?);
        }

        let dest = builder.new_typed_value(target_ty.clone());
        builder.emit(Instruction::make_tuple(dest, elements));
        Ok(Value::operand(dest))
    }

    /// Takes a structured tuple value apart into its flat leaves
    ///
    /// Emits one `to_elements` per nesting level and splices in the
    /// recursively decomposed results of nested tuple elements.
    fn materialize_flattened(
        &self,
        builder: &mut RewriteBuilder<'_>,
        source: Value,
    ) -> Result<SmallVec<[Value; 4]>, ConversionError> {
        let element_types = match builder.value_type(&source) {
            MirType::Tuple(elements) => elements,
            other => {
                return Err(ConversionError::failure(format!(
                    "cannot decompose value {source} of non-tuple type {other}"
                )))
            }
        };

        let mut dests = Vec::with_capacity(element_types.len());
        for element_ty in &element_types {
            dests.push(builder.new_typed_value(element_ty.clone()));
        }
        if !dests.is_empty() {
            builder.emit(Instruction::tuple_to_elements(dests.clone(), source));
        }

        let mut results = FlatValues::new();
        for (dest, element_ty) in dests.into_iter().zip(&element_types) {
            if element_ty.is_tuple() {
                results.extend(self.materialize_flattened(builder, Value::operand(dest))?);
            } else {
                results.push(Value::operand(dest));
            }
        }
        Ok(results)
    }
}

/// Rewrite rules for the structural tuple instructions
///
/// One rule per instruction kind, each expressed purely in terms of the
/// flattened operand sequences and the element-position mapping of the
/// operand's tuple type. Everything else is kept and remapped by the driver.
#[derive(Debug, Default)]
pub struct DecomposeTuplesRewriter;

impl DecomposeTuplesRewriter {
    /// The element types of the tuple-typed operand at `index`
    fn tuple_element_types(
        ctx: &RewriteCtx<'_, '_>,
        index: usize,
    ) -> Result<Vec<MirType>, ConversionError> {
        match ctx.operand_type(index) {
            MirType::Tuple(elements) => Ok(elements.clone()),
            other => Err(ConversionError::failure(format!(
                "expected a tuple-typed operand, found {other}"
            ))),
        }
    }

    fn check_position(position: usize, arity: usize) -> Result<(), ConversionError> {
        if position >= arity {
            return Err(ConversionError::PositionOutOfBounds { position, arity });
        }
        Ok(())
    }
}

impl OneToNRewritePattern for DecomposeTuplesRewriter {
    fn match_and_rewrite(
        &self,
        instruction: &Instruction,
        ctx: &mut RewriteCtx<'_, '_>,
    ) -> Result<RewriteAction, ConversionError> {
        match &instruction.kind {
            // Construction forwards the already-flat element sequences in
            // operand order; the tuple itself never materializes.
            InstructionKind::MakeTuple { elements, .. } => {
                let mut results = FlatValues::new();
                for index in 0..elements.len() {
                    results.extend(ctx.converted_operand(index)?);
                }
                Ok(RewriteAction::Replace(results))
            }

            // Destructuring forwards the flat operand sequence; the driver
            // splits it per the mapping of the declared element types.
            InstructionKind::TupleToElements { .. } => {
                Ok(RewriteAction::Replace(ctx.converted_operand(0)?))
            }

            InstructionKind::ConcatTuples { .. } => {
                let mut results = ctx.converted_operand(0)?;
                results.extend(ctx.converted_operand(1)?);
                Ok(RewriteAction::Replace(results))
            }

            InstructionKind::ConstTuple {
                literal, tuple_ty, ..
            } => {
                let Some(derived) = literal.derived_type() else {
                    return Err(ConversionError::type_mismatch(format!(
                        "literal {literal} contains an element without a derivable type"
                    )));
                };
                if derived != *tuple_ty {
                    return Err(ConversionError::type_mismatch(format!(
                        "const_tuple declared type {tuple_ty} does not match derived type {derived}"
                    )));
                }

                let mut scalars = Vec::new();
                literal.flattened_scalars(&mut scalars);

                let mut results = FlatValues::with_capacity(scalars.len());
                for (value, ty) in scalars {
                    let dest = ctx.builder().new_typed_value(ty.clone());
                    ctx.builder().emit(Instruction::const_scalar(dest, value, ty));
                    results.push(Value::operand(dest));
                }
                Ok(RewriteAction::Replace(results))
            }

            // An element is a contiguous slice of the flat sequence, so
            // extraction is pure list arithmetic.
            InstructionKind::ExtractTupleElement { index, .. } => {
                let element_types = Self::tuple_element_types(ctx, 0)?;
                Self::check_position(*index, element_types.len())?;

                let element_mapping = ctx.convert_types(&element_types)?;
                let flat = ctx.converted_operand(0)?;
                let values = element_mapping.converted_values(&flat, *index);
                Ok(RewriteAction::Replace(FlatValues::from_slice(values)))
            }

            // Ranges are concatenated in list order and never deduplicated:
            // a repeated position contributes its leaves again.
            InstructionKind::ExtractTupleSlice { indices, .. } => {
                let element_types = Self::tuple_element_types(ctx, 0)?;
                let element_mapping = ctx.convert_types(&element_types)?;
                let flat = ctx.converted_operand(0)?;

                let mut results = FlatValues::new();
                for &index in indices {
                    Self::check_position(index, element_types.len())?;
                    results.extend_from_slice(element_mapping.converted_values(&flat, index));
                }
                Ok(RewriteAction::Replace(results))
            }

            InstructionKind::InsertTupleElement { index, .. } => {
                let element_types = Self::tuple_element_types(ctx, 0)?;
                Self::check_position(*index, element_types.len())?;

                let element_mapping = ctx.convert_types(&element_types)?;
                let mut updated = ctx.converted_operand(0)?;
                let replacement = ctx.converted_operand(1)?;

                let mapping = element_mapping.input_mapping(*index);
                if replacement.len() != mapping.size {
                    return Err(ConversionError::type_mismatch(format!(
                        "insert_tuple replacement covers {} leaf values, position {} covers {}",
                        replacement.len(),
                        index,
                        mapping.size
                    )));
                }
                for (i, value) in replacement.iter().enumerate() {
                    updated[mapping.offset + i] = *value;
                }
                Ok(RewriteAction::Replace(updated))
            }

            InstructionKind::InsertTupleSlice { indices, .. } => {
                let tuple_types = Self::tuple_element_types(ctx, 0)?;
                let slice_types = Self::tuple_element_types(ctx, 1)?;
                if indices.len() != slice_types.len() {
                    return Err(ConversionError::type_mismatch(format!(
                        "insert_slice lists {} positions but the slice has {} elements",
                        indices.len(),
                        slice_types.len()
                    )));
                }

                let tuple_mapping = ctx.convert_types(&tuple_types)?;
                let slice_mapping = ctx.convert_types(&slice_types)?;
                let mut updated = ctx.converted_operand(0)?;
                let slice_values = ctx.converted_operand(1)?;

                for (slice_pos, &tuple_pos) in indices.iter().enumerate() {
                    Self::check_position(tuple_pos, tuple_types.len())?;

                    let slice_range = slice_mapping.input_mapping(slice_pos);
                    let tuple_range = tuple_mapping.input_mapping(tuple_pos);
                    if slice_range.size != tuple_range.size {
                        return Err(ConversionError::type_mismatch(format!(
                            "insert_slice element {} covers {} leaf values, position {} covers {}",
                            slice_pos, slice_range.size, tuple_pos, tuple_range.size
                        )));
                    }

                    // An empty nested tuple occupies no slots; nothing to overwrite.
                    if tuple_range.is_empty() {
                        continue;
                    }
                    for i in 0..slice_range.size {
                        updated[tuple_range.offset + i] = slice_values[slice_range.offset + i];
                    }
                }
                Ok(RewriteAction::Replace(updated))
            }

            // A tuple-typed copy forwards the source's flat sequence.
            InstructionKind::Assign { .. } if ctx.operand_type(0).is_tuple() => {
                Ok(RewriteAction::Replace(ctx.converted_operand(0)?))
            }

            _ => Ok(RewriteAction::Keep),
        }
    }
}

/// The tuple decomposition pass
///
/// Converts every function of a module (or a single function, through the
/// [`MirPass`] interface) so that no tuple-typed value remains in the
/// converted scope. The two [`ConversionConfig`] toggles control whether
/// function signatures and block parameter lists are converted as well;
/// boundaries left unconverted are bridged with explicit `make_tuple` /
/// `to_elements` materializations.
#[derive(Debug, Default)]
pub struct DecomposeTuplesPass {
    config: ConversionConfig,
}

impl DecomposeTuplesPass {
    /// Create the pass with full conversion (signatures and block parameters)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the pass with explicit conversion options
    pub const fn with_config(config: ConversionConfig) -> Self {
        Self { config }
    }

    /// Decompose tuples in every function of the module
    ///
    /// Transactional across the whole module: either every function converts
    /// and the module is updated, or the first error is returned and the
    /// module is left exactly as it was. Returns whether anything changed.
    pub fn run_on_module(&self, module: &mut MirModule) -> Result<bool, ConversionError> {
        let flattener = TupleFlattener::new();
        let rewriter = DecomposeTuplesRewriter;

        let mut converted = Vec::new();
        for (function_id, function) in module.functions() {
            let mut candidate = function.clone();
            let changed =
                apply_one_to_n_conversion(&mut candidate, &flattener, &rewriter, &self.config)?;
            if changed {
                converted.push((function_id, candidate));
            }
        }

        let any_changed = !converted.is_empty();
        for (function_id, function) in converted {
            module.functions[function_id] = function;
        }
        Ok(any_changed)
    }
}

impl MirPass for DecomposeTuplesPass {
    fn run(&mut self, function: &mut MirFunction) -> bool {
        let flattener = TupleFlattener::new();
        let rewriter = DecomposeTuplesRewriter;

        match apply_one_to_n_conversion(function, &flattener, &rewriter, &self.config) {
            Ok(changed) => changed,
            Err(err) => {
                log::warn!(
                    "tuple decomposition failed for function '{}': {}",
                    function.name,
                    err
                );
                false
            }
        }
    }

    fn name(&self) -> &'static str {
        "DecomposeTuples"
    }
}

#[cfg(test)]
#[path = "decompose_tuples_tests.rs"]
mod tests;
