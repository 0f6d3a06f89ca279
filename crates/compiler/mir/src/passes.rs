//! # MIR Transformation Passes
//!
//! This module implements the passes that run on MIR functions, together
//! with the pass manager that sequences them.

pub mod decompose_tuples;

pub use decompose_tuples::{DecomposeTuplesPass, DecomposeTuplesRewriter, TupleFlattener};

use crate::{cfg, InstructionKind, MirFunction, MirType};

/// Analyzes a MIR function to determine if it contains tuple-typed values
/// or structural tuple instructions, so tuple decomposition can be skipped
/// for functions that don't need it.
pub fn function_uses_tuples(function: &MirFunction) -> bool {
    if function.value_types.values().any(MirType::is_tuple) {
        return true;
    }
    for block in function.basic_blocks.iter() {
        for instruction in &block.instructions {
            if instruction.is_tuple_op() {
                return true;
            }
        }
    }
    false
}

/// A trait for MIR transformation passes
pub trait MirPass {
    /// Apply this pass to a MIR function
    /// Returns true if the function was modified
    fn run(&mut self, function: &mut MirFunction) -> bool;

    /// Get the name of this pass for debugging
    fn name(&self) -> &'static str;
}

/// A wrapper for conditional pass execution
///
/// This allows passes to be skipped based on function characteristics,
/// improving compilation performance for functions that don't need certain
/// transformations.
pub struct ConditionalPass {
    pass: Box<dyn MirPass>,
    condition: fn(&MirFunction) -> bool,
}

impl ConditionalPass {
    /// Create a new conditional pass
    pub fn new(pass: Box<dyn MirPass>, condition: fn(&MirFunction) -> bool) -> Self {
        Self { pass, condition }
    }
}

impl MirPass for ConditionalPass {
    fn run(&mut self, function: &mut MirFunction) -> bool {
        if (self.condition)(function) {
            self.pass.run(function)
        } else {
            // Skip the pass - no changes needed
            false
        }
    }

    fn name(&self) -> &'static str {
        self.pass.name()
    }
}

/// Dead Code Elimination Pass
///
/// This pass identifies unreachable basic blocks and empties them out,
/// using the function's built-in reachability analysis.
#[derive(Debug, Default)]
pub struct DeadCodeElimination;

impl DeadCodeElimination {
    /// Create a new dead code elimination pass
    pub const fn new() -> Self {
        Self
    }
}

impl MirPass for DeadCodeElimination {
    fn run(&mut self, function: &mut MirFunction) -> bool {
        let unreachable = function.unreachable_blocks();

        if unreachable.is_empty() {
            return false;
        }

        // IndexVec doesn't support removal without invalidating ids, so dead
        // blocks are emptied in place instead of being compacted away.
        for block_id in unreachable {
            if let Some(block) = function.get_basic_block_mut(block_id) {
                block.params.clear();
                block.instructions.clear();
                block.set_terminator(crate::Terminator::Unreachable);
            }
        }

        true
    }

    fn name(&self) -> &'static str {
        "DeadCodeElimination"
    }
}

/// MIR Validation Pass
///
/// This pass validates the MIR function to ensure it meets all invariants.
/// It's useful to run after other passes to ensure correctness. Issues are
/// reported through the logging facade; the function is never modified.
#[derive(Debug, Default)]
pub struct Validation;

impl Validation {
    /// Create a new validation pass
    pub const fn new() -> Self {
        Self
    }
}

impl MirPass for Validation {
    fn run(&mut self, function: &mut MirFunction) -> bool {
        if let Err(err) = function.validate() {
            log::error!("MIR validation failed for function '{}': {}", function.name, err);
            return false;
        }

        self.validate_value_usage(function);
        self.validate_single_definition(function);
        self.validate_tuple_operations(function);
        self.validate_cfg_structure(function);

        false
    }

    fn name(&self) -> &'static str {
        "Validation"
    }
}

impl Validation {
    /// Validate that all used values are defined somewhere in the function
    ///
    /// Every used value must be a function parameter, a block parameter, or
    /// the destination of some instruction.
    fn validate_value_usage(&self, function: &MirFunction) {
        let mut all_defined_values = std::collections::HashSet::new();

        for param in &function.parameters {
            all_defined_values.insert(*param);
        }

        for (_block_id, block) in function.basic_blocks() {
            all_defined_values.extend(block.defined_values());
        }

        for (block_id, block) in function.basic_blocks() {
            for used_value in block.used_values() {
                if !all_defined_values.contains(&used_value) {
                    log::error!(
                        "Block {block_id:?} uses value {used_value:?} that is not defined anywhere in function '{}'",
                        function.name
                    );
                }
            }
        }
    }

    /// Validate that each value is defined exactly once (SSA form)
    fn validate_single_definition(&self, function: &MirFunction) {
        let mut defined_values = std::collections::HashSet::new();

        for &param_id in &function.parameters {
            if !defined_values.insert(param_id) {
                log::error!(
                    "Value {param_id:?} is defined multiple times as a parameter in function '{}'",
                    function.name
                );
            }
        }

        for (block_id, block) in function.basic_blocks() {
            for &param_id in &block.params {
                if !defined_values.insert(param_id) {
                    log::error!(
                        "Value {param_id:?} is defined multiple times (block {block_id:?} parameter) in function '{}'",
                        function.name
                    );
                }
            }
            for (instr_idx, instruction) in block.instructions.iter().enumerate() {
                for dest in instruction.destinations() {
                    if !defined_values.insert(dest) {
                        log::error!(
                            "Value {dest:?} is defined multiple times (block {block_id:?}, instruction {instr_idx}) in function '{}'",
                            function.name
                        );
                    }
                }
            }
        }
    }

    /// Validate tuple operations (make_tuple, extract_tuple, insert_tuple, ...)
    fn validate_tuple_operations(&self, function: &MirFunction) {
        for (block_id, block) in function.basic_blocks() {
            for (instr_idx, instruction) in block.instructions.iter().enumerate() {
                match &instruction.kind {
                    InstructionKind::ExtractTupleElement {
                        tuple,
                        index,
                        element_ty,
                        ..
                    } => {
                        let Some(tuple_id) = tuple.as_operand() else {
                            continue;
                        };
                        match function.get_value_type(tuple_id) {
                            Some(MirType::Tuple(elements)) => {
                                if *index >= elements.len() {
                                    log::error!(
                                        "Block {block_id:?}, instruction {instr_idx}: \
                                        extract_tuple index {} out of bounds for tuple with {} elements",
                                        index,
                                        elements.len()
                                    );
                                } else if elements[*index] != *element_ty
                                    && !matches!(element_ty, MirType::Unknown)
                                {
                                    log::error!(
                                        "Block {block_id:?}, instruction {instr_idx}: \
                                        extract_tuple type mismatch: expected {:?}, got {element_ty:?}",
                                        elements[*index]
                                    );
                                }
                            }
                            Some(other) => {
                                log::warn!(
                                    "Block {block_id:?}, instruction {instr_idx}: \
                                    extract_tuple on non-tuple type {other:?}"
                                );
                            }
                            None => {}
                        }
                    }

                    InstructionKind::ExtractTupleSlice { tuple, indices, .. } => {
                        let Some(tuple_id) = tuple.as_operand() else {
                            continue;
                        };
                        if let Some(MirType::Tuple(elements)) = function.get_value_type(tuple_id) {
                            for index in indices {
                                if *index >= elements.len() {
                                    log::error!(
                                        "Block {block_id:?}, instruction {instr_idx}: \
                                        extract_slice index {} out of bounds for tuple with {} elements",
                                        index,
                                        elements.len()
                                    );
                                }
                            }
                        }
                    }

                    InstructionKind::InsertTupleElement {
                        index, tuple_ty, ..
                    } => {
                        if let MirType::Tuple(elements) = tuple_ty {
                            if *index >= elements.len() {
                                log::error!(
                                    "Block {block_id:?}, instruction {instr_idx}: \
                                    insert_tuple index {} out of bounds for tuple with {} elements",
                                    index,
                                    elements.len()
                                );
                            }
                        } else {
                            log::warn!(
                                "Block {block_id:?}, instruction {instr_idx}: \
                                insert_tuple with non-tuple type {tuple_ty:?}"
                            );
                        }
                    }

                    InstructionKind::InsertTupleSlice {
                        indices,
                        slice,
                        tuple_ty,
                        ..
                    } => {
                        let MirType::Tuple(elements) = tuple_ty else {
                            log::warn!(
                                "Block {block_id:?}, instruction {instr_idx}: \
                                insert_slice with non-tuple type {tuple_ty:?}"
                            );
                            continue;
                        };
                        for index in indices {
                            if *index >= elements.len() {
                                log::error!(
                                    "Block {block_id:?}, instruction {instr_idx}: \
                                    insert_slice index {} out of bounds for tuple with {} elements",
                                    index,
                                    elements.len()
                                );
                            }
                        }
                        if let Some(slice_id) = slice.as_operand() {
                            if let Some(MirType::Tuple(slice_elements)) =
                                function.get_value_type(slice_id)
                            {
                                if slice_elements.len() != indices.len() {
                                    log::error!(
                                        "Block {block_id:?}, instruction {instr_idx}: \
                                        insert_slice lists {} positions but the slice has {} elements",
                                        indices.len(),
                                        slice_elements.len()
                                    );
                                }
                            }
                        }
                    }

                    InstructionKind::MakeTuple { dest, elements } => {
                        if let Some(MirType::Tuple(expected)) = function.get_value_type(*dest) {
                            if elements.len() != expected.len() {
                                log::error!(
                                    "Block {block_id:?}, instruction {instr_idx}: \
                                    make_tuple arity mismatch: expected {} elements, got {}",
                                    expected.len(),
                                    elements.len()
                                );
                            }
                        }
                    }

                    InstructionKind::TupleToElements { dests, tuple } => {
                        let Some(tuple_id) = tuple.as_operand() else {
                            continue;
                        };
                        if let Some(MirType::Tuple(elements)) = function.get_value_type(tuple_id) {
                            if dests.len() != elements.len() {
                                log::error!(
                                    "Block {block_id:?}, instruction {instr_idx}: \
                                    to_elements yields {} values for a tuple with {} elements",
                                    dests.len(),
                                    elements.len()
                                );
                            }
                        }
                    }

                    InstructionKind::ConstTuple {
                        literal, tuple_ty, ..
                    } => match literal.derived_type() {
                        Some(derived) => {
                            if derived != *tuple_ty {
                                log::error!(
                                    "Block {block_id:?}, instruction {instr_idx}: \
                                    const_tuple declared type {tuple_ty} does not match derived type {derived}"
                                );
                            }
                        }
                        None => {
                            log::error!(
                                "Block {block_id:?}, instruction {instr_idx}: \
                                const_tuple literal contains an element without a derivable type"
                            );
                        }
                    },

                    _ => {}
                }
            }
        }
    }

    /// Validate CFG structure (entry predecessors, unreachable blocks)
    fn validate_cfg_structure(&self, function: &MirFunction) {
        let unreachable = function.unreachable_blocks();
        if !unreachable.is_empty() {
            log::warn!(
                "Function '{}' contains {} unreachable blocks: {:?}",
                function.name,
                unreachable.len(),
                unreachable
            );
        }

        let entry_preds = cfg::get_predecessors(function, function.entry_block);
        if !entry_preds.is_empty() {
            log::error!(
                "Entry block {:?} has predecessors: {:?} in function '{}'",
                function.entry_block,
                entry_preds,
                function.name
            );
        }
    }
}

/// A pass manager that can run multiple passes in sequence
#[derive(Default)]
pub struct PassManager {
    passes: Vec<Box<dyn MirPass>>,
}

impl PassManager {
    /// Create a new pass manager
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// Add a pass to the manager
    pub fn add_pass<P: MirPass + 'static>(mut self, pass: P) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Add a conditional pass to the manager
    /// The pass will only run if the condition function returns true
    pub fn add_conditional_pass<P: MirPass + 'static>(
        mut self,
        pass: P,
        condition: fn(&MirFunction) -> bool,
    ) -> Self {
        self.passes
            .push(Box::new(ConditionalPass::new(Box::new(pass), condition)));
        self
    }

    /// Run all passes on the function
    /// Returns true if any pass modified the function
    pub fn run(&mut self, function: &mut MirFunction) -> bool {
        let mut modified = false;

        for pass in &mut self.passes {
            if pass.run(function) {
                modified = true;
                log::debug!(
                    "Pass '{}' modified function '{}'",
                    pass.name(),
                    function.name
                );
            }
        }

        modified
    }

    /// Create the tuple-lowering pipeline
    ///
    /// Validates, decomposes every tuple-typed value into its leaves (skipped
    /// for functions that carry no tuples), then cleans up and re-validates.
    pub fn decomposition_pipeline() -> Self {
        Self::new()
            .add_pass(Validation::new())
            .add_conditional_pass(DecomposeTuplesPass::new(), function_uses_tuples)
            .add_pass(DeadCodeElimination::new())
            .add_pass(Validation::new())
    }
}

#[cfg(test)]
#[path = "passes_tests.rs"]
mod tests;
