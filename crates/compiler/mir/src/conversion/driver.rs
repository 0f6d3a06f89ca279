//! # One-to-Many Conversion Driver
//!
//! The driver applies a one-to-many conversion to a whole function. It walks
//! blocks in def-before-use order, maintains the flat replacement values of
//! every converted definition, dispatches instructions to the registered
//! rewrite pattern, and inserts materializations wherever converted and
//! unconverted regions meet (call boundaries, returns, block arguments).
//!
//! The driver is transactional: it runs on a scratch clone of the function
//! and commits only if every rewrite succeeded, so a failed conversion leaves
//! the caller's function untouched.

use std::collections::HashSet;

use rustc_hash::FxHashMap;
use smallvec::{smallvec, SmallVec};

use crate::cfg;
use crate::conversion::{ConversionError, OneToNTypeConverter, TypeMapping};
use crate::{
    BasicBlockId, Instruction, InstructionKind, MirFunction, MirType, PrettyPrint, Terminator,
    Value, ValueId,
};

/// A flat sequence of converted values
pub type FlatValues = SmallVec<[Value; 4]>;

type Replacements = FxHashMap<ValueId, FlatValues>;

/// Options controlling how far the conversion extends beyond instructions
///
/// Instructions in the function body are always converted; the flags extend
/// the same treatment into the composable structural constructs around them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionConfig {
    /// Also convert function signatures: parameter and return types, call
    /// arguments and results, and `return` terminators
    pub convert_signatures: bool,

    /// Also convert control-flow joins: block parameter lists and the
    /// argument lists of jumps targeting them
    pub convert_block_params: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            convert_signatures: true,
            convert_block_params: true,
        }
    }
}

/// The outcome of matching a rewrite pattern against one instruction
#[derive(Debug)]
pub enum RewriteAction {
    /// The instruction is not converted; the driver remaps its operands and
    /// keeps it, materializing structured values where needed
    Keep,

    /// The instruction is replaced; the given flat sequence becomes the
    /// converted form of all its results, split per the result mapping
    Replace(FlatValues),
}

/// A rewrite rule set for one-to-many conversion
///
/// The driver supplies a [`RewriteCtx`] giving access to the already
/// flattened operand sequences; the pattern decides per instruction whether
/// to keep it or replace its results with a flat value sequence.
pub trait OneToNRewritePattern {
    fn match_and_rewrite(
        &self,
        instruction: &Instruction,
        ctx: &mut RewriteCtx<'_, '_>,
    ) -> Result<RewriteAction, ConversionError>;
}

/// Instruction emission context handed to patterns and materializations
///
/// New instructions are buffered and spliced into the block right before the
/// instruction being rewritten.
pub struct RewriteBuilder<'f> {
    pub(crate) function: &'f mut MirFunction,
    pending: Vec<Instruction>,
}

impl<'f> RewriteBuilder<'f> {
    pub(crate) fn new(function: &'f mut MirFunction) -> Self {
        Self {
            function,
            pending: Vec::new(),
        }
    }

    /// Allocates a fresh value with the given type
    pub fn new_typed_value(&mut self, ty: MirType) -> ValueId {
        self.function.new_typed_value_id(ty)
    }

    /// Buffers an instruction for insertion before the current rewrite point
    pub fn emit(&mut self, instruction: Instruction) {
        self.pending.push(instruction);
    }

    /// The type of a value; literals and error values have no recorded type
    pub fn value_type(&self, value: &Value) -> MirType {
        match value {
            Value::Operand(id) => self.function.get_value_type_or_unknown(*id),
            Value::Literal(_) | Value::Error => MirType::unknown(),
        }
    }

    /// The type recorded for a value ID
    pub fn value_id_type(&self, id: ValueId) -> MirType {
        self.function.get_value_type_or_unknown(id)
    }

    fn take_pending(&mut self) -> Vec<Instruction> {
        std::mem::take(&mut self.pending)
    }
}

/// Per-instruction rewrite context
///
/// Operand sequences are flattened lazily: a pattern that keeps an
/// instruction untouched never forces materialization of its operands.
pub struct RewriteCtx<'a, 'f> {
    converter: &'a dyn OneToNTypeConverter,
    builder: &'a mut RewriteBuilder<'f>,
    replacements: &'a Replacements,
    operands: SmallVec<[(Value, MirType); 4]>,
    flattened: Vec<Option<FlatValues>>,
}

impl<'a, 'f> RewriteCtx<'a, 'f> {
    fn new(
        converter: &'a dyn OneToNTypeConverter,
        builder: &'a mut RewriteBuilder<'f>,
        replacements: &'a Replacements,
        instruction: &Instruction,
    ) -> Self {
        let operands: SmallVec<[(Value, MirType); 4]> = instruction
            .operand_values()
            .into_iter()
            .map(|value| {
                let ty = builder.value_type(&value);
                (value, ty)
            })
            .collect();
        let flattened = vec![None; operands.len()];

        Self {
            converter,
            builder,
            replacements,
            operands,
            flattened,
        }
    }

    /// Number of operands of the matched instruction
    pub fn operand_count(&self) -> usize {
        self.operands.len()
    }

    /// The original type of the operand at `index`
    pub fn operand_type(&self, index: usize) -> &MirType {
        &self.operands[index].1
    }

    /// The flattened value sequence of the operand at `index`
    ///
    /// Upstream producers have already been rewritten, so this consults the
    /// replacement map first; a structured value from an unconverted region
    /// is materialized into its flat form on demand.
    pub fn converted_operand(&mut self, index: usize) -> Result<FlatValues, ConversionError> {
        let flat = match self.flattened[index].take() {
            Some(flat) => flat,
            None => {
                let (value, ty) = self.operands[index].clone();
                flatten_value(self.converter, self.builder, self.replacements, value, &ty)?
            }
        };
        self.flattened[index] = Some(flat.clone());
        Ok(flat)
    }

    /// Builds a [`TypeMapping`] for an arbitrary type list (e.g. the element
    /// types of a tuple operand)
    pub fn convert_types(&self, types: &[MirType]) -> Result<TypeMapping, ConversionError> {
        self.converter.convert_types(types)
    }

    /// Access to the emission context
    pub fn builder(&mut self) -> &mut RewriteBuilder<'f> {
        self.builder
    }
}

/// Applies a one-to-many conversion to `function`
///
/// Returns whether the function was modified. On error the function is left
/// exactly as it was: the conversion runs on a scratch copy and only commits
/// when every rewrite and materialization succeeded.
pub fn apply_one_to_n_conversion(
    function: &mut MirFunction,
    converter: &dyn OneToNTypeConverter,
    pattern: &dyn OneToNRewritePattern,
    config: &ConversionConfig,
) -> Result<bool, ConversionError> {
    let mut scratch = function.clone();

    let mut conversion = FunctionConversion {
        converter,
        pattern,
        config: *config,
        replacements: Replacements::default(),
    };
    conversion.run(&mut scratch)?;

    if scratch == *function {
        return Ok(false);
    }
    *function = scratch;
    Ok(true)
}

struct FunctionConversion<'a> {
    converter: &'a dyn OneToNTypeConverter,
    pattern: &'a dyn OneToNRewritePattern,
    config: ConversionConfig,
    replacements: Replacements,
}

impl FunctionConversion<'_> {
    fn run(&mut self, function: &mut MirFunction) -> Result<(), ConversionError> {
        if self.config.convert_signatures {
            let params = std::mem::take(&mut function.parameters);
            function.parameters = self.convert_value_list(function, params)?;

            let mapping = self.converter.convert_types(&function.return_types)?;
            if !mapping.is_identity() {
                function.return_types = mapping.converted_types().to_vec();
            }
        }

        if self.config.convert_block_params {
            let block_ids: Vec<BasicBlockId> = function
                .basic_blocks
                .iter_enumerated()
                .map(|(id, _)| id)
                .collect();
            for block_id in block_ids {
                let params = std::mem::take(&mut function.basic_blocks[block_id].params);
                let converted = self.convert_value_list(function, params)?;
                function.basic_blocks[block_id].params = converted;
            }
        }

        for block_id in conversion_order(function) {
            self.process_block(function, block_id)?;
        }

        Ok(())
    }

    /// Converts a parameter-like value list, allocating fresh leaf values for
    /// every entry whose type does not convert 1:1 to itself
    fn convert_value_list(
        &mut self,
        function: &mut MirFunction,
        values: Vec<ValueId>,
    ) -> Result<Vec<ValueId>, ConversionError> {
        let mut converted_list = Vec::with_capacity(values.len());
        for value_id in values {
            let ty = function.get_value_type_or_unknown(value_id);
            let mut converted = Vec::new();
            self.converter.convert_type(&ty, &mut converted)?;

            if converted.len() == 1 && converted[0] == ty {
                converted_list.push(value_id);
                continue;
            }

            let mut flat = FlatValues::new();
            for leaf_ty in converted {
                let id = function.new_typed_value_id(leaf_ty);
                converted_list.push(id);
                flat.push(Value::operand(id));
            }
            self.replacements.insert(value_id, flat);
        }
        Ok(converted_list)
    }

    fn process_block(
        &mut self,
        function: &mut MirFunction,
        block_id: BasicBlockId,
    ) -> Result<(), ConversionError> {
        let instructions = std::mem::take(&mut function.basic_blocks[block_id].instructions);
        let mut rewritten = Vec::with_capacity(instructions.len());
        let mut builder = RewriteBuilder::new(function);

        for instruction in instructions {
            self.process_instruction(instruction, &mut builder, &mut rewritten)?;
        }

        let terminator = std::mem::replace(
            &mut builder.function.basic_blocks[block_id].terminator,
            Terminator::Unreachable,
        );
        let terminator = self.rewrite_terminator(terminator, &mut builder)?;
        rewritten.extend(builder.take_pending());

        builder.function.basic_blocks[block_id].instructions = rewritten;
        builder.function.basic_blocks[block_id].terminator = terminator;
        Ok(())
    }

    fn process_instruction(
        &mut self,
        instruction: Instruction,
        builder: &mut RewriteBuilder<'_>,
        out: &mut Vec<Instruction>,
    ) -> Result<(), ConversionError> {
        // Call boundaries follow the signature-conversion toggle rather than
        // the pattern set.
        if matches!(instruction.kind, InstructionKind::Call { .. }) {
            return self.rewrite_call(instruction, builder, out);
        }

        let action = {
            let mut ctx = RewriteCtx::new(self.converter, builder, &self.replacements, &instruction);
            self.pattern.match_and_rewrite(&instruction, &mut ctx)?
        };

        match action {
            RewriteAction::Keep => {
                let mut instruction = instruction;
                self.remap_kept_instruction(&mut instruction, builder)?;
                out.extend(builder.take_pending());
                out.push(instruction);
            }
            RewriteAction::Replace(flat) => {
                out.extend(builder.take_pending());
                self.install_replacements(&instruction, &flat, builder)?;
            }
        }
        Ok(())
    }

    /// Rewrites the operands of an instruction that stays unconverted,
    /// rebuilding structured values where operands were converted upstream
    fn remap_kept_instruction(
        &self,
        instruction: &mut Instruction,
        builder: &mut RewriteBuilder<'_>,
    ) -> Result<(), ConversionError> {
        let converter = self.converter;
        let replacements = &self.replacements;
        let mut first_error = None;

        instruction.visit_values_mut(&mut |value: &mut Value| {
            if first_error.is_some() {
                return;
            }
            let ty = builder.value_type(value);
            match structured_value(converter, builder, replacements, *value, &ty) {
                Ok(new_value) => *value = new_value,
                Err(err) => first_error = Some(err),
            }
        });

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Records the flat result sequence of a replaced instruction, split per
    /// the mapping of its declared result types
    fn install_replacements(
        &mut self,
        instruction: &Instruction,
        flat: &[Value],
        builder: &mut RewriteBuilder<'_>,
    ) -> Result<(), ConversionError> {
        let dests = instruction.destinations();
        let mut dest_types = Vec::with_capacity(dests.len());
        for dest in &dests {
            dest_types.push(builder.value_id_type(*dest));
        }

        let mapping = self.converter.convert_types(&dest_types)?;
        if flat.len() != mapping.total_converted() {
            return Err(ConversionError::failure(format!(
                "rewrite of '{}' produced {} values, expected {}",
                instruction.pretty_print(0),
                flat.len(),
                mapping.total_converted()
            )));
        }

        for (i, dest) in dests.iter().enumerate() {
            let values = mapping.converted_values(flat, i);
            self.replacements.insert(*dest, FlatValues::from_slice(values));
        }
        Ok(())
    }

    fn rewrite_call(
        &mut self,
        instruction: Instruction,
        builder: &mut RewriteBuilder<'_>,
        out: &mut Vec<Instruction>,
    ) -> Result<(), ConversionError> {
        let Instruction {
            kind,
            source_span,
            comment,
        } = instruction;
        let InstructionKind::Call {
            dests,
            callee,
            args,
        } = kind
        else {
            return Err(ConversionError::failure(
                "call rewrite invoked on a non-call instruction",
            ));
        };

        let (dests, args) = if self.config.convert_signatures {
            let args = self.flatten_value_list(args, builder)?;
            let dests = self.convert_value_list(builder.function, dests)?;
            (dests, args)
        } else {
            let args = self.remap_value_list(args, builder)?;
            (dests, args)
        };

        let mut call = Instruction::call(dests, callee, args);
        call.source_span = source_span;
        call.comment = comment;
        out.extend(builder.take_pending());
        out.push(call);
        Ok(())
    }

    fn rewrite_terminator(
        &mut self,
        terminator: Terminator,
        builder: &mut RewriteBuilder<'_>,
    ) -> Result<Terminator, ConversionError> {
        match terminator {
            Terminator::Jump { target, args } => {
                let args = if self.config.convert_block_params {
                    self.flatten_value_list(args, builder)?
                } else {
                    self.remap_value_list(args, builder)?
                };
                Ok(Terminator::Jump { target, args })
            }

            Terminator::If {
                condition,
                then_target,
                else_target,
            } => {
                let ty = builder.value_type(&condition);
                let condition =
                    structured_value(self.converter, builder, &self.replacements, condition, &ty)?;
                Ok(Terminator::If {
                    condition,
                    then_target,
                    else_target,
                })
            }

            Terminator::Return { values } => {
                let values = if self.config.convert_signatures {
                    self.flatten_value_list(values, builder)?
                } else {
                    self.remap_value_list(values, builder)?
                };
                Ok(Terminator::Return { values })
            }

            Terminator::Unreachable => Ok(Terminator::Unreachable),
        }
    }

    fn flatten_value_list(
        &self,
        values: Vec<Value>,
        builder: &mut RewriteBuilder<'_>,
    ) -> Result<Vec<Value>, ConversionError> {
        let mut flat = Vec::with_capacity(values.len());
        for value in values {
            let ty = builder.value_type(&value);
            let converted =
                flatten_value(self.converter, builder, &self.replacements, value, &ty)?;
            flat.extend(converted);
        }
        Ok(flat)
    }

    fn remap_value_list(
        &self,
        values: Vec<Value>,
        builder: &mut RewriteBuilder<'_>,
    ) -> Result<Vec<Value>, ConversionError> {
        let mut remapped = Vec::with_capacity(values.len());
        for value in values {
            let ty = builder.value_type(&value);
            remapped.push(structured_value(
                self.converter,
                builder,
                &self.replacements,
                value,
                &ty,
            )?);
        }
        Ok(remapped)
    }
}

/// Blocks in def-before-use order: reverse postorder first, then any blocks
/// unreachable from the entry in index order
fn conversion_order(function: &MirFunction) -> Vec<BasicBlockId> {
    let mut order = cfg::reverse_postorder(function);
    let reached: HashSet<BasicBlockId> = order.iter().copied().collect();
    for (block_id, _) in function.basic_blocks.iter_enumerated() {
        if !reached.contains(&block_id) {
            order.push(block_id);
        }
    }
    order
}

/// The flat converted form of one value
///
/// Consults the replacement map for converted definitions; identity-converted
/// values pass through; a structured value from an unconverted region is
/// materialized via the converter.
fn flatten_value(
    converter: &dyn OneToNTypeConverter,
    builder: &mut RewriteBuilder<'_>,
    replacements: &Replacements,
    value: Value,
    ty: &MirType,
) -> Result<FlatValues, ConversionError> {
    if let Value::Operand(id) = value {
        if let Some(flat) = replacements.get(&id) {
            return Ok(flat.clone());
        }
    }

    let mut converted = Vec::new();
    converter.convert_type(ty, &mut converted)?;
    if converted.len() == 1 && converted[0] == *ty {
        return Ok(smallvec![value]);
    }

    converter.materialize_flattened(builder, value)
}

/// The structured form of one value for an unconverted consumer
///
/// A converted leaf maps to its single replacement; a converted composite is
/// rebuilt via the converter's structured materialization.
fn structured_value(
    converter: &dyn OneToNTypeConverter,
    builder: &mut RewriteBuilder<'_>,
    replacements: &Replacements,
    value: Value,
    ty: &MirType,
) -> Result<Value, ConversionError> {
    let Value::Operand(id) = value else {
        return Ok(value);
    };
    let Some(flat) = replacements.get(&id) else {
        return Ok(value);
    };

    let mut converted = Vec::new();
    converter.convert_type(ty, &mut converted)?;
    if converted.len() == 1 && converted[0] == *ty {
        if flat.len() == 1 {
            return Ok(flat[0]);
        }
        return Err(ConversionError::failure(format!(
            "value {value} of type {ty} was converted to {} values, expected 1",
            flat.len()
        )));
    }

    converter.materialize_structured(builder, ty, flat)
}
