//! # Testing Utilities for MIR
//!
//! This module provides builders for constructing MIR functions in unit
//! tests, deriving value types as instructions are added.

use crate::{
    BasicBlockId, BinaryOp, FunctionId, Instruction, Literal, MirFunction, MirType, Terminator,
    TupleLiteral, Value, ValueId,
};

/// Builder for creating test MIR functions
pub struct TestFunctionBuilder {
    function: MirFunction,
    current_block: BasicBlockId,
}

impl TestFunctionBuilder {
    /// Creates a builder positioned at the entry block
    pub fn new(name: &str) -> Self {
        let function = MirFunction::new(name.to_string());
        let current_block = function.entry_block;
        Self {
            function,
            current_block,
        }
    }

    /// Adds a typed function parameter
    pub fn parameter(&mut self, ty: MirType) -> ValueId {
        self.function.add_parameter(ty)
    }

    /// Adds a new basic block
    pub fn new_block(&mut self) -> BasicBlockId {
        self.function.add_basic_block()
    }

    /// Adds a typed parameter to the given block
    pub fn block_param(&mut self, block: BasicBlockId, ty: MirType) -> ValueId {
        let id = self.function.new_typed_value_id(ty);
        self.function.basic_blocks[block].params.push(id);
        id
    }

    /// Makes the given block the insertion point
    pub fn switch_to(&mut self, block: BasicBlockId) {
        self.current_block = block;
    }

    fn push(&mut self, instruction: Instruction) {
        self.function.basic_blocks[self.current_block].push_instruction(instruction);
    }

    fn value_type(&self, id: ValueId) -> MirType {
        self.function.get_value_type_or_unknown(id)
    }

    /// Adds an i32 constant
    pub fn const_i32(&mut self, value: i64) -> ValueId {
        let dest = self.function.new_typed_value_id(MirType::i32());
        self.push(Instruction::const_scalar(
            dest,
            Literal::Int(value),
            MirType::i32(),
        ));
        dest
    }

    /// Adds a tuple construction; the result type is derived from the elements
    pub fn make_tuple(&mut self, elements: Vec<ValueId>) -> ValueId {
        let element_types: Vec<MirType> = elements.iter().map(|e| self.value_type(*e)).collect();
        let dest = self
            .function
            .new_typed_value_id(MirType::tuple(element_types));
        self.push(Instruction::make_tuple(
            dest,
            elements.into_iter().map(Value::operand).collect(),
        ));
        dest
    }

    /// Adds an empty tuple construction
    pub fn make_empty_tuple(&mut self) -> ValueId {
        self.make_tuple(Vec::new())
    }

    /// Adds a tuple destructuring, one destination per element
    pub fn to_elements(&mut self, tuple: ValueId) -> Vec<ValueId> {
        let element_types: Vec<MirType> = self
            .value_type(tuple)
            .tuple_elements()
            .map(|elements| elements.to_vec())
            .unwrap_or_default();
        let dests: Vec<ValueId> = element_types
            .into_iter()
            .map(|ty| self.function.new_typed_value_id(ty))
            .collect();
        self.push(Instruction::tuple_to_elements(
            dests.clone(),
            Value::operand(tuple),
        ));
        dests
    }

    /// Adds a tuple element extraction
    pub fn extract(&mut self, tuple: ValueId, index: usize) -> ValueId {
        let element_ty = self
            .value_type(tuple)
            .tuple_element_type(index)
            .cloned()
            .unwrap_or(MirType::unknown());
        let dest = self.function.new_typed_value_id(element_ty.clone());
        self.push(Instruction::extract_tuple_element(
            dest,
            Value::operand(tuple),
            index,
            element_ty,
        ));
        dest
    }

    /// Adds a tuple slice extraction
    pub fn extract_slice(&mut self, tuple: ValueId, indices: Vec<usize>) -> ValueId {
        let tuple_ty = self.value_type(tuple);
        let slice_ty = MirType::tuple(
            indices
                .iter()
                .map(|i| {
                    tuple_ty
                        .tuple_element_type(*i)
                        .cloned()
                        .unwrap_or(MirType::unknown())
                })
                .collect(),
        );
        let dest = self.function.new_typed_value_id(slice_ty.clone());
        self.push(Instruction::extract_tuple_slice(
            dest,
            Value::operand(tuple),
            indices,
            slice_ty,
        ));
        dest
    }

    /// Adds a tuple element insertion
    pub fn insert(&mut self, tuple: ValueId, index: usize, new_value: ValueId) -> ValueId {
        let tuple_ty = self.value_type(tuple);
        let dest = self.function.new_typed_value_id(tuple_ty.clone());
        self.push(Instruction::insert_tuple_element(
            dest,
            Value::operand(tuple),
            index,
            Value::operand(new_value),
            tuple_ty,
        ));
        dest
    }

    /// Adds a tuple slice insertion
    pub fn insert_slice(&mut self, tuple: ValueId, indices: Vec<usize>, slice: ValueId) -> ValueId {
        let tuple_ty = self.value_type(tuple);
        let dest = self.function.new_typed_value_id(tuple_ty.clone());
        self.push(Instruction::insert_tuple_slice(
            dest,
            Value::operand(tuple),
            indices,
            Value::operand(slice),
            tuple_ty,
        ));
        dest
    }

    /// Adds a tuple concatenation
    pub fn concat(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        let result_ty =
            Instruction::concat_result_type(&self.value_type(lhs), &self.value_type(rhs))
                .unwrap_or(MirType::unknown());
        let dest = self.function.new_typed_value_id(result_ty);
        self.push(Instruction::concat_tuples(
            dest,
            Value::operand(lhs),
            Value::operand(rhs),
        ));
        dest
    }

    /// Adds a tuple constant; the declared type is derived from the literal
    pub fn const_tuple(&mut self, literal: TupleLiteral) -> ValueId {
        let tuple_ty = literal.derived_type().unwrap_or(MirType::unknown());
        self.const_tuple_with_type(literal, tuple_ty)
    }

    /// Adds a tuple constant with an explicitly declared type
    pub fn const_tuple_with_type(&mut self, literal: TupleLiteral, tuple_ty: MirType) -> ValueId {
        let dest = self.function.new_typed_value_id(tuple_ty.clone());
        self.push(Instruction::const_tuple(dest, literal, tuple_ty));
        dest
    }

    /// Adds a binary operation typed after its left operand
    pub fn binary(&mut self, op: BinaryOp, left: ValueId, right: ValueId) -> ValueId {
        let dest = self.function.new_typed_value_id(self.value_type(left));
        self.push(Instruction::binary_op(
            op,
            dest,
            Value::operand(left),
            Value::operand(right),
        ));
        dest
    }

    /// Adds a call with the given result types
    pub fn call(
        &mut self,
        callee: FunctionId,
        args: Vec<ValueId>,
        result_types: Vec<MirType>,
    ) -> Vec<ValueId> {
        let dests: Vec<ValueId> = result_types
            .into_iter()
            .map(|ty| self.function.new_typed_value_id(ty))
            .collect();
        self.push(Instruction::call(
            dests.clone(),
            callee,
            args.into_iter().map(Value::operand).collect(),
        ));
        dests
    }

    /// Terminates the current block with a return, recording the return types
    pub fn ret(&mut self, values: Vec<ValueId>) {
        self.function.return_types = values.iter().map(|v| self.value_type(*v)).collect();
        self.function.basic_blocks[self.current_block].set_terminator(Terminator::return_values(
            values.into_iter().map(Value::operand).collect(),
        ));
    }

    /// Terminates the current block with a jump
    pub fn jump(&mut self, target: BasicBlockId, args: Vec<ValueId>) {
        self.function.basic_blocks[self.current_block].set_terminator(Terminator::jump_with_args(
            target,
            args.into_iter().map(Value::operand).collect(),
        ));
    }

    /// Terminates the current block with a conditional branch
    pub fn branch(&mut self, condition: ValueId, then_target: BasicBlockId, else_target: BasicBlockId) {
        self.function.basic_blocks[self.current_block].set_terminator(Terminator::branch(
            Value::operand(condition),
            then_target,
            else_target,
        ));
    }

    /// Finishes building and returns the function
    pub fn build(self) -> MirFunction {
        self.function
    }
}
