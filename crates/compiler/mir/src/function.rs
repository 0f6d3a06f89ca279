//! # MIR Function
//!
//! This module defines the function-level MIR representation, including
//! the Control Flow Graph (CFG) of basic blocks.

use index_vec::IndexVec;
use rustc_hash::FxHashMap;
use std::collections::HashSet;

use crate::{
    indent_str, BasicBlock, BasicBlockId, MirType, PrettyPrint, Terminator, ValueId,
};

/// The MIR for a single function, laid out as a Control Flow Graph (CFG)
///
/// A `MirFunction` represents the complete control flow and data flow
/// for a single function, using a graph of basic blocks.
///
/// # Design Notes
///
/// - Basic blocks are stored in an `IndexVec` for efficient access
/// - Each function has exactly one entry block
/// - Every value carries its type in `value_types`
/// - Parameters are values bound by the caller, in signature order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirFunction {
    /// The name of the function (for debugging and linking)
    pub name: String,

    /// All basic blocks in this function, forming the CFG
    pub basic_blocks: IndexVec<BasicBlockId, BasicBlock>,

    /// The entry point of the function (always valid if function has blocks)
    pub entry_block: BasicBlockId,

    /// Function parameters mapped to their MIR values
    /// The order matches the function signature
    pub parameters: Vec<ValueId>,

    /// The declared return types of the function, in order
    pub return_types: Vec<MirType>,

    /// Next available value ID for generating new temporaries
    /// This is maintained to ensure unique value IDs within the function
    pub(crate) next_value_id: u32,

    /// Type information for each value in the function
    /// Maps ValueId to its MirType for type checking and rewriting
    pub value_types: FxHashMap<ValueId, MirType>,
}

impl MirFunction {
    /// Creates a new empty function with the given name
    pub fn new(name: String) -> Self {
        let mut basic_blocks = IndexVec::new();
        let entry_block = basic_blocks.push(BasicBlock::new());

        Self {
            name,
            basic_blocks,
            entry_block,
            parameters: Vec::new(),
            return_types: Vec::new(),
            next_value_id: 0,
            value_types: FxHashMap::default(),
        }
    }

    /// Adds a new basic block and returns its ID
    pub fn add_basic_block(&mut self) -> BasicBlockId {
        self.basic_blocks.push(BasicBlock::new())
    }

    /// Adds a new basic block with a name and returns its ID
    pub fn add_basic_block_with_name(&mut self, name: String) -> BasicBlockId {
        self.basic_blocks.push(BasicBlock::with_name(name))
    }

    /// Gets a basic block by ID
    pub fn get_basic_block(&self, id: BasicBlockId) -> Option<&BasicBlock> {
        self.basic_blocks.get(id)
    }

    /// Gets a mutable reference to a basic block by ID
    pub fn get_basic_block_mut(&mut self, id: BasicBlockId) -> Option<&mut BasicBlock> {
        self.basic_blocks.get_mut(id)
    }

    /// Generates a new unique value ID within this function
    pub fn new_value_id(&mut self) -> ValueId {
        let id = ValueId::new(self.next_value_id as usize);
        self.next_value_id += 1;
        id
    }

    /// Generates a new unique value ID with type information
    pub fn new_typed_value_id(&mut self, mir_type: MirType) -> ValueId {
        let id = self.new_value_id();
        self.value_types.insert(id, mir_type);
        id
    }

    /// Sets the type for a value ID
    pub fn set_value_type(&mut self, value_id: ValueId, mir_type: MirType) {
        self.value_types.insert(value_id, mir_type);
    }

    /// Gets the type for a value ID
    pub fn get_value_type(&self, value_id: ValueId) -> Option<&MirType> {
        self.value_types.get(&value_id)
    }

    /// Gets the type for a value ID, returning Unknown if not found
    pub fn get_value_type_or_unknown(&self, value_id: ValueId) -> MirType {
        self.value_types
            .get(&value_id)
            .cloned()
            .unwrap_or(MirType::unknown())
    }

    /// Adds a typed parameter and returns its value ID
    pub fn add_parameter(&mut self, mir_type: MirType) -> ValueId {
        let id = self.new_typed_value_id(mir_type);
        self.parameters.push(id);
        id
    }

    /// Returns an iterator over all basic blocks
    pub fn basic_blocks(&self) -> impl Iterator<Item = (BasicBlockId, &BasicBlock)> {
        self.basic_blocks.iter_enumerated()
    }

    /// Returns the number of basic blocks in this function
    pub fn block_count(&self) -> usize {
        self.basic_blocks.len()
    }

    /// Returns a map from each ValueId to its usage count in the function.
    /// This is useful for optimization passes like dead code elimination.
    pub fn get_value_use_counts(&self) -> FxHashMap<ValueId, usize> {
        let mut counts = FxHashMap::default();
        for (_id, block) in self.basic_blocks() {
            for instruction in &block.instructions {
                for used_value in instruction.used_values() {
                    *counts.entry(used_value).or_default() += 1;
                }
            }
            for used_value in block.terminator.used_values() {
                *counts.entry(used_value).or_default() += 1;
            }
        }
        counts
    }

    /// Returns the blocks not reachable from the entry block
    pub fn unreachable_blocks(&self) -> Vec<BasicBlockId> {
        let mut reachable = HashSet::new();
        let mut worklist = vec![self.entry_block];

        while let Some(block_id) = worklist.pop() {
            if !reachable.insert(block_id) {
                continue;
            }
            if let Some(block) = self.basic_blocks.get(block_id) {
                worklist.extend(block.terminator.target_blocks());
            }
        }

        self.basic_blocks
            .iter_enumerated()
            .map(|(id, _)| id)
            .filter(|id| !reachable.contains(id))
            .collect()
    }

    /// Validates the function structure
    ///
    /// Checks:
    /// - Entry block exists and is valid
    /// - All basic blocks are internally consistent
    /// - All referenced blocks exist
    /// - Jump arguments match the target block's parameter count
    pub fn validate(&self) -> Result<(), String> {
        if self.basic_blocks.get(self.entry_block).is_none() {
            return Err(format!("Entry block {:?} does not exist", self.entry_block));
        }

        for (block_id, block) in self.basic_blocks() {
            if let Err(err) = block.validate() {
                return Err(format!("Block {block_id:?} validation failed: {err}"));
            }

            for target in block.terminator.target_blocks() {
                if self.basic_blocks.get(target).is_none() {
                    return Err(format!(
                        "Block {block_id:?} targets non-existent block {target:?}"
                    ));
                }
            }

            match &block.terminator {
                Terminator::Jump { target, args } => {
                    let param_count = self.basic_blocks[*target].params.len();
                    if args.len() != param_count {
                        return Err(format!(
                            "Block {block_id:?} jumps to {target:?} with {} arguments, expected {}",
                            args.len(),
                            param_count
                        ));
                    }
                }
                Terminator::If {
                    then_target,
                    else_target,
                    ..
                } => {
                    // Conditional branches carry no arguments; an edge that
                    // needs them goes through a dedicated jump block.
                    for target in [then_target, else_target] {
                        if !self.basic_blocks[*target].params.is_empty() {
                            return Err(format!(
                                "Block {block_id:?} conditionally branches to {target:?} which declares parameters"
                            ));
                        }
                    }
                }
                Terminator::Return { .. } | Terminator::Unreachable => {}
            }
        }

        Ok(())
    }
}

impl PrettyPrint for MirFunction {
    fn pretty_print(&self, indent: usize) -> String {
        let mut result = String::new();
        let base_indent = indent_str(indent);

        let params_str = self
            .parameters
            .iter()
            .map(|p| {
                format!(
                    "{}: {}",
                    p.pretty_print(0),
                    self.get_value_type_or_unknown(*p)
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        let returns_str = self
            .return_types
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        result.push_str(&format!(
            "{base_indent}fn {}({params_str}) -> ({returns_str}) {{\n",
            self.name
        ));

        for (block_id, block) in self.basic_blocks() {
            let name = block
                .name
                .as_deref()
                .map_or_else(|| format!("{block_id:?}"), ToString::to_string);
            result.push_str(&format!("{base_indent}  {name}:\n"));
            result.push_str(&block.pretty_print(indent + 2));
        }

        result.push_str(&format!("{base_indent}}}\n"));
        result
    }
}
