//! # Tern Intermediate Representation (MIR)
//!
//! This crate defines the data structures for the Mid-level Intermediate
//! Representation of the Tern compiler, together with the transformation
//! passes that run on it. The MIR is a high-level, platform-independent
//! representation of the program used for type-lowering transformations
//! before code generation.
//!
//! ## Design Principles
//!
//! The design is inspired by LLVM IR and is based on:
//!
//! 1. **Control Flow Graph (CFG)**: Functions are represented as directed graphs of basic blocks
//! 2. **Three-Address Code (TAC)**: Instructions are simple, atomic operations with at most one operation
//! 3. **Static Single Assignment (SSA)**: Each virtual register is assigned exactly once, with
//!    block parameters (rather than phi instructions) carrying values across control-flow joins
//! 4. **Explicit Control Flow**: All control flow is explicit through terminators
//!
//! ## Architecture
//!
//! ```text
//! MirModule
//! functions: IndexVec<FunctionId, MirFunction>
//! ...
//!
//! MirFunction
//! basic_blocks: IndexVec<BasicBlockId, BasicBlock>
//! parameters: Vec<ValueId>
//! entry_block: BasicBlockId
//!
//! BasicBlock
//! params: Vec<ValueId>
//! instructions: Vec<Instruction>
//! terminator: Terminator
//! ```
//!
//! ## Tuple decomposition
//!
//! First-class tuple values (arbitrarily nested) are supported by a family of
//! structural instructions (`make_tuple`, `to_elements`, `extract_tuple`, ...)
//! and eliminated before code generation by the [`passes::DecomposeTuplesPass`],
//! which rewrites every tuple-typed value into its flat sequence of leaf
//! values through the generic one-to-many conversion engine in [`conversion`].

pub use basic_block::BasicBlock;
pub use conversion::{
    ConversionConfig, ConversionError, InputMapping, OneToNTypeConverter, TypeMapping,
};
pub use function::MirFunction;
pub use instruction::{BinaryOp, Instruction, InstructionKind};
pub use mir_types::MirType;
pub use module::MirModule;
pub use passes::{
    DeadCodeElimination, DecomposeTuplesPass, MirPass, PassManager, TupleFlattener, Validation,
};
pub use terminator::Terminator;
pub use value::{Literal, TupleLiteral, Value};

pub mod basic_block;
pub mod cfg;
pub mod conversion;
pub mod function;
pub mod instruction;
pub mod mir_types;
pub mod module;
pub mod passes;
pub mod terminator;
pub mod value;

#[cfg(test)]
pub mod testing;


// --- Core Identifiers ---

index_vec::define_index_type! {
    /// Unique identifier for a function within a MIR module
    pub struct FunctionId = usize;
}

index_vec::define_index_type! {
    /// Unique identifier for a basic block within a function
    pub struct BasicBlockId = usize;
}

index_vec::define_index_type! {
    /// Unique identifier for a value (virtual register) within a function
    pub struct ValueId = usize;
}

// --- Pretty Printing Support ---

/// Trait for pretty-printing MIR constructs
pub trait PrettyPrint {
    fn pretty_print(&self, indent: usize) -> String;
}

/// Helper function to create indentation
pub(crate) fn indent_str(level: usize) -> String {
    "  ".repeat(level)
}
