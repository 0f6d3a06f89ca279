//! # Control Flow Graph Utilities
//!
//! This module provides common utilities for working with control flow graphs:
//! predecessor/successor queries and the reverse postorder traversal that
//! conversion passes use to visit definitions before uses.

use crate::{BasicBlockId, MirFunction};

/// Get all successor blocks of a given block
pub fn get_successors(function: &MirFunction, block_id: BasicBlockId) -> Vec<BasicBlockId> {
    function
        .basic_blocks
        .get(block_id)
        .map(|block| block.terminator.target_blocks())
        .unwrap_or_default()
}

/// Get all predecessor blocks of a given block
pub fn get_predecessors(function: &MirFunction, target_id: BasicBlockId) -> Vec<BasicBlockId> {
    function
        .basic_blocks
        .iter_enumerated()
        .filter(|(_, block)| block.terminator.target_blocks().contains(&target_id))
        .map(|(id, _)| id)
        .collect()
}

/// Compute the reverse postorder of the blocks reachable from the entry
///
/// In a reverse postorder every block appears before its successors (except
/// across back edges), so straight-line and branching code is visited in
/// def-before-use order.
pub fn reverse_postorder(function: &MirFunction) -> Vec<BasicBlockId> {
    let mut visited = vec![false; function.basic_blocks.len()];
    let mut postorder = Vec::with_capacity(function.basic_blocks.len());

    // Iterative DFS; each stack entry tracks the next successor to visit.
    let mut stack: Vec<(BasicBlockId, usize)> = Vec::new();
    if function.basic_blocks.get(function.entry_block).is_some() {
        visited[function.entry_block.index()] = true;
        stack.push((function.entry_block, 0));
    }

    while let Some(&mut (block_id, ref mut next)) = stack.last_mut() {
        let succs = get_successors(function, block_id);
        if *next < succs.len() {
            let succ = succs[*next];
            *next += 1;
            if !visited[succ.index()] {
                visited[succ.index()] = true;
                stack.push((succ, 0));
            }
        } else {
            postorder.push(block_id);
            stack.pop();
        }
    }

    postorder.reverse();
    postorder
}
