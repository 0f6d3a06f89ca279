//! # Type Mapping
//!
//! This module defines the position index at the heart of one-to-many
//! conversion: for a sequence of original types, the ordered list of
//! converted types plus, for each original position, the contiguous
//! sub-range of the converted list that position occupies.

use crate::conversion::{ConversionError, OneToNTypeConverter};
use crate::{MirType, Value};

/// The sub-range of the converted sequence covered by one original position
///
/// Ranges of consecutive positions are contiguous and non-overlapping; a
/// position whose type converts to nothing (an empty tuple) has `size == 0`
/// and its offset is not meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputMapping {
    /// Start of the range within the converted sequence
    pub offset: usize,
    /// Number of converted slots the position occupies
    pub size: usize,
}

impl InputMapping {
    /// Returns true if this position converts to no values at all
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// Position index for a converted sequence of original types
///
/// Built once per operand or result list (and per element list for tuple
/// rewrites), then used to slice flat value sequences by original position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMapping {
    original_types: Vec<MirType>,
    converted_types: Vec<MirType>,
    mappings: Vec<InputMapping>,
}

impl TypeMapping {
    /// Builds the mapping for `types` under the given converter
    pub fn build<C: OneToNTypeConverter + ?Sized>(
        converter: &C,
        types: &[MirType],
    ) -> Result<Self, ConversionError> {
        let mut converted_types = Vec::with_capacity(types.len());
        let mut mappings = Vec::with_capacity(types.len());

        for ty in types {
            let offset = converted_types.len();
            converter.convert_type(ty, &mut converted_types)?;
            mappings.push(InputMapping {
                offset,
                size: converted_types.len() - offset,
            });
        }

        Ok(Self {
            original_types: types.to_vec(),
            converted_types,
            mappings,
        })
    }

    /// The original types this mapping was built from
    pub fn original_types(&self) -> &[MirType] {
        &self.original_types
    }

    /// The full converted type sequence
    pub fn converted_types(&self) -> &[MirType] {
        &self.converted_types
    }

    /// Number of original positions
    pub fn len(&self) -> usize {
        self.original_types.len()
    }

    /// Returns true if there are no original positions
    pub fn is_empty(&self) -> bool {
        self.original_types.is_empty()
    }

    /// Total number of converted slots
    pub fn total_converted(&self) -> usize {
        self.converted_types.len()
    }

    /// The sub-range covered by the given original position
    pub fn input_mapping(&self, position: usize) -> InputMapping {
        self.mappings[position]
    }

    /// The converted types of the given original position
    pub fn converted_types_for(&self, position: usize) -> &[MirType] {
        let mapping = self.mappings[position];
        &self.converted_types[mapping.offset..mapping.offset + mapping.size]
    }

    /// Slices a flat value sequence to the range of the given position
    ///
    /// `values` must have exactly `total_converted()` entries.
    pub fn converted_values<'v>(&self, values: &'v [Value], position: usize) -> &'v [Value] {
        let mapping = self.mappings[position];
        &values[mapping.offset..mapping.offset + mapping.size]
    }

    /// Returns true if every position converts 1:1 to its own type
    pub fn is_identity(&self) -> bool {
        self.converted_types == self.original_types
            && self.mappings.iter().all(|m| m.size == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::TupleFlattener;

    fn nested_pair() -> MirType {
        // (i32, (i32, i32))
        MirType::tuple(vec![
            MirType::i32(),
            MirType::tuple(vec![MirType::i32(), MirType::i32()]),
        ])
    }

    #[test]
    fn test_nested_tuple_mapping() {
        let flattener = TupleFlattener::new();
        let ty = nested_pair();
        let mapping = flattener.convert_types(std::slice::from_ref(&ty)).unwrap();

        assert_eq!(
            mapping.converted_types(),
            &[MirType::i32(), MirType::i32(), MirType::i32()]
        );
        assert_eq!(mapping.input_mapping(0), InputMapping { offset: 0, size: 3 });
    }

    #[test]
    fn test_element_mapping_offsets() {
        // The element list of (i32, (i32, i32)): position 0 -> offset 0 size 1,
        // position 1 -> offset 1 size 2.
        let flattener = TupleFlattener::new();
        let elements = [
            MirType::i32(),
            MirType::tuple(vec![MirType::i32(), MirType::i32()]),
        ];
        let mapping = flattener.convert_types(&elements).unwrap();

        assert_eq!(mapping.total_converted(), 3);
        assert_eq!(mapping.input_mapping(0), InputMapping { offset: 0, size: 1 });
        assert_eq!(mapping.input_mapping(1), InputMapping { offset: 1, size: 2 });
    }

    #[test]
    fn test_identity_on_flat_input() {
        // Converting an already-flat list of leaves yields the identity mapping.
        let flattener = TupleFlattener::new();
        let leaves = [MirType::i32(), MirType::bool(), MirType::i64()];
        let mapping = flattener.convert_types(&leaves).unwrap();

        assert!(mapping.is_identity());
        for (i, _) in leaves.iter().enumerate() {
            assert_eq!(mapping.input_mapping(i), InputMapping { offset: i, size: 1 });
        }
    }

    #[test]
    fn test_flattening_is_idempotent() {
        let flattener = TupleFlattener::new();
        let ty = nested_pair();
        let first = flattener.convert_types(std::slice::from_ref(&ty)).unwrap();
        let second = flattener.convert_types(first.converted_types()).unwrap();

        assert!(second.is_identity());
        assert_eq!(second.converted_types(), first.converted_types());
    }

    #[test]
    fn test_empty_tuple_position() {
        let flattener = TupleFlattener::new();
        let types = [MirType::i32(), MirType::unit(), MirType::bool()];
        let mapping = flattener.convert_types(&types).unwrap();

        assert_eq!(mapping.total_converted(), 2);
        assert!(mapping.input_mapping(1).is_empty());
        assert_eq!(mapping.input_mapping(2), InputMapping { offset: 1, size: 1 });
    }

    #[test]
    fn test_ranges_are_contiguous() {
        let flattener = TupleFlattener::new();
        let types = [
            nested_pair(),
            MirType::unit(),
            MirType::bool(),
            MirType::tuple(vec![MirType::i64()]),
        ];
        let mapping = flattener.convert_types(&types).unwrap();

        let mut expected_offset = 0;
        let mut total = 0;
        for i in 0..mapping.len() {
            let m = mapping.input_mapping(i);
            assert_eq!(m.offset, expected_offset);
            expected_offset += m.size;
            total += m.size;
        }
        assert_eq!(total, mapping.total_converted());
    }
}
