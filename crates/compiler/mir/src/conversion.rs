//! # One-to-Many Type Conversion
//!
//! This module implements a generic one-to-many type-conversion and rewrite
//! engine for MIR: a conversion where one original value may correspond to
//! zero or more converted values.
//!
//! The engine is assembled from three pluggable pieces, all scoped to a
//! single conversion run:
//!
//! 1. A [`OneToNTypeConverter`] maps each original type to its list of
//!    converted types and knows how to *materialize* values across the
//!    converted/unconverted boundary in both directions.
//! 2. A [`OneToNRewritePattern`] rewrites individual instructions in terms of
//!    already-converted operand value sequences.
//! 3. The [`driver`] walks a function in def-before-use order, tracks the
//!    replacement values of every converted definition, and reconciles
//!    converted and unconverted regions where they meet.
//!
//! Conversion is transactional: the driver works on a scratch copy and the
//! caller's function is only updated when the whole conversion succeeded.

pub mod driver;
pub mod type_mapping;

pub use driver::{
    apply_one_to_n_conversion, ConversionConfig, OneToNRewritePattern, RewriteAction,
    RewriteBuilder, RewriteCtx,
};
pub use type_mapping::{InputMapping, TypeMapping};

use smallvec::SmallVec;
use tern_compiler_diagnostics::Diagnostic;

use crate::{MirType, Value};

/// Errors produced while converting a function
///
/// Every detected inconsistency is fatal to the current conversion run:
/// the driver aborts and the function under conversion is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// A literal element lacks a derivable type, or a declared type does not
    /// match the type derived from actual contents
    #[error("type mismatch: {reason}")]
    TypeMismatch { reason: String },

    /// A tuple position indexes beyond the composite's element count
    #[error("position {position} out of bounds for tuple with {arity} elements")]
    PositionOutOfBounds { position: usize, arity: usize },

    /// A value could not be materialized across a conversion boundary
    #[error("conversion failure: {reason}")]
    ConversionFailure { reason: String },
}

impl ConversionError {
    /// Creates a type mismatch error
    pub fn type_mismatch(reason: impl Into<String>) -> Self {
        Self::TypeMismatch {
            reason: reason.into(),
        }
    }

    /// Creates a conversion failure error
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::ConversionFailure {
            reason: reason.into(),
        }
    }

    /// Renders this error as a diagnostic for reporting
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::TypeMismatch { .. } => Diagnostic::type_mismatch(self.to_string()),
            Self::PositionOutOfBounds { position, arity } => {
                Diagnostic::position_out_of_bounds(*position, *arity)
            }
            Self::ConversionFailure { .. } => Diagnostic::conversion_failure(self.to_string()),
        }
    }
}

/// A pluggable type converter for one-to-many conversion
///
/// Implementations map one original type to zero or more converted types and
/// provide the two materializations the driver inserts wherever converted and
/// unconverted code meet:
///
/// - `materialize_structured` builds a single structured value of an original
///   type from its converted value sequence (used where an unconverted
///   consumer still expects the original type);
/// - `materialize_flattened` builds the converted value sequence from a
///   structured value produced by unconverted code (used where a converted
///   consumer needs the converted form).
pub trait OneToNTypeConverter {
    /// Appends the converted types for `ty` to `results`
    ///
    /// A type that does not participate in the conversion converts to itself
    /// (exactly one result equal to the input).
    fn convert_type(&self, ty: &MirType, results: &mut Vec<MirType>) -> Result<(), ConversionError>;

    /// Builds the [`TypeMapping`] for a sequence of original types
    fn convert_types(&self, types: &[MirType]) -> Result<TypeMapping, ConversionError> {
        TypeMapping::build(self, types)
    }

    /// Builds a structured value of `target_ty` from converted inputs
    fn materialize_structured(
        &self,
        _builder: &mut RewriteBuilder<'_>,
        target_ty: &MirType,
        _inputs: &[Value],
    ) -> Result<Value, ConversionError> {
        Err(ConversionError::failure(format!(
            "no structured materialization registered for type {target_ty}"
        )))
    }

    /// Builds the converted value sequence from a structured value
    fn materialize_flattened(
        &self,
        builder: &mut RewriteBuilder<'_>,
        source: Value,
    ) -> Result<SmallVec<[Value; 4]>, ConversionError> {
        let ty = builder.value_type(&source);
        Err(ConversionError::failure(format!(
            "no flattened materialization registered for value {source} of type {ty}"
        )))
    }
}
