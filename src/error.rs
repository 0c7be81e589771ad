use thiserror::Error;

/// Reasons a shape description is rejected at construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    #[error("collision margin must be finite and non-negative, got {0}")]
    InvalidMargin(f32),
    #[error("shape dimension `{name}` must be finite and non-negative, got {value}")]
    InvalidDimension { name: &'static str, value: f32 },
    #[error("local scaling must be finite, got {0:?}")]
    InvalidScaling([f32; 3]),
    #[error("point set is empty")]
    EmptyPointSet,
}
