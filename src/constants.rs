//! Centralized constants for the distributed sparse kernels
//!
//! All tunable thresholds and fixed protocol values live here rather than
//! scattered throughout the code.

// ============================================================================
// SORT KERNELS
// ============================================================================

/// Span length at or below which the hybrid sorts switch from recursive
/// merging to insertion sort
pub const SORT_INSERTION_THRESHOLD: usize = 512;

// ============================================================================
// MATRIX METADATA
// ============================================================================

/// Default two-byte structural tag carried by CSR matrices
pub const CSR_STRUCTURE_TAG: [u8; 2] = *b"CS";

// ============================================================================
// POINT-TO-POINT MESSAGE TAGS
// ============================================================================

/// Tag for dense-vector slices sent from the root during distribution
pub const TAG_VECTOR_SLICE: i32 = 1;

/// Tag for dense-matrix row blocks collected on the root during gathering
pub const TAG_MATRIX_SLICE: i32 = 2;

// ============================================================================
// FLOATING POINT TOLERANCES
// ============================================================================

/// Standard floating point comparison epsilon used by the test suite
pub const FLOAT_COMPARISON_EPSILON: f64 = 1e-10;
