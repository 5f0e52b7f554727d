//! Compressed Sparse Row formats: the root-side global matrix and the
//! per-rank distributed row block
//!
//! All indices are zero-based. A distributed block keeps its `row_ptr`
//! entries as *global* offsets into the concatenated nonzero stream, so
//! `row_ptr[0]` is the rank's global first-nonzero offset and local array
//! positions are recovered by subtracting it.

use num_complex::Complex64;
use num_traits::{One, Zero};

use crate::constants::CSR_STRUCTURE_TAG;
use crate::matrix::PartitionTable;
use crate::plan::CommPlan;
use crate::sort::sort_pairs;

/// A complete sparse matrix in CSR format, held on a single rank.
///
/// This is the form a matrix takes on the root before distribution: three
/// parallel arrays where `row_ptr[i]..row_ptr[i + 1]` spans row `i`'s
/// entries in `col_idx` and `values`.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    /// Number of rows in the matrix
    pub n_rows: usize,

    /// Number of columns in the matrix
    pub n_cols: usize,

    /// Row pointers (size: n_rows + 1)
    pub row_ptr: Vec<usize>,

    /// Column indices (size: nnz)
    pub col_idx: Vec<usize>,

    /// Non-zero values (size: nnz)
    pub values: Vec<Complex64>,

    /// Two-byte structural tag carried through distribution
    pub structure: [u8; 2],
}

impl CsrMatrix {
    /// Creates a new CSR matrix with the given dimensions and data
    ///
    /// # Panics
    ///
    /// Panics if the input arrays are inconsistent:
    /// - row_ptr.len() must be n_rows + 1
    /// - col_idx.len() must equal values.len()
    /// - row_ptr[n_rows] must equal col_idx.len()
    /// - every column index must be below n_cols
    pub fn new(
        n_rows: usize,
        n_cols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<Complex64>,
    ) -> Self {
        assert_eq!(row_ptr.len(), n_rows + 1, "row_ptr.len() must be n_rows + 1");
        assert_eq!(
            col_idx.len(),
            values.len(),
            "col_idx.len() must equal values.len()"
        );
        assert_eq!(
            row_ptr[n_rows],
            col_idx.len(),
            "row_ptr[n_rows] must equal col_idx.len()"
        );
        for &col in &col_idx {
            assert!(col < n_cols, "column index {col} out of bounds (n_cols = {n_cols})");
        }

        Self {
            n_rows,
            n_cols,
            row_ptr,
            col_idx,
            values,
            structure: CSR_STRUCTURE_TAG,
        }
    }

    /// Creates an empty matrix with the given dimensions
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            row_ptr: vec![0; n_rows + 1],
            col_idx: Vec::new(),
            values: Vec::new(),
            structure: CSR_STRUCTURE_TAG,
        }
    }

    /// Creates an identity matrix of the given size
    pub fn identity(n: usize) -> Self {
        let row_ptr: Vec<usize> = (0..=n).collect();
        let col_idx: Vec<usize> = (0..n).collect();
        let values = vec![Complex64::one(); n];
        Self::new(n, n, row_ptr, col_idx, values)
    }

    /// Builds a matrix from `(row, column, value)` entries.
    ///
    /// Entries may arrive in any order; duplicates at the same position are
    /// summed. Columns within each row come out sorted ascending.
    pub fn from_triplets(
        n_rows: usize,
        n_cols: usize,
        entries: &[(usize, usize, Complex64)],
    ) -> Self {
        let mut counts = vec![0usize; n_rows];
        for &(row, col, _) in entries {
            assert!(row < n_rows && col < n_cols, "triplet ({row}, {col}) out of bounds");
            counts[row] += 1;
        }

        let mut row_ptr = vec![0usize; n_rows + 1];
        for i in 0..n_rows {
            row_ptr[i + 1] = row_ptr[i] + counts[i];
        }

        let nnz = row_ptr[n_rows];
        let mut col_idx = vec![0usize; nnz];
        let mut values = vec![Complex64::zero(); nnz];
        let mut cursor = row_ptr.clone();
        for &(row, col, value) in entries {
            let slot = cursor[row];
            cursor[row] += 1;
            col_idx[slot] = col;
            values[slot] = value;
        }

        for i in 0..n_rows {
            let span = row_ptr[i]..row_ptr[i + 1];
            sort_pairs(&mut col_idx[span.clone()], &mut values[span]);
        }

        // Merge duplicate columns within each row.
        let mut merged_ptr = vec![0usize; n_rows + 1];
        let mut write = 0;
        for i in 0..n_rows {
            let mut read = row_ptr[i];
            while read < row_ptr[i + 1] {
                let col = col_idx[read];
                let mut value = values[read];
                read += 1;
                while read < row_ptr[i + 1] && col_idx[read] == col {
                    value += values[read];
                    read += 1;
                }
                col_idx[write] = col;
                values[write] = value;
                write += 1;
            }
            merged_ptr[i + 1] = write;
        }
        col_idx.truncate(write);
        values.truncate(write);

        Self::new(n_rows, n_cols, merged_ptr, col_idx, values)
    }

    /// Returns the number of non-zero elements in the matrix
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Returns an iterator over the non-zero elements in row i
    pub fn row_iter(&self, i: usize) -> impl Iterator<Item = (usize, &Complex64)> {
        assert!(i < self.n_rows, "row index out of bounds");
        let span = self.row_ptr[i]..self.row_ptr[i + 1];
        self.col_idx[span.clone()]
            .iter()
            .zip(&self.values[span])
            .map(|(&col, val)| (col, val))
    }
}

/// One rank's row block of a distributed CSR matrix.
///
/// `first_row` names the block's global starting row; `row_ptr` keeps its
/// global offsets into the matrix-wide nonzero stream; `col_idx` stays in
/// global column space. The communication plan attached by
/// [`reconcile_communications`](crate::plan::reconcile_communications)
/// remains valid until the sparsity pattern changes.
#[derive(Debug, Clone, PartialEq)]
pub struct DistCsrMatrix {
    /// Global number of rows
    pub n_rows: usize,

    /// Global number of columns
    pub n_cols: usize,

    /// First global row owned by this rank
    pub first_row: usize,

    /// Row pointers as global nonzero offsets (size: local rows + 1)
    pub row_ptr: Vec<usize>,

    /// Global column indices of the local nonzeros
    pub col_idx: Vec<usize>,

    /// Local non-zero values
    pub values: Vec<Complex64>,

    /// Two-byte structural tag
    pub structure: [u8; 2],

    /// Communication plan, attached by reconciliation
    pub plan: Option<CommPlan>,
}

impl DistCsrMatrix {
    /// Creates a row block from its raw parts
    ///
    /// # Panics
    ///
    /// Panics if `row_ptr` is empty or non-monotone, or if the nonzero
    /// arrays disagree with the span `row_ptr` describes.
    pub fn new(
        n_rows: usize,
        n_cols: usize,
        first_row: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<Complex64>,
    ) -> Self {
        assert!(!row_ptr.is_empty(), "row_ptr must hold at least one offset");
        assert!(
            row_ptr.windows(2).all(|w| w[0] <= w[1]),
            "row_ptr must be non-decreasing"
        );
        assert_eq!(
            col_idx.len(),
            values.len(),
            "col_idx.len() must equal values.len()"
        );
        assert_eq!(
            row_ptr[row_ptr.len() - 1] - row_ptr[0],
            col_idx.len(),
            "row_ptr span must equal the local nonzero count"
        );
        for &col in &col_idx {
            assert!(col < n_cols, "column index {col} out of bounds (n_cols = {n_cols})");
        }

        Self {
            n_rows,
            n_cols,
            first_row,
            row_ptr,
            col_idx,
            values,
            structure: CSR_STRUCTURE_TAG,
            plan: None,
        }
    }

    /// Slices rank `rank`'s block out of a global matrix without any
    /// communication. Useful when every rank holds the global matrix, and in
    /// tests.
    pub fn from_global(global: &CsrMatrix, table: &PartitionTable, rank: usize) -> Self {
        let range = table.range(rank);
        let row_ptr = global.row_ptr[range.start..=range.end].to_vec();
        let span = row_ptr[0]..row_ptr[row_ptr.len() - 1];
        let mut block = Self::new(
            global.n_rows,
            global.n_cols,
            range.start,
            row_ptr,
            global.col_idx[span.clone()].to_vec(),
            global.values[span].to_vec(),
        );
        block.structure = global.structure;
        block
    }

    /// Number of rows owned by this rank
    pub fn local_rows(&self) -> usize {
        self.row_ptr.len() - 1
    }

    /// Global row range owned by this rank
    pub fn row_range(&self) -> std::ops::Range<usize> {
        self.first_row..self.first_row + self.local_rows()
    }

    /// Number of local nonzeros
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Global offset of this rank's first nonzero
    pub fn nnz_offset(&self) -> usize {
        self.row_ptr[0]
    }

    /// Span of local row `i` within `col_idx` and `values`
    pub fn local_span(&self, i: usize) -> std::ops::Range<usize> {
        let offset = self.row_ptr[0];
        self.row_ptr[i] - offset..self.row_ptr[i + 1] - offset
    }

    /// The attached communication plan, if reconciliation has run
    pub fn plan(&self) -> Option<&CommPlan> {
        self.plan.as_ref()
    }

    /// Length of the extended operand buffer (owned rows plus every entry
    /// the plan will receive), once a plan is attached
    pub fn extended_len(&self) -> Option<usize> {
        self.plan.as_ref().map(|p| self.local_rows() + p.total_recv)
    }
}
