//! Regular chunk grid geometry.
//!
//! The grid has `ceil(shape[i] / chunk_shape[i])` chunks along axis `i`.
//! The last chunk along an axis may extend past the array shape;
//! such boundary chunks are still stored with the full chunk shape.

use crate::{Error, Result};

/// A hyperrectangular region of an array: `start` and `shape` per axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArraySubset {
    start: Vec<u64>,
    shape: Vec<u64>,
}

impl ArraySubset {
    pub fn new_with_start_shape(start: Vec<u64>, shape: Vec<u64>) -> Result<Self> {
        if start.len() != shape.len() {
            return Err(Error::shape_mismatch(format!(
                "region start {start:?} and shape {shape:?} have different dimensionality"
            )));
        }
        if std::iter::zip(&start, &shape).any(|(s, n)| s.checked_add(*n).is_none()) {
            return Err(Error::shape_mismatch(format!(
                "region start {start:?} and shape {shape:?} overflow"
            )));
        }
        Ok(Self { start, shape })
    }

    /// The region covering all of `shape`.
    pub fn new_with_shape(shape: Vec<u64>) -> Self {
        Self {
            start: vec![0; shape.len()],
            shape,
        }
    }

    pub fn start(&self) -> &[u64] {
        &self.start
    }

    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    pub fn dimensionality(&self) -> usize {
        self.start.len()
    }

    /// Exclusive end per axis.
    pub fn end_exc(&self) -> Vec<u64> {
        std::iter::zip(&self.start, &self.shape)
            .map(|(s, n)| s + n)
            .collect()
    }

    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// The overlap of two regions of equal dimensionality, or [`None`] if they do not overlap.
    pub fn overlap(&self, other: &ArraySubset) -> Option<ArraySubset> {
        let mut start = Vec::with_capacity(self.dimensionality());
        let mut shape = Vec::with_capacity(self.dimensionality());
        for ((a_start, a_end), (b_start, b_end)) in std::iter::zip(
            std::iter::zip(&self.start, self.end_exc()),
            std::iter::zip(&other.start, other.end_exc()),
        ) {
            let s = *a_start.max(b_start);
            let e = a_end.min(b_end);
            if e <= s {
                return None;
            }
            start.push(s);
            shape.push(e - s);
        }
        Some(ArraySubset { start, shape })
    }

    /// The start of this region relative to `origin`.
    ///
    /// `origin` must not exceed `start` on any axis.
    pub fn relative_start(&self, origin: &[u64]) -> Vec<u64> {
        std::iter::zip(&self.start, origin)
            .map(|(s, o)| s - o)
            .collect()
    }
}

/// A regular grid of equally-shaped chunks over an array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkGrid {
    shape: Vec<u64>,
    chunk_shape: Vec<u64>,
}

impl ChunkGrid {
    pub fn new(shape: Vec<u64>, chunk_shape: Vec<u64>) -> Result<Self> {
        if shape.len() != chunk_shape.len() {
            return Err(Error::shape_mismatch(format!(
                "array shape {shape:?} and chunk shape {chunk_shape:?} have different dimensionality"
            )));
        }
        if chunk_shape.contains(&0) {
            return Err(Error::shape_mismatch(format!(
                "chunk shape {chunk_shape:?} has a zero extent"
            )));
        }
        Ok(Self { shape, chunk_shape })
    }

    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    pub fn chunk_shape(&self) -> &[u64] {
        &self.chunk_shape
    }

    pub fn dimensionality(&self) -> usize {
        self.shape.len()
    }

    /// The number of chunks along each axis.
    pub fn grid_shape(&self) -> Vec<u64> {
        std::iter::zip(&self.shape, &self.chunk_shape)
            .map(|(s, c)| s.div_ceil(*c))
            .collect()
    }

    pub fn num_chunks(&self) -> u64 {
        self.grid_shape().iter().product()
    }

    /// Elements in one (full) chunk.
    pub fn chunk_num_elements(&self) -> u64 {
        self.chunk_shape.iter().product()
    }

    pub fn check_chunk_indices(&self, chunk_indices: &[u64]) -> Result<()> {
        let grid_shape = self.grid_shape();
        if chunk_indices.len() != grid_shape.len()
            || std::iter::zip(chunk_indices, &grid_shape).any(|(i, n)| i >= n)
        {
            return Err(Error::shape_mismatch(format!(
                "chunk indices {chunk_indices:?} are outside the chunk grid {grid_shape:?}"
            )));
        }
        Ok(())
    }

    /// Fail unless `subset` lies within the array shape.
    pub fn check_subset(&self, subset: &ArraySubset) -> Result<()> {
        let outside = std::iter::zip(std::iter::zip(subset.start(), subset.shape()), &self.shape)
            .any(|((start, n), s)| start.checked_add(*n).is_none_or(|end| end > *s));
        if subset.dimensionality() != self.dimensionality() || outside {
            return Err(Error::shape_mismatch(format!(
                "region {:?} + {:?} is not within array shape {:?}",
                subset.start(),
                subset.shape(),
                self.shape
            )));
        }
        Ok(())
    }

    /// The full region of the chunk at `chunk_indices`, which may extend past the array shape.
    pub fn chunk_subset(&self, chunk_indices: &[u64]) -> ArraySubset {
        ArraySubset {
            start: std::iter::zip(chunk_indices, &self.chunk_shape)
                .map(|(i, c)| i * c)
                .collect(),
            shape: self.chunk_shape.clone(),
        }
    }

    /// The part of the chunk at `chunk_indices` within the array shape.
    pub fn chunk_subset_bounded(&self, chunk_indices: &[u64]) -> ArraySubset {
        let mut subset = self.chunk_subset(chunk_indices);
        for ((start, len), extent) in subset.start.iter().zip(&mut subset.shape).zip(&self.shape) {
            *len = (*len).min(extent.saturating_sub(*start));
        }
        subset
    }

    /// Indices of every chunk intersecting `subset`, in C order.
    pub fn chunks_in_subset(&self, subset: &ArraySubset) -> IndicesIter {
        if subset.num_elements() == 0 {
            return IndicesIter::empty();
        }
        let first = std::iter::zip(subset.start(), &self.chunk_shape)
            .map(|(s, c)| s / c)
            .collect();
        let last = std::iter::zip(subset.end_exc(), &self.chunk_shape)
            .map(|(e, c)| e.div_ceil(*c))
            .collect();
        IndicesIter::new(first, last)
    }
}

/// Iterator over every index in `[start, end)` in C (row-major) order.
///
/// A zero-dimensional range yields the empty index once.
#[derive(Debug, Clone)]
pub struct IndicesIter {
    start: Vec<u64>,
    end: Vec<u64>,
    next: Option<Vec<u64>>,
}

impl IndicesIter {
    pub fn new(start: Vec<u64>, end: Vec<u64>) -> Self {
        let next = std::iter::zip(&start, &end)
            .all(|(s, e)| s < e)
            .then(|| start.clone());
        Self { start, end, next }
    }

    fn empty() -> Self {
        Self {
            start: Vec::new(),
            end: Vec::new(),
            next: None,
        }
    }
}

impl Iterator for IndicesIter {
    type Item = Vec<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let mut following = current.clone();
        for axis in (0..following.len()).rev() {
            following[axis] += 1;
            if following[axis] < self.end[axis] {
                self.next = Some(following);
                break;
            }
            following[axis] = self.start[axis];
        }
        Some(current)
    }
}

fn c_strides(shape: &[u64]) -> Vec<u64> {
    let mut strides = vec![1; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    strides
}

/// Copy a `region_shape` box of elements between two C-order buffers.
///
/// The box starts at `src_start` within `src` (of shape `src_shape`)
/// and at `dst_start` within `dst` (of shape `dst_shape`).
/// Callers guarantee the box lies within both buffers.
#[allow(clippy::too_many_arguments)]
pub(crate) fn copy_region(
    src: &[u8],
    src_shape: &[u64],
    src_start: &[u64],
    dst: &mut [u8],
    dst_shape: &[u64],
    dst_start: &[u64],
    region_shape: &[u64],
    element_size: usize,
) {
    let Some((&run_len, outer_shape)) = region_shape.split_last() else {
        dst[..element_size].copy_from_slice(&src[..element_size]);
        return;
    };
    if run_len == 0 || outer_shape.contains(&0) {
        return;
    }
    let run_bytes = run_len as usize * element_size;
    let src_strides = c_strides(src_shape);
    let dst_strides = c_strides(dst_shape);
    let offset = |strides: &[u64], start: &[u64], outer: &[u64]| -> usize {
        let mut element = start[start.len() - 1];
        for ((s, st), o) in strides.iter().zip(start).zip(outer) {
            element += (st + o) * s;
        }
        element as usize * element_size
    };
    for outer in IndicesIter::new(vec![0; outer_shape.len()], outer_shape.to_vec()) {
        let s = offset(&src_strides, src_start, &outer);
        let d = offset(&dst_strides, dst_start, &outer);
        dst[d..d + run_bytes].copy_from_slice(&src[s..s + run_bytes]);
    }
}
