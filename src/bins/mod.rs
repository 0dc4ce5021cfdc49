//! Ragged arrays: variables whose elements are variable-length lists.
//!
//! A bins variable owns a [`BinBuffer`]: one `[begin, end)` pair per bin,
//! indexing into the bin dimension of a dense buffer variable shared by all
//! bins. The dimensions of the bins variable itself only address the index
//! pairs, so slicing it never touches the buffer.

use std::sync::Arc;

use crate::{
    config,
    ops::{cumsum_all, CumSumMode},
    storage::{Buffer, DataHandle, Layout, Storage},
    transform::{self, Operation, UnaryKernel},
    units::UnitRule,
    variable::type_mismatch,
    DType, Dim, Dimensions, Element, ElementArrayViewMut, Error, IndexPair, NanComparisons, Result,
    Slice, Unit, Variable,
};

/// Index pairs, bin dimension and payload of a bins variable.
#[derive(Clone, Debug)]
pub struct BinBuffer {
    indices: Arc<Buffer<IndexPair>>,
    dim: Dim,
    buffer: Variable,
}

impl Storage for BinBuffer {
    fn dtype(&self) -> DType {
        DType::Bins
    }

    fn len(&self) -> usize {
        self.indices.values().len()
    }

    fn has_variances(&self) -> bool {
        false
    }
}

fn check_indices(indices: &[IndexPair], dim: &Dim, extent: usize) -> Result<()> {
    for &(begin, end) in indices {
        if begin > end || end > extent {
            return Err(Error::Range(format!(
                "bin [{}, {}) invalid for dimension {} with extent {}",
                begin, end, dim, extent
            )));
        }
    }
    Ok(())
}

/// Packs `sizes` back to back, in order.
fn contiguous_indices(sizes: impl IntoIterator<Item = usize>) -> (Vec<IndexPair>, usize) {
    let mut total = 0;
    let indices = sizes
        .into_iter()
        .map(|size| {
            let begin = total;
            total += size;
            (begin, total)
        })
        .collect();
    (indices, total)
}

struct BinSize;

impl Operation for BinSize {
    const NAME: &'static str = "bin_sizes";
    const UNIT: UnitRule = UnitRule::Dimensionless;
}

impl UnaryKernel<IndexPair> for BinSize {
    type Out = i64;

    fn value(&self, (begin, end): IndexPair) -> i64 {
        (end - begin) as i64
    }
}

impl Variable {
    /// Bins of `buffer` along `dim`, one per element of `indices`.
    ///
    /// Every index pair must lie within the extent of `dim` in `buffer`.
    /// Bins may overlap or leave gaps.
    pub fn from_bins(indices: &Variable, dim: Dim, buffer: Variable) -> Result<Self> {
        if indices.dtype() != DType::IndexPair {
            return Err(type_mismatch(DType::IndexPair, indices.dtype()));
        }
        let extent = buffer.dims().extent(&dim)?;
        let pairs = indices.values::<IndexPair>()?.to_vec();
        check_indices(&pairs, &dim, extent)?;
        Ok(Self::bins_with(indices.dims().clone(), pairs, dim, buffer))
    }

    fn bins_with(dims: Dimensions, indices: Vec<IndexPair>, dim: Dim, buffer: Variable) -> Self {
        let bins = BinBuffer {
            indices: Arc::new(Buffer::new(indices, None)),
            dim,
            buffer,
        };
        Self::from_parts(
            Layout::contiguous(dims),
            Unit::ONE,
            DataHandle::Bins(Arc::new(bins)),
        )
    }

    fn bin_buffer(&self) -> Result<&BinBuffer> {
        match &self.data {
            DataHandle::Bins(bins) => Ok(bins),
            _ => Err(type_mismatch(DType::Bins, self.dtype())),
        }
    }

    /// Read-only view of the index pairs, sharing storage with `self`.
    pub fn bin_indices(&self) -> Result<Self> {
        let bins = self.bin_buffer()?;
        Ok(Self::from_parts(
            self.layout().clone(),
            Unit::ONE,
            DataHandle::IndexPair(bins.indices.clone()),
        )
        .as_const())
    }

    /// Label of the buffer dimension the bins index into.
    pub fn bins_dim(&self) -> Result<&Dim> {
        Ok(&self.bin_buffer()?.dim)
    }

    /// Read-only alias of the whole bin buffer, including elements outside
    /// of any bin.
    pub fn bins_buffer(&self) -> Result<Self> {
        Ok(self.bin_buffer()?.buffer.as_const())
    }

    /// Detaches the bins from other owners. The buffer stays shared until
    /// its elements are written.
    fn bin_buffer_mut(&mut self) -> Result<&mut BinBuffer> {
        self.check_writable()?;
        match &mut self.data {
            DataHandle::Bins(bins) => Ok(Arc::make_mut(bins)),
            data => Err(type_mismatch(DType::Bins, data.dtype())),
        }
    }

    /// Write access to the values of the bin buffer.
    ///
    /// Only elements can be written: the buffer keeps its dimensions, so
    /// every bin stays within the bin dimension. Other owners of the bins
    /// are detached first and the buffer is copied on its first write.
    pub fn bins_values_mut<T>(&mut self) -> Result<ElementArrayViewMut<'_, T>>
    where
        T: Element,
    {
        self.bin_buffer_mut()?.buffer.values_mut()
    }

    /// Write access to the variances of the bin buffer, like
    /// [`Variable::bins_values_mut`].
    pub fn bins_variances_mut<T>(&mut self) -> Result<ElementArrayViewMut<'_, T>>
    where
        T: Element,
    {
        self.bin_buffer_mut()?.buffer.variances_mut()
    }

    /// Number of elements of each bin, as `int64`.
    pub fn bin_sizes(&self) -> Result<Self> {
        transform::unary::<IndexPair, _>(&config::global().tuning, &BinSize, &self.bin_indices()?)
    }

    /// Contents of the bin at row-major position `index`, sharing the buffer.
    pub fn bin(&self, index: usize) -> Result<Self> {
        let bins = self.bin_buffer()?;
        let indices = self.bin_indices()?;
        let &(begin, end) = indices.values::<IndexPair>()?.get(index).ok_or_else(|| {
            Error::Range(format!(
                "bin {} out of range for {}",
                index,
                self.dims()
            ))
        })?;
        bins.buffer.slice(Slice::range(bins.dim.clone(), begin..end))
    }

    /// Contents of every bin in row-major order.
    pub fn bins(&self) -> Result<Vec<Self>> {
        (0..self.volume()).map(|i| self.bin(i)).collect()
    }

    /// Deep copy packing the bins back to back in row-major order.
    pub(crate) fn copy_bins(&self) -> Result<Self> {
        let bins = self.bin_buffer()?;
        let source = self.bin_indices()?.values::<IndexPair>()?.to_vec();
        let (indices, total) = contiguous_indices(source.iter().map(|(begin, end)| end - begin));
        let mut dims = bins.buffer.dims().clone();
        dims.resize(&bins.dim, total)?;
        let mut buffer = Self::default_init(
            bins.buffer.dtype(),
            dims,
            bins.buffer.unit(),
            bins.buffer.has_variances(),
        )?;
        for (&(begin, end), &(to_begin, to_end)) in source.iter().zip(&indices) {
            if begin == end {
                continue;
            }
            let value = bins.buffer.slice(Slice::range(bins.dim.clone(), begin..end))?;
            buffer.set_slice(Slice::range(bins.dim.clone(), to_begin..to_end), &value)?;
        }
        log::trace!(
            "packed {} bins with {} elements along {}",
            indices.len(),
            total,
            bins.dim
        );
        Ok(Self::bins_with(self.dims().clone(), indices, bins.dim.clone(), buffer))
    }

    /// Zero-length bins with `dims` (or the dimensions of `self`) over an
    /// empty buffer of the same dtype, unit and variances as the buffer of
    /// `self`.
    pub fn empty_bins_like(&self, dims: Option<Dimensions>) -> Result<Self> {
        let dims = dims.unwrap_or_else(|| self.dims().clone());
        let (indices, total) = contiguous_indices(vec![0; dims.volume()]);
        self.bins_like(dims, indices, total)
    }

    /// Default-initialized bins with the dimensions of `sizes` and the given
    /// number of elements each, packed back to back over a buffer like the
    /// one of `self`.
    pub fn bins_from_sizes(&self, sizes: &Variable) -> Result<Self> {
        if sizes.dtype() != DType::Int64 {
            return Err(type_mismatch(DType::Int64, sizes.dtype()));
        }
        let begins = cumsum_all(sizes, CumSumMode::Exclusive)?;
        let mut total = 0;
        let indices = begins
            .values::<i64>()?
            .iter()
            .zip(sizes.values::<i64>()?.iter())
            .map(|(&begin, &size)| -> Result<IndexPair> {
                let begin = usize::try_from(begin)?;
                let end = begin + usize::try_from(size)?;
                total = end;
                Ok((begin, end))
            })
            .collect::<Result<Vec<_>>>()?;
        self.bins_like(sizes.dims().clone(), indices, total)
    }

    fn bins_like(&self, dims: Dimensions, indices: Vec<IndexPair>, total: usize) -> Result<Self> {
        let bins = self.bin_buffer()?;
        let mut buffer_dims = bins.buffer.dims().clone();
        buffer_dims.resize(&bins.dim, total)?;
        let buffer = Self::default_init(
            bins.buffer.dtype(),
            buffer_dims,
            bins.buffer.unit(),
            bins.buffer.has_variances(),
        )?;
        Ok(Self::bins_with(dims, indices, bins.dim.clone(), buffer))
    }

    /// Bins of `other` equal to those of `self` in the same order.
    pub(crate) fn bins_equal(&self, other: &Variable, nan: NanComparisons) -> Result<bool> {
        if self.bins_dim()? != other.bins_dim()? {
            return Ok(false);
        }
        for (a, b) in self.bins()?.iter().zip(&other.bins()?) {
            if !a.equals(b, nan) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
