mod equal;
mod fmt;
mod slice;
mod view;

pub use equal::NanComparisons;
pub use slice::Slice;
pub use view::{ElementArrayView, ElementArrayViewMut};

use crate::{
    dtype::with_dtype,
    storage::{Buffer, DataHandle, IterMut, Layout},
    transform, DType, Dim, Dimensions, Element, Error, Result, Unit,
};

/// Labeled multi-dimensional array with a unit and optional variances.
///
/// Cloning is cheap: the clone shares the buffer, and whichever side
/// mutates first gets a private copy.
#[derive(Clone, Debug)]
pub struct Variable {
    layout: Layout,
    unit: Unit,
    pub(crate) data: DataHandle,
    readonly: bool,
}

fn check_unit(dtype: DType, unit: Unit) -> Result<()> {
    if dtype == DType::Bins {
        return Err(Error::Unit(String::from(
            "bins cannot have a unit, set it on the bin buffer instead",
        )));
    }
    if !dtype.can_have_unit() && !unit.is_dimensionless() {
        return Err(Error::Unit(format!(
            "dtype {} cannot have unit {}",
            dtype, unit
        )));
    }
    Ok(())
}

pub(crate) fn type_mismatch(expected: DType, actual: DType) -> Error {
    Error::Type(format!("expected dtype {}, got {}", expected, actual))
}

impl Variable {
    pub fn new<T>(
        dims: Dimensions,
        unit: Unit,
        values: Vec<T>,
        variances: Option<Vec<T>>,
    ) -> Result<Self>
    where
        T: Element,
    {
        let volume = dims.volume();
        if values.len() != volume {
            return Err(Error::Dimension(format!(
                "expected {} values for {}, got {}",
                volume,
                dims,
                values.len()
            )));
        }
        if let Some(variances) = &variances {
            if !T::DTYPE.can_have_variances() {
                return Err(Error::Variances(format!(
                    "dtype {} cannot have variances",
                    T::DTYPE
                )));
            }
            if variances.len() != volume {
                return Err(Error::Dimension(format!(
                    "expected {} variances for {}, got {}",
                    volume,
                    dims,
                    variances.len()
                )));
            }
        }
        check_unit(T::DTYPE, unit)?;
        Ok(Self::from_parts(
            Layout::contiguous(dims),
            unit,
            T::into_handle(Buffer::new(values, variances)),
        ))
    }

    pub fn scalar<T>(value: T, unit: Unit) -> Result<Self>
    where
        T: Element,
    {
        Self::new(Dimensions::scalar(), unit, vec![value], None)
    }

    pub fn scalar_with_variance<T>(value: T, variance: T, unit: Unit) -> Result<Self>
    where
        T: Element,
    {
        Self::new(Dimensions::scalar(), unit, vec![value], Some(vec![variance]))
    }

    /// Variable filled with `T::default()`, with zeroed variances if requested.
    pub fn zeros<T>(dims: Dimensions, unit: Unit, with_variances: bool) -> Result<Self>
    where
        T: Element,
    {
        if with_variances && !T::DTYPE.can_have_variances() {
            return Err(Error::Variances(format!(
                "dtype {} cannot have variances",
                T::DTYPE
            )));
        }
        check_unit(T::DTYPE, unit)?;
        let buffer = Buffer::filled(dims.volume(), T::default(), with_variances);
        Ok(Self::from_parts(
            Layout::contiguous(dims),
            unit,
            T::into_handle(buffer),
        ))
    }

    /// Default-initialized variable of a dtype chosen at runtime.
    pub fn default_init(
        dtype: DType,
        dims: Dimensions,
        unit: Unit,
        with_variances: bool,
    ) -> Result<Self> {
        with_dtype!(dtype, T => Self::zeros::<T>(dims, unit, with_variances), bins => {
            Err(Error::Type(String::from(
                "bins are default-initialized from a parent, see `empty_bins_like`",
            )))
        })
    }

    pub(crate) fn from_parts(layout: Layout, unit: Unit, data: DataHandle) -> Self {
        Self {
            layout,
            unit,
            data,
            readonly: false,
        }
    }

    pub fn dims(&self) -> &Dimensions {
        self.layout.dims()
    }

    pub fn strides(&self) -> &[isize] {
        self.layout.strides()
    }

    pub fn offset(&self) -> usize {
        self.layout.offset()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn has_variances(&self) -> bool {
        self.data.has_variances()
    }

    /// Number of elements seen through this variable.
    pub fn volume(&self) -> usize {
        self.layout.volume()
    }

    /// Number of elements of the underlying buffer.
    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// True if both variables share one buffer.
    pub fn is_same(&self, other: &Variable) -> bool {
        self.data.ptr_eq(&other.data)
    }

    /// True unless this variable addresses every buffer element exactly once.
    pub fn is_slice(&self) -> bool {
        self.volume() != self.data_size() || !self.layout.is_injective()
    }

    pub(crate) fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(Error::readonly("variable"));
        }
        Ok(())
    }

    /// Detaches the buffer from other owners before a write.
    pub(crate) fn make_unique(&mut self) -> Result<()> {
        self.check_writable()?;
        if self.data.make_unique() {
            log::trace!(
                "copied shared {} buffer of {} elements before write",
                self.dtype(),
                self.data_size()
            );
        }
        Ok(())
    }

    pub(crate) fn buffer<T>(&self) -> Result<&Buffer<T>>
    where
        T: Element,
    {
        self.data
            .buffer::<T>()
            .ok_or_else(|| type_mismatch(T::DTYPE, self.dtype()))
    }

    pub(crate) fn buffer_mut<T>(&mut self) -> Result<&mut Buffer<T>>
    where
        T: Element,
    {
        if T::DTYPE != self.dtype() {
            return Err(type_mismatch(T::DTYPE, self.dtype()));
        }
        self.make_unique()?;
        self.data
            .buffer_mut::<T>()
            .ok_or_else(|| type_mismatch(T::DTYPE, DType::Bins))
    }

    pub fn values<T>(&self) -> Result<ElementArrayView<'_, T>>
    where
        T: Element,
    {
        Ok(ElementArrayView::new(self.buffer::<T>()?.values(), &self.layout))
    }

    pub fn variances<T>(&self) -> Result<ElementArrayView<'_, T>>
    where
        T: Element,
    {
        let variances = self
            .buffer::<T>()?
            .variances()
            .ok_or_else(|| Error::Variances(String::from("variable has no variances")))?;
        Ok(ElementArrayView::new(variances, &self.layout))
    }

    pub fn values_mut<T>(&mut self) -> Result<ElementArrayViewMut<'_, T>>
    where
        T: Element,
    {
        self.buffer_mut::<T>()?;
        let layout = &self.layout;
        let buffer = self
            .data
            .buffer_mut::<T>()
            .ok_or_else(|| type_mismatch(T::DTYPE, DType::Bins))?;
        Ok(ElementArrayViewMut::new(&mut buffer.values, layout))
    }

    pub fn variances_mut<T>(&mut self) -> Result<ElementArrayViewMut<'_, T>>
    where
        T: Element,
    {
        self.buffer_mut::<T>()?;
        let layout = &self.layout;
        let buffer = self
            .data
            .buffer_mut::<T>()
            .ok_or_else(|| type_mismatch(T::DTYPE, DType::Bins))?;
        let variances = buffer
            .variances
            .as_deref_mut()
            .ok_or_else(|| Error::Variances(String::from("variable has no variances")))?;
        Ok(ElementArrayViewMut::new(variances, layout))
    }

    fn scalar_index(&self) -> Result<usize> {
        if self.volume() != 1 {
            return Err(Error::Dimension(format!(
                "expected a single element, got {}",
                self.dims()
            )));
        }
        Ok(self.layout.offset())
    }

    /// The only element of a single-element variable.
    pub fn value<T>(&self) -> Result<T>
    where
        T: Element,
    {
        let i = self.scalar_index()?;
        Ok(self.buffer::<T>()?.values()[i].clone())
    }

    pub fn variance<T>(&self) -> Result<T>
    where
        T: Element,
    {
        let i = self.scalar_index()?;
        self.buffer::<T>()?
            .variances()
            .map(|v| v[i].clone())
            .ok_or_else(|| Error::Variances(String::from("variable has no variances")))
    }

    pub fn set_unit(&mut self, unit: Unit) -> Result<()> {
        self.check_writable()?;
        check_unit(self.dtype(), unit)?;
        self.unit = unit;
        Ok(())
    }

    /// Replaces the variances by the values of `variances`, or strips them
    /// when `None` is given.
    pub fn set_variances(&mut self, variances: Option<&Variable>) -> Result<()> {
        self.check_writable()?;
        let variances = match variances {
            Some(v) => v,
            None => {
                if self.has_variances() {
                    self.make_unique()?;
                    match self.dtype() {
                        DType::Float64 => self.data.set_variances::<f64>(None),
                        DType::Float32 => self.data.set_variances::<f32>(None),
                        _ => false,
                    };
                }
                return Ok(());
            }
        };
        if variances.dims() != self.dims() {
            return Err(Error::Dimension(format!(
                "variances of {} do not match values of {}",
                variances.dims(),
                self.dims()
            )));
        }
        if variances.unit() != self.unit {
            return Err(Error::Unit(format!(
                "variances in {} do not match values in {}",
                variances.unit(),
                self.unit
            )));
        }
        if variances.dtype() != self.dtype() {
            return Err(type_mismatch(self.dtype(), variances.dtype()));
        }
        if !self.dtype().can_have_variances() {
            return Err(Error::Variances(format!(
                "dtype {} cannot have variances",
                self.dtype()
            )));
        }
        if variances.has_variances() {
            return Err(Error::Variances(String::from(
                "variances cannot have variances",
            )));
        }
        if self.is_slice() {
            return Err(Error::Variances(String::from(
                "cannot set variances on a slice",
            )));
        }
        match self.dtype() {
            DType::Float64 => self.set_variances_from::<f64>(variances),
            _ => self.set_variances_from::<f32>(variances),
        }
    }

    fn set_variances_from<T>(&mut self, variances: &Variable) -> Result<()>
    where
        T: Element,
    {
        let mut buf = vec![T::default(); self.data_size()];
        for (dst, src) in IterMut::new(&mut buf, &self.layout).zip(variances.values::<T>()?) {
            *dst = src.clone();
        }
        self.make_unique()?;
        self.data.set_variances(Some(buf));
        Ok(())
    }

    /// Read-only alias of this variable.
    pub fn as_const(&self) -> Self {
        Self {
            readonly: true,
            ..self.clone()
        }
    }

    pub fn slice(&self, slice: Slice) -> Result<Self> {
        Ok(Self {
            layout: slice.apply(&self.layout)?,
            ..self.clone()
        })
    }

    /// Read-only view presenting this variable with `dims`, repeating it
    /// along labels it lacks or has with extent 1.
    pub fn broadcast(&self, dims: &Dimensions) -> Result<Self> {
        Ok(Self {
            layout: self.layout.broadcast(dims)?,
            readonly: true,
            ..self.clone()
        })
    }

    pub fn transpose(&self, order: &[Dim]) -> Result<Self> {
        Ok(Self {
            layout: self.layout.transpose(order)?,
            ..self.clone()
        })
    }

    /// Same elements with new dimensions. Shares the buffer if the data is
    /// contiguous, copies otherwise.
    pub fn reshape(&self, dims: Dimensions) -> Result<Self> {
        if !self.layout.is_contiguous() {
            return self.copy()?.reshape(dims);
        }
        Ok(Self {
            layout: self.layout.reshape(dims)?,
            ..self.clone()
        })
    }

    pub fn rename(&mut self, from: &Dim, to: Dim) -> Result<()> {
        self.layout.rename(from, to)
    }

    pub fn renamed(&self, from: &Dim, to: Dim) -> Result<Self> {
        let mut out = self.clone();
        out.rename(from, to)?;
        Ok(out)
    }

    /// Deep copy into a fresh contiguous buffer.
    pub fn copy(&self) -> Result<Self> {
        if self.dtype() == DType::Bins {
            return self.copy_bins();
        }
        let mut out = Self::default_init(
            self.dtype(),
            self.dims().clone(),
            self.unit,
            self.has_variances(),
        )?;
        transform::assign(self, &mut out)?;
        Ok(out)
    }

    /// Copies the elements of `self` into `target`, broadcasting over the
    /// dimensions `target` has in addition.
    pub fn copy_into(&self, target: &mut Variable) -> Result<()> {
        self.check_assignable(target, target.dims())?;
        transform::assign(self, target)
    }

    /// Writes `value` into the region `slice` of this variable. Other owners
    /// of the buffer are detached first.
    pub fn set_slice(&mut self, slice: Slice, value: &Variable) -> Result<()> {
        let region = slice.apply(&self.layout)?;
        value.check_assignable(self, region.dims())?;
        transform::assign_region(value, self, &region)
    }

    fn check_assignable(&self, target: &Variable, dims: &Dimensions) -> Result<()> {
        target.check_writable()?;
        if self.dtype() != target.dtype() {
            return Err(type_mismatch(target.dtype(), self.dtype()));
        }
        if self.unit != target.unit {
            return Err(Error::Unit(format!(
                "cannot assign {} to {}",
                self.unit, target.unit
            )));
        }
        if self.has_variances() != target.has_variances() {
            return Err(Error::Variances(String::from(
                "cannot assign between variables with and without variances",
            )));
        }
        self.layout.aligned_strides(dims).map(drop)
    }

    /// Copy without variances.
    pub fn values_only(&self) -> Result<Self> {
        if !self.has_variances() {
            return Ok(self.clone());
        }
        let mut out = self.copy()?;
        out.set_variances(None)?;
        Ok(out)
    }

    /// The variances as values of a new variable, in the squared unit.
    pub fn variances_as_values(&self) -> Result<Self> {
        let unit = self.unit.powi(2)?;
        match self.dtype() {
            DType::Float64 => {
                Self::new(self.dims().clone(), unit, self.variances::<f64>()?.to_vec(), None)
            }
            DType::Float32 => {
                Self::new(self.dims().clone(), unit, self.variances::<f32>()?.to_vec(), None)
            }
            dtype => Err(Error::Variances(format!(
                "dtype {} cannot have variances",
                dtype
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Slice, Variable};
    use crate::{DType, Dim, Dimensions, Error, Result, Unit};

    fn xy() -> Result<Variable> {
        Variable::new(
            Dimensions::new([(Dim::X, 2), (Dim::Y, 3)])?,
            Unit::M,
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            None,
        )
    }

    #[test]
    fn construct_and_inspect() -> Result<()> {
        let v = xy()?;

        assert_eq!(v.dims().shape(), &[2, 3]);
        assert_eq!(v.strides(), &[3, 1]);
        assert_eq!(v.unit(), Unit::M);
        assert_eq!(v.dtype(), DType::Float64);
        assert!(!v.has_variances());
        assert!(!v.is_readonly());
        assert_eq!(v.volume(), 6);
        assert_eq!(v.data_size(), 6);
        assert!(!v.is_slice());

        Ok(())
    }

    #[test]
    fn construct_invalid() -> Result<()> {
        let dims = Dimensions::new([(Dim::X, 2)])?;

        assert!(matches!(
            Variable::new(dims.clone(), Unit::ONE, vec![1_i64], None),
            Err(Error::Dimension(_))
        ));
        assert!(matches!(
            Variable::new(dims.clone(), Unit::ONE, vec![1_i64, 2], Some(vec![0, 0])),
            Err(Error::Variances(_))
        ));
        assert!(matches!(
            Variable::new(dims, Unit::M, vec![true, false], None),
            Err(Error::Unit(_))
        ));

        Ok(())
    }

    #[test]
    fn typed_access() -> Result<()> {
        let v = xy()?;

        assert_eq!(v.values::<f64>()?.to_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!(matches!(v.values::<f32>(), Err(Error::Type(_))));
        assert!(matches!(v.variances::<f64>(), Err(Error::Variances(_))));
        assert!(matches!(v.value::<f64>(), Err(Error::Dimension(_))));
        let element = v.slice(Slice::index(Dim::X, 1))?.slice(Slice::index(Dim::Y, 2))?;
        assert_eq!(element.value::<f64>()?, 6.0);

        Ok(())
    }

    #[test]
    fn write_detaches_shared_buffer() -> Result<()> {
        let a = xy()?;
        let mut b = a.clone();
        assert!(a.is_same(&b));

        b.values_mut::<f64>()?.fill(0.0);

        assert!(!a.is_same(&b));
        assert_eq!(a.values::<f64>()?.get(0), Some(&1.0));
        assert_eq!(b.values::<f64>()?.to_vec(), vec![0.0; 6]);

        Ok(())
    }

    #[test]
    fn readonly_rejects_writes() -> Result<()> {
        let mut c = xy()?.as_const();

        assert!(c.is_readonly());
        assert!(matches!(c.values_mut::<f64>(), Err(Error::Readonly(_))));
        assert!(matches!(c.set_unit(Unit::S), Err(Error::Readonly(_))));

        let mut b = xy()?.broadcast(&Dimensions::new([(Dim::Z, 2), (Dim::X, 2), (Dim::Y, 3)])?)?;
        assert!(b.is_readonly());
        assert_eq!(b.volume(), 12);
        assert!(b.is_slice());
        assert!(matches!(b.values_mut::<f64>(), Err(Error::Readonly(_))));

        Ok(())
    }

    #[test]
    fn set_unit_respects_dtype() -> Result<()> {
        let mut v = xy()?;
        v.set_unit(Unit::S)?;
        assert_eq!(v.unit(), Unit::S);

        let mut mask = Variable::scalar(true, Unit::ONE)?;
        assert!(matches!(mask.set_unit(Unit::M), Err(Error::Unit(_))));
        mask.set_unit(Unit::ONE)?;

        Ok(())
    }

    #[test]
    fn set_and_strip_variances() -> Result<()> {
        let mut v = xy()?;
        let dims = v.dims().clone();
        let variances = Variable::new(dims.clone(), Unit::M, vec![0.5; 6], None)?;

        v.set_variances(Some(&variances))?;
        assert_eq!(v.variances::<f64>()?.to_vec(), vec![0.5; 6]);
        assert_eq!(v.variances_as_values()?.unit(), (Unit::M * Unit::M)?);

        let wrong_unit = Variable::new(dims.clone(), Unit::S, vec![0.5; 6], None)?;
        assert!(matches!(v.set_variances(Some(&wrong_unit)), Err(Error::Unit(_))));
        let wrong_dims = Variable::new(
            Dimensions::new([(Dim::X, 6)])?,
            Unit::M,
            vec![0.5; 6],
            None,
        )?;
        assert!(matches!(v.set_variances(Some(&wrong_dims)), Err(Error::Dimension(_))));
        let wrong_type = Variable::new(dims, Unit::M, vec![1_i64; 6], None)?;
        assert!(matches!(v.set_variances(Some(&wrong_type)), Err(Error::Type(_))));

        v.set_variances(None)?;
        assert!(!v.has_variances());

        Ok(())
    }

    #[test]
    fn variances_on_integers() -> Result<()> {
        let mut v = Variable::new(
            Dimensions::new([(Dim::X, 2)])?,
            Unit::ONE,
            vec![1_i64, 2],
            None,
        )?;
        let w = v.clone();

        assert!(matches!(v.set_variances(Some(&w)), Err(Error::Variances(_))));

        Ok(())
    }

    #[test]
    fn derived_views_share_buffer() -> Result<()> {
        let v = xy()?;
        let s = v.slice(Slice::range(Dim::X, 1..2))?;
        let t = v.transpose(&[Dim::Y, Dim::X])?;
        let r = v.reshape(Dimensions::new([(Dim::Z, 6)])?)?;

        assert!(s.is_same(&v) && t.is_same(&v) && r.is_same(&v));
        assert!(s.is_slice());
        assert_eq!(s.values::<f64>()?.to_vec(), vec![4.0, 5.0, 6.0]);
        assert_eq!(t.values::<f64>()?.to_vec(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);

        let tr = t.reshape(Dimensions::new([(Dim::Z, 6)])?)?;
        assert!(!tr.is_same(&v));
        assert_eq!(tr.values::<f64>()?.to_vec(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);

        Ok(())
    }

    #[test]
    fn copy_is_deep_and_contiguous() -> Result<()> {
        let v = xy()?;
        let column = v.slice(Slice::index(Dim::Y, 1))?;
        let c = column.copy()?;

        assert!(!c.is_same(&v));
        assert!(!c.is_slice());
        assert_eq!(c.values::<f64>()?.as_slice(), Some(&[2.0, 5.0][..]));
        assert_eq!(c, column);

        Ok(())
    }

    #[test]
    fn copy_into_broadcasts() -> Result<()> {
        let row = Variable::new(
            Dimensions::new([(Dim::Y, 3)])?,
            Unit::M,
            vec![7.0, 8.0, 9.0],
            None,
        )?;
        let mut target = xy()?;
        row.copy_into(&mut target)?;

        assert_eq!(target.values::<f64>()?.to_vec(), vec![7.0, 8.0, 9.0, 7.0, 8.0, 9.0]);

        let seconds = Variable::scalar(1.0, Unit::S)?;
        assert!(matches!(seconds.copy_into(&mut target), Err(Error::Unit(_))));
        let ints = Variable::scalar(1_i64, Unit::M)?;
        assert!(matches!(ints.copy_into(&mut target), Err(Error::Type(_))));

        Ok(())
    }

    #[test]
    fn set_slice_writes_region() -> Result<()> {
        let mut v = xy()?;
        let keep = v.clone();
        let row = Variable::new(Dimensions::new([(Dim::Y, 3)])?, Unit::M, vec![0.0; 3], None)?;
        v.set_slice(Slice::index(Dim::X, 0), &row)?;

        assert_eq!(v.values::<f64>()?.to_vec(), vec![0.0, 0.0, 0.0, 4.0, 5.0, 6.0]);
        assert_eq!(keep.values::<f64>()?.get(0), Some(&1.0));
        assert!(v.data.is_unique());

        Ok(())
    }

    #[test]
    fn rename_is_checked() -> Result<()> {
        let mut v = xy()?;
        v.rename(&Dim::X, Dim::Z)?;

        assert_eq!(v.dims().labels(), &[Dim::Z, Dim::Y]);
        assert!(matches!(v.rename(&Dim::Z, Dim::Y), Err(Error::Dimension(_))));
        assert_eq!(v.renamed(&Dim::Z, Dim::X)?, xy()?);

        Ok(())
    }

    #[test]
    fn default_init_by_dtype() -> Result<()> {
        let dims = Dimensions::new([(Dim::X, 2)])?;
        let s = Variable::default_init(DType::String, dims.clone(), Unit::ONE, false)?;

        assert_eq!(s.values::<String>()?.to_vec(), vec![String::new(), String::new()]);
        assert!(matches!(
            Variable::default_init(DType::Int32, dims.clone(), Unit::ONE, true),
            Err(Error::Variances(_))
        ));
        assert!(matches!(
            Variable::default_init(DType::Bins, dims, Unit::ONE, false),
            Err(Error::Type(_))
        ));

        Ok(())
    }
}
