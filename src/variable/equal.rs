use super::Variable;
use crate::{dtype::with_dtype, Element, Result};

/// Whether two NaN elements compare equal.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum NanComparisons {
    Equal,
    #[default]
    Unequal,
}

fn elements_equal<T>(a: &T, b: &T, nan: NanComparisons) -> bool
where
    T: Element,
{
    a == b || (nan == NanComparisons::Equal && a.is_nan() && b.is_nan())
}

fn equal_as<T>(a: &Variable, b: &Variable, nan: NanComparisons) -> Result<bool>
where
    T: Element,
{
    let same = |x: &T, y: &T| elements_equal(x, y, nan);
    if !a.values::<T>()?.into_iter().zip(b.values::<T>()?).all(|(x, y)| same(x, y)) {
        return Ok(false);
    }
    if a.has_variances() {
        return Ok(a
            .variances::<T>()?
            .into_iter()
            .zip(b.variances::<T>()?)
            .all(|(x, y)| same(x, y)));
    }
    Ok(true)
}

impl Variable {
    /// Compares dimensions (in any order), unit, dtype, values and variances.
    pub fn equals(&self, other: &Variable, nan: NanComparisons) -> bool {
        if !self.dims().is_permutation_of(other.dims())
            || self.unit() != other.unit()
            || self.dtype() != other.dtype()
            || self.has_variances() != other.has_variances()
        {
            return false;
        }
        let other = match other.transpose(self.dims().labels()) {
            Ok(other) => other,
            Err(_) => return false,
        };
        let equal = with_dtype!(self.dtype(), T => equal_as::<T>(self, &other, nan), bins => {
            self.bins_equal(&other, nan)
        });
        equal.unwrap_or(false)
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other, NanComparisons::Unequal)
    }
}

#[cfg(test)]
mod tests {
    use super::NanComparisons;
    use crate::{Dim, Dimensions, Result, Unit, Variable};

    #[test]
    fn equal_ignores_dimension_order() -> Result<()> {
        let a = Variable::new(
            Dimensions::new([(Dim::X, 2), (Dim::Y, 2)])?,
            Unit::M,
            vec![1, 2, 3, 4],
            None,
        )?;
        let b = Variable::new(
            Dimensions::new([(Dim::Y, 2), (Dim::X, 2)])?,
            Unit::M,
            vec![1, 3, 2, 4],
            None,
        )?;

        assert_eq!(a, b);
        assert_eq!(a, a.transpose(&[Dim::Y, Dim::X])?);

        Ok(())
    }

    #[test]
    fn unequal_metadata() -> Result<()> {
        let dims = Dimensions::new([(Dim::X, 2)])?;
        let a = Variable::new(dims.clone(), Unit::M, vec![1.0, 2.0], None)?;

        assert_ne!(a, Variable::new(dims.clone(), Unit::S, vec![1.0, 2.0], None)?);
        assert_ne!(a, Variable::new(dims.clone(), Unit::M, vec![1.0_f32, 2.0], None)?);
        assert_ne!(a, Variable::new(dims.clone(), Unit::M, vec![1.0, 2.0], Some(vec![0.0; 2]))?);
        assert_ne!(a, Variable::new(dims, Unit::M, vec![1.0, 3.0], None)?);

        Ok(())
    }

    #[test]
    fn nan_policy() -> Result<()> {
        let a = Variable::scalar(f64::NAN, Unit::ONE)?;

        assert_ne!(a, a.clone());
        assert!(a.equals(&a, NanComparisons::Equal));
        assert!(!a.equals(&a, NanComparisons::Unequal));

        Ok(())
    }
}
