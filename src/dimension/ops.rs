use super::Dimensions;
use crate::{Error, Result};

/// Union of two shapes. Labels of `a` come first, labels only in `b` follow
/// in their order. A shared label must have equal extents unless one of them
/// is 1, which is broadcast to the other.
pub fn merge(a: &Dimensions, b: &Dimensions) -> Result<Dimensions> {
    let mut out = a.clone();
    for (label, extent) in b.iter() {
        match out.position(label) {
            Some(i) => {
                let current = out.shape[i];
                if current == extent || extent == 1 {
                    continue;
                } else if current == 1 {
                    out.shape[i] = extent;
                } else {
                    return Err(Error::Dimension(format!(
                        "cannot merge {} and {}: extents of {} differ",
                        a, b, label
                    )));
                }
            }
            None => out.add(label.clone(), extent)?,
        }
    }
    Ok(out)
}

pub(crate) fn merge_all<'a, I>(dims: I) -> Result<Dimensions>
where
    I: IntoIterator<Item = &'a Dimensions>,
{
    dims.into_iter()
        .try_fold(Dimensions::scalar(), |acc, d| merge(&acc, d))
}

#[cfg(test)]
mod tests {
    use super::{merge, merge_all};
    use crate::{Dim, Dimensions, Error, Result};

    #[test]
    fn merge_disjoint() -> Result<()> {
        let a = Dimensions::new([(Dim::X, 2)])?;
        let b = Dimensions::new([(Dim::Y, 3)])?;

        assert_eq!(merge(&a, &b)?, Dimensions::new([(Dim::X, 2), (Dim::Y, 3)])?);
        assert_eq!(merge(&b, &a)?, Dimensions::new([(Dim::Y, 3), (Dim::X, 2)])?);

        Ok(())
    }

    #[test]
    fn merge_broadcasts_extent_one() -> Result<()> {
        let a = Dimensions::new([(Dim::X, 1), (Dim::Y, 4)])?;
        let b = Dimensions::new([(Dim::X, 3)])?;

        assert_eq!(merge(&a, &b)?.shape(), &[3, 4]);
        assert_eq!(merge(&b, &a)?.shape(), &[3, 4]);

        Ok(())
    }

    #[test]
    fn merge_incompatible() -> Result<()> {
        let a = Dimensions::new([(Dim::X, 2)])?;
        let b = Dimensions::new([(Dim::X, 3)])?;

        assert!(matches!(merge(&a, &b), Err(Error::Dimension(_))));

        Ok(())
    }

    #[test]
    fn merge_many() -> Result<()> {
        let a = Dimensions::new([(Dim::X, 2)])?;
        let b = Dimensions::scalar();
        let c = Dimensions::new([(Dim::Y, 5), (Dim::X, 2)])?;

        assert_eq!(merge_all([&a, &b, &c])?.shape(), &[2, 5]);

        Ok(())
    }
}
