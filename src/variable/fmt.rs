use core::fmt;

use super::{ElementArrayView, Variable};
use crate::{dtype::with_dtype, Element, IndexPair};

const NUM_EDGE_ELEMENTS: usize = 3;
const TRUNCATION_THRESHOLD: usize = 1_000;

struct FormatOption {
    num_edge_elements: usize,
}

impl Default for FormatOption {
    fn default() -> Self {
        Self {
            num_edge_elements: NUM_EDGE_ELEMENTS,
        }
    }
}

impl FormatOption {
    fn new(len: usize, full: bool) -> Self {
        Self::default().without_truncation(full || len < TRUNCATION_THRESHOLD)
    }

    fn without_truncation(mut self, valid: bool) -> Self {
        if valid {
            self.num_edge_elements = usize::MAX / 2;
        }
        self
    }
}

fn format_elements<T>(
    view: ElementArrayView<'_, T>,
    option: &FormatOption,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result
where
    T: fmt::Debug,
{
    let len = view.len();
    let edge = option.num_edge_elements;
    f.write_str("[")?;
    for (i, x) in view.iter().enumerate() {
        if len > edge * 2 && i >= edge && i < len - edge {
            if i == edge {
                f.write_str(", ...")?;
            }
            continue;
        }
        if i != 0 {
            f.write_str(", ")?;
        }
        write!(f, "{:?}", x)?;
    }
    f.write_str("]")
}

fn format_typed<T>(var: &Variable, option: &FormatOption, f: &mut fmt::Formatter<'_>) -> fmt::Result
where
    T: Element,
{
    if let Ok(values) = var.values::<T>() {
        f.write_str(" values=")?;
        format_elements(values, option, f)?;
    }
    if let Ok(variances) = var.variances::<T>() {
        f.write_str(" variances=")?;
        format_elements(variances, option, f)?;
    }
    Ok(())
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let option = FormatOption::new(self.volume(), f.alternate());
        write!(f, "{} {}", self.dims(), self.dtype())?;
        if self.dtype().can_have_unit() {
            write!(f, " [{}]", self.unit())?;
        }
        with_dtype!(self.dtype(), T => format_typed::<T>(self, &option, f), bins => {
            if let Ok(indices) = self.bin_indices() {
                write!(f, " dim={} indices=", self.bins_dim().map_err(|_| fmt::Error)?)?;
                format_typed::<IndexPair>(&indices, &option, f)?;
            }
            Ok(())
        })
    }
}
