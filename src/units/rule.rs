use super::Unit;
use crate::{Error, Result};

/// How a kernel derives its output unit from the units of its inputs.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum UnitRule {
    /// Output has the unit of the first input; the others are ignored.
    Preserve,
    /// All inputs must share one unit, which is passed through.
    Equal,
    /// Product of all input units.
    Product,
    /// First input unit divided by the second.
    Quotient,
    /// All inputs must share one unit; output is dimensionless.
    Compare,
    /// All inputs must be dimensionless.
    Dimensionless,
    /// Square root of the single input unit.
    Sqrt,
}

impl UnitRule {
    pub fn apply(self, op: &str, units: &[Unit]) -> Result<Unit> {
        let first = units.first().copied().unwrap_or(Unit::ONE);
        match self {
            Self::Preserve => Ok(first),
            Self::Equal => {
                expect_equal(op, units)?;
                Ok(first)
            }
            Self::Product => units.iter().try_fold(Unit::ONE, |acc, &u| acc * u),
            Self::Quotient => match units {
                [a, b] => *a / *b,
                _ => Err(Error::Unit(format!(
                    "'{}' expects two operands, got {}",
                    op,
                    units.len()
                ))),
            },
            Self::Compare => {
                expect_equal(op, units)?;
                Ok(Unit::ONE)
            }
            Self::Dimensionless => {
                if let Some(u) = units.iter().find(|u| !u.is_dimensionless()) {
                    return Err(Error::Unit(format!(
                        "'{}' expects dimensionless operands, got {}",
                        op, u
                    )));
                }
                Ok(Unit::ONE)
            }
            Self::Sqrt => first.sqrt(),
        }
    }
}

fn expect_equal(op: &str, units: &[Unit]) -> Result<()> {
    if let Some((first, rest)) = units.split_first() {
        if let Some(other) = rest.iter().find(|u| *u != first) {
            return Err(Error::Unit(format!(
                "'{}' expects equal units, got {} and {}",
                op, first, other
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::UnitRule;
    use crate::{Error, Result, Unit};

    #[test]
    fn arithmetic_rules() -> Result<()> {
        let m = Unit::M;
        let s = Unit::S;

        assert_eq!(UnitRule::Equal.apply("add", &[m, m])?, m);
        assert!(matches!(
            UnitRule::Equal.apply("add", &[m, s]),
            Err(Error::Unit(_))
        ));
        assert_eq!(UnitRule::Product.apply("multiply", &[m, s])?, (m * s)?);
        assert_eq!(UnitRule::Quotient.apply("divide", &[m, s])?, (m / s)?);
        assert_eq!(UnitRule::Preserve.apply("negative", &[s])?, s);
        assert_eq!(UnitRule::Sqrt.apply("sqrt", &[(m * m)?])?, m);

        let big = m.powi(100)?;
        assert!(matches!(
            UnitRule::Product.apply("multiply", &[big, big]),
            Err(Error::Unit(_))
        ));
        assert!(matches!(
            UnitRule::Quotient.apply("divide", &[big, m.powi(-100)?]),
            Err(Error::Unit(_))
        ));

        Ok(())
    }

    #[test]
    fn comparison_erases_unit() -> Result<()> {
        assert_eq!(UnitRule::Compare.apply("less", &[Unit::M, Unit::M])?, Unit::ONE);
        assert!(UnitRule::Compare.apply("less", &[Unit::M, Unit::S]).is_err());
        assert!(UnitRule::Dimensionless.apply("and", &[Unit::M]).is_err());
        assert_eq!(
            UnitRule::Dimensionless.apply("and", &[Unit::ONE, Unit::ONE])?,
            Unit::ONE
        );

        Ok(())
    }
}
