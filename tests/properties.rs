use approx::assert_relative_eq;
use scivar::{
    merge,
    ops::{self, Sum},
    transform::InPlaceOp,
    Dim, Dimensions, Error, IndexPair, Result, Slice, Tuning, Unit, Variable,
};

fn xy() -> Result<Variable> {
    Variable::new(
        Dimensions::new([(Dim::X, 2), (Dim::Y, 3)])?,
        Unit::M,
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        Some(vec![0.5, 0.5, 0.5, 1.0, 1.0, 1.0]),
    )
}

#[test]
fn addition_commutes() -> Result<()> {
    let a = xy()?;
    let b = Variable::new(
        Dimensions::new([(Dim::Y, 3), (Dim::Z, 2)])?,
        Unit::M,
        vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0],
        None,
    )?;

    let ab = ops::add(&a, &b)?;
    let ba = ops::add(&b, &a)?;

    assert_eq!(ab, ba);
    assert_eq!(ab.dims(), &merge(a.dims(), b.dims())?);
    assert_eq!(ba.dims(), &merge(b.dims(), a.dims())?);

    Ok(())
}

#[test]
fn scalar_broadcasts() -> Result<()> {
    let a = xy()?.values_only()?;
    let s = Variable::scalar(0.25, Unit::M)?;
    let c = (&s + &a)?;

    assert_eq!(c.dims(), a.dims());
    for (x, y) in c.values::<f64>()?.iter().zip(a.values::<f64>()?.iter()) {
        assert_eq!(*x, 0.25 + *y);
    }

    Ok(())
}

#[test]
fn views_are_copy_on_write() -> Result<()> {
    let v1 = xy()?;
    let mut v2 = v1.slice(Slice::index(Dim::X, 1))?;
    assert!(v2.is_same(&v1));

    v2.values_mut::<f64>()?.fill(-1.0);

    assert!(!v2.is_same(&v1));
    assert_eq!(v1.values::<f64>()?.to_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    assert_eq!(v2.values::<f64>()?.to_vec(), vec![-1.0, -1.0, -1.0]);

    Ok(())
}

#[test]
fn units_are_checked() -> Result<()> {
    let m = Variable::scalar(1.0, Unit::M)?;
    let s = Variable::scalar(2.0, Unit::S)?;

    assert!(matches!(&m + &s, Err(Error::Unit(_))));
    assert_eq!((&m * &s)?.unit(), (Unit::M * Unit::S)?);

    Ok(())
}

#[test]
fn division_propagates_variances() -> Result<()> {
    let a = Variable::scalar_with_variance(4.2, 0.1, Unit::ONE)?;
    let b = Variable::scalar_with_variance(2.0, 1.2, Unit::ONE)?;
    let c = (&a / &b)?;

    assert_relative_eq!(c.value::<f64>()?, 2.1);
    assert_relative_eq!(c.variance::<f64>()?, 1.348, max_relative = 1e-12);

    Ok(())
}

#[test]
fn bin_copy_preserves_contents() -> Result<()> {
    let buffer = Variable::new(
        Dimensions::new([(Dim::EVENT, 7)])?,
        Unit::COUNTS,
        vec![0_i64, 1, 2, 3, 4, 5, 6],
        None,
    )?;
    let indices = Variable::new(
        Dimensions::new([(Dim::SPECTRUM, 3)])?,
        Unit::ONE,
        vec![(5, 7), (0, 2), (1, 4)],
        None,
    )?;
    let bins = Variable::from_bins(&indices, Dim::EVENT, buffer)?;
    let copy = bins.copy()?;

    let total: usize = copy
        .bin_indices()?
        .values::<IndexPair>()?
        .iter()
        .map(|(begin, end)| end - begin)
        .sum();
    assert_eq!(total, 7);
    assert_eq!(copy.bins_buffer()?.dims().shape(), &[7]);
    assert_eq!(
        copy.bins_buffer()?.values::<i64>()?.to_vec(),
        vec![5, 6, 0, 1, 1, 2, 3]
    );
    for (a, b) in bins.bins()?.iter().zip(copy.bins()?.iter()) {
        assert_eq!(a, b);
    }

    Ok(())
}

#[test]
fn parallel_sum_matches_serial() -> Result<()> {
    let dims = Dimensions::new([(Dim::X, 512), (Dim::Y, 64)])?;
    let values: Vec<f64> = (0..dims.volume()).map(|i| (i % 97) as f64 / 7.0).collect();
    let var = Variable::new(dims, Unit::ONE, values, None)?;

    for out_dims in [Dimensions::new([(Dim::Y, 64)])?, Dimensions::scalar()] {
        let mut serial = Variable::zeros::<f64>(out_dims.clone(), Unit::ONE, false)?;
        Sum.accumulate_with(&Tuning::serial(), &mut serial, &var)?;
        let mut parallel = Variable::zeros::<f64>(out_dims, Unit::ONE, false)?;
        Sum.accumulate_with(&Tuning::eager(), &mut parallel, &var)?;

        for (a, b) in serial.values::<f64>()?.iter().zip(parallel.values::<f64>()?.iter()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-12);
        }
    }

    Ok(())
}

#[test]
fn full_slice_is_identity() -> Result<()> {
    let v = xy()?;

    assert_eq!(v.slice(Slice::range(Dim::X, 0..2))?, v);
    assert_eq!(v.slice(Slice::range(Dim::Y, ..))?, v);

    Ok(())
}

#[test]
fn rename_round_trips() -> Result<()> {
    let v = xy()?;
    let renamed = v.renamed(&Dim::X, Dim::Z)?.renamed(&Dim::Z, Dim::X)?;

    assert_eq!(renamed, v);
    assert!(matches!(v.renamed(&Dim::X, Dim::Y), Err(Error::Dimension(_))));

    Ok(())
}
