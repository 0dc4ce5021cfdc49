//! Labeled multi-dimensional arrays with physical units, variances and
//! ragged (binned) elements.
//!
//! A [`Variable`] is a strided view into a reference-counted buffer of one
//! dtype. Views share storage and copy it on the first write. Element-wise
//! operations broadcast by dimension label and propagate units and
//! variances, see [`ops`].

mod accumulate;
pub use accumulate::{select_strategy, Strategy};

pub mod bins;

pub mod config;
pub use config::{Config, Tuning};

mod dimension;
pub use dimension::{merge, Dim, Dimensions};

mod dtype;
pub use dtype::{DType, Element, IndexPair};

mod error;
pub use error::{Error, Result};

pub mod ops;

mod parallel;

pub mod storage;

pub mod transform;

mod units;
pub use units::{Unit, UnitRule};

mod variable;
pub use variable::{ElementArrayView, ElementArrayViewMut, NanComparisons, Slice, Variable};

mod variance;
pub use variance::ValueAndVariance;
