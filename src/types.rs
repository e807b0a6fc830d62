use ndarray::{Array1, ArrayView1};

pub type Array1f = Array1<f64>;
pub type ArrayView1f<'a> = ArrayView1<'a, f64>;
