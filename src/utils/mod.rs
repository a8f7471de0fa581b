//! Matrix helpers and data splitting.

mod matrix;
mod split;

pub use matrix::{
    distance, linear_predictor, mean, scaled_transpose_product, select_elems, select_rows,
};
pub use split::KFold;
