use nalgebra::DMatrix;
use num_traits::FromPrimitive;

/// Centre columns of a dense matrix
pub trait MatOps {
    type Mat;
    type Scalar;

    fn centre_columns_inplace(&mut self);
    fn centre_columns(&self) -> Self::Mat;
}

impl<T> MatOps for DMatrix<T>
where
    T: nalgebra::RealField + FromPrimitive + Copy,
{
    type Mat = Self;
    type Scalar = T;

    fn centre_columns_inplace(&mut self) {
        let nn = T::from_usize(self.nrows().max(1)).unwrap_or_else(T::one);
        for mut col in self.column_iter_mut() {
            let mean = col.iter().copied().fold(T::zero(), |a, b| a + b) / nn;
            for x in col.iter_mut() {
                *x -= mean;
            }
        }
    }

    fn centre_columns(&self) -> Self::Mat {
        let mut ret = self.clone();
        ret.centre_columns_inplace();
        ret
    }
}
