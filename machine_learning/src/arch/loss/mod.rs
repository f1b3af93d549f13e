mod loss_fn;
mod sparse_cce;

pub use loss_fn::LossFn;
pub use sparse_cce::SparseCategoricalCrossentropy;
