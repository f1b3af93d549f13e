pub mod error;
pub mod loader;
pub mod memory;
pub mod mnist;
pub mod pipeline;
pub mod prefetch;
pub mod provider;

pub use error::{DataErr, Result};
pub use loader::{BatchedDataset, Loaded, load_and_preprocess};
pub use memory::InMemoryProvider;
pub use mnist::MnistIdxProvider;
pub use provider::{DatasetInfo, DatasetProvider, RawSplit, Split};
