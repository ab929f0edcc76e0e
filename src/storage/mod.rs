mod index;
pub mod models;

pub use index::{JsonIndex, StoreError};
