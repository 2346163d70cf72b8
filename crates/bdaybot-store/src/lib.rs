pub mod services;
pub mod store;

pub use store::{Store, StoreReport};
