pub mod config;
pub mod daemon;
pub mod document;
pub mod emit;
pub mod error;
pub mod io;
pub mod paths;
pub mod record;
pub mod request;
pub mod store;
pub mod task;

pub use error::{ArchonError, Result};
pub use store::StateStore;
