pub mod config;
pub mod driver;
pub mod epic;
pub mod error;
pub mod evidence;
pub mod graph;
pub mod ids;
pub mod io;
pub mod ops;
pub mod paths;
pub mod receipt;
pub mod runctl;
pub mod selector;
pub mod store;
pub mod task;
pub mod types;
pub mod workspace;

pub use error::{Result, StewardError};
