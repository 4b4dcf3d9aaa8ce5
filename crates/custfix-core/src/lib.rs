pub mod clock;
pub mod config;
pub mod document;
pub mod error;
pub mod hotspot;
pub mod io;
pub mod paths;
pub mod pdf;
pub mod reconcile;
pub mod store;

pub use error::{CustfixError, Result};
