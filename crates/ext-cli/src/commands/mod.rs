//! Command implementations for ext-cli

pub mod catalogs;
pub mod resolve;
pub mod solve;

pub use catalogs::run_catalogs;
pub use resolve::{ResolveArgs, run_resolve};
pub use solve::run_solve;
