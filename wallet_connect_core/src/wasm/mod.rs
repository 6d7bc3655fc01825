// WASM-specific implementations
pub mod discovery;
pub mod provider;
pub mod storage_impl;
pub mod utils;

// Re-exports
pub use discovery::*;
pub use provider::*;
pub use storage_impl::*;
pub use utils::*;
