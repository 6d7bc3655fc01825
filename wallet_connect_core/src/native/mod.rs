// Native implementations

pub mod http;
pub mod storage_impl;

pub use http::HttpProvider;
pub use storage_impl::FileStorage;
