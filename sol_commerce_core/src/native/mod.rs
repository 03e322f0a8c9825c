// Native implementations

pub mod poll_source;
pub mod storage_impl;

pub use poll_source::TokioPollSource;
pub use storage_impl::FileStore;
