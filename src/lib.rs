pub mod backend;
pub mod bench;
pub mod conf;
pub mod core;
pub mod data;

#[cfg(feature = "testutil")]
pub mod testutil;
