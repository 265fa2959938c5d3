// Library for tests to access modules

pub mod collector;
pub mod config;
pub mod models;
pub mod session;
pub mod store;
pub mod sync;
pub mod version;
pub mod worker;
