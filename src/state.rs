pub mod pool;
pub mod registry;
pub mod session;
pub mod shots;
