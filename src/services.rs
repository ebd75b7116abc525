mod account;
mod chunk;

pub use account::AccountService;
pub use chunk::ChunkService;
