mod account;
mod account_file;
mod account_mem;
mod chunk;
mod chunk_file;
mod chunk_mem;

pub use account_file::AccountFileRepository;
pub use account_mem::AccountMemoryRepository;
pub use chunk_file::ChunkFileRepository;
pub use chunk_mem::ChunkMemoryRepository;

pub use account::AccountRepo;
pub use chunk::ChunkRepo;
