use crate::db::DbResult;
use crate::db::repo::ChunkRepo;
use crate::models::chunk::{Chunk, ChunkCoord};
use dashmap::DashMap;

/// In-memory chunk store.
#[derive(Default)]
pub struct ChunkMemoryRepository {
    chunks: DashMap<ChunkCoord, Chunk>,
}

impl ChunkMemoryRepository {
    pub fn new() -> Self {
        Self { chunks: DashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[async_trait::async_trait]
impl ChunkRepo for ChunkMemoryRepository {
    async fn load(&self, coord: ChunkCoord) -> DbResult<Option<Chunk>> {
        Ok(self.chunks.get(&coord).map(|c| c.value().clone()))
    }

    async fn save(&self, chunk: &Chunk) -> DbResult<()> {
        self.chunks.insert(chunk.coord, chunk.clone());
        Ok(())
    }
}
