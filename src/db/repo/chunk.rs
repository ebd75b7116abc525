use crate::db::DbResult;
use crate::models::chunk::{Chunk, ChunkCoord};

#[async_trait::async_trait]
pub trait ChunkRepo: Send + Sync {
    /// Loads a previously stored chunk
    async fn load(&self, coord: ChunkCoord) -> DbResult<Option<Chunk>>;

    /// Stores a chunk, replacing any record for the same coordinates
    async fn save(&self, chunk: &Chunk) -> DbResult<()>;
}
