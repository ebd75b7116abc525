use crate::db::DbResult;
use crate::db::repo::ChunkRepo;
use crate::models::chunk::{Chunk, ChunkCoord};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct ChunkService {
    repo: Arc<dyn ChunkRepo>,
    // one lock per coordinate so a chunk is never generated twice
    locks: DashMap<ChunkCoord, Arc<Mutex<()>>>,
}

impl ChunkService {
    pub fn new(repo: Arc<dyn ChunkRepo>) -> Self {
        Self {
            repo,
            locks: DashMap::new(),
        }
    }

    /// Returns the stored chunk, generating and storing it on first request.
    pub async fn get_or_create(&self, coord: ChunkCoord) -> DbResult<Chunk> {
        let lock = self.locks.entry(coord).or_default().clone();
        let result = {
            let _guard = lock.lock().await;
            self.load_or_generate(coord).await
        };

        // the map and `lock` are the only holders when nobody else is waiting
        self.locks
            .remove_if(&coord, |_, held| Arc::ptr_eq(held, &lock) && Arc::strong_count(held) == 2);
        result
    }

    async fn load_or_generate(&self, coord: ChunkCoord) -> DbResult<Chunk> {
        if let Some(chunk) = self.repo.load(coord).await? {
            tracing::trace!(%coord, "chunk served from store");
            return Ok(chunk);
        }

        let chunk = {
            let mut rng = rand::rng();
            Chunk::generate(coord, &mut rng)
        };
        self.repo.save(&chunk).await?;
        tracing::info!(%coord, "generated new chunk");

        Ok(chunk)
    }
}
