use crate::db::DbResult;
use crate::db::error::DbError;
use crate::db::repo::ChunkRepo;
use crate::models::chunk::{Chunk, ChunkCoord};
use std::path::PathBuf;

/// One text file per chunk, `{cx}_{cy}.txt`, holding ten planet rows.
pub struct ChunkFileRepository {
    dir: PathBuf,
}

impl ChunkFileRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, coord: ChunkCoord) -> PathBuf {
        self.dir.join(format!("{}_{}.txt", coord.cx, coord.cy))
    }
}

#[async_trait::async_trait]
impl ChunkRepo for ChunkFileRepository {
    async fn load(&self, coord: ChunkCoord) -> DbResult<Option<Chunk>> {
        let path = self.path_for(coord);
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(DbError::io(path)(e)),
        };

        match Chunk::from_record(coord, &data) {
            Ok(chunk) => Ok(Some(chunk)),
            Err(source) => Err(DbError::Corrupt { path, source }),
        }
    }

    async fn save(&self, chunk: &Chunk) -> DbResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(DbError::io(&self.dir))?;

        // readers must never observe a half written chunk
        let path = self.path_for(chunk.coord);
        let tmp = path.with_extension("txt.tmp");
        tokio::fs::write(&tmp, chunk.to_record())
            .await
            .map_err(DbError::io(&tmp))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(DbError::io(&path))?;

        tracing::debug!(coord = %chunk.coord, path = %path.display(), "chunk stored");
        Ok(())
    }
}
