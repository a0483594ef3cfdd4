//! Chunks: the unit of embedding

use serde::{Deserialize, Serialize};

use crate::{ChunkId, chunk_id};

/// A contiguous run of lines from one version of one file.
///
/// Chunks are never updated in place. The next sync of the same file
/// produces a fresh set that supersedes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Project tag the file belongs to
    pub project: String,
    /// Path relative to the watch root, `/`-separated
    pub file: String,
    /// 1-based line number of the chunk's first line
    pub start_line: usize,
    /// Trimmed content, never empty
    pub text: String,
}

impl Chunk {
    pub fn id(&self) -> ChunkId {
        chunk_id(&self.file, self.start_line)
    }

    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            project: self.project.clone(),
            file: self.file.clone(),
            line: self.start_line,
        }
    }
}

/// Payload stored alongside every index entry and sent over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default = "default_project")]
    pub project: String,
    pub file: String,
    pub line: usize,
}

impl ChunkMetadata {
    pub fn id(&self) -> ChunkId {
        chunk_id(&self.file, self.line)
    }
}

pub fn default_project() -> String {
    "default".to_string()
}
