//! Fixed-size line chunking

use std::borrow::Cow;
use std::num::NonZeroUsize;

use crate::Chunk;

/// Default number of lines per chunk.
pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = match NonZeroUsize::new(20) {
    Some(size) => size,
    None => unreachable!(),
};

/// A chunk before it is tagged with its project and file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineChunk {
    pub start_line: usize,
    pub text: String,
}

/// Split `content` into consecutive groups of `chunk_size` lines.
///
/// The last group may be shorter. Each group's text is trimmed and groups
/// that are empty after trimming are dropped; `start_line` always refers to
/// the original 1-based line number, so dropping a group does not shift the
/// ones after it. `\r\n` and a lone `\r` both end a line and are stored
/// as `\n`.
pub fn chunk_lines(content: &str, chunk_size: NonZeroUsize) -> Vec<LineChunk> {
    let size = chunk_size.get();
    let content = normalize_newlines(content);
    let lines: Vec<&str> = content.split_inclusive('\n').collect();

    lines
        .chunks(size)
        .enumerate()
        .filter_map(|(group, group_lines)| {
            let text = group_lines.concat();
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            Some(LineChunk { start_line: group * size + 1, text: text.to_string() })
        })
        .collect()
}

fn normalize_newlines(content: &str) -> Cow<'_, str> {
    if content.contains('\r') {
        Cow::Owned(content.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(content)
    }
}

/// Chunk a file's content and tag every chunk with its project and path.
pub fn chunk_file(project: &str, file: &str, content: &str, chunk_size: NonZeroUsize) -> Vec<Chunk> {
    chunk_lines(content, chunk_size)
        .into_iter()
        .map(|chunk| Chunk {
            project: project.to_string(),
            file: file.to_string(),
            start_line: chunk.start_line,
            text: chunk.text,
        })
        .collect()
}
