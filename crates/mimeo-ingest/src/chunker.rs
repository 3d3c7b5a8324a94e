//! Splitting committed text into embeddable chunks.
//!
//! Text is cut on paragraph boundaries first, then sentences, then raw
//! character windows for runs with no natural break. Consecutive chunks
//! share a short overlapping tail.

use mimeo_core::{Chunk, ItemId};

/// Chunk sizing, in characters.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// A chunk is not closed until it holds at least this many characters.
    pub min_chunk_size: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2048,
            chunk_overlap: 200,
            min_chunk_size: 100,
        }
    }
}

impl ChunkConfig {
    /// Token-based settings, at roughly four characters per token.
    pub fn from_processing_config(config: &mimeo_config::ProcessingConfig) -> Self {
        let chunk_size = (config.chunk_size * 4).max(1);
        Self {
            chunk_size,
            chunk_overlap: (config.chunk_overlap * 4).min(chunk_size / 2),
            min_chunk_size: 100.min(chunk_size),
        }
    }
}

pub struct Chunker {
    config: ChunkConfig,
}

impl Chunker {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    pub fn chunk_text(&self, item_id: &ItemId, text: &str) -> Vec<Chunk> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }

        let size = self.config.chunk_size;
        if char_len(trimmed) <= size {
            return vec![Chunk::new(item_id.clone(), 0, trimmed)];
        }

        let mut builder = ChunkBuilder::new(item_id, &self.config);
        for para in trimmed.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
            if char_len(para) <= size {
                builder.push(para, "\n\n");
                continue;
            }
            for sentence in split_sentences(para) {
                if char_len(sentence) <= size {
                    builder.push(sentence, " ");
                } else {
                    for window in split_by_chars(sentence, size) {
                        builder.push(&window, " ");
                    }
                }
            }
        }
        builder.finish()
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(ChunkConfig::default())
    }
}

struct ChunkBuilder<'a> {
    item_id: &'a ItemId,
    config: &'a ChunkConfig,
    current: String,
    /// Pieces were added since the last close.
    fresh: bool,
    chunks: Vec<Chunk>,
}

impl<'a> ChunkBuilder<'a> {
    fn new(item_id: &'a ItemId, config: &'a ChunkConfig) -> Self {
        Self {
            item_id,
            config,
            current: String::new(),
            fresh: false,
            chunks: Vec::new(),
        }
    }

    fn push(&mut self, piece: &str, separator: &str) {
        let current_len = char_len(&self.current);
        let would_be = current_len + char_len(separator) + char_len(piece);
        if current_len >= self.config.min_chunk_size && would_be > self.config.chunk_size {
            self.close();
        }
        if !self.current.is_empty() {
            self.current.push_str(separator);
        }
        self.current.push_str(piece);
        self.fresh = true;
    }

    fn close(&mut self) {
        let text = self.current.trim();
        if text.is_empty() {
            return;
        }
        let index = self.chunks.len() as i32;
        self.chunks.push(Chunk::new(self.item_id.clone(), index, text));

        let chars: Vec<char> = self.current.chars().collect();
        let skip = chars.len().saturating_sub(self.config.chunk_overlap);
        self.current = chars[skip..].iter().collect::<String>().trim_start().to_string();
        self.fresh = false;
    }

    fn finish(mut self) -> Vec<Chunk> {
        let text = self.current.trim();
        // A bare overlap tail is not new content
        if self.fresh && !text.is_empty() {
            let index = self.chunks.len() as i32;
            self.chunks.push(Chunk::new(self.item_id.clone(), index, text));
        }
        self.chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split on `.`, `!` or `?` followed by whitespace or end of text.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let end = i + c.len_utf8();
        let at_boundary = match chars.peek() {
            Some((_, next)) => next.is_whitespace(),
            None => true,
        };
        if at_boundary {
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

/// Consecutive windows of at most `size` characters.
fn split_by_chars(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|window| window.iter().collect())
        .collect()
}
