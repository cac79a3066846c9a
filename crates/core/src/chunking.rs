use crate::error::IngestError;

/// Character budgets for chunk construction. Overlap is sentence-granular:
/// the budget caps how many whole trailing sentences of one chunk reappear
/// at the start of the next.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: 800,
            overlap_chars: 100,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.max_chars == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "max_chars must be nonzero".to_string(),
            ));
        }
        if self.overlap_chars >= self.max_chars {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap_chars {} must be smaller than max_chars {}",
                self.overlap_chars, self.max_chars
            )));
        }
        Ok(())
    }
}

/// Groups sentences into chunks of at most `max_chars` characters, joined by
/// single spaces. A chunk is never split mid-sentence, so one sentence longer
/// than the budget becomes its own oversized chunk. Each chunk after the
/// first starts with the trailing sentences of its predecessor, as many as
/// fit the overlap budget.
pub fn chunk_sentences(sentences: &[&str], config: &ChunkingConfig) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < sentences.len() {
        let mut end = start;
        let mut size = 0usize;
        while end < sentences.len() {
            let cost = sentences[end].len() + usize::from(end > start);
            if end > start && size + cost > config.max_chars {
                break;
            }
            size += cost;
            end += 1;
        }

        chunks.push(sentences[start..end].join(" "));

        if end == sentences.len() {
            break;
        }

        start = (end - overlap_count(&sentences[start..end], config.overlap_chars)).max(start + 1);
    }

    chunks
}

/// How many whole trailing sentences fit the overlap budget, walking
/// backward from the end of a chunk.
fn overlap_count(chunk: &[&str], budget: usize) -> usize {
    let mut used = 0usize;
    let mut count = 0usize;
    for sentence in chunk.iter().rev() {
        let cost = sentence.len() + 1;
        if used + cost > budget {
            break;
        }
        used += cost;
        count += 1;
    }
    count
}
