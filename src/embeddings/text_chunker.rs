// Overlapping text windows for embedding

/// Splits long text into overlapping windows, preferring to end each window
/// on a sentence or line boundary. Lengths are counted in characters.
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Split `text`; text that fits in one window comes back as a single chunk.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < len {
            let mut end = (start + self.chunk_size).min(len);

            if end < len {
                let boundary = chars[start..end].iter().rposition(|c| *c == '.' || *c == '\n');
                if let Some(bp) = boundary {
                    if bp as f64 > self.chunk_size as f64 * 0.5 {
                        end = start + bp + 1;
                    }
                }
            }

            let chunk: String = chars[start..end].iter().collect();
            let chunk = chunk.trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }

            if end >= len {
                break;
            }
            // Always move forward, even if the overlap would swallow the window
            let next = end.saturating_sub(self.overlap);
            start = if next > start { next } else { end };
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        let chunker = TextChunker::new(1000, 200);
        assert_eq!(chunker.split("  short text  "), vec!["short text".to_string()]);
        assert!(chunker.split("").is_empty());
    }

    #[test]
    fn test_hard_cut_with_overlap() {
        let chunker = TextChunker::new(1000, 200);
        let text = "a".repeat(2500);
        let chunks = chunker.split(&text);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 1000);
        assert_eq!(chunks[1].len(), 1000);
        assert_eq!(chunks[2].len(), 900);
    }

    #[test]
    fn test_breaks_on_sentence_in_back_half() {
        let chunker = TextChunker::new(100, 10);
        let text = format!("{}.{}", "x".repeat(79), "y".repeat(150));
        let chunks = chunker.split(&text);
        assert!(chunks[0].ends_with('.'));
        assert_eq!(chunks[0].chars().count(), 80);
        // Next window starts `overlap` chars before the break
        assert!(chunks[1].starts_with(&"x".repeat(9)));
    }

    #[test]
    fn test_ignores_boundary_in_front_half() {
        let chunker = TextChunker::new(100, 10);
        let text = format!("{}.{}", "x".repeat(20), "y".repeat(200));
        let chunks = chunker.split(&text);
        assert_eq!(chunks[0].chars().count(), 100);
    }

    #[test]
    fn test_multibyte_text() {
        let chunker = TextChunker::new(10, 2);
        let text = "é".repeat(25);
        let chunks = chunker.split(&text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_large_overlap_still_progresses() {
        let chunker = TextChunker::new(10, 50);
        let chunks = chunker.split(&"z".repeat(40));
        assert!(chunks.len() < 40);
    }
}
