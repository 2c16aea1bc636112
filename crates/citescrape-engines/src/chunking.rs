//! Splitting document text into retrievable chunks

use crate::config::ChunkStrategy;

/// Cuts text into chunks of at most `chunk_size` characters
///
/// Every chunk after the first starts with the last `overlap` characters of
/// the one before it, so a passage cut at a boundary is still found whole in
/// one of the two.
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    strategy: ChunkStrategy,
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    /// Create a chunker; `overlap` is clamped below `chunk_size`
    pub fn new(strategy: ChunkStrategy, chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            strategy,
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    /// Chunk `text`; blank text yields no chunks
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        if char_len(text) <= self.chunk_size {
            return vec![text.to_string()];
        }

        let pieces: Vec<String> = match self.strategy {
            ChunkStrategy::ByParagraph => text.split("\n\n").map(str::to_string).collect(),
            ChunkStrategy::BySection => split_sections(text),
            ChunkStrategy::ByTokenCount => split_sentences(text),
        };
        let separator = match self.strategy {
            ChunkStrategy::ByTokenCount => " ",
            _ => "\n\n",
        };

        let chunks = self.pack(&pieces, separator);
        self.with_overlap(chunks)
    }

    // Greedily join pieces up to the budget left after the overlap prefix
    fn pack(&self, pieces: &[String], separator: &str) -> Vec<String> {
        let budget = self.chunk_size - self.overlap;
        let mut chunks = Vec::new();
        let mut current = String::new();

        for piece in pieces.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
            let joined = char_len(&current) + char_len(separator) + char_len(piece);
            if !current.is_empty() && joined > budget {
                chunks.push(std::mem::take(&mut current));
            }

            if char_len(piece) > budget {
                if !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                }
                chunks.extend(split_chars(piece, budget));
                continue;
            }

            if !current.is_empty() {
                current.push_str(separator);
            }
            current.push_str(piece);
        }

        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }

    fn with_overlap(&self, chunks: Vec<String>) -> Vec<String> {
        if self.overlap == 0 {
            return chunks;
        }

        let mut result = Vec::with_capacity(chunks.len());
        let mut previous: Option<String> = None;
        for chunk in chunks {
            let next = match &previous {
                Some(prev) => format!("{}{}", tail_chars(prev, self.overlap), chunk),
                None => chunk.clone(),
            };
            previous = Some(chunk);
            result.push(next);
        }
        result
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn tail_chars(text: &str, n: usize) -> &str {
    let len = char_len(text);
    if len <= n {
        return text;
    }
    match text.char_indices().nth(len - n) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

fn split_chars(text: &str, limit: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(limit.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

fn is_section_heading(line: &str) -> bool {
    let line = line.trim_start();
    if line.starts_with('#') {
        return true;
    }
    // "1. Scope", "2.3 Limits"
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && line[digits..].starts_with('.')
}

fn split_sections(text: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if is_section_heading(line) && !current.trim().is_empty() {
            sections.push(std::mem::take(&mut current));
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.trim().is_empty() {
        sections.push(current);
    }
    sections
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            sentences.push(std::mem::take(&mut current));
        }
    }
    if !current.trim().is_empty() {
        sentences.push(current);
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunker = TextChunker::new(ChunkStrategy::ByParagraph, 100, 20);
        assert_eq!(chunker.chunk("  Short text here. "), vec!["Short text here."]);
    }

    #[test]
    fn test_blank_text_has_no_chunks() {
        let chunker = TextChunker::new(ChunkStrategy::ByParagraph, 100, 20);
        assert!(chunker.chunk(" \n\n ").is_empty());
    }

    #[test]
    fn test_paragraphs_respect_size() {
        let chunker = TextChunker::new(ChunkStrategy::ByParagraph, 50, 0);
        let text = "First paragraph here.\n\nSecond paragraph here.\n\nThird paragraph here.";
        let chunks = chunker.chunk(text);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "First paragraph here.\n\nSecond paragraph here.");
        assert!(chunks.iter().all(|c| c.chars().count() <= 50));
    }

    #[test]
    fn test_overlap_repeats_previous_tail() {
        let chunker = TextChunker::new(ChunkStrategy::ByParagraph, 30, 5);
        let text = "aaaaaaaaaaaaaaaaaaaa\n\nbbbbbbbbbbbbbbbbbbbb";
        let chunks = chunker.chunk(text);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1], "aaaaabbbbbbbbbbbbbbbbbbbb");
        assert!(chunks.iter().all(|c| c.chars().count() <= 30));
    }

    #[test]
    fn test_sections_split_before_headings() {
        let chunker = TextChunker::new(ChunkStrategy::BySection, 30, 0);
        let text = "# Section 1\nContent one\n# Section 2\nContent two";
        let chunks = chunker.chunk(text);

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with("# Section 1"));
        assert!(chunks[1].starts_with("# Section 2"));
    }

    #[test]
    fn test_numbered_headings() {
        assert!(is_section_heading("1. Scope"));
        assert!(is_section_heading("  12.3 Limits"));
        assert!(!is_section_heading("2024 was a good year"));
    }

    #[test]
    fn test_sentences() {
        let chunker = TextChunker::new(ChunkStrategy::ByTokenCount, 25, 0);
        let text = "First sentence here. Second sentence here. Third one.";
        let chunks = chunker.chunk(text);

        assert_eq!(chunks, vec!["First sentence here.", "Second sentence here.", "Third one."]);
    }

    #[test]
    fn test_long_piece_is_split_on_char_boundaries() {
        let chunker = TextChunker::new(ChunkStrategy::ByParagraph, 10, 0);
        let text = "é".repeat(25);
        let chunks = chunker.chunk(&text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].chars().count(), 5);
    }
}
