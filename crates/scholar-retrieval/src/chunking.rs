//! Fixed-size overlapping chunking of ingested text.

use scholar_core::{Chunk, Error, Result};

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 800;
/// Default characters of context shared between consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Splits `text` into consecutive windows of `size` characters, advancing the
/// window start by `size - overlap` each step so consecutive chunks share
/// exactly `overlap` characters of context.
///
/// The final chunk may be shorter than `size` (it is never padded) and is kept
/// even when shorter than `overlap`. Text shorter than `size` yields exactly
/// one chunk; empty text yields no chunks. Offsets and lengths are counted in
/// characters so they stay valid for any UTF-8 input.
///
/// Pure function of its inputs: identical text and parameters always produce
/// identical chunk boundaries.
///
/// # Errors
/// Returns `InvalidParameter` when `size` is zero or `overlap >= size`.
pub fn chunk_text(text: &str, source_id: &str, size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    if size == 0 {
        return Err(Error::InvalidParameter(
            "chunk size must be positive".to_owned(),
        ));
    }
    if overlap >= size {
        return Err(Error::InvalidParameter(format!(
            "chunk overlap ({overlap}) must be smaller than chunk size ({size})"
        )));
    }
    if text.is_empty() {
        return Ok(Vec::new());
    }

    // Character index -> byte offset table, so windows never split a code point.
    let byte_offsets: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
    let total_chars = byte_offsets.len();
    let step = size - overlap;

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = usize::min(start + size, total_chars);
        let byte_start = byte_offsets[start];
        let byte_end = if end == total_chars {
            text.len()
        } else {
            byte_offsets[end]
        };

        chunks.push(Chunk::new(&text[byte_start..byte_end], source_id, start));

        if end == total_chars {
            break;
        }
        start += step;
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Strip the leading `overlap` characters from every chunk after the first
    /// and concatenate; the result must equal the original text.
    fn reconstruct(chunks: &[Chunk], overlap: usize) -> String {
        let mut text = String::new();
        for (position, chunk) in chunks.iter().enumerate() {
            if position == 0 {
                text.push_str(&chunk.text);
            } else {
                text.extend(chunk.text.chars().skip(overlap));
            }
        }
        text
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(matches!(
            chunk_text("abc", "doc", 0, 0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            chunk_text("abc", "doc", 10, 10),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            chunk_text("abc", "doc", 10, 11),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn empty_text_produces_no_chunks() {
        let chunks = chunk_text("", "doc", 20, 5);
        assert!(chunks.is_ok());
        if let Ok(chunks) = chunks {
            assert!(chunks.is_empty());
        }
    }

    #[test]
    fn short_text_produces_single_full_chunk() {
        let chunks = match chunk_text("tiny", "doc", 20, 5) {
            Ok(chunks) => chunks,
            Err(error) => panic!("chunking failed: {error}"),
        };
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "tiny");
        assert_eq!(chunks[0].offset, 0);
        assert_eq!(chunks[0].length, 4);
    }

    #[test]
    fn windows_share_exact_overlap() {
        let text = "The mitochondria is the powerhouse of the cell.";
        let chunks = match chunk_text(text, "bio", 20, 5) {
            Ok(chunks) => chunks,
            Err(error) => panic!("chunking failed: {error}"),
        };

        assert_eq!(chunks.len(), 3);
        assert_eq!(
            chunks.iter().map(|chunk| chunk.offset).collect::<Vec<_>>(),
            vec![0, 15, 30]
        );
        assert_eq!(
            chunks.iter().map(|chunk| chunk.length).collect::<Vec<_>>(),
            vec![20, 20, 17]
        );

        // Consecutive chunks share exactly 5 characters.
        for pair in chunks.windows(2) {
            let tail: String = pair[0].text.chars().skip(15).collect();
            let head: String = pair[1].text.chars().take(5).collect();
            assert_eq!(tail, head);
        }

        assert_eq!(reconstruct(&chunks, 5), text);
    }

    #[test]
    fn chunk_count_matches_closed_form() {
        // For L > size, count = ceil((L - overlap) / (size - overlap)).
        for (length, size, overlap) in [(47, 20, 5), (100, 30, 10), (31, 30, 10), (61, 30, 0)] {
            let text: String = "x".repeat(length);
            let chunks = match chunk_text(&text, "doc", size, overlap) {
                Ok(chunks) => chunks,
                Err(error) => panic!("chunking failed: {error}"),
            };
            let expected = (length - overlap).div_ceil(size - overlap);
            assert_eq!(
                chunks.len(),
                expected,
                "L={length} size={size} overlap={overlap}"
            );
            assert_eq!(reconstruct(&chunks, overlap), text);
        }
    }

    #[test]
    fn final_chunk_kept_even_below_overlap() {
        // 12 chars, size 10, overlap 4, step 6: windows at 0 and 6.
        let chunks = match chunk_text("abcdefghijkl", "doc", 10, 4) {
            Ok(chunks) => chunks,
            Err(error) => panic!("chunking failed: {error}"),
        };
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].text, "ghijkl");

        // 11 chars, size 10, overlap 8, step 2: the last window holds 3 chars,
        // below the overlap, and is still included.
        let chunks = match chunk_text("abcdefghijk", "doc", 10, 8) {
            Ok(chunks) => chunks,
            Err(error) => panic!("chunking failed: {error}"),
        };
        let last = &chunks[chunks.len() - 1];
        assert!(last.length < 8);
        assert_eq!(reconstruct(&chunks, 8), "abcdefghijk");
    }

    #[test]
    fn chunking_is_idempotent() {
        let text = "Photosynthesis converts light energy into chemical energy.";
        let first = match chunk_text(text, "doc", 16, 4) {
            Ok(chunks) => chunks,
            Err(error) => panic!("chunking failed: {error}"),
        };
        let second = match chunk_text(text, "doc", 16, 4) {
            Ok(chunks) => chunks,
            Err(error) => panic!("chunking failed: {error}"),
        };

        assert_eq!(first.len(), second.len());
        for (left, right) in first.iter().zip(second.iter()) {
            assert_eq!(left.text, right.text);
            assert_eq!(left.offset, right.offset);
            assert_eq!(left.length, right.length);
        }
    }

    #[test]
    fn multibyte_text_respects_char_boundaries() {
        let text = "αβγδεζηθικλμνξοπρστυ";
        let chunks = match chunk_text(text, "doc", 8, 2) {
            Ok(chunks) => chunks,
            Err(error) => panic!("chunking failed: {error}"),
        };
        assert_eq!(reconstruct(&chunks, 2), text);
        for chunk in &chunks {
            assert!(chunk.length <= 8);
        }
    }
}
