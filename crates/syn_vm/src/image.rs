//! Program image parsing: comma-separated decimal text or raw little-endian words.

use crate::error::ImageError;
use crate::word::{Word, MAX_IMAGE_WORDS};

/// Parses `"9,32768,32769,4"`-style text. Whitespace around tokens is ignored
/// and blank text is an empty image.
pub fn parse_text(text: &str) -> Result<Vec<Word>, ImageError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let words = text
        .split(',')
        .enumerate()
        .map(|(index, token)| {
            token.trim().parse::<Word>().map_err(|_| ImageError::InvalidWord {
                index,
                token: token.trim().to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    check_size(words)
}

/// Parses a raw image of little-endian 16-bit words.
pub fn parse_bytes(bytes: &[u8]) -> Result<Vec<Word>, ImageError> {
    if bytes.len() % 2 != 0 {
        return Err(ImageError::OddLength(bytes.len()));
    }
    let words = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    check_size(words)
}

/// Encodes an image back to its raw byte form.
pub fn to_bytes(words: &[Word]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

pub(crate) fn check_size(words: Vec<Word>) -> Result<Vec<Word>, ImageError> {
    if words.len() > MAX_IMAGE_WORDS {
        return Err(ImageError::TooLarge {
            words: words.len(),
            max: MAX_IMAGE_WORDS,
        });
    }
    Ok(words)
}
