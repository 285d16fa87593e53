use blake3::Hasher;

use crate::constants::FINGERPRINT_PREFIX_CHARS;

/// Hashes a question for the query-embedding cache.
#[inline]
pub fn hash_question(question: &str) -> [u8; 32] {
    *blake3::hash(question.as_bytes()).as_bytes()
}

/// Derives the result-cache key for `(question, partition, k)`.
///
/// A missing partition and an empty partition name hash differently.
#[inline]
pub fn hash_query_key(question: &str, partition: Option<&str>, k: usize) -> [u8; 32] {
    let mut hasher = Hasher::new();
    hasher.update(question.as_bytes());
    hasher.update(b"|");
    match partition {
        Some(p) => {
            hasher.update(b"p:");
            hasher.update(p.as_bytes());
        }
        None => {
            hasher.update(b"-");
        }
    }
    hasher.update(b"|");
    hasher.update(&(k as u64).to_le_bytes());
    *hasher.finalize().as_bytes()
}

/// Rehashes `key` under an index generation so keys from different index versions never
/// match.
#[inline]
pub fn scope_key(key: &[u8; 32], generation: u64) -> [u8; 32] {
    let mut hasher = Hasher::new();
    hasher.update(key);
    hasher.update(b"|g:");
    hasher.update(&generation.to_le_bytes());
    *hasher.finalize().as_bytes()
}

/// Computes a 64-bit hash of the input data using BLAKE3, truncated from 256 bits.
///
/// Used for Qdrant point ids, where the full passage id is carried in the payload so a
/// collision never returns the wrong passage.
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(bytes)
}

/// Fingerprints a corpus from the leading characters of each passage plus the count.
///
/// Returns lowercase hex.
pub fn fingerprint_contents<'a, I>(contents: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hasher = Hasher::new();
    let mut count: u64 = 0;
    for content in contents {
        let prefix_end = content
            .char_indices()
            .nth(FINGERPRINT_PREFIX_CHARS)
            .map(|(idx, _)| idx)
            .unwrap_or(content.len());
        hasher.update(content[..prefix_end].as_bytes());
        hasher.update(&[0x1f]);
        count += 1;
    }
    hasher.update(b"#");
    hasher.update(&count.to_le_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Digest over the full content of every passage, in order.
pub fn digest_contents<'a, I>(contents: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hasher = Hasher::new();
    for content in contents {
        hasher.update(&(content.len() as u64).to_le_bytes());
        hasher.update(content.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
