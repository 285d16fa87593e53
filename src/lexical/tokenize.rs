//! Script-aware tokenization for the lexical index.
//!
//! Text is NFKC-normalized and lowercased. Runs of CJK characters (which carry no
//! whitespace) are split into overlapping character bigrams; other alphanumeric runs
//! become word tokens, minus a small English stop-word list.

use unicode_normalization::UnicodeNormalization;

/// Sorted for `binary_search`.
const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "also", "an", "and", "are", "as", "at", "be", "been", "but", "by", "can", "could",
    "did", "do", "does", "for", "from", "had", "has", "have", "he", "if", "in", "is", "it",
    "its", "may", "might", "must", "no", "not", "of", "on", "or", "our", "out", "should", "so",
    "than", "that", "the", "their", "then", "there", "they", "this", "to", "too", "up", "very",
    "was", "we", "were", "what", "when", "where", "which", "who", "will", "with", "would",
    "you", "your",
];

/// NFKC + lowercase. Full-width Latin and half-width katakana fold to their canonical forms.
pub fn normalize(text: &str) -> String {
    text.nfkc().collect::<String>().to_lowercase()
}

/// Han, kana, Hangul and the CJK symbol blocks that appear inside Japanese words.
pub fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3040..=0x309F   // hiragana
        | 0x30A0..=0x30FF // katakana
        | 0x31F0..=0x31FF // katakana phonetic extensions
        | 0x3400..=0x4DBF // CJK extension A
        | 0x4E00..=0x9FFF // CJK unified ideographs
        | 0xF900..=0xFAFF // compatibility ideographs
        | 0xAC00..=0xD7AF // hangul syllables
        | 0x20000..=0x2A6DF
    ) || c == '々'
        || c == 'ー'
}

fn is_stop_word(word: &str) -> bool {
    ENGLISH_STOP_WORDS.binary_search(&word).is_ok()
}

fn push_cjk_run(run: &[char], tokens: &mut Vec<String>) {
    match run.len() {
        0 => {}
        1 => tokens.push(run[0].to_string()),
        _ => tokens.extend(run.windows(2).map(|pair| pair.iter().collect())),
    }
}

fn push_word(word: &str, tokens: &mut Vec<String>) {
    if !word.is_empty() && !is_stop_word(word) {
        tokens.push(word.to_string());
    }
}

/// Splits `text` into index terms.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = normalize(text);
    let mut tokens = Vec::new();
    let mut cjk_run: Vec<char> = Vec::new();
    let mut word = String::new();

    for c in normalized.chars() {
        if is_cjk(c) {
            push_word(&word, &mut tokens);
            word.clear();
            cjk_run.push(c);
        } else if c.is_alphanumeric() {
            push_cjk_run(&cjk_run, &mut tokens);
            cjk_run.clear();
            word.push(c);
        } else {
            push_word(&word, &mut tokens);
            word.clear();
            push_cjk_run(&cjk_run, &mut tokens);
            cjk_run.clear();
        }
    }
    push_word(&word, &mut tokens);
    push_cjk_run(&cjk_run, &mut tokens);

    tokens
}
