//! Toy tokenizer used by the reward-model pages.
//!
//! Stands in for a BPE tokenizer so the demos are self-contained: text is
//! split on whitespace, and each punctuation mark in [`PUNCTUATION`] becomes
//! its own token. Ids come from a 32-bit FNV-1a hash folded below 50 000, so
//! the same word always maps to the same id.

use hashbrown::HashMap;

/// End-of-text id used as the padding sentinel (GPT-2 convention).
pub const EOT_ID: u32 = 50256;

/// Toy ids are folded into `0..TOY_VOCAB_SIZE`.
pub const TOY_VOCAB_SIZE: u32 = 50_000;

pub const PUNCTUATION: &[char] = &[',', '.', '!', '?', ';', ':', '(', ')', '[', ']', '-', '"', '\''];

/// 32-bit FNV-1a over UTF-16 code units.
pub fn fnv1a32(s: &str) -> u32 {
    let mut h: u32 = 2_166_136_261;
    for unit in s.encode_utf16() {
        h ^= u32::from(unit);
        h = h.wrapping_mul(16_777_619);
    }
    h
}

pub fn toy_token_id(token: &str) -> u32 {
    fnv1a32(token) % TOY_VOCAB_SIZE
}

/// Split text into toy tokens. Whitespace never survives as a token.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut word = String::new();

    for ch in text.chars() {
        if ch.is_whitespace() {
            flush(&mut word, &mut out);
        } else if PUNCTUATION.contains(&ch) {
            flush(&mut word, &mut out);
            out.push(ch.to_string());
        } else {
            word.push(ch);
        }
    }
    flush(&mut word, &mut out);
    out
}

fn flush(word: &mut String, out: &mut Vec<String>) {
    if !word.is_empty() {
        out.push(std::mem::take(word));
    }
}

/// Tokenize and map every token to its toy id.
pub fn encode(text: &str) -> Vec<u32> {
    tokenize(text).iter().map(|t| toy_token_id(t)).collect()
}

/// Distinct tokens in first-seen order, with occurrence counts.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    index: HashMap<String, usize>,
    entries: Vec<VocabEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VocabEntry {
    pub token: String,
    pub id: u32,
    pub count: u32,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_texts<'a>(texts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut vocab = Self::new();
        for text in texts {
            for tok in tokenize(text) {
                vocab.insert(&tok);
            }
        }
        vocab
    }

    /// Record one occurrence of `token` and return its toy id.
    pub fn insert(&mut self, token: &str) -> u32 {
        if let Some(&i) = self.index.get(token) {
            self.entries[i].count += 1;
            return self.entries[i].id;
        }
        let id = toy_token_id(token);
        self.index.insert(token.to_string(), self.entries.len());
        self.entries.push(VocabEntry {
            token: token.to_string(),
            id,
            count: 1,
        });
        id
    }

    pub fn id_of(&self, token: &str) -> Option<u32> {
        self.index.get(token).map(|&i| self.entries[i].id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[VocabEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_matches_reference_values() {
        assert_eq!(fnv1a32(""), 2_166_136_261);
        assert_eq!(fnv1a32("a"), 0xE40C292C);
    }

    #[test]
    fn punctuation_splits_into_own_tokens() {
        let toks = tokenize("Pune is somewhere; I don't know.");
        assert_eq!(
            toks,
            vec!["Pune", "is", "somewhere", ";", "I", "don", "'", "t", "know", "."]
        );
    }

    #[test]
    fn newlines_and_runs_of_spaces_are_dropped() {
        assert_eq!(tokenize("a\n\n  b\t c"), vec!["a", "b", "c"]);
        assert!(tokenize("   ").is_empty());
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn ids_are_stable_and_below_vocab_size() {
        let a = encode("Pune is in India.");
        let b = encode("Pune is in India.");
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
        assert!(a.iter().all(|&id| id < TOY_VOCAB_SIZE));
        assert_eq!(a[0], toy_token_id("Pune"));
    }

    #[test]
    fn vocabulary_counts_repeats_in_first_seen_order() {
        let v = Vocabulary::from_texts(["Pune is big.", "Pune is old."]);
        let tokens: Vec<&str> = v.entries().iter().map(|e| e.token.as_str()).collect();
        assert_eq!(tokens, vec!["Pune", "is", "big", ".", "old"]);
        assert_eq!(v.entries()[0].count, 2);
        assert_eq!(v.id_of("old"), Some(toy_token_id("old")));
        assert_eq!(v.id_of("missing"), None);
    }
}
