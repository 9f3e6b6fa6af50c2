//! String↔[`WordId`] interner feeding the core's `word_of`/`id_of`
//! callback contract, grounded in `vibecheck-ml/src/markov.rs`'s
//! `Vocabulary` (bidirectional `HashMap`/`Vec` pair, `unk_id` reserved at
//! construction) but pre-seeded with the reserved token-kinds arpa-core
//! expects at fixed ids 0..22.

use std::collections::HashMap;

use arpa_core::wordid::{
    CaseMask, WordId, WordSource, CASE_LOWER, CASE_MIXED, CASE_UPPER_ALL, CASE_UPPER_FIRST,
    ID_ABBR, ID_ANUM, ID_APROX, ID_CURRENCY, ID_DATE, ID_DIMEN, ID_END, ID_FRACT, ID_GREEK,
    ID_ISOLAT, ID_MATH, ID_NUM, ID_PCARDS, ID_PUNCT, ID_RANGE, ID_ROUTE, ID_SCORE, ID_SPECL,
    ID_START, ID_TIME, ID_UNK, ID_URL,
};

const RESERVED: &[(WordId, &str)] = &[
    (ID_START, "<s>"),
    (ID_END, "</s>"),
    (ID_UNK, "<unk>"),
    (ID_NUM, "<num>"),
    (ID_URL, "<url>"),
    (ID_DATE, "<date>"),
    (ID_TIME, "<time>"),
    (ID_ABBR, "<abbr>"),
    (ID_MATH, "<math>"),
    (ID_SPECL, "<specl>"),
    (ID_RANGE, "<range>"),
    (ID_PUNCT, "<punct>"),
    (ID_GREEK, "<greek>"),
    (ID_ROUTE, "<route>"),
    (ID_APROX, "<aprox>"),
    (ID_SCORE, "<score>"),
    (ID_DIMEN, "<dimen>"),
    (ID_FRACT, "<fract>"),
    (ID_ISOLAT, "<isolat>"),
    (ID_PCARDS, "<pcards>"),
    (ID_CURRENCY, "<currency>"),
    (ID_ANUM, "<anum>"),
];

/// Bidirectional mapping between surface words (stored lower-cased) and
/// [`WordId`]s, with the 22 reserved token-kinds pre-interned at their
/// canonical ids.
pub struct Vocabulary {
    word_to_id: HashMap<String, WordId>,
    id_to_word: Vec<String>,
}

impl Vocabulary {
    pub fn new() -> Self {
        let mut id_to_word = vec![String::new(); RESERVED.len()];
        let mut word_to_id = HashMap::new();
        for &(id, word) in RESERVED {
            id_to_word[id as usize] = word.to_string();
            word_to_id.insert(word.to_string(), id);
        }
        Vocabulary { word_to_id, id_to_word }
    }

    /// Interns `word`, assigning a fresh id if it has not been seen before.
    /// Storage is always lower-case; callers recover the observed surface
    /// case through [`case_of`](Self::case_of).
    pub fn intern(&mut self, word: &str) -> WordId {
        let lower = word.to_lowercase();
        if let Some(&id) = self.word_to_id.get(&lower) {
            return id;
        }
        let id = self.id_to_word.len() as WordId;
        self.id_to_word.push(lower.clone());
        self.word_to_id.insert(lower, id);
        id
    }

    /// Determines the [`CaseMask`] of `word` as observed in running text.
    pub fn case_of(word: &str) -> CaseMask {
        let mut chars = word.chars();
        let first_upper = chars.next().map(|c| c.is_uppercase()).unwrap_or(false);
        let rest_upper = chars.clone().all(|c| !c.is_lowercase());
        let rest_has_upper = chars.any(|c| c.is_uppercase());
        if !first_upper && !rest_has_upper {
            CASE_LOWER
        } else if first_upper && rest_upper {
            CASE_UPPER_ALL
        } else if first_upper {
            CASE_UPPER_FIRST
        } else {
            CASE_MIXED
        }
    }

    /// Tokenises `line` on whitespace, interning every word and pairing it
    /// with its observed [`CaseMask`], ready for `Trie::insert_sequence`.
    pub fn tokenize_line(&mut self, line: &str) -> Vec<(WordId, CaseMask)> {
        line.split_whitespace()
            .map(|w| {
                let case = Self::case_of(w);
                (self.intern(w), case)
            })
            .collect()
    }

    /// Primes the vocabulary from ARPA text: interns every surface word on
    /// every n-gram line, ignoring the leading probability column and the
    /// trailing back-off column (both tab-separated from the word n-gram).
    pub fn prime_from_arpa(&mut self, text: &str) {
        for line in text.lines() {
            if let Some((_, rest)) = line.split_once('\t') {
                let words = rest.split_once('\t').map_or(rest, |(words, _)| words);
                for word in words.split_whitespace() {
                    self.intern(word);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.id_to_word.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_word.is_empty()
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

impl WordSource for Vocabulary {
    fn word_of(&self, id: WordId, case: CaseMask) -> String {
        let base = match self.id_to_word.get(id as usize) {
            Some(w) => w.as_str(),
            None => return "<unk>".to_string(),
        };
        match case {
            CASE_UPPER_ALL => base.to_uppercase(),
            CASE_UPPER_FIRST => {
                let mut chars = base.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => base.to_string(),
                }
            }
            _ => base.to_string(),
        }
    }

    fn id_of(&self, word: &str) -> Option<WordId> {
        self.word_to_id.get(&word.to_lowercase()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_tokens_keep_their_fixed_ids() {
        let vocab = Vocabulary::new();
        assert_eq!(vocab.id_of("<s>"), Some(ID_START));
        assert_eq!(vocab.id_of("</s>"), Some(ID_END));
        assert_eq!(vocab.id_of("<unk>"), Some(ID_UNK));
    }

    #[test]
    fn intern_is_idempotent_and_case_insensitive() {
        let mut vocab = Vocabulary::new();
        let a = vocab.intern("Hello");
        let b = vocab.intern("hello");
        let c = vocab.intern("HELLO");
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn case_of_classifies_correctly() {
        assert_eq!(Vocabulary::case_of("hello"), CASE_LOWER);
        assert_eq!(Vocabulary::case_of("Hello"), CASE_UPPER_FIRST);
        assert_eq!(Vocabulary::case_of("HELLO"), CASE_UPPER_ALL);
        assert_eq!(Vocabulary::case_of("heLLo"), CASE_MIXED);
    }

    #[test]
    fn word_of_reapplies_the_requested_case() {
        let mut vocab = Vocabulary::new();
        let id = vocab.intern("world");
        assert_eq!(vocab.word_of(id, CASE_LOWER), "world");
        assert_eq!(vocab.word_of(id, CASE_UPPER_FIRST), "World");
        assert_eq!(vocab.word_of(id, CASE_UPPER_ALL), "WORLD");
    }

    #[test]
    fn tokenize_line_interns_every_word() {
        let mut vocab = Vocabulary::new();
        let tokens = vocab.tokenize_line("The Quick fox");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].1, CASE_UPPER_FIRST);
        assert_eq!(tokens[1].1, CASE_UPPER_FIRST);
        assert_eq!(tokens[2].1, CASE_LOWER);
    }

    #[test]
    fn unknown_id_renders_as_unk() {
        let vocab = Vocabulary::new();
        assert_eq!(vocab.word_of(9999, CASE_LOWER), "<unk>");
    }

    #[test]
    fn prime_from_arpa_ignores_the_backoff_column() {
        let mut vocab = Vocabulary::new();
        vocab.prime_from_arpa("-0.301030\ta\t-0.100000\n-0.301030\tb\n");
        assert!(vocab.id_of("a").is_some());
        assert!(vocab.id_of("b").is_some());
        assert!(vocab.id_of("-0.100000").is_none());
    }
}
