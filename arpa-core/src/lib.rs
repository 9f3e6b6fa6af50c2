//! Engine for training, smoothing, pruning, mixing and serialising
//! back-off n-gram language models in ARPA format.
//!
//! The crate has no opinion on tokenisation, vocabulary storage or corpus
//! I/O: callers own a [`wordid::WordSource`] and feed pre-tokenised word-id
//! sequences into a [`trie::Trie`]. Everything downstream — counting,
//! discounting, back-off normalisation, pruning, mixing and ARPA/binary
//! export — operates purely on that trie.

pub mod discount;
pub mod error;
pub mod estimator;
pub mod fixup;
pub mod level_cache;
pub mod logger;
pub mod mixer;
pub mod node;
pub mod normalizer;
pub mod options;
pub mod pruner;
pub mod serializer;
pub mod trie;
pub mod wordid;

use discount::Discount;
use error::Result;
use logger::Logger;
use options::Options;
use trie::Trie;
use wordid::{CaseMask, WordId, WordSource};

/// Builds and trains a model from pre-tokenised sentences in one call: each
/// inner slice is one sentence's word-id/case sequence, inserted at a
/// distinct synthetic document id, followed by a full [`estimator::train`]
/// pass (spec §4.1, §4.4).
pub fn train_model(order: u8, sentences: &[Vec<(WordId, CaseMask)>], discount: &mut Discount) -> Result<Trie> {
    let mut trie = Trie::new(order);
    for (doc_id, sentence) in sentences.iter().enumerate() {
        trie.insert_sequence(sentence, doc_id as u64);
    }
    estimator::train(&mut trie, discount)?;
    Ok(trie)
}

/// Same as [`train_model`] but with an explicit [`Options`] bit-set and
/// [`Logger`] sink, for callers that need `not_train`/`interpolate`/debug
/// behaviour or a non-default log destination.
pub fn train_model_with(
    order: u8,
    options: Options,
    logger: Box<dyn Logger>,
    sentences: &[Vec<(WordId, CaseMask)>],
    discount: &mut Discount,
) -> Result<Trie> {
    let mut trie = Trie::with_logger(order, options, logger);
    for (doc_id, sentence) in sentences.iter().enumerate() {
        trie.insert_sequence(sentence, doc_id as u64);
    }
    estimator::train(&mut trie, discount)?;
    Ok(trie)
}

/// Renders `trie` as ARPA text (spec §4.9). Thin wrapper over
/// [`serializer::emit_arpa`] kept at the crate root for callers that only
/// need the one entry point.
pub fn to_arpa(trie: &Trie, words: &dyn WordSource, stamp: Option<&str>) -> String {
    serializer::emit_arpa(trie, words, stamp)
}

/// Parses ARPA text into a [`Trie`] (spec §4.9, §6 grammar).
pub fn from_arpa(text: &str, words: &dyn WordSource) -> Result<Trie> {
    serializer::parse_arpa(text, words)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use wordid::{ID_END, ID_START};

    struct FixedVocab(HashMap<WordId, &'static str>);

    impl WordSource for FixedVocab {
        fn word_of(&self, id: WordId, _case: CaseMask) -> String {
            self.0.get(&id).map(|s| s.to_string()).unwrap_or_else(|| "<unk>".to_string())
        }
        fn id_of(&self, word: &str) -> Option<WordId> {
            self.0.iter().find(|(_, &w)| w == word).map(|(&id, _)| id)
        }
    }

    #[test]
    fn train_model_produces_a_normalised_bigram() {
        let a = 10;
        let b = 11;
        let sentences = vec![
            vec![(ID_START, 0), (a, 0), (b, 0), (ID_END, 0)],
            vec![(ID_START, 0), (a, 0), (b, 0), (ID_END, 0)],
        ];
        let mut discount = Discount::witten_bell();
        let trie = train_model(2, &sentences, &mut discount).unwrap();
        assert!(trie.find_path(&[a, b]).is_some());
    }

    #[test]
    fn round_trip_through_arpa_preserves_the_vocabulary() {
        let a = 10;
        let b = 11;
        let sentences = vec![vec![(ID_START, 0), (a, 0), (b, 0), (ID_END, 0)]];
        let mut discount = Discount::witten_bell();
        let trie = train_model(2, &sentences, &mut discount).unwrap();

        let mut words = HashMap::new();
        words.insert(ID_START, "<s>");
        words.insert(ID_END, "</s>");
        words.insert(a, "a");
        words.insert(b, "b");
        let vocab = FixedVocab(words);

        let text = to_arpa(&trie, &vocab, None);
        let parsed = from_arpa(&text, &vocab).unwrap();
        assert!(parsed.find_path(&[a, b]).is_some());
    }
}
