//! ARPA text emission and parsing (spec §4.9, §6 grammar).

use crate::error::{ArpaError, Result};
use crate::node::{NodeIdx, PSEUDO_ZERO, ZERO};
use crate::trie::{Trie, ROOT};
use crate::wordid::{CaseMask, WordId, WordSource};

fn path_nodes(trie: &Trie, idx: NodeIdx) -> Vec<NodeIdx> {
    let mut chain = vec![idx];
    let mut cur = idx;
    while let Some(p) = trie.node(cur).parent {
        if p == ROOT {
            break;
        }
        chain.push(p);
        cur = p;
    }
    chain.reverse();
    chain
}

fn render_weight(w: f64) -> f64 {
    if w == ZERO {
        PSEUDO_ZERO
    } else {
        w
    }
}

fn render_words(trie: &Trie, words: &dyn WordSource, chain: &[NodeIdx], case: CaseMask) -> String {
    chain
        .iter()
        .enumerate()
        .map(|(i, &idx)| {
            let c = if i + 1 == chain.len() { case } else { trie.node(idx).dominant_case() };
            words.word_of(trie.node(idx).idw, c)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn emit_entry(out: &mut String, weight: f64, surface: &str, backoff: Option<f64>) {
    out.push_str(&format!("{:.6}\t{}", render_weight(weight), surface));
    if let Some(bow) = backoff {
        out.push_str(&format!("\t{:.6}", render_weight(bow)));
    }
    out.push('\n');
}

/// Lines for one `\g-grams:` section. Unigrams additionally fan out over
/// every distinct dominant case the node observed, unless `lower_case`
/// collapses them to a single surface form (spec §4.9).
fn collect_level(trie: &Trie, words: &dyn WordSource, gram: u8, lower_case: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let contexts = trie.level(gram as usize - 1);
    for h in contexts {
        for (_, child) in trie.children_sorted(h) {
            if !trie.is_word(child) {
                continue;
            }
            let chain = path_nodes(trie, child);
            let weight = trie.node(child).weight;
            let backoff = if trie.node(child).children.is_empty() { None } else { Some(trie.node(child).backoff) };

            if gram == 1 && !lower_case && trie.node(child).uppers.len() > 1 {
                let mut cases: Vec<CaseMask> = trie.node(child).uppers.keys().copied().collect();
                cases.sort_unstable();
                for case in cases {
                    let surface = render_words(trie, words, &chain, case);
                    emit_entry(lines_buf(&mut lines), weight, &surface, backoff);
                }
            } else {
                let case = if lower_case { crate::wordid::CASE_LOWER } else { trie.node(child).dominant_case() };
                let surface = render_words(trie, words, &chain, case);
                emit_entry(lines_buf(&mut lines), weight, &surface, backoff);
            }
        }
    }
    lines
}

/// Helper so `emit_entry` can push into a scratch `String` that's then
/// appended as a single `Vec` element (keeps `collect_level`'s signature a
/// plain `Vec<String>` of whole lines).
fn lines_buf(lines: &mut Vec<String>) -> &mut String {
    lines.push(String::new());
    lines.last_mut().unwrap()
}

/// Emits `trie` as ARPA text (spec §4.9). `stamp`, if present, is written
/// verbatim as a comment block before `\data\`; the core never generates one
/// itself (no clock access).
pub fn emit_arpa(trie: &Trie, words: &dyn WordSource, stamp: Option<&str>) -> String {
    let lower_case = trie.options().lower_case();
    let sections: Vec<Vec<String>> = (1..=trie.order()).map(|g| collect_level(trie, words, g, lower_case)).collect();

    let mut out = String::new();
    if let Some(s) = stamp {
        for line in s.lines() {
            out.push_str(line);
            out.push('\n');
        }
    }
    out.push_str("\\data\\\n");
    for (i, lines) in sections.iter().enumerate() {
        out.push_str(&format!("ngram {}={}\n", i + 1, lines.len()));
    }
    for (i, lines) in sections.iter().enumerate() {
        out.push_str(&format!("\n\\{}-grams:\n", i + 1));
        for line in lines {
            out.push_str(line);
        }
    }
    out.push_str("\n\\end\\\n");
    out
}

fn parse_float(tok: &str) -> Result<f64> {
    tok.parse::<f64>().map_err(|_| ArpaError::Input(format!("not a float: {tok}")))
}

/// Parses ARPA text back into a [`Trie`] (spec §4.9, §6 grammar), resolving
/// surface words through `words.id_of`. Pseudo-zero (`-99`) is canonicalised
/// back to `NEG_INFINITY` so `parse(emit_arpa(M)) == M` (property 3).
pub fn parse_arpa(text: &str, words: &dyn WordSource) -> Result<Trie> {
    let data_start = text
        .find("\\data\\")
        .ok_or_else(|| ArpaError::Input("missing \\data\\ header".into()))?;
    let body = &text[data_start + "\\data\\".len()..];

    let mut order = 0u8;
    for line in body.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("ngram ") {
            let g: u8 = rest
                .split('=')
                .next()
                .and_then(|s| s.trim().parse().ok())
                .ok_or_else(|| ArpaError::Input(format!("malformed ngram header line: {line}")))?;
            order = order.max(g);
        } else if line.starts_with('\\') && line.ends_with("-grams:") {
            break;
        }
    }
    if order == 0 {
        return Err(ArpaError::Input("no ngram count lines found".into()));
    }

    let mut trie = Trie::new(order);
    let mut gram = 0u8;
    for raw in body.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("ngram ") {
            continue;
        }
        if line.starts_with('\\') {
            if line == "\\end\\" {
                break;
            }
            if let Some(rest) = line.strip_prefix('\\') {
                if let Some(g) = rest.strip_suffix("-grams:") {
                    gram = g.parse().map_err(|_| ArpaError::Input(format!("bad section header: {line}")))?;
                }
            }
            continue;
        }
        if gram == 0 {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 2 {
            return Err(ArpaError::Input(format!("malformed entry: {line}")));
        }
        let mut log_p = parse_float(fields[0])?;
        if log_p == PSEUDO_ZERO {
            log_p = ZERO;
        }
        let surface: Vec<&str> = fields[1].split_whitespace().collect();
        if surface.len() != gram as usize {
            return Err(ArpaError::Input(format!("expected {gram} words, got {}: {line}", surface.len())));
        }
        let ids: Vec<WordId> = surface
            .iter()
            .map(|w| words.id_of(w).ok_or_else(|| ArpaError::Input(format!("unknown word: {w}"))))
            .collect::<Result<_>>()?;
        let mut log_bow = ZERO;
        if fields.len() >= 3 {
            log_bow = parse_float(fields[2])?;
            if log_bow == PSEUDO_ZERO {
                log_bow = ZERO;
            }
        }
        trie.insert_arpa(&ids, log_p, log_bow)?;
    }
    Ok(trie)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct TestVocab {
        to_id: HashMap<String, WordId>,
        to_word: HashMap<WordId, String>,
        calls: RefCell<usize>,
    }

    impl TestVocab {
        fn new(words: &[(&str, WordId)]) -> Self {
            let mut to_id = HashMap::new();
            let mut to_word = HashMap::new();
            for &(w, id) in words {
                to_id.insert(w.to_string(), id);
                to_word.insert(id, w.to_string());
            }
            TestVocab { to_id, to_word, calls: RefCell::new(0) }
        }
    }

    impl WordSource for TestVocab {
        fn word_of(&self, id: WordId, _case: CaseMask) -> String {
            *self.calls.borrow_mut() += 1;
            self.to_word.get(&id).cloned().unwrap_or_else(|| "<unk>".to_string())
        }
        fn id_of(&self, word: &str) -> Option<WordId> {
            self.to_id.get(word).copied()
        }
    }

    /// Spec scenario S3: round-trip of a two-level model through ARPA text.
    #[test]
    fn s3_round_trip_through_arpa_text() {
        let vocab = TestVocab::new(&[("a", 10), ("b", 11), ("c", 12), ("d", 13)]);
        let mut trie = Trie::new(2);
        trie.insert_arpa(&[10], (0.5_f64).log10(), (0.4_f64).log10()).unwrap();
        trie.insert_arpa(&[11], (0.5_f64).log10(), 0.0).unwrap();
        trie.insert_arpa(&[10, 12], (0.7_f64).log10(), 0.0).unwrap();
        trie.insert_arpa(&[10, 13], (0.3_f64).log10(), 0.0).unwrap();

        let text = emit_arpa(&trie, &vocab, None);
        assert!(text.contains("\\data\\"));
        assert!(text.contains("\\end\\"));

        let parsed = parse_arpa(&text, &vocab).unwrap();
        let a = parsed.find_path(&[10]).unwrap();
        assert!((parsed.node(a).weight - (0.5_f64).log10()).abs() < 1e-5);
        assert!((parsed.node(a).backoff - (0.4_f64).log10()).abs() < 1e-5);
        let ac = parsed.find_path(&[10, 12]).unwrap();
        assert!((parsed.node(ac).weight - (0.7_f64).log10()).abs() < 1e-5);
    }

    #[test]
    fn pseudo_zero_round_trips_to_neg_infinity() {
        let vocab = TestVocab::new(&[("a", 10)]);
        let mut trie = Trie::new(1);
        trie.insert_arpa(&[10], ZERO, 0.0).unwrap();
        let text = emit_arpa(&trie, &vocab, None);
        assert!(text.contains("-99.000000"));
        let parsed = parse_arpa(&text, &vocab).unwrap();
        let idx = parsed.find_path(&[10]).unwrap();
        assert_eq!(parsed.node(idx).weight, ZERO);
    }

    #[test]
    fn backoff_column_omitted_for_leaf_nodes() {
        let vocab = TestVocab::new(&[("a", 10)]);
        let mut trie = Trie::new(1);
        trie.insert_arpa(&[10], (0.5_f64).log10(), (0.1_f64).log10()).unwrap();
        let text = emit_arpa(&trie, &vocab, None);
        let line = text.lines().find(|l| l.contains(" a")).unwrap();
        assert_eq!(line.matches('\t').count(), 1, "leaf entry must omit the back-off column: {line}");
    }

    #[test]
    fn stamp_comment_precedes_data_header() {
        let vocab = TestVocab::new(&[("a", 10)]);
        let mut trie = Trie::new(1);
        trie.insert_arpa(&[10], 0.0, 0.0).unwrap();
        let text = emit_arpa(&trie, &vocab, Some("; built by arpa-lm 0.1.0"));
        let data_pos = text.find("\\data\\").unwrap();
        let stamp_pos = text.find("; built by arpa-lm").unwrap();
        assert!(stamp_pos < data_pos);
    }
}
