//! Pruner (component G, spec §4.7): entropy-based (Stolcke) n-gram removal
//! under a perplexity-change threshold, plus a companion frequency sweep.

use crate::node::{NodeIdx, ZERO};
use crate::normalizer;
use crate::trie::{Trie, ROOT};
use crate::wordid::{is_start, WordId, ID_END};

/// Sum of `weight` over `h` and every proper ancestor up to (excluding) the
/// root — i.e. log10 P(history), grounded on
/// `original_source/src/arpa.cpp::prune`'s `sumFn`. `<s>` ancestors
/// contribute their sibling `</s>` weight instead of their own (the start
/// token itself always carries `weight == zero`).
fn history_log_prob(trie: &Trie, h: NodeIdx) -> f64 {
    let mut total = 0.0;
    let mut cur = h;
    loop {
        let node = trie.node(cur);
        let parent = match node.parent {
            Some(p) => p,
            None => break, // reached root
        };
        if is_start(node.idw) {
            if let Some(end) = trie.child(parent, ID_END) {
                total += trie.node(end).weight;
            }
        } else if node.weight != ZERO {
            total += node.weight;
        }
        cur = parent;
    }
    total
}

/// True iff some child of `h` itself has children — i.e. `h` is a prefix of
/// a longer observed context and must keep a usable back-off weight even
/// once every direct child has been pruned.
fn is_prefix_of_longer_context(trie: &Trie, h: NodeIdx) -> bool {
    trie.children_sorted(h).into_iter().any(|(_, c)| !trie.node(c).children.is_empty())
}

/// Stolcke-prunes `trie` at threshold `theta` down to `min_gram` (floor
/// order, `max(min_gram, 2)`), then recomputes back-off weights in
/// ascending order (spec §4.7: higher orders consult lower ones).
pub fn prune(trie: &mut Trie, theta: f64, min_gram: u8) {
    if trie.order() < 2 {
        return;
    }
    let floor = min_gram.max(2);
    let mut gram = trie.order();
    while gram >= floor {
        prune_level(trie, theta, gram);
        if gram == 0 {
            break;
        }
        gram -= 1;
    }
    for depth in 0..trie.order() as usize {
        normalizer::normalize_level(trie, depth);
    }
}

fn prune_level(trie: &mut Trie, theta: f64, gram: u8) {
    let contexts = trie.level(gram as usize - 1);
    let mut pruned_count = 0usize;
    for h in contexts {
        if !trie.node(h).backoff.is_finite() {
            continue;
        }
        let (num, den) = match normalizer::compute(trie, h) {
            Some(pair) => pair,
            None => continue,
        };
        let total = history_log_prob(trie, h);
        let backoff_h = trie.node(h).backoff;
        let path = trie.path_ids(h);
        let tail: &[WordId] = if path.is_empty() { &path } else { &path[1..] };

        let mut all_pruned = true;
        for (id, child) in trie.children_sorted(h) {
            if !trie.is_word(child) {
                continue;
            }
            let weight = trie.node(child).weight;
            let bow_lower = trie.backoff_prob(tail, id);
            let nbow_h = (num + 10f64.powf(weight)).log10() - (den + 10f64.powf(bow_lower)).log10();
            let delta = bow_lower + nbow_h - weight;
            let delta_h = -10f64.powf(total) * (10f64.powf(weight) * delta + num * (nbow_h - backoff_h));
            let delta_ppl = 10f64.powf(delta_h) - 1.0;

            let mut prune_it = theta > 0.0 && delta_ppl < theta;
            if prune_it && trie.node(child).backoff != ZERO && trie.is_words(child) {
                prune_it = false;
            }
            if prune_it {
                trie.node_mut(child).weight = 0.0;
                pruned_count += 1;
            } else {
                all_pruned = false;
            }
        }
        if all_pruned && !is_prefix_of_longer_context(trie, h) {
            trie.node_mut(h).backoff = ZERO;
        }
    }
    if pruned_count > 0 {
        trie.logger().info(&format!("pruned {pruned_count} {gram}-grams"));
    }
}

/// Recursively zeroes `idx` and every still-valid descendant (grounded on
/// `original_source/src/arpa.cpp::sweep`'s `removeFn` cascading zero).
fn zero_subtree(trie: &mut Trie, idx: NodeIdx) {
    if trie.node(idx).weight != 0.0 {
        trie.node_mut(idx).weight = 0.0;
    }
    for (_, child) in trie.children_sorted(idx) {
        if trie.node(child).weight != 0.0 {
            zero_subtree(trie, child);
        }
    }
}

/// Removes every n-gram at order `g` (`2..=order`) whose `oc` falls below
/// `min_counts[g]`, cascading the removal to its descendants, before
/// re-estimation (spec §4.7 "companion frequency sweep").
pub fn sweep(trie: &mut Trie, min_counts: &[u64]) {
    if trie.order() < 2 {
        return;
    }
    let mut erased = 0usize;
    for gram in 2..=trie.order() {
        let min_count = min_counts.get(gram as usize).copied().unwrap_or(0);
        if min_count == 0 {
            continue;
        }
        let contexts: Vec<NodeIdx> =
            if gram == 1 { vec![ROOT] } else { trie.level(gram as usize - 1) };
        for h in contexts {
            for (_, child) in trie.children_sorted(h) {
                if trie.node(child).weight != 0.0 && trie.node(child).oc < min_count {
                    erased += 1;
                    zero_subtree(trie, child);
                }
            }
        }
    }
    if erased > 0 {
        trie.logger().info(&format!("sweep: erased {erased} n-grams below the minimum count"));
        trie.invalidate_level_cache();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discount::Discount;
    use crate::estimator::train;
    use crate::wordid::{CaseMask, ID_END, ID_START};

    fn seq(ids: &[WordId]) -> Vec<(WordId, CaseMask)> {
        ids.iter().map(|&id| (id, 0)).collect()
    }

    fn trained_trigram() -> Trie {
        let mut trie = Trie::new(3);
        let sentences: &[&[WordId]] = &[
            &[ID_START, 10, 11, 12, ID_END],
            &[ID_START, 10, 11, 13, ID_END],
            &[ID_START, 10, 14, ID_END],
            &[ID_START, 15, 11, 12, ID_END],
        ];
        for (i, s) in sentences.iter().enumerate() {
            trie.insert_sequence(&seq(s), i as u64);
        }
        let mut discount = Discount::modified_kneser_ney();
        let _ = train(&mut trie, &mut discount);
        trie
    }

    #[test]
    fn pruning_is_monotonic_in_theta() {
        let mut lo = trained_trigram();
        let mut hi = trained_trigram();
        prune(&mut lo, 0.001, 0);
        prune(&mut hi, 10.0, 0);
        let count = |t: &Trie, g: usize| -> usize {
            t.level(g - 1).into_iter().flat_map(|h| t.children_sorted(h)).filter(|&(_, c)| t.is_word(c)).count()
        };
        let lo_count: usize = (2..=3).map(|g| count(&lo, g)).sum();
        let hi_count: usize = (2..=3).map(|g| count(&hi, g)).sum();
        assert!(hi_count <= lo_count, "hi={hi_count} lo={lo_count}");
    }

    #[test]
    fn pruning_keeps_retained_parents_valid() {
        let mut trie = trained_trigram();
        prune(&mut trie, 1.0, 0);
        for h in trie.level(1) {
            for (_, child) in trie.children_sorted(h) {
                if trie.is_word(child) {
                    assert!(trie.is_words(h), "retained child's parent must stay a valid word chain");
                }
            }
        }
    }

    #[test]
    fn sweep_removes_low_count_ngrams_and_descendants() {
        let mut trie = trained_trigram();
        let bigram = trie.find_path(&[10, 11]).unwrap();
        assert!(trie.node(bigram).oc >= 2);
        sweep(&mut trie, &[0, 0, 0, 100]); // order-3 min count impossibly high
        let trigram = trie.find_path(&[10, 11, 12]).unwrap();
        assert_eq!(trie.node(trigram).weight, 0.0);
    }
}
