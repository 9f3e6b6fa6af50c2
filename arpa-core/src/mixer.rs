//! Mixer (component H, spec §4.8): static linear, backward, log-linear and
//! Bayesian mixing of independently-estimated models, plus the shared
//! structural `repair` step every mix finishes with.

use crate::node::{NodeIdx, ZERO};
use crate::normalizer;
use crate::trie::Trie;
use crate::wordid::WordId;

fn mix_log(w1: f64, w2: f64, lambda: f64) -> f64 {
    (lambda * 10f64.powf(w1) + (1.0 - lambda) * 10f64.powf(w2)).log10()
}

/// Numerically stable `log10(Σ 10^v)` over already-log10 values.
fn log_sum_pow10(vals: &[f64]) -> f64 {
    let max = vals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = vals.iter().map(|&v| 10f64.powf(v - max)).sum();
    max + sum.log10()
}

/// Re-runs the back-off normaliser and probability fix-up only — no
/// re-discounting (spec §4.8: "structural repair step", run after every
/// mix).
pub fn repair(trie: &mut Trie) {
    for depth in 0..trie.order() as usize {
        normalizer::normalize_level(trie, depth);
    }
    crate::fixup::fixup_probs(trie);
}

/// Pass 1: for every n-gram in `a`, combine with `b`'s weight for the same
/// path (or `b`'s back-off probability, if `b` has no such path).
fn forward_pass1(a: &mut Trie, b: &Trie, lambda: f64, node: NodeIdx, path: &mut Vec<WordId>) {
    for (id, child) in a.children_sorted(node) {
        path.push(id);
        if a.is_word(child) {
            let weight_a = a.node(child).weight;
            let weight_b = match b.find_path(path) {
                Some(bc) if b.is_word(bc) => b.node(bc).weight,
                _ => b.lookup(&path[..path.len() - 1], id),
            };
            a.node_mut(child).weight = mix_log(weight_a, weight_b, lambda);
        }
        forward_pass1(a, b, lambda, child, path);
        path.pop();
    }
}

/// Pass 2: walk `b`, inserting any n-gram absent from `a` with the
/// symmetric combination (spec §4.8).
fn forward_pass2(a: &mut Trie, b: &Trie, lambda: f64, node: NodeIdx, path: &mut Vec<WordId>) {
    if path.len() >= a.order() as usize {
        return;
    }
    for (id, child) in b.children_sorted(node) {
        path.push(id);
        if b.is_word(child) && a.find_path(path).is_none() {
            let weight_b = b.node(child).weight;
            let hist = &path[..path.len() - 1];
            let weight_a = a.lookup(hist, id);
            let new_w = mix_log(weight_a, weight_b, lambda);
            let _ = a.insert_arpa(path, new_w, b.node(child).backoff);
        }
        forward_pass2(a, b, lambda, child, path);
        path.pop();
    }
}

/// Linear forward mix of two fully-estimated models (spec §4.8). Mutates
/// `a` in place; `b` is read-only.
pub fn linear_mix(a: &mut Trie, b: &Trie, lambda: f64) {
    forward_pass1(a, b, lambda, crate::trie::ROOT, &mut Vec::new());
    forward_pass2(a, b, lambda, crate::trie::ROOT, &mut Vec::new());
    repair(a);
}

fn weight_lookup(trie: &Trie, seq: &[WordId]) -> f64 {
    match seq.split_last() {
        Some((&w, ctx)) => trie.lookup(ctx, w),
        None => ZERO,
    }
}

/// Every n-gram id-sequence of length `g` present in `trie`.
fn sequences_at(trie: &Trie, g: u8) -> Vec<Vec<WordId>> {
    if g == 0 {
        return Vec::new();
    }
    trie.level(g as usize - 1)
        .into_iter()
        .flat_map(|h| {
            let path = trie.path_ids(h);
            trie.children_sorted(h).into_iter().filter_map(move |(id, c)| {
                if trie.is_word(c) {
                    let mut seq = path.clone();
                    seq.push(id);
                    Some(seq)
                } else {
                    None
                }
            })
        })
        .collect()
}

/// Backward mix: iterates orders from `max(order_a, order_b)` down to 1,
/// using whole-sequence lookups with suffix fallback (spec §4.8), and
/// raises `a`'s order when `b` has longer n-grams.
pub fn backward_mix(a: &mut Trie, b: &Trie, lambda: f64) {
    a.raise_order(b.order());
    let top = a.order();
    for gram in (1..=top).rev() {
        let mut seqs = sequences_at(a, gram);
        seqs.extend(sequences_at(b, gram));
        seqs.sort();
        seqs.dedup();
        for seq in seqs {
            let wa = weight_lookup(a, &seq);
            let wb = weight_lookup(b, &seq);
            let new_w = mix_log(wa, wb, lambda);
            let backoff = a.find_path(&seq).map(|idx| a.node(idx).backoff).unwrap_or(ZERO);
            let _ = a.insert_arpa(&seq, new_w, backoff);
        }
    }
    repair(a);
}

/// Log-linear mix over K models (spec §4.8). `primary` supplies the (h, w)
/// candidate set and is mutated in place; `others` are read-only models with
/// their own mixture weights. `lambda_primary + Σ others.1 == 1`.
pub fn loglinear_mix(primary: &mut Trie, lambda_primary: f64, others: &[(&Trie, f64)]) {
    let mut updates: Vec<(NodeIdx, f64)> = Vec::new();
    for depth in 0..primary.order() as usize {
        for h in primary.level(depth) {
            let path_h = primary.path_ids(h);
            let mut combined: Vec<(NodeIdx, f64)> = Vec::new();
            for (id, child) in primary.children_sorted(h) {
                if !primary.is_word(child) {
                    continue;
                }
                let mut sum = lambda_primary * primary.node(child).weight;
                for (model, lambda) in others {
                    sum += lambda * model.lookup(&path_h, id);
                }
                combined.push((child, sum));
            }
            if combined.is_empty() {
                continue;
            }
            let logz = log_sum_pow10(&combined.iter().map(|&(_, v)| v).collect::<Vec<_>>());
            for (child, v) in combined {
                updates.push((child, v - logz));
            }
        }
    }
    for (idx, w) in updates {
        primary.node_mut(idx).weight = w;
    }
    repair(primary);
}

/// `Σ_{i=1..hist.len()} log10 P(hist[i] | hist[..i])`, the Bayesian mixer's
/// per-model history score (spec §4.8).
fn history_score(trie: &Trie, hist: &[WordId]) -> f64 {
    let mut sum = 0.0;
    for i in 0..hist.len() {
        sum += trie.lookup(&hist[..i], hist[i]);
    }
    sum
}

/// Bayesian mix with prior weights and a history-length scale parameter
/// (spec §4.8). Falls back to the prior weights if every posterior
/// collapses to zero.
pub fn bayes_mix(primary: &mut Trie, lambda_primary: f64, others: &[(&Trie, f64)], length: usize, scale: f64) {
    let mut updates: Vec<(NodeIdx, f64)> = Vec::new();
    for depth in 0..primary.order() as usize {
        for h in primary.level(depth) {
            let path_h = primary.path_ids(h);
            let start = path_h.len().saturating_sub(length);
            let hist = &path_h[start..];

            let post_primary = lambda_primary * 10f64.powf(scale * history_score(primary, hist));
            let posts: Vec<f64> =
                others.iter().map(|(m, lambda)| lambda * 10f64.powf(scale * history_score(m, hist))).collect();
            let total = post_primary + posts.iter().sum::<f64>();

            let (pi_primary, pis): (f64, Vec<f64>) = if total > 0.0 {
                (post_primary / total, posts.iter().map(|p| p / total).collect())
            } else {
                (lambda_primary, others.iter().map(|(_, l)| *l).collect())
            };

            for (id, child) in primary.children_sorted(h) {
                if !primary.is_word(child) {
                    continue;
                }
                let mut mix = pi_primary * 10f64.powf(primary.node(child).weight);
                for ((model, _), pi) in others.iter().zip(pis.iter()) {
                    mix += pi * 10f64.powf(model.lookup(&path_h, id));
                }
                updates.push((child, mix.log10()));
            }
        }
    }
    for (idx, w) in updates {
        primary.node_mut(idx).weight = w;
    }
    repair(primary);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_unigram_model(id: WordId, p: f64) -> Trie {
        let mut t = Trie::new(1);
        t.insert_arpa(&[id], p.log10(), 0.0).unwrap();
        t
    }

    /// Spec scenario S4: linear mix of two unigram models, λ=0.5.
    #[test]
    fn s4_linear_mix_of_two_unigrams() {
        let mut a = single_unigram_model(5, 0.9);
        let b = single_unigram_model(5, 0.1);
        linear_mix(&mut a, &b, 0.5);
        let idx = a.find_path(&[5]).unwrap();
        let expected = (0.5 * 0.9 + 0.5 * 0.1_f64).log10();
        assert!((a.node(idx).weight - expected).abs() < 1e-9, "got {}", a.node(idx).weight);
    }

    /// Property 6: mixing a model with itself at λ=0.5 is an identity up to
    /// BOW recomputation.
    #[test]
    fn self_mix_is_approximately_identity() {
        let mut a = Trie::new(2);
        a.insert_arpa(&[5], (0.6_f64).log10(), (0.1_f64).log10()).unwrap();
        a.insert_arpa(&[6], (0.4_f64).log10(), 0.0).unwrap();
        a.insert_arpa(&[5, 6], (0.5_f64).log10(), 0.0).unwrap();
        let b_clone_seed = {
            let mut b = Trie::new(2);
            b.insert_arpa(&[5], (0.6_f64).log10(), (0.1_f64).log10()).unwrap();
            b.insert_arpa(&[6], (0.4_f64).log10(), 0.0).unwrap();
            b.insert_arpa(&[5, 6], (0.5_f64).log10(), 0.0).unwrap();
            b
        };
        let before = a.node(a.find_path(&[5, 6]).unwrap()).weight;
        linear_mix(&mut a, &b_clone_seed, 0.5);
        let after = a.node(a.find_path(&[5, 6]).unwrap()).weight;
        assert!((before - after).abs() < 1e-6, "before={before} after={after}");
    }

    #[test]
    fn loglinear_mix_normalises_children() {
        let mut a = Trie::new(1);
        a.insert_arpa(&[5], (0.5_f64).log10(), 0.0).unwrap();
        a.insert_arpa(&[6], (0.5_f64).log10(), 0.0).unwrap();
        let mut b = Trie::new(1);
        b.insert_arpa(&[5], (0.2_f64).log10(), 0.0).unwrap();
        b.insert_arpa(&[6], (0.8_f64).log10(), 0.0).unwrap();
        loglinear_mix(&mut a, 0.5, &[(&b, 0.5)]);
        let sum: f64 = [5u32, 6]
            .iter()
            .map(|&id| 10f64.powf(a.node(a.find_path(&[id]).unwrap()).weight))
            .sum();
        assert!((sum - 1.0).abs() < 1e-6, "sum={sum}");
    }

    #[test]
    fn bayes_mix_falls_back_to_prior_when_posteriors_collapse() {
        // history_score needs a non-empty history to be anything other than
        // 0.0, so both models carry a weight of ZERO at the length-1 context
        // `[10]`: history_score(., [10]) is then -inf for both, total is
        // exactly 0.0, and bayes_mix must take the prior-weight fallback
        // instead of dividing by it.
        let mut a = Trie::new(2);
        a.insert_arpa(&[10], crate::node::ZERO, 0.0).unwrap();
        a.insert_arpa(&[10, 5], (0.5_f64).log10(), 0.0).unwrap();
        let mut b = Trie::new(2);
        b.insert_arpa(&[10], crate::node::ZERO, 0.0).unwrap();
        bayes_mix(&mut a, 0.7, &[(&b, 0.3)], 1, 1.0);
        let idx = a.find_path(&[10, 5]).unwrap();
        assert!(a.node(idx).weight.is_finite(), "got {}", a.node(idx).weight);
    }
}
