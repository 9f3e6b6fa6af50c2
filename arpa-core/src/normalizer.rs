//! Back-off normaliser (component E, spec §4.5): keeps every context's
//! probability mass summing to one by assigning its back-off weight, or by
//! redistributing residual mass across unigrams at the root.

use crate::node::{ZERO, EPSILON};
use crate::trie::{Trie, ROOT};
use crate::node::NodeIdx;
use crate::wordid::{is_start, is_unk, WordId};

fn floor_eps(x: f64) -> f64 {
    if x.abs() < EPSILON {
        0.0
    } else {
        x
    }
}

/// `(numerator, denominator)` for `context`, or `None` if it has no valid
/// children to normalise over (the pruner also calls this and skips on
/// `None`, spec §4.7 step 1).
pub fn compute(trie: &Trie, context: NodeIdx) -> Option<(f64, f64)> {
    let path = trie.path_ids(context);
    let tail: &[WordId] = if path.is_empty() { &[] } else { &path[1..] };
    let mut sum_weight = 0.0;
    let mut sum_tail = 0.0;
    let mut any = false;
    for (_, child) in trie.children_sorted(context) {
        if !trie.is_event(child) || !trie.is_word(child) {
            continue;
        }
        any = true;
        let w = trie.node(child).idw;
        sum_weight += 10f64.powf(trie.node(child).weight);
        sum_tail += 10f64.powf(trie.backoff_prob(tail, w));
    }
    if !any {
        return None;
    }
    Some((1.0 - sum_weight, 1.0 - sum_tail))
}

/// Normalises every context at `depth`, including the root's residual-mass
/// distribution when `depth == 0`.
pub fn normalize_level(trie: &mut Trie, depth: usize) {
    for context in trie.level(depth) {
        if context == ROOT {
            distribute_root(trie);
        } else {
            normalize_context(trie, context);
        }
    }
}

fn normalize_context(trie: &mut Trie, context: NodeIdx) {
    let (numerator, denominator) = match compute(trie, context) {
        Some(pair) => pair,
        None => return,
    };
    let numerator = floor_eps(numerator);
    let denominator = floor_eps(denominator);

    if numerator == 0.0 && denominator == 0.0 {
        trie.node_mut(context).backoff = 0.0;
        return;
    }
    if numerator < 0.0 || denominator < 0.0 {
        trie.logger().warning("normalizer: anomalous mass, backoff forced to zero");
        trie.node_mut(context).backoff = ZERO;
        return;
    }
    if denominator == 0.0 {
        // scale-to-one: no tail mass to borrow, so scale every child's own
        // weight up to absorb the residual instead. Only valid once the
        // anomaly check above has ruled out numerator <= EPSILON.
        let add = -(1.0 - numerator).log10();
        let children = trie.children_sorted(context);
        for (_, child) in children {
            if trie.is_word(child) && trie.is_event(child) {
                let w = trie.node(child).weight;
                trie.node_mut(child).weight = w + add;
            }
        }
        trie.node_mut(context).backoff = 0.0;
        return;
    }
    trie.node_mut(context).backoff = numerator.log10() - denominator.log10();
}

fn distribute_root(trie: &mut Trie) {
    let numerator = match compute(trie, ROOT) {
        Some((numerator, _denominator)) => floor_eps(numerator),
        None => return,
    };
    if numerator == 0.0 {
        return;
    }
    let zerotons: Vec<NodeIdx> = trie
        .children_sorted(ROOT)
        .into_iter()
        .filter(|&(_, idx)| trie.node(idx).weight == ZERO)
        .map(|(_, idx)| idx)
        .collect();
    if !zerotons.is_empty() {
        let share = numerator / zerotons.len() as f64;
        for idx in zerotons {
            trie.node_mut(idx).weight = share.log10();
        }
        return;
    }
    let v = trie.unigrams() as f64;
    if v <= 0.0 {
        return;
    }
    let addend = numerator / v;
    let targets: Vec<NodeIdx> = trie
        .children_sorted(ROOT)
        .into_iter()
        .filter(|&(id, _)| !is_start(id) && !is_unk(id))
        .map(|(_, idx)| idx)
        .collect();
    for idx in targets {
        let w = trie.node(idx).weight;
        let p = 10f64.powf(w) + addend;
        trie.node_mut(idx).weight = p.log10();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wordid::CaseMask;

    fn seq(ids: &[WordId]) -> Vec<(WordId, CaseMask)> {
        ids.iter().map(|&id| (id, 0)).collect()
    }

    #[test]
    fn normal_case_produces_finite_backoff() {
        let mut trie = Trie::new(2);
        trie.insert_arpa(&[5], -0.3, 0.0).unwrap();
        trie.insert_arpa(&[6], -0.5, 0.0).unwrap();
        trie.insert_arpa(&[5, 6], -0.2, 0.0).unwrap();
        let idx5 = trie.find_path(&[5]).unwrap();
        normalize_context(&mut trie, idx5);
        let bow = trie.node(trie.find_path(&[5]).unwrap()).backoff;
        assert!(bow.is_finite());
    }

    #[test]
    fn degenerate_case_gives_zero_backoff() {
        let mut trie = Trie::new(2);
        trie.insert_arpa(&[5], 0.0, 0.0).unwrap();
        trie.insert_arpa(&[5, 6], 0.0, 0.0).unwrap();
        let idx5 = trie.find_path(&[5]).unwrap();
        normalize_context(&mut trie, idx5);
        let bow = trie.node(trie.find_path(&[5]).unwrap()).backoff;
        assert_eq!(bow, 0.0);
    }

    #[test]
    fn distribute_root_spreads_mass_over_zerotons() {
        let mut trie = Trie::new(1);
        trie.insert_sequence(&seq(&[5]), 0);
        trie.insert_sequence(&seq(&[6]), 0);
        let idx5 = trie.find_path(&[5]).unwrap();
        let idx6 = trie.find_path(&[6]).unwrap();
        trie.node_mut(idx5).weight = -0.5; // observed word, leaves mass for 6
        // idx6 stays at ZERO (zeroton)
        distribute_root(&mut trie);
        assert!(trie.node(idx6).weight.is_finite());
    }
}
