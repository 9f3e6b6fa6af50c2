//! Probability fix-up (component F, spec §4.6): ARPA requires every internal
//! context node to carry a probability entry, even ones the corpus never
//! observed as a word in their own right.

use crate::node::{NodeIdx, FIXUP_MARKER, PSEUDO_ZERO, ZERO};
use crate::trie::Trie;
use crate::wordid::{is_start, is_unk, WordId};

/// Walks levels `1..=order`, filling in `weight = NEG_INFINITY` nodes with
/// their algorithmic back-off probability. Two passes per node: first a
/// sentinel (`FIXUP_MARKER`) so a naive self-lookup can be told apart from a
/// real entry, then the resolved value computed from the parent's own
/// back-off, never by looking the hole up in its own context again.
pub fn fixup_probs(trie: &mut Trie) {
    for depth in 1..=trie.order() as usize {
        let nodes = trie.level(depth);
        let holes: Vec<NodeIdx> = nodes
            .into_iter()
            .filter(|&idx| {
                let node = trie.node(idx);
                node.weight == ZERO
                    && !is_start(node.idw)
                    && !(trie.options().reset_unk() && is_unk(node.idw))
            })
            .collect();
        for &idx in &holes {
            trie.node_mut(idx).weight = FIXUP_MARKER;
        }
        for idx in holes {
            let resolved = resolve(trie, idx, depth);
            trie.node_mut(idx).weight = resolved;
        }
        debug_assert!(
            trie.level(depth).iter().all(|&idx| trie.node(idx).weight != FIXUP_MARKER),
            "fixup: sentinel leaked past its own pass"
        );
    }
}

/// Order-1 holes have no lower order to fall back to and are pinned to
/// `PSEUDO_ZERO`; everything else draws on its parent's back-off weight
/// plus the recursive lookup one order down, deliberately skipping `idx`
/// itself to avoid resolving the hole in terms of its own sentinel.
fn resolve(trie: &Trie, idx: NodeIdx, depth: usize) -> f64 {
    if depth == 1 {
        return PSEUDO_ZERO;
    }
    let w: WordId = trie.node(idx).idw;
    let parent = trie.node(idx).parent.expect("fixup: non-root hole has a parent");
    let parent_path = trie.path_ids(parent);
    let tail: &[WordId] = if parent_path.is_empty() { &parent_path } else { &parent_path[1..] };
    trie.node(parent).backoff + trie.backoff_prob(tail, w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wordid::CaseMask;

    fn seq(ids: &[WordId]) -> Vec<(WordId, CaseMask)> {
        ids.iter().map(|&id| (id, 0)).collect()
    }

    #[test]
    fn fills_internal_hole_with_a_finite_weight() {
        let mut trie = Trie::new(2);
        trie.insert_arpa(&[5], -0.2, -0.1).unwrap();
        // bigram (5,6) created via insert_sequence leaves weight at ZERO
        trie.insert_sequence(&seq(&[5, 6]), 0);
        let idx = trie.find_path(&[5, 6]).unwrap();
        assert_eq!(trie.node(idx).weight, ZERO);
        fixup_probs(&mut trie);
        assert_ne!(trie.node(idx).weight, ZERO);
        assert_ne!(trie.node(idx).weight, FIXUP_MARKER);
    }

    #[test]
    fn order_one_hole_is_pinned_to_pseudo_zero() {
        let mut trie = Trie::new(1);
        trie.insert_arpa(&[5], -0.2, 0.0).unwrap();
        // force a second unigram in directly via the arpa path so it stays
        // at the placeholder weight
        trie.insert_sequence(&seq(&[6]), 0);
        trie.node_mut(trie.find_path(&[6]).unwrap()).weight = ZERO;
        fixup_probs(&mut trie);
        assert_eq!(trie.node(trie.find_path(&[6]).unwrap()).weight, PSEUDO_ZERO);
    }

    #[test]
    fn start_token_is_never_touched() {
        use crate::wordid::ID_START;
        let mut trie = Trie::new(1);
        trie.insert_sequence(&seq(&[ID_START]), 0);
        let idx = trie.find_path(&[ID_START]).unwrap();
        fixup_probs(&mut trie);
        assert_eq!(trie.node(idx).weight, ZERO);
    }
}
