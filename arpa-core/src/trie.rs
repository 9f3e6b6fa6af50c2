//! The n-gram trie (component A) — an arena of [`Node`]s addressed by index,
//! plus the mutators the rest of the engine builds on.

use std::collections::HashSet;

use crate::error::{ArpaError, Result};
use crate::level_cache::LevelCache;
use crate::logger::{Logger, NullLogger};
use crate::node::{Node, NodeIdx, ZERO};
use crate::options::Options;
use crate::wordid::{is_unk, CaseMask, WordId, ID_END, ID_START, ID_UNK};

/// Index of the sentinel root node. Never reassigned.
pub const ROOT: NodeIdx = 0;

/// Ordered tree of word-ids with per-node counts, case histogram,
/// probability and back-off weight (spec §3.1).
pub struct Trie {
    arena: Vec<Node>,
    order: u8,
    options: Options,
    deleted_ids: HashSet<WordId>,
    level_cache: LevelCache,
    logger: Box<dyn Logger>,
}

impl Trie {
    pub fn new(order: u8) -> Self {
        Self::with_logger(order, Options::empty(), Box::new(NullLogger))
    }

    pub fn with_logger(order: u8, options: Options, logger: Box<dyn Logger>) -> Self {
        Trie {
            arena: vec![Node::root()],
            order,
            options,
            deleted_ids: HashSet::new(),
            level_cache: LevelCache::new(),
            logger,
        }
    }

    pub fn order(&self) -> u8 {
        self.order
    }

    pub fn options(&self) -> Options {
        self.options
    }

    pub fn set_options(&mut self, options: Options) {
        self.options = options;
    }

    pub fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }

    /// Number of frequent unigrams, i.e. the arena's size minus the root
    /// sentinel itself (spec §9 open question, resolved from
    /// `original_source/src/arpa.cpp::unigrams`).
    pub fn unigrams(&self) -> usize {
        self.arena.len() - 1
    }

    pub fn node(&self, idx: NodeIdx) -> &Node {
        &self.arena[idx]
    }

    pub(crate) fn node_mut(&mut self, idx: NodeIdx) -> &mut Node {
        &mut self.arena[idx]
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unigrams() == 0
    }

    pub fn mark_deleted(&mut self, id: WordId) {
        self.deleted_ids.insert(id);
    }

    pub fn is_word(&self, idx: NodeIdx) -> bool {
        let node = &self.arena[idx];
        node.is_word() && !self.deleted_ids.contains(&node.idw)
    }

    /// True unless `idx` stands for a non-event token that discount
    /// estimation must exclude from its counts: `<s>` always, and `<unk>`
    /// when `ResetUnk` forces it out of the probability mass (spec §4.3).
    pub fn is_event(&self, idx: NodeIdx) -> bool {
        let idw = self.arena[idx].idw;
        if idw == ID_START {
            return false;
        }
        if self.options.reset_unk() && idw == ID_UNK {
            return false;
        }
        true
    }

    /// True iff every node on the path from the root to `idx` (exclusive of
    /// the root itself) is a real word. Used to decide whether pruning a
    /// node would orphan a lower-order fallback (spec §4.7).
    pub fn is_words(&self, idx: NodeIdx) -> bool {
        let mut cur = idx;
        while cur != ROOT {
            if !self.is_word(cur) {
                return false;
            }
            cur = match self.arena[cur].parent {
                Some(p) => p,
                None => break,
            };
        }
        true
    }

    pub fn depth(&self, idx: NodeIdx) -> usize {
        let mut d = 0;
        let mut cur = idx;
        while let Some(p) = self.arena[cur].parent {
            d += 1;
            cur = p;
        }
        d
    }

    pub fn child(&self, parent: NodeIdx, id: WordId) -> Option<NodeIdx> {
        self.arena[parent].children.get(&id).copied()
    }

    /// Children of `parent`, ordered by word-id for deterministic iteration
    /// (spec §9: "sorted Vec... for deterministic iteration").
    pub fn children_sorted(&self, parent: NodeIdx) -> Vec<(WordId, NodeIdx)> {
        let mut v: Vec<(WordId, NodeIdx)> =
            self.arena[parent].children.iter().map(|(&id, &idx)| (id, idx)).collect();
        v.sort_unstable_by_key(|(id, _)| *id);
        v
    }

    fn ensure_child(&mut self, parent: NodeIdx, id: WordId) -> NodeIdx {
        if let Some(idx) = self.arena[parent].children.get(&id) {
            return *idx;
        }
        let idx = self.arena.len();
        self.arena.push(Node::new_child(id, parent));
        self.arena[parent].children.insert(id, idx);
        self.level_cache.invalidate();
        idx
    }

    /// Walks from the root along `seq` without creating anything; `None` if
    /// any prefix is missing.
    pub fn find_path(&self, seq: &[WordId]) -> Option<NodeIdx> {
        let mut cur = ROOT;
        for &id in seq {
            cur = self.child(cur, id)?;
        }
        Some(cur)
    }

    fn find_path_from(&self, start: NodeIdx, seq: &[WordId]) -> Option<NodeIdx> {
        let mut cur = start;
        for &id in seq {
            cur = self.child(cur, id)?;
        }
        Some(cur)
    }

    pub fn path_ids(&self, idx: NodeIdx) -> Vec<WordId> {
        let mut ids = Vec::new();
        let mut cur = idx;
        while let Some(p) = self.arena[cur].parent {
            ids.push(self.arena[cur].idw);
            cur = p;
        }
        ids.reverse();
        ids
    }

    /// Every prefix-node along `seq` is a real word (spec `context_ok`).
    pub fn context_ok(&self, seq: &[WordId]) -> bool {
        let mut cur = ROOT;
        for &id in seq {
            match self.child(cur, id) {
                Some(idx) if self.is_word(idx) => cur = idx,
                _ => return false,
            }
        }
        true
    }

    /// Full depth-first walk of the arena, `(index, depth)` for every node
    /// including the root. Feeds the [`LevelCache`].
    fn walk_depth_first(&self) -> Vec<(NodeIdx, usize)> {
        let mut out = Vec::with_capacity(self.arena.len());
        let mut stack = vec![(ROOT, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            out.push((idx, depth));
            for (_, child) in self.children_sorted(idx) {
                stack.push((child, depth + 1));
            }
        }
        out
    }

    /// Nodes at `depth` (the contexts whose children are n-grams of order
    /// `depth + 1`), built lazily and cached (spec §4.2).
    pub fn level(&self, depth: usize) -> Vec<NodeIdx> {
        self.level_cache.get(depth, || self.walk_depth_first())
    }

    // -- mutators ----------------------------------------------------------

    /// Increments `oc` for every contiguous window of length `1..=order`
    /// encountered in `seq`; `<unk>` tokens split the sequence into
    /// sub-sequences and are counted only at the root (spec §4.1.1).
    pub fn insert_sequence(&mut self, seq: &[(WordId, CaseMask)], doc_id: u64) {
        if seq.is_empty() {
            return;
        }
        let mut run_start = 0usize;
        for i in 0..=seq.len() {
            let at_unk = i < seq.len() && is_unk(seq[i].0);
            if at_unk || i == seq.len() {
                if i > run_start {
                    self.insert_contiguous(&seq[run_start..i], doc_id);
                }
                if at_unk {
                    let (id, case) = seq[i];
                    let child = self.ensure_child(ROOT, id);
                    self.arena[child].bump_case(case, 1);
                    self.arena[child].bump_occurrence(doc_id);
                }
                run_start = i + 1;
            }
        }
    }

    fn insert_contiguous(&mut self, tokens: &[(WordId, CaseMask)], doc_id: u64) {
        let order = self.order as usize;
        for start in 0..tokens.len() {
            let max_len = order.min(tokens.len() - start);
            for len in 1..=max_len {
                self.insert_path(&tokens[start..start + len], doc_id);
            }
        }
    }

    fn insert_path(&mut self, window: &[(WordId, CaseMask)], doc_id: u64) -> NodeIdx {
        let mut cur = ROOT;
        for &(id, _) in window {
            cur = self.ensure_child(cur, id);
        }
        let (_, last_case) = *window.last().expect("window is non-empty");
        self.arena[cur].bump_case(last_case, 1);
        self.arena[cur].bump_occurrence(doc_id);
        cur
    }

    /// Places a fully-specified ARPA entry at `seq`; intermediate nodes are
    /// created with placeholder weight `ZERO` (spec `insert_arpa`).
    pub fn insert_arpa(&mut self, seq: &[WordId], log_p: f64, log_bow: f64) -> Result<()> {
        if seq.is_empty() {
            return Err(ArpaError::Input("insert_arpa: empty sequence".into()));
        }
        if seq.len() > self.order as usize {
            return Err(ArpaError::Input(format!(
                "insert_arpa: sequence length {} exceeds order {}",
                seq.len(),
                self.order
            )));
        }
        let mut cur = ROOT;
        for &id in seq {
            cur = self.ensure_child(cur, id);
        }
        self.arena[cur].weight = log_p;
        self.arena[cur].backoff = log_bow;
        Ok(())
    }

    /// Sets `weight = 0` on the terminal node along `seq` (spec `delete`):
    /// a structural tombstone, not an arena removal, so lower-order
    /// fallbacks through this node keep working.
    pub fn delete(&mut self, seq: &[WordId]) -> Result<bool> {
        if seq.is_empty() {
            return Err(ArpaError::Input("delete: empty sequence".into()));
        }
        match self.find_path(seq) {
            Some(idx) => {
                self.arena[idx].weight = 0.0;
                self.level_cache.invalidate();
                Ok(true)
            }
            None => {
                self.logger.warning("delete: no such context");
                Ok(false)
            }
        }
    }

    /// Adds `delta` to the terminal node's weight (spec `increment`).
    pub fn increment(&mut self, seq: &[WordId], delta: f64) -> Result<bool> {
        if seq.is_empty() {
            return Err(ArpaError::Input("increment: empty sequence".into()));
        }
        match self.find_path(seq) {
            Some(idx) => {
                self.arena[idx].weight += delta;
                Ok(true)
            }
            None => {
                self.logger.warning("increment: no such context");
                Ok(false)
            }
        }
    }

    /// Recursive back-off probability lookup: if `context ++ [w]` exists and
    /// is a real word, return its weight; otherwise add `backoff(context)`
    /// to the same lookup one order down (spec `backoff`, §4.1/§4.5).
    pub(crate) fn backoff_prob(&self, context: &[WordId], w: WordId) -> f64 {
        match self.find_path(context) {
            Some(ctx_idx) => {
                if let Some(child_idx) = self.child(ctx_idx, w) {
                    if self.is_word(child_idx) {
                        return self.arena[child_idx].weight;
                    }
                }
                if context.is_empty() {
                    ZERO
                } else {
                    self.arena[ctx_idx].backoff + self.backoff_prob(&context[1..], w)
                }
            }
            None if context.is_empty() => ZERO,
            None => self.backoff_prob(&context[1..], w),
        }
    }

    /// Replaces `seq_old` with `seq_new` subject to the §4.1.2 rules.
    /// Returns `Ok(false)` (no mutation) when the replace is disallowed.
    pub fn replace(&mut self, seq_old: &[WordId], seq_new: &[(WordId, CaseMask)]) -> Result<bool> {
        if seq_old.is_empty() || seq_new.is_empty() {
            return Err(ArpaError::Input("replace: empty sequence".into()));
        }
        if seq_old.len() != seq_new.len() {
            return Err(ArpaError::Input("replace: mismatched sequence lengths".into()));
        }
        let old_idx = match self.find_path(seq_old) {
            Some(idx) => idx,
            None => {
                self.logger.warning("replace: old context does not exist");
                return Ok(false);
            }
        };

        let l = seq_old.len();
        let seq_new_ids: Vec<WordId> = seq_new.iter().map(|(id, _)| *id).collect();
        let allowed = if l == 1 {
            let node = &self.arena[old_idx];
            node.children.is_empty()
                || (node.children.len() == 1 && node.children.contains_key(&ID_END))
        } else {
            self.variants_are_free(seq_old, &seq_new_ids)
        };

        if !allowed {
            if l == self.order as usize {
                self.fake_replace(old_idx, seq_new);
                return Ok(true);
            }
            self.logger.warning("replace: conflicting context variant, rejected");
            return Ok(false);
        }

        let parent = self.arena[old_idx].parent.expect("non-root node has a parent");
        let (new_id, new_case) = *seq_new.last().expect("seq_new is non-empty");
        self.migrate_node(old_idx, parent, new_id, new_case);
        Ok(true)
    }

    /// Enumerates the suffixes of `seq_new` of length `min(L, N-1)` and
    /// checks none of them already live under a different lineage than the
    /// corresponding suffix of `seq_old` (spec §4.1.2 "context variants").
    fn variants_are_free(&self, seq_old: &[WordId], seq_new: &[WordId]) -> bool {
        let variant_len = seq_old.len().min(self.order.saturating_sub(1) as usize).max(1);
        if variant_len > seq_new.len() {
            return true;
        }
        for start in 0..=(seq_new.len() - variant_len) {
            let variant = &seq_new[start..start + variant_len];
            if let Some(existing) = self.find_path(variant) {
                let old_start = start.min(seq_old.len().saturating_sub(variant_len));
                let old_variant = &seq_old[old_start..(old_start + variant_len).min(seq_old.len())];
                if self.find_path(old_variant) != Some(existing) {
                    return false;
                }
            }
        }
        true
    }

    /// Maximal-order fallback: insert the new path carrying the old
    /// weight/backoff, zero the original terminal, and copy its children
    /// across so deeper lookups keep working (spec §4.1.2 "fake replace").
    fn fake_replace(&mut self, old_idx: NodeIdx, seq_new: &[(WordId, CaseMask)]) {
        let parent = self.arena[old_idx].parent.expect("non-root node has a parent");
        let (new_id, new_case) = *seq_new.last().expect("seq_new is non-empty");
        self.migrate_node(old_idx, parent, new_id, new_case);
    }

    fn migrate_node(&mut self, old_idx: NodeIdx, parent: NodeIdx, new_id: WordId, new_case: CaseMask) {
        let (oc, dc, idd, weight, backoff, children) = {
            let n = &self.arena[old_idx];
            (n.oc, n.dc, n.idd, n.weight, n.backoff, n.children.clone())
        };
        let new_idx = self.ensure_child(parent, new_id);
        {
            let n = &mut self.arena[new_idx];
            n.oc = oc;
            n.dc = dc;
            n.idd = idd;
            n.weight = weight;
            n.backoff = backoff;
            let case_count = if oc <= 1 { 1 } else { (oc + 1) / 2 }; // ceil(oc/2)
            n.uppers.clear();
            n.bump_case(new_case, case_count);
        }
        if new_idx != old_idx {
            for (child_id, child_idx) in children {
                self.reparent_subtree(child_idx, new_idx, child_id);
            }
            self.arena[old_idx].weight = 0.0;
            self.arena[old_idx].children.clear();
        }
        self.level_cache.invalidate();
    }

    fn reparent_subtree(&mut self, idx: NodeIdx, new_parent: NodeIdx, id: WordId) {
        let (oc, dc, idd, weight, backoff, uppers, children) = {
            let n = &self.arena[idx];
            (n.oc, n.dc, n.idd, n.weight, n.backoff, n.uppers.clone(), n.children.clone())
        };
        let new_idx = self.ensure_child(new_parent, id);
        {
            let n = &mut self.arena[new_idx];
            n.oc = oc;
            n.dc = dc;
            n.idd = idd;
            n.weight = weight;
            n.backoff = backoff;
            n.uppers = uppers;
        }
        for (child_id, child_idx) in children {
            self.reparent_subtree(child_idx, new_idx, child_id);
        }
    }

    pub(crate) fn find_path_from_pub(&self, start: NodeIdx, seq: &[WordId]) -> Option<NodeIdx> {
        self.find_path_from(start, seq)
    }

    pub(crate) fn invalidate_level_cache(&self) {
        self.level_cache.invalidate();
    }

    /// Public entry point to the recursive back-off lookup, used by the
    /// mixer to evaluate `P(w | context)` against a second, independently
    /// owned trie (spec §4.8).
    pub fn lookup(&self, context: &[WordId], w: WordId) -> f64 {
        self.backoff_prob(context, w)
    }

    /// Raises `order` if `new_order` is larger, never lowers it. Used by the
    /// backward mixer when the other model has longer n-grams than this one
    /// (spec §4.8 "expands A's order if B's longer n-grams appear").
    pub fn raise_order(&mut self, new_order: u8) {
        if new_order > self.order {
            self.order = new_order;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wordid::{ID_END, ID_START};

    fn seq(ids: &[WordId]) -> Vec<(WordId, CaseMask)> {
        ids.iter().map(|&id| (id, 0)).collect()
    }

    #[test]
    fn insert_sequence_counts_every_contiguous_window_up_to_order() {
        let mut trie = Trie::new(2);
        trie.insert_sequence(&seq(&[ID_START, 100, 101, ID_END]), 0);
        // unigram counts
        let a = trie.child(ROOT, 100).unwrap();
        assert_eq!(trie.node(a).oc, 1);
        let b_path = trie.find_path(&[100, 101]).unwrap();
        assert_eq!(trie.node(b_path).oc, 1);
        // order is 2, so trigram (start,100,101) must not exist
        assert!(trie.find_path(&[ID_START, 100, 101]).is_none());
    }

    #[test]
    fn unk_splits_the_sequence_and_is_only_counted_at_root() {
        use crate::wordid::ID_UNK;
        let mut trie = Trie::new(3);
        trie.insert_sequence(&seq(&[ID_START, 200, ID_UNK, 201, ID_END]), 0);
        assert!(trie.find_path(&[200, 201]).is_none());
        let unk_idx = trie.child(ROOT, ID_UNK).unwrap();
        assert_eq!(trie.node(unk_idx).oc, 1);
        let x_idx = trie.child(ROOT, 200).unwrap();
        assert_eq!(trie.node(x_idx).oc, 1);
    }

    #[test]
    fn dc_increments_once_per_document() {
        let mut trie = Trie::new(1);
        trie.insert_sequence(&seq(&[300]), 7);
        trie.insert_sequence(&seq(&[300]), 7);
        trie.insert_sequence(&seq(&[300]), 8);
        let idx = trie.child(ROOT, 300).unwrap();
        assert_eq!(trie.node(idx).oc, 3);
        assert_eq!(trie.node(idx).dc, 2);
    }

    #[test]
    fn unigrams_excludes_only_the_root() {
        let mut trie = Trie::new(1);
        assert_eq!(trie.unigrams(), 0);
        trie.insert_sequence(&seq(&[1]), 0);
        trie.insert_sequence(&seq(&[2]), 0);
        assert_eq!(trie.unigrams(), 2);
    }

    #[test]
    fn insert_arpa_then_context_ok() {
        let mut trie = Trie::new(2);
        trie.insert_arpa(&[5], -0.3, -0.1).unwrap();
        trie.insert_arpa(&[5, 6], -0.7, 0.0).unwrap();
        assert!(trie.context_ok(&[5]));
        assert!(trie.context_ok(&[5, 6]));
        assert!(!trie.context_ok(&[5, 9]));
    }

    #[test]
    fn delete_sets_weight_to_zero_but_keeps_the_node() {
        let mut trie = Trie::new(1);
        trie.insert_arpa(&[5], -0.3, 0.0).unwrap();
        assert!(trie.delete(&[5]).unwrap());
        let idx = trie.find_path(&[5]).unwrap();
        assert_eq!(trie.node(idx).weight, 0.0);
        assert!(!trie.is_word(idx));
    }

    #[test]
    fn delete_missing_context_is_a_warned_no_op() {
        let mut trie = Trie::new(1);
        assert!(!trie.delete(&[42]).unwrap());
    }

    #[test]
    fn replace_unigram_leaf_succeeds_and_migrates_case() {
        let mut trie = Trie::new(1);
        trie.insert_sequence(&seq(&[10]), 0);
        trie.insert_sequence(&seq(&[10]), 1);
        let changed = trie.replace(&[10], &[(11, 2)]).unwrap();
        assert!(changed);
        let new_idx = trie.find_path(&[11]).unwrap();
        assert_eq!(trie.node(new_idx).oc, 2);
        assert_eq!(trie.node(new_idx).dominant_case(), 2);
    }

    #[test]
    fn replace_unigram_with_children_other_than_end_is_rejected() {
        let mut trie = Trie::new(2);
        trie.insert_sequence(&seq(&[10, 20]), 0);
        assert!(!trie.replace(&[10], &[(11, 0)]).unwrap());
    }

    #[test]
    fn replace_round_trip_restores_oc_dc_uppers() {
        // A single occurrence is the case where migrate_node's case-count
        // heuristic (ceil(oc/2)) reconstructs the exact original histogram;
        // with oc > 1 the round trip only preserves oc and dc, not uppers,
        // since a bare `replace` call carries just one target case.
        let mut trie = Trie::new(1);
        trie.insert_sequence(&[(10, 2)], 0);
        let before_idx = trie.find_path(&[10]).unwrap();
        let (oc, dc, uppers) = {
            let node = trie.node(before_idx);
            (node.oc, node.dc, node.uppers.clone())
        };

        assert!(trie.replace(&[10], &[(11, 2)]).unwrap());
        assert!(trie.replace(&[11], &[(10, 2)]).unwrap());

        let after_idx = trie.find_path(&[10]).unwrap();
        let node = trie.node(after_idx);
        assert_eq!(node.oc, oc);
        assert_eq!(node.dc, dc);
        assert_eq!(node.uppers, uppers);
    }

    #[test]
    fn level_cache_invalidates_on_insert() {
        let mut trie = Trie::new(2);
        trie.insert_sequence(&seq(&[1]), 0);
        assert_eq!(trie.level(0).len(), 1); // root only
        trie.insert_sequence(&seq(&[2]), 0);
        let depth1 = trie.level(1);
        assert_eq!(depth1.len(), 2);
    }

    #[test]
    fn backoff_prob_falls_back_through_missing_contexts() {
        let mut trie = Trie::new(2);
        trie.insert_arpa(&[5], -0.5, -0.2).unwrap();
        // no bigram (9,5) exists: backoff_prob should fall back to unigram
        let p = trie.backoff_prob(&[9], 5);
        assert_eq!(p, -0.5);
    }

    #[test]
    fn is_words_false_once_a_deleted_ancestor_is_hit() {
        let mut trie = Trie::new(2);
        trie.insert_sequence(&seq(&[1, 2]), 0);
        let bigram_idx = trie.find_path(&[1, 2]).unwrap();
        trie.delete(&[1]).unwrap();
        assert!(!trie.is_words(bigram_idx));
    }
}
