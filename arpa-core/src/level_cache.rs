//! Lazily materialised, level-indexed view over the trie (spec §4.2).
//!
//! `get(g)` returns every node whose children are the n-grams of order `g`,
//! i.e. every node at depth `g - 1`. Built depth-first on first access and
//! kept behind a `RefCell` so it can be populated from `&self` call sites
//! (spec §9: "mutable caches behind a const façade") — correct only because
//! the engine is single-threaded (spec §5).

use std::cell::RefCell;

use crate::node::NodeIdx;

#[derive(Debug, Default)]
pub struct LevelCache {
    /// `levels[g]` holds the nodes at depth `g`, i.e. the contexts for
    /// n-grams of order `g + 1`. Empty until first populated.
    levels: RefCell<Vec<Vec<NodeIdx>>>,
}

impl LevelCache {
    pub fn new() -> Self {
        LevelCache { levels: RefCell::new(Vec::new()) }
    }

    /// Drop every cached level. Any structural mutator must call this before
    /// returning (spec invariant 6).
    pub fn invalidate(&self) {
        self.levels.borrow_mut().clear();
    }

    /// Nodes at depth `g` (the contexts whose children are n-grams of order
    /// `g + 1`), building the cache up to depth `g` via `walk` if necessary.
    ///
    /// `walk` must perform one full depth-first traversal of the arena and
    /// report `(node_idx, depth)` for every node including the root
    /// (depth 0); the cache consumes that stream once per miss.
    pub fn get(&self, depth: usize, walk: impl FnOnce() -> Vec<(NodeIdx, usize)>) -> Vec<NodeIdx> {
        {
            let levels = self.levels.borrow();
            if depth < levels.len() {
                return levels[depth].clone();
            }
        }
        let traversal = walk();
        let max_depth = traversal.iter().map(|(_, d)| *d).max().unwrap_or(0);
        let mut levels = vec![Vec::new(); max_depth + 1];
        for (idx, d) in traversal {
            levels[d].push(idx);
        }
        let mut cache = self.levels.borrow_mut();
        *cache = levels;
        cache.get(depth).cloned().unwrap_or_default()
    }
}
