//! Discount family (component C): a polymorphic discounting interface with
//! the capability set `{prepare, estimate, discount, lower_weight,
//! no_discount}` (spec §4.3).
//!
//! The source dispatches through virtual methods; this keeps the same five
//! operations but as an enum-of-variants with a shared trait, so call sites
//! stay monomorphic (spec §9 "Polymorphic discounts").

use std::collections::{HashMap, HashSet};

use crate::node::EPSILON;
use crate::trie::Trie;
use crate::wordid::WordId;

/// The five-operation contract every discount algorithm implements.
pub trait DiscountOps {
    /// True iff this level should be left untouched.
    fn no_discount(&self, gram: u8) -> bool;
    /// Rewrites `oc` for KN-style adjusted counts. No-op for algorithms that
    /// don't need it; must be idempotent per level.
    fn prepare(&mut self, _trie: &mut Trie, _gram: u8) {}
    /// Computes per-level constants. `false` means discounting is disabled
    /// at this level (caller falls back to `discount() == 1.0`).
    fn estimate(&mut self, trie: &Trie, gram: u8) -> bool;
    /// Multiplicative factor in `[0, 1]` applied to `count / total`.
    fn discount(&self, gram: u8, count: u64, total: u64, observed: u64) -> f64;
    /// Interpolation weight attached to the back-off distribution.
    fn lower_weight(&self, gram: u8, total: u64, observed: u64, n_ge2: u64, n_ge3: u64) -> f64;
}

fn at(v: &mut Vec<f64>, gram: u8, default: f64) -> &mut f64 {
    let g = gram as usize;
    if v.len() <= g {
        v.resize(g + 1, default);
    }
    &mut v[g]
}

fn get(v: &[f64], gram: u8, default: f64) -> f64 {
    v.get(gram as usize).copied().unwrap_or(default)
}

/// Every n-gram of order `gram` with a real event-bearing child, gathered as
/// the raw `oc` of each valid child across every context of that order.
fn gather_child_counts(trie: &Trie, gram: u8) -> Vec<u64> {
    if gram == 0 {
        return Vec::new();
    }
    let mut counts = Vec::new();
    for ctx in trie.level(gram as usize - 1) {
        for (_, child) in trie.children_sorted(ctx) {
            if trie.is_event(child) {
                counts.push(trie.node(child).oc);
            }
        }
    }
    counts
}

fn count_of_counts(counts: &[u64]) -> HashMap<u64, u64> {
    let mut histogram = HashMap::new();
    for &c in counts {
        *histogram.entry(c).or_insert(0) += 1;
    }
    histogram
}

/// KN-style adjusted count: the number of distinct one-word left-extensions
/// of each order-`gram` n-gram (spec Glossary: "count of distinct
/// lower-order contexts in which an n-gram appears"), grounded on
/// `original_source/src/arpa.cpp::KneserNey::prepare`.
fn adjusted_counts(trie: &Trie, gram: u8) -> HashMap<usize, u64> {
    let mut distinct_heads: HashMap<Vec<WordId>, HashSet<WordId>> = HashMap::new();
    for y in trie.level(gram as usize + 1) {
        let path = trie.path_ids(y);
        if path.len() < 2 {
            continue;
        }
        let head = path[0];
        let suffix = path[1..].to_vec();
        distinct_heads.entry(suffix).or_default().insert(head);
    }
    let mut out = HashMap::new();
    for x in trie.level(gram as usize) {
        let path = trie.path_ids(x);
        let count = distinct_heads.get(&path).map(|s| s.len() as u64).unwrap_or(0);
        out.insert(x, count);
    }
    out
}

// ---------------------------------------------------------------------------
// Good-Turing
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct GoodTuring {
    min_count: Vec<u64>,
    max_count: Vec<u64>,
    coeff: Vec<Vec<f64>>,
}

impl DiscountOps for GoodTuring {
    fn no_discount(&self, gram: u8) -> bool {
        self.max_count.get(gram as usize).copied().unwrap_or(0) == 0
    }

    fn estimate(&mut self, trie: &Trie, gram: u8) -> bool {
        let counts = gather_child_counts(trie, gram);
        let histogram = count_of_counts(&counts);
        let n1 = *histogram.get(&1).unwrap_or(&0);
        if n1 == 0 {
            return false;
        }
        let mut max_count = counts.iter().copied().max().unwrap_or(1).min(7).max(1);
        while max_count > 1 && histogram.get(&(max_count + 1)).copied().unwrap_or(0) == 0 {
            max_count -= 1;
        }
        let n_max1 = histogram.get(&(max_count + 1)).copied().unwrap_or(0) as f64;
        let common_term = ((max_count + 1) as f64 * n_max1) / n1 as f64;
        let mut coeffs = vec![1.0; max_count as usize + 1];
        for k in 1..=max_count {
            let nk = histogram.get(&k).copied().unwrap_or(0) as f64;
            let nk1 = histogram.get(&(k + 1)).copied().unwrap_or(0) as f64;
            if nk == 0.0 {
                coeffs[k as usize] = 1.0;
                continue;
            }
            let coeff0 = (k + 1) as f64 * nk1 / (k as f64 * nk);
            let coeff = (coeff0 - common_term) / (1.0 - common_term);
            coeffs[k as usize] = if !coeff.is_finite() || coeff <= EPSILON || coeff0 > 1.0 {
                1.0
            } else {
                coeff
            };
        }
        let g = gram as usize;
        if self.min_count.len() <= g {
            self.min_count.resize(g + 1, 1);
        }
        self.min_count[g] = 1;
        if self.max_count.len() <= g {
            self.max_count.resize(g + 1, 0);
        }
        self.max_count[g] = max_count;
        if self.coeff.len() <= g {
            self.coeff.resize(g + 1, Vec::new());
        }
        self.coeff[g] = coeffs;
        true
    }

    fn discount(&self, gram: u8, count: u64, _total: u64, _observed: u64) -> f64 {
        let g = gram as usize;
        if count == 0 {
            return 1.0;
        }
        let min_count = self.min_count.get(g).copied().unwrap_or(1);
        let max_count = self.max_count.get(g).copied().unwrap_or(0);
        if count < min_count {
            return 0.0;
        }
        if count > max_count {
            return 1.0;
        }
        self.coeff.get(g).and_then(|c| c.get(count as usize)).copied().unwrap_or(1.0)
    }

    fn lower_weight(&self, _gram: u8, _total: u64, _observed: u64, _n_ge2: u64, _n_ge3: u64) -> f64 {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Const-Discount
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ConstDiscount {
    pub d: f64,
}

impl Default for ConstDiscount {
    fn default() -> Self {
        ConstDiscount { d: 0.5 }
    }
}

impl DiscountOps for ConstDiscount {
    fn no_discount(&self, _gram: u8) -> bool {
        false
    }
    fn estimate(&mut self, _trie: &Trie, _gram: u8) -> bool {
        true
    }
    fn discount(&self, _gram: u8, count: u64, _total: u64, _observed: u64) -> f64 {
        if count == 0 {
            1.0
        } else {
            ((count as f64 - self.d) / count as f64).max(0.0)
        }
    }
    fn lower_weight(&self, _gram: u8, total: u64, observed: u64, _n_ge2: u64, _n_ge3: u64) -> f64 {
        if total == 0 {
            0.0
        } else {
            self.d * observed as f64 / total as f64
        }
    }
}

// ---------------------------------------------------------------------------
// Natural discount
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct NaturalDiscount;

impl DiscountOps for NaturalDiscount {
    fn no_discount(&self, _gram: u8) -> bool {
        false
    }
    fn estimate(&mut self, _trie: &Trie, _gram: u8) -> bool {
        true
    }
    fn discount(&self, _gram: u8, count: u64, total: u64, observed: u64) -> f64 {
        if count == 0 {
            return 1.0;
        }
        let (t, o) = (total as f64, observed as f64);
        let denom = t * (t + 1.0) + 2.0 * o;
        if denom.abs() < EPSILON {
            1.0
        } else {
            (t * (t + 1.0) + o * (1.0 - o)) / denom
        }
    }
    fn lower_weight(&self, _gram: u8, _total: u64, _observed: u64, _n_ge2: u64, _n_ge3: u64) -> f64 {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Add-delta smoothing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AddSmooth {
    pub delta: f64,
    vocab: u64,
}

impl Default for AddSmooth {
    fn default() -> Self {
        AddSmooth { delta: 1.0, vocab: 0 }
    }
}

impl DiscountOps for AddSmooth {
    fn no_discount(&self, _gram: u8) -> bool {
        false
    }
    fn estimate(&mut self, trie: &Trie, _gram: u8) -> bool {
        self.vocab = trie.unigrams() as u64;
        self.vocab > 0
    }
    fn discount(&self, _gram: u8, count: u64, total: u64, _observed: u64) -> f64 {
        if count == 0 || total == 0 {
            return 1.0;
        }
        let numer = 1.0 + self.delta / count as f64;
        let denom = 1.0 + (self.vocab as f64 * self.delta) / total as f64;
        if denom.abs() < EPSILON {
            1.0
        } else {
            numer / denom
        }
    }
    fn lower_weight(&self, _gram: u8, _total: u64, _observed: u64, _n_ge2: u64, _n_ge3: u64) -> f64 {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Witten-Bell
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct WittenBell;

impl DiscountOps for WittenBell {
    fn no_discount(&self, _gram: u8) -> bool {
        false
    }
    fn estimate(&mut self, _trie: &Trie, _gram: u8) -> bool {
        true
    }
    fn discount(&self, _gram: u8, count: u64, total: u64, observed: u64) -> f64 {
        if count == 0 {
            return 1.0;
        }
        let denom = (total + observed) as f64;
        if denom.abs() < EPSILON {
            1.0
        } else {
            total as f64 / denom
        }
    }
    fn lower_weight(&self, _gram: u8, total: u64, observed: u64, _n_ge2: u64, _n_ge3: u64) -> f64 {
        let denom = (total + observed) as f64;
        if denom.abs() < EPSILON {
            0.0
        } else {
            observed as f64 / denom
        }
    }
}

// ---------------------------------------------------------------------------
// (Modified) Kneser-Ney
// ---------------------------------------------------------------------------

/// Covers both plain Kneser-Ney and Modified KN, selected by `modified`,
/// mirroring `original_source/src/arpa.cpp::KneserNey::init(modified, ..)`.
#[derive(Debug, Default, Clone)]
pub struct KneserNey {
    pub modified: bool,
    prepared: Vec<bool>,
    d1: Vec<f64>,
    d2: Vec<f64>,
    d3plus: Vec<f64>,
}

impl DiscountOps for KneserNey {
    fn no_discount(&self, _gram: u8) -> bool {
        false
    }

    fn prepare(&mut self, trie: &mut Trie, gram: u8) {
        let g = gram as usize;
        if self.prepared.len() <= g {
            self.prepared.resize(g + 1, false);
        }
        if self.prepared[g] || gram as usize >= trie.order() as usize {
            return;
        }
        for (idx, count) in adjusted_counts(trie, gram) {
            trie.node_mut(idx).oc = count;
        }
        self.prepared[g] = true;
    }

    fn estimate(&mut self, trie: &Trie, gram: u8) -> bool {
        let counts = gather_child_counts(trie, gram);
        let histogram = count_of_counts(&counts);
        let n1 = histogram.get(&1).copied().unwrap_or(0) as f64;
        let n2 = histogram.get(&2).copied().unwrap_or(0) as f64;
        if n1 == 0.0 || n2 == 0.0 {
            return false;
        }
        let y = n1 / (n1 + 2.0 * n2);
        let g = gram as usize;
        if !self.modified {
            *at(&mut self.d1, gram, 0.0) = y; // single discount D, reuse d1 slot
            return true;
        }
        let n3 = histogram.get(&3).copied().unwrap_or(0) as f64;
        let n4 = histogram.get(&4).copied().unwrap_or(0) as f64;
        if n3 == 0.0 || n4 == 0.0 {
            return false;
        }
        let d1 = 1.0 - 2.0 * y * n2 / n1;
        let d2 = 2.0 - 3.0 * y * n3 / n2;
        let d3plus = 3.0 - 4.0 * y * n4 / n3;
        if d1 < 0.0 || d2 < 0.0 || d3plus < 0.0 {
            return false;
        }
        if self.d1.len() <= g {
            self.d1.resize(g + 1, 0.0);
        }
        if self.d2.len() <= g {
            self.d2.resize(g + 1, 0.0);
        }
        if self.d3plus.len() <= g {
            self.d3plus.resize(g + 1, 0.0);
        }
        self.d1[g] = d1;
        self.d2[g] = d2;
        self.d3plus[g] = d3plus;
        true
    }

    fn discount(&self, gram: u8, count: u64, _total: u64, _observed: u64) -> f64 {
        if count == 0 {
            return 1.0;
        }
        if !self.modified {
            let d = get(&self.d1, gram, 0.0);
            return ((count as f64 - d) / count as f64).max(0.0);
        }
        let d = match count {
            1 => get(&self.d1, gram, 0.0),
            2 => get(&self.d2, gram, 0.0),
            _ => get(&self.d3plus, gram, 0.0),
        };
        ((count as f64 - d) / count as f64).max(0.0)
    }

    fn lower_weight(&self, gram: u8, total: u64, observed: u64, n_ge2: u64, n_ge3: u64) -> f64 {
        if total == 0 {
            return 0.0;
        }
        if !self.modified {
            let d = get(&self.d1, gram, 0.0);
            return d * observed as f64 / total as f64;
        }
        let d1 = get(&self.d1, gram, 0.0);
        let d2 = get(&self.d2, gram, 0.0);
        let d3plus = get(&self.d3plus, gram, 0.0);
        (d1 * (observed.saturating_sub(n_ge2)) as f64
            + d2 * (n_ge2.saturating_sub(n_ge3)) as f64
            + d3plus * n_ge3 as f64)
            / total as f64
    }
}

// ---------------------------------------------------------------------------
// Enum-of-variants dispatch
// ---------------------------------------------------------------------------

/// The discount family used by a single estimation run. An enum rather than
/// `Box<dyn DiscountOps>` keeps dispatch monomorphic (spec §9).
#[derive(Debug, Clone)]
pub enum Discount {
    GoodTuring(GoodTuring),
    ConstDiscount(ConstDiscount),
    NaturalDiscount(NaturalDiscount),
    AddSmooth(AddSmooth),
    WittenBell(WittenBell),
    KneserNey(KneserNey),
}

impl Discount {
    pub fn good_turing() -> Self {
        Discount::GoodTuring(GoodTuring::default())
    }
    pub fn const_discount(d: f64) -> Self {
        Discount::ConstDiscount(ConstDiscount { d })
    }
    pub fn natural() -> Self {
        Discount::NaturalDiscount(NaturalDiscount)
    }
    pub fn add_smooth(delta: f64) -> Self {
        Discount::AddSmooth(AddSmooth { delta, vocab: 0 })
    }
    pub fn witten_bell() -> Self {
        Discount::WittenBell(WittenBell)
    }
    pub fn kneser_ney() -> Self {
        Discount::KneserNey(KneserNey { modified: false, ..Default::default() })
    }
    pub fn modified_kneser_ney() -> Self {
        Discount::KneserNey(KneserNey { modified: true, ..Default::default() })
    }
}

impl DiscountOps for Discount {
    fn no_discount(&self, gram: u8) -> bool {
        match self {
            Discount::GoodTuring(d) => d.no_discount(gram),
            Discount::ConstDiscount(d) => d.no_discount(gram),
            Discount::NaturalDiscount(d) => d.no_discount(gram),
            Discount::AddSmooth(d) => d.no_discount(gram),
            Discount::WittenBell(d) => d.no_discount(gram),
            Discount::KneserNey(d) => d.no_discount(gram),
        }
    }

    fn prepare(&mut self, trie: &mut Trie, gram: u8) {
        match self {
            Discount::GoodTuring(d) => d.prepare(trie, gram),
            Discount::ConstDiscount(d) => d.prepare(trie, gram),
            Discount::NaturalDiscount(d) => d.prepare(trie, gram),
            Discount::AddSmooth(d) => d.prepare(trie, gram),
            Discount::WittenBell(d) => d.prepare(trie, gram),
            Discount::KneserNey(d) => d.prepare(trie, gram),
        }
    }

    fn estimate(&mut self, trie: &Trie, gram: u8) -> bool {
        match self {
            Discount::GoodTuring(d) => d.estimate(trie, gram),
            Discount::ConstDiscount(d) => d.estimate(trie, gram),
            Discount::NaturalDiscount(d) => d.estimate(trie, gram),
            Discount::AddSmooth(d) => d.estimate(trie, gram),
            Discount::WittenBell(d) => d.estimate(trie, gram),
            Discount::KneserNey(d) => d.estimate(trie, gram),
        }
    }

    fn discount(&self, gram: u8, count: u64, total: u64, observed: u64) -> f64 {
        match self {
            Discount::GoodTuring(d) => d.discount(gram, count, total, observed),
            Discount::ConstDiscount(d) => d.discount(gram, count, total, observed),
            Discount::NaturalDiscount(d) => d.discount(gram, count, total, observed),
            Discount::AddSmooth(d) => d.discount(gram, count, total, observed),
            Discount::WittenBell(d) => d.discount(gram, count, total, observed),
            Discount::KneserNey(d) => d.discount(gram, count, total, observed),
        }
    }

    fn lower_weight(&self, gram: u8, total: u64, observed: u64, n_ge2: u64, n_ge3: u64) -> f64 {
        match self {
            Discount::GoodTuring(d) => d.lower_weight(gram, total, observed, n_ge2, n_ge3),
            Discount::ConstDiscount(d) => d.lower_weight(gram, total, observed, n_ge2, n_ge3),
            Discount::NaturalDiscount(d) => d.lower_weight(gram, total, observed, n_ge2, n_ge3),
            Discount::AddSmooth(d) => d.lower_weight(gram, total, observed, n_ge2, n_ge3),
            Discount::WittenBell(d) => d.lower_weight(gram, total, observed, n_ge2, n_ge3),
            Discount::KneserNey(d) => d.lower_weight(gram, total, observed, n_ge2, n_ge3),
        }
    }
}
