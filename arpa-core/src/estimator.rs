//! Estimator (component D, spec §4.4): turns raw `oc` counts into log10
//! probabilities, level by level, calling into the active [`Discount`] and
//! the [`normalizer`] after each level is fully weighted.

use crate::discount::{Discount, DiscountOps};
use crate::error::{ArpaError, Result};
use crate::node::{NodeIdx, EPSILON, ZERO};
use crate::normalizer;
use crate::trie::{Trie, ROOT};
use crate::wordid::WordId;

/// Per-context accumulator gathered before the probability loop runs.
struct ContextStats {
    total: u64,
    observed: u64,
    n_ge2: u64,
    n_ge3: u64,
}

fn gather_stats(trie: &Trie, h: NodeIdx) -> ContextStats {
    let mut stats = ContextStats { total: 0, observed: 0, n_ge2: 0, n_ge3: 0 };
    for (_, child) in trie.children_sorted(h) {
        if !trie.is_event(child) {
            continue;
        }
        let oc = trie.node(child).oc;
        stats.total += oc;
        stats.observed += 1;
        if oc >= 2 {
            stats.n_ge2 += 1;
        }
        if oc >= 3 {
            stats.n_ge3 += 1;
        }
    }
    stats
}

/// Runs the probability loop once over `h`'s children, returning the summed
/// probability mass actually assigned (used for the Stolcke escape check).
fn probability_loop(
    trie: &mut Trie,
    discount: &Discount,
    h: NodeIdx,
    gram: u8,
    stats: &ContextStats,
    interpolate: bool,
) -> f64 {
    let path = trie.path_ids(h);
    let tail: &[WordId] = if path.is_empty() { &path } else { &path[1..] };
    let children = trie.children_sorted(h);
    let mut sum_prob = 0.0;

    for (id, child) in children {
        if !trie.is_event(child) {
            trie.node_mut(child).weight = ZERO;
            continue;
        }
        let oc = trie.node(child).oc;
        let disc = if discount.no_discount(gram) {
            1.0
        } else {
            discount.discount(gram, oc, stats.total, stats.observed)
        };
        let mut p = disc * oc as f64 / stats.total as f64;
        if interpolate {
            let lambda = discount.lower_weight(gram, stats.total, stats.observed, stats.n_ge2, stats.n_ge3);
            let lower_prob = if gram > 1 {
                trie.backoff_prob(tail, id)
            } else {
                -(trie.unigrams() as f64).log10()
            };
            p += lambda * 10f64.powf(lower_prob);
        }
        if disc.is_normal() {
            sum_prob += p;
            trie.node_mut(child).weight = p.log10();
        } else {
            // disc collapsed to 0 (or otherwise non-normal): treat as a
            // structural "not a real event" slot rather than a probability.
            trie.node_mut(child).weight = 0.0;
        }
    }
    sum_prob
}

/// Processes one context `h` at level `gram`: gathers stats, runs the
/// probability loop, and applies the Stolcke escape retry (spec §4.4, at
/// most one retry per the §9 open-question resolution).
fn process_context(trie: &mut Trie, discount: &Discount, h: NodeIdx, gram: u8, mut interpolate: bool) {
    let mut stats = gather_stats(trie, h);
    if stats.total == 0 {
        return;
    }
    let mut attempt = 0;
    loop {
        let sum_prob = probability_loop(trie, discount, h, gram, &stats, interpolate);
        let escapes = !discount.no_discount(gram)
            && stats.total > 0
            && stats.observed < trie.unigrams() as u64
            && sum_prob > 1.0 - EPSILON;
        if escapes && attempt < 1 {
            attempt += 1;
            if interpolate {
                interpolate = false;
            } else {
                stats.total += 1;
            }
            continue;
        }
        if escapes {
            trie.logger().warning("estimator: backoff mass left after retry, keeping weights");
        }
        break;
    }
}

/// Trains `trie` with `discount` across every level `1..=order` (spec §4.4).
/// Returns `Fatal` if `estimate(g)` fails at a level where the algorithm is
/// not `no_discount`.
pub fn train(trie: &mut Trie, discount: &mut Discount) -> Result<()> {
    if trie.unigrams() == 0 || trie.options().not_train() {
        return Ok(());
    }
    let interpolate_opt = trie.options().interpolate();
    for gram in 1..=trie.order() {
        if !discount.no_discount(gram) {
            discount.prepare(trie, gram);
            if !discount.estimate(trie, gram) {
                trie.logger().warning(&format!("estimator: discount estimate failed at order {gram}"));
                return Err(ArpaError::Fatal(format!("estimate({gram}) failed and discount is not no_discount")));
            }
        }
        let contexts: Vec<NodeIdx> = if gram == 1 { vec![ROOT] } else { trie.level(gram as usize - 1) };
        for h in contexts {
            process_context(trie, discount, h, gram, interpolate_opt);
        }
        normalizer::normalize_level(trie, gram as usize - 1);
    }
    crate::fixup::fixup_probs(trie);
    Ok(())
}
