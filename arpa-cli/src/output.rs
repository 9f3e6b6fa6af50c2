//! Terminal pretty-printer for model summaries, grounded in
//! `vibecheck-cli/src/output.rs`'s `format_pretty` (bold labels, dimmed
//! secondary stats, a colored bar per measured quantity).

use colored::Colorize;
use serde::Serialize;

use arpa_core::trie::Trie;

/// One line per n-gram order: `order, count, zero-weight holes`.
#[derive(Serialize)]
pub struct ModelSummary {
    pub order: u8,
    pub counts: Vec<usize>,
    pub unigrams: usize,
}

impl ModelSummary {
    pub fn of(trie: &Trie) -> Self {
        let order = trie.order();
        let counts = (1..=order)
            .map(|g| {
                trie.level(g as usize - 1)
                    .into_iter()
                    .flat_map(|h| trie.children_sorted(h))
                    .filter(|&(_, c)| trie.is_word(c))
                    .count()
            })
            .collect();
        ModelSummary { order, counts, unigrams: trie.unigrams() }
    }
}

/// Renders a [`ModelSummary`] with terminal colors.
pub fn format_pretty(summary: &ModelSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {}\n", "Order:".bold(), summary.order));
    out.push_str(&format!("{} {}\n", "Vocabulary:".dimmed(), summary.unigrams));
    out.push_str(&format!("\n{}\n", "N-gram counts:".bold()));

    let max = summary.counts.iter().copied().max().unwrap_or(1).max(1);
    for (i, &count) in summary.counts.iter().enumerate() {
        let gram = i + 1;
        let bar_len = (count * 30 / max).max(if count > 0 { 1 } else { 0 });
        let bar = "█".repeat(bar_len);
        let color = match gram {
            1 => "yellow",
            2 => "cyan",
            3 => "green",
            _ => "magenta",
        };
        out.push_str(&format!("  {:>2}-gram  {} {}\n", gram, bar.color(color), count));
    }
    out
}

/// Plain-text rendering (no ANSI), for non-terminal output.
pub fn format_text(summary: &ModelSummary) -> String {
    let mut out = format!("order={} vocabulary={}\n", summary.order, summary.unigrams);
    for (i, &count) in summary.counts.iter().enumerate() {
        out.push_str(&format!("{}-gram: {}\n", i + 1, count));
    }
    out
}

/// Machine-readable rendering, for piping into other tools.
pub fn format_json(summary: &ModelSummary) -> String {
    serde_json::to_string_pretty(summary).expect("summary should be serializable")
}
