use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::output::{format_pretty, ModelSummary};
use crate::vocabulary::Vocabulary;

/// Prunes the ARPA model at `input` with threshold `theta` down to
/// `min_gram` (spec §4.7) and writes the result to `output`.
pub fn run(input: &Path, output: &Path, theta: f64, min_gram: u8) -> Result<()> {
    let mut vocab = Vocabulary::new();
    let text = fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))?;
    vocab.prime_from_arpa(&text);

    let mut trie = arpa_core::from_arpa(&text, &vocab)?;
    let before = ModelSummary::of(&trie);

    arpa_core::pruner::prune(&mut trie, theta, min_gram);

    let after = ModelSummary::of(&trie);
    let out_text = arpa_core::to_arpa(&trie, &vocab, None);
    fs::write(output, out_text).with_context(|| format!("failed to write {}", output.display()))?;

    println!("before:\n{}", format_pretty(&before));
    println!("after:\n{}", format_pretty(&after));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prune_shrinks_or_preserves_the_model() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("model.arpa");
        fs::write(
            &input,
            "\\data\\\nngram 1=2\nngram 2=1\n\n\\1-grams:\n-0.301030\ta\t-0.100000\n-0.301030\tb\n\n\\2-grams:\n-0.100000\ta b\n\n\\end\\\n",
        )
        .unwrap();
        let output = dir.path().join("pruned.arpa");
        run(&input, &output, 100.0, 0).unwrap();
        assert!(fs::read_to_string(&output).unwrap().contains("\\data\\"));
    }
}
