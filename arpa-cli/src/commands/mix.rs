use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::vocabulary::Vocabulary;

/// Mixing policies exposed on the command line, named exactly as spec §4.8
/// names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Linear,
    Backward,
    LogLinear,
    Bayes,
}

impl Policy {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "linear" => Ok(Policy::Linear),
            "backward" => Ok(Policy::Backward),
            "loglinear" => Ok(Policy::LogLinear),
            "bayes" => Ok(Policy::Bayes),
            other => anyhow::bail!("unknown mix policy: {other} (expected linear, backward, loglinear, bayes)"),
        }
    }
}

/// Mixes `primary` with `secondary` at weight `lambda` (spec §4.8) and
/// writes the result to `output`. Both ARPA files are parsed against a
/// single shared [`Vocabulary`] so word-ids line up across models.
pub fn run(primary: &Path, secondary: &Path, output: &Path, policy: Policy, lambda: f64) -> Result<()> {
    let mut vocab = Vocabulary::new();
    let primary_text = fs::read_to_string(primary).with_context(|| format!("failed to read {}", primary.display()))?;
    let secondary_text =
        fs::read_to_string(secondary).with_context(|| format!("failed to read {}", secondary.display()))?;

    // First pass over both files interns every surface word the shared
    // vocabulary doesn't already know.
    vocab.prime_from_arpa(&primary_text);
    vocab.prime_from_arpa(&secondary_text);

    let mut a = arpa_core::from_arpa(&primary_text, &vocab)?;
    let b = arpa_core::from_arpa(&secondary_text, &vocab)?;

    match policy {
        Policy::Linear => arpa_core::mixer::linear_mix(&mut a, &b, lambda),
        Policy::Backward => arpa_core::mixer::backward_mix(&mut a, &b, lambda),
        Policy::LogLinear => arpa_core::mixer::loglinear_mix(&mut a, lambda, &[(&b, 1.0 - lambda)]),
        Policy::Bayes => arpa_core::mixer::bayes_mix(&mut a, lambda, &[(&b, 1.0 - lambda)], 2, 1.0),
    }

    let text = arpa_core::to_arpa(&a, &vocab, None);
    fs::write(output, text).with_context(|| format!("failed to write {}", output.display()))?;
    println!("mixed {} + {} (λ={lambda}) -> {}", primary.display(), secondary.display(), output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_parse_accepts_known_names() {
        assert_eq!(Policy::parse("linear").unwrap(), Policy::Linear);
        assert_eq!(Policy::parse("bayes").unwrap(), Policy::Bayes);
        assert!(Policy::parse("nope").is_err());
    }

    #[test]
    fn mixes_two_unigram_models_linearly() {
        let dir = tempfile::tempdir().unwrap();
        let m1 = dir.path().join("m1.arpa");
        let m2 = dir.path().join("m2.arpa");
        fs::write(&m1, "\\data\\\nngram 1=1\n\n\\1-grams:\n-0.045757\tx\n\n\\end\\\n").unwrap();
        fs::write(&m2, "\\data\\\nngram 1=1\n\n\\1-grams:\n-1.000000\tx\n\n\\end\\\n").unwrap();
        let out = dir.path().join("mixed.arpa");
        run(&m1, &m2, &out, Policy::Linear, 0.5).unwrap();
        assert!(fs::read_to_string(&out).unwrap().contains("x"));
    }
}
