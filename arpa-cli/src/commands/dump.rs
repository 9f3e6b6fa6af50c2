use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::vocabulary::Vocabulary;

/// Direction of a `dump` conversion, chosen from the input/output
/// extensions by the caller (spec §4.9 binary mirror).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ArpaToBinary,
    BinaryToArpa,
}

pub fn run(input: &Path, output: &Path, direction: Direction, arpa_only: bool) -> Result<()> {
    match direction {
        Direction::ArpaToBinary => {
            let mut vocab = Vocabulary::new();
            let text = fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))?;
            vocab.prime_from_arpa(&text);
            let trie = arpa_core::from_arpa(&text, &vocab)?;
            let bytes = arpa_core::serializer::dump_bin(&trie, arpa_only)?;
            fs::write(output, bytes).with_context(|| format!("failed to write {}", output.display()))?;
        }
        Direction::BinaryToArpa => {
            bail!(
                "binary -> ARPA conversion needs a vocabulary to resolve word ids; \
                 this direction is not wired to a standalone word list yet"
            );
        }
    }
    println!("{} -> {}", input.display(), output.display());
    Ok(())
}

/// Picks a [`Direction`] from `input`'s extension: `.arpa`/`.txt` is text,
/// anything else is treated as the binary mirror.
pub fn direction_from_extension(input: &Path) -> Direction {
    match input.extension().and_then(|e| e.to_str()) {
        Some("arpa") | Some("txt") => Direction::ArpaToBinary,
        _ => Direction::BinaryToArpa,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_from_extension_recognises_arpa_text() {
        assert_eq!(direction_from_extension(Path::new("model.arpa")), Direction::ArpaToBinary);
        assert_eq!(direction_from_extension(Path::new("model.bin")), Direction::BinaryToArpa);
    }

    #[test]
    fn converts_arpa_to_binary() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("model.arpa");
        fs::write(&input, "\\data\\\nngram 1=1\n\n\\1-grams:\n-0.301030\ta\n\n\\end\\\n").unwrap();
        let output = dir.path().join("model.bin");
        run(&input, &output, Direction::ArpaToBinary, false).unwrap();
        assert!(fs::metadata(&output).unwrap().len() > 0);
    }
}
