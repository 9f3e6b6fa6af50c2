use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use arpa_core::trie::Trie;
use arpa_core::wordid::{ID_END, ID_START};
use arpa_support::ModelConfig;

use crate::commands::parse_discount;
use crate::output::{format_pretty, ModelSummary};
use crate::vocabulary::Vocabulary;

/// Collects every readable file under `path`, sorted for determinism
/// (a single file is returned as-is).
fn collect_corpus_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    Ok(files)
}

pub fn run(
    corpus: &Path,
    output: &Path,
    config: &ModelConfig,
    discount_name: &str,
    delta: f64,
) -> Result<()> {
    let files = collect_corpus_files(corpus).context("failed to collect corpus files")?;
    if files.is_empty() {
        anyhow::bail!("no corpus files found under {}", corpus.display());
    }

    let mut vocab = Vocabulary::new();
    let mut trie = Trie::with_logger(config.order, config.options(), Box::new(arpa_core::logger::FacadeLogger));

    let mut doc_id = 0u64;
    for file in &files {
        let text = fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut sentence = vec![(ID_START, 0)];
            sentence.extend(vocab.tokenize_line(line));
            sentence.push((ID_END, 0));
            trie.insert_sequence(&sentence, doc_id);
            doc_id += 1;
        }
    }

    let mut discount = parse_discount(discount_name, delta)?;
    arpa_core::estimator::train(&mut trie, &mut discount)?;

    let arpa_text = arpa_core::to_arpa(&trie, &vocab, Some(&format!("; arpa-lm {}", env!("CARGO_PKG_VERSION"))));
    fs::write(output, arpa_text).with_context(|| format!("failed to write {}", output.display()))?;

    let summary = ModelSummary::of(&trie);
    println!("{}", format_pretty(&summary));
    println!("wrote {} sentences from {} file(s) to {}", doc_id, files.len(), output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trains_and_writes_an_arpa_file() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("corpus.txt");
        fs::write(&corpus, "the cat sat\nthe dog sat\n").unwrap();
        let output = dir.path().join("model.arpa");

        let config = ModelConfig {
            order: 2,
            debug: false,
            all_grams: false,
            lower_case: false,
            reset_unk: false,
            not_train: false,
            interpolate: false,
            threads: 1,
        };
        run(&corpus, &output, &config, "witten-bell", 0.0).unwrap();

        let text = fs::read_to_string(&output).unwrap();
        assert!(text.contains("\\data\\"));
        assert!(text.contains("\\end\\"));
    }

    #[test]
    fn empty_corpus_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty");
        fs::create_dir(&empty).unwrap();
        let config = ModelConfig {
            order: 2,
            debug: false,
            all_grams: false,
            lower_case: false,
            reset_unk: false,
            not_train: false,
            interpolate: false,
            threads: 1,
        };
        let output = dir.path().join("out.arpa");
        assert!(run(&empty, &output, &config, "witten-bell", 0.0).is_err());
    }
}
