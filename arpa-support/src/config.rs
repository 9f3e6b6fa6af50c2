//! Layered configuration: CLI flags (via `clap`) override environment
//! variables read under a fixed `ARPA_` prefix, in spirit of
//! `original_source/src/env.cpp`'s prefix-based env-var convention but
//! expressed through `clap`'s `env = "..."` attribute on each field rather
//! than a hand-rolled lookup table.

use arpa_core::options::{OptionBit, Options};
use clap::Args;

/// Shared behaviour flags accepted by every subcommand, layered as
/// `ARPA_*` environment variables under CLI flags of the same name.
#[derive(Debug, Args, Clone)]
pub struct ModelConfig {
    /// Maximum n-gram order.
    #[arg(long, env = "ARPA_ORDER", default_value_t = 3)]
    pub order: u8,

    /// Emit diagnostic log messages during estimation/pruning/mixing.
    #[arg(long, env = "ARPA_DEBUG", default_value_t = false)]
    pub debug: bool,

    /// Ignore minimum-count filters at every order.
    #[arg(long, env = "ARPA_ALL_GRAMS", default_value_t = false)]
    pub all_grams: bool,

    /// Discard case variants on ARPA emission.
    #[arg(long, env = "ARPA_LOWER_CASE", default_value_t = false)]
    pub lower_case: bool,

    /// Force the `<unk>` unigram to pseudo-zero.
    #[arg(long, env = "ARPA_RESET_UNK", default_value_t = false)]
    pub reset_unk: bool,

    /// Skip the estimation pass entirely (load-only mode).
    #[arg(long, env = "ARPA_NOT_TRAIN", default_value_t = false)]
    pub not_train: bool,

    /// Enable interpolation in the estimator's probability loop.
    #[arg(long, env = "ARPA_INTERPOLATE", default_value_t = false)]
    pub interpolate: bool,

    /// Worker threads for the support pool; 0 uses available parallelism.
    #[arg(long, env = "ARPA_THREADS", default_value_t = 0)]
    pub threads: usize,
}

impl ModelConfig {
    /// Packs the boolean fields into an engine-level [`Options`] bit-set.
    pub fn options(&self) -> Options {
        let mut opts = Options::empty();
        if self.debug {
            opts = opts.with(OptionBit::Debug);
        }
        if self.all_grams {
            opts = opts.with(OptionBit::AllGrams);
        }
        if self.lower_case {
            opts = opts.with(OptionBit::LowerCase);
        }
        if self.reset_unk {
            opts = opts.with(OptionBit::ResetUnk);
        }
        if self.not_train {
            opts = opts.with(OptionBit::NotTrain);
        }
        if self.interpolate {
            opts = opts.with(OptionBit::Interpolate);
        }
        opts
    }
}
