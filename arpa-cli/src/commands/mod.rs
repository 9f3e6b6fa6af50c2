pub mod dump;
pub mod mix;
pub mod prune;
pub mod train;

use anyhow::{bail, Result};
use arpa_core::discount::Discount;

/// Resolves the `--discount` flag into a [`Discount`] instance. Shared by
/// every subcommand that trains or retrains a model.
pub fn parse_discount(name: &str, delta: f64) -> Result<Discount> {
    match name {
        "good-turing" => Ok(Discount::good_turing()),
        "const" => Ok(Discount::const_discount(delta)),
        "natural" => Ok(Discount::natural()),
        "add-smooth" => Ok(Discount::add_smooth(delta)),
        "witten-bell" => Ok(Discount::witten_bell()),
        "kneser-ney" => Ok(Discount::kneser_ney()),
        "modified-kneser-ney" => Ok(Discount::modified_kneser_ney()),
        other => bail!(
            "unknown discount family: {other} (expected one of good-turing, const, natural, \
             add-smooth, witten-bell, kneser-ney, modified-kneser-ney)"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_discount_known_name() {
        assert!(parse_discount("witten-bell", 0.0).is_ok());
        assert!(parse_discount("modified-kneser-ney", 0.0).is_ok());
    }

    #[test]
    fn parse_discount_unknown_name_is_an_error() {
        assert!(parse_discount("bogus", 0.0).is_err());
    }
}
