//! Word identifiers and the token-kind reservations described in spec §3.1/§6.
//!
//! The engine never interprets word strings itself; it only compares ids
//! against the reserved constants below and defers to an owner-provided
//! [`WordSource`] for anything that needs a surface string.

/// Word identifier. Values `0..RESERVED_COUNT` are reserved token-kinds;
/// everything else is a corpus word assigned by the owning vocabulary.
pub type WordId = u32;

pub const ID_START: WordId = 0; // <s>
pub const ID_END: WordId = 1; // </s>
pub const ID_UNK: WordId = 2; // <unk>
pub const ID_NUM: WordId = 3; // <num>
pub const ID_URL: WordId = 4; // <url>
pub const ID_DATE: WordId = 5; // <date>
pub const ID_TIME: WordId = 6; // <time>
pub const ID_ABBR: WordId = 7; // <abbr>
pub const ID_MATH: WordId = 8; // <math>
pub const ID_SPECL: WordId = 9; // <specl>
pub const ID_RANGE: WordId = 10; // <range>
pub const ID_PUNCT: WordId = 11; // <punct>
pub const ID_GREEK: WordId = 12; // <greek>
pub const ID_ROUTE: WordId = 13; // <route>
pub const ID_APROX: WordId = 14; // <aprox>
pub const ID_SCORE: WordId = 15; // <score>
pub const ID_DIMEN: WordId = 16; // <dimen>
pub const ID_FRACT: WordId = 17; // <fract>
pub const ID_ISOLAT: WordId = 18; // <isolat>
pub const ID_PCARDS: WordId = 19; // <pcards>
pub const ID_CURRENCY: WordId = 20; // <currency>
pub const ID_ANUM: WordId = 21; // <anum>

/// Number of reserved token-kind ids (0..RESERVED_COUNT).
pub const RESERVED_COUNT: WordId = 22;

/// Sentinel meaning "no word-id" (`NIDW` in the source).
pub const NIDW: WordId = WordId::MAX;

pub const fn is_start(id: WordId) -> bool {
    id == ID_START
}

pub const fn is_end(id: WordId) -> bool {
    id == ID_END
}

pub const fn is_unk(id: WordId) -> bool {
    id == ID_UNK
}

pub const fn is_reserved(id: WordId) -> bool {
    id < RESERVED_COUNT
}

/// Case of a word as observed in running text, packed into a bit mask so a
/// node can track counts per distinct surface capitalisation.
pub type CaseMask = u32;

pub const CASE_LOWER: CaseMask = 0;
pub const CASE_UPPER_FIRST: CaseMask = 1;
pub const CASE_UPPER_ALL: CaseMask = 2;
pub const CASE_MIXED: CaseMask = 3;

/// Owner-provided contract for turning a word-id (plus the case it was seen
/// in) into a surface string. Must be re-entrant for the lifetime of an
/// emission pass (spec §5): implementations are called repeatedly and freely
/// interleaved while the trie is only read, never mutated, during emission.
pub trait WordSource {
    /// Surface string for `id` rendered with `case`. Returns `"<unk>"` (or
    /// the source's own unknown marker) for an id it does not recognise.
    fn word_of(&self, id: WordId, case: CaseMask) -> String;

    /// Reverse lookup used when parsing ARPA text back into ids. Returns
    /// `None` for words the source has not interned.
    fn id_of(&self, word: &str) -> Option<WordId>;
}
