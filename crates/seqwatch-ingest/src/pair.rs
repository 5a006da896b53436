//! Paired-read detection for `_R1` / `_R2` gzipped FASTQ files.
//!
//! Pairing is purely lexical: the partner of `X_R1.fastq.gz` is exactly
//! `X_R2.fastq.gz` and vice versa. Matching is case-sensitive.

use std::collections::BTreeSet;

const PAIRED_SUFFIX: &str = ".fastq.gz";
const READ_ONE: &str = "_R1";
const READ_TWO: &str = "_R2";

/// Pairing status of a file against the candidates still available this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairState {
    /// The file does not follow the paired-read naming convention.
    Unpaired,
    /// The file is one half of a pair whose partner has not been seen.
    Waiting,
    /// Both halves are present.
    Complete {
        /// Name of the partner file.
        partner: String,
    },
}

/// Name of the file that would complete the pair `name` belongs to.
#[must_use]
pub fn pair_partner(name: &str) -> Option<String> {
    let stem = name.strip_suffix(PAIRED_SUFFIX)?;
    if let Some(base) = stem.strip_suffix(READ_ONE) {
        Some(format!("{base}{READ_TWO}{PAIRED_SUFFIX}"))
    } else {
        stem.strip_suffix(READ_TWO)
            .map(|base| format!("{base}{READ_ONE}{PAIRED_SUFFIX}"))
    }
}

/// Classify `name` against `candidates`.
#[must_use]
pub fn detect_pair(name: &str, candidates: &BTreeSet<String>) -> PairState {
    match pair_partner(name) {
        None => PairState::Unpaired,
        Some(partner) if candidates.contains(&partner) => PairState::Complete { partner },
        Some(_) => PairState::Waiting,
    }
}
