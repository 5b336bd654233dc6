//! End-type alphabet and the suffix convention on end-block IDs.
//!
//! An end block ID may carry a `"::<type>"` suffix (`"confirm::postpone"`).
//! The suffix is stripped during normalization and recorded in
//! `end_block_types`; two suffixes colliding on the same block merge via
//! [`EndType::merge`], a total function over the alphabet.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const END_BLOCK_SEPARATOR: &str = "::";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndType {
    End,
    Exit,
    All,
    Intermediate,
    Postpone,
    TurnOut,
}

impl Default for EndType {
    fn default() -> Self {
        Self::End
    }
}

impl EndType {
    /// Parse a suffix fragment (already stripped of `"::"`) against the
    /// alphabet, case-insensitively. Unknown values are `None`; the caller
    /// recovers by discarding the suffix (`MarkupError::InvalidEndType`).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "end" => Some(Self::End),
            "exit" => Some(Self::Exit),
            "all" => Some(Self::All),
            "intermediate" => Some(Self::Intermediate),
            "postpone" => Some(Self::Postpone),
            "turn_out" => Some(Self::TurnOut),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::End => "end",
            Self::Exit => "exit",
            Self::All => "all",
            Self::Intermediate => "intermediate",
            Self::Postpone => "postpone",
            Self::TurnOut => "turn_out",
        }
    }

    /// Split a raw end-block ID into `(base_id, end_type)`. A malformed or
    /// absent suffix defaults to [`EndType::End`] (the `InvalidEndType`
    /// recovery path described in the error model).
    pub fn split_end_block_id(raw: &str) -> (String, Self) {
        if let Some((head, suffix)) = raw.rsplit_once(END_BLOCK_SEPARATOR) {
            if let Some(parsed) = Self::parse(suffix) {
                return (head.to_string(), parsed);
            }
            tracing::warn!(target: "jmap_model::end_type", block_id = raw, suffix, "unknown end-type suffix, defaulting to end");
        }
        (raw.to_string(), Self::End)
    }

    /// Total merge function over the end-type alphabet. Commutative except
    /// for the `turn_out` override, which defers unconditionally to the
    /// other operand (idempotent when both sides are `turn_out`).
    pub fn merge(existing: Option<Self>, new: Self) -> Self {
        let Some(existing) = existing else {
            return new;
        };
        if existing == new {
            return existing;
        }
        if existing == Self::TurnOut {
            return new;
        }
        if new == Self::TurnOut {
            return existing;
        }
        if existing == Self::Postpone || new == Self::Postpone {
            return Self::Postpone;
        }
        if existing == Self::Intermediate || new == Self::Intermediate {
            return Self::Intermediate;
        }
        if existing == Self::All || new == Self::All {
            return Self::All;
        }
        if matches!(
            (existing, new),
            (Self::End, Self::Exit) | (Self::Exit, Self::End)
        ) {
            return Self::All;
        }
        new
    }

    pub fn format_suffixed(self, block_id: &str) -> String {
        if self == Self::End {
            block_id.to_string()
        } else {
            format!("{block_id}{END_BLOCK_SEPARATOR}{}", self.as_str())
        }
    }
}

impl fmt::Display for EndType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_recovers_unknown_suffix_as_default() {
        let (base, ty) = EndType::split_end_block_id("checkout::bogus");
        assert_eq!(base, "checkout::bogus");
        assert_eq!(ty, EndType::End);
    }

    #[test]
    fn split_strips_known_suffix() {
        let (base, ty) = EndType::split_end_block_id("checkout::postpone");
        assert_eq!(base, "checkout");
        assert_eq!(ty, EndType::Postpone);
    }

    #[test]
    fn merge_is_commutative_outside_turn_out() {
        let pairs = [
            (EndType::End, EndType::Exit),
            (EndType::End, EndType::Postpone),
            (EndType::Intermediate, EndType::All),
            (EndType::End, EndType::End),
        ];
        for (a, b) in pairs {
            assert_eq!(EndType::merge(Some(a), b), EndType::merge(Some(b), a));
        }
    }

    #[test]
    fn merge_end_exit_yields_all() {
        assert_eq!(EndType::merge(Some(EndType::End), EndType::Exit), EndType::All);
    }

    #[test]
    fn merge_turn_out_defers_to_new() {
        assert_eq!(EndType::merge(Some(EndType::TurnOut), EndType::Postpone), EndType::Postpone);
        assert_eq!(EndType::merge(Some(EndType::Postpone), EndType::TurnOut), EndType::Postpone);
        assert_eq!(EndType::merge(Some(EndType::TurnOut), EndType::TurnOut), EndType::TurnOut);
    }

    #[test]
    fn merge_postpone_dominates_all_but_turn_out() {
        assert_eq!(EndType::merge(Some(EndType::Postpone), EndType::All), EndType::Postpone);
        assert_eq!(EndType::merge(Some(EndType::Intermediate), EndType::Postpone), EndType::Postpone);
    }
}
