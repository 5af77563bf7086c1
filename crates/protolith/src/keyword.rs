use std::str::FromStr;

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Reserved names that evaluate as stand-alone atoms.
///
/// Uses strum derives so the source spelling, `FromStr` parsing, and the
/// bootstrap iteration over all keywords stay in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum AtomKeyword {
    Global,
    This,
    Undefined,
    Null,
    True,
    False,
    Prev,
    Arguments,
    /// The variadic marker; legal only inside a `func` parameter list.
    #[strum(serialize = "...")]
    Rest,
}

/// Reserved names that trigger a special form in head-of-list position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ListKeyword {
    Func,
    New,
    Array,
    Getf,
    Setf,
    Getl,
    Setl,
    Geti,
    Seti,
    Do,
    If,
    While,
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "%")]
    Rem,
    #[strum(serialize = "&")]
    BitAnd,
    #[strum(serialize = "|")]
    BitOr,
    #[strum(serialize = "^")]
    BitXor,
    Idiv,
    Imod,
    And,
    Or,
    Not,
    #[strum(serialize = "=")]
    Eq,
    #[strum(serialize = "/=")]
    Ne,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
}

/// Returns true when `token` is a reserved word of either keyword set.
///
/// Reserved words may not name function parameters or named functions.
#[must_use]
pub fn is_reserved(token: &str) -> bool {
    AtomKeyword::from_str(token).is_ok() || ListKeyword::from_str(token).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_spellings_round_trip() {
        assert_eq!(ListKeyword::from_str("func").unwrap(), ListKeyword::Func);
        assert_eq!(ListKeyword::from_str("/=").unwrap(), ListKeyword::Ne);
        assert_eq!(ListKeyword::from_str("<=").unwrap(), ListKeyword::Le);
        assert_eq!(AtomKeyword::from_str("...").unwrap(), AtomKeyword::Rest);
        assert_eq!(AtomKeyword::Arguments.to_string(), "arguments");
    }

    #[test]
    fn reserved_covers_both_sets() {
        for token in ["global", "this", "prev", "func", "while", "idiv", "^", ">="] {
            assert!(is_reserved(token), "{token} should be reserved");
        }
        assert!(!is_reserved("size"));
        assert!(!is_reserved("x"));
    }
}
