//! Shared formulas (`<f t="shared">`)
//!
//! Excel stores a filled-down formula once, on the first cell of the range
//! (the master, which carries the text and `si`). Every other cell of the
//! group only carries `<f t="shared" si="N"/>`. A follower's formula is the
//! master's with each relative reference moved by the follower's offset.

use std::collections::HashMap;

use pricecut_core::{CellAddress, MAX_COLS, MAX_ROWS};

struct SharedFormula {
    anchor: CellAddress,
    text: String,
}

/// Shared formula groups of one worksheet, keyed by `si`
#[derive(Default)]
pub(super) struct SharedFormulas {
    groups: HashMap<u32, SharedFormula>,
}

impl SharedFormulas {
    /// Record the master of group `index`
    pub(super) fn insert_master(&mut self, index: u32, anchor: CellAddress, text: &str) {
        self.groups.insert(
            index,
            SharedFormula {
                anchor,
                text: text.to_string(),
            },
        );
    }

    /// Formula text of the follower at `at`, `None` when the group is unknown
    pub(super) fn follower_text(&self, index: u32, at: CellAddress) -> Option<String> {
        let master = self.groups.get(&index)?;
        let row_delta = i64::from(at.row) - i64::from(master.anchor.row);
        let col_delta = i64::from(at.col) - i64::from(master.anchor.col);
        Some(shift_references(&master.text, row_delta, col_delta))
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.')
}

/// A word that is exactly an A1 reference (`B2`, `$B2`, `B$2`, `$B$2`)
fn parse_reference(word: &str) -> Option<CellAddress> {
    let rest = word.strip_prefix('$').unwrap_or(word);
    let letters = rest.bytes().take_while(u8::is_ascii_alphabetic).count();
    if !(1..=3).contains(&letters) {
        return None;
    }
    let rest = &rest[letters..];
    let digits = rest.strip_prefix('$').unwrap_or(rest);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    CellAddress::parse(word).ok()
}

fn shift(addr: CellAddress, row_delta: i64, col_delta: i64) -> String {
    let row = i64::from(addr.row) + if addr.row_absolute { 0 } else { row_delta };
    let col = i64::from(addr.col) + if addr.col_absolute { 0 } else { col_delta };
    if !(0..i64::from(MAX_ROWS)).contains(&row) || !(0..i64::from(MAX_COLS)).contains(&col) {
        return "#REF!".to_string();
    }

    CellAddress {
        row: row as u32,
        col: col as u16,
        ..addr
    }
    .to_a1_string()
}

/// Move the relative A1 references in `formula` by the given offsets.
///
/// String literals and quoted sheet names are copied unchanged, as are
/// function names and unquoted sheet prefixes. A reference pushed off the
/// grid becomes `#REF!`.
pub(super) fn shift_references(formula: &str, row_delta: i64, col_delta: i64) -> String {
    let chars: Vec<char> = formula.chars().collect();
    let mut out = String::with_capacity(formula.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '"' || c == '\'' {
            // Doubled quotes are escapes, not terminators
            out.push(c);
            i += 1;
            while i < chars.len() {
                out.push(chars[i]);
                if chars[i] == c {
                    if chars.get(i + 1) == Some(&c) {
                        out.push(c);
                        i += 2;
                        continue;
                    }
                    i += 1;
                    break;
                }
                i += 1;
            }
        } else if is_word_char(c) {
            let start = i;
            while i < chars.len() && is_word_char(chars[i]) {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let is_prefix = matches!(chars.get(i), Some('(') | Some('!'));
            match parse_reference(&word).filter(|_| !is_prefix) {
                Some(addr) => out.push_str(&shift(addr, row_delta, col_delta)),
                None => out.push_str(&word),
            }
        } else {
            out.push(c);
            i += 1;
        }
    }

    out
}
