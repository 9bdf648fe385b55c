//! Column label codec.
//!
//! Columns are labelled like spreadsheet columns: a bijective base-26
//! numeral over `A..=Z` with no zero digit, so 0 is `A`, 25 is `Z`,
//! 26 is `AA` and 702 is `AAA`.

/// Encode a zero-based column index as letters. Negative indices encode to
/// the empty string.
pub fn encode_column(index: i64) -> String {
    if index < 0 {
        return String::new();
    }

    let mut letters = Vec::new();
    let mut n = index;
    while n >= 0 {
        letters.push(b'A' + (n % 26) as u8);
        n = n / 26 - 1;
    }
    letters.reverse();
    // Only ASCII capitals were pushed
    String::from_utf8(letters).unwrap_or_default()
}

/// Decode column letters back to a zero-based index.
///
/// Accepts lower case. Returns `None` for empty input, non-letters, or
/// labels whose index does not fit in an `i64`.
pub fn decode_column(label: &str) -> Option<i64> {
    if label.is_empty() {
        return None;
    }

    let mut acc: i64 = 0;
    for c in label.bytes() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() - b'A') as i64 + 1;
        acc = acc.checked_mul(26)?.checked_add(digit)?;
    }
    Some(acc - 1)
}

/// Index of a column label read from its first letter only.
///
/// This is how the centre-coordinate badge historically recovered a column
/// index from a stored coordinate. It is only correct for `A..=Z`; use
/// [`decode_column`] for anything that may exceed 26 columns.
pub fn legacy_column_index(label: &str) -> Option<i64> {
    let first = label.bytes().next()?;
    first
        .is_ascii_alphabetic()
        .then(|| (first.to_ascii_uppercase() - b'A') as i64)
}
