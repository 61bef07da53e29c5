//! Text normalization for signature matching and sanitization.
//!
//! Homoglyph folding covers the Cyrillic look-alikes NFKC leaves alone;
//! fullwidth Latin and digits are folded both here and by NFKC.

use unicode_normalization::UnicodeNormalization;

/// Zero-width code points removed during sanitization and detected by the
/// binary-scan signatures.
pub const ZERO_WIDTH_CHARS: [char; 5] = [
    '\u{200B}', // zero width space
    '\u{200C}', // zero width non-joiner
    '\u{200D}', // zero width joiner
    '\u{2060}', // word joiner
    '\u{FEFF}', // zero width no-break space (BOM)
];

/// Fold known homoglyphs to their ASCII equivalents.
pub fn fold_homoglyphs(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            // Cyrillic look-alikes.
            'ѕ' => 's',
            'у' => 'y',
            'т' => 't',
            'е' => 'e',
            // Fullwidth Latin and digits: U+FF21..FF3A, U+FF41..FF5A, U+FF10..FF19.
            'Ａ'..='Ｚ' | 'ａ'..='ｚ' | '０'..='９' => {
                char::from_u32(c as u32 - 0xFEE0).unwrap_or(c)
            }
            _ => c,
        })
        .collect()
}

/// Homoglyph folding followed by NFKC normalization — the scan target for
/// signatures declared `unicode_normalization`.
pub fn normalize_text(text: &str) -> String {
    fold_homoglyphs(text).nfkc().collect()
}

/// Remove all zero-width code points.
pub fn strip_zero_width(text: &str) -> String {
    text.chars().filter(|c| !ZERO_WIDTH_CHARS.contains(c)).collect()
}
