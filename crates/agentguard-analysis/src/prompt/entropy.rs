//! Shannon entropy over a character histogram, used to spot obfuscated
//! or encoded payloads.

use rustc_hash::FxHashMap;

/// Shannon entropy of `text` in bits per character. Empty text is 0.
pub fn shannon_entropy(text: &str) -> f64 {
    if text.is_empty() {
        return 0.0;
    }

    let mut freq: FxHashMap<char, usize> = FxHashMap::default();
    let mut length = 0usize;
    for c in text.chars() {
        *freq.entry(c).or_insert(0) += 1;
        length += 1;
    }

    let length = length as f64;
    freq.values()
        .map(|&count| {
            let p = count as f64 / length;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::shannon_entropy;

    #[test]
    fn empty_and_uniform_text() {
        assert_eq!(shannon_entropy(""), 0.0);
        assert_eq!(shannon_entropy("aaaa"), 0.0);
    }

    #[test]
    fn plain_english_is_low_entropy() {
        let entropy = shannon_entropy("hello world this is normal text");
        assert!(entropy < 4.0, "got {entropy}");
    }

    #[test]
    fn dense_alphanumeric_is_high_entropy() {
        let entropy =
            shannon_entropy("q8Zx2LmV9rTbY4wKpA7dNcE1sFgH6jUoI3vR5yQzXW0eMkBDiTOnPaSlCfGuJh");
        assert!(entropy > 5.0, "got {entropy}");
    }
}
