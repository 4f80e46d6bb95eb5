//! String similarity for fuzzy company-name matching.
//!
//! The resolver only depends on [`Similarity`]; any measure that returns a
//! value in `[0, 1]`, is symmetric, and scores identical strings `1.0` can be
//! swapped in. The default, [`MatchingBlocksRatio`], is the Ratcliff/Obershelp
//! "gestalt" ratio: find the longest common substring, recurse on the pieces
//! to its left and right, and score `2·M / (|a| + |b|)` where `M` is the total
//! number of matched characters.

/// A similarity measure over two strings.
pub trait Similarity: Send + Sync {
    /// Score in `[0, 1]`; `1.0` for identical input, `0.0` for disjoint.
    fn similarity(&self, a: &str, b: &str) -> f64;
}

/// Longest-matching-blocks ratio (Ratcliff/Obershelp).
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchingBlocksRatio;

impl Similarity for MatchingBlocksRatio {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        // Block decomposition depends on argument order when several longest
        // blocks tie; a canonical order makes the score symmetric.
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();

        let total = a.len() + b.len();
        if total == 0 {
            return 1.0;
        }
        2.0 * matched_chars(&a, &b) as f64 / total as f64
    }
}

/// Total length of the matching blocks between `a` and `b`.
fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut queue = vec![(0, a.len(), 0, b.len())];
    let mut total = 0;

    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        total += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }

    total
}

/// Longest common substring of `a[alo..ahi]` and `b[blo..bhi]`.
///
/// Returns `(i, j, k)` with `a[i..i+k] == b[j..j+k]`. Among equally long
/// blocks the one starting earliest in `a`, then in `b`, wins.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let width = bhi - blo;
    let mut prev = vec![0usize; width + 1];
    let mut cur = vec![0usize; width + 1];
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);

    for i in alo..ahi {
        for j in blo..bhi {
            let col = j - blo + 1;
            if a[i] == b[j] {
                let k = prev[col - 1] + 1;
                cur[col] = k;
                if k > best_k {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_k = k;
                }
            } else {
                cur[col] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    (best_i, best_j, best_k)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(a: &str, b: &str) -> f64 {
        MatchingBlocksRatio.similarity(a, b)
    }

    #[test]
    fn identity_is_one() {
        assert_eq!(ratio("apple inc", "apple inc"), 1.0);
        assert_eq!(ratio("", ""), 1.0);
    }

    #[test]
    fn disjoint_is_zero() {
        assert_eq!(ratio("abc", "xyz"), 0.0);
        assert_eq!(ratio("abc", ""), 0.0);
    }

    #[test]
    fn known_ratios() {
        // "bcd" is the only block: 2·3 / 8.
        assert!((ratio("abcd", "bcde") - 0.75).abs() < 1e-12);
        // "ple inc" + "a": 2·8 / 17.
        assert!((ratio("aple inc", "apple inc") - 16.0 / 17.0).abs() < 1e-12);
    }

    #[test]
    fn symmetric() {
        let pairs = [
            ("alphabet inc", "alpha bet"),
            ("abab", "baba"),
            ("netflix", "netflix inc"),
            ("goldman sachs group inc", "goldman sachs bdc"),
        ];
        for (a, b) in pairs {
            assert_eq!(ratio(a, b), ratio(b, a), "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn multibyte_chars_count_once() {
        assert!((ratio("café", "cafe") - 0.75).abs() < 1e-12);
    }

    #[test]
    fn recursion_finds_blocks_on_both_sides() {
        // "xx" + "yy" around the differing middle: 2·4 / 10.
        assert!((ratio("xxAyy", "xxByy") - 0.8).abs() < 1e-12);
    }
}
