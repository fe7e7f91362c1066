//! Pronunciation similarity scoring.
//!
//! The scorer compares the recognized transcript against the reference
//! phrase and produces an integer score in `[0, 100]`:
//!
//! ```text
//! heard / reference → normalize (keep letters+digits, lowercase)
//!                   → Levenshtein distance d (rolling-row DP)
//!                   → score = round(100 · max(0, 1 − d / max(|a|, |b|)))
//! ```
//!
//! Two independent scales hang off the score:
//!
//! - [`FeedbackTier`] — fixed coaching-message bands (92/78/60).
//! - the match verdict — a single configurable threshold
//!   ([`DEFAULT_MATCH_THRESHOLD`], 70) used for the pass/fail indicator.
//!
//! They serve different UI purposes and are deliberately kept separate.

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize `text` for comparison: keep only letters and digits (any
/// script, so Thai codepoints survive) and lowercase the rest.
///
/// Whitespace, punctuation and symbol codepoints never carry pronunciation
/// content, so `"สวัสดี ครับ!"` and `"สวัสดีครับ"` normalize identically.
///
/// ```
/// use thai_practice::scoring::normalize;
///
/// assert_eq!(normalize("  Sa-wat-dee! "), "sawatdee");
/// assert_eq!(normalize("สวัสดี ครับ"), "สวัสดีครับ");
/// ```
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

// ---------------------------------------------------------------------------
// Levenshtein
// ---------------------------------------------------------------------------

/// Levenshtein edit distance over `char` units (insert / delete / substitute,
/// cost 1 each) using the standard two-row dynamic-programming scheme.
fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr: Vec<usize> = vec![0; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitute = prev[j] + usize::from(ca != cb);
            let delete = prev[j + 1] + 1;
            let insert = curr[j] + 1;
            curr[j + 1] = substitute.min(delete).min(insert);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

// ---------------------------------------------------------------------------
// Score
// ---------------------------------------------------------------------------

/// Compute the 0–100 similarity score between a recognized transcript and
/// the reference phrase.
///
/// Both inputs are normalized first. Two empty normalized strings count as a
/// perfect match (score 100); exactly one empty string scores 0.
///
/// The function is symmetric: `score(a, b) == score(b, a)`.
pub fn score(heard: &str, reference: &str) -> u8 {
    let a: Vec<char> = normalize(heard).chars().collect();
    let b: Vec<char> = normalize(reference).chars().collect();

    let similarity = match (a.is_empty(), b.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => {
            let d = levenshtein(&a, &b) as f64;
            let max_len = a.len().max(b.len()) as f64;
            (1.0 - d / max_len).max(0.0)
        }
    };

    (similarity * 100.0).round() as u8
}

// ---------------------------------------------------------------------------
// Feedback tiers & match verdict
// ---------------------------------------------------------------------------

/// Default pass/fail verdict threshold (inclusive).
///
/// Independent from the [`FeedbackTier`] bands; configured via
/// `ScoringConfig::match_threshold`.
pub const DEFAULT_MATCH_THRESHOLD: u8 = 70;

/// Coaching-message band for a given score.
///
/// Bands are fixed inclusive ranges: 92–100, 78–91, 60–77, 0–59.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackTier {
    /// 92–100 — essentially correct.
    VeryClose,
    /// 78–91 — understandable, endings/tone need work.
    Fine,
    /// 60–77 — audible but with real errors.
    Audible,
    /// 0–59 — off target.
    OffTarget,
}

impl FeedbackTier {
    /// Map a score to its tier.
    pub fn for_score(score: u8) -> Self {
        match score {
            92..=u8::MAX => FeedbackTier::VeryClose,
            78..=91 => FeedbackTier::Fine,
            60..=77 => FeedbackTier::Audible,
            _ => FeedbackTier::OffTarget,
        }
    }

    /// The coaching message shown alongside the score.
    pub fn hint(&self) -> &'static str {
        match self {
            FeedbackTier::VeryClose => "Very close — try saying it faster and smoother",
            FeedbackTier::Fine => "Fine — fix the endings and the tone",
            FeedbackTier::Audible => {
                "Audible but has errors — compare syllable by syllable"
            }
            FeedbackTier::OffTarget => {
                "Off target — listen to the reference and repeat 1–2 syllables at a time"
            }
        }
    }
}

/// Pass/fail verdict against an explicit threshold.
pub fn is_match(score: u8, threshold: u8) -> bool {
    score >= threshold
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // --- normalize ---

    #[test]
    fn normalize_strips_whitespace_and_punctuation() {
        assert_eq!(normalize("hello, world!"), "helloworld");
        assert_eq!(normalize("  a  b  "), "ab");
    }

    #[test]
    fn normalize_lowercases() {
        assert_eq!(normalize("Sa-Wat-DEE"), "sawatdee");
    }

    #[test]
    fn normalize_keeps_thai_letters_and_digits() {
        assert_eq!(normalize("สวัสดี ครับ ๑๒"), "สวัสดีครับ๑๒");
    }

    // --- score laws ---

    #[test]
    fn identical_strings_score_100() {
        assert_eq!(score("สวัสดี", "สวัสดี"), 100);
    }

    #[test]
    fn normalization_equivalent_inputs_score_100() {
        assert_eq!(score("Sa wat dee!", "sawatdee"), 100);
        assert_eq!(score("สวัสดี ครับ", "สวัสดีครับ"), 100);
    }

    #[test]
    fn both_empty_scores_100() {
        assert_eq!(score("", ""), 100);
        // Punctuation-only normalizes to empty too.
        assert_eq!(score("!!!", "  ,. "), 100);
    }

    #[test]
    fn one_empty_scores_0() {
        assert_eq!(score("", "สวัสดี"), 0);
        assert_eq!(score("สวัสดี", ""), 0);
    }

    #[test]
    fn score_is_symmetric() {
        let pairs = [
            ("สวัสดี", "สบายดี"),
            ("hello", "hallo"),
            ("กขค", ""),
            ("abc", "xyz"),
        ];
        for (a, b) in pairs {
            assert_eq!(score(a, b), score(b, a), "asymmetric for ({a:?}, {b:?})");
        }
    }

    #[test]
    fn completely_different_strings_score_0() {
        assert_eq!(score("abc", "xyz"), 0);
    }

    #[test]
    fn single_edit_scores_proportionally() {
        // "hello" vs "hallo": d = 1, max len = 5 → 80.
        assert_eq!(score("hello", "hallo"), 80);
    }

    // --- levenshtein ---

    #[test]
    fn levenshtein_known_distances() {
        let d = |a: &str, b: &str| {
            levenshtein(
                &a.chars().collect::<Vec<_>>(),
                &b.chars().collect::<Vec<_>>(),
            )
        };
        assert_eq!(d("kitten", "sitting"), 3);
        assert_eq!(d("", "abc"), 3);
        assert_eq!(d("abc", "abc"), 0);
        assert_eq!(d("สวัสดี", "สวัสด"), 1);
    }

    // --- tiers ---

    #[test]
    fn tier_boundaries() {
        assert_eq!(FeedbackTier::for_score(100), FeedbackTier::VeryClose);
        assert_eq!(FeedbackTier::for_score(92), FeedbackTier::VeryClose);
        assert_eq!(FeedbackTier::for_score(91), FeedbackTier::Fine);
        assert_eq!(FeedbackTier::for_score(78), FeedbackTier::Fine);
        assert_eq!(FeedbackTier::for_score(77), FeedbackTier::Audible);
        assert_eq!(FeedbackTier::for_score(60), FeedbackTier::Audible);
        assert_eq!(FeedbackTier::for_score(59), FeedbackTier::OffTarget);
        assert_eq!(FeedbackTier::for_score(0), FeedbackTier::OffTarget);
    }

    #[test]
    fn match_verdict_uses_independent_threshold() {
        assert!(is_match(70, DEFAULT_MATCH_THRESHOLD));
        assert!(!is_match(69, DEFAULT_MATCH_THRESHOLD));
        // A retuned threshold does not move the tiers.
        assert!(is_match(50, 50));
        assert_eq!(FeedbackTier::for_score(50), FeedbackTier::OffTarget);
    }
}
