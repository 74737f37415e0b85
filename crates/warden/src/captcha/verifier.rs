//! CAPTCHA answer comparison.

/// Compares a submitted answer against the stored digits
pub struct CaptchaVerifier;

impl CaptchaVerifier {
    /// True only for an exact digit-by-digit match.
    ///
    /// Surrounding whitespace is ignored. Any other non-digit character, or a
    /// length mismatch, is a failed match.
    pub fn matches(expected: &[u8], answer: &str) -> bool {
        let answer = answer.trim();
        if answer.len() != expected.len() {
            return false;
        }

        answer
            .bytes()
            .zip(expected)
            .all(|(c, &digit)| c.is_ascii_digit() && c - b'0' == digit)
    }
}
