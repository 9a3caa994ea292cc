//! Numeric rendezvous tokens.

use rand::Rng;

/// Token length in ASCII digits.
pub const TOKEN_LEN: usize = 6;

/// Generates a token uniformly over `[100000, 999999]`.
///
/// Uniqueness among live slots is the store's job (retry on collision
/// under its lock).
pub fn generate() -> String {
    rand::thread_rng().gen_range(100_000..=999_999_u32).to_string()
}

/// `true` for exactly six ASCII digits.
///
/// Non-conforming tokens get "no session" semantics at the HTTP layer.
pub fn is_valid(token: &str) -> bool {
    token.len() == TOKEN_LEN && token.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_token_shape() {
        for _ in 0..100 {
            let t = generate();
            assert!(is_valid(&t), "bad token: {t}");
            let n: u32 = t.parse().unwrap();
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn validation_rejects_junk() {
        assert!(is_valid("482913"));
        assert!(!is_valid(""));
        assert!(!is_valid("12345"));
        assert!(!is_valid("1234567"));
        assert!(!is_valid("12345a"));
        assert!(!is_valid("１２３４５６")); // full-width digits are not ASCII
        assert!(!is_valid("123 45"));
    }
}
