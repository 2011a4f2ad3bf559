use crate::error::{AppError, Result};
use rand::RngCore;
use rand::rngs::OsRng;

/// The size of the random material in a token, in bytes.
pub const TOKEN_SIZE: usize = 16;

/// The prefix carried by premium tokens.
pub const PREMIUM_PREFIX: &str = "PREMIUM-";

/// Generates `size` bytes from the OS random source, hex-encoded.
///
/// # Arguments
///
/// * `size` - The number of random bytes.
///
/// # Returns
///
/// A lowercase hex string of `2 * size` characters.
pub fn generate_hex_token(size: usize) -> Result<String> {
    let mut material = vec![0u8; size];
    OsRng
        .try_fill_bytes(&mut material)
        .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))?;

    Ok(hex::encode(material))
}

/// Generates a generic pairing token.
pub fn generate_generic_token() -> Result<String> {
    generate_hex_token(TOKEN_SIZE)
}

/// Generates a premium activation token.
pub fn generate_premium_token() -> Result<String> {
    let material = generate_hex_token(TOKEN_SIZE)?;
    Ok(format!("{}{}", PREMIUM_PREFIX, material.to_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_tokens_are_hex_and_distinct() {
        let a = generate_generic_token().unwrap();
        let b = generate_generic_token().unwrap();

        assert_eq!(a.len(), TOKEN_SIZE * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn premium_tokens_are_prefixed() {
        let token = generate_premium_token().unwrap();

        assert!(token.starts_with(PREMIUM_PREFIX));
        assert_eq!(token.len(), PREMIUM_PREFIX.len() + TOKEN_SIZE * 2);
    }
}
