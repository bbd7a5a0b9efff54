//! One-time secrets issued during the credential lifecycle.

use rand::{rngs::OsRng, Rng, RngCore};
use time::Duration;

pub const VERIFICATION_CODE_LEN: usize = 6;
pub const VERIFICATION_CODE_TTL: Duration = Duration::hours(20);
pub const RESET_TOKEN_BYTES: usize = 20;
pub const RESET_TOKEN_TTL: Duration = Duration::hours(1);

/// Six decimal digits, never starting with zero.
pub fn generate_verification_code() -> String {
    let low = 10u32.pow(VERIFICATION_CODE_LEN as u32 - 1);
    let high = 10u32.pow(VERIFICATION_CODE_LEN as u32);
    OsRng.gen_range(low..high).to_string()
}

/// Hex-encoded random bytes for password reset links.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
