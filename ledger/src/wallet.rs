//! Payout wallet address format.

use rewards_types::RewardsError;

/// Length of a user-friendly wallet address.
pub const WALLET_ADDRESS_LEN: usize = 48;

/// Accept a 48-character address with a bounceable (`EQ`) or
/// non-bounceable (`UQ`) prefix. Returns the trimmed address.
pub fn validate_wallet_address(address: &str) -> Result<String, RewardsError> {
    let address = address.trim();
    let prefixed = address.starts_with("EQ") || address.starts_with("UQ");
    if !prefixed || address.chars().count() != WALLET_ADDRESS_LEN {
        return Err(RewardsError::validation(format!(
            "wallet address must be {WALLET_ADDRESS_LEN} characters starting with EQ or UQ"
        )));
    }
    Ok(address.to_string())
}
