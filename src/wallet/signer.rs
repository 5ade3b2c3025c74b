//! Relayer wallet
//!
//! SECURITY: This is the ONLY place where the relayer key exists in usable form.
//! - Keys are held in alloy's PrivateKeySigner
//! - Keys arrive as a `SecretString` from the configuration snapshot
//! - Keys are never serialized or logged

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use secrecy::{ExposeSecret, SecretString};

use crate::{Error, Result};

/// Wallet that never exposes its private key
pub struct SecureWallet {
    address: Address,
    wallet: EthereumWallet,
}

impl SecureWallet {
    /// Create the wallet from the configured secret
    pub fn from_secret(secret: &SecretString) -> Result<Self> {
        Self::from_hex(secret.expose_secret())
    }

    /// Create a wallet from a hex-encoded private key
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let key_hex = key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|_| Error::Wallet("Invalid relayer private key".to_string()))?;

        let address = signer.address();
        let wallet = EthereumWallet::from(signer);

        Ok(Self {
            address,
            wallet,
        })
    }

    /// Public relayer address (safe to share)
    pub fn address(&self) -> Address {
        self.address
    }

    /// EthereumWallet for alloy providers; exposes signing only
    pub fn wallet(&self) -> &EthereumWallet {
        &self.wallet
    }
}

// Implement Debug manually to avoid exposing the signer
impl std::fmt::Debug for SecureWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureWallet")
            .field("address", &self.address)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Anvil's first development key (DO NOT use outside tests)
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_wallet_from_secret() {
        let secret = SecretString::from(TEST_KEY.to_string());
        let wallet = SecureWallet::from_secret(&secret).unwrap();

        assert_eq!(
            wallet.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_invalid_key_error_does_not_echo_key() {
        let err = SecureWallet::from_hex("0xnot-a-key-abc123").unwrap_err();
        assert!(!err.to_string().contains("abc123"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let wallet = SecureWallet::from_hex(TEST_KEY).unwrap();
        let debug_str = format!("{:?}", wallet);

        assert!(!debug_str.contains("ac0974bec"));
        assert!(debug_str.contains("[REDACTED]"));
    }
}
