//! Caller identity as handed over by the wallet connector and the identity
//! provider. Both halves stay optional until the user finishes connecting.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAccount {
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
}

/// Which part of the caller's identity has not been resolved yet.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingIdentity {
    #[error("user profile is missing")]
    Profile,

    #[error("username is empty")]
    Username,

    #[error("wallet is not connected")]
    Wallet,
}

/// Identity of whoever is invoking a lobby operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub wallet: Option<WalletAccount>,
    pub profile: Option<UserProfile>,
}

/// A caller whose wallet address and username are both known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIdentity {
    pub address: String,
    pub username: String,
}

impl Caller {
    pub fn new(wallet: Option<WalletAccount>, profile: Option<UserProfile>) -> Self {
        Self { wallet, profile }
    }

    pub fn connected(
        address: impl Into<String>,
        user_id: i64,
        username: impl Into<String>,
    ) -> Self {
        Self {
            wallet: Some(WalletAccount {
                address: address.into(),
            }),
            profile: Some(UserProfile {
                id: user_id,
                username: username.into(),
            }),
        }
    }

    /// Profile is checked before the wallet, so a caller with neither is
    /// told about the profile first.
    pub fn resolve(&self) -> Result<ResolvedIdentity, MissingIdentity> {
        let profile = self.profile.as_ref().ok_or(MissingIdentity::Profile)?;
        let username = profile.username.trim();
        if username.is_empty() {
            return Err(MissingIdentity::Username);
        }

        let address = self
            .wallet
            .as_ref()
            .map(|w| w.address.trim())
            .filter(|a| !a.is_empty())
            .ok_or(MissingIdentity::Wallet)?;

        Ok(ResolvedIdentity {
            address: address.to_string(),
            username: username.to_string(),
        })
    }
}
