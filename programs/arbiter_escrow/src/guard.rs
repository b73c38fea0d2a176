use anchor_lang::prelude::*;

use crate::{errors::EscrowError, state::EscrowAccount};

/// Addresses whose signatures the host has verified for the current call
#[derive(Clone, Copy, Debug)]
pub struct Signers<'a> {
    keys: &'a [Pubkey],
}

impl<'a> Signers<'a> {
    pub fn new(keys: &'a [Pubkey]) -> Self {
        Self { keys }
    }

    /// The default address stands for an unset field and never counts as signed
    pub fn contains(&self, key: &Pubkey) -> bool {
        *key != Pubkey::default() && self.keys.contains(key)
    }
}

/// Collect the keys of every account the runtime marked as a signer
pub fn verified_signers(accounts: &[AccountInfo]) -> Vec<Pubkey> {
    accounts
        .iter()
        .filter(|account| account.is_signer)
        .map(|account| *account.key)
        .collect()
}

/// Principal an escrow transition must be signed by
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Funds the escrow on `initialize`
    Buyer,
    /// Resolves the escrow on `approve` and `refund`
    Arbiter,
}

impl Role {
    pub fn principal(self, escrow: &EscrowAccount) -> Pubkey {
        match self {
            Role::Buyer => escrow.buyer,
            Role::Arbiter => escrow.arbiter,
        }
    }
}

/// Require a signature from the principal holding `role` on this escrow
pub fn authorize(role: Role, escrow: &EscrowAccount, signers: Signers) -> Result<()> {
    let principal = role.principal(escrow);
    require!(signers.contains(&principal), EscrowError::Unauthorized);
    Ok(())
}
