use anchor_lang::prelude::*;
use anchor_lang::system_program::{transfer, Transfer};

use crate::errors::EscrowError;

/// Receipt for lamports held in custody
///
/// Only a custodian mints one: `debit` when lamports come in, `release` after
/// checking custody still holds the amount. `credit` consumes it.
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub struct CustodyToken {
    amount: u64,
}

impl CustodyToken {
    pub(crate) fn new(amount: u64) -> Self {
        Self { amount }
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }
}

/// The host's value-transfer primitive, seen from one escrow
pub trait Custodian {
    /// Move `amount` from `from` into this escrow's custody
    fn debit(&mut self, from: &Pubkey, amount: u64) -> Result<CustodyToken>;

    /// Reissue a token for `amount`, failing if custody holds less
    fn release(&mut self, amount: u64) -> Result<CustodyToken>;

    /// Pay everything the token covers out of custody to `to`
    fn credit(&mut self, token: CustodyToken, to: &Pubkey) -> Result<()>;
}

/// A debit must leave the source either empty or rent exempt
fn check_spendable(lamports: u64, amount: u64, floor: u64) -> Result<()> {
    let left = lamports
        .checked_sub(amount)
        .ok_or(EscrowError::InsufficientFunds)?;
    require!(left == 0 || left >= floor, EscrowError::InsufficientFunds);
    Ok(())
}

/// Custodian backed by the lamports of the program-owned escrow account
///
/// The rent-exempt reserve paid at account creation is never custody; only
/// lamports above it can be released and paid out.
pub struct LamportCustodian<'a, 'info> {
    vault: &'a AccountInfo<'info>,
    parties: &'a [AccountInfo<'info>],
    rent: &'a Rent,
    system_program: Option<&'a AccountInfo<'info>>,
}

impl<'a, 'info> LamportCustodian<'a, 'info> {
    pub fn new(
        vault: &'a AccountInfo<'info>,
        parties: &'a [AccountInfo<'info>],
        rent: &'a Rent,
    ) -> Self {
        Self {
            vault,
            parties,
            rent,
            system_program: None,
        }
    }

    /// Debits are System Program transfers and need the program account
    pub fn with_system_program(mut self, system_program: &'a AccountInfo<'info>) -> Self {
        self.system_program = Some(system_program);
        self
    }

    /// Only accounts handed to the instruction can send or receive lamports,
    /// and the escrow account never pays itself
    fn party(&self, address: &Pubkey) -> Result<&'a AccountInfo<'info>> {
        require_keys_neq!(*address, *self.vault.key, EscrowError::Unauthorized);
        self.parties
            .iter()
            .find(|account| account.key == address)
            .ok_or_else(|| error!(EscrowError::Unauthorized))
    }

    /// Lamports in the escrow account above its rent-exempt reserve
    fn held(&self) -> u64 {
        let reserve = self.rent.minimum_balance(self.vault.data_len());
        self.vault.lamports().saturating_sub(reserve)
    }
}

impl Custodian for LamportCustodian<'_, '_> {
    fn debit(&mut self, from: &Pubkey, amount: u64) -> Result<CustodyToken> {
        let source = self.party(from)?;
        let system_program = self
            .system_program
            .ok_or(ProgramError::NotEnoughAccountKeys)?;
        check_spendable(
            source.lamports(),
            amount,
            self.rent.minimum_balance(source.data_len()),
        )?;

        let cpi_context = CpiContext::new(
            system_program.clone(),
            Transfer {
                from: source.clone(),
                to: self.vault.clone(),
            },
        );
        transfer(cpi_context, amount)?;

        Ok(CustodyToken::new(amount))
    }

    fn release(&mut self, amount: u64) -> Result<CustodyToken> {
        require_gte!(self.held(), amount, EscrowError::CustodyShortfall);
        Ok(CustodyToken::new(amount))
    }

    fn credit(&mut self, token: CustodyToken, to: &Pubkey) -> Result<()> {
        let destination = self.party(to)?;
        let amount = token.amount;

        // Program-owned, so debited in place
        let remaining = self
            .vault
            .lamports()
            .checked_sub(amount)
            .ok_or(EscrowError::CustodyShortfall)?;
        let credited = destination
            .lamports()
            .checked_add(amount)
            .ok_or(EscrowError::ArithmeticOverflow)?;

        **self.vault.try_borrow_mut_lamports()? = remaining;
        **destination.try_borrow_mut_lamports()? = credited;
        Ok(())
    }
}
