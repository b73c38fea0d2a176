//! In-process host for running escrows without a cluster.
//!
//! Spendable balances and escrow slots share one store. Each call runs as a
//! single transaction against a copy of the one slot it touches and an
//! overlay of changed balances; both are committed only if the call
//! succeeds, so a status change never survives without its transfer.

use std::collections::BTreeMap;

use anchor_lang::prelude::*;

use crate::{
    custody::{CustodyToken, Custodian},
    errors::EscrowError,
    guard::Signers,
    machine,
    state::{EscrowAccount, EscrowTerms, Resolution},
};

/// An escrow record and the lamports held in its custody
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Slot {
    escrow: EscrowAccount,
    custody: u64,
}

#[derive(Clone, Debug, Default)]
pub struct Ledger {
    balances: BTreeMap<Pubkey, u64>,
    slots: BTreeMap<Pubkey, Slot>,
}

/// Custodian view over the ledger's balances and one slot's custody
///
/// Writes land in `pending` and reach the ledger through `Ledger::commit`.
struct Books<'a> {
    balances: &'a BTreeMap<Pubkey, u64>,
    pending: BTreeMap<Pubkey, u64>,
    custody: u64,
}

impl<'a> Books<'a> {
    fn new(balances: &'a BTreeMap<Pubkey, u64>, custody: u64) -> Self {
        Self {
            balances,
            pending: BTreeMap::new(),
            custody,
        }
    }

    fn balance(&self, address: &Pubkey) -> u64 {
        self.pending
            .get(address)
            .or_else(|| self.balances.get(address))
            .copied()
            .unwrap_or_default()
    }
}

impl Custodian for Books<'_> {
    fn debit(&mut self, from: &Pubkey, amount: u64) -> Result<CustodyToken> {
        let remaining = self
            .balance(from)
            .checked_sub(amount)
            .ok_or(EscrowError::InsufficientFunds)?;
        let held = self
            .custody
            .checked_add(amount)
            .ok_or(EscrowError::ArithmeticOverflow)?;

        self.pending.insert(*from, remaining);
        self.custody = held;
        Ok(CustodyToken::new(amount))
    }

    fn release(&mut self, amount: u64) -> Result<CustodyToken> {
        require_gte!(self.custody, amount, EscrowError::CustodyShortfall);
        Ok(CustodyToken::new(amount))
    }

    fn credit(&mut self, token: CustodyToken, to: &Pubkey) -> Result<()> {
        let amount = token.amount();
        let held = self
            .custody
            .checked_sub(amount)
            .ok_or(EscrowError::CustodyShortfall)?;
        let credited = self
            .balance(to)
            .checked_add(amount)
            .ok_or(EscrowError::ArithmeticOverflow)?;

        self.custody = held;
        self.pending.insert(*to, credited);
        Ok(())
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add spendable lamports to `address`
    pub fn fund(&mut self, address: Pubkey, lamports: u64) -> Result<()> {
        let balance = self.balances.entry(address).or_default();
        *balance = balance
            .checked_add(lamports)
            .ok_or(EscrowError::ArithmeticOverflow)?;
        Ok(())
    }

    pub fn balance(&self, address: &Pubkey) -> u64 {
        self.balances.get(address).copied().unwrap_or_default()
    }

    pub fn record(&self, id: &Pubkey) -> Option<&EscrowAccount> {
        self.slots.get(id).map(|slot| &slot.escrow)
    }

    /// Lamports currently held for the escrow `id`
    pub fn custodied(&self, id: &Pubkey) -> u64 {
        self.slots.get(id).map(|slot| slot.custody).unwrap_or_default()
    }

    /// Every lamport the ledger knows about, spendable or in custody
    pub fn total_lamports(&self) -> u128 {
        let spendable: u128 = self.balances.values().map(|&b| u128::from(b)).sum();
        let custodied: u128 = self.slots.values().map(|s| u128::from(s.custody)).sum();
        spendable + custodied
    }

    pub fn initialize(&mut self, id: Pubkey, signers: Signers, terms: EscrowTerms) -> Result<()> {
        let mut slot = self.slots.get(&id).cloned().unwrap_or_default();
        let mut books = Books::new(&self.balances, slot.custody);
        machine::initialize(&mut slot.escrow, &mut books, signers, terms)?;

        let Books { pending, custody, .. } = books;
        slot.custody = custody;
        self.commit(id, slot, pending);

        msg!("escrow {} opened for {} lamports", id, terms.amount);
        Ok(())
    }

    pub fn approve(&mut self, id: &Pubkey, signers: Signers) -> Result<Pubkey> {
        self.resolve(id, signers, Resolution::Approve)
    }

    pub fn refund(&mut self, id: &Pubkey, signers: Signers) -> Result<Pubkey> {
        self.resolve(id, signers, Resolution::Refund)
    }

    fn resolve(
        &mut self,
        id: &Pubkey,
        signers: Signers,
        resolution: Resolution,
    ) -> Result<Pubkey> {
        let mut slot = self
            .slots
            .get(id)
            .cloned()
            .ok_or_else(|| error!(EscrowError::NotInitialized))?;
        let mut books = Books::new(&self.balances, slot.custody);
        let beneficiary = machine::resolve(&mut slot.escrow, &mut books, signers, resolution)?;

        let Books { pending, custody, .. } = books;
        slot.custody = custody;
        msg!("escrow {} {:?}, paid {}", id, slot.escrow.status, beneficiary);
        self.commit(*id, slot, pending);
        Ok(beneficiary)
    }

    /// Write back the outcome of a successful call
    fn commit(&mut self, id: Pubkey, slot: Slot, balances: BTreeMap<Pubkey, u64>) {
        self.balances.extend(balances);
        self.slots.insert(id, slot);
    }
}

#[cfg(test)]
mod tests {
    use anchor_lang::error::Error;

    use super::*;
    use crate::state::EscrowStatus;

    struct Parties {
        id: Pubkey,
        terms: EscrowTerms,
    }

    impl Parties {
        fn new(amount: u64) -> Self {
            Self {
                id: Pubkey::new_unique(),
                terms: EscrowTerms {
                    amount,
                    buyer: Pubkey::new_unique(),
                    recipient: Pubkey::new_unique(),
                    arbiter: Pubkey::new_unique(),
                },
            }
        }
    }

    fn opened(amount: u64) -> (Ledger, Parties) {
        let parties = Parties::new(amount);
        let mut ledger = Ledger::new();
        ledger.fund(parties.terms.buyer, amount).unwrap();
        ledger
            .initialize(parties.id, Signers::new(&[parties.terms.buyer]), parties.terms)
            .unwrap();
        (ledger, parties)
    }

    #[test]
    fn failed_initialize_leaves_no_slot() {
        let parties = Parties::new(100);
        let mut ledger = Ledger::new();
        ledger.fund(parties.terms.buyer, 99).unwrap();

        let err = ledger
            .initialize(parties.id, Signers::new(&[parties.terms.buyer]), parties.terms)
            .unwrap_err();
        assert_eq!(err, Error::from(EscrowError::InsufficientFunds));
        assert!(ledger.record(&parties.id).is_none());
        assert_eq!(ledger.balance(&parties.terms.buyer), 99);
    }

    #[test]
    fn failed_payout_rolls_back_status() {
        let (mut ledger, parties) = opened(10);
        ledger.fund(parties.terms.recipient, u64::MAX - 5).unwrap();

        let arbiter = [parties.terms.arbiter];
        let err = ledger.approve(&parties.id, Signers::new(&arbiter)).unwrap_err();
        assert_eq!(err, Error::from(EscrowError::ArithmeticOverflow));

        let escrow = ledger.record(&parties.id).unwrap();
        assert_eq!(escrow.status, EscrowStatus::Pending);
        assert_eq!(ledger.custodied(&parties.id), 10);

        // The other outcome is still available
        ledger.refund(&parties.id, Signers::new(&arbiter)).unwrap();
        assert_eq!(ledger.balance(&parties.terms.buyer), 10);
    }

    #[test]
    fn unknown_id_is_not_initialized() {
        let mut ledger = Ledger::new();
        let arbiter = Pubkey::new_unique();
        let err = ledger
            .approve(&Pubkey::new_unique(), Signers::new(&[arbiter]))
            .unwrap_err();
        assert_eq!(err, Error::from(EscrowError::NotInitialized));
    }

    #[test]
    fn ids_are_never_reused() {
        let (mut ledger, parties) = opened(10);
        ledger
            .refund(&parties.id, Signers::new(&[parties.terms.arbiter]))
            .unwrap();

        let err = ledger
            .initialize(parties.id, Signers::new(&[parties.terms.buyer]), parties.terms)
            .unwrap_err();
        assert_eq!(err, Error::from(EscrowError::AlreadyInitialized));
        assert_eq!(ledger.record(&parties.id).unwrap().status, EscrowStatus::Refunded);
    }

    #[test]
    fn missing_custody_is_a_shortfall() {
        let (mut ledger, parties) = opened(10);
        if let Some(slot) = ledger.slots.get_mut(&parties.id) {
            slot.custody = 9;
        }

        let arbiter = [parties.terms.arbiter];
        let err = ledger.refund(&parties.id, Signers::new(&arbiter)).unwrap_err();
        assert_eq!(err, Error::from(EscrowError::CustodyShortfall));
        assert_eq!(ledger.record(&parties.id).unwrap().status, EscrowStatus::Pending);
        assert_eq!(ledger.balance(&parties.terms.buyer), 0);
    }

    #[test]
    fn failed_call_touches_no_other_slot() {
        let (mut ledger, first) = opened(10);
        let second = Parties::new(20);
        ledger.fund(second.terms.buyer, 20).unwrap();
        ledger
            .initialize(second.id, Signers::new(&[second.terms.buyer]), second.terms)
            .unwrap();

        let err = ledger
            .approve(&first.id, Signers::new(&[first.terms.buyer]))
            .unwrap_err();
        assert_eq!(err, Error::from(EscrowError::Unauthorized));
        assert_eq!(ledger.custodied(&first.id), 10);
        assert_eq!(ledger.custodied(&second.id), 20);
        assert_eq!(ledger.total_lamports(), 30);
    }

    #[test]
    fn lamports_are_conserved() {
        let (mut ledger, parties) = opened(42);
        assert_eq!(ledger.total_lamports(), 42);
        ledger
            .approve(&parties.id, Signers::new(&[parties.terms.arbiter]))
            .unwrap();
        assert_eq!(ledger.total_lamports(), 42);
        assert_eq!(ledger.custodied(&parties.id), 0);
    }
}
