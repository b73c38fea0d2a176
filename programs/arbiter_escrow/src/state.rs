use anchor_lang::prelude::*;

use crate::errors::EscrowError;

/// Escrow account holding the terms and resolution status of one escrow
#[account(discriminator = 1)]
#[derive(InitSpace, Debug, Default, PartialEq, Eq)]
pub struct EscrowAccount {
    /// Lamports held in custody, fixed at creation
    pub amount: u64,
    /// The depositing party, refunded on `refund`
    pub buyer: Pubkey,
    /// The beneficiary, paid on `approve`
    pub recipient: Pubkey,
    /// The only party allowed to resolve the escrow
    pub arbiter: Pubkey,
    /// Resolution status, the only field that changes after creation
    pub status: EscrowStatus,
}

#[derive(
    AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq, InitSpace,
)]
pub enum EscrowStatus {
    #[default]
    Pending,
    Approved,
    Refunded,
}

impl EscrowStatus {
    pub fn is_terminal(self) -> bool {
        match self {
            EscrowStatus::Pending => false,
            EscrowStatus::Approved | EscrowStatus::Refunded => true,
        }
    }
}

/// How the arbiter settles a pending escrow
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    Approve,
    Refund,
}

impl Resolution {
    /// Status the record is left in
    pub fn outcome(self) -> EscrowStatus {
        match self {
            Resolution::Approve => EscrowStatus::Approved,
            Resolution::Refund => EscrowStatus::Refunded,
        }
    }

    /// Address that receives the custodied lamports
    pub fn beneficiary(self, escrow: &EscrowAccount) -> Pubkey {
        match self {
            Resolution::Approve => escrow.recipient,
            Resolution::Refund => escrow.buyer,
        }
    }
}

/// Creation parameters for a new escrow
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EscrowTerms {
    pub amount: u64,
    pub buyer: Pubkey,
    pub recipient: Pubkey,
    pub arbiter: Pubkey,
}

impl EscrowAccount {
    /// Bytes allocated for the account: discriminator plus fields
    /// 1 (discriminator) + 8 (amount) + 32 * 3 (parties) + 1 (status) = 106
    pub const SPACE: usize = 1 + Self::INIT_SPACE;

    pub fn open(terms: EscrowTerms) -> Self {
        Self {
            amount: terms.amount,
            buyer: terms.buyer,
            recipient: terms.recipient,
            arbiter: terms.arbiter,
            status: EscrowStatus::Pending,
        }
    }

    /// A zeroed slot decodes with `amount == 0`, which no live escrow can have
    pub fn is_initialized(&self) -> bool {
        self.amount != 0
    }

    pub fn is_pending(&self) -> bool {
        self.is_initialized() && self.status == EscrowStatus::Pending
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move a pending escrow to the resolution's terminal status
    pub(crate) fn settle(&mut self, resolution: Resolution) -> Result<()> {
        require!(self.is_pending(), EscrowError::NotPending);
        self.status = resolution.outcome();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anchor_lang::error::Error;

    use super::*;

    fn terms(amount: u64) -> EscrowTerms {
        EscrowTerms {
            amount,
            buyer: Pubkey::new_unique(),
            recipient: Pubkey::new_unique(),
            arbiter: Pubkey::new_unique(),
        }
    }

    #[test]
    fn space_matches_fixed_layout() {
        assert_eq!(EscrowAccount::INIT_SPACE, 8 + 32 * 3 + 1);
        assert_eq!(EscrowAccount::SPACE, 106);
    }

    #[test]
    fn zeroed_slot_is_uninitialized() {
        let bytes = [0u8; EscrowAccount::INIT_SPACE];
        let slot = EscrowAccount::try_from_slice(&bytes).unwrap();
        assert_eq!(slot, EscrowAccount::default());
        assert!(!slot.is_initialized());
        assert!(!slot.is_pending());
        assert_eq!(slot.status, EscrowStatus::Pending);
    }

    #[test]
    fn status_tag_is_one_byte() {
        for (status, tag) in [
            (EscrowStatus::Pending, 0u8),
            (EscrowStatus::Approved, 1),
            (EscrowStatus::Refunded, 2),
        ] {
            let mut buf = Vec::new();
            status.serialize(&mut buf).unwrap();
            assert_eq!(buf, vec![tag]);
        }
    }

    #[test]
    fn resolution_pays_the_right_party() {
        let escrow = EscrowAccount::open(terms(10));
        assert_eq!(Resolution::Approve.beneficiary(&escrow), escrow.recipient);
        assert_eq!(Resolution::Refund.beneficiary(&escrow), escrow.buyer);
    }

    #[test]
    fn settle_is_one_shot() {
        let mut escrow = EscrowAccount::open(terms(10));
        escrow.settle(Resolution::Refund).unwrap();
        assert_eq!(escrow.status, EscrowStatus::Refunded);
        assert!(escrow.is_terminal());

        let err = escrow.settle(Resolution::Approve).unwrap_err();
        assert_eq!(err, Error::from(EscrowError::NotPending));
        assert_eq!(escrow.status, EscrowStatus::Refunded);
    }
}
