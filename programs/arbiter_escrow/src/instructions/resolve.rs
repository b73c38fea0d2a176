use anchor_lang::prelude::*;

use crate::{
    custody::LamportCustodian,
    errors::EscrowError,
    events::EscrowResolved,
    guard::{verified_signers, Signers},
    machine,
    state::{EscrowAccount, Resolution},
};

/// Accounts shared by `approve` and `refund`
#[derive(Accounts)]
pub struct Resolve<'info> {
    /// Escrow record being settled; its custody is paid out
    #[account(
        mut,
        has_one = buyer @ EscrowError::Unauthorized,
        has_one = recipient @ EscrowError::Unauthorized,
    )]
    pub escrow_account: Account<'info, EscrowAccount>,

    /// CHECK: pinned to the record by `has_one`; receives lamports on refund
    #[account(mut)]
    pub buyer: UncheckedAccount<'info>,

    /// CHECK: pinned to the record by `has_one`; receives lamports on approve
    #[account(mut)]
    pub recipient: UncheckedAccount<'info>,

    /// CHECK: identity and signature are checked against the record by the guard
    pub arbiter: UncheckedAccount<'info>,
}

impl<'info> Resolve<'info> {
    /// Settle the escrow and pay the beneficiary, returning who was paid
    pub fn settle(&mut self, resolution: Resolution, rent: &Rent) -> Result<Pubkey> {
        let vault = self.escrow_account.to_account_info();
        let parties = [self.buyer.to_account_info(), self.recipient.to_account_info()];
        let signed = verified_signers(&[
            self.buyer.to_account_info(),
            self.recipient.to_account_info(),
            self.arbiter.to_account_info(),
        ]);

        let mut custodian = LamportCustodian::new(&vault, &parties, rent);
        machine::resolve(
            &mut self.escrow_account,
            &mut custodian,
            Signers::new(&signed),
            resolution,
        )
    }
}

/// Handler for the approve and refund instructions
pub fn handler(ctx: Context<Resolve>, resolution: Resolution) -> Result<()> {
    let beneficiary = ctx.accounts.settle(resolution, &Rent::get()?)?;

    let escrow = &ctx.accounts.escrow_account;
    emit!(EscrowResolved {
        escrow: escrow.key(),
        status: escrow.status,
        beneficiary,
        amount: escrow.amount,
    });

    msg!(
        "Escrow {:?}: {} lamports to {}",
        escrow.status,
        escrow.amount,
        beneficiary
    );
    Ok(())
}
