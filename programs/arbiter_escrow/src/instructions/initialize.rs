use anchor_lang::prelude::*;

use crate::{
    custody::LamportCustodian,
    errors::EscrowError,
    events::EscrowInitialized,
    guard::{verified_signers, Signers},
    machine,
    state::{EscrowAccount, EscrowTerms},
};

#[derive(Accounts)]
pub struct Initialize<'info> {
    /// Escrow record; its lamports above the rent reserve are the custody.
    /// `init_if_needed` lets the program report an occupied slot itself.
    #[account(
        init_if_needed,
        payer = buyer,
        space = EscrowAccount::SPACE,
    )]
    pub escrow_account: Account<'info, EscrowAccount>,

    /// The buyer who funds the escrow and pays its rent
    #[account(mut)]
    pub buyer: Signer<'info>,

    /// CHECK: only recorded as the beneficiary of `approve`
    #[account(constraint = recipient.key() != escrow_account.key() @ EscrowError::Unauthorized)]
    pub recipient: UncheckedAccount<'info>,

    /// CHECK: only recorded as the party allowed to resolve
    #[account(constraint = arbiter.key() != escrow_account.key() @ EscrowError::Unauthorized)]
    pub arbiter: UncheckedAccount<'info>,

    pub system_program: Program<'info, System>,
}

impl<'info> Initialize<'info> {
    fn terms(&self, amount: u64) -> EscrowTerms {
        EscrowTerms {
            amount,
            buyer: self.buyer.key(),
            recipient: self.recipient.key(),
            arbiter: self.arbiter.key(),
        }
    }

    /// Record the terms and move the buyer's lamports into the escrow account
    pub fn open_escrow(&mut self, amount: u64, rent: &Rent) -> Result<()> {
        let terms = self.terms(amount);
        let vault = self.escrow_account.to_account_info();
        let system_program = self.system_program.to_account_info();
        let parties = [self.buyer.to_account_info()];
        let signed = verified_signers(&parties);

        let mut custodian =
            LamportCustodian::new(&vault, &parties, rent).with_system_program(&system_program);
        machine::initialize(
            &mut self.escrow_account,
            &mut custodian,
            Signers::new(&signed),
            terms,
        )
    }
}

/// Handler for the initialize instruction
pub fn handler(ctx: Context<Initialize>, amount: u64) -> Result<()> {
    ctx.accounts.open_escrow(amount, &Rent::get()?)?;

    let escrow = &ctx.accounts.escrow_account;
    emit!(EscrowInitialized {
        escrow: escrow.key(),
        buyer: escrow.buyer,
        recipient: escrow.recipient,
        arbiter: escrow.arbiter,
        amount: escrow.amount,
    });

    msg!("Escrow initialized with {} lamports", amount);
    Ok(())
}
