use anchor_lang::prelude::*;

pub mod custody;
pub mod errors;
pub mod events;
pub mod guard;
mod instructions;
#[cfg(not(target_os = "solana"))]
pub mod ledger;
pub mod machine;
pub mod state;

use instructions::*;
use state::Resolution;

declare_id!("22222222222222222222222222222222222222222222");

#[program]
pub mod arbiter_escrow {
    use super::*;

    /// Open an escrow: buyer deposits `amount` lamports for the recipient
    #[instruction(discriminator = 0)]
    pub fn initialize(ctx: Context<Initialize>, amount: u64) -> Result<()> {
        instructions::initialize::handler(ctx, amount)
    }

    /// Arbiter releases the custodied lamports to the recipient
    #[instruction(discriminator = 1)]
    pub fn approve(ctx: Context<Resolve>) -> Result<()> {
        instructions::resolve::handler(ctx, Resolution::Approve)
    }

    /// Arbiter returns the custodied lamports to the buyer
    #[instruction(discriminator = 2)]
    pub fn refund(ctx: Context<Resolve>) -> Result<()> {
        instructions::resolve::handler(ctx, Resolution::Refund)
    }
}
