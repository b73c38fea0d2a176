use anchor_lang::prelude::*;

#[error_code]
pub enum EscrowError {
    #[msg("Invalid amount: amount must be greater than zero")]
    InvalidAmount,
    #[msg("Insufficient funds: buyer cannot cover the escrow amount")]
    InsufficientFunds,
    #[msg("Already initialized: escrow slot is occupied")]
    AlreadyInitialized,
    #[msg("Not pending: escrow has already been resolved")]
    NotPending,
    #[msg("Unauthorized: missing or mismatched signature for this transition")]
    Unauthorized,
    #[msg("Not initialized: no escrow exists for this id")]
    NotInitialized,
    #[msg("Arithmetic overflow in lamport accounting")]
    ArithmeticOverflow,
    #[msg("Custody shortfall: escrow holds less than its recorded amount")]
    CustodyShortfall,
}
