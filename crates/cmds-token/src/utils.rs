use rust_decimal::{
    prelude::{MathematicalOps, ToPrimitive},
    Decimal,
};
use solana_sdk::native_token::LAMPORTS_PER_SOL;

pub fn sol_to_lamports(amount: Decimal) -> crate::Result<u64> {
    if amount < Decimal::ZERO {
        return Err(crate::Error::Amount("amount is negative".to_owned()));
    }
    amount
        .checked_mul(Decimal::from(LAMPORTS_PER_SOL))
        .and_then(|d| d.floor().to_u64())
        .ok_or_else(|| crate::Error::Amount("value overflow".to_owned()))
}

/// Convert the UI representation of a token amount (using the decimals field defined in its mint)
/// to the raw amount.
///
/// Amounts finer than one base unit are rejected instead of rounded.
pub fn ui_amount_to_amount(ui_amount: Decimal, decimals: u8) -> crate::Result<u64> {
    if ui_amount < Decimal::ZERO {
        return Err(crate::Error::Amount("amount is negative".to_owned()));
    }
    if ui_amount.normalize().scale() > decimals as u32 {
        return Err(crate::Error::Amount(format!(
            "{} has more than {} decimal places",
            ui_amount, decimals
        )));
    }
    Decimal::TEN
        .checked_powu(decimals as u64)
        .and_then(|scale| ui_amount.checked_mul(scale))
        .and_then(|d| d.to_u64())
        .ok_or_else(|| crate::Error::Amount("amount overflow".to_owned()))
}
