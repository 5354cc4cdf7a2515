//! ICP amount helpers
//!
//! Ledger amounts are counted in e8s (10^-8 ICP). These helpers move between
//! e8s and ICP, format amounts for display and compute the fees charged on
//! a transfer.

use crate::error::AmountError;
use serde::{Deserialize, Serialize};

/// Number of e8s in one ICP
pub const E8S_PER_ICP: u64 = 100_000_000;

/// Ledger fee for a single transfer, 0.0001 ICP
pub const ICP_TRANSFER_FEE_E8S: u64 = 10_000;

/// FusionPay service fee, 0.1% of the transferred amount
pub const FUSION_PAY_FEE_RATE: f64 = 0.001;

/// Fees charged on a transfer, all in e8s
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFees {
    pub network_fee: u64,
    pub fusion_pay_fee: u64,
    pub total_fees: u64,
}

/// Converts e8s to ICP
pub fn e8s_to_icp(e8s: u64) -> f64 {
    e8s as f64 / E8S_PER_ICP as f64
}

/// Converts ICP to e8s, rounding to the nearest e8
///
/// # Errors
/// `AmountError::Invalid` for negative or non-finite input,
/// `AmountError::Overflow` when the result does not fit in a `u64`
pub fn icp_to_e8s(icp: f64) -> Result<u64, AmountError> {
    if !icp.is_finite() || icp < 0.0 {
        return Err(AmountError::Invalid(icp));
    }

    let e8s = (icp * E8S_PER_ICP as f64).round();
    // u64::MAX rounds up to 2^64 as f64, so anything below it fits
    if e8s >= u64::MAX as f64 {
        return Err(AmountError::Overflow(icp));
    }

    Ok(e8s as u64)
}

/// Formats e8s as ICP with up to 8 decimals and no trailing zeros
///
/// `150_000_000` becomes `"1.5"`, `10_000_000_000` becomes `"100"`.
pub fn format_icp(e8s: u64) -> String {
    let fixed = format!("{:.8}", e8s_to_icp(e8s));
    fixed
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Computes the fees for transferring `amount_e8s`
///
/// The service fee is rounded down to a whole e8.
pub fn calculate_transaction_fees(amount_e8s: u64) -> TransactionFees {
    let fusion_pay_fee = (amount_e8s as f64 * FUSION_PAY_FEE_RATE).floor() as u64;
    TransactionFees {
        network_fee: ICP_TRANSFER_FEE_E8S,
        fusion_pay_fee,
        total_fees: ICP_TRANSFER_FEE_E8S.saturating_add(fusion_pay_fee),
    }
}
