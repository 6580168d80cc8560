//! Token-2022 transfer fee
//!
//! 带 transfer fee 的 mint 在转账时会被扣掉一部分，报价时要把这部分算进去：
//! 输入侧先扣再模拟，输出侧按实际到账量报给用户。

use crate::common::errors::{ClmmError, ClmmResult};
use crate::constants::TRANSFER_FEE_POINT;
use serde::{Deserialize, Serialize};

/// 单个 epoch 区间内生效的费率
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFee {
    /// 从这个 epoch 开始生效
    pub epoch: u64,
    /// 单笔转账最多收取的费用
    pub maximum_fee: u64,
    /// 费率（基点，10_000 = 100%）
    pub transfer_fee_basis_points: u16,
}

/// mint 的 transfer fee 配置：新费率到 `newer.epoch` 才生效，此前沿用旧费率
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFeeConfig {
    pub older_transfer_fee: TransferFee,
    pub newer_transfer_fee: TransferFee,
}

impl TransferFeeConfig {
    pub fn get_epoch_fee(&self, epoch: u64) -> &TransferFee {
        if epoch >= self.newer_transfer_fee.epoch {
            &self.newer_transfer_fee
        } else {
            &self.older_transfer_fee
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferAmountFee {
    pub amount: u64,
    pub fee: u64,
}

fn to_u64(value: u128, context: &'static str) -> ClmmResult<u64> {
    u64::try_from(value).map_err(|_| ClmmError::MathOverflow(context))
}

/// 计算转账 `amount` 时的 transfer fee
///
/// - `add_fee = false`：`amount` 是转出量，返回 `amount` 不变，fee 为转账时被扣掉的部分
/// - `add_fee = true`：`amount` 是希望到账的量，返回需要转出的总量（到账量 + fee）
///
/// 没有配置时 fee 为 0
pub fn get_transfer_amount_fee(
    amount: u64,
    fee_config: Option<&TransferFeeConfig>,
    epoch: u64,
    add_fee: bool,
) -> ClmmResult<TransferAmountFee> {
    let Some(fee_config) = fee_config else {
        return Ok(TransferAmountFee { amount, fee: 0 });
    };
    let transfer_fee = fee_config.get_epoch_fee(epoch);
    let basis_points = u128::from(transfer_fee.transfer_fee_basis_points);
    let max_fee = u128::from(transfer_fee.maximum_fee);
    let point = u128::from(TRANSFER_FEE_POINT);
    let amount_u128 = u128::from(amount);

    if add_fee {
        if basis_points >= point {
            // 100% 费率：只能按上限补
            return Ok(TransferAmountFee {
                amount: to_u64(amount_u128 + max_fee, "transfer amount with fee")?,
                fee: transfer_fee.maximum_fee,
            });
        }
        let gross = (amount_u128 * point).div_ceil(point - basis_points);
        let gross = if gross - amount_u128 > max_fee {
            amount_u128 + max_fee
        } else {
            gross
        };
        let fee = (gross * basis_points).div_ceil(point).min(max_fee);
        Ok(TransferAmountFee {
            amount: to_u64(gross, "transfer amount with fee")?,
            fee: to_u64(fee, "transfer fee")?,
        })
    } else {
        let fee = (amount_u128 * basis_points).div_ceil(point).min(max_fee);
        Ok(TransferAmountFee {
            amount,
            fee: to_u64(fee, "transfer fee")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(basis_points: u16, maximum_fee: u64) -> TransferFeeConfig {
        let fee = TransferFee {
            epoch: 0,
            maximum_fee,
            transfer_fee_basis_points: basis_points,
        };
        TransferFeeConfig {
            older_transfer_fee: fee,
            newer_transfer_fee: fee,
        }
    }

    #[test]
    fn test_no_config() {
        let result = get_transfer_amount_fee(1_000, None, 0, true).unwrap();
        assert_eq!(result, TransferAmountFee { amount: 1_000, fee: 0 });
    }

    #[test]
    fn test_deduct_fee_rounds_up() {
        // 1% of 1_001 = 10.01 -> 11
        let result = get_transfer_amount_fee(1_001, Some(&config(100, u64::MAX)), 0, false).unwrap();
        assert_eq!(result, TransferAmountFee { amount: 1_001, fee: 11 });
    }

    #[test]
    fn test_deduct_fee_capped() {
        let result = get_transfer_amount_fee(1_000_000, Some(&config(100, 50)), 0, false).unwrap();
        assert_eq!(result.fee, 50);
    }

    #[test]
    fn test_add_fee_grosses_up() {
        // 到账 990 需要转出 1000，fee 10
        let result = get_transfer_amount_fee(990, Some(&config(100, u64::MAX)), 0, true).unwrap();
        assert_eq!(result, TransferAmountFee { amount: 1_000, fee: 10 });
        // 转出后扣费正好剩下目标到账量
        let back = get_transfer_amount_fee(result.amount, Some(&config(100, u64::MAX)), 0, false).unwrap();
        assert_eq!(back.amount - back.fee, 990);
    }

    #[test]
    fn test_add_fee_capped_by_maximum() {
        let result = get_transfer_amount_fee(1_000_000, Some(&config(100, 50)), 0, true).unwrap();
        assert_eq!(result, TransferAmountFee { amount: 1_000_050, fee: 50 });
    }

    #[test]
    fn test_full_basis_points_adds_maximum_fee() {
        let result = get_transfer_amount_fee(1_000, Some(&config(10_000, 7)), 0, true).unwrap();
        assert_eq!(result, TransferAmountFee { amount: 1_007, fee: 7 });
    }

    #[test]
    fn test_epoch_selects_fee() {
        let fee_config = TransferFeeConfig {
            older_transfer_fee: TransferFee {
                epoch: 0,
                maximum_fee: u64::MAX,
                transfer_fee_basis_points: 100,
            },
            newer_transfer_fee: TransferFee {
                epoch: 500,
                maximum_fee: u64::MAX,
                transfer_fee_basis_points: 200,
            },
        };
        assert_eq!(get_transfer_amount_fee(10_000, Some(&fee_config), 499, false).unwrap().fee, 100);
        assert_eq!(get_transfer_amount_fee(10_000, Some(&fee_config), 500, false).unwrap().fee, 200);
    }

    #[test]
    fn test_overflow_reported() {
        let result = get_transfer_amount_fee(u64::MAX, Some(&config(10_000, 1)), 0, true);
        assert!(matches!(result, Err(ClmmError::MathOverflow(_))));
    }
}
