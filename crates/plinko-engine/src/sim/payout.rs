use crate::api::error::ConfigError;
use crate::api::types::{BoardConfig, CollisionEvent, PayoutResult};
use crate::board::multipliers::MultiplierTable;

/// Price a resolved ball. Pure.
///
/// `payout = bet × multiplier`, unrounded; a payout equal to the bet counts
/// as a win. Fails with [`ConfigError::BucketOutOfRange`] when the bucket has
/// no multiplier, which means layout and physics disagree.
pub fn calculate_payout(
    event: CollisionEvent,
    bet_amount: f64,
    config: &BoardConfig,
    table: &MultiplierTable,
) -> Result<PayoutResult, ConfigError> {
    let multiplier = table.multiplier(config, event.bucket_index)?;
    let payout = bet_amount * multiplier;
    Ok(PayoutResult {
        ball_id: event.ball_id,
        bucket_index: event.bucket_index,
        multiplier,
        payout,
        bet_amount,
        is_win: payout >= bet_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{BallId, RiskLevel};

    fn event(bucket_index: usize) -> CollisionEvent {
        CollisionEvent {
            ball_id: BallId(1),
            bucket_index,
        }
    }

    #[test]
    fn medium_sixteen_center_bucket() {
        let table = MultiplierTable::builtin();
        let config = BoardConfig::new(16, RiskLevel::Medium);
        let result = calculate_payout(event(8), 10.0, &config, &table).unwrap();
        assert_eq!(result.multiplier, 0.3);
        assert!((result.payout - 3.0).abs() < 1e-9);
        assert!(!result.is_win);
        assert!((result.net() + 7.0).abs() < 1e-9);
    }

    #[test]
    fn high_eight_edge_bucket_pays_the_maximum() {
        let table = MultiplierTable::builtin();
        let config = BoardConfig::new(8, RiskLevel::High);
        let max = table
            .sequence(&config)
            .unwrap()
            .iter()
            .cloned()
            .fold(f64::MIN, f64::max);

        let result = calculate_payout(event(0), 5.0, &config, &table).unwrap();
        assert_eq!(result.multiplier, max);
        assert_eq!(result.payout, 145.0);
        assert!(result.is_win);
    }

    #[test]
    fn break_even_is_a_win() {
        let table = MultiplierTable::builtin();
        let config = BoardConfig::new(8, RiskLevel::Low);
        // Low/8 index 3 is 1.0x
        let result = calculate_payout(event(3), 2.0, &config, &table).unwrap();
        assert_eq!(result.payout, 2.0);
        assert!(result.is_win);
        assert_eq!(result.net(), 0.0);
    }

    #[test]
    fn out_of_range_bucket_is_config_error() {
        let table = MultiplierTable::builtin();
        let config = BoardConfig::new(8, RiskLevel::Low);
        assert!(matches!(
            calculate_payout(event(9), 1.0, &config, &table),
            Err(ConfigError::BucketOutOfRange { index: 9, len: 9 })
        ));
    }

    #[test]
    fn carries_ball_and_bet_through() {
        let table = MultiplierTable::builtin();
        let config = BoardConfig::new(12, RiskLevel::High);
        let e = CollisionEvent {
            ball_id: BallId(77),
            bucket_index: 6,
        };
        let result = calculate_payout(e, 3.5, &config, &table).unwrap();
        assert_eq!(result.ball_id, BallId(77));
        assert_eq!(result.bucket_index, 6);
        assert_eq!(result.bet_amount, 3.5);
    }
}
