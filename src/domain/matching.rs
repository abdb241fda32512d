//! FIFO lot matching.
//!
//! A sell is matched against the open buy lots of the same copy trading and
//! market, oldest lot first. Outcomes are compared by index: events from the
//! activity feed and the user channel label outcomes differently, so the
//! label is carried for display only. Planning is pure; the settlement ledger
//! runs it against the lots it reads inside its write transaction.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::error::DomainError;
use super::id::{CopyTradingId, LotId, OrderId, TradeId};
use super::ledger::{NewSellMatch, NewSellMatchDetail, SellMatchRecord};

/// Key under which buy lots are matched against sells.
///
/// `None` for the outcome index means the outcome is unknown; it matches
/// lots of any outcome in the market.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub copy_trading_id: CopyTradingId,
    pub market: String,
    pub outcome_index: Option<i32>,
}

impl MatchKey {
    /// Whether `lot` can cover a sell under this key.
    #[must_use]
    pub fn admits(&self, lot: &BuyLot) -> bool {
        lot.copy_trading_id == self.copy_trading_id
            && lot.market == self.market
            && match (self.outcome_index, lot.outcome_index) {
                (Some(wanted), Some(held)) => wanted == held,
                _ => true,
            }
    }
}

/// An open replicated buy quantity at a recorded price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuyLot {
    pub id: LotId,
    pub copy_trading_id: CopyTradingId,
    pub buy_order_id: OrderId,
    pub market: String,
    pub side: String,
    pub outcome_index: Option<i32>,
    pub price: Decimal,
    pub remaining_quantity: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A replicated buy to open as a lot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBuyLot {
    pub key: MatchKey,
    /// Outcome label, e.g. "Yes".
    pub side: String,
    pub buy_order_id: OrderId,
    pub price: Decimal,
    pub quantity: Decimal,
}

/// A replicated sell to match against open buy lots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellFill {
    pub copy_trading_id: CopyTradingId,
    pub sell_order_id: OrderId,
    pub leader_sell_trade_id: TradeId,
    pub market: String,
    /// Outcome label, e.g. "Yes". May be empty.
    pub side: String,
    pub outcome_index: Option<i32>,
    pub sell_price: Decimal,
    pub sell_quantity: Decimal,
}

impl SellFill {
    #[must_use]
    pub fn key(&self) -> MatchKey {
        MatchKey {
            copy_trading_id: self.copy_trading_id,
            market: self.market.clone(),
            outcome_index: self.outcome_index,
        }
    }
}

/// Outcome of planning a FIFO match.
///
/// Each detail's `tracking_id` and `matched_quantity` is also the decrement to
/// apply to that lot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchPlan {
    pub details: Vec<NewSellMatchDetail>,
    /// Sell quantity left over when lots ran out.
    pub unmatched_quantity: Decimal,
}

impl MatchPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    #[must_use]
    pub fn matched_quantity(&self) -> Decimal {
        self.details.iter().map(|d| d.matched_quantity).sum()
    }
}

/// Why a sell was left unsettled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoOpenLots,
    /// The sell named no outcome and the market holds lots in several.
    AmbiguousOutcome { outcomes: Vec<i32> },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOpenLots => f.write_str("no open lots"),
            Self::AmbiguousOutcome { outcomes } => {
                write!(f, "outcome unknown, lots held in outcomes {outcomes:?}")
            }
        }
    }
}

/// A sell ready to be written, or the reason it is not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementPlan {
    Match {
        sell: NewSellMatch,
        unmatched_quantity: Decimal,
    },
    Skip(SkipReason),
}

/// What a settlement ledger did with a sell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    Recorded {
        record: SellMatchRecord,
        unmatched_quantity: Decimal,
    },
    Skipped(SkipReason),
}

/// Walk `lots` in the given order and take `min(remaining sell, lot remaining)`
/// from each until the sell is covered or the lots are exhausted.
///
/// Lots must already be ordered oldest-first. Lots with nothing remaining are
/// skipped.
///
/// # Errors
///
/// Returns [`DomainError::NonPositiveQuantity`] if `sell_quantity <= 0`.
pub fn plan_fifo(
    lots: &[BuyLot],
    sell_price: Decimal,
    sell_quantity: Decimal,
) -> Result<MatchPlan, DomainError> {
    if sell_quantity <= Decimal::ZERO {
        return Err(DomainError::NonPositiveQuantity {
            quantity: sell_quantity,
        });
    }

    let mut remaining = sell_quantity;
    let mut plan = MatchPlan::default();

    for lot in lots {
        if remaining <= Decimal::ZERO {
            break;
        }
        if lot.remaining_quantity <= Decimal::ZERO {
            continue;
        }

        let matched = remaining.min(lot.remaining_quantity);
        plan.details.push(NewSellMatchDetail::try_new(
            lot.id,
            lot.buy_order_id.clone(),
            matched,
            lot.price,
            sell_price,
        )?);
        remaining -= matched;
    }

    plan.unmatched_quantity = remaining;
    Ok(plan)
}

/// Select the lots that may cover `fill` and plan the match.
///
/// `market_lots` are the open lots of the fill's copy trading and market,
/// oldest first. A fill with an outcome index takes lots of that index plus
/// lots whose index was never recorded. A fill without one narrows by label
/// when some lot carries the same label; otherwise it may only proceed when
/// every candidate lot shares a single outcome index.
///
/// # Errors
///
/// Returns [`DomainError::NonPositiveQuantity`] if the sell quantity is not
/// positive.
pub fn plan_settlement(
    fill: &SellFill,
    market_lots: &[BuyLot],
) -> Result<SettlementPlan, DomainError> {
    if fill.sell_quantity <= Decimal::ZERO {
        return Err(DomainError::NonPositiveQuantity {
            quantity: fill.sell_quantity,
        });
    }

    let key = fill.key();
    let mut candidates: Vec<BuyLot> = market_lots
        .iter()
        .filter(|lot| lot.remaining_quantity > Decimal::ZERO && key.admits(lot))
        .cloned()
        .collect();

    if fill.outcome_index.is_none() && !fill.side.is_empty() {
        let labelled: Vec<BuyLot> = candidates
            .iter()
            .filter(|lot| lot.side == fill.side)
            .cloned()
            .collect();
        if !labelled.is_empty() {
            candidates = labelled;
        }
    }

    let mut outcomes: Vec<i32> = candidates.iter().filter_map(|l| l.outcome_index).collect();
    outcomes.sort_unstable();
    outcomes.dedup();
    if fill.outcome_index.is_none() && outcomes.len() > 1 {
        return Ok(SettlementPlan::Skip(SkipReason::AmbiguousOutcome { outcomes }));
    }

    let plan = plan_fifo(&candidates, fill.sell_price, fill.sell_quantity)?;
    if plan.is_empty() {
        return Ok(SettlementPlan::Skip(SkipReason::NoOpenLots));
    }

    let side = if fill.side.is_empty() {
        candidates
            .first()
            .map(|lot| lot.side.clone())
            .unwrap_or_default()
    } else {
        fill.side.clone()
    };
    let sell = NewSellMatch::new(
        fill.copy_trading_id,
        fill.sell_order_id.clone(),
        fill.leader_sell_trade_id.clone(),
        fill.market.clone(),
        side,
        fill.outcome_index.or_else(|| outcomes.first().copied()),
        fill.sell_price,
        plan.details,
    );
    Ok(SettlementPlan::Match {
        sell,
        unmatched_quantity: plan.unmatched_quantity,
    })
}
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn lot(id: i64, price: Decimal, remaining: Decimal) -> BuyLot {
        BuyLot {
            id: LotId::new(id),
            copy_trading_id: CopyTradingId::new(1),
            buy_order_id: OrderId::new(format!("0xb{id}")),
            market: "m".into(),
            side: "Yes".into(),
            outcome_index: Some(0),
            price,
            remaining_quantity: remaining,
            created_at: Utc.timestamp_opt(id, 0).unwrap(),
        }
    }

    #[test]
    fn sell_spanning_two_lots_consumes_oldest_first() {
        let lots = vec![lot(1, dec!(0.40), dec!(6)), lot(2, dec!(0.45), dec!(8))];

        let plan = plan_fifo(&lots, dec!(0.50), dec!(10)).unwrap();

        assert_eq!(plan.details.len(), 2);
        assert_eq!(plan.details[0].matched_quantity, dec!(6));
        assert_eq!(plan.details[0].buy_price, dec!(0.40));
        assert_eq!(plan.details[1].matched_quantity, dec!(4));
        assert_eq!(plan.details[1].buy_price, dec!(0.45));
        assert_eq!(plan.matched_quantity(), dec!(10));
        assert_eq!(plan.unmatched_quantity, Decimal::ZERO);
        assert_eq!(plan.details[0].tracking_id, LotId::new(1));
        assert_eq!(plan.details[1].tracking_id, LotId::new(2));
    }

    #[test]
    fn short_inventory_matches_partially() {
        let lots = vec![lot(1, dec!(0.40), dec!(3))];

        let plan = plan_fifo(&lots, dec!(0.50), dec!(10)).unwrap();

        assert_eq!(plan.matched_quantity(), dec!(3));
        assert_eq!(plan.unmatched_quantity, dec!(7));
    }

    #[test]
    fn exhausted_lots_are_skipped() {
        let lots = vec![lot(1, dec!(0.40), Decimal::ZERO), lot(2, dec!(0.45), dec!(5))];

        let plan = plan_fifo(&lots, dec!(0.50), dec!(2)).unwrap();

        assert_eq!(plan.details.len(), 1);
        assert_eq!(plan.details[0].tracking_id, LotId::new(2));
    }

    #[test]
    fn no_lots_yields_empty_plan() {
        let plan = plan_fifo(&[], dec!(0.50), dec!(2)).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.unmatched_quantity, dec!(2));
    }

    #[test]
    fn zero_sell_quantity_is_rejected() {
        let lots = vec![lot(1, dec!(0.40), dec!(3))];
        assert!(plan_fifo(&lots, dec!(0.50), Decimal::ZERO).is_err());
    }

    #[test]
    fn details_carry_realized_pnl() {
        let lots = vec![lot(1, dec!(0.40), dec!(10))];
        let plan = plan_fifo(&lots, dec!(0.50), dec!(10)).unwrap();
        assert_eq!(plan.details[0].realized_pnl, dec!(1.00));
    }

    fn in_outcome(id: i64, side: &str, outcome_index: Option<i32>) -> BuyLot {
        BuyLot {
            side: side.into(),
            outcome_index,
            ..lot(id, dec!(0.40), dec!(5))
        }
    }

    fn sell(side: &str, outcome_index: Option<i32>, quantity: Decimal) -> SellFill {
        SellFill {
            copy_trading_id: CopyTradingId::new(1),
            sell_order_id: OrderId::from("0xs1"),
            leader_sell_trade_id: TradeId::from("0xleadersell"),
            market: "m".into(),
            side: side.into(),
            outcome_index,
            sell_price: dec!(0.50),
            sell_quantity: quantity,
        }
    }

    fn matched(plan: SettlementPlan) -> NewSellMatch {
        match plan {
            SettlementPlan::Match { sell, .. } => sell,
            SettlementPlan::Skip(reason) => panic!("expected a match, skipped: {reason}"),
        }
    }

    #[test]
    fn outcome_index_decides_over_label() {
        let lots = vec![in_outcome(1, "Yes", Some(0)), in_outcome(2, "No", Some(1))];

        let sell = matched(plan_settlement(&sell("0", Some(0), dec!(3)), &lots).unwrap());

        assert_eq!(sell.details().len(), 1);
        assert_eq!(sell.details()[0].tracking_id, LotId::new(1));
        assert_eq!(sell.outcome_index, Some(0));
    }

    #[test]
    fn unlabelled_sell_takes_the_only_outcome_held() {
        let lots = vec![in_outcome(1, "Yes", Some(0)), in_outcome(2, "Yes", Some(0))];

        let sell = matched(plan_settlement(&sell("", None, dec!(7)), &lots).unwrap());

        assert_eq!(sell.total_matched_quantity(), dec!(7));
        assert_eq!(sell.side, "Yes");
        assert_eq!(sell.outcome_index, Some(0));
    }

    #[test]
    fn unknown_outcome_over_several_held_is_skipped() {
        let lots = vec![in_outcome(1, "Yes", Some(0)), in_outcome(2, "No", Some(1))];

        let plan = plan_settlement(&sell("", None, dec!(2)), &lots).unwrap();

        assert_eq!(
            plan,
            SettlementPlan::Skip(SkipReason::AmbiguousOutcome {
                outcomes: vec![0, 1]
            })
        );
    }

    #[test]
    fn label_narrows_a_sell_without_index() {
        let lots = vec![in_outcome(1, "Yes", Some(0)), in_outcome(2, "No", Some(1))];

        let sell = matched(plan_settlement(&sell("No", None, dec!(2)), &lots).unwrap());

        assert_eq!(sell.details()[0].tracking_id, LotId::new(2));
        assert_eq!(sell.outcome_index, Some(1));
    }

    #[test]
    fn lots_of_other_outcomes_or_markets_are_not_taken() {
        let mut elsewhere = in_outcome(2, "Yes", Some(0));
        elsewhere.market = "other".into();
        let lots = vec![in_outcome(1, "No", Some(1)), elsewhere];

        let plan = plan_settlement(&sell("Yes", Some(0), dec!(2)), &lots).unwrap();

        assert_eq!(plan, SettlementPlan::Skip(SkipReason::NoOpenLots));
    }

    #[test]
    fn settlement_rejects_non_positive_quantity() {
        let lots = vec![in_outcome(1, "Yes", Some(0))];
        assert!(plan_settlement(&sell("Yes", Some(0), dec!(-1)), &lots).is_err());
    }
}
