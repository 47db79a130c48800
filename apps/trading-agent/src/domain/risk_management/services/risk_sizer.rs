//! Risk Sizer
//!
//! Pure, deterministic position sizing. No I/O, no shared state.
//!
//! # Rules
//!
//! | Situation | Result |
//! |-----------|--------|
//! | price ≤ 0 | `InvalidMarketData` |
//! | deposit = 0 | no action |
//! | increase, position notional ≥ cap | no action |
//! | increase | min(risk capital, cap headroom) / price, in whole lots |
//! | reduce / close | up to the held quantity, never flips sign |

use rust_decimal::Decimal;

use crate::domain::order_execution::OrderSide;
use crate::domain::risk_management::errors::SizingError;
use crate::domain::risk_management::value_objects::{
    NoActionReason, SizingDecision, SizingLimit, SizingRequest, TradeDecision, TradeIntent,
};
use crate::domain::shared::Quantity;

/// Stateless risk-bounded sizer.
pub struct RiskSizer;

impl RiskSizer {
    /// Size one signal.
    ///
    /// # Errors
    ///
    /// Returns `SizingError::InvalidMarketData` if the price is not positive
    /// or the arithmetic leaves `Decimal` range.
    pub fn size(request: &SizingRequest<'_>) -> Result<SizingDecision, SizingError> {
        let price = request.signal.price;
        if price <= Decimal::ZERO {
            return Err(Self::invalid(request, "price must be positive"));
        }

        if request.account.deposit_value().is_zero() {
            return Ok(SizingDecision::NoAction(NoActionReason::ZeroDeposit));
        }

        let held = request.position.map_or(Decimal::ZERO, |p| p.quantity);

        let (side, requested) = match request.signal.intent {
            TradeIntent::Hold => return Ok(SizingDecision::NoAction(NoActionReason::Hold)),
            TradeIntent::Close => {
                let Some(side) = OrderSide::for_delta(-held) else {
                    return Ok(SizingDecision::NoAction(NoActionReason::NoPosition));
                };
                return Ok(Self::trade(
                    request,
                    side,
                    Quantity::new(held.abs()),
                    true,
                    SizingLimit::PositionSize,
                ));
            }
            TradeIntent::Buy { quantity } => (OrderSide::Buy, quantity),
            TradeIntent::Sell { quantity } => (OrderSide::Sell, quantity),
        };

        if requested.is_some_and(|q| q <= Decimal::ZERO) {
            return Ok(SizingDecision::NoAction(NoActionReason::NonPositiveRequest));
        }

        let reduces = OrderSide::for_delta(held).is_some_and(|held_side| held_side != side);
        if reduces {
            Ok(Self::size_reduction(request, side, held, requested))
        } else {
            Self::size_increase(request, side, held, requested)
        }
    }

    fn size_reduction(
        request: &SizingRequest<'_>,
        side: OrderSide,
        held: Decimal,
        requested: Option<Decimal>,
    ) -> SizingDecision {
        let available = held.abs();
        let wanted = requested.unwrap_or(available);

        if wanted >= available {
            return Self::trade(
                request,
                side,
                Quantity::new(available),
                true,
                SizingLimit::PositionSize,
            );
        }

        let quantity = Quantity::new(wanted).round_down_to_lot(request.lot_size);
        if quantity.is_zero() {
            return SizingDecision::NoAction(NoActionReason::BelowLotSize);
        }
        Self::trade(request, side, quantity, true, SizingLimit::Requested)
    }

    fn size_increase(
        request: &SizingRequest<'_>,
        side: OrderSide,
        held: Decimal,
        requested: Option<Decimal>,
    ) -> Result<SizingDecision, SizingError> {
        let price = request.signal.price;
        let risk_capital = request.account.risk_capital().amount();
        let cap = request.account.position_cap().amount();

        let current_notional = held
            .abs()
            .checked_mul(price)
            .ok_or_else(|| Self::invalid(request, "position notional overflows"))?;
        if current_notional >= cap {
            return Ok(SizingDecision::NoAction(NoActionReason::AtPositionCap));
        }

        let headroom = cap - current_notional;
        let (budget, mut limit) = if risk_capital <= headroom {
            (risk_capital, SizingLimit::RiskCapital)
        } else {
            (headroom, SizingLimit::PositionCap)
        };

        let max_units = budget
            .checked_div(price)
            .ok_or_else(|| Self::invalid(request, "price too small to size against"))?;
        let max_quantity = Quantity::new(max_units).round_down_to_lot(request.lot_size);

        let quantity = match requested.map(Quantity::new) {
            Some(wanted) if wanted <= max_quantity => {
                limit = SizingLimit::Requested;
                wanted.round_down_to_lot(request.lot_size)
            }
            _ => max_quantity,
        };

        if quantity.is_zero() {
            return Ok(SizingDecision::NoAction(NoActionReason::BelowLotSize));
        }
        Ok(Self::trade(request, side, quantity, false, limit))
    }

    fn trade(
        request: &SizingRequest<'_>,
        side: OrderSide,
        quantity: Quantity,
        reduces_exposure: bool,
        limited_by: SizingLimit,
    ) -> SizingDecision {
        SizingDecision::Trade(TradeDecision {
            instrument_id: request.signal.instrument_id.clone(),
            side,
            quantity,
            price: request.signal.price,
            reduces_exposure,
            limited_by,
        })
    }

    fn invalid(request: &SizingRequest<'_>, message: &str) -> SizingError {
        SizingError::InvalidMarketData {
            instrument_id: request.signal.instrument_id.clone(),
            price: request.signal.price.to_string(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::portfolio::{Account, Position};
    use crate::domain::risk_management::value_objects::TradeSignal;
    use crate::domain::shared::{AccountId, InstrumentId, Money};
    use rust_decimal_macros::dec;
    use test_case::test_case;

    fn account(deposit: Decimal) -> Account {
        Account::new(
            AccountId::new("acc"),
            Money::new(deposit),
            dec!(0.01),
            dec!(0.25),
        )
        .unwrap()
    }

    fn signal(price: Decimal, intent: TradeIntent) -> TradeSignal {
        TradeSignal {
            instrument_id: InstrumentId::new("SBER"),
            price,
            intent,
        }
    }

    fn size(
        account: &Account,
        signal: &TradeSignal,
        position: Option<&Position>,
        lot_size: u32,
    ) -> Result<SizingDecision, SizingError> {
        RiskSizer::size(&SizingRequest {
            account,
            signal,
            position,
            lot_size,
        })
    }

    fn held(quantity: Decimal) -> Position {
        Position::new(InstrumentId::new("SBER"), quantity, dec!(100))
    }

    #[test]
    fn sizes_to_risk_capital() {
        let acc = account(dec!(1000000));
        let sig = signal(dec!(100), TradeIntent::Buy { quantity: None });
        let decision = size(&acc, &sig, None, 1).unwrap();
        let trade = decision.trade().unwrap();
        assert_eq!(trade.quantity, Quantity::from_i64(100));
        assert_eq!(trade.side, OrderSide::Buy);
        assert_eq!(trade.limited_by, SizingLimit::RiskCapital);
        assert_eq!(trade.notional(), Money::new(dec!(10000)));
    }

    #[test]
    fn request_above_limit_is_clamped() {
        let acc = account(dec!(1000000));
        let sig = signal(dec!(100), TradeIntent::Buy { quantity: Some(dec!(150)) });
        let trade = size(&acc, &sig, None, 1).unwrap().trade().cloned().unwrap();
        assert_eq!(trade.quantity, Quantity::from_i64(100));
        assert_eq!(trade.limited_by, SizingLimit::RiskCapital);
    }

    #[test]
    fn request_below_limit_is_kept() {
        let acc = account(dec!(1000000));
        let sig = signal(dec!(100), TradeIntent::Buy { quantity: Some(dec!(40)) });
        let trade = size(&acc, &sig, None, 1).unwrap().trade().cloned().unwrap();
        assert_eq!(trade.quantity, Quantity::from_i64(40));
        assert_eq!(trade.limited_by, SizingLimit::Requested);
    }

    #[test]
    fn lot_size_rounds_down() {
        let acc = account(dec!(1000000));
        let sig = signal(dec!(300), TradeIntent::Buy { quantity: None });
        // 10_000 / 300 = 33.3 units, 3 lots of 10
        let trade = size(&acc, &sig, None, 10).unwrap().trade().cloned().unwrap();
        assert_eq!(trade.quantity, Quantity::from_i64(30));
    }

    #[test]
    fn below_one_lot_is_no_action() {
        let acc = account(dec!(1000000));
        let sig = signal(dec!(5000), TradeIntent::Buy { quantity: None });
        assert_eq!(
            size(&acc, &sig, None, 10).unwrap(),
            SizingDecision::NoAction(NoActionReason::BelowLotSize)
        );
    }

    #[test]
    fn headroom_limits_near_cap() {
        let acc = account(dec!(1000000));
        // Holding 2_450 units at 100 = 245_000, cap is 250_000.
        let pos = held(dec!(2450));
        let sig = signal(dec!(100), TradeIntent::Buy { quantity: None });
        let trade = size(&acc, &sig, Some(&pos), 1).unwrap().trade().cloned().unwrap();
        assert_eq!(trade.quantity, Quantity::from_i64(50));
        assert_eq!(trade.limited_by, SizingLimit::PositionCap);
    }

    #[test]
    fn at_cap_blocks_increase_but_not_reduction() {
        let acc = account(dec!(1000000));
        let pos = held(dec!(2500));

        let buy = signal(dec!(100), TradeIntent::Buy { quantity: None });
        assert_eq!(
            size(&acc, &buy, Some(&pos), 1).unwrap(),
            SizingDecision::NoAction(NoActionReason::AtPositionCap)
        );

        let sell = signal(dec!(100), TradeIntent::Sell { quantity: Some(dec!(500)) });
        let trade = size(&acc, &sell, Some(&pos), 1).unwrap().trade().cloned().unwrap();
        assert_eq!(trade.side, OrderSide::Sell);
        assert_eq!(trade.quantity, Quantity::from_i64(500));
        assert!(trade.reduces_exposure);
    }

    #[test]
    fn reduction_never_flips_position() {
        let acc = account(dec!(1000000));
        let pos = held(dec!(30));
        let sell = signal(dec!(100), TradeIntent::Sell { quantity: Some(dec!(80)) });
        let trade = size(&acc, &sell, Some(&pos), 1).unwrap().trade().cloned().unwrap();
        assert_eq!(trade.quantity, Quantity::from_i64(30));
        assert_eq!(trade.signed_quantity(), dec!(-30));
        assert_eq!(trade.limited_by, SizingLimit::PositionSize);
    }

    #[test]
    fn close_flattens_short() {
        let acc = account(dec!(1000000));
        let pos = held(dec!(-70));
        let close = signal(dec!(100), TradeIntent::Close);
        let trade = size(&acc, &close, Some(&pos), 10).unwrap().trade().cloned().unwrap();
        assert_eq!(trade.side, OrderSide::Buy);
        assert_eq!(trade.quantity, Quantity::from_i64(70));
    }

    #[test]
    fn close_without_position_is_no_action() {
        let acc = account(dec!(1000000));
        let close = signal(dec!(100), TradeIntent::Close);
        assert_eq!(
            size(&acc, &close, None, 1).unwrap(),
            SizingDecision::NoAction(NoActionReason::NoPosition)
        );
    }

    #[test_case(dec!(0) ; "zero price")]
    #[test_case(dec!(-12.5) ; "negative price")]
    fn non_positive_price_is_invalid_market_data(price: Decimal) {
        let acc = account(dec!(1000000));
        let sig = signal(price, TradeIntent::Buy { quantity: None });
        assert!(matches!(
            size(&acc, &sig, None, 1),
            Err(SizingError::InvalidMarketData { .. })
        ));
    }

    #[test_case(TradeIntent::Buy { quantity: None } ; "buy")]
    #[test_case(TradeIntent::Close ; "close")]
    fn zero_deposit_is_no_action(intent: TradeIntent) {
        let acc = account(Decimal::ZERO);
        let pos = held(dec!(10));
        let sig = signal(dec!(100), intent);
        assert_eq!(
            size(&acc, &sig, Some(&pos), 1).unwrap(),
            SizingDecision::NoAction(NoActionReason::ZeroDeposit)
        );
    }

    #[test]
    fn hold_is_no_action() {
        let acc = account(dec!(1000000));
        let sig = signal(dec!(100), TradeIntent::Hold);
        assert_eq!(
            size(&acc, &sig, None, 1).unwrap(),
            SizingDecision::NoAction(NoActionReason::Hold)
        );
    }

    #[test]
    fn non_positive_request_is_no_action() {
        let acc = account(dec!(1000000));
        let sig = signal(dec!(100), TradeIntent::Sell { quantity: Some(Decimal::ZERO) });
        assert_eq!(
            size(&acc, &sig, None, 1).unwrap(),
            SizingDecision::NoAction(NoActionReason::NonPositiveRequest)
        );
    }

    #[test]
    fn short_entry_sized_like_long() {
        let acc = account(dec!(1000000));
        let sig = signal(dec!(100), TradeIntent::Sell { quantity: None });
        let trade = size(&acc, &sig, None, 1).unwrap().trade().cloned().unwrap();
        assert_eq!(trade.signed_quantity(), dec!(-100));
        assert!(!trade.reduces_exposure);
    }
}
