use core_types::OrderSide;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// The running buy/sell pressure index.
///
/// Every order-book delta priced close to the last trade nudges the index:
/// bids push it up, asks push it down. Positive values mean buy pressure
/// dominates near the current price, negative values mean sell pressure does.
#[derive(Debug, Clone, PartialEq)]
pub struct PressureIndex {
    value: Decimal,
    high: Decimal,
    low: Decimal,
    order_range: Decimal,
    reset_bound: Decimal,
}

impl PressureIndex {
    pub fn new(order_range: Decimal, reset_bound: Decimal) -> Self {
        Self {
            value: Decimal::ZERO,
            high: Decimal::ZERO,
            low: Decimal::ZERO,
            order_range,
            reset_bound,
        }
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn high(&self) -> Decimal {
        self.high
    }

    pub fn low(&self) -> Decimal {
        self.low
    }

    /// Folds one book event into the index and returns its contribution.
    ///
    /// The event contributes only if rate, quantity and `last_price` are all
    /// positive, `ready` is set, and `last_price / rate` lies strictly inside
    /// `(1 - order_range, 1 + order_range)`. Extrema and the runaway reset are
    /// applied whether or not it contributed.
    pub fn update(
        &mut self,
        side: OrderSide,
        quantity: Decimal,
        rate: Decimal,
        last_price: Decimal,
        ready: bool,
    ) -> Decimal {
        let contribution = self.contribution(side, quantity, rate, last_price, ready);
        self.value = self.value.checked_add(contribution).unwrap_or(self.value);

        if self.value > self.high {
            self.high = self.value;
        }
        if self.value < self.low {
            self.low = self.value;
        }
        if self.high > self.reset_bound || self.low < -self.reset_bound {
            tracing::warn!(
                high = %self.high,
                low = %self.low,
                bound = %self.reset_bound,
                "Index extrema out of bounds, resetting index."
            );
            self.reset();
        }

        contribution
    }

    fn contribution(
        &self,
        side: OrderSide,
        quantity: Decimal,
        rate: Decimal,
        last_price: Decimal,
        ready: bool,
    ) -> Decimal {
        if !ready || rate <= Decimal::ZERO || quantity <= Decimal::ZERO || last_price <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let Some(percent) = last_price.checked_div(rate) else {
            return Decimal::ZERO;
        };
        if percent <= Decimal::ONE - self.order_range || percent >= Decimal::ONE + self.order_range {
            return Decimal::ZERO;
        }

        // Asks are mirrored around 1: an ask at the market weighs -1 per unit,
        // asks above the market weigh more.
        let weight = match side {
            OrderSide::Buy => percent,
            OrderSide::Sell => percent - dec!(2),
        };
        weight.checked_mul(quantity).unwrap_or(Decimal::ZERO)
    }

    /// Starts a new cycle. The extrema carry over until the runaway reset.
    pub fn reset_value(&mut self) {
        self.value = Decimal::ZERO;
    }

    /// Zeroes the index and both extrema.
    pub fn reset(&mut self) {
        self.value = Decimal::ZERO;
        self.high = Decimal::ZERO;
        self.low = Decimal::ZERO;
    }
}
