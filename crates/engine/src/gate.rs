use rust_decimal::Decimal;

/// Decides whether the base balance may be sold at `last_price`.
///
/// With no recorded buy, selling is always allowed. Otherwise a sell is allowed
/// below the stop-loss (`gain < 1 - max_loss`) or at or above the profit target
/// (`gain >= 1 + min_gain`), and blocked in between.
pub fn allow_sell(
    last_price: Decimal,
    last_buy_price: Decimal,
    min_gain: Decimal,
    max_loss: Decimal,
) -> bool {
    if last_buy_price <= Decimal::ZERO {
        return true;
    }
    let Some(gain) = last_price.checked_div(last_buy_price) else {
        return true;
    };
    if gain < Decimal::ONE - max_loss {
        return true;
    }
    gain >= Decimal::ONE + min_gain
}
