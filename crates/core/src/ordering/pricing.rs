use rust_decimal::Decimal;

use crate::domain::cart::CartItem;
use crate::domain::order::OrderLineItem;

pub fn price_items<'a>(items: impl IntoIterator<Item = &'a CartItem>) -> Decimal {
    items.into_iter().map(CartItem::line_total).sum()
}

pub fn price_lines(lines: &[OrderLineItem]) -> Decimal {
    lines.iter().map(|line| line.unit_price * Decimal::from(line.quantity)).sum()
}

/// Renders an amount the way customers see it in chat, e.g. `$24.00`.
pub fn format_amount(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}
