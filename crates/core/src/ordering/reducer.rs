use std::collections::btree_map::Entry;

use crate::domain::cart::{Cart, CartDelta};
use crate::errors::DomainError;

/// Applies one delta to a cart and returns the resulting cart.
///
/// `Add` is a pure quantity sum per `item_id`, so any two `Add` deltas commute
/// and associate. Existing entries keep their add-time name and price. A sum
/// that does not fit a line quantity is an invariant violation, never clamped.
pub fn merge(base: &Cart, delta: &CartDelta) -> Result<Cart, DomainError> {
    match delta {
        CartDelta::NoChange => Ok(base.clone()),
        CartDelta::Clear => Ok(Cart::empty()),
        CartDelta::Add(items) => {
            let mut merged = base.clone();
            for item in items {
                match merged.entries.entry(item.item_id.clone()) {
                    Entry::Occupied(mut existing) => {
                        let existing = existing.get_mut();
                        existing.quantity =
                            existing.quantity.checked_add(item.quantity).ok_or_else(|| {
                                DomainError::InvariantViolation(format!(
                                    "quantity overflow for `{}`",
                                    existing.name
                                ))
                            })?;
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(item.clone());
                    }
                }
            }
            merged.entries.retain(|_, entry| entry.quantity > 0);
            Ok(merged)
        }
    }
}

/// Folds one turn's deltas into `base`.
///
/// A `Clear` only ever comes from committing the pre-turn cart, so it is
/// applied before every `Add` of the same turn: the committed lines leave the
/// cart and sibling additions survive, whatever order the calls finished in.
pub fn fold<'a>(
    base: &Cart,
    deltas: impl IntoIterator<Item = &'a CartDelta>,
) -> Result<Cart, DomainError> {
    let (clears, rest): (Vec<&CartDelta>, Vec<&CartDelta>) =
        deltas.into_iter().partition(|delta| matches!(delta, CartDelta::Clear));
    let start = if clears.is_empty() { base.clone() } else { Cart::empty() };
    rest.into_iter().try_fold(start, |cart, delta| merge(&cart, delta))
}
