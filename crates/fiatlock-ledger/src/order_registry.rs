//! Order registry.
//!
//! Owns every [`Order`] and its remaining inventory. Orders are never
//! deleted; an order is exhausted once `remaining_amount` reaches zero.
//! All amount mutations check before they write: on error the row is
//! unchanged.

use std::collections::HashMap;

use fiatlock_types::{Address, FiatlockError, Order, OrderId, Result};

/// Orders indexed by ID and by private code.
#[derive(Debug, Default)]
pub struct OrderRegistry {
    orders: HashMap<OrderId, Order>,
    by_code: HashMap<String, OrderId>,
}

impl OrderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new order.
    ///
    /// # Errors
    /// Returns `DuplicateOrder` if the ID is already taken.
    pub fn insert(&mut self, order: Order) -> Result<()> {
        if self.orders.contains_key(&order.id) {
            return Err(FiatlockError::DuplicateOrder(order.id));
        }
        self.put(order);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &OrderId) -> Option<&Order> {
        self.orders.get(id)
    }

    /// # Errors
    /// Returns `OrderNotFound` if the order does not exist.
    pub fn require(&self, id: &OrderId) -> Result<&Order> {
        self.orders.get(id).ok_or(FiatlockError::OrderNotFound(*id))
    }

    /// Insert or replace a row, keeping the private-code index in step.
    pub(crate) fn put(&mut self, order: Order) {
        if let Some(code) = self
            .orders
            .get(&order.id)
            .and_then(|old| old.private_code.as_ref())
        {
            self.by_code.remove(code);
        }
        if let Some(code) = &order.private_code {
            self.by_code.insert(code.clone(), order.id);
        }
        self.orders.insert(order.id, order);
    }

    pub(crate) fn remove(&mut self, id: &OrderId) -> Option<Order> {
        let order = self.orders.remove(id)?;
        if let Some(code) = &order.private_code {
            self.by_code.remove(code);
        }
        Some(order)
    }

    /// Debit a fill's reservation from the order.
    ///
    /// # Errors
    /// - `OrderNotFound` if the order does not exist
    /// - `InsufficientLiquidity` if `amount > remaining_amount`
    pub fn reserve(&mut self, id: &OrderId, amount: u128) -> Result<()> {
        let order = self
            .orders
            .get_mut(id)
            .ok_or(FiatlockError::OrderNotFound(*id))?;
        if amount > order.remaining_amount {
            return Err(FiatlockError::InsufficientLiquidity {
                requested: amount,
                remaining: order.remaining_amount,
            });
        }
        order.remaining_amount -= amount;
        Ok(())
    }

    /// Return an expired reservation to the order.
    ///
    /// # Errors
    /// - `OrderNotFound` if the order does not exist
    /// - `SupplyInvariantViolation` if the credit would push
    ///   `remaining_amount` above `total_amount`
    pub fn release(&mut self, id: &OrderId, amount: u128) -> Result<()> {
        let order = self
            .orders
            .get_mut(id)
            .ok_or(FiatlockError::OrderNotFound(*id))?;
        let restored = order
            .remaining_amount
            .checked_add(amount)
            .filter(|r| *r <= order.total_amount)
            .ok_or_else(|| FiatlockError::SupplyInvariantViolation {
                reason: format!(
                    "release of {amount} exceeds total {} of order {id}",
                    order.total_amount
                ),
            })?;
        order.remaining_amount = restored;
        Ok(())
    }

    /// Debit a seller withdrawal; returns the new remaining amount.
    ///
    /// # Errors
    /// - `OrderNotFound` if the order does not exist
    /// - `InsufficientRemaining` if `amount > remaining_amount`
    pub fn debit(&mut self, id: &OrderId, amount: u128) -> Result<u128> {
        let order = self
            .orders
            .get_mut(id)
            .ok_or(FiatlockError::OrderNotFound(*id))?;
        if amount > order.remaining_amount {
            return Err(FiatlockError::InsufficientRemaining {
                requested: amount,
                remaining: order.remaining_amount,
            });
        }
        order.remaining_amount -= amount;
        Ok(order.remaining_amount)
    }

    #[must_use]
    pub fn by_private_code(&self, code: &str) -> Option<&Order> {
        self.by_code.get(code).and_then(|id| self.orders.get(id))
    }

    /// A seller's orders, newest first.
    #[must_use]
    pub fn by_seller(&self, seller: &Address) -> Vec<&Order> {
        let mut orders: Vec<&Order> = self
            .orders
            .values()
            .filter(|o| o.seller == *seller)
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        orders
    }

    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup() {
        let mut reg = OrderRegistry::new();
        let order = Order::dummy(1_000_000);
        let id = order.id;
        reg.insert(order).unwrap();
        assert_eq!(reg.require(&id).unwrap().remaining_amount, 1_000_000);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn duplicate_rejected() {
        let mut reg = OrderRegistry::new();
        let order = Order::dummy(1);
        reg.insert(order.clone()).unwrap();
        assert!(matches!(
            reg.insert(order),
            Err(FiatlockError::DuplicateOrder(_))
        ));
    }

    #[test]
    fn reserve_beyond_remaining_fails_unchanged() {
        let mut reg = OrderRegistry::new();
        let order = Order::dummy(1_000);
        let id = order.id;
        reg.insert(order).unwrap();
        let err = reg.reserve(&id, 1_001).unwrap_err();
        assert!(matches!(
            err,
            FiatlockError::InsufficientLiquidity {
                requested: 1_001,
                remaining: 1_000
            }
        ));
        assert_eq!(reg.require(&id).unwrap().remaining_amount, 1_000);
    }

    #[test]
    fn release_cannot_exceed_total() {
        let mut reg = OrderRegistry::new();
        let order = Order::dummy(1_000);
        let id = order.id;
        reg.insert(order).unwrap();
        reg.reserve(&id, 400).unwrap();
        reg.release(&id, 400).unwrap();
        assert_eq!(reg.require(&id).unwrap().remaining_amount, 1_000);
        assert!(matches!(
            reg.release(&id, 1),
            Err(FiatlockError::SupplyInvariantViolation { .. })
        ));
    }

    #[test]
    fn debit_reports_insufficient_remaining() {
        let mut reg = OrderRegistry::new();
        let order = Order::dummy(500);
        let id = order.id;
        reg.insert(order).unwrap();
        assert_eq!(reg.debit(&id, 200).unwrap(), 300);
        assert!(matches!(
            reg.debit(&id, 301),
            Err(FiatlockError::InsufficientRemaining { .. })
        ));
    }

    #[test]
    fn private_code_index_follows_row() {
        let mut reg = OrderRegistry::new();
        let mut order = Order::dummy(10);
        let code = Order::private_code_for(&order.id);
        order.is_public = false;
        order.private_code = Some(code.clone());
        let id = order.id;
        reg.insert(order).unwrap();
        assert_eq!(reg.by_private_code(&code).unwrap().id, id);

        let mut listed = reg.require(&id).unwrap().clone();
        listed.is_public = true;
        listed.private_code = None;
        reg.put(listed);
        assert!(reg.by_private_code(&code).is_none());
    }

    #[test]
    fn missing_order() {
        let mut reg = OrderRegistry::new();
        let id = OrderId::from_bytes([5; 16]);
        assert!(matches!(
            reg.reserve(&id, 1),
            Err(FiatlockError::OrderNotFound(_))
        ));
    }
}
