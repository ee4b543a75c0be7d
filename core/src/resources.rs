//! Two-budget resource accounting.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ActionRejected;

/// Identifies one of the two independently tracked budgets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Budget spent on structures, upgrades and repairs.
    Structure,
    /// Budget spent on mobile units.
    Movement,
}

/// Price of an action expressed in both budgets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    /// Amount drawn from the structure budget.
    pub structure: f64,
    /// Amount drawn from the movement budget.
    pub movement: f64,
}

impl Cost {
    /// Creates a new cost descriptor.
    #[must_use]
    pub const fn new(structure: f64, movement: f64) -> Self {
        Self {
            structure,
            movement,
        }
    }

    /// Amount drawn from the provided budget.
    #[must_use]
    pub const fn of(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Structure => self.structure,
            ResourceKind::Movement => self.movement,
        }
    }
}

/// Errors raised when sizing a spend loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum BudgetError {
    /// The cost draws nothing from either budget, so no iteration cap can be derived.
    #[error("cost is zero in both budgets")]
    FreeCost,
}

/// Live balances of the two budgets. Balances never go negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourcePool {
    structure: f64,
    movement: f64,
}

impl ResourcePool {
    /// Creates a pool, clamping negative or undefined balances to zero.
    #[must_use]
    pub fn new(structure: f64, movement: f64) -> Self {
        Self {
            structure: clamp_balance(structure),
            movement: clamp_balance(movement),
        }
    }

    /// Remaining structure budget.
    #[must_use]
    pub const fn structure(&self) -> f64 {
        self.structure
    }

    /// Remaining movement budget.
    #[must_use]
    pub const fn movement(&self) -> f64 {
        self.movement
    }

    /// Remaining balance of the provided budget.
    #[must_use]
    pub const fn get(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Structure => self.structure,
            ResourceKind::Movement => self.movement,
        }
    }

    /// Reports whether both balances cover the cost.
    #[must_use]
    pub fn can_afford(&self, cost: &Cost) -> bool {
        self.check(cost).is_ok()
    }

    /// Deducts the cost after checking sufficiency.
    ///
    /// # Errors
    ///
    /// Returns [`ActionRejected::InsufficientResources`] without mutating the
    /// pool when either balance falls short.
    pub fn spend(&mut self, cost: &Cost) -> Result<(), ActionRejected> {
        self.check(cost)?;
        self.structure = clamp_balance(self.structure - cost.structure.max(0.0));
        self.movement = clamp_balance(self.movement - cost.movement.max(0.0));
        Ok(())
    }

    /// Number of times the cost can be paid from the current balances.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetError::FreeCost`] when the cost is zero in both
    /// budgets, since such a loop would have no natural bound.
    pub fn affordable_count(&self, cost: &Cost) -> Result<u32, BudgetError> {
        let mut count: Option<f64> = None;
        for kind in [ResourceKind::Structure, ResourceKind::Movement] {
            let price = cost.of(kind);
            if price <= 0.0 {
                continue;
            }
            let times = (self.get(kind) / price).floor();
            count = Some(count.map_or(times, |current| current.min(times)));
        }

        let count = count.ok_or(BudgetError::FreeCost)?;
        if count >= f64::from(u32::MAX) {
            Ok(u32::MAX)
        } else {
            Ok(count.max(0.0) as u32)
        }
    }

    fn check(&self, cost: &Cost) -> Result<(), ActionRejected> {
        for kind in [ResourceKind::Structure, ResourceKind::Movement] {
            let needed = cost.of(kind);
            let available = self.get(kind);
            if needed > available {
                return Err(ActionRejected::InsufficientResources {
                    resource: kind,
                    needed,
                    available,
                });
            }
        }
        Ok(())
    }
}

fn clamp_balance(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_balances_clamp_to_zero() {
        let pool = ResourcePool::new(-3.0, f64::NAN);
        assert_eq!(pool.structure(), 0.0);
        assert_eq!(pool.movement(), 0.0);
    }

    #[test]
    fn spend_rejects_without_mutating() {
        let mut pool = ResourcePool::new(1.0, 2.0);
        let result = pool.spend(&Cost::new(0.0, 3.0));
        assert_eq!(
            result,
            Err(ActionRejected::InsufficientResources {
                resource: ResourceKind::Movement,
                needed: 3.0,
                available: 2.0,
            })
        );
        assert_eq!(pool, ResourcePool::new(1.0, 2.0));
    }

    #[test]
    fn spend_deducts_both_budgets() {
        let mut pool = ResourcePool::new(5.0, 4.0);
        pool.spend(&Cost::new(2.0, 1.0)).expect("affordable");
        assert_eq!(pool, ResourcePool::new(3.0, 3.0));
    }

    #[test]
    fn affordable_count_uses_the_tighter_budget() {
        let pool = ResourcePool::new(10.0, 7.5);
        assert_eq!(pool.affordable_count(&Cost::new(0.0, 3.0)), Ok(2));
        assert_eq!(pool.affordable_count(&Cost::new(4.0, 1.0)), Ok(2));
        assert_eq!(pool.affordable_count(&Cost::new(0.0, 0.0)), Err(BudgetError::FreeCost));
    }
}
