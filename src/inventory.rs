//! Shared wood stock.

/// The one piece of state every fire and every completing worker touches.
/// Reads-then-writes go through [`Inventory::try_remove`] so a
/// compare-then-subtract can never interleave into a negative stock.
#[derive(Debug, Default)]
pub struct Inventory {
    wood: i64,
}

impl Inventory {
    pub fn new(starting_wood: i64) -> Self {
        Self {
            wood: starting_wood.max(0),
        }
    }

    pub fn wood(&self) -> i64 {
        self.wood
    }

    pub fn add(&mut self, amount: i64) {
        self.wood += amount.max(0);
    }

    /// Removes `amount` only when the full amount is available.
    pub fn try_remove(&mut self, amount: i64) -> bool {
        if amount < 0 || self.wood < amount {
            return false;
        }
        self.wood -= amount;
        true
    }
}
