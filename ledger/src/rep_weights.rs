use rsvelo_core::{Amount, PublicKey};
use std::collections::HashMap;
use std::sync::RwLock;

/// Cached voting weight per representative, kept in sync with account table updates
#[derive(Default)]
pub struct RepWeights {
    weights: RwLock<HashMap<PublicKey, Amount>>,
}

impl RepWeights {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn representation_get(&self, representative: &PublicKey) -> Amount {
        self.weights
            .read()
            .unwrap()
            .get(representative)
            .copied()
            .unwrap_or_default()
    }

    pub fn representation_add(&self, representative: PublicKey, amount: Amount) {
        let mut guard = self.weights.write().unwrap();
        let entry = guard.entry(representative).or_default();
        *entry = entry.wrapping_add(amount);
    }

    /// Move representation between two representatives in one lock acquisition
    pub fn representation_add_dual(
        &self,
        representative_1: PublicKey,
        amount_1: Amount,
        representative_2: PublicKey,
        amount_2: Amount,
    ) {
        let mut guard = self.weights.write().unwrap();
        {
            let entry = guard.entry(representative_1).or_default();
            *entry = entry.wrapping_add(amount_1);
        }
        {
            let entry = guard.entry(representative_2).or_default();
            *entry = entry.wrapping_add(amount_2);
        }
    }

    pub fn count(&self) -> usize {
        self.weights.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_get() {
        let weights = RepWeights::new();
        let rep = PublicKey::from(1);
        assert_eq!(weights.representation_get(&rep), Amount::zero());
        weights.representation_add(rep, Amount::raw(100));
        assert_eq!(weights.representation_get(&rep), Amount::raw(100));
    }

    #[test]
    fn move_representation() {
        let weights = RepWeights::new();
        let from = PublicKey::from(1);
        let to = PublicKey::from(2);
        weights.representation_add(from, Amount::raw(100));
        weights.representation_add_dual(
            from,
            Amount::zero().wrapping_sub(Amount::raw(100)),
            to,
            Amount::raw(100),
        );
        assert_eq!(weights.representation_get(&from), Amount::zero());
        assert_eq!(weights.representation_get(&to), Amount::raw(100));
    }
}
