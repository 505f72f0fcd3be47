use crate::transport::ChannelId;
use rsvelo_core::{Account, Amount};
use rsvelo_ledger::Ledger;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A representative for which we have a live network channel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeeredRep {
    pub account: Account,
    pub channel_id: ChannelId,
}

/// Keeps track of representatives that have been observed voting recently and
/// derives the quorum requirement from their combined weight
pub struct OnlineReps {
    ledger: Arc<Ledger>,
    observed: HashMap<Account, Instant>,
    peered: HashMap<Account, ChannelId>,
    online: Amount,
    weight_period: Duration,
    online_weight_minimum: Amount,
    quorum_percent: u8,
}

impl OnlineReps {
    pub fn new(ledger: Arc<Ledger>, online_weight_minimum: Amount, quorum_percent: u8) -> Self {
        Self {
            ledger,
            observed: HashMap::new(),
            peered: HashMap::new(),
            online: Amount::zero(),
            weight_period: Duration::from_secs(5 * 60),
            online_weight_minimum,
            quorum_percent,
        }
    }

    pub fn new_test_instance(ledger: Arc<Ledger>) -> Self {
        // A low minimum so a single dev representative reaches quorum
        Self::new(ledger, Amount::raw(1), 67)
    }

    /// Representative is defined as online if replying to live votes or rep crawler queries
    pub fn observe(&mut self, representative: Account) {
        if self.ledger.weight(&representative) > Amount::zero() {
            self.observed.insert(representative, Instant::now());
            self.recalculate();
        }
    }

    pub fn peer_connected(&mut self, representative: Account, channel_id: ChannelId) {
        self.peered.insert(representative, channel_id);
    }

    pub fn peer_disconnected(&mut self, representative: &Account) {
        self.peered.remove(representative);
    }

    fn recalculate(&mut self) {
        let cutoff = Instant::now() - self.weight_period;
        self.observed.retain(|_, last_seen| *last_seen >= cutoff);
        let mut online = Amount::zero();
        for account in self.observed.keys() {
            online += self.ledger.weight(account);
        }
        self.online = online;
    }

    /// Combined weight of all representatives observed online within the period
    pub fn online(&self) -> Amount {
        self.online
    }

    pub fn trended(&self) -> Amount {
        std::cmp::max(self.online, self.online_weight_minimum)
    }

    /// Quorum threshold: the winner margin required to confirm an election
    pub fn delta(&self) -> Amount {
        let weight = std::cmp::max(self.online, self.online_weight_minimum);
        weight / 100 * self.quorum_percent as u128
    }

    /// Representatives below this weight are not solicited for votes
    pub fn minimum_principal_weight(&self) -> Amount {
        self.trended() / 1000
    }

    pub fn online_reps_count(&self) -> usize {
        self.observed.len()
    }

    /// Peered representatives whose weight makes them worth soliciting
    pub fn principal_representatives(&self) -> Vec<PeeredRep> {
        let minimum = self.minimum_principal_weight();
        self.peered
            .iter()
            .filter(|(account, _)| self.ledger.weight(account) >= minimum)
            .map(|(account, channel_id)| PeeredRep {
                account: *account,
                channel_id: *channel_id,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsvelo_core::DEV_GENESIS_KEY;

    #[test]
    fn observe_counts_weight() {
        let ledger = Arc::new(Ledger::new_test_instance());
        let mut online_reps = OnlineReps::new_test_instance(ledger);
        assert_eq!(online_reps.online(), Amount::zero());

        online_reps.observe(DEV_GENESIS_KEY.account());
        assert_eq!(online_reps.online(), Amount::MAX);
        assert!(online_reps.delta() > Amount::zero());
    }

    #[test]
    fn zero_weight_rep_is_ignored() {
        let ledger = Arc::new(Ledger::new_test_instance());
        let mut online_reps = OnlineReps::new_test_instance(ledger);
        online_reps.observe(Account::from(42));
        assert_eq!(online_reps.online(), Amount::zero());
        assert_eq!(online_reps.online_reps_count(), 0);
    }

    #[test]
    fn principal_reps_require_peering_and_weight() {
        let ledger = Arc::new(Ledger::new_test_instance());
        let mut online_reps = OnlineReps::new_test_instance(ledger);
        online_reps.observe(DEV_GENESIS_KEY.account());
        assert!(online_reps.principal_representatives().is_empty());

        online_reps.peer_connected(DEV_GENESIS_KEY.account(), ChannelId::from(1));
        let principals = online_reps.principal_representatives();
        assert_eq!(principals.len(), 1);
        assert_eq!(principals[0].account, DEV_GENESIS_KEY.account());
    }
}
