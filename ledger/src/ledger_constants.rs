use rsvelo_core::{
    epoch_v1_link, epoch_v2_link,
    work::{WorkThresholds, WORK_THRESHOLDS_STUB},
    Account, Amount, BlockEnum, Epoch, Epochs, KeyPair, Networks, OpenBlock, DEV_GENESIS_KEY,
};

/// Protocol constants that differ per network
pub struct LedgerConstants {
    pub work: WorkThresholds,
    pub epochs: Epochs,
    pub genesis: BlockEnum,
    pub genesis_account: Account,
    pub genesis_amount: Amount,
    pub burn_account: Account,
    pub network: Networks,
}

impl LedgerConstants {
    fn new(work: WorkThresholds, genesis_key: &KeyPair, network: Networks) -> Self {
        let genesis_account = genesis_key.account();

        let mut epochs = Epochs::new();
        epochs.add(Epoch::Epoch1, genesis_key.public_key(), epoch_v1_link());
        epochs.add(Epoch::Epoch2, genesis_key.public_key(), epoch_v2_link());

        let genesis = BlockEnum::LegacyOpen(OpenBlock::new_genesis(genesis_key, u64::MAX));

        Self {
            work,
            epochs,
            genesis,
            genesis_account,
            genesis_amount: Amount::MAX,
            burn_account: Account::zero(),
            network,
        }
    }

    /// Dev network uses the stub work thresholds so tests do not grind proof-of-work
    pub fn dev() -> Self {
        Self::new(
            WORK_THRESHOLDS_STUB.clone(),
            &DEV_GENESIS_KEY,
            Networks::VeloDevNetwork,
        )
    }

    pub fn beta(genesis_key: &KeyPair) -> Self {
        Self::new(
            WorkThresholds::publish_beta().clone(),
            genesis_key,
            Networks::VeloBetaNetwork,
        )
    }

    pub fn live(genesis_key: &KeyPair) -> Self {
        Self::new(
            WorkThresholds::publish_full().clone(),
            genesis_key,
            Networks::VeloLiveNetwork,
        )
    }
}
