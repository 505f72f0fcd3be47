use crate::Ledger;
use rsvelo_core::{
    Account, Amount, Block, BlockBuilder, BlockEnum, BlockHash, KeyPair, DEV_GENESIS_KEY,
};

/// A dev-network ledger with the genesis block in place
pub(crate) struct LedgerContext {
    pub ledger: Ledger,
}

impl LedgerContext {
    pub fn new() -> Self {
        Self {
            ledger: Ledger::new_test_instance(),
        }
    }

    pub fn genesis_account(&self) -> Account {
        self.ledger.constants.genesis_account
    }

    /// Builds a state send from the current genesis head without processing it
    pub fn build_send_from_genesis_head(
        &self,
        previous: &BlockHash,
        destination: &Account,
        amount: Amount,
    ) -> BlockEnum {
        let txn = self.ledger.read_txn();
        let info = self
            .ledger
            .get_account_info(&txn, &self.genesis_account())
            .unwrap();
        debug_assert_eq!(info.head, *previous);
        BlockBuilder::state()
            .key(&DEV_GENESIS_KEY)
            .account(self.genesis_account())
            .previous(*previous)
            .representative(info.representative)
            .balance(info.balance - amount)
            .link(*destination)
            .build()
    }

    pub fn process_send_from_genesis(&self, destination: &Account, amount: Amount) -> BlockEnum {
        let head = {
            let txn = self.ledger.read_txn();
            self.ledger
                .get_account_info(&txn, &self.genesis_account())
                .unwrap()
                .head
        };
        let mut block = self.build_send_from_genesis_head(&head, destination, amount);
        let mut txn = self.ledger.rw_txn();
        self.ledger.process(&mut txn, &mut block).unwrap();
        block
    }

    /// Opens `key`'s account by receiving the given send block
    pub fn process_open(&self, key: &KeyPair, source: &BlockHash, amount: Amount) -> BlockEnum {
        let mut block = BlockBuilder::state()
            .key(key)
            .account(key.account())
            .previous(BlockHash::zero())
            .representative(key.public_key())
            .balance(amount)
            .link(*source)
            .build();
        let mut txn = self.ledger.rw_txn();
        self.ledger.process(&mut txn, &mut block).unwrap();
        block
    }
}
