mod helpers;

use crate::{BlockStatus, Ledger};
use helpers::LedgerContext;
use rsvelo_core::{Account, Amount, Block, BlockBuilder, KeyPair, PendingKey, DEV_GENESIS_KEY};

#[test]
fn genesis_is_cemented() {
    let ctx = LedgerContext::new();
    let txn = ctx.ledger.read_txn();
    assert_eq!(ctx.ledger.block_count(), 1);
    assert_eq!(ctx.ledger.cemented_count(), 1);
    assert_eq!(
        ctx.ledger
            .account_balance(&txn, &ctx.genesis_account(), false),
        Amount::MAX
    );
    assert_eq!(ctx.ledger.weight(&ctx.genesis_account()), Amount::MAX);
}

#[test]
fn process_state_send() {
    let ctx = LedgerContext::new();
    let destination = Account::from(1000);

    let send = ctx.process_send_from_genesis(&destination, Amount::raw(100));

    let txn = ctx.ledger.read_txn();
    let info = ctx
        .ledger
        .get_account_info(&txn, &ctx.genesis_account())
        .unwrap();
    assert_eq!(info.head, send.hash());
    assert_eq!(info.balance, Amount::MAX - Amount::raw(100));
    assert_eq!(info.block_count, 2);

    let pending = ctx
        .ledger
        .get_pending(&txn, &PendingKey::new(destination, send.hash()))
        .unwrap();
    assert_eq!(pending.amount, Amount::raw(100));
    assert_eq!(pending.source, ctx.genesis_account());

    assert_eq!(
        ctx.ledger.block_amount(&txn, &send.hash()),
        Some(Amount::raw(100))
    );
    assert!(send.sideband().unwrap().details.is_send);
}

#[test]
fn process_old_block() {
    let ctx = LedgerContext::new();
    let send = ctx.process_send_from_genesis(&Account::from(1000), Amount::raw(100));

    let mut txn = ctx.ledger.rw_txn();
    let mut again = send.clone();
    let result = ctx.ledger.process(&mut txn, &mut again);
    assert_eq!(result, Err(BlockStatus::Old));
    assert_eq!(ctx.ledger.block_count(), 2);
}

#[test]
fn process_fork() {
    let ctx = LedgerContext::new();
    let send = ctx.process_send_from_genesis(&Account::from(1000), Amount::raw(100));

    // A second send with the same previous is a fork
    let mut fork = BlockBuilder::state()
        .key(&DEV_GENESIS_KEY)
        .account(ctx.genesis_account())
        .previous(send.previous())
        .balance(Amount::MAX - Amount::raw(50))
        .link(Account::from(2000))
        .build();
    let mut txn = ctx.ledger.rw_txn();
    let result = ctx.ledger.process(&mut txn, &mut fork);
    assert_eq!(result, Err(BlockStatus::Fork));
}

#[test]
fn process_gap_previous() {
    let ctx = LedgerContext::new();
    let mut block = BlockBuilder::state()
        .key(&DEV_GENESIS_KEY)
        .account(ctx.genesis_account())
        .previous(999_u64)
        .balance(Amount::MAX - Amount::raw(1))
        .link(Account::from(1000))
        .build();

    let mut txn = ctx.ledger.rw_txn();
    let result = ctx.ledger.process(&mut txn, &mut block);
    assert_eq!(result, Err(BlockStatus::GapPrevious));
}

#[test]
fn process_bad_signature() {
    let ctx = LedgerContext::new();
    let wrong_key = KeyPair::new();
    let txn = ctx.ledger.read_txn();
    let head = ctx
        .ledger
        .get_account_info(&txn, &ctx.genesis_account())
        .unwrap()
        .head;
    drop(txn);

    let mut block = BlockBuilder::state()
        .key(&wrong_key)
        .account(ctx.genesis_account())
        .previous(head)
        .balance(Amount::MAX - Amount::raw(1))
        .link(Account::from(1000))
        .build();

    let mut txn = ctx.ledger.rw_txn();
    let result = ctx.ledger.process(&mut txn, &mut block);
    assert_eq!(result, Err(BlockStatus::BadSignature));
}

#[test]
fn process_insufficient_work() {
    let ctx = LedgerContext::new();
    let txn = ctx.ledger.read_txn();
    let head = ctx
        .ledger
        .get_account_info(&txn, &ctx.genesis_account())
        .unwrap()
        .head;
    drop(txn);

    // The stub difficulty of a block is its work value
    let mut block = BlockBuilder::state()
        .key(&DEV_GENESIS_KEY)
        .account(ctx.genesis_account())
        .previous(head)
        .balance(Amount::MAX - Amount::raw(1))
        .link(Account::from(1000))
        .work(3)
        .build();

    let mut txn = ctx.ledger.rw_txn();
    let result = ctx.ledger.process(&mut txn, &mut block);
    assert_eq!(result, Err(BlockStatus::InsufficientWork));
}

#[test]
fn process_open_block() {
    let ctx = LedgerContext::new();
    let destination = KeyPair::new();
    let send = ctx.process_send_from_genesis(&destination.account(), Amount::raw(100));
    let open = ctx.process_open(&destination, &send.hash(), Amount::raw(100));

    let txn = ctx.ledger.read_txn();
    let info = ctx
        .ledger
        .get_account_info(&txn, &destination.account())
        .unwrap();
    assert_eq!(info.head, open.hash());
    assert_eq!(info.balance, Amount::raw(100));
    assert!(open.sideband().unwrap().details.is_receive);
    assert!(ctx
        .ledger
        .get_pending(&txn, &PendingKey::new(destination.account(), send.hash()))
        .is_none());
}

#[test]
fn process_unreceivable() {
    let ctx = LedgerContext::new();
    let destination = KeyPair::new();
    let send = ctx.process_send_from_genesis(&destination.account(), Amount::raw(100));
    ctx.process_open(&destination, &send.hash(), Amount::raw(100));

    // Receiving the same send twice is unreceivable
    let txn = ctx.ledger.read_txn();
    let open = ctx
        .ledger
        .get_account_info(&txn, &destination.account())
        .unwrap()
        .head;
    drop(txn);

    let mut receive = BlockBuilder::state()
        .key(&destination)
        .account(destination.account())
        .previous(open)
        .balance(Amount::raw(200))
        .link(send.hash())
        .build();

    let mut txn = ctx.ledger.rw_txn();
    let result = ctx.ledger.process(&mut txn, &mut receive);
    assert_eq!(result, Err(BlockStatus::Unreceivable));
}

#[test]
fn process_negative_spend() {
    let ctx = LedgerContext::new();
    let txn = ctx.ledger.read_txn();
    let genesis_hash = ctx
        .ledger
        .get_account_info(&txn, &ctx.genesis_account())
        .unwrap()
        .head;
    drop(txn);

    let mut send = BlockBuilder::legacy_send()
        .key(&DEV_GENESIS_KEY)
        .previous(genesis_hash)
        .destination(Account::from(1000))
        .balance(Amount::MAX - Amount::raw(100))
        .build();
    let mut txn = ctx.ledger.rw_txn();
    ctx.ledger.process(&mut txn, &mut send).unwrap();

    // A legacy send that raises the balance spends a negative amount
    let mut negative = BlockBuilder::legacy_send()
        .key(&DEV_GENESIS_KEY)
        .previous(send.hash())
        .destination(Account::from(1000))
        .balance(Amount::MAX)
        .build();
    let result = ctx.ledger.process(&mut txn, &mut negative);
    assert_eq!(result, Err(BlockStatus::NegativeSpend));
}

#[test]
fn process_change_representative() {
    let ctx = LedgerContext::new();
    let new_rep = Account::from(5000);
    let txn = ctx.ledger.read_txn();
    let info = ctx
        .ledger
        .get_account_info(&txn, &ctx.genesis_account())
        .unwrap();
    drop(txn);

    let mut change = BlockBuilder::state()
        .key(&DEV_GENESIS_KEY)
        .account(ctx.genesis_account())
        .previous(info.head)
        .representative(new_rep)
        .balance(info.balance)
        .link(0_u64)
        .build();

    let mut txn = ctx.ledger.rw_txn();
    ctx.ledger.process(&mut txn, &mut change).unwrap();
    drop(txn);

    assert_eq!(ctx.ledger.weight(&ctx.genesis_account()), Amount::zero());
    assert_eq!(ctx.ledger.weight(&new_rep), Amount::MAX);
}

#[test]
fn rollback_send() {
    let ctx = LedgerContext::new();
    let destination = Account::from(1000);
    let send = ctx.process_send_from_genesis(&destination, Amount::raw(100));

    let mut txn = ctx.ledger.rw_txn();
    let rolled_back = ctx.ledger.rollback(&mut txn, &send.hash()).unwrap();
    assert_eq!(rolled_back.len(), 1);
    assert_eq!(rolled_back[0].hash(), send.hash());

    let info = ctx
        .ledger
        .get_account_info(&txn, &ctx.genesis_account())
        .unwrap();
    assert_eq!(info.balance, Amount::MAX);
    assert_eq!(info.block_count, 1);
    assert!(ctx
        .ledger
        .get_pending(&txn, &PendingKey::new(destination, send.hash()))
        .is_none());
    assert!(!ctx.ledger.block_exists(&txn, &send.hash()));
    assert_eq!(ctx.ledger.block_count(), 1);
}

#[test]
fn rollback_then_reprocess() {
    let ctx = LedgerContext::new();
    let send = ctx.process_send_from_genesis(&Account::from(1000), Amount::raw(100));

    let mut txn = ctx.ledger.rw_txn();
    ctx.ledger.rollback(&mut txn, &send.hash()).unwrap();

    let mut again = ctx.build_send_from_genesis_head(
        &send.previous(),
        &Account::from(1000),
        Amount::raw(100),
    );
    let result = ctx.ledger.process(&mut txn, &mut again);
    assert_eq!(result, Ok(()));
    assert_eq!(again.hash(), send.hash());
}

#[test]
fn rollback_rejects_cemented_blocks() {
    let ctx = LedgerContext::new();
    let send = ctx.process_send_from_genesis(&Account::from(1000), Amount::raw(100));

    let mut txn = ctx.ledger.rw_txn();
    let cemented = ctx.ledger.confirm(&mut txn, send.hash());
    assert_eq!(cemented.len(), 1);

    let result = ctx.ledger.rollback(&mut txn, &send.hash());
    assert!(result.is_err());
    assert!(ctx.ledger.block_exists(&txn, &send.hash()));
}

#[test]
fn rollback_receive_rolls_back_dependent_chain() {
    let ctx = LedgerContext::new();
    let destination = KeyPair::new();
    let send = ctx.process_send_from_genesis(&destination.account(), Amount::raw(100));
    let open = ctx.process_open(&destination, &send.hash(), Amount::raw(100));

    // Rolling back the send must roll back the receive in the destination account first
    let mut txn = ctx.ledger.rw_txn();
    let rolled_back = ctx.ledger.rollback(&mut txn, &send.hash()).unwrap();
    let hashes: Vec<_> = rolled_back.iter().map(|block| block.hash()).collect();
    assert!(hashes.contains(&send.hash()));
    assert!(hashes.contains(&open.hash()));
    assert!(!ctx.ledger.block_exists(&txn, &open.hash()));
    assert!(ctx
        .ledger
        .get_account_info(&txn, &destination.account())
        .is_none());
}

#[test]
fn confirm_chain_in_dependency_order() {
    let ctx = LedgerContext::new();
    let first = ctx.process_send_from_genesis(&Account::from(1000), Amount::raw(1));
    let second = ctx.process_send_from_genesis(&Account::from(1000), Amount::raw(1));

    let mut txn = ctx.ledger.rw_txn();
    let cemented = ctx.ledger.confirm(&mut txn, second.hash());
    let hashes: Vec<_> = cemented.iter().map(|block| block.hash()).collect();
    assert_eq!(hashes, vec![first.hash(), second.hash()]);
    assert_eq!(ctx.ledger.cemented_count(), 3);

    // Confirming again is a no-op
    let cemented = ctx.ledger.confirm(&mut txn, second.hash());
    assert!(cemented.is_empty());
}

#[test]
fn confirm_receive_cements_source_first(){
    let ctx = LedgerContext::new();
    let destination = KeyPair::new();
    let send = ctx.process_send_from_genesis(&destination.account(), Amount::raw(100));
    let open = ctx.process_open(&destination, &send.hash(), Amount::raw(100));

    let mut txn = ctx.ledger.rw_txn();
    let cemented = ctx.ledger.confirm(&mut txn, open.hash());
    let hashes: Vec<_> = cemented.iter().map(|block| block.hash()).collect();
    assert_eq!(hashes, vec![send.hash(), open.hash()]);

    let conf = ctx
        .ledger
        .get_confirmation_height(&txn, &destination.account())
        .unwrap();
    assert_eq!(conf.height, 1);
    assert_eq!(conf.frontier, open.hash());
}

#[test]
fn confirmation_height_is_monotone() {
    let ctx = LedgerContext::new();
    let first = ctx.process_send_from_genesis(&Account::from(1000), Amount::raw(1));
    let second = ctx.process_send_from_genesis(&Account::from(1000), Amount::raw(1));

    let mut txn = ctx.ledger.rw_txn();
    ctx.ledger.confirm(&mut txn, second.hash());
    let after_second = ctx
        .ledger
        .get_confirmation_height(&txn, &ctx.genesis_account())
        .unwrap()
        .height;

    // Confirming an ancestor afterwards must not regress the height
    ctx.ledger.confirm(&mut txn, first.hash());
    let after_first = ctx
        .ledger
        .get_confirmation_height(&txn, &ctx.genesis_account())
        .unwrap()
        .height;
    assert_eq!(after_second, 3);
    assert_eq!(after_first, 3);
}

#[test]
fn process_epoch_block() {
    let ctx = LedgerContext::new();
    let txn = ctx.ledger.read_txn();
    let info = ctx
        .ledger
        .get_account_info(&txn, &ctx.genesis_account())
        .unwrap();
    drop(txn);

    let mut epoch = BlockBuilder::state()
        .key(&DEV_GENESIS_KEY)
        .account(ctx.genesis_account())
        .previous(info.head)
        .representative(info.representative)
        .balance(info.balance)
        .link(rsvelo_core::epoch_v1_link())
        .build();

    let mut txn = ctx.ledger.rw_txn();
    ctx.ledger.process(&mut txn, &mut epoch).unwrap();
    assert!(epoch.sideband().unwrap().details.is_epoch);
    assert_eq!(
        ctx.ledger
            .get_account_info(&txn, &ctx.genesis_account())
            .unwrap()
            .epoch,
        rsvelo_core::Epoch::Epoch1
    );
}

#[test]
fn epoch_block_must_not_change_representative() {
    let ctx = LedgerContext::new();
    let txn = ctx.ledger.read_txn();
    let info = ctx
        .ledger
        .get_account_info(&txn, &ctx.genesis_account())
        .unwrap();
    drop(txn);

    let mut epoch = BlockBuilder::state()
        .key(&DEV_GENESIS_KEY)
        .account(ctx.genesis_account())
        .previous(info.head)
        .representative(rsvelo_core::PublicKey::from(12345))
        .balance(info.balance)
        .link(rsvelo_core::epoch_v1_link())
        .build();

    let mut txn = ctx.ledger.rw_txn();
    let result = ctx.ledger.process(&mut txn, &mut epoch);
    assert_eq!(result, Err(BlockStatus::RepresentativeMismatch));
}

#[test]
fn successor_by_qualified_root() {
    let ctx = LedgerContext::new();
    let send = ctx.process_send_from_genesis(&Account::from(1000), Amount::raw(1));

    let txn = ctx.ledger.read_txn();
    let successor = ctx.ledger.successor(&txn, &send.qualified_root()).unwrap();
    assert_eq!(successor.hash(), send.hash());
}

fn _assert_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Ledger>();
}
