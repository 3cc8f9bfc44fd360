//! Snapshot semantics through the facade, over the persistent store.

use basalt_emulator::{Blockchain, EmulatorConfig};
use basalt_primitives::Transaction;
use basalt_storage::SledStore;

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn emulator_at(path: &std::path::Path) -> Blockchain {
    let store = SledStore::open(path).unwrap();
    Blockchain::new(
        EmulatorConfig::new()
            .with_simple_addresses()
            .with_store(Box::new(store)),
    )
    .unwrap()
}

fn tx(script: &str) -> Transaction {
    let mut tx = Transaction::new(script.as_bytes().to_vec());
    tx.gas_limit = 100;
    tx
}

// ── Test: jump restores ledger values and latest height ──

#[test]
fn test_jump_restores_tagged_state() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let bc = emulator_at(dir.path());

    bc.add_transaction(tx("set 0000000000000005 balance 10")).unwrap();
    bc.execute_and_commit_block().unwrap();
    assert_eq!(bc.get_latest_block().unwrap().header.height, 1);

    // First jump with a fresh name tags the current state.
    bc.jump_to_snapshot("snap").unwrap();
    assert_eq!(bc.get_latest_block().unwrap().header.height, 1);

    // Advance past the tag.
    bc.add_transaction(tx("set 0000000000000005 balance 20")).unwrap();
    bc.execute_and_commit_block().unwrap();
    assert_eq!(bc.get_latest_block().unwrap().header.height, 2);
    let read = b"get 0000000000000005 balance";
    assert_eq!(
        bc.execute_script(read, &[]).unwrap().value,
        Some(b"20".to_vec())
    );

    // Jump back: the tagged height and balance return.
    bc.jump_to_snapshot("snap").unwrap();
    assert_eq!(bc.get_latest_block().unwrap().header.height, 1);
    assert_eq!(
        bc.execute_script(read, &[]).unwrap().value,
        Some(b"10".to_vec())
    );
}

// ── Test: work after a jump proceeds on the restored state ──

#[test]
fn test_commits_continue_after_jump() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let bc = emulator_at(dir.path());

    bc.add_transaction(tx("set 0000000000000005 balance 10")).unwrap();
    bc.execute_and_commit_block().unwrap();
    bc.jump_to_snapshot("base").unwrap();

    // Diverge once, jump back, then diverge differently.
    bc.add_transaction(tx("set 0000000000000005 balance 20")).unwrap();
    bc.execute_and_commit_block().unwrap();
    bc.jump_to_snapshot("base").unwrap();

    bc.add_transaction(tx("set 0000000000000005 scratch abc")).unwrap();
    let (block, _) = bc.execute_and_commit_block().unwrap();
    assert_eq!(block.header.height, 2);

    let balance = bc
        .execute_script(b"get 0000000000000005 balance", &[])
        .unwrap();
    assert_eq!(balance.value, Some(b"10".to_vec()));
    let scratch = bc
        .execute_script(b"get 0000000000000005 scratch", &[])
        .unwrap();
    assert_eq!(scratch.value, Some(b"abc".to_vec()));
}

// ── Test: state persists across emulator restarts ──

#[test]
fn test_state_survives_restart() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();

    {
        let bc = emulator_at(dir.path());
        bc.add_transaction(tx("set 0000000000000005 balance 10")).unwrap();
        bc.execute_and_commit_block().unwrap();
    }

    let bc = emulator_at(dir.path());
    assert_eq!(bc.get_latest_block().unwrap().header.height, 1);
    assert_eq!(
        bc.execute_script(b"get 0000000000000005 balance", &[])
            .unwrap()
            .value,
        Some(b"10".to_vec())
    );
}
