use std::collections::BTreeMap;

use alloy_primitives::{Address, Bytes, B256, U256};
use assert_matches::assert_matches;
use revm::primitives::{AccountInfo, Bytecode, SpecId};
use txsim::{CreateAccessListError, InMemoryDB, Simulator};
use txsim_errors::{ExceptionKind, OverrideError};
use txsim_types::{
    AccessList, AccessListEntry, AccountOverride, CallOverride, Quantity, RawAccountOverride, Rules,
    RuntimeBlock, SimulationTransaction,
};

fn block() -> RuntimeBlock {
    RuntimeBlock {
        number: Quantity::from_u64(1),
        timestamp: Quantity::from_u64(0),
        base_fee: None,
        prev_randao: B256::ZERO,
        coinbase: Address::ZERO,
        gas_limit: Quantity::from_u64(30_000_000),
        state_root: B256::ZERO,
    }
}

fn funded_db(accounts: &[Address]) -> InMemoryDB {
    let mut db = InMemoryDB::default();
    for &address in accounts {
        db.insert_account_info(
            address,
            AccountInfo { balance: U256::from(10_u64.pow(20)), nonce: 0, ..Default::default() },
        );
    }
    db
}

fn deploy(db: &mut InMemoryDB, address: Address, code: Vec<u8>) {
    let bytecode = Bytecode::new_raw(Bytes::from(code));
    let code_hash = bytecode.hash_slow();
    db.insert_account_info(
        address,
        AccountInfo { balance: U256::ZERO, nonce: 0, code_hash, code: Some(bytecode) },
    );
}

fn word(slot: u8) -> B256 {
    let mut bytes = [0u8; 32];
    bytes[31] = slot;
    B256::from(bytes)
}

/// `PUSH1 slot; SLOAD; STOP`.
fn sload_bytecode(slot: u8) -> Vec<u8> {
    vec![0x60, slot, 0x54, 0x00]
}

/// `PUSH1 value; PUSH1 slot; SSTORE; STOP`.
fn sstore_bytecode(slot: u8, value: u8) -> Vec<u8> {
    vec![0x60, value, 0x60, slot, 0x55, 0x00]
}

/// `PUSH20 target; BALANCE; STOP`.
fn balance_bytecode(target: Address) -> Vec<u8> {
    let mut code = vec![0x73];
    code.extend_from_slice(target.as_slice());
    code.push(0x31);
    code.push(0x00);
    code
}

/// `PUSH20 target; EXTCODESIZE; PUSH1 0; MSTORE; PUSH1 32; PUSH1 0; RETURN` —
/// returns `EXTCODESIZE(target)` as a left-padded 32-byte word.
fn extcodesize_probe_bytecode(target: Address) -> Vec<u8> {
    let mut code = vec![0x73];
    code.extend_from_slice(target.as_slice());
    code.extend_from_slice(&[0x3b, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3]);
    code
}

/// A contract whose touched-address set depends on whether its own first
/// storage slot is warm: cold (first iteration) it calls `BALANCE(z)`, warm
/// (every later iteration, since the tracker already reported that slot) it
/// calls `BALANCE(y)` instead. Jump offsets are computed from the assembled
/// code rather than hand-counted, so they can't drift out of sync with the
/// instructions around them.
fn convergence_bytecode(threshold: u16, z: Address, y: Address) -> Vec<u8> {
    let mut code = vec![0x60, 0x00, 0x54, 0x5a, 0x61];
    code.extend_from_slice(&threshold.to_be_bytes());
    code.push(0x10); // LT: pushes (threshold < gas_remaining)

    let jumpi_operand = code.len() + 1;
    code.push(0x60);
    code.push(0x00); // placeholder, patched below
    code.push(0x57); // JUMPI

    code.push(0x73);
    code.extend_from_slice(z.as_slice());
    code.push(0x31); // BALANCE(z)
    code.push(0x50); // POP

    let jump_operand = code.len() + 1;
    code.push(0x60);
    code.push(0x00); // placeholder, patched below
    code.push(0x56); // JUMP

    let path_a = code.len() as u8;
    code.push(0x5b); // JUMPDEST
    code.push(0x73);
    code.extend_from_slice(y.as_slice());
    code.push(0x31); // BALANCE(y)
    code.push(0x50); // POP

    let end = code.len() as u8;
    code.push(0x5b); // JUMPDEST
    code.push(0x00); // STOP

    code[jumpi_operand] = path_a;
    code[jump_operand] = end;
    code
}

#[test]
fn empty_transfer_costs_base_intrinsic_gas() {
    let from = Address::repeat_byte(0xA);
    let to = Address::repeat_byte(0xB);
    let db = funded_db(&[from, to]);

    let tx = SimulationTransaction {
        from,
        to: Some(to),
        gas: Quantity::from_u64(21_000),
        gas_price: Quantity::from_u64(1),
        value: Some(Quantity::from_u64(15)),
        data: None,
        block: block(),
        access_list: None,
    };

    let simulator = Simulator::new(db, Rules::all(), SpecId::CANCUN);
    let result = simulator.initialize(&tx, None).expect("initialize succeeds").run().expect("run succeeds");

    assert!(result.is_success());
    assert_eq!(result.gas_used.as_u64_saturating(), 21_000);
}

#[test]
fn insufficient_gas_fails_before_evm_invocation() {
    let from = Address::repeat_byte(0xA);
    let to = Address::repeat_byte(0xB);
    let db = funded_db(&[from, to]);

    let tx = SimulationTransaction {
        from,
        to: Some(to),
        gas: Quantity::from_u64(100),
        gas_price: Quantity::from_u64(1),
        value: None,
        data: None,
        block: block(),
        access_list: None,
    };

    let simulator = Simulator::new(db, Rules::all(), SpecId::CANCUN);
    let err = simulator.initialize(&tx, None).expect("initialize succeeds").run().unwrap_err();

    assert_matches!(err.exception, ExceptionKind::OutOfGas);
}

#[tokio::test]
async fn create_access_list_converges_on_empty_transfer() {
    let from = Address::repeat_byte(0xA);
    let to = Address::repeat_byte(0xB);
    let db = funded_db(&[from, to]);

    let tx = SimulationTransaction {
        from,
        to: Some(to),
        gas: Quantity::from_u64(21_000),
        gas_price: Quantity::from_u64(1),
        value: Some(Quantity::from_u64(1)),
        data: None,
        block: block(),
        access_list: None,
    };

    let simulator = Simulator::new(db, Rules::all(), SpecId::CANCUN);
    let initialized = simulator.initialize(&tx, None).expect("initialize succeeds");

    let (access_list, gas_used) = initialized
        .create_access_list(AccessList::empty(), None)
        .await
        .expect("converges immediately for a plain transfer");

    assert!(access_list.is_empty());
    assert_eq!(gas_used, 21_000);
}

#[tokio::test]
async fn create_access_list_propagates_call_errors() {
    let from = Address::repeat_byte(0xA);
    let to = Address::repeat_byte(0xB);
    let db = funded_db(&[from, to]);

    let tx = SimulationTransaction {
        from,
        to: Some(to),
        gas: Quantity::from_u64(100),
        gas_price: Quantity::from_u64(1),
        value: None,
        data: None,
        block: block(),
        access_list: None,
    };

    let simulator = Simulator::new(db, Rules::all(), SpecId::CANCUN);
    let initialized = simulator.initialize(&tx, None).expect("initialize succeeds");

    let err = initialized.create_access_list(AccessList::empty(), None).await.unwrap_err();
    assert_matches!(err, CreateAccessListError::Call { .. });
}

#[tokio::test]
async fn storage_read_reports_the_touched_slot() {
    let from = Address::repeat_byte(0xA);
    let c = Address::repeat_byte(0xC);
    let mut db = funded_db(&[from]);
    deploy(&mut db, c, sload_bytecode(7));

    let tx = SimulationTransaction {
        from,
        to: Some(c),
        gas: Quantity::from_u64(100_000),
        gas_price: Quantity::from_u64(1),
        value: None,
        data: None,
        block: block(),
        access_list: None,
    };

    let simulator = Simulator::new(db, Rules::all(), SpecId::CANCUN);
    let initialized = simulator.initialize(&tx, None).expect("initialize succeeds");
    let (access_list, _gas_used) =
        initialized.create_access_list(AccessList::empty(), None).await.expect("converges");

    assert_eq!(access_list, AccessList(vec![AccessListEntry::new(c, [word(7)])]));
}

#[tokio::test]
async fn storage_write_reports_same_slot_and_costs_less_prewarmed() {
    let from = Address::repeat_byte(0xA);
    let c = Address::repeat_byte(0xC);

    let tx_for = |access_list: Option<AccessList>| SimulationTransaction {
        from,
        to: Some(c),
        gas: Quantity::from_u64(100_000),
        gas_price: Quantity::from_u64(1),
        value: None,
        data: None,
        block: block(),
        access_list,
    };

    let mut db = funded_db(&[from]);
    deploy(&mut db, c, sstore_bytecode(7, 0x2a));
    let simulator = Simulator::new(db.clone(), Rules::all(), SpecId::CANCUN);
    let initialized = simulator.initialize(&tx_for(None), None).expect("initialize succeeds");
    let (access_list, _gas_used) =
        initialized.create_access_list(AccessList::empty(), None).await.expect("converges");
    assert_eq!(access_list, AccessList(vec![AccessListEntry::new(c, [word(7)])]));

    let without_list = Simulator::new(db.clone(), Rules::all(), SpecId::CANCUN)
        .initialize(&tx_for(None), None)
        .expect("initialize succeeds")
        .run()
        .expect("run succeeds");
    let with_list = Simulator::new(db, Rules::all(), SpecId::CANCUN)
        .initialize(&tx_for(Some(access_list)), None)
        .expect("initialize succeeds")
        .run()
        .expect("run succeeds");

    assert!(with_list.gas_used.as_u64_saturating() < without_list.gas_used.as_u64_saturating());
}

#[tokio::test]
async fn cross_address_balance_read_omits_storage_only_callee() {
    let from = Address::repeat_byte(0xA);
    let c = Address::repeat_byte(0xC);
    let b = Address::repeat_byte(0xB);
    let mut db = funded_db(&[from]);
    deploy(&mut db, c, balance_bytecode(b));

    let tx = SimulationTransaction {
        from,
        to: Some(c),
        gas: Quantity::from_u64(100_000),
        gas_price: Quantity::from_u64(1),
        value: None,
        data: None,
        block: block(),
        access_list: None,
    };

    let simulator = Simulator::new(db, Rules::all(), SpecId::CANCUN);
    let initialized = simulator.initialize(&tx, None).expect("initialize succeeds");
    let (access_list, _gas_used) =
        initialized.create_access_list(AccessList::empty(), None).await.expect("converges");

    assert_eq!(access_list, AccessList(vec![AccessListEntry::new(b, [])]));
}

#[tokio::test]
async fn multi_iteration_convergence_stabilizes_on_third_iteration() {
    let from = Address::repeat_byte(0xA);
    let c = Address::repeat_byte(0xC);
    let z = Address::repeat_byte(0x7A);
    let y = Address::repeat_byte(0x7B);
    let mut db = funded_db(&[from]);
    deploy(&mut db, c, convergence_bytecode(27_895, z, y));

    let tx = SimulationTransaction {
        from,
        to: Some(c),
        gas: Quantity::from_u64(50_000),
        gas_price: Quantity::from_u64(1),
        value: None,
        data: None,
        block: block(),
        access_list: None,
    };

    let simulator = Simulator::new(db, Rules::all(), SpecId::CANCUN);
    let initialized = simulator.initialize(&tx, None).expect("initialize succeeds");
    let (access_list, _gas_used) =
        initialized.create_access_list(AccessList::empty(), None).await.expect("converges by iteration 3");

    assert_eq!(access_list, AccessList(vec![AccessListEntry::new(c, [word(0)]), AccessListEntry::new(y, [])]));
}

#[test]
fn conflicting_overrides_rejected_with_literal_message_before_any_evm_call() {
    let address = Address::repeat_byte(0xA);
    let raw = RawAccountOverride {
        state: Some(BTreeMap::new()),
        state_diff: Some(BTreeMap::new()),
        ..Default::default()
    };

    let err = AccountOverride::from_wire(address, raw).unwrap_err();

    assert_eq!(err, OverrideError::ConflictingStateOverrides { address });
    assert_eq!(err.to_string(), "both state and stateDiff overrides specified");
}

#[test]
fn override_empty_code_zeroes_extcodesize() {
    let from = Address::repeat_byte(0xA);
    let target = Address::repeat_byte(0xE2);
    let prober = Address::repeat_byte(0xE3);

    let mut db = funded_db(&[from]);
    deploy(&mut db, target, vec![0x60, 0x01, 0x00]);
    deploy(&mut db, prober, extcodesize_probe_bytecode(target));

    let override_account = AccountOverride::from_wire(
        target,
        RawAccountOverride { code: Some(String::new()), ..Default::default() },
    )
    .expect("empty code is a valid override");
    let overrides = CallOverride(BTreeMap::from([(target, override_account)]));

    let tx = SimulationTransaction {
        from,
        to: Some(prober),
        gas: Quantity::from_u64(100_000),
        gas_price: Quantity::from_u64(1),
        value: None,
        data: None,
        block: block(),
        access_list: None,
    };

    let simulator = Simulator::new(db, Rules::all(), SpecId::CANCUN);
    let result = simulator.initialize(&tx, Some(&overrides)).expect("initialize succeeds").run().expect("run succeeds");

    assert_eq!(result.return_value.as_ref(), [0u8; 32]);
}
