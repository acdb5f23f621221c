use tempfile::TempDir;
use weft_crypto::{create_address, keccak256};
use weft_evm::{BlockContext, EvmError, VmParams};
use weft_primitives::{Address, H256, U256};
use weft_storage::{Account, StateCache, StateStore, StateWriter};
use weft_vm::{
    events, BasicGasMeter, ContractStateParams, GasMeter, InfiniteGasMeter, Keeper, LogsResponse,
    Msg, StorageResponse, TxEnv, TxStatus, VmConfig, VmError,
};

const GAS_LIMIT: u64 = 1_000_000;

// PUSH1 42 PUSH1 0 SSTORE, CODECOPY the 11-byte runtime, RETURN it
const INIT: &str = "602a600055600b6011600039600b6000f3";
// PUSH1 0 SLOAD PUSH1 0 MSTORE PUSH1 32 PUSH1 0 RETURN
const RUNTIME: &str = "60005460005260206000f3";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn open_keeper() -> (TempDir, Keeper) {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let keeper = Keeper::open(dir.path(), &VmConfig::default()).unwrap();
    (dir, keeper)
}

fn addr(byte: u8) -> Address {
    Address::from_bytes([byte; 20])
}

fn sender() -> Address {
    addr(0x5e)
}

fn slot(n: u64) -> H256 {
    H256::from_word(U256::from(n))
}

fn env(tx: u8) -> TxEnv {
    TxEnv {
        gas_limit: GAS_LIMIT,
        gas_price: U256::from(2u64),
        tx_hash: H256::from_bytes([tx; 32]),
        block: BlockContext {
            number: 7,
            ..BlockContext::default()
        },
    }
}

fn deploy_code(keeper: &mut Keeper, address: Address, code: Vec<u8>) {
    let mut genesis = StateCache::new();
    let code_hash = keccak256(&code);
    genesis.set_account(
        address,
        Account {
            code_hash,
            ..Account::default()
        },
    );
    genesis.set_code(code_hash, code);
    keeper.db_mut().commit(genesis).unwrap();
}

fn call_msg(recipient: Address) -> Msg {
    Msg::ContractCall {
        from: sender(),
        recipient,
        amount: U256::zero(),
        payload: Vec::new(),
    }
}

fn create_msg() -> Msg {
    let mut code = hex::decode(INIT).unwrap();
    code.extend(hex::decode(RUNTIME).unwrap());
    Msg::ContractCreate {
        from: sender(),
        amount: U256::zero(),
        code,
    }
}

/// Pushes `zero_args` zero words, the target and GAS, issues `call_op`,
/// then returns normally on success and reverts on failure.
fn guarded_call(call_op: u8, zero_args: usize, target: Address) -> Vec<u8> {
    let mut code = Vec::new();
    for _ in 0..zero_args {
        code.extend_from_slice(&[0x60, 0x00]);
    }
    code.push(0x73);
    code.extend_from_slice(target.as_bytes());
    code.extend_from_slice(&[0x5a, call_op]);
    let dest = (code.len() + 8) as u8;
    code.extend_from_slice(&[0x60, dest, 0x57, 0x60, 0x00, 0x60, 0x00, 0xfd, 0x5b, 0x00]);
    code
}

#[test]
fn test_deploy_then_call_getter() {
    let (_dir, mut keeper) = open_keeper();
    let msg = create_msg();
    let runtime = hex::decode(RUNTIME).unwrap();
    let mut meter = BasicGasMeter::new(GAS_LIMIT);

    let receipt = keeper.handle(&msg, &env(1), &mut meter).unwrap();
    assert_eq!(receipt.status, TxStatus::Success);
    let address = receipt.contract_address.unwrap();
    assert_eq!(address, create_address(&sender(), 0));
    assert_eq!(receipt.output, runtime);

    let Msg::ContractCreate { code, .. } = &msg else {
        unreachable!()
    };
    let intrinsic = keeper.params().intrinsic_gas(code, true).unwrap();
    assert_eq!(receipt.gas_used, intrinsic + 20_030 + 11 * 200);
    assert_eq!(meter.gas_consumed(), receipt.gas_used);

    assert_eq!(receipt.events.len(), 2);
    assert_eq!(receipt.events[0].kind, events::EVENT_TYPE_MESSAGE);
    assert_eq!(receipt.events[1], events::create_contract(&address));

    assert_eq!(keeper.get_code(&address).unwrap(), runtime);
    assert_eq!(keeper.get_state(&address, &slot(0)).unwrap(), slot(42));
    assert_eq!(keeper.get_nonce(&sender()).unwrap(), 1);
    assert_eq!(keeper.get_nonce(&address).unwrap(), 1);

    let mut meter = BasicGasMeter::new(GAS_LIMIT);
    let receipt = keeper.handle(&call_msg(address), &env(2), &mut meter).unwrap();
    assert!(receipt.is_success());
    assert_eq!(U256::from_big_endian(&receipt.output), U256::from(42u64));
    assert_eq!(receipt.gas_used, 21_000 + 818);
    assert_eq!(keeper.get_nonce(&sender()).unwrap(), 2);
}

#[test]
fn test_call_forwards_at_most_63_64ths() {
    let (_dir, mut keeper) = open_keeper();
    let (caller, callee) = (addr(1), addr(2));
    // GAS PUSH1 0 SSTORE STOP
    deploy_code(&mut keeper, callee, vec![0x5a, 0x60, 0x00, 0x55, 0x00]);
    deploy_code(&mut keeper, caller, guarded_call(0xf1, 5, callee));

    let tx_gas = 100_000;
    let mut meter = BasicGasMeter::new(GAS_LIMIT);
    let receipt = keeper
        .handle(
            &call_msg(caller),
            &TxEnv {
                gas_limit: 21_000 + tx_gas,
                ..env(1)
            },
            &mut meter,
        )
        .unwrap();
    assert!(receipt.is_success());

    // 10 pushes, PUSH20, GAS and the CALL base cost come out first
    let available = tx_gas - 15 - 3 - 2 - 700;
    let forwarded = available * 63 / 64;
    let stored = keeper.get_state(&callee, &slot(0)).unwrap().to_word();
    assert_eq!(stored, U256::from(forwarded - 2));
    assert!(available - forwarded >= available / 64);
}

#[test]
fn test_static_context_blocks_nested_sstore() {
    let (_dir, mut keeper) = open_keeper();
    let (a, b, c) = (addr(1), addr(2), addr(3));
    // C: PUSH1 1 PUSH1 0 SSTORE STOP
    deploy_code(&mut keeper, c, vec![0x60, 0x01, 0x60, 0x00, 0x55, 0x00]);
    // B: CALL C, revert on failure
    deploy_code(&mut keeper, b, guarded_call(0xf1, 5, c));
    // A: STATICCALL B, revert on failure
    deploy_code(&mut keeper, a, guarded_call(0xfa, 4, b));

    let mut meter = BasicGasMeter::new(GAS_LIMIT);
    let receipt = keeper.handle(&call_msg(a), &env(1), &mut meter).unwrap();
    assert_eq!(receipt.status, TxStatus::Failure);
    assert_eq!(receipt.error, Some(EvmError::Revert));
    assert!(receipt.gas_used > 21_000);
    assert!(receipt.gas_used < GAS_LIMIT);
    assert_eq!(meter.gas_consumed(), receipt.gas_used);
    assert!(receipt.logs.is_empty());
    assert!(receipt.events.is_empty());

    assert_eq!(keeper.get_state(&c, &slot(0)).unwrap(), H256::ZERO);
    assert_eq!(keeper.get_nonce(&sender()).unwrap(), 0);

    // The same chain outside a static context writes
    let receipt = keeper
        .handle(&call_msg(b), &env(2), &mut InfiniteGasMeter::new())
        .unwrap();
    assert!(receipt.is_success());
    assert_eq!(receipt.events, vec![events::message(&sender())]);
    assert_eq!(keeper.get_state(&c, &slot(0)).unwrap(), slot(1));
}

#[test]
fn test_logs_persist_under_tx_hash() {
    let (_dir, mut keeper) = open_keeper();
    let emitter = addr(4);
    // MSTORE8 0xaa at 0, LOG1 with topic 7 over one byte
    deploy_code(
        &mut keeper,
        emitter,
        hex::decode("60aa600053600760016000a100").unwrap(),
    );

    let tx = env(9);
    let receipt = keeper
        .handle(&call_msg(emitter), &tx, &mut InfiniteGasMeter::new())
        .unwrap();
    assert!(receipt.is_success());
    assert_eq!(receipt.logs.len(), 1);

    let logs = keeper.get_logs(&tx.tx_hash).unwrap();
    assert_eq!(logs, receipt.logs);
    assert_eq!(logs[0].address, emitter);
    assert_eq!(logs[0].topics, vec![slot(7)]);
    assert_eq!(logs[0].data, vec![0xaa]);
    assert_eq!(logs[0].block_number, 7);

    let hash = tx.tx_hash.to_hex();
    let json = keeper.querier().query(&["logs", hash.as_str()], &[]).unwrap();
    let response: LogsResponse = serde_json::from_slice(&json).unwrap();
    assert_eq!(response.logs, logs);

    assert!(keeper.get_logs(&H256::from_bytes([0x77; 32])).unwrap().is_empty());
}

#[test]
fn test_rejected_messages_touch_nothing() {
    let (_dir, mut keeper) = open_keeper();
    let mut meter = BasicGasMeter::new(GAS_LIMIT);

    let err = keeper
        .handle(&call_msg(addr(9)), &env(1), &mut meter)
        .unwrap_err();
    assert!(matches!(err, VmError::NoCodeExist(address) if address == addr(9)));

    let err = keeper
        .handle(
            &create_msg(),
            &TxEnv {
                gas_limit: 53_000,
                ..env(2)
            },
            &mut meter,
        )
        .unwrap_err();
    assert!(matches!(err, VmError::IntrinsicGas { have: 53_000, .. }));

    let invalid = Msg::ContractCreate {
        from: sender(),
        amount: U256::zero(),
        code: Vec::new(),
    };
    assert!(matches!(
        keeper.handle(&invalid, &env(3), &mut meter),
        Err(VmError::InvalidMsg(_))
    ));

    assert_eq!(meter.gas_consumed(), 0);
    assert_eq!(keeper.get_account(&sender()).unwrap(), None);
}

#[test]
fn test_estimates_do_not_commit() {
    let (_dir, mut keeper) = open_keeper();
    let msg = create_msg();
    let address = create_address(&sender(), 0);

    let estimate = keeper.querier().with_env(env(1)).estimate_fee(&msg).unwrap();
    assert!(estimate.success);
    assert_eq!(estimate.fee, U256::from(estimate.gas_used * 2));
    assert!(keeper.get_code(&address).unwrap().is_empty());
    assert_eq!(keeper.get_nonce(&sender()).unwrap(), 0);

    let receipt = keeper
        .handle(&msg, &env(1), &mut InfiniteGasMeter::new())
        .unwrap();
    assert_eq!(receipt.gas_used, estimate.gas_used);

    let json = serde_json::to_vec(&call_msg(address)).unwrap();
    let querier = keeper.querier();
    let estimate = querier.query(&["call_fee"], &json).unwrap();
    let estimate: weft_vm::FeeEstimate = serde_json::from_slice(&estimate).unwrap();
    assert_eq!(estimate.gas_used, 21_000 + 818);
    assert_eq!(estimate.fee, U256::zero());

    assert!(matches!(
        querier.query(&["create_fee"], &json),
        Err(VmError::InvalidQuery(_))
    ));
}

#[test]
fn test_query_surface() {
    let (_dir, mut keeper) = open_keeper();
    let receipt = keeper
        .handle(&create_msg(), &env(1), &mut InfiniteGasMeter::new())
        .unwrap();
    let address = receipt.contract_address.unwrap();
    let querier = keeper.querier();

    let code = querier.query(&["code"], address.as_bytes()).unwrap();
    assert_eq!(code, hex::decode(RUNTIME).unwrap());
    assert!(matches!(
        querier.query(&["code"], &[0u8; 19]),
        Err(VmError::InvalidAddress(_))
    ));

    let (address_hex, key_hex) = (address.to_hex(), slot(0).to_hex());
    let json = querier
        .query(&["storage", address_hex.as_str(), key_hex.as_str()], &[])
        .unwrap();
    let response: StorageResponse = serde_json::from_slice(&json).unwrap();
    assert_eq!(response.value, slot(42));

    let params = ContractStateParams {
        from: sender(),
        to: address,
        data: Vec::new(),
    };
    let output = querier
        .query(&["state"], &serde_json::to_vec(&params).unwrap())
        .unwrap();
    assert_eq!(U256::from_big_endian(&output), U256::from(42u64));

    let json = querier.query(&["parameters"], &[]).unwrap();
    let params: VmParams = serde_json::from_slice(&json).unwrap();
    assert_eq!(&params, keeper.params());

    assert!(matches!(
        querier.query(&["nope"], &[]),
        Err(VmError::UnknownQuery(_))
    ));
    assert!(matches!(
        querier.query(&["storage"], &[]),
        Err(VmError::InvalidQuery(_))
    ));
}

#[test]
fn test_state_survives_reopen() {
    let (dir, mut keeper) = open_keeper();
    let receipt = keeper
        .handle(&create_msg(), &env(1), &mut InfiniteGasMeter::new())
        .unwrap();
    let address = receipt.contract_address.unwrap();
    drop(keeper);

    let keeper = Keeper::open(dir.path(), &VmConfig::default()).unwrap();
    assert_eq!(keeper.get_code(&address).unwrap(), hex::decode(RUNTIME).unwrap());
    assert_eq!(keeper.get_state(&address, &slot(0)).unwrap(), slot(42));
}
