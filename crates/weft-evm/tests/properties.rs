use proptest::prelude::*;
use weft_evm::gas::memory_cost;
use weft_evm::word::{self, MIN_NEGATIVE};
use weft_evm::{EvmError, JournaledState, Log, Stack, StateAccess, STACK_LIMIT};
use weft_primitives::{Address, H256, U256};
use weft_storage::{Account, StateCache, StateWriter};

fn any_word() -> impl Strategy<Value = U256> {
    any::<[u64; 4]>().prop_map(U256)
}

#[derive(Debug, Clone)]
enum Mutation {
    AddBalance(u8, u64),
    SubBalance(u8, u64),
    SetNonce(u8, u64),
    SetState(u8, u8, u8),
    SetCode(u8, Vec<u8>),
    CreateAccount(u8),
    Suicide(u8),
    AddRefund(u64),
    AddLog(u8),
}

fn mutation() -> impl Strategy<Value = Mutation> {
    let account = 0u8..4;
    prop_oneof![
        (account.clone(), any::<u64>()).prop_map(|(a, v)| Mutation::AddBalance(a, v)),
        (account.clone(), any::<u64>()).prop_map(|(a, v)| Mutation::SubBalance(a, v)),
        (account.clone(), any::<u64>()).prop_map(|(a, v)| Mutation::SetNonce(a, v)),
        (account.clone(), 0u8..4, any::<u8>()).prop_map(|(a, k, v)| Mutation::SetState(a, k, v)),
        (account.clone(), proptest::collection::vec(any::<u8>(), 0..8))
            .prop_map(|(a, code)| Mutation::SetCode(a, code)),
        account.clone().prop_map(Mutation::CreateAccount),
        account.clone().prop_map(Mutation::Suicide),
        any::<u32>().prop_map(|v| Mutation::AddRefund(v as u64)),
        account.prop_map(Mutation::AddLog),
    ]
}

fn address(n: u8) -> Address {
    Address::from_bytes([n + 1; 20])
}

fn key(n: u8) -> H256 {
    H256::from_word(U256::from(n))
}

fn apply(state: &mut JournaledState<StateCache>, mutation: &Mutation) {
    match mutation {
        Mutation::AddBalance(a, v) => state.add_balance(&address(*a), U256::from(*v)),
        Mutation::SubBalance(a, v) => state.sub_balance(&address(*a), U256::from(*v)),
        Mutation::SetNonce(a, v) => state.set_nonce(&address(*a), *v),
        Mutation::SetState(a, k, v) => {
            state.set_state(&address(*a), key(*k), H256::from_word(U256::from(*v)))
        }
        Mutation::SetCode(a, code) => state.set_code(&address(*a), code.clone()),
        Mutation::CreateAccount(a) => state.create_account(&address(*a)),
        Mutation::Suicide(a) => {
            state.suicide(&address(*a));
        }
        Mutation::AddRefund(v) => state.add_refund(*v),
        Mutation::AddLog(a) => state.add_log(Log {
            address: address(*a),
            ..Log::default()
        }),
    }
}

#[derive(Debug, PartialEq)]
struct AccountView {
    exists: bool,
    balance: U256,
    nonce: u64,
    code: Vec<u8>,
    code_hash: H256,
    storage: Vec<H256>,
    suicided: bool,
}

fn view(state: &mut JournaledState<StateCache>) -> (Vec<AccountView>, u64, usize) {
    let accounts = (0..4)
        .map(|a| {
            let addr = address(a);
            AccountView {
                exists: state.exist(&addr),
                balance: state.get_balance(&addr),
                nonce: state.get_nonce(&addr),
                code: state.get_code(&addr),
                code_hash: state.get_code_hash(&addr),
                storage: (0..4).map(|k| state.get_state(&addr, &key(k))).collect(),
                suicided: state.has_suicided(&addr),
            }
        })
        .collect();
    (accounts, state.get_refund(), state.logs().len())
}

fn seeded_state() -> JournaledState<StateCache> {
    let mut backend = StateCache::new();
    backend.set_account(
        address(0),
        Account {
            nonce: 3,
            balance: U256::from(1_000u64),
            ..Account::default()
        },
    );
    backend.set_storage(address(0), key(1), key(9));
    JournaledState::new(backend)
}

proptest! {
    #[test]
    fn sdiv_min_by_minus_one_wraps(_a in any_word()) {
        prop_assert_eq!(word::sdiv(MIN_NEGATIVE, U256::MAX), MIN_NEGATIVE);
    }

    #[test]
    fn large_shifts_saturate(value in any_word(), extra in any::<u64>()) {
        let shift = U256::from(256u64) + U256::from(extra);
        prop_assert_eq!(word::shl(shift, value), U256::zero());
        prop_assert_eq!(word::shr(shift, value), U256::zero());
        let expected = if value.bit(255) { U256::MAX } else { U256::zero() };
        prop_assert_eq!(word::sar(shift, value), expected);
    }

    #[test]
    fn stack_round_trip(values in proptest::collection::vec(any_word(), 0..=STACK_LIMIT)) {
        let mut stack = Stack::new();
        for v in &values {
            stack.push(*v).unwrap();
        }
        for v in values.iter().rev() {
            prop_assert_eq!(stack.pop().unwrap(), *v);
        }
        prop_assert!(stack.is_empty());
    }

    #[test]
    fn memory_cost_strictly_increases(w1 in 0u64..100_000, delta in 1u64..100_000) {
        let w2 = w1 + delta;
        let w3 = w2 + 1;
        let base = memory_cost(w1, 3, 512);
        let to_w2 = memory_cost(w2, 3, 512) - base;
        let to_w3 = memory_cost(w3, 3, 512) - base;
        prop_assert!(to_w2 > 0);
        prop_assert!(to_w3 > to_w2);
    }

    #[test]
    fn snapshot_revert_restores_state(
        before in proptest::collection::vec(mutation(), 0..10),
        during in proptest::collection::vec(mutation(), 0..20),
    ) {
        let mut state = seeded_state();
        for m in &before {
            apply(&mut state, m);
        }
        let expected = view(&mut state);

        let snapshot = state.snapshot();
        for m in &during {
            apply(&mut state, m);
        }
        state.revert_to_snapshot(snapshot);

        prop_assert_eq!(view(&mut state), expected);
    }
}

#[test]
fn stack_overflow_on_1025th_push() {
    let mut stack = Stack::new();
    for i in 0..STACK_LIMIT {
        stack.push(U256::from(i)).unwrap();
    }
    assert_eq!(stack.push(U256::one()), Err(EvmError::StackOverflow));
    assert_eq!(stack.len(), STACK_LIMIT);
}
