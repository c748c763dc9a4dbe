//! Property-based tests for the lifecycle state machine
//!
//! These tests generate random sequences of user operations and runtime drift
//! and verify invariants hold across all scenarios:
//! - The in-memory view and the store agree after every operation
//! - No user ever holds more than one live container
//! - Blacklisted users never end up with a container
mod common;

use common::*;
use container_warden::state::StateStore;
use proptest::prelude::*;
use std::collections::HashMap;

/// Operation types for property-based testing
#[derive(Debug, Clone)]
enum Operation {
    Create(String),
    Delete(String),
    Status(String),
    Blacklist(String),
    Unblacklist(String),
    Depart(String),
    /// Runtime loses the user's container behind the manager's back
    Vanish(String),
}

fn user_strategy() -> impl Strategy<Value = String> {
    (1u8..=4).prop_map(|n| format!("{}", 100 + n))
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        3 => user_strategy().prop_map(Operation::Create),
        2 => user_strategy().prop_map(Operation::Delete),
        1 => user_strategy().prop_map(Operation::Status),
        1 => user_strategy().prop_map(Operation::Blacklist),
        1 => user_strategy().prop_map(Operation::Unblacklist),
        1 => user_strategy().prop_map(Operation::Depart),
        1 => user_strategy().prop_map(Operation::Vanish),
    ]
}

/// Apply an operation, ignoring expected rejections
async fn apply_operation(h: &Harness, op: &Operation) {
    match op {
        Operation::Create(user) => {
            let _ = h.manager.create(user).await;
        }
        Operation::Delete(user) => {
            let _ = h.manager.delete(user).await;
        }
        Operation::Status(user) => {
            let _ = h.manager.status(user).await;
        }
        Operation::Blacklist(user) => {
            h.manager
                .blacklist(ADMIN, user, "property test")
                .await
                .expect("blacklist by admin must succeed");
        }
        Operation::Unblacklist(user) => {
            h.manager
                .unblacklist(ADMIN, user)
                .await
                .expect("unblacklist by admin must succeed");
        }
        Operation::Depart(user) => h.manager.on_user_departed(user).await,
        Operation::Vanish(user) => {
            if let Some(id) = h.manager.view().get(user) {
                h.runtime.vanish(&id);
            }
        }
    }
}

async fn check_invariants(h: &Harness) {
    assert_view_matches_store(h).await;

    let view = h.manager.view().snapshot();
    let mut owners: HashMap<&str, usize> = HashMap::new();
    for user in view.keys() {
        *owners.entry(user.as_str()).or_default() += 1;
        assert!(
            !h.store.is_blacklisted(user).await.unwrap(),
            "blacklisted user {} still holds a container",
            user
        );
    }
    assert!(owners.values().all(|&count| count == 1));

    // Containers only exist for recorded users (minus those lost to drift)
    assert_eq!(h.runtime.container_count(), view.len() - vanished_count(h, &view));
}

fn vanished_count(h: &Harness, view: &HashMap<String, String>) -> usize {
    view.values().filter(|id| !h.runtime.contains(id)).count()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_view_matches_store_after_every_operation(
        ops in prop::collection::vec(operation_strategy(), 5..40)
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let h = harness().await;
            for op in &ops {
                apply_operation(&h, op).await;
                check_invariants(&h).await;
            }
        });
    }

    #[test]
    fn test_containers_are_never_leaked(
        ops in prop::collection::vec(operation_strategy(), 5..40)
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let h = harness().await;
            for op in &ops {
                apply_operation(&h, op).await;
            }

            // Every container still in the runtime belongs to a recorded user
            let view = h.manager.view().snapshot();
            for user in ["101", "102", "103", "104"] {
                let _ = h.manager.delete(user).await;
            }
            prop_assert_eq!(h.runtime.container_count(), 0, "view before cleanup: {:?}", view);
            Ok(())
        })?;
    }
}
