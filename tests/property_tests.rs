//! Property-based tests (§8 P1–P3, P6) — random sequences of
//! `(email?, phone?)` reconciliations against the in-memory fake store,
//! checking the identity-graph invariants hold after every sequence
//! rather than just on hand-picked scenarios.

use proptest::prelude::*;

use reconcile_core::model::ReconcileInput;
use reconcile_core::store::testing::FakeStore;
use reconcile_core::Reconciler;

const EMAILS: &[&str] = &["a@t", "b@t", "c@t", "d@t"];
const PHONES: &[&str] = &["100", "200", "300", "400"];

#[derive(Debug, Clone)]
enum Op {
    EmailOnly(usize),
    PhoneOnly(usize),
    Both(usize, usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..EMAILS.len()).prop_map(Op::EmailOnly),
        (0..PHONES.len()).prop_map(Op::PhoneOnly),
        (0..EMAILS.len(), 0..PHONES.len()).prop_map(|(e, p)| Op::Both(e, p)),
    ]
}

fn run_ops(ops: &[Op]) -> Vec<reconcile_core::Contact> {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let store = FakeStore::new();
        let reconciler = Reconciler::new(store.clone(), 1);

        for op in ops {
            let (email, phone) = match op {
                Op::EmailOnly(i) => (Some(EMAILS[*i]), None),
                Op::PhoneOnly(i) => (None, Some(PHONES[*i])),
                Op::Both(e, p) => (Some(EMAILS[*e]), Some(PHONES[*p])),
            };
            reconciler
                .reconcile(ReconcileInput::new(email, phone))
                .await
                .expect("fake store reconciliation should never fail");
        }

        store.snapshot().await
    })
}

proptest! {
    /// P1 Depth-one: no secondary is ever pointed at by another live
    /// row's `linked_id` — every `linked_id` resolves straight to a
    /// primary.
    #[test]
    fn prop_depth_one(ops in prop::collection::vec(op_strategy(), 1..25)) {
        let rows = run_ops(&ops);
        for row in rows.iter().filter(|r| r.deleted_at.is_none()) {
            if let Some(linked_id) = row.linked_id {
                let parent = rows.iter().find(|r| r.id == linked_id);
                prop_assert!(parent.is_some(), "dangling linked_id {linked_id}");
                prop_assert!(parent.unwrap().is_primary(), "secondary points at a non-primary");
            }
        }
    }

    /// P2 Single primary: following `linked_id` from any live row reaches
    /// exactly one primary, and every connected component (by shared
    /// email/phone) has exactly one primary.
    #[test]
    fn prop_single_primary_per_group(ops in prop::collection::vec(op_strategy(), 1..25)) {
        let rows = run_ops(&ops);
        let live: Vec<_> = rows.iter().filter(|r| r.deleted_at.is_none()).collect();

        // Union-find over "shares email or phone" to build components,
        // then assert each component has exactly one primary.
        let n = live.len();
        let mut parent: Vec<usize> = (0..n).collect();
        fn find(parent: &mut Vec<usize>, x: usize) -> usize {
            if parent[x] != x {
                parent[x] = find(parent, parent[x]);
            }
            parent[x]
        }
        fn union(parent: &mut Vec<usize>, a: usize, b: usize) {
            let ra = find(parent, a);
            let rb = find(parent, b);
            if ra != rb {
                parent[ra] = rb;
            }
        }
        for i in 0..n {
            for j in (i + 1)..n {
                let shares_email = live[i].email.is_some() && live[i].email == live[j].email;
                let shares_phone = live[i].phone.is_some() && live[i].phone == live[j].phone;
                if shares_email || shares_phone {
                    union(&mut parent, i, j);
                }
            }
        }

        use std::collections::HashMap;
        let mut primaries_per_root: HashMap<usize, usize> = HashMap::new();
        for i in 0..n {
            if live[i].is_primary() {
                let root = find(&mut parent, i);
                *primaries_per_root.entry(root).or_insert(0) += 1;
            }
        }
        for (_, count) in primaries_per_root {
            prop_assert_eq!(count, 1, "a connected component has more than one live primary");
        }
    }

    /// P3 Seniority: within any group, the primary's `created_at` is
    /// `<=` every secondary's.
    #[test]
    fn prop_seniority(ops in prop::collection::vec(op_strategy(), 1..25)) {
        let rows = run_ops(&ops);
        let live: Vec<_> = rows.iter().filter(|r| r.deleted_at.is_none()).collect();
        for primary in live.iter().filter(|r| r.is_primary()) {
            for secondary in live.iter().filter(|r| r.linked_id == Some(primary.id)) {
                prop_assert!(primary.created_at <= secondary.created_at);
            }
        }
    }

    /// P4/P5 Idempotence: replaying the exact same final input again
    /// makes no further change to the store and returns the same
    /// payload both times.
    #[test]
    fn prop_replay_is_a_no_op(ops in prop::collection::vec(op_strategy(), 1..15), replay in op_strategy()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = FakeStore::new();
            let reconciler = Reconciler::new(store.clone(), 1);
            for op in &ops {
                let (email, phone) = match op {
                    Op::EmailOnly(i) => (Some(EMAILS[*i]), None),
                    Op::PhoneOnly(i) => (None, Some(PHONES[*i])),
                    Op::Both(e, p) => (Some(EMAILS[*e]), Some(PHONES[*p])),
                };
                reconciler.reconcile(ReconcileInput::new(email, phone)).await.unwrap();
            }

            let (email, phone) = match &replay {
                Op::EmailOnly(i) => (Some(EMAILS[*i]), None),
                Op::PhoneOnly(i) => (None, Some(PHONES[*i])),
                Op::Both(e, p) => (Some(EMAILS[*e]), Some(PHONES[*p])),
            };
            let first = reconciler.reconcile(ReconcileInput::new(email, phone)).await.unwrap();
            let before = store.snapshot().await;
            let second = reconciler.reconcile(ReconcileInput::new(email, phone)).await.unwrap();
            let after = store.snapshot().await;

            prop_assert_eq!(first, second);
            prop_assert_eq!(before, after);
            Ok(())
        })?;
    }
}
