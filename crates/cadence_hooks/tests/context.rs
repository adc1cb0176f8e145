//! Tests for execution contexts, hook state persistence and eviction.

use std::cell::Cell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use cadence_hooks::prelude::*;
use cadence_hooks::{context_depth, touched_count};

// ─────────────────────────────────────────────────────────────────────────
// Test State
// ─────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Counter {
    value: i32,
}

/// Increments the counter at `key`/`discriminator` and returns the new value.
fn bump(key: &'static str, discriminator: Option<Discriminator>) -> Result<i32, HookError> {
    let cell = use_hook_state::<Counter, _>(key, discriminator, evict::when_untouched)?;
    let mut counter = cell.borrow_mut();
    counter.value += 1;
    Ok(counter.value)
}

// ─────────────────────────────────────────────────────────────────────────
// Persistence
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn state_persists_across_invocations() {
    let store = HookStore::new();

    let first = start(&store, || {
        let cell = use_hook_state::<Counter, _>("counter", None, evict::never).unwrap();
        cell.borrow_mut().value = 41;
        cell
    });

    let second = start(&store, || {
        use_hook_state::<Counter, _>("counter", None, evict::never).unwrap()
    });

    assert!(first.ptr_eq(&second));
    assert_eq!(second.borrow().value, 41);
}

#[test]
fn repeated_calls_within_one_invocation_share_state() {
    let store = HookStore::new();

    let (a, b) = start(&store, || {
        (bump("counter", None).unwrap(), bump("counter", None).unwrap())
    });

    assert_eq!((a, b), (1, 2));
}

// ─────────────────────────────────────────────────────────────────────────
// Eviction
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn predicate_eviction_yields_fresh_state() {
    let store = HookStore::new();

    start(&store, || {
        let cell = use_hook_state::<Counter, _>("counter", None, evict::always).unwrap();
        cell.borrow_mut().value = 5;
    });
    assert!(store.is_empty());

    let value = start(&store, || {
        let cell = use_hook_state::<Counter, _>("counter", None, evict::always).unwrap();
        let value = cell.borrow().value;
        value
    });
    assert_eq!(value, 0);
}

#[test]
fn untouched_state_is_reclaimed() {
    let store = HookStore::new();

    start(&store, || bump("counter", None).unwrap());
    assert_eq!(store.len(), 1);

    start(&store, || {});
    assert!(store.is_empty());

    let value = start(&store, || bump("counter", None).unwrap());
    assert_eq!(value, 1);
}

#[test]
fn never_predicate_survives_idle_invocations() {
    let store = HookStore::new();

    start(&store, || {
        use_hook_state::<Counter, _>("sticky", None, evict::never)
            .unwrap()
            .borrow_mut()
            .value = 3;
    });
    for _ in 0..5 {
        start(&store, || {});
    }

    let value = start(&store, || {
        let cell = use_hook_state::<Counter, _>("sticky", None, evict::never).unwrap();
        let value = cell.borrow().value;
        value
    });
    assert_eq!(value, 3);
}

#[test]
fn predicate_receives_touch_status() {
    let store = HookStore::new();
    let observed = Rc::new(Cell::new(None));

    let record = {
        let observed = Rc::clone(&observed);
        move |_: &mut Counter, ctx: &EvictionContext<'_>| {
            observed.set(Some(ctx.touched()));
            false
        }
    };

    start(&store, || {
        use_hook_state::<Counter, _>("watched", None, record).unwrap();
    });
    assert_eq!(observed.get(), Some(true));

    start(&store, || {});
    assert_eq!(observed.get(), Some(false));
}

#[test]
fn eviction_runs_when_callback_panics() {
    let store = HookStore::new();

    let result = catch_unwind(AssertUnwindSafe(|| {
        start(&store, || {
            use_hook_state::<Counter, _>("doomed", None, evict::always).unwrap();
            panic!("callback failure");
        })
    }));

    assert!(result.is_err());
    assert!(store.is_empty());
    assert_eq!(context_depth(), 0);
}

// ─────────────────────────────────────────────────────────────────────────
// Discriminators
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn discriminators_isolate_state() {
    let store = HookStore::new();

    start(&store, || {
        assert_eq!(bump("counter", Some(1_u64.into())).unwrap(), 1);
        assert_eq!(bump("counter", Some(1_u64.into())).unwrap(), 2);
        assert_eq!(bump("counter", Some(2_u64.into())).unwrap(), 1);
        assert_eq!(bump("counter", None).unwrap(), 1);
    });

    assert_eq!(store.len(), 3);
    assert_eq!(store.slot_count(), 1);
}

#[test]
fn only_untouched_discriminators_are_reclaimed() {
    let store = HookStore::new();

    start(&store, || {
        bump("counter", Some("a".into())).unwrap();
        bump("counter", Some("b".into())).unwrap();
    });
    start(&store, || {
        bump("counter", Some("a".into())).unwrap();
    });

    let key = HookKey::from("counter");
    assert!(store.contains(&key, Some(&Discriminator::from("a"))));
    assert!(!store.contains(&key, Some(&Discriminator::from("b"))));
}

#[test]
fn call_site_keys_are_independent() {
    let store = HookStore::new();

    let (a, b) = start(&store, || {
        let a = use_hook_state::<Counter, _>(call_site!(), None, evict::never).unwrap();
        let b = use_hook_state::<Counter, _>(call_site!(), None, evict::never).unwrap();
        (a, b)
    });

    assert!(!a.ptr_eq(&b));
    assert_eq!(store.slot_count(), 2);
}

// ─────────────────────────────────────────────────────────────────────────
// Fail-fast
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn hooks_outside_a_context_fail() {
    let result = use_hook_state::<Counter, _>("orphan", None, evict::never);
    assert!(matches!(result, Err(HookError::ContextMissing)));

    // An empty key does not mask the missing context.
    let result = use_hook_state::<Counter, _>("", None, evict::never);
    assert!(matches!(result, Err(HookError::ContextMissing)));
}

#[test]
fn hooks_fail_again_after_context_pops() {
    let store = HookStore::new();
    start(&store, || bump("counter", None).unwrap());

    assert!(matches!(
        bump("counter", None),
        Err(HookError::ContextMissing)
    ));
}

#[test]
fn mismatched_state_type_is_an_error() {
    let store = HookStore::new();

    let result = start(&store, || {
        use_hook_state::<Counter, _>("typed", None, evict::never)?;
        use_hook_state::<String, _>("typed", None, evict::never).map(|_| ())
    });

    assert!(matches!(result, Err(HookError::StateTypeMismatch { .. })));
}

// ─────────────────────────────────────────────────────────────────────────
// Nesting
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn nested_start_resolves_against_inner_store() {
    let outer = HookStore::new();
    let inner = HookStore::new();

    start(&outer, || {
        bump("counter", None).unwrap();
        start(&inner, || {
            assert_eq!(bump("counter", None).unwrap(), 1);
            assert_eq!(bump("other", None).unwrap(), 1);
        });
        // Back in the outer context: its own cell, untouched by the inner run.
        assert_eq!(bump("counter", None).unwrap(), 2);
        assert_eq!(touched_count().unwrap(), 1);
    });

    assert_eq!(outer.len(), 1);
    assert_eq!(inner.len(), 2);
}

#[test]
fn nested_start_on_same_store_keeps_outer_touches() {
    let store = HookStore::new();

    start(&store, || {
        bump("outer", None).unwrap();
        // The inner invocation does not touch "outer", and its keys do not
        // show up in the outer touched-set either.
        start(&store, || {
            bump("inner", None).unwrap();
        });
        assert_eq!(touched_count().unwrap(), 1);
        assert_eq!(bump("outer", None).unwrap(), 2);
    });
}

#[test]
fn nested_start_on_same_store_keeps_outer_state_not_yet_reached() {
    let store = HookStore::new();
    let run = || {
        start(&store, || {
            start(&store, || bump("inner", None).unwrap());
            bump("outer", None).unwrap()
        })
    };

    assert_eq!(run(), 1);
    // "outer" was not touched yet when the inner context finished.
    assert_eq!(run(), 2);
    assert_eq!(run(), 3);
    assert_eq!(store.len(), 2);
}

#[test]
fn inner_touches_count_for_the_outer_eviction_pass() {
    let store = HookStore::new();
    let run = |nest: bool| {
        start(&store, || {
            if nest {
                start(&store, || bump("inner", None).unwrap());
            }
        });
    };

    run(true);
    run(true);
    assert_eq!(store.len(), 1);

    run(false);
    assert!(store.is_empty());
}

#[test]
fn inner_store_still_evicts_when_nested_in_another_store() {
    let outer = HookStore::new();
    let inner = HookStore::new();

    start(&outer, || {
        start(&inner, || bump("a", None).unwrap());
        start(&inner, || {});
        assert!(inner.is_empty());
    });
}

#[test]
fn deep_nesting_unwinds_in_order() {
    fn descend(stores: &[HookStore]) {
        if let Some((first, rest)) = stores.split_first() {
            start(first, || {
                assert_eq!(bump("level", None).unwrap(), 1);
                descend(rest);
            });
        }
    }

    let stores: Vec<HookStore> = (0..16).map(|_| HookStore::new()).collect();
    descend(&stores);

    assert_eq!(context_depth(), 0);
    assert!(stores.iter().all(|store| store.len() == 1));
}

// ─────────────────────────────────────────────────────────────────────────
// Property: discriminator isolation
// ─────────────────────────────────────────────────────────────────────────

mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn writes_never_leak_between_discriminators(
            writes in proptest::collection::vec((0_u64..8, 1_i32..100), 1..64)
        ) {
            let store = HookStore::new();
            let mut expected = std::collections::HashMap::new();

            start(&store, || {
                for (discriminator, amount) in &writes {
                    let cell = use_hook_state::<Counter, _>(
                        "isolated",
                        Some((*discriminator).into()),
                        evict::never,
                    )
                    .unwrap();
                    cell.borrow_mut().value += amount;
                    *expected.entry(*discriminator).or_insert(0) += amount;
                }
            });

            start(&store, || {
                for (discriminator, total) in &expected {
                    let cell = use_hook_state::<Counter, _>(
                        "isolated",
                        Some((*discriminator).into()),
                        evict::never,
                    )
                    .unwrap();
                    prop_assert_eq!(cell.borrow().value, *total);
                }
                Ok(())
            })?;
        }
    }
}
