// tests/property/arbitration_test.rs

//! Property-based tests for session arbitration
//! Tests that ownership of the profiler only changes through the dormant state

use crate::test_helpers::TestContext;
use profctl::core::Request;
use profctl::session::{SessionKind, SessionType};
use proptest::prelude::*;

fn session_type() -> impl Strategy<Value = SessionType> {
    prop::sample::select(vec![
        SessionType::Dormant,
        SessionType::Local,
        SessionType::Remote,
    ])
}

fn session_kind() -> impl Strategy<Value = SessionKind> {
    prop::sample::select(vec![SessionKind::Local, SessionKind::Remote])
}

#[derive(Debug, Clone, Copy)]
enum LocalOp {
    Begin,
    End,
    Ping,
    IsActive,
    Poll,
}

fn local_op() -> impl Strategy<Value = LocalOp> {
    prop::sample::select(vec![
        LocalOp::Begin,
        LocalOp::End,
        LocalOp::Ping,
        LocalOp::IsActive,
        LocalOp::Poll,
    ])
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        max_shrink_iters: 500,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_ownership_never_jumps_between_sessions(
        start in session_type(),
        steps in prop::collection::vec((session_kind(), any::<bool>()), 1..64)
    ) {
        let mut current = start;
        for (kind, active) in steps {
            let next = current.after_poll(kind, active);
            prop_assert!(
                !matches!(
                    (current, next),
                    (SessionType::Local, SessionType::Remote) | (SessionType::Remote, SessionType::Local)
                ),
                "{} -> {} after {} poll",
                current,
                next,
                kind
            );
            // Only the owner can release, and only a granted session can take over.
            if next != current {
                prop_assert!(
                    current.grants(kind),
                    "{} session changed ownership from {}",
                    kind,
                    current
                );
            }
            current = next;
        }
    }

    #[test]
    fn test_local_owns_exactly_while_its_profile_runs(
        ops in prop::collection::vec(local_op(), 1..40)
    ) {
        let mut ctx = TestContext::local_only();
        for op in ops {
            match op {
                LocalOp::Begin => {
                    let mut request = Request::new("beginProfile")
                        .with_arg("samplesFilePattern", "/tmp/profctl-prop-*.samples")
                        .with_arg("pollInterval", 3)
                        .with_arg("samplesDataCapacity", 4096);
                    let was_active = ctx.manager.is_profile_active();
                    prop_assert_eq!(ctx.manager.execute(&mut request), !was_active);
                }
                LocalOp::End => {
                    prop_assert!(ctx.manager.execute(&mut Request::new("endProfile")));
                }
                LocalOp::Ping => {
                    prop_assert!(ctx.manager.execute(&mut Request::new("ping")));
                }
                LocalOp::IsActive => {
                    let mut request = Request::new("isProfileActive");
                    prop_assert!(ctx.manager.execute(&mut request));
                    let expected = ctx.manager.is_profile_active().to_string();
                    prop_assert_eq!(request.response(), Some(expected.as_str()));
                }
                LocalOp::Poll => ctx.manager.poll(),
            }

            let owned = ctx.manager.session_type() == SessionType::Local;
            prop_assert_eq!(owned, ctx.manager.is_profile_active());
            prop_assert_ne!(ctx.manager.session_type(), SessionType::Remote);
        }
        ctx.manager.shutdown();
    }
}
