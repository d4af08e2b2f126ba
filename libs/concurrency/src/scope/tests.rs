use crate::{ctx, scope, testonly, time};
use std::sync::atomic::{AtomicU64, Ordering};

type R = Result<(), usize>;

#[tokio::test]
async fn wait_blocking_returns_value() {
    assert_eq!(5, scope::wait_blocking(|| 5).await);
}

#[tokio::test]
#[should_panic]
async fn wait_blocking_resumes_panic() {
    scope::wait_blocking(|| panic!("inner panic")).await;
}

#[test]
fn first_error_wins() {
    testonly::abort_on_panic();
    testonly::with_runtimes(|| async {
        let ctx = &ctx::test_root(&ctx::RealClock);
        let res = scope::run!(ctx, |ctx, s| async {
            s.spawn(async { R::Err(7) });
            ctx.canceled().await;
            s.spawn(async { R::Err(3) });
            Ok(())
        })
        .await;
        assert_eq!(Err(7), res);
    });
}

#[test]
fn nested_scope_error_propagates() {
    testonly::abort_on_panic();
    testonly::with_runtimes(|| async {
        let ctx = &ctx::test_root(&ctx::RealClock);
        let res = scope::run!(ctx, |ctx, s| async {
            s.spawn(async {
                scope::run!(ctx, |ctx, s| async {
                    s.spawn(async { scope::run!(ctx, |_, _| async { R::Err(8) }).await });
                    Ok(())
                })
                .await
            });
            Ok(())
        })
        .await;
        assert_eq!(Err(8), res);
    });
}

#[test]
fn background_tasks_canceled_after_main_tasks() {
    testonly::abort_on_panic();
    testonly::with_runtimes(|| async {
        let ctx = &ctx::test_root(&ctx::RealClock);
        let done = &AtomicU64::new(0);
        let res = scope::run!(ctx, |ctx, s| async {
            for _ in 0..3 {
                s.spawn_bg(async {
                    ctx.canceled().await;
                    done.fetch_add(1, Ordering::Relaxed);
                    R::Ok(())
                });
            }
            s.spawn(async {
                ctx.sleep(time::Duration::milliseconds(10)).await.unwrap();
                R::Ok(())
            });
            Ok(11)
        })
        .await;
        assert_eq!(Ok(11), res);
        assert_eq!(3, done.load(Ordering::Relaxed));
    });
}

#[test]
fn join_results() {
    type R = Result<usize, usize>;
    testonly::abort_on_panic();
    testonly::with_runtimes(|| async {
        let ctx = &ctx::test_root(&ctx::RealClock);
        let res = scope::run!(ctx, |ctx, s| async {
            assert_eq!(Ok(5), s.spawn(async { Ok(5) }).join(ctx).await);
            assert_eq!(Ok(6), s.spawn_bg(async { Ok(6) }).join(ctx).await);
            assert_eq!(
                Err(ctx::Canceled),
                s.spawn(async { R::Err(9) }).join(ctx).await
            );
            assert!(!ctx.is_active());
            Ok(1)
        })
        .await;
        assert_eq!(Err(9), res);
    });
}

#[test]
fn tasks_borrow_from_caller() {
    testonly::abort_on_panic();
    testonly::with_runtimes(|| async {
        let a = &AtomicU64::new(0);
        let ctx = &ctx::test_root(&ctx::RealClock);
        scope::run!(ctx, |ctx, s| async {
            s.spawn(async {
                scope::run!(ctx, |_, s| async {
                    s.spawn(async {
                        a.fetch_add(1, Ordering::Relaxed);
                        R::Ok(())
                    });
                    R::Ok(())
                })
                .await
            });
            s.spawn(async {
                s.spawn(async {
                    a.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                });
                a.fetch_add(1, Ordering::Relaxed);
                Ok(())
            });
            a.fetch_add(1, Ordering::Relaxed);
            R::Ok(())
        })
        .await
        .unwrap();
        assert_eq!(4, a.load(Ordering::Relaxed));
    });
}

#[tokio::test]
async fn panic_propagates_to_caller() {
    let res = tokio::task::spawn(async {
        let ctx = &ctx::test_root(&ctx::RealClock);
        scope::run!(ctx, |_, s| async {
            s.spawn::<()>(async { panic!("boom") });
            anyhow::Ok(())
        })
        .await
    })
    .await;
    assert!(res.is_err());
}
