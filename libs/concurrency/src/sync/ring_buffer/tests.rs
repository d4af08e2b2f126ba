use super::*;
use crate::{scope, testonly, time};
use assert_matches::assert_matches;
use std::{collections::HashSet, sync::Arc};
use test_casing::test_casing;

#[test]
fn fifo_with_wraparound() {
    // Capacity which is not a power of two exercises the modulo mapping.
    let ring = RingBuffer::new(3);
    for lap in 0..10u32 {
        for i in 0..3 {
            assert_eq!(Ok(Offer::Accepted), ring.offer(lap * 3 + i));
        }
        assert_eq!(3, ring.len());
        for i in 0..3 {
            assert_eq!(Ok(Some(lap * 3 + i)), ring.poll());
        }
        assert_eq!(Ok(None), ring.poll());
        assert_eq!(0, ring.len());
    }
}

#[test]
fn full_hands_item_back() {
    let ring = RingBuffer::new(2);
    assert_eq!(Ok(Offer::Accepted), ring.offer("a"));
    assert_eq!(Ok(Offer::Accepted), ring.offer("b"));
    assert_eq!(Ok(Offer::Full("c")), ring.offer("c"));
    assert_eq!(2, ring.len());
    assert_eq!(Ok(Some("a")), ring.poll());
    assert_eq!(Ok(Offer::Accepted), ring.offer("c"));
    assert_eq!(Ok(Some("b")), ring.poll());
    assert_eq!(Ok(Some("c")), ring.poll());
}

#[test]
fn single_slot() {
    let item = Arc::new(());
    let ring = RingBuffer::new(1);
    assert_eq!(1, ring.capacity());
    for _ in 0..5 {
        assert_eq!(Ok(Offer::Accepted), ring.offer(item.clone()));
        assert_matches!(ring.offer(item.clone()), Ok(Offer::Full(_)));
        assert_eq!(1, ring.len());
        // The refused item went back to the caller and got dropped.
        assert_eq!(2, Arc::strong_count(&item));
        assert_matches!(ring.poll(), Ok(Some(_)));
        assert_matches!(ring.poll(), Ok(None));
        assert_eq!(0, ring.len());
    }
    assert_eq!(1, Arc::strong_count(&item));

    let ring = RingBuffer::new(1);
    assert_eq!(Ok(Offer::Accepted), ring.offer("a"));
    assert_eq!(Ok(Offer::Full("b")), ring.offer("b"));
    assert_eq!(Ok(Some("a")), ring.poll());
    assert_eq!(Ok(Offer::Accepted), ring.offer("b"));
    assert_eq!(Ok(Some("b")), ring.poll());
}

#[test]
fn disposed_rejects_everything() {
    let item = Arc::new(());
    let ring = RingBuffer::new(4);
    assert_eq!(Ok(Offer::Accepted), ring.offer(item.clone()));
    ring.dispose();
    // Pending items are released.
    assert_eq!(1, Arc::strong_count(&item));
    assert!(ring.is_disposed());
    assert_matches!(ring.offer(item.clone()), Err(Disposed));
    assert_matches!(ring.poll(), Err(Disposed));
    ring.dispose();
}

#[test]
fn drop_releases_items() {
    let item = Arc::new(());
    let ring = RingBuffer::new(4);
    for _ in 0..3 {
        assert_eq!(Ok(Offer::Accepted), ring.offer(item.clone()));
    }
    assert_eq!(4, Arc::strong_count(&item));
    drop(ring);
    assert_eq!(1, Arc::strong_count(&item));
}

/// Every offered item is polled exactly once, whatever the interleaving.
#[test_casing(3, [1, 7, 64])]
#[test]
fn concurrent_exactly_once(capacity: usize) {
    const PRODUCERS: u64 = 4;
    const CONSUMERS: usize = 3;
    const ITEMS: u64 = 2_000;
    let ring = Arc::new(RingBuffer::new(capacity));
    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let ring = ring.clone();
            std::thread::spawn(move || {
                for i in 0..ITEMS {
                    let mut item = p * ITEMS + i;
                    while let Offer::Full(back) = ring.offer(item).unwrap() {
                        item = back;
                        std::thread::yield_now();
                    }
                }
            })
        })
        .collect();
    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let ring = ring.clone();
            std::thread::spawn(move || {
                let mut got = vec![];
                while !ring.is_disposed() {
                    match ring.poll() {
                        Ok(Some(v)) => got.push(v),
                        Ok(None) => std::thread::yield_now(),
                        Err(Disposed) => break,
                    }
                }
                got
            })
        })
        .collect();
    for p in producers {
        p.join().unwrap();
    }
    while ring.len() > 0 {
        std::thread::yield_now();
    }
    ring.dispose();
    let mut seen = HashSet::new();
    for c in consumers {
        let got = c.join().unwrap();
        // Per producer, a single consumer observes increasing values.
        for p in 0..PRODUCERS {
            let mine: Vec<_> = got.iter().filter(|v| **v / ITEMS == p).collect();
            assert!(mine.windows(2).all(|w| w[0] < w[1]));
        }
        for v in got {
            assert!(seen.insert(v), "item {v} delivered twice");
        }
    }
    assert_eq!((PRODUCERS * ITEMS) as usize, seen.len());
}

#[tokio::test]
async fn recv_waits_for_offer() {
    testonly::abort_on_panic();
    let ctx = &ctx::test_root(&ctx::RealClock);
    let ring = RingBuffer::new(1);
    scope::run!(ctx, |ctx, s| async {
        let got = s.spawn(async { ring.recv(ctx).await });
        ctx.sleep(time::Duration::milliseconds(20)).await?;
        assert_eq!(Ok(Offer::Accepted), ring.offer(5));
        assert_eq!(5, got.join(ctx).await?);
        Ok::<_, RecvError>(())
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn recv_interrupted() {
    testonly::abort_on_panic();
    let ctx = &ctx::test_root(&ctx::RealClock);
    let ring = RingBuffer::<u8>::new(1);
    let res = scope::run!(ctx, |ctx, s| async {
        s.spawn_bg(async {
            ring.dispose();
            Ok(())
        });
        Ok::<_, ()>(ring.recv(ctx).await)
    })
    .await;
    assert_eq!(Ok(Err(RecvError::Disposed(Disposed))), res);

    let ring = RingBuffer::<u8>::new(1);
    let res = scope::run!(ctx, |ctx, s| async {
        s.cancel();
        Ok::<_, ()>(ring.recv(ctx).await)
    })
    .await;
    assert_eq!(Ok(Err(RecvError::Canceled(ctx::Canceled))), res);
}
