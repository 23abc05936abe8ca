use core::mem::{align_of, size_of};

use alloc::{format, rc::Rc};

use static_assertions::{assert_impl_all, assert_not_impl_any, const_assert, const_assert_eq};

use crate::{EmptyCall, LocalPolyCall, Method, PolyCall};

assert_impl_all!(PolyCall<(), u32>: Send, Sync);
assert_not_impl_any!(LocalPolyCall<(), u32>: Send, Sync);

// 128-byte slot + by-value vtable + mode, rounded up to the slot alignment.
const_assert_eq!(size_of::<PolyCall<(), u32>>(), 176);
const_assert_eq!(align_of::<PolyCall<(), u32>>(), 16);

const_assert!(PolyCall::<(), ()>::fits::<[u8; 128]>());
const_assert!(!PolyCall::<(), ()>::fits::<[u8; 129]>());

/// Payload big enough to force heap storage regardless of captures.
type BigArray = [u64; 32];

const_assert!(size_of::<BigArray>() > 128);

struct Counter {
    value: u32,
}

impl Counter {
    fn bump(&mut self, n: u32) -> u32 {
        self.value += n;
        self.value
    }

    fn value(&self) -> u32 {
        self.value
    }

    fn into_bumped(mut self, n: u32) -> u32 {
        self.value += n;
        self.value
    }
}

#[test]
fn test_inline_matches_direct_invocation() {
    let double = |x: i32| x * 2;

    let mut poly: PolyCall<(i32,), i32> = PolyCall::new(double);
    assert!(poly.is_inline());
    assert!(poly.is_set());

    for x in [-3, 0, 7, i32::MAX / 2] {
        assert_eq!(poly.call((x,)), Ok(double(x)));
    }
}

#[test]
fn test_zero_and_higher_arity() {
    let mut zero: PolyCall<(), u8> = PolyCall::new(|| 42u8);
    assert_eq!(zero.call(()), Ok(42));

    let mut three: PolyCall<(u8, u8, u8), u16> =
        PolyCall::new(|a: u8, b: u8, c: u8| a as u16 + b as u16 + c as u16);
    assert_eq!(three.call((1, 2, 3)), Ok(6));
}

#[test]
fn test_large_payload_is_heap() {
    let big: BigArray = [7u64; 32];

    let mut poly: PolyCall<(usize,), u64> = PolyCall::new(move |i: usize| big[i]);
    assert!(!poly.is_inline());
    assert!(poly.is_set());
    assert_eq!(poly.call((3,)), Ok(7));
}

#[test]
fn test_overaligned_payload_is_heap() {
    #[derive(Clone, Copy)]
    #[repr(align(64))]
    struct Aligned([u8; 8]);

    let aligned = Aligned([5; 8]);

    // Small in bytes, but over-aligned for the inline slot. The closure
    // body names the whole struct so the capture keeps its alignment;
    // capturing just the field would demote it to align 1.
    let mut poly: PolyCall<(), u8> = PolyCall::new(move || {
        let a = aligned;
        a.0[0]
    });
    assert!(!poly.is_inline());
    assert_eq!(poly.call(()), Ok(5));
}

#[test]
fn test_empty_call_fails() {
    let mut defaulted: PolyCall<(u32,), u32> = PolyCall::default();
    assert!(!defaulted.is_set());
    assert!(!defaulted.is_inline());
    assert_eq!(defaulted.call((1,)), Err(EmptyCall));

    let mut explicit: LocalPolyCall<(), ()> = LocalPolyCall::empty();
    assert_eq!(explicit.call(()), Err(EmptyCall));
}

#[test]
fn test_take_leaves_source_empty() {
    let mut inline: PolyCall<(), u8> = PolyCall::new(|| 9u8);
    let mut taken = inline.take();

    assert!(!inline.is_set());
    assert_eq!(inline.call(()), Err(EmptyCall));
    assert_eq!(taken.call(()), Ok(9));

    let big: BigArray = [11u64; 32];
    let mut heap: PolyCall<(), u64> = PolyCall::new(move || big[0]);
    let mut taken = heap.take();

    assert!(!heap.is_set());
    assert_eq!(heap.call(()), Err(EmptyCall));
    assert!(!taken.is_inline());
    assert_eq!(taken.call(()), Ok(11));

    // Taking from an empty container yields another empty container.
    let mut empty: PolyCall<(), u64> = heap.take();
    assert_eq!(empty.call(()), Err(EmptyCall));
}

#[test]
fn test_heap_take_transfers_without_cloning() {
    let token = Rc::new(());
    let big: BigArray = [0u64; 32];

    let handle = Rc::clone(&token);
    let payload = move |i: usize| {
        let _ = &handle;
        big[i]
    };

    // `Rc` capture keeps this off the `Send` container.
    let mut a: LocalPolyCall<(usize,), u64> = LocalPolyCall::new(payload);
    assert!(!a.is_inline());
    assert_eq!(Rc::strong_count(&token), 2);

    // The owning box moves; the payload is not cloned.
    let mut b = a.take();
    assert_eq!(Rc::strong_count(&token), 2);
    assert_eq!(b.call((0,)), Ok(0));

    // Copying produces an independent payload.
    let c = b.clone();
    assert_eq!(Rc::strong_count(&token), 3);

    drop(b);
    drop(c);
    assert_eq!(Rc::strong_count(&token), 1);
}

#[test]
fn test_clone_is_independent_of_source() {
    let mut n = 0u32;
    let mut a: PolyCall<(), u32> = PolyCall::new(move || {
        let v = n;
        n += 1;
        v
    });

    assert_eq!(a.call(()), Ok(0));

    // Clone snapshots the captured state; the two advance separately.
    let mut b = a.clone();
    assert_eq!(a.call(()), Ok(1));
    assert_eq!(a.call(()), Ok(2));
    assert_eq!(b.call(()), Ok(1));
}

#[test]
fn test_counter_sequence() {
    let mut n = 0u32;
    let mut tick: PolyCall<(), u32> = PolyCall::new(move || {
        let v = n;
        n += 1;
        v
    });

    assert_eq!(tick.call(()), Ok(0));
    assert_eq!(tick.call(()), Ok(1));
    assert_eq!(tick.call(()), Ok(2));
    // Counter sits at 3 after three calls.
    assert_eq!(tick.call(()), Ok(3));
}

#[test]
fn test_method_with_mut_receiver() {
    let mut counter = Counter { value: 10 };

    let mut bump: PolyCall<(&mut Counter, u32), u32> = PolyCall::from_method(Counter::bump);
    assert!(bump.is_inline());
    assert_eq!(bump.call((&mut counter, 5)), Ok(15));

    drop(bump);
    assert_eq!(counter.value, 15);
}

#[test]
fn test_method_with_shared_receiver() {
    let counter = Counter { value: 23 };

    let mut read: PolyCall<(&Counter,), u32> = PolyCall::from_method(Counter::value);
    assert_eq!(read.call((&counter,)), Ok(23));
}

#[test]
fn test_borrowing_args_clone_and_take() {
    let counter = Counter { value: 23 };

    let mut read: PolyCall<(&Counter,), u32> = PolyCall::from_method(Counter::value);
    let mut copy = read.clone();
    let mut taken = read.take();

    assert_eq!(read.call((&counter,)), Err(EmptyCall));
    assert_eq!(copy.call((&counter,)), Ok(23));
    assert_eq!(taken.call((&counter,)), Ok(23));
}

#[test]
fn test_method_with_value_receiver() {
    let mut sum: PolyCall<(Counter, u32), u32> = PolyCall::from_method(Counter::into_bumped);

    assert_eq!(sum.call((Counter { value: 1 }, 2)), Ok(3));
    assert_eq!(sum.call((Counter { value: 40 }, 2)), Ok(42));
}

#[test]
fn test_method_adapter_as_plain_payload() {
    let counter = Counter { value: 8 };

    let mut read: LocalPolyCall<(&Counter,), u32> = LocalPolyCall::new(Method::new(Counter::value));
    assert_eq!(read.call((&counter,)), Ok(8));
}

#[test]
fn test_swap_twice_restores_all_mode_pairs() {
    fn inline(v: u8) -> PolyCall<(), u8> {
        PolyCall::new(move || v)
    }

    fn heap(v: u8) -> PolyCall<(), u8> {
        let big: BigArray = [v as u64; 32];
        PolyCall::new(move || big[0] as u8)
    }

    fn output(poly: &mut PolyCall<(), u8>) -> Result<u8, EmptyCall> {
        poly.call(())
    }

    let combos: [(fn() -> PolyCall<(), u8>, fn() -> PolyCall<(), u8>); 6] = [
        (|| PolyCall::empty(), || PolyCall::empty()),
        (|| PolyCall::empty(), || inline(1)),
        (|| PolyCall::empty(), || heap(2)),
        (|| inline(3), || inline(4)),
        (|| inline(5), || heap(6)),
        (|| heap(7), || heap(8)),
    ];

    for (make_a, make_b) in combos {
        let mut a = make_a();
        let mut b = make_b();

        let before_a = output(&mut a);
        let before_b = output(&mut b);

        a.swap(&mut b);
        assert_eq!(output(&mut a), before_b);
        assert_eq!(output(&mut b), before_a);

        a.swap(&mut b);
        assert_eq!(output(&mut a), before_a);
        assert_eq!(output(&mut b), before_b);
    }
}

#[test]
fn test_self_assignment() {
    let mut poly: PolyCall<(u32,), u32> = PolyCall::new(|x: u32| x + 1);

    poly = poly.clone();
    assert_eq!(poly.call((1,)), Ok(2));

    let source: PolyCall<(u32,), u32> = PolyCall::new(|x: u32| x * 10);
    poly.clone_from(&source);
    assert_eq!(poly.call((2,)), Ok(20));
}

#[test]
fn test_try_new_matches_new() {
    let mut small: PolyCall<(), u8> = PolyCall::try_new(|| 1u8).unwrap();
    assert!(small.is_inline());
    assert_eq!(small.call(()), Ok(1));

    let big: BigArray = [2u64; 32];
    let mut large: PolyCall<(), u8> = PolyCall::try_new(move || big[0] as u8).unwrap();
    assert!(!large.is_inline());
    assert_eq!(large.call(()), Ok(2));
}

#[test]
fn test_drop_accounting() {
    let token = Rc::new(());

    {
        let handle = Rc::clone(&token);
        let mut a: LocalPolyCall<(), ()> = LocalPolyCall::new(move || {
            let _ = &handle;
        });

        let b = a.clone();
        assert_eq!(Rc::strong_count(&token), 3);

        let taken = a.take();
        assert_eq!(Rc::strong_count(&token), 3);

        // Moving b in drops the payload a held before take emptied it.
        a = b;
        assert!(a.is_set());
        assert_eq!(Rc::strong_count(&token), 3);

        // Overwriting drops the replaced payload.
        a = LocalPolyCall::empty();
        assert!(!a.is_set());
        assert_eq!(Rc::strong_count(&token), 2);

        let _ = (a, taken);
    }

    assert_eq!(Rc::strong_count(&token), 1);
}

#[test]
fn test_not_send_payload() {
    let rc = Rc::new(5u32);

    let mut local: LocalPolyCall<(), u32> = LocalPolyCall::new(move || *rc);
    assert_eq!(local.call(()), Ok(5));
}

#[test]
fn test_into_local() {
    let poly: PolyCall<(), u8> = PolyCall::new(|| 3u8);

    let mut local: LocalPolyCall<(), u8> = poly.into();
    assert_eq!(local.call(()), Ok(3));
}

#[test]
fn test_debug_reports_state() {
    let set: PolyCall<(), u8> = PolyCall::new(|| 1u8);
    assert_eq!(
        format!("{set:?}"),
        "PolyCall { set: true, mode: Inline }"
    );

    let empty: PolyCall<(), u8> = PolyCall::empty();
    assert_eq!(
        format!("{empty:?}"),
        "PolyCall { set: false, mode: Heap }"
    );
}
