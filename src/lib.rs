//! This crate provides type-erased callable containers that can store small
//! payloads inline without heap allocation.
//!
//! [`PolyCall<Args, R>`] holds any clonable payload invocable with the
//! argument tuple `Args` and returning `R`: closures, functions, or method
//! selectors whose receiver is supplied at call time. Payloads of up to 128
//! bytes live in the container itself; larger or over-aligned payloads are
//! moved behind an owned heap allocation. [`LocalPolyCall`] is the relaxed
//! variant for payloads that are not `Send` or `Sync`.
//!
//! Containers have value semantics: cloning clones the payload, [`take`]
//! moves it out and leaves the source empty, and invoking an empty
//! container returns [`EmptyCall`] instead of panicking.
//!
//! [`take`]: PolyCall::take
//!
//! ## Usage
//!
//! ```
//! use polycall::{EmptyCall, PolyCall};
//!
//! // A closure this small lives in the container's inline slot.
//! let mut add: PolyCall<(i32, i32), i32> = PolyCall::new(|a: i32, b: i32| a + b);
//!
//! assert!(add.is_inline());
//! assert_eq!(add.call((2, 3)), Ok(5));
//!
//! // Moving the payload out leaves the source empty.
//! let mut taken = add.take();
//! assert_eq!(add.call((2, 3)), Err(EmptyCall));
//! assert_eq!(taken.call((2, 3)), Ok(5));
//!
//! // A method selector binds its receiver at call time, not at
//! // construction. The first declared argument is the receiver.
//! struct Counter {
//!     value: u32,
//! }
//!
//! impl Counter {
//!     fn bump(&mut self, n: u32) -> u32 {
//!         self.value += n;
//!         self.value
//!     }
//! }
//!
//! let mut counter = Counter { value: 10 };
//! let mut bump: PolyCall<(&mut Counter, u32), u32> = PolyCall::from_method(Counter::bump);
//!
//! assert_eq!(bump.call((&mut counter, 5)), Ok(15));
//! drop(bump);
//! assert_eq!(counter.value, 15);
//! ```
//!
//! Argument tuples that borrow (like the receiver above) tie the container
//! to those borrows for as long as it lives; scope or drop the container to
//! release them.

#![no_std]

extern crate alloc;

mod callable;
mod error;
mod poly;
mod storage;

pub use self::{
    callable::{Callable, Method},
    error::{AllocError, EmptyCall},
    poly::{LocalPolyCall, PolyCall},
};

#[cfg(test)]
mod tests;
