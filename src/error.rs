//! Failure surface of the containers.
//!
//! Only two conditions originate here: invoking an empty container and
//! running out of memory while placing a payload on the heap. Anything the
//! payload itself does wrong (a panicking call or a panicking `Clone`)
//! propagates through unmodified.

use core::alloc::Layout;

use thiserror::Error;

/// The container held no payload when it was invoked.
///
/// Returned by [`call`](crate::PolyCall::call) on default-constructed,
/// taken-from, or explicitly emptied containers. Recoverable: the container
/// stays usable and can be assigned a new payload.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invoked an empty callable container")]
pub struct EmptyCall;

/// The global allocator refused the payload's layout.
///
/// Returned by [`try_new`](crate::PolyCall::try_new) when a heap-mode
/// payload cannot be placed. The infallible constructors convert this
/// condition into [`alloc::alloc::handle_alloc_error`] instead.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("failed to allocate {} bytes (align {})", .layout.size(), .layout.align())]
pub struct AllocError {
    layout: Layout,
}

impl AllocError {
    pub(crate) fn new(layout: Layout) -> Self {
        AllocError { layout }
    }

    /// The layout that could not be satisfied.
    pub fn layout(&self) -> Layout {
        self.layout
    }
}
