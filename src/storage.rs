use core::mem::{align_of, size_of, MaybeUninit};

/// Payload bytes available inside a container before it spills to the heap.
pub(crate) const INLINE_CAPACITY: usize = 128;
pub(crate) const INLINE_ALIGN: usize = 16;

/// Which representation of the storage slot is live.
///
/// Exactly one representation is active at any time. The empty state is a
/// `Heap`-mode container that owns nothing; `Inline` mode always holds a
/// live payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StorageMode {
    /// The slot holds the payload value itself.
    Inline,
    /// The slot holds a `Box` owning the payload, or nothing when empty.
    Heap,
}

/// Raw slot backing both storage modes.
///
/// Holds either a payload of at most `INLINE_CAPACITY` bytes aligned to at
/// most `INLINE_ALIGN`, or the `Box` that owns an oversized payload. The
/// slot itself never knows which; the container's vtable does.
#[repr(C, align(16))] // alignment value is kept in sync with `INLINE_ALIGN`
pub(crate) struct InlineBuffer {
    bytes: MaybeUninit<[u8; INLINE_CAPACITY]>,
}

impl InlineBuffer {
    /// New slot with no value in it.
    pub const fn new() -> Self {
        InlineBuffer {
            bytes: MaybeUninit::uninit(),
        }
    }

    /// Returns `true` if a value of type `T` can live in the slot.
    pub const fn fits<T>() -> bool {
        size_of::<T>() <= INLINE_CAPACITY && align_of::<T>() <= INLINE_ALIGN
    }

    /// Views the slot as a potentially uninitialized `T`.
    ///
    /// `T` must satisfy [`InlineBuffer::fits`]. The caller is responsible
    /// for only assuming initialization when a `T` was actually written.
    pub fn as_uninit<T>(&self) -> &MaybeUninit<T> {
        // Not const-evaluated so that branches which are never taken are not checked.
        assert!(size_of::<T>() <= INLINE_CAPACITY);
        assert!(align_of::<T>() <= INLINE_ALIGN);

        // Safety: the cast is in-bounds and aligned by the checks above.
        unsafe { &*self.bytes.as_ptr().cast() }
    }

    /// Mutable counterpart of [`InlineBuffer::as_uninit`].
    pub fn as_uninit_mut<T>(&mut self) -> &mut MaybeUninit<T> {
        assert!(size_of::<T>() <= INLINE_CAPACITY);
        assert!(align_of::<T>() <= INLINE_ALIGN);

        // Safety: the cast is in-bounds and aligned by the checks above.
        unsafe { &mut *self.bytes.as_mut_ptr().cast() }
    }
}
