use core::{alloc::Layout, fmt, marker::PhantomData};

use alloc::{
    alloc::{alloc as raw_alloc, handle_alloc_error},
    boxed::Box,
};

use crate::{
    callable::{Callable, Method},
    error::{AllocError, EmptyCall},
    storage::{InlineBuffer, StorageMode},
};

unsafe fn invoke_inlined<W, Args>(storage: &mut InlineBuffer, args: Args) -> W::Output
where
    W: Callable<Args>,
{
    // Safety: the slot was initialized with a `W` in inline mode.
    let payload: &mut W = unsafe { storage.as_uninit_mut::<W>().assume_init_mut() };
    payload.call(args)
}

unsafe fn invoke_boxed<W, Args>(storage: &mut InlineBuffer, args: Args) -> W::Output
where
    W: Callable<Args>,
{
    // Safety: the slot was initialized with a `Box<W>` in heap mode.
    let boxed: &mut Box<W> = unsafe { storage.as_uninit_mut::<Box<W>>().assume_init_mut() };
    boxed.call(args)
}

/// Moves the payload value into an uninitialized slot.
/// The source slot must be treated as uninitialized afterwards.
unsafe fn relocate_inlined<W>(src: &mut InlineBuffer, dst: &mut InlineBuffer) {
    // Safety: the source slot holds a live `W`; ownership moves to `dst`.
    let payload: W = unsafe { src.as_uninit_mut::<W>().assume_init_read() };
    dst.as_uninit_mut::<W>().write(payload);
}

/// Moves the owning box into an uninitialized slot.
/// The source slot must be treated as uninitialized afterwards.
unsafe fn relocate_boxed<W>(src: &mut InlineBuffer, dst: &mut InlineBuffer) {
    // Safety: the source slot holds a live `Box<W>`; ownership moves to `dst`.
    let boxed: Box<W> = unsafe { src.as_uninit_mut::<Box<W>>().assume_init_read() };
    dst.as_uninit_mut::<Box<W>>().write(boxed);
}

/// Clones the payload value into an uninitialized slot.
unsafe fn copy_into_inlined<W: Clone>(src: &InlineBuffer, dst: &mut InlineBuffer) {
    // Safety: the source slot holds a live `W`.
    let payload: &W = unsafe { src.as_uninit::<W>().assume_init_ref() };
    dst.as_uninit_mut::<W>().write(payload.clone());
}

/// Clones the payload into a fresh owned allocation written to `dst`.
unsafe fn clone_boxed<W: Clone>(src: &InlineBuffer, dst: &mut InlineBuffer) {
    // Safety: the source slot holds a live `Box<W>`.
    let boxed: &Box<W> = unsafe { src.as_uninit::<Box<W>>().assume_init_ref() };
    dst.as_uninit_mut::<Box<W>>().write(Box::new((**boxed).clone()));
}

unsafe fn drop_inlined<W>(storage: &mut InlineBuffer) {
    // Safety: the slot was initialized with a `W` in inline mode.
    unsafe {
        storage.as_uninit_mut::<W>().assume_init_drop();
    }
}

unsafe fn drop_boxed<W>(storage: &mut InlineBuffer) {
    // Safety: the slot was initialized with a `Box<W>` in heap mode.
    unsafe {
        storage.as_uninit_mut::<Box<W>>().assume_init_drop();
    }
}

/// Capability table for one payload type in one storage mode.
///
/// Every non-empty container carries the instantiation matching its
/// payload and mode, so none of the entry points branch on the mode at
/// call time. `copy` is clone-into-slot for inline residency and
/// clone-into-fresh-box for heap residency; `relocate` moves either the
/// payload value or its owning box.
///
/// Stored by value: a `&'static` table would demand `Args: 'static`,
/// ruling out argument tuples that borrow (such as `&mut` receivers).
struct VTable<Args, R> {
    invoke: unsafe fn(&mut InlineBuffer, Args) -> R,
    relocate: unsafe fn(&mut InlineBuffer, &mut InlineBuffer),
    copy: unsafe fn(&InlineBuffer, &mut InlineBuffer),
    drop: unsafe fn(&mut InlineBuffer),
}

// Derived impls would demand `Args: Copy`; the table is four plain
// function pointers regardless of the parameters.
impl<Args, R> Copy for VTable<Args, R> {}

impl<Args, R> Clone for VTable<Args, R> {
    fn clone(&self) -> Self {
        *self
    }
}

/// Fallible counterpart of `Box::new`.
/// On failure the payload is dropped and the refused layout is reported.
fn try_box<T>(value: T) -> Result<Box<T>, AllocError> {
    let layout = Layout::new::<T>();

    if layout.size() == 0 {
        // Zero-sized payloads never touch the allocator.
        return Ok(Box::new(value));
    }

    // Safety: the layout has non-zero size.
    let ptr = unsafe { raw_alloc(layout) }.cast::<T>();
    if ptr.is_null() {
        return Err(AllocError::new(layout));
    }

    // Safety: `ptr` is freshly allocated for `T`'s layout and uniquely owned.
    unsafe {
        ptr.write(value);
        Ok(Box::from_raw(ptr))
    }
}

/// Type-erased callable container with inline storage for small payloads.
///
/// Holds any payload implementing [`Callable`] over `Args` with output `R`,
/// plus [`Clone`]. Payloads that fit the 128-byte slot are stored in place;
/// larger or over-aligned payloads are boxed. Exactly one representation
/// is active at any time, and an empty container owns nothing.
///
/// Payloads may be `!Send` and `!Sync`, so `LocalPolyCall` itself is
/// neither. For the thread-safe container see [`PolyCall`].
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// use polycall::LocalPolyCall;
///
/// // `Rc` is not `Send`, so this payload needs the local container.
/// let counter = Rc::new(Cell::new(0u32));
/// let handle = Rc::clone(&counter);
///
/// let mut tick: LocalPolyCall<(), u32> = LocalPolyCall::new(move || {
///     let next = handle.get() + 1;
///     handle.set(next);
///     next
/// });
///
/// assert_eq!(tick.call(()), Ok(1));
/// assert_eq!(tick.call(()), Ok(2));
/// assert_eq!(counter.get(), 2);
/// ```
pub struct LocalPolyCall<Args, R> {
    vtable: Option<VTable<Args, R>>,
    mode: StorageMode,
    storage: InlineBuffer,
    unsend: PhantomData<*mut u8>,
}

impl<Args, R> Drop for LocalPolyCall<Args, R> {
    #[inline]
    fn drop(&mut self) {
        if let Some(vtable) = self.vtable {
            // Safety: a present vtable matches the live representation.
            unsafe {
                (vtable.drop)(&mut self.storage);
            }
        }
    }
}

impl<Args, R> Default for LocalPolyCall<Args, R> {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl<Args, R> fmt::Debug for LocalPolyCall<Args, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalPolyCall")
            .field("set", &self.is_set())
            .field("mode", &self.mode)
            .finish()
    }
}

impl<Args, R> Clone for LocalPolyCall<Args, R> {
    fn clone(&self) -> Self {
        let Some(vtable) = self.vtable else {
            return Self::empty();
        };

        let mut storage = InlineBuffer::new();

        // Safety: the source slot holds the live representation and the
        // destination slot is uninitialized.
        unsafe {
            (vtable.copy)(&self.storage, &mut storage);
        }

        LocalPolyCall {
            vtable: Some(vtable),
            mode: self.mode,
            storage,
            unsend: PhantomData,
        }
    }

    fn clone_from(&mut self, source: &Self) {
        // The replacement is fully constructed before the old payload drops.
        *self = source.clone();
    }
}

impl<Args, R> LocalPolyCall<Args, R> {
    /// Returns `true` if a payload of type `F` is stored without allocation.
    /// If `true`, then `new::<F>` is guaranteed to not allocate.
    pub const fn fits<F>() -> bool {
        InlineBuffer::fits::<F>()
    }

    /// New empty container. Invoking it returns [`EmptyCall`].
    ///
    /// # Example
    ///
    /// ```
    /// use polycall::{EmptyCall, LocalPolyCall};
    ///
    /// let mut none: LocalPolyCall<(u8,), u8> = LocalPolyCall::empty();
    /// assert!(!none.is_set());
    /// assert_eq!(none.call((7,)), Err(EmptyCall));
    /// ```
    pub const fn empty() -> Self {
        LocalPolyCall {
            vtable: None,
            mode: StorageMode::Heap,
            storage: InlineBuffer::new(),
            unsend: PhantomData,
        }
    }

    /// New container holding `payload`.
    ///
    /// Payloads that satisfy [`fits`](LocalPolyCall::fits) are placed in the
    /// inline slot; anything larger or over-aligned is moved to the heap.
    /// Aborts through [`handle_alloc_error`] if that allocation fails; use
    /// [`try_new`](LocalPolyCall::try_new) to observe the failure instead.
    ///
    /// # Example
    ///
    /// ```
    /// use polycall::LocalPolyCall;
    ///
    /// let mut add: LocalPolyCall<(i32, i32), i32> = LocalPolyCall::new(|a: i32, b: i32| a + b);
    /// assert_eq!(add.call((2, 3)), Ok(5));
    /// assert!(add.is_inline());
    /// ```
    #[inline]
    pub fn new<F>(payload: F) -> Self
    where
        F: Callable<Args, Output = R> + Clone + 'static,
    {
        match Self::try_new(payload) {
            Ok(this) => this,
            Err(err) => handle_alloc_error(err.layout()),
        }
    }

    /// Fallible version of [`new`](LocalPolyCall::new).
    ///
    /// The inline path cannot fail; the heap path reports the refused
    /// layout as [`AllocError`] without retrying.
    pub fn try_new<F>(payload: F) -> Result<Self, AllocError>
    where
        F: Callable<Args, Output = R> + Clone + 'static,
    {
        if InlineBuffer::fits::<F>() {
            return Ok(Self::new_inlined(payload));
        }

        let mut storage = InlineBuffer::new();
        storage.as_uninit_mut::<Box<F>>().write(try_box(payload)?);

        let vtable = VTable {
            invoke: invoke_boxed::<F, Args>,
            relocate: relocate_boxed::<F>,
            copy: clone_boxed::<F>,
            drop: drop_boxed::<F>,
        };

        Ok(LocalPolyCall {
            vtable: Some(vtable),
            mode: StorageMode::Heap,
            storage,
            unsend: PhantomData,
        })
    }

    /// New container holding a method selector.
    ///
    /// The container's first declared argument is the receiver, supplied at
    /// each call rather than stored. Selectors are function items or
    /// pointers (`M: Copy`), so this always selects inline storage; the
    /// `const` assertion makes an oversized selector a compile error.
    ///
    /// A container whose argument list does not begin with the receiver
    /// type fails the `Method<M>: Callable<Args>` bound at compile time.
    ///
    /// # Example
    ///
    /// ```
    /// use polycall::LocalPolyCall;
    ///
    /// struct Counter {
    ///     value: u32,
    /// }
    ///
    /// impl Counter {
    ///     fn bump(&mut self, n: u32) -> u32 {
    ///         self.value += n;
    ///         self.value
    ///     }
    /// }
    ///
    /// let mut counter = Counter { value: 10 };
    /// let mut bump: LocalPolyCall<(&mut Counter, u32), u32> =
    ///     LocalPolyCall::from_method(Counter::bump);
    ///
    /// assert_eq!(bump.call((&mut counter, 5)), Ok(15));
    /// drop(bump);
    /// assert_eq!(counter.value, 15);
    /// ```
    pub fn from_method<M>(selector: M) -> Self
    where
        M: Copy + 'static,
        Method<M>: Callable<Args, Output = R>,
    {
        const {
            assert!(InlineBuffer::fits::<Method<M>>());
        }

        Self::new_inlined(Method::new(selector))
    }

    fn new_inlined<W>(payload: W) -> Self
    where
        W: Callable<Args, Output = R> + Clone + 'static,
    {
        let mut storage = InlineBuffer::new();
        storage.as_uninit_mut::<W>().write(payload);

        let vtable = VTable {
            invoke: invoke_inlined::<W, Args>,
            relocate: relocate_inlined::<W>,
            copy: copy_into_inlined::<W>,
            drop: drop_inlined::<W>,
        };

        LocalPolyCall {
            vtable: Some(vtable),
            mode: StorageMode::Inline,
            storage,
            unsend: PhantomData,
        }
    }

    /// Returns `true` if the container holds a payload.
    #[inline]
    pub fn is_set(&self) -> bool {
        self.vtable.is_some()
    }

    /// Returns `true` if the payload lives in the inline slot.
    /// Empty containers report `false`.
    #[inline]
    pub fn is_inline(&self) -> bool {
        matches!(self.mode, StorageMode::Inline)
    }

    /// Invokes the payload with the given argument tuple.
    ///
    /// Returns [`EmptyCall`] if the container is empty. Panics raised by
    /// the payload propagate unmodified.
    #[inline]
    pub fn call(&mut self, args: Args) -> Result<R, EmptyCall> {
        match self.vtable {
            // Safety: a present vtable matches the live representation.
            Some(vtable) => Ok(unsafe { (vtable.invoke)(&mut self.storage, args) }),
            None => Err(EmptyCall),
        }
    }

    /// Moves the payload out, leaving this container empty.
    ///
    /// An inline payload is relocated into the returned container; a heap
    /// payload transfers its owning box without touching the payload. Never
    /// fails, and never clones.
    ///
    /// # Example
    ///
    /// ```
    /// use polycall::{EmptyCall, LocalPolyCall};
    ///
    /// let mut a: LocalPolyCall<(), u8> = LocalPolyCall::new(|| 9);
    /// let mut b = a.take();
    ///
    /// assert_eq!(a.call(()), Err(EmptyCall));
    /// assert_eq!(b.call(()), Ok(9));
    /// ```
    pub fn take(&mut self) -> Self {
        let Some(vtable) = self.vtable else {
            return Self::empty();
        };

        let mut storage = InlineBuffer::new();

        // Safety: the source slot holds the live representation and the
        // destination slot is uninitialized. The source is marked empty
        // below, so the moved-out representation is never dropped twice.
        unsafe {
            (vtable.relocate)(&mut self.storage, &mut storage);
        }

        let taken = LocalPolyCall {
            vtable: Some(vtable),
            mode: self.mode,
            storage,
            unsend: PhantomData,
        };

        self.vtable = None;
        self.mode = StorageMode::Heap;

        taken
    }

    /// Exchanges the full state of two containers.
    ///
    /// Performed as three moves through a temporary, so the cost is
    /// proportional to the payload size for inline payloads.
    pub fn swap(&mut self, other: &mut Self) {
        let tmp = other.take();
        *other = self.take();
        *self = tmp;
    }
}

/// Type-erased callable container with inline storage for small payloads.
///
/// Same container as [`LocalPolyCall`], restricted to `Send + Sync`
/// payloads and therefore `Send + Sync` itself. Two independently held
/// containers may be invoked from different threads; one container must be
/// used from one thread at a time, which the `&mut` receivers enforce.
///
/// # Example
///
/// ```
/// use polycall::PolyCall;
///
/// let mut add: PolyCall<(i32, i32), i32> = PolyCall::new(|a: i32, b: i32| a + b);
///
/// assert_eq!(add.call((2, 3)), Ok(5));
///
/// // Small payloads avoid allocation entirely.
/// assert!(add.is_inline());
/// ```
pub struct PolyCall<Args, R> {
    inner: LocalPolyCall<Args, R>,
}

// Safety: every constructor requires the payload to be `Send` and `Sync`,
// and the vtable entries are plain function pointers.
unsafe impl<Args, R> Send for PolyCall<Args, R> {}
unsafe impl<Args, R> Sync for PolyCall<Args, R> {}

impl<Args, R> Default for PolyCall<Args, R> {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl<Args, R> fmt::Debug for PolyCall<Args, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolyCall")
            .field("set", &self.inner.is_set())
            .field("mode", &self.inner.mode)
            .finish()
    }
}

impl<Args, R> Clone for PolyCall<Args, R> {
    #[inline]
    fn clone(&self) -> Self {
        PolyCall {
            inner: self.inner.clone(),
        }
    }

    #[inline]
    fn clone_from(&mut self, source: &Self) {
        self.inner.clone_from(&source.inner);
    }
}

impl<Args, R> From<PolyCall<Args, R>> for LocalPolyCall<Args, R> {
    #[inline]
    fn from(value: PolyCall<Args, R>) -> Self {
        value.inner
    }
}

impl<Args, R> PolyCall<Args, R> {
    /// Returns `true` if a payload of type `F` is stored without allocation.
    /// If `true`, then `new::<F>` is guaranteed to not allocate.
    pub const fn fits<F>() -> bool {
        InlineBuffer::fits::<F>()
    }

    /// New empty container. Invoking it returns [`EmptyCall`].
    pub const fn empty() -> Self {
        PolyCall {
            inner: LocalPolyCall::empty(),
        }
    }

    /// New container holding `payload`.
    ///
    /// See [`LocalPolyCall::new`]. The payload must additionally be `Send`
    /// and `Sync`; for payloads that are not, use [`LocalPolyCall`].
    #[inline]
    pub fn new<F>(payload: F) -> Self
    where
        F: Callable<Args, Output = R> + Clone + Send + Sync + 'static,
    {
        PolyCall {
            inner: LocalPolyCall::new(payload),
        }
    }

    /// Fallible version of [`new`](PolyCall::new).
    ///
    /// See [`LocalPolyCall::try_new`].
    #[inline]
    pub fn try_new<F>(payload: F) -> Result<Self, AllocError>
    where
        F: Callable<Args, Output = R> + Clone + Send + Sync + 'static,
    {
        Ok(PolyCall {
            inner: LocalPolyCall::try_new(payload)?,
        })
    }

    /// New container holding a method selector.
    ///
    /// See [`LocalPolyCall::from_method`].
    #[inline]
    pub fn from_method<M>(selector: M) -> Self
    where
        M: Copy + Send + Sync + 'static,
        Method<M>: Callable<Args, Output = R>,
    {
        PolyCall {
            inner: LocalPolyCall::from_method(selector),
        }
    }

    /// Returns `true` if the container holds a payload.
    #[inline]
    pub fn is_set(&self) -> bool {
        self.inner.is_set()
    }

    /// Returns `true` if the payload lives in the inline slot.
    /// Empty containers report `false`.
    #[inline]
    pub fn is_inline(&self) -> bool {
        self.inner.is_inline()
    }

    /// Invokes the payload with the given argument tuple.
    ///
    /// Returns [`EmptyCall`] if the container is empty. Panics raised by
    /// the payload propagate unmodified.
    #[inline]
    pub fn call(&mut self, args: Args) -> Result<R, EmptyCall> {
        self.inner.call(args)
    }

    /// Moves the payload out, leaving this container empty.
    ///
    /// See [`LocalPolyCall::take`].
    #[inline]
    pub fn take(&mut self) -> Self {
        PolyCall {
            inner: self.inner.take(),
        }
    }

    /// Exchanges the full state of two containers.
    ///
    /// See [`LocalPolyCall::swap`].
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        self.inner.swap(&mut other.inner);
    }
}
