//! Payload contracts: what a container can hold.
//!
//! [`Callable`] is the single entry point the erased capability table is
//! built against. Closures and functions of arity 0 through 8 implement it
//! through blanket impls over the corresponding `FnMut` signature.
//! [`Method`] adapts a method selector, whose receiver arrives as the first
//! call argument instead of being captured.

/// An object invocable with the container's argument tuple.
///
/// `Args` is the full argument list as a tuple; `Output` is the result
/// type. Any `FnMut` whose parameter list matches the tuple's elements
/// implements this automatically.
pub trait Callable<Args> {
    /// Result type of the call.
    type Output;

    /// Runs the payload with the given arguments.
    fn call(&mut self, args: Args) -> Self::Output;
}

macro_rules! impl_callable {
    ($( ( $($arg:ident: $ty:ident),* ) )*) => {$(
        impl<Fun, Ret $(, $ty)*> Callable<($($ty,)*)> for Fun
        where
            Fun: FnMut($($ty),*) -> Ret,
        {
            type Output = Ret;

            #[inline]
            fn call(&mut self, ($($arg,)*): ($($ty,)*)) -> Ret {
                self($($arg),*)
            }
        }
    )*};
}

impl_callable! {
    ()
    (a0: A0)
    (a0: A0, a1: A1)
    (a0: A0, a1: A1, a2: A2)
    (a0: A0, a1: A1, a2: A2, a3: A3)
    (a0: A0, a1: A1, a2: A2, a3: A3, a4: A4)
    (a0: A0, a1: A1, a2: A2, a3: A3, a4: A4, a5: A5)
    (a0: A0, a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6)
    (a0: A0, a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6, a7: A7)
}

/// Adapter holding a method selector.
///
/// A method selector is a function item or pointer whose first parameter
/// is the receiver, such as `Counter::bump` for
/// `fn bump(&mut self, n: u32) -> u32`. The adapter stores only the
/// selector; the receiver is supplied as the first call argument, so one
/// container can serve any number of objects.
///
/// `Callable` is implemented for `Method` only at arity one and above:
/// a container whose argument list does not begin with the receiver type
/// cannot be constructed from a selector.
#[derive(Clone, Copy)]
pub struct Method<M> {
    selector: M,
}

impl<M> Method<M> {
    /// Wraps a method selector for use as a container payload.
    pub fn new(selector: M) -> Self {
        Method { selector }
    }
}

macro_rules! impl_method {
    ($( ( $recv:ident: $recv_ty:ident $(, $arg:ident: $ty:ident)* ) )*) => {$(
        impl<Sel, Ret, $recv_ty $(, $ty)*> Callable<($recv_ty, $($ty,)*)> for Method<Sel>
        where
            Sel: FnMut($recv_ty $(, $ty)*) -> Ret,
        {
            type Output = Ret;

            #[inline]
            fn call(&mut self, ($recv, $($arg,)*): ($recv_ty, $($ty,)*)) -> Ret {
                (self.selector)($recv $(, $arg)*)
            }
        }
    )*};
}

impl_method! {
    (recv: Recv)
    (recv: Recv, a1: A1)
    (recv: Recv, a1: A1, a2: A2)
    (recv: Recv, a1: A1, a2: A2, a3: A3)
    (recv: Recv, a1: A1, a2: A2, a3: A3, a4: A4)
    (recv: Recv, a1: A1, a2: A2, a3: A3, a4: A4, a5: A5)
    (recv: Recv, a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6)
    (recv: Recv, a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6, a7: A7)
}
