//! Tagged callback type
//!
//! Stored by value in task and timer slots, so nothing unsized crosses the
//! interrupt boundary.

/// A callback with an optional word-sized context
#[derive(Clone, Copy)]
pub enum Callback {
    /// Plain function
    Fn(fn()),
    /// Function receiving a context word (index, handle bits, address)
    WithArg(fn(usize), usize),
}

impl Callback {
    #[inline]
    pub const fn new(f: fn()) -> Self {
        Callback::Fn(f)
    }

    #[inline]
    pub const fn with_arg(f: fn(usize), arg: usize) -> Self {
        Callback::WithArg(f, arg)
    }

    /// Invoke the callback
    #[inline]
    pub fn call(self) {
        match self {
            Callback::Fn(f) => f(),
            Callback::WithArg(f, arg) => f(arg),
        }
    }
}

impl core::fmt::Debug for Callback {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Callback::Fn(_) => f.write_str("Callback::Fn"),
            Callback::WithArg(_, arg) => write!(f, "Callback::WithArg({arg:#x})"),
        }
    }
}

impl From<fn()> for Callback {
    fn from(f: fn()) -> Self {
        Callback::Fn(f)
    }
}
