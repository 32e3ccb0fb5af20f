//! Onion composition.
//!
//! Both chains in this workspace are built the same way: an ordered list of
//! wrapper constructors is folded around a terminal so that the first
//! wrapper ends up outermost.
//!
//! ```
//! use wrapchain_core::compose;
//!
//! let wrappers: Vec<Box<dyn Fn(String) -> String>> = vec![
//!     Box::new(|inner: String| format!("a({inner})")),
//!     Box::new(|inner: String| format!("b({inner})")),
//! ];
//!
//! assert_eq!(compose(&wrappers, "t".to_string()), "a(b(t))");
//! ```

/// Nests `wrappers` around `terminal`, first wrapper outermost.
///
/// `compose([w1, w2, .., wn], t) == w1(w2(..wn(t)))`. Each wrapper receives
/// the already-built downstream and returns the new head of the chain. No
/// reordering or validation happens here; the order given is the order of
/// the resulting chain.
pub fn compose<T, W, I>(wrappers: I, terminal: T) -> T
where
    I: IntoIterator<Item = W>,
    I::IntoIter: DoubleEndedIterator,
    W: FnOnce(T) -> T,
{
    wrappers
        .into_iter()
        .rev()
        .fold(terminal, |downstream, wrap| wrap(downstream))
}
