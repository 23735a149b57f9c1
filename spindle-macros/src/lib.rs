//! Procedural macros for Spindle.
//!
//! These are re-exported from the `spindle` crate; depend on that instead of
//! using this crate directly.

mod args;
mod combinators;
mod entry;
mod sequence;

use args::EntryArgs;
use entry::Entry;

use proc_macro::TokenStream;
use syn::parse::Parser;
use syn::{Block, Error, ItemFn, parse_macro_input};

/// Writes a sequential operation with `.await` syntax.
///
/// The body is a block of statements. Top-level `let PAT = EXPR.await;` and
/// `EXPR.await;` statements are suspension points; everything between them
/// runs synchronously in the poll that reaches it. The optional tail is the
/// value of the sequence, or the output of the last operation when written
/// `EXPR.await` or `EXPR.await?`.
///
/// `EXPR.await?` awaits an operation producing a `Result` and resolves the
/// whole sequence to `Err(From::from(e))` on failure.
///
/// The expansion is one state enum with a variant per suspension point and
/// one resume closure, so a sequence costs one level of nesting depth and
/// its type grows linearly with the number of steps.
///
/// Locals used after a suspension point are moved into the state while it
/// is in flight, so awaited operations may not borrow locals of the
/// sequence itself. Captured values the code after the first suspension
/// point consumes by value must be moved into a local first
/// (`let value = value;`).
///
/// ```rust,ignore
/// let total = runtime.block_on(spindle::sequence! {
///     let mut ticks = 0;
///     sleep(reactor, Duration::from_millis(10)).await;
///     ticks += 1;
///     sleep(reactor, Duration::from_millis(10)).await;
///     ticks + 1
/// });
///
/// assert_eq!(total, 2);
/// ```
#[proc_macro]
pub fn sequence(input: TokenStream) -> TokenStream {
    let stmts = match Block::parse_within.parse(input) {
        Ok(stmts) => stmts,
        Err(err) => return err.to_compile_error().into(),
    };

    sequence::expand(&stmts)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

/// Runs every operation to completion and returns all of their outputs.
///
/// `join!(a, b)` is `spindle::combinator::join((a, b))`.
#[proc_macro]
pub fn join(input: TokenStream) -> TokenStream {
    combinators::join(input.into())
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

/// Races operations and maps the winner through its handler.
///
/// ```rust,ignore
/// spindle::select! {
///     sleep(reactor, Duration::from_millis(50)) => |()| "timer",
///     read_sensor() => |value| "sensor",
/// }
/// ```
///
/// The earliest branch wins ties. Losing branches are cancelled.
#[proc_macro]
pub fn select(input: TokenStream) -> TokenStream {
    combinators::select(input.into())
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

/// Runs an `async fn main` on a new runtime using the system clock.
///
/// Accepts `clock = "system" | "virtual"` and `timer_capacity = N`.
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as EntryArgs);
    let input = parse_macro_input!(item as ItemFn);

    entry::expand(Entry::Main, args, input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

/// Runs an `async fn` test on a new runtime using the virtual clock.
///
/// The test may take one parameter, which is bound to the runtime's
/// reactor:
///
/// ```rust,ignore
/// #[spindle::test]
/// async fn sleeps(reactor: &Reactor) {
///     sleep(reactor, Duration::from_secs(1)).await;
///     assert_eq!(reactor.now(), Duration::from_secs(1));
/// }
/// ```
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as EntryArgs);
    let input = parse_macro_input!(item as ItemFn);

    entry::expand(Entry::Test, args, input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}
