use crate::args::{Clock, EntryArgs};
use crate::sequence::expand as expand_sequence;

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Error, FnArg, ItemFn};

#[derive(Copy, Clone)]
pub(crate) enum Entry {
    Main,
    Test,
}

impl Entry {
    fn name(self) -> &'static str {
        match self {
            Entry::Main => "#[spindle::main]",
            Entry::Test => "#[spindle::test]",
        }
    }

    fn default_clock(self) -> Clock {
        match self {
            Entry::Main => Clock::System,
            Entry::Test => Clock::Virtual,
        }
    }
}

/// Turns an `async fn` into a plain function that builds a runtime and
/// blocks on the body, expanded as a sequence.
///
/// A single parameter, if present, is bound to the runtime's reactor.
pub(crate) fn expand(entry: Entry, args: EntryArgs, input: ItemFn) -> syn::Result<TokenStream> {
    let ItemFn {
        attrs,
        vis,
        mut sig,
        block,
    } = input;

    if sig.asyncness.take().is_none() {
        return Err(Error::new_spanned(
            sig.fn_token,
            format!("{} must be used on an async function", entry.name()),
        ));
    }

    if matches!(entry, Entry::Main) && sig.ident != "main" {
        return Err(Error::new_spanned(
            &sig.ident,
            "#[spindle::main] must be used on fn main",
        ));
    }

    let reactor = match sig.inputs.len() {
        0 => None,
        1 => match &sig.inputs[0] {
            FnArg::Typed(arg) => {
                let (pat, ty) = (&arg.pat, &arg.ty);
                Some(quote!(let #pat: #ty = __spindle_runtime.reactor();))
            }
            FnArg::Receiver(receiver) => {
                return Err(Error::new_spanned(receiver, "`self` is not supported here"));
            }
        },
        _ => {
            return Err(Error::new_spanned(
                &sig.inputs,
                "expected at most one parameter, bound to the runtime's reactor",
            ));
        }
    };
    sig.inputs.clear();

    let clock = args.clock.unwrap_or(entry.default_clock());
    let capacity = args
        .timer_capacity
        .map(|n| quote!(.timer_capacity(#n)));

    let body = expand_sequence(&block.stmts)?;

    let test_attr = match entry {
        Entry::Main => None,
        Entry::Test => Some(quote!(#[::core::prelude::v1::test])),
    };

    Ok(quote! {
        #test_attr
        #(#attrs)*
        #vis #sig {
            let __spindle_runtime = ::spindle::RuntimeBuilder::new()
                .clock(#clock)
                #capacity
                .build();

            #reactor

            __spindle_runtime.block_on(#body)
        }
    })
}
