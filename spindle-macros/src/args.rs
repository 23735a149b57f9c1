use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{Error, Expr, ExprLit, Lit, LitInt, MetaNameValue, Token};

/// Clock requested by an entry-point attribute.
#[derive(Copy, Clone)]
pub(crate) enum Clock {
    System,
    Virtual,
}

impl ToTokens for Clock {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        tokens.extend(match self {
            Clock::System => quote!(::spindle::ClockKind::System),
            Clock::Virtual => quote!(::spindle::ClockKind::Virtual),
        });
    }
}

/// Arguments of `#[spindle::main(...)]` and `#[spindle::test(...)]`.
///
/// ```text
/// #[spindle::test(clock = "system", timer_capacity = 8)]
/// ```
#[derive(Default)]
pub(crate) struct EntryArgs {
    pub(crate) clock: Option<Clock>,
    pub(crate) timer_capacity: Option<LitInt>,
}

impl Parse for EntryArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = EntryArgs::default();

        for meta in Punctuated::<MetaNameValue, Token![,]>::parse_terminated(input)? {
            let Some(name) = meta.path.get_ident() else {
                return Err(Error::new_spanned(&meta.path, "expected an identifier"));
            };

            match name.to_string().as_str() {
                "clock" => {
                    let Expr::Lit(ExprLit {
                        lit: Lit::Str(value),
                        ..
                    }) = &meta.value
                    else {
                        return Err(Error::new_spanned(&meta.value, "expected a string literal"));
                    };

                    args.clock = Some(match value.value().as_str() {
                        "system" => Clock::System,
                        "virtual" => Clock::Virtual,
                        _ => {
                            return Err(Error::new_spanned(
                                value,
                                "clock must be \"system\" or \"virtual\"",
                            ));
                        }
                    });
                }
                "timer_capacity" => {
                    let Expr::Lit(ExprLit {
                        lit: Lit::Int(value),
                        ..
                    }) = &meta.value
                    else {
                        return Err(Error::new_spanned(&meta.value, "expected an integer literal"));
                    };

                    if value.base10_parse::<usize>()? == 0 {
                        return Err(Error::new_spanned(value, "timer_capacity must be > 0"));
                    }

                    args.timer_capacity = Some(value.clone());
                }
                _ => {
                    return Err(Error::new_spanned(
                        name,
                        "unknown argument, expected `clock` or `timer_capacity`",
                    ));
                }
            }
        }

        Ok(args)
    }
}
