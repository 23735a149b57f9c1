use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::parse::{Parse, ParseStream, Parser};
use syn::punctuated::Punctuated;
use syn::{Error, Expr, Token};

/// Largest tuple the combinator traits are implemented for.
const MAX_CHILDREN: usize = 8;

fn check_arity(len: usize, name: &str) -> syn::Result<()> {
    if len == 0 {
        return Err(Error::new(
            Span::call_site(),
            format!("{name}! needs at least one operation"),
        ));
    }

    if len > MAX_CHILDREN {
        return Err(Error::new(
            Span::call_site(),
            format!("{name}! takes at most {MAX_CHILDREN} operations"),
        ));
    }

    Ok(())
}

/// `join!(a, b, ...)` becomes `::spindle::combinator::join((a, b, ...))`.
pub(crate) fn join(input: TokenStream) -> syn::Result<TokenStream> {
    let ops = Punctuated::<Expr, Token![,]>::parse_terminated.parse2(input)?;
    check_arity(ops.len(), "join")?;

    let ops = ops.iter();

    Ok(quote! {
        ::spindle::combinator::join((#(#ops,)*))
    })
}

/// One `op => handler` arm of `select!`.
struct Branch {
    op: Expr,
    handler: Expr,
}

impl Parse for Branch {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let op = input.parse()?;
        input.parse::<Token![=>]>()?;
        let handler = input.parse()?;

        Ok(Branch { op, handler })
    }
}

/// `select! { a => |x| .., b => |y| .. }` maps every branch through its
/// handler and races the results.
pub(crate) fn select(input: TokenStream) -> syn::Result<TokenStream> {
    let branches = Punctuated::<Branch, Token![,]>::parse_terminated.parse2(input)?;
    check_arity(branches.len(), "select")?;

    let arms = branches.iter().map(|Branch { op, handler }| {
        quote!(::spindle::OperationExt::map(#op, #handler))
    });

    Ok(quote! {
        ::spindle::combinator::race((#(#arms,)*))
    })
}
