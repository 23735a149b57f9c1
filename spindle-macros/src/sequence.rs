use proc_macro2::{Ident, Literal, Span, TokenStream, TokenTree};
use quote::{ToTokens, format_ident, quote};
use syn::visit::{self, Visit};
use syn::{
    Error, Expr, ExprAsync, ExprAwait, ExprClosure, Item, Local, LocalInit, Pat, PatIdent, Stmt,
    parse_quote,
};

const MISPLACED_AWAIT: &str = "`.await` is only allowed at the top level of a sequence: \
     `let PAT = EXPR.await;`, `EXPR.await;`, their `.await?` forms, \
     or as the tail expression `EXPR.await` / `EXPR.await?`";

/// A top-level statement that suspends the sequence.
struct Point<'a> {
    /// Binding for the step's output; `None` discards it.
    pat: Option<Pat>,
    /// The awaited operation.
    op: &'a Expr,
    /// Written with `.await?`.
    fallible: bool,
}

/// A `sequence!` body split at its suspension points.
///
/// `segments[k]` runs right before `points[k]` is awaited; the last
/// segment runs after the last point and ends in `tail`. Items are hoisted
/// out of the segments so every step can see them.
struct Plan<'a> {
    items: Vec<&'a Stmt>,
    segments: Vec<Vec<&'a Stmt>>,
    points: Vec<Point<'a>>,
    tail: Option<TokenStream>,
}

/// A local saved across a suspension point.
#[derive(Clone)]
struct Saved {
    ident: Ident,
    mutable: bool,
}

/// Expands the statements of a `sequence!` block into a
/// `::spindle::combinator::Sequence`.
///
/// Statements up to the first suspension point run on the first poll.
/// With suspension points, the sequence becomes one generated state enum
/// with a variant per point, holding the awaited operation and the locals
/// used after it, and one resume closure that matches on the variant that
/// just completed and runs the code up to the next point.
pub(crate) fn expand(stmts: &[Stmt]) -> syn::Result<TokenStream> {
    let plan = Plan::new(stmts)?;
    let items = &plan.items;

    if plan.points.is_empty() {
        let body = &plan.segments[0];
        let tail = plan.tail_or_unit();

        return Ok(quote! {
            ::spindle::combinator::Sequence::new(move || {
                #(#items)*
                #(#body)*
                ::spindle::combinator::ready(#tail)
            })
        });
    }

    let n = plan.points.len();
    let variants: Vec<Ident> = (0..n).map(|k| format_ident!("__Step{}", k)).collect();
    let ops: Vec<Ident> = (0..n).map(|k| format_ident!("__O{}", k)).collect();
    let locals: Vec<Ident> = (0..n).map(|k| format_ident!("__L{}", k)).collect();
    let outputs: Vec<Ident> = (0..n).map(|k| format_ident!("__T{}", k)).collect();
    let indices: Vec<Literal> = (0..n).map(Literal::usize_unsuffixed).collect();
    let holes: Vec<TokenStream> = (0..2 * n).map(|_| quote!(_)).collect();

    let saved: Vec<Vec<Saved>> = (0..n).map(|k| plan.saved_at(k)).collect();

    let first = {
        let op = plan.points[0].op;
        let names = saved[0].iter().map(|s| &s.ident);
        quote!(__SpindleSteps::__Step0 { op: #op, locals: (#(#names,)*) })
    };

    let arms = (0..n).map(|k| {
        let variant = &variants[k];
        let pats = saved[k].iter().map(|s| {
            let ident = &s.ident;
            if s.mutable { quote!(mut #ident) } else { quote!(#ident) }
        });
        let bind = plan.points[k].bind();
        let body = &plan.segments[k + 1];

        let next = if k + 1 < n {
            let next_variant = &variants[k + 1];
            let op = plan.points[k + 1].op;
            let names = saved[k + 1].iter().map(|s| &s.ident);

            quote! {
                ::core::ops::ControlFlow::Continue(__SpindleSteps::#next_variant {
                    op: #op,
                    locals: (#(#names,)*),
                })
            }
        } else {
            let tail = plan.tail_or_unit();
            quote!(::core::ops::ControlFlow::Break(#tail))
        };

        quote! {
            __SpindleResumed::#variant { output: __spindle_output, locals: (#(#pats,)*) } => {
                #bind
                #(#body)*
                #next
            }
        }
    });

    let prelude = &plan.segments[0];

    Ok(quote! {
        ::spindle::combinator::Sequence::new(move || {
            #(#items)*

            ::spindle::__private::pin_project! {
                #[project = __SpindleStepsProj]
                #[project_replace = __SpindleStepsReplace]
                enum __SpindleSteps<#(#ops, #locals),*> {
                    #( #variants { #[pin] op: #ops, locals: #locals }, )*
                    __Done,
                }
            }

            enum __SpindleResumed<#(#locals, #outputs),*> {
                #( #variants { output: #outputs, locals: #locals }, )*
            }

            impl<#(#ops, #locals),*> ::spindle::combinator::StepSet
                for __SpindleSteps<#(#ops, #locals),*>
            where
                #(#ops: ::spindle::Operation,)*
            {
                type Resumed = __SpindleResumed<
                    #(#locals, <#ops as ::spindle::Operation>::Output),*
                >;

                fn poll_step(
                    mut self: ::core::pin::Pin<&mut Self>,
                    __spindle_cx: &::spindle::Context<'_>,
                ) -> ::core::task::Poll<Self::Resumed> {
                    match self.as_mut().project() {
                        #(
                            __SpindleStepsProj::#variants { op, .. } => {
                                let output = ::core::task::ready!(
                                    ::spindle::Operation::poll(op, __spindle_cx)
                                );

                                match self.as_mut().project_replace(__SpindleSteps::__Done) {
                                    __SpindleStepsReplace::#variants { locals, .. } => {
                                        ::core::task::Poll::Ready(
                                            __SpindleResumed::#variants { output, locals },
                                        )
                                    }
                                    _ => ::core::unreachable!(),
                                }
                            }
                        )*
                        __SpindleStepsProj::__Done => {
                            ::spindle::fatal("sequence step polled after it finished")
                        }
                    }
                }

                fn cancel_step(
                    mut self: ::core::pin::Pin<&mut Self>,
                    __spindle_cx: &::spindle::Context<'_>,
                ) {
                    match self.as_mut().project() {
                        #(
                            __SpindleStepsProj::#variants { op, .. } => {
                                ::spindle::Operation::cancel(op, __spindle_cx)
                            }
                        )*
                        __SpindleStepsProj::__Done => return,
                    }

                    self.set(__SpindleSteps::__Done);
                }

                fn step(&self) -> ::core::option::Option<usize> {
                    match self {
                        #(
                            __SpindleSteps::#variants { .. } => {
                                ::core::option::Option::Some(#indices)
                            }
                        )*
                        __SpindleSteps::__Done => ::core::option::Option::None,
                    }
                }
            }

            #(#prelude)*

            #[allow(unused_variables, unused_mut)]
            let __spindle_steps = ::spindle::combinator::Steps::new(
                #first,
                move |__spindle_resumed: __SpindleResumed<#(#holes),*>|
                      -> ::core::ops::ControlFlow<_, __SpindleSteps<#(#holes),*>> {
                    match __spindle_resumed {
                        #(#arms)*
                    }
                },
            );

            __spindle_steps
        })
    })
}

impl<'a> Plan<'a> {
    fn new(stmts: &'a [Stmt]) -> syn::Result<Self> {
        let (body, tail) = match stmts.split_last() {
            Some((Stmt::Expr(expr, None), body)) => (body, Some(expr)),
            _ => (stmts, None),
        };

        let mut plan = Plan {
            items: Vec::new(),
            segments: vec![Vec::new()],
            points: Vec::new(),
            tail: None,
        };

        for stmt in body {
            if let Stmt::Item(_) = stmt {
                plan.items.push(stmt);
                continue;
            }

            match suspension(stmt) {
                Some(point) => {
                    reject_await(Some(point.op))?;
                    plan.points.push(point);
                    plan.segments.push(Vec::new());
                }
                None => {
                    reject_await(Some(stmt))?;
                    if let Some(segment) = plan.segments.last_mut() {
                        segment.push(stmt);
                    }
                }
            }
        }

        // A tail `EXPR.await` or `EXPR.await?` is one more point whose
        // output is the value of the sequence.
        if let Some(expr) = tail {
            match awaited(expr) {
                Some((op, fallible)) => {
                    reject_await(Some(op))?;

                    let ident = Ident::new("__spindle_tail", Span::call_site());
                    plan.points.push(Point {
                        pat: Some(parse_quote!(#ident)),
                        op,
                        fallible,
                    });
                    plan.segments.push(Vec::new());
                    plan.tail = Some(ident.into_token_stream());
                }
                None => {
                    reject_await(Some(expr))?;
                    plan.tail = Some(expr.to_token_stream());
                }
            }
        }

        Ok(plan)
    }

    fn tail_or_unit(&self) -> TokenStream {
        match &self.tail {
            Some(tail) => tail.clone(),
            None => quote!(()),
        }
    }

    /// Locals that must be saved while `points[k]` is in flight.
    ///
    /// Every name bound at the top level before the point is a candidate.
    /// The latest binding of a name is the one saved, and only if some
    /// code after the point mentions it before it is bound again.
    fn saved_at(&self, k: usize) -> Vec<Saved> {
        let mut declared: Vec<Saved> = Vec::new();

        let mut declare = |pat: &Pat| {
            for saved in bindings(pat) {
                declared.retain(|d| d.ident != saved.ident);
                declared.push(saved);
            }
        };

        for j in 0..=k {
            for stmt in &self.segments[j] {
                if let Stmt::Local(local) = stmt {
                    declare(&local.pat);
                }
            }

            if j < k {
                if let Some(pat) = &self.points[j].pat {
                    declare(pat);
                }
            }
        }

        declared.retain(|saved| self.live_after(k, &saved.ident));
        declared
    }

    fn live_after(&self, k: usize, ident: &Ident) -> bool {
        if self.points[k].binds(ident) {
            return false;
        }

        for j in k + 1..self.segments.len() {
            for stmt in &self.segments[j] {
                match stmt {
                    Stmt::Local(local) => {
                        if let Some(init) = &local.init {
                            if mentions(init.expr.to_token_stream(), ident)
                                || init
                                    .diverge
                                    .as_ref()
                                    .is_some_and(|(_, e)| mentions(e.to_token_stream(), ident))
                            {
                                return true;
                            }
                        }

                        if bindings(&local.pat).iter().any(|b| b.ident == *ident) {
                            return false;
                        }
                    }
                    _ => {
                        if mentions(stmt.to_token_stream(), ident) {
                            return true;
                        }
                    }
                }
            }

            if let Some(point) = self.points.get(j) {
                if mentions(point.op.to_token_stream(), ident) {
                    return true;
                }
                if point.binds(ident) {
                    return false;
                }
            }
        }

        self.tail
            .as_ref()
            .is_some_and(|tail| mentions(tail.clone(), ident))
    }
}

impl Point<'_> {
    fn binds(&self, ident: &Ident) -> bool {
        self.pat
            .as_ref()
            .is_some_and(|pat| bindings(pat).iter().any(|b| b.ident == *ident))
    }

    /// Binds the output of this point at the start of the code after it.
    fn bind(&self) -> TokenStream {
        let pat = match &self.pat {
            Some(pat) => pat.to_token_stream(),
            None => quote!(_),
        };

        if self.fallible {
            quote! {
                let #pat = match __spindle_output {
                    ::core::result::Result::Ok(__spindle_value) => __spindle_value,
                    ::core::result::Result::Err(__spindle_err) => {
                        return ::core::ops::ControlFlow::Break(::core::result::Result::Err(
                            ::core::convert::From::from(__spindle_err),
                        ));
                    }
                };
            }
        } else {
            quote!(let #pat = __spindle_output;)
        }
    }
}

fn suspension(stmt: &Stmt) -> Option<Point<'_>> {
    match stmt {
        Stmt::Local(Local {
            pat,
            init: Some(LocalInit {
                expr,
                diverge: None,
                ..
            }),
            ..
        }) => awaited(expr).map(|(op, fallible)| Point {
            pat: Some(pat.clone()),
            op,
            fallible,
        }),
        Stmt::Expr(expr, Some(_)) => awaited(expr).map(|(op, fallible)| Point {
            pat: None,
            op,
            fallible,
        }),
        _ => None,
    }
}

/// Matches `EXPR.await` and `EXPR.await?`.
fn awaited(expr: &Expr) -> Option<(&Expr, bool)> {
    match expr {
        Expr::Await(ExprAwait { base, .. }) => Some((&**base, false)),
        Expr::Try(expr) => match &*expr.expr {
            Expr::Await(ExprAwait { base, .. }) => Some((&**base, true)),
            _ => None,
        },
        _ => None,
    }
}

/// Names bound by a pattern.
fn bindings(pat: &Pat) -> Vec<Saved> {
    struct Collect(Vec<Saved>);

    impl<'ast> Visit<'ast> for Collect {
        fn visit_pat_ident(&mut self, node: &'ast PatIdent) {
            self.0.push(Saved {
                ident: node.ident.clone(),
                mutable: node.mutability.is_some(),
            });
            visit::visit_pat_ident(self, node);
        }
    }

    let mut collect = Collect(Vec::new());
    collect.visit_pat(pat);
    collect.0
}

/// Whether `tokens` refer to `ident`, including inline format arguments
/// such as `"{name}"`.
fn mentions(tokens: TokenStream, ident: &Ident) -> bool {
    let inline = format!("{{{ident}}}");
    let formatted = format!("{{{ident}:");

    tokens.into_iter().any(|tree| match tree {
        TokenTree::Ident(i) => i == *ident,
        TokenTree::Group(group) => mentions(group.stream(), ident),
        TokenTree::Literal(lit) => {
            let text = lit.to_string();
            text.contains(&inline) || text.contains(&formatted)
        }
        TokenTree::Punct(_) => false,
    })
}

/// Fails on the first `.await` outside a suspension point.
fn reject_await<'a, T>(nodes: impl IntoIterator<Item = &'a T>) -> syn::Result<()>
where
    T: Walk + 'a,
{
    let mut finder = AwaitFinder { found: None };

    for node in nodes {
        node.walk(&mut finder);

        if let Some(span) = finder.found {
            return Err(Error::new(span, MISPLACED_AWAIT));
        }
    }

    Ok(())
}

trait Walk {
    fn walk(&self, finder: &mut AwaitFinder);
}

impl Walk for Stmt {
    fn walk(&self, finder: &mut AwaitFinder) {
        finder.visit_stmt(self);
    }
}

impl Walk for Expr {
    fn walk(&self, finder: &mut AwaitFinder) {
        finder.visit_expr(self);
    }
}

struct AwaitFinder {
    found: Option<Span>,
}

impl<'ast> Visit<'ast> for AwaitFinder {
    fn visit_expr_await(&mut self, node: &'ast ExprAwait) {
        if self.found.is_none() {
            self.found = Some(node.await_token.span);
        }
    }

    // Closures, async blocks and nested items have their own rules.
    fn visit_expr_closure(&mut self, _node: &'ast ExprClosure) {}

    fn visit_expr_async(&mut self, _node: &'ast ExprAsync) {}

    fn visit_item(&mut self, _node: &'ast Item) {}

    fn visit_expr(&mut self, node: &'ast Expr) {
        if self.found.is_none() {
            visit::visit_expr(self, node);
        }
    }
}
