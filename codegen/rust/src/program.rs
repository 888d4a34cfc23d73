// Copyright 2026 The GP2 Project Developers

//! Control-program lowering.
//!
//! The generated `main.rs` loads the host graph, builds one morphism per
//! rule, and runs the control program as straight-line code over a single
//! `result` flag. Rollback-bearing combinators mark the trail on entry and
//! either replay (`if`, failed `try`, failed loop iteration) or discard
//! the records. Recording contexts are threaded statically: a construct
//! that already records for an enclosing scope leaves its records in place
//! for that scope to roll back. A condition or loop body consisting of a
//! single rule call needs no trail scope at all, since a rule mutates
//! nothing until its match is complete.

use proc_macro2::{Ident, Span, TokenStream};
use quote::{format_ident, quote};

use gp2::ast::{Command, Declaration, Program};
use gp2::ir::Rule;

pub(crate) struct ProgramGenerator<'a> {
    program: &'a Program,
    rules: &'a [Rule],
    labels: usize,
    marks: usize,
}

/// Static emission context: whether an enclosing construct is recording,
/// and the innermost loop to break out of.
#[derive(Clone)]
struct Context {
    record: bool,
    enclosing_loop: Option<LoopContext>,
}

#[derive(Clone)]
struct LoopContext {
    label: syn::Lifetime,
    /// Trail mark of the current iteration, with whether breaking must
    /// commit it (the loop records for itself, not for an outer scope).
    mark: Option<(Ident, bool)>,
}

impl<'a> ProgramGenerator<'a> {
    pub(crate) fn new(program: &'a Program, rules: &'a [Rule]) -> Self {
        Self {
            program,
            rules,
            labels: 0,
            marks: 0,
        }
    }

    pub(crate) fn generate(&mut self) -> TokenStream {
        let modules = self.rules.iter().map(|rule| {
            let name = format_ident!("{}", rule.name);
            quote! { mod #name; }
        });
        let morphisms = self.rules.iter().filter(|rule| rule.lhs.is_some()).map(|rule| {
            let module = format_ident!("{}", rule.name);
            let morphism = morphism_ident(&rule.name);
            quote! { let mut #morphism = #module::create_morphism(); }
        });
        let body = match self.program.main() {
            Some(main) => self.command(
                main,
                &Context {
                    record: false,
                    enclosing_loop: None,
                },
            ),
            None => quote! {},
        };
        quote! {
            #![allow(non_snake_case, unused_imports, unused_variables, unused_mut)]

            use gp2rs::engine::Engine;

            #(#modules)*

            fn main() {
                std::process::exit(run());
            }

            fn run() -> i32 {
                let args: Vec<String> = std::env::args().collect();
                if args.len() < 2 {
                    eprintln!("usage: {} <host-graph-file>", args[0]);
                    return gp2rs::EXIT_INTERNAL;
                }
                let mut engine = Engine::new();
                if let Err(error) = gp2rs::host::load(std::path::Path::new(&args[1]), &mut engine) {
                    eprintln!("{}", error);
                    return gp2rs::EXIT_INTERNAL;
                }
                #(#morphisms)*
                let mut result = true;
                #body
                if result {
                    println!("{}", engine.host);
                    gp2rs::EXIT_SUCCESS
                } else {
                    println!("No output graph: the program failed.");
                    gp2rs::EXIT_FAIL
                }
            }
        }
    }

    fn command(&mut self, command: &Command, ctx: &Context) -> TokenStream {
        match command {
            Command::Skip => quote! { result = true; },
            Command::Fail => quote! { result = false; },
            Command::Break => self.break_out(ctx),
            Command::RuleCall(name) => self.rule_call(name, ctx.record),
            Command::RuleSetCall(names) => self.rule_set_call(names, ctx.record),
            Command::ProcedureCall(name) => {
                let procedure = self
                    .program
                    .get_procedure(name)
                    .expect("checked: procedure exists");
                self.command(&procedure.body, ctx)
            }
            Command::Sequence(commands) => self.sequence(commands, ctx),
            Command::If(condition, then_command, else_command) => {
                self.branch(condition, then_command, else_command, ctx, false)
            }
            Command::Try(condition, then_command, else_command) => {
                self.branch(condition, then_command, else_command, ctx, true)
            }
            Command::Loop(body) => self.alap(body, ctx),
            Command::Or(left, right) => {
                let left = self.command(left, ctx);
                let right = self.command(right, ctx);
                quote! {
                    if gp2rs::coin_flip() {
                        #left
                    } else {
                        #right
                    }
                }
            }
        }
    }

    /// A rule call: match, then apply. Predicate rules only observe the
    /// match result; rules with an empty left side always succeed.
    fn rule_call(&mut self, name: &str, record: bool) -> TokenStream {
        let rule = self.rule(name);
        let module = format_ident!("{}", rule.name);
        let match_fn = format_ident!("match_{}", rule.name);
        let apply_fn = format_ident!("apply_{}", rule.name);
        let morphism = morphism_ident(&rule.name);
        match (&rule.lhs, &rule.rhs) {
            (None, None) => quote! { result = true; },
            (None, Some(_)) => quote! {
                #module::#apply_fn(&mut engine, #record);
                result = true;
            },
            (Some(_), _) if rule.is_predicate => quote! {
                result = #module::#match_fn(&engine.host, &mut #morphism);
                if result {
                    #morphism.reset();
                }
            },
            (Some(_), _) => quote! {
                result = #module::#match_fn(&engine.host, &mut #morphism);
                if result {
                    #module::#apply_fn(&mut engine, &mut #morphism, #record);
                }
            },
        }
    }

    /// Match-only call used in condition position: the morphism is thrown
    /// away and the host untouched.
    fn predicate_call(&mut self, name: &str) -> TokenStream {
        let rule = self.rule(name);
        let module = format_ident!("{}", rule.name);
        let match_fn = format_ident!("match_{}", rule.name);
        let morphism = morphism_ident(&rule.name);
        match &rule.lhs {
            None => quote! { result = true; },
            Some(_) => quote! {
                result = #module::#match_fn(&engine.host, &mut #morphism);
                if result {
                    #morphism.reset();
                }
            },
        }
    }

    /// `{r1, r2, ...}`: attempt each rule in turn until one matches.
    fn rule_set_call(&mut self, names: &[String], record: bool) -> TokenStream {
        let mut tokens = quote! {};
        for name in names.iter().rev() {
            let call = self.rule_call(name, record);
            if tokens.is_empty() {
                tokens = call;
            } else {
                tokens = quote! {
                    #call
                    if !result {
                        #tokens
                    }
                };
            }
        }
        tokens
    }

    fn sequence(&mut self, commands: &[Command], ctx: &Context) -> TokenStream {
        if commands.is_empty() {
            return quote! { result = true; };
        }
        let label = self.fresh_label("seq");
        let mut body = TokenStream::new();
        for (position, command) in commands.iter().enumerate() {
            body.extend(self.command(command, ctx));
            if position + 1 < commands.len() {
                body.extend(quote! {
                    if !result {
                        break #label;
                    }
                });
            }
        }
        quote! {
            #label: {
                #body
            }
        }
    }

    /// `if`/`try` share a shape: run the condition in a rollback scope,
    /// then branch. `if` always restores the host; `try` keeps the edits
    /// of a successful condition. A single rule call needs no scope — for
    /// `if` it is run match-only, for `try` it applies directly.
    fn branch(
        &mut self,
        condition: &Command,
        then_command: &Command,
        else_command: &Command,
        ctx: &Context,
        keep_on_success: bool,
    ) -> TokenStream {
        let then_code = self.command(then_command, ctx);
        let else_code = self.command(else_command, ctx);
        if let Command::RuleCall(name) = condition {
            let condition_code = if keep_on_success {
                self.rule_call(name, ctx.record)
            } else {
                self.predicate_call(name)
            };
            return quote! {
                #condition_code
                if result {
                    #then_code
                } else {
                    #else_code
                }
            };
        }
        let mark = self.fresh_mark();
        let condition_ctx = Context {
            record: true,
            // A condition cannot break out of a loop around it.
            enclosing_loop: None,
        };
        let condition_code = self.command(condition, &condition_ctx);
        if keep_on_success {
            let commit = if ctx.record {
                quote! {}
            } else {
                quote! { engine.commit(#mark); }
            };
            quote! {
                let #mark = engine.mark();
                {
                    #condition_code
                }
                if result {
                    #commit
                    #then_code
                } else {
                    engine.rollback(#mark);
                    #else_code
                }
            }
        } else {
            quote! {
                let #mark = engine.mark();
                {
                    #condition_code
                }
                engine.rollback(#mark);
                if result {
                    #then_code
                } else {
                    #else_code
                }
            }
        }
    }

    /// `P!`: iterate until P fails; a failed iteration's partial edits are
    /// rolled back, and the loop itself always succeeds.
    fn alap(&mut self, body: &Command, ctx: &Context) -> TokenStream {
        let label = self.fresh_label("alap");
        if matches!(body, Command::RuleCall(_) | Command::RuleSetCall(_)) {
            // Single rule (set) bodies cannot fail halfway.
            let call = match body {
                Command::RuleCall(name) => self.rule_call(name, ctx.record),
                Command::RuleSetCall(names) => self.rule_set_call(names, ctx.record),
                _ => unreachable!(),
            };
            return quote! {
                #label: loop {
                    #call
                    if !result {
                        break #label;
                    }
                }
                result = true;
            };
        }
        let mark = self.fresh_mark();
        let commit = if ctx.record {
            quote! {}
        } else {
            quote! { engine.commit(#mark); }
        };
        let body_ctx = Context {
            record: true,
            enclosing_loop: Some(LoopContext {
                label: label.clone(),
                mark: Some((mark.clone(), !ctx.record)),
            }),
        };
        let body_code = self.command(body, &body_ctx);
        quote! {
            #label: loop {
                let #mark = engine.mark();
                {
                    #body_code
                }
                if !result {
                    engine.rollback(#mark);
                    break #label;
                }
                #commit
            }
            result = true;
        }
    }

    /// `break`: leave the innermost loop, keeping the current iteration's
    /// edits.
    fn break_out(&mut self, ctx: &Context) -> TokenStream {
        let enclosing = ctx
            .enclosing_loop
            .as_ref()
            .expect("checked: break inside a loop");
        let label = &enclosing.label;
        let commit = match &enclosing.mark {
            Some((mark, true)) => quote! { engine.commit(#mark); },
            _ => quote! {},
        };
        quote! {
            #commit
            result = true;
            break #label;
        }
    }

    fn rule(&self, name: &str) -> &'a Rule {
        self.rules
            .iter()
            .find(|rule| rule.name == name)
            .expect("checked: rule exists")
    }

    fn fresh_label(&mut self, kind: &str) -> syn::Lifetime {
        let label = syn::Lifetime::new(&format!("'{}{}", kind, self.labels), Span::call_site());
        self.labels += 1;
        label
    }

    fn fresh_mark(&mut self) -> Ident {
        let mark = format_ident!("mark_{}", self.marks);
        self.marks += 1;
        mark
    }
}

fn morphism_ident(rule: &str) -> Ident {
    format_ident!("m_{}", rule)
}

/// Rule declarations in source order, used to lay out the generated
/// crate's modules.
pub(crate) fn declared_rules(program: &Program) -> Vec<&gp2::ast::RuleDecl> {
    program
        .declarations
        .iter()
        .flat_map(|declaration| {
            let rules: &[gp2::ast::RuleDecl] = match declaration {
                Declaration::Rule(rule) => std::slice::from_ref(rule),
                Declaration::Procedure(procedure) => &procedure.rules,
                Declaration::Main(_) => &[],
            };
            rules.iter()
        })
        .collect()
}
