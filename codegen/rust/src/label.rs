// Copyright 2026 The GP2 Project Developers

//! Label code generation: matching a left label against a host label, and
//! evaluating a right label into a fresh atom list.
//!
//! Matching code assigns variables through the morphism as it walks the
//! host list; the caller unwinds those assignments if a later step fails.
//! Evaluation code reads variables from locals the applier (or the
//! condition generator's guards) has already bound, so the emitted
//! expressions are identical in both contexts.

use proc_macro2::{Ident, Literal, TokenStream};
use quote::{format_ident, quote};

use gp2::ast::{Mark, VarType};
use gp2::ir::{Atom, Rule, RuleLabel};

pub(crate) fn lit(value: usize) -> Literal {
    Literal::usize_unsuffixed(value)
}

pub(crate) fn int_lit(value: i64) -> Literal {
    Literal::i64_unsuffixed(value)
}

pub(crate) fn mark_tokens(mark: Mark) -> TokenStream {
    match mark {
        Mark::None => quote! { Mark::None },
        Mark::Red => quote! { Mark::Red },
        Mark::Green => quote! { Mark::Green },
        Mark::Blue => quote! { Mark::Blue },
        Mark::Grey => quote! { Mark::Grey },
        Mark::Dashed => quote! { Mark::Dashed },
        Mark::Any => quote! { Mark::Any },
    }
}

/// The local holding a variable's value, named after the variable.
pub(crate) fn var_local(rule: &Rule, id: usize) -> Ident {
    format_ident!("var_{}", rule.variables[id].name)
}

/// Emit the matcher for one left label:
/// `fn <name>(label, morphism, new_assignments) -> bool`.
pub(crate) fn label_matcher_fn(rule: &Rule, label: &RuleLabel, name: &Ident) -> TokenStream {
    let body = match label.list_variable {
        Some(position) => variable_list_body(rule, label, position),
        None => fixed_list_body(rule, label),
    };
    quote! {
        fn #name(label: &HostLabel, morphism: &mut Morphism, new_assignments: &mut usize) -> bool {
            #body
        }
    }
}

/// A fixed-length label: the host list must have exactly the label's
/// length, and each atom must match positionally.
fn fixed_list_body(rule: &Rule, label: &RuleLabel) -> TokenStream {
    let length = lit(label.atoms.len());
    if label.atoms.is_empty() {
        return quote! { label.length() == #length };
    }
    let checks = label
        .atoms
        .iter()
        .enumerate()
        .map(|(position, atom)| {
            let index = lit(position);
            atom_check(rule, atom, quote! { #index })
        })
        .collect::<Vec<_>>();
    quote! {
        if label.length() != #length {
            return false;
        }
        let atoms = label.atoms();
        #(#checks)*
        true
    }
}

/// A label with a list variable: the atoms before it match a prefix of
/// the host list, the atoms after it a suffix, and the remaining middle
/// segment is assigned to the variable. With at most one list variable
/// per label the split is unique.
fn variable_list_body(rule: &Rule, label: &RuleLabel, position: usize) -> TokenStream {
    let fixed = label.atoms.len() - 1;
    let fixed_lit = lit(fixed);
    let mut checks = Vec::new();
    for (offset, atom) in label.atoms.iter().enumerate().take(position) {
        let index = lit(offset);
        checks.push(atom_check(rule, atom, quote! { #index }));
    }
    for (offset, atom) in label.atoms.iter().enumerate().skip(position + 1) {
        let back = lit(label.atoms.len() - offset);
        checks.push(atom_check(rule, atom, quote! { atoms.len() - #back }));
    }
    let variable = match &label.atoms[position] {
        Atom::Var { id, .. } => lit(*id),
        _ => unreachable!("list variable position holds a variable"),
    };
    let prefix = lit(position);
    let suffix = lit(fixed - position);
    quote! {
        if label.length() < #fixed_lit {
            return false;
        }
        let atoms = label.atoms();
        #(#checks)*
        match morphism.add_list_assignment(#variable, &atoms[#prefix..atoms.len() - #suffix]) {
            -1 => return false,
            count => *new_assignments += count as usize,
        }
        true
    }
}

/// Match one left atom against the host atom at `index`.
fn atom_check(rule: &Rule, atom: &Atom, index: TokenStream) -> TokenStream {
    match atom {
        Atom::Int(value) => {
            let value = int_lit(*value);
            quote! {
                match &atoms[#index] {
                    HostAtom::Int(value) if *value == #value => {}
                    _ => return false,
                }
            }
        }
        Atom::Str(value) => {
            quote! {
                match &atoms[#index] {
                    HostAtom::Str(value) if value == #value => {}
                    _ => return false,
                }
            }
        }
        Atom::Var { id, vtype } => {
            let variable = lit(*id);
            match vtype {
                VarType::Int => quote! {
                    match &atoms[#index] {
                        HostAtom::Int(value) => {
                            match morphism.add_int_assignment(#variable, *value) {
                                -1 => return false,
                                count => *new_assignments += count as usize,
                            }
                        }
                        _ => return false,
                    }
                },
                VarType::Char => quote! {
                    match &atoms[#index] {
                        HostAtom::Str(value) if value.chars().count() == 1 => {
                            match morphism.add_string_assignment(#variable, value) {
                                -1 => return false,
                                count => *new_assignments += count as usize,
                            }
                        }
                        _ => return false,
                    }
                },
                VarType::String => quote! {
                    match &atoms[#index] {
                        HostAtom::Str(value) => {
                            match morphism.add_string_assignment(#variable, value) {
                                -1 => return false,
                                count => *new_assignments += count as usize,
                            }
                        }
                        _ => return false,
                    }
                },
                VarType::Atom => quote! {
                    match morphism.add_atom_assignment(#variable, &atoms[#index]) {
                        -1 => return false,
                        count => *new_assignments += count as usize,
                    }
                },
                VarType::List => {
                    unreachable!("list variables are matched by the segmented body")
                }
            }
        }
        _ => unreachable!("left labels contain only constants and variables"),
    }
}

/// Emit `let mut <list> = Vec...; <pushes>` evaluating a right label's
/// atom list into a vector of host atoms.
pub(crate) fn build_list(rule: &Rule, label: &RuleLabel, list: &Ident) -> TokenStream {
    let capacity = lit(label.atoms.len());
    let pushes = label
        .atoms
        .iter()
        .map(|atom| push_atom(rule, atom, list))
        .collect::<Vec<_>>();
    quote! {
        let mut #list: Vec<HostAtom> = Vec::with_capacity(#capacity);
        #(#pushes)*
    }
}

/// Append one evaluated atom (or spliced list) to `list`.
pub(crate) fn push_atom(rule: &Rule, atom: &Atom, list: &Ident) -> TokenStream {
    if let Atom::Var { id, vtype } = atom {
        let local = var_local(rule, *id);
        match vtype {
            VarType::List => {
                return quote! { #list.extend(#local.iter().cloned()); };
            }
            VarType::Atom => {
                return quote! {
                    match &#local {
                        Value::Int(value) => #list.push(HostAtom::Int(*value)),
                        Value::Str(value) => #list.push(HostAtom::Str(value.clone())),
                        Value::List(atoms) => #list.extend(atoms.iter().cloned()),
                    }
                };
            }
            _ => {}
        }
    }
    if is_string_atom(atom) {
        let expression = string_expr(rule, atom);
        quote! { #list.push(HostAtom::Str(#expression)); }
    } else {
        let expression = int_expr(rule, atom);
        quote! { #list.push(HostAtom::Int(#expression)); }
    }
}

pub(crate) fn is_string_atom(atom: &Atom) -> bool {
    matches!(
        atom,
        Atom::Str(_)
            | Atom::Concat(_, _)
            | Atom::Var {
                vtype: VarType::Char | VarType::String,
                ..
            }
    )
}

/// An `i64`-valued expression over bound locals.
pub(crate) fn int_expr(rule: &Rule, atom: &Atom) -> TokenStream {
    match atom {
        Atom::Int(value) => {
            let value = int_lit(*value);
            quote! { #value }
        }
        Atom::Var { id, vtype } => {
            let local = var_local(rule, *id);
            match vtype {
                VarType::Int => quote! { #local },
                _ => unreachable!("checked: arithmetic over integer variables"),
            }
        }
        Atom::Neg(inner) => {
            let inner = int_expr(rule, inner);
            quote! { (-(#inner)) }
        }
        Atom::Add(left, right) => {
            let (left, right) = (int_expr(rule, left), int_expr(rule, right));
            quote! { (#left + #right) }
        }
        Atom::Sub(left, right) => {
            let (left, right) = (int_expr(rule, left), int_expr(rule, right));
            quote! { (#left - #right) }
        }
        Atom::Mul(left, right) => {
            let (left, right) = (int_expr(rule, left), int_expr(rule, right));
            quote! { (#left * #right) }
        }
        Atom::Div(left, right) => {
            let (left, right) = (int_expr(rule, left), int_expr(rule, right));
            quote! { gp2rs::div(#left, #right) }
        }
        Atom::Indeg(node) => {
            let local = format_ident!("indeg_{}", node);
            quote! { #local }
        }
        Atom::Outdeg(node) => {
            let local = format_ident!("outdeg_{}", node);
            quote! { #local }
        }
        Atom::Length { id, vtype } => {
            let local = var_local(rule, *id);
            match vtype {
                VarType::List => quote! { (#local.len() as i64) },
                VarType::Char | VarType::String => {
                    quote! { (#local.chars().count() as i64) }
                }
                VarType::Atom => quote! { #local.length() },
                VarType::Int => unreachable!("checked: length is not defined on integers"),
            }
        }
        Atom::Str(_) | Atom::Concat(_, _) => {
            unreachable!("checked: string atom in integer position")
        }
    }
}

/// A `String`-valued expression over bound locals.
pub(crate) fn string_expr(rule: &Rule, atom: &Atom) -> TokenStream {
    match atom {
        Atom::Str(value) => quote! { #value.to_owned() },
        Atom::Var { id, vtype } => {
            let local = var_local(rule, *id);
            match vtype {
                VarType::Char | VarType::String => quote! { #local.clone() },
                _ => unreachable!("checked: concatenation over string variables"),
            }
        }
        Atom::Concat(left, right) => {
            let (left, right) = (string_expr(rule, left), string_expr(rule, right));
            quote! { format!("{}{}", #left, #right) }
        }
        _ => unreachable!("checked: integer atom in string position"),
    }
}
