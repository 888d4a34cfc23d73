// Copyright 2026 The GP2 Project Developers

//! Condition code generation.
//!
//! A rule's condition is decomposed (by the IR transform) into numbered
//! predicates over a boolean skeleton. The generated module holds the
//! predicate booleans in a `CondState` struct, one evaluator function per
//! predicate, and a condition evaluator folding the skeleton. Evaluators
//! are partial: when an input variable or node image is not bound yet they
//! return without touching the boolean, leaving its optimistic default in
//! place, so the matcher can check the condition after every assignment
//! without ever rejecting a completable match.

use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

use gp2::ast::VarType;
use gp2::ir::{Atom, BoolExp, CmpOp, Condition, Predicate, PredicateKind, Rule, RuleLabel};

use crate::label::{build_list, int_expr, lit, mark_tokens, var_local};

pub(crate) struct ConditionGenerator<'a> {
    rule: &'a Rule,
    condition: &'a Condition,
}

/// The optimistic initial value of a predicate's boolean: the value under
/// which the condition, all else unknown, can still hold.
pub(crate) fn default_value(predicate: &Predicate) -> bool {
    !predicate.negated
}

pub(crate) fn predicate_boolean(id: usize) -> Ident {
    format_ident!("b{}", id)
}

pub(crate) fn evaluator_name(id: usize) -> Ident {
    format_ident!("evaluate_predicate{}", id)
}

impl<'a> ConditionGenerator<'a> {
    pub(crate) fn new(rule: &'a Rule, condition: &'a Condition) -> Self {
        Self { rule, condition }
    }

    pub(crate) fn generate(&self) -> TokenStream {
        let mut tokens = self.state_struct();
        for predicate in &self.condition.predicates {
            tokens.extend(self.evaluator(predicate));
        }
        tokens.extend(self.condition_evaluator());
        tokens
    }

    fn state_struct(&self) -> TokenStream {
        let fields = self.condition.predicates.iter().map(|predicate| {
            let name = predicate_boolean(predicate.id);
            quote! { #name: bool }
        });
        let initial = self.condition.predicates.iter().map(|predicate| {
            let name = predicate_boolean(predicate.id);
            let value = default_value(predicate);
            quote! { #name: #value }
        });
        quote! {
            struct CondState {
                #(#fields),*
            }

            impl CondState {
                fn new() -> CondState {
                    CondState {
                        #(#initial),*
                    }
                }
            }
        }
    }

    fn evaluator(&self, predicate: &Predicate) -> TokenStream {
        let name = evaluator_name(predicate.id);
        let boolean = predicate_boolean(predicate.id);
        let body = match &predicate.kind {
            PredicateKind::IntCheck(variable) => {
                let variable = lit(*variable);
                quote! {
                    let Some(value) = morphism.value(#variable) else { return; };
                    state.#boolean = matches!(value, Value::Int(_));
                }
            }
            PredicateKind::CharCheck(variable) => {
                let variable = lit(*variable);
                quote! {
                    let Some(value) = morphism.value(#variable) else { return; };
                    state.#boolean = matches!(value, Value::Str(text) if text.chars().count() == 1);
                }
            }
            PredicateKind::StringCheck(variable) => {
                let variable = lit(*variable);
                quote! {
                    let Some(value) = morphism.value(#variable) else { return; };
                    state.#boolean = matches!(value, Value::Str(_));
                }
            }
            PredicateKind::AtomCheck(variable) => {
                let variable = lit(*variable);
                quote! {
                    let Some(value) = morphism.value(#variable) else { return; };
                    state.#boolean = matches!(value, Value::Int(_) | Value::Str(_));
                }
            }
            PredicateKind::Edge {
                source,
                target,
                label,
            } => self.edge_body(&boolean, *source, *target, label.as_ref()),
            PredicateKind::Eq { left, right } => self.list_eq_body(&boolean, left, right, false),
            PredicateKind::Neq { left, right } => self.list_eq_body(&boolean, left, right, true),
            PredicateKind::Cmp { left, right, op } => {
                let guards = self.guards_for(&[left.clone(), right.clone()]);
                let left = int_expr(self.rule, left);
                let right = int_expr(self.rule, right);
                let operator = match op {
                    CmpOp::Gt => quote! { > },
                    CmpOp::Geq => quote! { >= },
                    CmpOp::Lt => quote! { < },
                    CmpOp::Leq => quote! { <= },
                };
                quote! {
                    #guards
                    state.#boolean = #left #operator #right;
                }
            }
        };
        quote! {
            fn #name(host: &HostGraph, morphism: &Morphism, state: &mut CondState) {
                #body
            }
        }
    }

    fn edge_body(
        &self,
        boolean: &Ident,
        source: usize,
        target: usize,
        label: Option<&RuleLabel>,
    ) -> TokenStream {
        let source = lit(source);
        let target = lit(target);
        let (label_setup, label_check) = match label {
            Some(label) => {
                let guards = self.guards_for(&label.atoms);
                let expected = format_ident!("expected");
                let build = build_list(self.rule, label, &expected);
                let mark = mark_tokens(label.mark);
                let mark_check = if label.mark == gp2::ast::Mark::Any {
                    quote! {}
                } else {
                    quote! {
                        if edge.label.mark != #mark {
                            continue;
                        }
                    }
                };
                (
                    quote! {
                        #guards
                        #build
                    },
                    quote! {
                        #mark_check
                        if edge.label.atoms() != expected.as_slice() {
                            continue;
                        }
                    },
                )
            }
            None => (quote! {}, quote! {}),
        };
        quote! {
            let (Some(source), Some(target)) =
                (morphism.node_image(#source), morphism.node_image(#target))
            else {
                return;
            };
            #label_setup
            let mut found = false;
            for &edge_index in host.node_ref(source).out_edges().iter().rev() {
                let edge = host.edge_ref(edge_index);
                if edge.target != target {
                    continue;
                }
                #label_check
                found = true;
                break;
            }
            state.#boolean = found;
        }
    }

    fn list_eq_body(
        &self,
        boolean: &Ident,
        left: &[Atom],
        right: &[Atom],
        negated: bool,
    ) -> TokenStream {
        let mut all = left.to_vec();
        all.extend(right.iter().cloned());
        let guards = self.guards_for(&all);
        let left_ident = format_ident!("left");
        let right_ident = format_ident!("right");
        let left_label = RuleLabel {
            mark: gp2::ast::Mark::None,
            atoms: left.to_vec(),
            list_variable: None,
        };
        let right_label = RuleLabel {
            mark: gp2::ast::Mark::None,
            atoms: right.to_vec(),
            list_variable: None,
        };
        let build_left = build_list(self.rule, &left_label, &left_ident);
        let build_right = build_list(self.rule, &right_label, &right_ident);
        let comparison = if negated {
            quote! { left != right }
        } else {
            quote! { left == right }
        };
        quote! {
            #guards
            #build_left
            #build_right
            state.#boolean = #comparison;
        }
    }

    /// Bind every variable and degree the given atoms read, returning from
    /// the evaluator when one is not available yet. The locals produced
    /// here have the same names and types as the applier's, so the shared
    /// expression emitters work unchanged.
    fn guards_for(&self, atoms: &[Atom]) -> TokenStream {
        let mut variables = Vec::new();
        let mut degrees = Vec::new();
        for atom in atoms {
            atom.variables(&mut variables);
            atom.degree_nodes(&mut degrees);
        }
        variables.sort_unstable();
        variables.dedup();
        degrees.sort_unstable();
        degrees.dedup();

        let mut guards = TokenStream::new();
        for id in variables {
            let local = var_local(self.rule, id);
            let variable = lit(id);
            guards.extend(match self.rule.variables[id].vtype {
                VarType::Int => quote! {
                    let Some(&Value::Int(#local)) = morphism.value(#variable) else { return; };
                },
                VarType::Char | VarType::String => quote! {
                    let Some(Value::Str(#local)) = morphism.value(#variable) else { return; };
                    let #local = #local.clone();
                },
                VarType::List => quote! {
                    let Some(Value::List(#local)) = morphism.value(#variable) else { return; };
                    let #local = #local.clone();
                },
                VarType::Atom => quote! {
                    let Some(#local) = morphism.value(#variable) else { return; };
                    let #local = #local.clone();
                },
            });
        }
        let mut node_guarded = Vec::new();
        for (node, indegree) in degrees {
            let node_index = format_ident!("node_index_{}", node);
            if !node_guarded.contains(&node) {
                let index = lit(node);
                guards.extend(quote! {
                    let Some(#node_index) = morphism.node_image(#index) else { return; };
                });
                node_guarded.push(node);
            }
            let local = if indegree {
                format_ident!("indeg_{}", node)
            } else {
                format_ident!("outdeg_{}", node)
            };
            let degree = if indegree {
                quote! { indegree }
            } else {
                quote! { outdegree }
            };
            guards.extend(quote! {
                let #local = host.node_ref(#node_index).#degree() as i64;
            });
        }
        guards
    }

    fn condition_evaluator(&self) -> TokenStream {
        let expression = bool_expr(&self.condition.skeleton);
        quote! {
            fn evaluate_condition(state: &CondState) -> bool {
                #expression
            }
        }
    }
}

fn bool_expr(skeleton: &BoolExp) -> TokenStream {
    match skeleton {
        BoolExp::Pred(id) => {
            let boolean = predicate_boolean(*id);
            quote! { state.#boolean }
        }
        BoolExp::Not(inner) => {
            let inner = bool_expr(inner);
            quote! { (!#inner) }
        }
        BoolExp::And(left, right) => {
            let (left, right) = (bool_expr(left), bool_expr(right));
            quote! { (#left && #right) }
        }
        BoolExp::Or(left, right) => {
            let (left, right) = (bool_expr(left), bool_expr(right));
            quote! { (#left || #right) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gp2::ast::{AtomExp, CondExp, GraphDecl, LabelDecl, NodeDecl, RuleDecl, VarDecl};
    use gp2::ir;

    fn compile(condition: CondExp) -> Rule {
        let decl = RuleDecl {
            name: "guarded".into(),
            variables: vec![VarDecl {
                name: "x".into(),
                vtype: VarType::Int,
            }],
            lhs: GraphDecl {
                nodes: vec![
                    NodeDecl {
                        id: "a".into(),
                        root: false,
                        label: LabelDecl {
                            mark: gp2::ast::Mark::None,
                            list: vec![AtomExp::Var("x".into())],
                        },
                    },
                    NodeDecl {
                        id: "b".into(),
                        root: false,
                        label: LabelDecl::default(),
                    },
                ],
                edges: Vec::new(),
            },
            rhs: GraphDecl::default(),
            interface: Vec::new(),
            condition: Some(condition),
        };
        ir::transform(&decl)
    }

    fn flat(tokens: &TokenStream) -> String {
        tokens.to_string().replace(' ', "")
    }

    #[test]
    fn comparison_guards_and_evaluates() {
        let rule = compile(CondExp::Gt(AtomExp::Var("x".into()), AtomExp::Int(0)));
        let condition = rule.condition.as_ref().unwrap();
        let code = flat(&ConditionGenerator::new(&rule, condition).generate());
        assert!(code.contains("structCondState{b0:bool}"));
        assert!(code.contains("b0:true"));
        assert!(code.contains("letSome(&Value::Int(var_x))=morphism.value(0)else{return;};"));
        assert!(code.contains("state.b0=var_x>0;"));
        assert!(code.contains("fnevaluate_condition(state:&CondState)->bool{state.b0}"));
    }

    #[test]
    fn negated_predicates_default_pessimistically() {
        let rule = compile(CondExp::Not(Box::new(CondExp::Int("x".into()))));
        let condition = rule.condition.as_ref().unwrap();
        assert!(condition.predicates[0].negated);
        let code = flat(&ConditionGenerator::new(&rule, condition).generate());
        assert!(code.contains("b0:false"));
        assert!(code.contains("(!state.b0)"));
    }

    #[test]
    fn edge_predicate_scans_the_source_image() {
        let rule = compile(CondExp::Edge {
            source: "a".into(),
            target: "b".into(),
            label: None,
        });
        let condition = rule.condition.as_ref().unwrap();
        let code = flat(&ConditionGenerator::new(&rule, condition).generate());
        assert!(code.contains("morphism.node_image(0)"));
        assert!(code.contains("morphism.node_image(1)"));
        assert!(code.contains("out_edges().iter().rev()"));
        assert!(code.contains("state.b0=found;"));
    }

    #[test]
    fn degree_operands_guard_the_node_image() {
        let rule = compile(CondExp::Lt(AtomExp::Indeg("a".into()), AtomExp::Int(2)));
        let condition = rule.condition.as_ref().unwrap();
        let code = flat(&ConditionGenerator::new(&rule, condition).generate());
        assert!(code.contains("letSome(node_index_0)=morphism.node_image(0)else{return;};"));
        assert!(code.contains("letindeg_0=host.node_ref(node_index_0).indegree()asi64;"));
        assert!(code.contains("state.b0=indeg_0<2;"));
    }
}
