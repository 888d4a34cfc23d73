// Copyright 2026 The GP2 Project Developers

//! Matcher synthesis.
//!
//! From a rule's search plan this generator emits one matching function
//! per search operation. Each function enumerates its candidate host
//! items, filters them (injectivity, mark, degrees), matches the label
//! while assigning variables, re-evaluates any predicates the new
//! bindings feed, and tail-calls the next operation's matcher. Failure
//! unwinds the assignments and the morphism entry and moves to the next
//! candidate, so the call tree performs a depth-first search over partial
//! morphisms with explicit restore on every pop.

use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

use gp2::ast::Mark;
use gp2::ir::{Rule, RuleEdge, RuleGraph, RuleNode};
use gp2::searchplan::{self, OpKind, SearchOp, SearchPlan};

use crate::condition::{default_value, evaluator_name, predicate_boolean};
use crate::label::{label_matcher_fn, lit, mark_tokens};

pub(crate) struct MatcherGenerator<'a> {
    rule: &'a Rule,
    lhs: &'a RuleGraph,
    plan: SearchPlan,
}

impl<'a> MatcherGenerator<'a> {
    pub(crate) fn new(rule: &'a Rule) -> Self {
        let lhs = rule.lhs.as_ref().expect("matcher needs a left graph");
        let plan = searchplan::generate(lhs);
        Self { rule, lhs, plan }
    }

    pub(crate) fn generate(&self) -> TokenStream {
        let mut tokens = self.constants();
        tokens.extend(self.label_matchers());
        tokens.extend(self.entry());
        for (position, op) in self.plan.ops.iter().enumerate() {
            let next = self.plan.ops.get(position + 1);
            tokens.extend(match op.kind {
                OpKind::RootNode | OpKind::Node => self.isolated_node_matcher(op, next),
                OpKind::NodeFromInEdge | OpKind::NodeFromOutEdge | OpKind::NodeFromBiEdge => {
                    self.node_from_edge_matcher(op, next)
                }
                OpKind::Edge => self.isolated_edge_matcher(op, next),
                OpKind::EdgeFromSource | OpKind::EdgeFromTarget => {
                    self.edge_from_node_matcher(op, next)
                }
                OpKind::Loop => self.loop_edge_matcher(op, next),
            });
        }
        tokens
    }

    fn has_condition(&self) -> bool {
        self.rule.condition.is_some()
    }

    fn state_param(&self) -> TokenStream {
        if self.has_condition() {
            quote! { , state: &mut CondState }
        } else {
            quote! {}
        }
    }

    fn state_arg(&self) -> TokenStream {
        if self.has_condition() {
            quote! { , state }
        } else {
            quote! {}
        }
    }

    fn constants(&self) -> TokenStream {
        let nodes = lit(self.lhs.nodes.len());
        let edges = lit(self.lhs.edges.len());
        let variables = lit(self.rule.variables.len());
        quote! {
            pub const LEFT_NODES: usize = #nodes;
            pub const LEFT_EDGES: usize = #edges;
            const VARIABLES: usize = #variables;

            pub fn create_morphism() -> Morphism {
                Morphism::new(LEFT_NODES, LEFT_EDGES, VARIABLES)
            }
        }
    }

    fn label_matchers(&self) -> TokenStream {
        let mut tokens = TokenStream::new();
        for node in &self.lhs.nodes {
            let name = label_fn_name(true, node.index);
            tokens.extend(label_matcher_fn(self.rule, &node.label, &name));
        }
        for edge in &self.lhs.edges {
            let name = label_fn_name(false, edge.index);
            tokens.extend(label_matcher_fn(self.rule, &edge.label, &name));
        }
        tokens
    }

    /// The outer matcher: early size check, fresh condition state, first
    /// search operation; a failed search leaves the morphism clean.
    fn entry(&self) -> TokenStream {
        let name = format_ident!("match_{}", self.rule.name);
        let first = &self.plan.ops[0];
        let first_name = matcher_fn_name(first);
        let state_arg = if self.has_condition() {
            quote! { , &mut state }
        } else {
            quote! {}
        };
        let state_init = if self.has_condition() {
            quote! { let mut state = CondState::new(); }
        } else {
            quote! {}
        };
        let free_predicates = self.free_predicate_check();
        quote! {
            pub fn #name(host: &HostGraph, morphism: &mut Morphism) -> bool {
                if LEFT_NODES > host.number_of_nodes() || LEFT_EDGES > host.number_of_edges() {
                    return false;
                }
                #state_init
                #free_predicates
                if #first_name(host, morphism #state_arg) {
                    true
                } else {
                    morphism.reset();
                    false
                }
            }
        }
    }

    /// Predicates with no binding site (constant comparisons) are decided
    /// before the search starts; a condition already false then can never
    /// become true.
    fn free_predicate_check(&self) -> TokenStream {
        let Some(condition) = &self.rule.condition else {
            return quote! {};
        };
        let mut attached = vec![false; condition.predicates.len()];
        for node in &self.lhs.nodes {
            for &id in &node.predicates {
                attached[id] = true;
            }
        }
        for edge in &self.lhs.edges {
            for &id in &edge.predicates {
                attached[id] = true;
            }
        }
        let free: Vec<_> = condition
            .predicates
            .iter()
            .filter(|predicate| !attached[predicate.id])
            .map(|predicate| evaluator_name(predicate.id))
            .collect();
        if free.is_empty() {
            return quote! {};
        }
        quote! {
            #(#free(host, morphism, &mut state);)*
            if !evaluate_condition(&state) {
                return false;
            }
        }
    }

    /// Mark, degree, and injectivity checks shared by every way a node
    /// operation can reach a candidate.
    fn node_filter(&self, node: &RuleNode) -> TokenStream {
        let name = filter_fn_name(node.index);
        let mark_check = if node.label.mark == Mark::Any {
            quote! {}
        } else {
            let mark = mark_tokens(node.label.mark);
            quote! {
                if node.label.mark != #mark {
                    return false;
                }
            }
        };
        let indegree = lit(node.indegree);
        let outdegree = lit(node.outdegree);
        let bidegree = lit(node.bidegree);
        // A deleted node pins its host degrees exactly, which is what
        // keeps rule application from creating dangling edges.
        let degree_check = if node.is_deleted() {
            quote! { node.has_degrees_exactly(#indegree, #outdegree, #bidegree) }
        } else {
            quote! { node.has_degrees_at_least(#indegree, #outdegree, #bidegree) }
        };
        quote! {
            fn #name(morphism: &Morphism, node: &Node) -> bool {
                #mark_check
                if !#degree_check {
                    return false;
                }
                if morphism.is_matched_node(node.index) {
                    return false;
                }
                true
            }
        }
    }

    fn isolated_node_matcher(&self, op: &SearchOp, next: Option<&SearchOp>) -> TokenStream {
        let node = &self.lhs.nodes[op.index];
        let filter = self.node_filter(node);
        let name = matcher_fn_name(op);
        let filter_name = filter_fn_name(op.index);
        let label_fn = label_fn_name(true, op.index);
        let state_param = self.state_param();
        let candidates = match op.kind {
            OpKind::RootNode => quote! { host.root_indices() },
            _ => quote! { host.node_indices() },
        };
        let result = self.node_result(node, next);
        quote! {
            #filter

            fn #name(host: &HostGraph, morphism: &mut Morphism #state_param) -> bool {
                for host_index in #candidates {
                    let node = host.node_ref(host_index);
                    if !#filter_name(morphism, node) {
                        continue;
                    }
                    let mut new_assignments = 0usize;
                    if !#label_fn(&node.label, morphism, &mut new_assignments) {
                        morphism.remove_assignments(new_assignments);
                        continue;
                    }
                    #result
                }
                false
            }
        }
    }

    /// Matching a node supplied by the preceding edge operation. A
    /// bidirectional edge retries the opposite endpoint when the first
    /// fails the cheap filters.
    fn node_from_edge_matcher(&self, op: &SearchOp, next: Option<&SearchOp>) -> TokenStream {
        let node = &self.lhs.nodes[op.index];
        let filter = self.node_filter(node);
        let name = matcher_fn_name(op);
        let filter_name = filter_fn_name(op.index);
        let label_fn = label_fn_name(true, op.index);
        let state_param = self.state_param();
        let primary = match op.kind {
            OpKind::NodeFromOutEdge => quote! { host_edge.source },
            _ => quote! { host_edge.target },
        };
        let binding = if op.kind == OpKind::NodeFromBiEdge {
            let secondary = quote! { host_edge.source };
            quote! {
                let mut node = host.node_ref(#primary);
                if !#filter_name(morphism, node) {
                    node = host.node_ref(#secondary);
                    if !#filter_name(morphism, node) {
                        return false;
                    }
                }
            }
        } else {
            quote! {
                let node = host.node_ref(#primary);
                if !#filter_name(morphism, node) {
                    return false;
                }
            }
        };
        let result = self.node_result(node, next);
        quote! {
            #filter

            fn #name(host: &HostGraph, morphism: &mut Morphism #state_param, host_edge: &Edge) -> bool {
                #binding
                let host_index = node.index;
                let mut new_assignments = 0usize;
                if !#label_fn(&node.label, morphism, &mut new_assignments) {
                    morphism.remove_assignments(new_assignments);
                    return false;
                }
                #result
                false
            }
        }
    }

    fn isolated_edge_matcher(&self, op: &SearchOp, next: Option<&SearchOp>) -> TokenStream {
        let edge = &self.lhs.edges[op.index];
        let name = matcher_fn_name(op);
        let state_param = self.state_param();
        let mark_check = edge_mark_check(edge);
        let label_and_result = self.edge_label_and_result(edge, next, quote! { continue });
        quote! {
            fn #name(host: &HostGraph, morphism: &mut Morphism #state_param) -> bool {
                for edge_index in host.edge_indices() {
                    let edge = host.edge_ref(edge_index);
                    #mark_check
                    if morphism.is_matched_edge(edge_index) {
                        continue;
                    }
                    #label_and_result
                }
                false
            }
        }
    }

    fn loop_edge_matcher(&self, op: &SearchOp, next: Option<&SearchOp>) -> TokenStream {
        let edge = &self.lhs.edges[op.index];
        let name = matcher_fn_name(op);
        let state_param = self.state_param();
        let node_index = lit(edge.source);
        let mark_check = edge_mark_check(edge);
        let label_and_result = self.edge_label_and_result(edge, next, quote! { continue });
        quote! {
            fn #name(host: &HostGraph, morphism: &mut Morphism #state_param) -> bool {
                let node_index = match morphism.node_image(#node_index) {
                    Some(index) => index,
                    None => return false,
                };
                let node = host.node_ref(node_index);
                for &edge_index in node.out_edges().iter().rev() {
                    let edge = host.edge_ref(edge_index);
                    if !edge.is_loop() {
                        continue;
                    }
                    #mark_check
                    if morphism.is_matched_edge(edge_index) {
                        continue;
                    }
                    #label_and_result
                }
                false
            }
        }
    }

    /// Matching an edge from an already-matched endpoint. The start node
    /// is fixed by the operation; the far endpoint either agrees with its
    /// existing image or must still be unmatched. A bidirectional edge
    /// gets a second pass over the opposite incidence chain.
    fn edge_from_node_matcher(&self, op: &SearchOp, next: Option<&SearchOp>) -> TokenStream {
        let edge = &self.lhs.edges[op.index];
        let name = matcher_fn_name(op);
        let state_param = self.state_param();
        let from_source = op.kind == OpKind::EdgeFromSource;
        let (start, end) = if from_source {
            (edge.source, edge.target)
        } else {
            (edge.target, edge.source)
        };
        let start = lit(start);
        let end = lit(end);
        let first_pass = self.edge_pass(edge, next, from_source);
        let second_pass = if edge.bidirectional {
            self.edge_pass(edge, next, !from_source)
        } else {
            quote! {}
        };
        quote! {
            fn #name(host: &HostGraph, morphism: &mut Morphism #state_param) -> bool {
                let start = match morphism.node_image(#start) {
                    Some(index) => index,
                    None => return false,
                };
                let end = morphism.node_image(#end);
                let node = host.node_ref(start);
                #first_pass
                #second_pass
                false
            }
        }
    }

    /// One scan of an incidence chain. `outgoing` selects the chain and
    /// which endpoint of the candidate edge must line up with `end`.
    fn edge_pass(&self, edge: &RuleEdge, next: Option<&SearchOp>, outgoing: bool) -> TokenStream {
        let chain = if outgoing {
            quote! { node.out_edges() }
        } else {
            quote! { node.in_edges() }
        };
        let far = if outgoing {
            quote! { edge.target }
        } else {
            quote! { edge.source }
        };
        let mark_check = edge_mark_check(edge);
        let label_and_result = self.edge_label_and_result(edge, next, quote! { continue });
        quote! {
            for &edge_index in #chain.iter().rev() {
                let edge = host.edge_ref(edge_index);
                if edge.is_loop() {
                    continue;
                }
                #mark_check
                if morphism.is_matched_edge(edge_index) {
                    continue;
                }
                match end {
                    Some(index) => {
                        if #far != index {
                            continue;
                        }
                    }
                    None => {
                        if morphism.is_matched_node(#far) {
                            continue;
                        }
                    }
                }
                #label_and_result
            }
        }
    }

    fn edge_label_and_result(
        &self,
        edge: &RuleEdge,
        next: Option<&SearchOp>,
        on_label_failure: TokenStream,
    ) -> TokenStream {
        let label_fn = label_fn_name(false, edge.index);
        let result = self.edge_result(edge, next);
        quote! {
            let mut new_assignments = 0usize;
            if !#label_fn(&edge.label, morphism, &mut new_assignments) {
                morphism.remove_assignments(new_assignments);
                #on_label_failure;
            }
            #result
        }
    }

    /// Commit a node to the morphism, re-evaluate its predicates, recurse,
    /// and restore on failure.
    fn node_result(&self, node: &RuleNode, next: Option<&SearchOp>) -> TokenStream {
        let index = lit(node.index);
        let commit = quote! {
            morphism.add_node_image(#index, host_index, new_assignments);
        };
        let restore = quote! {
            morphism.remove_node_image(#index);
        };
        self.result_code(commit, restore, &node.predicates, next)
    }

    fn edge_result(&self, edge: &RuleEdge, next: Option<&SearchOp>) -> TokenStream {
        let index = lit(edge.index);
        let commit = quote! {
            morphism.add_edge_image(#index, edge_index, new_assignments);
        };
        let restore = quote! {
            morphism.remove_edge_image(#index);
        };
        self.result_code(commit, restore, &edge.predicates, next)
    }

    fn result_code(
        &self,
        commit: TokenStream,
        restore: TokenStream,
        predicates: &[usize],
        next: Option<&SearchOp>,
    ) -> TokenStream {
        let next_call = next.map(|op| self.call_next(op));
        if predicates.is_empty() || !self.has_condition() {
            return match next_call {
                Some(call) => quote! {
                    #commit
                    if #call {
                        return true;
                    }
                    #restore
                },
                None => quote! {
                    #commit
                    return true;
                },
            };
        }
        let condition = self.rule.condition.as_ref().expect("predicates imply a condition");
        let evaluators = predicates.iter().map(|&id| {
            let name = evaluator_name(id);
            quote! { #name(host, morphism, state); }
        });
        let resets = predicates.iter().map(|&id| {
            let boolean = predicate_boolean(id);
            let value = default_value(&condition.predicates[id]);
            quote! { state.#boolean = #value; }
        });
        let success = match next_call {
            Some(call) => quote! { evaluate_condition(state) && #call },
            None => quote! { evaluate_condition(state) },
        };
        quote! {
            #commit
            #(#evaluators)*
            if #success {
                return true;
            }
            #(#resets)*
            #restore
        }
    }

    fn call_next(&self, op: &SearchOp) -> TokenStream {
        let name = matcher_fn_name(op);
        let state_arg = self.state_arg();
        match op.kind {
            OpKind::NodeFromInEdge | OpKind::NodeFromOutEdge | OpKind::NodeFromBiEdge => {
                quote! { #name(host, morphism #state_arg, edge) }
            }
            _ => quote! { #name(host, morphism #state_arg) },
        }
    }
}

pub(crate) fn matcher_fn_name(op: &SearchOp) -> Ident {
    if op.kind.is_node() {
        format_ident!("match_n{}", op.index)
    } else {
        format_ident!("match_e{}", op.index)
    }
}

fn filter_fn_name(index: usize) -> Ident {
    format_ident!("filter_n{}", index)
}

pub(crate) fn label_fn_name(node: bool, index: usize) -> Ident {
    if node {
        format_ident!("match_label_n{}", index)
    } else {
        format_ident!("match_label_e{}", index)
    }
}

fn edge_mark_check(edge: &RuleEdge) -> TokenStream {
    if edge.label.mark == Mark::Any {
        quote! {}
    } else {
        let mark = mark_tokens(edge.label.mark);
        quote! {
            if edge.label.mark != #mark {
                continue;
            }
        }
    }
}
