// Copyright 2026 The GP2 Project Developers

//! Applier synthesis.
//!
//! The generated apply procedure mutates the host in a fixed order:
//! variables and degrees are read out first (later steps delete the nodes
//! those reads depend on), then edges are deleted or relabelled, then
//! nodes, then added nodes, then added edges (whose endpoints may be the
//! nodes just added). Every mutation goes through the engine, which
//! records an undo step when the caller asked for one. The morphism is
//! reset at the end, ready for the rule's next match.

use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

use gp2::ast::VarType;
use gp2::ir::{Rule, RuleGraph, RuleLabel};

use crate::label::{build_list, lit, mark_tokens, var_local};

pub(crate) struct ApplierGenerator<'a> {
    rule: &'a Rule,
}

impl<'a> ApplierGenerator<'a> {
    pub(crate) fn new(rule: &'a Rule) -> Self {
        Self { rule }
    }

    pub(crate) fn generate(&self) -> TokenStream {
        let name = format_ident!("apply_{}", self.rule.name);
        match (&self.rule.lhs, &self.rule.rhs) {
            (Some(_), Some(_)) => self.general(&name),
            (Some(_), None) => self.remove_left(&name),
            (None, Some(rhs)) => self.add_right(&name, rhs),
            (None, None) => quote! {},
        }
    }

    /// Delete everything the rule matched.
    fn remove_left(&self, name: &Ident) -> TokenStream {
        quote! {
            pub fn #name(engine: &mut Engine, morphism: &mut Morphism, record_changes: bool) {
                for index in 0..LEFT_EDGES {
                    engine.remove_edge(morphism.mapped_edge(index), record_changes);
                }
                for index in 0..LEFT_NODES {
                    engine.remove_node(morphism.mapped_node(index), record_changes);
                }
                morphism.reset();
            }
        }
    }

    /// Nothing matched; only additions.
    fn add_right(&self, name: &Ident, rhs: &RuleGraph) -> TokenStream {
        let map_setup = self.node_map_setup(rhs);
        let added_nodes = self.added_nodes(rhs);
        let added_edges = self.added_edges(rhs);
        quote! {
            pub fn #name(engine: &mut Engine, record_changes: bool) {
                #map_setup
                #(#added_nodes)*
                #(#added_edges)*
            }
        }
    }

    fn general(&self, name: &Ident) -> TokenStream {
        let lhs = self.rule.lhs.as_ref().expect("general applier has both sides");
        let rhs = self.rule.rhs.as_ref().expect("general applier has both sides");

        let variable_reads = self.variable_reads();
        let degree_reads = self.degree_reads(lhs);

        let mut edge_steps = Vec::new();
        for edge in &lhs.edges {
            let index = lit(edge.index);
            match edge.interface {
                None => edge_steps.push(quote! {
                    engine.remove_edge(morphism.mapped_edge(#index), record_changes);
                }),
                Some(right_index) => {
                    let right = &rhs.edges[right_index];
                    if right.relabelled {
                        let call = self.labelled_mutation(
                            &right.label,
                            quote! { relabel_edge },
                            quote! { morphism.mapped_edge(#index) },
                        );
                        edge_steps.push(call);
                    }
                }
            }
        }

        let mut node_steps = Vec::new();
        for node in &lhs.nodes {
            let index = lit(node.index);
            match node.interface {
                None => node_steps.push(quote! {
                    engine.remove_node(morphism.mapped_node(#index), record_changes);
                }),
                Some(right_index) => {
                    let right = &rhs.nodes[right_index];
                    if right.relabelled {
                        let call = self.labelled_mutation(
                            &right.label,
                            quote! { relabel_node },
                            quote! { morphism.mapped_node(#index) },
                        );
                        node_steps.push(call);
                    }
                    if right.root_changed {
                        if node.root && !right.root {
                            node_steps.push(quote! {
                                engine.change_root(morphism.mapped_node(#index), record_changes);
                            });
                        } else {
                            node_steps.push(quote! {
                                {
                                    let host_node_index = morphism.mapped_node(#index);
                                    if !engine.host.node_ref(host_node_index).root {
                                        engine.change_root(host_node_index, record_changes);
                                    }
                                }
                            });
                        }
                    }
                }
            }
        }

        let map_setup = self.node_map_setup(rhs);
        let added_nodes = self.added_nodes(rhs);
        let added_edges = self.added_edges(rhs);

        quote! {
            pub fn #name(engine: &mut Engine, morphism: &mut Morphism, record_changes: bool) {
                #variable_reads
                #degree_reads
                #(#edge_steps)*
                #(#node_steps)*
                #map_setup
                #(#added_nodes)*
                #(#added_edges)*
                morphism.reset();
            }
        }
    }

    /// Read out every variable rule application uses, before mutation.
    fn variable_reads(&self) -> TokenStream {
        let mut reads = TokenStream::new();
        for (id, variable) in self.rule.variables.iter().enumerate() {
            if !variable.used_by_rule {
                continue;
            }
            let local = var_local(self.rule, id);
            let index = lit(id);
            reads.extend(match variable.vtype {
                VarType::Int => quote! {
                    let #local = morphism.int_value(#index);
                },
                VarType::Char | VarType::String => quote! {
                    let #local = morphism.string_value(#index).to_owned();
                },
                VarType::List => quote! {
                    let #local = morphism.list_value(#index).to_vec();
                },
                VarType::Atom => quote! {
                    let #local = morphism
                        .value(#index)
                        .cloned()
                        .expect("atom variable assigned during match");
                },
            });
        }
        reads
    }

    /// Read out the degrees the right side evaluates, before mutation.
    fn degree_reads(&self, lhs: &RuleGraph) -> TokenStream {
        let mut reads = TokenStream::new();
        for node in &lhs.nodes {
            if !node.indegree_arg && !node.outdegree_arg {
                continue;
            }
            let node_index = format_ident!("node_index_{}", node.index);
            let index = lit(node.index);
            reads.extend(quote! {
                let #node_index = morphism.mapped_node(#index);
            });
            if node.indegree_arg {
                let local = format_ident!("indeg_{}", node.index);
                reads.extend(quote! {
                    let #local = engine.host.node_ref(#node_index).indegree() as i64;
                });
            }
            if node.outdegree_arg {
                let local = format_ident!("outdeg_{}", node.index);
                reads.extend(quote! {
                    let #local = engine.host.node_ref(#node_index).outdegree() as i64;
                });
            }
        }
        reads
    }

    /// `engine.<method>(<item>, <label>, record_changes)` with the label
    /// evaluated in an enclosing block.
    fn labelled_mutation(
        &self,
        label: &RuleLabel,
        method: TokenStream,
        item: TokenStream,
    ) -> TokenStream {
        if label.is_blank() {
            return quote! {
                engine.#method(#item, HostLabel::blank(), record_changes);
            };
        }
        let list = format_ident!("list");
        let build = build_list(self.rule, label, &list);
        let mark = mark_tokens(label.mark);
        quote! {
            {
                #build
                let label = HostLabel::new(#mark, engine.intern(#list));
                engine.#method(#item, label, record_changes);
            }
        }
    }

    fn node_map_setup(&self, rhs: &RuleGraph) -> TokenStream {
        if !(self.rule.adds_nodes && self.rule.adds_edges) {
            return quote! {};
        }
        let size = lit(rhs.nodes.len());
        quote! {
            let mut rhs_node_map = [usize::MAX; #size];
        }
    }

    fn added_nodes(&self, rhs: &RuleGraph) -> Vec<TokenStream> {
        let mut steps = Vec::new();
        for node in &rhs.nodes {
            if node.interface.is_some() {
                continue;
            }
            let index = lit(node.index);
            let root = node.root;
            let record_map = if self.rule.adds_edges {
                quote! { rhs_node_map[#index] = host_node_index; }
            } else {
                quote! {}
            };
            let step = if node.label.is_blank() {
                quote! {
                    {
                        let host_node_index =
                            engine.add_node(#root, HostLabel::blank(), record_changes);
                        #record_map
                    }
                }
            } else {
                let list = format_ident!("list");
                let build = build_list(self.rule, &node.label, &list);
                let mark = mark_tokens(node.label.mark);
                quote! {
                    {
                        #build
                        let label = HostLabel::new(#mark, engine.intern(#list));
                        let host_node_index = engine.add_node(#root, label, record_changes);
                        #record_map
                    }
                }
            };
            steps.push(step);
        }
        steps
    }

    fn added_edges(&self, rhs: &RuleGraph) -> Vec<TokenStream> {
        let mut steps = Vec::new();
        for edge in &rhs.edges {
            if edge.interface.is_some() {
                continue;
            }
            let source = self.endpoint(rhs, edge.source);
            let target = self.endpoint(rhs, edge.target);
            let step = if edge.label.is_blank() {
                quote! {
                    {
                        let source = #source;
                        let target = #target;
                        engine.add_edge(HostLabel::blank(), source, target, record_changes);
                    }
                }
            } else {
                let list = format_ident!("list");
                let build = build_list(self.rule, &edge.label, &list);
                let mark = mark_tokens(edge.label.mark);
                quote! {
                    {
                        let source = #source;
                        let target = #target;
                        #build
                        let label = HostLabel::new(#mark, engine.intern(#list));
                        engine.add_edge(label, source, target, record_changes);
                    }
                }
            };
            steps.push(step);
        }
        steps
    }

    /// A preserved endpoint comes out of the morphism; an added one out of
    /// the node map filled while adding nodes.
    fn endpoint(&self, rhs: &RuleGraph, node: usize) -> TokenStream {
        match rhs.nodes[node].interface {
            Some(left) => {
                let left = lit(left);
                quote! { morphism.mapped_node(#left) }
            }
            None => {
                let index = lit(node);
                quote! { rhs_node_map[#index] }
            }
        }
    }
}
