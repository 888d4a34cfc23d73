// Copyright 2026 The GP2 Project Developers

//! Rust code generation for GP 2 programs.
//!
//! Each rule becomes a module implementing `match_<rule>` and
//! `apply_<rule>` against the `gp2rs` runtime; the control program becomes
//! the generated crate's `main.rs`. Token streams are built with `quote`,
//! parsed back through `syn`, and written out formatted; output that fails
//! to parse is preserved in a temp file for inspection.

use std::fs;
use std::io::Write;
use std::path::Path;

use proc_macro2::TokenStream;
use quote::quote;
use thiserror::Error;

use gp2::ast::Program;
use gp2::ir::{self, Rule};

use applier::ApplierGenerator;
use condition::ConditionGenerator;
use matcher::MatcherGenerator;
use program::ProgramGenerator;

mod applier;
mod condition;
mod label;
mod matcher;
mod program;

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("write generated code: {0}")]
    Io(#[from] std::io::Error),

    #[error("generated code for {module} failed to parse: {message}")]
    Unparsable { module: String, message: String },
}

pub struct Settings {
    /// Package name of the generated crate.
    pub package_name: String,

    /// Path the generated crate uses to reach the gp2rs runtime.
    pub runtime_path: String,
}

/// Compile every rule of a checked program and emit the executable crate
/// into `outdir`.
pub fn emit(program: &Program, outdir: &Path, settings: &Settings) -> Result<(), EmitError> {
    let rules: Vec<Rule> = program::declared_rules(program)
        .into_iter()
        .map(ir::transform)
        .collect();
    let src = outdir.join("src");
    fs::create_dir_all(&src)?;
    for rule in &rules {
        let tokens = emit_rule_tokens(rule);
        write_formatted(&tokens, &src.join(format!("{}.rs", rule.name)), &rule.name)?;
    }
    let main = emit_program_tokens(program, &rules);
    write_formatted(&main, &src.join("main.rs"), "main")?;
    fs::write(outdir.join("Cargo.toml"), manifest(settings))?;
    Ok(())
}

/// The module implementing one rule: label matchers, condition evaluators,
/// the matching procedures, and the apply procedure.
pub fn emit_rule_tokens(rule: &Rule) -> TokenStream {
    let mut tokens = quote! {
        #![allow(unused_imports, unused_variables, unreachable_code, non_snake_case, dead_code)]

        use gp2rs::engine::Engine;
        use gp2rs::graph::{Edge, HostGraph, Node};
        use gp2rs::label::{HostAtom, HostLabel, Mark};
        use gp2rs::morphism::{Morphism, Value};
    };
    if let Some(condition) = &rule.condition {
        tokens.extend(ConditionGenerator::new(rule, condition).generate());
    }
    if rule.lhs.is_some() {
        tokens.extend(MatcherGenerator::new(rule).generate());
        if !rule.is_predicate {
            tokens.extend(ApplierGenerator::new(rule).generate());
        }
    } else if rule.rhs.is_some() {
        tokens.extend(ApplierGenerator::new(rule).generate());
    }
    tokens
}

/// The generated `main.rs` for the control program.
pub fn emit_program_tokens(program: &Program, rules: &[Rule]) -> TokenStream {
    ProgramGenerator::new(program, rules).generate()
}

/// The search plan a rule's matcher is generated from, printed with the
/// stable operation tags.
pub fn plan_for(rule: &Rule) -> Option<String> {
    rule.lhs
        .as_ref()
        .map(|lhs| format!("{}", gp2::searchplan::generate(lhs)))
}

fn manifest(settings: &Settings) -> String {
    format!(
        "[package]\n\
         name = \"{}\"\n\
         version = \"0.1.0\"\n\
         edition = \"2021\"\n\
         \n\
         [dependencies]\n\
         gp2rs = {{ path = \"{}\" }}\n\
         \n\
         [workspace]\n",
        settings.package_name, settings.runtime_path
    )
}

fn write_formatted(tokens: &TokenStream, path: &Path, module: &str) -> Result<(), EmitError> {
    let file: syn::File = match syn::parse2(tokens.clone()) {
        Ok(file) => file,
        Err(error) => {
            // Keep the raw output around for debugging.
            write_to_tempfile(tokens)?;
            return Err(EmitError::Unparsable {
                module: module.to_owned(),
                message: format!("{:?}", error),
            });
        }
    };
    fs::write(path, prettyplease::unparse(&file))?;
    Ok(())
}

fn write_to_tempfile(tokens: &TokenStream) -> Result<(), EmitError> {
    let mut out = tempfile::Builder::new().suffix(".rs").tempfile()?;
    out.write_all(tokens.to_string().as_bytes())?;
    println!("Wrote unparsable generated code to {}", out.path().display());
    out.keep().map_err(|error| EmitError::Io(error.into()))?;
    Ok(())
}
