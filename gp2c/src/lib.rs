// Copyright 2026 The GP2 Project Developers

use anyhow::{anyhow, Result};
use clap::Parser;
use std::fs;
use std::path::Path;

use gp2::ast::Program;
use gp2::check;
use gp2::error;
use gp2::ir;

#[derive(Parser)]
#[clap(version = "0.1", about = "GP 2 to Rust compiler")]
pub struct Opts {
    /// Program AST to compile (JSON, as handed over by the parser).
    pub filename: String,

    /// Show the program AST.
    #[clap(long)]
    pub show_ast: bool,

    /// Show the compiled rule IR.
    #[clap(long)]
    pub show_ir: bool,

    /// Show each rule's search plan.
    #[clap(long)]
    pub show_plan: bool,

    /// Just check the program, do not compile.
    #[clap(long)]
    pub check: bool,

    /// Report compilation progress.
    #[clap(long)]
    pub verbose: bool,

    /// Directory to write the generated crate to.
    #[clap(short, long, default_value = "out")]
    pub out: String,

    /// Package name for the generated crate.
    #[clap(long, default_value = "gp2-program")]
    pub package_name: String,

    /// Path from the generated crate to the gp2rs runtime crate.
    #[clap(long, default_value = "../lang/gp2rs")]
    pub runtime_path: String,
}

pub fn load_program(filename: &str) -> Result<Program> {
    let contents =
        fs::read_to_string(filename).map_err(|e| anyhow!("read input: {}: {}", filename, e))?;
    let program =
        serde_json::from_str(&contents).map_err(|e| anyhow!("parse program: {}", e))?;
    Ok(program)
}

pub fn check_program(program: &Program) -> Result<()> {
    let diagnostics = check::program(program);
    let errors: Vec<_> = diagnostics.errors().into_iter().cloned().collect();
    if !errors.is_empty() {
        Err(error::Error::Check(errors))?;
    }
    Ok(())
}

pub fn process_file(opts: &Opts) -> Result<()> {
    let program = load_program(&opts.filename)?;
    if opts.show_ast {
        println!("{:#?}", program);
    }

    if opts.verbose {
        println!("checking {}", opts.filename);
    }
    check_program(&program)?;
    if opts.check {
        return Ok(());
    }

    if opts.show_ir || opts.show_plan {
        for decl in program.rules() {
            let rule = ir::transform(decl);
            if opts.show_ir {
                println!("{:#?}", rule);
            }
            if opts.show_plan {
                match gp2_rust::plan_for(&rule) {
                    Some(plan) => println!("{}: {}", rule.name, plan),
                    None => println!("{}: (no left graph)", rule.name),
                }
            }
        }
    }

    if opts.verbose {
        let rules = program.rules().count();
        println!("compiling {} rules into {}", rules, opts.out);
    }
    gp2_rust::emit(
        &program,
        Path::new(&opts.out),
        &gp2_rust::Settings {
            package_name: opts.package_name.clone(),
            runtime_path: opts.runtime_path.clone(),
        },
    )?;
    if opts.verbose {
        println!("wrote generated crate to {}", opts.out);
    }

    Ok(())
}
