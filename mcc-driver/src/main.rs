//! MicroC IR Compiler Driver
//!
//! Command-line entry point: reads a textual IR file, lowers it, and
//! writes the resulting assembly text next to the input (or wherever
//! `-o` points).

use clap::Parser as ClapParser;
use log::info;
use mcc_backend::{lower_function, Policy, RegNaming};
use mcc_codegen::emit_program;
use mcc_common::CompilerError;
use mcc_ir::parse_module;
use std::fs;
use std::path::PathBuf;

#[derive(ClapParser)]
#[command(name = "mcc")]
#[command(about = "MicroC IR Compiler")]
#[command(version = "0.1.0")]
struct Cli {
    /// Input IR file
    input: PathBuf,

    /// Output assembly file (defaults to the input path with .asm)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the parsed IR to stdout before lowering
    #[arg(long)]
    dump_ir: bool,

    /// Print the parsed IR as JSON to stdout before lowering
    #[arg(long)]
    ir_json: bool,

    /// Label for the first function's entry block (defaults to the
    /// function's own name)
    #[arg(long)]
    entry_label: Option<String>,

    /// Name registers from the physical r0-r10 pool instead of the
    /// unbounded virtual t-series
    #[arg(long)]
    physical_regs: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = compile(&cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn compile(cli: &Cli) -> Result<(), CompilerError> {
    let filename = cli.input.display().to_string();
    info!("compiling {}", filename);

    let source = fs::read_to_string(&cli.input)?;
    let module = parse_module(&source, &filename)?;

    if cli.dump_ir {
        print!("{}", module);
    }
    if cli.ir_json {
        let json = serde_json::to_string_pretty(&module)
            .map_err(|e| CompilerError::InternalError {
                message: format!("IR serialization failed: {}", e),
            })?;
        println!("{}", json);
    }

    let policy = Policy {
        reg_naming: if cli.physical_regs {
            RegNaming::Physical
        } else {
            RegNaming::Virtual
        },
        ..Policy::default()
    };

    let mut code = Vec::new();
    for (index, function) in module.functions.iter().enumerate() {
        let entry_label = match (&cli.entry_label, index) {
            (Some(label), 0) => label.as_str(),
            _ => function.name.as_str(),
        };
        let lowered = lower_function(function, entry_label, policy)
            .map_err(|e| CompilerError::lowering_error(&function.name, e.to_string()))?;
        code.extend(lowered);
    }

    let asm_text = emit_program(&code);

    let output_path = match &cli.output {
        Some(path) => path.clone(),
        None => {
            let mut path = cli.input.clone();
            path.set_extension("asm");
            path
        }
    };
    fs::write(&output_path, &asm_text)?;
    info!("assembly written to {}", output_path.display());

    Ok(())
}
