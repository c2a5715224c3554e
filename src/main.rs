//! Minimal CLI driving the core pipeline end to end: a smoke-test
//! surface, not a project-file-aware build tool (watch mode and
//! manifest dispatch are out of scope — see `poppy::options` for the
//! manifest shape an external collaborator would layer on top).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use poppy::file_reader::AsmFileReader;
use poppy::options::CompilerOptions;
use poppy::target::TargetArchitecture;

#[derive(Parser, Debug)]
#[command(name = "poppy", about = "Multi-target retro assembler")]
struct Cli {
    /// Entry assembly source file.
    source: PathBuf,

    /// Output ROM path.
    #[arg(short, long, default_value = "out.rom")]
    output: PathBuf,

    /// Target architecture (6502, 65816, sm83, z80, m68000, arm7tdmi, …).
    #[arg(short, long, default_value = "sm83")]
    target: String,

    /// Additional `.include` search directories.
    #[arg(short = 'I', long = "include")]
    include_paths: Vec<PathBuf>,

    /// Treat warnings as build failures.
    #[arg(long)]
    warnings_as_errors: bool,

    /// Synthesize `sub_XXXX`/`loc_XXXX` labels at unnamed call/jump targets.
    #[arg(long)]
    autogenerate_labels: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let target: TargetArchitecture = match cli.target.parse() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let options = CompilerOptions {
        target,
        main_source: cli.source,
        include_paths: cli.include_paths,
        warnings_as_errors: cli.warnings_as_errors,
        autogenerate_labels: cli.autogenerate_labels,
        ..Default::default()
    };

    let reader = AsmFileReader;
    match poppy::assemble(&options, &reader) {
        Ok(bytes) => {
            if let Err(e) = std::fs::write(&cli.output, &bytes) {
                eprintln!("error: failed to write {}: {}", cli.output.display(), e);
                return ExitCode::FAILURE;
            }
            log::info!("wrote {} bytes to {}", bytes.len(), cli.output.display());
            ExitCode::SUCCESS
        }
        Err(diagnostics) => {
            eprint!("{}", diagnostics.render());
            ExitCode::FAILURE
        }
    }
}
