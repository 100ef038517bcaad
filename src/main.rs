use std::{env, fs, process::ExitCode};

use practical::{
    arguments::{CompilerArguments, USAGE},
    compiler::{compiler::compile, text_gen::TextModuleGen},
    display_error,
};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let arguments = match CompilerArguments::parse(env::args().skip(1)) {
        Ok(arguments) => arguments,
        Err(message) => {
            eprintln!("{}", message);
            if message != USAGE {
                eprintln!("{}", USAGE);
            }
            return ExitCode::from(2);
        }
    };
    debug!(?arguments, "starting compilation");

    let mut gen = TextModuleGen::new();
    if let Err(err) = compile(&arguments.input, &arguments, &mut gen) {
        let source = fs::read_to_string(&arguments.input).unwrap_or_default();
        display_error(&err, &source, &arguments.input);
        return ExitCode::FAILURE;
    }

    let listing = gen.finish();

    if let Some(output) = &arguments.output {
        if let Err(err) = fs::write(output, &listing) {
            error!(output = %output.display(), "failed to write output");
            eprintln!("Error: cannot write {}: {}", output.display(), err);
            return ExitCode::FAILURE;
        }
    }

    if arguments.print_ir || arguments.output.is_none() {
        print!("{}", listing);
    }

    ExitCode::SUCCESS
}
