//! Compilation pipeline.
//!
//! Runs the lexer, the parser and the semantic core over one source file,
//! then hands the built module to a code generator.

use std::{fs, path::Path, rc::Rc};

use tracing::{debug, instrument};

use crate::{
    arguments::CompilerArguments,
    errors::errors::{Error, ErrorImpl},
    lexer::lexer::tokenize,
    parser::parser::parse,
    type_checker::{lookup_context::LookupContext, module::Module},
    Position,
};

use super::gen::ModuleGen;

/// Compiles the file at `source_path` into `gen`.
#[instrument(level = "debug", skip_all, fields(input = %source_path.display()))]
pub fn compile(
    source_path: &Path,
    arguments: &CompilerArguments,
    gen: &mut dyn ModuleGen,
) -> Result<(), Error> {
    let source = fs::read_to_string(source_path).map_err(|error| {
        Error::new(
            ErrorImpl::Io {
                message: format!("{}: {}", source_path.display(), error),
            },
            Position::null(),
        )
    })?;

    let file = source_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| source_path.display().to_string());

    compile_source(source, &file, arguments, gen)
}

/// Compiles `source` as if it was read from a file called `file`.
///
/// # Arguments
///
/// * `source` - The program text
/// * `file` - Name used in positions and as the module name (minus extension)
/// * `arguments` - Weight limits and other settings
/// * `gen` - Receives the builtin types and, on success, the module
#[instrument(level = "debug", skip_all, fields(file = file))]
pub fn compile_source(
    source: String,
    file: &str,
    arguments: &CompilerArguments,
    gen: &mut dyn ModuleGen,
) -> Result<(), Error> {
    let tokens = tokenize(source, Some(String::from(file)))?;
    debug!(tokens = tokens.len(), "tokenized");

    let syntax = parse(tokens, Rc::new(String::from(file)))?;
    debug!(items = syntax.items.len(), "parsed");

    let root = LookupContext::new_root(gen, arguments);
    let mut scope = root.child();

    let name = Path::new(file)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from(file));

    let module = Module::build(&syntax, &mut scope, &name, file)?;
    module.codegen(gen);

    Ok(())
}
