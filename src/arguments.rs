//! Compiler configuration.
//!
//! `CompilerArguments` carries everything a compilation needs besides the
//! source text and the code generator. The driver fills it from the
//! command line with `CompilerArguments::parse`; tests usually start from
//! `CompilerArguments::default()`.

use std::path::PathBuf;

use crate::type_checker::weight::Weight;

pub const USAGE: &str = "\
Usage: practicalc [options] <input>

Options:
  -o, --output <path>                 Write the generated listing to <path>
      --print                         Print the generated listing to stdout
      --max-cast-weight <len:cost>    Budget of a single cast chain search
      --max-expression-weight <len:cost>
                                      Budget of implicit casts within one expression
  -h, --help                          Show this message";

#[derive(Debug, Clone, PartialEq)]
pub struct CompilerArguments {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    /// Accumulated implicit cast weight allowed in one top level expression.
    pub expression_weight_limit: Weight,
    /// Frontier limit of a single cast chain search.
    pub cast_weight_limit: Weight,
    pub print_ir: bool,
}

impl Default for CompilerArguments {
    fn default() -> Self {
        CompilerArguments {
            input: PathBuf::new(),
            output: None,
            expression_weight_limit: Weight::new(4096, 256),
            cast_weight_limit: Weight::new(64, 8),
            print_ir: false,
        }
    }
}

impl CompilerArguments {
    /// Parses command line arguments (without the program name).
    ///
    /// # Returns
    ///
    /// The parsed arguments, or a message describing what is wrong with
    /// them. `--help` is reported as an error carrying the usage text.
    pub fn parse<I>(args: I) -> Result<CompilerArguments, String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut arguments = CompilerArguments::default();
        let mut input = None;
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-o" | "--output" => {
                    let path = args.next().ok_or("missing value for --output")?;
                    arguments.output = Some(PathBuf::from(path));
                }
                "--print" => arguments.print_ir = true,
                "--max-cast-weight" => {
                    let value = args.next().ok_or("missing value for --max-cast-weight")?;
                    arguments.cast_weight_limit = value.parse()?;
                }
                "--max-expression-weight" => {
                    let value = args
                        .next()
                        .ok_or("missing value for --max-expression-weight")?;
                    arguments.expression_weight_limit = value.parse()?;
                }
                "-h" | "--help" => return Err(String::from(USAGE)),
                flag if flag.starts_with('-') => {
                    return Err(format!("unknown option {:?}", flag));
                }
                _ => {
                    if input.is_some() {
                        return Err(format!("unexpected argument {:?}", arg));
                    }
                    input = Some(PathBuf::from(arg));
                }
            }
        }

        arguments.input = input.ok_or("no input file given")?;
        Ok(arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::CompilerArguments;
    use crate::type_checker::weight::Weight;
    use std::path::PathBuf;

    fn args(list: &[&str]) -> Result<CompilerArguments, String> {
        CompilerArguments::parse(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_input_only() {
        let parsed = args(&["main.pr"]).unwrap();

        assert_eq!(parsed.input, PathBuf::from("main.pr"));
        assert_eq!(parsed.output, None);
        assert!(!parsed.print_ir);
        assert_eq!(parsed.cast_weight_limit, CompilerArguments::default().cast_weight_limit);
    }

    #[test]
    fn test_parse_all_options() {
        let parsed = args(&[
            "--print",
            "-o",
            "out.txt",
            "--max-cast-weight",
            "3:20",
            "--max-expression-weight",
            "10:100",
            "main.pr",
        ])
        .unwrap();

        assert!(parsed.print_ir);
        assert_eq!(parsed.output, Some(PathBuf::from("out.txt")));
        assert_eq!(parsed.cast_weight_limit, Weight::new(20, 3));
        assert_eq!(parsed.expression_weight_limit, Weight::new(100, 10));
    }

    #[test]
    fn test_parse_errors() {
        assert!(args(&[]).is_err());
        assert!(args(&["a.pr", "b.pr"]).is_err());
        assert!(args(&["--bogus", "a.pr"]).is_err());
        assert!(args(&["a.pr", "--max-cast-weight", "seven"]).is_err());
        assert!(args(&["a.pr", "-o"]).is_err());
    }
}
