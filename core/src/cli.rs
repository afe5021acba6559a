use crate::engine::Unmangle;
use clap::{crate_version, Parser};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[clap(version = crate_version!(), about = "Deobfuscate a JavaScript file")]
#[remain::sorted]
pub struct Opts {
    #[clap(short, long, help = "Remove dead nodes from the final output")]
    clean: bool,
    #[clap(
        short,
        long,
        value_name = "N",
        help = "Maximum number of iterations (positive integer)"
    )]
    max_iterations: Option<usize>,
    #[clap(
        short,
        long,
        value_name = "FILE",
        num_args = 0..=1,
        help = "Write the output to <FILE> (defaults to <INPUT>-deob.js)"
    )]
    output: Option<Option<PathBuf>>,
    #[clap(short, long, conflicts_with = "verbose", help = "Suppress the completion note")]
    quiet: bool,
    #[clap(short, long, help = "Log per-pass progress")]
    verbose: bool,
    #[clap(value_name = "INPUT", help = "File to deobfuscate")]
    zinput: PathBuf,
}

impl From<Opts> for Unmangle {
    fn from(opts: Opts) -> Self {
        let Opts {
            clean,
            max_iterations,
            output,
            quiet,
            verbose,
            zinput,
        } = opts;
        Self {
            clean,
            max_iterations,
            output,
            quiet,
            verbose,
            input: zinput,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Opts;
    use crate::engine::Unmangle;
    use clap::Parser;

    #[test]
    fn equal_and_space_syntax_both_parse() {
        let by_space = Opts::try_parse_from(["unmangle", "-m", "10", "in.js"]).unwrap();
        let by_equals = Opts::try_parse_from(["unmangle", "--max-iterations=10", "in.js"]).unwrap();
        assert_eq!(Unmangle::from(by_space).max_iterations, Some(10));
        assert_eq!(Unmangle::from(by_equals).max_iterations, Some(10));
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Opts::try_parse_from(["unmangle", "-q", "-v", "in.js"]).is_err());
    }

    #[test]
    fn output_value_is_optional() {
        let bare = Unmangle::from(Opts::try_parse_from(["unmangle", "in.js", "-o"]).unwrap());
        assert_eq!(bare.output, Some(None));
        let named =
            Unmangle::from(Opts::try_parse_from(["unmangle", "-o", "out.js", "in.js"]).unwrap());
        assert_eq!(named.output, Some(Some("out.js".into())));
        let none = Unmangle::from(Opts::try_parse_from(["unmangle", "in.js"]).unwrap());
        assert_eq!(none.output, None);
    }

    #[test]
    fn the_input_is_required() {
        assert!(Opts::try_parse_from(["unmangle"]).is_err());
    }
}
