use crate::{
    arborist::Arborist,
    cache,
    pass::{accept_all, Catalogue},
};
use anyhow::{Context as _, Result};
use log::debug;
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_MAX_ITERATIONS: usize = 100;

#[derive(Clone, Debug)]
pub struct Config {
    /// Outer-loop bound; decremented once per iteration. Zero means "no
    /// iterations": the input is parsed and printed back unchanged.
    pub max_iterations: usize,
    /// Run the dead-code pass to fixpoint after deobfuscation.
    pub clean: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            clean: false,
        }
    }
}

/// Fixpoint driver: runs the safe pass list, then the unsafe pass list,
/// committing after each pass, until an iteration makes no progress or the
/// iteration budget runs out. Progress is source inequality, compared by
/// fingerprint.
pub fn deobfuscate(source: &str, catalogue: &Catalogue, config: &Config) -> Result<String> {
    // Each job owns the cache generation for its script.
    cache::with_bucket(Some(cache::fingerprint(source)), |_| {});

    let mut arb = Arborist::new(source)?;
    let mut iterations = config.max_iterations;
    while iterations > 0 {
        iterations -= 1;
        let before = arb.fingerprint();
        for pass in &catalogue.safe {
            arb = pass.run(arb, accept_all);
        }
        for pass in &catalogue.unsafe_ {
            arb = pass.run(arb, accept_all);
        }
        let changed = arb.fingerprint() != before;
        debug!(
            "iteration done ({} left), source {}",
            iterations,
            if changed { "changed" } else { "stable" }
        );
        if !changed {
            break;
        }
    }

    if config.clean {
        if let Some(cleanup) = &catalogue.cleanup {
            loop {
                let before = arb.fingerprint();
                arb = cleanup.run(arb, accept_all);
                if arb.fingerprint() == before {
                    break;
                }
            }
        }
    }

    Ok(arb.source().to_owned())
}

/// Resolved command-line options.
#[derive(Clone, Debug, Default)]
pub struct Unmangle {
    pub clean: bool,
    pub max_iterations: Option<usize>,
    /// `None`: print to stdout. `Some(None)`: write to the default
    /// `<input>-deob.js`. `Some(Some(path))`: write to `path`.
    pub output: Option<Option<PathBuf>>,
    pub quiet: bool,
    pub verbose: bool,
    pub input: PathBuf,
}

/// The binary's main entry point: read, deobfuscate, write.
pub fn run(opts: &Unmangle, catalogue: &Catalogue) -> Result<()> {
    let source = fs::read_to_string(&opts.input)
        .with_context(|| format!("failed to read {}", opts.input.display()))?;

    let config = Config {
        max_iterations: opts.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
        clean: opts.clean,
    };

    let output = deobfuscate(&source, catalogue, &config)?;

    match &opts.output {
        None => println!("{output}"),
        Some(path) => {
            let path = path
                .clone()
                .unwrap_or_else(|| default_output_path(&opts.input));
            fs::write(&path, &output)
                .with_context(|| format!("failed to write {}", path.display()))?;
            if !opts.quiet {
                println!("Deobfuscated source written to {}", path.display());
            }
        }
    }

    Ok(())
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "out".to_owned(), |stem| stem.to_string_lossy().into_owned());
    input.with_file_name(format!("{stem}-deob.js"))
}
