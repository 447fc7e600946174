use std::{fs::File, io::{self, BufReader}, path::PathBuf};

use anyhow::Context;
use calc::{EvaluationContext, Repl};
use clap::Parser;

/// An interactive calculator with variables, functions, conditionals and
/// loops.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Script to run instead of reading statements interactively.
    file: Option<PathBuf>,

    /// Statements to run before exiting.
    #[arg(short, long, conflicts_with = "file")]
    eval: Option<String>,

    /// Prompt printed before each statement.
    #[arg(long, default_value = "Calc> ")]
    prompt: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let repl = Repl::new(EvaluationContext::new());

    match (args.eval, args.file) {
        (Some(source), _) => repl.with_prompts("", "")
            .run(source.as_bytes(), &mut stdout, &mut stderr)
            .context("failed to write results")?,
        (None, Some(path)) => {
            let file = File::open(&path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            repl.with_prompts("", "")
                .run(BufReader::new(file), &mut stdout, &mut stderr)
                .with_context(|| format!("failed to run {}", path.display()))?
        }
        (None, None) => repl.with_prompts(args.prompt, "...> ")
            .run(io::stdin().lock(), &mut stdout, &mut stderr)
            .context("failed to run the interactive session")?,
    }

    Ok(())
}
