use anyhow::{Context, Result, bail};
use clap::{ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser};
use console::style;
use lopdf::Document;
use pdfpages::info::DocumentSummary;
use pdfpages::pages::PageOperation;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "pdfpages")]
#[command(
    about = "Delete and reorder pages of a PDF",
    version,
    long_about = "Loads a PDF, applies page operations in the order they are given, \
                  and writes the result to a new file. Page numbers are 0-based.\n\
                  \n\
                  Examples:\n\
                  • Hide the first page:   pdfpages in.pdf out.pdf --delete 0\n\
                  • Move page 4 to front:  pdfpages in.pdf out.pdf --move 4 0\n\
                  • Combine:               pdfpages in.pdf out.pdf --delete 2 --move 0 3"
)]
struct Cli {
    /// PDF file to read
    input: PathBuf,

    /// Where to write the result (must differ from INPUT)
    output: PathBuf,

    /// Delete page NUMBER. The page is only removed from the page tree and
    /// therefore invisible; its content can still be retrieved from the file
    #[arg(long = "delete", value_name = "NUMBER", action = ArgAction::Append)]
    delete: Vec<usize>,

    /// Move page FROM so that it ends up at position TO
    #[arg(
        long = "move",
        value_names = ["FROM", "TO"],
        num_args = 2,
        action = ArgAction::Append
    )]
    moves: Vec<usize>,

    /// Show document info before and after the operations
    #[arg(short, long)]
    info: bool,

    /// Overwrite OUTPUT without asking
    #[arg(short, long)]
    force: bool,

    /// Only print errors
    #[arg(short, long)]
    quiet: bool,
}

/// Rebuilds the command-line order of `--delete` and `--move`, which clap
/// stores in separate lists.
fn collect_operations(cli: &Cli, matches: &ArgMatches) -> Vec<PageOperation> {
    let mut ordered: Vec<(usize, PageOperation)> = Vec::new();

    if let Some(indices) = matches.indices_of("delete") {
        for (index, &page) in indices.zip(&cli.delete) {
            ordered.push((index, PageOperation::Delete { page }));
        }
    }

    if let Some(indices) = matches.indices_of("moves") {
        let starts = indices.step_by(2);
        for (index, pair) in starts.zip(cli.moves.chunks_exact(2)) {
            ordered.push((
                index,
                PageOperation::Move {
                    from: pair[0],
                    to: pair[1],
                },
            ));
        }
    }

    ordered.sort_by_key(|(index, _)| *index);
    ordered.into_iter().map(|(_, op)| op).collect()
}

fn main() -> Result<()> {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
    let operations = collect_operations(&cli, &matches);

    if is_same_file(&cli.input, &cli.output) {
        bail!("Input and output file must point to different files.");
    }
    if !cli.input.is_file() {
        bail!("Input file does not exist: {}", cli.input.display());
    }

    let output = if cli.force {
        cli.output.clone()
    } else {
        let Some(output) = resolve_output_conflict(&cli.output)? else {
            return Ok(());
        };
        if is_same_file(&cli.input, &output) {
            bail!("Input and output file must point to different files.");
        }
        output
    };

    work(&cli, &output, &operations)
}

macro_rules! say {
    ($cli:expr, $($arg:tt)*) => {
        if !$cli.quiet {
            println!($($arg)*);
        }
    };
}

fn work(cli: &Cli, output: &Path, operations: &[PageOperation]) -> Result<()> {
    say!(cli, "Input file: {}", cli.input.display());
    say!(cli, "Output file: {}", output.display());

    let mut doc = Document::load(&cli.input)
        .with_context(|| format!("Failed to load PDF: {}", cli.input.display()))?;

    if cli.info {
        show_pdf_info(&cli.input, &doc);
    }

    if operations.is_empty() {
        eprintln!(
            "{}",
            style("⚠️ No operations given. The document is written unchanged.").yellow()
        );
    }

    let total = operations.len();
    for (i, operation) in operations.iter().enumerate() {
        say!(cli, "Operation {} of {}: {}", i + 1, total, operation);
        operation
            .perform(&mut doc)
            .with_context(|| format!("Operation {} of {} failed: {}", i + 1, total, operation))?;
    }

    say!(cli, "Operations done. Writing PDF to disk.");
    doc.save(output)
        .with_context(|| format!("Failed to save: {}", output.display()))?;

    if cli.info {
        show_pdf_info(output, &doc);
    }

    say!(cli, "{}", style("✓ Done.").green());
    Ok(())
}

fn show_pdf_info(path: &Path, doc: &Document) {
    println!("📄 {}", path.display());
    println!("{}", DocumentSummary::of(doc));
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn resolve_output_conflict(output: &Path) -> Result<Option<PathBuf>> {
    if !output.exists() {
        return Ok(Some(output.to_path_buf()));
    }

    print!(
        "{} Output file '{}' already exists. Action? (Y=overwrite, R=rename, N=abort): ",
        style("⚠️").yellow(),
        output.display()
    );
    io::stdout().flush()?;
    let mut choice = String::new();
    io::stdin().read_line(&mut choice)?;
    match choice.trim().to_lowercase().as_str() {
        "y" | "yes" => Ok(Some(output.to_path_buf())),
        "n" | "no" => {
            println!("Aborted.");
            Ok(None)
        }
        "r" | "rename" => {
            print!("Enter another output PDF path (e.g., reordered.pdf): ");
            io::stdout().flush()?;
            let mut new_path = String::new();
            io::stdin().read_line(&mut new_path)?;
            let trimmed = new_path.trim();
            if trimmed.is_empty() {
                println!("Empty path. Aborted.");
                return Ok(None);
            }

            // A directory keeps the original file name.
            let mut new_output = PathBuf::from(trimmed);
            if new_output.is_dir() {
                if let Some(filename) = output.file_name() {
                    new_output.push(filename);
                }
            }

            if new_output.exists() {
                println!(
                    "{} Output '{}' already exists. Aborted to prevent overwrite.",
                    style("❌").red(),
                    new_output.display()
                );
                return Ok(None);
            }

            Ok(Some(new_output))
        }
        _ => {
            println!("Invalid choice. Aborted.");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Vec<PageOperation> {
        let matches = Cli::command().try_get_matches_from(args).unwrap();
        let cli = Cli::from_arg_matches(&matches).unwrap();
        collect_operations(&cli, &matches)
    }

    #[test]
    fn test_operations_keep_command_line_order() {
        let operations = parse(&[
            "pdfpages", "in.pdf", "out.pdf", "--move", "3", "0", "--delete", "1", "--move", "0",
            "2", "--delete", "4",
        ]);

        assert_eq!(
            operations,
            vec![
                PageOperation::Move { from: 3, to: 0 },
                PageOperation::Delete { page: 1 },
                PageOperation::Move { from: 0, to: 2 },
                PageOperation::Delete { page: 4 },
            ]
        );
    }

    #[test]
    fn test_no_operations() {
        assert!(parse(&["pdfpages", "in.pdf", "out.pdf"]).is_empty());
    }

    #[test]
    fn test_move_needs_two_values() {
        let result = Cli::command().try_get_matches_from(["pdfpages", "a.pdf", "b.pdf", "--move", "1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_page_rejected() {
        let result =
            Cli::command().try_get_matches_from(["pdfpages", "a.pdf", "b.pdf", "--delete", "-1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }
}
