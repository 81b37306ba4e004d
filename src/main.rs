use anyhow::Result;
use clap::Parser;
use colored::*;
use md2ebook::{menu, Converter, FormatChoice};
use std::io;
use std::process;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "md2ebook")]
#[command(about = "Convert a folder of markdown chapters into EPUB, HTML, PDF or a combined markdown book")]
#[command(version = "0.1.0")]
struct Args {
    /// Output format (if not specified, an interactive menu is shown)
    #[arg(short = 'f', long = "format", value_enum)]
    format: Option<FormatChoice>,

    /// Output file name; with `all`, the base name shared by every file
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Directory holding the markdown chapters and optional cover image
    #[arg(long = "book-dir", default_value = "book")]
    book_dir: String,

    /// Directory the output files are written to
    #[arg(long = "out-dir", default_value = "output")]
    out_dir: String,

    /// Don't open the HTML output in a browser
    #[arg(long = "no-open")]
    no_open: bool,

    /// Log debug details
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "md2ebook=debug" } else { "md2ebook=info" };
    let filter = EnvFilter::from_default_env().add_directive(level.parse()?);

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let converter = Converter::new(&args.book_dir, &args.out_dir, !args.no_open);
    let book = converter.load_book().await?;

    let choice = match args.format {
        Some(choice) => choice,
        None => match menu::prompt(io::stdin().lock(), io::stdout())? {
            Some(choice) => choice,
            None => return Ok(()),
        },
    };

    let written = converter.run(&book, choice, args.output.as_deref()).await?;

    println!();
    println!("{}", "Conversion completed successfully!".green().bold());
    for path in &written {
        println!("  {}", path.display().to_string().blue());
    }
    info!("Converted {} chapters from {}", book.chapters.len(), converter.book_dir().display());
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging(args.verbose) {
        eprintln!("{}", format!("Error: failed to set up logging: {}", e).red());
        process::exit(1);
    }

    if let Err(e) = run(args).await {
        error!("{}", format!("Error: {}", e).red());
        process::exit(1);
    }
}
