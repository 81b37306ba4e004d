use clap::ValueEnum;
use std::fmt;
use std::path::{Path, PathBuf};

/// What the user asked for on the command line or in the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatChoice {
    Epub,
    Html,
    Pdf,
    Md,
    All,
}

/// A single concrete output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Epub,
    Html,
    Pdf,
    Markdown,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Epub,
        OutputFormat::Html,
        OutputFormat::Pdf,
        OutputFormat::Markdown,
    ];

    pub fn default_file_name(&self, base: &str) -> String {
        match self {
            OutputFormat::Epub => format!("{base}.epub"),
            OutputFormat::Html => format!("{base}.html"),
            OutputFormat::Pdf => format!("{base}.pdf"),
            OutputFormat::Markdown => format!("{base}_combined.md"),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Epub => "EPUB",
            OutputFormat::Html => "HTML",
            OutputFormat::Pdf => "PDF",
            OutputFormat::Markdown => "Combined Markdown",
        };
        f.write_str(name)
    }
}

impl FormatChoice {
    pub fn formats(&self) -> Vec<OutputFormat> {
        match self {
            FormatChoice::Epub => vec![OutputFormat::Epub],
            FormatChoice::Html => vec![OutputFormat::Html],
            FormatChoice::Pdf => vec![OutputFormat::Pdf],
            FormatChoice::Md => vec![OutputFormat::Markdown],
            FormatChoice::All => OutputFormat::ALL.to_vec(),
        }
    }
}

/// A file to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub format: OutputFormat,
    pub path: PathBuf,
}

/// Resolves the output path of every format in `choice`.
///
/// For a single format `output` is the file name; for `all` it is the base
/// name shared by the four files. Relative names land in `out_dir`.
pub fn plan_outputs(
    choice: FormatChoice,
    output: Option<&str>,
    default_base: &str,
    out_dir: &Path,
) -> Vec<OutputTarget> {
    match (choice, output) {
        (FormatChoice::All, _) => {
            let base = output.unwrap_or(default_base);
            OutputFormat::ALL
                .iter()
                .map(|format| OutputTarget {
                    format: *format,
                    path: out_dir.join(format.default_file_name(base)),
                })
                .collect()
        }
        (single, Some(name)) => single
            .formats()
            .into_iter()
            .map(|format| OutputTarget {
                format,
                path: out_dir.join(name),
            })
            .collect(),
        (single, None) => single
            .formats()
            .into_iter()
            .map(|format| OutputTarget {
                format,
                path: out_dir.join(format.default_file_name(default_base)),
            })
            .collect(),
    }
}
