use anyhow::Result;
use std::io::{BufRead, Write};

use crate::format::FormatChoice;

const MENU: &str = "
Available Output Formats:
1. EPUB (eBook format for Kindle, etc.)
2. HTML (Web format, opens in browser)
3. PDF (Portable Document Format)
4. Combined Markdown (Single markdown file)
5. All formats
0. Exit
";

/// Maps a menu entry to a format. `Some(None)` is the exit entry.
fn parse_selection(input: &str) -> Option<Option<FormatChoice>> {
    match input.trim() {
        "0" => Some(None),
        "1" => Some(Some(FormatChoice::Epub)),
        "2" => Some(Some(FormatChoice::Html)),
        "3" => Some(Some(FormatChoice::Pdf)),
        "4" => Some(Some(FormatChoice::Md)),
        "5" => Some(Some(FormatChoice::All)),
        _ => None,
    }
}

/// Shows the format menu until a valid entry is read.
///
/// Returns `None` when the user picks `0` or input ends.
pub fn prompt<R: BufRead, W: Write>(mut input: R, mut output: W) -> Result<Option<FormatChoice>> {
    write!(output, "{}", MENU)?;

    loop {
        write!(output, "\nSelect format (0-5): ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(output, "\nGoodbye!")?;
            return Ok(None);
        }

        match parse_selection(&line) {
            Some(None) => {
                writeln!(output, "Goodbye!")?;
                return Ok(None);
            }
            Some(choice) => return Ok(choice),
            None => writeln!(output, "Please enter a number between 0-5")?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run(input: &str) -> (Option<FormatChoice>, String) {
        let mut out = Vec::new();
        let choice = prompt(Cursor::new(input), &mut out).unwrap();
        (choice, String::from_utf8(out).unwrap())
    }

    #[test]
    fn picks_each_format() {
        assert_eq!(run("1\n").0, Some(FormatChoice::Epub));
        assert_eq!(run("2\n").0, Some(FormatChoice::Html));
        assert_eq!(run("3\n").0, Some(FormatChoice::Pdf));
        assert_eq!(run(" 4 \n").0, Some(FormatChoice::Md));
        assert_eq!(run("5\n").0, Some(FormatChoice::All));
    }

    #[test]
    fn reprompts_on_invalid_input() {
        let (choice, shown) = run("9\nabc\n2\n");
        assert_eq!(choice, Some(FormatChoice::Html));
        assert_eq!(shown.matches("Please enter a number between 0-5").count(), 2);
        assert!(shown.contains("5. All formats"));
    }

    #[test]
    fn zero_and_eof_exit() {
        assert_eq!(run("0\n").0, None);
        let (choice, shown) = run("");
        assert_eq!(choice, None);
        assert!(shown.contains("Goodbye!"));
    }
}
