//! Reading numbers and text from files or stdin.

use anyhow::{bail, Context, Result};
use std::io::Read;
use std::path::Path;

/// Read the whole input. `None` or `-` means stdin.
pub fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) if p != Path::new("-") => std::fs::read_to_string(p)
            .with_context(|| format!("Failed to read input file {}", p.display())),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

/// Parse numbers separated by commas and/or whitespace.
pub fn parse_numbers(line: &str) -> Result<Vec<f64>> {
    line.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|field| !field.is_empty())
        .map(|field| {
            field
                .parse::<f64>()
                .with_context(|| format!("'{}' is not a number", field))
        })
        .collect()
}

/// All numbers in the input, as one sequence.
pub fn parse_sequence(input: &str) -> Result<Vec<f64>> {
    parse_numbers(input)
}

/// One row per non-blank line.
pub fn parse_rows(input: &str) -> Result<Vec<Vec<f64>>> {
    let mut rows = Vec::new();
    for (lineno, line) in input.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row = parse_numbers(line).with_context(|| format!("line {}", lineno + 1))?;
        rows.push(row);
    }
    if rows.is_empty() {
        bail!("no rows found in input");
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_separators() {
        assert_eq!(
            parse_numbers("1, 2.5\t-3,4e1").unwrap(),
            vec![1.0, 2.5, -3.0, 40.0]
        );
    }

    #[test]
    fn test_sequence_spans_lines() {
        assert_eq!(parse_sequence("1 2\n3\n\n4").unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_rows_skip_blank_lines() {
        let rows = parse_rows("1,2,3\n\n4,5,6\n").unwrap();
        assert_eq!(rows, vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
    }

    #[test]
    fn test_bad_field_names_line() {
        let err = parse_rows("1,2\n3,x\n").unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("line 2"));
        assert!(msg.contains("'x'"));
    }

    #[test]
    fn test_empty_rows_rejected() {
        assert!(parse_rows("\n  \n").is_err());
    }
}
