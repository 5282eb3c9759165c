//! Turning downloaded files into prompt-sized text excerpts.
//!
//! Failures never leave this module as errors: a file that cannot be read or
//! parsed becomes a marker string, so one bad download cannot sink the batch.

use std::path::{Path, PathBuf};

use ai_client::util::truncate_chars;
use anyhow::{bail, Context, Result};
use tracing::warn;

/// Cap per excerpt, in characters, to bound prompt size.
const EXCERPT_CHARS: usize = 4_000;
/// Rows included in a CSV sample, not counting the header.
const CSV_SAMPLE_ROWS: usize = 20;

/// One descriptive text block per file, in input order.
pub fn prepare_files_for_prompt(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|p| describe_file(p)).collect()
}

fn describe_file(path: &Path) -> String {
    let name = path.display();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => match pdf_excerpt(path) {
            Ok(text) => format!("FILE {name} (pdf excerpt):\n{}", truncate_chars(&text, EXCERPT_CHARS)),
            Err(e) => {
                warn!(path = %name, error = %e, "PDF extraction failed");
                format!("FILE {name} (pdf unreadable)")
            }
        },
        "csv" | "tsv" => match csv_sample(path, delimiter_for(&ext)) {
            Ok(sample) => format!("FILE {name} (csv sample):\n{}", truncate_chars(&sample, EXCERPT_CHARS)),
            Err(e) => {
                warn!(path = %name, error = %e, "CSV sampling failed");
                format!("FILE {name} (csv unreadable)")
            }
        },
        _ => match std::fs::read(path) {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                format!("FILE {name} (text excerpt):\n{}", truncate_chars(&text, EXCERPT_CHARS))
            }
            Err(e) => {
                warn!(path = %name, error = %e, "file unreadable");
                format!("FILE {name} (binary or unreadable)")
            }
        },
    }
}

fn delimiter_for(ext: &str) -> u8 {
    if ext == "tsv" {
        b'\t'
    } else {
        b','
    }
}

fn pdf_excerpt(path: &Path) -> Result<String> {
    let text = pdf_extract::extract_text(path)
        .with_context(|| format!("extracting text from {}", path.display()))?;
    Ok(text)
}

/// Header plus the first rows, rendered back as CSV text.
fn csv_sample(path: &Path, delimiter: u8) -> Result<String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let headers = reader.headers()?.clone();

    let mut buf = Vec::new();
    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(&mut buf);
        writer.write_record(&headers)?;
        for record in reader.records().take(CSV_SAMPLE_ROWS) {
            writer.write_record(&record?)?;
        }
        writer.flush()?;
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Sum the numeric values of a named CSV column. Non-numeric cells are
/// skipped; a column with no numeric values at all is an error.
pub fn sum_column(path: &Path, column: &str) -> Result<f64> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let headers = reader.headers()?.clone();
    let Some(index) = headers.iter().position(|h| h == column) else {
        bail!("column '{}' not found in {}", column, path.display());
    };

    let mut sum = 0.0;
    let mut numeric_cells = 0usize;
    for record in reader.records() {
        let record = record?;
        if let Some(value) = record.get(index) {
            if let Ok(n) = value.trim().parse::<f64>() {
                sum += n;
                numeric_cells += 1;
            }
        }
    }

    if numeric_cells == 0 {
        bail!("column '{}' contains no numeric values in {}", column, path.display());
    }

    Ok(sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn csv_sample_keeps_header_and_caps_rows() {
        let mut body = String::from("id,value\n");
        for i in 0..30 {
            body.push_str(&format!("{i},{}\n", i * 2));
        }
        let (_dir, path) = write_temp("data.csv", &body);

        let blocks = prepare_files_for_prompt(&[path]);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].contains("(csv sample)"));

        let sample = blocks[0].split_once(":\n").unwrap().1;
        // header + 20 rows
        assert_eq!(sample.trim().lines().count(), 21);
        assert!(sample.starts_with("id,value"));
    }

    #[test]
    fn tsv_files_use_tab_delimiter() {
        let (_dir, path) = write_temp("data.tsv", "a\tb\n1\t2\n");
        let blocks = prepare_files_for_prompt(&[path]);
        assert!(blocks[0].contains("(csv sample)"));
        assert!(blocks[0].contains("a\tb"));
    }

    #[test]
    fn text_excerpt_is_capped() {
        let long = "z".repeat(EXCERPT_CHARS * 3);
        let (_dir, path) = write_temp("notes.txt", &long);

        let blocks = prepare_files_for_prompt(&[path]);
        let excerpt = blocks[0].split_once(":\n").unwrap().1;
        assert_eq!(excerpt.chars().count(), EXCERPT_CHARS);
    }

    #[test]
    fn missing_file_degrades_to_marker() {
        let blocks = prepare_files_for_prompt(&[PathBuf::from("/nonexistent/gone.bin")]);
        assert_eq!(blocks[0], "FILE /nonexistent/gone.bin (binary or unreadable)");
    }

    #[test]
    fn invalid_pdf_degrades_to_marker() {
        let (_dir, path) = write_temp("fake.pdf", "this is not a pdf");
        let blocks = prepare_files_for_prompt(&[path]);
        assert!(blocks[0].contains("(pdf unreadable)"));
    }

    #[test]
    fn sum_column_adds_numeric_cells() {
        let (_dir, path) = write_temp("data.csv", "name,value\na,1.5\nb,2\nc,oops\nd,0.5\n");
        let sum = sum_column(&path, "value").unwrap();
        assert!((sum - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sum_column_rejects_missing_column() {
        let (_dir, path) = write_temp("data.csv", "a,b\n1,2\n");
        assert!(sum_column(&path, "value").is_err());
    }

    #[test]
    fn sum_column_rejects_fully_non_numeric_column() {
        let (_dir, path) = write_temp("data.csv", "name,value\na,x\nb,y\n");
        assert!(sum_column(&path, "value").is_err());
    }
}
