use serde::Serialize;
use std::fmt::Write as _;
use std::io::Write;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Column-aligned rows under a dashed rule. Widths count characters, so
/// non-ASCII keys line up too.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) -> anyhow::Result<()> {
    std::io::stdout()
        .lock()
        .write_all(render_table(headers, rows).as_bytes())?;
    Ok(())
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(col, h)| {
            rows.iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.chars().count())
                .fold(h.chars().count(), usize::max)
        })
        .collect();

    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    let mut text = String::new();
    push_line(&mut text, &widths, headers.iter().copied());
    push_line(&mut text, &widths, rule.iter().map(String::as_str));
    for row in rows {
        push_line(&mut text, &widths, row.iter().map(String::as_str));
    }
    text
}

fn push_line<'a>(text: &mut String, widths: &[usize], cells: impl Iterator<Item = &'a str>) {
    let start = text.len();
    for (i, (cell, &width)) in cells.zip(widths).enumerate() {
        if i > 0 {
            text.push_str("  ");
        }
        let _ = write!(text, "{cell:<width$}");
    }
    let kept = text[start..].trim_end().len();
    text.truncate(start + kept);
    text.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn columns_align_to_widest_cell() {
        let text = render_table(
            &["KIND", "KEY", "VALUE"],
            &[row(&["task", "T001", "remote-1"]), row(&["document", "spec.md", "d"])],
        );
        assert_eq!(
            text,
            "KIND      KEY      VALUE\n\
             --------  -------  --------\n\
             task      T001     remote-1\n\
             document  spec.md  d\n"
        );
    }

    #[test]
    fn width_counts_characters_not_bytes() {
        let text = render_table(&["K", "V"], &[row(&["é", "x"]), row(&["ab", "y"])]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[2], "é   x");
        assert_eq!(lines[3], "ab  y");
    }

    #[test]
    fn empty_table_has_header_and_rule() {
        assert_eq!(render_table(&["KIND"], &[]), "KIND\n----\n");
    }
}
