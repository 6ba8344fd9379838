use std::borrow::Cow;
use std::fmt::Write as _;

/// Cells wider than this are cut and suffixed with an ellipsis.
pub const MAX_CELL_WIDTH: usize = 60;

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let rows = rows
        .iter()
        .map(|row| row.iter().map(|cell| fit_cell(cell)).collect::<Vec<_>>())
        .collect::<Vec<_>>();

    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }
    for width in &mut widths {
        *width = (*width).max(1);
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));

    let separator_widths = widths.iter().map(|w| (*w).max(3)).collect::<Vec<usize>>();
    let separator_cells = separator_widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator_cells, &separator_widths));

    for row in &rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn format_row<S: AsRef<str>>(values: &[S], widths: &[usize]) -> String {
    let mut cells = Vec::with_capacity(values.len());
    for (value, width) in values.iter().zip(widths) {
        let value = value.as_ref();
        let padding = width.saturating_sub(display_width(value));
        cells.push(format!("{value}{}", " ".repeat(padding)));
    }
    cells.join("  ").trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn fit_cell(value: &str) -> String {
    let sanitized = sanitize_cell(value);
    if display_width(&sanitized) <= MAX_CELL_WIDTH {
        return sanitized.into_owned();
    }
    let mut cut = sanitized
        .chars()
        .take(MAX_CELL_WIDTH.saturating_sub(1))
        .collect::<String>();
    cut.push('…');
    cut
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn columns_are_padded_to_widest_cell() {
        let rendered = render_table(
            &strings(&["row", "name"]),
            &[strings(&["1", "Ari"]), strings(&["10", "Samantha"])],
        );
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "row  name");
        assert_eq!(lines[1], "---  --------");
        assert_eq!(lines[2], "1    Ari");
        assert_eq!(lines[3], "10   Samantha");
    }

    #[test]
    fn long_and_multiline_cells_are_flattened_and_cut() {
        let long = "x".repeat(MAX_CELL_WIDTH + 10);
        let rendered = render_table(
            &strings(&["notes"]),
            &[vec![long], strings(&["line one\nline two"])],
        );
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[2].chars().count(), MAX_CELL_WIDTH);
        assert!(lines[2].ends_with('…'));
        assert_eq!(lines[3], "line one line two");
    }
}
