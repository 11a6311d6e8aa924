use crate::{
    model::{Attributes, InlineElement, Span, Table, TableCell, TableRow},
    scanner::Line,
};

/// Builds a table from the lines between `|===` delimiters.
///
/// The column count comes from `cols` or else from the cells on the first
/// line. The first row is a header when `%header` is set, or when it sits on
/// its own line followed by a blank line (unless `%noheader` is set).
pub(crate) fn build(attributes: Attributes, lines: &[Line], span: Span) -> Table {
    let mut cells: Vec<String> = Vec::new();
    let mut first_line_cells = None;
    let mut implicit_header = false;

    for (index, line) in lines.iter().enumerate() {
        if line.is_blank() {
            if index == 1 && first_line_cells.is_some() {
                implicit_header = true;
            }
            continue;
        }
        let (leading, line_cells) = split_cells(line.text());
        if let Some(leading) = leading {
            if let Some(last) = cells.last_mut() {
                last.push('\n');
                last.push_str(&leading);
            } else {
                cells.push(leading);
            }
        }
        if index == 0 {
            first_line_cells = Some(line_cells.len());
        }
        cells.extend(line_cells);
    }

    let columns = column_count(&attributes)
        .or(first_line_cells)
        .filter(|columns| *columns > 0)
        .unwrap_or(1);
    let header_row = !attributes.has_option("noheader")
        && (attributes.has_option("header")
            || (implicit_header && first_line_cells == Some(columns)));

    let mut rows = cells
        .chunks(columns)
        .map(|chunk| TableRow {
            cells: chunk
                .iter()
                .map(|text| TableCell {
                    elements: vec![InlineElement::RawLine(text.clone())],
                })
                .collect(),
        })
        .collect::<Vec<_>>();
    let header = if header_row && !rows.is_empty() {
        Some(rows.remove(0))
    } else {
        None
    };
    tracing::trace!(columns, rows = rows.len(), header = header.is_some(), "assembled table");
    Table {
        attributes,
        header,
        rows,
        span,
    }
}

/// Splits a table line on unescaped `|`. Text before the first separator is
/// returned apart: it continues the previous cell.
fn split_cells(raw: &str) -> (Option<String>, Vec<String>) {
    let mut leading = None;
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_cell = false;
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => {
                if in_cell {
                    cells.push(current.trim().to_string());
                } else if !current.trim().is_empty() {
                    leading = Some(current.trim().to_string());
                }
                current.clear();
                in_cell = true;
            }
            c => current.push(c),
        }
    }
    if in_cell {
        cells.push(current.trim().to_string());
    } else if !current.trim().is_empty() {
        leading = Some(current.trim().to_string());
    }
    (leading, cells)
}

fn column_count(attributes: &Attributes) -> Option<usize> {
    let cols = attributes.get_str("cols")?.trim();
    if let Ok(columns) = cols.parse() {
        return Some(columns);
    }
    Some(
        cols.split([',', ';'])
            .map(|spec| {
                spec.trim()
                    .split_once('*')
                    .and_then(|(repeat, _)| repeat.parse().ok())
                    .unwrap_or(1)
            })
            .sum(),
    )
}
