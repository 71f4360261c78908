use anyhow::{Context, Result};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rgb,
};

use crate::data::model::Table;

// ---------------------------------------------------------------------------
// PDF table renderer (A4 landscape)
// ---------------------------------------------------------------------------

const PAGE_W_MM: f64 = 297.0;
const PAGE_H_MM: f64 = 210.0;
const MARGIN_MM: f64 = 10.0;
const ROW_H_MM: f64 = 8.0;
const FONT_SIZE: f64 = 8.0;

/// Cell text is clipped to this many characters so a long value cannot
/// overflow its cell.
const MAX_CELL_CHARS: usize = 35;

/// Render the table as a paginated PDF report.
///
/// Header band plus all data rows, in table column order; columns share the
/// page width equally. The header repeats on every page.
pub fn render(table: &Table) -> Result<Vec<u8>> {
    let (doc, first_page, first_layer) =
        PdfDocument::new("Filtered report", Mm(PAGE_W_MM), Mm(PAGE_H_MM), "table");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .context("loading builtin PDF font")?;

    let n_cols = table.columns().len().max(1);
    let col_w = PAGE_W_MM / (n_cols as f64 + 1.0);

    let headers: Vec<String> = table.column_names().map(|n| clip(n)).collect();

    let mut layer = doc.get_page(first_page).get_layer(first_layer);
    let mut y = PAGE_H_MM - MARGIN_MM - ROW_H_MM;
    draw_row(&layer, &font, &headers, y, col_w, true);
    y -= ROW_H_MM;

    for row in 0..table.row_count() {
        if y < MARGIN_MM {
            let (page, page_layer) = doc.add_page(Mm(PAGE_W_MM), Mm(PAGE_H_MM), "table");
            layer = doc.get_page(page).get_layer(page_layer);
            y = PAGE_H_MM - MARGIN_MM - ROW_H_MM;
            draw_row(&layer, &font, &headers, y, col_w, true);
            y -= ROW_H_MM;
        }

        let cells: Vec<String> = table
            .columns()
            .iter()
            .map(|col| clip(&col.values[row].to_string()))
            .collect();
        draw_row(&layer, &font, &cells, y, col_w, false);
        y -= ROW_H_MM;
    }

    doc.save_to_bytes().context("serializing PDF")
}

fn clip(text: &str) -> String {
    text.chars().take(MAX_CELL_CHARS).collect()
}

/// Draw one row of bordered cells with its text at height `y` (cell bottom).
fn draw_row(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    cells: &[String],
    y: f64,
    col_w: f64,
    header: bool,
) {
    let fill = if header {
        // Light blue header band.
        Rgb::new(0.78, 0.86, 1.0, None)
    } else {
        Rgb::new(1.0, 1.0, 1.0, None)
    };
    layer.set_fill_color(Color::Rgb(fill));
    layer.set_outline_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    layer.set_outline_thickness(0.25);

    let mut x = MARGIN_MM;
    for _ in cells {
        layer.add_shape(cell_box(x, y, col_w));
        x += col_w;
    }

    // Text is painted with the fill colour, so reset it to black.
    layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    let mut x = MARGIN_MM;
    for cell in cells {
        layer.use_text(cell.clone(), FONT_SIZE, Mm(x + 1.5), Mm(y + 2.5), font);
        x += col_w;
    }
}

fn cell_box(x: f64, y: f64, w: f64) -> Line {
    Line {
        points: vec![
            (Point::new(Mm(x), Mm(y)), false),
            (Point::new(Mm(x + w), Mm(y)), false),
            (Point::new(Mm(x + w), Mm(y + ROW_H_MM)), false),
            (Point::new(Mm(x), Mm(y + ROW_H_MM)), false),
        ],
        is_closed: true,
        has_fill: true,
        has_stroke: true,
        is_clipping_path: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Column, Value};

    #[test]
    fn renders_a_pdf_document() {
        let table = Table::new(vec![
            Column::new(
                "Institution",
                vec![Value::Text("UFPR".into()), Value::Text("UNICAMP".into())],
            ),
            Column::new("Score", vec![Value::Float(4.5), Value::Float(4.8)]),
        ]);
        let bytes = render(&table).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(!bytes.is_empty());
    }

    #[test]
    fn long_cells_are_clipped_not_fatal() {
        let long = "x".repeat(500);
        let table = Table::new(vec![Column::new("Notes", vec![Value::Text(long)])]);
        assert!(render(&table).is_ok());
        assert_eq!(clip(&"y".repeat(500)).chars().count(), MAX_CELL_CHARS);
    }

    #[test]
    fn hundreds_of_rows_paginate() {
        let values: Vec<Value> = (0..400).map(Value::Integer).collect();
        let table = Table::new(vec![Column::new("id", values)]);
        let bytes = render(&table).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
