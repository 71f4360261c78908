use anyhow::{Context, Result};

use crate::data::model::Table;

/// Serialize the table as a `;`-delimited CSV spreadsheet.
///
/// Header row first, then every data row in table order. Null cells become
/// empty fields so the file round-trips through the loader.
pub fn render(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(Vec::new());

    writer
        .write_record(table.column_names())
        .context("writing spreadsheet header")?;

    for row in 0..table.row_count() {
        let record: Vec<String> = table
            .columns()
            .iter()
            .map(|col| {
                let v = &col.values[row];
                if v.is_null() {
                    String::new()
                } else {
                    v.to_string()
                }
            })
            .collect();
        writer
            .write_record(&record)
            .with_context(|| format!("writing spreadsheet row {row}"))?;
    }

    writer.into_inner().context("flushing spreadsheet writer")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Column, Value};

    #[test]
    fn header_and_rows_in_table_order() {
        let table = Table::new(vec![
            Column::new(
                "Institution",
                vec![Value::Text("UFPR".into()), Value::Null],
            ),
            Column::new("Score", vec![Value::Float(4.5), Value::Integer(3)]),
        ]);
        let bytes = render(&table).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Institution;Score");
        assert_eq!(lines[1], "UFPR;4.5");
        assert_eq!(lines[2], ";3");
    }

    #[test]
    fn round_trips_through_the_loader() {
        let table = Table::new(vec![
            Column::new("Code", vec![Value::Integer(1001), Value::Integer(1002)]),
            Column::new(
                "City",
                vec![Value::Text("Curitiba".into()), Value::Null],
            ),
        ]);
        let bytes = render(&table).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let reloaded = crate::data::loader::parse_csv(&text).unwrap();
        assert_eq!(reloaded, table);
    }
}
