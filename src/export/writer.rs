use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook};

use crate::table::{CellValue, Table};

const SHEET_NAME: &str = "Sentiment";

/// CSV with a header row; every cell is written in its text form.
///
/// # Errors
/// Returns an error if the CSV writer fails.
pub fn write_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(table.columns())
        .context("write CSV header")?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(|cell| cell.as_text().into_owned()))
            .context("write CSV record")?;
    }
    writer
        .into_inner()
        .map_err(csv::IntoInnerError::into_error)
        .context("flush CSV writer")
}

/// Single-sheet workbook; numbers and booleans keep their cell types.
///
/// # Errors
/// Returns an error if the table exceeds worksheet limits or the workbook
/// cannot be assembled.
pub fn write_xlsx(table: &Table) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME).context("name worksheet")?;

    for (col, name) in table.columns().iter().enumerate() {
        let col = u16::try_from(col).context("too many columns for a worksheet")?;
        sheet
            .write_string_with_format(0, col, name, &header)
            .context("write header cell")?;
    }

    for (index, row) in table.rows().iter().enumerate() {
        let row_number = u32::try_from(index + 1).context("too many rows for a worksheet")?;
        for (col, cell) in row.iter().enumerate() {
            let col = u16::try_from(col).context("too many columns for a worksheet")?;
            match cell {
                CellValue::Empty => {}
                CellValue::Text(text) => {
                    sheet.write_string(row_number, col, text)?;
                }
                #[allow(clippy::cast_precision_loss)]
                CellValue::Int(value) => {
                    sheet.write_number(row_number, col, *value as f64)?;
                }
                CellValue::Float(value) if value.is_finite() => {
                    sheet.write_number(row_number, col, *value)?;
                }
                CellValue::Float(_) => {
                    sheet.write_string(row_number, col, cell.as_text())?;
                }
                CellValue::Bool(value) => {
                    sheet.write_boolean(row_number, col, *value)?;
                }
            }
        }
    }

    workbook.save_to_buffer().context("assemble workbook")
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{Data, Reader, Xlsx};
    use std::io::Cursor;

    fn sample() -> Table {
        Table::from_rows(
            vec!["review".into(), "score".into(), "ok".into()],
            vec![
                vec!["bagus, \"sekali\"".into(), CellValue::Float(4.5), CellValue::Bool(true)],
                vec![CellValue::Empty, CellValue::Int(2), CellValue::Bool(false)],
            ],
        )
        .expect("table")
    }

    #[test]
    fn csv_quotes_and_coerces_cells() {
        let bytes = write_csv(&sample()).expect("csv");
        let text = String::from_utf8(bytes).expect("utf8");
        assert_eq!(
            text,
            "review,score,ok\n\"bagus, \"\"sekali\"\"\",4.5,True\n,2,False\n"
        );
    }

    #[test]
    fn xlsx_keeps_numeric_cells() {
        let bytes = write_xlsx(&sample()).expect("xlsx");
        let mut workbook = Xlsx::new(Cursor::new(bytes)).expect("open workbook");
        assert_eq!(workbook.sheet_names(), vec![SHEET_NAME.to_string()]);

        let range = workbook.worksheet_range(SHEET_NAME).expect("sheet");
        assert_eq!(range.get_value((0, 0)), Some(&Data::String("review".into())));
        assert_eq!(range.get_value((1, 1)), Some(&Data::Float(4.5)));
        assert_eq!(range.get_value((1, 2)), Some(&Data::Bool(true)));
        assert_eq!(range.get_value((2, 1)), Some(&Data::Float(2.0)));
    }
}
