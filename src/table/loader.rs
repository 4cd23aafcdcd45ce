//! CSV / XLSX の読み込み。
//!
//! 検査順序は「拡張子 → 存在確認 → パース → 列の存在」で固定する。
//! パース中の失敗はすべて [`AnalysisError::ParseFailed`] に畳み込む。
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use anyhow::{Context, anyhow};
use calamine::{Data, Reader, Xlsx, open_workbook};
use tracing::debug;

use super::{CellValue, Table, normalize_headers};
use crate::error::AnalysisError;

/// Extensions accepted for upload, lowercase without the dot.
pub const ALLOWED_EXTENSIONS: [&str; 2] = ["csv", "xlsx"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Xlsx,
}

impl TableFormat {
    /// Case-insensitive lookup on the final extension of `name`.
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        let extension = Path::new(name).extension()?.to_str()?;
        Self::from_extension(extension)
    }

    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        Self::from_extension(path.extension()?.to_str()?)
    }

    fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Xlsx),
            _ => None,
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }
}

/// Reads `path` into a [`Table`] and coerces `text_column` to text.
///
/// # Errors
/// - [`AnalysisError::UnsupportedFormat`] for anything but `.csv` / `.xlsx`
/// - [`AnalysisError::FileNotFound`] when the path does not exist
/// - [`AnalysisError::ParseFailed`] when the content cannot be parsed
/// - [`AnalysisError::ColumnNotFound`] when `text_column` is not a header
pub fn load_table(path: &Path, text_column: &str) -> Result<Table, AnalysisError> {
    let format = TableFormat::from_path(path).ok_or_else(|| AnalysisError::UnsupportedFormat {
        extension: path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_string),
    })?;

    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => {
            return Err(AnalysisError::parse_failed(anyhow!(
                "{} is not a regular file",
                path.display()
            )));
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(AnalysisError::FileNotFound);
        }
        Err(err) => return Err(AnalysisError::parse_failed(err)),
    }

    let mut table = match format {
        TableFormat::Csv => read_csv(path),
        TableFormat::Xlsx => read_xlsx(path),
    }
    .map_err(AnalysisError::parse_failed)?;

    let Some(index) = table.column_index(text_column) else {
        return Err(AnalysisError::ColumnNotFound {
            column: text_column.to_string(),
            available: table.columns().to_vec(),
        });
    };
    table.coerce_column_to_text(index);

    debug!(
        path = %path.display(),
        format = format.extension(),
        rows = table.len(),
        columns = table.columns().len(),
        "table loaded"
    );
    Ok(table)
}

fn read_csv(path: &Path) -> anyhow::Result<Table> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let headers = reader
        .headers()
        .context("read CSV header")?
        .iter()
        .map(|header| header.trim_start_matches('\u{feff}').to_string())
        .collect::<Vec<_>>();
    if headers.is_empty() || headers.iter().all(|header| header.trim().is_empty()) {
        return Err(anyhow!("CSV file has no header row"));
    }
    let mut table = Table::new(normalize_headers(headers));
    let width = table.columns().len();

    for (line, record) in reader.records().enumerate() {
        // 完全な空行は csv クレートが読み飛ばす。`""` だけの行は空セルの 1 行として残す
        let record = record.with_context(|| format!("read CSV record {}", line + 1))?;
        if record.len() > width {
            return Err(anyhow!(
                "CSV record {} has {} fields, header has {}",
                line + 1,
                record.len(),
                width
            ));
        }
        let mut row: Vec<CellValue> = record.iter().map(csv_cell).collect();
        row.resize(width, CellValue::Empty);
        table.push_row(row)?;
    }
    Ok(table)
}

fn csv_cell(field: &str) -> CellValue {
    if field.is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(field.to_string())
    }
}

fn read_xlsx(path: &Path) -> anyhow::Result<Table> {
    let mut workbook: Xlsx<_> =
        open_workbook(path).with_context(|| format!("open workbook {}", path.display()))?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("workbook has no sheets"))?;
    let range = workbook
        .worksheet_range(&sheet)
        .with_context(|| format!("read sheet {sheet}"))?;

    let mut rows = range.rows();
    let header_row = rows
        .next()
        .ok_or_else(|| anyhow!("sheet {sheet} is empty"))?;
    let headers = header_row
        .iter()
        .map(|cell| xlsx_cell(cell).as_text().into_owned())
        .collect::<Vec<_>>();
    let mut table = Table::new(normalize_headers(headers));

    let mut body: Vec<Vec<CellValue>> = rows
        .map(|row| row.iter().map(xlsx_cell).collect())
        .collect();
    // 書式だけが残ったセルで使用範囲が伸びることがあるので、末尾の空行だけ落とす。
    // 途中の空行はデータ行として保持する。
    while body
        .last()
        .is_some_and(|cells| cells.iter().all(CellValue::is_empty))
    {
        body.pop();
    }
    for cells in body {
        table.push_row(cells)?;
    }
    Ok(table)
}

fn xlsx_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(text) => CellValue::Text(text.clone()),
        Data::Int(value) => CellValue::Int(*value),
        Data::Float(value) => CellValue::Float(*value),
        Data::Bool(value) => CellValue::Bool(*value),
        Data::Error(err) => CellValue::Text(format!("#{err:?}")),
        other => CellValue::Text(other.to_string()),
    }
}
