use serde::{Deserialize, Serialize};

/// Row layout of every generated sheet, zero based
pub const LABEL_ROW: usize = 0;
pub const DESCRIPTION_ROW: usize = 1;
pub const GUIDANCE_ROW: usize = 2;
/// Machine-readable property paths; migration anchors on this row
pub const PROPERTY_ROW: usize = 3;
pub const FIRST_DATA_ROW: usize = 4;

/// Names of the legacy sheet listing schema urls
pub const SCHEMAS_SHEET_NAMES: [&str; 2] = ["Schemas", "schemas"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|sheet| sheet.name == name)
    }

    pub fn add_sheet(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|sheet| sheet.name.as_str()).collect()
    }

    pub fn remove_legacy_schemas_sheet(&mut self) -> bool {
        let before = self.sheets.len();
        self.sheets
            .retain(|sheet| !SCHEMAS_SHEET_NAMES.contains(&sheet.name.as_str()));
        before != self.sheets.len()
    }
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    /// Cell text, empty for cells outside the written area
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn set_cell(&mut self, row: usize, column: usize, value: impl Into<String>) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= column {
            cells.resize(column + 1, String::new());
        }
        cells[column] = value.into();
    }

    /// Remove a column, shifting everything to its right one place left
    pub fn delete_column(&mut self, column: usize) {
        for cells in &mut self.rows {
            if column < cells.len() {
                cells.remove(column);
            }
        }
    }

    pub fn property_at(&self, column: usize) -> &str {
        self.cell(PROPERTY_ROW, column).trim()
    }
}
