use calamine::{Data, Reader, Xlsx};
use rust_xlsxwriter::{Format, FormatAlign};
use std::io::Cursor;

use crate::error::{Result, TemplateError};
use crate::model::{Sheet, Workbook, DESCRIPTION_ROW, GUIDANCE_ROW, LABEL_ROW, PROPERTY_ROW};

/// Read every sheet of an `.xlsx` file into memory as text cells
pub fn read_workbook(bytes: Vec<u8>) -> Result<Workbook> {
    let mut reader: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
    let mut workbook = Workbook::new();

    for name in reader.sheet_names() {
        let range = reader
            .worksheet_range(&name)
            .map_err(|e| TemplateError::Workbook(format!("Failed to read sheet '{}': {}", name, e)))?;

        let mut sheet = Sheet::new(name);
        // Ranges start at the first used cell, not at A1
        let (row_offset, column_offset) = range
            .start()
            .map(|(row, column)| (row as usize, column as usize))
            .unwrap_or((0, 0));
        for (row, cells) in range.rows().enumerate() {
            for (column, cell) in cells.iter().enumerate() {
                let text = cell_text(cell);
                if !text.is_empty() {
                    sheet.set_cell(row + row_offset, column + column_offset, text);
                }
            }
        }
        workbook.add_sheet(sheet);
    }

    Ok(workbook)
}

/// Write a workbook, styling the four header rows the way generated templates look
pub fn write_workbook(workbook: &Workbook) -> Result<Vec<u8>> {
    let mut output = rust_xlsxwriter::Workbook::new();

    let label_format = Format::new().set_bold().set_text_wrap();
    let description_format = Format::new().set_italic().set_text_wrap();
    let guidance_format = Format::new().set_text_wrap().set_align(FormatAlign::Top);
    let property_format = Format::new().set_font_size(8);

    for sheet in &workbook.sheets {
        let worksheet = output.add_worksheet().set_name(&sheet.name)?;
        for (row, cells) in sheet.rows.iter().enumerate() {
            let format = match row {
                LABEL_ROW => Some(&label_format),
                DESCRIPTION_ROW => Some(&description_format),
                GUIDANCE_ROW => Some(&guidance_format),
                PROPERTY_ROW => Some(&property_format),
                _ => None,
            };
            for (column, value) in cells.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                let (row, column) = cell_position(row, column)?;
                match format {
                    Some(format) => worksheet.write_string_with_format(row, column, value, format)?,
                    None => worksheet.write_string(row, column, value)?,
                };
            }
        }
    }

    Ok(output.save_to_buffer()?)
}

fn cell_position(row: usize, column: usize) -> Result<(u32, u16)> {
    let row = u32::try_from(row).map_err(|_| TemplateError::Workbook(format!("row {} out of range", row)))?;
    let column =
        u16::try_from(column).map_err(|_| TemplateError::Workbook(format!("column {} out of range", column)))?;
    Ok((row, column))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::String(s) => s.clone(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => format!("{:?}", dt),
        Data::DateTimeIso(dt) => dt.to_string(),
        Data::DurationIso(d) => d.to_string(),
        Data::Error(e) => format!("{:?}", e),
        Data::Empty => String::new(),
    }
}
