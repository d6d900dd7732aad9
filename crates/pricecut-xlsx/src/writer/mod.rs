//! XLSX writer

mod drawing;

use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use crate::error::{XlsxError, XlsxResult};
use pricecut_core::{CellAddress, CellValue, Workbook, Worksheet};

/// Stylesheet written when the workbook carries none: a single default
/// font, the two mandatory fills, one border and one cell format.
const DEFAULT_STYLESHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
    <fonts count="1"><font><sz val="11"/><name val="Calibri"/><family val="2"/></font></fonts>
    <fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>
    <borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
    <cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
    <cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs>
    <cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>
</styleSheet>"#;

/// Escape text for use in XML content or attribute values
pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Part numbers for a worksheet's drawing and its charts
struct SheetDrawing {
    /// `xl/drawings/drawing{drawing}.xml`
    drawing: usize,
    /// `xl/charts/chart{n}.xml` for each chart, in sheet order
    charts: Vec<usize>,
}

/// Assign workbook-wide drawing and chart part numbers
fn plan_drawings(workbook: &Workbook) -> Vec<Option<SheetDrawing>> {
    let mut next_drawing = 1;
    let mut next_chart = 1;

    workbook
        .worksheets()
        .map(|sheet| {
            if sheet.charts().is_empty() {
                return None;
            }
            let charts = (next_chart..next_chart + sheet.charts().len()).collect();
            next_chart += sheet.charts().len();
            let drawing = next_drawing;
            next_drawing += 1;
            Some(SheetDrawing { drawing, charts })
        })
        .collect()
}

/// XLSX file writer
pub struct XlsxWriter;

impl XlsxWriter {
    /// Write a workbook to a file path
    pub fn write_file<P: AsRef<Path>>(workbook: &Workbook, path: P) -> XlsxResult<()> {
        let file = File::create(path)?;
        Self::write(workbook, file)
    }

    /// Write a workbook to a writer
    pub fn write<W: Write + Seek>(workbook: &Workbook, writer: W) -> XlsxResult<()> {
        if workbook.is_empty() {
            return Err(XlsxError::InvalidFormat(
                "A workbook needs at least one worksheet".into(),
            ));
        }

        let mut zip = zip::ZipWriter::new(writer);
        let drawings = plan_drawings(workbook);

        // Write [Content_Types].xml
        Self::write_content_types(&mut zip, workbook, &drawings)?;

        // Write _rels/.rels
        Self::write_root_rels(&mut zip)?;

        // Write xl/workbook.xml
        Self::write_workbook_xml(&mut zip, workbook)?;

        // Write xl/_rels/workbook.xml.rels
        Self::write_workbook_rels(&mut zip, workbook)?;

        // Write xl/styles.xml
        Self::write_styles_xml(&mut zip, workbook)?;

        // Write worksheets, then their drawings and charts
        let keep_styles = workbook.stylesheet().is_some();
        for (i, (sheet, drawing)) in workbook.worksheets().zip(&drawings).enumerate() {
            Self::write_worksheet(&mut zip, sheet, i, drawing.is_some(), keep_styles)?;

            if let Some(drawing) = drawing {
                Self::write_worksheet_rels(&mut zip, i, drawing.drawing)?;
                Self::write_drawing(&mut zip, sheet, drawing)?;
            }
        }

        zip.finish()?;
        Ok(())
    }

    fn write_content_types<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        workbook: &Workbook,
        drawings: &[Option<SheetDrawing>],
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", options)?;

        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
    <Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
        );

        // Add an override for each worksheet
        for i in 0..workbook.sheet_count() {
            content.push_str(&format!(
                r#"
    <Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                i + 1
            ));
        }

        for drawing in drawings.iter().flatten() {
            content.push_str(&format!(
                r#"
    <Override PartName="/xl/drawings/drawing{}.xml" ContentType="application/vnd.openxmlformats-officedocument.drawing+xml"/>"#,
                drawing.drawing
            ));
            for chart in &drawing.charts {
                content.push_str(&format!(
                    r#"
    <Override PartName="/xl/charts/chart{}.xml" ContentType="application/vnd.openxmlformats-officedocument.drawingml.chart+xml"/>"#,
                    chart
                ));
            }
        }

        content.push_str("\n</Types>");

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_root_rels<W: Write + Seek>(zip: &mut zip::ZipWriter<W>) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("_rels/.rels", options)?;

        let content = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_workbook_xml<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        workbook: &Workbook,
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("xl/workbook.xml", options)?;

        let mut content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
    <bookViews>
        <workbookView activeTab="{}"/>
    </bookViews>
    <sheets>"#,
            workbook.active_sheet()
        );

        for (i, sheet) in workbook.worksheets().enumerate() {
            content.push_str(&format!(
                r#"
        <sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape_xml(sheet.name()),
                i + 1,
                i + 1
            ));
        }

        content.push_str(
            r#"
    </sheets>
</workbook>"#,
        );

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_workbook_rels<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        workbook: &Workbook,
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("xl/_rels/workbook.xml.rels", options)?;

        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );

        for i in 0..workbook.sheet_count() {
            content.push_str(&format!(
                r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                i + 1,
                i + 1
            ));
        }

        // Styles relationship
        content.push_str(&format!(
            r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
            workbook.sheet_count() + 1
        ));

        content.push_str("\n</Relationships>");

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_styles_xml<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        workbook: &Workbook,
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("xl/styles.xml", options)?;
        match workbook.stylesheet() {
            Some(xml) => zip.write_all(xml)?,
            None => zip.write_all(DEFAULT_STYLESHEET.as_bytes())?,
        }
        Ok(())
    }

    fn write_worksheet<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        sheet: &Worksheet,
        index: usize,
        has_drawing: bool,
        keep_styles: bool,
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file(format!("xl/worksheets/sheet{}.xml", index + 1), options)?;

        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
        );

        let widths = sheet.custom_column_widths();
        if !widths.is_empty() {
            content.push_str("\n    <cols>");
            for (col, width) in widths {
                content.push_str(&format!(
                    "\n        <col min=\"{0}\" max=\"{0}\" width=\"{1}\" customWidth=\"1\"/>",
                    col + 1,
                    width
                ));
            }
            content.push_str("\n    </cols>");
        }

        content.push_str("\n    <sheetData>");

        // Write cell data (sparse, row-major)
        let mut current_row: Option<u32> = None;
        for (row, col, cell) in sheet.iter_cells() {
            if current_row != Some(row) {
                // Close previous row
                if current_row.is_some() {
                    content.push_str("\n        </row>");
                }
                // Open new row
                content.push_str(&format!("\n        <row r=\"{}\">", row + 1));
                current_row = Some(row);
            }

            let cell_ref = CellAddress::new(row, col).to_a1_string();
            let style_attr = if keep_styles && cell.style_index != 0 {
                format!(" s=\"{}\"", cell.style_index)
            } else {
                String::new()
            };

            match &cell.value {
                CellValue::Formula { text, cached_value } => {
                    let formula_text = text.strip_prefix('=').unwrap_or(text);
                    let (type_attr, cached) = match cached_value.as_deref() {
                        Some(value) => Self::value_payload(value),
                        None => ("", None),
                    };
                    content.push_str(&format!(
                        "\n            <c r=\"{}\"{}{}><f>{}</f>",
                        cell_ref,
                        style_attr,
                        type_attr,
                        escape_xml(formula_text)
                    ));
                    if let Some(cached) = cached {
                        content.push_str(&format!("<v>{}</v>", cached));
                    }
                    content.push_str("</c>");
                }
                CellValue::String(s) => {
                    content.push_str(&format!(
                        "\n            <c r=\"{}\"{} t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
                        cell_ref,
                        style_attr,
                        escape_xml(s.as_str())
                    ));
                }
                CellValue::Empty => {
                    // Preserve style-only cells
                    if !style_attr.is_empty() {
                        content.push_str(&format!(
                            "\n            <c r=\"{}\"{}/>",
                            cell_ref, style_attr
                        ));
                    }
                }
                value => {
                    let (type_attr, payload) = Self::value_payload(value);
                    if let Some(payload) = payload {
                        content.push_str(&format!(
                            "\n            <c r=\"{}\"{}{}><v>{}</v></c>",
                            cell_ref, style_attr, type_attr, payload
                        ));
                    }
                }
            }
        }

        if current_row.is_some() {
            content.push_str("\n        </row>");
        }

        content.push_str("\n    </sheetData>");

        if has_drawing {
            content.push_str("\n    <drawing r:id=\"rId1\"/>");
        }

        content.push_str("\n</worksheet>");

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    /// `t` attribute and `<v>` payload for a plain (non-formula) value
    fn value_payload(value: &CellValue) -> (&'static str, Option<String>) {
        match value {
            // Dates stay serials; the cell style carries the date format
            CellValue::Number(n) | CellValue::DateTime(n) if n.is_finite() => {
                ("", Some(n.to_string()))
            }
            // XLSX has no representation for NaN or infinity
            CellValue::Number(_) | CellValue::DateTime(_) => {
                (" t=\"e\"", Some("#NUM!".to_string()))
            }
            CellValue::Boolean(b) => (" t=\"b\"", Some(if *b { "1" } else { "0" }.to_string())),
            CellValue::Error(e) => (" t=\"e\"", Some(escape_xml(e.as_str()))),
            CellValue::String(s) => (" t=\"str\"", Some(escape_xml(s.as_str()))),
            CellValue::Empty | CellValue::Formula { .. } => ("", None),
        }
    }

    /// Write worksheet relationships file (the sheet's drawing)
    fn write_worksheet_rels<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        sheet_index: usize,
        drawing_number: usize,
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file(
            format!("xl/worksheets/_rels/sheet{}.xml.rels", sheet_index + 1),
            options,
        )?;

        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing" Target="../drawings/drawing{}.xml"/>
</Relationships>"#,
            drawing_number
        );

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    /// Write a sheet's drawing part, its relationships and its chart parts
    fn write_drawing<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        sheet: &Worksheet,
        plan: &SheetDrawing,
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();

        zip.start_file(format!("xl/drawings/drawing{}.xml", plan.drawing), options)?;
        zip.write_all(drawing::drawing_xml(sheet.charts()).as_bytes())?;

        zip.start_file(
            format!("xl/drawings/_rels/drawing{}.xml.rels", plan.drawing),
            options,
        )?;
        zip.write_all(drawing::drawing_rels_xml(&plan.charts).as_bytes())?;

        for (chart, number) in sheet.charts().iter().zip(&plan.charts) {
            zip.start_file(format!("xl/charts/chart{}.xml", number), options)?;
            zip.write_all(drawing::chart_xml(chart).as_bytes())?;
        }

        Ok(())
    }
}
