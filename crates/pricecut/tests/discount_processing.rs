//! End-to-end tests for discount processing (fixture -> process -> reload -> verify)

use pretty_assertions::assert_eq;
use pricecut::prelude::*;
use pricecut::{DiscountOutcome, CORRECTED_HEADER};
use std::error::Error as _;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Save a workbook built by `build` as `dir/name`
fn write_fixture(dir: &TempDir, name: &str, build: impl FnOnce(&mut Workbook)) -> PathBuf {
    let path = dir.path().join(name);
    let mut workbook = Workbook::new();
    build(&mut workbook);
    workbook.save(&path).unwrap();
    path
}

/// Fill a sheet with a header row and one item per price, starting at row 2
fn fill_prices(sheet: &mut Worksheet, prices: Vec<CellValue>) {
    sheet.set_cell_value("A1", "Item").unwrap();
    sheet.set_cell_value("B1", "Qty").unwrap();
    sheet.set_cell_value("C1", "Price").unwrap();
    for (i, price) in prices.into_iter().enumerate() {
        let row = i as u32 + 1;
        sheet
            .set_cell_value_at(row, 0, format!("Item {}", row + 1))
            .unwrap();
        sheet.set_cell_value_at(row, 1, 1.0).unwrap();
        sheet.set_cell_value_at(row, 2, price).unwrap();
    }
}

fn read_part(path: &Path, name: &str) -> String {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut part = archive.by_name(name).unwrap();
    let mut content = String::new();
    part.read_to_string(&mut content).unwrap();
    content
}

fn files_in(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path()).unwrap().count()
}

/// Test the reference scenario: one bad price between two good ones
#[test]
fn test_process_mixed_prices() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(&dir, "transactions.xlsx", |wb| {
        fill_prices(
            wb.worksheet_mut(0).unwrap(),
            vec![
                CellValue::Number(100.0),
                CellValue::string("bad"),
                CellValue::Number(50.0),
            ],
        );
    });

    let report = DiscountProcessor::new(DiscountOptions::default())
        .run(&input)
        .unwrap()
        .unwrap();

    assert_eq!(report.output, dir.path().join("transactions_corrected.xlsx"));
    assert_eq!(report.processed, 2);
    assert_eq!((report.first_row, report.last_row), (2, 4));
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].row, 3);

    let saved = Workbook::open(&report.output).unwrap();
    let sheet = saved.worksheet_by_name("Sheet1").unwrap();
    assert_eq!(sheet.get_value("D1").unwrap(), CellValue::string(CORRECTED_HEADER));
    assert_eq!(sheet.get_value("D2").unwrap().as_number(), Some(100.0 * (1.0 - 0.1)));
    assert!(sheet.get_value("D3").unwrap().is_empty());
    assert_eq!(sheet.get_value("D4").unwrap().as_number(), Some(50.0 * (1.0 - 0.1)));
    assert!((sheet.get_value("D2").unwrap().as_number().unwrap() - 90.0).abs() < 1e-9);
    assert!((sheet.get_value("D4").unwrap().as_number().unwrap() - 45.0).abs() < 1e-9);

    // Input untouched
    let original = Workbook::open(&input).unwrap();
    assert!(original.worksheet(0).unwrap().get_value("D2").unwrap().is_empty());

    let chart = read_part(&report.output, "xl/charts/chart1.xml");
    assert!(chart.contains("<c:barDir val=\"col\"/>"));
    assert!(chart.contains("&apos;Sheet1&apos;!$D$2:$D$4"));
    assert!(chart.contains("&apos;Sheet1&apos;!$A$2:$A$4"));
    assert!(chart.contains("<a:t>Corrected Prices (10.0% Discount Applied)</a:t>"));
    assert!(chart.contains("<a:t>Items</a:t>"));
    assert!(chart.contains("<a:t>Price</a:t>"));

    // Anchored at F2
    let drawing = read_part(&report.output, "xl/drawings/drawing1.xml");
    assert!(drawing.contains("<xdr:from><xdr:col>5</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>1</xdr:row>"));
}

/// Test that a missing input fails before anything is written
#[test]
fn test_missing_input_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("missing.xlsx");

    let err = process_workbook(&input, 0.1, None).unwrap_err();

    assert!(matches!(err, ProcessError::FileNotFound(ref p) if p == &input));
    assert_eq!(
        err.to_string(),
        format!("Input file '{}' not found", input.display())
    );
    assert_eq!(files_in(&dir), 0);
}

/// Test that a directory is not accepted as the input file
#[test]
fn test_directory_input() {
    let dir = TempDir::new().unwrap();
    let err = process_workbook(dir.path(), 0.1, None).unwrap_err();
    assert!(matches!(err, ProcessError::FileNotFound(_)));
}

/// Test that no output is produced when no price can be read
#[test]
fn test_no_valid_prices() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(&dir, "text.xlsx", |wb| {
        fill_prices(
            wb.worksheet_mut(0).unwrap(),
            vec![CellValue::string("n/a"), CellValue::string("TBD")],
        );
    });

    let result = process_workbook(&input, 0.1, None).unwrap();

    assert_eq!(result, None);
    assert!(!dir.path().join("text_corrected.xlsx").exists());
    assert_eq!(files_in(&dir), 1);
}

/// Test that a sheet with only a header row produces no output
#[test]
fn test_header_only_sheet() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(&dir, "empty.xlsx", |wb| {
        fill_prices(wb.worksheet_mut(0).unwrap(), Vec::new());
    });

    assert_eq!(process_workbook(&input, 0.1, None).unwrap(), None);
    assert_eq!(files_in(&dir), 1);
}

/// Test default output naming through the function-level entry point
#[test]
fn test_default_output_name() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(&dir, "transactions.xlsx", |wb| {
        fill_prices(wb.worksheet_mut(0).unwrap(), vec![CellValue::Number(10.0)]);
    });

    let output = process_workbook(&input, 0.1, None).unwrap();

    let expected = dir.path().join("transactions_corrected.xlsx");
    assert_eq!(output, Some(expected.clone()));
    assert!(expected.is_file());
}

/// Test an explicit output path
#[test]
fn test_explicit_output() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(&dir, "in.xlsx", |wb| {
        fill_prices(wb.worksheet_mut(0).unwrap(), vec![CellValue::Number(80.0)]);
    });
    let target = dir.path().join("report.xlsx");

    let output = process_workbook(&input, 0.5, Some(target.clone())).unwrap();

    assert_eq!(output, Some(target.clone()));
    assert!(!dir.path().join("in_corrected.xlsx").exists());
    let saved = Workbook::open(&target).unwrap();
    assert_eq!(
        saved.worksheet(0).unwrap().get_value("D2").unwrap().as_number(),
        Some(40.0)
    );
}

/// Test that a second run keeps the header from the first
#[test]
fn test_reprocessing_keeps_header() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(&dir, "prices.xlsx", |wb| {
        let sheet = wb.worksheet_mut(0).unwrap();
        fill_prices(sheet, vec![CellValue::Number(100.0)]);
        sheet.set_cell_value("D1", "Net (EUR)").unwrap();
    });

    let first = process_workbook(&input, 0.1, None).unwrap().unwrap();
    let second = process_workbook(&first, 0.1, None).unwrap().unwrap();

    assert_eq!(second, dir.path().join("prices_corrected_corrected.xlsx"));
    let saved = Workbook::open(&second).unwrap();
    let sheet = saved.worksheet(0).unwrap();
    assert_eq!(sheet.get_value("D1").unwrap(), CellValue::string("Net (EUR)"));
    // Each run reads column C, so the discount is not compounded
    assert_eq!(sheet.get_value("D2").unwrap().as_number(), Some(100.0 * (1.0 - 0.1)));
}

/// Test falling back to the active sheet when "Sheet1" is missing
#[test]
fn test_active_sheet_fallback() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(&dir, "quarterly.xlsx", |wb| {
        *wb = Workbook::empty();
        wb.add_worksheet_with_name("Summary").unwrap();
        let prices = wb.add_worksheet_with_name("Q1 Prices").unwrap();
        fill_prices(
            wb.worksheet_mut(prices).unwrap(),
            vec![CellValue::Number(20.0), CellValue::Number(30.0)],
        );
        wb.set_active_sheet(prices).unwrap();
    });

    let report = DiscountProcessor::new(DiscountOptions::default())
        .run(&input)
        .unwrap()
        .unwrap();
    assert_eq!(report.processed, 2);

    let saved = Workbook::open(&report.output).unwrap();
    assert!(saved.worksheet_by_name("Summary").unwrap().is_empty());
    let sheet = saved.worksheet_by_name("Q1 Prices").unwrap();
    assert_eq!(sheet.get_value("D3").unwrap().as_number(), Some(30.0 * (1.0 - 0.1)));

    // The chart belongs to the processed sheet
    let rels = read_part(&report.output, "xl/worksheets/_rels/sheet2.xml.rels");
    assert!(rels.contains("../drawings/drawing1.xml"));
    let chart = read_part(&report.output, "xl/charts/chart1.xml");
    assert!(chart.contains("&apos;Q1 Prices&apos;!$D$2:$D$3"));
}

/// Test that a named sheet is preferred over the active one
#[test]
fn test_named_sheet_option() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(&dir, "named.xlsx", |wb| {
        let idx = wb.add_worksheet_with_name("Prices").unwrap();
        fill_prices(wb.worksheet_mut(idx).unwrap(), vec![CellValue::Number(5.0)]);
    });

    let options = DiscountOptions::default()
        .with_sheet_name("Prices")
        .with_chart_anchor("H4");
    let report = DiscountProcessor::new(options).run(&input).unwrap().unwrap();

    assert_eq!(report.processed, 1);
    let drawing = read_part(&report.output, "xl/drawings/drawing1.xml");
    assert!(drawing.contains("<xdr:from><xdr:col>7</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>3</xdr:row>"));
}

/// Test that the chart spans first..last processed row, gaps included
#[test]
fn test_chart_range_ignores_leading_and_trailing_skips() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(&dir, "gaps.xlsx", |wb| {
        fill_prices(
            wb.worksheet_mut(0).unwrap(),
            vec![
                CellValue::string("header?"),
                CellValue::Number(10.0),
                CellValue::string("oops"),
                CellValue::Empty,
                CellValue::Number(20.0),
                CellValue::string("total"),
            ],
        );
    });

    let report = DiscountProcessor::new(DiscountOptions::default())
        .run(&input)
        .unwrap()
        .unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!((report.first_row, report.last_row), (3, 6));
    let skipped: Vec<u32> = report.skipped.iter().map(|s| s.row).collect();
    assert_eq!(skipped, vec![2, 4, 7]);

    let chart = read_part(&report.output, "xl/charts/chart1.xml");
    assert!(chart.contains("!$D$3:$D$6"));
    assert!(chart.contains("!$A$3:$A$6"));
}

/// Test the title for a non-default rate
#[test]
fn test_chart_title_rate() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(&dir, "rate.xlsx", |wb| {
        fill_prices(wb.worksheet_mut(0).unwrap(), vec![CellValue::Number(8.0)]);
    });

    let output = process_workbook(&input, 0.25, None).unwrap().unwrap();

    let chart = read_part(&output, "xl/charts/chart1.xml");
    assert!(chart.contains("Corrected Prices (25.0% Discount Applied)"));
    let saved = Workbook::open(&output).unwrap();
    assert_eq!(
        saved.worksheet(0).unwrap().get_value("D2").unwrap().as_number(),
        Some(6.0)
    );
}

/// Test that an unreadable workbook surfaces as a processing failure
#[test]
fn test_corrupt_input() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("broken.xlsx");
    std::fs::write(&input, b"Item,Qty,Price\nWidget,1,9.99\n").unwrap();

    let err = process_workbook(&input, 0.1, None).unwrap_err();

    assert!(matches!(err, ProcessError::ProcessingFailure(XlsxError::Zip(_))));
    assert!(err.to_string().starts_with("Error processing workbook: "));
    assert!(err.source().is_some());
    assert_eq!(files_in(&dir), 1);
}

/// Test that a non-XLSX extension is rejected
#[test]
fn test_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("prices.csv");
    std::fs::write(&input, b"Item,Qty,Price\n").unwrap();

    let err = process_workbook(&input, 0.1, None).unwrap_err();

    assert!(matches!(
        err,
        ProcessError::ProcessingFailure(XlsxError::UnsupportedFormat(_))
    ));
}

/// Test the in-memory transform on its own
#[test]
fn test_apply_discount_in_memory() {
    let mut workbook = Workbook::new();
    let sheet = workbook.worksheet_mut(0).unwrap();
    fill_prices(
        sheet,
        vec![CellValue::Number(19.99), CellValue::string(" 5 ")],
    );

    let outcome: DiscountOutcome = apply_discount(sheet, 0.1).unwrap();

    assert_eq!(outcome.processed_rows, vec![2, 3]);
    assert_eq!(sheet.get_value("D3").unwrap().as_number(), Some(5.0 * (1.0 - 0.1)));
}

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
    <numFmts count="1"><numFmt numFmtId="164" formatCode="&quot;$&quot;#,##0.00"/></numFmts>
    <fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>
    <fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>
    <borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
    <cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
    <cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs>
</styleSheet>"#;

/// Test that styles and column widths survive processing
#[test]
fn test_formatting_preserved() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(&dir, "styled.xlsx", |wb| {
        wb.set_stylesheet(STYLES.as_bytes().to_vec());
        let sheet = wb.worksheet_mut(0).unwrap();
        fill_prices(sheet, vec![CellValue::Number(12.0)]);
        sheet.set_cell_style_index_at(1, 2, 1).unwrap();
        sheet.set_column_width(0, 24.5);
    });

    let output = process_workbook(&input, 0.1, None).unwrap().unwrap();

    let saved = Workbook::open(&output).unwrap();
    assert_eq!(saved.stylesheet(), Some(STYLES.as_bytes()));
    let sheet = saved.worksheet(0).unwrap();
    assert_eq!(sheet.cell_style_index_at(1, 2), 1);
    assert_eq!(sheet.column_width(0), Some(24.5));
}

/// Write a single-sheet package from raw worksheet XML
fn write_raw_sheet(dir: &TempDir, name: &str, sheet_xml: &str) -> PathBuf {
    use std::io::Write;

    let parts = [
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/></Types>"#,
        ),
        (
            "xl/workbook.xml",
            r#"<?xml version="1.0"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#,
        ),
        ("xl/worksheets/sheet1.xml", sheet_xml),
    ];

    let path = dir.path().join(name);
    let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
    for (part, contents) in parts {
        zip.start_file(part, zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(contents.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
    path
}

/// Test that a filled-down formula in the price column is skipped on every row
#[test]
fn test_shared_formula_prices_are_skipped() {
    let dir = TempDir::new().unwrap();
    let input = write_raw_sheet(
        &dir,
        "filled.xlsx",
        r#"<?xml version="1.0"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1"><c r="A1" t="inlineStr"><is><t>Item</t></is></c><c r="C1" t="inlineStr"><is><t>Price</t></is></c></row>
    <row r="2"><c r="A2" t="inlineStr"><is><t>Pen</t></is></c><c r="B2"><v>5</v></c><c r="C2"><f t="shared" ref="C2:C4" si="0">B2*2</f><v>10</v></c></row>
    <row r="3"><c r="A3" t="inlineStr"><is><t>Ink</t></is></c><c r="B3"><v>6</v></c><c r="C3"><f t="shared" si="0"/><v>12</v></c></row>
    <row r="4"><c r="A4" t="inlineStr"><is><t>Pad</t></is></c><c r="B4"><v>7</v></c><c r="C4"><f t="shared" si="0"/><v>14</v></c></row>
  </sheetData>
</worksheet>"#,
    );

    assert_eq!(process_workbook(&input, 0.1, None).unwrap(), None);
    assert_eq!(files_in(&dir), 1);
}

/// Test that formula followers stay formulas next to a processed row
#[test]
fn test_shared_formula_rows_survive_processing() {
    let dir = TempDir::new().unwrap();
    let input = write_raw_sheet(
        &dir,
        "mixed.xlsx",
        r#"<?xml version="1.0"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1"><c r="A1" t="inlineStr"><is><t>Item</t></is></c><c r="C1" t="inlineStr"><is><t>Price</t></is></c></row>
    <row r="2"><c r="B2"><v>5</v></c><c r="C2"><f t="shared" ref="C2:C3" si="0">B2*2</f><v>10</v></c></row>
    <row r="3"><c r="B3"><v>6</v></c><c r="C3"><f t="shared" si="0"/><v>12</v></c></row>
    <row r="4"><c r="B4"><v>7</v></c><c r="C4"><v>40</v></c></row>
  </sheetData>
</worksheet>"#,
    );

    let report = DiscountProcessor::new(DiscountOptions::default())
        .run(&input)
        .unwrap()
        .unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!((report.first_row, report.last_row), (4, 4));
    let skipped: Vec<u32> = report.skipped.iter().map(|s| s.row).collect();
    assert_eq!(skipped, vec![2, 3]);

    let saved = Workbook::open(&report.output).unwrap();
    let sheet = saved.worksheet(0).unwrap();
    assert_eq!(
        sheet.get_value("C3").unwrap(),
        CellValue::Formula {
            text: "=B3*2".into(),
            cached_value: Some(Box::new(CellValue::Number(12.0))),
        }
    );
    assert!(sheet.get_value("D3").unwrap().is_empty());
    assert_eq!(sheet.get_value("D4").unwrap().as_number(), Some(40.0 * (1.0 - 0.1)));
}

/// Test that an invalid chart anchor is reported even when nothing is processed
#[test]
fn test_invalid_anchor_without_prices() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(&dir, "text.xlsx", |wb| {
        fill_prices(wb.worksheet_mut(0).unwrap(), vec![CellValue::string("n/a")]);
    });

    let err = DiscountProcessor::new(DiscountOptions::default().with_chart_anchor("not a cell"))
        .run(&input)
        .unwrap_err();

    assert!(matches!(err, ProcessError::ProcessingFailure(_)));
    assert_eq!(files_in(&dir), 1);
}

const DATE_STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
    <numFmts count="1"><numFmt numFmtId="164" formatCode="dd/mm/yyyy"/></numFmts>
    <fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>
    <fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>
    <borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
    <cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
    <cellXfs count="3"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/><xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs>
</styleSheet>"#;

/// Test that date-formatted prices are skipped and grouped digits are read
#[test]
fn test_date_formatted_prices_are_skipped() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(&dir, "dated.xlsx", |wb| {
        wb.set_stylesheet(DATE_STYLES.as_bytes().to_vec());
        let sheet = wb.worksheet_mut(0).unwrap();
        fill_prices(
            sheet,
            vec![
                CellValue::Number(45306.0),
                CellValue::Number(20.0),
                CellValue::Number(45307.25),
                CellValue::string("1_000"),
            ],
        );
        sheet.set_cell_style_index_at(1, 2, 1).unwrap();
        sheet.set_cell_style_index_at(3, 2, 2).unwrap();
    });

    let report = DiscountProcessor::new(DiscountOptions::default())
        .run(&input)
        .unwrap()
        .unwrap();

    assert_eq!((report.first_row, report.last_row), (3, 5));
    let skipped: Vec<(u32, &str)> = report
        .skipped
        .iter()
        .map(|s| (s.row, s.error.text.as_str()))
        .collect();
    assert_eq!(
        skipped,
        vec![(2, "2024-01-15 00:00:00"), (4, "2024-01-16 06:00:00")]
    );

    let saved = Workbook::open(&report.output).unwrap();
    let sheet = saved.worksheet(0).unwrap();
    assert_eq!(sheet.get_value("C2").unwrap(), CellValue::DateTime(45306.0));
    assert_eq!(sheet.get_value("D3").unwrap().as_number(), Some(20.0 * (1.0 - 0.1)));
    assert_eq!(sheet.get_value("D5").unwrap().as_number(), Some(1000.0 * (1.0 - 0.1)));
}
