//! XLSX reader

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use pricecut_core::{CellAddress, CellError, CellValue, SharedString, Workbook, Worksheet};

mod date_styles;
mod shared_formula;

use date_styles::DateStyles;
use shared_formula::SharedFormulas;

/// Decode Excel's `_xHHHH_` escape sequences in strings.
///
/// Excel uses this format to encode characters XML cannot carry verbatim:
/// - `_x000d_` = CR (carriage return)
/// - `_x000a_` = LF (line feed)
/// - `_x0009_` = Tab
/// - `_x005f_` = Underscore (escaped underscore)
fn decode_excel_escapes(s: &str) -> String {
    if !s.contains("_x") {
        return s.to_string();
    }

    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find("_x") {
        result.push_str(&rest[..pos]);
        let candidate = &rest[pos..];

        // _xHHHH_ is exactly 7 bytes
        let decoded = candidate
            .get(2..6)
            .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
            .filter(|_| candidate.as_bytes().get(6) == Some(&b'_'))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32);

        match decoded {
            Some(c) => {
                result.push(c);
                rest = &candidate[7..];
            }
            None => {
                result.push_str("_x");
                rest = &candidate[2..];
            }
        }
    }

    result.push_str(rest);
    result
}

/// Attribute value of an element, unescaped
fn attr_value(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|s| s.to_string()))
}

/// Attribute parsed into a number, `None` when absent or malformed
fn attr_parse<T: std::str::FromStr>(e: &BytesStart, key: &[u8]) -> Option<T> {
    attr_value(e, key).and_then(|s| s.parse::<T>().ok())
}

fn is_truthy(value: Option<String>) -> bool {
    matches!(value.as_deref(), Some("1") | Some("true"))
}

/// Sheet entry from `xl/workbook.xml`
struct SheetEntry {
    name: String,
    r_id: String,
}

/// Sheet list and selected tab from `xl/workbook.xml`
struct WorkbookInfo {
    sheets: Vec<SheetEntry>,
    active_tab: usize,
}

/// Workbook-level lookups a worksheet's cells refer to
struct SheetContext<'a> {
    shared_strings: &'a [SharedString],
    date_styles: &'a DateStyles,
}

/// Attributes of the `<c>` element being read
#[derive(Default)]
struct PendingCell {
    reference: Option<String>,
    cell_type: Option<String>,
    style: Option<u32>,
    value: Option<String>,
    formula: Option<String>,
    /// `si` of a `<f t="shared">` element
    shared_index: Option<u32>,
}

/// Position of the next cell, for `<c>` elements without an `r` attribute
#[derive(Default)]
struct CellCursor {
    next_row: u32,
    row: u32,
    col: u16,
}

impl CellCursor {
    /// Enter a `<row>`; one without `r` follows the previous row
    fn start_row(&mut self, e: &BytesStart) {
        self.row = match attr_parse::<u32>(e, b"r") {
            Some(r) if r > 0 => r - 1,
            _ => self.next_row,
        };
        self.next_row = self.row + 1;
        self.col = 0;
    }

    /// Address of a cell, inferred from its neighbours when it has no `r`
    fn place(&mut self, reference: Option<&str>) -> XlsxResult<CellAddress> {
        let addr = match reference {
            Some(r) => CellAddress::parse(r).map_err(|e| {
                XlsxError::Parse(format!("Invalid cell reference '{}': {}", r, e))
            })?,
            None => {
                let addr = CellAddress::new(self.row, self.col);
                log::debug!(
                    "Cell without a reference; placing it at {}",
                    addr.to_a1_string()
                );
                addr
            }
        };
        self.row = addr.row;
        self.next_row = addr.row + 1;
        self.col = addr.col.saturating_add(1);
        Ok(addr)
    }
}

/// `si` of a shared `<f>` element
fn shared_index(e: &BytesStart) -> Option<u32> {
    if attr_value(e, b"t").as_deref() != Some("shared") {
        return None;
    }
    attr_parse::<u32>(e, b"si")
}

/// XLSX file reader
pub struct XlsxReader;

impl XlsxReader {
    /// Read a workbook from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook> {
        let file = File::open(path)?;
        Self::read(file)
    }

    /// Read a workbook from a reader
    pub fn read<R: Read + Seek>(reader: R) -> XlsxResult<Workbook> {
        let mut archive = zip::ZipArchive::new(reader)?;

        // Verify this is an XLSX file
        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }

        // Read shared strings (if present)
        let shared_strings = Self::read_shared_strings(&mut archive)?;

        // Read workbook.xml to get sheet info
        let info = Self::read_workbook_xml(&mut archive)?;

        // Read workbook.xml.rels to get sheet paths
        let sheet_paths = Self::read_workbook_rels(&mut archive)?;

        let mut workbook = Workbook::empty();

        let mut date_styles = DateStyles::default();
        if let Some(styles) = Self::read_stylesheet(&mut archive)? {
            date_styles = DateStyles::parse(&styles)?;
            workbook.set_stylesheet(styles);
        }

        // Map workbook.xml positions to loaded sheet indices, since sheets
        // without a worksheet part are skipped
        let mut loaded_index = HashMap::new();

        for (position, entry) in info.sheets.iter().enumerate() {
            let Some(path) = sheet_paths.get(&entry.r_id) else {
                log::warn!(
                    "Skipping sheet '{}': relationship {} has no worksheet part",
                    entry.name,
                    entry.r_id
                );
                continue;
            };

            let sheet_idx = workbook.add_worksheet_with_name(&entry.name)?;
            let worksheet = workbook.worksheet_mut(sheet_idx).ok_or_else(|| {
                XlsxError::InvalidFormat(format!("Sheet '{}' was not added", entry.name))
            })?;
            let context = SheetContext {
                shared_strings: &shared_strings,
                date_styles: &date_styles,
            };
            Self::read_worksheet(&mut archive, path, worksheet, &context)?;
            loaded_index.insert(position, sheet_idx);
        }

        // Ensure at least one sheet exists
        if workbook.is_empty() {
            workbook.add_worksheet()?;
        }

        if let Some(&active) = loaded_index.get(&info.active_tab) {
            workbook.set_active_sheet(active)?;
        }

        Ok(workbook)
    }

    /// Read the shared strings table.
    ///
    /// Rich text entries are flattened to their run text. Phonetic runs
    /// (`<rPh>`) are not part of the cell value and are dropped.
    fn read_shared_strings<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<SharedString>> {
        let mut strings = Vec::new();

        let file = match archive.by_name("xl/sharedStrings.xml") {
            Ok(f) => f,
            Err(_) => return Ok(strings), // No shared strings is valid
        };

        // Cell text keeps its surrounding whitespace; text outside <t> is ignored
        let reader = BufReader::new(file);
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.trim_text(false);

        let mut buf = Vec::new();
        let mut current_string = String::new();
        let mut in_si = false;
        let mut in_t = false;
        let mut in_phonetic = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current_string.clear();
                    }
                    b"rPh" if in_si => in_phonetic = true,
                    b"t" if in_si && !in_phonetic => in_t = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) if e.name().as_ref() == b"si" => {
                    strings.push(SharedString::new(""));
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"si" => {
                        strings.push(SharedString::new(decode_excel_escapes(&current_string)));
                        current_string.clear();
                        in_si = false;
                    }
                    b"rPh" => in_phonetic = false,
                    b"t" => in_t = false,
                    _ => {}
                },
                Ok(Event::Text(e)) if in_t => {
                    current_string.push_str(&e.unescape()?);
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    /// Raw `xl/styles.xml`, kept as-is so cell style indices stay valid on save
    fn read_stylesheet<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Option<Vec<u8>>> {
        let mut file = match archive.by_name("xl/styles.xml") {
            Ok(f) => f,
            Err(_) => return Ok(None),
        };
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Ok(Some(bytes))
    }

    /// Read workbook.xml to get sheet names, rIds and the selected tab
    fn read_workbook_xml<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<WorkbookInfo> {
        let file = archive
            .by_name("xl/workbook.xml")
            .map_err(|_| XlsxError::MissingPart("xl/workbook.xml".into()))?;

        let reader = BufReader::new(file);
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut info = WorkbookInfo {
            sheets: Vec::new(),
            active_tab: 0,
        };

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"sheet" => {
                        if let (Some(name), Some(r_id)) =
                            (attr_value(&e, b"name"), attr_value(&e, b"r:id"))
                        {
                            info.sheets.push(SheetEntry { name, r_id });
                        }
                    }
                    b"workbookView" => {
                        if let Some(tab) = attr_parse::<usize>(&e, b"activeTab") {
                            info.active_tab = tab;
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(info)
    }

    /// Read workbook.xml.rels to get sheet file paths
    fn read_workbook_rels<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<HashMap<String, String>> {
        let file = archive
            .by_name("xl/_rels/workbook.xml.rels")
            .map_err(|_| XlsxError::MissingPart("xl/_rels/workbook.xml.rels".into()))?;

        let reader = BufReader::new(file);
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut rels = HashMap::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    let id = attr_value(&e, b"Id");
                    let target = attr_value(&e, b"Target");
                    let rel_type = attr_value(&e, b"Type");

                    // Only include worksheet relationships
                    if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) {
                        if rel_type.ends_with("/worksheet") {
                            // Target is relative to xl/ folder unless absolute
                            let full_path = match target.strip_prefix('/') {
                                Some(absolute) => absolute.to_string(),
                                None => format!("xl/{}", target),
                            };
                            rels.insert(id, full_path);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Read a worksheet from the archive
    fn read_worksheet<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        path: &str,
        worksheet: &mut Worksheet,
        context: &SheetContext,
    ) -> XlsxResult<()> {
        let file = archive
            .by_name(path)
            .map_err(|_| XlsxError::MissingPart(path.to_string()))?;

        let reader = BufReader::new(file);
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.trim_text(false);

        let mut buf = Vec::new();

        let mut cell = PendingCell::default();
        let mut cursor = CellCursor::default();
        let mut shared = SharedFormulas::default();
        let mut in_cell = false;
        let mut in_value = false;
        let mut in_formula = false;
        let mut in_inline_str = false;
        let mut in_inline_text = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"row" => cursor.start_row(&e),
                    b"c" => {
                        in_cell = true;
                        cell = Self::pending_cell(&e);
                    }
                    b"v" if in_cell => in_value = true,
                    b"f" if in_cell => {
                        in_formula = true;
                        cell.formula = Some(String::new());
                        cell.shared_index = shared_index(&e);
                    }
                    b"is" if in_cell => in_inline_str = true,
                    b"t" if in_inline_str => in_inline_text = true,
                    _ => {}
                },
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"c" => {
                        let addr = cursor.place(cell.reference.as_deref())?;
                        Self::process_cell(worksheet, addr, &cell, &mut shared, context)?;
                        in_cell = false;
                    }
                    b"v" => in_value = false,
                    b"f" => in_formula = false,
                    b"is" => in_inline_str = false,
                    b"t" if in_inline_str => in_inline_text = false,
                    _ => {}
                },
                Ok(Event::Empty(e)) => match e.name().as_ref() {
                    b"col" => Self::read_column(worksheet, &e),
                    b"row" => cursor.start_row(&e),
                    b"c" => {
                        // Empty cell element (may still carry a style)
                        let cell = Self::pending_cell(&e);
                        let addr = cursor.place(cell.reference.as_deref())?;
                        Self::process_cell(worksheet, addr, &cell, &mut shared, context)?;
                    }
                    // Shared formula follower; its text comes from the master
                    b"f" if in_cell => cell.shared_index = shared_index(&e),
                    _ => {}
                },
                Ok(Event::Text(e)) if in_cell => {
                    let text = e.unescape()?;
                    if in_formula {
                        if let Some(formula) = cell.formula.as_mut() {
                            formula.push_str(&text);
                        }
                    } else if in_value || in_inline_text {
                        cell.value.get_or_insert_with(String::new).push_str(&text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }

    fn pending_cell(e: &BytesStart) -> PendingCell {
        PendingCell {
            reference: attr_value(e, b"r"),
            cell_type: attr_value(e, b"t"),
            style: attr_parse::<u32>(e, b"s"),
            value: None,
            formula: None,
            shared_index: None,
        }
    }

    /// Apply a `<col min max width customWidth>` element
    fn read_column(worksheet: &mut Worksheet, e: &BytesStart) {
        let (Some(min), Some(max)) = (attr_parse::<u16>(e, b"min"), attr_parse::<u16>(e, b"max"))
        else {
            return;
        };
        if !is_truthy(attr_value(e, b"customWidth")) {
            return;
        }
        let Some(width) = attr_parse::<f64>(e, b"width") else {
            return;
        };

        // min/max are 1-based in XLSX
        for col in min..=max {
            worksheet.set_column_width(col.saturating_sub(1), width);
        }
    }

    /// Decode a `<v>` payload according to the cell's `t` attribute
    fn decode_value(
        cell_type: Option<&str>,
        raw: &str,
        shared_strings: &[SharedString],
    ) -> XlsxResult<CellValue> {
        let value = match cell_type {
            // Shared string
            Some("s") => {
                let idx: usize = raw.trim().parse().map_err(|_| {
                    XlsxError::Parse(format!("Invalid shared string index: {}", raw))
                })?;
                let s = shared_strings.get(idx).ok_or_else(|| {
                    XlsxError::Parse(format!("Shared string index {} out of bounds", idx))
                })?;
                CellValue::String(s.clone())
            }

            Some("b") => CellValue::Boolean(raw == "1" || raw.eq_ignore_ascii_case("true")),

            Some("e") => CellError::parse(raw)
                .map(CellValue::Error)
                .unwrap_or_else(|| CellValue::string(raw)),

            // Inline or formula string - decode Excel escape sequences
            Some("inlineStr") | Some("str") => CellValue::string(decode_excel_escapes(raw)),

            // Number (default type or explicit "n")
            None | Some("n") => match raw.trim().parse::<f64>() {
                Ok(n) => CellValue::Number(n),
                Err(_) => CellValue::string(raw),
            },

            // Unknown type - treat as string
            Some(_) => CellValue::string(raw),
        };
        Ok(value)
    }

    /// Formula text of a cell, expanding shared formula followers
    fn formula_text(
        addr: CellAddress,
        cell: &PendingCell,
        shared: &mut SharedFormulas,
    ) -> Option<String> {
        let own = cell.formula.as_deref().filter(|f| !f.is_empty());

        match (own, cell.shared_index) {
            (Some(f), Some(si)) => {
                shared.insert_master(si, addr, f);
                Some(f.to_string())
            }
            (Some(f), None) => Some(f.to_string()),
            (None, Some(si)) => {
                let text = shared.follower_text(si, addr);
                if text.is_none() {
                    log::warn!(
                        "Cell {} refers to unknown shared formula {}; loading its cached value",
                        addr.to_a1_string(),
                        si
                    );
                }
                text
            }
            (None, None) => None,
        }
    }

    /// Store a parsed cell in the worksheet
    fn process_cell(
        worksheet: &mut Worksheet,
        addr: CellAddress,
        cell: &PendingCell,
        shared: &mut SharedFormulas,
        context: &SheetContext,
    ) -> XlsxResult<()> {
        let shared_strings = context.shared_strings;
        let cell_type = cell.cell_type.as_deref();
        let value = cell.value.as_deref();

        match Self::formula_text(addr, cell, shared) {
            Some(f) => {
                let cached = value
                    .map(|v| Self::decode_value(cell_type, v, shared_strings))
                    .transpose()?;

                let text = if f.starts_with('=') {
                    f
                } else {
                    format!("={}", f)
                };

                worksheet.set_cell_value_at(
                    addr.row,
                    addr.col,
                    CellValue::Formula {
                        text,
                        cached_value: cached.map(Box::new),
                    },
                )?;
            }
            None => {
                if let Some(raw) = value {
                    let decoded = match Self::decode_value(cell_type, raw, shared_strings)? {
                        CellValue::Number(n) if context.date_styles.is_date(cell.style) => {
                            CellValue::DateTime(n)
                        }
                        decoded => decoded,
                    };
                    worksheet.set_cell_value_at(addr.row, addr.col, decoded)?;
                } else if cell_type == Some("inlineStr") {
                    worksheet.set_cell_value_at(addr.row, addr.col, CellValue::string(""))?;
                }
            }
        }

        if let Some(s) = cell.style.filter(|&s| s != 0) {
            worksheet.set_cell_style_index_at(addr.row, addr.col, s)?;
        }

        Ok(())
    }
}
