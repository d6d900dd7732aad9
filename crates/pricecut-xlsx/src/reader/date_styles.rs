//! Which cell styles format their number as a date or time

use std::collections::{HashMap, HashSet};

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use super::{attr_parse, attr_value};
use crate::error::{XlsxError, XlsxResult};

/// Cell style indices (`s` attribute) whose number format is a date
#[derive(Debug, Default)]
pub(super) struct DateStyles {
    indices: HashSet<u32>,
}

impl DateStyles {
    /// Scan `<numFmts>` and `<cellXfs>` of a stylesheet
    pub(super) fn parse(xml: &[u8]) -> XlsxResult<Self> {
        let mut xml_reader = Reader::from_reader(xml);
        let mut buf = Vec::new();

        let mut custom: HashMap<u32, String> = HashMap::new();
        let mut xf_formats: Vec<u32> = Vec::new();
        let mut in_cell_xfs = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                    b"numFmt" => {
                        let id = attr_parse::<u32>(&e, b"numFmtId");
                        let code = attr_value(&e, b"formatCode");
                        if let (Some(id), Some(code)) = (id, code) {
                            custom.insert(id, code);
                        }
                    }
                    b"cellXfs" => in_cell_xfs = true,
                    b"xf" if in_cell_xfs => {
                        xf_formats.push(attr_parse::<u32>(&e, b"numFmtId").unwrap_or(0));
                    }
                    _ => {}
                },
                Ok(Event::End(e)) if e.name().as_ref() == b"cellXfs" => in_cell_xfs = false,
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        let indices = xf_formats
            .iter()
            .enumerate()
            .filter(|(_, id)| match custom.get(*id) {
                Some(code) => is_date_code(code),
                None => is_builtin_date(**id),
            })
            .map(|(index, _)| index as u32)
            .collect();

        Ok(Self { indices })
    }

    pub(super) fn is_date(&self, style: Option<u32>) -> bool {
        style.is_some_and(|s| self.indices.contains(&s))
    }
}

/// Built-in number formats that show a date or time
fn is_builtin_date(id: u32) -> bool {
    matches!(id, 14..=22 | 45..=47)
}

/// Whether a custom format code shows a date or time.
///
/// Only the first section counts. Quoted text, escaped characters, padding
/// and fill characters are ignored, as are bracketed colors and conditions.
/// Elapsed-time brackets (`[h]`, `[mm]`, `[ss]`) still count.
fn is_date_code(code: &str) -> bool {
    let section = code.split(';').next().unwrap_or("");
    let mut chars = section.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                for q in chars.by_ref() {
                    if q == '"' {
                        break;
                    }
                }
            }
            '\\' | '_' | '*' => {
                chars.next();
            }
            '[' => {
                let inner: String = chars.by_ref().take_while(|&b| b != ']').collect();
                let lower = inner.to_ascii_lowercase();
                if matches!(lower.as_str(), "h" | "hh" | "m" | "mm" | "s" | "ss") {
                    return true;
                }
            }
            c if matches!(c.to_ascii_lowercase(), 'd' | 'm' | 'h' | 'y' | 's') => return true,
            _ => {}
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_codes() {
        assert!(is_date_code("yyyy-mm-dd"));
        assert!(is_date_code("d/m/yy h:mm;@"));
        assert!(is_date_code("[$-409]mmmm d, yyyy"));
        assert!(is_date_code("[h]:mm:ss"));
        assert!(is_date_code("[Red]dd"));

        assert!(!is_date_code("0.00"));
        assert!(!is_date_code("#,##0 \"days\""));
        assert!(!is_date_code("[Red]0.00"));
        assert!(!is_date_code("0\\d"));
        assert!(!is_date_code("_-* #,##0_-;-* #,##0_-"));
        assert!(!is_date_code("0.00;dd"));
        assert!(!is_date_code("General"));
    }

    #[test]
    fn test_parse_stylesheet() {
        let xml = br#"<styleSheet>
            <numFmts count="2">
                <numFmt numFmtId="164" formatCode="dd/mm/yyyy"/>
                <numFmt numFmtId="165" formatCode="&quot;$&quot;#,##0.00"/>
            </numFmts>
            <cellStyleXfs count="1"><xf numFmtId="14"/></cellStyleXfs>
            <cellXfs count="6">
                <xf numFmtId="0" fontId="0"/>
                <xf numFmtId="14" fontId="0" applyNumberFormat="1"/>
                <xf numFmtId="164" fontId="0"/>
                <xf numFmtId="165" fontId="0"/>
                <xf numFmtId="4" fontId="0"><alignment horizontal="left"/></xf>
                <xf numFmtId="46"/>
            </cellXfs>
        </styleSheet>"#;

        let styles = DateStyles::parse(xml).unwrap();
        let dates: Vec<u32> = (0..7).filter(|&s| styles.is_date(Some(s))).collect();
        assert_eq!(dates, vec![1, 2, 5]);
        assert!(!styles.is_date(None));
    }
}
