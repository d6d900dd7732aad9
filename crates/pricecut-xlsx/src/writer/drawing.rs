//! DrawingML parts: one drawing per worksheet with charts, one chart part
//! per chart.

use pricecut_chart::{Axis, BarDirection, Chart, DataReference};

use super::escape_xml;

const NS_CHART: &str = "http://schemas.openxmlformats.org/drawingml/2006/chart";
const NS_MAIN: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_RELS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const CATEGORY_AXIS_ID: u32 = 100_000_001;
const VALUE_AXIS_ID: u32 = 100_000_002;

/// `xl/drawings/drawingN.xml`: one two-cell anchor per chart.
///
/// Chart `i` is referenced through relationship `rId{i+1}` of the drawing.
pub(crate) fn drawing_xml(charts: &[Chart]) -> String {
    let mut xml = String::with_capacity(512 + charts.len() * 1024);
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    xml.push_str(&format!(
        "<xdr:wsDr xmlns:xdr=\"http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing\" xmlns:a=\"{}\">",
        NS_MAIN
    ));

    for (idx, chart) in charts.iter().enumerate() {
        let anchor = &chart.anchor;
        xml.push_str("\n    <xdr:twoCellAnchor>");
        xml.push_str(&format!(
            "\n        <xdr:from><xdr:col>{}</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>{}</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>",
            anchor.from_col, anchor.from_row
        ));
        xml.push_str(&format!(
            "\n        <xdr:to><xdr:col>{}</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>{}</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:to>",
            anchor.to_col, anchor.to_row
        ));
        xml.push_str("\n        <xdr:graphicFrame macro=\"\">");
        xml.push_str(&format!(
            "\n            <xdr:nvGraphicFramePr><xdr:cNvPr id=\"{}\" name=\"Chart {}\"/><xdr:cNvGraphicFramePr/></xdr:nvGraphicFramePr>",
            idx + 2,
            idx + 1
        ));
        xml.push_str(
            "\n            <xdr:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"0\" cy=\"0\"/></xdr:xfrm>",
        );
        xml.push_str(&format!(
            "\n            <a:graphic><a:graphicData uri=\"{ns}\"><c:chart xmlns:c=\"{ns}\" xmlns:r=\"{rels}\" r:id=\"rId{id}\"/></a:graphicData></a:graphic>",
            ns = NS_CHART,
            rels = NS_RELS,
            id = idx + 1
        ));
        xml.push_str("\n        </xdr:graphicFrame>");
        xml.push_str("\n        <xdr:clientData/>");
        xml.push_str("\n    </xdr:twoCellAnchor>");
    }

    xml.push_str("\n</xdr:wsDr>");
    xml
}

/// `xl/drawings/_rels/drawingN.xml.rels`, pointing at the workbook-wide
/// chart part numbers
pub(crate) fn drawing_rels_xml(chart_numbers: &[usize]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );

    for (idx, number) in chart_numbers.iter().enumerate() {
        xml.push_str(&format!(
            r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/chart" Target="../charts/chart{}.xml"/>"#,
            idx + 1,
            number
        ));
    }

    xml.push_str("\n</Relationships>");
    xml
}

/// `xl/charts/chartN.xml` for a bar/column chart
pub(crate) fn chart_xml(chart: &Chart) -> String {
    let mut xml = String::with_capacity(4096);
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    xml.push_str(&format!(
        "<c:chartSpace xmlns:c=\"{}\" xmlns:a=\"{}\" xmlns:r=\"{}\">",
        NS_CHART, NS_MAIN, NS_RELS
    ));
    xml.push_str("\n<c:roundedCorners val=\"0\"/>");
    xml.push_str("\n<c:chart>");

    if let Some(title) = &chart.title {
        write_title(&mut xml, title);
        xml.push_str("\n<c:autoTitleDeleted val=\"0\"/>");
    } else {
        xml.push_str("\n<c:autoTitleDeleted val=\"1\"/>");
    }

    xml.push_str("\n<c:plotArea>\n<c:layout/>");
    write_bar_chart(&mut xml, chart);

    // Category axis runs along the bars' base, value axis across it
    let (cat_pos, val_pos) = match chart.chart_type.direction() {
        BarDirection::Column => ("b", "l"),
        BarDirection::Bar => ("l", "b"),
    };
    write_axis(
        &mut xml,
        "catAx",
        CATEGORY_AXIS_ID,
        VALUE_AXIS_ID,
        cat_pos,
        &chart.category_axis,
    );
    write_axis(
        &mut xml,
        "valAx",
        VALUE_AXIS_ID,
        CATEGORY_AXIS_ID,
        val_pos,
        &chart.value_axis,
    );
    xml.push_str("\n</c:plotArea>");

    if let Some(legend) = &chart.legend {
        xml.push_str(&format!(
            "\n<c:legend><c:legendPos val=\"{}\"/><c:overlay val=\"{}\"/></c:legend>",
            legend.position.xlsx_code(),
            if legend.overlay { 1 } else { 0 }
        ));
    }

    xml.push_str("\n<c:plotVisOnly val=\"1\"/>");
    xml.push_str("\n<c:dispBlanksAs val=\"gap\"/>");
    xml.push_str("\n</c:chart>");
    xml.push_str("\n</c:chartSpace>");
    xml
}

fn write_bar_chart(xml: &mut String, chart: &Chart) {
    let grouping = chart.chart_type.grouping();

    xml.push_str("\n<c:barChart>");
    xml.push_str(&format!(
        "\n<c:barDir val=\"{}\"/>",
        chart.chart_type.direction().xlsx_code()
    ));
    xml.push_str(&format!("\n<c:grouping val=\"{}\"/>", grouping.xlsx_code()));
    xml.push_str("\n<c:varyColors val=\"0\"/>");

    for (idx, series) in chart.series.iter().enumerate() {
        xml.push_str(&format!(
            "\n<c:ser>\n<c:idx val=\"{}\"/>\n<c:order val=\"{}\"/>",
            idx, idx
        ));
        if let Some(name) = &series.name {
            xml.push_str(&format!("\n<c:tx><c:v>{}</c:v></c:tx>", escape_xml(name)));
        }
        xml.push_str("\n<c:invertIfNegative val=\"0\"/>");
        if let Some(categories) = &series.categories {
            xml.push_str(&format!(
                "\n<c:cat><c:strRef><c:f>{}</c:f></c:strRef></c:cat>",
                reference(categories)
            ));
        }
        xml.push_str(&format!(
            "\n<c:val><c:numRef><c:f>{}</c:f></c:numRef></c:val>",
            reference(&series.values)
        ));
        xml.push_str("\n</c:ser>");
    }

    xml.push_str("\n<c:gapWidth val=\"150\"/>");
    if let Some(overlap) = grouping.overlap() {
        xml.push_str(&format!("\n<c:overlap val=\"{}\"/>", overlap));
    }
    xml.push_str(&format!("\n<c:axId val=\"{}\"/>", CATEGORY_AXIS_ID));
    xml.push_str(&format!("\n<c:axId val=\"{}\"/>", VALUE_AXIS_ID));
    xml.push_str("\n</c:barChart>");
}

fn write_axis(xml: &mut String, element: &str, id: u32, cross_id: u32, pos: &str, axis: &Axis) {
    xml.push_str(&format!("\n<c:{}>", element));
    xml.push_str(&format!("\n<c:axId val=\"{}\"/>", id));

    xml.push_str("\n<c:scaling><c:orientation val=\"minMax\"/>");
    if let Some(max) = axis.maximum {
        xml.push_str(&format!("<c:max val=\"{}\"/>", max));
    }
    if let Some(min) = axis.minimum {
        xml.push_str(&format!("<c:min val=\"{}\"/>", min));
    }
    xml.push_str("</c:scaling>");

    xml.push_str("\n<c:delete val=\"0\"/>");
    xml.push_str(&format!("\n<c:axPos val=\"{}\"/>", pos));
    if let Some(title) = &axis.title {
        write_title(xml, title);
    }
    if element == "valAx" {
        xml.push_str("\n<c:majorGridlines/>");
        xml.push_str("\n<c:numFmt formatCode=\"General\" sourceLinked=\"1\"/>");
    }
    xml.push_str("\n<c:tickLblPos val=\"nextTo\"/>");
    xml.push_str(&format!("\n<c:crossAx val=\"{}\"/>", cross_id));
    xml.push_str("\n<c:crosses val=\"autoZero\"/>");
    if element == "catAx" {
        xml.push_str("\n<c:auto val=\"1\"/>");
        xml.push_str("\n<c:lblAlgn val=\"ctr\"/>");
        xml.push_str("\n<c:lblOffset val=\"100\"/>");
    } else {
        xml.push_str("\n<c:crossBetween val=\"between\"/>");
    }
    xml.push_str(&format!("\n</c:{}>", element));
}

fn write_title(xml: &mut String, title: &str) {
    xml.push_str("\n<c:title>");
    xml.push_str("<c:tx><c:rich><a:bodyPr/><a:lstStyle/>");
    xml.push_str(&format!(
        "<a:p><a:r><a:rPr lang=\"en-US\"/><a:t>{}</a:t></a:r></a:p>",
        escape_xml(title)
    ));
    xml.push_str("</c:rich></c:tx>");
    xml.push_str("<c:overlay val=\"0\"/>");
    xml.push_str("</c:title>");
}

fn reference(data: &DataReference) -> String {
    let formula = data.as_formula();
    escape_xml(formula.strip_prefix('=').unwrap_or(formula))
}
