//! Fills the case report `.docx` template.
//!
//! Placeholders live inside a single text run: `{name}` for scalar values
//! and `{#tasks}...{.}...{/tasks}` for lists, where the slice between the
//! markers is repeated once per item. Paragraph loops stay well formed
//! because every repetition closes what it opens.

use chrono::{DateTime, FixedOffset};
use std::io::{Cursor, Read, Write};
use zip::{result::ZipError, write::SimpleFileOptions, CompressionMethod, ZipArchive, ZipWriter};

use super::report_dto::CaseDocumentData;

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

pub static BUNDLED_TEMPLATE: &[u8] = include_bytes!("../../templates/case_report.docx");

const LINE_BREAK: &str = "</w:t><w:br/><w:t xml:space=\"preserve\">";

#[derive(Debug, thiserror::Error)]
pub enum DocxError {
    #[error("Invalid docx archive: {0}")]
    Zip(#[from] ZipError),

    #[error("Failed to read docx entry: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} is not valid UTF-8")]
    Encoding(String),
}

fn scalars(data: &CaseDocumentData) -> [(&'static str, &str); 12] {
    [
        ("name", data.name.as_str()),
        ("description", data.description.as_str()),
        ("status", data.status.as_str()),
        ("crimeType", data.crime_type.as_str()),
        ("applicableLaw", data.applicable_law.as_str()),
        ("numberOfDefendants", data.number_of_defendants.as_str()),
        ("startDate", data.start_date.as_str()),
        ("endDate", data.end_date.as_str()),
        ("fullName", data.full_name.as_str()),
        ("phone", data.phone.as_str()),
        ("investigationResult", data.investigation_result.as_str()),
        ("nextInvestigationPurpose", data.next_investigation_purpose.as_str()),
    ]
}

fn lists(data: &CaseDocumentData) -> [(&'static str, &[String]); 4] {
    [
        ("tasks", data.tasks.as_slice()),
        ("exhibits", data.exhibits.as_slice()),
        ("nextInvestigationContent", data.next_investigation_content.as_slice()),
        ("participatingForces", data.participating_forces.as_slice()),
    ]
}

/// Escapes a value for a `<w:t>` run. Newlines become Word line breaks.
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\r' => {}
            '\n' => out.push_str(LINE_BREAK),
            c => out.push(c),
        }
    }
    out
}

fn expand_loop(xml: &str, key: &str, items: &[String]) -> String {
    let open = format!("{{#{}}}", key);
    let close = format!("{{/{}}}", key);

    let mut out = String::with_capacity(xml.len());
    let mut rest = xml;
    while let Some(start) = rest.find(&open) {
        let after_open = &rest[start + open.len()..];
        let Some(end) = after_open.find(&close) else {
            break;
        };

        out.push_str(&rest[..start]);
        let body = &after_open[..end];
        for item in items {
            out.push_str(&body.replace("{.}", &escape_text(item)));
        }
        rest = &after_open[end + close.len()..];
    }
    out.push_str(rest);
    out
}

pub fn fill_placeholders(xml: &str, data: &CaseDocumentData) -> String {
    let mut out = xml.to_string();
    for (key, items) in lists(data) {
        out = expand_loop(&out, key, items);
    }
    for (key, value) in scalars(data) {
        out = out.replace(&format!("{{{}}}", key), &escape_text(value));
    }
    out
}

fn is_text_part(name: &str) -> bool {
    name == "word/document.xml"
        || ((name.starts_with("word/header") || name.starts_with("word/footer"))
            && name.ends_with(".xml"))
}

/// Copies every entry of `template`, filling placeholders in the body,
/// header and footer parts.
pub fn render_docx(template: &[u8], data: &CaseDocumentData) -> Result<Vec<u8>, DocxError> {
    let mut archive = ZipArchive::new(Cursor::new(template))?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if entry.is_dir() {
            writer.add_directory(name, options)?;
            continue;
        }

        let mut contents = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut contents)?;
        if is_text_part(&name) {
            let xml = String::from_utf8(contents).map_err(|_| DocxError::Encoding(name.clone()))?;
            contents = fill_placeholders(&xml, data).into_bytes();
        }

        writer.start_file(name, options)?;
        writer.write_all(&contents)?;
    }

    Ok(writer.finish()?.into_inner())
}

/// `<case name>_<yyyyMMdd_HHmmss>.docx`, with every character outside
/// `[A-Za-z0-9]` replaced by `_`.
pub fn report_file_name(case_name: &str, now: DateTime<FixedOffset>) -> String {
    let name: String = case_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let name = if name.is_empty() { "case".to_string() } else { name };

    format!("{}_{}.docx", name, now.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const DOCUMENT: &str = concat!(
        r#"<w:document><w:body>"#,
        r#"<w:p><w:r><w:t>{name} ({status})</w:t></w:r></w:p>"#,
        r#"<w:p><w:r><w:t>{description}</w:t></w:r></w:p>"#,
        r#"<w:p><w:r><w:t>{#tasks}</w:t></w:r></w:p>"#,
        r#"<w:p><w:r><w:t>- {.}</w:t></w:r></w:p>"#,
        r#"<w:p><w:r><w:t>{/tasks}</w:t></w:r></w:p>"#,
        r#"<w:p><w:r><w:t>{#exhibits}[{.}]{/exhibits}</w:t></w:r></w:p>"#,
        r#"</w:body></w:document>"#
    );

    fn data() -> CaseDocumentData {
        CaseDocumentData {
            name: "Vụ A & B".to_string(),
            description: "Dòng 1\nDòng 2".to_string(),
            status: "IN_PROGRESS".to_string(),
            crime_type: String::new(),
            applicable_law: String::new(),
            number_of_defendants: "2".to_string(),
            start_date: "01/03/2025".to_string(),
            end_date: "15/04/2025".to_string(),
            full_name: "Nguyễn Văn A".to_string(),
            phone: "0900000000".to_string(),
            tasks: vec!["Khám nghiệm".to_string(), "Lấy lời khai <bị can>".to_string()],
            investigation_result: String::new(),
            exhibits: vec![],
            next_investigation_purpose: String::new(),
            next_investigation_content: vec![],
            participating_forces: vec![],
        }
    }

    fn fixture_template() -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        writer.start_file("[Content_Types].xml", options).unwrap();
        writer.write_all(b"<Types/>").unwrap();
        writer.start_file("word/document.xml", options).unwrap();
        writer.write_all(DOCUMENT.as_bytes()).unwrap();
        writer.start_file("word/styles.xml", options).unwrap();
        writer.write_all(b"<w:styles>{name}</w:styles>").unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn read_entry(docx: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(docx)).unwrap();
        let mut entry = archive.by_name(name).unwrap();
        let mut out = String::new();
        entry.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_render_fills_document_body() {
        let rendered = render_docx(&fixture_template(), &data()).unwrap();
        let body = read_entry(&rendered, "word/document.xml");

        assert!(body.contains("<w:t>Vụ A &amp; B (IN_PROGRESS)</w:t>"));
        assert!(body.contains(r#"Dòng 1</w:t><w:br/><w:t xml:space="preserve">Dòng 2"#));
        assert!(body.contains("<w:t>- Khám nghiệm</w:t>"));
        assert!(body.contains("<w:t>- Lấy lời khai &lt;bị can&gt;</w:t>"));
        assert!(!body.contains('{'), "{}", body);
        assert_eq!(body.matches("<w:p>").count(), body.matches("</w:p>").count());
    }

    #[test]
    fn test_render_leaves_other_parts_untouched() {
        let rendered = render_docx(&fixture_template(), &data()).unwrap();
        assert_eq!(read_entry(&rendered, "word/styles.xml"), "<w:styles>{name}</w:styles>");
        assert_eq!(read_entry(&rendered, "[Content_Types].xml"), "<Types/>");
    }

    #[test]
    fn test_render_bundled_template() {
        let rendered = render_docx(BUNDLED_TEMPLATE, &data()).unwrap();
        let body = read_entry(&rendered, "word/document.xml");
        assert!(body.contains("Nguyễn Văn A"));
        assert!(body.contains("Khám nghiệm"));
        assert!(!body.contains("{fullName}"));
        assert!(!body.contains("{#tasks}"));
    }

    #[test]
    fn test_render_rejects_non_zip_input() {
        assert!(matches!(
            render_docx(b"not a zip", &data()),
            Err(DocxError::Zip(_))
        ));
    }

    #[test]
    fn test_empty_list_removes_loop() {
        let xml = "<w:t>{#exhibits}[{.}]{/exhibits}</w:t>";
        assert_eq!(fill_placeholders(xml, &data()), "<w:t></w:t>");
    }

    #[test]
    fn test_unclosed_loop_left_as_is() {
        let xml = "<w:t>{#tasks}{.}</w:t>";
        assert_eq!(expand_loop(xml, "tasks", &["x".to_string()]), xml);
    }

    #[test]
    fn test_report_file_name() {
        let offset = FixedOffset::east_opt(7 * 3600).unwrap();
        let now = offset.with_ymd_and_hms(2025, 3, 9, 8, 5, 7).unwrap();

        assert_eq!(
            report_file_name("V\u{1ee5} 12/2025", now),
            "V__12_2025_20250309_080507.docx"
        );
        assert_eq!(report_file_name("Case-A", now), "Case_A_20250309_080507.docx");
        assert_eq!(report_file_name("", now), "case_20250309_080507.docx");
    }
}
