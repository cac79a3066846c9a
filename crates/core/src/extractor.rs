use crate::error::IngestError;
use lopdf::Document;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::Read;
use std::path::Path;

/// Decompressed-size cap for a single archive entry, so a hostile container
/// cannot balloon in memory.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Reads the full text of a course document. Dispatches on the file
/// extension: plain text is passed through, PDF and DOCX containers are
/// extracted to plain text first. Any failure is a `SourceRead` so the
/// batch can skip the document and continue.
pub fn read_course_text(path: &Path) -> Result<String, IngestError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("txt") => read_plain_text(path),
        Some("pdf") => extract_pdf_text(path),
        Some("docx") => extract_docx_text(path),
        _ => Err(IngestError::SourceRead(format!(
            "unsupported document type: {}",
            path.display()
        ))),
    }
}

/// Extensions `read_course_text` accepts.
pub fn is_supported_extension(extension: &str) -> bool {
    matches!(
        extension.to_ascii_lowercase().as_str(),
        "txt" | "pdf" | "docx"
    )
}

fn read_plain_text(path: &Path) -> Result<String, IngestError> {
    let bytes = std::fs::read(path)
        .map_err(|error| IngestError::SourceRead(format!("{}: {error}", path.display())))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn extract_pdf_text(path: &Path) -> Result<String, IngestError> {
    let document = Document::load(path)
        .map_err(|error| IngestError::SourceRead(format!("{}: {error}", path.display())))?;

    let mut pages = Vec::new();
    for (page_no, _page_id) in document.get_pages() {
        let text = document
            .extract_text(&[page_no])
            .map_err(|error| IngestError::SourceRead(format!("{}: {error}", path.display())))?;
        if !text.trim().is_empty() {
            pages.push(text);
        }
    }

    if pages.is_empty() {
        return Err(IngestError::SourceRead(format!(
            "pdf had no readable text: {}",
            path.display()
        )));
    }

    Ok(pages.join("\n"))
}

fn extract_docx_text(path: &Path) -> Result<String, IngestError> {
    let file = std::fs::File::open(path)
        .map_err(|error| IngestError::SourceRead(format!("{}: {error}", path.display())))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|error| IngestError::SourceRead(format!("{}: {error}", path.display())))?;

    let entry = archive
        .by_name("word/document.xml")
        .map_err(|error| IngestError::SourceRead(format!("{}: {error}", path.display())))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|error| IngestError::SourceRead(format!("{}: {error}", path.display())))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(IngestError::SourceRead(format!(
            "word/document.xml exceeds size limit: {}",
            path.display()
        )));
    }

    docx_text_runs(&xml)
        .map_err(|error| IngestError::SourceRead(format!("{}: {error}", path.display())))
}

/// Collects `<w:t>` text runs from a WordprocessingML body, emitting a
/// newline at each paragraph end so the parser sees line structure.
fn docx_text_runs(xml: &[u8]) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_reader(xml);

    let mut out = String::new();
    let mut in_text_run = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref element) if element.local_name().as_ref() == b"t" => {
                in_text_run = true;
            }
            Event::End(ref element) => match element.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Event::Text(text) => {
                if in_text_run {
                    out.push_str(text.unescape().unwrap_or_default().as_ref());
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}
