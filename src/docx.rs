//! Minimal WordprocessingML (`.docx`) writer. Documents are built in memory
//! and handed out as bytes or as a base64 `data:` URI, never written to disk.

use std::io::Write;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use xml::escape::{escape_str_attribute, escape_str_pcdata};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

/// MIME type of a `.docx` file.
pub const MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Deepest heading level. Level 0 is the title.
pub const MAX_LEVEL: u8 = 9;

/// Error while packaging a [`Document`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The package could not be written.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    /// Writing into the in-memory buffer failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One block of a [`Document`].
#[derive(Debug, Clone, PartialEq, derive_more::IsVariant)]
pub enum Block {
    /// Level 0 is the title, 1 and up are headings.
    Heading {
        /// 0 to [`MAX_LEVEL`].
        level: u8,
        /// Heading text.
        text: String,
    },
    /// Body text. Newlines become line breaks.
    Paragraph {
        /// Paragraph text.
        text: String,
    },
}

impl Block {
    fn style(&self) -> Option<String> {
        match self {
            Self::Heading { level: 0, .. } => Some("Title".to_string()),
            Self::Heading { level, .. } => Some(format!("Heading{level}")),
            Self::Paragraph { .. } => None,
        }
    }

    fn text(&self) -> &str {
        match self {
            Self::Heading { text, .. } | Self::Paragraph { text } => text,
        }
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str("<w:p>");
        if let Some(style) = self.style() {
            out.push_str(&format!(
                "<w:pPr><w:pStyle w:val=\"{style}\"/></w:pPr>"
            ));
        }
        out.push_str("<w:r>");
        for (i, line) in self.text().split('\n').enumerate() {
            if i > 0 {
                out.push_str("<w:br/>");
            }
            out.push_str("<w:t xml:space=\"preserve\">");
            out.push_str(&escape_str_pcdata(line));
            out.push_str("</w:t>");
        }
        out.push_str("</w:r></w:p>");
    }
}

/// An ordered list of headings and paragraphs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    blocks: Vec<Block>,
}

impl Document {
    /// Empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a heading. `level` is clamped to [`MAX_LEVEL`].
    pub fn heading<S>(&mut self, text: S, level: u8) -> &mut Self
    where
        S: Into<String>,
    {
        self.blocks.push(Block::Heading {
            level: level.min(MAX_LEVEL),
            text: text.into(),
        });
        self
    }

    /// Add a paragraph.
    pub fn paragraph<S>(&mut self, text: S) -> &mut Self
    where
        S: Into<String>,
    {
        self.blocks.push(Block::Paragraph { text: text.into() });
        self
    }

    /// Blocks in order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// The `word/document.xml` part.
    pub fn document_xml(&self) -> String {
        let mut out = String::from(concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
            "<w:body>",
        ));
        for block in &self.blocks {
            block.write_xml(&mut out);
        }
        out.push_str("<w:sectPr/></w:body></w:document>");
        out
    }

    /// Package the document as `.docx` bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

        let parts = [
            ("[Content_Types].xml", CONTENT_TYPES.to_string()),
            ("_rels/.rels", ROOT_RELS.to_string()),
            ("word/_rels/document.xml.rels", DOCUMENT_RELS.to_string()),
            ("word/styles.xml", styles_xml()),
            ("word/document.xml", self.document_xml()),
        ];
        for (name, body) in parts {
            let options = SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated);
            zip.start_file(name, options)?;
            zip.write_all(body.as_bytes())?;
        }

        let bytes = zip.finish()?.into_inner();

        #[cfg(feature = "log")]
        log::debug!(
            "Packaged document with {} blocks into {} bytes",
            self.blocks.len(),
            bytes.len()
        );

        Ok(bytes)
    }

    /// `data:` URI holding the base64 encoded document.
    pub fn data_uri(&self) -> Result<String, Error> {
        Ok(format!("data:{};base64,{}", MIME, STANDARD.encode(self.to_bytes()?)))
    }

    /// HTML anchor that downloads the document as `filename`.
    pub fn download_link(&self, filename: &str) -> Result<String, Error> {
        Ok(format!(
            "<a href=\"{}\" download=\"{}\">Download {} 📄</a>",
            self.data_uri()?,
            escape_str_attribute(filename),
            escape_str_pcdata(filename),
        ))
    }
}

const CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
    r#"<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#,
    "</Types>",
);

const ROOT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
    "</Relationships>",
);

const DOCUMENT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
    "</Relationships>",
);

/// Title plus `Heading1`..`Heading9`, shrinking with depth.
fn styles_xml() -> String {
    let mut out = String::from(concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
        r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style>"#,
        r#"<w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:rPr><w:b/><w:sz w:val="56"/></w:rPr></w:style>"#,
    ));
    for level in 1..=MAX_LEVEL {
        // half-points
        let size = 32u32.saturating_sub(2 * u32::from(level - 1)).max(22);
        out.push_str(&format!(
            r#"<w:style w:type="paragraph" w:styleId="Heading{level}"><w:name w:val="heading {level}"/><w:basedOn w:val="Normal"/><w:pPr><w:keepNext/><w:outlineLvl w:val="{}"/></w:pPr><w:rPr><w:b/><w:sz w:val="{size}"/></w:rPr></w:style>"#,
            level - 1
        ));
    }
    out.push_str("</w:styles>");
    out
}
