//! Turns stored document bytes into something servable.
//!
//! Dispatch is purely on the file extension:
//! - `.txt` is served as `text/plain`, unchanged.
//! - `.md` is converted to an HTML fragment for the page layout. Raw HTML in
//!   the source is passed through; authors are trusted.
//! - `.jpg`, `.JPG`, `.png` are served as `image/<ext>` with the extension's
//!   case preserved, so `.JPG` becomes `image/JPG`.

use super::validate::{extension, IMAGE_EXTENSIONS};
use pulldown_cmark::{html, Options, Parser};

/// Error for documents whose extension has no renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    UnsupportedFormat(String),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::UnsupportedFormat(name) => {
                write!(f, "No renderer for document: {}", name)
            }
        }
    }
}

impl std::error::Error for RenderError {}

/// How a document is presented, decided by its extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    PlainText,
    Markdown,
    /// Image with its extension minus the dot, case preserved.
    Image(String),
}

impl ContentKind {
    /// Classifies a document by name.
    pub fn of(name: &str) -> Result<Self, RenderError> {
        match extension(name) {
            Some(".txt") => Ok(ContentKind::PlainText),
            Some(".md") => Ok(ContentKind::Markdown),
            Some(ext) if IMAGE_EXTENSIONS.contains(&ext) => {
                Ok(ContentKind::Image(ext[1..].to_string()))
            }
            _ => Err(RenderError::UnsupportedFormat(name.to_string())),
        }
    }

    /// The response MIME type, or `None` when the page layout decides.
    pub fn mime_type(&self) -> Option<String> {
        match self {
            ContentKind::PlainText => Some("text/plain".to_string()),
            ContentKind::Markdown => None,
            ContentKind::Image(ext) => Some(format!("image/{}", ext)),
        }
    }
}

/// Rendered document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Bytes served as stored.
    Raw(Vec<u8>),
    /// HTML fragment to embed in the page layout.
    Html(String),
}

/// A document ready to be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub kind: ContentKind,
    pub payload: Payload,
}

impl Rendered {
    pub fn mime_type(&self) -> Option<String> {
        self.kind.mime_type()
    }
}

/// Renders a document's bytes according to its extension.
pub fn render(name: &str, bytes: Vec<u8>) -> Result<Rendered, RenderError> {
    let kind = ContentKind::of(name)?;
    let payload = match kind {
        ContentKind::Markdown => Payload::Html(render_markdown(&String::from_utf8_lossy(&bytes))),
        ContentKind::PlainText | ContentKind::Image(_) => Payload::Raw(bytes),
    };

    Ok(Rendered { kind, payload })
}

/// Converts markdown to an HTML fragment.
///
/// Core syntax only: tables, strikethrough and other extensions stay
/// literal text.
pub fn render_markdown(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::empty());
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passthrough() {
        let content = b"Yukihiro Matsumoto dreams up Ruby.".to_vec();
        let rendered = render("history.txt", content.clone()).unwrap();

        assert_eq!(rendered.mime_type().as_deref(), Some("text/plain"));
        assert_eq!(rendered.payload, Payload::Raw(content));
    }

    #[test]
    fn test_markdown_heading() {
        let rendered = render("about.md", b"# Ruby is...".to_vec()).unwrap();

        assert_eq!(rendered.mime_type(), None);
        match rendered.payload {
            Payload::Html(html) => assert!(html.contains("<h1>Ruby is...</h1>")),
            other => panic!("expected html, got {:?}", other),
        }
    }

    #[test]
    fn test_markdown_standard_rules() {
        let html = render_markdown(
            "Some *emphasis* and [a link](http://example.com)\n\n- one\n- two\n\n```\ncode\n```\n",
        );

        assert!(html.contains("<em>emphasis</em>"));
        assert!(html.contains(r#"<a href="http://example.com">a link</a>"#));
        assert!(html.contains("<li>one</li>"));
        assert!(html.contains("<pre><code>code\n</code></pre>"));
    }

    #[test]
    fn test_markdown_passes_raw_html_through() {
        let html = render_markdown("<div class=\"note\">kept</div>\n");
        assert!(html.contains("<div class=\"note\">kept</div>"));
    }

    #[test]
    fn test_image_mime_types() {
        assert_eq!(
            ContentKind::of("logo.png").unwrap().mime_type().as_deref(),
            Some("image/png")
        );
        assert_eq!(
            ContentKind::of("photo.jpg").unwrap().mime_type().as_deref(),
            Some("image/jpg")
        );
        // Case is preserved from the extension.
        assert_eq!(
            ContentKind::of("photo.JPG").unwrap().mime_type().as_deref(),
            Some("image/JPG")
        );
    }

    #[test]
    fn test_image_payload_is_raw() {
        let bytes = vec![0x89, b'P', b'N', b'G'];
        let rendered = render("logo.png", bytes.clone()).unwrap();

        assert_eq!(rendered.kind, ContentKind::Image("png".to_string()));
        assert_eq!(rendered.payload, Payload::Raw(bytes));
    }

    #[test]
    fn test_unknown_extension_fails() {
        assert_eq!(
            render("notafile.ext", Vec::new()).unwrap_err(),
            RenderError::UnsupportedFormat("notafile.ext".to_string())
        );
        assert!(ContentKind::of("changes").is_err());
        assert!(ContentKind::of("photo.gif").is_err());
    }

    #[test]
    fn test_markdown_extensions_stay_literal() {
        let html = render_markdown("~~gone~~\n\n| a | b |\n|---|---|\n| 1 | 2 |\n");

        assert!(!html.contains("<del>"));
        assert!(!html.contains("<table>"));
        assert!(html.contains("~~gone~~"));
    }
}
