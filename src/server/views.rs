//! HTML pages.
//!
//! Templates live under `templates/` and share `layout.html`, which shows the
//! pending flash message, if any. Askama escapes every interpolated value
//! except the rendered markdown fragment.

use askama::Template;
use std::borrow::Cow;
use urlencoding::encode;

/// One row of the document listing.
pub struct FileLink<'a> {
    pub name: &'a str,
    pub href: Cow<'a, str>,
}

impl<'a> FileLink<'a> {
    fn new(name: &'a str) -> Self {
        Self {
            name,
            href: encode(name),
        }
    }
}

/// Document listing with sign-in status.
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage<'a> {
    pub files: Vec<FileLink<'a>>,
    pub username: Option<&'a str>,
    pub message: Option<&'a str>,
}

/// Rendered markdown document.
#[derive(Template)]
#[template(path = "markdown.html")]
pub struct MarkdownPage<'a> {
    pub name: &'a str,
    pub html: &'a str,
    pub message: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupPage<'a> {
    pub username: &'a str,
    pub message: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "signin.html")]
pub struct SigninPage<'a> {
    pub username: &'a str,
    pub message: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "new.html")]
pub struct NewDocumentPage<'a> {
    pub filename: &'a str,
    pub message: Option<&'a str>,
}

/// Edit form for an existing document.
#[derive(Template)]
#[template(path = "edit.html")]
pub struct EditPage<'a> {
    pub filename: &'a str,
    pub href: Cow<'a, str>,
    pub content: &'a str,
    pub message: Option<&'a str>,
}

/// Copy form, prefilled with the source document's content.
#[derive(Template)]
#[template(path = "copy.html")]
pub struct CopyPage<'a> {
    pub source: &'a str,
    pub filename: &'a str,
    pub content: &'a str,
    pub message: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "upload.html")]
pub struct UploadPage<'a> {
    pub message: Option<&'a str>,
}

pub fn index<'a>(
    files: &'a [String],
    username: Option<&'a str>,
    message: Option<&'a str>,
) -> IndexPage<'a> {
    IndexPage {
        files: files.iter().map(|name| FileLink::new(name)).collect(),
        username,
        message,
    }
}

pub fn markdown<'a>(name: &'a str, html: &'a str, message: Option<&'a str>) -> MarkdownPage<'a> {
    MarkdownPage {
        name,
        html,
        message,
    }
}

pub fn signup<'a>(username: &'a str, message: Option<&'a str>) -> SignupPage<'a> {
    SignupPage { username, message }
}

pub fn signin<'a>(username: &'a str, message: Option<&'a str>) -> SigninPage<'a> {
    SigninPage { username, message }
}

pub fn new_document<'a>(filename: &'a str, message: Option<&'a str>) -> NewDocumentPage<'a> {
    NewDocumentPage { filename, message }
}

pub fn edit<'a>(filename: &'a str, content: &'a str, message: Option<&'a str>) -> EditPage<'a> {
    EditPage {
        filename,
        href: encode(filename),
        content,
        message,
    }
}

pub fn copy<'a>(
    source: &'a str,
    filename: &'a str,
    content: &'a str,
    message: Option<&'a str>,
) -> CopyPage<'a> {
    CopyPage {
        source,
        filename,
        content,
        message,
    }
}

pub fn upload(message: Option<&str>) -> UploadPage<'_> {
    UploadPage { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_shows_escaped_flash() {
        let page = upload(Some("<b>hi</b>")).render().unwrap();
        assert!(page.contains("&lt;b&gt;hi"));
        assert!(!page.contains("<b>hi</b>"));

        let page = upload(None).render().unwrap();
        assert!(!page.contains("flash"));
    }

    #[test]
    fn test_index_links() {
        let files = vec!["about.md".to_string(), "my notes.txt".to_string()];
        let page = index(&files, None, None).render().unwrap();

        assert!(page.contains(r#"href="/about.md""#));
        assert!(page.contains(r#"href="/my%20notes.txt/edit""#));
        assert!(page.contains("Sign In"));
    }

    #[test]
    fn test_index_signed_in() {
        let page = index(&[], Some("admin"), None).render().unwrap();
        assert!(page.contains("Signed in as admin"));
        assert!(page.contains("Sign Out"));
    }

    #[test]
    fn test_index_escapes_names() {
        let files = vec!["<img src=x>.md".to_string()];
        let page = index(&files, None, None).render().unwrap();

        assert!(!page.contains("<img"));
        assert!(page.contains("&lt;img"));
    }

    #[test]
    fn test_markdown_fragment_is_not_escaped() {
        let page = markdown("about.md", "<h1>Ruby is...</h1>", None)
            .render()
            .unwrap();
        assert!(page.contains("<h1>Ruby is...</h1>"));
        assert!(page.contains("<title>about.md</title>"));
    }

    #[test]
    fn test_edit_escapes_content() {
        let page = edit("about.md", "</textarea><script>", None)
            .render()
            .unwrap();
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>"));
        assert!(page.contains("<textarea"));
        assert!(page.contains(r#"action="/about.md""#));
    }

    #[test]
    fn test_copy_keeps_source_in_hidden_field() {
        let page = copy("test.txt", "", "body", Some("A name is required."))
            .render()
            .unwrap();
        assert!(page.contains(r#"name="source" value="test.txt""#));
        assert!(page.contains("A name is required."));
    }
}
