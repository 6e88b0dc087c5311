//! Server-rendered HTML
//!
//! Pages are askama templates under `templates/`, all extending
//! `base.html`, which draws the notice toast. Interpolated values are HTML
//! escaped by the template engine. Each page struct holds display-ready
//! values prepared in Rust.

pub mod auth;
pub mod dashboard;
pub mod landing;

use askama::Template;
use axum::response::Html;
use promised_land_admin::Notice;

/// Result of rendering a page
pub type Rendered = Result<Html<String>, askama::Error>;

/// Render a page template into a response body
///
/// # Errors
///
/// Returns the template engine's error.
pub fn html<T: Template>(page: &T) -> Rendered {
    page.render().map(Html)
}

/// Bare page showing a status code and a message
#[derive(Debug, Template)]
#[template(path = "error.html")]
struct ErrorPage<'a> {
    notice: Option<&'a Notice>,
    status: u16,
    message: &'a str,
}

/// Render the error page
///
/// # Errors
///
/// Returns the template engine's error.
pub fn render_error(status: u16, message: &str) -> Rendered {
    html(&ErrorPage {
        notice: None,
        status,
        message,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use promised_land_core::Error;

    #[test]
    fn test_error_page_escapes_message() {
        let Html(page) = render_error(502, "<script>alert('x')</script>").unwrap();

        assert!(page.contains("<title>Error | Promised Land</title>"));
        assert!(page.contains("<h1>502</h1>"));
        assert!(page.contains("&lt;script&gt;alert("));
        assert!(!page.contains("<script>"));
    }

    #[test]
    fn test_notice_toast() {
        let notice = Notice::error(&Error::remote("<b>boom</b>"));

        let Html(page) = html(&ErrorPage {
            notice: Some(&notice),
            status: 500,
            message: "Something went wrong.",
        })
        .unwrap();

        assert!(page.contains("class=\"notice destructive\""));
        assert!(page.contains("<strong>Error</strong>"));
        assert!(page.contains("&lt;b&gt;boom"));
        assert!(!page.contains("<b>boom"));
    }
}
