//! HTML rendering for the callback listener.

use super::SiteInfo;
use crate::clock;
use crate::workflow::WorkflowResult;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::path::Path;

const TITLE: &str = "Authflow OAuth Demo";

/// Wrap `body` in the page template with a timestamp footer
pub fn html_page(body: &str) -> String {
    format!(
        "<html>\n<head><title>{TITLE}</title></head>\n\
         <body>{body}<p><i>{}</i></p></body>\n</html>\n",
        clock::time_now()
    )
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Response with the no-cache headers every dynamic page carries
pub fn no_cache(status: StatusCode, content_type: Option<&'static str>, body: String) -> Response {
    let mut response = (status, body).into_response();
    let headers = response.headers_mut();
    if let Some(content_type) = content_type {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    response
}

pub fn html_response(status: StatusCode, body: &str) -> Response {
    no_cache(status, Some("text/html; charset=utf-8"), html_page(body))
}

pub fn error_response(status: StatusCode, message: &str) -> Response {
    let reason = status.canonical_reason().unwrap_or("Error");
    html_response(
        status,
        &format!(
            "<h1>{} {}</h1><p>{}</p>",
            status.as_u16(),
            reason,
            escape_html(message)
        ),
    )
}

pub fn redirect_response(target: &str) -> Response {
    let mut response = no_cache(StatusCode::MOVED_PERMANENTLY, None, String::new());
    match HeaderValue::from_str(target) {
        Ok(location) => {
            response.headers_mut().insert(header::LOCATION, location);
            response
        }
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "invalid redirect target"),
    }
}

/// Render a workflow outcome for the browser
pub fn render_result(result: &WorkflowResult) -> Response {
    match (result.status_code, result.redirect_target.as_deref()) {
        (200, _) => {
            let body = if result.body.is_empty() {
                "(this page intentionally left blank)"
            } else {
                result.body.as_str()
            };
            html_response(StatusCode::OK, body)
        }
        (301, Some(target)) => redirect_response(target),
        (code, _) => {
            let status =
                StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            error_response(status, &result.body)
        }
    }
}

pub fn home_body(site: &SiteInfo) -> String {
    let mut body = format!(
        r#"
<h1>{TITLE}</h1>
 <p>This is the local home page for the OAuth demo.
 If you can read this the callback listener is running.</p>
<h2>Configuration</h2>
 APP_NAME: <code>{}</code><br>
 APP_KEY: <code>{}</code><br>
 APP_WEBSITE: <a href="{}">{}</a><br>
 FILES_DIRECTORY: <code>{}</code><br>
 ACCESS_TOKEN_FILE: <code>{}</code><br>
 FINISH_URL: <code>{}</code>
<h2>Documentation</h2>
"#,
        escape_html(&site.app_name),
        escape_html(&site.app_key),
        escape_html(&site.app_website),
        escape_html(&site.app_website),
        escape_html(&site.files_directory.display().to_string()),
        escape_html(&site.credential_file.display().to_string()),
        escape_html(&site.finish_url),
    );

    let docs = list_docs(&site.doc_directory);
    if docs.is_empty() {
        body.push_str("<p>(no documentation found)</p>\n");
    } else {
        body.push_str("<dl><dt>Documents:</dt><dd>");
        for name in docs {
            let url = format!("{}/doc/{}", site.base_url, name);
            body.push_str(&format!("<a href=\"{url}\">{url}</a><br>"));
        }
        body.push_str("</dd></dl>\n");
    }
    body
}

/// `.html` and `.txt` files in the doc directory, sorted by name
fn list_docs(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.ends_with(".html") || name.ends_with(".txt"))
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a & b>"), "&lt;a &amp; b&gt;");
        assert_eq!(escape_html("say \"hi\""), "say &quot;hi&quot;");
    }

    #[test]
    fn test_render_redirect() {
        let response = render_result(&WorkflowResult::redirect("https://example.com/auth"));
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "https://example.com/auth");
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "no-cache, no-store, must-revalidate"
        );
    }

    #[test]
    fn test_render_error_status() {
        let response = render_result(&WorkflowResult::error(503, "Service Unavailable"));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_list_docs_filters_and_sorts() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        for name in ["b.txt", "a.html", "c.png"] {
            std::fs::write(temp_dir.path().join(name), "x").unwrap();
        }
        assert_eq!(list_docs(temp_dir.path()), vec!["a.html", "b.txt"]);
        assert!(list_docs(&temp_dir.path().join("missing")).is_empty());
    }
}
