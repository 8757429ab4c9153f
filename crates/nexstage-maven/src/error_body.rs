//! Extraction of human-readable messages from repository manager error
//! responses.
//!
//! Nexus answers failed REST calls either with JSON
//! (`{"errors":[{"id":"*","msg":"..."}]}`) or, depending on content
//! negotiation, with a `<nexus-error>` XML document.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct JsonErrors {
    #[serde(default)]
    errors: Vec<JsonError>,
}

#[derive(Debug, Deserialize)]
struct JsonError {
    #[serde(default)]
    msg: String,
}

/// Messages contained in an error body, or the trimmed raw body when it is
/// neither recognised JSON nor XML. Empty bodies yield no messages.
pub fn error_messages(body: &str) -> Vec<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed.starts_with('{') {
        if let Ok(parsed) = serde_json::from_str::<JsonErrors>(trimmed) {
            return parsed
                .errors
                .into_iter()
                .map(|e| e.msg)
                .filter(|m| !m.is_empty())
                .collect();
        }
    }
    if trimmed.starts_with('<') {
        let messages = xml_messages(trimmed);
        if !messages.is_empty() {
            return messages;
        }
    }
    vec![truncate(trimmed, 500)]
}

/// Join the messages of an error body into one line for error reports.
pub fn summarize(body: &str) -> String {
    let messages = error_messages(body);
    if messages.is_empty() {
        "no details in response".to_string()
    } else {
        messages.join("; ")
    }
}

fn xml_messages(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut messages = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut text_buf = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                path.push(String::from_utf8_lossy(e.name().as_ref()).to_string());
                text_buf.clear();
            }
            Ok(Event::Text(ref e)) => {
                text_buf = e.unescape().unwrap_or_default().to_string();
            }
            Ok(Event::End(_)) => {
                if path.join(">") == "nexus-error>errors>error>msg" && !text_buf.is_empty() {
                    messages.push(text_buf.clone());
                }
                path.pop();
                text_buf.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!("Unparseable XML error body: {e}");
                return Vec::new();
            }
            _ => {}
        }
    }
    messages
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max).collect();
        out.push_str("...");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_errors() {
        let body = r#"{"errors":[{"id":"*","msg":"Unhandled: Staging repository is already transitioning"}]}"#;
        assert_eq!(
            error_messages(body),
            vec!["Unhandled: Staging repository is already transitioning"]
        );
    }

    #[test]
    fn xml_errors() {
        let body = r#"<nexus-error>
  <errors>
    <error><id>*</id><msg>No such profile: 'abc'</msg></error>
    <error><id>*</id><msg>Second &amp; last</msg></error>
  </errors>
</nexus-error>"#;
        assert_eq!(
            error_messages(body),
            vec!["No such profile: 'abc'", "Second & last"]
        );
    }

    #[test]
    fn html_body_falls_back_to_raw_text() {
        let body = "<html><body>Bad Gateway</body></html>";
        assert_eq!(error_messages(body), vec![body.to_string()]);
    }

    #[test]
    fn empty_body() {
        assert!(error_messages("  \n").is_empty());
        assert_eq!(summarize(""), "no details in response");
    }

    #[test]
    fn long_plain_body_is_truncated() {
        let body = "x".repeat(600);
        let msg = &error_messages(&body)[0];
        assert_eq!(msg.len(), 503);
        assert!(msg.ends_with("..."));
    }
}
