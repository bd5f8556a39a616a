use chrono::{DateTime, Utc};
use semver::Version;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt::Write;

use crate::email::field::{CURRENT_FORMAT_VERSION, Field};

#[derive(Debug, Clone, PartialEq)]
pub enum EmailBody {
    Text(String),
    Html(String),
    Both { text: String, html: String },
}

/// A fully composed message plus the routing headers the dispatcher reads.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub from: String,
    pub subject: String,
    pub body: EmailBody,
    pub reply_to: Option<String>,
    pub date: Option<DateTime<Utc>>,
    delivery_handler: String,
    headers: Vec<Field>,
    message_id: Option<String>,
    format_version: Version,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>, from: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            to: vec![to.into()],
            from: from.into(),
            subject: subject.into(),
            body: EmailBody::Text(String::new()),
            reply_to: None,
            date: None,
            delivery_handler: String::new(),
            headers: Vec::new(),
            message_id: None,
            format_version: CURRENT_FORMAT_VERSION,
        }
    }

    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to.push(to.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.body = EmailBody::Text(text.into());
        self
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.body = EmailBody::Html(html.into());
        self
    }

    pub fn with_both(mut self, text: impl Into<String>, html: impl Into<String>) -> Self {
        self.body = EmailBody::Both {
            text: text.into(),
            html: html.into(),
        };
        self
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_delivery_handler(mut self, handler: impl Into<String>) -> Self {
        self.delivery_handler = handler.into();
        self
    }

    /// Headers added after this call are stored the way `version` lays them out.
    pub fn with_format_version(mut self, version: Version) -> Self {
        self.format_version = version;
        self
    }

    /// Sets a header, replacing any header with the same name. A `null` value
    /// removes the header.
    ///
    /// Characters that cannot appear in a header name (control characters,
    /// whitespace and `:`) are dropped. A name left empty is ignored.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = header_name(&name.into());
        let value = value.into();
        if name.is_empty() {
            return self;
        }

        self.headers
            .retain(|existing| !existing.name().eq_ignore_ascii_case(&name));
        if !value.is_null() {
            self.headers
                .push(Field::with_version(name, value, self.format_version.clone()));
        }
        self
    }

    pub fn header(&self, name: &str) -> Option<&Field> {
        self.headers
            .iter()
            .find(|field| field.name().eq_ignore_ascii_case(name))
    }

    pub fn headers(&self) -> &[Field] {
        &self.headers
    }

    pub fn delivery_handler(&self) -> &str {
        &self.delivery_handler
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn set_message_id(&mut self, message_id: impl Into<String>) {
        self.message_id = Some(message_id.into());
    }

    /// Full RFC 822 rendering of the message, headers and body.
    pub fn to_rfc822(&self) -> String {
        let mut out = String::new();

        if let Some(date) = &self.date {
            push_header(&mut out, "Date", &date.to_rfc2822());
        }
        push_header(&mut out, "From", &self.from);
        if let Some(reply_to) = &self.reply_to {
            push_header(&mut out, "Reply-To", reply_to);
        }
        push_header(&mut out, "To", &self.to.join(", "));
        if let Some(message_id) = &self.message_id {
            push_header(&mut out, "Message-ID", &format!("<{}>", message_id));
        }
        push_header(&mut out, "Subject", &self.subject);
        push_header(&mut out, "MIME-Version", "1.0");
        for field in &self.headers {
            push_header(&mut out, field.name(), &field.display_value());
        }

        match &self.body {
            EmailBody::Text(text) => {
                push_header(&mut out, "Content-Type", "text/plain; charset=UTF-8");
                out.push_str("\r\n");
                out.push_str(text);
            }
            EmailBody::Html(html) => {
                push_header(&mut out, "Content-Type", "text/html; charset=UTF-8");
                out.push_str("\r\n");
                out.push_str(html);
            }
            EmailBody::Both { text, html } => {
                let boundary = boundary_for(text, html);
                push_header(
                    &mut out,
                    "Content-Type",
                    &format!("multipart/alternative; boundary=\"{}\"", boundary),
                );
                out.push_str("\r\n");
                for (content_type, part) in [("text/plain", text), ("text/html", html)] {
                    let _ = write!(
                        out,
                        "--{}\r\nContent-Type: {}; charset=UTF-8\r\n\r\n{}\r\n",
                        boundary, content_type, part
                    );
                }
                let _ = write!(out, "--{}--\r\n", boundary);
            }
        }

        out
    }
}

fn header_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_graphic() && *c != ':')
        .collect()
}

fn push_header(out: &mut String, name: &str, value: &str) {
    let value = value.replace(['\r', '\n'], " ");
    let _ = write!(out, "{}: {}\r\n", name, value);
}

// Derived from the parts so the same message always renders identically.
fn boundary_for(text: &str, html: &str) -> String {
    let digest = Sha256::new()
        .chain_update(text.as_bytes())
        .chain_update(html.as_bytes())
        .finalize();

    digest[..12]
        .iter()
        .fold(String::from("=_part_"), |mut acc, byte| {
            let _ = write!(acc, "{:02x}", byte);
            acc
        })
}
