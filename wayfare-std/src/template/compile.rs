//! Template compilation.
//!
//! The cache treats templates as a black box: a [`Compiler`] turns text into
//! a [`Compiled`] value once, which is then rendered any number of times.
//! [`TagCompiler`] is the default and understands a small tag syntax:
//!
//! ```text
//! Hello [% user.name | html %]!
//! ```
//!
//! - `[% name %]` substitutes a binding
//! - dotted paths descend into maps (and lists by index)
//! - `| html` escapes the value for HTML

use serde_json::Value;
use std::sync::Arc;
use wayfare_core::Fields;

const OPEN: &str = "[%";
const CLOSE: &str = "%]";

/// A compiled template.
pub trait Compiled: Send + Sync + 'static {
    /// Render with `bindings`; `strict` makes unknown variables an error.
    fn render(&self, bindings: &Fields, strict: bool) -> Result<String, String>;
}

/// Turns source text into a [`Compiled`] template.
pub trait Compiler: Send + Sync + 'static {
    /// Compile `text`.
    fn compile(&self, text: &str) -> Result<Arc<dyn Compiled>, String>;
}

/// The default `[% var | filter %]` compiler.
#[derive(Debug, Default, Clone, Copy)]
pub struct TagCompiler;

impl Compiler for TagCompiler {
    fn compile(&self, text: &str) -> Result<Arc<dyn Compiled>, String> {
        Ok(Arc::new(TagTemplate::parse(text)?))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Text(String),
    Var { path: Vec<String>, html: bool },
}

/// A template compiled by [`TagCompiler`].
#[derive(Debug, Clone, PartialEq)]
pub struct TagTemplate {
    parts: Vec<Part>,
}

impl TagTemplate {
    /// Parse `text` into literal and variable parts.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut parts = Vec::new();
        let mut rest = text;
        let mut offset = 0;

        while let Some(start) = rest.find(OPEN) {
            if start > 0 {
                parts.push(Part::Text(rest[..start].to_string()));
            }
            let body_start = start + OPEN.len();
            let Some(len) = rest[body_start..].find(CLOSE) else {
                return Err(format!("unclosed tag at byte {}", offset + start));
            };
            parts.push(parse_tag(&rest[body_start..body_start + len])?);

            let consumed = body_start + len + CLOSE.len();
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            parts.push(Part::Text(rest.to_string()));
        }

        Ok(Self { parts })
    }
}

fn parse_tag(body: &str) -> Result<Part, String> {
    let mut pieces = body.split('|').map(str::trim);
    let name = pieces.next().unwrap_or_default();
    if name.is_empty() {
        return Err("empty tag".to_string());
    }
    if name.split('.').any(str::is_empty) {
        return Err(format!("malformed variable {name:?}"));
    }

    let mut html = false;
    for filter in pieces {
        match filter {
            "html" => html = true,
            other => return Err(format!("unknown filter {other:?}")),
        }
    }

    Ok(Part::Var {
        path: name.split('.').map(str::to_string).collect(),
        html,
    })
}

impl Compiled for TagTemplate {
    fn render(&self, bindings: &Fields, strict: bool) -> Result<String, String> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Text(text) => out.push_str(text),
                Part::Var { path, html } => match lookup(bindings, path) {
                    Some(value) => {
                        let text = stringify(value);
                        if *html {
                            out.push_str(&escape_html(&text));
                        } else {
                            out.push_str(&text);
                        }
                    }
                    None if strict => {
                        return Err(format!("undefined variable `{}`", path.join(".")));
                    }
                    None => {}
                },
            }
        }
        Ok(out)
    }
}

fn lookup<'a>(bindings: &'a Fields, path: &[String]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut value = bindings.get(first)?;
    for key in rest {
        value = match value {
            Value::Object(map) => map.get(key)?,
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(value)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Escape `&`, `<`, `>`, `"` and `'`.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
