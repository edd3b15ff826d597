//! Attribute scripts.
//!
//! A script hand-specifies the controls of a field or type instead of
//! letting them be synthesized. Scripts live in reflected metadata (the
//! `UIScript` property) between the delimiters `UI[.[` and `].]`:
//!
//! ```text
//! UI[.[
//!     # one statement per control
//!     label  { text = "Scale"; }
//!     slider { min = 0; max = 10; help = "Uniform scale"; }
//! ].]
//! ```
//!
//! Each statement is a keyword naming a control kind followed by a body of
//! `key = value;` clauses. Values are bare text up to the next `;`, or
//! double-quoted with the quotes stripped. `#` starts a comment running to
//! the end of the line, unless it is inside quotes.
//!
//! The whole fragment is parsed and every keyword resolved before any
//! control is created, so a faulty script leaves the target container
//! untouched.

use horizon_inspect_core::PerfSpan;
use horizon_inspect_core::logging::{span_names, targets};

use crate::control::{Binding, ControlId, KindTag};
use crate::error::ScriptError;
use crate::interpreter::Interpreter;

/// Opening delimiter of a script fragment.
pub const SCRIPT_BEGIN: &str = "UI[.[";
/// Closing delimiter of a script fragment.
pub const SCRIPT_END: &str = "].]";

/// One parsed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// The control keyword.
    pub symbol: String,
    /// `key = value` pairs in source order, quotes stripped.
    pub clauses: Vec<(String, String)>,
}

impl Statement {
    /// The value of the last clause with `key`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.clauses
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// The text between the script delimiters, if both are present.
pub fn extract_fragment(source: &str) -> Option<&str> {
    let start = source.find(SCRIPT_BEGIN)? + SCRIPT_BEGIN.len();
    let len = source[start..].find(SCRIPT_END)?;
    Some(&source[start..start + len])
}

/// Remove `#` comments outside double quotes.
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_quotes = false;
    let mut in_comment = false;
    for c in text.chars() {
        if in_comment {
            if c == '\n' {
                in_comment = false;
                out.push(c);
            }
            continue;
        }
        match c {
            '"' => in_quotes = !in_quotes,
            '#' if !in_quotes => {
                in_comment = true;
                continue;
            }
            _ => {}
        }
        out.push(c);
    }
    out
}

/// Strip one layer of double quotes.
fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(value)
}

/// Split a body on `;` outside quotes.
fn split_clauses(body: &str) -> Vec<&str> {
    let mut clauses = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                clauses.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    clauses.push(&body[start..]);
    clauses
}

/// Parse the statements of a script source.
pub fn parse(source: &str) -> Result<Vec<Statement>, ScriptError> {
    let fragment = extract_fragment(source).ok_or(ScriptError::MissingDelimiters)?;
    let text = strip_comments(fragment);
    let bytes = text.as_bytes();
    let mut statements = Vec::new();
    let mut pos = 0;

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }

        let symbol_start = pos;
        while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'{' {
            pos += 1;
        }
        let symbol = &text[symbol_start..pos];
        if symbol.is_empty() {
            return Err(ScriptError::EmptySymbol { offset: symbol_start });
        }

        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if bytes.get(pos) != Some(&b'{') {
            return Err(ScriptError::MissingOpenBrace {
                symbol: symbol.to_string(),
            });
        }
        pos += 1;

        let body_start = pos;
        let mut in_quotes = false;
        while pos < bytes.len() && (in_quotes || bytes[pos] != b'}') {
            if bytes[pos] == b'"' {
                in_quotes = !in_quotes;
            }
            pos += 1;
        }
        if pos >= bytes.len() {
            return Err(ScriptError::MissingCloseBrace {
                symbol: symbol.to_string(),
            });
        }
        let body = &text[body_start..pos];
        pos += 1;

        let mut clauses = Vec::new();
        for clause in split_clauses(body) {
            let clause = clause.trim();
            if clause.is_empty() {
                continue;
            }
            let malformed = || ScriptError::MalformedClause {
                symbol: symbol.to_string(),
                clause: clause.to_string(),
            };
            let (key, value) = clause.split_once('=').ok_or_else(malformed)?;
            let key = key.trim();
            if key.is_empty() {
                return Err(malformed());
            }
            clauses.push((key.to_string(), unquote(value.trim()).to_string()));
        }

        statements.push(Statement {
            symbol: symbol.to_string(),
            clauses,
        });
    }

    if statements.is_empty() {
        return Err(ScriptError::Empty);
    }
    Ok(statements)
}

/// Builds controls from attribute scripts.
pub struct ScriptEngine;

impl ScriptEngine {
    /// Build the controls of `source` into `interp.top()`.
    ///
    /// Every produced control that can display a value is bound to
    /// `binding`. On failure nothing is added, the error is logged and
    /// returned so the caller can fall back to automatic synthesis.
    pub fn build(
        interp: &mut Interpreter<'_>,
        source: &str,
        binding: Option<&Binding>,
    ) -> Result<Vec<ControlId>, ScriptError> {
        let _span = PerfSpan::new(span_names::SCRIPT);
        let result = Self::try_build(interp, source, binding);
        if let Err(err) = &result {
            tracing::warn!(target: targets::SCRIPT, %err, "attribute script rejected");
        }
        result
    }

    fn try_build(
        interp: &mut Interpreter<'_>,
        source: &str,
        binding: Option<&Binding>,
    ) -> Result<Vec<ControlId>, ScriptError> {
        let statements = parse(source)?;
        let registry = interp.registry();
        let kinds = statements
            .iter()
            .map(|statement| {
                registry
                    .create_kind(&statement.symbol)
                    .ok_or_else(|| ScriptError::UnknownKeyword(statement.symbol.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let scratch = interp.push_container("script");
        let mut produced = Vec::with_capacity(statements.len());
        for (statement, kind) in statements.iter().zip(kinds) {
            let tag = kind.tag();
            let canvas = interp.canvas();
            let control = canvas.create(kind, statement.symbol.as_str());
            canvas.add_child(scratch, control);
            if let Some(binding) = binding
                && accepts_binding(tag, binding)
            {
                canvas.bind(control, binding.clone());
            }
            for (key, value) in &statement.clauses {
                canvas.process(control, key, value);
            }
            produced.push(control);
        }
        interp.pop(false);

        let target = interp.top();
        let canvas = interp.canvas();
        for &control in &produced {
            canvas.add_child(target, control);
        }
        canvas.destroy(scratch);
        tracing::debug!(target: targets::SCRIPT, controls = produced.len(), "attribute script built");
        Ok(produced)
    }
}

fn accepts_binding(tag: KindTag, binding: &Binding) -> bool {
    match tag {
        KindTag::Custom => true,
        KindTag::Button | KindTag::Container | KindTag::Panel | KindTag::Canvas => false,
        _ => matches!(binding, Binding::Text(_)),
    }
}
