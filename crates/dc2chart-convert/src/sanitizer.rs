//! Placeholder sanitization
//!
//! A generic YAML serializer quotes any scalar that starts with `{`, which
//! turns `{{ .Values.replicas }}` into a string literal once rendered. This
//! pass runs over serialized text, one line at a time, and:
//!
//! 1. rewrites template parameter references (`${NAME}`, `${{NAME}}`) into
//!    `{{ .Values.parameters.NAME }}`
//! 2. strips the quotes around scalars that are entirely a templating
//!    expression
//!
//! Running it on its own output changes nothing.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::parameters::PARAMETER_REF;
use crate::placeholder;

/// `key: 'expr'`, `- 'expr'` or `'expr'`, single-quoted
static SINGLE_QUOTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r##"^(?P<prefix>\s*(?:-\s+)?(?:(?:'[^']*'|"[^"]*"|[^\s'"#][^'"]*?):\s+)?)'(?P<expr>\{\{[^']*\}\})'(?P<suffix>\s*)$"##,
    )
    .expect("valid regex")
});

/// Same as [`SINGLE_QUOTED`] for double quotes
static DOUBLE_QUOTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r##"^(?P<prefix>\s*(?:-\s+)?(?:(?:'[^']*'|"[^"]*"|[^\s'"#][^'"]*?):\s+)?)"(?P<expr>\{\{[^"\\]*\}\})"(?P<suffix>\s*)$"##,
    )
    .expect("valid regex")
});

/// Sanitize serialized YAML text
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let (body, newline) = match line.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (line, ""),
        };
        out.push_str(&sanitize_line(body));
        out.push_str(newline);
    }
    out
}

fn sanitize_line(line: &str) -> String {
    let line = convert_parameters(line);
    let line = unquote(&SINGLE_QUOTED, &line);
    unquote(&DOUBLE_QUOTED, &line)
}

/// `${NAME}` and `${{NAME}}` to `{{ .Values.parameters.NAME }}`
pub fn convert_parameters(line: &str) -> String {
    PARAMETER_REF
        .replace_all(line, |caps: &Captures| {
            placeholder::values_ref(&placeholder::parameter_key(&caps[1]))
        })
        .into_owned()
}

fn unquote(pattern: &Regex, line: &str) -> String {
    pattern
        .replace(line, "${prefix}${expr}${suffix}")
        .into_owned()
}
