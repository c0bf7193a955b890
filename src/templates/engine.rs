// advisory-report-service/src/templates/engine.rs
//
// Placeholder syntax is a wire contract shared with templates already
// stored by the platform: `{{NAME}}` substitutes, `{{#if NAME}}...{{/if}}`
// includes conditionally. The template is tokenized once and evaluated in
// a single linear scan, so conditional delimiters can never be corrupted
// by substitution order.

use crate::models::VariableMap;

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
    IfOpen(&'a str),
    IfClose,
}

fn tokenize(template: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        if start > 0 {
            tokens.push(Token::Literal(&rest[..start]));
        }
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let inner = after[..end].trim();
                if inner == "/if" {
                    tokens.push(Token::IfClose);
                } else if let Some(flag) = inner.strip_prefix("#if") {
                    tokens.push(Token::IfOpen(flag.trim()));
                } else {
                    tokens.push(Token::Placeholder(inner));
                }
                rest = &after[end + 2..];
            }
            None => {
                // Unterminated opener: everything from here on is literal.
                tokens.push(Token::Literal(&rest[start..]));
                rest = "";
            }
        }
    }

    if !rest.is_empty() {
        tokens.push(Token::Literal(rest));
    }
    tokens
}

/// Flag truthiness. The variable builder emits section flags as the
/// literal strings "true"/"false", so "false" is falsy despite being
/// non-empty; numeric strings count by sign; anything else non-empty
/// is truthy.
fn is_truthy(value: Option<&String>) -> bool {
    let Some(value) = value else {
        return false;
    };
    if value.is_empty() || value == "false" {
        return false;
    }
    if let Ok(number) = value.parse::<f64>() {
        return number > 0.0;
    }
    true
}

/// Populate a template: evaluate conditional regions, substitute
/// placeholders (missing keys become empty), and never emit raw
/// `{{...}}` syntax. Conditionals do not nest; the first `{{/if}}`
/// closes the open region and an opener inside a kept region is
/// discarded as stray syntax.
pub fn populate(template: &str, variables: &VariableMap) -> String {
    let tokens = tokenize(template);
    let mut out = String::with_capacity(template.len());
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            Token::Literal(text) => out.push_str(text),
            Token::Placeholder(name) => {
                if let Some(value) = variables.get(*name) {
                    out.push_str(value);
                }
            }
            // A close without an open is stray syntax; drop it.
            Token::IfClose => {}
            Token::IfOpen(flag) => {
                let keep = is_truthy(variables.get(*flag));
                i += 1;
                while i < tokens.len() {
                    match &tokens[i] {
                        Token::IfClose => break,
                        Token::Literal(text) if keep => out.push_str(text),
                        Token::Placeholder(name) if keep => {
                            if let Some(value) = variables.get(*name) {
                                out.push_str(value);
                            }
                        }
                        // Skipped content, or a stray nested opener.
                        _ => {}
                    }
                    i += 1;
                }
            }
        }
        i += 1;
    }

    out
}
