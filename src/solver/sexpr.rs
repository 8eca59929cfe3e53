use anyhow::{bail, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SExpr {
    Atom(String),
    List(Vec<SExpr>),
}

impl SExpr {
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExpr::Atom(s) => Some(s),
            SExpr::List(_) => None,
        }
    }
}

/// Parses every top-level S-expression in `input`. Comments start with `;`,
/// `|quoted symbols|` and `"strings"` are kept as single atoms.
pub fn parse_all(input: &str) -> Result<Vec<SExpr>> {
    let mut out = Vec::new();
    let mut stack: Vec<Vec<SExpr>> = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            ';' => {
                while let Some(c) = chars.next() { if c == '\n' { break; } }
            }
            '(' => { chars.next(); stack.push(Vec::new()); }
            ')' => {
                chars.next();
                let Some(items) = stack.pop() else { bail!("unbalanced ')'") };
                push_expr(&mut stack, &mut out, SExpr::List(items));
            }
            c if c.is_whitespace() => { chars.next(); }
            '|' | '"' => {
                let delim = c;
                let mut tok = String::new();
                tok.push(delim);
                chars.next();
                let mut closed = false;
                for c in chars.by_ref() {
                    tok.push(c);
                    if c == delim { closed = true; break; }
                }
                if !closed { bail!("unterminated {}", delim) }
                push_expr(&mut stack, &mut out, SExpr::Atom(tok));
            }
            _ => {
                let mut tok = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' || c == ';' { break; }
                    tok.push(c);
                    chars.next();
                }
                push_expr(&mut stack, &mut out, SExpr::Atom(tok));
            }
        }
    }
    if !stack.is_empty() { bail!("unbalanced '('") }
    Ok(out)
}

fn push_expr(stack: &mut [Vec<SExpr>], out: &mut Vec<SExpr>, e: SExpr) {
    match stack.last_mut() {
        Some(top) => top.push(e),
        None => out.push(e),
    }
}
