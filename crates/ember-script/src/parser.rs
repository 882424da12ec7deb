//! The default template syntax.
//!
//! ```text
//! <html><% for i = 1 to 3 step 1 %><p><%= $i 2 * %></p><% end %></html>
//! ```
//!
//! * `<% for VAR = START to END [step STEP] %> ... <% end %>` is a loop.
//!   Bounds are literals or `$var` references.
//! * `<%= ... %>` is an echo. Tokens are numbers or `"quoted"` strings
//!   (literals), `$name` (variable reads), symbol-only tokens (operators)
//!   and any other word (function calls).
//! * Everything else is literal text.

use ember_core::ScriptError;

use crate::document::{Document, Element, ForLoop, Node, Operand};

const OPEN: &str = "<%";
const CLOSE: &str = "%>";

/// Turns template source into a [`Document`].
pub trait DocumentParser: Send + Sync {
    fn parse(&self, source: &str) -> Result<Document, ScriptError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateParser;

impl TemplateParser {
    pub fn new() -> Self {
        Self
    }
}

struct OpenLoop {
    variable: String,
    start: Operand,
    end: Operand,
    step: Option<Operand>,
    body: Vec<Node>,
}

impl DocumentParser for TemplateParser {
    fn parse(&self, source: &str) -> Result<Document, ScriptError> {
        let mut root: Vec<Node> = Vec::new();
        let mut open: Vec<OpenLoop> = Vec::new();
        let mut rest = source;

        while !rest.is_empty() {
            let Some(start) = rest.find(OPEN) else {
                current(&mut root, &mut open).push(Node::Text(rest.to_string()));
                break;
            };
            if start > 0 {
                current(&mut root, &mut open).push(Node::Text(rest[..start].to_string()));
            }
            let after_open = &rest[start + OPEN.len()..];
            let end = after_open
                .find(CLOSE)
                .ok_or_else(|| ScriptError::Parse("unterminated '<%' tag".into()))?;
            let tag = &after_open[..end];
            rest = &after_open[end + CLOSE.len()..];

            if let Some(expression) = tag.strip_prefix('=') {
                let elements = parse_echo(expression)?;
                current(&mut root, &mut open).push(Node::Echo(elements));
                continue;
            }

            let words: Vec<&str> = tag.split_whitespace().collect();
            match words.first().copied() {
                Some("for") => open.push(parse_for_header(&words)?),
                Some("end") if words.len() == 1 => {
                    let finished = open
                        .pop()
                        .ok_or_else(|| ScriptError::Parse("'end' without matching 'for'".into()))?;
                    let node = Node::For(ForLoop {
                        variable: finished.variable,
                        start: finished.start,
                        end: finished.end,
                        step: finished.step,
                        body: finished.body,
                    });
                    current(&mut root, &mut open).push(node);
                }
                Some(other) => {
                    return Err(ScriptError::Parse(format!("unknown directive '{}'", other)));
                }
                None => return Err(ScriptError::Parse("empty '<% %>' tag".into())),
            }
        }

        if let Some(unclosed) = open.last() {
            return Err(ScriptError::Parse(format!(
                "loop over '{}' is missing its 'end'",
                unclosed.variable
            )));
        }
        Ok(Document::new(root))
    }
}

fn current<'a>(root: &'a mut Vec<Node>, open: &'a mut [OpenLoop]) -> &'a mut Vec<Node> {
    match open.last_mut() {
        Some(frame) => &mut frame.body,
        None => root,
    }
}

/// `for VAR = START to END [step STEP]`
fn parse_for_header(words: &[&str]) -> Result<OpenLoop, ScriptError> {
    let bad = || ScriptError::Parse(format!("malformed loop header '{}'", words.join(" ")));
    let (variable, start, end, step) = match words {
        ["for", var, "=", start, "to", end] => (*var, *start, *end, None),
        ["for", var, "=", start, "to", end, "step", step] => (*var, *start, *end, Some(*step)),
        _ => return Err(bad()),
    };
    let variable = variable.strip_prefix('$').unwrap_or(variable);
    if variable.is_empty() || !variable.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(bad());
    }
    Ok(OpenLoop {
        variable: variable.to_string(),
        start: parse_operand(start),
        end: parse_operand(end),
        step: step.map(parse_operand),
        body: Vec::new(),
    })
}

fn parse_operand(word: &str) -> Operand {
    match word.strip_prefix('$') {
        Some(name) => Operand::Variable(name.to_string()),
        None => Operand::Literal(unquote(word).to_string()),
    }
}

fn unquote(word: &str) -> &str {
    word.strip_prefix('"')
        .and_then(|w| w.strip_suffix('"'))
        .unwrap_or(word)
}

fn parse_echo(expression: &str) -> Result<Vec<Element>, ScriptError> {
    let mut elements = Vec::new();
    let mut chars = expression.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '"' {
            chars.next();
            let mut literal = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some('n') => literal.push('\n'),
                        Some('t') => literal.push('\t'),
                        Some(other) => literal.push(other),
                        None => return Err(ScriptError::Parse("dangling escape in string".into())),
                    },
                    Some(other) => literal.push(other),
                    None => return Err(ScriptError::Parse("unterminated string literal".into())),
                }
            }
            elements.push(Element::Literal(literal));
            continue;
        }

        let mut word = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                break;
            }
            word.push(c);
            chars.next();
        }
        elements.push(classify(word));
    }
    Ok(elements)
}

fn classify(word: String) -> Element {
    if let Some(name) = word.strip_prefix('$') {
        return Element::Variable(name.to_string());
    }
    if looks_numeric(&word) {
        return Element::Literal(word);
    }
    if word.chars().all(|c| !c.is_alphanumeric() && c != '_') {
        return Element::Operator(word);
    }
    Element::Function(word)
}

fn looks_numeric(word: &str) -> bool {
    let digits = word.strip_prefix(['-', '+']).unwrap_or(word);
    digits.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && digits.chars().any(|c| c.is_ascii_digit())
        && word.parse::<f64>().is_ok()
}
