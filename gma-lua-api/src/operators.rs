//! Operator-translation markers and the source rewrite that removes them.
//!
//! The host Lua dialect has no `%` or `//`. Scripts call `Lua.Modulo(a, b)`
//! and `Lua.FloorDiv(a, b)` instead, and every such call must be rewritten to
//! the infix expression before the script reaches the host. The markers are
//! never callable values.
//!
//! [`Translator`] performs the rewrite on Lua source text. It understands just
//! enough of the lexical grammar to stay out of strings and comments and to
//! find the matching parenthesis of a call. Operands that are not atoms are
//! parenthesized, and the whole rewrite is parenthesized when a neighbouring
//! token binds tighter than the operator.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;
use serde::Serialize;

use crate::api_registry::ApiRegistry;
use crate::error::ResolveError;
use crate::value_types::ValueType;

/// An infix operator a marker stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InfixOperator {
    /// `left % right`
    Modulo,
    /// `left // right`
    FloorDivision,
}

impl InfixOperator {
    pub const fn symbol(self) -> &'static str {
        match self {
            InfixOperator::Modulo => "%",
            InfixOperator::FloorDivision => "//",
        }
    }

    /// The infix expression a marker call with operands `left` and `right` becomes.
    pub fn rewrite(self, left: &str, right: &str) -> String {
        format!("{left} {} {right}", self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslateError {
    #[error("line {line}: {path} takes exactly 2 arguments, got {found}")]
    Arity {
        path: String,
        line: usize,
        found: usize,
    },

    #[error("line {line}: unterminated call to {path}")]
    Unterminated { path: String, line: usize },

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Result of translating one source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub source: String,
    /// Number of marker calls rewritten, nested ones included.
    pub rewrites: usize,
}

/// Rewrites marker calls in Lua source into infix expressions.
pub struct Translator<'r> {
    registry: &'r ApiRegistry,
    /// Marker paths, longest first so `Lua.FloorDiv` wins over a shorter prefix.
    markers: Vec<(String, InfixOperator)>,
}

/// Names, dotted fields and numerals.
static SIMPLE_ATOM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*|[0-9][0-9A-Za-z_.]*)$")
        .expect("static regex")
});

const KEYWORDS_BEFORE_UNARY: &[&str] = &[
    "and", "or", "not", "return", "then", "do", "else", "elseif", "in", "until", "while", "if",
    "local",
];

impl<'r> Translator<'r> {
    pub fn new(registry: &'r ApiRegistry) -> Self {
        let mut markers: Vec<(String, InfixOperator)> = registry
            .markers()
            .map(|(path, op)| (path.to_string(), op))
            .collect();
        markers.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Self { registry, markers }
    }

    /// Rewrite every marker call in `source`.
    pub fn translate(&self, source: &str) -> Result<Translation, TranslateError> {
        let mut rewrites = 0;
        let translated = self.translate_span(source, 0, source, &mut rewrites)?;
        if rewrites > 0 {
            debug!("Rewrote {rewrites} operator marker call(s)");
        }
        Ok(Translation {
            source: translated,
            rewrites,
        })
    }

    /// Translate `span`, which starts at byte `offset` of `full`.
    fn translate_span(
        &self,
        span: &str,
        offset: usize,
        full: &str,
        rewrites: &mut usize,
    ) -> Result<String, TranslateError> {
        let bytes = span.as_bytes();
        let mut out = String::with_capacity(span.len());
        let mut copied = 0;
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'-' if bytes.get(i + 1) == Some(&b'-') => {
                    i = skip_comment(bytes, i);
                }
                b'"' | b'\'' => {
                    i = skip_short_string(bytes, i);
                }
                b'[' if long_bracket_level(bytes, i).is_some() => {
                    i = skip_long_bracket(bytes, i);
                }
                c if is_ident_start(c) => {
                    if let Some((path, op, open)) = self.marker_call_at(span, i) {
                        let line = line_of(full, offset + i);
                        let (args, close) = call_arguments(bytes, open).ok_or_else(|| {
                            TranslateError::Unterminated {
                                path: path.to_string(),
                                line,
                            }
                        })?;
                        if args.len() != 2 {
                            return Err(TranslateError::Arity {
                                path: path.to_string(),
                                line,
                                found: args.len(),
                            });
                        }
                        self.registry.resolve(path, &[ValueType::ANY, ValueType::ANY])?;

                        let mut operands = Vec::with_capacity(2);
                        for (start, end) in args {
                            let raw = &span[start..end];
                            let lead = raw.len() - raw.trim_start().len();
                            let inner = self.translate_span(
                                raw.trim(),
                                offset + start + lead,
                                full,
                                rewrites,
                            )?;
                            operands.push(self.operand(&inner));
                        }

                        out.push_str(&span[copied..i]);
                        let expr = op.rewrite(&operands[0], &operands[1]);
                        if needs_parens(&out, &span[close + 1..]) {
                            out.push('(');
                            out.push_str(&expr);
                            out.push(')');
                        } else {
                            out.push_str(&expr);
                        }
                        *rewrites += 1;
                        i = close + 1;
                        copied = i;
                    } else {
                        while i < bytes.len() && is_ident_char(bytes[i]) {
                            i += 1;
                        }
                    }
                }
                _ => i += 1,
            }
        }

        out.push_str(&span[copied..]);
        Ok(out)
    }

    /// If a marker call starts at `i`, return its path, operator and the index of `(`.
    fn marker_call_at(&self, span: &str, i: usize) -> Option<(&str, InfixOperator, usize)> {
        let bytes = span.as_bytes();
        // `x.Lua` and `x:Lua` are members of `x`; `s..Lua` is a concatenation.
        let field_access = match i.checked_sub(1).map(|j| bytes[j]) {
            Some(b':') => true,
            Some(b'.') => !(i >= 2 && bytes[i - 2] == b'.'),
            _ => false,
        };
        if field_access {
            return None;
        }
        let rest = &span[i..];
        self.markers.iter().find_map(|(path, op)| {
            if !rest.starts_with(path.as_str()) {
                return None;
            }
            let after = i + path.len();
            if bytes.get(after).is_some_and(|&c| is_ident_char(c)) {
                return None;
            }
            let open = after + (span[after..].len() - span[after..].trim_start().len());
            (bytes.get(open) == Some(&b'(')).then_some((path.as_str(), *op, open))
        })
    }

    fn operand(&self, expr: &str) -> String {
        if self.is_atom(expr) {
            expr.to_string()
        } else {
            format!("({expr})")
        }
    }

    /// An expression that can sit next to a binary operator without parentheses.
    fn is_atom(&self, expr: &str) -> bool {
        if SIMPLE_ATOM.is_match(expr) {
            return true;
        }
        let bytes = expr.as_bytes();
        let mut depth = 0usize;
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'(' | b'{' => depth += 1,
                b'[' if long_bracket_level(bytes, i).is_some() => {
                    i = skip_long_bracket(bytes, i);
                    continue;
                }
                b'[' => depth += 1,
                b')' | b'}' | b']' => depth = depth.saturating_sub(1),
                b'"' | b'\'' => {
                    i = skip_short_string(bytes, i);
                    continue;
                }
                b'-' if bytes.get(i + 1) == Some(&b'-') => {
                    i = skip_comment(bytes, i);
                    continue;
                }
                b'+' | b'-' | b'*' | b'/' | b'%' | b'^' | b'<' | b'>' | b'=' | b'~' | b'#'
                | b'&' | b'|'
                    if depth == 0 =>
                {
                    return false;
                }
                b'.' if depth == 0 && bytes.get(i + 1) == Some(&b'.') => return false,
                c if is_ident_start(c) => {
                    let start = i;
                    while i < bytes.len() && is_ident_char(bytes[i]) {
                        i += 1;
                    }
                    if depth == 0
                        && matches!(&expr[start..i], "and" | "or" | "not" | "function")
                    {
                        return false;
                    }
                    continue;
                }
                _ => {}
            }
            i += 1;
        }
        true
    }
}

/// Whether a rewrite placed between `before` and `after` must be parenthesized
/// to keep the marker's operands grouped.
fn needs_parens(before: &str, after: &str) -> bool {
    let before = code_before(before);
    let after = code_after(after);

    let tight_before = match before.as_bytes().last() {
        Some(b'*' | b'/' | b'%' | b'^' | b'#' | b'~') => true,
        Some(b'-') => is_unary_position(&before[..before.len() - 1]),
        Some(c) if is_ident_char(*c) => last_word(before) == "not",
        _ => false,
    };

    let tight_after = after.starts_with('^')
        || (after.starts_with('.') && !after.starts_with(".."))
        || after.starts_with([':', '[', '(', '{', '"', '\'']);

    tight_before || tight_after
}

/// Whether a `-` following `before` is a unary minus.
fn is_unary_position(before: &str) -> bool {
    let before = code_before(before);
    match before.as_bytes().last() {
        None => true,
        Some(b')' | b']' | b'}' | b'"' | b'\'') => false,
        Some(c) if is_ident_char(*c) => KEYWORDS_BEFORE_UNARY.contains(&last_word(before)),
        Some(_) => true,
    }
}

/// `s` up to the end of its last token, without trailing whitespace or comments.
fn code_before(s: &str) -> &str {
    let bytes = s.as_bytes();
    let mut end = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'-' if bytes.get(i + 1) == Some(&b'-') => i = skip_comment(bytes, i),
            b'"' | b'\'' => {
                i = skip_short_string(bytes, i);
                end = i;
            }
            b'[' if long_bracket_level(bytes, i).is_some() => {
                i = skip_long_bracket(bytes, i);
                end = i;
            }
            c if c.is_ascii_whitespace() => i += 1,
            _ => {
                i += 1;
                end = i;
            }
        }
    }
    &s[..end]
}

/// `s` from its first token on, past leading whitespace and comments.
fn code_after(mut s: &str) -> &str {
    loop {
        s = s.trim_start();
        if !s.starts_with("--") {
            return s;
        }
        s = &s[skip_comment(s.as_bytes(), 0)..];
    }
}

fn last_word(s: &str) -> &str {
    let start = s
        .bytes()
        .rposition(|c| !is_ident_char(c))
        .map_or(0, |pos| pos + 1);
    &s[start..]
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

fn line_of(full: &str, offset: usize) -> usize {
    full.as_bytes()[..offset.min(full.len())]
        .iter()
        .filter(|&&c| c == b'\n')
        .count()
        + 1
}

/// Level of a long bracket opening at `i` (`[[` is 0, `[==[` is 2).
fn long_bracket_level(bytes: &[u8], i: usize) -> Option<usize> {
    if bytes.get(i) != Some(&b'[') {
        return None;
    }
    let mut j = i + 1;
    while bytes.get(j) == Some(&b'=') {
        j += 1;
    }
    (bytes.get(j) == Some(&b'[')).then_some(j - i - 1)
}

/// Index just past the long bracket string starting at `i`, or the end of input.
fn skip_long_bracket(bytes: &[u8], i: usize) -> usize {
    let Some(level) = long_bracket_level(bytes, i) else {
        return i + 1;
    };
    let mut j = i + level + 2;
    while j < bytes.len() {
        if bytes[j] == b']' {
            let mut k = j + 1;
            while bytes.get(k) == Some(&b'=') {
                k += 1;
            }
            if k - j - 1 == level && bytes.get(k) == Some(&b']') {
                return k + 1;
            }
        }
        j += 1;
    }
    bytes.len()
}

/// Index just past the quoted string starting at `i`.
fn skip_short_string(bytes: &[u8], i: usize) -> usize {
    let quote = bytes[i];
    let mut j = i + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'\n' => return j,
            c if c == quote => return j + 1,
            _ => j += 1,
        }
    }
    bytes.len()
}

/// Index just past the comment starting at `i` (which points at `--`).
fn skip_comment(bytes: &[u8], i: usize) -> usize {
    let body = i + 2;
    if long_bracket_level(bytes, body).is_some() {
        return skip_long_bracket(bytes, body);
    }
    bytes[body.min(bytes.len())..]
        .iter()
        .position(|&c| c == b'\n')
        .map_or(bytes.len(), |pos| body + pos)
}

/// Split the argument list of the call whose `(` is at `open`.
///
/// Returns byte ranges of the top-level arguments and the index of the closing
/// parenthesis, or `None` if the call never closes.
fn call_arguments(bytes: &[u8], open: usize) -> Option<(Vec<(usize, usize)>, usize)> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = open + 1;
    let mut i = open;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_short_string(bytes, i);
                continue;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = skip_comment(bytes, i);
                continue;
            }
            b'[' if long_bracket_level(bytes, i).is_some() => {
                i = skip_long_bracket(bytes, i);
                continue;
            }
            b'(' | b'{' | b'[' => depth += 1,
            b')' | b'}' | b']' => {
                depth -= 1;
                if depth == 0 {
                    if bytes[i] != b')' {
                        return None;
                    }
                    args.push((start, i));
                    if args.len() == 1 && bytes[open + 1..i].iter().all(u8::is_ascii_whitespace) {
                        args.clear();
                    }
                    return Some((args, i));
                }
            }
            b',' if depth == 1 => {
                args.push((start, i));
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translate(source: &str) -> Result<Translation, TranslateError> {
        let registry = ApiRegistry::gma2().unwrap();
        Translator::new(&registry).translate(source)
    }

    fn translated(source: &str) -> String {
        translate(source).unwrap().source
    }

    #[test]
    fn rewrite_produces_infix_expressions() {
        assert_eq!(InfixOperator::Modulo.rewrite("a", "b"), "a % b");
        assert_eq!(InfixOperator::FloorDivision.rewrite("a", "b"), "a // b");
    }

    #[test]
    fn marker_signatures_are_numeric_binary() {
        let registry = ApiRegistry::gma2().unwrap();
        for (path, op) in registry.markers() {
            let sig = registry
                .resolve(path, &[ValueType::NUMBER, ValueType::NUMBER])
                .unwrap();
            assert_eq!(sig.operator, Some(op));
            assert_eq!(sig.params.len(), 2);
            assert!(sig.params.iter().all(|p| p.ty == ValueType::NUMBER && !p.optional));
            assert_eq!(sig.returns.to_string(), "number");
        }
    }

    #[test]
    fn simple_calls() {
        assert_eq!(translated("local x = Lua.Modulo(a, b)"), "local x = a % b");
        assert_eq!(translated("return Lua.FloorDiv(10, 3)"), "return 10 // 3");
        assert_eq!(translated("f(Lua.Modulo(i, 2), 1)"), "f(i % 2, 1)");
        assert_eq!(translated("t = { Lua.Modulo (a,b) }"), "t = { a % b }");
    }

    #[test]
    fn counts_rewrites() {
        let result = translate("a = Lua.Modulo(x, Lua.FloorDiv(y, 2))").unwrap();
        assert_eq!(result.source, "a = x % (y // 2)");
        assert_eq!(result.rewrites, 2);
    }

    #[test]
    fn non_atomic_operands_are_parenthesized() {
        assert_eq!(translated("x = Lua.Modulo(a + 1, b)"), "x = (a + 1) % b");
        assert_eq!(translated("x = Lua.Modulo(f(a, b), t[1])"), "x = f(a, b) % t[1]");
        assert_eq!(translated("x = Lua.Modulo(n or 0, 2)"), "x = (n or 0) % 2");
        assert_eq!(translated("x = Lua.FloorDiv(#list, -1)"), "x = (#list) // (-1)");
    }

    #[test]
    fn tighter_neighbours_force_parentheses() {
        assert_eq!(translated("y = 2 * Lua.Modulo(a, b)"), "y = 2 * (a % b)");
        assert_eq!(translated("y = -Lua.Modulo(a, b)"), "y = -(a % b)");
        assert_eq!(translated("y = Lua.Modulo(a, b) ^ 2"), "y = (a % b) ^ 2");
        assert_eq!(translated("y = not Lua.Modulo(a, b)"), "y = not (a % b)");
        assert_eq!(translated("y = 1 - Lua.Modulo(a, b)"), "y = 1 - a % b");
        assert_eq!(translated("y = Lua.Modulo(a, b) + 1"), "y = a % b + 1");
        assert_eq!(translated("if Lua.Modulo(a, b) == 0 then end"), "if a % b == 0 then end");
    }

    #[test]
    fn strings_and_comments_are_left_alone() {
        let source = r#"print("Lua.Modulo(a, b)") -- Lua.Modulo(c, d)
--[[ Lua.FloorDiv(e, f) ]] s = [==[Lua.Modulo(g, h)]==]"#;
        let result = translate(source).unwrap();
        assert_eq!(result.source, source);
        assert_eq!(result.rewrites, 0);
    }

    #[test]
    fn string_arguments_may_contain_commas_and_parens() {
        assert_eq!(
            translated(r#"x = Lua.Modulo(tonumber("1,)"), 2)"#),
            r#"x = tonumber("1,)") % 2"#
        );
    }

    #[test]
    fn lookalike_identifiers_are_not_markers() {
        let source =
            "MyLua.Modulo(a, b) x.Lua.Modulo(a, b) x:Lua.Modulo(a, b) Lua.ModuloX(a, b) Lua.Modulo = nil";
        assert_eq!(translated(source), source);
    }

    #[test]
    fn concatenated_marker_is_rewritten() {
        let result = translate(r#"s = "x"..Lua.Modulo(7, 3)"#).unwrap();
        assert_eq!(result.source, r#"s = "x"..7 % 3"#);
        assert_eq!(result.rewrites, 1);

        assert_eq!(translated("s = a .. Lua.FloorDiv(b, 2)"), "s = a .. b // 2");
    }

    #[test]
    fn comments_between_neighbour_and_marker() {
        assert_eq!(
            translated("y = 2 * -- twice\n Lua.Modulo(a, b)"),
            "y = 2 * -- twice\n (a % b)"
        );
        assert_eq!(
            translated("y = Lua.Modulo(a, b) --[[ squared ]] ^ 2"),
            "y = (a % b) --[[ squared ]] ^ 2"
        );
        assert_eq!(
            translated("y = 1 + -- plus\n Lua.Modulo(a, b)"),
            "y = 1 + -- plus\n a % b"
        );
    }

    #[test]
    fn wrong_arity_reports_line() {
        let err = translate("local a = 1\nlocal b = Lua.Modulo(a)\n").unwrap_err();
        assert_eq!(
            err,
            TranslateError::Arity {
                path: "Lua.Modulo".to_string(),
                line: 2,
                found: 1
            }
        );
        assert!(matches!(
            translate("Lua.FloorDiv()"),
            Err(TranslateError::Arity { found: 0, .. })
        ));
    }

    #[test]
    fn nested_error_reports_its_own_line() {
        let err = translate("x = Lua.Modulo(\n  1,\n  Lua.FloorDiv(1, 2, 3))").unwrap_err();
        assert!(matches!(err, TranslateError::Arity { line: 3, found: 3, .. }));
    }

    #[test]
    fn unterminated_call() {
        assert!(matches!(
            translate("x = Lua.Modulo(a, (b)"),
            Err(TranslateError::Unterminated { line: 1, .. })
        ));
    }

    #[test]
    fn translated_code_evaluates_like_the_operator() {
        let lua = mlua::Lua::new();
        let cases = [
            ("return Lua.Modulo(7, 3)", 1.0),
            ("return Lua.FloorDiv(7, 2)", 3.0),
            ("return 2 * Lua.Modulo(7, 4)", 6.0),
            ("return -Lua.FloorDiv(9, 2)", -4.0),
            ("return Lua.Modulo(Lua.FloorDiv(17, 3), 4) + 1", 2.0),
            ("return Lua.Modulo(2 + 3, 3) ^ 2", 4.0),
            ("return 2 * -- twice\n Lua.Modulo(7, 4)", 6.0),
            ("return Lua.Modulo(7, 4) -- squared\n ^ 2", 9.0),
        ];
        for (source, expected) in cases {
            let code = translated(source);
            let value: f64 = lua.load(code.as_str()).eval().unwrap();
            assert_eq!(value, expected, "{source} -> {code}");
        }

        let code = translated(r#"return "x"..Lua.Modulo(7, 3)"#);
        let value: String = lua.load(code.as_str()).eval().unwrap();
        assert_eq!(value, "x1");
    }
}
