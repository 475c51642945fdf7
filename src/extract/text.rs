//! Text-scanning helpers shared by the language extractors.

use lazy_static::lazy_static;
use phf::phf_set;
use regex::Regex;

/// Upper bound on fields taken from a block whose end cannot be located
/// precisely (indentation or `end`-delimited languages).
pub const MAX_FIELDS: usize = 30;

/// Identifiers that are never reported as actions, functions or services.
static RESERVED: phf::Set<&'static str> = phf_set! {
    // constructors and lifecycle
    "constructor", "initialize", "init", "new", "default", "__construct", "__destruct",
    "setUp", "tearDown", "setup", "teardown", "finalize", "dispose", "Dispose",
    "componentDidMount", "componentDidUpdate", "componentWillUnmount", "render",
    "mounted", "created", "beforeMount", "beforeDestroy", "ngOnInit",
    // object boilerplate
    "toString", "ToString", "equals", "Equals", "hashCode", "GetHashCode", "clone",
    "fmt", "drop", "main", "String",
    // control keywords that regexes can mistake for declarations
    "if", "else", "for", "while", "switch", "catch", "return", "function", "do",
    "end", "case", "when", "unless", "until", "begin", "rescue", "ensure", "private",
    "protected", "public", "static", "async", "await",
};

/// Whether `name` is a constructor, lifecycle hook, dunder method or keyword.
pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(name) || (name.len() > 4 && name.starts_with("__") && name.ends_with("__"))
}

/// Remove duplicates, keeping first occurrences in order.
pub fn dedup<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Distinct, non-reserved identifiers in order of appearance.
pub fn action_names<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    dedup(items.into_iter().filter(|n| !n.is_empty() && !is_reserved(n)))
}

/// Body of the brace block whose `{` sits at byte offset `open`.
///
/// Nested braces are balanced and braces inside string literals and
/// comments are ignored. Returns `None` when the block never closes.
pub fn brace_body(content: &str, open: usize) -> Option<&str> {
    balanced(content, open, b'{', b'}')
}

/// Argument text of the call whose `(` sits at byte offset `open`.
pub fn paren_body(content: &str, open: usize) -> Option<&str> {
    balanced(content, open, b'(', b')')
}

fn balanced(content: &str, open: usize, opener: u8, closer: u8) -> Option<&str> {
    let bytes = content.as_bytes();
    if bytes.get(open) != Some(&opener) {
        return None;
    }

    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'`' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'\'' => {
                if let Some(end) = single_quote_end(bytes, i) {
                    i = end;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 1;
            }
            b if b == opener => depth += 1,
            b if b == closer => {
                depth -= 1;
                if depth == 0 {
                    return content.get(open + 1..i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Offset of the quote closing the single-quoted literal opened at `start`.
///
/// The literal must close on the same line. A quote after `&` or `<` that
/// starts an identifier not ending in a quote is a Rust lifetime.
fn single_quote_end(bytes: &[u8], start: usize) -> Option<usize> {
    let body = start + 1;
    let ident_end = body
        + bytes[body.min(bytes.len())..]
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
            .count();
    let after_ref = start > 0 && matches!(bytes[start - 1], b'&' | b'<');
    if after_ref && ident_end > body && bytes.get(ident_end) != Some(&b'\'') {
        return None;
    }

    let mut i = body;
    while i < bytes.len() && bytes[i] != b'\n' {
        match bytes[i] {
            b'\\' => i += 2,
            b'\'' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Split `text` on any of `separators` that sit outside brackets and quotes.
///
/// Pieces are trimmed; empty pieces are dropped.
pub fn split_top_level<'a>(text: &'a str, separators: &[char]) -> Vec<&'a str> {
    let bytes = text.as_bytes();
    let mut pieces = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'`' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'\'' => {
                if let Some(end) = single_quote_end(bytes, i) {
                    i = end;
                }
            }
            b'{' | b'(' | b'[' => depth += 1,
            b'}' | b')' | b']' => depth -= 1,
            b if depth <= 0 && b.is_ascii() && separators.contains(&(b as char)) => {
                pieces.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    pieces.push(text.get(start..).unwrap_or("").trim());
    pieces.into_iter().filter(|p| !p.is_empty()).collect()
}

/// Body of the first brace block starting at or after `from`.
pub fn brace_body_after(content: &str, from: usize) -> Option<&str> {
    let open = from + content.get(from..)?.find('{')?;
    brace_body(content, open)
}

/// Byte offset of the start of the line containing `idx`.
pub fn line_start(content: &str, idx: usize) -> usize {
    content[..idx.min(content.len())]
        .rfind('\n')
        .map(|p| p + 1)
        .unwrap_or(0)
}

/// Leading whitespace width of `line` (tabs count as four).
pub fn indent_of(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Indentation-delimited body following the header line that contains `header_at`.
///
/// Collects subsequent lines indented deeper than the header, allowing blank
/// lines, until the first line at or above the header's indentation.
pub fn indented_body(content: &str, header_at: usize) -> &str {
    let start = line_start(content, header_at);
    let header_indent = indent_of(&content[start..]);
    let body_start = match content[header_at..].find('\n') {
        Some(p) => header_at + p + 1,
        None => return "",
    };

    let mut end = body_start;
    for line in content[body_start..].split_inclusive('\n') {
        let trimmed = line.trim();
        if !trimmed.is_empty() && indent_of(line) <= header_indent {
            break;
        }
        end += line.len();
    }
    &content[body_start..end]
}

lazy_static! {
    static ref DO_OPENER: Regex = Regex::new(r"\bdo(\s*\|[^|]*\|)?\s*(#.*)?$").unwrap();
    static ref FN_OPENER: Regex = Regex::new(r"\bfn\b.*->\s*$").unwrap();
    static ref RUBY_OPENER: Regex =
        Regex::new(r"^\s*(def|class|module|if|unless|case|begin|while|until)\b").unwrap();
    static ref TRAILING_END: Regex = Regex::new(r"\bend\s*$").unwrap();
    static ref END_CLOSER: Regex = Regex::new(r"^\s*end\b").unwrap();
}

/// Which keywords open a nested block in an `end`-delimited language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndSyntax {
    /// `do ... end` and `fn -> ... end`.
    Elixir,
    /// `do ... end` plus `def`/`class`/`if`/... at line start.
    Ruby,
}

/// Body of an `end`-terminated block whose header line contains `header_at`.
///
/// Unterminated blocks run to the end of the file.
pub fn end_body(content: &str, header_at: usize, syntax: EndSyntax) -> &str {
    let body_start = match content[header_at..].find('\n') {
        Some(p) => header_at + p + 1,
        None => return "",
    };

    let mut depth = 1usize;
    let mut offset = body_start;
    for line in content[body_start..].split_inclusive('\n') {
        let code = line.split('#').next().unwrap_or("");
        if END_CLOSER.is_match(code) {
            depth -= 1;
            if depth == 0 {
                return &content[body_start..offset];
            }
        } else if opens_block(code, syntax) {
            depth += 1;
        }
        offset += line.len();
    }
    &content[body_start..]
}

/// Whether a line closes an `end`-delimited block.
pub fn closes_block(code: &str) -> bool {
    END_CLOSER.is_match(code)
}

/// Whether a line opens a nested `end`-delimited block.
pub fn opens_block(code: &str, syntax: EndSyntax) -> bool {
    let code = code.trim_end();
    if DO_OPENER.is_match(code) {
        return true;
    }
    match syntax {
        EndSyntax::Elixir => FN_OPENER.is_match(code),
        EndSyntax::Ruby => RUBY_OPENER.is_match(code) && !TRAILING_END.is_match(code),
    }
}

/// Split a comma-separated parameter or destructuring list into bare names.
///
/// `"{ title, onClick = noop, ...rest }"` style inputs (without the braces)
/// yield `["title", "onClick"]`; type annotations and defaults are dropped.
pub fn identifier_list(list: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();

    for c in list.chars() {
        match c {
            '{' | '(' | '[' | '<' => {
                depth += 1;
                current.push(c);
            }
            '}' | ')' | ']' | '>' => {
                depth -= 1;
                current.push(c);
            }
            ',' | ';' | '\n' if depth <= 0 => {
                names.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    names.push(current);

    let names = names.into_iter().filter_map(|raw| {
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with("...") || raw.starts_with("//") {
            return None;
        }
        let name: String = raw
            .trim_start_matches(|c: char| c == '$' || c == '@' || c == ':')
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    });
    dedup(names)
}

/// Convert `UserProfile` / `userProfile` / `user-profile` to `user_profile`.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == ' ' || c == '.' {
            out.push('_');
        } else if c.is_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).map(|n| n.is_lowercase()).unwrap_or(false);
            let prev_upper = i > 0 && chars[i - 1].is_uppercase();
            if i > 0 && !out.ends_with('_') && (prev_lower || (prev_upper && next_lower)) {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Convert `user_profiles` to `UserProfiles`.
pub fn pascal_case(name: &str) -> String {
    name.split(|c: char| c == '_' || c == '-' || c == ' ')
        .filter(|p| !p.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Naive English singular of a table name (`categories` -> `category`).
pub fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{}y", stem);
    }
    for suffix in ["sses", "xes", "ches", "shes", "zes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_string();
    }
    word.strip_suffix('s').unwrap_or(word).to_string()
}

/// File name without directories and without its (last) extension.
pub fn file_stem(rel: &str) -> &str {
    let name = rel.rsplit('/').next().unwrap_or(rel);
    match name.find('.') {
        Some(0) | None => name,
        Some(p) => &name[..p],
    }
}

lazy_static! {
    static ref ANGLE_PARAM: Regex = Regex::new(r"<(?:[\w.]+:)?(\w+)>").unwrap();
    static ref NAMED_GROUP: Regex = Regex::new(r"\(\?P?<(\w+)>[^)]*\)").unwrap();
    static ref TEMPLATE_PARAM: Regex = Regex::new(r"\$\{\s*(?:[\w$]+\.)*(\w+)\s*\}").unwrap();
    static ref BRACE_PARAM: Regex = Regex::new(r"\{(\w+)(?::[^}]*)?\??\}").unwrap();
    static ref BRACKET_PARAM: Regex =
        Regex::new(r"\[{1,2}(?:\.\.\.)?(\w+)(?:=\w+)?\]{1,2}").unwrap();
    static ref MULTI_SLASH: Regex = Regex::new(r"/{2,}").unwrap();
}

/// Normalize a declared route path.
///
/// Adds a leading slash, strips regex anchors, rewrites `<int:id>`, `{id}`, `${id}`,
/// `(?P<id>..)` and `[id]` parameters to `:id`, and drops trailing slashes.
pub fn normalize_route(raw: &str) -> String {
    let mut path = raw.trim().trim_start_matches('^').trim_end_matches('$').to_string();
    path = NAMED_GROUP.replace_all(&path, ":$1").into_owned();
    path = ANGLE_PARAM.replace_all(&path, ":$1").into_owned();
    path = TEMPLATE_PARAM.replace_all(&path, ":$1").into_owned();
    path = BRACE_PARAM.replace_all(&path, ":$1").into_owned();
    path = BRACKET_PARAM.replace_all(&path, ":$1").into_owned();
    path = format!("/{}", path);
    path = MULTI_SLASH.replace_all(&path, "/").into_owned();
    if path.len() > 1 {
        path = path.trim_end_matches('/').to_string();
    }
    if path.is_empty() {
        path.push('/');
    }
    path
}

/// Join a scope prefix and a route path, then normalize.
pub fn join_route(prefix: &str, path: &str) -> String {
    normalize_route(&format!("{}/{}", prefix, path))
}

/// REST action tables for resource-style route declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestStyle {
    Phoenix,
    Rails,
    Laravel,
    LaravelApi,
}

/// `(action, method, suffix)` rows expanded by a resource declaration.
pub fn rest_actions(style: RestStyle) -> &'static [(&'static str, &'static str, &'static str)] {
    match style {
        RestStyle::Phoenix => &[
            ("index", "GET", ""),
            ("edit", "GET", "/:id/edit"),
            ("new", "GET", "/new"),
            ("show", "GET", "/:id"),
            ("create", "POST", ""),
            ("update", "PATCH", "/:id"),
            ("update", "PUT", "/:id"),
            ("delete", "DELETE", "/:id"),
        ],
        RestStyle::Rails => &[
            ("index", "GET", ""),
            ("new", "GET", "/new"),
            ("create", "POST", ""),
            ("show", "GET", "/:id"),
            ("edit", "GET", "/:id/edit"),
            ("update", "PATCH", "/:id"),
            ("update", "PUT", "/:id"),
            ("destroy", "DELETE", "/:id"),
        ],
        RestStyle::Laravel => &[
            ("index", "GET", ""),
            ("create", "GET", "/create"),
            ("store", "POST", ""),
            ("show", "GET", "/:id"),
            ("edit", "GET", "/:id/edit"),
            ("update", "PUT", "/:id"),
            ("destroy", "DELETE", "/:id"),
        ],
        RestStyle::LaravelApi => &[
            ("index", "GET", ""),
            ("store", "POST", ""),
            ("show", "GET", "/:id"),
            ("update", "PUT", "/:id"),
            ("destroy", "DELETE", "/:id"),
        ],
    }
}
