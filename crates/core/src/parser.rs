//! Line-based extraction of class headers, variable declarations and
//! function/event signatures from one source file.
//!
//! This is deliberately not a full parser: it pulls out just enough
//! structure for name resolution. Individual malformed lines are logged and
//! skipped; only a missing class header is fatal for a file.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::path::Path;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::model::{ClassSymbol, FunctionSymbol, ParseState, VarScope, VariableSymbol};

static CLASS_RE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(
        r"^\s*class\s+(?P<name>[A-Za-z0-9_]+)(?:\s+extends\s+(?P<parent>[A-Za-z0-9_.]+))?",
    )
    .case_insensitive(true)
    .build()
    .expect("class header regex")
});

static VAR_RE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"^\s*var\s*(?:\(\s*[A-Za-z0-9_]*\s*\))?\s+(?P<rest>.+)$")
        .case_insensitive(true)
        .build()
        .expect("var declaration regex")
});

static LOCAL_RE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"^\s*local\s+(?P<rest>.+)$")
        .case_insensitive(true)
        .build()
        .expect("local declaration regex")
});

static FUNC_RE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(
        r"^\s*[A-Za-z0-9()\s]*?\b(?P<kw>function|event)\s+(?:coerce\s+)?(?P<ret>[A-Za-z0-9<>_]*?)\s*(?P<name>[A-Za-z0-9_]+)\s*\((?P<params>.*?)\)\s*(?P<const>const)?\s*;?\s*(?P<doc>(?://|/\*\*).*)?$",
    )
    .case_insensitive(true)
    .build()
    .expect("function declaration regex")
});

static METADATA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>").expect("metadata tag regex"));

/// Parse one source file into a populated class symbol.
pub fn parse_file(path: &Path) -> Result<ClassSymbol> {
    let text = std::fs::read_to_string(path)?;
    parse_source(path, &text)
}

/// Pure parsing core: extract the class header, member variables, locals
/// and function/event signatures from `text`.
pub fn parse_source(path: &Path, text: &str) -> Result<ClassSymbol> {
    let mut class: Option<ClassSymbol> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = (idx + 1) as u32;
        if raw.trim().eq_ignore_ascii_case("defaultproperties") {
            break;
        }

        let Some(current) = class.as_mut() else {
            if let Some(caps) = CLASS_RE.captures(raw) {
                let mut symbol = ClassSymbol::new(
                    &caps["name"],
                    caps.name("parent").map(|m| m.as_str().to_string()),
                    path.to_path_buf(),
                );
                symbol.line = line_no;
                symbol.state = ParseState::Parsed;
                class = Some(symbol);
            }
            continue;
        };

        if let Some(rest) = variable_line_rest(raw, VarScope::Member) {
            match parse_declarations(rest, line_no, VarScope::Member) {
                Some(vars) => current.variables.extend(vars),
                None => debug!("skipping malformed var line {line_no} in {}", path.display()),
            }
        } else if let Some(rest) = variable_line_rest(raw, VarScope::Local) {
            match parse_declarations(rest, line_no, VarScope::Local) {
                Some(vars) => current.variables.extend(vars),
                None => debug!(
                    "skipping malformed local line {line_no} in {}",
                    path.display()
                ),
            }
        } else if let Some(func) = parse_function_line(raw, line_no) {
            current.functions.push(func);
        }
    }

    class.ok_or_else(|| EngineError::MissingHeader {
        path: path.to_path_buf(),
    })
}

/// Match a `var`/`local` declaration line, returning the text after the
/// keyword (modifiers, type, names, optional doc comment).
pub(crate) fn variable_line_rest<'a>(raw: &'a str, scope: VarScope) -> Option<&'a str> {
    let re = match scope {
        VarScope::Member => &*VAR_RE,
        VarScope::Local => &*LOCAL_RE,
        VarScope::Parameter => return None,
    };
    let caps = re.captures(raw)?;
    caps.name("rest").map(|m| m.as_str())
}

/// Parse the body of a declaration line into one symbol per declared name.
/// Comma-separated names share modifiers, type and doc text.
pub(crate) fn parse_declarations(
    rest: &str,
    line: u32,
    scope: VarScope,
) -> Option<Vec<VariableSymbol>> {
    let (decl, doc) = split_doc(rest);
    let decl = decl.trim().trim_end_matches(';').trim();

    let mut pieces = decl.split(',');
    let first = pieces.next()?.trim();
    let mut tokens: Vec<&str> = first.split_whitespace().collect();
    if tokens.len() < 2 {
        return None;
    }
    let first_name = clean_name(tokens.pop()?);
    let type_name = tokens.pop()?.to_string();
    let modifiers: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();

    let mut names = vec![first_name];
    for piece in pieces {
        let name = clean_name(piece.trim().trim_end_matches(';').trim());
        if !name.is_empty() {
            names.push(name);
        }
    }

    let vars = names
        .into_iter()
        .filter(|n| !n.is_empty())
        .map(|name| VariableSymbol {
            name,
            modifiers: modifiers.clone(),
            type_name: type_name.clone(),
            doc: doc.clone(),
            line,
            scope,
        })
        .collect::<Vec<_>>();
    if vars.is_empty() { None } else { Some(vars) }
}

/// Match a function/event declaration line.
pub(crate) fn parse_function_line(raw: &str, line: u32) -> Option<FunctionSymbol> {
    let caps = FUNC_RE.captures(raw)?;
    let name = caps.name("name")?.as_str().to_string();
    let return_type = caps
        .name("ret")
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let params = parse_params(caps.name("params").map_or("", |m| m.as_str()), line);
    Some(FunctionSymbol {
        name,
        return_type,
        params,
        line,
        is_event: caps["kw"].eq_ignore_ascii_case("event"),
        is_const: caps.name("const").is_some(),
        doc: caps.name("doc").and_then(|m| strip_doc_markers(m.as_str())),
    })
}

/// Parse a signature's parameter list into parameter-scoped variables.
pub(crate) fn parse_params(list: &str, line: u32) -> Vec<VariableSymbol> {
    list.split(',')
        .filter_map(|piece| {
            let tokens: Vec<&str> = piece.split_whitespace().collect();
            let (&name_token, rest) = tokens.split_last()?;
            let name = clean_name(name_token);
            if name.is_empty() {
                return None;
            }
            let (type_name, modifiers) = match rest.split_last() {
                Some((&type_token, mods)) => (
                    type_token.to_string(),
                    mods.iter().map(|t| t.to_string()).collect(),
                ),
                None => (String::new(), Vec::new()),
            };
            Some(VariableSymbol {
                name,
                modifiers,
                type_name,
                doc: None,
                line,
                scope: VarScope::Parameter,
            })
        })
        .collect()
}

/// Split a trailing `//` or `/** ... */` doc comment off a declaration.
pub(crate) fn split_doc(rest: &str) -> (&str, Option<String>) {
    if let Some(i) = rest.find("//") {
        let doc = rest[i + 2..].trim();
        return (&rest[..i], (!doc.is_empty()).then(|| doc.to_string()));
    }
    if let Some(i) = rest.find("/**") {
        let doc = rest[i + 3..].trim().trim_end_matches("*/").trim();
        return (&rest[..i], (!doc.is_empty()).then(|| doc.to_string()));
    }
    (rest, None)
}

fn strip_doc_markers(raw: &str) -> Option<String> {
    let s = raw.trim();
    let s = if let Some(r) = s.strip_prefix("//") {
        r
    } else if let Some(r) = s.strip_prefix("/**") {
        r.trim_end_matches("*/")
    } else {
        s
    };
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Drop `<metadata>` annotations and stray separators from a declared name.
fn clean_name(raw: &str) -> String {
    METADATA_RE
        .replace_all(raw, "")
        .trim_matches(|c: char| c.is_whitespace() || c == ';' || c == ',')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(text: &str) -> ClassSymbol {
        parse_source(Path::new("Test.uc"), text).expect("parse")
    }

    #[test]
    fn parses_class_header() {
        let c = parse("class Enemy extends Pawn\n    placeable;\n");
        assert_eq!(c.name, "Enemy");
        assert_eq!(c.parent_name.as_deref(), Some("Pawn"));
        assert_eq!(c.line, 1);
        assert_eq!(c.file, PathBuf::from("Test.uc"));
        assert!(c.has_parsed());
    }

    #[test]
    fn rootless_header_has_no_parent() {
        let c = parse("class Object\n    native;\n");
        assert_eq!(c.name, "Object");
        assert!(c.parent_name.is_none());
    }

    #[test]
    fn missing_header_is_fatal() {
        let err = parse_source(Path::new("Broken.uc"), "var int Health;\n");
        assert!(matches!(err, Err(EngineError::MissingHeader { .. })));
    }

    #[test]
    fn parses_multi_name_var_with_doc() {
        let c = parse(
            "class Pawn extends Object;\nvar(Combat) config int Health, Armor; // hit points\n",
        );
        assert_eq!(c.variables.len(), 2);
        let health = c.find_variable("health").expect("health");
        assert_eq!(health.type_name, "int");
        assert_eq!(health.modifiers, vec!["config"]);
        assert_eq!(health.doc.as_deref(), Some("hit points"));
        assert_eq!(health.line, 2);
        assert!(c.find_variable("Armor").is_some());
    }

    #[test]
    fn metadata_tags_are_stripped_from_names() {
        let c = parse("class Pawn extends Object;\nvar int Health<DisplayName=HP>;\n");
        assert_eq!(c.variables[0].name, "Health");
    }

    #[test]
    fn parses_function_signature() {
        let c = parse(
            "class Enemy extends Pawn;\nsimulated function float TakeDamage(int Amount, optional Pawn Instigator) const; // apply damage\n",
        );
        let f = c.find_function("takedamage").expect("function");
        assert_eq!(f.return_type.as_deref(), Some("float"));
        assert!(!f.is_event);
        assert!(f.is_const);
        assert_eq!(f.doc.as_deref(), Some("apply damage"));
        assert_eq!(f.params.len(), 2);
        assert_eq!(f.params[0].name, "Amount");
        assert_eq!(f.params[0].type_name, "int");
        assert_eq!(f.params[1].name, "Instigator");
        assert_eq!(f.params[1].type_name, "Pawn");
        assert_eq!(f.params[1].modifiers, vec!["optional"]);
        assert_eq!(f.params[1].scope, VarScope::Parameter);
    }

    #[test]
    fn parses_event_without_return_type() {
        let c = parse("class Enemy extends Pawn;\nevent PostBeginPlay();\n");
        let f = c.find_function("PostBeginPlay").expect("event");
        assert!(f.is_event);
        assert!(f.return_type.is_none());
        assert!(f.params.is_empty());
    }

    #[test]
    fn commented_out_declarations_are_ignored() {
        let c = parse("class Pawn extends Object;\n// function int Hidden()\n");
        assert!(c.functions.is_empty());
    }

    #[test]
    fn malformed_lines_are_skipped_not_fatal() {
        let c = parse("class Pawn extends Object;\nvar ;\nvar int Health;\n");
        assert_eq!(c.variables.len(), 1);
    }

    #[test]
    fn stops_at_defaultproperties() {
        let c = parse(
            "class Pawn extends Object;\nvar int Health;\ndefaultproperties\nvar int NotReal;\n",
        );
        assert_eq!(c.variables.len(), 1);
    }

    #[test]
    fn local_lines_are_scoped_local() {
        let c = parse("class Pawn extends Object;\nfunction Tick()\nlocal float Delta;\n");
        let local = c.variables.iter().find(|v| v.is_named("Delta")).expect("local");
        assert_eq!(local.scope, VarScope::Local);
        // Locals never surface as members.
        assert!(c.find_variable("Delta").is_none());
    }
}
