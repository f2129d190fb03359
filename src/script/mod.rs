//! Script metadata extraction.
//!
//! Scripts declare their metadata (title, author, context, ...) as plain
//! top-level assignments. `ScriptFileParser` parses a script once with
//! tree-sitter and reads those values back without executing any script code.
//!
//! This module is organized into focused sub-modules:
//! - encoding: decoding script bytes (coding cookies, byte-order marks)
//! - helpers: tree navigation and syntax error reporting
//! - literal: the restricted literal evaluator and `LiteralValue`
//! - strings: Python string literal decoding

pub(crate) mod encoding;
pub(crate) mod helpers;
pub mod literal;
pub(crate) mod strings;

pub use literal::LiteralValue;

use crate::errors::{ExtractionError, ScriptParseError};
use helpers::{describe_syntax_error, first_syntax_error, node_text};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use tree_sitter::{Node, Parser, Tree};

/// A parsed script, queryable for its top-level literal assignments
pub struct ScriptFileParser {
    source_id: String,
    source: String,
    tree: Tree,
}

impl std::fmt::Debug for ScriptFileParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptFileParser")
            .field("source_id", &self.source_id)
            .field("len", &self.source.len())
            .finish()
    }
}

impl ScriptFileParser {
    /// Read and parse a script file. The path becomes the source id.
    ///
    /// The bytes are decoded per the script's byte-order mark or `coding:`
    /// declaration, UTF-8 otherwise.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScriptParseError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| ScriptParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let source_id = path.to_string_lossy();
        let content = encoding::decode_source(&bytes, &source_id);
        Self::from_source(content, source_id)
    }

    /// Parse in-memory source text. `source_id` names the script in errors.
    pub fn from_source(
        source: impl Into<String>,
        source_id: impl Into<String>,
    ) -> Result<Self, ScriptParseError> {
        let source = source.into();
        let source_id = source_id.into();

        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| ScriptParseError::Parser {
                source_id: source_id.clone(),
                message: e.to_string(),
            })?;

        let tree = parser
            .parse(&source, None)
            .ok_or_else(|| ScriptParseError::Parser {
                source_id: source_id.clone(),
                message: "parser produced no tree".to_string(),
            })?;

        if let Some(error_node) = first_syntax_error(tree.root_node()) {
            let position = error_node.start_position();
            let message = describe_syntax_error(&error_node, &source);
            warn!(
                "Rejecting script {} with syntax error at {}:{}: {}",
                source_id,
                position.row + 1,
                position.column + 1,
                message
            );
            return Err(ScriptParseError::Syntax {
                source_id,
                line: position.row + 1,
                column: position.column + 1,
                message,
            });
        }

        debug!("Parsed script {} ({} bytes)", source_id, source.len());

        Ok(Self {
            source_id,
            source,
            tree,
        })
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Literal value of the last top-level `name = <literal>` assignment.
    ///
    /// Returns `Ok(None)` when no top-level assignment targets `name`.
    /// Assignments inside functions, classes or control-flow blocks are ignored.
    pub fn extract_param(&self, name: &str) -> Result<Option<LiteralValue>, ExtractionError> {
        let Some(value_node) = self.find_assigned_value(name) else {
            return Ok(None);
        };

        let value = literal::eval_literal(value_node, &self.source).map_err(|cause| {
            ExtractionError {
                name: name.to_string(),
                source_id: self.source_id.clone(),
                cause,
            }
        })?;

        debug!("{}: {} = {}", self.source_id, name, value);
        Ok(Some(value))
    }

    /// Extract several parameters at once. Absent names are left out of the result.
    pub fn extract_params<I, S>(&self, names: I) -> Result<ScriptMetadata, ExtractionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut metadata = ScriptMetadata::default();
        for name in names {
            let name = name.as_ref();
            if let Some(value) = self.extract_param(name)? {
                metadata.params.insert(name.to_string(), value);
            }
        }
        Ok(metadata)
    }

    /// Right-hand side of the last qualifying top-level assignment
    fn find_assigned_value(&self, name: &str) -> Option<Node<'_>> {
        let root = self.tree.root_node();
        let mut found = None;

        let mut cursor = root.walk();
        for statement in root.named_children(&mut cursor) {
            // Assignments only ever appear wrapped in an expression statement
            if statement.kind() != "expression_statement" {
                continue;
            }
            let mut inner = statement.walk();
            for child in statement.named_children(&mut inner) {
                if child.kind() != "assignment" {
                    continue;
                }
                if let Some(value) = assigned_value_for(child, name, &self.source) {
                    found = Some(value);
                }
            }
        }

        found
    }
}

/// Value node of an assignment binding `name`, following chains like `a = b = 1`.
///
/// Annotated assignments never qualify, and only plain identifiers count as targets.
fn assigned_value_for<'tree>(assignment: Node<'tree>, name: &str, source: &str) -> Option<Node<'tree>> {
    let mut binds_name = false;
    let mut current = assignment;

    loop {
        if current.child_by_field_name("type").is_some() {
            return None;
        }
        let left = current.child_by_field_name("left")?;
        let right = current.child_by_field_name("right")?;

        if left.kind() == "identifier" && node_text(&left, source) == name {
            binds_name = true;
        }

        if right.kind() == "assignment" {
            current = right;
        } else {
            return binds_name.then_some(right);
        }
    }
}

/// Parameters collected by `ScriptFileParser::extract_params`, ordered by name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScriptMetadata {
    params: BTreeMap<String, LiteralValue>,
}

impl ScriptMetadata {
    pub fn get(&self, name: &str) -> Option<&LiteralValue> {
        self.params.get(name)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LiteralValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// JSON object form, for callers caching metadata alongside a fingerprint
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LiteralError;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn parse(source: &str) -> ScriptFileParser {
        ScriptFileParser::from_source(source, "test.py").unwrap()
    }

    fn sample_path() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_samples/script.py")
    }

    #[test]
    fn test_single_assignment() {
        let parser = parse("x = 5\n");
        assert_eq!(parser.extract_param("x").unwrap(), Some(LiteralValue::Int(5)));
    }

    #[test]
    fn test_last_assignment_wins() {
        let parser = parse("x = 1\ny = 'other'\nx = 2\n");
        assert_eq!(parser.extract_param("x").unwrap(), Some(LiteralValue::Int(2)));
    }

    #[test]
    fn test_later_literal_overrides_earlier_call() {
        let parser = parse("x = compute()\nx = 'fixed'\n");
        assert_eq!(
            parser.extract_param("x").unwrap(),
            Some(LiteralValue::Str("fixed".into()))
        );
    }

    #[test]
    fn test_nested_assignments_are_ignored() {
        let source = r#"
def configure():
    x = 1

class Settings:
    x = 2

if True:
    x = 3

for i in range(3):
    x = 4

with open('f') as f:
    x = 5
"#;
        let parser = parse(source);
        assert_eq!(parser.extract_param("x").unwrap(), None);
    }

    #[test]
    fn test_missing_name_is_not_an_error() {
        let parser = parse("y = 1\n");
        assert_eq!(parser.extract_param("x").unwrap(), None);
        assert_eq!(parse("").extract_param("x").unwrap(), None);
    }

    #[test]
    fn test_call_is_extraction_error() {
        let parser = parse("x = some_function()\ny = 3\n");
        let err = parser.extract_param("x").unwrap_err();
        assert_eq!(err.name, "x");
        assert_eq!(err.source_id, "test.py");
        assert_eq!(
            err.cause,
            LiteralError::NotLiteral {
                kind: "call".to_string()
            }
        );
        // The tree is still usable for other queries
        assert_eq!(parser.extract_param("y").unwrap(), Some(LiteralValue::Int(3)));
    }

    #[test]
    fn test_non_literal_expressions_rejected() {
        for source in [
            "x = other",
            "x = os.path",
            "x = 1 + 2",
            "x = not True",
            "x = ~1",
            "x = -y",
            "x = [i for i in y]",
            "x = lambda: 1",
            "x = f'{y}'",
            "x = [*y]",
            "x = {**y}",
            "x = 1j",
            "x = items[0]",
        ] {
            let parser = parse(source);
            assert!(
                parser.extract_param("x").is_err(),
                "expected extraction error for {:?}",
                source
            );
        }
    }

    #[test]
    fn test_syntax_error_fails_construction() {
        let err = ScriptFileParser::from_source("x = (1, 2\ny = 3\n", "broken.py").unwrap_err();
        match err {
            ScriptParseError::Syntax { source_id, line, .. } => {
                assert_eq!(source_id, "broken.py");
                assert!(line >= 1);
            }
            other => panic!("expected syntax error, got {:?}", other),
        }

        assert!(ScriptFileParser::from_source("def broken(:\n    pass\n", "b.py").is_err());
    }

    #[test]
    fn test_literal_kinds() {
        let source = r#"
i = -42
f = 3.5
s = 'text'
b = b'raw'
t = True
n = None
l = [1, 'two', 3.0]
tup = (1,)
bare = 1, 2
empty = ()
st = {1, 2, 1}
d = {'a': 1, 'b': [None], 'a': 3}
p = ('paren')
joined = 'abc' "def"
"#;
        let parser = parse(source);
        let get = |name: &str| parser.extract_param(name).unwrap().unwrap();

        assert_eq!(get("i"), LiteralValue::Int(-42));
        assert_eq!(get("f"), LiteralValue::Float(3.5));
        assert_eq!(get("s"), LiteralValue::Str("text".into()));
        assert_eq!(get("b"), LiteralValue::Bytes(b"raw".to_vec()));
        assert_eq!(get("t"), LiteralValue::Bool(true));
        assert_eq!(get("n"), LiteralValue::None);
        assert_eq!(
            get("l"),
            LiteralValue::List(vec![
                LiteralValue::Int(1),
                LiteralValue::Str("two".into()),
                LiteralValue::Float(3.0),
            ])
        );
        assert_eq!(get("tup"), LiteralValue::Tuple(vec![LiteralValue::Int(1)]));
        assert_eq!(
            get("bare"),
            LiteralValue::Tuple(vec![LiteralValue::Int(1), LiteralValue::Int(2)])
        );
        assert_eq!(get("empty"), LiteralValue::Tuple(vec![]));
        assert_eq!(
            get("st"),
            LiteralValue::Set(vec![LiteralValue::Int(1), LiteralValue::Int(2)])
        );
        assert_eq!(
            get("d"),
            LiteralValue::Dict(vec![
                (LiteralValue::Str("a".into()), LiteralValue::Int(3)),
                (
                    LiteralValue::Str("b".into()),
                    LiteralValue::List(vec![LiteralValue::None])
                ),
            ])
        );
        assert_eq!(get("p"), LiteralValue::Str("paren".into()));
        assert_eq!(get("joined"), LiteralValue::Str("abcdef".into()));
    }

    #[test]
    fn test_sets_and_dicts_merge_equal_numbers() {
        let source = "s = {1, True, 1.0, 2}\nd = {1: 'a', True: 'b', 2.0: 'c', 2: 'd'}\nbad = {[1]: 2}\n";
        let parser = parse(source);

        assert_eq!(
            parser.extract_param("s").unwrap(),
            Some(LiteralValue::Set(vec![LiteralValue::Int(1), LiteralValue::Int(2)]))
        );
        assert_eq!(
            parser.extract_param("d").unwrap(),
            Some(LiteralValue::Dict(vec![
                (LiteralValue::Int(1), LiteralValue::Str("b".into())),
                (LiteralValue::Float(2.0), LiteralValue::Str("d".into())),
            ]))
        );
        assert_eq!(
            parser.extract_param("bad").unwrap_err().cause,
            LiteralError::Unhashable {
                kind: "list".to_string()
            }
        );
    }

    #[test]
    fn test_target_shapes() {
        let source = "a = b = 'chained'\nc, d = 1, 2\nobj.attr = 3\ne: int = 4\nf = 5\nf += 1\n";
        let parser = parse(source);

        assert_eq!(
            parser.extract_param("a").unwrap(),
            Some(LiteralValue::Str("chained".into()))
        );
        assert_eq!(
            parser.extract_param("b").unwrap(),
            Some(LiteralValue::Str("chained".into()))
        );
        assert_eq!(parser.extract_param("c").unwrap(), None);
        assert_eq!(parser.extract_param("attr").unwrap(), None);
        assert_eq!(parser.extract_param("e").unwrap(), None);
        assert_eq!(parser.extract_param("f").unwrap(), Some(LiteralValue::Int(5)));
    }

    #[test]
    fn test_sample_script_metadata() {
        let parser = ScriptFileParser::from_file(sample_path()).unwrap();

        assert_eq!(
            parser.extract_param("__title__").unwrap(),
            Some(LiteralValue::Str("Renumber\nSheets".into()))
        );
        assert_eq!(
            parser.extract_param("__helpurl__").unwrap(),
            Some(LiteralValue::Str(
                "https://www.notion.so/pyrevitlabs/Renumber-Sheets".into()
            ))
        );
        // The assignment under `if __name__` does not count
        assert_eq!(
            parser.extract_param("__beta__").unwrap(),
            Some(LiteralValue::Bool(false))
        );
        assert_eq!(
            parser.extract_param("__version__").unwrap(),
            Some(LiteralValue::Float(2.0))
        );
        assert!(parser.extract_param("selection").is_err());
    }

    #[test]
    fn test_extract_params_collects_found_values() {
        let parser = ScriptFileParser::from_file(sample_path()).unwrap();
        let metadata = parser
            .extract_params(["__author__", "__min_revit_ver__", "__shortcuts__", "__missing__"])
            .unwrap();

        assert_eq!(metadata.len(), 3);
        assert!(metadata.get("__missing__").is_none());
        assert_eq!(
            metadata.to_json().unwrap(),
            serde_json::json!({
                "__author__": "Ehsan Iran-Nejad",
                "__min_revit_ver__": 2017,
                "__shortcuts__": [["renumber", "RN"], ["reset", null]],
            })
        );

        assert!(parser.extract_params(["__author__", "selection"]).is_err());
    }

    #[test]
    fn test_from_file_errors_and_bom() {
        let temp_dir = TempDir::new().unwrap();

        let missing = temp_dir.path().join("missing.py");
        assert!(matches!(
            ScriptFileParser::from_file(&missing),
            Err(ScriptParseError::Io { .. })
        ));

        let with_bom = temp_dir.path().join("bom.py");
        fs::write(&with_bom, "\u{feff}__author__ = 'me'\n").unwrap();
        let parser = ScriptFileParser::from_file(&with_bom).unwrap();
        assert_eq!(parser.source_id(), with_bom.to_string_lossy());
        assert_eq!(
            parser.extract_param("__author__").unwrap(),
            Some(LiteralValue::Str("me".into()))
        );
    }

    #[test]
    fn test_from_file_honours_coding_declaration() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("script.py");
        fs::write(
            &path,
            b"# -*- coding: cp1252 -*-\n__author__ = 'Jos\xe9'\n__title__ = 'Tool'\n",
        )
        .unwrap();

        let parser = ScriptFileParser::from_file(&path).unwrap();
        assert_eq!(
            parser.extract_param("__author__").unwrap(),
            Some(LiteralValue::Str("Jos\u{e9}".into()))
        );
        assert_eq!(
            parser.extract_param("__title__").unwrap(),
            Some(LiteralValue::Str("Tool".into()))
        );
    }

    #[test]
    fn test_from_file_undeclared_bytes_are_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("script.py");
        fs::write(&path, b"__author__ = 'Jos\xe9'\n__title__ = 'Tool'\n").unwrap();

        let parser = ScriptFileParser::from_file(&path).unwrap();
        assert_eq!(
            parser.extract_param("__author__").unwrap(),
            Some(LiteralValue::Str("Jos\u{fffd}".into()))
        );
        assert_eq!(
            parser.extract_param("__title__").unwrap(),
            Some(LiteralValue::Str("Tool".into()))
        );
    }
}
