//! `$ref` expansion for JSON Schema fragments.
//!
//! Request bodies of decision service operations reference `components.schemas` entries, often
//! through self- or mutually-referential chains. MCP clients want a single self-contained schema,
//! so every reference is inlined and references that would loop are cut.
//!
//! Expansion works on an owned copy: callers' values are never touched. The definitions table is
//! expanded once when a [`SchemaExpander`] is built (each entry starting with a history holding
//! only its own name), then every consumer schema is walked against the expanded table with its
//! own reference history.
//!
//! Cycle detection is name-based. When the name a `$ref` points to is already on the current
//! path, the `$ref` is dropped and, when the node is a property, the property itself is removed.

use serde_json::{Map, Value};

/// `components.schemas`-style table, keyed by definition name.
pub type DefinitionsTable = Map<String, Value>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Collapse `oneOf: [X, {type: null}]` into `X` and `type: [X, "null"]` into `type: X`.
    pub simplify_nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpansionDiagnostic {
    /// A `$ref` named a definition that does not exist. The reference was dropped.
    Unresolvable { reference: String },
    /// A `$ref` pointed back to a definition already on the current path. The reference was cut.
    Circular {
        reference: String,
        history: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub schema: Value,
    pub diagnostics: Vec<ExpansionDiagnostic>,
}

/// Expand `schema` against `definitions` with default options.
#[must_use]
pub fn expand(schema: &Value, definitions: &DefinitionsTable) -> Value {
    SchemaExpander::new(definitions, ExpandOptions::default())
        .expand(schema)
        .schema
}

/// A definitions table expanded once and reusable across the schemas of one document.
#[derive(Debug, Clone)]
pub struct SchemaExpander {
    definitions: DefinitionsTable,
    options: ExpandOptions,
    definition_diagnostics: Vec<ExpansionDiagnostic>,
}

impl SchemaExpander {
    #[must_use]
    pub fn new(definitions: &DefinitionsTable, options: ExpandOptions) -> Self {
        let mut table = definitions.clone();
        let mut definition_diagnostics = Vec::new();

        let names: Vec<String> = table.keys().cloned().collect();
        for name in names {
            let Some(mut definition) = table.get(&name).cloned() else {
                continue;
            };
            let diagnostics = {
                let mut walker = Walker::new(&table, options);
                walker.walk_value(&mut definition, &[name.clone()]);
                walker.diagnostics
            };
            definition_diagnostics.extend(diagnostics);
            table.insert(name, definition);
        }

        Self {
            definitions: table,
            options,
            definition_diagnostics,
        }
    }

    /// Diagnostics produced while expanding the definitions table itself.
    #[must_use]
    pub fn definition_diagnostics(&self) -> &[ExpansionDiagnostic] {
        &self.definition_diagnostics
    }

    #[must_use]
    pub fn definitions(&self) -> &DefinitionsTable {
        &self.definitions
    }

    #[must_use]
    pub fn expand(&self, schema: &Value) -> Expansion {
        let mut out = schema.clone();
        let mut walker = Walker::new(&self.definitions, self.options);
        walker.walk_value(&mut out, &[]);
        Expansion {
            schema: out,
            diagnostics: walker.diagnostics,
        }
    }
}

struct Walker<'a> {
    definitions: &'a DefinitionsTable,
    options: ExpandOptions,
    diagnostics: Vec<ExpansionDiagnostic>,
}

impl<'a> Walker<'a> {
    fn new(definitions: &'a DefinitionsTable, options: ExpandOptions) -> Self {
        Self {
            definitions,
            options,
            diagnostics: Vec::new(),
        }
    }

    /// Returns `true` when the node closed a reference cycle and should be pruned by its parent.
    fn walk_value(&mut self, node: &mut Value, history: &[String]) -> bool {
        match node {
            Value::Object(obj) => self.walk(obj, history),
            _ => false,
        }
    }

    fn walk(&mut self, node: &mut Map<String, Value>, history: &[String]) -> bool {
        if self.options.simplify_nullable {
            simplify_nullable(node);
        }

        let has_properties = node.get("properties").is_some_and(Value::is_object);
        if has_properties && node.get("type").and_then(Value::as_str) == Some("object") {
            if let Some(Value::Object(properties)) = node.get_mut("properties") {
                properties.retain(|_, property| !self.walk_value(property, history));
            }
            self.walk_nested(node, history);
            return false;
        }

        let Some(reference) = node.get("$ref").and_then(Value::as_str).map(str::to_string) else {
            self.walk_nested(node, history);
            return false;
        };
        node.remove("$ref");

        let name = reference_name(&reference);
        if history.iter().any(|seen| *seen == name) {
            tracing::debug!(
                reference = %reference,
                history = ?history,
                "circular schema reference cut"
            );
            self.diagnostics.push(ExpansionDiagnostic::Circular {
                reference: name,
                history: history.to_vec(),
            });
            return true;
        }

        let Some(definition) = self.definitions.get(&name) else {
            tracing::warn!(reference = %reference, "schema reference points to unknown definition");
            self.diagnostics
                .push(ExpansionDiagnostic::Unresolvable { reference: name });
            return false;
        };

        if let Value::Object(attributes) = definition {
            for (key, value) in attributes {
                node.insert(key.clone(), value.clone());
            }
            node.remove("$ref");
        }

        let mut extended = history.to_vec();
        extended.push(name);
        self.walk(node, &extended);
        false
    }

    /// Array items, map values and schema combinators share the parent's history.
    fn walk_nested(&mut self, node: &mut Map<String, Value>, history: &[String]) {
        for key in ["items", "additionalProperties"] {
            if let Some(child) = node.get_mut(key) {
                self.walk_value(child, history);
            }
        }
        for key in ["allOf", "anyOf", "oneOf"] {
            if let Some(Value::Array(alternatives)) = node.get_mut(key) {
                for alternative in alternatives {
                    self.walk_value(alternative, history);
                }
            }
        }
    }
}

/// Definition name of a `$ref`: the final JSON pointer segment, unescaped.
fn reference_name(reference: &str) -> String {
    let segment = reference.rsplit('/').next().unwrap_or(reference);
    segment.replace("~1", "/").replace("~0", "~")
}

fn is_null_schema(v: &Value) -> bool {
    v.get("type").and_then(Value::as_str) == Some("null")
}

fn simplify_nullable(node: &mut Map<String, Value>) {
    if let Some(Value::Array(types)) = node.get("type") {
        let non_null: Vec<&Value> = types.iter().filter(|t| t.as_str() != Some("null")).collect();
        if types.len() > 1 && non_null.len() == 1 {
            let only = non_null[0].clone();
            node.insert("type".to_string(), only);
        }
    }

    let Some(Value::Array(alternatives)) = node.get("oneOf") else {
        return;
    };
    let (nulls, rest): (Vec<&Value>, Vec<&Value>) =
        alternatives.iter().partition(|a| is_null_schema(a));
    if nulls.is_empty() || rest.len() != 1 {
        return;
    }
    let Some(Value::Object(keep)) = rest.first().map(|v| (*v).clone()) else {
        return;
    };

    node.remove("oneOf");
    for (key, value) in keep {
        node.entry(key).or_insert(value);
    }
}
