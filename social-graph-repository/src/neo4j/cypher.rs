//! Cypher statement builder.
//!
//! Turns typed graph operations into parameterised Cypher. Node identifiers and
//! property values always travel as parameters; labels and relationship types
//! come from closed enums, and property keys are validated before being
//! spliced into the statement text.

use crate::errors::GraphStoreError;
use crate::types::{
    validate_property_key, EdgePattern, EdgeType, Endpoint, NodeLabel, NodeQuery, NodeRef,
    Properties, PropertyValue,
};

/// Marker property set on creation so a MERGE can report whether it created the node.
pub(crate) const CREATED_MARKER: &str = "__created";

/// A Cypher statement and its parameters, independent of the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Statement {
    pub text: String,
    pub params: Vec<(String, PropertyValue)>,
}

impl Statement {
    fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    fn param(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.params.push((key.to_string(), value.into()));
        self
    }

    fn params(mut self, params: Vec<(String, PropertyValue)>) -> Self {
        self.params.extend(params);
        self
    }
}

/// Whether an edge write may produce duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EdgeWrite {
    Create,
    Merge,
}

fn node_pattern(var: &str, label: NodeLabel, id_param: &str) -> String {
    format!("({var}:{label} {{id: ${id_param}}})")
}

fn endpoint_pattern(
    var: &str,
    endpoint: &Endpoint,
    params: &mut Vec<(String, PropertyValue)>,
) -> String {
    match endpoint {
        Endpoint::Any => format!("({var})"),
        Endpoint::Label(label) => format!("({var}:{label})"),
        Endpoint::Node(node) => {
            let param = format!("{var}_id");
            params.push((param.clone(), PropertyValue::text(node.id.clone())));
            node_pattern(var, node.label, &param)
        }
    }
}

fn match_edge(pattern: &EdgePattern) -> (String, Vec<(String, PropertyValue)>) {
    let mut params = Vec::new();
    let from = endpoint_pattern("a", &pattern.from, &mut params);
    let to = endpoint_pattern("b", &pattern.to, &mut params);
    let rel = match pattern.edge_type {
        Some(edge_type) => format!("[r:{edge_type}]"),
        None => "[r]".to_string(),
    };
    (format!("MATCH {from}-{rel}->{to}"), params)
}

/// `MERGE` a node, setting `properties` only on creation, and report whether it was created.
pub(crate) fn merge_node(
    label: NodeLabel,
    id: &str,
    properties: &Properties,
) -> Result<Statement, GraphStoreError> {
    let mut assignments = vec![format!("n.{CREATED_MARKER} = true")];
    let mut params = Vec::new();
    for (key, value) in properties {
        validate_property_key(key)?;
        assignments.push(format!("n.{key} = $p_{key}"));
        params.push((format!("p_{key}"), value.clone()));
    }

    let text = format!(
        "MERGE {node} ON CREATE SET {assignments} \
         WITH n, n.{CREATED_MARKER} IS NOT NULL AS created \
         REMOVE n.{CREATED_MARKER} \
         RETURN n, created",
        node = node_pattern("n", label, "id"),
        assignments = assignments.join(", "),
    );

    Ok(Statement::new(text).param("id", id).params(params))
}

pub(crate) fn get_node(node: &NodeRef) -> Statement {
    Statement::new(format!(
        "MATCH {} RETURN n LIMIT 1",
        node_pattern("n", node.label, "id")
    ))
    .param("id", node.id.as_str())
}

pub(crate) fn exists(node: &NodeRef) -> Statement {
    Statement::new(format!(
        "MATCH {} RETURN count(n) AS found",
        node_pattern("n", node.label, "id")
    ))
    .param("id", node.id.as_str())
}

pub(crate) fn set_property(
    node: &NodeRef,
    key: &str,
    value: PropertyValue,
) -> Result<Statement, GraphStoreError> {
    validate_property_key(key)?;
    Ok(Statement::new(format!(
        "MATCH {} SET n.{key} = $value RETURN count(n) AS updated",
        node_pattern("n", node.label, "id")
    ))
    .param("id", node.id.as_str())
    .param("value", value))
}

/// Single-statement counter adjustment floored at zero.
pub(crate) fn adjust_counter(
    node: &NodeRef,
    key: &str,
    delta: i64,
) -> Result<Statement, GraphStoreError> {
    validate_property_key(key)?;
    Ok(Statement::new(format!(
        "MATCH {node} \
         SET n.{key} = CASE WHEN coalesce(n.{key}, 0) + $delta < 0 THEN 0 \
         ELSE coalesce(n.{key}, 0) + $delta END \
         RETURN n.{key} AS value",
        node = node_pattern("n", node.label, "id"),
    ))
    .param("id", node.id.as_str())
    .param("delta", delta))
}

pub(crate) fn write_edge(
    from: &NodeRef,
    edge_type: EdgeType,
    to: &NodeRef,
    mode: EdgeWrite,
) -> Statement {
    let from_pattern = node_pattern("a", from.label, "from_id");
    let to_pattern = node_pattern("b", to.label, "to_id");
    let text = match mode {
        EdgeWrite::Create => format!(
            "MATCH {from_pattern} MATCH {to_pattern} CREATE (a)-[:{edge_type}]->(b) \
             RETURN count(*) AS written, count(*) AS created"
        ),
        EdgeWrite::Merge => format!(
            "MATCH {from_pattern} MATCH {to_pattern} MERGE (a)-[r:{edge_type}]->(b) \
             ON CREATE SET r.{CREATED_MARKER} = true \
             WITH r, r.{CREATED_MARKER} IS NOT NULL AS fresh \
             REMOVE r.{CREATED_MARKER} \
             RETURN count(r) AS written, sum(CASE WHEN fresh THEN 1 ELSE 0 END) AS created"
        ),
    };
    Statement::new(text)
        .param("from_id", from.id.as_str())
        .param("to_id", to.id.as_str())
}

pub(crate) fn delete_edges(pattern: &EdgePattern) -> Result<Statement, GraphStoreError> {
    if pattern.is_unbounded() {
        return Err(GraphStoreError::invalid_pattern(
            "refusing to delete with an unbounded edge pattern",
        ));
    }
    let (matcher, params) = match_edge(pattern);
    Ok(Statement::new(format!("{matcher} DELETE r RETURN count(r) AS deleted")).params(params))
}

/// Delete a node only when it has no relationships; returns its degree.
pub(crate) fn delete_node(node: &NodeRef) -> Statement {
    Statement::new(format!(
        "MATCH {} OPTIONAL MATCH (n)-[r]-() \
         WITH n, count(r) AS degree \
         FOREACH (_ IN CASE WHEN degree = 0 THEN [1] ELSE [] END | DELETE n) \
         RETURN degree",
        node_pattern("n", node.label, "id")
    ))
    .param("id", node.id.as_str())
}

pub(crate) fn query_edges(pattern: &EdgePattern) -> Statement {
    let (matcher, params) = match_edge(pattern);
    Statement::new(format!(
        "{matcher} RETURN a.id AS from_id, head(labels(a)) AS from_label, \
         type(r) AS edge_type, b.id AS to_id, head(labels(b)) AS to_label"
    ))
    .params(params)
}

pub(crate) fn count_edges(pattern: &EdgePattern) -> Statement {
    let (matcher, params) = match_edge(pattern);
    Statement::new(format!("{matcher} RETURN count(r) AS total")).params(params)
}

pub(crate) fn query_nodes(query: &NodeQuery) -> Result<Statement, GraphStoreError> {
    let label = query.label;
    match &query.filter {
        None => Ok(Statement::new(format!(
            "MATCH (n:{label}) RETURN n ORDER BY n.id"
        ))),
        Some((key, value)) => {
            if key != "id" {
                validate_property_key(key)?;
            }
            Ok(Statement::new(format!(
                "MATCH (n:{label}) WHERE n.{key} = $filter RETURN n ORDER BY n.id"
            ))
            .param("filter", value.clone()))
        }
    }
}

/// Unique-id constraints, one per label.
pub(crate) fn id_constraints() -> Vec<Statement> {
    NodeLabel::all()
        .iter()
        .map(|label| {
            Statement::new(format!(
                "CREATE CONSTRAINT {name}_id_unique IF NOT EXISTS \
                 FOR (n:{label}) REQUIRE n.id IS UNIQUE",
                name = label.as_str().to_lowercase(),
            ))
        })
        .collect()
}
