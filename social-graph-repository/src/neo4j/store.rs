use async_trait::async_trait;
use neo4rs::{Graph, Neo4jClientErrorKind, Neo4jErrorKind, Neo4jSecurityErrorKind, Query, Row};
use std::future::Future;
use tracing::{debug, info, warn};

use crate::config::Neo4jConfig;
use crate::errors::GraphStoreError;
use crate::interfaces::GraphStore;
use crate::neo4j::cypher::{self, EdgeWrite, Statement, CREATED_MARKER};
use crate::types::{
    Edge, EdgeMerge, EdgePattern, EdgeType, MergeOutcome, Node, NodeLabel, NodeQuery, NodeRef,
    Properties, PropertyValue,
};

/// Neo4j graph store.
///
/// Every call is a single auto-committed Cypher statement bounded by the
/// configured statement timeout. Driver failures are sorted by `classify`:
/// connection loss and transient server errors become
/// `GraphStoreError::Unavailable`, rejected statements `GraphStoreError::Query`
/// and unreadable results `GraphStoreError::Decode`. Elapsed timeouts are
/// `GraphStoreError::Timeout`.
///
/// # Example
///
/// ```ignore
/// use social_graph_repository::{Neo4jConfig, Neo4jGraphStore};
///
/// let config = Neo4jConfig::new("bolt://localhost:7687").with_credentials("neo4j", "password");
/// let store = Neo4jGraphStore::connect(config)?;
/// store.ensure_constraints().await?;
/// ```
pub struct Neo4jGraphStore {
    graph: Graph,
    config: Neo4jConfig,
}

impl Neo4jGraphStore {
    /// Create a store connected to the configured Bolt endpoint.
    pub fn connect(config: Neo4jConfig) -> Result<Self, GraphStoreError> {
        info!(uri = %config.uri, "Connecting to Neo4j");
        let graph = Graph::new(&config.uri, &config.user, &config.password)
            .map_err(|e| GraphStoreError::unavailable(format!("Failed to connect to Neo4j: {e}")))?;

        Ok(Self { graph, config })
    }

    /// Create the unique-id constraint for every label.
    ///
    /// Failures are logged and skipped; a constraint that already exists in a
    /// different form should not prevent startup.
    pub async fn ensure_constraints(&self) -> Result<(), GraphStoreError> {
        for statement in cypher::id_constraints() {
            match self.run(statement.clone()).await {
                Ok(()) => info!(statement = %statement.text, "Ensured constraint"),
                Err(e) if e.is_connectivity() => return Err(e),
                Err(e) => warn!(error = %e, statement = %statement.text, "Failed to create constraint"),
            }
        }
        Ok(())
    }

    /// Check the connection with a trivial round-trip.
    pub async fn ping(&self) -> Result<(), GraphStoreError> {
        let rows = self.fetch(cypher_ping()).await?;
        debug!(rows = rows.len(), "Neo4j ping");
        Ok(())
    }

    fn to_query(statement: Statement) -> Query {
        let mut query = Query::new(statement.text);
        for (key, value) in statement.params {
            query = match value {
                PropertyValue::Integer(i) => query.param(&key, i),
                PropertyValue::Text(s) => query.param(&key, s),
            };
        }
        query
    }

    async fn with_timeout<T, F>(&self, fut: F) -> Result<T, GraphStoreError>
    where
        F: Future<Output = Result<T, GraphStoreError>>,
    {
        tokio::time::timeout(self.config.statement_timeout, fut)
            .await
            .map_err(|_| {
                GraphStoreError::timeout(format!(
                    "statement exceeded {}ms",
                    self.config.statement_timeout.as_millis()
                ))
            })?
    }

    async fn run(&self, statement: Statement) -> Result<(), GraphStoreError> {
        debug!(statement = %statement.text, "Running statement");
        let query = Self::to_query(statement);
        self.with_timeout(async {
            self.graph.run(query).await.map_err(classify)
        })
        .await
    }

    async fn fetch(&self, statement: Statement) -> Result<Vec<Row>, GraphStoreError> {
        debug!(statement = %statement.text, "Executing statement");
        let query = Self::to_query(statement);
        self.with_timeout(async {
            let mut stream = self.graph.execute(query).await.map_err(classify)?;
            let mut rows = Vec::new();
            while let Some(row) = stream.next().await.map_err(classify)? {
                rows.push(row);
            }
            Ok(rows)
        })
        .await
    }

    async fn fetch_integer(&self, statement: Statement, column: &str) -> Result<i64, GraphStoreError> {
        let rows = self.fetch(statement).await?;
        match rows.first() {
            Some(row) => get_column::<i64>(row, column),
            None => Ok(0),
        }
    }
}

/// Map a driver error onto the store error taxonomy.
///
/// Only failures a retry can fix are reported as `Unavailable`.
fn classify(error: neo4rs::Error) -> GraphStoreError {
    use neo4rs::Error;

    match error {
        Error::Neo4j(server) => {
            let detail = format!("{}: {}", server.code(), server.message());
            classify_server_error(server.kind(), detail)
        }
        Error::IOError { .. }
        | Error::ConnectionError
        | Error::ConnectionTimedOut
        | Error::ServerUnavailableError(_)
        | Error::RoutingTableError(_)
        | Error::RoutingTableRefreshFailed(_)
        | Error::RequestIgnoredError
        | Error::AuthenticationError(_) => GraphStoreError::unavailable(error.to_string()),
        Error::DeserializationError(_)
        | Error::ConversionError
        | Error::UnknownType(_)
        | Error::InvalidTypeMarker(_)
        | Error::NoMoreRows
        | Error::NotSingleResult => GraphStoreError::decode(error.to_string()),
        other => GraphStoreError::query(other.to_string()),
    }
}

fn classify_server_error(kind: Neo4jErrorKind, detail: String) -> GraphStoreError {
    match kind {
        Neo4jErrorKind::Transient
        | Neo4jErrorKind::Client(
            Neo4jClientErrorKind::SessionExpired
            | Neo4jClientErrorKind::Security(Neo4jSecurityErrorKind::AuthorizationExpired),
        ) => GraphStoreError::unavailable(detail),
        Neo4jErrorKind::Client(_) | Neo4jErrorKind::Database | Neo4jErrorKind::Unknown => {
            GraphStoreError::query(detail)
        }
    }
}

fn cypher_ping() -> Statement {
    Statement {
        text: "RETURN 1 AS ok".to_string(),
        params: Vec::new(),
    }
}

fn get_column<T>(row: &Row, column: &str) -> Result<T, GraphStoreError>
where
    T: for<'de> serde::Deserialize<'de>,
{
    row.get::<T>(column)
        .map_err(|e| GraphStoreError::decode(format!("column '{column}': {e}")))
}

fn decode_node(row: &Row, label: NodeLabel) -> Result<Node, GraphStoreError> {
    let raw: neo4rs::Node = get_column(row, "n")?;
    let id: String = raw
        .get("id")
        .map_err(|e| GraphStoreError::decode(format!("node without id: {e}")))?;

    let mut properties = Properties::new();
    for key in raw.keys() {
        if key == "id" || key == CREATED_MARKER {
            continue;
        }
        let value: PropertyValue = raw
            .get(key)
            .map_err(|e| GraphStoreError::decode(format!("property '{key}': {e}")))?;
        properties.insert(key.to_string(), value);
    }

    Ok(Node {
        node: NodeRef::new(label, id),
        properties,
    })
}

fn decode_edge(row: &Row) -> Result<Edge, GraphStoreError> {
    let from_label: String = get_column(row, "from_label")?;
    let edge_type: String = get_column(row, "edge_type")?;
    let to_label: String = get_column(row, "to_label")?;

    Ok(Edge::new(
        NodeRef::new(from_label.parse()?, get_column::<String>(row, "from_id")?),
        edge_type.parse::<EdgeType>()?,
        NodeRef::new(to_label.parse()?, get_column::<String>(row, "to_id")?),
    ))
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    async fn create_node(
        &self,
        label: NodeLabel,
        id: &str,
        properties: Properties,
    ) -> Result<Node, GraphStoreError> {
        let outcome = self.merge_node(label, id, properties).await?;
        if !outcome.created {
            return Err(GraphStoreError::DuplicateNode(outcome.node.node.to_string()));
        }
        Ok(outcome.node)
    }

    async fn merge_node(
        &self,
        label: NodeLabel,
        id: &str,
        on_create: Properties,
    ) -> Result<MergeOutcome, GraphStoreError> {
        let rows = self.fetch(cypher::merge_node(label, id, &on_create)?).await?;
        let row = rows
            .first()
            .ok_or_else(|| GraphStoreError::decode("MERGE returned no row"))?;

        Ok(MergeOutcome {
            node: decode_node(row, label)?,
            created: get_column::<bool>(row, "created")?,
        })
    }

    async fn get_node(&self, node: &NodeRef) -> Result<Option<Node>, GraphStoreError> {
        let rows = self.fetch(cypher::get_node(node)).await?;
        rows.first()
            .map(|row| decode_node(row, node.label))
            .transpose()
    }

    async fn exists(&self, node: &NodeRef) -> Result<bool, GraphStoreError> {
        Ok(self.fetch_integer(cypher::exists(node), "found").await? > 0)
    }

    async fn set_property(
        &self,
        node: &NodeRef,
        key: &str,
        value: PropertyValue,
    ) -> Result<bool, GraphStoreError> {
        let statement = cypher::set_property(node, key, value)?;
        Ok(self.fetch_integer(statement, "updated").await? > 0)
    }

    async fn adjust_counter(
        &self,
        node: &NodeRef,
        key: &str,
        delta: i64,
    ) -> Result<Option<i64>, GraphStoreError> {
        let rows = self.fetch(cypher::adjust_counter(node, key, delta)?).await?;
        rows.first()
            .map(|row| get_column::<i64>(row, "value"))
            .transpose()
    }

    async fn create_edge(
        &self,
        from: &NodeRef,
        edge_type: EdgeType,
        to: &NodeRef,
    ) -> Result<bool, GraphStoreError> {
        let statement = cypher::write_edge(from, edge_type, to, EdgeWrite::Create);
        Ok(self.fetch_integer(statement, "written").await? > 0)
    }

    async fn merge_edge(
        &self,
        from: &NodeRef,
        edge_type: EdgeType,
        to: &NodeRef,
    ) -> Result<EdgeMerge, GraphStoreError> {
        let rows = self
            .fetch(cypher::write_edge(from, edge_type, to, EdgeWrite::Merge))
            .await?;
        let Some(row) = rows.first() else {
            return Ok(EdgeMerge::MissingEndpoint);
        };

        if get_column::<i64>(row, "written")? == 0 {
            Ok(EdgeMerge::MissingEndpoint)
        } else if get_column::<i64>(row, "created")? > 0 {
            Ok(EdgeMerge::Created)
        } else {
            Ok(EdgeMerge::Existed)
        }
    }

    async fn delete_edges(&self, pattern: &EdgePattern) -> Result<usize, GraphStoreError> {
        let deleted = self
            .fetch_integer(cypher::delete_edges(pattern)?, "deleted")
            .await?;
        Ok(deleted.max(0) as usize)
    }

    async fn delete_node(&self, node: &NodeRef) -> Result<bool, GraphStoreError> {
        let rows = self.fetch(cypher::delete_node(node)).await?;
        match rows.first() {
            None => Ok(false),
            Some(row) => {
                let degree = get_column::<i64>(row, "degree")?;
                if degree > 0 {
                    Err(GraphStoreError::NodeHasEdges(node.to_string()))
                } else {
                    Ok(true)
                }
            }
        }
    }

    async fn query_edges(&self, pattern: &EdgePattern) -> Result<Vec<Edge>, GraphStoreError> {
        let rows = self.fetch(cypher::query_edges(pattern)).await?;
        rows.iter().map(decode_edge).collect()
    }

    async fn query_nodes(&self, query: &NodeQuery) -> Result<Vec<Node>, GraphStoreError> {
        let rows = self.fetch(cypher::query_nodes(query)?).await?;
        rows.iter().map(|row| decode_node(row, query.label)).collect()
    }

    async fn count_edges(&self, pattern: &EdgePattern) -> Result<u64, GraphStoreError> {
        let total = self
            .fetch_integer(cypher::count_edges(pattern), "total")
            .await?;
        Ok(total.max(0) as u64)
    }
}

impl std::fmt::Debug for Neo4jGraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Neo4jGraphStore")
            .field("uri", &self.config.uri)
            .field("statement_timeout", &self.config.statement_timeout)
            .finish_non_exhaustive()
    }
}
