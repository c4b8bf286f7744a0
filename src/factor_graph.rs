/*!
Directed factor graphs built from declarative model descriptions.

A model description is a two-element JSON array `[functions, graph]`. The first element is ignored;
`graph` holds

- `V`: the variable names,
- `P`: for each variable its prior descriptor, whose distribution tag sits at `P[v][1][0]`
  (e.g. `["sample*", ["normal", 0, 1]]` has tag `normal`),
- `A`: for each variable the variables that depend on it,
- `Y`: the observed variables, as an array of names or an object keyed by name.

Every variable `v` becomes a box-shaped factor node `v_factor` labelled `(tag ...)` feeding a
circular variable node `v`, filled gray when observed. A dependency `a → b` becomes an edge from
`a` into `b_factor`.

# Examples

```rust
use infer_viz::factor_graph::{build_factor_graph, FactorGraphModel};

let raw = r#"[{}, {"V": ["a", "b"],
                   "P": {"a": ["sample*", ["normal", 0, 1]], "b": ["observe*", ["normal", "a", 1]]},
                   "A": {"a": ["b"]},
                   "Y": {"b": 2.5}}]"#;
let model = FactorGraphModel::from_json(raw)?;
let graph = build_factor_graph(&model);
assert_eq!(graph.node_count(), 4);
assert_eq!(graph.edge_count(), 3);
assert!(graph.has_edge("a", "b_factor"));
# Ok::<(), infer_viz::error::VizError>(())
```
*/

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Result, VizError};
use crate::panel::RenderReport;
use crate::source::DocumentSource;

/// Variables, priors, dependencies and observations of one model.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorGraphModel {
    variables: Vec<String>,
    priors: BTreeMap<String, String>,
    dependents: BTreeMap<String, Vec<String>>,
    observed: BTreeSet<String>,
}

#[derive(Debug, Deserialize)]
struct RawGraph {
    #[serde(rename = "V")]
    variables: Vec<String>,
    #[serde(rename = "P")]
    priors: BTreeMap<String, Value>,
    #[serde(rename = "A", default)]
    dependents: BTreeMap<String, Vec<String>>,
    #[serde(rename = "Y", default)]
    observed: Option<Value>,
}

fn describe(msg: impl Into<String>) -> VizError {
    VizError::GraphDescriptionError(msg.into())
}

impl FactorGraphModel {
    /// Validates that every name used in `priors`, `dependents` and `observed` is a declared variable
    /// and that every variable has a prior.
    pub fn new(
        variables: Vec<String>,
        priors: BTreeMap<String, String>,
        dependents: BTreeMap<String, Vec<String>>,
        observed: BTreeSet<String>,
    ) -> Result<Self> {
        let declared: BTreeSet<&str> = variables.iter().map(String::as_str).collect();
        let check = |name: &str, role: &str| {
            if declared.contains(name) {
                Ok(())
            } else {
                Err(describe(format!("{role} `{name}` is not in V")))
            }
        };

        for name in priors.keys() {
            check(name, "prior of")?;
        }
        for (parent, children) in &dependents {
            check(parent, "parent")?;
            for child in children {
                check(child, "dependent")?;
            }
        }
        for name in &observed {
            check(name, "observed variable")?;
        }
        if let Some(missing) = variables.iter().find(|v| !priors.contains_key(*v)) {
            return Err(describe(format!("variable `{missing}` has no prior in P")));
        }

        Ok(Self {
            variables,
            priors,
            dependents,
            observed,
        })
    }

    /// Decodes and validates a `[functions, graph]` description.
    pub fn from_json(raw: &str) -> Result<Self> {
        let doc: Value =
            serde_json::from_str(raw).map_err(|e| describe(format!("invalid JSON: {e}")))?;
        let graph = match doc {
            Value::Array(mut parts) if parts.len() == 2 => parts.swap_remove(1),
            _ => return Err(describe("expected a two-element array [functions, graph]")),
        };
        let raw: RawGraph = serde_json::from_value(graph).map_err(|e| describe(e.to_string()))?;

        let priors = raw
            .priors
            .into_iter()
            .map(|(name, descriptor)| {
                let tag = prior_tag(&descriptor).ok_or_else(|| {
                    describe(format!("prior of `{name}` has no distribution tag at [1][0]"))
                })?;
                Ok((name, tag))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        let observed = match raw.observed {
            None | Some(Value::Null) => BTreeSet::new(),
            Some(Value::Array(names)) => names
                .into_iter()
                .map(|n| match n {
                    Value::String(s) => Ok(s),
                    other => Err(describe(format!("observed entry {other} is not a name"))),
                })
                .collect::<Result<_>>()?,
            Some(Value::Object(map)) => map.into_iter().map(|(k, _)| k).collect(),
            Some(other) => return Err(describe(format!("Y must be an array or object, got {other}"))),
        };

        Self::new(raw.variables, priors, raw.dependents, observed)
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn prior(&self, variable: &str) -> Option<&str> {
        self.priors.get(variable).map(String::as_str)
    }

    pub fn is_observed(&self, variable: &str) -> bool {
        self.observed.contains(variable)
    }
}

fn prior_tag(descriptor: &Value) -> Option<String> {
    match descriptor.get(1)?.get(0)? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// A node of the rendered graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphNode {
    Factor { variable: String, distribution: String },
    Variable { name: String, observed: bool },
}

impl GraphNode {
    /// Node identifier in the rendered graph.
    pub fn id(&self) -> String {
        match self {
            GraphNode::Factor { variable, .. } => format!("{variable}_factor"),
            GraphNode::Variable { name, .. } => name.clone(),
        }
    }

    fn dot_attributes(&self) -> String {
        let label = quote(&self.to_string());
        match self {
            GraphNode::Factor { .. } => format!("label={label}, shape=box"),
            GraphNode::Variable { observed, .. } => {
                let fill = if *observed { "gray" } else { "white" };
                format!("label={label}, shape=circle, style=filled, fillcolor={fill}")
            }
        }
    }
}

/// Text shown inside the node.
impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphNode::Factor { distribution, .. } => write!(f, "({distribution} ...)"),
            GraphNode::Variable { name, .. } => f.write_str(name),
        }
    }
}

/// An edge of the rendered graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphEdge {
    /// From a factor to the variable it defines.
    Defines,
    /// From a variable to the factor of a dependent variable.
    Conditions,
}

impl fmt::Display for GraphEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphEdge::Defines => f.write_str("defines"),
            GraphEdge::Conditions => f.write_str("conditions"),
        }
    }
}

/// The bipartite factor/variable graph of a model.
#[derive(Debug, Clone)]
pub struct FactorGraph {
    graph: DiGraph<GraphNode, GraphEdge>,
    ids: HashMap<String, NodeIndex>,
}

impl FactorGraph {
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.ids.get(id).map(|&ix| &self.graph[ix])
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        match (self.ids.get(from), self.ids.get(to)) {
            (Some(&a), Some(&b)) => self.graph.contains_edge(a, b),
            _ => false,
        }
    }

    pub fn graph(&self) -> &DiGraph<GraphNode, GraphEdge> {
        &self.graph
    }

    /// Renders the graph in Graphviz DOT syntax. Nodes are numbered in insertion order and carry
    /// their text as `label`.
    pub fn to_dot(&self) -> String {
        let dot = Dot::with_attr_getters(
            &self.graph,
            &[Config::NodeNoLabel, Config::EdgeNoLabel],
            &|_, _| String::new(),
            &|_, (_, node)| node.dot_attributes(),
        );
        format!("{dot}")
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Translates a model into its factor graph. Performs no inference.
pub fn build_factor_graph(model: &FactorGraphModel) -> FactorGraph {
    let mut graph = DiGraph::new();
    let mut ids = HashMap::new();
    let mut factors = HashMap::new();

    for name in &model.variables {
        let factor = graph.add_node(GraphNode::Factor {
            variable: name.clone(),
            distribution: model.prior(name).unwrap_or("?").to_owned(),
        });
        let variable = graph.add_node(GraphNode::Variable {
            name: name.clone(),
            observed: model.is_observed(name),
        });
        graph.add_edge(factor, variable, GraphEdge::Defines);
        ids.insert(graph[factor].id(), factor);
        ids.insert(name.clone(), variable);
        factors.insert(name.as_str(), factor);
    }

    for (parent, children) in &model.dependents {
        let parent_ix = ids[parent.as_str()];
        for child in children {
            graph.add_edge(parent_ix, factors[child.as_str()], GraphEdge::Conditions);
        }
    }

    FactorGraph { graph, ids }
}

/// Persists a rendered factor graph.
pub trait GraphSink {
    fn save_graph(&mut self, stem: &str, graph: &FactorGraph) -> Result<()>;
}

/// Writes `<dir>/<stem>.dot` and, when enabled, lays it out with Graphviz into `<stem>.png`.
#[derive(Debug, Clone)]
pub struct DotGraphSink {
    dir: PathBuf,
    render_png: bool,
    layout_command: String,
}

impl DotGraphSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            render_png: true,
            layout_command: "dot".into(),
        }
    }

    pub fn render_png(mut self, enabled: bool) -> Self {
        self.render_png = enabled;
        self
    }

    /// Layout engine executable, `dot` by default.
    pub fn layout_command(mut self, command: impl Into<String>) -> Self {
        self.layout_command = command.into();
        self
    }
}

impl GraphSink for DotGraphSink {
    fn save_graph(&mut self, stem: &str, graph: &FactorGraph) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| VizError::io(&self.dir, e))?;
        let dot_path = self.dir.join(format!("{stem}.dot"));
        fs::write(&dot_path, graph.to_dot()).map_err(|e| VizError::io(&dot_path, e))?;
        debug!("Saved {}", dot_path.display());
        if !self.render_png {
            return Ok(());
        }

        let png_path = self.dir.join(format!("{stem}.png"));
        let status = Command::new(&self.layout_command)
            .arg("-Tpng")
            .arg(&dot_path)
            .arg("-o")
            .arg(&png_path)
            .status()
            .map_err(|e| VizError::io(&self.layout_command, e))?;
        if !status.success() {
            return Err(VizError::Render(format!(
                "{} exited with {status} for {}",
                self.layout_command,
                dot_path.display()
            )));
        }
        debug!("Saved {}", png_path.display());
        Ok(())
    }
}

/// A graph sink that keeps the DOT text of every graph it receives.
#[derive(Debug, Default)]
pub struct RecordingGraphSink {
    pub graphs: Vec<(String, String)>,
}

impl GraphSink for RecordingGraphSink {
    fn save_graph(&mut self, stem: &str, graph: &FactorGraph) -> Result<()> {
        self.graphs.push((stem.to_owned(), graph.to_dot()));
        Ok(())
    }
}

/// Builds and saves the factor graph of every model description in `source`, in label order.
///
/// Models that fail to decode, validate or save are reported and skipped.
pub fn render_graphs<S, K>(source: &S, sink: &mut K) -> Result<RenderReport>
where
    S: DocumentSource + ?Sized,
    K: GraphSink + ?Sized,
{
    let mut docs = source.documents()?;
    docs.sort_by(|a, b| a.label.cmp(&b.label));
    let labels: Vec<&str> = docs.iter().map(|d| d.label.as_str()).collect();
    info!("Found {}", labels.join(", "));

    let mut report = RenderReport::default();
    for doc in docs {
        info!("{: <10} {}", "Reading", doc.label);
        let outcome = doc
            .read()
            .and_then(|raw| FactorGraphModel::from_json(&raw))
            .and_then(|model| sink.save_graph(&doc.label, &build_factor_graph(&model)));
        match outcome {
            Ok(()) => report.rendered.push(doc.label),
            Err(e) => report.skip(&doc.label, e),
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    const TWO_NODE: &str = r#"[[], {"V": ["a", "b"],
        "P": {"a": ["sample*", ["normal", 0, 1]], "b": ["observe*", ["bernoulli", "a"]]},
        "A": {"a": ["b"]},
        "Y": ["b"]}]"#;

    #[test]
    fn test_two_variable_model() {
        let model = FactorGraphModel::from_json(TWO_NODE).unwrap();
        let graph = build_factor_graph(&model);
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 3);
        assert!(graph.has_edge("a_factor", "a"));
        assert!(graph.has_edge("b_factor", "b"));
        assert!(graph.has_edge("a", "b_factor"));
        assert!(!graph.has_edge("a", "b"));

        assert_eq!(
            graph.node("b"),
            Some(&GraphNode::Variable {
                name: "b".into(),
                observed: true
            })
        );
        assert_eq!(
            graph.node("a_factor"),
            Some(&GraphNode::Factor {
                variable: "a".into(),
                distribution: "normal".into()
            })
        );
    }

    #[test]
    fn test_dot_output() {
        let graph = build_factor_graph(&FactorGraphModel::from_json(TWO_NODE).unwrap());
        let dot = graph.to_dot();
        assert!(dot.starts_with("digraph {"));
        // Node order: a_factor, a, b_factor, b.
        assert!(dot.contains(r#"label="(normal ...)", shape=box"#), "{dot}");
        assert!(dot.contains(r#"label="a", shape=circle, style=filled, fillcolor=white"#));
        assert!(dot.contains(r#"label="b", shape=circle, style=filled, fillcolor=gray"#));
        assert!(dot.contains("1 -> 2"));
        assert_eq!(dot.matches(" -> ").count(), 3);
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn test_labels_are_escaped() {
        let name = r#"say "hi""#.to_string();
        let model = FactorGraphModel::new(
            vec![name.clone()],
            BTreeMap::from([(name, "normal".to_string())]),
            BTreeMap::new(),
            BTreeSet::new(),
        )
        .unwrap();
        let dot = build_factor_graph(&model).to_dot();
        assert!(dot.contains(r#"label="say \"hi\"""#), "{dot}");
    }

    #[test]
    fn test_unknown_dependent_is_rejected() {
        let raw = r#"[[], {"V": ["a"], "P": {"a": ["sample*", ["normal", 0, 1]]},
                           "A": {"a": ["ghost"]}, "Y": []}]"#;
        let err = FactorGraphModel::from_json(raw).unwrap_err();
        assert!(matches!(err, VizError::GraphDescriptionError(_)), "{err}");
    }

    #[test]
    fn test_unknown_observed_is_rejected() {
        let raw = r#"[[], {"V": ["a"], "P": {"a": ["sample*", ["normal", 0, 1]]},
                           "A": {}, "Y": {"ghost": 1.0}}]"#;
        assert!(matches!(
            FactorGraphModel::from_json(raw),
            Err(VizError::GraphDescriptionError(_))
        ));
    }

    #[test]
    fn test_missing_prior_and_bad_layout() {
        let raw = r#"[[], {"V": ["a"], "P": {}, "A": {}, "Y": []}]"#;
        assert!(matches!(
            FactorGraphModel::from_json(raw),
            Err(VizError::GraphDescriptionError(_))
        ));
        assert!(FactorGraphModel::from_json(r#"{"V": []}"#).is_err());
        let no_tag = r#"[[], {"V": ["a"], "P": {"a": ["sample*"]}}]"#;
        assert!(FactorGraphModel::from_json(no_tag).is_err());
    }

    #[test]
    fn test_bad_model_does_not_stop_the_batch() {
        let bad = r#"[[], {"V": ["a"], "P": {"a": ["s", ["normal"]]}, "A": {"x": ["a"]}, "Y": []}]"#;
        let source = MemorySource::new()
            .with("z_ok", TWO_NODE)
            .with("m_bad", bad)
            .with("a_ok", TWO_NODE);
        let mut sink = RecordingGraphSink::default();
        let report = render_graphs(&source, &mut sink).unwrap();

        assert_eq!(report.rendered, ["a_ok", "z_ok"]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].label, "m_bad");
        assert!(matches!(
            report.skipped[0].error,
            VizError::GraphDescriptionError(_)
        ));
        assert_eq!(sink.graphs.len(), 2);
    }

    #[test]
    fn test_dot_sink_without_layout_engine() {
        let dir = tempfile::tempdir().unwrap();
        let graph = build_factor_graph(&FactorGraphModel::from_json(TWO_NODE).unwrap());
        let mut sink = DotGraphSink::new(dir.path()).render_png(false);
        sink.save_graph("two", &graph).unwrap();
        let written = fs::read_to_string(dir.path().join("two.dot")).unwrap();
        assert_eq!(written, graph.to_dot());
    }

    #[test]
    fn test_missing_layout_engine_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let graph = build_factor_graph(&FactorGraphModel::from_json(TWO_NODE).unwrap());
        let mut sink = DotGraphSink::new(dir.path()).layout_command("definitely-not-graphviz-xyz");
        assert!(matches!(
            sink.save_graph("two", &graph),
            Err(VizError::Io { .. })
        ));
    }
}
