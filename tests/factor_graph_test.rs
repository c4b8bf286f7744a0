//! Model descriptions on disk → factor graphs → DOT files.

use infer_viz::error::VizError;
use infer_viz::factor_graph::{build_factor_graph, render_graphs, DotGraphSink, FactorGraphModel};
use infer_viz::source::DirectorySource;
use std::fs;
use tempfile::tempdir;

const HMM_MODEL: &str = r#"[
    {"step": ["fn", ["z"], ["if", ["=", "z", 0], 0.9, 0.1]]},
    {
        "V": ["z1", "z2", "x1", "x2"],
        "P": {
            "z1": ["sample*", ["discrete", [0.5, 0.5]]],
            "z2": ["sample*", ["bernoulli", ["step", "z1"]]],
            "x1": ["observe*", ["normal", "z1", 1.0]],
            "x2": ["observe*", ["normal", "z2", 1.0]]
        },
        "A": {"z1": ["z2", "x1"], "z2": ["x2"]},
        "Y": {"x1": 0.3, "x2": 1.7}
    }
]"#;

const DANGLING_MODEL: &str = r#"[{}, {
    "V": ["a"],
    "P": {"a": ["sample*", ["normal", 0, 1]]},
    "A": {"a": ["b"]},
    "Y": []
}]"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_model_structure() {
        let model = FactorGraphModel::from_json(HMM_MODEL).unwrap();
        assert_eq!(model.variables().len(), 4);
        assert_eq!(model.prior("z1"), Some("discrete"));
        assert!(model.is_observed("x2"));
        assert!(!model.is_observed("z2"));

        let graph = build_factor_graph(&model);
        // One factor and one variable node per variable.
        assert_eq!(graph.node_count(), 8);
        // Four factor → variable edges plus three dependencies.
        assert_eq!(graph.edge_count(), 7);
        for (from, to) in [("z1", "z2_factor"), ("z1", "x1_factor"), ("z2", "x2_factor")] {
            assert!(graph.has_edge(from, to), "missing {from} -> {to}");
        }
    }

    #[test]
    fn test_directory_run_skips_invalid_models() {
        let models = tempdir().unwrap();
        let rendered = tempdir().unwrap();
        fs::write(models.path().join("1_hmm.json"), HMM_MODEL).unwrap();
        fs::write(models.path().join("2_dangling.json"), DANGLING_MODEL).unwrap();
        fs::write(models.path().join("3_not_json.json"), "(defn f [] 1)").unwrap();

        let mut sink = DotGraphSink::new(rendered.path()).render_png(false);
        let report = render_graphs(&DirectorySource::new(models.path()), &mut sink).unwrap();

        assert_eq!(report.rendered, ["1_hmm"]);
        let skipped: Vec<&str> = report.skipped.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(skipped, ["2_dangling", "3_not_json"]);
        assert!(report
            .skipped
            .iter()
            .all(|s| matches!(s.error, VizError::GraphDescriptionError(_))));

        let dot = fs::read_to_string(rendered.path().join("1_hmm.dot")).unwrap();
        assert!(dot.contains(r#"label="(bernoulli ...)", shape=box"#));
        assert!(dot.contains(r#"label="x1", shape=circle, style=filled, fillcolor=gray"#));
        assert!(dot.contains(r#"label="z2", shape=circle, style=filled, fillcolor=white"#));
        assert_eq!(dot.matches(" -> ").count(), 7);
        assert!(!rendered.path().join("2_dangling.dot").exists());
    }
}
