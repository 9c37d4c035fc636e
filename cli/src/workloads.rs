//! Workloads compiled into the binary.

const BUILTIN: &[(&str, &str)] = &[
    ("embedder", include_str!("../workloads/embedder.toml")),
    ("reranker", include_str!("../workloads/reranker.toml")),
];

/// Look up a built-in workload, returning its canonical name and TOML source.
pub fn builtin(name: &str) -> Option<(&'static str, &'static str)> {
    BUILTIN.iter().copied().find(|(n, _)| *n == name)
}

pub fn names() -> Vec<&'static str> {
    BUILTIN.iter().map(|(n, _)| *n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_workload;
    use perfsweep::{render_command, ParamValue};

    fn sets_for(name: &str) -> (crate::config::Workload, Vec<perfsweep::ParameterSet>) {
        let (_, contents) = builtin(name).expect("builtin");
        let workload = parse_workload(contents, name).expect("parse");
        let sets = workload.parameter_sets().expect("expand");
        (workload, sets)
    }

    #[test]
    fn embedder_matches_reference_matrix() {
        let (workload, sets) = sets_for("embedder");
        assert_eq!(sets.len(), 14);
        assert!(!workload.run.capture);

        let passage = sets
            .iter()
            .filter(|s| s.get("input_type") == Some(&ParamValue::from("passage")))
            .count();
        assert_eq!(passage, 6);

        let query_concurrency: Vec<String> = sets[6..]
            .iter()
            .map(|s| s.get("concurrency").expect("concurrency").to_string())
            .collect();
        assert_eq!(
            query_concurrency,
            vec!["1", "3", "5", "7", "9", "11", "13", "15"]
        );

        for set in &sets {
            let cmd = render_command(set, &workload.profiler).expect("render");
            assert_eq!(cmd.program, "genai-perf");
            assert!(cmd.args.iter().any(|a| a == "truncate:END"));
            assert_eq!(cmd.args.last().map(String::as_str), Some("-v"));
        }
    }

    #[test]
    fn reranker_matches_reference_matrix() {
        let (workload, sets) = sets_for("reranker");
        assert_eq!(sets.len(), 9);
        assert!(workload.run.capture);

        let first = render_command(&sets[0], &workload.profiler).expect("render");
        let joined = first.args.join(" ");
        assert!(joined.contains("--endpoint-type rankings"));
        assert!(joined.contains("--input-file synthetic:queries,passages"));
        assert!(joined.contains("--synthetic-input-tokens-mean 512"));
        assert!(joined.contains("--batch-size-text 10"));
        assert!(joined.contains("--concurrency 1"));
        assert!(joined.contains("-u http://10.96.3.49:8000"));

        let last = render_command(&sets[8], &workload.profiler).expect("render");
        let joined = last.args.join(" ");
        assert!(joined.contains("--batch-size-text 40"));
        assert!(joined.contains("--concurrency 5"));
    }

    #[test]
    fn names_are_listed() {
        assert_eq!(names(), vec!["embedder", "reranker"]);
        assert!(builtin("missing").is_none());
    }
}
