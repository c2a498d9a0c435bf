//! End-to-end tests over the coffee machine pentest scenario in `demos/`.

use cyberpath_core::{AttackNodeRecord, ChainAggregation, ScoringConfig, ValidationError};
use cyberpath_engine::load::{self, InputFormat};
use cyberpath_engine::{chains, report, walk, AttackChain, AttackTreeEngine, EngineError, RunLedger};

const SCENARIO: &str = include_str!("../../../demos/coffee_machine.yaml");

const ROOT: &str = "Compromise Organization";
const COFFEE: &str = "Compromise Coffee Machine via WiFi";
const LATERAL: &str = "Lateral Movement to Office Network";
const ESCALATE: &str = "Escalate to Domain Controller";
const HR: &str = "Access HR Database";

fn scenario() -> Vec<AttackNodeRecord> {
    load::parse_document(SCENARIO, InputFormat::Yaml).unwrap()
}

#[test]
fn test_scenario_walk_is_preorder_with_depths() {
    let result = AttackTreeEngine::default().analyze(&scenario()).unwrap();

    let rows: Vec<(&str, usize)> = result
        .nodes
        .iter()
        .map(|n| (n.name.as_str(), n.depth))
        .collect();
    assert_eq!(
        rows,
        vec![(ROOT, 0), (COFFEE, 1), (LATERAL, 2), (ESCALATE, 3), (HR, 3)]
    );

    let scores: Vec<f64> = result.nodes.iter().map(|n| n.score).collect();
    assert_eq!(scores, vec![3.7, 3.7, 3.5, 2.9, 3.4]);
    assert_eq!(result.stats.max_depth, 3);
    assert_eq!(result.stats.leaves, 2);
}

#[test]
fn test_scenario_chains() {
    let result = AttackTreeEngine::default().analyze(&scenario()).unwrap();
    assert_eq!(result.chains.len(), 5);

    let longest: Vec<_> = result.chains.iter().filter(|c| c.depth == 3).collect();
    assert_eq!(longest.len(), 2);
    let mut terminals: Vec<&str> = longest
        .iter()
        .map(|c| c.names.last().unwrap().as_str())
        .collect();
    terminals.sort_unstable();
    assert_eq!(terminals, vec![HR, ESCALATE]);
    assert_eq!(longest[0].names[..3], longest[1].names[..3]);
    assert_eq!(longest[0].names[..3], [ROOT, COFFEE, LATERAL]);

    let order: Vec<&str> = result
        .chains
        .iter()
        .map(|c| c.names.last().unwrap().as_str())
        .collect();
    assert_eq!(order, vec![ROOT, COFFEE, LATERAL, HR, ESCALATE]);
    assert_eq!(result.chains[0].cumulative_score, 3.7);
    assert_eq!(result.chains[2].cumulative_score, 3.63);
    assert_eq!(result.chains[4].cumulative_score, 3.45);
    for (i, chain) in result.chains.iter().enumerate() {
        assert_eq!(chain.rank, i + 1);
    }
}

#[test]
fn test_out_of_range_rating_names_node() {
    let mut records = scenario();
    records[0].subpaths[0].subpaths[0].subpaths[1].severity = Some(9);

    let err = AttackTreeEngine::default().analyze(&records).unwrap_err();
    match err {
        EngineError::Validation(e) => {
            assert!(matches!(
                e,
                ValidationError::RatingOutOfRange {
                    field: "severity",
                    value: 9,
                    ..
                }
            ));
            assert_eq!(e.path().unwrap().leaf(), Some(HR));
            assert!(e.to_string().contains(HR));
        }
        other => panic!("expected validation error, got {other}"),
    }
}

#[test]
fn test_single_node_tree() {
    let records = load::parse_document(
        r#"{"name": "Guess admin password", "severity": 3, "feasibility": 2, "expertise": 1}"#,
        InputFormat::Json,
    )
    .unwrap();
    let result = AttackTreeEngine::default().analyze(&records).unwrap();

    assert_eq!(result.nodes.len(), 1);
    assert_eq!(result.chains.len(), 1);
    assert_eq!(result.chains[0].cumulative_score, result.nodes[0].score);
}

#[test]
fn test_results_are_deterministic() {
    let engine = AttackTreeEngine::default();
    let first = engine.analyze(&scenario()).unwrap();
    let second = engine.analyze(&scenario()).unwrap();

    assert_eq!(first.tree_digest, second.tree_digest);
    assert_eq!(first.nodes, second.nodes);
    assert_eq!(first.chains, second.chains);
}

#[test]
fn test_depth_weighted_aggregation_changes_ranking_scores() {
    let engine = AttackTreeEngine::new(ScoringConfig {
        aggregation: ChainAggregation::DepthWeighted,
        ..Default::default()
    })
    .unwrap();
    let result = engine.analyze(&scenario()).unwrap();

    let escalate = result
        .chains
        .iter()
        .find(|c| c.names.last().map(String::as_str) == Some(ESCALATE))
        .unwrap();
    // (1*3.7 + 2*3.7 + 3*3.5 + 4*2.9) / 10
    assert_eq!(escalate.cumulative_score, 3.32);
}

#[test]
fn test_runs_recorded_in_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let ledger_dir = dir.path().to_str().unwrap();

    let engine = AttackTreeEngine::default().with_ledger_dir(ledger_dir);
    let first = engine.analyze(&scenario()).unwrap();
    let second = engine.analyze(&scenario()).unwrap();

    let ledger = RunLedger::open(ledger_dir).unwrap();
    assert_eq!(ledger.verify().unwrap(), 2);

    let run_id = second.run_id.expect("run id");
    let entry = ledger.find(run_id.parse().unwrap()).unwrap().expect("entry");
    assert_eq!(entry.tree_digest, first.tree_digest);
    assert_eq!(entry.scoring, ScoringConfig::default());
    assert_eq!(entry.summary.nodes, 5);
    assert_eq!(entry.summary.chains, 5);
    assert_eq!(entry.summary.top_chain, vec![ROOT]);
    assert_eq!(entry.summary.top_score, 3.7);
    assert!(entry.prev_hash.is_some());
    assert_ne!(first.run_id.as_deref(), Some(run_id.as_str()));
}

#[test]
fn test_unwritable_ledger_reports_no_run_id() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "x").unwrap();

    let engine = AttackTreeEngine::default().with_ledger_dir(blocker.to_str().unwrap());
    let result = engine.analyze(&scenario()).unwrap();

    assert!(result.run_id.is_none());
    assert_eq!(result.chains.len(), 5);
}

#[test]
fn test_deep_chain_on_small_stack() {
    const DEPTH: usize = 1_500;

    let mut record = AttackNodeRecord {
        name: "leaf".to_string(),
        severity: Some(2),
        feasibility: Some(2),
        expertise: Some(2),
        ..Default::default()
    };
    for i in 0..DEPTH {
        record = AttackNodeRecord {
            name: format!("n{i}"),
            severity: Some(2),
            feasibility: Some(2),
            expertise: Some(2),
            subpaths: vec![record],
            ..Default::default()
        };
    }
    let records = vec![record];

    std::thread::scope(|s| {
        std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn_scoped(s, || {
                let engine = AttackTreeEngine::default();
                let result = engine.analyze(&records).unwrap();
                assert_eq!(result.nodes.len(), DEPTH + 1);
                assert_eq!(result.stats.max_depth, DEPTH);
                assert_eq!(result.tree_digest.len(), 64);
                // Equal scores everywhere: shallower chains rank first.
                assert_eq!(result.chains[0].depth, 0);
                assert_eq!(result.chains[DEPTH].depth, DEPTH);

                let tree = engine.build_tree(&records).unwrap();
                assert_eq!(tree.digest(), result.tree_digest);
                let walk = walk::walk(&tree, engine.config());
                let chains = chains::enumerate_chains(&tree, &walk, engine.config());
                assert_eq!(chains.len(), DEPTH + 1);
                assert_eq!(chains.last().map(AttackChain::depth), Some(DEPTH));
            })
            .unwrap()
            .join()
            .unwrap();
    });

    // Dropping deeply nested records recurses; leak them instead.
    std::mem::forget(records);
}

#[test]
fn test_report_from_scenario() {
    let analysis = AttackTreeEngine::default()
        .analyze_detailed(&scenario())
        .unwrap();
    let (tree, evaluation) = (&analysis.tree, &analysis.evaluation);

    let markdown = report::markdown_report(tree, &evaluation.walk, &evaluation.chains, None);
    assert!(markdown.contains("| └─ └─ └─ Access HR Database | T1213 | 4 | 3 | 3 | 3.40 |"));
    assert!(markdown.contains(&format!("| {ROOT} → {COFFEE} → {LATERAL} | 3.63 |")));

    let uml = report::plantuml(tree, &evaluation.walk);
    assert_eq!(uml.matches("rectangle ").count(), 5);
    assert_eq!(uml.matches(" --> ").count(), 4);
    assert!(uml.contains("node_2 --> node_3 : Abuse unpatched privilege escalation"));
}
