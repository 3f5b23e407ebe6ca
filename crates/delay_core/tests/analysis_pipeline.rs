//! End-to-end analysis over CSV input
//!
//! Loads a CSV from disk, runs every stage and checks the assembled report.

use delaylens_core::report::ReportSection;
use delaylens_core::{
    canonical_json_string, AnalysisConfig, AnalysisError, AnalysisReport, AnalysisSession,
    Attribute, ClassifierKind, DeliveryQuery, MissingPolicy,
};
use std::io::Write;
use tempfile::NamedTempFile;

/// 40 deliveries where every Jam delivery is slow, plus one row with no time
fn write_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "ID,Weather,Traffic,Vehicle,Area,Delivery_Time").unwrap();
    for i in 0..40 {
        let (traffic, time) = if i % 4 == 0 { ("Jam ", 60) } else { ("Low ", 20) };
        let weather = if i % 2 == 0 { "Fog" } else { "Sunny" };
        let vehicle = if i % 5 == 0 { "bicycle " } else { "motorcycle " };
        writeln!(
            file,
            "{i},{weather},{traffic},{vehicle},Urban ,{}",
            time + i % 3
        )
        .unwrap();
    }
    writeln!(file, "40,Sunny,Low,van,Urban,").unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_full_report_from_csv() {
    let csv = write_csv();
    let (session, load) = AnalysisSession::from_csv(csv.path(), AnalysisConfig::default()).unwrap();

    assert_eq!(load.rows_read, 41);
    assert_eq!(load.rows_kept, 40);
    assert_eq!(load.rows_dropped, 1);
    assert_eq!(session.labels().delayed_count(), 10);
    // Trailing whitespace is not part of the category.
    assert_eq!(session.encoder().encoding(Attribute::Traffic).values(), ["Jam", "Low"]);

    let report = AnalysisReport::build(&session, Some(load));

    let rules = report.association_rules.ready().unwrap();
    assert_eq!(rules.len(), 4);
    for rule in rules {
        assert!((0.0..=1.0).contains(&rule.support));
        assert!((0.0..=1.0).contains(&rule.confidence));
        assert!(rule.lift >= 0.0);
    }
    // No Stormy/Sandstorms rows and no High traffic: both rules match nothing.
    assert_eq!(rules[0].matching, 0);
    assert_eq!(rules[0].confidence, 0.0);
    assert_eq!(rules[3].lift, 0.0);

    let classifiers = report.classifiers.ready().unwrap();
    let kinds: Vec<ClassifierKind> = classifiers.results.iter().map(|r| r.kind).collect();
    assert_eq!(kinds, ClassifierKind::ORDER);
    assert_eq!(classifiers.best_result().unwrap().evaluation.accuracy, 1.0);

    let tree = report.decision_tree.ready().unwrap();
    assert_eq!(tree.accuracy, 1.0);
    assert!(tree.depth <= 4);
    assert!(tree.rendered.contains("Traffic = Jam"));

    let json = canonical_json_string(&report).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["association_rules"]["status"], "ready");
    assert_eq!(value["load"]["rows_dropped"], 1);
    assert_eq!(value["dataset_fingerprint"].as_str().unwrap().len(), 64);
}

#[test]
fn test_prediction_uses_the_session_encoding() {
    let csv = write_csv();
    let (session, _) = AnalysisSession::from_csv(csv.path(), AnalysisConfig::default()).unwrap();
    let study = session.decision_tree_study().unwrap();

    let slow = study
        .predict(&DeliveryQuery::new("Fog", "Jam", "bicycle", "Urban"))
        .unwrap();
    assert!(slow.delayed);

    let fast = study
        .predict(&DeliveryQuery::new("Sunny", "Low", "motorcycle", "Urban"))
        .unwrap();
    assert!(!fast.delayed);
    assert_eq!(fast.label, "on time");

    let err = study
        .predict(&DeliveryQuery::new("Sunny", "Gridlock", "motorcycle", "Urban"))
        .unwrap_err();
    match err {
        AnalysisError::UnknownCategory { attribute, value } => {
            assert_eq!(attribute, "Traffic");
            assert_eq!(value, "Gridlock");
        }
        other => panic!("expected UnknownCategory, got {other:?}"),
    }
}

#[test]
fn test_fill_mode_keeps_rows_with_missing_categories() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Weather,Traffic,Vehicle,Area,Delivery_Time").unwrap();
    writeln!(file, "Sunny,Low,van,Urban,20").unwrap();
    writeln!(file, "Sunny,NaN,van,Urban,25").unwrap();
    writeln!(file, "Fog,Low,,Urban,30").unwrap();
    writeln!(file, "Fog,High,van,Urban,70").unwrap();
    file.flush().unwrap();

    let config = AnalysisConfig {
        missing: MissingPolicy::FillMode,
        ..AnalysisConfig::default()
    };
    let (session, load) = AnalysisSession::from_csv(file.path(), config).unwrap();
    assert_eq!(load.rows_kept, 4);
    assert_eq!(load.cells_imputed, 2);
    assert_eq!(session.dataset().records()[1].traffic, "Low");
    assert_eq!(session.dataset().records()[2].vehicle, "van");

    let (dropped, load) =
        AnalysisSession::from_csv(file.path(), AnalysisConfig::default()).unwrap();
    assert_eq!(load.rows_dropped, 2);
    assert_eq!(dropped.dataset().len(), 2);
}

#[test]
fn test_missing_column_is_reported() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Weather,Traffic,Vehicle,Delivery_Time").unwrap();
    writeln!(file, "Sunny,Low,van,20").unwrap();
    file.flush().unwrap();

    let err = AnalysisSession::from_csv(file.path(), AnalysisConfig::default()).unwrap_err();
    assert!(err.to_string().contains("Area"));
}

#[test]
fn test_empty_file_fails_at_label_derivation() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Weather,Traffic,Vehicle,Area,Delivery_Time").unwrap();
    file.flush().unwrap();

    let err = AnalysisSession::from_csv(file.path(), AnalysisConfig::default()).unwrap_err();
    assert!(matches!(err, AnalysisError::EmptyDataset { .. }));
}

#[test]
fn test_tiny_dataset_skips_model_stages() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Weather,Traffic,Vehicle,Area,Delivery_Time").unwrap();
    writeln!(file, "Sunny,Low,van,Urban,20").unwrap();
    file.flush().unwrap();

    let (session, load) = AnalysisSession::from_csv(file.path(), AnalysisConfig::default()).unwrap();
    let report = AnalysisReport::build(&session, Some(load));

    assert!(report.association_rules.ready().is_some());
    assert!(matches!(report.classifiers, ReportSection::Skipped { .. }));
    assert!(matches!(report.decision_tree, ReportSection::Skipped { .. }));
}
