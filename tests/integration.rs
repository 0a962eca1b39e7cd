//! End-to-end tests: generate, train, evaluate, export.

use std::sync::OnceLock;
use vaxflow::export;
use vaxflow::prelude::*;

fn reference_pipeline() -> &'static TrainedPipeline {
    static PIPELINE: OnceLock<TrainedPipeline> = OnceLock::new();
    PIPELINE.get_or_init(|| {
        let df = generate(1000, 42).expect("generate");
        DualModelTrainer::new(TrainerConfig::default())
            .train(&df)
            .expect("train")
    })
}

#[test]
fn test_generation_is_deterministic() {
    let a = generate(200, 42).expect("a");
    let b = generate(200, 42).expect("b");
    let c = generate(200, 43).expect("c");
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn test_reference_training_quality() {
    let metrics = reference_pipeline().metrics();
    assert_eq!(metrics.n_train, 800);
    assert_eq!(metrics.n_test, 200);
    assert!(metrics.demand_r2 > 0.6, "r2 = {}", metrics.demand_r2);
    assert!(metrics.demand_rmse < 120.0, "rmse = {}", metrics.demand_rmse);
    assert!(metrics.risk_accuracy > 0.55, "accuracy = {}", metrics.risk_accuracy);
    assert_eq!(metrics.risk_report.classes.len(), 3);
}

#[test]
fn test_importance_table() {
    let table = reference_pipeline().feature_importance();
    assert_eq!(table.len(), 7);

    for row in &table {
        assert!((0.0..=1.0).contains(&row.demand_importance));
        assert!((0.0..=1.0).contains(&row.waste_importance));
    }
    let demand: f64 = table.iter().map(|r| r.demand_importance).sum();
    let waste: f64 = table.iter().map(|r| r.waste_importance).sum();
    assert!((demand - 1.0).abs() < 1e-6);
    assert!((waste - 1.0).abs() < 1e-6);

    let mut seen: Vec<&str> = table.iter().map(|r| r.feature.name()).collect();
    seen.sort_unstable();
    let mut declared = Feature::names().to_vec();
    declared.sort_unstable();
    assert_eq!(seen, declared);

    assert_eq!(table[0].feature, Feature::InfectionRate);
    let json = serde_json::to_value(&table[0]).expect("serialize");
    assert_eq!(json["Feature"], "Infection_Rate");
    assert!(json.get("Demand_Importance").is_some());
    assert!(json.get("Waste_Importance").is_some());
}

#[test]
fn test_processor_round_trip() {
    let df = generate(100, 5).expect("generate");
    let mut processor = FeatureProcessor::new();
    let z = processor.fit_transform(&df).expect("fit");
    let raw = processor.inverse_transform(&z).expect("inverse");
    let again = processor.transform_table(&df).expect("transform");

    let expected = df.select(&Feature::names()).expect("features").to_matrix();
    for (a, b) in raw.as_slice().iter().zip(expected.as_slice()) {
        assert!((a - b).abs() <= 1e-9 * b.abs().max(1.0));
    }
    assert_eq!(z, again);
}

#[test]
fn test_monotonic_demand_recommendation() {
    let pipeline = reference_pipeline();
    let low = AreaRecord::from_array([150_000.0, 0.35, 2500.0, 3.5, 75.0, 0.85, 45.0]);
    let mut high = low;
    high.set(Feature::Population, 480_000.0);
    high.set(Feature::InfectionRate, 9.5);
    high.set(Feature::Awareness, 98.0);

    let engine = StrategyEngine::new();
    let lo = engine
        .evaluate(&low, pipeline.processor(), pipeline.models())
        .expect("low");
    let hi = engine
        .evaluate(&high, pipeline.processor(), pipeline.models())
        .expect("high");
    assert!(hi.predicted_demand > lo.predicted_demand);

    let threshold = (hi.predicted_demand + lo.predicted_demand) / 2.0;
    let engine = engine.with_demand_threshold(threshold);
    let lo = engine
        .evaluate(&low, pipeline.processor(), pipeline.models())
        .expect("low");
    let hi = engine
        .evaluate(&high, pipeline.processor(), pipeline.models())
        .expect("high");
    assert!(hi.recommends(RecommendationCode::IncreaseShipmentFrequency));
    assert!(!lo.recommends(RecommendationCode::IncreaseShipmentFrequency));
    assert!(lo.recommends(RecommendationCode::StandardSupplyChain));
}

#[test]
fn test_csv_dataset_feeds_batch() {
    let pipeline = reference_pipeline();
    let df = generate(12, 77).expect("generate");
    let file = tempfile::NamedTempFile::new().expect("temp file");
    export::write_dataset_csv(&df, file.path()).expect("write");

    let rows = export::read_areas_csv(file.path()).expect("read");
    let results = evaluate_batch(&rows, pipeline.processor(), pipeline.models());
    let direct = evaluate_frame(&df, pipeline.processor(), pipeline.models());
    assert_eq!(results.len(), 12);
    for (a, b) in results.iter().zip(&direct) {
        assert_eq!(a.area_id, b.area_id);
        assert_eq!(
            a.outcome.as_ref().expect("csv row"),
            b.outcome.as_ref().expect("frame row")
        );
    }
}

#[test]
fn test_config_file_drives_pipeline() {
    let file = tempfile::NamedTempFile::new().expect("temp file");
    std::fs::write(
        file.path(),
        r#"{
            "generator": { "n_samples": 150, "seed": 3 },
            "trainer": { "test_size": 0.3, "demand_forest": { "max_depth": 6 } },
            "demand_threshold": 400.0
        }"#,
    )
    .expect("write config");

    let config = PipelineConfig::from_json_file(file.path()).expect("load");
    let df = SyntheticGenerator::new(config.generator.clone())
        .generate(config.generator.n_samples, config.generator.seed)
        .expect("generate");
    let pipeline = DualModelTrainer::new(config.trainer.with_n_estimators(5))
        .train(&df)
        .expect("train");
    assert_eq!(pipeline.metrics().n_test, 45);
    assert_eq!(config.trainer.demand_forest.max_depth, Some(6));
    assert_eq!(config.trainer.demand_forest.min_samples_split, 5);
    assert_eq!(
        pipeline.models().risk_model().max_features(),
        MaxFeatures::Sqrt
    );
    assert_eq!(pipeline.models().demand_model().n_estimators(), 5);
    assert_eq!(pipeline.models().risk_model().n_estimators(), 5);
}
