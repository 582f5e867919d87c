//! End-to-end flow: imbalanced training data through a seeded ensemble,
//! batch prediction, accuracy scoring, and a persistence round trip.
use prosody_classifiers::config::{ClassifierConfig, ClassifierType, SamplingStrategy};
use prosody_classifiers::data_handling::{DataPoint, Feature, FeatureSet};
use prosody_classifiers::evaluation::{accuracy, assign_predictions};
use prosody_classifiers::models::factory;
use prosody_classifiers::models::linear::LinearParams;
use prosody_classifiers::persistence::{load_classifier, save_classifier};

/// Imbalanced but cleanly separable accent data: unaccented tokens hug
/// low f0 excursions, accented tokens sit well above.
fn accent_corpus() -> FeatureSet {
    let mut data = FeatureSet::new(
        vec![
            Feature::numeric("f0_range"),
            Feature::numeric("energy"),
            Feature::nominal("accent", vec!["none".to_owned(), "H*".to_owned()]),
        ],
        "accent",
    );
    for i in 0..24 {
        let mut p = DataPoint::new();
        p.set_attribute("f0_range", -2.0 - 0.05 * i as f64);
        p.set_attribute("energy", -1.0 - 0.02 * i as f64);
        p.set_attribute("accent", "none");
        data.push(p);
    }
    for i in 0..12 {
        let mut p = DataPoint::new();
        p.set_attribute("f0_range", 2.0 + 0.1 * i as f64);
        p.set_attribute("energy", 1.0 + 0.05 * i as f64);
        p.set_attribute("accent", "H*");
        data.push(p);
    }
    data
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_seeded_ensemble_trains_scores_and_round_trips() {
    init_logging();
    let config = ClassifierConfig::new(
        ClassifierType::Linear(LinearParams {
            alpha: 0.01,
            ..LinearParams::default()
        }),
        SamplingStrategy::Ensemble,
    )
    .with_seed(42);

    let mut classifier = factory::build_classifier(config);
    let mut data = accent_corpus();
    classifier.train(&data).expect("training failed");

    let failures = assign_predictions(classifier.as_ref(), &mut data, "hyp", "conf", "none");
    assert_eq!(failures, 0);
    let score = accuracy(&data, "hyp").expect("scoring failed");
    assert!(score >= 0.9, "accuracy {} below 0.9", score);

    for point in data.data_points() {
        let conf = point.numeric("conf").expect("missing confidence");
        assert!(conf > 0.0 && conf <= 1.0);
    }

    // persistence round trip preserves the ensemble's predictions
    let mut bytes = Vec::new();
    save_classifier(classifier.as_ref(), &mut bytes).expect("save failed");
    let restored = load_classifier(bytes.as_slice()).expect("load failed");

    for point in data.data_points() {
        let before = classifier
            .distribution_for_instance(point)
            .expect("prediction failed");
        let after = restored
            .distribution_for_instance(point)
            .expect("restored prediction failed");
        for (label, mass) in before.iter() {
            assert!((after.get(label) - mass).abs() < 1e-9);
        }
    }
}

#[test]
fn test_stratified_ensemble_handles_minority_class() {
    init_logging();
    let config = ClassifierConfig::new(
        ClassifierType::Linear(LinearParams {
            alpha: 0.01,
            ..LinearParams::default()
        }),
        SamplingStrategy::StratifiedEnsemble,
    );

    let mut classifier = factory::build_classifier(config);
    let data = accent_corpus();
    classifier.train(&data).expect("training failed");

    // an unmistakably accented token still wins under heavy imbalance
    let mut accented = DataPoint::new();
    accented.set_attribute("f0_range", 2.5);
    accented.set_attribute("energy", 1.2);
    let label = classifier.classify(&accented).expect("classify failed");
    assert_eq!(label, "H*");
}
