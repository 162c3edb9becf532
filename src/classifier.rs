use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{Config, TreeConfig};
use crate::error::{Result, SchoolError};
use crate::models::{payment_ratio, FeeStatus, Student};
use crate::store::{self, Collection};
use crate::tree::DecisionTree;

pub const ARTIFACT_VERSION: u32 = 1;

/// Attendance, LastPaid, TotalFee, PaymentRatio.
pub const FEATURE_COUNT: usize = 4;

/// Persisted, trained state of the fee-defaulter classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: u32,
    pub trained_at: DateTime<Utc>,
    pub training_rows: usize,
    pub defaulters: usize,
    pub tree: DecisionTree,
}

impl ModelArtifact {
    pub fn classify(&self, attendance: f64, last_paid: f64, total_fee: f64) -> Result<FeeStatus> {
        let row = features(attendance, last_paid, total_fee)?;
        Ok(if self.tree.predict(&row) {
            FeeStatus::Defaulter
        } else {
            FeeStatus::OnTime
        })
    }
}

/// How a prediction obtained its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSource {
    Trained,
    Loaded,
}

pub fn features(attendance: f64, last_paid: f64, total_fee: f64) -> Result<Vec<f64>> {
    let ratio = payment_ratio(last_paid, total_fee)?;
    Ok(vec![attendance, last_paid, total_fee, ratio])
}

/// Fits a model on `students`, labelling each by its payment ratio.
/// Returns `None` for an empty collection.
pub fn fit(students: &Collection<Student>, config: &TreeConfig) -> Result<Option<ModelArtifact>> {
    let mut rows = Vec::with_capacity(students.len());
    let mut labels = Vec::with_capacity(students.len());

    for student in students.iter() {
        let ratio = student.payment_ratio()?;
        rows.push(vec![
            student.attendance,
            student.last_paid,
            student.total_fee,
            ratio,
        ]);
        labels.push(FeeStatus::from_ratio(ratio) == FeeStatus::Defaulter);
    }

    let Some(tree) = DecisionTree::fit(&rows, &labels, config) else {
        return Ok(None);
    };

    Ok(Some(ModelArtifact {
        version: ARTIFACT_VERSION,
        trained_at: Utc::now(),
        training_rows: rows.len(),
        defaulters: labels.iter().filter(|&&label| label).count(),
        tree,
    }))
}

/// Retrains from the current student collection and overwrites any existing
/// artifact. With no students nothing is written and `None` is returned.
pub fn train(config: &Config) -> Result<Option<ModelArtifact>> {
    let students = store::load::<Student>(&config.paths.students)?;
    let Some(artifact) = fit(&students, &config.tree)? else {
        info!("no student data to train on");
        return Ok(None);
    };

    save_artifact(&artifact, &config.paths.model)?;
    info!(
        rows = artifact.training_rows,
        defaulters = artifact.defaulters,
        depth = artifact.tree.depth(),
        path = %config.paths.model.display(),
        "fee-defaulter model trained and saved"
    );
    Ok(Some(artifact))
}

/// Loads the persisted model, training one first if none exists. An existing
/// artifact is never refreshed here, however much the students have changed;
/// use [`train`] for that.
pub fn obtain_model(config: &Config) -> Result<(ModelArtifact, ModelSource)> {
    if !config.paths.model.exists() {
        let artifact = train(config)?.ok_or(SchoolError::ModelUnavailable)?;
        return Ok((artifact, ModelSource::Trained));
    }

    let artifact = load_artifact(&config.paths.model)?;
    warn_if_stale(&artifact, config);
    Ok((artifact, ModelSource::Loaded))
}

pub fn predict(
    config: &Config,
    attendance: f64,
    last_paid: f64,
    total_fee: f64,
) -> Result<FeeStatus> {
    // Reject a zero fee before any training side effects happen.
    features(attendance, last_paid, total_fee)?;

    let (artifact, source) = obtain_model(config)?;
    let status = artifact.classify(attendance, last_paid, total_fee)?;
    debug!(?source, %status, attendance, last_paid, total_fee, "fee status predicted");
    Ok(status)
}

fn warn_if_stale(artifact: &ModelArtifact, config: &Config) {
    match store::load::<Student>(&config.paths.students) {
        Ok(students) if students.len() != artifact.training_rows => warn!(
            trained_rows = artifact.training_rows,
            current_rows = students.len(),
            trained_at = %artifact.trained_at,
            "fee-defaulter model was trained on a different student roster; \
             run `train` to refresh it"
        ),
        Ok(_) => {}
        Err(err) => debug!(error = %err, "could not compare model against student roster"),
    }
}

pub fn save_artifact(artifact: &ModelArtifact, location: &Path) -> Result<()> {
    if let Some(parent) = location.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|err| SchoolError::io(parent, err))?;
        }
    }
    let json = serde_json::to_string_pretty(artifact)
        .map_err(|err| SchoolError::corrupt(location, err))?;
    std::fs::write(location, json).map_err(|err| SchoolError::io(location, err))
}

pub fn load_artifact(location: &Path) -> Result<ModelArtifact> {
    let raw = std::fs::read_to_string(location).map_err(|err| SchoolError::io(location, err))?;
    let artifact: ModelArtifact =
        serde_json::from_str(&raw).map_err(|err| SchoolError::corrupt(location, err))?;

    if artifact.version != ARTIFACT_VERSION {
        return Err(SchoolError::corrupt(
            location,
            format!("unsupported model version {}", artifact.version),
        ));
    }
    if artifact.tree.feature_count != FEATURE_COUNT {
        return Err(SchoolError::corrupt(
            location,
            format!(
                "model expects {} features, not {FEATURE_COUNT}",
                artifact.tree.feature_count
            ),
        ));
    }
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &Path) -> Config {
        Config::new(dir, TreeConfig::default())
    }

    fn add(config: &Config, attendance: f64, last_paid: f64, total_fee: f64) {
        store::append(&config.paths.students, |id| Student {
            id,
            name: format!("Student {id}"),
            class_name: "9C".to_string(),
            attendance,
            last_paid,
            total_fee,
            fine: 0.0,
        })
        .expect("append should succeed");
    }

    #[test]
    fn concrete_scenario_classifies_both_sides() {
        let temp = tempfile::tempdir().expect("tempdir should create");
        let config = config_in(temp.path());
        add(&config, 90.0, 400.0, 1000.0);
        add(&config, 95.0, 950.0, 1000.0);

        train(&config)
            .expect("train should succeed")
            .expect("students exist");

        assert_eq!(
            predict(&config, 92.0, 500.0, 1000.0).expect("predict should succeed"),
            FeeStatus::Defaulter
        );
        assert_eq!(
            predict(&config, 95.0, 960.0, 1000.0).expect("predict should succeed"),
            FeeStatus::OnTime
        );
    }

    #[test]
    fn separable_ratios_land_on_the_right_side() {
        let temp = tempfile::tempdir().expect("tempdir should create");
        let config = config_in(temp.path());
        for (attendance, paid) in [(80.0, 200.0), (92.0, 350.0), (70.0, 500.0), (88.0, 100.0)] {
            add(&config, attendance, paid, 1000.0);
        }
        for (attendance, paid) in [(81.0, 950.0), (91.0, 1000.0), (72.0, 990.0), (87.0, 970.0)] {
            add(&config, attendance, paid, 1000.0);
        }

        assert_eq!(
            predict(&config, 85.0, 300.0, 1000.0).expect("predict should succeed"),
            FeeStatus::Defaulter
        );
        assert_eq!(
            predict(&config, 85.0, 980.0, 1000.0).expect("predict should succeed"),
            FeeStatus::OnTime
        );
    }

    #[test]
    fn first_prediction_trains_once_then_reuses() {
        let temp = tempfile::tempdir().expect("tempdir should create");
        let config = config_in(temp.path());
        add(&config, 90.0, 400.0, 1000.0);
        add(&config, 95.0, 950.0, 1000.0);
        assert!(!config.paths.model.exists());

        let (first, source) = obtain_model(&config).expect("model should be trained");
        assert_eq!(source, ModelSource::Trained);
        assert!(config.paths.model.is_file());

        // A roster change does not trigger retraining.
        add(&config, 60.0, 100.0, 1000.0);
        let (second, source) = obtain_model(&config).expect("model should load");
        assert_eq!(source, ModelSource::Loaded);
        assert_eq!(second, first);
        assert_eq!(second.training_rows, 2);
    }

    #[test]
    fn explicit_train_overwrites_artifact() {
        let temp = tempfile::tempdir().expect("tempdir should create");
        let config = config_in(temp.path());
        add(&config, 90.0, 400.0, 1000.0);
        train(&config).expect("train should succeed");

        add(&config, 95.0, 950.0, 1000.0);
        let retrained = train(&config)
            .expect("train should succeed")
            .expect("students exist");
        assert_eq!(retrained.training_rows, 2);

        let stored = load_artifact(&config.paths.model).expect("artifact should load");
        assert_eq!(stored, retrained);
    }

    #[test]
    fn training_twice_predicts_identically() {
        let temp = tempfile::tempdir().expect("tempdir should create");
        let config = config_in(temp.path());
        for (attendance, paid) in [(90.0, 400.0), (95.0, 950.0), (75.0, 790.0), (99.0, 810.0)] {
            add(&config, attendance, paid, 1000.0);
        }
        let students = store::load::<Student>(&config.paths.students).expect("load should succeed");

        let first = fit(&students, &config.tree).expect("fit").expect("model");
        let second = fit(&students, &config.tree).expect("fit").expect("model");
        assert_eq!(first.tree, second.tree);
        for query in [(80.0, 100.0, 1000.0), (96.0, 805.0, 1000.0), (50.0, 799.0, 1000.0)] {
            assert_eq!(
                first.classify(query.0, query.1, query.2).expect("classify"),
                second.classify(query.0, query.1, query.2).expect("classify"),
            );
        }
    }

    #[test]
    fn empty_roster_has_no_model() {
        let temp = tempfile::tempdir().expect("tempdir should create");
        let config = config_in(temp.path());

        assert!(train(&config).expect("train should succeed").is_none());
        assert!(!config.paths.model.exists());

        let err = predict(&config, 90.0, 500.0, 1000.0).unwrap_err();
        assert!(matches!(err, SchoolError::ModelUnavailable));
        assert!(!config.paths.model.exists());
    }

    #[test]
    fn zero_total_fee_is_rejected_before_training() {
        let temp = tempfile::tempdir().expect("tempdir should create");
        let config = config_in(temp.path());
        add(&config, 90.0, 400.0, 1000.0);

        let err = predict(&config, 90.0, 400.0, 0.0).unwrap_err();
        assert!(matches!(err, SchoolError::DegenerateInput(_)));
        assert!(!config.paths.model.exists());
    }

    #[test]
    fn stored_zero_fee_blocks_training() {
        let temp = tempfile::tempdir().expect("tempdir should create");
        let config = config_in(temp.path());
        add(&config, 90.0, 400.0, 1000.0);
        add(&config, 90.0, 400.0, 0.0);

        let err = train(&config).unwrap_err();
        assert!(matches!(err, SchoolError::DegenerateInput(_)));
        assert!(!config.paths.model.exists());
    }

    #[test]
    fn corrupt_artifact_is_reported() {
        let temp = tempfile::tempdir().expect("tempdir should create");
        let config = config_in(temp.path());
        add(&config, 90.0, 400.0, 1000.0);
        std::fs::write(&config.paths.model, "not a model").expect("write should succeed");

        let err = predict(&config, 90.0, 400.0, 1000.0).unwrap_err();
        assert!(matches!(err, SchoolError::StorageCorruption { .. }));
    }

    fn write_mismatched_artifact(config: &Config, edit: impl FnOnce(&mut ModelArtifact)) {
        add(config, 90.0, 400.0, 1000.0);
        add(config, 95.0, 950.0, 1000.0);
        let mut artifact = train(config)
            .expect("train should succeed")
            .expect("students exist");
        edit(&mut artifact);
        save_artifact(&artifact, &config.paths.model).expect("save should succeed");
    }

    #[test]
    fn artifact_from_another_version_is_corrupt() {
        let temp = tempfile::tempdir().expect("tempdir should create");
        let config = config_in(temp.path());
        write_mismatched_artifact(&config, |artifact| artifact.version = ARTIFACT_VERSION + 1);

        let err = load_artifact(&config.paths.model).unwrap_err();
        assert!(matches!(err, SchoolError::StorageCorruption { .. }));
        assert!(err.to_string().contains("unsupported model version 2"));
    }

    #[test]
    fn artifact_with_wrong_feature_count_is_corrupt() {
        let temp = tempfile::tempdir().expect("tempdir should create");
        let config = config_in(temp.path());
        write_mismatched_artifact(&config, |artifact| artifact.tree.feature_count = 3);

        let err = predict(&config, 92.0, 500.0, 1000.0).unwrap_err();
        assert!(matches!(err, SchoolError::StorageCorruption { .. }));
        assert!(err.to_string().contains("model expects 3 features"));
    }
}
