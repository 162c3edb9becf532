use std::path::{Path, PathBuf};

pub const STUDENT_FILE: &str = "students.csv";
pub const TEACHER_FILE: &str = "teachers.csv";
pub const CLASS_FILE: &str = "classes.csv";
pub const MODEL_FILE: &str = "fee_defaulter_model.json";

/// Locations of the three collections and the classifier artifact.
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub students: PathBuf,
    pub teachers: PathBuf,
    pub classes: PathBuf,
    pub model: PathBuf,
}

impl DataPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            students: dir.join(STUDENT_FILE),
            teachers: dir.join(TEACHER_FILE),
            classes: dir.join(CLASS_FILE),
            model: dir.join(MODEL_FILE),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_split: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            min_samples_split: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub paths: DataPaths,
    pub tree: TreeConfig,
}

impl Config {
    pub fn new(data_dir: &Path, tree: TreeConfig) -> Self {
        Self {
            paths: DataPaths::in_dir(data_dir),
            tree,
        }
    }
}
