use tracing::info;

use crate::config::DataPaths;
use crate::error::{Result, SchoolError};
use crate::models::{DashboardTotals, SchoolClass, Student, Teacher};
use crate::store::{self, Collection};

#[derive(Debug, Clone)]
pub struct Roster {
    pub students: Collection<Student>,
    pub teachers: Collection<Teacher>,
    pub classes: Collection<SchoolClass>,
}

impl Roster {
    pub fn totals(&self) -> DashboardTotals {
        DashboardTotals {
            students: self.students.len(),
            teachers: self.teachers.len(),
            classes: self.classes.len(),
        }
    }
}

/// Loads all three collections, creating any that are missing.
pub fn load_roster(paths: &DataPaths) -> Result<Roster> {
    Ok(Roster {
        students: store::load(&paths.students)?,
        teachers: store::load(&paths.teachers)?,
        classes: store::load(&paths.classes)?,
    })
}

pub fn add_student(
    paths: &DataPaths,
    name: &str,
    class_name: &str,
    attendance: f64,
    last_paid: f64,
    total_fee: f64,
    fine: f64,
) -> Result<u64> {
    validate_student(attendance, last_paid, total_fee, fine)?;

    let id = store::append(&paths.students, |id| Student {
        id,
        name: name.to_string(),
        class_name: class_name.to_string(),
        attendance,
        last_paid,
        total_fee,
        fine,
    })?;
    info!(id, name, class_name, "student added");
    Ok(id)
}

pub fn add_teacher(paths: &DataPaths, name: &str, subjects: &str) -> Result<u64> {
    let id = store::append(&paths.teachers, |id| Teacher {
        id,
        name: name.to_string(),
        subjects: subjects.to_string(),
    })?;
    info!(id, name, "teacher added");
    Ok(id)
}

fn validate_student(attendance: f64, last_paid: f64, total_fee: f64, fine: f64) -> Result<()> {
    if total_fee == 0.0 {
        return Err(SchoolError::DegenerateInput(
            "total fee must be nonzero".to_string(),
        ));
    }
    if !total_fee.is_finite() || total_fee < 0.0 {
        return Err(SchoolError::InvalidRecord(format!(
            "total fee must be positive, got {total_fee}"
        )));
    }
    if !(0.0..=100.0).contains(&attendance) {
        return Err(SchoolError::InvalidRecord(format!(
            "attendance must be between 0 and 100, got {attendance}"
        )));
    }
    if !last_paid.is_finite() || last_paid < 0.0 {
        return Err(SchoolError::InvalidRecord(format!(
            "last paid amount must be non-negative, got {last_paid}"
        )));
    }
    if !fine.is_finite() || fine < 0.0 {
        return Err(SchoolError::InvalidRecord(format!(
            "fine must be non-negative, got {fine}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_roster_creates_all_files() {
        let temp = tempfile::tempdir().expect("tempdir should create");
        let paths = DataPaths::in_dir(temp.path());

        let roster = load_roster(&paths).expect("roster should load");
        let totals = roster.totals();
        assert_eq!((totals.students, totals.teachers, totals.classes), (0, 0, 0));
        assert!(paths.students.is_file());
        assert!(paths.teachers.is_file());
        assert!(paths.classes.is_file());
        assert!(!paths.model.exists());
    }

    #[test]
    fn students_and_teachers_number_independently() {
        let temp = tempfile::tempdir().expect("tempdir should create");
        let paths = DataPaths::in_dir(temp.path());

        let first = add_student(&paths, "Amina Yusuf", "7A", 92.0, 500.0, 1000.0, 0.0)
            .expect("student should save");
        let second = add_student(&paths, "Kofi Mensah", "7B", 81.0, 1000.0, 1000.0, 50.0)
            .expect("student should save");
        let teacher = add_teacher(&paths, "Ms. Okafor", "English, History")
            .expect("teacher should save");

        assert_eq!((first, second, teacher), (1, 2, 1));

        let roster = load_roster(&paths).expect("roster should load");
        assert_eq!(roster.totals().students, 2);
        assert_eq!(roster.teachers.records()[0].subjects, "English, History");
    }

    #[test]
    fn rejects_zero_total_fee_at_creation() {
        let temp = tempfile::tempdir().expect("tempdir should create");
        let paths = DataPaths::in_dir(temp.path());

        let err = add_student(&paths, "Amina Yusuf", "7A", 92.0, 500.0, 0.0, 0.0).unwrap_err();
        assert!(matches!(err, SchoolError::DegenerateInput(_)));
        assert!(!paths.students.exists());
    }

    #[test]
    fn rejects_out_of_range_fields() {
        let temp = tempfile::tempdir().expect("tempdir should create");
        let paths = DataPaths::in_dir(temp.path());

        for (attendance, last_paid, total_fee, fine) in [
            (101.0, 500.0, 1000.0, 0.0),
            (-1.0, 500.0, 1000.0, 0.0),
            (90.0, -5.0, 1000.0, 0.0),
            (90.0, 500.0, -1000.0, 0.0),
            (90.0, 500.0, 1000.0, -2.0),
        ] {
            let err = add_student(&paths, "Amina", "7A", attendance, last_paid, total_fee, fine)
                .unwrap_err();
            assert!(matches!(err, SchoolError::InvalidRecord(_)));
        }
    }
}
