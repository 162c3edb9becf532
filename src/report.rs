use std::fmt::Write;

use chrono::NaiveDate;

use crate::db::Roster;
use crate::models::{ClassBreakdown, FeeStatus, SchoolClass, Student, Teacher};
use crate::store::Collection;

pub fn summarize_by_class(students: &[Student]) -> Vec<ClassBreakdown> {
    let mut map: std::collections::HashMap<String, (usize, f64, usize)> =
        std::collections::HashMap::new();

    for student in students {
        let entry = map.entry(student.class_name.clone()).or_insert((0, 0.0, 0));
        entry.0 += 1;
        entry.1 += student.attendance;
        if raw_status(student) == Some(FeeStatus::Defaulter) {
            entry.2 += 1;
        }
    }

    let mut summaries: Vec<ClassBreakdown> = map
        .into_iter()
        .map(
            |(class_name, (student_count, total_attendance, defaulter_count))| ClassBreakdown {
                class_name,
                student_count,
                avg_attendance: if student_count == 0 {
                    0.0
                } else {
                    total_attendance / student_count as f64
                },
                defaulter_count,
            },
        )
        .collect();

    summaries.sort_by(|a, b| {
        b.student_count
            .cmp(&a.student_count)
            .then_with(|| a.class_name.cmp(&b.class_name))
    });
    summaries
}

/// Students whose payment ratio is under the defaulter threshold, lowest
/// ratio first. Rows with an unusable fee are left out.
pub fn fee_watchlist(students: &[Student]) -> Vec<(&Student, f64)> {
    let mut flagged: Vec<(&Student, f64)> = students
        .iter()
        .filter_map(|student| student.payment_ratio().ok().map(|ratio| (student, ratio)))
        .filter(|(_, ratio)| FeeStatus::from_ratio(*ratio) == FeeStatus::Defaulter)
        .collect();
    flagged.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    flagged
}

fn raw_status(student: &Student) -> Option<FeeStatus> {
    student.payment_ratio().ok().map(FeeStatus::from_ratio)
}

pub fn build_report(roster: &Roster, generated: NaiveDate) -> String {
    let totals = roster.totals();
    let classes = summarize_by_class(roster.students.records());
    let watchlist = fee_watchlist(roster.students.records());
    let outstanding_fines: f64 = roster.students.iter().map(|s| s.fine).sum();

    let mut output = String::new();

    let _ = writeln!(output, "# School Records Report");
    let _ = writeln!(output, "Generated on {}", generated);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Totals");
    let _ = writeln!(output, "- Students: {}", totals.students);
    let _ = writeln!(output, "- Teachers: {}", totals.teachers);
    let _ = writeln!(output, "- Classes: {}", totals.classes);
    let _ = writeln!(output, "- Outstanding fines: {:.2}", outstanding_fines);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Fee Watchlist");

    if watchlist.is_empty() {
        let _ = writeln!(output, "No students are behind on fees.");
    } else {
        for (student, ratio) in watchlist.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} ({}) paid {:.0}% ({:.2} of {:.2}), fine {:.2}",
                student.name,
                student.class_name,
                ratio * 100.0,
                student.last_paid,
                student.total_fee,
                student.fine
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Classes");

    if classes.is_empty() {
        let _ = writeln!(output, "No students enrolled.");
    } else {
        for class in classes.iter() {
            let _ = writeln!(
                output,
                "- {}: {} students (avg attendance {:.1}%), {} behind on fees",
                class.class_name, class.student_count, class.avg_attendance, class.defaulter_count
            );
        }
    }

    output
}

pub fn render_students(students: &Collection<Student>) -> String {
    let mut output = String::new();
    if students.is_empty() {
        let _ = writeln!(output, "No student data.");
        return output;
    }
    for s in students.iter() {
        let _ = writeln!(
            output,
            "{:>4}  {:<24} {:<8} attendance {:>5.1}%  paid {:>9.2} / {:>9.2}  fine {:>7.2}",
            s.id, s.name, s.class_name, s.attendance, s.last_paid, s.total_fee, s.fine
        );
    }
    output
}

pub fn render_teachers(teachers: &Collection<Teacher>) -> String {
    let mut output = String::new();
    if teachers.is_empty() {
        let _ = writeln!(output, "No teacher data.");
        return output;
    }
    for t in teachers.iter() {
        let _ = writeln!(output, "{:>4}  {:<24} {}", t.id, t.name, t.subjects);
    }
    output
}

pub fn render_classes(classes: &Collection<SchoolClass>) -> String {
    let mut output = String::new();
    if classes.is_empty() {
        let _ = writeln!(output, "No class data.");
        return output;
    }
    for c in classes.iter() {
        let _ = writeln!(output, "{:>4}  {}", c.id, c.class_name);
    }
    output
}
