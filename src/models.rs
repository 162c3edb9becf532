use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchoolError};

/// Ratios strictly below this mark a student as a defaulter at training time.
pub const DEFAULTER_RATIO: f64 = 0.8;

/// A row in one of the flat collections. The column list doubles as the CSV
/// header and must match the serde field order.
pub trait Record: Serialize + DeserializeOwned {
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> u64;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Class")]
    pub class_name: String,
    #[serde(rename = "Attendance")]
    pub attendance: f64,
    #[serde(rename = "LastPaid")]
    pub last_paid: f64,
    #[serde(rename = "TotalFee")]
    pub total_fee: f64,
    #[serde(rename = "Fine")]
    pub fine: f64,
}

impl Student {
    pub fn payment_ratio(&self) -> Result<f64> {
        payment_ratio(self.last_paid, self.total_fee).map_err(|_| {
            SchoolError::DegenerateInput(format!(
                "student {} has a total fee of zero or an unusable payment ratio",
                self.id
            ))
        })
    }
}

impl Record for Student {
    const COLUMNS: &'static [&'static str] = &[
        "ID",
        "Name",
        "Class",
        "Attendance",
        "LastPaid",
        "TotalFee",
        "Fine",
    ];

    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "Name")]
    pub name: String,
    /// Comma-joined subject names, kept as entered.
    #[serde(rename = "Subjects")]
    pub subjects: String,
}

impl Record for Teacher {
    const COLUMNS: &'static [&'static str] = &["ID", "Name", "Subjects"];

    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolClass {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "ClassName")]
    pub class_name: String,
}

impl Record for SchoolClass {
    const COLUMNS: &'static [&'static str] = &["ID", "ClassName"];

    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeStatus {
    Defaulter,
    OnTime,
}

impl FeeStatus {
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio < DEFAULTER_RATIO {
            FeeStatus::Defaulter
        } else {
            FeeStatus::OnTime
        }
    }
}

impl fmt::Display for FeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeeStatus::Defaulter => f.write_str("Defaulter"),
            FeeStatus::OnTime => f.write_str("On Time"),
        }
    }
}

/// LastPaid / TotalFee, refusing a zero or non-finite result.
pub fn payment_ratio(last_paid: f64, total_fee: f64) -> Result<f64> {
    if total_fee == 0.0 {
        return Err(SchoolError::DegenerateInput(
            "total fee must be nonzero to derive a payment ratio".to_string(),
        ));
    }
    let ratio = last_paid / total_fee;
    if !ratio.is_finite() {
        return Err(SchoolError::DegenerateInput(format!(
            "payment ratio {last_paid}/{total_fee} is not a finite number"
        )));
    }
    Ok(ratio)
}

#[derive(Debug, Clone)]
pub struct DashboardTotals {
    pub students: usize,
    pub teachers: usize,
    pub classes: usize,
}

#[derive(Debug, Clone)]
pub struct ClassBreakdown {
    pub class_name: String,
    pub student_count: usize,
    pub avg_attendance: f64,
    pub defaulter_count: usize,
}
