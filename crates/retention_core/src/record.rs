//! Raw employee records as entered by a user
//!
//! A `RawRecord` is the un-encoded, mixed categorical/numeric input to the
//! encoder. `EmployeeProfile` is the typed form behind it: the fields a user
//! adjusts plus the background fields the model was trained with but that
//! are filled with dataset medians/modes instead of being asked for.

use crate::errors::{Result, RetentionError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Categorical fields of the HR dataset, one-hot encoded by the encoder
pub const CATEGORICAL_FIELDS: [&str; 7] = [
    "businesstravel",
    "department",
    "educationfield",
    "gender",
    "jobrole",
    "maritalstatus",
    "overtime",
];

/// A single raw field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Category(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(value) => write!(f, "{value}"),
            FieldValue::Category(value) => f.write_str(value),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Category(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Category(value)
    }
}

/// Field name -> value mapping for one employee, before encoding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a field
    pub fn insert(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Typed employee profile with the defaults of the analysis form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployeeProfile {
    // Demographics
    pub age: i64,
    pub distancefromhome: i64,
    pub maritalstatus: String,

    // Job details
    pub department: String,
    pub jobrole: String,
    pub overtime: String,

    // Compensation and tenure
    pub monthlyincome: i64,
    pub stockoptionlevel: i64,
    pub joblevel: i64,
    pub totalworkingyears: i64,
    pub yearsatcompany: i64,
    pub yearssincelastpromotion: i64,

    // Satisfaction (1-4)
    pub environmentsatisfaction: i64,
    pub jobsatisfaction: i64,
    pub worklifebalance: i64,
    pub jobinvolvement: i64,

    // Background fields, not exposed on the form
    pub education: i64,
    pub numcompaniesworked: i64,
    pub percentsalaryhike: i64,
    pub performancerating: i64,
    pub relationshipsatisfaction: i64,
    pub trainingtimeslastyear: i64,
    pub yearsincurrentrole: i64,
    pub yearswithcurrmanager: i64,
    pub dailyrate: i64,
    pub hourlyrate: i64,
    pub monthlyrate: i64,
    pub gender: String,
    pub educationfield: String,
    pub businesstravel: String,
}

impl Default for EmployeeProfile {
    fn default() -> Self {
        Self {
            age: 30,
            distancefromhome: 5,
            maritalstatus: "Single".to_string(),
            department: "Sales".to_string(),
            jobrole: "Sales Executive".to_string(),
            overtime: "No".to_string(),
            monthlyincome: 5000,
            stockoptionlevel: 0,
            joblevel: 2,
            totalworkingyears: 8,
            yearsatcompany: 5,
            yearssincelastpromotion: 1,
            environmentsatisfaction: 3,
            jobsatisfaction: 3,
            worklifebalance: 3,
            jobinvolvement: 3,
            education: 3,
            numcompaniesworked: 2,
            percentsalaryhike: 15,
            performancerating: 3,
            relationshipsatisfaction: 3,
            trainingtimeslastyear: 3,
            yearsincurrentrole: 2,
            yearswithcurrmanager: 2,
            dailyrate: 800,
            hourlyrate: 60,
            monthlyrate: 14000,
            gender: "Male".to_string(),
            educationfield: "Life Sciences".to_string(),
            businesstravel: "Travel_Rarely".to_string(),
        }
    }
}

impl EmployeeProfile {
    /// Check the user-adjustable fields against the ranges the form offers
    ///
    /// Category values are deliberately not checked: unknown categories are
    /// absorbed by the encoder.
    pub fn validate(&self) -> Result<()> {
        let ranges: [(&str, i64, i64, i64); 13] = [
            ("age", self.age, 18, 60),
            ("distancefromhome", self.distancefromhome, 1, 30),
            ("monthlyincome", self.monthlyincome, 1000, 20000),
            ("stockoptionlevel", self.stockoptionlevel, 0, 3),
            ("joblevel", self.joblevel, 1, 5),
            ("totalworkingyears", self.totalworkingyears, 0, 40),
            ("yearsatcompany", self.yearsatcompany, 0, 40),
            ("yearssincelastpromotion", self.yearssincelastpromotion, 0, 15),
            ("environmentsatisfaction", self.environmentsatisfaction, 1, 4),
            ("jobsatisfaction", self.jobsatisfaction, 1, 4),
            ("worklifebalance", self.worklifebalance, 1, 4),
            ("jobinvolvement", self.jobinvolvement, 1, 4),
            ("relationshipsatisfaction", self.relationshipsatisfaction, 1, 4),
        ];

        for (name, value, min, max) in ranges {
            if value < min || value > max {
                return Err(RetentionError::Config(format!(
                    "{name} must be within {min}..={max}, got {value}"
                )));
            }
        }

        Ok(())
    }

    /// Flatten the profile into the raw record fed to the encoder
    pub fn to_raw_record(&self) -> RawRecord {
        RawRecord::new()
            .with("age", self.age)
            .with("distancefromhome", self.distancefromhome)
            .with("maritalstatus", self.maritalstatus.as_str())
            .with("department", self.department.as_str())
            .with("jobrole", self.jobrole.as_str())
            .with("overtime", self.overtime.as_str())
            .with("monthlyincome", self.monthlyincome)
            .with("stockoptionlevel", self.stockoptionlevel)
            .with("joblevel", self.joblevel)
            .with("totalworkingyears", self.totalworkingyears)
            .with("yearsatcompany", self.yearsatcompany)
            .with("yearssincelastpromotion", self.yearssincelastpromotion)
            .with("environmentsatisfaction", self.environmentsatisfaction)
            .with("jobsatisfaction", self.jobsatisfaction)
            .with("worklifebalance", self.worklifebalance)
            .with("jobinvolvement", self.jobinvolvement)
            .with("education", self.education)
            .with("numcompaniesworked", self.numcompaniesworked)
            .with("percentsalaryhike", self.percentsalaryhike)
            .with("performancerating", self.performancerating)
            .with("relationshipsatisfaction", self.relationshipsatisfaction)
            .with("trainingtimeslastyear", self.trainingtimeslastyear)
            .with("yearsincurrentrole", self.yearsincurrentrole)
            .with("yearswithcurrmanager", self.yearswithcurrmanager)
            .with("dailyrate", self.dailyrate)
            .with("hourlyrate", self.hourlyrate)
            .with("monthlyrate", self.monthlyrate)
            .with("gender", self.gender.as_str())
            .with("educationfield", self.educationfield.as_str())
            .with("businesstravel", self.businesstravel.as_str())
    }
}

impl From<&EmployeeProfile> for RawRecord {
    fn from(profile: &EmployeeProfile) -> Self {
        profile.to_raw_record()
    }
}
