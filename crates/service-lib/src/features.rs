//! Feature derivation for sleep disorder inference
//!
//! Turns a validated request into the column set the fitted pipeline was
//! trained on: blood pressure is split into its two readings, sleep ratios
//! are computed, and activity level and age are bucketed into categories.

use crate::schema::{fields, BmiCategory, Categorical, Gender, Occupation, PredictionRequest};
use serde::Serialize;

/// Column names introduced by derivation
pub mod columns {
    pub const BP_SYSTOLIC: &str = "BP_Systolic";
    pub const BP_DIASTOLIC: &str = "BP_Diastolic";
    pub const SLEEP_EFFICIENCY: &str = "Sleep_Efficiency";
    pub const STRESS_IMPACT: &str = "Stress_Impact";
    pub const EXERCISE_INTENSITY: &str = "Exercise_Intensity";
    pub const AGE_SEGMENT: &str = "Age_Segment";
}

/// Upper bound (inclusive) of the Low exercise band, in activity minutes
pub const LOW_ACTIVITY_MAX: f64 = 45.0;
/// Upper bound (inclusive) of the Middle exercise band
pub const MIDDLE_ACTIVITY_MAX: f64 = 60.0;
/// Upper bound (inclusive) of the Middle High exercise band
pub const MIDDLE_HIGH_ACTIVITY_MAX: f64 = 75.0;

/// Failure to decompose a composite request field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("blood pressure {0:?} must contain exactly one '/' separator")]
    Separator(String),

    #[error("blood pressure {value:?} has a non-integer {reading} reading")]
    NotInteger { value: String, reading: &'static str },
}

/// Blood pressure decomposed into its two readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BloodPressure {
    pub systolic: i64,
    pub diastolic: i64,
}

/// Split a `"systolic/diastolic"` reading
pub fn split_blood_pressure(raw: &str) -> Result<BloodPressure, ParseError> {
    let mut parts = raw.split('/');
    let (Some(systolic), Some(diastolic), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ParseError::Separator(raw.to_string()));
    };

    let reading = |part: &str, name: &'static str| {
        part.trim()
            .parse::<i64>()
            .map_err(|_| ParseError::NotInteger {
                value: raw.to_string(),
                reading: name,
            })
    };

    Ok(BloodPressure {
        systolic: reading(systolic, "systolic")?,
        diastolic: reading(diastolic, "diastolic")?,
    })
}

/// Sleep ratios relative to self-reported sleep quality
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SleepMetrics {
    pub sleep_efficiency: f64,
    pub stress_impact: f64,
}

/// Compute sleep efficiency and stress impact.
///
/// The division is unguarded: a sleep quality of zero yields non-finite
/// ratios, which callers detect through [`DerivedFeatureSet::non_finite_columns`].
pub fn calculate_sleep_metrics(
    sleep_duration: f64,
    quality_of_sleep: f64,
    stress_level: f64,
) -> SleepMetrics {
    SleepMetrics {
        sleep_efficiency: sleep_duration / quality_of_sleep,
        stress_impact: stress_level / quality_of_sleep,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExerciseIntensity {
    Low,
    Middle,
    #[serde(rename = "Middle High")]
    MiddleHigh,
    High,
}

impl ExerciseIntensity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseIntensity::Low => "Low",
            ExerciseIntensity::Middle => "Middle",
            ExerciseIntensity::MiddleHigh => "Middle High",
            ExerciseIntensity::High => "High",
        }
    }
}

/// Bucket daily activity minutes into an exercise intensity
pub fn add_exercise_intensity(physical_activity_level: f64) -> ExerciseIntensity {
    if physical_activity_level <= LOW_ACTIVITY_MAX {
        ExerciseIntensity::Low
    } else if physical_activity_level <= MIDDLE_ACTIVITY_MAX {
        ExerciseIntensity::Middle
    } else if physical_activity_level <= MIDDLE_HIGH_ACTIVITY_MAX {
        ExerciseIntensity::MiddleHigh
    } else {
        ExerciseIntensity::High
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AgeSegment {
    Young,
    #[serde(rename = "Middle-aged")]
    MiddleAged,
    Old,
    #[serde(rename = "Very Old")]
    VeryOld,
}

impl AgeSegment {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeSegment::Young => "Young",
            AgeSegment::MiddleAged => "Middle-aged",
            AgeSegment::Old => "Old",
            AgeSegment::VeryOld => "Very Old",
        }
    }
}

/// Bucket age into half-open segments; `None` outside `[26, 60)`
pub fn segment_age(age: i64) -> Option<AgeSegment> {
    match age {
        26..=34 => Some(AgeSegment::Young),
        35..=42 => Some(AgeSegment::MiddleAged),
        43..=49 => Some(AgeSegment::Old),
        50..=59 => Some(AgeSegment::VeryOld),
        _ => None,
    }
}

/// A single named value of the derived feature set
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue {
    Numeric(f64),
    /// Categorical value; `None` when the category is unassigned
    Categorical(Option<&'static str>),
}

/// Request fields plus derived columns, as consumed by the fitted pipeline.
/// `Person_ID` and the raw `Blood_Pressure` string are not carried over.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedFeatureSet {
    #[serde(rename = "Gender")]
    pub gender: Gender,
    #[serde(rename = "Age")]
    pub age: i64,
    #[serde(rename = "Occupation")]
    pub occupation: Occupation,
    #[serde(rename = "Sleep_Duration")]
    pub sleep_duration: f64,
    #[serde(rename = "Quality_of_Sleep")]
    pub quality_of_sleep: f64,
    #[serde(rename = "Physical_Activity_Level")]
    pub physical_activity_level: f64,
    #[serde(rename = "Stress_Level")]
    pub stress_level: f64,
    #[serde(rename = "BMI_Category")]
    pub bmi_category: BmiCategory,
    #[serde(rename = "Heart_Rate")]
    pub heart_rate: f64,
    #[serde(rename = "Daily_Steps")]
    pub daily_steps: i64,
    #[serde(rename = "BP_Systolic")]
    pub bp_systolic: i64,
    #[serde(rename = "BP_Diastolic")]
    pub bp_diastolic: i64,
    #[serde(rename = "Sleep_Efficiency")]
    pub sleep_efficiency: f64,
    #[serde(rename = "Stress_Impact")]
    pub stress_impact: f64,
    #[serde(rename = "Exercise_Intensity")]
    pub exercise_intensity: ExerciseIntensity,
    #[serde(rename = "Age_Segment")]
    pub age_segment: Option<AgeSegment>,
}

impl DerivedFeatureSet {
    /// Number of addressable columns
    pub const WIDTH: usize = 16;

    /// Column names, in the order [`DerivedFeatureSet::columns`] yields them
    pub const COLUMN_NAMES: [&'static str; Self::WIDTH] = [
        fields::GENDER,
        fields::AGE,
        fields::OCCUPATION,
        fields::SLEEP_DURATION,
        fields::QUALITY_OF_SLEEP,
        fields::PHYSICAL_ACTIVITY_LEVEL,
        fields::STRESS_LEVEL,
        fields::BMI_CATEGORY,
        fields::HEART_RATE,
        fields::DAILY_STEPS,
        columns::BP_SYSTOLIC,
        columns::BP_DIASTOLIC,
        columns::SLEEP_EFFICIENCY,
        columns::STRESS_IMPACT,
        columns::EXERCISE_INTENSITY,
        columns::AGE_SEGMENT,
    ];

    /// All columns with their values, in derivation order
    pub fn columns(&self) -> [(&'static str, FeatureValue); Self::WIDTH] {
        use FeatureValue::{Categorical as Cat, Numeric as Num};
        [
            (fields::GENDER, Cat(Some(self.gender.as_str()))),
            (fields::AGE, Num(self.age as f64)),
            (fields::OCCUPATION, Cat(Some(self.occupation.as_str()))),
            (fields::SLEEP_DURATION, Num(self.sleep_duration)),
            (fields::QUALITY_OF_SLEEP, Num(self.quality_of_sleep)),
            (fields::PHYSICAL_ACTIVITY_LEVEL, Num(self.physical_activity_level)),
            (fields::STRESS_LEVEL, Num(self.stress_level)),
            (fields::BMI_CATEGORY, Cat(Some(self.bmi_category.as_str()))),
            (fields::HEART_RATE, Num(self.heart_rate)),
            (fields::DAILY_STEPS, Num(self.daily_steps as f64)),
            (columns::BP_SYSTOLIC, Num(self.bp_systolic as f64)),
            (columns::BP_DIASTOLIC, Num(self.bp_diastolic as f64)),
            (columns::SLEEP_EFFICIENCY, Num(self.sleep_efficiency)),
            (columns::STRESS_IMPACT, Num(self.stress_impact)),
            (columns::EXERCISE_INTENSITY, Cat(Some(self.exercise_intensity.as_str()))),
            (columns::AGE_SEGMENT, Cat(self.age_segment.map(|s| s.as_str()))),
        ]
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<FeatureValue> {
        self.columns()
            .into_iter()
            .find(|(column, _)| *column == name)
            .map(|(_, value)| value)
    }

    /// Names of numeric columns holding NaN or infinity
    pub fn non_finite_columns(&self) -> Vec<&'static str> {
        self.columns()
            .into_iter()
            .filter_map(|(name, value)| match value {
                FeatureValue::Numeric(v) if !v.is_finite() => Some(name),
                _ => None,
            })
            .collect()
    }
}

/// Run every derivation step, in order, over a validated request
pub fn derive_features(request: &PredictionRequest) -> Result<DerivedFeatureSet, ParseError> {
    let blood_pressure = split_blood_pressure(&request.blood_pressure)?;
    let sleep = calculate_sleep_metrics(
        request.sleep_duration,
        request.quality_of_sleep,
        request.stress_level,
    );
    let exercise_intensity = add_exercise_intensity(request.physical_activity_level);
    let age_segment = segment_age(request.age);

    Ok(DerivedFeatureSet {
        gender: request.gender,
        age: request.age,
        occupation: request.occupation,
        sleep_duration: request.sleep_duration,
        quality_of_sleep: request.quality_of_sleep,
        physical_activity_level: request.physical_activity_level,
        stress_level: request.stress_level,
        bmi_category: request.bmi_category,
        heart_rate: request.heart_rate,
        daily_steps: request.daily_steps,
        bp_systolic: blood_pressure.systolic,
        bp_diastolic: blood_pressure.diastolic,
        sleep_efficiency: sleep.sleep_efficiency,
        stress_impact: sleep.stress_impact,
        exercise_intensity,
        age_segment,
    })
}
