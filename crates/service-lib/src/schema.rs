//! Input schema for prediction requests
//!
//! Parses a JSON payload into a typed [`PredictionRequest`]. Every field is
//! checked and all violations are reported together, so a caller sees the
//! full list of problems with a payload in one response.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON field names of a prediction request
pub mod fields {
    pub const PERSON_ID: &str = "Person_ID";
    pub const GENDER: &str = "Gender";
    pub const AGE: &str = "Age";
    pub const OCCUPATION: &str = "Occupation";
    pub const SLEEP_DURATION: &str = "Sleep_Duration";
    pub const QUALITY_OF_SLEEP: &str = "Quality_of_Sleep";
    pub const PHYSICAL_ACTIVITY_LEVEL: &str = "Physical_Activity_Level";
    pub const STRESS_LEVEL: &str = "Stress_Level";
    pub const BMI_CATEGORY: &str = "BMI_Category";
    pub const BLOOD_PRESSURE: &str = "Blood_Pressure";
    pub const HEART_RATE: &str = "Heart_Rate";
    pub const DAILY_STEPS: &str = "Daily_Steps";

    /// Pseudo-field used when the payload as a whole is unusable
    pub const BODY: &str = "body";
}

/// A closed set of string values accepted by a request field
pub trait Categorical: Sized + Copy + 'static {
    /// Every accepted value, in declaration order
    const VALUES: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn parse(value: &str) -> Option<Self> {
        Self::VALUES.iter().copied().find(|v| v.as_str() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Categorical for Gender {
    const VALUES: &'static [Self] = &[Gender::Male, Gender::Female];

    fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Occupation {
    #[serde(rename = "Software Engineer")]
    SoftwareEngineer,
    Doctor,
    #[serde(rename = "Sales Representative")]
    SalesRepresentative,
    Teacher,
    Nurse,
    Engineer,
    Accountant,
    Scientist,
    Lawyer,
    Salesperson,
    Manager,
}

impl Categorical for Occupation {
    const VALUES: &'static [Self] = &[
        Occupation::SoftwareEngineer,
        Occupation::Doctor,
        Occupation::SalesRepresentative,
        Occupation::Teacher,
        Occupation::Nurse,
        Occupation::Engineer,
        Occupation::Accountant,
        Occupation::Scientist,
        Occupation::Lawyer,
        Occupation::Salesperson,
        Occupation::Manager,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Occupation::SoftwareEngineer => "Software Engineer",
            Occupation::Doctor => "Doctor",
            Occupation::SalesRepresentative => "Sales Representative",
            Occupation::Teacher => "Teacher",
            Occupation::Nurse => "Nurse",
            Occupation::Engineer => "Engineer",
            Occupation::Accountant => "Accountant",
            Occupation::Scientist => "Scientist",
            Occupation::Lawyer => "Lawyer",
            Occupation::Salesperson => "Salesperson",
            Occupation::Manager => "Manager",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BmiCategory {
    Overweight,
    Normal,
    Obese,
}

impl Categorical for BmiCategory {
    const VALUES: &'static [Self] = &[
        BmiCategory::Overweight,
        BmiCategory::Normal,
        BmiCategory::Obese,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            BmiCategory::Overweight => "Overweight",
            BmiCategory::Normal => "Normal",
            BmiCategory::Obese => "Obese",
        }
    }
}

/// One validated prediction request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRequest {
    #[serde(rename = "Person_ID")]
    pub person_id: i64,
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
    #[serde(rename = "Blood_Pressure")]
    pub blood_pressure: String,
    #[serde(rename = "Heart_Rate")]
    pub heart_rate: f64,
    #[serde(rename = "Daily_Steps")]
    pub daily_steps: i64,
}

/// Category of a single field violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    Missing,
    Type,
    Range,
    Enum,
    Format,
    Json,
    NonFinite,
}

/// A violation attributed to one request field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub kind: FieldErrorKind,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, kind: FieldErrorKind, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind,
            message: message.into(),
        }
    }
}

/// Aggregate of every field violation found in a payload
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("request validation failed for {}", field_list(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    fn body(kind: FieldErrorKind, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::new(fields::BODY, kind, message)],
        }
    }

    /// Returns the error reported for `field`, if any
    pub fn get(&self, field: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.field == field)
    }
}

fn field_list(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Numeric bounds with independently open or closed ends
#[derive(Debug, Clone, Copy)]
struct Bounds {
    min: f64,
    min_inclusive: bool,
    max: f64,
    max_inclusive: bool,
}

impl Bounds {
    /// `min <= x <= max`
    const fn closed(min: f64, max: f64) -> Self {
        Self {
            min,
            min_inclusive: true,
            max,
            max_inclusive: true,
        }
    }

    /// `min < x <= max`
    const fn positive(min: f64, max: f64) -> Self {
        Self {
            min,
            min_inclusive: false,
            max,
            max_inclusive: true,
        }
    }

    fn check(&self, value: f64) -> Result<(), String> {
        if self.min_inclusive && value < self.min {
            return Err(format!("must be greater than or equal to {}", self.min));
        }
        if !self.min_inclusive && value <= self.min {
            return Err(format!("must be greater than {}", self.min));
        }
        if self.max_inclusive && value > self.max {
            return Err(format!("must be less than or equal to {}", self.max));
        }
        if !self.max_inclusive && value >= self.max {
            return Err(format!("must be less than {}", self.max));
        }
        Ok(())
    }
}

const AGE_BOUNDS: Bounds = Bounds::closed(0.0, 100.0);
const SLEEP_DURATION_BOUNDS: Bounds = Bounds::positive(0.0, 10.0);
const QUALITY_OF_SLEEP_BOUNDS: Bounds = Bounds::closed(0.0, 10.0);
const PHYSICAL_ACTIVITY_BOUNDS: Bounds = Bounds::closed(0.0, 100.0);
const STRESS_LEVEL_BOUNDS: Bounds = Bounds::closed(0.0, 10.0);
const HEART_RATE_BOUNDS: Bounds = Bounds::positive(0.0, 100.0);
const DAILY_STEPS_BOUNDS: Bounds = Bounds::closed(0.0, 20000.0);

/// Numeric text as sent by form-style clients; NaN and infinity are not numbers here
fn parse_finite(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Integral floats such as `27.0` count as integers
fn integral(value: f64) -> Option<i64> {
    (value.fract() == 0.0 && value.abs() < i64::MAX as f64).then_some(value as i64)
}

/// Reads typed fields out of a JSON object while accumulating violations.
/// Numeric fields also accept numeric strings (`"27"`, `" 6.1 "`).
struct FieldReader<'a> {
    object: &'a Map<String, Value>,
    errors: Vec<FieldError>,
}

impl<'a> FieldReader<'a> {
    fn new(object: &'a Map<String, Value>) -> Self {
        Self {
            object,
            errors: Vec::new(),
        }
    }

    fn reject(&mut self, field: &str, kind: FieldErrorKind, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, kind, message));
    }

    fn value(&mut self, field: &str) -> Option<&'a Value> {
        let object = self.object;
        match object.get(field) {
            None | Some(Value::Null) => {
                self.reject(field, FieldErrorKind::Missing, "field required");
                None
            }
            Some(value) => Some(value),
        }
    }

    fn integer(&mut self, field: &str, bounds: Option<Bounds>) -> Option<i64> {
        let value = self.value(field)?;
        let parsed = match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| parse_finite(s).and_then(integral))
            }
            _ => None,
        };
        let Some(parsed) = parsed else {
            self.reject(field, FieldErrorKind::Type, "must be an integer");
            return None;
        };
        if let Some(bounds) = bounds {
            if let Err(message) = bounds.check(parsed as f64) {
                self.reject(field, FieldErrorKind::Range, message);
                return None;
            }
        }
        Some(parsed)
    }

    fn number(&mut self, field: &str, bounds: Bounds) -> Option<f64> {
        let value = self.value(field)?;
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => parse_finite(s.trim()),
            _ => None,
        };
        let Some(parsed) = parsed else {
            self.reject(field, FieldErrorKind::Type, "must be a number");
            return None;
        };
        if let Err(message) = bounds.check(parsed) {
            self.reject(field, FieldErrorKind::Range, message);
            return None;
        }
        Some(parsed)
    }

    fn string(&mut self, field: &str) -> Option<&'a str> {
        let value = self.value(field)?;
        match value.as_str() {
            Some(s) => Some(s),
            None => {
                self.reject(field, FieldErrorKind::Type, "must be a string");
                None
            }
        }
    }

    fn category<T: Categorical>(&mut self, field: &str) -> Option<T> {
        let raw = self.string(field)?;
        match T::parse(raw) {
            Some(value) => Some(value),
            None => {
                let allowed = T::VALUES
                    .iter()
                    .map(|v| format!("'{}'", v.as_str()))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.reject(
                    field,
                    FieldErrorKind::Enum,
                    format!("'{}' is not one of {}", raw, allowed),
                );
                None
            }
        }
    }
}

impl PredictionRequest {
    /// Parse a raw request body. An empty body is treated as `{}`.
    pub fn from_slice(body: &[u8]) -> Result<Self, ValidationError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Self::from_json(&Value::Object(Map::new()));
        }
        let value: Value = serde_json::from_slice(body).map_err(|e| {
            ValidationError::body(FieldErrorKind::Json, format!("invalid JSON: {}", e))
        })?;
        Self::from_json(&value)
    }

    /// Validate a JSON value, reporting every offending field
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        let Some(object) = value.as_object() else {
            return Err(ValidationError::body(
                FieldErrorKind::Type,
                "request body must be a JSON object",
            ));
        };

        let mut reader = FieldReader::new(object);
        let person_id = reader.integer(fields::PERSON_ID, None);
        let gender = reader.category::<Gender>(fields::GENDER);
        let age = reader.integer(fields::AGE, Some(AGE_BOUNDS));
        let occupation = reader.category::<Occupation>(fields::OCCUPATION);
        let sleep_duration = reader.number(fields::SLEEP_DURATION, SLEEP_DURATION_BOUNDS);
        let quality_of_sleep = reader.number(fields::QUALITY_OF_SLEEP, QUALITY_OF_SLEEP_BOUNDS);
        let physical_activity_level =
            reader.number(fields::PHYSICAL_ACTIVITY_LEVEL, PHYSICAL_ACTIVITY_BOUNDS);
        let stress_level = reader.number(fields::STRESS_LEVEL, STRESS_LEVEL_BOUNDS);
        let bmi_category = reader.category::<BmiCategory>(fields::BMI_CATEGORY);
        let blood_pressure = reader.string(fields::BLOOD_PRESSURE);
        let heart_rate = reader.number(fields::HEART_RATE, HEART_RATE_BOUNDS);
        let daily_steps = reader.integer(fields::DAILY_STEPS, Some(DAILY_STEPS_BOUNDS));
        let errors = reader.errors;

        match (
            person_id,
            gender,
            age,
            occupation,
            sleep_duration,
            quality_of_sleep,
            physical_activity_level,
            stress_level,
            bmi_category,
            blood_pressure,
            heart_rate,
            daily_steps,
        ) {
            (
                Some(person_id),
                Some(gender),
                Some(age),
                Some(occupation),
                Some(sleep_duration),
                Some(quality_of_sleep),
                Some(physical_activity_level),
                Some(stress_level),
                Some(bmi_category),
                Some(blood_pressure),
                Some(heart_rate),
                Some(daily_steps),
            ) if errors.is_empty() => Ok(Self {
                person_id,
                gender,
                age,
                occupation,
                sleep_duration,
                quality_of_sleep,
                physical_activity_level,
                stress_level,
                bmi_category,
                blood_pressure: blood_pressure.to_string(),
                heart_rate,
                daily_steps,
            }),
            _ => Err(ValidationError { errors }),
        }
    }

    /// The sample payload published with the service's request schema
    pub fn example() -> Self {
        Self {
            person_id: 1,
            gender: Gender::Male,
            age: 27,
            occupation: Occupation::SoftwareEngineer,
            sleep_duration: 6.1,
            quality_of_sleep: 6.0,
            physical_activity_level: 42.0,
            stress_level: 6.0,
            bmi_category: BmiCategory::Overweight,
            blood_pressure: "126/83".to_string(),
            heart_rate: 77.0,
            daily_steps: 4200,
        }
    }
}
