//! Mapping from classifier output codes to sleep disorder labels

use serde::{Deserialize, Serialize};

/// Classifier returned a code with no associated label
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("classifier returned unknown class code {0}")]
pub struct MappingError(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SleepDisorder {
    #[serde(rename = "None Sleep")]
    NoneSleep,
    #[serde(rename = "Sleep Apnea")]
    SleepApnea,
    Insomnia,
}

impl SleepDisorder {
    pub const ALL: [SleepDisorder; 3] = [
        SleepDisorder::NoneSleep,
        SleepDisorder::SleepApnea,
        SleepDisorder::Insomnia,
    ];

    pub fn from_code(code: i64) -> Result<Self, MappingError> {
        match code {
            0 => Ok(SleepDisorder::NoneSleep),
            1 => Ok(SleepDisorder::SleepApnea),
            2 => Ok(SleepDisorder::Insomnia),
            other => Err(MappingError(other)),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            SleepDisorder::NoneSleep => 0,
            SleepDisorder::SleepApnea => 1,
            SleepDisorder::Insomnia => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SleepDisorder::NoneSleep => "None Sleep",
            SleepDisorder::SleepApnea => "Sleep Apnea",
            SleepDisorder::Insomnia => "Insomnia",
        }
    }
}

impl std::fmt::Display for SleepDisorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
