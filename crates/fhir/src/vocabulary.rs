//! Selectable vital-sign codes.
//!
//! The entry form offers a fixed list of LOINC vital-sign codes rather than free text.
//! Each entry carries the display name shown in the form and the UCUM unit recorded in
//! `valueQuantity`.

/// LOINC code system URI.
pub const LOINC_SYSTEM: &str = "http://loinc.org";

/// UCUM code system URI.
pub const UCUM_SYSTEM: &str = "http://unitsofmeasure.org";

/// A vital sign that can be recorded through the entry form.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VitalSign {
    #[default]
    SystolicBloodPressure,
    DiastolicBloodPressure,
    HeartRate,
    RespiratoryRate,
    BodyTemperature,
    OxygenSaturation,
    BodyWeight,
    BodyHeight,
}

impl VitalSign {
    /// All selectable entries, in form order.
    pub const ALL: [VitalSign; 8] = [
        VitalSign::SystolicBloodPressure,
        VitalSign::DiastolicBloodPressure,
        VitalSign::HeartRate,
        VitalSign::RespiratoryRate,
        VitalSign::BodyTemperature,
        VitalSign::OxygenSaturation,
        VitalSign::BodyWeight,
        VitalSign::BodyHeight,
    ];

    /// LOINC code.
    pub fn code(self) -> &'static str {
        match self {
            VitalSign::SystolicBloodPressure => "8480-6",
            VitalSign::DiastolicBloodPressure => "8462-4",
            VitalSign::HeartRate => "8867-4",
            VitalSign::RespiratoryRate => "9279-1",
            VitalSign::BodyTemperature => "8310-5",
            VitalSign::OxygenSaturation => "2708-6",
            VitalSign::BodyWeight => "29463-7",
            VitalSign::BodyHeight => "8302-2",
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            VitalSign::SystolicBloodPressure => "Systolic blood pressure",
            VitalSign::DiastolicBloodPressure => "Diastolic blood pressure",
            VitalSign::HeartRate => "Heart rate",
            VitalSign::RespiratoryRate => "Respiratory rate",
            VitalSign::BodyTemperature => "Body temperature",
            VitalSign::OxygenSaturation => "Oxygen saturation",
            VitalSign::BodyWeight => "Body weight",
            VitalSign::BodyHeight => "Body height",
        }
    }

    /// UCUM unit code.
    pub fn unit(self) -> &'static str {
        match self {
            VitalSign::SystolicBloodPressure | VitalSign::DiastolicBloodPressure => "mm[Hg]",
            VitalSign::HeartRate | VitalSign::RespiratoryRate => "/min",
            VitalSign::BodyTemperature => "Cel",
            VitalSign::OxygenSaturation => "%",
            VitalSign::BodyWeight => "kg",
            VitalSign::BodyHeight => "cm",
        }
    }

    /// Look up an entry by its LOINC code.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL.into_iter().find(|v| v.code() == code)
    }
}
