//! Detection Report Model

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::lenient;

/// Declares a label enum that round-trips through its display string.
///
/// Labels outside the known set are kept verbatim in `Other` so a provider's
/// wording is never lost on the way back to the caller.
macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// Label outside the known set
            Other(String),
        }

        impl $name {
            /// Label as sent on the wire
            pub fn as_str(&self) -> &str {
                match self {
                    $( $name::$variant => $label, )+
                    $name::Other(label) => label.as_str(),
                }
            }
        }

        impl From<String> for $name {
            fn from(label: String) -> Self {
                match label.as_str() {
                    $( $label => $name::$variant, )+
                    _ => $name::Other(label),
                }
            }
        }

        impl From<&str> for $name {
            fn from(label: &str) -> Self {
                $name::from(label.to_string())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                match value {
                    $name::Other(label) => label,
                    known => known.as_str().to_string(),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

labelled_enum! {
    /// Damage severity
    Severity {
        /// Dangerous or large damage
        High => "HIGH",
        /// Needs attention
        Medium => "MEDIUM",
        /// Minor wear
        Low => "LOW",
    }
}

labelled_enum! {
    /// Road classification
    RoadType {
        NationalHighway => "National Highway",
        StateHighway => "State Highway",
        DistrictRoad => "District Road",
        UrbanRoad => "Urban Road",
        RuralRoad => "Rural Road",
    }
}

labelled_enum! {
    /// Overall surface condition, best to worst
    RoadCondition {
        Excellent => "Excellent",
        Good => "Good",
        Fair => "Fair",
        Poor => "Poor",
        VeryPoor => "Very Poor",
    }
}

labelled_enum! {
    /// Overall risk for road users
    RiskLevel {
        Critical => "Critical",
        High => "High",
        Moderate => "Moderate",
        Low => "Low",
    }
}

impl Severity {
    /// Sort rank: HIGH(1) < MEDIUM(2) < LOW(3) < anything else(4)
    pub fn rank(&self) -> u8 {
        match self {
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
            Severity::Other(_) => 4,
        }
    }
}

/// Rank of a missing severity
const UNRANKED: u8 = 4;

/// Single piece of road damage found in the image.
///
/// Every field is optional on input and read leniently; keys the model adds
/// beyond these are carried through in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    /// Sequence position; assigned by [`Analysis::normalize`] when absent
    #[serde(
        default,
        deserialize_with = "lenient::index",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<u32>,

    #[serde(
        default,
        deserialize_with = "lenient::label",
        skip_serializing_if = "Option::is_none"
    )]
    pub severity: Option<Severity>,

    /// Detection confidence (0-1)
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence: Option<f64>,

    /// pothole, crack, surface damage, ...
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub damage_type: Option<String>,

    /// small, medium or large
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub estimated_size: Option<String>,

    /// Where in the image the damage is
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<String>,

    /// shallow, moderate or deep
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub estimated_depth: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Detection {
    /// Sort rank; detections without a severity rank last
    pub fn rank(&self) -> u8 {
        self.severity.as_ref().map_or(UNRANKED, Severity::rank)
    }
}

/// Stable sort by [`Detection::rank`]
pub fn sort_by_severity(detections: &mut [Detection]) {
    detections.sort_by_key(Detection::rank);
}

/// Provider's findings for one image, before request data is attached
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    /// Derived from `detections`; the provider's value is discarded
    #[serde(default, deserialize_with = "lenient::ignored")]
    pub has_potholes: bool,

    /// Derived from `detections`; the provider's value is discarded
    #[serde(default, deserialize_with = "lenient::ignored")]
    pub total_potholes: usize,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub detections: Vec<Detection>,

    #[serde(
        default,
        deserialize_with = "lenient::label",
        skip_serializing_if = "Option::is_none"
    )]
    pub road_type: Option<RoadType>,

    #[serde(
        default,
        deserialize_with = "lenient::label",
        skip_serializing_if = "Option::is_none"
    )]
    pub road_condition: Option<RoadCondition>,

    #[serde(
        default,
        deserialize_with = "lenient::label",
        skip_serializing_if = "Option::is_none"
    )]
    pub overall_risk_level: Option<RiskLevel>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Detection>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Detection>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Analysis {
    /// Bring the analysis into its invariant form.
    ///
    /// Detections without an id get their 1-based position in the reply,
    /// then the list is sorted by severity and the counters are derived from
    /// it, whatever the provider claimed.
    pub fn normalize(&mut self) {
        for (index, detection) in self.detections.iter_mut().enumerate() {
            if detection.id.is_none() {
                detection.id = Some(index as u32 + 1);
            }
        }

        sort_by_severity(&mut self.detections);

        self.total_potholes = self.detections.len();
        self.has_potholes = self.total_potholes > 0;
    }

    /// Number of detections with the given severity
    pub fn count_severity(&self, severity: &Severity) -> usize {
        self.detections
            .iter()
            .filter(|d| d.severity.as_ref() == Some(severity))
            .count()
    }
}

/// JSON contract returned by the detect endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionReport {
    pub success: bool,

    #[serde(flatten)]
    pub analysis: Analysis,

    /// Caller-supplied location, passed through untouched
    pub location: Value,
}

impl DetectionReport {
    /// Build a successful report from a provider analysis
    pub fn new(mut analysis: Analysis, location: Value) -> Self {
        analysis.normalize();
        // Report-level keys are ours, not the model's
        analysis.extra.remove("success");
        analysis.extra.remove("location");
        Self {
            success: true,
            analysis,
            location,
        }
    }
}

/// Result of checking whether an image shows a road
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub is_valid: bool,

    #[serde(default, deserialize_with = "lenient::string")]
    pub reason: String,
}

impl Verification {
    /// Verdict used when verification is not performed
    pub fn accepted() -> Self {
        Self {
            is_valid: true,
            reason: "Image accepted".to_string(),
        }
    }
}
