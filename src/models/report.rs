use serde::Deserialize;

/// Body of `POST /api/send-report`.
///
/// Every field is optional on the wire so that a missing email or report can
/// be answered with a specific 400 instead of a generic decode failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub email: Option<String>,
    pub report_data: Option<ReportData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportData {
    /// Positional slots: disease name, description, related issues, risk factors.
    pub results: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub treatments: Option<Vec<String>>,
}

/// The four descriptive fields of an analysis, by name.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Diagnosis {
    pub disease_name: Option<String>,
    pub description: Option<String>,
    pub related_issues: Option<String>,
    pub risk_factors: Option<String>,
}

impl Diagnosis {
    /// Map the positional `results` array onto named fields. Missing, null
    /// and empty slots all become `None`; anything past the fourth is ignored.
    pub fn from_results(results: &[Option<String>]) -> Self {
        let slot = |i: usize| {
            results
                .get(i)
                .cloned()
                .flatten()
                .filter(|s| !s.is_empty())
        };
        Diagnosis {
            disease_name: slot(0),
            description: slot(1),
            related_issues: slot(2),
            risk_factors: slot(3),
        }
    }
}

/// A validated report ready for rendering.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Report {
    pub diagnosis: Diagnosis,
    pub treatments: Vec<String>,
}

impl Report {
    /// `None` when the request carries no `results` array.
    pub fn from_data(data: ReportData) -> Option<Self> {
        let results = data.results?;
        Some(Report {
            diagnosis: Diagnosis::from_results(&results),
            treatments: data.treatments.unwrap_or_default(),
        })
    }
}
