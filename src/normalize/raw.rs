// src/normalize/raw.rs

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Status string the API returns when a request was fully served.
pub const REQUEST_SUCCEEDED: &str = "REQUEST_SUCCEEDED";

/// Top-level envelope of a `timeseries/data` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlsResponse {
    pub status: String,
    #[serde(rename = "responseTime", default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(default)]
    pub message: Vec<String>,
    #[serde(rename = "Results", default, skip_serializing_if = "Option::is_none")]
    pub results: Option<RawResults>,
}

impl BlsResponse {
    /// Wrap already-decoded series in a successful envelope.
    pub fn from_series(series: Vec<RawSeries>) -> Self {
        Self {
            status: REQUEST_SUCCEEDED.to_string(),
            response_time: None,
            message: Vec::new(),
            results: Some(RawResults { series }),
        }
    }

    /// All series in the response; empty when the `Results` container is absent.
    pub fn series(&self) -> &[RawSeries] {
        self.results
            .as_ref()
            .map(|r| r.series.as_slice())
            .unwrap_or(&[])
    }

    pub fn succeeded(&self) -> bool {
        self.status == REQUEST_SUCCEEDED
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResults {
    pub series: Vec<RawSeries>,
}

/// One series object from `Results.series`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSeries {
    #[serde(rename = "seriesID", default, skip_serializing_if = "Option::is_none")]
    pub series_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<RawCatalog>,
    pub data: Vec<RawObservation>,
}

/// Descriptive metadata, only present when the request asked for `catalog`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCatalog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub survey_name: Option<String>,
    /// Remaining catalog fields (seasonality, area, ...) kept verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A single per-period record inside `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    #[serde(deserialize_with = "text_or_number")]
    pub year: String,
    pub period: String,
    #[serde(rename = "periodName", default, skip_serializing_if = "Option::is_none")]
    pub period_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
    #[serde(deserialize_with = "text_or_number")]
    pub value: String,
    #[serde(default, deserialize_with = "lenient_footnotes")]
    pub footnotes: Vec<RawFootnote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculations: Option<serde_json::Value>,
    /// Only present when the request asked for `aspects`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspects: Option<serde_json::Value>,
}

/// Footnote entries arrive as `{}` when empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFootnote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl RawObservation {
    /// Join the text of every non-empty footnote with `,`.
    pub fn joined_footnotes(&self) -> String {
        self.footnotes
            .iter()
            .filter_map(|f| f.text.as_deref())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(serde_json::Number),
}

/// Years and values are strings on the wire, but accept bare numbers too.
fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match TextOrNumber::deserialize(deserializer)? {
        TextOrNumber::Text(s) => s,
        TextOrNumber::Number(n) => n.to_string(),
    })
}

/// `"footnotes": null` reads as no footnotes; `null` entries are dropped.
fn lenient_footnotes<'de, D>(deserializer: D) -> Result<Vec<RawFootnote>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Option::<Vec<Option<RawFootnote>>>::deserialize(deserializer)?;
    Ok(entries.into_iter().flatten().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    const SAMPLE: &str = r#"{
        "status": "REQUEST_SUCCEEDED",
        "responseTime": 112,
        "message": [],
        "Results": {
            "series": [{
                "seriesID": "LNS14000000",
                "catalog": {
                    "series_title": "(Seas) Unemployment Rate",
                    "survey_name": "Labor Force Statistics from the Current Population Survey",
                    "seasonality": "Seasonally Adjusted"
                },
                "data": [
                    {
                        "year": "2024",
                        "period": "M02",
                        "periodName": "February",
                        "latest": "true",
                        "value": "3.9",
                        "footnotes": [{"code": "P", "text": "preliminary"}, {}]
                    },
                    {
                        "year": 2024,
                        "period": "M01",
                        "periodName": "January",
                        "value": 3.7,
                        "footnotes": [{}]
                    }
                ]
            }]
        }
    }"#;

    #[test]
    fn decodes_api_envelope() -> Result<()> {
        let resp: BlsResponse = serde_json::from_str(SAMPLE)?;
        assert!(resp.succeeded());
        assert_eq!(resp.response_time, Some(112));

        let series = resp.series();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].series_id.as_deref(), Some("LNS14000000"));

        let catalog = series[0].catalog.as_ref().expect("catalog present");
        assert_eq!(catalog.series_title.as_deref(), Some("(Seas) Unemployment Rate"));
        assert!(catalog.extra.contains_key("seasonality"));

        let first = &series[0].data[0];
        assert_eq!(first.joined_footnotes(), "preliminary");
        assert_eq!(first.latest.as_deref(), Some("true"));

        // numeric year/value are accepted and kept as text
        let second = &series[0].data[1];
        assert_eq!(second.year, "2024");
        assert_eq!(second.value, "3.7");
        assert_eq!(second.joined_footnotes(), "");
        Ok(())
    }

    #[test]
    fn rejects_observation_without_period() {
        let bad = r#"{"status":"REQUEST_SUCCEEDED","Results":{"series":[
            {"seriesID":"X","data":[{"year":"2024","value":"1","footnotes":[]}]}
        ]}}"#;
        assert!(serde_json::from_str::<BlsResponse>(bad).is_err());
    }

    #[test]
    fn missing_results_yields_no_series() -> Result<()> {
        let resp: BlsResponse = serde_json::from_str(
            r#"{"status":"REQUEST_NOT_PROCESSED","message":["daily threshold reached"]}"#,
        )?;
        assert!(!resp.succeeded());
        assert!(resp.series().is_empty());
        assert_eq!(resp.message, vec!["daily threshold reached".to_string()]);
        Ok(())
    }

    #[test]
    fn joins_multiple_footnotes_in_order() {
        let obs = RawObservation {
            year: "2023".into(),
            period: "M05".into(),
            period_name: None,
            latest: None,
            value: "1".into(),
            footnotes: vec![
                RawFootnote {
                    code: Some("P".into()),
                    text: Some("preliminary".into()),
                },
                RawFootnote::default(),
                RawFootnote {
                    code: None,
                    text: Some(String::new()),
                },
                RawFootnote {
                    code: Some("R".into()),
                    text: Some("revised".into()),
                },
            ],
            calculations: None,
            aspects: None,
        };
        assert_eq!(obs.joined_footnotes(), "preliminary,revised");
    }

    #[test]
    fn tolerates_null_footnotes() -> Result<()> {
        let resp: BlsResponse = serde_json::from_str(
            r#"{"status":"REQUEST_SUCCEEDED","Results":{"series":[{"seriesID":"X","data":[
                {"year":"2024","period":"M02","value":"1","footnotes":null},
                {"year":"2024","period":"M01","value":"2","footnotes":[null,{"text":"revised"},null]},
                {"year":"2023","period":"M12","value":"3"}
            ]}]}}"#,
        )?;
        let data = &resp.series()[0].data;
        assert!(data[0].footnotes.is_empty());
        assert_eq!(data[1].footnotes.len(), 1);
        assert_eq!(data[1].joined_footnotes(), "revised");
        assert!(data[2].footnotes.is_empty());
        Ok(())
    }

    #[test]
    fn keeps_aspects_when_requested() -> Result<()> {
        let resp: BlsResponse = serde_json::from_str(
            r#"{"status":"REQUEST_SUCCEEDED","Results":{"series":[{"seriesID":"X","data":[
                {"year":"2024","period":"M01","value":"1","footnotes":[{}],
                 "aspects":[{"name":"Standard Error","value":"0.1"}]}
            ]}]}}"#,
        )?;
        let obs = &resp.series()[0].data[0];
        let aspects = obs.aspects.as_ref().expect("aspects present");
        assert_eq!(aspects[0]["name"], "Standard Error");
        Ok(())
    }
}
