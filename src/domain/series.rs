// Series metadata domain model
use super::telemetry::{AggregateBucket, Terms};
use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    #[error("series {code}: unknown value type '{value_type}'")]
    UnknownValueType { code: String, value_type: String },
    #[error("series {code}: {reason}")]
    MissingField { code: String, reason: &'static str },
    #[error("unknown metadata node type '{0}'")]
    UnknownNodeType(String),
    #[error("invalid metadata entry: {0}")]
    Invalid(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RecordError {
    #[error("record has no field '{0}'")]
    MissingField(String),
    #[error("field '{0}' is not numeric")]
    NotNumeric(String),
    #[error("unparsable timestamp '{0}'")]
    BadTimestamp(String),
}

/// Raw metadata entry as served by the metadata endpoint.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
struct SeriesMetaDoc {
    value_code: Option<String>,
    value_name: Option<String>,
    #[serde(default = "default_value_type")]
    value_type: String,
    query_timestamp_field: String,
    value_field: Option<String>,
    value_fields: Option<Vec<String>>,
    smoothing: Option<SmoothingDoc>,
    plot_opts: Option<PlotOptsDoc>,
    #[serde(default = "default_show")]
    show: bool,
    query_model: String,
    #[serde(default)]
    query_filter: Vec<(String, Value)>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
struct SmoothingDoc {
    sigma_seconds: f64,
}

#[derive(Debug, Deserialize, Clone)]
struct PlotOptsDoc {
    xaxis: Option<XAxisDoc>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
struct XAxisDoc {
    max_continuous_data_gap: Option<f64>,
}

fn default_value_type() -> String {
    "Scalar".to_string()
}

fn default_show() -> bool {
    true
}

/// Pulls a display value out of a live record or a historical bucket.
pub trait ValueExtraction {
    fn from_record(&self, fields: &Map<String, Value>) -> Result<Terms, RecordError>;
    fn from_bucket(&self, bucket: &AggregateBucket) -> Option<Terms>;

    /// False when `from_bucket` can only return the bucket value with a unit
    /// denominator, not the numerator/denominator sums live records carry.
    fn bucket_has_sums(&self, _bucket: &AggregateBucket) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarValue {
    pub value_field: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatioValue {
    pub numerator_field: String,
    pub denominator_field: String,
}

impl ValueExtraction for ScalarValue {
    fn from_record(&self, fields: &Map<String, Value>) -> Result<Terms, RecordError> {
        Ok(Terms::scalar(numeric_field(fields, &self.value_field)?))
    }

    fn from_bucket(&self, bucket: &AggregateBucket) -> Option<Terms> {
        (bucket.count > 0).then(|| Terms::scalar(bucket.mean()))
    }
}

impl ValueExtraction for RatioValue {
    fn from_record(&self, fields: &Map<String, Value>) -> Result<Terms, RecordError> {
        Ok(Terms::ratio(
            numeric_field(fields, &self.numerator_field)?,
            numeric_field(fields, &self.denominator_field)?,
        ))
    }

    fn from_bucket(&self, bucket: &AggregateBucket) -> Option<Terms> {
        match bucket.ratio {
            Some(sums) => Some(Terms::ratio(sums.numerator, sums.denominator)),
            None => (bucket.count > 0).then(|| Terms::scalar(bucket.mean())),
        }
    }

    fn bucket_has_sums(&self, bucket: &AggregateBucket) -> bool {
        bucket.ratio.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SeriesKind {
    Scalar(ScalarValue),
    Ratio(RatioValue),
}

impl SeriesKind {
    pub fn extraction(&self) -> &dyn ValueExtraction {
        match self {
            SeriesKind::Scalar(v) => v,
            SeriesKind::Ratio(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmoothingConfig {
    pub sigma_ms: f64,
}

/// Immutable per-series configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesMeta {
    pub code: String,
    pub name: String,
    pub kind: SeriesKind,
    pub timestamp_field: String,
    pub smoothing: Option<SmoothingConfig>,
    pub max_continuous_data_gap_ms: Option<f64>,
    pub topic: String,
    pub show: bool,
}

impl SeriesMeta {
    /// Extract `(timestamp, terms)` from a live record.
    pub fn read_record(&self, fields: &Map<String, Value>) -> Result<(f64, Terms), RecordError> {
        let raw_time = fields
            .get(&self.timestamp_field)
            .ok_or_else(|| RecordError::MissingField(self.timestamp_field.clone()))?;
        let time_ms = parse_timestamp(raw_time)?;
        let terms = self.kind.extraction().from_record(fields)?;
        Ok((time_ms, terms))
    }
}

/// Parse a metadata document: either a flat array of series entries or a
/// `Group` tree whose leaves are series entries.
pub fn parse_meta_document(doc: &Value) -> Result<Vec<SeriesMeta>, MetaError> {
    let mut entries = Vec::new();
    flatten_meta(doc, &mut entries)?;
    entries.into_iter().map(series_meta_from_value).collect()
}

fn flatten_meta<'a>(node: &'a Value, out: &mut Vec<&'a Value>) -> Result<(), MetaError> {
    match node {
        Value::Array(members) => {
            for member in members {
                flatten_meta(member, out)?;
            }
            Ok(())
        }
        Value::Object(obj) => match obj.get("type").and_then(Value::as_str) {
            Some("Group") => match obj.get("members") {
                Some(members) => flatten_meta(members, out),
                None => Ok(()),
            },
            None | Some("TimeSeries") => {
                out.push(node);
                Ok(())
            }
            Some(other) => Err(MetaError::UnknownNodeType(other.to_string())),
        },
        other => Err(MetaError::UnknownNodeType(other.to_string())),
    }
}

fn series_meta_from_value(value: &Value) -> Result<SeriesMeta, MetaError> {
    let doc: SeriesMetaDoc = serde_json::from_value(value.clone())?;

    let code = doc
        .value_code
        .clone()
        .or_else(|| doc.value_field.clone())
        .ok_or_else(|| MetaError::MissingField {
            code: "?".to_string(),
            reason: "neither valueCode nor valueField is set",
        })?;

    // Accept qualified names like "pkg.value.Ratio".
    let type_name = doc.value_type.rsplit('.').next().unwrap_or_default();
    let kind = match type_name {
        "Scalar" => SeriesKind::Scalar(ScalarValue {
            value_field: doc.value_field.clone().ok_or_else(|| MetaError::MissingField {
                code: code.clone(),
                reason: "Scalar series requires valueField",
            })?,
        }),
        "Ratio" => match doc.value_fields.as_deref() {
            Some([num, denom]) => SeriesKind::Ratio(RatioValue {
                numerator_field: num.clone(),
                denominator_field: denom.clone(),
            }),
            _ => {
                return Err(MetaError::MissingField {
                    code,
                    reason: "Ratio series requires exactly two valueFields",
                });
            }
        },
        _ => {
            return Err(MetaError::UnknownValueType {
                code,
                value_type: doc.value_type.clone(),
            });
        }
    };

    let topic = feed_topic(&doc.query_model, &doc.query_filter);
    Ok(SeriesMeta {
        name: doc.value_name.unwrap_or_else(|| code.clone()),
        code,
        kind,
        timestamp_field: doc.query_timestamp_field,
        smoothing: doc.smoothing.map(|s| SmoothingConfig {
            sigma_ms: s.sigma_seconds * 1000.0,
        }),
        max_continuous_data_gap_ms: doc
            .plot_opts
            .and_then(|p| p.xaxis)
            .and_then(|x| x.max_continuous_data_gap),
        topic,
        show: doc.show,
    })
}

/// Live feed topic: `queryModel` followed by `.value` for each filter, then `:`.
pub fn feed_topic(query_model: &str, filter: &[(String, Value)]) -> String {
    let mut topic = query_model.to_string();
    for (_, value) in filter {
        topic.push('.');
        match value {
            Value::String(s) => topic.push_str(s),
            other => topic.push_str(&other.to_string()),
        }
    }
    topic.push(':');
    topic
}

fn numeric_field(fields: &Map<String, Value>, name: &str) -> Result<f64, RecordError> {
    match fields.get(name) {
        None | Some(Value::Null) => Err(RecordError::MissingField(name.to_string())),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| RecordError::NotNumeric(name.to_string())),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| RecordError::NotNumeric(name.to_string())),
        Some(_) => Err(RecordError::NotNumeric(name.to_string())),
    }
}

/// Numbers are epoch milliseconds; strings are ISO-8601, UTC when no offset.
pub fn parse_timestamp(value: &Value) -> Result<f64, RecordError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| RecordError::BadTimestamp(n.to_string())),
        Value::String(s) => {
            if let Ok(time) = DateTime::parse_from_rfc3339(s) {
                return Ok(time.timestamp_millis() as f64);
            }
            for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                    return Ok(naive.and_utc().timestamp_millis() as f64);
                }
            }
            Err(RecordError::BadTimestamp(s.clone()))
        }
        other => Err(RecordError::BadTimestamp(other.to_string())),
    }
}
