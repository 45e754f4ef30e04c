//! Prometheus text exposition format (version 0.0.4).

use std::io::Write;

use crate::mapping::{MetricKind, MetricRecord, SampleValue};

/// Content type of the rendered body.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render records in Prometheus text format.
///
/// Each record gets a `# HELP` and `# TYPE` preamble followed by one line per
/// sample. Info records are written the way the text format carries info
/// families: the name gains an `_info` suffix, the type is `gauge`, the info
/// pairs follow the record labels and the value is `1`.
pub fn render(records: &[MetricRecord]) -> String {
    let mut output = Vec::with_capacity(records.len() * 128);

    for record in records {
        let (name, type_str) = match record.kind {
            MetricKind::Info => (format!("{}_info", record.name), "gauge"),
            MetricKind::Gauge => (record.name.to_string(), record.kind.as_str()),
        };

        writeln!(output, "# HELP {} {}", name, escape_help(record.help)).ok();
        writeln!(output, "# TYPE {} {}", name, type_str).ok();

        for sample in &record.samples {
            let mut labels: Vec<(&str, &str)> = record
                .label_names
                .iter()
                .copied()
                .zip(sample.label_values.iter().map(String::as_str))
                .collect();

            match &sample.value {
                SampleValue::Info(pairs) => {
                    labels.extend(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
                    writeln!(output, "{}{} 1", name, format_labels(&labels)).ok();
                }
                SampleValue::Gauge(value) => {
                    writeln!(
                        output,
                        "{}{} {}",
                        name,
                        format_labels(&labels),
                        format_value(*value)
                    )
                    .ok();
                }
            }
        }
    }

    String::from_utf8(output).unwrap_or_default()
}

/// Escape special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape help text. Quotes are left alone in HELP lines.
fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Format a floating point value for Prometheus.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

fn format_labels(labels: &[(&str, &str)]) -> String {
    if labels.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();

    format!("{{{}}}", parts.join(","))
}
