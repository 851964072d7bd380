//! `${...}` placeholder expansion for titles, texts and layer settings.
//!
//! Supported placeholders:
//! - `${ctx.region.id}`, `${ctx.region.label}`
//! - `${ctx.productId}`
//! - `${ctx.targetHeight}`
//! - `${ctx.frameDateFrom <pattern>}`, `${ctx.frameDateTo <pattern>}`
//! - `${layers.<layer id>.targetHeight}`
//!
//! Date patterns use Joda-style letters (`yyyy-MM-dd HH:mm`); an underscore
//! stands for a space so patterns never contain whitespace. Unknown
//! placeholders are left in the text unchanged.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

const DEFAULT_DATE_PATTERN: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Values available to placeholders for one frame.
#[derive(Debug, Clone, Default)]
pub struct TemplateValues<'a> {
    pub product_id: &'a str,
    pub region_id: &'a str,
    pub region_label: Option<&'a str>,
    pub target_height: Option<f64>,
    pub frame_from: Option<DateTime<Utc>>,
    pub frame_to: Option<DateTime<Utc>>,
    /// Resolved depth of each layer, by layer id.
    pub layer_heights: Option<&'a BTreeMap<String, f64>>,
}

/// Expand every known placeholder in `text`.
pub fn expand(text: &str, values: &TemplateValues<'_>) -> String {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            output.push_str(&rest[start..]);
            return output;
        };

        let placeholder = &after[..end];
        match resolve(placeholder.trim(), values) {
            Some(value) => output.push_str(&value),
            None => output.push_str(&rest[start..start + 2 + end + 1]),
        }
        rest = &after[end + 1..];
    }

    output.push_str(rest);
    output
}

fn resolve(placeholder: &str, values: &TemplateValues<'_>) -> Option<String> {
    let (key, argument) = match placeholder.split_once(char::is_whitespace) {
        Some((key, argument)) => (key, Some(argument.trim())),
        None => (placeholder, None),
    };

    match key {
        "ctx.region.id" => Some(values.region_id.to_string()),
        "ctx.region.label" => Some(values.region_label.unwrap_or(values.region_id).to_string()),
        "ctx.productId" => Some(values.product_id.to_string()),
        "ctx.targetHeight" => Some(values.target_height.map(format_height).unwrap_or_default()),
        "ctx.frameDateFrom" => values.frame_from.map(|date| format_date(&date, argument)),
        "ctx.frameDateTo" => values.frame_to.map(|date| format_date(&date, argument)),
        _ => {
            let layer_id = key.strip_prefix("layers.")?.strip_suffix(".targetHeight")?;
            values
                .layer_heights?
                .get(layer_id)
                .map(|height| format_height(*height))
        }
    }
}

/// Heights keep one decimal when whole, like `-12.0`.
pub fn format_height(height: f64) -> String {
    if height.fract() == 0.0 && height.is_finite() {
        format!("{:.1}", height)
    } else {
        height.to_string()
    }
}

fn format_date(date: &DateTime<Utc>, pattern: Option<&str>) -> String {
    match pattern.filter(|p| !p.is_empty()) {
        Some(pattern) => date.format(&joda_to_chrono(pattern)).to_string(),
        None => date.format(DEFAULT_DATE_PATTERN).to_string(),
    }
}

/// Translate a Joda-style date pattern into a chrono format string.
pub fn joda_to_chrono(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut output = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            let mut j = i + 1;
            while j < chars.len() && chars[j] != '\'' {
                push_literal(&mut output, chars[j]);
                j += 1;
            }
            if j == i + 1 && j < chars.len() {
                output.push('\'');
            }
            i = j + 1;
            continue;
        }

        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }

        let token = match (c, run) {
            ('y', 2) => Some("%y"),
            ('y', _) => Some("%Y"),
            ('M', 1) => Some("%-m"),
            ('M', 2) => Some("%m"),
            ('M', 3) => Some("%b"),
            ('M', _) => Some("%B"),
            ('d', 1) => Some("%-d"),
            ('d', _) => Some("%d"),
            ('H', 1) => Some("%-H"),
            ('H', _) => Some("%H"),
            ('h', 1) => Some("%-I"),
            ('h', _) => Some("%I"),
            ('m', 1) => Some("%-M"),
            ('m', _) => Some("%M"),
            ('s', 1) => Some("%-S"),
            ('s', _) => Some("%S"),
            ('S', _) => Some("%3f"),
            ('E', 1..=3) => Some("%a"),
            ('E', _) => Some("%A"),
            ('a', _) => Some("%p"),
            ('Z', _) => Some("%z"),
            ('z', _) => Some("%Z"),
            _ => None,
        };

        match token {
            Some(token) => output.push_str(token),
            None => {
                for _ in 0..run {
                    push_literal(&mut output, c);
                }
            }
        }
        i += run;
    }

    output
}

fn push_literal(output: &mut String, c: char) {
    match c {
        '_' => output.push(' '),
        '%' => output.push_str("%%"),
        other => output.push(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn values(heights: &BTreeMap<String, f64>) -> TemplateValues<'_> {
        TemplateValues {
            product_id: "products__ncanimate__gbr4_temp",
            region_id: "qld",
            region_label: Some("Queensland"),
            target_height: Some(-1.5),
            frame_from: Some(Utc.with_ymd_and_hms(2010, 9, 1, 0, 0, 0).unwrap()),
            frame_to: Some(Utc.with_ymd_and_hms(2010, 9, 2, 0, 0, 0).unwrap()),
            layer_heights: Some(heights),
        }
    }

    #[test]
    fn test_expand_context_values() {
        let heights = BTreeMap::new();
        let values = values(&heights);
        assert_eq!(
            expand("${ctx.region.label} (${ctx.region.id}) at ${ctx.targetHeight}m", &values),
            "Queensland (qld) at -1.5m"
        );
        assert_eq!(expand("${ctx.productId}", &values), "products__ncanimate__gbr4_temp");
    }

    #[test]
    fn test_expand_dates_with_pattern() {
        let heights = BTreeMap::new();
        let values = values(&heights);
        assert_eq!(
            expand("${ctx.frameDateFrom dd-MMM-yyyy_HH:mm}", &values),
            "01-Sep-2010 00:00"
        );
        assert_eq!(expand("${ctx.frameDateTo yyyy}", &values), "2010");
    }

    #[test]
    fn test_expand_layer_heights() {
        let mut heights = BTreeMap::new();
        heights.insert("temp".to_string(), -12.0);
        let values = values(&heights);
        assert_eq!(expand("Depth ${layers.temp.targetHeight}", &values), "Depth -12.0");
        assert_eq!(
            expand("${layers.salt.targetHeight}", &values),
            "${layers.salt.targetHeight}"
        );
    }

    #[test]
    fn test_unknown_and_unterminated_placeholders_kept() {
        let heights = BTreeMap::new();
        let values = values(&heights);
        assert_eq!(expand("${ctx.unknown} ok", &values), "${ctx.unknown} ok");
        assert_eq!(expand("broken ${ctx.region.id", &values), "broken ${ctx.region.id");
    }

    #[test]
    fn test_joda_translation() {
        assert_eq!(joda_to_chrono("yyyy-MM-dd"), "%Y-%m-%d");
        assert_eq!(joda_to_chrono("d_MMMM_yyyy"), "%-d %B %Y");
        assert_eq!(joda_to_chrono("HH'h'mm"), "%Hh%M");
        assert_eq!(joda_to_chrono("EEE"), "%a");
    }
}
