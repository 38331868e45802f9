use crate::error::{ParseError, ParseErrorKind};
use crate::{Label, MetricFamilies, MetricFamily, MetricSample, MetricType};

/// A parser for Prometheus's text exposition format.
///
/// The first malformed line fails the whole parse. Families declared by `# HELP` or
/// `# TYPE` that never receive a sample are dropped from the result.
pub fn parse(input: &str) -> Result<MetricFamilies, ParseError> {
    let mut families = MetricFamilies::new();
    for (index, line) in input.split('\n').enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let line = line.trim_start_matches(is_blank);
        parse_line(&mut families, line).map_err(|kind| ParseError {
            line: index + 1,
            kind,
        })?;
    }
    families.retain(|_, family| !family.samples.is_empty());
    Ok(families)
}

fn parse_line(families: &mut MetricFamilies, line: &str) -> Result<(), ParseErrorKind> {
    // The line is empty
    if line.is_empty() {
        return Ok(());
    }

    // The line is a comment, or defines a metric's help text or type
    if let Some(comment) = line.strip_prefix('#') {
        return parse_comment(families, comment);
    }

    // The line contains data
    let sample = parse_sample(line)?;
    let name = family_name(families, &sample.name).to_owned();
    families
        .entry(name.clone())
        .or_insert_with(|| MetricFamily::new(name))
        .samples
        .push(sample);
    Ok(())
}

fn parse_comment(families: &mut MetricFamilies, comment: &str) -> Result<(), ParseErrorKind> {
    let (keyword, rest) = split_token(comment.trim_start_matches(is_blank));
    if keyword != "HELP" && keyword != "TYPE" {
        return Ok(());
    }

    // A bare `# HELP` or `# HELP name` carries nothing, and is not an error
    let (name, rest) = split_token(rest.trim_start_matches(is_blank));
    if name.is_empty() {
        return Ok(());
    }
    if !is_metric_name(name) {
        return Err(ParseErrorKind::InvalidMetricName(name.to_owned()));
    }
    let rest = rest.trim_start_matches(is_blank);
    if rest.is_empty() {
        return Ok(());
    }

    let family = families
        .entry(name.to_owned())
        .or_insert_with(|| MetricFamily::new(name));
    if keyword == "HELP" {
        if family.help.is_some() {
            return Err(ParseErrorKind::DuplicateHelp(name.to_owned()));
        }
        family.help = Some(unescape_help(rest)?);
    } else {
        if family.typed || !family.samples.is_empty() {
            return Err(ParseErrorKind::DuplicateType(name.to_owned()));
        }
        let (type_str, _) = split_token(rest);
        family.metric_type = type_str
            .to_ascii_lowercase()
            .parse()
            .map_err(|_| ParseErrorKind::UnknownType(type_str.to_owned()))?;
        family.typed = true;
    }
    Ok(())
}

fn parse_sample(line: &str) -> Result<MetricSample, ParseErrorKind> {
    // Split `metric_name{labels} value timestamp` into parts
    let name_end = line
        .find(|ch: char| ch == '{' || is_blank(ch))
        .unwrap_or_else(|| line.len());
    let name = &line[..name_end];
    if !is_metric_name(name) {
        return Err(ParseErrorKind::InvalidMetricName(name.to_owned()));
    }

    let mut rest = line[name_end..].trim_start_matches(is_blank);
    let mut labels = Vec::new();
    if let Some(label_str) = rest.strip_prefix('{') {
        rest = parse_labels(label_str, &mut labels)?;
    }

    let (value_str, rest) = split_token(rest.trim_start_matches(is_blank));
    if value_str.is_empty() {
        return Err(ParseErrorKind::MissingValue);
    }
    let value = value_str
        .parse::<f64>()
        .map_err(|_| ParseErrorKind::InvalidValue(value_str.to_owned()))?;

    let (unix_str, rest) = split_token(rest.trim_start_matches(is_blank));
    let timestamp_ms = if unix_str.is_empty() {
        None
    } else {
        let timestamp = unix_str
            .parse::<i64>()
            .map_err(|_| ParseErrorKind::InvalidTimestamp(unix_str.to_owned()))?;
        Some(timestamp)
    };

    let rest = rest.trim_matches(is_blank);
    if !rest.is_empty() {
        return Err(ParseErrorKind::TrailingText(rest.to_owned()));
    }

    Ok(MetricSample {
        name: name.to_owned(),
        labels,
        value,
        timestamp_ms,
    })
}

/// Parses `label1="value1",label2="value2"}` and returns the text after the closing brace
fn parse_labels<'i>(input: &'i str, labels: &mut Vec<Label>) -> Result<&'i str, ParseErrorKind> {
    let mut tail = input.trim_start_matches(is_blank);
    loop {
        if let Some(rest) = tail.strip_prefix('}') {
            return Ok(rest);
        }

        // Split first label
        let name_end = tail
            .find(|ch: char| !is_label_char(ch))
            .unwrap_or_else(|| tail.len());
        let name = &tail[..name_end];
        if name.is_empty() {
            return match tail.chars().next() {
                Some(ch) => Err(ParseErrorKind::UnexpectedInLabels(ch)),
                None => Err(ParseErrorKind::UnterminatedLabels),
            };
        }
        if !is_label_name(name) {
            return Err(ParseErrorKind::InvalidLabelName(name.to_owned()));
        }
        tail = tail[name_end..]
            .trim_start_matches(is_blank)
            .strip_prefix('=')
            .ok_or_else(|| ParseErrorKind::ExpectedEquals(name.to_owned()))?;
        tail = tail
            .trim_start_matches(is_blank)
            .strip_prefix('"')
            .ok_or_else(|| ParseErrorKind::ExpectedQuote(name.to_owned()))?;

        // Parse the label
        let (value, rest) = parse_label_value(name, tail)?;
        if labels.iter().any(|label| label.name == name) {
            return Err(ParseErrorKind::DuplicateLabel(name.to_owned()));
        }
        labels.push(Label::new(name, value));

        // Advance to next label; a trailing comma before '}' is allowed
        tail = rest.trim_start_matches(is_blank);
        if let Some(rest) = tail.strip_prefix(',') {
            tail = rest.trim_start_matches(is_blank);
        } else if !tail.starts_with('}') {
            return match tail.chars().next() {
                Some(ch) => Err(ParseErrorKind::UnexpectedInLabels(ch)),
                None => Err(ParseErrorKind::UnterminatedLabels),
            };
        }
    }
}

/// Reads a label value up to its closing quote, which may not be escaped
fn parse_label_value<'i>(name: &str, input: &'i str) -> Result<(String, &'i str), ParseErrorKind> {
    let mut value = String::new();
    let mut chars = input.char_indices();
    while let Some((i, ch)) = chars.next() {
        match ch {
            '"' => return Ok((value, &input[i + 1..])),
            '\\' => match chars.next() {
                Some((_, '\\')) => value.push('\\'),
                Some((_, '"')) => value.push('"'),
                Some((_, 'n')) => value.push('\n'),
                Some((_, ch)) => return Err(ParseErrorKind::InvalidEscape(ch)),
                None => break,
            },
            _ => value.push(ch),
        }
    }
    Err(ParseErrorKind::UnterminatedLabelValue(name.to_owned()))
}

fn unescape_help(text: &str) -> Result<String, ParseErrorKind> {
    let mut help = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            help.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => help.push('\\'),
            Some('n') => help.push('\n'),
            Some(ch) => return Err(ParseErrorKind::InvalidEscape(ch)),
            None => help.push('\\'),
        }
    }
    Ok(help)
}

/// Resolves which family a series belongs to.
///
/// `_sum` and `_count` series fold into a declared summary or histogram, and `_bucket`
/// series into a declared histogram; everything else is its own family.
fn family_name<'a>(families: &MetricFamilies, name: &'a str) -> &'a str {
    for &(suffix, histogram_only) in &[("_sum", false), ("_count", false), ("_bucket", true)] {
        let base = match name.strip_suffix(suffix) {
            Some(base) => base,
            None => continue,
        };
        match families.get(base).map(|family| family.metric_type) {
            Some(MetricType::Histogram) => return base,
            Some(MetricType::Summary) if !histogram_only => return base,
            _ => (),
        }
    }
    name
}

fn split_token(input: &str) -> (&str, &str) {
    match input.find(is_blank) {
        Some(end) => (&input[..end], &input[end..]),
        None => (input, ""),
    }
}

fn is_blank(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

fn is_label_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

fn is_label_name(name: &str) -> bool {
    match name.chars().next() {
        Some(first) => !first.is_ascii_digit() && name.chars().all(is_label_char),
        None => false,
    }
}

fn is_metric_name(name: &str) -> bool {
    match name.chars().next() {
        Some(first) => {
            !first.is_ascii_digit() && name.chars().all(|ch| is_label_char(ch) || ch == ':')
        }
        None => false,
    }
}
