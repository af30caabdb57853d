//! MQTT topic parsing and filter matching.
//!
//! Topics are `/`-separated. Subscription filters may contain the two MQTT
//! wildcards:
//! - `+` matches exactly one level (`vessels/+/navigation/headingTrue`)
//! - `#` matches the remaining levels, including none (`vessels/self/#`)
//!
//! Matching is segment based; no regex.

/// A segment of a topic filter.
#[derive(Debug, Clone, PartialEq)]
enum FilterSegment {
    Literal(String),
    /// `+`
    SingleLevel,
    /// `#`, only valid as the final segment
    MultiLevel,
}

/// A compiled MQTT subscription filter.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicFilter {
    raw: String,
    segments: Vec<FilterSegment>,
}

impl TopicFilter {
    /// Compile a filter, rejecting empty filters and misplaced wildcards.
    pub fn new(filter: &str) -> Result<Self, TopicFilterError> {
        if filter.is_empty() {
            return Err(TopicFilterError::Empty);
        }

        let parts: Vec<&str> = filter.split('/').collect();
        let last = parts.len() - 1;
        let mut segments = Vec::with_capacity(parts.len());

        for (i, part) in parts.iter().enumerate() {
            let segment = match *part {
                "#" if i == last => FilterSegment::MultiLevel,
                "#" => return Err(TopicFilterError::MultiLevelNotLast(filter.to_string())),
                "+" => FilterSegment::SingleLevel,
                p if p.contains('#') || p.contains('+') => {
                    return Err(TopicFilterError::PartialWildcard(filter.to_string()))
                }
                p => FilterSegment::Literal(p.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: filter.to_string(),
            segments,
        })
    }

    /// Check whether a concrete topic matches this filter.
    pub fn matches(&self, topic: &str) -> bool {
        let levels: Vec<&str> = topic.split('/').collect();

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                FilterSegment::MultiLevel => return true,
                FilterSegment::SingleLevel => {
                    if i >= levels.len() {
                        return false;
                    }
                }
                FilterSegment::Literal(lit) => {
                    if levels.get(i) != Some(&lit.as_str()) {
                        return false;
                    }
                }
            }
        }

        levels.len() == self.segments.len()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for TopicFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Errors that can occur when compiling a topic filter.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TopicFilterError {
    #[error("Empty topic filter")]
    Empty,
    #[error("'#' must be the last level in {0}")]
    MultiLevelNotLast(String),
    #[error("Wildcards must occupy a whole level in {0}")]
    PartialWildcard(String),
}

/// The measurement name: everything after the last `/`.
pub fn measurement_of(topic: &str) -> &str {
    match topic.rfind('/') {
        Some(idx) => &topic[idx + 1..],
        None => topic,
    }
}

/// Remove every whitespace character. Device names like "Main GPS" end up
/// in topics and brokers reject or mangle spaces.
pub fn strip_whitespace(topic: &str) -> String {
    topic.chars().filter(|c| !c.is_whitespace()).collect()
}
