//! Named patterns reused across contracts.

use crate::error::ContractError;
use crate::pattern::{RegexPattern, RegexProperty, ValueKind};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

const DATE_TIME: &str = r"([0-9]{4})-(1[0-2]|0[1-9])-(3[01]|0[1-9]|[12][0-9])T(2[0-3]|[01][0-9]):([0-5][0-9]):([0-5][0-9])";
const HOST: &str = r"[a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?)*(:[0-9]{1,5})?";
const URL_TAIL: &str = r"(/[a-zA-Z0-9._~%-]*)*(\?[a-zA-Z0-9._~%&=-]*)?";

/// A pattern from the shared library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedPattern {
    Boolean,
    AlphaNumeric,
    OnlyAlphaUnicode,
    Number,
    Integer,
    UnsignedInteger,
    PositiveInt,
    Double,
    Hex,
    IpAddress,
    Hostname,
    Email,
    Url,
    HttpsUrl,
    Uuid,
    Date,
    DateTime,
    Time,
    Iso8601WithOffset,
    NonEmpty,
    NonBlank,
}

static COMPILED: Lazy<HashMap<NamedPattern, RegexPattern>> = Lazy::new(|| {
    NamedPattern::ALL
        .iter()
        .map(|named| {
            let pattern = RegexPattern::new(named.source())
                .unwrap_or_else(|e| panic!("built-in pattern {named} does not compile: {e}"));
            (*named, pattern)
        })
        .collect()
});

impl NamedPattern {
    pub const ALL: [NamedPattern; 21] = [
        NamedPattern::Boolean,
        NamedPattern::AlphaNumeric,
        NamedPattern::OnlyAlphaUnicode,
        NamedPattern::Number,
        NamedPattern::Integer,
        NamedPattern::UnsignedInteger,
        NamedPattern::PositiveInt,
        NamedPattern::Double,
        NamedPattern::Hex,
        NamedPattern::IpAddress,
        NamedPattern::Hostname,
        NamedPattern::Email,
        NamedPattern::Url,
        NamedPattern::HttpsUrl,
        NamedPattern::Uuid,
        NamedPattern::Date,
        NamedPattern::DateTime,
        NamedPattern::Time,
        NamedPattern::Iso8601WithOffset,
        NamedPattern::NonEmpty,
        NamedPattern::NonBlank,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NamedPattern::Boolean => "boolean",
            NamedPattern::AlphaNumeric => "alphaNumeric",
            NamedPattern::OnlyAlphaUnicode => "onlyAlphaUnicode",
            NamedPattern::Number => "number",
            NamedPattern::Integer => "integer",
            NamedPattern::UnsignedInteger => "unsignedInteger",
            NamedPattern::PositiveInt => "positiveInt",
            NamedPattern::Double => "double",
            NamedPattern::Hex => "hex",
            NamedPattern::IpAddress => "ipAddress",
            NamedPattern::Hostname => "hostname",
            NamedPattern::Email => "email",
            NamedPattern::Url => "url",
            NamedPattern::HttpsUrl => "httpsUrl",
            NamedPattern::Uuid => "uuid",
            NamedPattern::Date => "date",
            NamedPattern::DateTime => "dateTime",
            NamedPattern::Time => "time",
            NamedPattern::Iso8601WithOffset => "iso8601WithOffset",
            NamedPattern::NonEmpty => "nonEmpty",
            NamedPattern::NonBlank => "nonBlank",
        }
    }

    pub fn source(self) -> String {
        match self {
            NamedPattern::Boolean => "(true|false)".to_string(),
            NamedPattern::AlphaNumeric => "[a-zA-Z0-9]+".to_string(),
            NamedPattern::OnlyAlphaUnicode => r"[\p{L}]*".to_string(),
            NamedPattern::Number => r"-?(\d*\.\d+|\d+)".to_string(),
            NamedPattern::Integer => r"-?(\d+)".to_string(),
            NamedPattern::UnsignedInteger => r"(\d+)".to_string(),
            NamedPattern::PositiveInt => r"([1-9]\d*)".to_string(),
            NamedPattern::Double => r"-?(\d*\.\d+)".to_string(),
            NamedPattern::Hex => "[a-fA-F0-9]+".to_string(),
            NamedPattern::IpAddress => {
                let octet = r"([01]?\d\d?|2[0-4]\d|25[0-5])";
                format!(r"{octet}\.{octet}\.{octet}\.{octet}")
            }
            NamedPattern::Hostname => r"((http[s]?|ftp):/)/?([^:/\s]+)(:[0-9]{1,5})?".to_string(),
            NamedPattern::Email => r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,6}".to_string(),
            NamedPattern::Url => format!("((http[s]?|ftp)://){HOST}{URL_TAIL}"),
            NamedPattern::HttpsUrl => format!("(https://){HOST}{URL_TAIL}"),
            NamedPattern::Uuid => {
                "[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}".to_string()
            }
            NamedPattern::Date => {
                r"(\d\d\d\d)-(0[1-9]|1[012])-(0[1-9]|[12][0-9]|3[01])".to_string()
            }
            NamedPattern::DateTime => DATE_TIME.to_string(),
            NamedPattern::Time => "(2[0-3]|[01][0-9]):([0-5][0-9]):([0-5][0-9])".to_string(),
            NamedPattern::Iso8601WithOffset => {
                format!(r"{DATE_TIME}(\.\d{{3}})?(Z|[+-][01]\d:[0-5]\d)")
            }
            NamedPattern::NonEmpty => r"[\S\s]+".to_string(),
            NamedPattern::NonBlank => r"^\s*\S[\S\s]*".to_string(),
        }
    }

    /// The kind examples of this pattern render as.
    pub fn kind(self) -> ValueKind {
        match self {
            NamedPattern::Boolean => ValueKind::Boolean,
            NamedPattern::Number | NamedPattern::Double => ValueKind::Double,
            NamedPattern::Integer | NamedPattern::UnsignedInteger | NamedPattern::PositiveInt => {
                ValueKind::Integer
            }
            _ => ValueKind::String,
        }
    }

    pub fn pattern(self) -> RegexPattern {
        COMPILED[&self].clone()
    }

    pub fn property(self) -> RegexProperty {
        RegexProperty::new(self.pattern()).with_kind(self.kind())
    }
}

impl fmt::Display for NamedPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NamedPattern {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NamedPattern::ALL
            .iter()
            .copied()
            .find(|named| named.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ContractError::InvalidDocument(format!("unknown named pattern [{s}]")))
    }
}

/// A pattern accepting exactly one of `values`.
pub fn any_of(values: &[&str]) -> Result<RegexPattern, ContractError> {
    let alternatives: Vec<String> = values
        .iter()
        .map(|value| format!("^{}$", regex::escape(value)))
        .collect();
    RegexPattern::new(alternatives.join("|"))
}

/// Pattern for a named multipart parameter whose value matches `value`.
pub fn multipart_param(name: &str, value: &str) -> String {
    format!(
        "(?s).*--.*\r\nContent-Disposition: form-data; name=\"{}\"\r\n(Content-Type: .*\r\n)?(Content-Transfer-Encoding: .*\r\n)?(Content-Length: \\d+\r\n)?\r\n{value}\r\n--.*",
        regex::escape(name)
    )
}

/// Pattern for a multipart file part. `content_type` defaults to anything.
pub fn multipart_file(name: &str, filename: &str, content: &str, content_type: Option<&str>) -> String {
    format!(
        "(?s).*--.*\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{filename}\"\r\n(Content-Type: {}\r\n)?(Content-Transfer-Encoding: .*\r\n)?(Content-Length: \\d+\r\n)?\r\n{content}\r\n--.*",
        regex::escape(name),
        content_type.unwrap_or(".*")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_named_patterns_compile() {
        for named in NamedPattern::ALL {
            assert!(RegexPattern::new(named.source()).is_ok(), "{named}");
            assert_eq!(named.name().parse::<NamedPattern>().unwrap(), named);
        }
    }

    #[test]
    fn test_named_patterns_accept_known_values() {
        let cases = [
            (NamedPattern::Uuid, "123e4567-e89b-12d3-a456-426614174000"),
            (NamedPattern::Date, "2024-02-29"),
            (NamedPattern::DateTime, "2024-02-29T23:59:01"),
            (NamedPattern::Time, "07:30:00"),
            (NamedPattern::Iso8601WithOffset, "2024-02-29T23:59:01.123+01:00"),
            (NamedPattern::Email, "jane.doe@example.com"),
            (NamedPattern::IpAddress, "192.168.0.1"),
            (NamedPattern::Url, "https://example.com:8080/a/b?x=1"),
            (NamedPattern::HttpsUrl, "https://api.example.org"),
            (NamedPattern::Hostname, "http://localhost:8080"),
            (NamedPattern::Number, "-1.5"),
            (NamedPattern::PositiveInt, "42"),
            (NamedPattern::Boolean, "false"),
            (NamedPattern::NonBlank, "  x "),
            (NamedPattern::OnlyAlphaUnicode, "Zoë"),
        ];
        for (named, value) in cases {
            assert!(named.pattern().is_match(value), "{named} should accept {value}");
        }
    }

    #[test]
    fn test_named_patterns_reject_bad_values() {
        assert!(!NamedPattern::Uuid.pattern().is_match("not-a-uuid"));
        assert!(!NamedPattern::PositiveInt.pattern().is_match("0"));
        assert!(!NamedPattern::HttpsUrl.pattern().is_match("http://example.com"));
        assert!(!NamedPattern::NonBlank.pattern().is_match("   "));
        assert!(!NamedPattern::Date.pattern().is_match("2024-13-01"));
    }

    #[test]
    fn test_any_of() {
        let pattern = any_of(&["a.b", "c"]).unwrap();
        assert!(pattern.is_match("a.b"));
        assert!(pattern.is_match("c"));
        assert!(!pattern.is_match("axb"));
    }

    #[test]
    fn test_multipart_param_pattern() {
        let pattern = RegexPattern::new(multipart_param("name", "[a-z]+")).unwrap();
        let body = "--boundary\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\nalice\r\n--boundary--";
        assert!(pattern.is_match(body));
    }

    #[test]
    fn test_named_kind() {
        assert_eq!(NamedPattern::PositiveInt.property().kind(), ValueKind::Integer);
        assert_eq!(NamedPattern::Number.kind(), ValueKind::Double);
        assert_eq!(NamedPattern::Uuid.kind(), ValueKind::String);
    }
}
