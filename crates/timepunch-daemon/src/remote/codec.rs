//! Wire encoding for the swipe service.
//!
//! Swipe payloads are `|*|`-delimited strings; responses are SOAP XML with
//! a fixed set of scalar tags, scraped with per-tag regexes rather than a
//! full XML parse.

use chrono::NaiveDateTime;
use regex::Regex;

use super::types::{RemoteError, SwipeSummary};

/// Field separator in the swipe input string.
const SEPARATOR: &str = "|*|";

/// Encode the swipe payload: `"{employeeId}|*|{isoTimestamp}"`, optionally
/// suffixed with `"|*|{departmentOverride}"`.
pub fn encode_swipe_input(
    employee_id: &str,
    punch_time: NaiveDateTime,
    department_override: Option<u32>,
) -> String {
    let mut input = format!(
        "{}{}{}",
        employee_id,
        SEPARATOR,
        punch_time.format("%Y-%m-%dT%H:%M:%S")
    );
    if let Some(dept) = department_override {
        input.push_str(SEPARATOR);
        input.push_str(&dept.to_string());
    }
    input
}

/// Escape text for inclusion in an XML element.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn xml_unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Simple base64 encoding for the SOAP `base64Binary` image payload
/// (no external dependency needed).
pub fn base64_encode(data: &[u8]) -> String {
    use std::fmt::Write;
    const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut result = String::with_capacity(data.len().div_ceil(3) * 4);

    for chunk in data.chunks(3) {
        let b0 = u32::from(chunk[0]);
        let b1 = u32::from(chunk.get(1).copied().unwrap_or(0));
        let b2 = u32::from(chunk.get(2).copied().unwrap_or(0));
        let n = (b0 << 16) | (b1 << 8) | b2;

        let _ = result.write_char(CHARS[(n >> 18 & 0x3F) as usize] as char);
        let _ = result.write_char(CHARS[(n >> 12 & 0x3F) as usize] as char);

        if chunk.len() > 1 {
            let _ = result.write_char(CHARS[(n >> 6 & 0x3F) as usize] as char);
        } else {
            result.push('=');
        }
        if chunk.len() > 2 {
            let _ = result.write_char(CHARS[(n & 0x3F) as usize] as char);
        } else {
            result.push('=');
        }
    }

    result
}

/// Extract the text content of the first occurrence of `tag`.
pub fn tag_text(body: &str, tag: &str) -> Option<String> {
    let pattern = format!(r"<(?:\w+:)?{tag}(?:\s[^>]*)?>([^<]*)</(?:\w+:)?{tag}>");
    let re = Regex::new(&pattern).ok()?;
    let text = re.captures(body)?.get(1)?.as_str().trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(xml_unescape(&text))
    }
}

fn tag_i32(body: &str, tag: &str) -> Option<i32> {
    tag_text(body, tag)?.parse().ok()
}

/// Decode a `RecordSwipeSummary` (or department-override) response body.
///
/// Exception and error codes of `0` mean "none" on the wire.
pub fn parse_swipe_summary(body: &str) -> Result<SwipeSummary, RemoteError> {
    if !body.contains("RecordSwipeReturnInfo") {
        return Err(RemoteError::Decode(
            "RecordSwipeReturnInfo element missing".into(),
        ));
    }

    let punch_success = tag_text(body, "PunchSuccess")
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false);

    Ok(SwipeSummary {
        punch_success,
        punch_type: tag_text(body, "PunchType"),
        first_name: tag_text(body, "FirstName"),
        last_name: tag_text(body, "LastName"),
        punch_exception: tag_i32(body, "PunchException").filter(|&c| c != 0),
        system_error_code: tag_i32(body, "SystemErrorCode").filter(|&c| c != 0),
        weekly_hours: tag_text(body, "CurrentWeeklyHours").and_then(|v| v.parse().ok()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn punch_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn swipe_input_without_override() {
        assert_eq!(
            encode_swipe_input("12345", punch_time(), None),
            "12345|*|2024-01-15T08:00:00"
        );
    }

    #[test]
    fn swipe_input_with_override() {
        assert_eq!(
            encode_swipe_input("12345", punch_time(), Some(7)),
            "12345|*|2024-01-15T08:00:00|*|7"
        );
    }

    #[test]
    fn escape_roundtrip() {
        let raw = r#"O'Brien & <Sons> "Ltd""#;
        assert_eq!(xml_unescape(&xml_escape(raw)), raw);
    }

    #[test]
    fn base64_known_vectors() {
        assert_eq!(base64_encode(b""), "");
        assert_eq!(base64_encode(b"f"), "Zg==");
        assert_eq!(base64_encode(b"fo"), "Zm8=");
        assert_eq!(base64_encode(b"foo"), "Zm9v");
        assert_eq!(base64_encode(b"foobar"), "Zm9vYmFy");
    }

    const SUCCESS_BODY: &str = r"
        <soap:Envelope><soap:Body><RecordSwipeSummaryResponse>
        <RecordSwipeSummaryResult><RecordSwipeReturnInfo>
        <PunchSuccess>true</PunchSuccess>
        <PunchType>checkin</PunchType>
        <FirstName>Maria</FirstName>
        <LastName>Lopez</LastName>
        <PunchException>0</PunchException>
        </RecordSwipeReturnInfo>
        <CurrentWeeklyHours>32.5</CurrentWeeklyHours>
        </RecordSwipeSummaryResult>
        </RecordSwipeSummaryResponse></soap:Body></soap:Envelope>";

    #[test]
    fn parse_successful_punch() {
        let summary = parse_swipe_summary(SUCCESS_BODY).unwrap();
        assert!(summary.punch_success);
        assert_eq!(summary.punch_type.as_deref(), Some("checkin"));
        assert_eq!(summary.first_name.as_deref(), Some("Maria"));
        assert_eq!(summary.last_name.as_deref(), Some("Lopez"));
        assert_eq!(summary.punch_exception, None);
        assert_eq!(summary.system_error_code, None);
        assert_eq!(summary.weekly_hours, Some(32.5));
    }

    #[test]
    fn parse_punch_exception() {
        let body = r"<RecordSwipeReturnInfo>
            <PunchSuccess>false</PunchSuccess>
            <PunchException>3</PunchException>
            </RecordSwipeReturnInfo>";
        let summary = parse_swipe_summary(body).unwrap();
        assert!(!summary.punch_success);
        assert_eq!(summary.punch_exception, Some(3));
        assert_eq!(summary.punch_type, None);
    }

    #[test]
    fn parse_system_error() {
        let body = r"<RecordSwipeReturnInfo>
            <PunchSuccess>false</PunchSuccess>
            <SystemErrorCode>-3</SystemErrorCode>
            </RecordSwipeReturnInfo>";
        let summary = parse_swipe_summary(body).unwrap();
        assert_eq!(summary.system_error_code, Some(-3));
    }

    #[test]
    fn parse_handles_namespaced_tags() {
        let body = r"<m:RecordSwipeReturnInfo>
            <m:PunchSuccess>true</m:PunchSuccess>
            <m:PunchType>checkout</m:PunchType>
            </m:RecordSwipeReturnInfo>";
        let summary = parse_swipe_summary(body).unwrap();
        assert!(summary.punch_success);
        assert_eq!(summary.punch_type.as_deref(), Some("checkout"));
    }

    #[test]
    fn parse_rejects_body_without_return_info() {
        let result = parse_swipe_summary("<html>proxy error page</html>");
        assert!(matches!(result, Err(RemoteError::Decode(_))));
    }

    #[test]
    fn escaped_name_is_unescaped() {
        let body = r"<RecordSwipeReturnInfo>
            <PunchSuccess>true</PunchSuccess>
            <LastName>O&apos;Brien</LastName>
            </RecordSwipeReturnInfo>";
        let summary = parse_swipe_summary(body).unwrap();
        assert_eq!(summary.last_name.as_deref(), Some("O'Brien"));
    }
}
