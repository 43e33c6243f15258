use regex::RegexBuilder;

use crate::assertion::types::SuccessTest;
use crate::{ProbeError, Result};

/// 解析 `kind:payload` 形式的判定声明
///
/// - `code:200`
/// - `pattern:token=(\w+)`（`regex:` 为同义写法）
///
/// 只在第一个冒号处分割，正则中可以包含冒号。未识别的类型不会报错，
/// 而是保留为 [`SuccessTest::Unrecognized`]，由调用方决定如何处理。
pub fn parse_test(input: &str) -> Result<SuccessTest> {
    let (kind, payload) = input.split_once(':').ok_or_else(|| {
        ProbeError::config(format!(
            "invalid test '{}': expected code:HTTPCODE or pattern:REGEX",
            input
        ))
    })?;

    match kind.trim().to_lowercase().as_str() {
        "code" => payload
            .trim()
            .parse::<u16>()
            .map(SuccessTest::Code)
            .map_err(|_| {
                ProbeError::config(format!("invalid HTTP code '{}' in test '{}'", payload, input))
            }),
        "pattern" | "regex" => {
            let regex = RegexBuilder::new(payload).multi_line(true).build()?;
            Ok(SuccessTest::Pattern(regex))
        }
        _ => Ok(SuccessTest::Unrecognized {
            kind: kind.to_string(),
            payload: payload.to_string(),
        }),
    }
}

/// 解析并要求判定类型可识别（加载配置时使用）
pub fn parse_recognized_test(input: &str) -> Result<SuccessTest> {
    let test = parse_test(input)?;
    if !test.is_recognized() {
        return Err(ProbeError::config(format!(
            "unknown test kind '{}' in '{}'",
            test.kind(),
            input
        )));
    }
    Ok(test)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_code() {
        assert_eq!(parse_test("code:200").unwrap(), SuccessTest::Code(200));
        assert_eq!(parse_test("code: 404 ").unwrap(), SuccessTest::Code(404));
    }

    #[test]
    fn test_parse_pattern_keeps_colons() {
        match parse_test(r"pattern:href=(https?://\S+)").unwrap() {
            SuccessTest::Pattern(re) => assert_eq!(re.as_str(), r"href=(https?://\S+)"),
            other => panic!("Expected Pattern, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_regex_alias() {
        assert!(matches!(
            parse_test("regex:Welcome").unwrap(),
            SuccessTest::Pattern(_)
        ));
    }

    #[test]
    fn test_parse_pattern_is_multiline() {
        match parse_test("pattern:^ready$").unwrap() {
            SuccessTest::Pattern(re) => assert!(re.is_match("booting\nready\n")),
            other => panic!("Expected Pattern, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_test("code200").unwrap_err().is_config());
        assert!(parse_test("code:abc").unwrap_err().is_config());
        assert!(parse_test("pattern:(unclosed").unwrap_err().is_config());
    }

    #[test]
    fn test_unrecognized_kind() {
        let test = parse_test("header:X-Ok").unwrap();
        assert!(!test.is_recognized());
        assert_eq!(test.kind(), "header");

        let err = parse_recognized_test("header:X-Ok").unwrap_err();
        assert!(err.is_config());
    }
}
