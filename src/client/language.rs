//! # 언어 판별

use std::path::Path;

/// `alternate_language` 대신 명시적인 `language` 필드로 보내는 언어
pub const PRIMARY_LANGUAGES: &[&str] = &["forth"];

pub fn is_primary_language(language: &str) -> bool {
    PRIMARY_LANGUAGES
        .iter()
        .any(|primary| primary.eq_ignore_ascii_case(language))
}

/// 버퍼의 언어를 고릅니다. 에디터 스코프의 `source.<lang>` 토큰이 우선이고, 그다음이 확장자입니다.
/// 알 수 없으면 빈 문자열입니다.
pub fn detect_language(scope: Option<&str>, file: &str) -> String {
    if let Some(language) = scope.and_then(language_from_scope) {
        return language;
    }
    language_from_extension(file).unwrap_or_default().to_string()
}

fn language_from_scope(scope: &str) -> Option<String> {
    scope
        .split_whitespace()
        .find_map(|token| token.strip_prefix("source."))
        .filter(|language| !language.is_empty())
        .map(str::to_string)
}

fn language_from_extension(file: &str) -> Option<&'static str> {
    let extension = Path::new(file).extension()?.to_str()?.to_ascii_lowercase();
    let language = match extension.as_str() {
        "py" => "python",
        "go" => "go",
        "js" => "javascript",
        "ts" => "typescript",
        "java" => "java",
        "cpp" => "cpp",
        "c" => "c",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "html" => "html",
        "css" => "css",
        "json" => "json",
        "md" => "markdown",
        "odin" => "odin",
        "rs" => "rust",
        _ => return None,
    };
    Some(language)
}
