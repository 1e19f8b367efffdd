//! Text Tool-Call Detector
//!
//! Models sometimes narrate a tool call as prose or pseudo-syntax instead of
//! issuing a structured call. The detector recovers a canonical
//! `{tool_name, arguments}` pair from such text.
//!
//! Patterns are tried in two tiers. The first tier is an ordered list of
//! (pattern, extractor) pairs, syntactic forms first, first accepted match
//! wins. Only when none of those accepts does the second tier look for
//! looser "I need to search for ..." phrasing. A pattern that names an
//! unknown tool is rejected and evaluation moves on to the next pattern.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::tool::{Arguments, ToolCall, ToolRegistry};

pub const WEB_SEARCH: &str = "web_search";
pub const CALCULATE: &str = "calculate";

/// Alternative spellings models use for the built-in tools
const TOOL_SYNONYMS: &[(&str, &str)] = &[
    ("websearch", WEB_SEARCH),
    ("search", WEB_SEARCH),
    ("googlesearch", WEB_SEARCH),
    ("calc", CALCULATE),
    ("calculator", CALCULATE),
];

/// Characters stripped from a raw argument blob
const BLOB_TRIM: &[char] = &['"', '\'', '{', '}', '[', ']', ' '];

/// A tool call recovered from free text
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedToolCall {
    /// Canonical (registry) tool name
    pub tool_name: String,

    /// Decoded arguments
    pub arguments: Arguments,

    /// The substring of the input that matched
    pub matched_span: String,

    /// Label of the pattern that matched
    pub pattern: &'static str,
}

impl DetectedToolCall {
    /// Convert into a structured call with the given id
    pub fn to_tool_call(&self, id: impl Into<String>) -> ToolCall {
        ToolCall::with_arguments(id, &self.tool_name, &Value::Object(self.arguments.clone()))
    }
}

type Extractor = fn(&TextToolDetector, &Captures<'_>) -> Option<(String, Arguments)>;

struct Candidate {
    label: &'static str,
    pattern: Regex,
    extract: Extractor,
}

impl Candidate {
    fn new(label: &'static str, pattern: &str, extract: Extractor) -> Self {
        Self {
            label,
            pattern: Regex::new(pattern).unwrap(),
            extract,
        }
    }
}

static STRUCTURED_PATTERNS: LazyLock<Vec<Candidate>> = LazyLock::new(|| {
    vec![
        // <function=web_search [{"query": "..."}]>
        Candidate::new("function_tag_bracket", r"(?is)<function=(\w+)\s+\[(.*?)\]", named_blob),
        // <function=web_search {"query": "..."}>
        Candidate::new("function_tag_brace", r"(?is)<function=(\w+)\s+(\{.*?\})>", named_blob),
        // <tool:web_search query="...">...</tool>
        Candidate::new("tool_tag", r"(?is)<tool:(\w+)([^>]*)>([^<]*)</tool>", tool_tag),
        // function web_search("...")
        Candidate::new("function_keyword_call", r"(?is)function\s+(\w+)\(([^)]*)\)", named_blob),
        // Using web_search to search for "..."
        Candidate::new(
            "using_tool_phrase",
            r#"(?is)Using (\w+) to (?:search|query|calculate) (?:for )?"([^"]*)""#,
            named_blob,
        ),
        // Let me use calculator to work out "..."
        Candidate::new("let_me_use_phrase", r#"(?is)Let me use (\w+)[^\n]+"([^"]+)""#, named_blob),
        // I'll search for "..."
        Candidate::new(
            "search_intent",
            r#"(?is)I['’]ll search (?:for|about) ["']([^"']+)["']"#,
            search_intent,
        ),
        // Let me search "..." / Let me calculate "..."
        Candidate::new(
            "verb_intent",
            r#"(?is)Let me (search|calculate) ["']([^"']+)["']"#,
            verb_intent,
        ),
        // web_search("...")
        Candidate::new("bare_call", r"(?is)(\w+)\(([^)]*)\)", named_blob),
    ]
});

static IMPLICIT_SEARCH_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)I need to search for (.*?)[.\n]",
        r"(?i)I should search for (.*?)[.\n]",
        r"(?i)I will search for (.*?)[.\n]",
        r"(?i)Let me search for (.*?)[.\n]",
        r"(?i)I would need to look up (.*?)[.\n]",
    ]
    .into_iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static FIRST_QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""([^"]+)""#).unwrap());

/// How arguments for one registered tool are recovered from a blob
struct ToolTarget {
    parameter: String,
    keyed_value: Option<Regex>,
}

/// Recovers tool calls from free-form model output
pub struct TextToolDetector {
    targets: HashMap<String, ToolTarget>,
}

impl TextToolDetector {
    /// Build a detector that accepts the tools registered in `registry`
    pub fn new(registry: &ToolRegistry) -> Self {
        let targets = registry
            .names()
            .into_iter()
            .map(|name| {
                let parameter = registry
                    .primary_parameter(name)
                    .unwrap_or_else(|| default_parameter(name).to_string());
                let keyed_value =
                    Regex::new(&format!(r#""{}":\s*"([^"]+)""#, regex::escape(&parameter))).ok();
                (
                    name.to_string(),
                    ToolTarget {
                        parameter,
                        keyed_value,
                    },
                )
            })
            .collect();

        Self { targets }
    }

    /// Labels of the first-tier patterns, in evaluation order
    pub fn pattern_labels() -> Vec<&'static str> {
        STRUCTURED_PATTERNS.iter().map(|c| c.label).collect()
    }

    /// Scan `text` for a tool call
    pub fn detect(&self, text: &str) -> Option<DetectedToolCall> {
        for candidate in STRUCTURED_PATTERNS.iter() {
            let Some(caps) = candidate.pattern.captures(text) else {
                continue;
            };
            let matched_span = caps[0].to_string();

            match (candidate.extract)(self, &caps) {
                Some((tool_name, arguments)) => {
                    tracing::debug!(
                        pattern = candidate.label,
                        tool = %tool_name,
                        span = %matched_span,
                        "Detected text tool call"
                    );
                    return Some(DetectedToolCall {
                        tool_name,
                        arguments,
                        matched_span,
                        pattern: candidate.label,
                    });
                }
                None => {
                    tracing::debug!(pattern = candidate.label, span = %matched_span, "Rejected candidate");
                }
            }
        }

        let search = self.resolve(WEB_SEARCH)?;
        IMPLICIT_SEARCH_PATTERNS.iter().find_map(|pattern| {
            let caps = pattern.captures(text)?;
            let query = caps[1].trim().trim_matches(|c| c == '"' || c == '\'');
            Some(DetectedToolCall {
                tool_name: search.to_string(),
                arguments: single_argument(self.parameter_for(search), query),
                matched_span: caps[0].to_string(),
                pattern: "implicit_search",
            })
        })
    }

    /// Map a spelled tool name to a registered one
    fn resolve(&self, raw: &str) -> Option<&str> {
        let lowered = raw.to_lowercase();
        let canonical = TOOL_SYNONYMS
            .iter()
            .find(|(alias, _)| *alias == lowered)
            .map_or(lowered.as_str(), |(_, name)| *name);

        self.targets
            .get_key_value(canonical)
            .map(|(name, _)| name.as_str())
    }

    fn parameter_for<'a>(&'a self, tool: &'a str) -> &'a str {
        self.targets
            .get(tool)
            .map_or_else(|| default_parameter(tool), |t| t.parameter.as_str())
    }

    /// Pull the argument value for `tool` out of a raw blob: keyed pair,
    /// else first quoted string, else the stripped blob.
    fn extract_value(&self, tool: &str, blob: &str) -> String {
        let keyed = self
            .targets
            .get(tool)
            .and_then(|t| t.keyed_value.as_ref())
            .and_then(|re| re.captures(blob));
        if let Some(caps) = keyed {
            return caps[1].to_string();
        }
        if let Some(caps) = FIRST_QUOTED.captures(blob) {
            return caps[1].to_string();
        }
        blob.trim_matches(BLOB_TRIM).to_string()
    }

    fn named_call(&self, raw_name: &str, blob: &str) -> Option<(String, Arguments)> {
        let tool = self.resolve(raw_name)?;
        let value = self.extract_value(tool, blob);
        Some((tool.to_string(), single_argument(self.parameter_for(tool), &value)))
    }
}

fn default_parameter(tool: &str) -> &'static str {
    match tool {
        CALCULATE => "expression",
        _ => "query",
    }
}

fn single_argument(parameter: &str, value: &str) -> Arguments {
    let mut arguments = Arguments::new();
    arguments.insert(parameter.to_string(), Value::String(value.to_string()));
    arguments
}

fn named_blob(detector: &TextToolDetector, caps: &Captures<'_>) -> Option<(String, Arguments)> {
    detector.named_call(&caps[1], &caps[2])
}

fn tool_tag(detector: &TextToolDetector, caps: &Captures<'_>) -> Option<(String, Arguments)> {
    let blob = format!("{} {}", &caps[2], &caps[3]);
    detector.named_call(&caps[1], &blob)
}

fn search_intent(detector: &TextToolDetector, caps: &Captures<'_>) -> Option<(String, Arguments)> {
    let tool = detector.resolve(WEB_SEARCH)?;
    Some((
        tool.to_string(),
        single_argument(detector.parameter_for(tool), &caps[1]),
    ))
}

fn verb_intent(detector: &TextToolDetector, caps: &Captures<'_>) -> Option<(String, Arguments)> {
    let tool = if caps[1].eq_ignore_ascii_case("calculate") {
        CALCULATE
    } else {
        WEB_SEARCH
    };
    let tool = detector.resolve(tool)?;
    Some((
        tool.to_string(),
        single_argument(detector.parameter_for(tool), &caps[2]),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::tests::{EchoTool, registry};

    fn detect(text: &str) -> Option<DetectedToolCall> {
        TextToolDetector::new(&registry()).detect(text)
    }

    fn assert_call(text: &str, tool: &str, key: &str, value: &str) {
        let found = detect(text).unwrap_or_else(|| panic!("no call detected in {text:?}"));
        assert_eq!(found.tool_name, tool, "tool for {text:?}");
        assert_eq!(found.arguments[key], value, "argument for {text:?}");
        assert_eq!(found.arguments.len(), 1);
    }

    #[test]
    fn test_function_tag_with_brackets() {
        let text = r#"<function=web_search [{"query":"weather today"}]></function>"#;
        assert_call(text, "web_search", "query", "weather today");

        let found = detect(text).unwrap();
        assert_eq!(found.pattern, "function_tag_bracket");
        assert_eq!(found.matched_span, r#"<function=web_search [{"query":"weather today"}]"#);
    }

    #[test]
    fn test_function_tag_with_brace() {
        assert_call(
            r#"<function=calculate {"expression": "2 + 2"}>"#,
            "calculate",
            "expression",
            "2 + 2",
        );
    }

    #[test]
    fn test_tool_tag() {
        assert_call(
            "<tool:web_search>latest rust release</tool>",
            "web_search",
            "query",
            "latest rust release",
        );
        assert_call(
            r#"<tool:web_search query="rust news"></tool>"#,
            "web_search",
            "query",
            "rust news",
        );
    }

    #[test]
    fn test_function_keyword_call() {
        assert_call(r#"function calculate("5*5")"#, "calculate", "expression", "5*5");
    }

    #[test]
    fn test_prose_naming_a_tool() {
        assert_call(
            r#"Using web_search to search for "rust 2024 edition""#,
            "web_search",
            "query",
            "rust 2024 edition",
        );
        assert_call(
            r#"Let me use calculator to work out "12 / 4" for you"#,
            "calculate",
            "expression",
            "12 / 4",
        );
    }

    #[test]
    fn test_first_person_intent() {
        assert_call("I'll search for 'weather in Paris'", "web_search", "query", "weather in Paris");
        assert_call(r#"Let me calculate "3 ^ 4""#, "calculate", "expression", "3 ^ 4");
        assert_call("Let me search 'rust jobs'", "web_search", "query", "rust jobs");
    }

    #[test]
    fn test_bare_call_is_last_resort() {
        assert_call("calc(2+2)", "calculate", "expression", "2+2");
        assert!(detect("print(x) and exit(0)").is_none());
    }

    #[test]
    fn test_synonyms_normalize() {
        assert_call(
            r#"<function=googlesearch [{"query":"rust"}]>"#,
            "web_search",
            "query",
            "rust",
        );
        assert_call(
            r#"<function=calc [{"expression":"1+1"}]>"#,
            "calculate",
            "expression",
            "1+1",
        );
        assert_call(r#"<function=Search ["news"]>"#, "web_search", "query", "news");
    }

    #[test]
    fn test_unregistered_tool_is_rejected() {
        assert!(detect(r#"<function=weather [{"city":"Paris"}]>"#).is_none());
    }

    #[test]
    fn test_rejection_falls_through_to_later_patterns() {
        let found = detect(r#"<function=weather [{"city":"Paris"}]> calculate(6*7)"#).unwrap();
        assert_eq!(found.tool_name, "calculate");
        assert_eq!(found.pattern, "bare_call");
    }

    #[test]
    fn test_syntactic_patterns_win_over_prose() {
        let found = detect(r#"I'll search for 'cats'. <function=web_search [{"query":"dogs"}]>"#).unwrap();
        assert_eq!(found.arguments["query"], "dogs");

        let found = detect("I'll search for 'cats' then web_search(dogs)").unwrap();
        assert_eq!(found.arguments["query"], "cats");
    }

    #[test]
    fn test_argument_extraction_order() {
        // keyed pair beats an earlier quoted string
        assert_call(
            r#"<function=web_search [{"lang": "en", "query": "rust"}]>"#,
            "web_search",
            "query",
            "rust",
        );
        // first quoted string when the key differs
        assert_call(
            r#"<function=web_search [{"q": "rust"}]>"#,
            "web_search",
            "query",
            "q",
        );
        // stripped blob when nothing is quoted
        assert_call("<function=web_search [ {rust news} ]>", "web_search", "query", "rust news");
    }

    #[test]
    fn test_implicit_search_second_tier() {
        assert_call(
            "I need to search for the latest GDP figures. Then I can answer.",
            "web_search",
            "query",
            "the latest GDP figures",
        );
        assert_call(
            "Let me search for \"rust news\".",
            "web_search",
            "query",
            "rust news",
        );
        assert_call(
            "I would need to look up today's exchange rate\n",
            "web_search",
            "query",
            "today's exchange rate",
        );
        assert_eq!(
            detect("I should search for the score.").unwrap().pattern,
            "implicit_search"
        );
    }

    #[test]
    fn test_plain_narrative_is_not_a_call() {
        assert!(detect("The capital of France is Paris.").is_none());
        assert!(detect("").is_none());
        assert!(detect("I need to search for answers without a full stop").is_none());
    }

    #[test]
    fn test_pattern_priority_is_explicit() {
        let labels = TextToolDetector::pattern_labels();
        assert_eq!(labels.first(), Some(&"function_tag_bracket"));
        assert_eq!(labels.last(), Some(&"bare_call"));
        let intent = labels.iter().position(|l| *l == "search_intent").unwrap();
        let prose = labels.iter().position(|l| *l == "using_tool_phrase").unwrap();
        assert!(prose < intent);
    }

    #[test]
    fn test_to_tool_call_encodes_arguments() {
        let found = detect("I'll search for 'weather'").unwrap();
        let call = found.to_tool_call("manual_web_search_call");
        assert_eq!(call.id, "manual_web_search_call");
        assert_eq!(call.name, "web_search");
        assert_eq!(call.parse_arguments().unwrap()["query"], "weather");
    }

    #[test]
    fn test_intent_phrases_need_registered_tool() {
        let mut tools = ToolRegistry::new();
        tools.register(EchoTool {
            name: "calculate",
            param: "expression",
        });
        let detector = TextToolDetector::new(&tools);

        assert!(detector.detect("I'll search for 'rust news'").is_none());
        assert!(detector.detect("Let me search 'rust news'").is_none());
        assert!(detector.detect("Let me search for rust news.").is_none());

        let found = detector.detect("Let me calculate '2+2'").unwrap();
        assert_eq!(found.tool_name, "calculate");
        assert_eq!(found.arguments["expression"], "2+2");
    }
}
