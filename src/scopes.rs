// Unraid BFF — Scope inference
//
// Unraid authorizes API keys with resource/action pairs (`docker:update_any`,
// `array:read_own`, ...). There is no explicit "write" scope, so write
// capability is inferred from create/update/delete actions. When the upstream
// reports no scopes at all, or only the default monitoring scope, the answer
// is unknowable and writes are allowed; the upstream still enforces them.

use reqwest::header::HeaderMap;

/// Scope assumed when the upstream sends no scope headers.
pub const DEFAULT_SCOPE: &str = "read:monitoring";

/// Headers that may carry granted scopes, in lookup order.
const SCOPE_HEADERS: [&str; 3] = ["x-unraid-scopes", "x-api-scopes", "x-scopes"];

const WRITE_ACTIONS: [&str; 6] = [
    "create_any",
    "create_own",
    "update_any",
    "update_own",
    "delete_any",
    "delete_own",
];

/// Any of these means the key can read everything.
const FULL_READ_HINTS: [&str; 5] = ["read:monitoring", "monitoring", "info", "read_any", "read_own"];

/// Recommended read capabilities and the granted-scope patterns that satisfy each.
const RECOMMENDED_READ: [(&str, &[&str]); 4] = [
    (
        "read:monitoring",
        &["read:monitoring", "monitoring", "info", "read_any", "read_own"],
    ),
    ("read:docker", &["read:docker", "docker", "read_any", "read_own"]),
    ("read:vms", &["read:vms", "vms", "read_any", "read_own"]),
    ("read:array", &["read:array", "array", "read_any", "read_own"]),
];

fn lowered(scopes: &[String]) -> Vec<String> {
    scopes.iter().map(|scope| scope.to_lowercase()).collect()
}

/// True when the scope list says nothing about write capability.
pub fn is_uncertain(scopes: &[String]) -> bool {
    match scopes {
        [] => true,
        [only] => only.eq_ignore_ascii_case(DEFAULT_SCOPE),
        _ => false,
    }
}

/// Whether a credential with `scopes` may run mutating actions.
pub fn has_write_scopes(scopes: &[String]) -> bool {
    if is_uncertain(scopes) {
        return true;
    }
    lowered(scopes).iter().any(|scope| {
        scope.contains("admin")
            || scope.contains("write")
            || WRITE_ACTIONS.iter().any(|action| scope.contains(action))
    })
}

/// Recommended read scopes that none of `scopes` covers.
pub fn missing_recommended_scopes(scopes: &[String]) -> Vec<String> {
    let granted = lowered(scopes);
    let full_read = granted
        .iter()
        .any(|scope| FULL_READ_HINTS.iter().any(|hint| scope.contains(hint)));
    if full_read {
        return Vec::new();
    }

    RECOMMENDED_READ
        .iter()
        .filter(|(_, patterns)| {
            !patterns
                .iter()
                .any(|pattern| granted.iter().any(|scope| scope.contains(pattern)))
        })
        .map(|(label, _)| label.to_string())
        .collect()
}

/// Scopes advertised by the upstream response headers, first header wins.
pub fn scopes_from_headers(headers: &HeaderMap) -> Vec<String> {
    let Some(value) = SCOPE_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.to_str().ok())
    else {
        return Vec::new();
    };

    value
        .split(',')
        .map(str::trim)
        .filter(|scope| !scope.is_empty())
        .map(str::to_string)
        .collect()
}

/// Remove repeated scopes, keeping first occurrences in order.
pub fn dedupe(scopes: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    scopes
        .into_iter()
        .filter(|scope| seen.insert(scope.clone()))
        .collect()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn scopes(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_uncertain_scopes_fail_open() {
        assert!(has_write_scopes(&[]));
        assert!(has_write_scopes(&scopes(&["read:monitoring"])));
        assert!(has_write_scopes(&scopes(&["READ:Monitoring"])));
    }

    #[test]
    fn test_read_only_scopes_cannot_write() {
        assert!(!has_write_scopes(&scopes(&["read:docker", "read:vms", "read:array"])));
        assert!(!has_write_scopes(&scopes(&["read:monitoring", "read:docker"])));
    }

    #[test]
    fn test_write_like_scopes() {
        assert!(has_write_scopes(&scopes(&["docker:update_any"])));
        assert!(has_write_scopes(&scopes(&["ARRAY:CREATE_OWN"])));
        assert!(has_write_scopes(&scopes(&["read:docker", "write:docker"])));
        assert!(has_write_scopes(&scopes(&["admin"])));
    }

    #[test]
    fn test_missing_recommended_scopes() {
        assert!(missing_recommended_scopes(&scopes(&["read:monitoring"])).is_empty());
        assert!(missing_recommended_scopes(&scopes(&["docker:read_any"])).is_empty());

        let missing = missing_recommended_scopes(&scopes(&["read:docker"]));
        assert_eq!(missing, vec!["read:monitoring", "read:vms", "read:array"]);

        let all = missing_recommended_scopes(&[]);
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_scopes_from_headers_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert("x-scopes", HeaderValue::from_static("read:vms"));
        assert_eq!(scopes_from_headers(&headers), vec!["read:vms"]);

        headers.insert(
            "x-unraid-scopes",
            HeaderValue::from_static(" read:docker, ,docker:update_any "),
        );
        assert_eq!(
            scopes_from_headers(&headers),
            vec!["read:docker", "docker:update_any"]
        );

        assert!(scopes_from_headers(&HeaderMap::new()).is_empty());
    }

    #[test]
    fn test_dedupe_keeps_order() {
        let result = dedupe(scopes(&["a", "b", "a", "c", "b"]));
        assert_eq!(result, vec!["a", "b", "c"]);
    }
}
