// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - ROI Scorer
 * Deterministic exploitation-priority score for discovered endpoints
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde_json::Value;

use crate::errors::ReconResult;
use crate::store::EndpointStore;
use crate::types::EndpointRecord;

const BASE_SCORE: i64 = 50;
const SSL_ISSUE_POINTS: i64 = 25;
const TECH_POINTS: i64 = 3;
const FUZZ_FREE_ENDPOINTS: i64 = 3;
const FUZZ_POINTS_PER_ENDPOINT: i64 = 3;
const FUZZ_BONUS_CAP: i64 = 15;
const MISSING_CSP_BONUS: i64 = 10;
const CACHING_HEADERS_BONUS: i64 = 10;

const CACHING_HEADERS: &[&str] = &["cache-control", "etag", "expires", "vary"];

/// Score one endpoint. Deterministic and side-effect-free; recomputed on
/// every report request rather than cached.
pub fn score(endpoint: &EndpointRecord) -> u32 {
    let mut score = BASE_SCORE;

    let ssl_issues = [
        endpoint.has_deprecated_tls,
        endpoint.has_expired_ssl,
        endpoint.has_mismatched_ssl,
        endpoint.has_revoked_ssl,
        endpoint.has_self_signed_ssl,
        endpoint.has_untrusted_root_ssl,
    ]
    .iter()
    .filter(|flag| **flag)
    .count() as i64;
    score += ssl_issues * SSL_ISSUE_POINTS;

    let crawl_count = crawl_result_count(endpoint.katana_results.as_ref());
    score += crawl_count;

    let fuzz_count = fuzz_endpoint_count(endpoint.ffuf_results.as_ref());
    if fuzz_count > FUZZ_FREE_ENDPOINTS {
        let extra = fuzz_count - FUZZ_FREE_ENDPOINTS;
        score += (extra * FUZZ_POINTS_PER_ENDPOINT).min(FUZZ_BONUS_CAP);
    }

    score += endpoint.technologies.len() as i64 * TECH_POINTS;

    if endpoint.status_code == Some(200) && crawl_count > 10 && !has_header(endpoint, "content-security-policy")
    {
        score += MISSING_CSP_BONUS;
    }

    if CACHING_HEADERS
        .iter()
        .any(|header| has_header(endpoint, header))
    {
        score += CACHING_HEADERS_BONUS;
    }

    score.max(0) as u32
}

/// Endpoints ranked by score descending, most recent first on ties
pub fn rank(mut endpoints: Vec<EndpointRecord>) -> Vec<EndpointRecord> {
    endpoints.sort_by(|a, b| {
        b.roi_score
            .cmp(&a.roi_score)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    endpoints
}

/// Recompute and persist the score of every endpoint for a target, then
/// return the ranked report.
pub async fn score_all(
    store: &dyn EndpointStore,
    target_id: &str,
) -> ReconResult<Vec<EndpointRecord>> {
    let mut endpoints = store.endpoints(target_id).await?;
    for endpoint in &mut endpoints {
        let roi = score(endpoint);
        endpoint.roi_score = roi;
        store.set_roi_score(&endpoint.id, roi).await?;
    }
    Ok(rank(endpoints))
}

/// Number of crawl results regardless of encoding: an array, a JSON
/// string, or newline-delimited text.
fn crawl_result_count(results: Option<&Value>) -> i64 {
    match results {
        Some(Value::Array(entries)) => entries.len() as i64,
        Some(Value::String(raw)) => {
            if raw.starts_with('[') || raw.starts_with('{') {
                match serde_json::from_str::<Value>(raw) {
                    Ok(Value::Array(entries)) => entries.len() as i64,
                    Ok(_) => 1,
                    Err(_) => non_empty_lines(raw),
                }
            } else {
                non_empty_lines(raw)
            }
        }
        _ => 0,
    }
}

/// Number of fuzzed endpoints: an object with an `endpoints` array (key
/// count as the fallback), a JSON string of the same, or newline text.
fn fuzz_endpoint_count(results: Option<&Value>) -> i64 {
    match results {
        Some(Value::Object(map)) => object_endpoint_count(map),
        Some(Value::Array(entries)) => entries.len() as i64,
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => object_endpoint_count(&map),
            Ok(Value::Array(entries)) => entries.len() as i64,
            Ok(_) => 0,
            Err(_) => non_empty_lines(raw),
        },
        _ => 0,
    }
}

fn object_endpoint_count(map: &serde_json::Map<String, Value>) -> i64 {
    let endpoints = map
        .get("endpoints")
        .and_then(Value::as_array)
        .map(|entries| entries.len() as i64)
        .unwrap_or(0);
    if endpoints > 0 {
        endpoints
    } else {
        map.len() as i64
    }
}

fn non_empty_lines(raw: &str) -> i64 {
    raw.lines().filter(|line| !line.trim().is_empty()).count() as i64
}

fn has_header(endpoint: &EndpointRecord, name: &str) -> bool {
    endpoint
        .headers_map()
        .keys()
        .any(|key| key.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn endpoint() -> EndpointRecord {
        let mut e = EndpointRecord::new("t1", "https://app.example.com");
        e.status_code = Some(200);
        e
    }

    #[test]
    fn test_bare_endpoint_scores_base() {
        assert_eq!(score(&endpoint()), 50);
    }

    #[test]
    fn test_each_ssl_issue_adds_25() {
        let mut e = endpoint();
        e.has_expired_ssl = true;
        assert_eq!(score(&e), 75);

        e.has_self_signed_ssl = true;
        assert_eq!(score(&e), 100);

        e.has_deprecated_tls = true;
        e.has_mismatched_ssl = true;
        e.has_revoked_ssl = true;
        e.has_untrusted_root_ssl = true;
        assert_eq!(score(&e), 50 + 6 * 25);
    }

    #[test]
    fn test_crawl_count_encodings() {
        let mut e = endpoint();
        e.katana_results = Some(json!(["u1", "u2", "u3"]));
        assert_eq!(score(&e), 53);

        e.katana_results = Some(Value::String("u1\nu2\n\nu3\n".to_string()));
        assert_eq!(score(&e), 53);

        e.katana_results = Some(Value::String(r#"["u1", "u2"]"#.to_string()));
        assert_eq!(score(&e), 52);
    }

    #[test]
    fn test_fuzz_bonus_kicks_in_above_three() {
        let mut e = endpoint();
        e.ffuf_results = Some(json!({"endpoints": ["a", "b", "c"]}));
        assert_eq!(score(&e), 50);

        e.ffuf_results = Some(json!({"endpoints": ["a", "b", "c", "d", "e"]}));
        assert_eq!(score(&e), 56);

        // Bonus is capped at 15
        let many: Vec<String> = (0..40).map(|i| format!("e{i}")).collect();
        e.ffuf_results = Some(json!({"endpoints": many}));
        assert_eq!(score(&e), 65);
    }

    #[test]
    fn test_technology_points() {
        let mut e = endpoint();
        e.technologies = vec!["nginx".to_string(), "react".to_string()];
        assert_eq!(score(&e), 56);
    }

    #[test]
    fn test_missing_csp_bonus_requires_deep_crawl() {
        let mut e = endpoint();
        let urls: Vec<String> = (0..11).map(|i| format!("u{i}")).collect();
        e.katana_results = Some(json!(urls));
        e.http_response_headers = Some(json!({"Server": "nginx"}));
        // 50 + 11 crawl + 10 missing CSP
        assert_eq!(score(&e), 71);

        e.http_response_headers =
            Some(json!({"Content-Security-Policy": "default-src 'self'"}));
        assert_eq!(score(&e), 61);

        // Not a 200: no CSP bonus
        e.status_code = Some(302);
        e.http_response_headers = Some(json!({"Server": "nginx"}));
        assert_eq!(score(&e), 61);
    }

    #[test]
    fn test_caching_headers_bonus() {
        let mut e = endpoint();
        e.http_response_headers = Some(json!({"ETag": "xyz"}));
        assert_eq!(score(&e), 60);

        // Headers persisted as a JSON string still count
        e.http_response_headers =
            Some(Value::String(r#"{"Cache-Control": "no-store"}"#.to_string()));
        assert_eq!(score(&e), 60);
    }

    #[test]
    fn test_rank_orders_by_score_then_recency() {
        let mut low = endpoint();
        low.roi_score = 50;
        let mut high = endpoint();
        high.roi_score = 90;
        high.url = "https://admin.example.com".to_string();

        let ranked = rank(vec![low.clone(), high.clone()]);
        assert_eq!(ranked[0].url, high.url);
        assert_eq!(ranked[1].url, low.url);
    }

    #[tokio::test]
    async fn test_score_all_persists() {
        use crate::store::MemoryStore;

        let store = MemoryStore::new();
        let mut e = endpoint();
        e.has_expired_ssl = true;
        store.upsert_endpoint(&e).await.unwrap();

        let report = score_all(&store, "t1").await.unwrap();
        assert_eq!(report[0].roi_score, 75);

        let persisted = store.endpoints("t1").await.unwrap();
        assert_eq!(persisted[0].roi_score, 75);
    }
}
