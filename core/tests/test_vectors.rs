//! Verify build/parse against JSON test vectors stored in `test-vectors/`.
//!
//! Each case names an operation, its inputs, the expected request, a
//! simulated response, and either the expected record or the expected error.
//! Records are compared as parsed JSON so field order never matters.

use moodstocks_core::{ApiError, HttpMethod, HttpRequest, HttpResponse, ImageSource, MoodstocksClient};
use serde_json::Value;

const BASE_URL: &str = "http://localhost:3000/v2";

fn client() -> MoodstocksClient {
    MoodstocksClient::new(BASE_URL)
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn pairs(value: &Value) -> Vec<(String, String)> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|pair| {
            let pair = pair.as_array().unwrap();
            (
                pair[0].as_str().unwrap().to_string(),
                pair[1].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

fn image_source(input: &Value) -> ImageSource {
    match input["image_url"].as_str() {
        Some(url) => ImageSource::url(url),
        None => ImageSource::None,
    }
}

fn build(c: &MoodstocksClient, operation: &str, input: &Value) -> HttpRequest {
    let id = || input["id"].as_str().unwrap();
    match operation {
        "add_image" => c.build_add_image(id(), &image_source(input)).unwrap(),
        "remove_image" => c.build_remove_image(id()),
        "make_image_offline" => c.build_make_image_offline(id()),
        "remove_image_offline" => c.build_remove_image_offline(id()),
        "image_info" => c.build_image_info(id()),
        "list_images" => c.build_list_images(input["offline"].as_bool().unwrap()),
        "search_image" => c.build_search_image(&image_source(input)).unwrap(),
        "echo" => c.build_echo(pairs(&input["params"])),
        other => panic!("unknown operation: {other}"),
    }
}

#[test]
fn operation_test_vectors() {
    let raw = include_str!("../../test-vectors/operations.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let expected_req = &case["expected_request"];

        // Verify build
        let req = build(&c, case["operation"].as_str().unwrap(), &case["input"]);
        assert_eq!(req.method, parse_method(expected_req["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(req.path, format!("{BASE_URL}{}", expected_req["path"].as_str().unwrap()), "{name}: path");
        assert_eq!(req.query, pairs(&expected_req["query"]), "{name}: query");
        assert!(req.body.is_none(), "{name}: body should be None");
        assert!(req.headers.is_empty(), "{name}: headers should be empty");

        // Verify parse
        let sim = &case["simulated_response"];
        let response = HttpResponse {
            status: sim["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: sim["body"].as_str().unwrap().to_string(),
        };
        let result = c.parse_response(response);

        match case.get("expected_error") {
            Some(Value::String(kind)) => match (kind.as_str(), result) {
                ("Decode", Err(ApiError::Decode(_))) => {}
                (kind, other) => panic!("{name}: expected {kind} error, got {other:?}"),
            },
            Some(expected) => match result {
                Err(ApiError::Api { status, body }) => {
                    assert_eq!(u64::from(status), expected["status"].as_u64().unwrap(), "{name}: status");
                    assert_eq!(body, expected["body"].as_str().unwrap(), "{name}: body");
                }
                other => panic!("{name}: expected Api error, got {other:?}"),
            },
            None => {
                let record = result.unwrap_or_else(|e| panic!("{name}: unexpected error {e}"));
                assert_eq!(Value::Object(record), case["expected_result"], "{name}: parsed result");
            }
        }
    }
}
