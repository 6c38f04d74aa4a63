// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use reqwest::header::{HeaderName, CONTENT_TYPE};
use serde_json::json;

use super::*;

#[test]
fn with_bearer_leaves_original_untouched() {
    let original = RequestDescriptor::get("/campaigns");
    let authed = original.with_bearer("T1");

    assert_eq!(original.bearer(), None);
    assert_eq!(authed.bearer(), Some("T1"));
    assert_eq!(authed.url, "/campaigns");
    assert_eq!(authed.method, Method::GET);
}

#[test]
fn with_bearer_replaces_previous_token() {
    let req = RequestDescriptor::get("/screens").with_bearer("old").with_bearer("new");
    assert_eq!(req.bearer(), Some("new"));
    assert_eq!(req.headers.get_all(AUTHORIZATION).iter().count(), 1);
}

#[test]
fn invalid_header_value_is_skipped() {
    let name = HeaderName::from_static("x-test");
    let req = RequestDescriptor::get("/x").with_header(name, "bad\nvalue");
    assert!(req.header("x-test").is_none());
}

#[test]
fn with_json_sets_body_and_keeps_headers() -> anyhow::Result<()> {
    let req = RequestDescriptor::post("/campaigns")
        .with_header(CONTENT_TYPE, "application/json")
        .with_json(&json!({ "name": "spring" }))?;
    assert_eq!(req.header("content-type"), Some("application/json"));
    let body = req.body.unwrap_or_default();
    assert_eq!(serde_json::from_slice::<serde_json::Value>(&body)?, json!({ "name": "spring" }));
    Ok(())
}

#[test]
fn response_json_and_text() -> anyhow::Result<()> {
    let resp = Response::new(StatusCode::OK, r#"{"ok":true}"#);
    let value: serde_json::Value = resp.json()?;
    assert_eq!(value, json!({ "ok": true }));
    assert_eq!(resp.text(), r#"{"ok":true}"#);

    let empty = Response::new(StatusCode::NO_CONTENT, Bytes::new());
    let value: serde_json::Value = empty.json()?;
    assert!(value.is_null());
    let unit: Option<u32> = empty.json()?;
    assert!(unit.is_none());
    Ok(())
}
