use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "analysis": {
                "type": "object",
                "properties": {
                    "concurrency": { "type": "integer", "minimum": 1 },
                    "currency": { "type": "string", "pattern": "^[A-Z]{3}$" },
                    "default_regions": { "type": "array", "items": { "$ref": "#/$defs/identifier" } },
                    "default_window_days": { "type": "integer", "minimum": 1 },
                    "mode": { "type": "string", "enum": ["FULL", "COSTS_ONLY", "RECOMMENDATIONS_ONLY"] }
                }
            },
            "retry": {
                "type": "object",
                "properties": {
                    "max_attempts": { "type": "integer", "minimum": 1 },
                    "base_delay_ms": { "type": "integer", "minimum": 0 },
                    "max_delay_ms": { "type": "integer", "minimum": 0 },
                    "attempt_timeout_ms": { "type": "integer", "minimum": 1 }
                }
            },
            "report": {
                "type": "object",
                "properties": {
                    "top_n": { "type": "integer", "minimum": 1 }
                }
            },
            "storage": {
                "type": "object",
                "properties": {
                    "database": { "type": "string" }
                }
            },
            "services": {
                "type": "object",
                "properties": {
                    "catalog": { "type": "array", "items": { "$ref": "#/$defs/identifier" } }
                }
            },
            "collector": {
                "type": "object",
                "properties": {
                    "fixture": { "type": "string" }
                }
            },
            "server": {
                "type": "object",
                "properties": {
                    "host": { "type": "string" },
                    "port": { "type": "integer", "minimum": 1, "maximum": 65535 },
                    "max_concurrent_runs": { "type": "integer", "minimum": 1 }
                }
            }
        },
        "$defs": {
            "identifier": { "type": "string", "pattern": "^[a-z0-9][a-z0-9-]*$" }
        }
    })
});
