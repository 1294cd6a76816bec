//! Tests for the transformation engine

use super::*;
use crate::utility::split_list;
use anyhow::Context;
use serde_json::json;

fn person_rules() -> RuleTree {
    RuleTree::builder()
        .rule("job", |x| Ok(x.get("job").string()))
        .tree(
            "name",
            RuleTree::builder()
                .rule("first", |x| {
                    Ok(x.get("name").str_or("").split(' ').next().map(str::to_owned))
                })
                .rule("last", |x| {
                    Ok(x.get("name").str_or("").split(' ').nth(1).map(str::to_owned))
                }),
        )
        .rule("age", |x| Ok(x.get("age").i64_or(-1)))
        .rule("hobbies", |x| Ok(split_list(",", x.get("hobbies").str_or(""))))
        .tree(
            "city",
            RuleTree::builder()
                .rule("home", |x| {
                    Ok(x.get("address").get("home").get("city").str_or("").to_lowercase())
                })
                .rule("work", |x| {
                    Ok(x.get("address")
                        .get("work")
                        .get("city")
                        .str_or("Unknown")
                        .to_lowercase())
                }),
        )
        .build()
        .unwrap()
}

fn failing(message: &'static str) -> impl Fn(Accessor<'_>) -> anyhow::Result<Value> + Send + Sync {
    move |_: Accessor<'_>| -> anyhow::Result<Value> { anyhow::bail!(message) }
}

#[test]
fn test_basic_transform() {
    let record = json!({
        "job": "Engineer ",
        "name": "John Doe",
        "hobbies": "Biking, Skating,,",
        "address": {
            "home": {"city": "Cupertino", "zip": null}
        }
    });

    let mut engine = Engine::new(person_rules());
    let output = engine.transform(&record);

    assert_eq!(
        output,
        json!({
            "job": "Engineer",
            "name": {"first": "John", "last": "Doe"},
            "age": -1,
            "hobbies": ["Biking", "Skating"],
            "city": {"home": "cupertino", "work": "unknown"}
        })
    );
    assert!(engine.errors().is_empty());
    assert_eq!(engine.record_count(), 1);
}

#[test]
fn test_output_follows_rule_order() {
    let rules = RuleTree::builder()
        .rule("zeta", |_| Ok(1))
        .rule("alpha", |_| Ok(2))
        .tree("mid", RuleTree::builder().rule("b", |_| Ok(3)).rule("a", |_| Ok(4)))
        .build()
        .unwrap();

    let mut engine = Engine::new(rules);
    let output = engine.transform(&json!({}));

    let keys: Vec<&String> = output.as_object().unwrap().keys().collect();
    assert_eq!(keys, ["zeta", "alpha", "mid"]);
    let nested: Vec<&String> = output["mid"].as_object().unwrap().keys().collect();
    assert_eq!(nested, ["b", "a"]);
}

#[test]
fn test_error_isolation_across_records() {
    let rules = RuleTree::builder()
        .rule("error", failing("oh noes!"))
        .rule("missing", |x| Ok(x.get("foo").cloned()))
        .build()
        .unwrap();
    let config = EngineConfig::default().require_values(true);
    let mut engine = Engine::with_config(rules, config);

    assert_eq!(
        engine.transform(&json!({"foo": 1})),
        json!({"error": null, "missing": 1})
    );
    assert_eq!(
        engine.transform(&json!({})),
        json!({"error": null, "missing": null})
    );

    let errors = engine.errors();
    assert_eq!(errors.len(), 3);

    assert_eq!(errors[0].error.to_string(), "oh noes!");
    assert_eq!(errors[0].field.as_deref(), Some("error"));
    assert_eq!(errors[0].record_no, 1);
    assert_eq!(errors[0].record_raw, json!({"foo": 1}));
    assert_eq!(errors[0].record_id, None);

    assert_eq!(errors[1].error.to_string(), "oh noes!");
    assert_eq!(errors[1].record_no, 2);
    assert_eq!(errors[1].record_raw, json!({}));

    assert_eq!(
        errors[2].error.to_string(),
        "property 'missing' of result is undefined"
    );
    assert_eq!(errors[2].field.as_deref(), Some("missing"));
    assert_eq!(errors[2].record_no, 2);
}

#[test]
fn test_absent_result_is_null_by_default() {
    let rules = RuleTree::builder()
        .rule("missing", |x| Ok(x.get("foo").cloned()))
        .build()
        .unwrap();
    let mut engine = Engine::new(rules);

    assert_eq!(engine.transform(&json!({})), json!({"missing": null}));
    assert!(engine.errors().is_empty());
}

#[test]
fn test_record_id_reporting() {
    let rules = RuleTree::builder()
        .rule("missing", |x| Ok(x.get("foo").cloned()))
        .build()
        .unwrap();
    let config = EngineConfig::default().with_id_key("pk").require_values(true);
    let mut engine = Engine::with_config(rules, config);

    engine.transform(&json!({"pk": 1}));
    engine.transform(&json!({}));

    let errors = engine.errors();
    assert_eq!(errors.len(), 3);

    assert_eq!(errors[0].field.as_deref(), Some("missing"));
    assert_eq!(errors[0].record_id.as_deref(), Some("1"));
    assert_eq!(errors[0].record_no, 1);

    assert!(errors[1].is_record_level());
    assert!(matches!(
        &errors[1].error,
        TransformError::MissingId { key } if key == "pk"
    ));
    assert_eq!(errors[1].error.to_string(), "Missing ID key 'pk'");
    assert_eq!(errors[1].record_no, 2);
    assert_eq!(errors[1].record_id, None);

    assert_eq!(errors[2].field.as_deref(), Some("missing"));
    assert_eq!(errors[2].record_id, None);
    assert_eq!(errors[2].record_no, 2);
}

#[test]
fn test_falsy_id_is_reported_with_its_text() {
    let rules = RuleTree::builder()
        .rule("pk", |x| Ok(x.get("pk").cloned()))
        .build()
        .unwrap();
    let mut engine = Engine::with_id_key(rules, "pk");

    let output = engine.transform(&json!({"pk": 0}));
    assert_eq!(output, json!({"pk": 0}));

    let errors = engine.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].is_record_level());
    assert_eq!(errors[0].record_id.as_deref(), Some("0"));

    engine.transform(&json!({"pk": "abc"}));
    assert_eq!(engine.errors().len(), 1);
}

#[test]
fn test_null_id_is_absent() {
    let rules = RuleTree::builder()
        .rule("bad", failing("broken"))
        .build()
        .unwrap();
    let mut engine = Engine::with_id_key(rules, "pk");

    engine.transform(&json!({"pk": null}));

    let errors = engine.errors();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].is_record_level());
    assert_eq!(errors[0].record_id, None);
    assert_eq!(errors[1].field.as_deref(), Some("bad"));
    assert_eq!(errors[1].record_id, None);
}

#[test]
fn test_record_numbers_are_monotonic() {
    let rules = RuleTree::builder()
        .rule("always", failing("broken"))
        .build()
        .unwrap();
    let mut engine = Engine::new(rules);

    for _ in 0..3 {
        engine.transform(&json!({}));
    }

    let numbers: Vec<u64> = engine.errors().iter().map(|e| e.record_no).collect();
    assert_eq!(numbers, [1, 2, 3]);
    assert_eq!(engine.record_count(), 3);
}

#[test]
fn test_provenance_is_unioned_across_records() {
    let rules = RuleTree::builder()
        .rule("name", |x| Ok(x.get("name").string()))
        .rule("pick", |x| {
            if x.get("kind").str_or("") == "a" {
                Ok(x.get("a").cloned())
            } else {
                Ok(x.get("b").cloned())
            }
        })
        .build()
        .unwrap();
    let mut engine = Engine::new(rules);

    engine.transform(&json!({"name": "Ada", "kind": "a", "a": 1}));
    engine.transform(&json!({"kind": "b"}));

    let provenance = engine.provenance();
    assert_eq!(
        provenance["name"].iter().collect::<Vec<_>>(),
        ["name"]
    );
    assert_eq!(
        provenance["pick"].iter().collect::<Vec<_>>(),
        ["a", "b", "kind"]
    );
}

#[test]
fn test_provenance_keyed_by_leaf_name() {
    let mut engine = Engine::new(person_rules());
    engine.transform(&json!({"name": "John Doe"}));

    let provenance = engine.provenance();
    assert!(provenance["first"].contains("name"));
    assert!(provenance["last"].contains("name"));

    let home = &provenance["home"];
    assert_eq!(home.iter().collect::<Vec<_>>(), ["address", "city", "home"]);
    assert!(!provenance.contains_key("city"));
    assert!(!provenance.contains_key("city.home"));
}

#[test]
fn test_same_named_leaves_share_provenance() {
    let rules = RuleTree::builder()
        .tree("home", RuleTree::builder().rule("city", |x| Ok(x.get("home_city").string())))
        .tree("work", RuleTree::builder().rule("city", |x| Ok(x.get("work_city").string())))
        .build()
        .unwrap();
    let mut engine = Engine::new(rules);
    engine.transform(&json!({"home_city": "Oslo"}));

    assert_eq!(
        engine.provenance()["city"].iter().collect::<Vec<_>>(),
        ["home_city", "work_city"]
    );
}

#[test]
fn test_provenance_kept_for_failing_rules() {
    let rules = RuleTree::builder()
        .rule("checked", |x| {
            let value = x.get("amount").as_i64().context("amount is not a number")?;
            Ok(value * 2)
        })
        .build()
        .unwrap();
    let mut engine = Engine::new(rules);

    let output = engine.transform(&json!({"amount": "ten"}));
    assert_eq!(output, json!({"checked": null}));

    let errors = engine.field_errors("checked");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error.to_string(), "amount is not a number");
    assert!(errors[0].error.rule_error().is_some());
    assert!(engine.provenance()["checked"].contains("amount"));
}

#[test]
fn test_index_reads_are_not_traced() {
    let rules = RuleTree::builder()
        .rule("first_tag", |x| Ok(x.get("tags").at(0).string()))
        .rule("names", |x| {
            Ok(x.get("items")
                .elements()
                .map(|item| item.get("name").string())
                .collect::<Vec<_>>())
        })
        .build()
        .unwrap();
    let mut engine = Engine::new(rules);

    let output = engine.transform(&json!({
        "tags": ["red"],
        "items": [{"name": "a"}, {"label": "b"}]
    }));

    assert_eq!(output, json!({"first_tag": "red", "names": ["a", null]}));
    assert_eq!(
        engine.provenance()["first_tag"].iter().collect::<Vec<_>>(),
        ["tags"]
    );
    assert_eq!(
        engine.provenance()["names"].iter().collect::<Vec<_>>(),
        ["items", "name"]
    );
}

#[test]
fn test_untraced_engine_has_no_provenance() {
    let config = EngineConfig::default().track_provenance(false);
    let mut engine = Engine::with_config(person_rules(), config);

    let output = engine.transform(&json!({"job": "Pilot"}));
    assert_eq!(output["job"], json!("Pilot"));
    assert!(engine.provenance().is_empty());
}

#[test]
fn test_only_top_level_strings_are_trimmed() {
    let rules = RuleTree::builder()
        .rule("plain", |x| Ok(x.get("plain").cloned()))
        .rule("tags", |x| Ok(x.get("tags").cloned()))
        .rule("count", |x| Ok(x.get("count").cloned()))
        .build()
        .unwrap();
    let record = json!({"plain": "  padded\t", "tags": [" a "], "count": 3});

    let mut engine = Engine::new(rules.clone());
    assert_eq!(
        engine.transform(&record),
        json!({"plain": "padded", "tags": [" a "], "count": 3})
    );

    let mut raw = Engine::with_config(rules, EngineConfig::default().trim_strings(false));
    assert_eq!(raw.transform(&record)["plain"], json!("  padded\t"));
}

#[test]
fn test_nested_failures_report_leaf_name_and_path() {
    let rules = RuleTree::builder()
        .tree(
            "name",
            RuleTree::builder()
                .rule("first", failing("no first name"))
                .rule("last", |_| Ok("Doe")),
        )
        .build()
        .unwrap();
    let mut engine = Engine::new(rules);

    let output = engine.transform(&json!({}));
    assert_eq!(output, json!({"name": {"first": null, "last": "Doe"}}));

    let error = &engine.errors()[0];
    assert_eq!(error.field.as_deref(), Some("first"));
    assert_eq!(error.path.as_deref(), Some("name.first"));
    assert_eq!(engine.field_errors("first").len(), 1);
    assert!(engine.field_errors("name.first").is_empty());
    assert!(engine.provenance().contains_key("first"));
}

#[test]
fn test_panicking_rule_is_isolated() {
    let rules = RuleTree::builder()
        .rule("boom", |_| -> anyhow::Result<i64> { panic!("kaboom") })
        .rule("fine", |_| Ok(true))
        .build()
        .unwrap();
    let mut engine = Engine::new(rules);

    let output = engine.transform(&json!({}));
    assert_eq!(output, json!({"boom": null, "fine": true}));

    let errors = engine.errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0].error,
        TransformError::Panicked { message } if message == "kaboom"
    ));
}

#[test]
#[should_panic(expected = "kaboom")]
fn test_panics_propagate_when_not_caught() {
    let rules = RuleTree::builder()
        .rule("boom", |_| -> anyhow::Result<i64> { panic!("kaboom") })
        .build()
        .unwrap();
    let mut engine = Engine::with_config(rules, EngineConfig::default().catch_panics(false));
    engine.transform(&json!({}));
}

#[test]
fn test_uncaught_panic_keeps_earlier_provenance() {
    let rules = RuleTree::builder()
        .rule("f", |x| {
            if x.get("boom").bool_or(false) {
                panic!("kaboom");
            }
            Ok(x.get("name").string())
        })
        .build()
        .unwrap();
    let mut engine = Engine::with_config(rules, EngineConfig::default().catch_panics(false));

    engine.transform(&json!({"name": "Ada"}));
    assert_eq!(
        engine.provenance()["f"].iter().collect::<Vec<_>>(),
        ["boom", "name"]
    );

    let record = json!({"boom": true});
    let result = panic::catch_unwind(AssertUnwindSafe(|| engine.transform(&record)));
    assert!(result.is_err());

    assert_eq!(
        engine.provenance()["f"].iter().collect::<Vec<_>>(),
        ["boom", "name"]
    );
    assert_eq!(engine.record_count(), 2);
    assert!(engine.errors().is_empty());

    engine.transform(&json!({"name": "Grace"}));
    assert_eq!(engine.record_count(), 3);
}

#[test]
fn test_non_object_record() {
    let mut engine = Engine::with_id_key(person_rules(), "pk");
    let output = engine.transform(&json!(42));

    assert_eq!(output["age"], json!(-1));
    assert_eq!(output["job"], Value::Null);
    assert_eq!(output["city"]["work"], json!("unknown"));

    let errors = engine.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].is_record_level());
    assert_eq!(errors[0].record_raw, json!(42));
}

#[test]
fn test_report_reflects_engine_state() {
    let rules = RuleTree::builder()
        .rule("bad", failing("nope"))
        .rule("ok", |x| Ok(x.get("v").cloned()))
        .build()
        .unwrap();
    let mut engine = Engine::new(rules);
    engine.transform(&json!({"v": 1}));
    engine.transform(&json!({"v": 2}));

    let report = engine.report();
    assert_eq!(report.records_processed, 2);
    assert_eq!(report.field_errors, 2);
    assert_eq!(report.record_errors, 0);
    assert_eq!(report.failed_records, 2);

    let sink = engine.into_sink();
    assert_eq!(sink.errors().len(), 2);
}

#[derive(Clone, Default)]
struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_resolved_fields_are_logged_including_trimmed_strings() {
    let rules = RuleTree::builder()
        .rule("job", |x| Ok(x.get("job").string()))
        .rule("city", |x| Ok(x.get("city").string()))
        .rule("age", |x| Ok(x.get("age").i64_or(-1)))
        .build()
        .unwrap();
    let mut engine = Engine::new(rules);

    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        engine.transform(&json!({"job": "Engineer ", "city": "Oslo"}));
    });

    let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    assert_eq!(output.matches("Field resolved").count(), 3);
}
