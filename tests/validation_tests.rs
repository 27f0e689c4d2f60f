//! End-to-end validation tests
//!
//! Drives the public API the way a host does: compile a schema for a model
//! type, then set attributes and inspect the returned errors and signals.

use std::sync::{Arc, Mutex};

use attr_validations::{
    add_validator, HostSpec, Model, ModelType, Record, RuleOutcome, RuleRegistry, Schema,
    SchemaError, Validator, ValidatorCache,
};
use serde_json::{json, Map, Value};

fn attrs(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn model(type_name: &str, schema: Value) -> Model {
    let schema = Schema::from_json(&schema).unwrap();
    ModelType::builder(type_name)
        .build(&schema, &RuleRegistry::new(), &ValidatorCache::new())
        .unwrap()
        .instance()
}

fn codes(list: &[&str]) -> Vec<String> {
    list.iter().map(|c| c.to_string()).collect()
}

fn a_whole_bunch() -> Value {
    json!({
        "name": {
            "required": true,
            "pattern": "^[a-zA-Z]+$",
            "minlength": 3,
            "maxlength": 100
        },
        "age": { "type": "number", "min": 0, "max": 200 }
    })
}

#[test]
fn test_validate_reports_every_missing_attribute() {
    let m = model("Person", json!({"name": {"required": true}, "number": {"required": true}}));
    let errors = m.validate(&attrs(json!({"hahah": 3}))).unwrap_err();
    assert_eq!(errors.to_json(), json!({"name": ["required"], "number": ["required"]}));
}

#[test]
fn test_validate_is_idempotent() {
    let m = model("Person", a_whole_bunch());
    let change = attrs(json!({"name": "a323", "age": 500}));
    assert_eq!(m.validate(&change), m.validate(&change));
}

#[test]
fn test_presence() {
    let v = Validator::compile(
        &Schema::from_json(&json!({"name": {"required": true}})).unwrap(),
        &RuleRegistry::new(),
        &HostSpec::new("Person"),
    )
    .unwrap();

    let errors = v.validate(&attrs(json!({"name": null})), None).unwrap_err();
    assert_eq!(errors.to_json(), json!({"name": ["required"]}));
    assert!(v.validate(&attrs(json!({"name": "x"})), None).is_ok());
}

#[test]
fn test_presence_rejects_null_and_blank() {
    let mut m = model("Person", json!({"name": {"required": true}}));
    assert!(m.set(attrs(json!({"name": null}))).is_err());
    assert!(m.set(attrs(json!({"name": ""}))).is_err());
    assert!(m.set(Map::new()).is_err());
    assert!(m.attributes().is_empty());
}

#[test]
fn test_presence_falls_back_to_stored_value() {
    let mut m = model("Person", json!({"name": {"required": true}, "number": {"required": true}}));
    let errors = m.set(attrs(json!({"number": 10}))).unwrap_err();
    assert_eq!(errors.to_json(), json!({"name": ["required"]}));

    m.set(attrs(json!({"name": "neal", "number": 10}))).unwrap();
    assert!(m.set(attrs(json!({"number": 11}))).is_ok());
    assert_eq!(m.get("number"), Some(&json!(11)));
}

#[test]
fn test_length_bounds() {
    let mut m = model("Person", json!({"name": {"minlength": 3}}));
    let errors = m.set(attrs(json!({"name": "al"}))).unwrap_err();
    assert_eq!(errors.get("name"), Some(&codes(&["minlength"])[..]));
    assert!(m.set(attrs(json!({"name": "neal"}))).is_ok());

    let mut m = model("Person", json!({"name": {"maxlength": 4}}));
    assert!(m.set(attrs(json!({"name": "neals"}))).is_err());
    assert!(m.set(attrs(json!({"name": "al"}))).is_ok());
}

#[test]
fn test_length_rule_codes() {
    let mut m = model("Person", json!({"name": {"length": {"min": 2, "max": 3}}}));
    let errors = m.set(attrs(json!({"name": "a"}))).unwrap_err();
    assert_eq!(errors.get("name"), Some(&codes(&["minLength"])[..]));
    let errors = m.set(attrs(json!({"name": "abcd"}))).unwrap_err();
    assert_eq!(errors.get("name"), Some(&codes(&["maxLength"])[..]));
    assert!(m.set(attrs(json!({"name": "abc"}))).is_ok());
}

#[test]
fn test_combined_rules_accumulate_independently() {
    let mut m = model("Person", a_whole_bunch());
    let errors = m.set(attrs(json!({"name": "a323", "age": 10}))).unwrap_err();
    assert_eq!(errors.to_json(), json!({"name": ["pattern"]}));

    let errors = m.set(attrs(json!({"name": "a1", "age": 10}))).unwrap_err();
    assert_eq!(errors.to_json(), json!({"name": ["pattern", "minlength"]}));
}

#[test]
fn test_a_whole_bunch() {
    let mut m = model("Person", a_whole_bunch());
    assert!(m.set(attrs(json!({"name": "neal", "age": 10}))).is_ok());
    assert!(m.set(attrs(json!({"name": "neal", "age": 201}))).is_err());
    assert!(m.set(attrs(json!({"name": "al", "age": 10}))).is_err());
    assert!(m.set(attrs(json!({"name": "neal", "age": -5}))).is_err());
    assert!(m.set(attrs(json!({"name": "neal", "age": "10"}))).is_ok());
    assert!(m.set(attrs(json!({"name": "neal", "age": "201"}))).is_err());
    assert!(m.set(attrs(json!({"name": "ne", "age": 1}))).is_err());
}

#[test]
fn test_numeric_bounds() {
    let mut m = model("Person", a_whole_bunch());
    m.set(attrs(json!({"name": "neal"}))).unwrap();

    let errors = m.set(attrs(json!({"age": -5}))).unwrap_err();
    assert_eq!(errors.to_json(), json!({"age": ["min"]}));
    let errors = m.set(attrs(json!({"age": 201}))).unwrap_err();
    assert_eq!(errors.to_json(), json!({"age": ["max"]}));
    assert!(m.set(attrs(json!({"age": "10"}))).is_ok());
}

#[test]
fn test_invalid_signal_carries_whole_error_map() {
    let mut m = model("Thing", json!({"name": {"required": "true"}, "whatever": {"min": 10}}));
    let _ = m.set(attrs(json!({"whatever": 0})));

    let aggregate = m.events().iter().find(|e| e.name == "invalid").unwrap();
    assert_eq!(aggregate.errors, json!({"name": ["required"], "whatever": ["min"]}));

    let named: Vec<&str> = m.events().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(named, vec!["invalid:name", "invalid:whatever", "invalid"]);
}

#[test]
fn test_only_failing_attributes_reported() {
    let mut m = model("Person", a_whole_bunch());
    let _ = m.set(attrs(json!({"name": "neal", "age": 201})));
    assert_eq!(m.events().last().unwrap().errors, json!({"age": ["max"]}));
}

#[test]
fn test_error_override_suppresses_signals() {
    let mut m = model("Person", json!({"name": {"required": true}}));
    let mut seen = Vec::new();
    let result = m.set_with(Map::new(), |errors| seen.push(errors.to_json()));
    assert!(result.is_err());
    assert_eq!(seen, vec![json!({"name": ["required"]})]);
    assert!(m.events().is_empty());
}

#[test]
fn test_set_is_all_or_nothing() {
    let mut m = model("Person", json!({"name": {"required": true}}));
    assert!(m.set(attrs(json!({"woo": "hoo"}))).is_err());
    assert_eq!(m.get("woo"), None);
}

#[test]
fn test_whitelists() {
    let mut m = model("Color", json!({"name": {"in": ["white", "blue", "red"]}}));
    assert!(m.set(attrs(json!({"name": "white"}))).is_ok());
    let errors = m.set(attrs(json!({"name": "yellow"}))).unwrap_err();
    assert_eq!(errors.get("name"), Some(&codes(&["in"])[..]));

    let mut m = model("Size", json!({"size": {"in": [1, 2, 3]}}));
    assert!(m.set(attrs(json!({"size": 5}))).is_err());
    assert!(m.set(attrs(json!({"size": 1}))).is_ok());
    assert!(m.set(attrs(json!({"size": 1.0}))).is_ok());
}

#[test]
fn test_min_max_and_pattern() {
    let mut m = model("Size", json!({"size": {"min": 3}}));
    assert!(m.set(attrs(json!({"size": 2}))).is_err());
    assert!(m.set(attrs(json!({"size": 5}))).is_ok());

    let mut m = model("Size", json!({"size": {"max": 3}}));
    assert!(m.set(attrs(json!({"size": 5}))).is_err());
    assert!(m.set(attrs(json!({"size": 2}))).is_ok());

    let mut m = model("Named", json!({"name": {"pattern": "^test"}}));
    assert!(m.set(attrs(json!({"name": "test"}))).is_ok());
    assert!(m.set(attrs(json!({"name": "broken"}))).is_err());
}

#[test]
fn test_format_date() {
    let mut m = model("Event", json!({"when": {"format": "date"}}));
    assert!(m.set(attrs(json!({"when": "12/10/1999"}))).is_ok());
    let errors = m.set(attrs(json!({"when": "1999-10-12"}))).unwrap_err();
    assert_eq!(errors.get("when"), Some(&codes(&["format"])[..]));
}

#[test]
fn test_type_email_and_url() {
    let mut m = model("Contact", json!({"email": {"type": "email"}, "link": {"type": "url"}}));
    assert!(m.set(attrs(json!({"email": "boogers"}))).is_err());
    assert!(m.set(attrs(json!({"email": "neal@snot.ca"}))).is_ok());

    let errors = m.set(attrs(json!({"link": "boogers"}))).unwrap_err();
    assert_eq!(errors.get("link"), Some(&codes(&["url"])[..]));
    assert!(m.set(attrs(json!({"link": "http://snot.ca"}))).is_ok());
    assert!(m.set(attrs(json!({"link": "ftp://snot.ca"}))).is_ok());
}

#[test]
fn test_type_number() {
    let mut m = model("Place", json!({"address": {"type": "number"}}));
    for ok in [json!("33"), json!(33), json!("33.333"), json!("089")] {
        assert!(m.set(attrs(json!({"address": ok}))).is_ok(), "{ok} should be a number");
    }
    for bad in [json!("33.333f"), json!("f33.333f"), json!(".")] {
        assert!(m.set(attrs(json!({"address": bad}))).is_err(), "{bad} should not be a number");
    }
}

#[test]
fn test_type_digits() {
    let mut m = model("Place", json!({"myNumber": {"type": "digits"}}));
    assert!(m.set(attrs(json!({"myNumber": "123"}))).is_ok());
    assert!(m.set(attrs(json!({"myNumber": "089"}))).is_ok());
    for bad in ["33.333f", "f33.333f", "-123", ".", "abc"] {
        assert!(m.set(attrs(json!({"myNumber": bad}))).is_err(), "{bad} should not be digits");
    }
}

#[test]
fn test_type_names_are_case_insensitive() {
    let mut m = model("Place", json!({"address": {"type": "String"}}));
    assert!(m.set(attrs(json!({"address": "bla bla"}))).is_ok());
    assert!(m.set(attrs(json!({"address": "33.333"}))).is_ok());
    assert!(m.set(attrs(json!({"address": 33.333}))).is_err());
    assert!(m.set(attrs(json!({"address": []}))).is_err());

    let mut m = model("List", json!({"elements": {"type": "Array"}}));
    assert!(m.set(attrs(json!({"elements": []}))).is_ok());
    assert!(m.set(attrs(json!({"elements": ["bla", "bla"]}))).is_ok());
    assert!(m.set(attrs(json!({"elements": "bla"}))).is_err());
    assert!(m.set(attrs(json!({"elements": {}}))).is_err());

    let mut m = model("Flag", json!({"isNoGood": {"type": "Boolean"}}));
    assert!(m.set(attrs(json!({"isNoGood": false}))).is_ok());
    assert!(m.set(attrs(json!({"isNoGood": true}))).is_ok());
    let errors = m.set(attrs(json!({"isNoGood": "bla"}))).unwrap_err();
    assert_eq!(errors.get("isNoGood"), Some(&codes(&["boolean"])[..]));
    assert!(m.set(attrs(json!({"isNoGood": 1}))).is_err());
}

#[test]
fn test_registry_uniqueness() {
    let registry = RuleRegistry::new();
    let noop = |_: &Value, _: &str, _: &dyn Record, _: Option<&Value>| RuleOutcome::Valid;

    assert!(matches!(
        registry.register("required", noop),
        Err(SchemaError::DuplicateRule(_))
    ));
    assert!(registry.register("type", noop).is_err());

    registry.register("dasds6231237123", noop).unwrap();
    assert!(matches!(
        registry.register("dasds6231237123", noop),
        Err(SchemaError::DuplicateRule(_))
    ));
    registry.register("anotherFreshName", noop).unwrap();
    assert_eq!(registry.custom_names(), vec!["anotherFreshName", "dasds6231237123"]);
}

#[test]
fn test_global_registry_rejects_builtin_names() {
    let result = add_validator("required", |_: &Value, _: &str, _: &dyn Record, _: Option<&Value>| {
        RuleOutcome::Valid
    });
    assert!(matches!(result, Err(SchemaError::DuplicateRule(_))));
}

#[test]
fn test_registered_rule_receives_description_path_and_value() {
    let seen: Arc<Mutex<Vec<(Value, String, Option<Value>, Option<Value>)>>> = Arc::default();
    let log = Arc::clone(&seen);
    add_validator(
        "itestCapturingValidator",
        move |description: &Value, path: &str, record: &dyn Record, value: Option<&Value>| {
            log.lock().unwrap().push((
                description.clone(),
                path.to_string(),
                record.get("stored").cloned(),
                value.cloned(),
            ));
            RuleOutcome::Valid
        },
    )
    .unwrap();

    let schema = Schema::from_json(&json!({"name": {"itestCapturingValidator": {"strict": true}}})).unwrap();
    let kind = ModelType::builder("Captured")
        .build(&schema, RuleRegistry::global(), &ValidatorCache::new())
        .unwrap();
    let mut m = kind.instance();
    m.set(attrs(json!({"stored": 1}))).unwrap();
    m.set(attrs(json!({"name": "blech"}))).unwrap();

    let seen = seen.lock().unwrap();
    let last = seen.last().unwrap();
    assert_eq!(last.0, json!({"strict": true}));
    assert_eq!(last.1, "name");
    assert_eq!(last.2, Some(json!(1)));
    assert_eq!(last.3, Some(json!("blech")));
}

#[test]
fn test_registered_rule_error_included() {
    add_validator("itestErrorDude", |_: &Value, _: &str, _: &dyn Record, _: Option<&Value>| {
        RuleOutcome::fail("error dude")
    })
    .unwrap();

    let schema = Schema::from_json(&json!({"name": {"itestErrorDude": {}}})).unwrap();
    let kind = ModelType::builder("Dude")
        .build(&schema, RuleRegistry::global(), &ValidatorCache::new())
        .unwrap();
    let mut m = kind.instance();

    let _ = m.set(attrs(json!({"name": "blech"})));
    let aggregate = m.events().iter().find(|e| e.name == "invalid").unwrap();
    assert_eq!(aggregate.errors, json!({"name": ["error dude"]}));
}

#[test]
fn test_custom_method() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&calls);
    let schema = Schema::from_json(&json!({"name": {"custom": "nameOfMethod"}})).unwrap();
    let kind = ModelType::builder("Custom")
        .method("nameOfMethod", move |attr, value| {
            log.lock().unwrap().push((attr.to_string(), value.cloned()));
            (value == Some(&json!("blech"))).then(|| "blech".to_string())
        })
        .build(&schema, &RuleRegistry::new(), &ValidatorCache::new())
        .unwrap();
    let mut m = kind.instance();

    assert!(m.set(attrs(json!({"name": "whatever"}))).is_ok());
    assert_eq!(calls.lock().unwrap()[0], ("name".to_string(), Some(json!("whatever"))));

    let errors = m.set(attrs(json!({"name": "blech"}))).unwrap_err();
    assert_eq!(errors.get("name"), Some(&codes(&["blech"])[..]));
}

#[test]
fn test_custom_method_must_exist() {
    let schema = Schema::from_json(&json!({"name": {"custom": "nameOfMethod"}})).unwrap();
    let result = ModelType::builder("NoMethods").build(&schema, &RuleRegistry::new(), &ValidatorCache::new());
    assert!(matches!(result, Err(SchemaError::InvalidSchema { .. })));
}

#[test]
fn test_unknown_rule() {
    let schema = Schema::from_json(&json!({"name": {"bogus": true}})).unwrap();
    let result = Validator::compile(&schema, &RuleRegistry::new(), &HostSpec::new("X"));
    assert!(matches!(result, Err(SchemaError::UnknownRule(name)) if name == "bogus"));
}

#[test]
fn test_array_inflation() {
    let v = Validator::compile(
        &Schema::from_json(&json!({"items[]": {"max": 100}})).unwrap(),
        &RuleRegistry::new(),
        &HostSpec::new("Basket"),
    )
    .unwrap();

    let errors = v.validate(&attrs(json!({"items": [101, 89]})), None).unwrap_err();
    assert_eq!(errors.paths(), vec!["items[0]"]);
    assert!(v.validate(&attrs(json!({"items": []})), None).is_ok());
    assert!(v.validate(&attrs(json!({"other": [1, 67]})), None).is_ok());
}

#[test]
fn test_array_elements_through_model() {
    let mut m = model("Basket", json!({"myArray[]": {"max": 99}}));
    assert!(m.set(attrs(json!({"myArray": []}))).is_ok());
    let errors = m.set(attrs(json!({"myArray": [101, 89]}))).unwrap_err();
    assert_eq!(errors.paths(), vec!["myArray[0]"]);
    assert!(m.set(attrs(json!({"myArray": [788]}))).is_err());
    assert!(m.set(attrs(json!({"myNumber": [1, 67]}))).is_ok());
}

#[test]
fn test_nested_templates_full_mode() {
    let v = Validator::compile(
        &Schema::from_json(&json!({
            "address.city": {"required": true},
            "orders[].lines[].qty": {"min": 1}
        }))
        .unwrap(),
        &RuleRegistry::new(),
        &HostSpec::new("Customer"),
    )
    .unwrap();

    let record = attrs(json!({
        "address": {"city": ""},
        "orders": [
            {"lines": [{"qty": 2}, {"qty": 0}]},
            {"lines": []},
            {"lines": [{"qty": -1}]}
        ]
    }));
    let errors = v.validate(&record, None).unwrap_err();
    assert_eq!(
        errors.paths(),
        vec!["address.city", "orders[0].lines[1].qty", "orders[2].lines[0].qty"]
    );
}

#[test]
fn test_delta_only_changed_indices() {
    let mut m = model("Basket", json!({"items[]": {"max": 100}}));
    m.set(attrs(json!({"items": [1, 2, 3]}))).unwrap();

    let errors = m.set(attrs(json!({"items[1]": 500}))).unwrap_err();
    assert_eq!(errors.paths(), vec!["items[1]"]);
    assert_eq!(m.get("items"), Some(&json!([1, 2, 3])));

    m.set(attrs(json!({"items[1]": 50}))).unwrap();
    assert_eq!(m.get("items"), Some(&json!([1, 50, 3])));
}

#[test]
fn test_delta_prefix_key_inflates_inside_value() {
    let v = Validator::compile(
        &Schema::from_json(&json!({"orders[].qty": {"min": 1}, "address.city": {"required": true}})).unwrap(),
        &RuleRegistry::new(),
        &HostSpec::new("Customer"),
    )
    .unwrap();
    let stored = attrs(json!({"address": {"city": "Oslo"}}));

    let errors = v
        .validate(&stored, Some(&attrs(json!({"orders[1]": {"qty": 0}}))))
        .unwrap_err();
    assert_eq!(errors.paths(), vec!["orders[1].qty"]);

    let errors = v
        .validate(&stored, Some(&attrs(json!({"address": {"city": ""}}))))
        .unwrap_err();
    assert_eq!(errors.paths(), vec!["address.city"]);
}

#[test]
fn test_cross_instance_isolation() {
    let registry = RuleRegistry::new();
    let cache = ValidatorCache::new();
    let named = ModelType::builder("NameModel")
        .build(
            &Schema::from_json(&json!({"name": {"required": "true"}})).unwrap(),
            &registry,
            &cache,
        )
        .unwrap();
    let unnamed = ModelType::builder("UnnameModel")
        .build(&Schema::new(), &registry, &cache)
        .unwrap();

    let mut first = named.instance();
    let second = named.instance();
    first.set(attrs(json!({"name": "Neal"}))).unwrap();
    assert!(first.set(attrs(json!({"name": ""}))).is_err());
    assert!(second.validate(&Map::new()).is_err());
    assert!(first.validate(&Map::new()).is_ok());
    assert!(second.events().is_empty());

    let mut um = unnamed.instance();
    um.set(attrs(json!({"name": "Neal"}))).unwrap();
    assert!(um.set(attrs(json!({"name": ""}))).is_ok());

    assert!(Arc::ptr_eq(named.validator(), &cache.get("NameModel").unwrap()));
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_schema_from_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("person.toml");
    std::fs::write(&path, "[name]\nrequired = true\nminlength = 3\n\n[\"items[]\"]\nmax = 100\n").unwrap();

    let schema = Schema::load(&path).unwrap();
    let v = Validator::compile(&schema, &RuleRegistry::new(), &HostSpec::new("Person")).unwrap();
    let errors = v
        .validate(&attrs(json!({"name": "al", "items": [1, 200]})), None)
        .unwrap_err();
    assert_eq!(errors.to_json(), json!({"name": ["minlength"], "items[1]": ["max"]}));
}

#[test]
fn test_nested_required_with_missing_parent() {
    let v = Validator::compile(
        &Schema::from_json(&json!({"address.city": {"required": true}})).unwrap(),
        &RuleRegistry::new(),
        &HostSpec::new("Customer"),
    )
    .unwrap();

    let errors = v.validate(&attrs(json!({})), None).unwrap_err();
    assert_eq!(errors.to_json(), json!({"address.city": ["required"]}));
    let errors = v.validate(&Map::new(), Some(&attrs(json!({"other": 1})))).unwrap_err();
    assert_eq!(errors.paths(), vec!["address.city"]);
}

#[test]
fn test_delta_replacing_container_drops_stored_leaf() {
    let mut m = model("Customer", json!({"address.city": {"required": true}}));
    m.set(attrs(json!({"address": {"city": "Oslo"}}))).unwrap();

    let errors = m.set(attrs(json!({"address": {}}))).unwrap_err();
    assert_eq!(errors.to_json(), json!({"address.city": ["required"]}));
    let errors = m.set(attrs(json!({"address": null}))).unwrap_err();
    assert_eq!(errors.paths(), vec!["address.city"]);
    assert_eq!(m.get("address"), Some(&json!({"city": "Oslo"})));
    assert!(m.is_valid());

    m.set(attrs(json!({"other": 1}))).unwrap();
    m.set(attrs(json!({"address": {"city": "Bergen"}}))).unwrap();
}

#[test]
fn test_indexed_key_wins_over_container_when_applied() {
    let mut m = model("Basket", json!({"items[]": {"max": 100}}));
    let mut change = Map::new();
    change.insert("items[0]".to_string(), json!(50));
    change.insert("items".to_string(), json!([1000]));

    m.set(change).unwrap();
    assert_eq!(m.get("items"), Some(&json!([50])));
    assert!(m.is_valid());
}

#[test]
fn test_unassignable_index_is_rejected() {
    let mut m = model("Basket", json!({"items[]": {"max": 100}}));
    m.set(attrs(json!({"items": [1]}))).unwrap();

    let errors = m.set(attrs(json!({"items[18446744073709551615]": 5}))).unwrap_err();
    assert_eq!(errors.to_json(), json!({"items[18446744073709551615]": ["unassignable"]}));

    let errors = m.set(attrs(json!({"items[2]": 5, "name": "x"}))).unwrap_err();
    assert_eq!(errors.paths(), vec!["items[2]"]);
    assert_eq!(m.get("items"), Some(&json!([1])));
    assert_eq!(m.get("name"), None);

    let names: Vec<&str> = m.events().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names.last(), Some(&"invalid"));
}

#[test]
fn test_indexed_key_creates_missing_array() {
    let mut m = model("Basket", json!({"items[]": {"max": 100}}));
    m.set(attrs(json!({"items[0]": 5}))).unwrap();
    assert_eq!(m.get("items"), Some(&json!([5])));
    m.set(attrs(json!({"items[1]": 6}))).unwrap();
    assert_eq!(m.get("items"), Some(&json!([5, 6])));
}

#[test]
fn test_nested_key_satisfies_required_ancestor() {
    let mut m = model("Customer", json!({"address": {"required": true}, "items[]": {"required": true}}));
    m.set(attrs(json!({"address.city": "Oslo", "items[0].name": "pen"}))).unwrap();
    assert_eq!(m.get("address"), Some(&json!({"city": "Oslo"})));
    assert_eq!(m.get("items"), Some(&json!([{"name": "pen"}])));
}

#[test]
fn test_custom_rule_fails_on_record_without_methods() {
    let v = Validator::compile(
        &Schema::from_json(&json!({"name": {"custom": "check"}})).unwrap(),
        &RuleRegistry::new(),
        &HostSpec::new("Plain").method("check"),
    )
    .unwrap();
    let errors = v.validate(&attrs(json!({"name": "x"})), None).unwrap_err();
    assert_eq!(errors.to_json(), json!({"name": ["custom"]}));
}
