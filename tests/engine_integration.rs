//! End-to-end flow: plan a watermark range, drive one extractor per work
//! unit against a scripted source, and infer the output schema from the
//! first sampled page.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use extraction_engine::{
    plan, ColumnSchema, DataType, ExtractorConfig, MockSource, PaginationConfig, PartitionPolicy,
    SourceStatus, WatermarkRange, WatermarkValue, WorkUnitExtractor,
};

fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn page_of(records: Value) -> SourceStatus {
    let count = records.as_array().map(|a| a.len() as u64).unwrap_or(0);
    SourceStatus::new()
        .with_buffer(serde_json::to_vec(&records).unwrap())
        .with_set_count(count)
        .with_message("contentType", "application/json")
}

#[test]
fn daily_plan_covers_three_days_exactly() {
    let watermark = WatermarkRange::Datetime {
        name: "updated_at".to_string(),
        low: "2020-01-01T00:00".to_string(),
        high: "2020-01-04T00:00".to_string(),
        zone: "UTC".to_string(),
    }
    .resolve()
    .unwrap();

    let units = plan(&watermark, &PartitionPolicy::Daily, false);

    assert_eq!(units.len(), 3);
    let expected = [
        ("2020-01-01T00:00:00Z", "2020-01-02T00:00:00Z"),
        ("2020-01-02T00:00:00Z", "2020-01-03T00:00:00Z"),
        ("2020-01-03T00:00:00Z", "2020-01-04T00:00:00Z"),
    ];
    for (unit, (low, high)) in units.iter().zip(expected) {
        assert_eq!(unit.low(), &WatermarkValue::Datetime(utc(low)));
        assert_eq!(unit.high(), &WatermarkValue::Datetime(utc(high)));
    }
}

#[tokio::test]
async fn planned_units_extract_independently() {
    let watermark = WatermarkRange::Datetime {
        name: "updated_at".to_string(),
        low: "2020-01-01".to_string(),
        high: "2020-01-03".to_string(),
        zone: "UTC".to_string(),
    }
    .resolve()
    .unwrap();
    let units = plan(&watermark, &PartitionPolicy::Daily, false);
    assert_eq!(units.len(), 2);

    let mut total_records = 0;
    for unit in units {
        let source = MockSource::new()
            .with_page(page_of(json!([{"id": 1}, {"id": 2}])))
            .with_page(page_of(json!([{"id": 3}])))
            .with_eof();
        let config = ExtractorConfig::new()
            .with_parameter("from", "{{watermark_low}}")
            .with_parameter("to", "{{watermark_high}}");

        let extractor = WorkUnitExtractor::new(source, unit, config).unwrap();
        let report = extractor.drive().await.unwrap();

        assert_eq!(report.pages, 2);
        total_records += report.records;
    }

    assert_eq!(total_records, 6);
}

#[tokio::test]
async fn watermark_bounds_reach_the_source_as_parameters() {
    let watermark = WatermarkRange::Datetime {
        name: "updated_at".to_string(),
        low: "2020-06-01".to_string(),
        high: "2020-06-02".to_string(),
        zone: "UTC".to_string(),
    }
    .resolve()
    .unwrap();
    let unit = plan(&watermark, &PartitionPolicy::None, false)
        .into_iter()
        .next()
        .unwrap();

    let source = MockSource::new().with_eof();
    let config = ExtractorConfig::new()
        .with_parameter("query", "updated:[{{watermark_low}} TO {{watermark_high}}]")
        .with_pagination(PaginationConfig::disabled());
    let mut extractor = WorkUnitExtractor::new(source, unit, config).unwrap();

    while extractor.next_page().await.unwrap().is_some() {}

    let session = extractor.session();
    assert_eq!(
        session.dynamic_parameters.get("query").unwrap(),
        "updated:[2020-06-01 00:00:00 TO 2020-06-02 00:00:00]"
    );
}

#[tokio::test]
async fn first_page_sample_materializes_a_schema() {
    let watermark = WatermarkRange::Unit {
        name: "region".to_string(),
        values: vec!["us".to_string()],
    }
    .resolve()
    .unwrap();
    let unit = plan(&watermark, &PartitionPolicy::None, false)
        .into_iter()
        .next()
        .unwrap();

    let sample = json!([
        {"id": 1, "name": "ann", "score": 9.5},
        {"id": 2, "tags": ["a", "b"]}
    ]);
    let source = MockSource::new().with_page(page_of(sample)).with_eof();
    let mut extractor =
        WorkUnitExtractor::new(source, unit, ExtractorConfig::new()).unwrap();

    let page = extractor.next_page().await.unwrap().unwrap();
    assert_eq!(page.content_type.as_deref(), Some("application/json"));

    let records: Vec<Value> = serde_json::from_slice::<Value>(&page.data)
        .unwrap()
        .as_array()
        .cloned()
        .unwrap();
    let schema = extractor.resolve_schema(&records);

    let column = |name: &str| -> ColumnSchema {
        schema
            .iter()
            .find(|c| c.name == name)
            .cloned()
            .unwrap_or_else(|| panic!("missing column {name}"))
    };
    assert_eq!(column("id").data_type, DataType::Integer);
    assert!(!column("id").nullable);
    assert_eq!(column("name").data_type, DataType::String);
    assert!(column("name").nullable);
    assert_eq!(column("score").data_type, DataType::Number);
    assert_eq!(
        column("tags").data_type,
        DataType::Array(Box::new(DataType::String))
    );

    // Draining the rest of the work unit leaves the schema untouched.
    while extractor.next_page().await.unwrap().is_some() {}
    let unchanged = extractor.resolve_schema(&[json!({"late": "field"})]);
    assert_eq!(unchanged, schema);
}

#[tokio::test]
async fn unit_watermark_extracts_one_value_per_work_unit() {
    let watermark = WatermarkRange::Unit {
        name: "region".to_string(),
        values: vec!["us".to_string(), "eu".to_string()],
    }
    .resolve()
    .unwrap();
    let units = plan(&watermark, &PartitionPolicy::None, false);
    assert_eq!(units.len(), 2);

    for (unit, region) in units.into_iter().zip(["us", "eu"]) {
        let source = MockSource::new()
            .with_page(page_of(json!([{"region": region}])))
            .with_eof();
        let config = ExtractorConfig::new().with_parameter("region", "{{watermark_low}}");
        let mut extractor = WorkUnitExtractor::new(source, unit, config).unwrap();

        extractor.next_page().await.unwrap().unwrap();
        assert_eq!(
            extractor.session().dynamic_parameters.get("region").unwrap(),
            region
        );
        while extractor.next_page().await.unwrap().is_some() {}
    }
}
