//! Integration tests for the extraction core

#[cfg(test)]
mod tests {
    use crate::{
        assemble, build_output_model, coerce, render_task, resolve_template, CoercionError,
        ExtractionEngine, ExtractorError, FieldValue, OutputModelList, Pipeline, RunContext,
        RunRequest, OUTPUT_FILE_NAME, TABULAR_TEMPLATE, TEMPLATES,
    };
    use async_trait::async_trait;
    use citescrape_domain::{
        ContentFieldSpec, FieldType, PageLimit, TabularPrompt, Task, TaskPrompt,
        RESERVED_FIELD_NAMES,
    };
    use proptest::prelude::*;
    use serde_json::{json, Map, Value};
    use std::io;
    use std::sync::{Arc, Mutex};

    fn film_spec() -> ContentFieldSpec {
        ContentFieldSpec::new(
            "Film_Info",
            vec![
                ("title", "str"),
                ("year", "int"),
                ("rating", "float"),
                ("is_award_winner", "bool"),
            ],
        )
        .unwrap()
    }

    /// Engine returning a fixed answer and remembering what it was asked
    struct StubEngine {
        answer: Option<String>,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl StubEngine {
        fn new(answer: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                answer: answer.map(str::to_string),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ExtractionEngine for StubEngine {
        fn name(&self) -> &str {
            "stub"
        }

        async fn run(&self, task: &Task, schema: &OutputModelList, _ctx: &RunContext) -> Option<String> {
            self.seen
                .lock()
                .unwrap()
                .push((task.text().to_string(), schema.content_key().to_string()));
            self.answer.clone()
        }
    }

    // --- Scenarios ---

    #[test]
    fn test_scenario_a_enveloped_answer() {
        let schema = build_output_model(&film_spec());
        let raw = r#"{"outputs":[{"Film_Info-content":[{"title":"The Godfather","year":1972,"rating":9.2,"is_award_winner":true}],"format_type":"json","summary":"One classic film."}]}"#;

        let parsed = coerce(raw, &schema).unwrap();
        let record = &parsed.outputs()[0].content[0];
        assert_eq!(record.get("year"), Some(&FieldValue::Int(1972)));
        assert_eq!(parsed.outputs()[0].summary.as_deref(), Some("One classic film."));
        assert_eq!(parsed.to_json()["outputs"][0]["Film_Info-content"][0]["year"], 1972);
    }

    #[test]
    fn test_scenario_b_bare_record_is_wrapped() {
        let schema = build_output_model(&film_spec());
        let raw = r#"{"title":"Inception","year":2010,"rating":8.8,"is_award_winner":true}"#;

        let parsed = coerce(raw, &schema).unwrap();
        assert_eq!(parsed.outputs().len(), 1);
        assert_eq!(parsed.outputs()[0].content.len(), 1);
        assert_eq!(
            parsed.to_json()["outputs"][0]["Film_Info-content"][0],
            json!({"title": "Inception", "year": 2010, "rating": 8.8, "is_award_winner": true})
        );
    }

    #[test]
    fn test_scenario_c_type_mismatch_on_year() {
        let schema = build_output_model(&film_spec());
        let raw = r#"{"outputs":[{"Film_Info-content":[{"title":"X","year":"not a number","rating":1.0,"is_award_winner":true}]}]}"#;

        let err = coerce(raw, &schema).unwrap_err();
        match err {
            CoercionError::Schema { path, expected, found } => {
                assert_eq!(path, "outputs[0].Film_Info-content[0].year");
                assert_eq!(expected, "integer");
                assert_eq!(found, "string \"not a number\"");
            }
            other => panic!("expected a schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_scenario_d_tabular_all_pages_without_filters() {
        let prompt = TaskPrompt::Tabular(TabularPrompt {
            website: "IMDB".to_string(),
            data_category: "films".to_string(),
            data_points: "title,rating".to_string(),
            no_pages: PageLimit::All,
            filters: None,
            url: "https://imdb.com".to_string(),
        });

        let task = render_task(TABULAR_TEMPLATE, &prompt).unwrap();
        assert!(task.text().contains("navigate through all pages"));
        assert!(!task.text().contains("filters"));
        assert!(!task.text().contains("apply"));
        assert!(task.text().contains("1. Navigate to https://imdb.com"));
        assert_eq!(task.template_name(), TABULAR_TEMPLATE);
    }

    /// Log output collected by a test subscriber
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` with logging captured, returning its result and the log text
    fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let result = tracing::subscriber::with_default(subscriber, f);
        let logs = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        (result, logs)
    }

    // --- Properties ---

    fn spec_strategy() -> impl Strategy<Value = Vec<(String, FieldType)>> {
        proptest::collection::btree_map("[a-z]{1,8}", 0..4usize, 1..6).prop_filter_map(
            "only reserved names",
            |fields| {
                let fields: Vec<(String, FieldType)> = fields
                    .into_iter()
                    .filter(|(name, _)| !RESERVED_FIELD_NAMES.contains(&name.as_str()))
                    .map(|(name, idx)| (name, FieldType::ALL[idx]))
                    .collect();
                (!fields.is_empty()).then_some(fields)
            },
        )
    }

    type Slot = (String, i64, f64, bool);

    fn value_for(field_type: FieldType, slot: &Slot) -> Value {
        match field_type {
            FieldType::String => Value::from(slot.0.clone()),
            FieldType::Int => Value::from(slot.1),
            FieldType::Float => Value::from(slot.2),
            FieldType::Bool => Value::from(slot.3),
        }
    }

    fn wrong_value_for(field_type: FieldType) -> Value {
        match field_type {
            FieldType::String => json!(1),
            FieldType::Int => json!("one"),
            FieldType::Float => json!("1.5"),
            FieldType::Bool => json!(1),
        }
    }

    fn records_for(fields: &[(String, FieldType)], slots: &[Vec<Slot>]) -> Vec<Value> {
        slots
            .iter()
            .map(|record| {
                let mut object = Map::new();
                for ((name, field_type), slot) in fields.iter().zip(record) {
                    object.insert(name.clone(), value_for(*field_type, slot));
                }
                Value::Object(object)
            })
            .collect()
    }

    fn slots_strategy() -> impl Strategy<Value = Vec<Vec<Slot>>> {
        let slot = (".{0,12}", any::<i64>(), -1.0e9f64..1.0e9, any::<bool>());
        proptest::collection::vec(proptest::collection::vec(slot, 6), 1..4)
    }

    proptest! {
        #[test]
        fn prop_valid_documents_round_trip(fields in spec_strategy(), slots in slots_strategy()) {
            let spec = ContentFieldSpec::from_typed("Model", fields.clone()).unwrap();
            let schema = build_output_model(&spec);
            let records = records_for(&fields, &slots);

            let document = json!({"outputs": [{
                "Model-content": records.clone(),
                "format_type": "json",
                "summary": "s"
            }]});

            let parsed = schema.validate(&document).unwrap();
            let round_tripped = parsed.to_json();
            prop_assert_eq!(&round_tripped["outputs"][0]["Model-content"], &Value::Array(records));
            prop_assert_eq!(&round_tripped["outputs"][0]["format_type"], "json");
        }

        #[test]
        fn prop_wrong_type_fails_whole_batch(
            fields in spec_strategy(),
            slots in slots_strategy(),
            pick in any::<prop::sample::Index>(),
        ) {
            let spec = ContentFieldSpec::from_typed("Model", fields.clone()).unwrap();
            let schema = build_output_model(&spec);
            let mut records = records_for(&fields, &slots);

            let record_idx = pick.index(records.len());
            let (name, field_type) = &fields[pick.index(fields.len())];
            records[record_idx][name.as_str()] = wrong_value_for(*field_type);

            let document = json!({"outputs": [{"Model-content": records}]});
            let err = schema.validate(&document).unwrap_err();
            let expected_path = format!("outputs[0].Model-content[{}].{}", record_idx, name);
            prop_assert_eq!(err.path(), Some(expected_path.as_str()));
        }

        #[test]
        fn prop_bare_record_lands_in_first_output(fields in spec_strategy(), slots in slots_strategy()) {
            let spec = ContentFieldSpec::from_typed("Model", fields.clone()).unwrap();
            let schema = build_output_model(&spec);
            let record = records_for(&fields, &slots[..1]).remove(0);

            let parsed = coerce(&record.to_string(), &schema).unwrap();
            prop_assert_eq!(parsed.outputs().len(), 1);
            prop_assert_eq!(parsed.outputs()[0].content.len(), 1);
        }

        #[test]
        fn prop_unknown_template_renders_default(
            name in "[a-z_]{1,16}",
            prompt in "[a-zA-Z0-9 ,.]{1,40}",
        ) {
            prop_assume!(TEMPLATES.iter().all(|t| t.name != name));

            let prompt = TaskPrompt::Text(prompt);
            let (resolved, logs) = with_captured_logs(|| resolve_template(&name));
            prop_assert!(resolved.fell_back);
            prop_assert!(logs.contains("WARN"));
            prop_assert!(logs.contains("Unknown task template"));
            let requested = format!("requested={:?}", name);
            prop_assert!(logs.contains(&requested));
            prop_assert_eq!(
                render_task(&name, &prompt).unwrap(),
                render_task("default", &prompt).unwrap()
            );
        }
    }

    #[test]
    fn test_fallback_keeps_the_first_error() {
        // Not enveloped, and the wrapped record has a bad rating too
        let schema = build_output_model(&film_spec());
        let err = coerce(r#"{"title": "X", "rating": "high"}"#, &schema).unwrap_err();
        assert_eq!(err.path(), Some("outputs"));
        assert!(!matches!(err, CoercionError::Syntax(_)));
    }

    #[test]
    fn test_empty_shape_is_independent_of_schema() {
        let expected = json!({
            "content": "",
            "format_type": "text",
            "prompt": "find prices",
            "url": "https://shop.example",
            "summary": "",
            "task_template": "default"
        });
        for _spec in [film_spec(), ContentFieldSpec::text_default()] {
            let envelope = assemble(None, "find prices", "default", Some("https://shop.example"));
            assert_eq!(envelope.to_json(), expected);
        }
    }

    // --- Pipeline ---

    fn request(template: &str, prompt: &str) -> RunRequest {
        RunRequest {
            content: film_spec(),
            template_name: template.to_string(),
            prompt: TaskPrompt::Text(prompt.to_string()),
        }
    }

    #[tokio::test]
    async fn test_pipeline_engine_produced_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let engine = StubEngine::new(None);
        let pipeline = Pipeline::new(engine.clone());
        let ctx = RunContext::new()
            .with_url("https://example.com")
            .with_results_dir(dir.path());

        let outcome = pipeline.run(&request("summary", "films"), &ctx).await.unwrap();

        assert!(outcome.parsed.is_none());
        assert!(outcome.envelope.is_empty());
        assert_eq!(outcome.envelope.as_map()["url"], "https://example.com");
        assert_eq!(outcome.output_path, Some(dir.path().join(OUTPUT_FILE_NAME)));
    }

    #[tokio::test]
    async fn test_pipeline_whitespace_answer_counts_as_nothing() {
        let pipeline = Pipeline::new(StubEngine::new(Some("  \n ")));
        let outcome = pipeline
            .run(&request("summary", "films"), &RunContext::new())
            .await
            .unwrap();
        assert!(outcome.envelope.is_empty());
        assert_eq!(outcome.output_path, None);
    }

    #[tokio::test]
    async fn test_pipeline_success_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let engine = StubEngine::new(Some(
            r#"{"title":"Heat","year":1995,"rating":8.3,"is_award_winner":false}"#,
        ));
        let pipeline = Pipeline::new(engine.clone());
        let ctx = RunContext::new().with_results_dir(dir.path().join("run"));

        let outcome = pipeline.run(&request("summary", "films"), &ctx).await.unwrap();

        let envelope = outcome.envelope.to_json();
        assert_eq!(envelope["task_template"], "summary");
        assert_eq!(envelope["prompt"], "films");
        assert_eq!(envelope["outputs"][0]["Film_Info-content"][0]["title"], "Heat");

        let written = std::fs::read_to_string(dir.path().join("run").join(OUTPUT_FILE_NAME)).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&written).unwrap(), envelope);

        let seen = engine.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, "Film_Info-content");
    }

    #[tokio::test]
    async fn test_pipeline_coercion_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(StubEngine::new(Some("I could not find any films.")));
        let ctx = RunContext::new().with_results_dir(dir.path().join("run"));

        let result = pipeline.run(&request("summary", "films"), &ctx).await;

        assert!(matches!(result, Err(ExtractorError::Coercion(CoercionError::Syntax(_)))));
        assert!(!dir.path().join("run").exists());
    }

    #[tokio::test]
    async fn test_pipeline_config_error_skips_engine() {
        let engine = StubEngine::new(Some("{}"));
        let pipeline = Pipeline::new(engine.clone());

        let result = pipeline
            .run(&request(TABULAR_TEMPLATE, "films"), &RunContext::new())
            .await;

        assert!(matches!(result, Err(ExtractorError::Config(_))));
        assert!(engine.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_rejects_empty_prompt() {
        let pipeline = Pipeline::new(StubEngine::new(None));
        let result = pipeline.run(&request("default", "   "), &RunContext::new()).await;
        assert!(matches!(result, Err(ExtractorError::Config(_))));
    }

    #[tokio::test]
    async fn test_citing_template_accepts_citations() {
        let engine = StubEngine::new(Some(
            r#"{"outputs":[{"Film_Info-content":[{"title":"Heat","citations":[
                {"source_text":"Heat (1995)","location":"header","location_url":"https://x.io#:~:text=Heat"}
            ]}]}]}"#,
        ));
        let pipeline = Pipeline::new(engine);

        let outcome = pipeline
            .run(&request("default", "films"), &RunContext::new())
            .await
            .unwrap();

        let parsed = outcome.parsed.unwrap();
        let record = &parsed.outputs()[0].content[0];
        assert_eq!(record.citations().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_template_runs_default() {
        let engine = StubEngine::new(None);
        let pipeline = Pipeline::new(engine.clone());

        let outcome = pipeline
            .run(&request("no-such-template", "films"), &RunContext::new())
            .await
            .unwrap();

        assert_eq!(outcome.task.template_name(), "default");
        assert_eq!(outcome.envelope.as_map()["task_template"], "default");
    }
}
