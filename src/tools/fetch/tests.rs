#[cfg(test)]
mod tests {
    use crate::engine::SnapshotSource;
    use crate::error::SubcountError;
    use crate::services::log::ActivityLogger;
    use crate::tools::fetch::{parse_snapshot, FetchOptions, FetchPolicy, RedditFetcher};
    use chrono::{Local, TimeZone};
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::runtime::Runtime;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const UNIT: Duration = Duration::from_millis(1);

    /// Mock server driven by its own runtime; the blocking client runs on the test thread.
    struct MockApi {
        server: MockServer,
        rt: Runtime,
    }

    impl MockApi {
        fn start() -> Self {
            let rt = Runtime::new().unwrap();
            let server = rt.block_on(MockServer::start());
            Self { server, rt }
        }

        fn mount(&self, mock: Mock) {
            self.rt.block_on(mock.mount(&self.server));
        }

        fn hits(&self, request_path: &str) -> usize {
            self.rt
                .block_on(self.server.received_requests())
                .unwrap_or_default()
                .iter()
                .filter(|r| r.url.path() == request_path)
                .count()
        }

        fn options(&self, policy: FetchPolicy) -> FetchOptions {
            FetchOptions::new(policy)
                .with_base_url(&self.server.uri())
                .unwrap()
                .with_backoff_unit(UNIT)
        }
    }

    fn about_body(subscribers: u64, created: f64) -> serde_json::Value {
        json!({
            "kind": "t5",
            "data": { "display_name": "foo", "subscribers": subscribers, "created": created }
        })
    }

    fn recording_fetcher(options: FetchOptions) -> (RedditFetcher, Arc<Mutex<Vec<Duration>>>) {
        let delays = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&delays);
        let fetcher =
            RedditFetcher::new(options).with_sleeper(move |d: Duration| sink.lock().unwrap().push(d));
        (fetcher, delays)
    }

    #[test]
    fn returns_snapshot_for_valid_body() {
        let api = MockApi::start();
        api.mount(
            Mock::given(method("GET"))
                .and(path("/r/foo/about.json"))
                .respond_with(ResponseTemplate::new(200).set_body_json(about_body(12345, 1609459200.0))),
        );

        let (fetcher, delays) = recording_fetcher(api.options(FetchPolicy::Plain));
        let before = Local::now();
        let snap = fetcher.fetch("foo", 3).unwrap();

        assert_eq!(snap.subscriber_count, 12345);
        assert_eq!(snap.created_at, Local.timestamp_opt(1_609_459_200, 0).unwrap());
        assert!(snap.fetched_at >= before);
        assert!(delays.lock().unwrap().is_empty());
        assert_eq!(api.hits("/r/foo/about.json"), 1);
    }

    #[test]
    fn retries_until_success_with_growing_backoff() {
        let api = MockApi::start();
        api.mount(
            Mock::given(method("GET"))
                .and(path("/r/foo/about.json"))
                .respond_with(ResponseTemplate::new(503))
                .up_to_n_times(2)
                .with_priority(1),
        );
        api.mount(
            Mock::given(method("GET"))
                .and(path("/r/foo/about.json"))
                .respond_with(ResponseTemplate::new(200).set_body_json(about_body(42, 1609459200.0)))
                .with_priority(2),
        );

        let (fetcher, delays) = recording_fetcher(api.options(FetchPolicy::Plain));
        let snap = fetcher.fetch("foo", 3).unwrap();

        assert_eq!(snap.subscriber_count, 42);
        let delays = delays.lock().unwrap().clone();
        assert_eq!(delays, vec![UNIT * 2, UNIT * 4]);
        assert!(delays[1] > delays[0]);
        assert_eq!(api.hits("/r/foo/about.json"), 3);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let api = MockApi::start();
        api.mount(
            Mock::given(method("GET"))
                .and(path("/r/foo/about.json"))
                .respond_with(ResponseTemplate::new(429)),
        );

        let (fetcher, delays) = recording_fetcher(api.options(FetchPolicy::Plain));
        let err = fetcher.fetch("foo", 3).unwrap_err();

        match err {
            SubcountError::Retrieval { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, SubcountError::HttpStatus { status: 429, .. }));
            }
            other => panic!("expected Retrieval, got {:?}", other),
        }
        assert_eq!(api.hits("/r/foo/about.json"), 3);
        // No sleep after the final attempt
        assert_eq!(delays.lock().unwrap().len(), 2);
    }

    #[test]
    fn single_attempt_budget_never_sleeps() {
        let api = MockApi::start();
        api.mount(
            Mock::given(method("GET"))
                .and(path("/r/foo/about.json"))
                .respond_with(ResponseTemplate::new(500)),
        );

        let (fetcher, delays) = recording_fetcher(api.options(FetchPolicy::Plain));
        let err = fetcher.fetch("foo", 0).unwrap_err();

        assert!(matches!(err, SubcountError::Retrieval { attempts: 1, .. }));
        assert_eq!(api.hits("/r/foo/about.json"), 1);
        assert!(delays.lock().unwrap().is_empty());
    }

    #[test]
    fn missing_subscribers_fails_without_retry() {
        let api = MockApi::start();
        api.mount(
            Mock::given(method("GET"))
                .and(path("/r/foo/about.json"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!({ "data": { "created": 1609459200.0 } })),
                ),
        );

        let (fetcher, delays) = recording_fetcher(api.options(FetchPolicy::Plain));
        let err = fetcher.fetch("foo", 3).unwrap_err();

        assert!(matches!(err, SubcountError::MalformedResponse(_)));
        assert!(err.to_string().contains("subscribers"));
        assert_eq!(api.hits("/r/foo/about.json"), 1);
        assert!(delays.lock().unwrap().is_empty());
    }

    #[test]
    fn non_json_body_is_malformed() {
        let api = MockApi::start();
        api.mount(
            Mock::given(method("GET"))
                .and(path("/r/foo/about.json"))
                .respond_with(ResponseTemplate::new(200).set_body_string("<html>blocked</html>")),
        );

        let (fetcher, _delays) = recording_fetcher(api.options(FetchPolicy::Plain));
        let err = fetcher.fetch("foo", 3).unwrap_err();
        assert!(matches!(err, SubcountError::MalformedResponse(_)));
        assert_eq!(api.hits("/r/foo/about.json"), 1);
    }

    #[test]
    fn hardened_warms_up_once_and_sends_browser_headers() {
        let api = MockApi::start();
        let referer = format!("{}/r/foo/", api.server.uri());
        api.mount(
            Mock::given(method("GET"))
                .and(path("/r/foo/"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("set-cookie", "session=abc; Path=/")
                        .set_body_string("<html></html>"),
                ),
        );
        api.mount(
            Mock::given(method("GET"))
                .and(path("/r/foo/about.json"))
                .respond_with(ResponseTemplate::new(503))
                .up_to_n_times(1)
                .with_priority(1),
        );
        api.mount(
            Mock::given(method("GET"))
                .and(path("/r/foo/about.json"))
                .and(header("referer", referer.as_str()))
                .and(header("sec-fetch-mode", "cors"))
                .and(header("cookie", "session=abc"))
                .respond_with(ResponseTemplate::new(200).set_body_json(about_body(7, 1609459200.0)))
                .with_priority(2),
        );

        let (fetcher, delays) = recording_fetcher(api.options(FetchPolicy::Hardened));
        let snap = fetcher.fetch("foo", 3).unwrap();

        assert_eq!(snap.subscriber_count, 7);
        assert_eq!(api.hits("/r/foo/"), 1);
        assert_eq!(api.hits("/r/foo/about.json"), 2);
        // warm-up pause, then one backoff
        assert_eq!(delays.lock().unwrap().clone(), vec![UNIT, UNIT * 2]);
    }

    #[test]
    fn plain_skips_warm_up() {
        let api = MockApi::start();
        api.mount(
            Mock::given(method("GET"))
                .and(path("/r/foo/about.json"))
                .and(header("user-agent", "member_counter/1.0"))
                .respond_with(ResponseTemplate::new(200).set_body_json(about_body(1, 1609459200.0))),
        );

        let (fetcher, _delays) = recording_fetcher(api.options(FetchPolicy::Plain));
        fetcher.fetch("foo", 3).unwrap();
        assert_eq!(api.hits("/r/foo/"), 0);
    }

    #[test]
    fn warm_up_failure_does_not_stop_fetch() {
        let api = MockApi::start();
        api.mount(
            Mock::given(method("GET"))
                .and(path("/r/foo/"))
                .respond_with(ResponseTemplate::new(403)),
        );
        api.mount(
            Mock::given(method("GET"))
                .and(path("/r/foo/about.json"))
                .respond_with(ResponseTemplate::new(200).set_body_json(about_body(9, 1609459200.0))),
        );

        let (fetcher, _delays) = recording_fetcher(api.options(FetchPolicy::Hardened));
        assert_eq!(fetcher.fetch("foo", 1).unwrap().subscriber_count, 9);
    }

    #[test]
    fn transport_errors_are_retried() {
        // Nothing listens on port 1
        let options = FetchOptions::new(FetchPolicy::Plain)
            .with_base_url("http://127.0.0.1:1")
            .unwrap()
            .with_backoff_unit(UNIT);
        let (fetcher, delays) = recording_fetcher(options);

        let err = fetcher.fetch("foo", 2).unwrap_err();
        match err {
            SubcountError::Retrieval { attempts, source } => {
                assert_eq!(attempts, 2);
                assert!(matches!(*source, SubcountError::Transport { .. }));
            }
            other => panic!("expected Retrieval, got {:?}", other),
        }
        assert_eq!(delays.lock().unwrap().clone(), vec![UNIT * 2]);
    }

    #[test]
    fn slow_responses_time_out_and_are_retried() {
        let api = MockApi::start();
        api.mount(
            Mock::given(method("GET"))
                .and(path("/r/foo/about.json"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(about_body(7, 1609459200.0))
                        .set_delay(Duration::from_secs(2)),
                ),
        );

        let options = api
            .options(FetchPolicy::Hardened)
            .with_request_timeout(Some(Duration::from_millis(100)));
        let (fetcher, delays) = recording_fetcher(options);

        let err = fetcher.fetch("foo", 2).unwrap_err();
        match err {
            SubcountError::Retrieval { attempts, source } => {
                assert_eq!(attempts, 2);
                assert!(matches!(*source, SubcountError::Transport { .. }));
            }
            other => panic!("expected Retrieval, got {:?}", other),
        }
        // Warm-up pause, then one backoff between the two data requests
        assert_eq!(delays.lock().unwrap().clone(), vec![UNIT, UNIT * 2]);
        assert_eq!(api.hits("/r/foo/about.json"), 2);
    }

    #[test]
    fn retries_are_written_to_activity_log() {
        let api = MockApi::start();
        api.mount(
            Mock::given(method("GET"))
                .and(path("/r/foo/about.json"))
                .respond_with(ResponseTemplate::new(429))
                .up_to_n_times(1)
                .with_priority(1),
        );
        api.mount(
            Mock::given(method("GET"))
                .and(path("/r/foo/about.json"))
                .respond_with(ResponseTemplate::new(200).set_body_json(about_body(5, 1609459200.0)))
                .with_priority(2),
        );

        let dir = tempfile::tempdir().unwrap();
        let logger = ActivityLogger::at(dir.path().join("activity.log")).unwrap();
        let (fetcher, _delays) = recording_fetcher(api.options(FetchPolicy::Plain));
        let fetcher = fetcher.with_logger(logger.clone());
        fetcher.fetch("foo", 3).unwrap();

        let lines = logger.read_logs(Some("foo"), false).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("fetch r/foo 5 subscribers after 2 attempt(s)"));
        assert!(lines[1].contains("rate limited"));
    }

    #[test]
    fn parse_rejects_mistyped_fields() {
        assert!(matches!(
            parse_snapshot(r#"{"data":{"subscribers":"many","created":1.0}}"#),
            Err(SubcountError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_snapshot(r#"{"data":{"subscribers":-3,"created":1.0}}"#),
            Err(SubcountError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_snapshot(r#"{"data":{"subscribers":3}}"#),
            Err(SubcountError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_snapshot(r#"{"subscribers":3,"created":1.0}"#),
            Err(SubcountError::MalformedResponse(_))
        ));
    }

    #[test]
    fn parse_keeps_fractional_created() {
        let snap = parse_snapshot(r#"{"data":{"subscribers":3,"created":1609459200.5}}"#).unwrap();
        assert_eq!(
            snap.created_at,
            Local.timestamp_opt(1_609_459_200, 500_000_000).unwrap()
        );
    }
}
