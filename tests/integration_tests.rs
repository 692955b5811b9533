//! Integration tests against a mock chat-completions gateway.

#[cfg(test)]
mod tests {
    use percent::chat::{ChatConfig, ChatSession, Renderer};
    use percent::{
        ChatMessage, Error, Gateway, StreamHandler, StreamOutcome, StreamRequest, WriteMode,
    };
    use url::Url;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Records every callback in order.
    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl StreamHandler for Recorder {
        fn on_start(&mut self) {
            self.events.push("start".to_string());
        }

        fn on_token(&mut self, token: &str) {
            self.events.push(format!("token:{token}"));
        }

        fn on_end(&mut self, text: &str) {
            self.events.push(format!("end:{text}"));
        }

        fn on_error(&mut self, error: &Error) {
            self.events.push(format!("error:{}", error.status_code().unwrap_or(0)));
        }
    }

    /// Renders into memory.
    #[derive(Default)]
    struct Captured {
        text: String,
        finished: usize,
        generated: Vec<(std::path::PathBuf, WriteMode)>,
    }

    impl Renderer for Captured {
        fn start_thinking(&mut self) {}
        fn stop_thinking(&mut self) {}
        fn print_text(&mut self, text: &str) {
            self.text.push_str(text);
        }
        fn finish_response(&mut self) {
            self.finished += 1;
        }
        fn print_info(&mut self, _: &str) {}
        fn print_warning(&mut self, _: &str) {}
        fn print_error(&mut self, _: &str) {}
        fn print_generated(&mut self, path: &std::path::Path, mode: WriteMode) {
            self.generated.push((path.to_path_buf(), mode));
        }
        fn print_skipped(&mut self, _: &std::path::Path) {}
    }

    fn delta(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"id": "gen-1", "choices": [{"delta": {"content": content}}]})
        )
    }

    fn endpoint(server: &MockServer) -> Url {
        Url::parse(&format!("{}/api/v1/chat/completions", server.uri())).unwrap()
    }

    async fn sse_server(body: String) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn tokens_then_end() {
        let body = format!(
            ": OPENROUTER PROCESSING\n\n{}{}{}data: [DONE]\n\n",
            delta("Hel"),
            delta("lo"),
            delta("")
        );
        let server = sse_server(body).await;
        let request = StreamRequest::new(
            endpoint(&server),
            "sk-test",
            "m/x",
            vec![ChatMessage::user("hi")],
        );

        let gateway = Gateway::new().unwrap();
        let (recorder, outcome) = gateway.stream_chat(&request, Recorder::default()).await;

        assert_eq!(
            recorder.events,
            vec!["start", "token:Hel", "token:lo", "end:Hello"]
        );
        assert_eq!(outcome.text(), Some("Hello"));
    }

    #[tokio::test]
    async fn request_carries_body_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(header("x-title", "percent-cli"))
            .and(body_partial_json(serde_json::json!({
                "model": "openai/gpt-4o-mini",
                "stream": true,
                "messages": [{"role": "user", "content": "hi"}]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "text/event-stream")
                    .set_body_string(format!("{}data: [DONE]\n\n", delta("ok"))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let request = StreamRequest::new(
            endpoint(&server),
            "sk-test",
            "openai/gpt-4o-mini",
            vec![ChatMessage::user("hi")],
        );
        let (_, outcome) = Gateway::new()
            .unwrap()
            .stream_chat(&request, Recorder::default())
            .await;
        assert_eq!(outcome.into_result().unwrap(), "ok");
    }

    #[tokio::test]
    async fn unauthorized_fires_one_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_string("{\"error\":{\"message\":\"No auth credentials found\"}}"),
            )
            .mount(&server)
            .await;

        let request = StreamRequest::new(endpoint(&server), "bad", "m/x", vec![]);
        let (recorder, outcome) = Gateway::new()
            .unwrap()
            .stream_chat(&request, Recorder::default())
            .await;

        assert_eq!(recorder.events, vec!["error:401"]);
        match outcome {
            StreamOutcome::Failed(err) => {
                assert!(err.is_transport());
                assert!(err.to_string().contains("No auth credentials found"));
            }
            StreamOutcome::Completed(_) => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn bytes_after_done_are_ignored() {
        let body = format!(
            "{}data: [DONE]\n\n{}",
            delta("only"),
            delta("ignored")
        );
        let server = sse_server(body).await;
        let request = StreamRequest::new(endpoint(&server), "k", "m/x", vec![]);
        let (recorder, _) = Gateway::new()
            .unwrap()
            .stream_chat(&request, Recorder::default())
            .await;
        assert_eq!(recorder.events, vec!["start", "token:only", "end:only"]);
    }

    #[tokio::test]
    async fn close_without_done_still_ends() {
        let server = sse_server(format!("{}{}", delta("a"), delta("b"))).await;
        let request = StreamRequest::new(endpoint(&server), "k", "m/x", vec![]);
        let (recorder, _) = Gateway::new()
            .unwrap()
            .stream_chat(&request, Recorder::default())
            .await;
        assert_eq!(recorder.events, vec!["start", "token:a", "token:b", "end:ab"]);
    }

    #[tokio::test]
    async fn unreachable_gateway_fires_one_error() {
        // Bind then release a port so nothing is listening on it.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let url = Url::parse(&format!("http://127.0.0.1:{port}/api/v1/chat/completions")).unwrap();

        let request = StreamRequest::new(url, "k", "m/x", vec![]);
        let (recorder, outcome) = Gateway::new()
            .unwrap()
            .stream_chat(&request, Recorder::default())
            .await;
        assert_eq!(recorder.events, vec!["error:0"]);
        assert!(matches!(outcome, StreamOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn session_turn_writes_code_blocks() {
        let reply = "Here you go:\n```ts file=\"src/a.ts\"\nexport const a = 1;\n```\n";
        let body = format!("{}data: [DONE]\n\n", delta(reply));
        let server = sse_server(body).await;
        let dir = tempfile::tempdir().unwrap();

        let config = ChatConfig::new()
            .with_api_key("k")
            .with_endpoint(endpoint(&server))
            .with_out_dir(dir.path());
        let mut session = ChatSession::new(Gateway::new().unwrap(), config);
        let mut renderer = Captured::default();

        let text = session.send_streaming("make a.ts", &mut renderer).await.unwrap();
        assert_eq!(text, reply);
        assert_eq!(renderer.text, reply);
        assert_eq!(renderer.finished, 1);
        assert_eq!(session.message_count(), 2);

        let mut resolver = percent::codegen::FixedDecision(percent::ConflictDecision::Skip);
        let extraction = session
            .write_code_blocks(&text, &mut renderer, &mut resolver)
            .await
            .unwrap();
        assert_eq!(extraction.files.len(), 1);
        assert_eq!(renderer.generated[0].1, WriteMode::Write);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("src/a.ts")).unwrap(),
            "export const a = 1;\n"
        );
    }

    #[tokio::test]
    async fn failed_turn_rolls_back_user_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = ChatConfig::new()
            .with_api_key("k")
            .with_endpoint(endpoint(&server));
        let mut session = ChatSession::new(Gateway::new().unwrap(), config);
        let mut renderer = Captured::default();

        let err = session
            .send_streaming("hello?", &mut renderer)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(500));
        assert_eq!(session.message_count(), 0);
        assert!(session.conversation().messages.is_empty());
        assert!(renderer.text.is_empty());
    }

    #[tokio::test]
    async fn history_is_saved_after_a_turn() {
        let server = sse_server(format!("{}data: [DONE]\n\n", delta("hi there"))).await;
        let dir = tempfile::tempdir().unwrap();
        let store = percent::history::HistoryStore::new(dir.path().join("history.json"));

        let config = ChatConfig::new()
            .with_api_key("k")
            .with_endpoint(endpoint(&server));
        let mut session =
            ChatSession::new(Gateway::new().unwrap(), config).with_history(store.clone());
        session
            .send_streaming("hello", &mut Captured::default())
            .await
            .unwrap();

        let saved = store.load();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id, session.conversation().id);
        assert_eq!(
            saved[0].messages,
            vec![ChatMessage::user("hello"), ChatMessage::assistant("hi there")]
        );
    }
}
