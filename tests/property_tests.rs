use echoprobe::common::{MockReply, MockTransport};
use echoprobe::{EchoPayload, EchoRequester, HealthChecker, ProbeConfig};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: the request body decodes to exactly `{message}`
    #[test]
    fn echo_body_is_exactly_the_message(message in "\\PC+") {
        tokio_test::block_on(async {
            let transport = MockTransport::always(MockReply::json(200, "{}"));
            let requester = EchoRequester::with_transport(ProbeConfig::default(), transport.clone())
                .map_err(|e| TestCaseError::fail(format!("Requester setup failed: {}", e)))?;

            requester.send(&message).await
                .map_err(|e| TestCaseError::fail(format!("Send failed: {}", e)))?;

            let requests = transport.requests();
            prop_assert_eq!(requests.len(), 1);
            let body: serde_json::Value = serde_json::from_slice(&requests[0].body)
                .map_err(|e| TestCaseError::fail(format!("Body is not JSON: {}", e)))?;
            prop_assert_eq!(body, serde_json::json!({ "message": message.clone() }));

            let payload: EchoPayload = serde_json::from_slice(&requests[0].body)
                .map_err(|e| TestCaseError::fail(format!("Body is not a payload: {}", e)))?;
            prop_assert_eq!(payload.message, message);
            Ok(())
        })?;
    }

    /// Property: identical calls against a deterministic mock give identical outcomes
    #[test]
    fn echo_outcomes_are_repeatable(
        message in "[a-zA-Z0-9 ]{1,64}",
        status in prop::sample::select(vec![200u16, 400, 404, 500, 503]),
        body in prop::sample::select(vec![
            r#"{"message":"x","version":"v1","commit":"abc","env":"dev"}"#,
            "not json",
            "",
        ]),
    ) {
        tokio_test::block_on(async {
            let transport = MockTransport::always(MockReply::json(status, body));
            let requester = EchoRequester::with_transport(ProbeConfig::default(), transport)
                .map_err(|e| TestCaseError::fail(format!("Requester setup failed: {}", e)))?;

            let first = requester.send(&message).await;
            let second = requester.send(&message).await;
            prop_assert_eq!(first, second);
            Ok(())
        })?;
    }

    /// Property: any non-empty status string comes back unchanged
    #[test]
    fn health_returns_status_verbatim(status in "\\PC+") {
        tokio_test::block_on(async {
            let body = serde_json::json!({ "status": status.clone() }).to_string();
            let transport = MockTransport::always(MockReply::json(200, &body));
            let checker = HealthChecker::with_transport(ProbeConfig::default(), transport)
                .map_err(|e| TestCaseError::fail(format!("Checker setup failed: {}", e)))?;

            let reported = checker.check().await
                .map_err(|e| TestCaseError::fail(format!("Check failed: {}", e)))?;
            prop_assert_eq!(reported, status);
            Ok(())
        })?;
    }
}
