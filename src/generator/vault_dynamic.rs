//! The `VaultDynamicSecret` generator.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

use super::error::Result;
use super::normalizer::{FlatSecretMap, Normalizer, ValueEncoding};
use super::spec::VAULT_DYNAMIC_SECRET_KIND;
use super::translator::{Translation, Translator};
use super::{GeneratedSecret, Generator, GeneratorState};
use crate::vault::BackendFactory;

/// Resolves one `VaultDynamicSecret` payload into flat secret data.
///
/// Holds only injected collaborators; every invocation is independent and
/// nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct VaultDynamicSecretGenerator {
    translator: Translator,
    normalizer: Normalizer,
}

impl VaultDynamicSecretGenerator {
    pub fn new(factory: Arc<dyn BackendFactory>) -> Self {
        Self::with_encoding(factory, ValueEncoding::default())
    }

    pub fn with_encoding(factory: Arc<dyn BackendFactory>, encoding: ValueEncoding) -> Self {
        Self { translator: Translator::new(factory), normalizer: Normalizer::new(encoding) }
    }

    async fn resolve(&self, cancel: &CancellationToken, payload: Option<&[u8]>) -> Result<FlatSecretMap> {
        let Translation { descriptor, response } = self.translator.translate(cancel, payload).await?;
        self.normalizer.normalize(&descriptor, response.as_ref())
    }
}

#[async_trait]
impl Generator for VaultDynamicSecretGenerator {
    fn kind(&self) -> &'static str {
        VAULT_DYNAMIC_SECRET_KIND
    }

    async fn generate(
        &self,
        cancel: &CancellationToken,
        payload: Option<&[u8]>,
    ) -> Result<GeneratedSecret> {
        let span = crate::generator_span!(self.kind());
        async {
            match self.resolve(cancel, payload).await {
                Ok(data) => {
                    info!(keys = data.len(), "Generated dynamic secret");
                    Ok(GeneratedSecret { data, state: None })
                }
                Err(e) => {
                    warn!(error_kind = e.code(), error = %e, "Dynamic secret generation failed");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn cleanup(
        &self,
        _cancel: &CancellationToken,
        _payload: Option<&[u8]>,
        _state: Option<&GeneratorState>,
    ) -> Result<()> {
        debug!(kind = self.kind(), "Cleanup requested; Vault leases are left to expire");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{GeneratorError, Operation};
    use crate::vault::{self, LogicalBackend, SecretResponse, VaultApiError, VaultProvider};
    use serde_json::{json, Map, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    struct RecordedCall {
        operation: Operation,
        path: String,
        body: Option<Map<String, Value>>,
    }

    #[derive(Debug, Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<RecordedCall>>,
        response: Option<SecretResponse>,
        failure_status: Option<u16>,
        hang: bool,
    }

    impl RecordingBackend {
        fn answering(body: Value) -> Self {
            Self { response: Some(serde_json::from_value(body).unwrap()), ..Default::default() }
        }

        fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        async fn answer(
            &self,
            cancel: &CancellationToken,
            operation: Operation,
            path: &str,
            body: Option<&Map<String, Value>>,
        ) -> vault::error::Result<Option<SecretResponse>> {
            self.calls.lock().unwrap().push(RecordedCall {
                operation,
                path: path.to_string(),
                body: body.cloned(),
            });
            if self.hang {
                cancel.cancelled().await;
                return Err(VaultApiError::Cancelled);
            }
            if let Some(status) = self.failure_status {
                return Err(VaultApiError::Status { status, errors: vec!["permission denied".to_string()] });
            }
            Ok(self.response.clone())
        }
    }

    #[async_trait]
    impl LogicalBackend for RecordingBackend {
        async fn read(&self, cancel: &CancellationToken, path: &str) -> vault::error::Result<Option<SecretResponse>> {
            self.answer(cancel, Operation::Read, path, None).await
        }

        async fn list(&self, cancel: &CancellationToken, path: &str) -> vault::error::Result<Option<SecretResponse>> {
            self.answer(cancel, Operation::List, path, None).await
        }

        async fn delete(&self, cancel: &CancellationToken, path: &str) -> vault::error::Result<Option<SecretResponse>> {
            self.answer(cancel, Operation::Delete, path, None).await
        }

        async fn write(
            &self,
            cancel: &CancellationToken,
            path: &str,
            data: &Map<String, Value>,
        ) -> vault::error::Result<Option<SecretResponse>> {
            self.answer(cancel, Operation::Write, path, Some(data)).await
        }
    }

    #[derive(Debug)]
    struct FakeFactory {
        backend: Arc<RecordingBackend>,
        connects: AtomicUsize,
        refuse: bool,
    }

    impl FakeFactory {
        fn new(backend: RecordingBackend) -> Arc<Self> {
            Arc::new(Self { backend: Arc::new(backend), connects: AtomicUsize::new(0), refuse: false })
        }
    }

    #[async_trait]
    impl BackendFactory for FakeFactory {
        async fn connect(
            &self,
            _cancel: &CancellationToken,
            provider: &VaultProvider,
        ) -> vault::error::Result<Arc<dyn LogicalBackend>> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if self.refuse {
                return Err(VaultApiError::invalid_address(&provider.server, "unreachable"));
            }
            Ok(self.backend.clone())
        }
    }

    fn payload(spec: Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "apiVersion": "generators.dynsecret.io/v1alpha1",
            "kind": "VaultDynamicSecret",
            "spec": spec,
        }))
        .unwrap()
    }

    fn generator(factory: &Arc<FakeFactory>) -> VaultDynamicSecretGenerator {
        VaultDynamicSecretGenerator::new(factory.clone())
    }

    #[tokio::test]
    async fn test_read_data_shape() {
        let factory = FakeFactory::new(RecordingBackend::answering(json!({
            "lease_id": "database/creds/ro/abc",
            "data": {"user": "u1", "pass": "p1"}
        })));
        let payload = payload(json!({
            "provider": {"server": "http://vault:8200"},
            "path": "database/creds/ro",
            "method": "GET"
        }));

        let secret = generator(&factory).generate(&CancellationToken::new(), Some(payload.as_slice())).await.unwrap();
        assert_eq!(secret.data["user"], b"u1".to_vec());
        assert_eq!(secret.data["pass"], b"p1".to_vec());
        assert_eq!(secret.data.len(), 2);
        assert!(secret.state.is_none());

        assert_eq!(
            factory.backend.calls(),
            vec![RecordedCall { operation: Operation::Read, path: "database/creds/ro".to_string(), body: None }]
        );
    }

    #[tokio::test]
    async fn test_write_auth_shape() {
        let factory = FakeFactory::new(RecordingBackend::answering(json!({
            "auth": {"client_token": "abc"}
        })));
        let payload = payload(json!({
            "provider": {"server": "http://vault:8200"},
            "path": "auth/token/create",
            "method": "POST",
            "parameters": {"policies": ["web"]},
            "resultType": "Auth"
        }));

        let secret = generator(&factory).generate(&CancellationToken::new(), Some(payload.as_slice())).await.unwrap();
        assert_eq!(secret.data.len(), 1);
        assert_eq!(secret.data["client_token"], b"abc".to_vec());

        let calls = factory.backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].operation, Operation::Write);
        assert_eq!(calls[0].body.as_ref().unwrap()["policies"], json!(["web"]));
    }

    #[tokio::test]
    async fn test_each_method_issues_exactly_one_call() {
        for (method, expected) in [
            ("", Operation::Read),
            ("GET", Operation::Read),
            ("LIST", Operation::List),
            ("DELETE", Operation::Delete),
            ("PATCH", Operation::Write),
            ("get", Operation::Write),
        ] {
            let factory = FakeFactory::new(RecordingBackend::default());
            let payload = payload(json!({
                "provider": {"server": "http://vault:8200"},
                "path": "secret/app",
                "method": method,
                "allowEmptyResponse": true
            }));

            let secret =
                generator(&factory).generate(&CancellationToken::new(), Some(payload.as_slice())).await.unwrap();
            assert!(secret.data.is_empty());

            let calls = factory.backend.calls();
            assert_eq!(calls.len(), 1, "method {:?}", method);
            assert_eq!(calls[0].operation, expected, "method {:?}", method);
        }
    }

    #[tokio::test]
    async fn test_empty_response_rejected() {
        let factory = FakeFactory::new(RecordingBackend::default());
        let payload = payload(json!({
            "provider": {"server": "http://vault:8200"},
            "path": "secret/missing"
        }));

        let err = generator(&factory).generate(&CancellationToken::new(), Some(payload.as_slice())).await.unwrap_err();
        assert!(matches!(err, GeneratorError::EmptyBackendResponse { ref path } if path == "secret/missing"));
    }

    #[tokio::test]
    async fn test_nested_value_fails_whole_invocation() {
        let factory = FakeFactory::new(RecordingBackend::answering(json!({
            "data": {"user": "u1", "nested": {"a": 1}}
        })));
        let payload = payload(json!({"provider": {}, "path": "secret/app"}));

        let err = generator(&factory).generate(&CancellationToken::new(), Some(payload.as_slice())).await.unwrap_err();
        assert_eq!(err.code(), "ValueConversionError");
    }

    #[tokio::test]
    async fn test_json_encoding_accepts_nested_values() {
        let factory = FakeFactory::new(RecordingBackend::answering(json!({
            "data": {"nested": {"a": 1}}
        })));
        let generator = VaultDynamicSecretGenerator::with_encoding(factory.clone(), ValueEncoding::Json);
        let payload = payload(json!({"provider": {}, "path": "secret/app"}));

        let secret = generator.generate(&CancellationToken::new(), Some(payload.as_slice())).await.unwrap();
        assert_eq!(secret.data["nested"], br#"{"a":1}"#.to_vec());
    }

    #[tokio::test]
    async fn test_malformed_parameters_make_no_call() {
        let factory = FakeFactory::new(RecordingBackend::default());
        let payload = payload(json!({
            "provider": {"server": "http://vault:8200"},
            "path": "aws/creds/deploy",
            "method": "POST",
            "parameters": ["not", "a", "map"]
        }));

        let err = generator(&factory).generate(&CancellationToken::new(), Some(payload.as_slice())).await.unwrap_err();
        assert!(matches!(err, GeneratorError::ParameterDecode { .. }));
        assert!(factory.backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_payload_and_provider() {
        let factory = FakeFactory::new(RecordingBackend::default());
        let generator = generator(&factory);
        let cancel = CancellationToken::new();

        let err = generator.generate(&cancel, None).await.unwrap_err();
        assert!(matches!(err, GeneratorError::MissingSpec));

        let err = generator.generate(&cancel, Some(b"".as_slice())).await.unwrap_err();
        assert!(matches!(err, GeneratorError::MissingProviderConfig));

        let err = generator.generate(&cancel, Some(payload(json!({"path": "secret/app"})).as_slice())).await.unwrap_err();
        assert!(matches!(err, GeneratorError::MissingProviderConfig));

        assert_eq!(factory.connects.load(Ordering::SeqCst), 0);
        assert!(factory.backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_client_setup_failure() {
        let factory = Arc::new(FakeFactory {
            backend: Arc::new(RecordingBackend::default()),
            connects: AtomicUsize::new(0),
            refuse: true,
        });
        let payload = payload(json!({"provider": {"server": "http://nowhere"}, "path": "secret/app"}));

        let err = generator(&factory).generate(&CancellationToken::new(), Some(payload.as_slice())).await.unwrap_err();
        assert!(matches!(err, GeneratorError::ClientSetup(_)));
        assert!(factory.backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let factory = FakeFactory::new(RecordingBackend { failure_status: Some(403), ..Default::default() });
        let payload = payload(json!({"provider": {}, "path": "secret/app", "method": "DELETE"}));

        let err = generator(&factory).generate(&CancellationToken::new(), Some(payload.as_slice())).await.unwrap_err();
        match err {
            GeneratorError::BackendCall { path, operation, source } => {
                assert_eq!(path, "secret/app");
                assert_eq!(operation, Operation::Delete);
                assert!(matches!(source, VaultApiError::Status { status: 403, .. }));
            }
            other => panic!("expected BackendCall, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancellation_during_call() {
        let factory = FakeFactory::new(RecordingBackend { hang: true, ..Default::default() });
        let payload = payload(json!({"provider": {}, "path": "secret/app"}));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = generator(&factory).generate(&cancel, Some(payload.as_slice())).await.unwrap_err();
        assert!(matches!(err, GeneratorError::BackendCall { source: VaultApiError::Cancelled, .. }));
        assert_eq!(factory.backend.calls().len(), 1);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_logs_carry_structure_not_values() {
        let factory = FakeFactory::new(RecordingBackend::answering(json!({
            "data": {"password": "Zq8-very-secret-value"}
        })));
        let payload = payload(json!({"provider": {}, "path": "database/creds/ro"}));

        generator(&factory).generate(&CancellationToken::new(), Some(payload.as_slice())).await.unwrap();
        assert!(logs_contain("Generated dynamic secret"));
        assert!(logs_contain("keys=1"));
        assert!(!logs_contain("Zq8-very-secret-value"));

        let err = generator(&factory).generate(&CancellationToken::new(), None).await.unwrap_err();
        assert!(matches!(err, GeneratorError::MissingSpec));
        assert!(logs_contain("MissingSpec"));
    }

    #[tokio::test]
    async fn test_cleanup_is_noop() {
        let factory = FakeFactory::new(RecordingBackend::default());
        let generator = generator(&factory);

        generator.cleanup(&CancellationToken::new(), None, None).await.unwrap();
        assert_eq!(factory.connects.load(Ordering::SeqCst), 0);
        assert!(factory.backend.calls().is_empty());
    }

    #[test]
    fn test_kind() {
        let factory = FakeFactory::new(RecordingBackend::default());
        assert_eq!(generator(&factory).kind(), "VaultDynamicSecret");
    }
}
