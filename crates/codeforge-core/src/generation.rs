//! Prompt -> next assistant message

use crate::error::GenerationError;
use crate::ports::GenerationBackend;
use crate::session::SharedSession;
use codeforge_types::{Artifact, GenerateRequest, Message};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
pub struct GenerationClient {
    backend: Arc<dyn GenerationBackend>,
}

impl GenerationClient {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    /// Send `prompt` with the conversation so far.
    ///
    /// The user message is appended before the call. On success the assistant
    /// reply is appended and its artifact, if any, becomes the session's
    /// current artifact and is returned. On failure an `Error: ...` assistant
    /// message is appended instead.
    pub async fn send(
        &self,
        session: &SharedSession,
        prompt: &str,
    ) -> Result<Option<Arc<Artifact>>, GenerationError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }

        let request = {
            let mut ctx = session.write().await;
            if ctx.generating {
                return Err(GenerationError::Busy);
            }
            ctx.generating = true;

            let conversation_history = ctx.conversation().iter().map(Message::to_history).collect();
            ctx.push_message(Message::user(prompt));
            GenerateRequest {
                prompt: prompt.to_string(),
                conversation_history,
                model_provider: ctx.provider(),
            }
        };

        info!(
            "Generating with {} ({} prior messages)",
            request.model_provider,
            request.conversation_history.len()
        );
        let result = self.backend.generate(&request).await;

        let mut ctx = session.write().await;
        ctx.generating = false;
        match result {
            Ok(response) => {
                let artifact = response.artifact.map(Arc::new);
                ctx.push_message(Message::assistant(
                    response.content,
                    artifact.as_deref().cloned(),
                ));
                if let Some(artifact) = &artifact {
                    info!(
                        "Received artifact {} with {} actions",
                        artifact.id,
                        artifact.len()
                    );
                    ctx.set_current_artifact(artifact.clone());
                }
                Ok(artifact)
            }
            Err(e) => {
                error!("Generation failed: {}", e);
                ctx.push_message(Message::assistant(format!("Error: {}", e), None));
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::session::SessionContext;
    use async_trait::async_trait;
    use codeforge_types::{Action, GenerateResponse, ModelProvider, Role};
    use std::sync::Mutex;
    use tokio_test::{assert_err, assert_ok};

    struct FakeModel {
        reply: Result<GenerateResponse, TransportError>,
        seen: Mutex<Vec<GenerateRequest>>,
    }

    impl FakeModel {
        fn replying(reply: Result<GenerateResponse, TransportError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl GenerationBackend for FakeModel {
        async fn generate(
            &self,
            request: &GenerateRequest,
        ) -> Result<GenerateResponse, TransportError> {
            self.seen.lock().unwrap().push(request.clone());
            self.reply.clone()
        }
    }

    fn with_artifact() -> GenerateResponse {
        GenerateResponse {
            content: "Here is your page".to_string(),
            artifact: Some(Artifact::new(
                "a1",
                "Page",
                vec![Action::file("index.html", "<h1>hi</h1>")],
            )),
        }
    }

    #[tokio::test]
    async fn test_reply_with_artifact_becomes_current() {
        let model = FakeModel::replying(Ok(with_artifact()));
        let client = GenerationClient::new(model.clone());
        let session = SessionContext::new(ModelProvider::Claude).shared();

        let artifact = assert_ok!(client.send(&session, "  a hello page ").await);
        assert_eq!(artifact.map(|a| a.id.clone()), Some("a1".to_string()));

        let ctx = session.read().await;
        assert_eq!(ctx.conversation().len(), 2);
        assert_eq!(ctx.conversation()[0].content, "a hello page");
        assert_eq!(ctx.conversation()[1].role, Role::Assistant);
        assert_eq!(ctx.current_artifact().map(|a| a.id.as_str()), Some("a1"));
        assert!(ctx.workspace().snapshot.contains("index.html"));
        assert!(!ctx.is_generating());

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen[0].prompt, "a hello page");
        assert_eq!(seen[0].model_provider, ModelProvider::Claude);
        assert!(seen[0].conversation_history.is_empty());
    }

    #[tokio::test]
    async fn test_history_excludes_current_prompt() {
        let model = FakeModel::replying(Ok(GenerateResponse {
            content: "ok".to_string(),
            artifact: None,
        }));
        let client = GenerationClient::new(model.clone());
        let session = SessionContext::new(ModelProvider::Gpt).shared();

        assert_ok!(client.send(&session, "first").await);
        assert_ok!(client.send(&session, "second").await);

        let seen = model.seen.lock().unwrap();
        let history: Vec<(Role, &str)> = seen[1]
            .conversation_history
            .iter()
            .map(|entry| (entry.role, entry.content.as_str()))
            .collect();
        assert_eq!(history, vec![(Role::User, "first"), (Role::Assistant, "ok")]);
    }

    #[tokio::test]
    async fn test_reply_without_artifact_keeps_current() {
        let session = SessionContext::new(ModelProvider::Gpt).shared();
        let first = GenerationClient::new(FakeModel::replying(Ok(with_artifact())));
        assert_ok!(first.send(&session, "page").await);

        let second = GenerationClient::new(FakeModel::replying(Ok(GenerateResponse {
            content: "It already works.".to_string(),
            artifact: None,
        })));
        let artifact = assert_ok!(second.send(&session, "does it work?").await);
        assert!(artifact.is_none());
        assert_eq!(
            session.read().await.current_artifact().map(|a| a.id.as_str()),
            Some("a1")
        );
    }

    #[tokio::test]
    async fn test_failure_becomes_error_message() {
        let model = FakeModel::replying(Err(TransportError::Status {
            status: 500,
            message: "Generation failed".to_string(),
        }));
        let client = GenerationClient::new(model);
        let session = SessionContext::new(ModelProvider::Gpt).shared();

        let err = assert_err!(client.send(&session, "page").await);
        assert!(matches!(err, GenerationError::Transport(_)));

        let ctx = session.read().await;
        let last = ctx.conversation().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, "Error: backend returned 500: Generation failed");
        assert!(!ctx.is_generating());
    }

    #[tokio::test]
    async fn test_rejects_empty_and_concurrent_prompts() {
        let client = GenerationClient::new(FakeModel::replying(Ok(with_artifact())));
        let session = SessionContext::new(ModelProvider::Gpt).shared();

        assert_eq!(
            assert_err!(client.send(&session, " \n ").await),
            GenerationError::EmptyPrompt
        );

        session.write().await.generating = true;
        assert_eq!(
            assert_err!(client.send(&session, "page").await),
            GenerationError::Busy
        );
        assert!(session.read().await.conversation().is_empty());
    }
}
