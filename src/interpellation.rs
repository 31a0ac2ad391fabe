//! Interpellation practice: the delegate's speech is challenged by a hostile delegation, the
//! delegate replies (optionally starting from a suggested defense), and the chair gives a
//! verdict. Each stage feeds the next; a new speech starts over.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::controller::{FormController, FormView};
use crate::error::{MunAssistantError, Result};
use crate::generation::GenerationClient;
use crate::models::FeatureId;
use crate::prompts::{ChallengeRequest, DefenseRequest, PromptForm, VerdictRequest};

/// State of one exchange. Later fields are only ever set after the earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InterpellationSession {
    pub original_speech: String,
    pub critique: Option<String>,
    pub suggested_defense: Option<String>,
    pub delegate_reply: String,
    pub verdict: Option<String>,
}

/// Which actions are currently available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageAvailability {
    pub challenge: bool,
    pub suggest_defense: bool,
    pub submit_reply: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterpellationView {
    pub session: InterpellationSession,
    pub available: StageAvailability,
    pub challenge: FormView,
    pub defense: FormView,
    pub verdict: FormView,
}

struct SessionSlot {
    // Incremented whenever a new speech starts the exchange over
    round: u64,
    session: InterpellationSession,
}

pub struct InterpellationController {
    challenge: FormController<ChallengeRequest>,
    defense: FormController<DefenseRequest>,
    verdict: FormController<VerdictRequest>,
    slot: Mutex<SessionSlot>,
}

impl InterpellationController {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self {
            challenge: FormController::new(FeatureId::Interpellation, Arc::clone(&client)),
            defense: FormController::new(FeatureId::Interpellation, Arc::clone(&client)),
            verdict: FormController::new(FeatureId::Interpellation, client),
            slot: Mutex::new(SessionSlot {
                round: 0,
                session: InterpellationSession::default(),
            }),
        }
    }

    fn slot(&self) -> MutexGuard<'_, SessionSlot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn cancelled() -> MunAssistantError {
        MunAssistantError::Cancelled {
            feature: FeatureId::Interpellation.to_string(),
        }
    }

    pub fn session(&self) -> InterpellationSession {
        self.slot().session.clone()
    }

    pub fn availability(&self) -> StageAvailability {
        let slot = self.slot();
        let has_critique = slot.session.critique.is_some();
        StageAvailability {
            challenge: !self.challenge.is_loading(),
            suggest_defense: has_critique && !self.defense.is_loading(),
            submit_reply: has_critique
                && !slot.session.delegate_reply.trim().is_empty()
                && !self.verdict.is_loading(),
        }
    }

    /// Stage 1. Starts a new exchange for `speech`, clearing every later stage.
    pub async fn challenge(&self, speech: &str) -> Result<String> {
        let request = ChallengeRequest {
            speech: speech.to_string(),
        };
        // A rejected submission keeps the current exchange
        request.validate()?;
        let ticket = self.challenge.begin()?;

        let round = {
            let mut slot = self.slot();
            slot.round += 1;
            slot.session = InterpellationSession {
                original_speech: speech.to_string(),
                ..Default::default()
            };
            slot.round
        };
        self.defense.reset();
        self.verdict.reset();

        let result = self.challenge.run(ticket, &request).await?;

        let mut slot = self.slot();
        if slot.round != round {
            return Err(Self::cancelled());
        }
        slot.session.critique = Some(result.text.clone());
        Ok(result.text)
    }

    /// Stage 2 (optional). Drafts a reply to the challenge and puts it in the reply slot.
    pub async fn suggest_defense(&self) -> Result<String> {
        let (round, ticket, request) = {
            let slot = self.slot();
            let challenge = slot.session.critique.clone().ok_or_else(|| {
                MunAssistantError::validation(
                    "challenge",
                    "generate the interpellation before asking for a defense",
                )
            })?;
            let request = DefenseRequest {
                speech: slot.session.original_speech.clone(),
                challenge,
            };
            request.validate()?;
            (slot.round, self.defense.begin()?, request)
        };

        let result = self.defense.run(ticket, &request).await?;

        let mut slot = self.slot();
        if slot.round != round {
            return Err(Self::cancelled());
        }
        slot.session.suggested_defense = Some(result.text.clone());
        slot.session.delegate_reply = result.text.clone();
        Ok(result.text)
    }

    /// Edits the reply text without submitting it.
    pub fn set_reply(&self, reply: &str) {
        self.slot().session.delegate_reply = reply.to_string();
    }

    /// Stage 3. Sends the reply (the given one, or the one already in the slot) to the chair.
    /// The slot only takes the given reply once the submission is accepted.
    pub async fn submit_reply(&self, reply: Option<&str>) -> Result<String> {
        let (round, ticket, request) = {
            let mut slot = self.slot();
            let challenge = slot.session.critique.clone().ok_or_else(|| {
                MunAssistantError::validation(
                    "challenge",
                    "generate the interpellation before replying to it",
                )
            })?;
            let request = VerdictRequest {
                speech: slot.session.original_speech.clone(),
                challenge,
                reply: reply
                    .map(str::to_string)
                    .unwrap_or_else(|| slot.session.delegate_reply.clone()),
            };
            request.validate()?;
            let ticket = self.verdict.begin()?;
            slot.session.delegate_reply = request.reply.clone();
            (slot.round, ticket, request)
        };

        let result = self.verdict.run(ticket, &request).await?;

        let mut slot = self.slot();
        if slot.round != round {
            return Err(Self::cancelled());
        }
        slot.session.verdict = Some(result.text.clone());
        Ok(result.text)
    }

    pub fn snapshot(&self) -> InterpellationView {
        InterpellationView {
            session: self.session(),
            available: self.availability(),
            challenge: self.challenge.snapshot(),
            defense: self.defense.snapshot(),
            verdict: self.verdict.snapshot(),
        }
    }

    /// Tears the view down, dropping the exchange and any late responses.
    pub fn reset(&self) -> bool {
        {
            let mut slot = self.slot();
            slot.round += 1;
            slot.session = InterpellationSession::default();
        }
        let challenge = self.challenge.reset();
        let defense = self.defense.reset();
        let verdict = self.verdict.reset();
        challenge || defense || verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::tests::{GatedClient, ScriptedClient};
    use tokio::sync::Notify;

    const SPEECH: &str = "The delegation of Peru proposes a regional water fund.";

    #[tokio::test]
    async fn test_full_exchange() {
        let client = Arc::new(ScriptedClient::texts(&[
            "The delegation of To' Revuelto asks: who pays?",
            "This delegation thanks the question: the fund is financed by a levy.",
            "The chair considers the reply direct and diplomatic.",
        ]));
        let ctl = InterpellationController::new(client.clone());

        let critique = ctl.challenge(SPEECH).await.unwrap();
        assert!(critique.contains("who pays"));

        let defense = ctl.suggest_defense().await.unwrap();
        assert_eq!(ctl.session().delegate_reply, defense);
        assert!(client.last_prompt().contains("who pays?"));

        let verdict = ctl.submit_reply(None).await.unwrap();
        assert!(verdict.starts_with("The chair"));
        let prompt = client.last_prompt();
        assert!(prompt.contains(SPEECH));
        assert!(prompt.contains("who pays?"));
        assert!(prompt.contains("financed by a levy"));

        let session = ctl.session();
        assert_eq!(session.original_speech, SPEECH);
        assert_eq!(session.verdict.as_deref(), Some(verdict.as_str()));
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_defense_requires_challenge() {
        let client = Arc::new(ScriptedClient::texts(&[]));
        let ctl = InterpellationController::new(client.clone());

        assert!(!ctl.availability().suggest_defense);
        let err = ctl.suggest_defense().await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_verdict_requires_reply() {
        let client = Arc::new(ScriptedClient::texts(&["Question?"]));
        let ctl = InterpellationController::new(client.clone());
        ctl.challenge(SPEECH).await.unwrap();

        assert!(ctl.availability().suggest_defense);
        assert!(!ctl.availability().submit_reply);
        let err = ctl.submit_reply(Some("   ")).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(client.call_count(), 1);

        ctl.set_reply("Our answer.");
        assert!(ctl.availability().submit_reply);
    }

    #[tokio::test]
    async fn test_new_speech_clears_later_stages() {
        let client = Arc::new(ScriptedClient::texts(&["Q1", "Verdict 1", "Q2"]));
        let ctl = InterpellationController::new(client.clone());

        ctl.challenge(SPEECH).await.unwrap();
        ctl.submit_reply(Some("Reply 1")).await.unwrap();
        assert!(ctl.session().verdict.is_some());

        ctl.challenge("A different speech.").await.unwrap();
        let session = ctl.session();
        assert_eq!(session.original_speech, "A different speech.");
        assert_eq!(session.critique.as_deref(), Some("Q2"));
        assert_eq!(session.suggested_defense, None);
        assert_eq!(session.delegate_reply, "");
        assert_eq!(session.verdict, None);
    }

    #[tokio::test]
    async fn test_empty_speech_is_rejected() {
        let client = Arc::new(ScriptedClient::texts(&[]));
        let ctl = InterpellationController::new(client.clone());

        assert!(ctl.challenge("  ").await.unwrap_err().is_validation());
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_challenge_leaves_no_critique() {
        let client = Arc::new(ScriptedClient::new(vec![Err(MunAssistantError::Service(
            "unavailable".to_string(),
        ))]));
        let ctl = InterpellationController::new(client.clone());

        assert!(ctl.challenge(SPEECH).await.is_err());
        assert_eq!(ctl.session().critique, None);
        assert!(!ctl.availability().suggest_defense);
        assert_eq!(client.call_count(), 1);
    }

    fn gated(text: &str) -> Arc<GatedClient> {
        Arc::new(GatedClient {
            release: Notify::new(),
            started: Notify::new(),
            text: text.to_string(),
        })
    }

    #[tokio::test]
    async fn test_reply_before_challenge_is_rejected() {
        let client = Arc::new(ScriptedClient::texts(&[]));
        let ctl = InterpellationController::new(client.clone());

        assert!(!ctl.availability().submit_reply);
        let err = ctl.submit_reply(Some("answer")).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(client.call_count(), 0);
        assert_eq!(ctl.session(), InterpellationSession::default());
    }

    #[tokio::test]
    async fn test_busy_reply_keeps_reply_in_flight() {
        let client = gated("Noted.");
        let ctl = Arc::new(InterpellationController::new(client.clone()));

        let challenge = {
            let ctl = Arc::clone(&ctl);
            tokio::spawn(async move { ctl.challenge(SPEECH).await })
        };
        client.started.notified().await;
        client.release.notify_one();
        challenge.await.expect("task should not panic").unwrap();

        let first = {
            let ctl = Arc::clone(&ctl);
            tokio::spawn(async move { ctl.submit_reply(Some("Reply A")).await })
        };
        client.started.notified().await;

        let err = ctl.submit_reply(Some("Reply B")).await.unwrap_err();
        assert!(matches!(err, MunAssistantError::Busy { .. }));
        assert_eq!(ctl.session().delegate_reply, "Reply A");

        client.release.notify_one();
        first.await.expect("task should not panic").unwrap();
        let session = ctl.session();
        assert_eq!(session.delegate_reply, "Reply A");
        assert_eq!(session.verdict.as_deref(), Some("Noted."));
    }

    #[tokio::test]
    async fn test_second_challenge_while_loading_keeps_first_exchange() {
        let client = gated("Who pays?");
        let ctl = Arc::new(InterpellationController::new(client.clone()));

        let first = {
            let ctl = Arc::clone(&ctl);
            tokio::spawn(async move { ctl.challenge(SPEECH).await })
        };
        client.started.notified().await;

        let err = ctl.challenge("Another speech.").await.unwrap_err();
        assert!(matches!(err, MunAssistantError::Busy { .. }));
        assert_eq!(ctl.session().original_speech, SPEECH);

        client.release.notify_one();
        let critique = first.await.expect("task should not panic").unwrap();
        assert_eq!(critique, "Who pays?");
        assert_eq!(ctl.session().critique.as_deref(), Some("Who pays?"));
    }
}
