//! End-to-end session tests
//!
//! Drives the orchestrator through whole sessions against a scripted
//! generator: analysis, streamed replies, evaluation and stage changes.

mod common;

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use common::{analysis_json, mentor_reply, report_json, ScriptedGenerator, StreamScript};
use stagegate_mentor::config::{Config, GeminiConfig, GenerationConfig, LoggingConfig, RequestConfig, ServerConfig};
use stagegate_mentor::error::{AppError, DecodeError, LlmError, SessionError};
use stagegate_mentor::llm::ContentRole;
use stagegate_mentor::session::{Mode, Role};
use stagegate_mentor::stream::ReplySource;
use stagegate_mentor::{ConversationOrchestrator, Phase, Session, SessionEvent, Stage, StartRequest};

fn test_config() -> Config {
    Config {
        gemini: GeminiConfig {
            api_key: "unused".to_string(),
            base_url: "http://localhost".to_string(),
            model: "test-model".to_string(),
        },
        generation: GenerationConfig::default(),
        request: RequestConfig {
            stream_idle_timeout_ms: 2000,
            ..RequestConfig::default()
        },
        server: ServerConfig::default(),
        logging: LoggingConfig::default(),
    }
}

fn orchestrator(generator: &Arc<ScriptedGenerator>) -> ConversationOrchestrator {
    ConversationOrchestrator::new(generator.clone(), &test_config())
}

fn orchestrator_with_idle(generator: &Arc<ScriptedGenerator>, idle_ms: u64) -> ConversationOrchestrator {
    let mut config = test_config();
    config.request.stream_idle_timeout_ms = idle_ms;
    ConversationOrchestrator::new(generator.clone(), &config)
}

fn stage(n: u8) -> Stage {
    Stage::new(n).unwrap()
}

#[cfg(test)]
mod guided_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_guided_journey_to_validation() {
        let generator = ScriptedGenerator::new();
        generator
            .reply(analysis_json(1))
            .stream(StreamScript::chunks(&[
                r#"{"message": "Who feels this pain"#,
                r#" the most?", "suggestions": ["Students", "Parents"]}"#,
            ]))
            .reply(report_json(1))
            .stream(StreamScript::chunks(&[&mentor_reply(
                "Twelve interviews is a solid start.",
                &["Show the notes"],
            )]))
            .reply(report_json(3))
            .stream(StreamScript::chunks(&[&mentor_reply("Let's price it.", &[])]))
            .reply(report_json(5));

        let orchestrator = orchestrator(&generator);
        let cancel = CancellationToken::new();
        let mut session = Session::new();
        let mut events = Vec::new();

        let phase = orchestrator
            .start(
                &mut session,
                StartRequest::new("  Tutoring marketplace  "),
                &cancel,
                |e| events.push(e.clone()),
            )
            .await
            .unwrap();

        assert_eq!(phase, Phase::Active(stage(1)));
        assert_eq!(session.idea(), "Tutoring marketplace");
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1].content, "Who feels this pain the most?");
        assert_eq!(
            session.messages()[1].suggestions,
            Some(vec!["Students".to_string(), "Parents".to_string()])
        );
        assert_eq!(
            events.iter().filter(|e| matches!(e, SessionEvent::Delta { .. })).count(),
            2
        );

        events.clear();
        let phase = orchestrator
            .send(&mut session, "I interviewed 12 parents", &cancel, |e| {
                events.push(e.clone())
            })
            .await
            .unwrap();

        assert_eq!(phase, Phase::Active(stage(3)));
        assert_eq!(session.messages().len(), 5);
        assert!(session.messages()[4]
            .content
            .contains("moved forward to the **Business Case** stage"));
        assert_eq!(
            events.last(),
            Some(&SessionEvent::StageChanged {
                from: stage(1),
                to: stage(3)
            })
        );

        let phase = orchestrator
            .send(&mut session, "Here is the pricing model", &cancel, |_| {})
            .await
            .unwrap();
        assert_eq!(phase, Phase::Complete);

        let err = orchestrator
            .send(&mut session, "anything else?", &cancel, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Session(SessionError::Complete)));
        assert_eq!(generator.requests().len(), 7);
    }

    #[tokio::test]
    async fn test_send_merges_history_for_the_model() {
        let generator = ScriptedGenerator::new();
        generator
            .reply(analysis_json(2))
            .stream(StreamScript::chunks(&[&mentor_reply("Tell me more.", &[])]))
            .reply(report_json(2))
            .stream(StreamScript::chunks(&[&mentor_reply("Good.", &[])]))
            .reply(report_json(2));

        let orchestrator = orchestrator(&generator);
        let cancel = CancellationToken::new();
        let mut session = Session::new();

        orchestrator
            .start(&mut session, StartRequest::new("Bike repair van"), &cancel, |_| {})
            .await
            .unwrap();
        orchestrator
            .send(&mut session, "We fix bikes on site", &cancel, |_| {})
            .await
            .unwrap();

        let chat = &generator.requests()[3];
        let roles: Vec<ContentRole> = chat.contents.iter().map(|c| c.role).collect();
        assert_eq!(
            roles,
            vec![ContentRole::User, ContentRole::Model, ContentRole::User]
        );
        assert_eq!(chat.contents[0].text, "Bike repair van");
        assert_eq!(chat.contents[1].text, "Tell me more.");
        assert_eq!(chat.contents[2].text, "We fix bikes on site");
        assert!(chat.system_instruction.is_some());

        let progress = generator.last_request();
        assert!(progress.contents[0].text.contains("Current Stage: 2"));
        assert!(progress.contents[0].text.contains("USER: We fix bikes on site"));
    }

    #[tokio::test]
    async fn test_regression_is_announced() {
        let generator = ScriptedGenerator::new();
        generator
            .reply(analysis_json(3))
            .stream(StreamScript::chunks(&[&mentor_reply("Where is the evidence?", &[])]))
            .reply(report_json(2));

        let orchestrator = orchestrator(&generator);
        let mut session = Session::new();
        let mut events = Vec::new();

        let phase = orchestrator
            .start(
                &mut session,
                StartRequest::new("Drone deliveries"),
                &CancellationToken::new(),
                |e| events.push(e.clone()),
            )
            .await
            .unwrap();

        assert_eq!(phase, Phase::Active(stage(2)));
        let last = session.messages().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert!(last.content.contains("Back to the Scoping stage"));
        assert!(events.contains(&SessionEvent::StageChanged {
            from: stage(3),
            to: stage(2)
        }));
    }

    #[tokio::test]
    async fn test_sparse_report_still_moves_stage() {
        let generator = ScriptedGenerator::new();
        generator
            .reply(analysis_json(1))
            .stream(StreamScript::chunks(&[&mentor_reply("Who pays?", &[])]))
            .reply(r#"{"stage": 2, "stageName": "Scoping", "ideaScore": 70, "gatingDecision": "Proceed", "nextActions": [{"title": "Mock up", "effort": "Medium"}]}"#);

        let orchestrator = orchestrator(&generator);
        let mut session = Session::new();

        let phase = orchestrator
            .start(
                &mut session,
                StartRequest::new("Meal prep for nurses"),
                &CancellationToken::new(),
                |_| {},
            )
            .await
            .unwrap();

        assert_eq!(phase, Phase::Active(stage(2)));
        assert!(session
            .messages()
            .last()
            .unwrap()
            .content
            .contains("**Scoping**"));
    }

    #[tokio::test]
    async fn test_failed_analysis_leaves_session_untouched() {
        let generator = ScriptedGenerator::new();
        generator.reply("I think this idea is great!");

        let orchestrator = orchestrator(&generator);
        let mut session = Session::new();

        let err = orchestrator
            .start(
                &mut session,
                StartRequest::new("Smart mirror"),
                &CancellationToken::new(),
                |_| {},
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Decode(DecodeError::Json { .. })));
        assert_eq!(session.phase(), Phase::NotStarted);
        assert!(session.messages().is_empty());
        assert_eq!(generator.requests().len(), 1);
    }
}

#[cfg(test)]
mod autopilot_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_autopilot_goes_straight_to_report() {
        let generator = ScriptedGenerator::new();
        generator
            .reply(r#"{"ideaType": "physical", "initialAssessment": "Dense market.", "marketSnapshot": "Growing."}"#)
            .stream(StreamScript::chunks(&[&mentor_reply(
                "Research complete. Your team is ready.",
                &[],
            )]));

        let orchestrator = orchestrator(&generator);
        let mut session = Session::new();

        let phase = orchestrator
            .start(
                &mut session,
                StartRequest::new("Vegan bakery")
                    .with_mode(Mode::Autopilot)
                    .with_region("Lisbon"),
                &CancellationToken::new(),
                |_| {},
            )
            .await
            .unwrap();

        assert_eq!(phase, Phase::Complete);
        assert_eq!(session.stage(), stage(5));
        assert_eq!(session.region(), Some("Lisbon"));
        assert_eq!(session.messages()[0].content, "Vegan bakery");
        assert!(session.analysis().unwrap().has_market_intelligence());

        let requests = generator.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].contents[0].text.contains("Lisbon"));
        let live = &requests[1].contents.last().unwrap().text;
        assert!(live.starts_with("[AUTOPILOT_MODE] Validate this idea: Vegan bakery."));
        assert!(live.contains("Target Region: Lisbon."));
    }

    #[tokio::test]
    async fn test_autopilot_without_region_uses_global() {
        let generator = ScriptedGenerator::new();
        generator
            .reply(analysis_json(5))
            .stream(StreamScript::chunks(&[&mentor_reply("Done.", &[])]));

        let orchestrator = orchestrator(&generator);
        let mut session = Session::new();

        orchestrator
            .start(
                &mut session,
                StartRequest::new("Pet insurance").with_mode(Mode::Autopilot),
                &CancellationToken::new(),
                |_| {},
            )
            .await
            .unwrap();

        let live = generator.last_request().contents.last().unwrap().text.clone();
        assert!(live.contains("Target Region: Global."));
    }
}

#[cfg(test)]
mod recovery_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn started(generator: &Arc<ScriptedGenerator>) -> (ConversationOrchestrator, Session) {
        generator
            .reply(analysis_json(1))
            .stream(StreamScript::chunks(&[&mentor_reply("What's the idea?", &[])]))
            .reply(report_json(1));
        let orchestrator = orchestrator(generator);
        let mut session = Session::new();
        orchestrator
            .start(&mut session, StartRequest::new("Coffee subscriptions"), &CancellationToken::new(), |_| {})
            .await
            .unwrap();
        (orchestrator, session)
    }

    fn finalized_source(events: &[SessionEvent]) -> Option<ReplySource> {
        events.iter().find_map(|e| match e {
            SessionEvent::ReplyFinalized { source, .. } => Some(*source),
            _ => None,
        })
    }

    #[tokio::test]
    async fn test_invalid_escape_is_repaired() {
        let generator = ScriptedGenerator::new();
        let (orchestrator, mut session) = started(&generator).await;
        generator
            .stream(StreamScript::chunks(&[
                r#"{"message": "Export it to C:\data first", "#,
                r#""suggestions": ["Done"]}"#,
            ]))
            .reply(report_json(1));

        let mut events = Vec::new();
        orchestrator
            .send(&mut session, "Where should I save the survey?", &CancellationToken::new(), |e| {
                events.push(e.clone())
            })
            .await
            .unwrap();

        let reply = session.messages().last().unwrap();
        assert_eq!(reply.content, r"Export it to C:\data first");
        assert_eq!(reply.suggestions, Some(vec!["Done".to_string()]));
        assert_eq!(finalized_source(&events), Some(ReplySource::Repaired));
    }

    #[tokio::test]
    async fn test_truncated_reply_keeps_preview() {
        let generator = ScriptedGenerator::new();
        let (orchestrator, mut session) = started(&generator).await;
        generator
            .stream(StreamScript::chunks(&[r#"{"message": "Thinking about your pricing"#]))
            .reply(report_json(1));

        let mut events = Vec::new();
        orchestrator
            .send(&mut session, "Is $20 too much?", &CancellationToken::new(), |e| {
                events.push(e.clone())
            })
            .await
            .unwrap();

        let reply = session.messages().last().unwrap();
        assert_eq!(reply.content, "Thinking about your pricing");
        assert_eq!(reply.suggestions, Some(vec![]));
        assert_eq!(finalized_source(&events), Some(ReplySource::Partial));
    }

    #[tokio::test]
    async fn test_interrupted_stream_keeps_partial_and_skips_evaluation() {
        let generator = ScriptedGenerator::new();
        let (orchestrator, mut session) = started(&generator).await;
        generator.stream(StreamScript::failing_after(
            &[r#"{"message": "Start with ten cust"#],
            LlmError::Api {
                status: 503,
                message: "UNAVAILABLE".to_string(),
            },
        ));

        let err = orchestrator
            .send(&mut session, "How do I start?", &CancellationToken::new(), |_| {})
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Llm(LlmError::Api { status: 503, .. })));
        assert_eq!(session.messages().last().unwrap().content, "Start with ten cust");
        assert!(!session.is_in_flight());
        // analysis, stream, progress, then only the failed stream
        assert_eq!(generator.requests().len(), 4);
        assert_eq!(session.phase(), Phase::Active(stage(1)));
    }

    #[tokio::test]
    async fn test_stalled_stream_open_times_out() {
        let generator = ScriptedGenerator::new();
        generator
            .reply(analysis_json(1))
            .stream(StreamScript::stalled(Duration::from_secs(30)));

        let orchestrator = orchestrator_with_idle(&generator, 50);
        let mut session = Session::new();
        let mut events = Vec::new();
        let started = Instant::now();

        let err = orchestrator
            .start(
                &mut session,
                StartRequest::new("Tool library"),
                &CancellationToken::new(),
                |e| events.push(e.clone()),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Llm(LlmError::Timeout { timeout_ms: 50 })));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(events.last(), Some(&SessionEvent::TypingStopped));
        assert_eq!(session.messages().len(), 1);
        assert!(!session.is_in_flight());
    }

    #[tokio::test]
    async fn test_session_continues_after_failed_turn() {
        let generator = ScriptedGenerator::new();
        let (orchestrator, mut session) = started(&generator).await;
        generator.stream(StreamScript::failing_after(
            &[],
            LlmError::Timeout { timeout_ms: 10 },
        ));

        let err = orchestrator
            .send(&mut session, "Hello?", &CancellationToken::new(), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Llm(LlmError::Timeout { .. })));
        assert_eq!(session.messages().len(), 3);

        generator
            .stream(StreamScript::chunks(&[&mentor_reply("Back online.", &[])]))
            .reply(report_json(2));
        let phase = orchestrator
            .send(&mut session, "Hello again", &CancellationToken::new(), |_| {})
            .await
            .unwrap();

        assert_eq!(phase, Phase::Active(stage(2)));
        let contents: Vec<&str> = session.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(&contents[2..5], &["Hello?", "Hello again", "Back online."]);
    }
}
