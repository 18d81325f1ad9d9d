//! # Actions
//!
//! Everything that can happen to a chat becomes an `Action`.
//! User presses Enter? That's `Action::Submit(text)`.
//! Adapter streams a chunk? That's `Action::ResponseChunk { .. }`.
//!
//! The `update()` function takes the chat and an action, applies the
//! submission protocol and returns an [`Effect`] describing the I/O the host
//! must perform. No I/O happens here.
//!
//! ```text
//! AiChat + Action  →  update()  →  Effect
//! ```
//!
//! Every adapter result carries the uid of the segment it was produced for.
//! Results for a segment that is no longer active (failed, cancelled) are
//! ignored, so late deliveries can never touch the conversation.

use log::{debug, info, warn};

use crate::adapter::{AdapterError, AiMessage, PromptRequest};
use crate::core::config::ErrorPolicy;
use crate::core::error::ChatError;
use crate::core::state::AiChat;
use crate::ui::components::ChatSegment;

#[derive(Debug, Clone, PartialEq)]
pub enum Action<M> {
    /// Composer text replaced (typing, paste, host-driven).
    ComposerInput(String),
    /// Submit this prompt.
    Submit(String),
    /// Conversation starter at this index selected.
    SelectStarter(usize),
    ResponseChunk { segment_uid: String, text: String },
    StreamComplete { segment_uid: String },
    ResponseReady { segment_uid: String, message: M },
    ResponseFailed { segment_uid: String, error: AdapterError },
    /// Abandon the in-flight exchange.
    Cancel,
}

/// I/O the host must perform after an action.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect<M> {
    None,
    /// Call the adapter for a freshly started segment.
    SpawnRequest(PromptRequest<M>),
    /// Abort the running adapter task.
    AbortRequest,
    /// Fatal error policy: stop the run-loop.
    Halt(AdapterError),
}

pub fn update<M: AiMessage>(chat: &mut AiChat<M>, action: Action<M>) -> Result<Effect<M>, ChatError> {
    let effect = match action {
        Action::ComposerInput(text) => {
            chat.composer.set_text(&text)?;
            Effect::None
        }
        Action::Submit(prompt) => submit(chat, prompt)?,
        Action::SelectStarter(index) if chat.composer.props().disable_submit_button => {
            debug!("Ignoring starter {}: submission is disabled", index);
            Effect::None
        }
        Action::SelectStarter(index) => match chat.launchpad.starter_prompt(index) {
            Some(prompt) => {
                let prompt = prompt.to_string();
                info!("Conversation starter {} selected", index);
                submit(chat, prompt)?
            }
            None => {
                debug!("Ignoring selection of unavailable starter {}", index);
                Effect::None
            }
        },
        Action::ResponseChunk { segment_uid, text } => {
            match active_for(chat, &segment_uid) {
                Some(segment) => {
                    debug!("Routing chunk (len={}) to segment {}", text.len(), segment_uid);
                    segment.add_chunk(&text)?;
                }
                None => debug!("Dropping chunk for stale segment {}", segment_uid),
            }
            Effect::None
        }
        Action::StreamComplete { segment_uid } => {
            match active_for(chat, &segment_uid) {
                Some(segment) => {
                    segment.complete_stream()?;
                    finish(chat)?;
                }
                None => debug!("Ignoring completion of stale segment {}", segment_uid),
            }
            Effect::None
        }
        Action::ResponseReady {
            segment_uid,
            message,
        } => {
            match active_for(chat, &segment_uid) {
                Some(segment) => {
                    segment.complete_batch(message)?;
                    finish(chat)?;
                }
                None => debug!("Ignoring response for stale segment {}", segment_uid),
            }
            Effect::None
        }
        Action::ResponseFailed { segment_uid, error } => {
            if active_for(chat, &segment_uid).is_none() {
                debug!("Ignoring failure of stale segment {}: {}", segment_uid, error);
                Effect::None
            } else {
                warn!("Submission failed for segment {}: {}", segment_uid, error);
                discard_active(chat)?;
                chat.report_error(&error);
                match chat.options.error_policy {
                    ErrorPolicy::NonFatal => Effect::None,
                    ErrorPolicy::Fatal => Effect::Halt(error),
                }
            }
        }
        Action::Cancel => {
            if chat.active.is_some() {
                info!("Active submission cancelled");
                discard_active(chat)?;
                Effect::AbortRequest
            } else {
                Effect::None
            }
        }
    };
    chat.drain_context_events()?;
    Ok(effect)
}

fn active_for<'a, M: AiMessage>(chat: &'a mut AiChat<M>, segment_uid: &str) -> Option<&'a mut ChatSegment<M>> {
    chat.active.as_mut().filter(|segment| segment.uid() == segment_uid)
}

/// Starts a segment for `prompt`. Rejected while another segment is active.
fn submit<M: AiMessage>(chat: &mut AiChat<M>, prompt: String) -> Result<Effect<M>, ChatError> {
    if chat.active.is_some() {
        info!("Submission rejected: a segment is already in flight");
        return Ok(Effect::None);
    }
    if prompt.trim().is_empty() {
        debug!("Submission rejected: empty prompt");
        return Ok(Effect::None);
    }

    // History is taken before the new segment exists.
    let history = chat.conversation_history()?;
    let mode = chat.transfer_mode();
    let segment = ChatSegment::start(
        chat.context().clone(),
        &prompt,
        chat.user_persona(),
        chat.assistant_persona(),
        mode,
    );
    let segment_uid = segment.uid().to_string();
    chat.active = Some(segment);

    // Text stays visible while in flight; it is only cleared on success.
    chat.composer.set_text(&prompt)?;
    chat.composer.set_waiting(true)?;
    chat.sync_launchpad()?;

    info!(
        "Submission accepted: segment {} ({} mode, {} history items)",
        segment_uid,
        mode,
        history.len()
    );
    Ok(Effect::SpawnRequest(PromptRequest {
        segment_uid,
        prompt,
        history,
    }))
}

/// Moves the completed active segment into the conversation and resets the composer.
fn finish<M: AiMessage>(chat: &mut AiChat<M>) -> Result<(), ChatError> {
    if let Some(segment) = chat.active.take() {
        info!("Segment {} complete", segment.uid());
        chat.segments.push(segment);
    }
    chat.composer.set_text("")?;
    chat.composer.set_waiting(false)?;
    chat.sync_launchpad()?;
    Ok(())
}

/// Destroys the active segment and restores the submitted text.
fn discard_active<M: AiMessage>(chat: &mut AiChat<M>) -> Result<(), ChatError> {
    if let Some(mut segment) = chat.active.take() {
        let prompt = segment.prompt().to_string();
        segment.discard()?;
        chat.composer.set_text(&prompt)?;
    }
    chat.composer.set_waiting(false)?;
    chat.sync_launchpad()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{ChatOptions, ComposerOptions, ConversationStarter};
    use crate::test_support::{NoopAdapter, test_chat};
    use std::sync::{Arc, Mutex};

    fn spawned_uid(effect: Effect<String>) -> String {
        match effect {
            Effect::SpawnRequest(request) => request.segment_uid,
            other => panic!("expected SpawnRequest, got {:?}", other),
        }
    }

    fn submit_hello(chat: &mut AiChat<String>) -> String {
        let effect = update(chat, Action::Submit("Hello".to_string())).unwrap();
        spawned_uid(effect)
    }

    #[test]
    fn test_submit_starts_active_segment() {
        let mut chat = test_chat();
        let effect = update(&mut chat, Action::Submit("Hello".to_string())).unwrap();
        match effect {
            Effect::SpawnRequest(request) => {
                assert_eq!(request.prompt, "Hello");
                assert!(request.history.is_empty());
            }
            other => panic!("expected SpawnRequest, got {:?}", other),
        }
        assert!(chat.is_waiting());
        assert_eq!(chat.composer_text(), "Hello");
        assert!(!chat.composer().can_submit());
        assert!(chat.segments().is_empty());
    }

    #[test]
    fn test_second_submit_is_rejected_while_active() {
        let mut chat = test_chat();
        let uid = submit_hello(&mut chat);
        let effect = update(&mut chat, Action::Submit("Again".to_string())).unwrap();
        assert_eq!(effect, Effect::None);
        assert_eq!(chat.active_segment().map(|s| s.uid()), Some(uid.as_str()));
    }

    #[test]
    fn test_empty_submit_is_ignored() {
        let mut chat = test_chat();
        let effect = update(&mut chat, Action::Submit("  ".to_string())).unwrap();
        assert_eq!(effect, Effect::None);
        assert!(!chat.is_waiting());
    }

    #[test]
    fn test_batch_success_clears_composer_and_appends_segment() {
        let mut chat = test_chat();
        let uid = submit_hello(&mut chat);
        update(
            &mut chat,
            Action::ResponseReady {
                segment_uid: uid,
                message: "Yo!".to_string(),
            },
        )
        .unwrap();

        assert!(!chat.is_waiting());
        assert_eq!(chat.composer_text(), "");
        assert_eq!(chat.segments().len(), 1);
        assert_eq!(chat.segments()[0].ai_item().text(), "Yo!");
        assert!(!chat.segments()[0].loader_visible());
    }

    #[test]
    fn test_stream_chunks_then_complete() {
        let mut chat = test_chat();
        let uid = submit_hello(&mut chat);
        for text in ["Hel", "lo"] {
            update(
                &mut chat,
                Action::ResponseChunk {
                    segment_uid: uid.clone(),
                    text: text.to_string(),
                },
            )
            .unwrap();
        }
        let active = chat.active_segment().unwrap();
        assert!(active.ai_item().is_streaming());
        assert!(!active.loader_visible());

        update(&mut chat, Action::StreamComplete { segment_uid: uid }).unwrap();
        let history = chat.conversation_history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].text(), "Hello");
    }

    #[test]
    fn test_failure_restores_composer_and_reports() {
        let mut chat = test_chat();
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        chat.on_error(move |e| sink.lock().unwrap().push(e.clone()));

        let uid = submit_hello(&mut chat);
        update(
            &mut chat,
            Action::ResponseChunk {
                segment_uid: uid.clone(),
                text: "partial".to_string(),
            },
        )
        .unwrap();
        let effect = update(
            &mut chat,
            Action::ResponseFailed {
                segment_uid: uid,
                error: AdapterError::Network("offline".to_string()),
            },
        )
        .unwrap();

        assert_eq!(effect, Effect::None);
        assert_eq!(chat.composer_text(), "Hello");
        assert!(chat.composer().can_submit());
        assert!(chat.active_segment().is_none());
        assert!(chat.segments().is_empty());
        assert_eq!(
            *errors.lock().unwrap(),
            vec![AdapterError::Network("offline".to_string())]
        );
    }

    #[test]
    fn test_fatal_policy_halts() {
        let mut chat: AiChat<String> = AiChat::new(
            Arc::new(NoopAdapter),
            ChatOptions {
                error_policy: ErrorPolicy::Fatal,
                ..Default::default()
            },
        );
        let uid = submit_hello(&mut chat);
        let error = AdapterError::Rejected("nope".to_string());
        let effect = update(
            &mut chat,
            Action::ResponseFailed {
                segment_uid: uid,
                error: error.clone(),
            },
        )
        .unwrap();
        assert_eq!(effect, Effect::Halt(error));
        assert_eq!(chat.composer_text(), "Hello");
    }

    #[test]
    fn test_stale_results_are_ignored() {
        let mut chat = test_chat();
        let old = submit_hello(&mut chat);
        assert_eq!(update(&mut chat, Action::Cancel).unwrap(), Effect::AbortRequest);

        let fresh = spawned_uid(update(&mut chat, Action::Submit("Again".to_string())).unwrap());
        update(
            &mut chat,
            Action::ResponseChunk {
                segment_uid: old.clone(),
                text: "late".to_string(),
            },
        )
        .unwrap();
        update(
            &mut chat,
            Action::ResponseReady {
                segment_uid: old,
                message: "late".to_string(),
            },
        )
        .unwrap();

        let active = chat.active_segment().unwrap();
        assert_eq!(active.uid(), fresh);
        assert_eq!(active.ai_item().text(), "");
        assert!(chat.segments().is_empty());
    }

    #[test]
    fn test_cancel_restores_without_reporting() {
        let mut chat = test_chat();
        let reported = Arc::new(Mutex::new(0));
        let sink = reported.clone();
        chat.on_error(move |_| *sink.lock().unwrap() += 1);

        submit_hello(&mut chat);
        assert_eq!(update(&mut chat, Action::Cancel).unwrap(), Effect::AbortRequest);
        assert_eq!(chat.composer_text(), "Hello");
        assert_eq!(*reported.lock().unwrap(), 0);
        assert_eq!(update(&mut chat, Action::Cancel).unwrap(), Effect::None);
    }

    #[test]
    fn test_history_is_passed_to_next_request() {
        let mut chat = test_chat();
        let uid = submit_hello(&mut chat);
        update(
            &mut chat,
            Action::ResponseReady {
                segment_uid: uid,
                message: "Yo!".to_string(),
            },
        )
        .unwrap();
        match update(&mut chat, Action::Submit("More".to_string())).unwrap() {
            Effect::SpawnRequest(request) => {
                assert_eq!(request.history.len(), 2);
                assert_eq!(request.history[0].text(), "Hello");
            }
            other => panic!("expected SpawnRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_starters_hide_on_submit_and_return_after_failure() {
        let mut chat: AiChat<String> = AiChat::new(
            Arc::new(NoopAdapter),
            ChatOptions {
                conversation_starters: vec![
                    ConversationStarter::new("Hello, World!"),
                    ConversationStarter::new("How are you?"),
                ],
                ..Default::default()
            },
        );
        assert!(chat.starters_visible());

        let effect = update(&mut chat, Action::SelectStarter(1)).unwrap();
        match effect {
            Effect::SpawnRequest(ref request) => assert_eq!(request.prompt, "How are you?"),
            ref other => panic!("expected SpawnRequest, got {:?}", other),
        }
        assert!(!chat.starters_visible());
        assert_eq!(chat.composer_text(), "How are you?");

        // Hidden starters cannot be selected.
        assert_eq!(update(&mut chat, Action::SelectStarter(0)).unwrap(), Effect::None);

        let uid = spawned_uid(effect);
        update(
            &mut chat,
            Action::ResponseFailed {
                segment_uid: uid,
                error: AdapterError::Rejected("no".to_string()),
            },
        )
        .unwrap();
        assert!(chat.starters_visible());
    }

    #[test]
    fn test_starter_ignored_while_submission_disabled() {
        let mut chat: AiChat<String> = AiChat::new(
            Arc::new(NoopAdapter),
            ChatOptions {
                conversation_starters: vec![ConversationStarter::new("Hello, World!")],
                composer: ComposerOptions {
                    disable_submit_button: true,
                    ..Default::default()
                },
                ..Default::default()
            },
        );
        assert!(chat.starters_visible());
        assert_eq!(update(&mut chat, Action::SelectStarter(0)).unwrap(), Effect::None);
        assert!(!chat.is_waiting());
        assert!(chat.starters_visible());
    }

    #[test]
    fn test_stream_complete_without_chunks() {
        let mut chat = test_chat();
        let uid = submit_hello(&mut chat);
        assert!(chat.active_segment().unwrap().loader_visible());

        update(&mut chat, Action::StreamComplete { segment_uid: uid }).unwrap();

        assert!(!chat.is_waiting());
        assert_eq!(chat.segments().len(), 1);
        let segment = &chat.segments()[0];
        assert!(!segment.loader_visible());
        assert!(!segment.ai_item().is_streaming());
        assert_eq!(segment.ai_item().text(), "");
        assert_eq!(chat.composer_text(), "");
    }

    #[test]
    fn test_rendered_callback_fires_once_per_message() {
        let mut chat = test_chat();
        let rendered = Arc::new(Mutex::new(Vec::new()));
        let sink = rendered.clone();
        chat.on_message_rendered(move |uid| sink.lock().unwrap().push(uid.to_string()));

        let uid = submit_hello(&mut chat);
        update(
            &mut chat,
            Action::ResponseReady {
                segment_uid: uid,
                message: "Yo!".to_string(),
            },
        )
        .unwrap();
        let ai_uid = chat.segments()[0].ai_item().uid().to_string();
        assert_eq!(*rendered.lock().unwrap(), vec![ai_uid]);
    }
}
