//! The dialog stack orchestrator. One external call per incoming turn:
//! load the persisted stack, run the transition loop until a prompt suspends
//! it or the stack empties, save the stack, hand back the replies.

use std::sync::Arc;

use anyhow::Result;
use aula_memory::ConversationStore;
use aula_schema::{InboundTurn, OutboundReply};
use tracing::{debug, info, warn};

use crate::context::TurnContext;
use crate::dialog::{DialogFrame, DialogStack, DialogValue, FrameState, StepResult};
use crate::dialogs;
use crate::error::EngineError;
use crate::interruption::{self, Interruption};
use crate::records::MainState;
use crate::services::Services;
use crate::turn_lock::TurnLockManager;

/// Everything one turn produced for delivery to the user.
#[derive(Debug, Clone)]
pub struct TurnOutput {
    pub replies: Vec<OutboundReply>,
}

pub struct Engine {
    store: ConversationStore,
    services: Arc<Services>,
    locks: TurnLockManager,
}

impl Engine {
    pub fn new(store: ConversationStore, services: Services) -> Self {
        Self {
            store,
            services: Arc::new(services),
            locks: TurnLockManager::new(),
        }
    }

    pub fn services(&self) -> Arc<Services> {
        Arc::clone(&self.services)
    }

    /// Process one incoming turn start-to-finish. Turns for the same
    /// conversation are serialized; the stack is loaded fresh and saved once
    /// at the end, so a failure mid-turn leaves the previous turn's state
    /// authoritative.
    pub async fn process_turn(&self, turn: &InboundTurn) -> Result<TurnOutput> {
        let key = turn.conversation.0.as_str();
        let _guard = self.locks.acquire(key).await;
        debug!(trace_id = %turn.trace_id, conversation = key, "turn started");

        let mut stack = self.load_stack(key).await?;
        let mut ctx = TurnContext::new(Arc::clone(&self.services));

        if stack.is_empty() {
            match interruption::check(&turn.text) {
                Some(Interruption::Cancel) => {
                    ctx.send(OutboundReply::info(interruption::NOTHING_TO_CANCEL_TEXT));
                }
                Some(Interruption::Help) => {
                    ctx.send(OutboundReply::info(interruption::HELP_TEXT));
                }
                None => {
                    self.begin_dialog(&mut stack, FrameState::Main(MainState::fresh()), &mut ctx)
                        .await?;
                }
            }
        } else {
            self.continue_dialog(&mut stack, &turn.text, &mut ctx).await?;
        }

        debug_assert!(stack.is_well_formed());
        let prompts = ctx
            .replies()
            .iter()
            .filter(|r| r.expecting_input)
            .count();
        if prompts > 1 {
            warn!(prompts, "turn produced more than one user-facing prompt");
        }

        self.save_stack(key, &stack).await?;
        debug!(
            trace_id = %turn.trace_id,
            conversation = key,
            depth = stack.depth(),
            replies = ctx.replies().len(),
            "turn finished"
        );
        Ok(TurnOutput {
            replies: ctx.into_replies(),
        })
    }

    /// Push a new frame and immediately run its first step with no prior
    /// result.
    pub async fn begin_dialog(
        &self,
        stack: &mut DialogStack,
        state: FrameState,
        ctx: &mut TurnContext,
    ) -> Result<()> {
        info!(dialog = state.dialog_name(), "beginning dialog");
        stack.push(DialogFrame::new(state));
        self.drive(stack, None, ctx).await
    }

    /// Resume the top frame with the incoming utterance, after the
    /// interruption check. Errors if no dialog is active.
    pub async fn continue_dialog(
        &self,
        stack: &mut DialogStack,
        utterance: &str,
        ctx: &mut TurnContext,
    ) -> Result<()> {
        let Some(top) = stack.top() else {
            return Err(EngineError::NoActiveDialog(utterance.to_string()).into());
        };

        match interruption::check(utterance) {
            Some(Interruption::Cancel) => {
                info!(
                    depth = stack.depth(),
                    dialog = top.state.dialog_name(),
                    "cancelling all active dialogs"
                );
                stack.clear();
                ctx.send(OutboundReply::info(interruption::CANCEL_TEXT));
                Ok(())
            }
            Some(Interruption::Help) => {
                // Help leaves the stack untouched; re-issue the prompt the
                // user was answering so the conversation can pick up again.
                ctx.send(OutboundReply::info(interruption::HELP_TEXT));
                if let Some(prompt) = top.pending_prompt.clone() {
                    ctx.send(prompt);
                }
                Ok(())
            }
            None => {
                self.drive(
                    stack,
                    Some(DialogValue::Text(utterance.trim().to_string())),
                    ctx,
                )
                .await
            }
        }
    }

    /// The central transition loop. Chains `Continue` results synchronously
    /// within the turn; stops on the first `Suspend` or when the stack
    /// empties. No frame/step pair is ever invoked twice for one input.
    async fn drive(
        &self,
        stack: &mut DialogStack,
        mut input: Option<DialogValue>,
        ctx: &mut TurnContext,
    ) -> Result<()> {
        loop {
            let Some(frame) = stack.top_mut() else {
                // Stack exhausted: the conversation is idle; any terminal
                // result was already consumed by the dialog that ended.
                break;
            };
            let step = frame.step;
            let result = dialogs::run_step(&mut frame.state, step, input.take(), ctx).await?;
            match result {
                StepResult::Suspend(prompt) => {
                    frame.step += 1;
                    frame.pending_prompt = Some(prompt.clone());
                    ctx.send(prompt);
                    break;
                }
                StepResult::Continue(value) => {
                    frame.step += 1;
                    input = value;
                }
                StepResult::BeginChild(state) => {
                    // The child's eventual result resumes the step after
                    // the one that began it.
                    frame.step += 1;
                    frame.pending_prompt = None;
                    debug!(dialog = state.dialog_name(), "pushing child dialog");
                    stack.push(DialogFrame::new(state));
                }
                StepResult::Replace(state) => {
                    stack.pop();
                    debug!(dialog = state.dialog_name(), "replacing dialog");
                    stack.push(DialogFrame::new(state));
                }
                StepResult::End(value) => {
                    let ended = stack.pop();
                    if let Some(ended) = ended {
                        debug!(
                            dialog = ended.state.dialog_name(),
                            with_result = value.is_some(),
                            "dialog ended"
                        );
                    }
                    input = value;
                }
            }
        }
        Ok(())
    }

    /// Load the persisted stack for a conversation. Corrupt state degrades
    /// to a fresh stack rather than killing the conversation.
    pub async fn load_stack(&self, conversation_key: &str) -> Result<DialogStack> {
        match self.store.load(conversation_key).await? {
            None => Ok(DialogStack::new()),
            Some(record) => match DialogStack::from_json(&record.stack_json) {
                Ok(stack) => Ok(stack),
                Err(err) => {
                    warn!(
                        conversation = conversation_key,
                        "discarding corrupt dialog stack: {err}"
                    );
                    Ok(DialogStack::new())
                }
            },
        }
    }

    async fn save_stack(&self, conversation_key: &str, stack: &DialogStack) -> Result<()> {
        let json = stack.to_json()?;
        self.store.save(conversation_key, &json).await
    }
}
