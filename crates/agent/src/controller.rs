//! The per-turn reducer
//!
//! One call to [`Controller::handle`] consumes one user message (or
//! none, for re-entry) and reduces the conversation state against the
//! flow map until a user-visible response is ready. The reducer is
//! written as a loop; each iteration is one reduction, counted by
//! `loop_stack` and bounded by [`LOOP_MAX`].

use std::sync::Arc;

use flowbot_core::{
    Intent, MessageOutput, NluOracle, DEFAULT_INTENT, REQUEST_SLOT,
};
use flowbot_flow::{EventOutput, FlowMap};

use crate::actions::{ActionRegistry, FALLBACK_PROMPT};
use crate::state::ConversationState;

/// Recursion bound of one turn.
pub const LOOP_MAX: u32 = 10;

/// The per-turn reducer over the flow map.
///
/// The controller itself is stateless and shared across all
/// conversations; all mutation happens on the [`ConversationState`]
/// passed into [`handle`](Controller::handle).
pub struct Controller {
    nlu: Arc<dyn NluOracle>,
    flow: Arc<FlowMap>,
    actions: ActionRegistry,
}

impl Controller {
    pub fn new(nlu: Arc<dyn NluOracle>, flow: Arc<FlowMap>, actions: ActionRegistry) -> Self {
        Self { nlu, flow, actions }
    }

    pub fn flow(&self) -> &FlowMap {
        &self.flow
    }

    /// Drive one turn.
    ///
    /// The reduction runs on a working copy that replaces the caller's
    /// state only when the turn completes, so a cancelled turn leaves
    /// the state untouched.
    pub async fn handle(
        &self,
        state: &mut ConversationState,
        user_message: Option<&str>,
    ) -> MessageOutput {
        let mut working = state.clone();
        let output = self.reduce(&mut working, user_message).await;
        *state = working;
        output
    }

    async fn reduce(
        &self,
        state: &mut ConversationState,
        user_message: Option<&str>,
    ) -> MessageOutput {
        metrics::counter!("flowbot_turns_total").increment(1);

        let mut message = user_message.map(str::to_string);
        let mut guard_fired = false;

        loop {
            if state.loop_stack >= LOOP_MAX {
                if guard_fired {
                    // The default flow itself exhausted the bound;
                    // short-circuit with the canned fallback.
                    tracing::warn!(
                        user_id = %state.user_id,
                        "loop guard exhausted twice in one turn"
                    );
                    state.events = EventOutput::new();
                    state.loop_stack = 0;
                    let output = MessageOutput::text(FALLBACK_PROMPT);
                    state.response = Some(output.clone());
                    return output;
                }
                guard_fired = true;
                tracing::debug!(
                    user_id = %state.user_id,
                    loop_stack = state.loop_stack,
                    "loop guard tripped, synthesising default trigger"
                );
                metrics::counter!("flowbot_loop_guard_total").increment(1);
                state.events = EventOutput::trigger(DEFAULT_INTENT);
                state.button = None;
                state.loop_stack = 0;
                message = None;
            } else if let (Some(bindings), Some(text)) = (&state.button, message.as_deref()) {
                // An open button prompt resolves the message before any
                // NLU classification.
                if let Some(trigger) = bindings.resolve(text) {
                    tracing::debug!(user_id = %state.user_id, choice = text, "button matched");
                    let fired = trigger.fire(&state.intent, &state.entities, &state.slots);
                    state.events = fired;
                    state.button = None;
                    state.loop_stack += 1;
                    message = None;
                }
            }

            if let Some(text) = message.take() {
                self.classify(&text, state).await;
            }

            // Effect dispatch, in fixed precedence.
            if let Some(action_name) = state.events.action.take() {
                let output = self.run_action(&action_name, state);
                state.events = output;
                state.loop_stack += 1;
                continue;
            }

            if let Some(assignments) = state.events.set_slot.take() {
                tracing::debug!(user_id = %state.user_id, ?assignments, "applying slot assignments");
                state.slots.apply(&assignments);
                // does not break the reduction
            }

            if let Some(text) = state.events.text.take() {
                state.loop_stack = 0;
                let output = MessageOutput::text(text);
                state.response = Some(output.clone());
                metrics::counter!("flowbot_responses_total", "kind" => "text").increment(1);
                return output;
            }

            if let Some(button) = state.events.button.take() {
                state.loop_stack = 0;
                let titles = button.bindings.titles();
                state.button = Some(button.bindings);
                let output = MessageOutput::buttons(button.text, titles);
                state.response = Some(output.clone());
                metrics::counter!("flowbot_responses_total", "kind" => "button").increment(1);
                return output;
            }

            if let Some(triggered) = state.events.trigger_intent.take() {
                tracing::debug!(user_id = %state.user_id, intent = %triggered, "trigger_intent");
                state.intent = Intent::named(&triggered);
                state.entities.clear();
                let output = self.run_action_map(&triggered, state);
                state.events = output;
                state.loop_stack += 1;
                continue;
            }

            let requested = state
                .events
                .request_slot
                .take()
                .or_else(|| state.slots.get(REQUEST_SLOT).map(str::to_string));
            if let Some(slot) = requested {
                tracing::debug!(user_id = %state.user_id, slot = %slot, "request_slot");
                let output = self.run_request_map(&slot, state);
                state.events = output;
                state.loop_stack += 1;
                continue;
            }

            // Nothing pending: enter the action map of the current intent.
            let intent_name = state.intent.name.clone();
            let output = self.run_action_map(&intent_name, state);
            state.events = output;
            state.loop_stack += 1;
        }
    }

    /// Classify a free-text message through the NLU oracle.
    ///
    /// Intents without an action map are remapped to the fallback with
    /// priority 0; ranking entries and entities outside the domain are
    /// dropped. A failed classification falls back to the default
    /// intent and leaves the slots untouched.
    async fn classify(&self, text: &str, state: &mut ConversationState) {
        match self.nlu.classify(text).await {
            Ok(result) => {
                let domain = self.flow.domain();
                let intent_ranking = result
                    .intent_ranking
                    .into_iter()
                    .filter(|(name, _)| domain.has_intent(name))
                    .collect();
                let (name, priority) = match self.flow.priority_of(&result.intent) {
                    Some(priority) => (result.intent, priority),
                    None => (DEFAULT_INTENT.to_string(), 0),
                };
                state.intent = Intent {
                    name,
                    intent_ranking,
                    priority,
                };
                state.entities = result
                    .entities
                    .into_iter()
                    .filter(|entity| {
                        let known = domain.has_entity(&entity.entity_name);
                        if !known {
                            tracing::warn!(
                                entity = %entity.entity_name,
                                "dropping entity outside the domain"
                            );
                        }
                        known
                    })
                    .collect();
                tracing::debug!(
                    user_id = %state.user_id,
                    intent = %state.intent.name,
                    entities = state.entities.len(),
                    "message classified"
                );
            }
            Err(error) => {
                tracing::warn!(
                    user_id = %state.user_id,
                    %error,
                    "NLU classification failed, falling back to default intent"
                );
                metrics::counter!("flowbot_nlu_failures_total").increment(1);
                state.intent = Intent::fallback();
                state.entities.clear();
            }
        }
    }

    fn run_action(&self, name: &str, state: &ConversationState) -> EventOutput {
        match self.actions.get(name) {
            Some(action) => action.call(&state.intent, &state.entities, &state.slots),
            None => {
                tracing::warn!(action = name, "unknown action, substituting default intent");
                EventOutput::trigger(DEFAULT_INTENT)
            }
        }
    }

    fn run_action_map(&self, intent_name: &str, state: &mut ConversationState) -> EventOutput {
        match self.flow.action(intent_name) {
            Some(map) => {
                let ConversationState {
                    intent,
                    entities,
                    slots,
                    ..
                } = state;
                map.evaluate(intent, entities, slots)
            }
            None => {
                // A triggered intent outside the flow map is a config
                // bug, not a crash: defer to the fallback action.
                tracing::warn!(
                    intent = intent_name,
                    "no action map for intent, deferring to the default action"
                );
                EventOutput::action(DEFAULT_INTENT)
            }
        }
    }

    fn run_request_map(&self, slot: &str, state: &mut ConversationState) -> EventOutput {
        match self.flow.request(slot) {
            Some(map) => {
                let ConversationState {
                    intent,
                    entities,
                    slots,
                    ..
                } = state;
                map.evaluate(intent, entities, slots)
            }
            None => {
                tracing::warn!(slot, "no request map for slot, clearing the request");
                state.slots.insert(REQUEST_SLOT, None);
                EventOutput::trigger(DEFAULT_INTENT)
            }
        }
    }
}
