// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The dialogue state machine.
//!
//! [`DialogueController::handle`] is invoked once per inbound event. It
//! loads the chat's [`Flow`], routes the event either into the active guided
//! step or through intent extraction, persists the next state, and replies.
//! Handling never fails from the caller's point of view: every error ends in
//! a chat message and a recoverable state.

use std::sync::Arc;

use chrono::{NaiveDate, TimeDelta, Utc};
use tally_config::model::DialogueConfig;
use tally_core::{
    ActionTag, Category, ChannelAdapter, ChannelEvent, ChatId, ConversationStore, ExpenseDraft,
    Intent, LedgerStore, MediaPayload, MediaReader, NewExpense, PaymentKind, PaymentMethod,
    StateKey, TallyError,
};
use tally_intent::{ExtractionContext, IntentExtractor};
use tracing::{debug, error, info, warn};

use crate::callback::{Callback, MenuEntry};
use crate::executor::{ActionExecutor, Prepared};
use crate::flow::{DraftSource, Flow, NONE_STATE, PendingAction};
use crate::format;
use crate::input::{confirmation_reply, is_cancel_command, is_skip, parse_amount};
use crate::keyboards;
use crate::locks::ChatLocks;
use crate::reply::{Reply, deliver};
use crate::report::Period;

/// One event being handled.
struct Turn<'a> {
    channel: &'a dyn ChannelAdapter,
    chat: ChatId,
    key: StateKey,
}

/// Channel-agnostic dialogue engine shared by every adapter.
pub struct DialogueController {
    executor: ActionExecutor,
    states: Arc<dyn ConversationStore>,
    extractor: Arc<IntentExtractor>,
    media: Option<Arc<dyn MediaReader>>,
    settings: DialogueConfig,
    locks: ChatLocks,
}

impl DialogueController {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        states: Arc<dyn ConversationStore>,
        extractor: Arc<IntentExtractor>,
        settings: DialogueConfig,
    ) -> Self {
        info!(
            providers = extractor.provider_count(),
            state_ttl_secs = settings.state_ttl_secs,
            confirm_reset = settings.confirm_reset,
            "dialogue controller initialized"
        );
        Self {
            executor: ActionExecutor::new(ledger, settings.clone()),
            states,
            extractor,
            media: None,
            settings,
            locks: ChatLocks::new(),
        }
    }

    /// Enable receipt photos and voice notes.
    pub fn with_media_reader(mut self, reader: Arc<dyn MediaReader>) -> Self {
        self.media = Some(reader);
        self
    }

    /// Handle one normalized inbound event from `channel`.
    ///
    /// Events for the same chat are handled one at a time. Button taps are
    /// acknowledged before anything else is sent.
    pub async fn handle(&self, channel: &dyn ChannelAdapter, event: ChannelEvent) {
        let chat = event.chat_id().clone();
        let key = StateKey::new(channel.name(), &chat);
        let _guard = self.locks.acquire(&key).await;

        if let ChannelEvent::Button {
            callback_id: Some(callback_id),
            ..
        } = &event
        {
            channel.acknowledge_button(callback_id).await;
        }

        debug!(chat_id = %key, kind = event.kind(), "inbound event");
        let turn = Turn { channel, chat, key };
        if let Err(e) = self.dispatch(&turn, event).await {
            self.recover(&turn, e).await;
        }
    }

    async fn dispatch(&self, turn: &Turn<'_>, event: ChannelEvent) -> Result<(), TallyError> {
        match event {
            ChannelEvent::Text { text, .. } => self.on_text(turn, text.trim()).await,
            ChannelEvent::Button { data, .. } => self.on_button(turn, &data).await,
            ChannelEvent::Voice { media, .. } => self.on_voice(turn, &media).await,
            ChannelEvent::Image { media, caption, .. } => {
                self.on_image(turn, &media, caption).await
            }
        }
    }

    /// Last-resort handling for an error that escaped a step: tell the user
    /// and clear the state so the chat is never stuck.
    async fn recover(&self, turn: &Turn<'_>, err: TallyError) {
        self.report_failure(turn, &err).await;
        if let Err(e) = self.states.clear_user_state(turn.key.as_str()).await {
            error!(chat_id = %turn.key, error = %e, "failed to clear state after error");
        }
    }

    async fn report_failure(&self, turn: &Turn<'_>, err: &TallyError) {
        let text = match err {
            TallyError::NotFound { entity, .. } => {
                warn!(chat_id = %turn.key, error = %err, "entity vanished mid-flow");
                format!("That {entity} no longer exists. Please start again.")
            }
            _ => {
                error!(chat_id = %turn.key, error = %err, "event handling failed");
                format::FAILURE.to_string()
            }
        };
        self.send(turn, Reply::text(text).with_menu()).await;
    }

    // --- State plumbing ---

    async fn load_flow(&self, turn: &Turn<'_>) -> Result<Option<Flow>, TallyError> {
        let Some(record) = self.states.get_user_state(turn.key.as_str()).await? else {
            return Ok(None);
        };

        if self.settings.state_ttl_secs > 0
            && let Some(ttl) = i64::try_from(self.settings.state_ttl_secs)
                .ok()
                .and_then(TimeDelta::try_seconds)
            && Utc::now().signed_duration_since(record.updated_at) > ttl
        {
            debug!(chat_id = %turn.key, state = %record.state, "conversation state expired");
            self.states.clear_user_state(turn.key.as_str()).await?;
            return Ok(None);
        }

        match Flow::from_record(&record) {
            Some(flow) => Ok(Some(flow)),
            None => {
                if record.state != NONE_STATE {
                    warn!(chat_id = %turn.key, state = %record.state, "discarding unreadable conversation state");
                    self.states.clear_user_state(turn.key.as_str()).await?;
                }
                Ok(None)
            }
        }
    }

    async fn save(&self, turn: &Turn<'_>, flow: &Flow) -> Result<(), TallyError> {
        let (state, data) = flow.to_parts()?;
        self.states
            .set_user_state(turn.key.as_str(), state, data)
            .await?;
        debug!(chat_id = %turn.key, state, "state saved");
        Ok(())
    }

    async fn clear(&self, turn: &Turn<'_>) -> Result<(), TallyError> {
        self.states.clear_user_state(turn.key.as_str()).await
    }

    async fn send(&self, turn: &Turn<'_>, reply: Reply) {
        deliver(turn.channel, &turn.chat, &reply).await;
    }

    /// Close a flow after a mutation was attempted. The state is cleared
    /// whether or not the mutation succeeded.
    async fn finish(
        &self,
        turn: &Turn<'_>,
        outcome: Result<Reply, TallyError>,
    ) -> Result<(), TallyError> {
        if let Err(e) = self.clear(turn).await {
            error!(chat_id = %turn.key, error = %e, "failed to clear state after execution");
        }
        match outcome {
            Ok(reply) => self.send(turn, reply).await,
            Err(e) => self.report_failure(turn, &e).await,
        }
        Ok(())
    }

    fn default_payment_method(&self, turn: &Turn<'_>) -> String {
        self.settings
            .default_payment_method
            .clone()
            .unwrap_or_else(|| turn.channel.display_name().to_string())
    }

    // --- Text ---

    async fn on_text(&self, turn: &Turn<'_>, text: &str) -> Result<(), TallyError> {
        if is_cancel_command(text) {
            return self.cancel(turn).await;
        }
        match text.to_lowercase().as_str() {
            "/start" | "/menu" | "menu" => {
                self.clear(turn).await?;
                self.send(turn, Reply::text(format::WELCOME).with_menu())
                    .await;
                return Ok(());
            }
            "/help" => {
                self.send(turn, Reply::text(format::HELP).with_menu()).await;
                return Ok(());
            }
            _ => {}
        }

        match self.load_flow(turn).await? {
            None => self.free_text(turn, text, None).await,
            Some(Flow::AwaitingConfirmation(pending)) => match confirmation_reply(text) {
                Some(true) => self.confirm(turn, pending).await,
                Some(false) => self.cancel(turn).await,
                None => self.free_text(turn, text, Some(pending)).await,
            },
            Some(Flow::AddExpenseDescription {
                category_name,
                payment_method_name,
                amount,
                ..
            }) => {
                let description = (!is_skip(text) && !text.is_empty()).then(|| text.to_string());
                self.record_guided_expense(turn, amount, category_name, payment_method_name, description)
                    .await
            }
            Some(flow) if flow.expects_amount() => self.amount_step(turn, flow, text).await,
            Some(flow) => self.reprompt(turn, &flow).await,
        }
    }

    async fn cancel(&self, turn: &Turn<'_>) -> Result<(), TallyError> {
        self.clear(turn).await?;
        debug!(chat_id = %turn.key, "flow cancelled");
        self.send(turn, Reply::text(format::CANCELLED).with_menu())
            .await;
        Ok(())
    }

    async fn extraction_context(&self) -> ExtractionContext {
        let mut context = ExtractionContext::new(today());
        let ledger = self.executor.ledger();
        match ledger.list_categories().await {
            Ok(categories) => context.categories = categories.into_iter().map(|c| c.name).collect(),
            Err(e) => warn!(error = %e, "could not list categories for extraction"),
        }
        match ledger.list_payment_methods().await {
            Ok(methods) => {
                context.payment_methods = methods.into_iter().map(|m| m.name).collect()
            }
            Err(e) => warn!(error = %e, "could not list payment methods for extraction"),
        }
        context
    }

    async fn free_text(
        &self,
        turn: &Turn<'_>,
        text: &str,
        pending: Option<PendingAction>,
    ) -> Result<(), TallyError> {
        let context = self.extraction_context().await;
        let intent = self.extractor.extract(text, &context).await;
        debug!(chat_id = %turn.key, action = %intent.action, "free text classified");
        self.route_intent(turn, intent, pending).await
    }

    /// Act on an extracted intent. `pending` is the action awaiting
    /// confirmation, if any; it is only touched by confirm, cancel, or a new
    /// confirmable action replacing it.
    async fn route_intent(
        &self,
        turn: &Turn<'_>,
        intent: Intent,
        pending: Option<PendingAction>,
    ) -> Result<(), TallyError> {
        let today = today();
        let reply = match intent.action {
            ActionTag::ViewExpenses => {
                self.executor
                    .recent_expenses(&Period::from_intent(&intent, today))
                    .await?
            }
            ActionTag::ViewSummary => {
                self.executor
                    .summary(&Period::from_intent(&intent, today), false)
                    .await?
            }
            ActionTag::ViewAnalytics => {
                self.executor
                    .summary(&Period::from_intent(&intent, today), true)
                    .await?
            }
            ActionTag::ViewCategories => self.executor.categories().await?,
            ActionTag::ViewPaymentMethods => self.executor.payment_methods().await?,
            ActionTag::DeleteExpense => self.executor.delete_last().await?,
            ActionTag::ExportData => {
                self.executor
                    .export(&Period::from_intent(&intent, today))
                    .await?
            }
            ActionTag::BackupData => self.executor.backup(today).await?,
            ActionTag::Help => Reply::text(format::HELP).with_menu(),
            ActionTag::Greeting | ActionTag::Menu => Reply::text(format::WELCOME).with_menu(),

            ActionTag::AddExpense | ActionTag::CreateCategory | ActionTag::CreatePaymentMethod => {
                let default_pm = self.default_payment_method(turn);
                match self.executor.prepare(&intent, &default_pm, today).await? {
                    Prepared::Ready(next) => return self.ask_confirmation(turn, next).await,
                    Prepared::Missing(text) => Reply::text(text),
                }
            }

            ActionTag::UpdateCategory
            | ActionTag::DeleteCategory
            | ActionTag::SetBudget
            | ActionTag::AddFundsToCategory
            | ActionTag::ResetCategory
            | ActionTag::UpdatePaymentMethod
            | ActionTag::DeletePaymentMethod
            | ActionTag::AddFundsToPaymentMethod
            | ActionTag::PayCreditCard => {
                debug!(chat_id = %turn.key, action = %intent.action, "redirecting to guided menu");
                Reply::text(format::guided_only(guided_label(intent.action))).with_menu()
            }

            ActionTag::ConfirmAction => match pending {
                Some(pending) => return self.confirm(turn, pending).await,
                None => Reply::text(format::FALLBACK).with_menu(),
            },
            ActionTag::CancelAction => match pending {
                Some(_) => return self.cancel(turn).await,
                None => Reply::text(format::FALLBACK).with_menu(),
            },
            ActionTag::Unknown => Reply::text(format::FALLBACK).with_menu(),
        };
        self.send(turn, reply).await;
        Ok(())
    }

    async fn ask_confirmation(
        &self,
        turn: &Turn<'_>,
        pending: PendingAction,
    ) -> Result<(), TallyError> {
        let text = format::confirmation_prompt(&self.settings.currency_symbol, &pending);
        debug!(chat_id = %turn.key, action = pending.name(), "awaiting confirmation");
        self.save(turn, &Flow::AwaitingConfirmation(pending)).await?;
        self.send(turn, Reply::text(text).with_keyboard(keyboards::confirm()))
            .await;
        Ok(())
    }

    async fn confirm(&self, turn: &Turn<'_>, pending: PendingAction) -> Result<(), TallyError> {
        match pending {
            PendingAction::AddExpenseFromReceipt(draft) => {
                self.start_draft_flow(turn, DraftSource::Receipt, draft).await
            }
            PendingAction::AddExpenseFromVoice(draft) => {
                self.start_draft_flow(turn, DraftSource::Voice, draft).await
            }
            other => {
                info!(chat_id = %turn.key, action = other.name(), "executing confirmed action");
                let outcome = self.executor.execute(&other).await;
                self.finish(turn, outcome).await
            }
        }
    }

    /// Media drafts never carry a trusted category or payment method, so
    /// both are chosen explicitly before anything is written.
    async fn start_draft_flow(
        &self,
        turn: &Turn<'_>,
        source: DraftSource,
        draft: ExpenseDraft,
    ) -> Result<(), TallyError> {
        let mut categories = self.executor.expense_categories().await?;
        let mut text = "Which category does this expense belong to?".to_string();
        if let Some(suggested) = &draft.category {
            if let Some(pos) = categories
                .iter()
                .position(|c| c.name.eq_ignore_ascii_case(suggested))
            {
                let hit = categories.remove(pos);
                categories.insert(0, hit);
            }
            text.push_str(&format!("\nSuggested: _{suggested}_"));
        }

        let flow = match source {
            DraftSource::Receipt => Flow::AwaitingReceiptCategoryFirst { draft },
            DraftSource::Voice => Flow::AwaitingVoiceCategoryFirst { draft },
        };
        self.save(turn, &flow).await?;
        self.send(
            turn,
            Reply::text(text).with_keyboard(keyboards::categories(&categories)),
        )
        .await;
        Ok(())
    }

    async fn amount_step(&self, turn: &Turn<'_>, flow: Flow, text: &str) -> Result<(), TallyError> {
        let Some(amount) = parse_amount(text) else {
            debug!(chat_id = %turn.key, state = flow.name(), "invalid amount");
            self.send(
                turn,
                Reply::text(format::INVALID_AMOUNT).with_keyboard(keyboards::cancel_only()),
            )
            .await;
            return Ok(());
        };

        match flow {
            Flow::AddExpenseAmount {
                category_id,
                category_name,
                payment_method_id,
                payment_method_name,
            } => {
                self.save(
                    turn,
                    &Flow::AddExpenseDescription {
                        category_id,
                        category_name,
                        payment_method_id,
                        payment_method_name,
                        amount,
                    },
                )
                .await?;
                self.send(
                    turn,
                    Reply::text("Add a short description, or tap Skip.")
                        .with_keyboard(keyboards::skip_or_cancel()),
                )
                .await;
                Ok(())
            }
            Flow::AddFundCategoryAmount { category_id, .. } => {
                let outcome = self.executor.fund_category(category_id, amount).await;
                self.finish(turn, outcome).await
            }
            Flow::AddFundDebitAmount {
                payment_method_id, ..
            }
            | Flow::AddFundCashAmount {
                payment_method_id, ..
            } => {
                let outcome = self
                    .executor
                    .fund_payment_method(payment_method_id, amount)
                    .await;
                self.finish(turn, outcome).await
            }
            Flow::PayCreditAmount {
                payment_method_id, ..
            } => {
                let outcome = self.executor.pay_credit(payment_method_id, amount).await;
                self.finish(turn, outcome).await
            }
            other => self.reprompt(turn, &other).await,
        }
    }

    async fn record_guided_expense(
        &self,
        turn: &Turn<'_>,
        amount: f64,
        category: String,
        payment_method: String,
        description: Option<String>,
    ) -> Result<(), TallyError> {
        let outcome = self
            .executor
            .add_expense(NewExpense {
                amount,
                category,
                payment_method,
                description,
                date: today(),
            })
            .await;
        self.finish(turn, outcome).await
    }

    /// Free text arrived where a button was expected: ask again.
    async fn reprompt(&self, turn: &Turn<'_>, flow: &Flow) -> Result<(), TallyError> {
        let keyboard = match flow {
            Flow::AddExpenseSelectCategory
            | Flow::AwaitingReceiptCategoryFirst { .. }
            | Flow::AwaitingVoiceCategoryFirst { .. } => {
                keyboards::categories(&self.executor.expense_categories().await?)
            }
            Flow::SelectCategoryForFund | Flow::SelectCategoryToReset => {
                keyboards::categories(&self.executor.ledger().list_categories().await?)
            }
            Flow::AddExpenseSelectPayment { .. }
            | Flow::AwaitingReceiptPayment { .. }
            | Flow::AwaitingVoicePayment { .. } => keyboards::payment_methods(
                &self
                    .executor
                    .expense_payment_methods(&self.default_payment_method(turn))
                    .await?,
            ),
            Flow::SelectDebitForFund => keyboards::payment_methods(
                &self.executor.payment_methods_of_kind(PaymentKind::Debit).await?,
            ),
            Flow::SelectCreditForPayment => keyboards::payment_methods(
                &self
                    .executor
                    .payment_methods_of_kind(PaymentKind::Credit)
                    .await?,
            ),
            Flow::ConfirmCategoryReset { .. } | Flow::AwaitingConfirmation(_) => {
                keyboards::confirm()
            }
            Flow::AddExpenseDescription { .. } => keyboards::skip_or_cancel(),
            _ => keyboards::cancel_only(),
        };
        debug!(chat_id = %turn.key, state = flow.name(), "re-prompting");
        self.send(
            turn,
            Reply::text("Please choose one of the options below, or tap Cancel.")
                .with_keyboard(keyboard),
        )
        .await;
        Ok(())
    }

    // --- Buttons ---

    async fn on_button(&self, turn: &Turn<'_>, data: &str) -> Result<(), TallyError> {
        let Some(callback) = Callback::parse(data) else {
            debug!(chat_id = %turn.key, data, "unrecognized button payload");
            return self.expired(turn).await;
        };

        match callback {
            Callback::Cancel => return self.cancel(turn).await,
            Callback::Menu(entry) => return self.open_menu(turn, entry).await,
            _ => {}
        }

        let Some(flow) = self.load_flow(turn).await? else {
            return self.expired(turn).await;
        };
        match (callback, flow) {
            (Callback::Confirm, Flow::AwaitingConfirmation(pending)) => {
                self.confirm(turn, pending).await
            }
            (Callback::Confirm, Flow::ConfirmCategoryReset { category_id, .. }) => {
                let outcome = self.executor.reset_category(category_id).await;
                self.finish(turn, outcome).await
            }
            (Callback::Category(id), flow) if flow.selects_category() => {
                self.category_selected(turn, flow, id).await
            }
            (Callback::PaymentMethod(id), flow) if flow.selects_payment_method() => {
                self.payment_selected(turn, flow, id).await
            }
            (
                Callback::Skip,
                Flow::AddExpenseDescription {
                    category_name,
                    payment_method_name,
                    amount,
                    ..
                },
            ) => {
                self.record_guided_expense(turn, amount, category_name, payment_method_name, None)
                    .await
            }
            (callback, flow) => {
                debug!(chat_id = %turn.key, state = flow.name(), callback = %callback, "button does not match state");
                self.expired(turn).await
            }
        }
    }

    /// A tap on a keyboard that no longer matches the conversation.
    async fn expired(&self, turn: &Turn<'_>) -> Result<(), TallyError> {
        self.send(turn, Reply::text(format::EXPIRED).with_menu())
            .await;
        Ok(())
    }

    async fn open_menu(&self, turn: &Turn<'_>, entry: MenuEntry) -> Result<(), TallyError> {
        if entry == MenuEntry::Help {
            self.send(turn, Reply::text(format::HELP).with_menu()).await;
            return Ok(());
        }
        // Any other menu tap abandons the current flow.
        self.clear(turn).await?;
        let this_month = Period::this_month(today());

        let reply = match entry {
            MenuEntry::Main => Reply::text(format::WELCOME).with_menu(),
            MenuEntry::Help => Reply::text(format::HELP).with_menu(),
            MenuEntry::Summary => self.executor.summary(&this_month, false).await?,
            MenuEntry::Expenses => self.executor.recent_expenses(&this_month).await?,
            MenuEntry::Categories => self.executor.categories().await?,
            MenuEntry::PaymentMethods => self.executor.payment_methods().await?,
            MenuEntry::DeleteLast => self.executor.delete_last().await?,
            MenuEntry::Export => self.executor.export(&this_month).await?,
            MenuEntry::AddFunds => {
                Reply::text("Where should the funds go?").with_keyboard(keyboards::add_funds_menu())
            }
            MenuEntry::AddExpense => {
                let categories = self.executor.expense_categories().await?;
                self.save(turn, &Flow::AddExpenseSelectCategory).await?;
                Reply::text("Which category is this expense for?")
                    .with_keyboard(keyboards::categories(&categories))
            }
            MenuEntry::FundCategory => {
                let categories = self.executor.ledger().list_categories().await?;
                self.select_category(
                    turn,
                    categories,
                    Flow::SelectCategoryForFund,
                    "Which category do you want to add funds to?",
                )
                .await?
            }
            MenuEntry::ResetCategory => {
                let categories = self.executor.ledger().list_categories().await?;
                self.select_category(
                    turn,
                    categories,
                    Flow::SelectCategoryToReset,
                    "Which category do you want to reset? Its expenses and fund history will be deleted.",
                )
                .await?
            }
            MenuEntry::FundCash => {
                let cash = self.executor.cash_method().await?;
                let prompt = format!(
                    "How much cash are you adding to *{}*? Current balance: {}",
                    cash.name,
                    format::money(&self.settings.currency_symbol, cash.balance)
                );
                self.save(
                    turn,
                    &Flow::AddFundCashAmount {
                        payment_method_id: cash.id,
                        payment_method_name: cash.name,
                    },
                )
                .await?;
                Reply::text(prompt).with_keyboard(keyboards::cancel_only())
            }
            MenuEntry::FundDebit => {
                let debits = self.executor.payment_methods_of_kind(PaymentKind::Debit).await?;
                self.select_payment_method(
                    turn,
                    debits,
                    Flow::SelectDebitForFund,
                    "Which debit card are you adding funds to?",
                    "You have no debit cards yet. Try \"add debit card Checking\".",
                )
                .await?
            }
            MenuEntry::PayCredit => {
                let credits = self.executor.payment_methods_of_kind(PaymentKind::Credit).await?;
                self.select_payment_method(
                    turn,
                    credits,
                    Flow::SelectCreditForPayment,
                    "Which credit card are you paying?",
                    "You have no credit cards yet. Try \"add credit card Amex\".",
                )
                .await?
            }
        };
        self.send(turn, reply).await;
        Ok(())
    }

    async fn select_category(
        &self,
        turn: &Turn<'_>,
        categories: Vec<Category>,
        flow: Flow,
        prompt: &str,
    ) -> Result<Reply, TallyError> {
        if categories.is_empty() {
            return Ok(
                Reply::text("You have no categories yet. Try \"add category Food\".").with_menu(),
            );
        }
        self.save(turn, &flow).await?;
        Ok(Reply::text(prompt).with_keyboard(keyboards::categories(&categories)))
    }

    async fn select_payment_method(
        &self,
        turn: &Turn<'_>,
        methods: Vec<PaymentMethod>,
        flow: Flow,
        prompt: &str,
        empty: &str,
    ) -> Result<Reply, TallyError> {
        if methods.is_empty() {
            return Ok(Reply::text(empty).with_menu());
        }
        self.save(turn, &flow).await?;
        Ok(Reply::text(prompt).with_keyboard(keyboards::payment_methods(&methods)))
    }

    async fn category_selected(
        &self,
        turn: &Turn<'_>,
        flow: Flow,
        category_id: i64,
    ) -> Result<(), TallyError> {
        let category = self
            .executor
            .ledger()
            .get_category(category_id)
            .await?
            .ok_or_else(|| TallyError::not_found("category", category_id))?;
        let symbol = &self.settings.currency_symbol;

        let (next, reply) = match flow {
            Flow::AddExpenseSelectCategory => (
                Flow::AddExpenseSelectPayment {
                    category_id: category.id,
                    category_name: category.name.clone(),
                },
                self.payment_prompt(turn, &category.name).await?,
            ),
            Flow::SelectCategoryForFund => (
                Flow::AddFundCategoryAmount {
                    category_id: category.id,
                    category_name: category.name.clone(),
                },
                Reply::text(format!(
                    "How much do you want to add to *{}*? Current balance: {}",
                    category.name,
                    format::money(symbol, category.balance)
                ))
                .with_keyboard(keyboards::cancel_only()),
            ),
            Flow::SelectCategoryToReset => {
                if !self.settings.confirm_reset {
                    let outcome = self.executor.reset_category(category.id).await;
                    return self.finish(turn, outcome).await;
                }
                (
                    Flow::ConfirmCategoryReset {
                        category_id: category.id,
                        category_name: category.name.clone(),
                    },
                    Reply::text(format!(
                        "⚠️ Reset *{}*? This permanently deletes its expenses and fund history and sets its balance to {}.",
                        category.name,
                        format::money(symbol, 0.0)
                    ))
                    .with_keyboard(keyboards::confirm()),
                )
            }
            Flow::AwaitingReceiptCategoryFirst { draft } => (
                Flow::AwaitingReceiptPayment {
                    draft,
                    category_id: category.id,
                    category_name: category.name.clone(),
                },
                self.payment_prompt(turn, &category.name).await?,
            ),
            Flow::AwaitingVoiceCategoryFirst { draft } => (
                Flow::AwaitingVoicePayment {
                    draft,
                    category_id: category.id,
                    category_name: category.name.clone(),
                },
                self.payment_prompt(turn, &category.name).await?,
            ),
            other => {
                debug!(chat_id = %turn.key, state = other.name(), "category tap ignored");
                return self.expired(turn).await;
            }
        };

        self.save(turn, &next).await?;
        self.send(turn, reply).await;
        Ok(())
    }

    async fn payment_prompt(&self, turn: &Turn<'_>, category: &str) -> Result<Reply, TallyError> {
        let methods = self
            .executor
            .expense_payment_methods(&self.default_payment_method(turn))
            .await?;
        Ok(
            Reply::text(format!("How did you pay for this *{category}* expense?"))
                .with_keyboard(keyboards::payment_methods(&methods)),
        )
    }

    async fn payment_selected(
        &self,
        turn: &Turn<'_>,
        flow: Flow,
        payment_method_id: i64,
    ) -> Result<(), TallyError> {
        let method = self
            .executor
            .ledger()
            .get_payment_method(payment_method_id)
            .await?
            .ok_or_else(|| TallyError::not_found("payment method", payment_method_id))?;
        let symbol = &self.settings.currency_symbol;

        let (next, reply) = match flow {
            Flow::AddExpenseSelectPayment {
                category_id,
                category_name,
            } => (
                Flow::AddExpenseAmount {
                    category_id,
                    category_name: category_name.clone(),
                    payment_method_id: method.id,
                    payment_method_name: method.name.clone(),
                },
                Reply::text(format!(
                    "How much did you spend on *{category_name}* with {}?",
                    method.name
                ))
                .with_keyboard(keyboards::cancel_only()),
            ),
            Flow::SelectDebitForFund => (
                Flow::AddFundDebitAmount {
                    payment_method_id: method.id,
                    payment_method_name: method.name.clone(),
                },
                Reply::text(format!(
                    "How much are you adding to *{}*? Current balance: {}",
                    method.name,
                    format::money(symbol, method.balance)
                ))
                .with_keyboard(keyboards::cancel_only()),
            ),
            Flow::SelectCreditForPayment => (
                Flow::PayCreditAmount {
                    payment_method_id: method.id,
                    payment_method_name: method.name.clone(),
                },
                Reply::text(format!(
                    "How much are you paying towards *{}*? Currently owed: {}",
                    method.name,
                    format::money(symbol, method.balance)
                ))
                .with_keyboard(keyboards::cancel_only()),
            ),
            Flow::AwaitingReceiptPayment {
                draft,
                category_name,
                ..
            }
            | Flow::AwaitingVoicePayment {
                draft,
                category_name,
                ..
            } => {
                let outcome = match draft.amount {
                    Some(amount) if amount > 0.0 => {
                        self.executor
                            .add_expense(NewExpense {
                                amount,
                                category: category_name,
                                payment_method: method.name,
                                description: draft.description.clone(),
                                date: draft.parsed_date().unwrap_or_else(today),
                            })
                            .await
                    }
                    _ => Err(TallyError::Validation(
                        "expense draft has no amount".to_string(),
                    )),
                };
                return self.finish(turn, outcome).await;
            }
            other => {
                debug!(chat_id = %turn.key, state = other.name(), "payment method tap ignored");
                return self.expired(turn).await;
            }
        };

        self.save(turn, &next).await?;
        self.send(turn, reply).await;
        Ok(())
    }

    // --- Media ---

    fn media_reader(&self) -> Option<&Arc<dyn MediaReader>> {
        self.media.as_ref()
    }

    async fn on_voice(&self, turn: &Turn<'_>, media: &MediaPayload) -> Result<(), TallyError> {
        let Some(reader) = self.media_reader() else {
            self.send(turn, Reply::text(format::MEDIA_DISABLED)).await;
            return Ok(());
        };
        let transcript = match reader.transcribe(media).await {
            Ok(text) => text,
            Err(e) => {
                warn!(chat_id = %turn.key, error = %e, "voice transcription failed");
                self.send(
                    turn,
                    Reply::text("🎤 I couldn't understand that voice note. Please try again or type it.")
                        .with_menu(),
                )
                .await;
                return Ok(());
            }
        };
        info!(chat_id = %turn.key, chars = transcript.len(), "voice note transcribed");

        let pending = match self.load_flow(turn).await? {
            Some(Flow::AwaitingConfirmation(pending)) => Some(pending),
            _ => None,
        };
        let context = self.extraction_context().await;
        let intent = self.extractor.extract(&transcript, &context).await;

        if intent.action == ActionTag::AddExpense
            && let Some(amount) = intent.amount.filter(|a| *a > 0.0)
        {
            let draft = ExpenseDraft {
                amount: Some(amount),
                description: intent.description.clone(),
                category: intent.category.clone(),
                date: intent.date.clone(),
            };
            return self
                .ask_confirmation(turn, PendingAction::AddExpenseFromVoice(draft))
                .await;
        }
        self.route_intent(turn, intent, pending).await
    }

    async fn on_image(
        &self,
        turn: &Turn<'_>,
        media: &MediaPayload,
        caption: Option<String>,
    ) -> Result<(), TallyError> {
        let Some(reader) = self.media_reader() else {
            self.send(turn, Reply::text(format::MEDIA_DISABLED)).await;
            return Ok(());
        };
        let mut draft = match reader.read_receipt(media).await {
            Ok(draft) => draft,
            Err(e) => {
                warn!(chat_id = %turn.key, error = %e, "receipt reading failed");
                self.send(
                    turn,
                    Reply::text("🧾 I couldn't read that receipt. Please try a clearer photo or type the expense.")
                        .with_menu(),
                )
                .await;
                return Ok(());
            }
        };
        if draft.description.is_none() {
            draft.description = caption
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty());
        }
        if !draft.amount.is_some_and(|a| a > 0.0) {
            debug!(chat_id = %turn.key, "receipt had no total");
            self.send(
                turn,
                Reply::text("🧾 I couldn't find a total on that receipt. Please type the expense instead.")
                    .with_menu(),
            )
            .await;
            return Ok(());
        }
        info!(chat_id = %turn.key, "receipt read");
        self.ask_confirmation(turn, PendingAction::AddExpenseFromReceipt(draft))
            .await
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Human wording for actions only reachable through the menu.
fn guided_label(action: ActionTag) -> &'static str {
    match action {
        ActionTag::UpdateCategory => "update a category",
        ActionTag::DeleteCategory => "delete a category",
        ActionTag::SetBudget => "set a budget",
        ActionTag::AddFundsToCategory => "add funds to a category",
        ActionTag::ResetCategory => "reset a category",
        ActionTag::UpdatePaymentMethod => "update a payment method",
        ActionTag::DeletePaymentMethod => "delete a payment method",
        ActionTag::AddFundsToPaymentMethod => "add funds to a payment method",
        ActionTag::PayCreditCard => "pay a credit card",
        _ => "do that",
    }
}
