// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Button-driven flows: add expense, funds, credit payments and resets.

use chrono::Local;
use tally_config::model::DialogueConfig;
use tally_core::{
    DateRange, LedgerStore, NewCategory, NewExpense, NewPaymentMethod, PaymentKind,
};
use tally_dialogue::format;
use tally_test_utils::{Sent, TestHarness};
use tracing_test::traced_test;

async fn harness() -> TestHarness {
    TestHarness::new().await.unwrap()
}

async fn seed_expense(h: &TestHarness, amount: f64, category: &str, payment_method: &str) {
    h.store
        .create_expense(NewExpense {
            amount,
            category: category.to_string(),
            payment_method: payment_method.to_string(),
            description: None,
            date: Local::now().date_naive(),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn add_expense_flow_advances_one_step_at_a_time() {
    let h = harness().await;

    h.tap("menu:add_expense").await;
    assert_eq!(h.state_name().await, "add_expense_select_category");

    h.tap_labelled("Uncategorized").await;
    assert_eq!(h.state_name().await, "add_expense_select_payment");

    h.tap_labelled("Telegram").await;
    assert_eq!(h.state_name().await, "add_expense_amount");
    let before = h.state().await.unwrap().data;

    h.send_text("abc").await;
    assert!(h.last_text().await.starts_with("Invalid amount"));
    let after = h.state().await.unwrap();
    assert_eq!(after.state, "add_expense_amount");
    assert_eq!(after.data, before);

    h.send_text("-5").await;
    assert_eq!(h.state_name().await, "add_expense_amount");

    h.send_text("12.50").await;
    assert_eq!(h.state_name().await, "add_expense_description");

    h.send_text("coffee beans").await;
    assert_eq!(h.state_name().await, "none");

    let expenses = h.ledger.list_expenses(DateRange::all()).await.unwrap();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].amount, 12.5);
    assert_eq!(expenses[0].category, "Uncategorized");
    assert_eq!(expenses[0].payment_method, "Telegram");
    assert_eq!(expenses[0].description.as_deref(), Some("coffee beans"));

    let telegram = h
        .ledger
        .find_payment_method("Telegram")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(telegram.kind, PaymentKind::Cash);
    assert_eq!(telegram.balance, -12.5);
}

#[tokio::test]
async fn description_can_be_skipped() {
    let h = harness().await;
    h.store.create_category(NewCategory::named("Food")).await.unwrap();
    h.store
        .create_payment_method(NewPaymentMethod::new("Visa", PaymentKind::Credit))
        .await
        .unwrap();

    h.tap("menu:add_expense").await;
    h.tap_labelled("Food").await;
    h.tap_labelled("Visa").await;
    h.send_text("$1,250").await;
    h.tap("skip").await;

    assert_eq!(h.state_name().await, "none");
    let expenses = h.ledger.list_expenses(DateRange::all()).await.unwrap();
    assert_eq!(expenses[0].amount, 1250.0);
    assert_eq!(expenses[0].description, None);
    let visa = h.ledger.find_payment_method("Visa").await.unwrap().unwrap();
    assert_eq!(visa.balance, 1250.0);
    assert!(h.last_text().await.contains("$1250.00 owed"));
}

#[tokio::test]
async fn typed_text_at_a_button_step_reprompts() {
    let h = harness().await;
    h.tap("menu:add_expense").await;
    let offered = h.mock_channel.last_options().await;

    h.send_text("groceries please").await;

    assert_eq!(h.state_name().await, "add_expense_select_category");
    assert_eq!(h.mock_channel.last_options().await, offered);
    assert!(h.mock_provider.prompts().await.is_empty());
}

#[tokio::test]
async fn fund_category_flow() {
    let h = harness().await;
    h.store.create_category(NewCategory::named("Food")).await.unwrap();

    h.tap("menu:add_funds").await;
    assert_eq!(h.state_name().await, "none");
    h.tap("menu:fund_category").await;
    assert_eq!(h.state_name().await, "select_category_for_fund");
    h.tap_labelled("Food").await;
    assert_eq!(h.state_name().await, "add_fund_category_amount");
    h.send_text("200").await;

    assert_eq!(h.state_name().await, "none");
    let food = h.ledger.find_category("Food").await.unwrap().unwrap();
    assert_eq!(food.balance, 200.0);
    assert_eq!(h.ledger.mutations().await, vec!["add_category_funds"]);
}

#[tokio::test]
async fn fund_category_without_categories_says_so() {
    let h = harness().await;
    h.tap("menu:fund_category").await;
    assert_eq!(h.state_name().await, "none");
    assert!(h.last_text().await.contains("no categories yet"));
}

#[tokio::test]
async fn fund_cash_creates_cash_wallet() {
    let h = harness().await;

    h.tap("menu:fund_cash").await;
    assert_eq!(h.state_name().await, "add_fund_cash_amount");
    h.send_text("1,000").await;

    let cash = h.ledger.find_payment_method("Cash").await.unwrap().unwrap();
    assert_eq!(cash.kind, PaymentKind::Cash);
    assert_eq!(cash.balance, 1000.0);
    assert_eq!(
        h.ledger.mutations().await,
        vec!["create_payment_method", "add_payment_method_funds"]
    );
}

#[tokio::test]
async fn fund_debit_flow() {
    let h = harness().await;

    h.tap("menu:fund_debit").await;
    assert!(h.last_text().await.contains("no debit cards"));
    assert_eq!(h.state_name().await, "none");

    h.store
        .create_payment_method(NewPaymentMethod::new("Checking", PaymentKind::Debit))
        .await
        .unwrap();
    h.tap("menu:fund_debit").await;
    assert_eq!(h.state_name().await, "select_debit_for_fund");
    h.tap_labelled("Checking").await;
    assert_eq!(h.state_name().await, "add_fund_debit_amount");
    h.send_text("250").await;

    let checking = h
        .ledger
        .find_payment_method("Checking")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(checking.balance, 250.0);
}

#[tokio::test]
async fn credit_card_payment_reduces_debt() {
    let h = harness().await;
    h.store
        .create_payment_method(NewPaymentMethod::new("Amex", PaymentKind::Credit))
        .await
        .unwrap();
    seed_expense(&h, 100.0, "Travel", "Amex").await;

    h.tap("menu:pay_credit").await;
    assert_eq!(h.state_name().await, "select_credit_for_payment");
    h.tap_labelled("Amex").await;
    assert_eq!(h.state_name().await, "pay_credit_amount");
    assert!(h.last_text().await.contains("$100.00"));
    h.send_text("40").await;

    let amex = h.ledger.find_payment_method("Amex").await.unwrap().unwrap();
    assert_eq!(amex.balance, 60.0);
    assert!(h.last_text().await.contains("Still owed: $60.00"));
    assert_eq!(h.state_name().await, "none");
}

#[tokio::test]
async fn reset_category_asks_first() {
    let h = harness().await;
    h.store.create_category(NewCategory::named("Food")).await.unwrap();
    seed_expense(&h, 20.0, "Food", "Cash").await;

    h.tap("menu:reset_category").await;
    h.tap_labelled("Food").await;
    assert_eq!(h.state_name().await, "confirm_category_reset");
    assert_eq!(h.mock_channel.last_options().await, vec!["confirm", "cancel"]);

    h.tap("cancel").await;
    assert_eq!(
        h.ledger.list_expenses(DateRange::all()).await.unwrap().len(),
        1
    );

    h.tap("menu:reset_category").await;
    h.tap_labelled("Food").await;
    h.tap("confirm").await;

    assert_eq!(h.state_name().await, "none");
    assert!(h.ledger.list_expenses(DateRange::all()).await.unwrap().is_empty());
    let food = h.ledger.find_category("Food").await.unwrap().unwrap();
    assert_eq!(food.balance, 0.0);
    assert!(h.last_text().await.contains("Removed 1 expenses"));
}

#[tokio::test]
async fn reset_without_confirmation_when_disabled() {
    let h = TestHarness::builder()
        .with_dialogue(DialogueConfig {
            confirm_reset: false,
            ..DialogueConfig::default()
        })
        .build()
        .await
        .unwrap();
    h.store.create_category(NewCategory::named("Food")).await.unwrap();
    seed_expense(&h, 20.0, "Food", "Cash").await;

    h.tap("menu:reset_category").await;
    h.tap_labelled("Food").await;

    assert_eq!(h.state_name().await, "none");
    assert_eq!(h.ledger.mutations().await, vec!["reset_category"]);
}

#[tokio::test]
async fn stale_flow_expires() {
    let h = harness().await;
    h.tap("menu:fund_cash").await;
    h.backdate_state(3_601).await;

    h.send_text("50").await;

    assert_eq!(h.state_name().await, "none");
    assert_eq!(h.last_text().await, format::FALLBACK);
    let cash = h.ledger.find_payment_method("Cash").await.unwrap().unwrap();
    assert_eq!(cash.balance, 0.0);
}

#[tokio::test]
async fn fresh_flow_survives_and_zero_ttl_never_expires() {
    let h = harness().await;
    h.tap("menu:fund_cash").await;
    h.backdate_state(60).await;
    h.send_text("50").await;
    let cash = h.ledger.find_payment_method("Cash").await.unwrap().unwrap();
    assert_eq!(cash.balance, 50.0);

    let h = TestHarness::builder()
        .with_dialogue(DialogueConfig {
            state_ttl_secs: 0,
            ..DialogueConfig::default()
        })
        .build()
        .await
        .unwrap();
    h.tap("menu:fund_cash").await;
    h.backdate_state(86_400 * 30).await;
    h.send_text("5").await;
    let cash = h.ledger.find_payment_method("Cash").await.unwrap().unwrap();
    assert_eq!(cash.balance, 5.0);
}

#[tokio::test]
async fn buttons_that_do_not_match_the_state_are_expired() {
    let h = harness().await;

    h.tap("confirm").await;
    assert_eq!(h.last_text().await, format::EXPIRED);

    h.tap("garbage:payload").await;
    assert_eq!(h.last_text().await, format::EXPIRED);

    h.tap("menu:fund_cash").await;
    h.tap("skip").await;
    assert_eq!(h.last_text().await, format::EXPIRED);
    assert_eq!(h.state_name().await, "add_fund_cash_amount");
    assert_eq!(h.mock_channel.acks().await.len(), 4);
}

#[tokio::test]
async fn vanished_category_ends_the_flow() {
    let h = harness().await;
    h.tap("menu:add_expense").await;

    h.tap("cat:9999").await;

    assert!(h.last_text().await.contains("That category no longer exists"));
    assert_eq!(h.state_name().await, "none");
}

#[tokio::test]
#[traced_test]
async fn unreadable_state_is_discarded() {
    let h = harness().await;
    h.states
        .insert_raw(
            h.state_key().as_str(),
            "add_expense_amount",
            Some(serde_json::json!({"categoryId": "three"})),
        )
        .await;

    h.send_text("12").await;

    assert_eq!(h.state_name().await, "none");
    assert_eq!(h.mock_provider.prompts().await.len(), 1);
    assert!(logs_contain("discarding unreadable conversation state"));
}

#[tokio::test]
async fn menu_tap_abandons_current_flow() {
    let h = harness().await;
    h.tap("menu:fund_cash").await;

    h.tap("menu:summary").await;

    assert_eq!(h.state_name().await, "none");
    assert!(h.last_text().await.contains("No expenses this month"));
}

#[tokio::test]
async fn export_and_delete_last_from_menu() {
    let h = harness().await;
    seed_expense(&h, 7.25, "Food", "Cash").await;

    h.tap("menu:export").await;
    let documents = h.mock_channel.documents().await;
    assert_eq!(documents.len(), 1);
    let Sent::Document {
        filename, bytes, ..
    } = &documents[0]
    else {
        unreachable!()
    };
    assert!(filename.starts_with("expenses-") && filename.ends_with(".csv"));
    let csv = String::from_utf8(bytes.clone()).unwrap();
    assert!(csv.starts_with("date,amount,category,payment_method,description"));
    assert!(csv.contains("7.25"));

    h.tap("menu:delete_last").await;
    assert!(h.last_text().await.contains("Deleted"));
    assert!(h.ledger.list_expenses(DateRange::all()).await.unwrap().is_empty());

    h.tap("menu:delete_last").await;
    assert!(h.last_text().await.contains("no expenses to delete"));
}

#[tokio::test]
async fn delete_last_removes_the_latest_entry_even_if_backdated() {
    let h = harness().await;
    seed_expense(&h, 10.0, "Food", "Cash").await;
    h.store
        .create_expense(NewExpense {
            amount: 99.0,
            category: "Food".to_string(),
            payment_method: "Cash".to_string(),
            description: Some("old receipt".to_string()),
            date: Local::now().date_naive() - chrono::Days::new(30),
        })
        .await
        .unwrap();

    h.tap("menu:delete_last").await;

    let remaining = h.ledger.list_expenses(DateRange::all()).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].amount, 10.0);
    assert!(h.last_text().await.contains("old receipt"));
}

/// Every list row offered since the last `clear_sent`, with each message's size.
async fn list_options(h: &TestHarness) -> (Vec<String>, Vec<usize>) {
    let mut options = Vec::new();
    let mut sizes = Vec::new();
    for sent in h.mock_channel.sent().await {
        if let Sent::List { .. } = &sent {
            let rows = sent.options();
            sizes.push(rows.len());
            options.extend(rows);
        }
    }
    (options, sizes)
}

#[tokio::test]
async fn whatsapp_gets_lists_and_reply_buttons() {
    let h = TestHarness::builder().on_whatsapp().build().await.unwrap();

    h.send_text("menu").await;
    let (options, sizes) = list_options(&h).await;
    assert!(sizes.iter().all(|&n| n <= 10), "{sizes:?}");
    assert_eq!(options.len(), 11);
    assert!(options.contains(&"menu:help".to_string()), "{options:?}");

    h.respond(r#"{"action":"add_expense","amount":3}"#).await;
    h.send_text("3 for gum").await;
    let Some(Sent::Buttons { buttons, .. }) = h.mock_channel.last().await else {
        panic!("confirmation should render as reply buttons");
    };
    assert_eq!(buttons.len(), 2);
    assert_eq!(buttons[0].data, "confirm");
}

#[tokio::test]
async fn whatsapp_long_category_list_keeps_every_choice_and_cancel() {
    let h = TestHarness::builder().on_whatsapp().build().await.unwrap();
    let mut ids = Vec::new();
    for n in 1..=12 {
        let category = h
            .store
            .create_category(NewCategory::named(format!("Category {n}")))
            .await
            .unwrap();
        ids.push(format!("cat:{}", category.id));
    }

    h.tap("menu:add_expense").await;

    let (options, sizes) = list_options(&h).await;
    assert!(sizes.len() > 1);
    assert!(sizes.iter().all(|&n| n <= 10), "{sizes:?}");
    for id in &ids {
        assert!(options.contains(id), "{id} unreachable in {options:?}");
    }
    assert_eq!(h.mock_channel.last_options().await.last().map(String::as_str), Some("cancel"));

    // A category on the second page is as good as one on the first.
    h.tap(&ids[11]).await;
    assert_eq!(h.state_name().await, "add_expense_select_payment");
}
