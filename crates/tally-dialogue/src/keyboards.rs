// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyboards offered at each step.

use tally_core::{Button, Category, Keyboard, PaymentMethod};

use crate::callback::{Callback, MenuEntry};

fn button(label: &str, callback: Callback) -> Button {
    Button::new(label, callback.encode())
}

fn menu(label: &str, entry: MenuEntry) -> Button {
    button(label, Callback::Menu(entry))
}

fn cancel() -> Button {
    button("❌ Cancel", Callback::Cancel)
}

pub fn main_menu() -> Keyboard {
    Keyboard::new(vec![
        vec![
            menu("➕ Add expense", MenuEntry::AddExpense),
            menu("💰 Add funds", MenuEntry::AddFunds),
        ],
        vec![
            menu("💳 Pay credit card", MenuEntry::PayCredit),
            menu("♻️ Reset category", MenuEntry::ResetCategory),
        ],
        vec![
            menu("📊 Summary", MenuEntry::Summary),
            menu("🧾 Recent expenses", MenuEntry::Expenses),
        ],
        vec![
            menu("🗂 Categories", MenuEntry::Categories),
            menu("🏦 Payment methods", MenuEntry::PaymentMethods),
        ],
        vec![
            menu("🗑 Delete last expense", MenuEntry::DeleteLast),
            menu("📤 Export", MenuEntry::Export),
        ],
        vec![menu("❓ Help", MenuEntry::Help)],
    ])
}

pub fn add_funds_menu() -> Keyboard {
    Keyboard::new(vec![
        vec![menu("🗂 To category", MenuEntry::FundCategory)],
        vec![
            menu("💵 To cash", MenuEntry::FundCash),
            menu("🏦 To debit card", MenuEntry::FundDebit),
        ],
        vec![cancel()],
    ])
}

/// Exactly two buttons: confirm and cancel.
pub fn confirm() -> Keyboard {
    Keyboard::new(vec![vec![
        button("✅ Confirm", Callback::Confirm),
        cancel(),
    ]])
}

pub fn cancel_only() -> Keyboard {
    Keyboard::new(vec![vec![cancel()]])
}

pub fn skip_or_cancel() -> Keyboard {
    Keyboard::new(vec![vec![button("⏭ Skip", Callback::Skip), cancel()]])
}

pub fn categories(categories: &[Category]) -> Keyboard {
    let mut keyboard = Keyboard::column(
        categories
            .iter()
            .map(|c| button(&c.name, Callback::Category(c.id))),
    );
    keyboard.push_row(vec![cancel()]);
    keyboard
}

pub fn payment_methods(methods: &[PaymentMethod]) -> Keyboard {
    let mut keyboard = Keyboard::column(
        methods
            .iter()
            .map(|m| button(&m.name, Callback::PaymentMethod(m.id))),
    );
    keyboard.push_row(vec![cancel()]);
    keyboard
}
