// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Button payload codec.
//!
//! Payloads are short ASCII strings so they fit Telegram's 64-byte
//! `callback_data` and WhatsApp's reply and row ids.

use std::fmt;
use std::str::FromStr;

use strum::{Display, EnumIter, EnumString};

/// Entries reachable from the main menu and its sub-menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum MenuEntry {
    Main,
    AddExpense,
    AddFunds,
    FundCategory,
    FundCash,
    FundDebit,
    PayCredit,
    ResetCategory,
    Summary,
    Expenses,
    Categories,
    PaymentMethods,
    DeleteLast,
    Export,
    Help,
}

/// A decoded button tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    Menu(MenuEntry),
    Category(i64),
    PaymentMethod(i64),
    Skip,
    Confirm,
    Cancel,
}

impl Callback {
    pub fn parse(data: &str) -> Option<Self> {
        data.parse().ok()
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Menu(entry) => write!(f, "menu:{entry}"),
            Self::Category(id) => write!(f, "cat:{id}"),
            Self::PaymentMethod(id) => write!(f, "pm:{id}"),
            Self::Skip => f.write_str("skip"),
            Self::Confirm => f.write_str("confirm"),
            Self::Cancel => f.write_str("cancel"),
        }
    }
}

impl FromStr for Callback {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "skip" => return Ok(Self::Skip),
            "confirm" => return Ok(Self::Confirm),
            "cancel" => return Ok(Self::Cancel),
            _ => {}
        }
        let (prefix, rest) = s.trim().split_once(':').ok_or(())?;
        match prefix {
            "menu" => rest.parse().map(Self::Menu).map_err(|_| ()),
            "cat" => rest.parse().map(Self::Category).map_err(|_| ()),
            "pm" => rest.parse().map(Self::PaymentMethod).map_err(|_| ()),
            _ => Err(()),
        }
    }
}
