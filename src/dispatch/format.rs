//! Reply texts
//!
//! Everything the user reads comes from here, in Portuguese, with amounts
//! rendered by [`Currency::format`].

use crate::core::{ApplyOutcome, ConfirmationReason, PendingEntry, UndoOutcome};
use crate::types::{BudgetStatus, Category, Currency, Transaction, TransactionKind};
use rust_decimal::Decimal;
use std::fmt::Write;
use std::time::Duration;

pub const HELP_TEXT: &str = "\
Comandos:
• gasto <valor> <categoria> [data] [observação]: registra uma despesa
• receita <valor> <categoria> [data] [observação]: registra uma entrada
• saldo: mostra o saldo atual
• categoria [nome]: total de uma categoria ou de todas
• extrato [n]: últimos lançamentos
• desfazer [id]: estorna o último lançamento ou o id informado
• orçamento <categoria> <valor|off>: define ou remove um limite
• ajuda: mostra esta mensagem

Exemplos: \"gasto 45,90 transporte uber\", \"receita 1000 salário\", \"gasto 12 lazer ontem pix\".";

pub const HELP_HINT: &str = "Envie \"ajuda\" para ver os comandos.";

pub const DEGRADED_WARNING: &str =
    "⚠️ A planilha está fora de alcance; seus lançamentos estão salvos e serão sincronizados depois.";

pub const GENERIC_FAILURE: &str = "Não foi possível concluir a operação. Nada foi alterado.";

pub const NOTHING_TO_CONFIRM: &str =
    "Não há lançamento aguardando confirmação. Envie o lançamento novamente.";

pub const CONFIRMATION_EXPIRED: &str =
    "A confirmação expirou. Envie o lançamento novamente.";

pub const NOTHING_TO_CANCEL: &str = "Não há lançamento aguardando confirmação.";

pub const CANCELLED: &str = "Lançamento cancelado.";

/// Buttons offered with a confirmation prompt
pub const CONFIRM_BUTTONS: [&str; 2] = ["sim", "não"];

fn kind_label(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Expense => "Gasto",
        TransactionKind::Income => "Receita",
    }
}

fn describe(transaction: &Transaction) -> String {
    let mut text = format!(
        "{} de {} em {} ({})",
        kind_label(transaction.kind),
        transaction.currency.format(transaction.amount),
        transaction.category,
        transaction.date.format("%d/%m/%Y"),
    );
    if let Some(method) = transaction.payment_method {
        let _ = write!(text, ", {}", method.label());
    }
    if let Some(note) = &transaction.note {
        let _ = write!(text, ", \"{note}\"");
    }
    text
}

fn budget_line(category: &str, status: &BudgetStatus, currency: Currency) -> String {
    if status.exceeded {
        format!(
            "⚠️ Orçamento de {category} excedido: {} de {} ({} acima).",
            currency.format(status.spent),
            currency.format(status.limit),
            currency.format(-status.remaining),
        )
    } else {
        format!(
            "Orçamento de {category}: {} de {} (restam {}).",
            currency.format(status.spent),
            currency.format(status.limit),
            currency.format(status.remaining),
        )
    }
}

pub fn applied(outcome: &ApplyOutcome) -> String {
    let transaction = &outcome.transaction;
    let currency = transaction.currency;
    let mut text = format!(
        "✅ {} registrado.\nSaldo: {}\nTotal em {}: {}\nid: {}",
        describe(transaction),
        currency.format(outcome.new_balance),
        transaction.category,
        currency.format(outcome.category_total),
        transaction.id.short(),
    );
    if let Some(status) = &outcome.budget {
        text.push('\n');
        text.push_str(&budget_line(&transaction.category, status, currency));
    }
    text
}

pub fn confirmation_prompt(pending: &PendingEntry, expiry: Duration) -> String {
    let question = match &pending.reason {
        ConfirmationReason::ImplicitVerb => "Entendi um gasto. Confirma?".to_string(),
        ConfirmationReason::UnknownCategory(name) => {
            format!("A categoria '{name}' não existe e será criada. Confirma?")
        }
        ConfirmationReason::MissingCategory => format!(
            "Nenhuma categoria informada; o lançamento irá para '{}'. Confirma?",
            pending.transaction.category
        ),
    };
    format!(
        "{}\n{question}\nResponda \"sim\" ou \"não\" em até {} min.",
        describe(&pending.transaction),
        expiry.as_secs().div_ceil(60).max(1),
    )
}

pub fn undone(outcome: &UndoOutcome) -> String {
    match outcome {
        UndoOutcome::Reversed {
            transaction,
            new_balance,
            category_total,
        } => format!(
            "↩️ Estornado: {}.\nSaldo: {}\nTotal em {}: {}",
            describe(transaction),
            transaction.currency.format(*new_balance),
            transaction.category,
            transaction.currency.format(*category_total),
        ),
        UndoOutcome::AlreadyReversed {
            transaction,
            balance,
        } => format!(
            "A transação {} já foi estornada.\nSaldo: {}",
            transaction.id.short(),
            transaction.currency.format(*balance),
        ),
    }
}

pub fn balance(balance: Decimal, currency: Currency) -> String {
    format!("Saldo: {}", currency.format(balance))
}

pub fn category(category: &Category, currency: Currency) -> String {
    let mut text = format!("{}: {}", category.name, currency.format(category.running_total));
    if let Some(status) = category.budget_status() {
        text.push('\n');
        text.push_str(&budget_line(&category.name, &status, currency));
    }
    text
}

pub fn category_list(categories: &[Category], currency: Currency) -> String {
    if categories.is_empty() {
        return "Nenhuma categoria cadastrada.".to_string();
    }
    let mut text = String::from("Categorias:");
    for category in categories {
        let _ = write!(
            text,
            "\n• {}: {}",
            category.name,
            currency.format(category.running_total)
        );
        if let Some(status) = category.budget_status() {
            let _ = write!(text, " (limite {})", currency.format(status.limit));
            if status.exceeded {
                text.push_str(" ⚠️");
            }
        }
    }
    text
}

pub fn recent(transactions: &[Transaction]) -> String {
    if transactions.is_empty() {
        return "Nenhum lançamento registrado.".to_string();
    }
    let mut text = String::from("Últimos lançamentos:");
    for transaction in transactions {
        let _ = write!(
            text,
            "\n{} {} {} {}",
            transaction.id.short(),
            transaction.date.format("%d/%m"),
            transaction.currency.format(transaction.signed_amount()),
            transaction.category,
        );
        if let Some(note) = &transaction.note {
            let _ = write!(text, " ({note})");
        }
    }
    text
}

pub fn budget_set(category: &Category, currency: Currency) -> String {
    match category.budget_status() {
        Some(status) => format!(
            "Orçamento de {} definido em {}.\n{}",
            category.name,
            currency.format(status.limit),
            budget_line(&category.name, &status, currency),
        ),
        None => format!("Orçamento de {} removido.", category.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentMethod, TransactionId, TransactionStatus};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn expense() -> Transaction {
        Transaction {
            id: TransactionId::new(),
            kind: TransactionKind::Expense,
            amount: dec!(45.90),
            currency: Currency::Brl,
            category: "transporte".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 5, 3).unwrap(),
            note: Some("uber".to_string()),
            payment_method: Some(PaymentMethod::Pix),
            status: TransactionStatus::Committed,
        }
    }

    #[test]
    fn test_applied_summary() {
        let outcome = ApplyOutcome {
            transaction: expense(),
            new_balance: dec!(-45.90),
            category_total: dec!(-45.90),
            budget: None,
        };
        let text = applied(&outcome);

        assert!(text.contains("Gasto de R$ 45,90 em transporte (03/05/2025), Pix, \"uber\""));
        assert!(text.contains("Saldo: -R$ 45,90"));
        assert!(text.contains("Total em transporte: -R$ 45,90"));
        assert!(!text.contains("Orçamento"));
    }

    #[test]
    fn test_budget_lines() {
        let mut category = Category::new("lazer").with_budget(Some(dec!(100)));
        category.running_total = dec!(-30);
        assert!(super::category(&category, Currency::Brl).contains("restam R$ 70,00"));

        category.running_total = dec!(-130);
        let text = super::category(&category, Currency::Brl);
        assert!(text.contains("excedido"));
        assert!(text.contains("R$ 30,00 acima"));
    }

    #[test]
    fn test_recent_list() {
        assert_eq!(recent(&[]), "Nenhum lançamento registrado.");

        let tx = expense();
        let text = recent(std::slice::from_ref(&tx));
        assert!(text.contains(&tx.id.short()));
        assert!(text.contains("03/05 -R$ 45,90 transporte (uber)"));
    }

    #[test]
    fn test_confirmation_prompt_mentions_new_category() {
        let mut tx = expense();
        tx.category = "viagem".to_string();
        let pending = PendingEntry {
            draft: crate::types::EntryDraft {
                kind: TransactionKind::Expense,
                amount: dec!(45.90),
                category: crate::types::CategoryChoice::Hint("viagem".to_string()),
                date: None,
                note: None,
                payment_method: None,
                explicit_verb: true,
            },
            transaction: tx,
            reason: ConfirmationReason::UnknownCategory("viagem".to_string()),
        };
        let text = confirmation_prompt(&pending, Duration::from_secs(300));
        assert!(text.contains("'viagem' não existe"));
        assert!(text.contains("5 min"));
    }
}
