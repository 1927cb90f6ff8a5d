//! Message parser
//!
//! Turns the raw text of a chat message into a typed [`Intent`]. The parser
//! is a pure function of the text, the known category names and the current
//! date: it never touches the ledger.
//!
//! # Message Shapes
//!
//! ```text
//! gasto 45,90 transporte            expense with a known category
//! gastei R$ 30 almoço pix ontem     expense, new category hint, payment, date
//! 12,50 padaria                     implicit expense (no verb, low confidence)
//! receita 1.000 salário 05/05/2025  income with an explicit date
//! saldo | categoria [nome] | extrato [n] | desfazer [id]
//! orçamento lazer 300 | orçamento lazer off
//! sim | cancelar | ajuda
//! ```
//!
//! Verbs are matched on their folded form (see [`category_key`]), so
//! `Orçamento`, `orcamento` and `/orcamento@finbot` are the same command.

pub mod amount;
pub mod date;

pub use amount::{is_currency_marker, parse_amount};
pub use date::parse_date;

use crate::types::{
    category_key, CategoryChoice, CategoryIndex, CategoryMatch, Command, Confidence, EntryDraft,
    Intent, ParseError, PaymentMethod, TransactionKind, TransactionRef,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

/// Largest number of transactions a recent listing may ask for
pub const MAX_RECENT: usize = 50;

/// Words skipped when looking for a category
const STOPWORDS: [&str; 7] = ["em", "no", "na", "de", "com", "para", "pra"];

/// Budget values that remove the limit
const BUDGET_OFF: [&str; 4] = ["off", "remover", "sem", "nenhum"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Expense,
    Income,
    Balance,
    Category,
    Undo,
    Budget,
    Recent,
    Confirm,
    Cancel,
    Help,
}

impl Verb {
    fn from_folded(word: &str) -> Option<Self> {
        let verb = match word {
            "gasto" | "gastei" | "despesa" | "add" | "adicionar" | "expense" | "spent" => {
                Verb::Expense
            }
            "receita" | "recebi" | "entrada" | "income" => Verb::Income,
            "saldo" | "balance" => Verb::Balance,
            "categoria" | "categorias" | "category" | "categories" => Verb::Category,
            "desfazer" | "undo" => Verb::Undo,
            "orcamento" | "budget" | "limite" => Verb::Budget,
            "extrato" | "recentes" | "ultimos" | "recent" => Verb::Recent,
            "sim" | "confirmar" | "confirmo" | "yes" | "confirm" | "ok" => Verb::Confirm,
            "cancelar" | "nao" | "cancel" | "no" => Verb::Cancel,
            "ajuda" | "help" | "start" => Verb::Help,
            _ => return None,
        };
        Some(verb)
    }
}

/// Parse a chat message
///
/// # Arguments
///
/// * `raw_text` - The message exactly as received
/// * `categories` - Names the category matcher may resolve to
/// * `today` - Date used for `hoje`, `ontem` and `dd/mm`
///
/// # Returns
///
/// * `Ok(Intent)` with the command and a confidence level
/// * `Err(ParseError)` when no intent can be read; the ledger is never called
pub fn parse(
    raw_text: &str,
    categories: &CategoryIndex,
    today: NaiveDate,
) -> Result<Intent, ParseError> {
    let tokens: Vec<&str> = raw_text.split_whitespace().collect();
    let Some((&first, rest)) = tokens.split_first() else {
        return Err(ParseError::unrecognized_verb(""));
    };

    let verb = Verb::from_folded(&category_key(strip_command_decoration(first)));

    let (command, confidence) = match verb {
        Some(Verb::Expense) => entry(TransactionKind::Expense, true, first, rest, categories, today)?,
        Some(Verb::Income) => entry(TransactionKind::Income, true, first, rest, categories, today)?,
        Some(Verb::Balance) => (Command::QueryBalance, Confidence::High),
        Some(Verb::Category) => (list_category(rest, categories)?, Confidence::High),
        Some(Verb::Undo) => {
            let target = rest
                .first()
                .map(|id| TransactionRef::Id(id.to_string()))
                .unwrap_or(TransactionRef::Latest);
            (Command::Undo { target }, Confidence::High)
        }
        Some(Verb::Budget) => (set_budget(first, rest, categories)?, Confidence::High),
        Some(Verb::Recent) => {
            let count = rest
                .first()
                .and_then(|n| n.parse::<usize>().ok())
                .map(|n| n.clamp(1, MAX_RECENT));
            (Command::ListRecent { count }, Confidence::High)
        }
        Some(Verb::Confirm) => (Command::Confirm, Confidence::High),
        Some(Verb::Cancel) => (Command::Cancel, Confidence::High),
        Some(Verb::Help) => (Command::Help, Confidence::High),
        None if parse_amount(first).is_some() || is_currency_marker(first) => {
            entry(TransactionKind::Expense, false, first, &tokens, categories, today)?
        }
        None => return Err(ParseError::unrecognized_verb(first)),
    };

    let intent = Intent::new(command, raw_text, confidence);
    debug!(kind = ?intent.kind(), confidence = ?intent.confidence, "Parsed message");
    Ok(intent)
}

/// Drop a leading `/` and a trailing `@botname` from a slash command
fn strip_command_decoration(token: &str) -> &str {
    let token = token.strip_prefix('/').unwrap_or(token);
    match token.split_once('@') {
        Some((verb, _bot)) => verb,
        None => token,
    }
}

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&category_key(token).as_str())
}

/// Read an expense or income from the words after the verb
fn entry(
    kind: TransactionKind,
    explicit_verb: bool,
    verb: &str,
    words: &[&str],
    categories: &CategoryIndex,
    today: NaiveDate,
) -> Result<(Command, Confidence), ParseError> {
    let mut amount: Option<Decimal> = None;
    let mut date: Option<NaiveDate> = None;
    let mut payment_method: Option<PaymentMethod> = None;
    let mut free: Vec<&str> = Vec::new();

    for &word in words {
        if is_currency_marker(word) {
            continue;
        }
        if amount.is_none() {
            if let Some(value) = parse_amount(word) {
                amount = Some(value);
                continue;
            }
        }
        if date.is_none() {
            if let Some(value) = parse_date(word, today) {
                date = Some(value);
                continue;
            }
        }
        if let Some(method) = PaymentMethod::from_word(&category_key(word)) {
            // "cartão de crédito" refines the generic card
            payment_method = match (payment_method, method) {
                (None, method) => Some(method),
                (Some(PaymentMethod::Card), PaymentMethod::Credit | PaymentMethod::Debit) => {
                    Some(method)
                }
                (current, _) => current,
            };
            continue;
        }
        free.push(word);
    }

    let amount = amount.ok_or_else(|| ParseError::missing_amount(verb))?;
    let (category, used) = find_category(&free, categories)?;

    let note_words: Vec<&str> = free
        .iter()
        .enumerate()
        .filter(|(i, _)| !used.contains(i))
        .map(|(_, w)| *w)
        .collect();
    let note = build_note(&note_words);

    let confidence = if !explicit_verb {
        Confidence::Low
    } else if matches!(category, CategoryChoice::Known(_)) {
        Confidence::High
    } else {
        Confidence::Medium
    };

    let draft = EntryDraft {
        kind,
        amount,
        category,
        date,
        note,
        payment_method,
        explicit_verb,
    };
    Ok((Command::AddEntry(draft), confidence))
}

/// Find the category among the free words
///
/// Returns the choice and the indices of the words it consumed. Two-word
/// phrases are tried before single words so `saúde pública` beats `saúde`.
fn find_category(
    free: &[&str],
    categories: &CategoryIndex,
) -> Result<(CategoryChoice, Vec<usize>), ParseError> {
    for i in 0..free.len() {
        if is_stopword(free[i]) {
            continue;
        }

        if let Some(next) = free.get(i + 1).filter(|w| !is_stopword(w)) {
            let phrase = format!("{} {}", free[i], next);
            match categories.resolve(&phrase) {
                CategoryMatch::Exact(name) | CategoryMatch::Prefix(name) => {
                    return Ok((CategoryChoice::Known(name), vec![i, i + 1]));
                }
                CategoryMatch::Ambiguous(_) | CategoryMatch::None => {}
            }
        }

        match categories.resolve(free[i]) {
            CategoryMatch::Exact(name) | CategoryMatch::Prefix(name) => {
                return Ok((CategoryChoice::Known(name), vec![i]));
            }
            CategoryMatch::Ambiguous(candidates) => {
                return Err(ParseError::ambiguous_category(free[i], candidates));
            }
            CategoryMatch::None => {}
        }
    }

    // No known category: the first word with letters names a new one
    let hint = free.iter().enumerate().find(|(_, w)| {
        !is_stopword(w) && w.chars().any(char::is_alphabetic)
    });
    match hint {
        Some((i, word)) => {
            let name = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            Ok((CategoryChoice::Hint(name), vec![i]))
        }
        None => Ok((CategoryChoice::Fallback, Vec::new())),
    }
}

/// Join leftover words, trimming stopwords at both ends
fn build_note(words: &[&str]) -> Option<String> {
    let start = words.iter().position(|w| !is_stopword(w))?;
    let end = words.iter().rposition(|w| !is_stopword(w))?;
    Some(words[start..=end].join(" "))
}

fn list_category(words: &[&str], categories: &CategoryIndex) -> Result<Command, ParseError> {
    if words.is_empty() {
        return Ok(Command::ListCategory { name: None });
    }

    let typed = words.join(" ");
    let name = match categories.resolve(&typed) {
        CategoryMatch::Exact(name) | CategoryMatch::Prefix(name) => name,
        CategoryMatch::Ambiguous(candidates) => {
            return Err(ParseError::ambiguous_category(&typed, candidates))
        }
        CategoryMatch::None => typed,
    };
    Ok(Command::ListCategory { name: Some(name) })
}

/// `orçamento <categoria...> <valor|off>`
fn set_budget(
    verb: &str,
    words: &[&str],
    categories: &CategoryIndex,
) -> Result<Command, ParseError> {
    let Some((&value, name_words)) = words.split_last() else {
        return Err(ParseError::missing_amount(verb));
    };
    if name_words.is_empty() {
        return Err(ParseError::missing_amount(verb));
    }

    let limit = if BUDGET_OFF.contains(&category_key(value).as_str()) {
        None
    } else {
        Some(parse_amount(value).ok_or_else(|| ParseError::missing_amount(verb))?)
    };

    let typed = name_words
        .iter()
        .filter(|w| !is_currency_marker(w))
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    let category = match categories.resolve(&typed) {
        CategoryMatch::Exact(name) | CategoryMatch::Prefix(name) => name,
        CategoryMatch::Ambiguous(candidates) => {
            return Err(ParseError::ambiguous_category(&typed, candidates))
        }
        CategoryMatch::None => typed,
    };

    Ok(Command::SetBudget { category, limit })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IntentKind;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn categories() -> CategoryIndex {
        CategoryIndex::new([
            "alimentação",
            "transporte",
            "trabalho",
            "salário",
            "saúde pública",
            "lazer",
            "outros",
        ])
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 10).unwrap()
    }

    fn parse_ok(raw: &str) -> Intent {
        parse(raw, &categories(), today()).unwrap()
    }

    fn draft(raw: &str) -> EntryDraft {
        parse_ok(raw).entry().cloned().unwrap()
    }

    #[test]
    fn test_expense_with_known_category() {
        let intent = parse_ok("gasto 45,90 transporte");
        assert_eq!(intent.kind(), IntentKind::AddExpense);
        assert_eq!(intent.confidence, Confidence::High);
        assert_eq!(intent.raw_text, "gasto 45,90 transporte");

        let draft = intent.entry().unwrap();
        assert_eq!(draft.amount, dec!(45.90));
        assert_eq!(draft.category, CategoryChoice::Known("transporte".to_string()));
        assert_eq!(draft.date, None);
        assert_eq!(draft.note, None);
        assert!(draft.explicit_verb);
    }

    #[test]
    fn test_income_with_accented_category() {
        let intent = parse_ok("receita 1000 salario");
        assert_eq!(intent.kind(), IntentKind::AddIncome);
        assert_eq!(intent.confidence, Confidence::High);
        assert_eq!(
            intent.entry().unwrap().category,
            CategoryChoice::Known("salário".to_string())
        );
    }

    #[rstest]
    #[case::upper("GASTO 10 lazer")]
    #[case::accented("Gastéi 10 lazer")]
    #[case::slash("/gasto 10 lazer")]
    #[case::slash_bot("/gasto@finbot 10 lazer")]
    #[case::english("spent 10 lazer")]
    fn test_verb_variants(#[case] raw: &str) {
        let intent = parse_ok(raw);
        assert_eq!(intent.kind(), IntentKind::AddExpense);
        assert_eq!(intent.entry().unwrap().amount, dec!(10));
    }

    #[test]
    fn test_full_entry_extracts_date_payment_and_note() {
        let draft = draft("gastei R$ 1.234,56 alimentação 03/05/2025 cartão de crédito jantar com amigos");
        assert_eq!(draft.amount, dec!(1234.56));
        assert_eq!(draft.category, CategoryChoice::Known("alimentação".to_string()));
        assert_eq!(draft.date, NaiveDate::from_ymd_opt(2025, 5, 3));
        assert_eq!(draft.payment_method, Some(PaymentMethod::Credit));
        assert_eq!(draft.note, Some("jantar com amigos".to_string()));
    }

    #[test]
    fn test_two_word_category_beats_prefix() {
        let draft = draft("gasto 80 saude publica consulta");
        assert_eq!(draft.category, CategoryChoice::Known("saúde pública".to_string()));
        assert_eq!(draft.note, Some("consulta".to_string()));
    }

    #[test]
    fn test_category_after_stopword() {
        let draft = draft("gasto 20 em transporte ontem");
        assert_eq!(draft.category, CategoryChoice::Known("transporte".to_string()));
        assert_eq!(draft.date, NaiveDate::from_ymd_opt(2025, 5, 9));
        assert_eq!(draft.note, None);
    }

    #[test]
    fn test_prefix_category() {
        let draft = draft("gasto 15 alim");
        assert_eq!(draft.category, CategoryChoice::Known("alimentação".to_string()));
    }

    #[test]
    fn test_unknown_category_is_hint_with_medium_confidence() {
        let intent = parse_ok("gasto 30 Padaria pão");
        assert_eq!(intent.confidence, Confidence::Medium);
        let draft = intent.entry().unwrap();
        assert_eq!(draft.category, CategoryChoice::Hint("padaria".to_string()));
        assert_eq!(draft.note, Some("pão".to_string()));
    }

    #[test]
    fn test_missing_category_falls_back() {
        let intent = parse_ok("gasto 30 pix");
        assert_eq!(intent.confidence, Confidence::Medium);
        let draft = intent.entry().unwrap();
        assert_eq!(draft.category, CategoryChoice::Fallback);
        assert_eq!(draft.payment_method, Some(PaymentMethod::Pix));
    }

    #[test]
    fn test_implicit_expense_has_low_confidence() {
        let intent = parse_ok("12,50 lazer");
        assert_eq!(intent.kind(), IntentKind::AddExpense);
        assert_eq!(intent.confidence, Confidence::Low);
        let draft = intent.entry().unwrap();
        assert_eq!(draft.amount, dec!(12.50));
        assert!(!draft.explicit_verb);
    }

    #[test]
    fn test_implicit_expense_with_marker_token() {
        let intent = parse_ok("R$ 7 lazer");
        assert_eq!(intent.confidence, Confidence::Low);
        assert_eq!(intent.entry().unwrap().amount, dec!(7));
    }

    #[test]
    fn test_zero_and_negative_amounts_reach_validator() {
        assert_eq!(draft("gasto 0 lazer").amount, dec!(0));
        assert_eq!(draft("gasto -5 lazer").amount, dec!(-5));
    }

    #[rstest]
    #[case::empty("", ParseError::unrecognized_verb(""))]
    #[case::blank("   ", ParseError::unrecognized_verb(""))]
    #[case::unknown_verb("comprei 10 pão", ParseError::unrecognized_verb("comprei"))]
    #[case::missing_amount("gasto transporte", ParseError::missing_amount("gasto"))]
    #[case::bad_amount("gasto abc", ParseError::missing_amount("gasto"))]
    #[case::ambiguous(
        "gasto 10 tra",
        ParseError::ambiguous_category("tra", vec!["trabalho".to_string(), "transporte".to_string()])
    )]
    fn test_parse_errors(#[case] raw: &str, #[case] expected: ParseError) {
        assert_eq!(parse(raw, &categories(), today()), Err(expected));
    }

    #[rstest]
    #[case::balance("saldo", Command::QueryBalance)]
    #[case::balance_slash("/saldo", Command::QueryBalance)]
    #[case::all_categories("categorias", Command::ListCategory { name: None })]
    #[case::one_category("categoria LAZER", Command::ListCategory { name: Some("lazer".to_string()) })]
    #[case::unknown_category("categoria viagem", Command::ListCategory { name: Some("viagem".to_string()) })]
    #[case::undo_latest("desfazer", Command::Undo { target: TransactionRef::Latest })]
    #[case::undo_id("desfazer a1b2c3d4", Command::Undo { target: TransactionRef::Id("a1b2c3d4".to_string()) })]
    #[case::recent_default("extrato", Command::ListRecent { count: None })]
    #[case::recent_count("extrato 10", Command::ListRecent { count: Some(10) })]
    #[case::recent_clamped("extrato 500", Command::ListRecent { count: Some(MAX_RECENT) })]
    #[case::budget("orçamento lazer 300", Command::SetBudget { category: "lazer".to_string(), limit: Some(dec!(300)) })]
    #[case::budget_off("orcamento lazer off", Command::SetBudget { category: "lazer".to_string(), limit: None })]
    #[case::budget_two_words("limite saude publica 150,50", Command::SetBudget { category: "saúde pública".to_string(), limit: Some(dec!(150.50)) })]
    #[case::confirm("Sim", Command::Confirm)]
    #[case::cancel("não", Command::Cancel)]
    #[case::help("/start", Command::Help)]
    fn test_commands(#[case] raw: &str, #[case] expected: Command) {
        let intent = parse_ok(raw);
        assert_eq!(intent.command, expected);
        assert_eq!(intent.confidence, Confidence::High);
    }

    #[rstest]
    #[case::no_value("orcamento lazer")]
    #[case::no_args("orcamento")]
    #[case::bad_value("orcamento lazer muito")]
    fn test_budget_errors(#[case] raw: &str) {
        assert!(matches!(
            parse(raw, &categories(), today()),
            Err(ParseError::MissingAmount { .. })
        ));
    }
}
