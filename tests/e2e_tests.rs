//! End-to-end integration tests
//!
//! These tests drive whole conversations through the dispatcher, with the
//! CSV sheet store and the push queue wired as in the binary.
//!
//! Fixture tests live in tests/fixtures/{name}/:
//! 1. messages.txt is fed line by line through the stdin transport
//! 2. The last replies are compared with expected.txt (blocks separated by a
//!    blank line; only as many trailing replies as expected.txt holds)
//!
//! Fixtures cover:
//! - Happy path entries and category totals
//! - Undo of the latest entry
//! - Confirmation of unknown-category and verb-less entries
//! - Rejected entries (zero, excess precision, missing amount)

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rstest::rstest;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use rust_finance_bot::cli::run_repl;
    use rust_finance_bot::core::{LedgerRegistry, ManualClock};
    use rust_finance_bot::dispatch::{format, DispatchOptions, Dispatcher};
    use rust_finance_bot::io::CsvSheet;
    use rust_finance_bot::settings::Settings;
    use rust_finance_bot::sync::{MemorySheet, PushQueue, StoreRef};
    use rust_finance_bot::types::TransactionStatus;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    const GRACE: Duration = Duration::from_secs(5);

    struct Bot {
        dispatcher: Dispatcher,
        queue: Arc<PushQueue>,
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 3).unwrap()
    }

    fn bot(store: StoreRef, options: DispatchOptions) -> Bot {
        let settings = Settings::default();
        let registry = Arc::new(LedgerRegistry::new(settings.to_template()));
        let queue = Arc::new(PushQueue::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            settings.retry_policy(),
        ));
        let dispatcher = Dispatcher::new(
            registry,
            store,
            Arc::clone(&queue),
            Arc::new(ManualClock::new(today())),
            options,
        );
        Bot { dispatcher, queue }
    }

    async fn csv_bot(dir: &TempDir) -> (Bot, Arc<CsvSheet>) {
        let sheet = Arc::new(CsvSheet::open(dir.path()).await.unwrap());
        (bot(sheet.clone(), DispatchOptions::default()), sheet)
    }

    /// Run a fixture conversation and compare the trailing replies
    ///
    /// # Panics
    ///
    /// Panics if a fixture file is missing or the replies differ.
    async fn run_test_fixture(fixture_name: &str) {
        let fixture_dir = format!("tests/fixtures/{}", fixture_name);
        let messages_path = format!("{}/messages.txt", fixture_dir);
        let expected_path = format!("{}/expected.txt", fixture_dir);

        assert!(
            Path::new(&messages_path).exists(),
            "Messages file not found: {}",
            messages_path
        );
        let messages = fs::read_to_string(&messages_path).unwrap();
        let expected = fs::read_to_string(&expected_path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", expected_path, e));

        let dir = tempdir().unwrap();
        let (bot, _sheet) = csv_bot(&dir).await;
        let mut output = Vec::new();
        let handled = run_repl(
            &bot.dispatcher,
            1,
            tokio::io::BufReader::new(messages.as_bytes()),
            &mut output,
        )
        .await
        .unwrap();
        bot.queue.shutdown(GRACE).await;

        assert_eq!(handled, messages.lines().filter(|l| !l.trim().is_empty()).count());

        let output = String::from_utf8(output).unwrap();
        let actual: Vec<&str> = output.trim_end().split("\n\n").collect();
        let expected: Vec<&str> = expected.trim_end().split("\n\n").collect();
        assert!(actual.len() >= expected.len(), "Too few replies:\n{}", output);

        let tail = &actual[actual.len() - expected.len()..];
        assert_eq!(
            tail, expected.as_slice(),
            "Fixture {} mismatch; full output:\n{}",
            fixture_name, output
        );
    }

    #[rstest]
    #[case::happy_path("happy_path")]
    #[case::undo_latest("undo_latest")]
    #[case::confirmation_flow("confirmation_flow")]
    #[case::rejected_entries("rejected_entries")]
    #[tokio::test]
    async fn test_fixture(#[case] fixture_name: &str) {
        run_test_fixture(fixture_name).await;
    }

    #[tokio::test]
    async fn test_expense_reply_reports_balance_and_category() {
        let bot = bot(Arc::new(MemorySheet::new()), DispatchOptions::default());

        let reply = bot.dispatcher.handle(1, "gasto 45,90 transporte").await;

        assert!(reply.text.contains("Saldo: -R$ 45,90"), "{}", reply.text);
        assert!(reply.text.contains("Total em transporte: -R$ 45,90"));
        let registry = bot.dispatcher.registry();
        assert_eq!(registry.query_balance(1), dec!(-45.90));
        assert_eq!(
            registry.query_category(1, "transporte").unwrap().running_total,
            dec!(-45.90)
        );
    }

    #[tokio::test]
    async fn test_income_then_expense_keeps_invariant() {
        let bot = bot(Arc::new(MemorySheet::new()), DispatchOptions::default());

        bot.dispatcher.handle(1, "receita 1000 salário").await;
        bot.dispatcher.handle(1, "gasto 250,75 alimentação mercado pix").await;

        let registry = bot.dispatcher.registry();
        let committed: Decimal = registry
            .list_recent(1, 50)
            .iter()
            .map(|tx| tx.signed_amount())
            .sum();
        assert_eq!(registry.query_balance(1), committed);
        assert_eq!(registry.query_balance(1), dec!(749.25));
    }

    #[tokio::test]
    async fn test_double_undo_by_id_is_idempotent() {
        let bot = bot(Arc::new(MemorySheet::new()), DispatchOptions::default());
        bot.dispatcher.handle(1, "gasto 45,90 transporte").await;
        let id = bot.dispatcher.registry().list_recent(1, 1)[0].id;

        let first = bot.dispatcher.handle(1, &format!("desfazer {}", id.short())).await;
        assert!(first.text.contains("Estornado"), "{}", first.text);
        assert_eq!(bot.dispatcher.registry().query_balance(1), dec!(0));

        let second = bot.dispatcher.handle(1, &format!("desfazer {}", id)).await;
        assert!(second.text.contains("já foi estornada"), "{}", second.text);
        assert_eq!(bot.dispatcher.registry().query_balance(1), dec!(0));

        let unknown = bot.dispatcher.handle(1, "desfazer ffffffff").await;
        assert_eq!(unknown.text, "Transação 'ffffffff' não encontrada.");
    }

    #[tokio::test]
    async fn test_repeated_bare_undo_is_idempotent() {
        let bot = bot(Arc::new(MemorySheet::new()), DispatchOptions::default());
        bot.dispatcher.handle(1, "gasto 100 lazer").await;
        bot.dispatcher.handle(1, "gasto 20 transporte").await;

        let first = bot.dispatcher.handle(1, "desfazer").await;
        assert!(first.text.contains("Estornado"), "{}", first.text);
        let second = bot.dispatcher.handle(1, "desfazer").await;
        assert!(second.text.contains("já foi estornada"), "{}", second.text);

        let registry = bot.dispatcher.registry();
        assert_eq!(registry.query_balance(1), dec!(-100));
        assert_eq!(registry.query_category(1, "lazer").unwrap().running_total, dec!(-100));
    }

    #[tokio::test]
    async fn test_command_text_round_trip() {
        let bot = bot(Arc::new(MemorySheet::new()), DispatchOptions::default());
        bot.dispatcher.handle(1, "gasto 1.234,56 moradia 01/05/2025 aluguel").await;
        let original = bot.dispatcher.registry().list_recent(1, 1)[0].clone();

        bot.dispatcher.handle(2, &original.command_text()).await;
        let replayed = bot.dispatcher.registry().list_recent(2, 1)[0].clone();

        assert_eq!(replayed.amount, original.amount);
        assert_eq!(replayed.category, original.category);
        assert_eq!(replayed.kind, original.kind);
        assert_eq!(replayed.date, original.date);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_category_confirmation_expires() {
        let bot = bot(Arc::new(MemorySheet::new()), DispatchOptions::default());

        let prompt = bot.dispatcher.handle(1, "gasto 80 viagem").await;
        assert!(!prompt.buttons.is_empty());

        tokio::time::advance(Duration::from_secs(5 * 60 + 1)).await;

        let late = bot.dispatcher.handle(1, "sim").await;
        assert_eq!(late.text, format::CONFIRMATION_EXPIRED);
        assert_eq!(bot.dispatcher.registry().query_balance(1), dec!(0));
        assert!(bot.dispatcher.registry().query_category(1, "viagem").is_err());
    }

    #[tokio::test]
    async fn test_excess_precision_rounds_when_configured() {
        let options = DispatchOptions {
            precision: rust_finance_bot::core::PrecisionPolicy::Round,
            ..DispatchOptions::default()
        };
        let bot = bot(Arc::new(MemorySheet::new()), options);

        bot.dispatcher.handle(1, "gasto 10,1250 lazer").await;
        bot.dispatcher.handle(1, "gasto 10,1350 lazer").await;

        // Half-even: 10.125 -> 10.12, 10.135 -> 10.14
        assert_eq!(bot.dispatcher.registry().query_balance(1), dec!(-20.26));
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_outage_degrades_then_recovers() {
        let sheet = Arc::new(MemorySheet::new());
        let bot = bot(
            sheet.clone(),
            DispatchOptions {
                degraded_depth: 2,
                ..DispatchOptions::default()
            },
        );
        sheet.set_offline(true);

        for amount in 1..=3 {
            let reply = bot
                .dispatcher
                .handle(1, &format!("gasto {amount} transporte"))
                .await;
            assert!(reply.text.contains("Saldo"), "{}", reply.text);
        }
        let reply = bot.dispatcher.handle(1, "saldo").await;
        assert!(reply.text.contains(format::DEGRADED_WARNING));
        assert_eq!(sheet.rows(1).len(), 0);

        sheet.set_offline(false);
        bot.queue.shutdown(Duration::from_secs(120)).await;

        let rows = sheet.rows(1);
        assert_eq!(rows.len(), 3);
        let amounts: Vec<Decimal> = rows.iter().map(|tx| tx.amount).collect();
        assert_eq!(amounts, vec![dec!(1), dec!(2), dec!(3)]);
    }

    #[tokio::test]
    async fn test_restart_hydrates_from_csv_sheet() {
        let dir = tempdir().unwrap();

        let (first, sheet) = csv_bot(&dir).await;
        first.dispatcher.handle(5, "receita 1000 salário").await;
        first.dispatcher.handle(5, "gasto 45,90 transporte").await;
        first.dispatcher.handle(5, "gasto 300 lazer").await;
        first.dispatcher.handle(5, "desfazer").await;
        first.queue.shutdown(GRACE).await;

        let content = fs::read_to_string(sheet.path(5)).unwrap();
        assert_eq!(content.lines().count(), 5, "{}", content);

        let (second, _) = csv_bot(&dir).await;
        let reply = second.dispatcher.handle(5, "saldo").await;
        assert_eq!(reply.text, "Saldo: R$ 954,10");

        let registry = second.dispatcher.registry();
        assert_eq!(registry.query_category(5, "lazer").unwrap().running_total, dec!(0));
        let recent = registry.list_recent(5, 10);
        assert_eq!(recent.len(), 2);
        assert!(recent.iter().all(|tx| tx.status == TransactionStatus::Committed));

        // The reversed entry is still the latest one after a restart
        let reply = second.dispatcher.handle(5, "desfazer").await;
        assert!(reply.text.contains("já foi estornada"), "{}", reply.text);
        assert_eq!(registry.query_balance(5), dec!(954.10));

        // Older hydrated entries are reached by id
        let fare = recent[0].id;
        second.dispatcher.handle(5, &format!("desfazer {}", fare.short())).await;
        assert_eq!(registry.query_balance(5), dec!(1000));
        second.queue.shutdown(GRACE).await;
    }
}
