use crate::infra::{parse_rupiah, LoggedNotifications};
use chrono::Local;
use clap::Args;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use superapp_core::config::AppConfig;
use superapp_core::error::AppError;
use superapp_core::ledger::statement::write_csv;
use superapp_core::ledger::{
    InMemoryLedgerStore, LedgerError, Operator, OperatorRole, TransactionRequest, TransactionType,
    UserId, WalletService,
};
use superapp_core::payroll::{PayrollCalculator, PayrollInput, PayrollSlip};
use superapp_core::performance::{InMemoryReviewStore, Kpi, ManagerAssessment, ReviewService};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Opening wallet balance for the demo employee (e.g. 500.000)
    #[arg(long, value_parser = parse_rupiah)]
    pub(crate) opening_balance: Option<i64>,
    /// Monthly base salary used for the payslip (e.g. 8.000.000)
    #[arg(long, value_parser = parse_rupiah)]
    pub(crate) salary: Option<i64>,
    /// Payroll period label (defaults to the current month)
    #[arg(long)]
    pub(crate) period: Option<String>,
    /// Skip the review and payroll portion of the demo
    #[arg(long)]
    pub(crate) skip_payroll: bool,
}

#[derive(Args, Debug)]
pub(crate) struct StatementArgs {
    /// Opening top-up for the scripted wallet
    #[arg(long, value_parser = parse_rupiah)]
    pub(crate) opening: i64,
    /// Marketplace purchase amount; repeat for several orders
    #[arg(long = "purchase", value_parser = parse_rupiah)]
    pub(crate) purchases: Vec<i64>,
    /// Write the CSV here instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

type DemoWallets = WalletService<InMemoryLedgerStore, LoggedNotifications>;

pub(crate) fn run_statement(args: StatementArgs) -> Result<(), AppError> {
    let wallets = WalletService::new(
        Arc::new(InMemoryLedgerStore::default()),
        Arc::new(LoggedNotifications::default()),
    );
    let user = UserId("statement-demo".to_string());
    wallets.open_wallet(user.clone())?;
    wallets.apply_transaction(TransactionRequest::new(
        user.clone(),
        TransactionType::TopUp,
        args.opening,
        "Opening top-up",
    ))?;

    for (index, amount) in args.purchases.iter().enumerate() {
        let request = TransactionRequest::new(
            user.clone(),
            TransactionType::Marketplace,
            -amount,
            format!("Marketplace order #{}", index + 1),
        );
        if let Err(err) = wallets.apply_transaction(request) {
            eprintln!("order #{} rejected: {}", index + 1, err);
        }
    }

    let transactions = wallets.transactions(&user)?;
    match args.output {
        Some(path) => write_csv(&transactions, File::create(path)?)?,
        None => write_csv(&transactions, io::stdout().lock())?,
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let notifications = Arc::new(LoggedNotifications::default());
    let wallets = WalletService::new(
        Arc::new(InMemoryLedgerStore::default()),
        notifications.clone(),
    );

    println!("Wallet ledger demo");
    let employee = UserId("emp-001".to_string());
    wallet_walkthrough(&wallets, &employee, args.opening_balance.unwrap_or(500_000))?;
    pay_later_walkthrough(&wallets, &employee)?;

    let reconciliation = wallets.reconcile(&employee)?;
    println!(
        "\nReconciliation: recorded {} / computed {} over {} entries -> {}",
        reconciliation.recorded_balance,
        reconciliation.computed_balance,
        reconciliation.entries,
        if reconciliation.is_consistent() {
            "consistent"
        } else {
            "MISMATCH"
        }
    );

    let ppn = config.payroll.ppn_for(750_000);
    println!("PPN on a 750000 marketplace order: {ppn}");

    if !args.skip_payroll {
        let period = args
            .period
            .unwrap_or_else(|| Local::now().format("%Y-%m").to_string());
        let reviews = ReviewService::new(
            Arc::new(InMemoryReviewStore::default()),
            notifications.clone(),
        );
        let score = review_walkthrough(&reviews, &employee, &period)?;
        let calculator = PayrollCalculator::new(config.payroll.clone())?;
        let slip = calculator.compute(
            &PayrollInput {
                employee_id: employee.0.clone(),
                employee_name: "Sari Wulandari".to_string(),
                period,
                base_salary: Some(args.salary.unwrap_or(8_000_000)),
                fixed_allowance: 1_000_000,
                attendance: None,
            },
            score,
        )?;
        render_slip(&slip);
    }

    let events = notifications.events();
    println!("\nNotifications dispatched: {}", events.len());
    for event in events {
        println!("  - {} -> {}", event.template, event.user_id);
    }

    println!("\nStatement:");
    let mut stdout = io::stdout().lock();
    write_csv(&wallets.transactions(&employee)?, &mut stdout)?;
    stdout.flush()?;
    Ok(())
}

fn wallet_walkthrough(
    wallets: &DemoWallets,
    employee: &UserId,
    opening_balance: i64,
) -> Result<(), AppError> {
    wallets.open_wallet(employee.clone())?;
    wallets.apply_transaction(TransactionRequest::new(
        employee.clone(),
        TransactionType::TopUp,
        opening_balance,
        "Opening balance",
    ))?;
    println!("- Opened wallet {} with {}", employee, opening_balance);

    let order = || {
        TransactionRequest::new(
            employee.clone(),
            TransactionType::Marketplace,
            -750_000,
            "Marketplace order",
        )
    };
    match wallets.apply_transaction(order()) {
        Ok(receipt) => println!("- Order paid, balance {}", receipt.balance),
        Err(LedgerError::InsufficientFunds {
            requested,
            available,
        }) => println!("- Order of {requested} rejected: only {available} available"),
        Err(err) => return Err(err.into()),
    }

    let top_up = wallets.apply_transaction(
        TransactionRequest::new(
            employee.clone(),
            TransactionType::TopUp,
            1_000_000,
            "Virtual account top-up",
        )
        .with_idempotency_key("va-demo-1"),
    )?;
    println!("- Topped up 1000000, balance {}", top_up.balance);

    let retry = wallets.apply_transaction(order())?;
    println!("- Retried order paid, balance {}", retry.balance);
    Ok(())
}

fn pay_later_walkthrough(wallets: &DemoWallets, employee: &UserId) -> Result<(), AppError> {
    let finance = Operator::new("fin-01", OperatorRole::Finance);
    wallets.apply_pay_later(employee)?;
    let account = wallets.approve_pay_later(&finance, employee, 5_000_000)?;
    println!("\nPayLater approved with limit {}", account.limit);

    let purchase = |amount: i64| {
        TransactionRequest::new(
            employee.clone(),
            TransactionType::Marketplace,
            -amount,
            "PayLater order",
        )
        .on_pay_later()
    };
    match wallets.apply_transaction(purchase(6_000_000)) {
        Ok(_) => println!("- Unexpectedly charged 6000000"),
        Err(err) => println!("- 6000000 order rejected: {err}"),
    }
    wallets.apply_transaction(purchase(2_000_000))?;
    let account = wallets.wallet(employee)?;
    println!(
        "- 2000000 order charged to PayLater, remaining limit {}",
        account.pay_later.remaining_limit
    );
    Ok(())
}

fn review_walkthrough(
    reviews: &ReviewService<InMemoryReviewStore, LoggedNotifications>,
    employee: &UserId,
    period: &str,
) -> Result<f64, AppError> {
    let review = reviews.create_review(
        employee.clone(),
        period,
        vec![
            Kpi::new("Marketplace GMV", 100_000_000.0, 70),
            Kpi::new("Customer satisfaction", 4.5, 30),
        ],
    )?;
    reviews.submit_self_assessment(&review.id, Vec::new())?;
    for (index, actual) in [(0, 95_000_000.0), (1, 4.8)] {
        reviews.record_manager_assessment(
            &review.id,
            ManagerAssessment {
                index,
                actual,
                comment: None,
            },
        )?;
    }
    let manager = Operator::new("mgr-07", OperatorRole::Manager);
    let finalized = reviews.finalize(&manager, &review.id)?;
    let score = finalized.payroll_score().unwrap_or_default();
    println!("\nReview {} finalized with score {:.2}", finalized.id, score);
    Ok(score)
}

fn render_slip(slip: &PayrollSlip) {
    println!(
        "Payslip {} for {} ({})",
        slip.period, slip.employee_name, slip.employee_id
    );
    for line in slip.lines() {
        println!("  {:?} {:<24} {:>12}", line.section, line.name, line.amount);
    }
    println!("  Total pendapatan       {:>12}", slip.total_pendapatan);
    println!("  Total potongan         {:>12}", slip.total_potongan);
    println!("  Take home pay          {:>12}", slip.take_home_pay);
}
