use ledger_report_engine::*;
use std::error::Error;

/// Builds a ledger where every listed account grows by `growth` per month.
fn ledger(accounts: &[(&str, f64)], growth: f64) -> AccountLedger {
    let mut ledger = AccountLedger::new();
    for (account, start) in accounts {
        let mut months = [None; MONTHS];
        for (month, value) in months.iter_mut().enumerate().take(11) {
            *value = Some(start * (1.0 + growth * month as f64));
        }
        ledger.insert(*account, months);
    }
    ledger
}

fn print_rows(rows: &[RowNode]) {
    for row in flatten_rows(rows) {
        let Some(cmp) = &row.comparisons else { continue };
        let indent = "  ".repeat(row.level as usize);
        let ytd = |v: Option<f64>| v.map_or("-".to_string(), |v| format!("{:.1}", v));
        println!(
            "{}{:<14} YTD {:>12} vs {:>12}  YoY {:>8}",
            indent,
            row.account,
            ytd(cmp.curr_year_ytd),
            ytd(cmp.prev_year_ytd),
            ytd(cmp.ytd_yoy_percent.or(cmp.ytd_yoy)),
        );
    }
}

fn main() -> std::result::Result<(), Box<dyn Error>> {
    let corporate = [
        ("MLB", 60_000.0),
        ("KIDS", 15_000.0),
        ("DISCOVERY", 8_000.0),
        ("실판매출", 70_000.0),
        ("매출원가", 28_000.0),
        ("광고비", 4_000.0),
        ("인건비", 9_000.0),
    ];
    let mlb = [("MLB", 60_000.0), ("실판매출", 52_000.0), ("매출원가", 20_000.0)];

    let source = InMemoryLedgerSource::new()
        .with(LedgerKey::corporate(StatementType::Pl, 2025), ledger(&corporate, 0.02))
        .with(LedgerKey::corporate(StatementType::Pl, 2024), ledger(&corporate, 0.0))
        .with(LedgerKey::brand(StatementType::Pl, 2025, "mlb"), ledger(&mlb, 0.02))
        .with(LedgerKey::brand(StatementType::Pl, 2024, "mlb"), ledger(&mlb, 0.0));

    let processor = ReportProcessor::new(source, EngineConfig::default())?;
    let base = BaseMonth::new(11)?;

    println!("📊 PL 2025 vs 2024 through month {}\n", base);
    let report = processor.brand_breakdown(&pl_schema(), 2025, base)?;
    print_rows(&report.rows);

    if report.incomplete {
        println!("\n⚠️  Missing sources: {}", report.missing_sources.join(", "));
    }

    println!("\n📝 Default summary lines:");
    for facts in report.category_facts() {
        println!("{}", facts.default_text());
    }

    if let Some(sales) = RowNode::find(&report.rows, "실판매출") {
        if let Some(brands) = &sales.brand_comparisons {
            println!("\n🏷️  Net sales YTD by brand:");
            for (brand, value) in &brands.ytd.curr_year {
                println!("  {:<10} {:>12.1}", brand, value.unwrap_or(0.0));
            }
        }
    }

    let dealers = vec![
        CreditDealerRow::new("Shanghai Lingbo", 48_000.0, 3_000.0),
        CreditDealerRow::new("Beijing Hengda", 21_000.0, 1_000.0),
        CreditDealerRow::new("Chengdu Xinyu", 9_000.0, 0.0),
        CreditDealerRow::new("합계", 78_000.0, 4_000.0),
    ];
    let credit = processor.credit_analysis(&dealers, Some("25.11".parse()?));
    println!(
        "\n💳 Largest dealer holds {:.1}% of net credit ({:?} risk)",
        credit.analysis.top1_ratio, credit.analysis.risk_level
    );

    let schedule = processor.recovery_schedule(
        "25.11".parse()?,
        &CreditRecoveryPlan {
            dealer_advance: 4_000.0,
            dealer_receivable: 78_000.0,
            recoveries: vec![10_000.0, 0.0, 12_000.0, 8_000.0],
        },
    )?;
    println!("\n📅 Planned recoveries:");
    for entry in &schedule.entries {
        println!("  {}  {:>10.1}", entry.label, entry.amount);
    }
    println!(
        "  remaining after recovery: {:.1}",
        schedule.remaining_after_recovery
    );

    Ok(())
}
