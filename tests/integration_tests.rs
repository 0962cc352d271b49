use anyhow::Result;
use ledger_report_engine::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

const PL_FIXTURE: &str = "\
year,month,account,value
2023,12,MLB,999
2024,1,MLB,100
2024,1,KIDS,50
2024,1,실판매출,120
2024,1,매출원가,40
2024,1,광고비,20
2024,2,MLB,100
2024,2,KIDS,50
2024,2,실판매출,120
2024,2,매출원가,40
2024,2,광고비,20
2025,1,MLB,130
2025,1,KIDS,70
2025,1,실판매출,160
2025,1,매출원가,60
2025,1,광고비,30
2025,2,MLB,130
2025,2,KIDS,70
2025,2,실판매출,160
2025,2,매출원가,60
2025,2,광고비,30
2025,2,광고비,10
";

fn read_records(text: &str) -> Result<Vec<FinancialRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let records = reader
        .deserialize()
        .collect::<std::result::Result<Vec<FinancialRecord>, csv::Error>>()?;
    Ok(records)
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-6 * (1.0 + a.abs().max(b.abs()))
}

fn pl_accounts() -> Vec<&'static str> {
    let mut accounts = vec!["실판매출", "매출원가", "광고비", "인건비", "임차료", "기타영업비"];
    accounts.extend(statements::BRAND_ACCOUNTS);
    accounts
}

/// Roughly one month in ten is missing and one in ten is exactly zero.
fn random_ledger(rng: &mut StdRng, accounts: &[&str]) -> AccountLedger {
    let mut ledger = AccountLedger::new();
    for account in accounts {
        let mut months: MonthlyValues = [None; MONTHS];
        for value in months.iter_mut() {
            let roll: f64 = rng.gen();
            *value = if roll < 0.1 {
                None
            } else if roll < 0.2 {
                Some(0.0)
            } else {
                Some(rng.gen_range(-200.0..5000.0))
            };
        }
        ledger.insert(*account, months);
    }
    ledger
}

#[test]
fn test_pl_report_from_long_format_csv() -> Result<()> {
    let records = read_records(PL_FIXTURE)?;
    let source = InMemoryLedgerSource::new()
        .with(
            LedgerKey::corporate(StatementType::Pl, 2025),
            AccountLedger::from_records(&records, 2025)?,
        )
        .with(
            LedgerKey::corporate(StatementType::Pl, 2024),
            AccountLedger::from_records(&records, 2024)?,
        );
    let processor = ReportProcessor::new(source, EngineConfig::default())?;

    let report = processor.comparison_report(&pl_schema(), 2025, BaseMonth::new(2)?)?;
    assert!(!report.incomplete);

    let tag = RowNode::find(&report.rows, "Tag매출").unwrap();
    let cmp = tag.comparisons.as_ref().unwrap();
    assert_eq!(cmp.curr_year_month, Some(200.0));
    assert_eq!(cmp.curr_year_ytd, Some(400.0));
    assert_eq!(cmp.prev_year_ytd, Some(300.0));
    assert_eq!(cmp.ytd_yoy, Some(100.0));
    assert!(approx(cmp.ytd_yoy_percent.unwrap(), 100.0 / 3.0));

    // duplicate February advertising rows are summed
    let advertising = RowNode::find(&report.rows, "광고비").unwrap();
    assert_eq!(advertising.values[1], Some(40.0));
    assert_eq!(advertising.values[2], None);

    let profit = RowNode::find(&report.rows, "영업이익").unwrap();
    let cmp = profit.comparisons.as_ref().unwrap();
    assert_eq!(cmp.curr_year_ytd, Some(130.0));
    assert_eq!(cmp.prev_year_ytd, Some(120.0));
    assert_eq!(cmp.curr_year_annual, Some(130.0));

    let margin = RowNode::find(&report.rows, "영업이익률").unwrap();
    let cmp = margin.comparisons.as_ref().unwrap();
    assert!(approx(cmp.curr_year_ytd.unwrap(), 40.625));
    assert!(approx(cmp.prev_year_ytd.unwrap(), 50.0));
    assert!(approx(cmp.ytd_yoy.unwrap(), -9.375));
    assert_eq!(cmp.ytd_yoy_percent, None);

    let facts = report.category_facts();
    let profit_facts = facts.iter().find(|f| f.account == "영업이익").unwrap();
    assert_eq!(profit_facts.direction(), Some(Direction::Up));
    assert!(approx(profit_facts.yoy_percent.unwrap(), 100.0 / 12.0));
    assert_eq!(facts.len(), pl_schema().rows.len());

    Ok(())
}

#[test]
fn test_group_rows_always_balance() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(7);
    let schema = pl_schema();

    for _ in 0..50 {
        let ledger = random_ledger(&mut rng, &pl_accounts());
        let rows = TableBuilder::new(&schema)
            .with_total_column(TotalColumn::Annual)
            .build(&ledger)?;

        for row in flatten_rows(&rows).into_iter().filter(|r| r.is_group) {
            for column in 0..=MONTHS {
                let children: Vec<f64> = row
                    .children
                    .iter()
                    .filter(|c| c.format == RowFormat::Number)
                    .filter_map(|c| c.values[column])
                    .collect();
                match row.values[column] {
                    Some(total) => assert!(approx(total, children.iter().sum())),
                    None => assert!(children.is_empty(), "{} column {}", row.account, column),
                }
            }
        }
    }
    Ok(())
}

#[test]
fn test_yoy_and_ratios_never_produce_non_finite_numbers() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(42);
    let schema = pl_schema();

    for _ in 0..50 {
        let current = TableBuilder::new(&schema).build(&random_ledger(&mut rng, &pl_accounts()))?;
        let prior = TableBuilder::new(&schema).build(&random_ledger(&mut rng, &pl_accounts()))?;
        let base = BaseMonth::new(rng.gen_range(1..=12))?;

        let rows = ComparisonCalculator::new(&schema, base).compare(&current, &prior)?;
        for row in flatten_rows(&rows) {
            assert!(row.values.iter().flatten().all(|v| v.is_finite()));

            let cmp = row.comparisons.as_ref().unwrap();
            let pairs = [
                (cmp.prev_year_month, cmp.month_yoy_percent),
                (cmp.prev_year_ytd, cmp.ytd_yoy_percent),
                (cmp.prev_year_annual, cmp.annual_yoy_percent),
            ];
            for (prior, percent) in pairs {
                if prior.is_none() || prior == Some(0.0) || row.format == RowFormat::Percent {
                    assert_eq!(percent, None, "{}", row.account);
                }
                if let Some(p) = percent {
                    assert!(p.is_finite());
                }
            }
        }

        // ratio rows are null wherever the denominator is null or zero
        let sales = RowNode::find(&rows, "실판매출").unwrap();
        let margin = RowNode::find(&rows, "영업이익률").unwrap();
        for month in 0..MONTHS {
            if sales.values[month].map_or(true, |v| v == 0.0) {
                assert_eq!(margin.values[month], None);
            }
        }
    }
    Ok(())
}

#[test]
fn test_brand_residual_reconciles_with_corporate() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(2024);
    let config = EngineConfig::default();
    let accounts = pl_accounts();

    for _ in 0..20 {
        let mut source = InMemoryLedgerSource::new();
        for year in [2024, 2025] {
            source.insert(
                LedgerKey::corporate(StatementType::Pl, year),
                random_ledger(&mut rng, &accounts),
            );
            for brand in &config.brands.brands {
                if rng.gen_bool(0.7) {
                    source.insert(
                        LedgerKey::brand(StatementType::Pl, year, brand),
                        random_ledger(&mut rng, &accounts),
                    );
                }
            }
        }

        let processor = ReportProcessor::new(source, config.clone())?;
        let base = BaseMonth::new(rng.gen_range(1..=12))?;
        let report = processor.brand_breakdown(&pl_schema(), 2025, base)?;

        for row in flatten_rows(&report.rows) {
            if row.format == RowFormat::Percent {
                continue;
            }
            let cmp = row.comparisons.as_ref().unwrap();
            let brands = row.brand_comparisons.as_ref().unwrap();

            let checks = [
                (cmp.curr_year_month, &brands.month.curr_year),
                (cmp.curr_year_ytd, &brands.ytd.curr_year),
                (cmp.curr_year_annual, &brands.annual.curr_year),
                (cmp.prev_year_ytd, &brands.ytd.prev_year),
            ];
            for (corporate, by_brand) in checks {
                let other = by_brand["other"];
                match corporate {
                    Some(total) => {
                        let sum: f64 = by_brand.values().map(|v| v.unwrap_or(0.0)).sum();
                        assert!(approx(sum, total), "{}: {} vs {}", row.account, sum, total);
                    }
                    None => assert_eq!(other, None),
                }
            }
        }
    }
    Ok(())
}

#[test]
fn test_missing_brand_is_reported_not_fatal() -> Result<()> {
    let ledger = AccountLedger::from_values([("MLB", [10.0; MONTHS]), ("실판매출", [8.0; MONTHS])]);
    let source = InMemoryLedgerSource::new()
        .with(LedgerKey::corporate(StatementType::Pl, 2025), ledger.clone())
        .with(LedgerKey::brand(StatementType::Pl, 2025, "mlb"), ledger);
    let config = EngineConfig::from_json_str(r#"{ "brands": { "brands": ["mlb", "supra"] } }"#)?;
    let processor = ReportProcessor::new(source, config)?;

    let report = processor.brand_breakdown(&pl_schema(), 2025, BaseMonth::DECEMBER)?;
    assert!(report.incomplete);
    assert_eq!(
        report.missing_sources,
        vec!["PL/2024", "PL/mlb/2024", "PL/supra/2025"]
    );

    let sales = RowNode::find(&report.rows, "실판매출").unwrap();
    assert!(sales.comparisons.is_none());
    let brands = sales.brand_comparisons.as_ref().unwrap();
    assert_eq!(brands.annual.curr_year["mlb"], Some(96.0));
    assert_eq!(brands.annual.curr_year["other"], Some(0.0));
    assert_eq!(brands.annual.prev_year["other"], None);

    let json = serde_json::to_value(&report)?;
    assert_eq!(json["incomplete"], true);
    assert_eq!(json["baseMonth"], 12);
    Ok(())
}

#[test]
fn test_balance_sheet_uses_period_end_balances() -> Result<()> {
    let mut cash = [0.0; MONTHS];
    for (month, value) in cash.iter_mut().enumerate() {
        *value = 1000.0 + month as f64 * 100.0;
    }
    let source = InMemoryLedgerSource::new()
        .with(
            LedgerKey::corporate(StatementType::Bs, 2025),
            AccountLedger::from_values([("현금 및 현금성자산", cash), ("차입금", [500.0; MONTHS])]),
        )
        .with(
            LedgerKey::corporate(StatementType::Bs, 2024),
            AccountLedger::from_values([("현금 및 현금성자산", [800.0; MONTHS])]),
        );
    let processor = ReportProcessor::new(source, EngineConfig::default())?;

    let report = processor.comparison_report(&bs_schema(), 2025, BaseMonth::new(6)?)?;
    let assets = RowNode::find(&report.rows, "자산").unwrap();
    let cmp = assets.comparisons.as_ref().unwrap();
    assert_eq!(cmp.curr_year_ytd, Some(1500.0));
    assert_eq!(cmp.curr_year_annual, Some(2100.0));
    assert_eq!(cmp.prev_year_ytd, Some(800.0));

    let debt = RowNode::find(&report.rows, "부채").unwrap();
    let cmp = debt.comparisons.as_ref().unwrap();
    assert_eq!(cmp.curr_year_ytd, Some(500.0));
    assert_eq!(cmp.prev_year_ytd, None);
    assert_eq!(cmp.ytd_yoy, None);
    Ok(())
}

#[test]
fn test_cash_flow_prior_year_column() -> Result<()> {
    let mut ledger = AccountLedger::new();
    ledger.insert_entry(
        "매출수금",
        LedgerEntry::new([Some(100.0); MONTHS]).with_prior_year(1000.0),
    );
    ledger.insert_entry(
        "물품대지급",
        LedgerEntry::new([Some(-60.0); MONTHS]).with_prior_year(-700.0),
    );
    let source =
        InMemoryLedgerSource::new().with(LedgerKey::corporate(StatementType::Cf, 2025), ledger);
    let processor = ReportProcessor::new(source, EngineConfig::default())?;

    let rows = processor.build_table(&cf_schema(), 2025, TotalColumn::PriorYear)?;
    let operating = RowNode::find(&rows, "영업활동현금흐름").unwrap();
    assert_eq!(operating.values.len(), MONTHS + 1);
    assert_eq!(operating.values[0], Some(40.0));
    assert_eq!(operating.values[MONTHS], Some(300.0));

    let net = RowNode::find(&rows, "순현금흐름").unwrap();
    assert_eq!(net.values[MONTHS], Some(300.0));
    assert_eq!(RowNode::find(&rows, "투자활동현금흐름").unwrap().values[0], None);
    Ok(())
}

#[test]
fn test_balance_summary_through_processor() -> Result<()> {
    let mut ledger = AccountLedger::new();
    ledger.insert_entry(
        statements::CASH_BALANCE,
        LedgerEntry::new([Some(300.0); MONTHS]).with_prior_year(250.0),
    );
    ledger.insert_entry(
        statements::BORROWING_BALANCE,
        LedgerEntry::new([Some(100.0); MONTHS]).with_prior_year(150.0),
    );
    let source = InMemoryLedgerSource::new()
        .with(LedgerKey::corporate(StatementType::Balance, 2026), ledger.clone());
    let processor = ReportProcessor::new(source, EngineConfig::default())?;

    let summary = processor.balance_summary(2026)?;
    assert_eq!(summary.cash.movement(), Some(50.0));
    assert_eq!(summary.borrowings.movement(), Some(-50.0));
    assert_eq!(summary.net_cash[11], Some(200.0));

    let rows = TableBuilder::new(&balance_schema()).build(&ledger)?;
    assert_eq!(RowNode::find(&rows, "순현금").unwrap().values[3], Some(200.0));
    Ok(())
}

#[test]
fn test_credit_concentration_pipeline() -> Result<()> {
    let mut rows: Vec<CreditDealerRow> = (1..=20)
        .map(|i| CreditDealerRow::new(&format!("Dealer {:02}", i), i as f64 * 10.0, 0.0))
        .collect();
    rows.push(CreditDealerRow::new("합계", 2100.0, 0.0));
    rows.push(CreditDealerRow::new("Closed account", 0.0, 0.0));

    let processor = ReportProcessor::new(InMemoryLedgerSource::new(), EngineConfig::default())?;
    let analysis = processor.credit_analysis(&rows, Some("25.11".parse()?));

    assert_eq!(analysis.total.receivable, 2100.0);
    assert_eq!(analysis.dealers.len(), 20);
    assert_eq!(analysis.top.len(), 17);
    assert_eq!(analysis.top[0].name, "Dealer 20");
    assert_eq!(analysis.others.count, 3);
    assert_eq!(analysis.others.receivable, 60.0);
    assert!(approx(analysis.analysis.top_n_ratio, 2040.0 / 2100.0 * 100.0));
    assert!(approx(analysis.analysis.top1_ratio, 200.0 / 2100.0 * 100.0));
    assert_eq!(analysis.analysis.risk_level, RiskLevel::Low);
    Ok(())
}

#[test]
fn test_recovery_schedule_from_latest_file() -> Result<()> {
    let files = ["25.10.csv", "25.12.csv", "25.11.csv", "summary.csv"];
    let base = latest_base_from_file_names(files).unwrap();
    assert_eq!(base.to_string(), "25.12");
    assert_eq!(base.full_year(), 2025);

    let processor = ReportProcessor::new(InMemoryLedgerSource::new(), EngineConfig::default())?;
    let schedule = processor.recovery_schedule(
        base,
        &CreditRecoveryPlan {
            dealer_advance: 50.0,
            dealer_receivable: 500.0,
            recoveries: vec![100.0, 0.0, 0.0, 80.0],
        },
    )?;

    let headers: Vec<String> = schedule.headers.iter().map(ToString::to_string).collect();
    assert_eq!(headers, vec!["26.01", "26.02", "26.03", "26.04"]);
    let labels: Vec<String> = schedule.entries.iter().map(|e| e.label.to_string()).collect();
    assert_eq!(labels, vec!["26.01", "26.04"]);
    assert_eq!(schedule.remaining_after_recovery, 270.0);
    Ok(())
}

#[test]
fn test_custom_schema_from_json() -> Result<()> {
    let schema = StatementSchema::from_json_str(
        r#"{
            "statement": "PL",
            "rows": [
                { "account": "Sales" },
                { "account": "Returns" },
                {
                    "account": "Net Sales",
                    "bold": true,
                    "formula": {
                        "kind": "linear",
                        "terms": [
                            { "account": "Sales" },
                            { "account": "Returns", "coefficient": -1.0 }
                        ]
                    }
                }
            ]
        }"#,
    )?;

    let ledger = AccountLedger::from_values([("Sales", [50.0; MONTHS]), ("Returns", [5.0; MONTHS])]);
    let rows = TableBuilder::new(&schema).build(&ledger)?;
    assert_eq!(rows[2].values[0], Some(45.0));
    assert!(rows[2].is_calculated && rows[2].bold);

    let cyclic = StatementSchema::from_json_str(
        r#"{
            "statement": "PL",
            "rows": [
                { "account": "A", "formula": { "kind": "linear", "terms": [{ "account": "B" }] } },
                { "account": "B", "formula": { "kind": "linear", "terms": [{ "account": "A" }] } }
            ]
        }"#,
    );
    match cyclic {
        Err(ReportError::CyclicFormula(path)) => assert_eq!(path, vec!["A", "B", "A"]),
        other => panic!("expected a cycle error, got {:?}", other),
    }

    let json_schema = StatementSchema::schema_as_json()?;
    assert!(json_schema.contains("\"rows\""));
    Ok(())
}

#[test]
fn test_credit_statements_have_no_table() {
    let schema = StatementSchema::new(StatementType::Credit, vec![SchemaNode::account("A")]);
    let result = TableBuilder::new(&schema).build(&AccountLedger::new());
    assert!(matches!(
        result,
        Err(ReportError::UnsupportedStatement { .. })
    ));

    let by_brand: BTreeMap<String, Vec<RowNode>> = BTreeMap::new();
    let merged = BrandBreakdownMerger::new(&schema, BaseMonth::DECEMBER).merge(&[], &by_brand);
    assert!(merged.is_err());
}
