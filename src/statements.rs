//! Built-in layouts of the monthly management statements.
//!
//! Account names follow the ledgers exported by the finance team, so a ledger can be
//! fed into these schemas without any renaming. Custom layouts can still be supplied
//! as JSON through [`StatementSchema::from_json_str`].

use crate::error::{ReportError, Result};
use crate::schema::{FormulaTerm, Highlight, SchemaNode, StatementSchema, StatementType};

pub const BRAND_ACCOUNTS: [&str; 5] = ["MLB", "KIDS", "DISCOVERY", "DUVETICA", "SUPRA"];

pub const CASH_BALANCE: &str = "현금잔액";
pub const BORROWING_BALANCE: &str = "차입금잔액";

/// Income statement: tag sales by brand down to operating margin.
pub fn pl_schema() -> StatementSchema {
    StatementSchema::new(
        StatementType::Pl,
        vec![
            SchemaNode::group(
                "Tag매출",
                BRAND_ACCOUNTS.iter().map(|brand| SchemaNode::account(brand)).collect(),
            )
            .bold()
            .highlighted(Highlight::Sky),
            SchemaNode::account("실판매출").bold(),
            SchemaNode::ratio("할인율", "실판매출", "Tag매출"),
            SchemaNode::account("매출원가"),
            SchemaNode::linear(
                "매출총이익",
                vec![FormulaTerm::plus("실판매출"), FormulaTerm::minus("매출원가")],
            )
            .bold(),
            SchemaNode::ratio("매출총이익률", "매출총이익", "실판매출"),
            SchemaNode::group(
                "영업비",
                vec![
                    SchemaNode::account("광고비"),
                    SchemaNode::account("인건비"),
                    SchemaNode::account("임차료"),
                    SchemaNode::account("기타영업비"),
                ],
            ),
            SchemaNode::linear(
                "영업이익",
                vec![FormulaTerm::plus("매출총이익"), FormulaTerm::minus("영업비")],
            )
            .bold()
            .highlighted(Highlight::Yellow),
            SchemaNode::ratio("영업이익률", "영업이익", "실판매출").highlighted(Highlight::Yellow),
        ],
    )
}

/// Balance sheet: month-end positions plus the debt ratio.
pub fn bs_schema() -> StatementSchema {
    StatementSchema::new(
        StatementType::Bs,
        vec![
            SchemaNode::group(
                "자산",
                vec![
                    SchemaNode::account("현금 및 현금성자산"),
                    SchemaNode::group(
                        "외상매출금",
                        vec![SchemaNode::account("직영AR"), SchemaNode::account("대리상AR")],
                    ),
                    SchemaNode::account("재고자산"),
                    SchemaNode::account("유형자산"),
                    SchemaNode::account("기타자산"),
                ],
            )
            .bold()
            .highlighted(Highlight::Sky),
            SchemaNode::group(
                "부채",
                vec![
                    SchemaNode::account("매입채무"),
                    SchemaNode::account("차입금"),
                    SchemaNode::account("선수금"),
                    SchemaNode::account("기타부채"),
                ],
            )
            .bold()
            .highlighted(Highlight::Sky),
            SchemaNode::group(
                "자본",
                vec![SchemaNode::account("자본금"), SchemaNode::account("이익잉여금")],
            )
            .bold()
            .highlighted(Highlight::Sky),
            SchemaNode::ratio("부채비율", "부채", "자본").highlighted(Highlight::Gray),
        ],
    )
}

/// Cash flow statement; the ledger's trailing column holds the prior-year total.
pub fn cf_schema() -> StatementSchema {
    StatementSchema::new(
        StatementType::Cf,
        vec![
            SchemaNode::group(
                "영업활동현금흐름",
                vec![
                    SchemaNode::account("매출수금"),
                    SchemaNode::account("물품대지급"),
                    SchemaNode::account("영업비지급"),
                    SchemaNode::account("법인세납부"),
                ],
            )
            .bold(),
            SchemaNode::group(
                "투자활동현금흐름",
                vec![
                    SchemaNode::account("유형자산취득"),
                    SchemaNode::account("기타투자"),
                ],
            )
            .bold(),
            SchemaNode::group(
                "재무활동현금흐름",
                vec![
                    SchemaNode::account("차입금증감"),
                    SchemaNode::account("배당금지급"),
                ],
            )
            .bold(),
            SchemaNode::linear(
                "순현금흐름",
                vec![
                    FormulaTerm::plus("영업활동현금흐름"),
                    FormulaTerm::plus("투자활동현금흐름"),
                    FormulaTerm::plus("재무활동현금흐름"),
                ],
            )
            .bold()
            .highlighted(Highlight::DarkGray),
        ],
    )
}

/// Cash and borrowing balances with the resulting net cash position.
pub fn balance_schema() -> StatementSchema {
    StatementSchema::new(
        StatementType::Balance,
        vec![
            SchemaNode::account(CASH_BALANCE),
            SchemaNode::account(BORROWING_BALANCE),
            SchemaNode::linear(
                "순현금",
                vec![
                    FormulaTerm::plus(CASH_BALANCE),
                    FormulaTerm::minus(BORROWING_BALANCE),
                ],
            )
            .bold(),
        ],
    )
}

pub fn builtin_schema(statement: StatementType) -> Result<StatementSchema> {
    match statement {
        StatementType::Pl => Ok(pl_schema()),
        StatementType::Bs => Ok(bs_schema()),
        StatementType::Cf => Ok(cf_schema()),
        StatementType::Balance => Ok(balance_schema()),
        StatementType::Credit | StatementType::CreditRecovery => {
            Err(ReportError::UnsupportedStatement {
                statement: statement.to_string(),
                operation: "built-in table schema".to_string(),
            })
        }
    }
}
