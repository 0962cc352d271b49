use crate::error::{ReportError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementType {
    #[schemars(description = "Profit and loss (flow)")]
    Pl,

    #[schemars(description = "Balance sheet (point-in-time balances)")]
    Bs,

    #[schemars(description = "Cash flow (flow)")]
    Cf,

    #[schemars(description = "Dealer receivable / advance balances")]
    Credit,

    #[schemars(description = "Planned credit recoveries for the coming months")]
    CreditRecovery,

    #[schemars(description = "Cash and borrowing balances")]
    Balance,
}

impl StatementType {
    pub fn default_aggregation(self) -> Aggregation {
        match self {
            StatementType::Pl | StatementType::Cf | StatementType::CreditRecovery => {
                Aggregation::Flow
            }
            StatementType::Bs | StatementType::Balance | StatementType::Credit => {
                Aggregation::Snapshot
            }
        }
    }

    /// Whether the statement is rendered through the table builder at all.
    pub fn is_tabular(self) -> bool {
        matches!(
            self,
            StatementType::Pl | StatementType::Bs | StatementType::Cf | StatementType::Balance
        )
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatementType::Pl => "PL",
            StatementType::Bs => "BS",
            StatementType::Cf => "CF",
            StatementType::Credit => "CREDIT",
            StatementType::CreditRecovery => "CREDIT_RECOVERY",
            StatementType::Balance => "BALANCE",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum Aggregation {
    #[schemars(
        description = "Monthly figures are additive: YTD is the running sum through the base month, annual is the sum of all twelve months."
    )]
    Flow,

    #[schemars(
        description = "Monthly figures are balances: YTD is the value at the base month, annual is the December value."
    )]
    Snapshot,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RowFormat {
    #[default]
    Number,
    Percent,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Highlight {
    #[default]
    None,
    Sky,
    Yellow,
    Gray,
    DarkGray,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct FormulaTerm {
    #[schemars(description = "Account name of the operand row")]
    pub account: String,

    #[serde(default = "default_coefficient")]
    #[schemars(description = "Signed weight of the operand. Defaults to 1.0; use -1.0 to subtract.")]
    pub coefficient: f64,
}

fn default_coefficient() -> f64 {
    1.0
}

impl FormulaTerm {
    pub fn plus(account: &str) -> Self {
        Self {
            account: account.to_string(),
            coefficient: 1.0,
        }
    }

    pub fn minus(account: &str) -> Self {
        Self {
            account: account.to_string(),
            coefficient: -1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Formula {
    #[schemars(description = "Signed linear combination of other rows, e.g. revenue - cost - expenses")]
    Linear { terms: Vec<FormulaTerm> },

    #[schemars(description = "numerator / denominator * 100, null when the denominator is zero or either side is missing")]
    Ratio {
        numerator: String,
        denominator: String,
    },
}

impl Formula {
    pub fn operands(&self) -> Vec<&str> {
        match self {
            Formula::Linear { terms } => terms.iter().map(|t| t.account.as_str()).collect(),
            Formula::Ratio {
                numerator,
                denominator,
            } => vec![numerator.as_str(), denominator.as_str()],
        }
    }

    pub fn is_ratio(&self) -> bool {
        matches!(self, Formula::Ratio { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct SchemaNode {
    #[schemars(description = "Account name, unique within the statement")]
    pub account: String,

    #[serde(default)]
    pub children: Vec<SchemaNode>,

    #[serde(default)]
    #[schemars(description = "Present for derived rows. Group rows without a formula are the sum of their children.")]
    pub formula: Option<Formula>,

    #[serde(default)]
    pub format: RowFormat,

    #[serde(default)]
    pub highlight: Highlight,

    #[serde(default)]
    pub bold: bool,

    #[serde(default)]
    #[schemars(description = "Overrides the statement-level aggregation for this row")]
    pub aggregation: Option<Aggregation>,
}

impl SchemaNode {
    pub fn account(name: &str) -> Self {
        Self {
            account: name.to_string(),
            children: Vec::new(),
            formula: None,
            format: RowFormat::Number,
            highlight: Highlight::None,
            bold: false,
            aggregation: None,
        }
    }

    pub fn group(name: &str, children: Vec<SchemaNode>) -> Self {
        Self {
            children,
            ..Self::account(name)
        }
    }

    pub fn linear(name: &str, terms: Vec<FormulaTerm>) -> Self {
        Self {
            formula: Some(Formula::Linear { terms }),
            ..Self::account(name)
        }
    }

    pub fn ratio(name: &str, numerator: &str, denominator: &str) -> Self {
        Self {
            formula: Some(Formula::Ratio {
                numerator: numerator.to_string(),
                denominator: denominator.to_string(),
            }),
            format: RowFormat::Percent,
            ..Self::account(name)
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn highlighted(mut self, highlight: Highlight) -> Self {
        self.highlight = highlight;
        self
    }

    pub fn percent(mut self) -> Self {
        self.format = RowFormat::Percent;
        self
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = Some(aggregation);
        self
    }

    pub fn is_ratio(&self) -> bool {
        self.formula.as_ref().is_some_and(Formula::is_ratio)
    }

    /// Rows whose values must be resolved before this one.
    pub fn dependencies(&self) -> Vec<&str> {
        match &self.formula {
            Some(formula) => formula.operands(),
            None => self.children.iter().map(|c| c.account.as_str()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct StatementSchema {
    pub statement: StatementType,

    #[serde(default)]
    #[schemars(description = "Overrides the default aggregation of the statement type")]
    pub aggregation: Option<Aggregation>,

    #[schemars(description = "Top-level rows in display order")]
    pub rows: Vec<SchemaNode>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

impl StatementSchema {
    pub fn new(statement: StatementType, rows: Vec<SchemaNode>) -> Self {
        Self {
            statement,
            aggregation: None,
            rows,
        }
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = Some(aggregation);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let schema: Self = serde_json::from_str(json)?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(StatementSchema)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }

    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
            .unwrap_or_else(|| self.statement.default_aggregation())
    }

    /// Effective aggregation of a single row.
    ///
    /// Percent rows that are read straight from the ledger cannot be summed,
    /// so they fall back to snapshot semantics unless explicitly overridden.
    pub fn aggregation_for(&self, node: &SchemaNode) -> Aggregation {
        if let Some(aggregation) = node.aggregation {
            return aggregation;
        }
        if node.format == RowFormat::Percent && !node.is_ratio() {
            return Aggregation::Snapshot;
        }
        self.aggregation()
    }

    /// All nodes in display (pre-order) order.
    pub fn nodes(&self) -> Vec<&SchemaNode> {
        fn walk<'a>(nodes: &'a [SchemaNode], out: &mut Vec<&'a SchemaNode>) {
            for node in nodes {
                out.push(node);
                walk(&node.children, out);
            }
        }

        let mut out = Vec::new();
        walk(&self.rows, &mut out);
        out
    }

    pub fn find(&self, account: &str) -> Option<&SchemaNode> {
        self.nodes().into_iter().find(|n| n.account == account)
    }

    pub fn validate(&self) -> Result<()> {
        self.evaluation_order().map(|_| ())
    }

    pub(crate) fn ensure_tabular(&self, operation: &str) -> Result<()> {
        if self.statement.is_tabular() {
            Ok(())
        } else {
            Err(ReportError::UnsupportedStatement {
                statement: self.statement.to_string(),
                operation: operation.to_string(),
            })
        }
    }

    fn index(&self) -> Result<HashMap<&str, &SchemaNode>> {
        let mut index = HashMap::new();
        for node in self.nodes() {
            if index.insert(node.account.as_str(), node).is_some() {
                return Err(ReportError::DuplicateAccount(node.account.clone()));
            }
        }
        Ok(index)
    }

    /// Nodes ordered so that every row comes after the rows it depends on.
    ///
    /// Ties keep display order, so the result is deterministic for a given schema.
    pub fn evaluation_order(&self) -> Result<Vec<&SchemaNode>> {
        let index = self.index()?;
        let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(index.len());
        let mut path: Vec<&str> = Vec::new();
        let mut order = Vec::with_capacity(index.len());

        for node in self.nodes() {
            visit(node, &index, &mut marks, &mut path, &mut order)?;
        }

        Ok(order)
    }
}

fn visit<'a>(
    node: &'a SchemaNode,
    index: &HashMap<&'a str, &'a SchemaNode>,
    marks: &mut HashMap<&'a str, Mark>,
    path: &mut Vec<&'a str>,
    order: &mut Vec<&'a SchemaNode>,
) -> Result<()> {
    match marks.get(node.account.as_str()) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Visiting) => {
            let start = path
                .iter()
                .position(|a| *a == node.account)
                .unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].iter().map(|a| a.to_string()).collect();
            cycle.push(node.account.clone());
            return Err(ReportError::CyclicFormula(cycle));
        }
        None => {}
    }

    marks.insert(node.account.as_str(), Mark::Visiting);
    path.push(node.account.as_str());

    for dependency in node.dependencies() {
        let dependency_node =
            index
                .get(dependency)
                .copied()
                .ok_or_else(|| ReportError::UnknownOperand {
                    formula: node.account.clone(),
                    operand: dependency.to_string(),
                })?;
        visit(dependency_node, index, marks, path, order)?;
    }

    path.pop();
    marks.insert(node.account.as_str(), Mark::Done);
    order.push(node);
    Ok(())
}
