//! # Function Factory
//!
//! Resolves an operator name and resolved operand nodes into an operator
//! instance. Resolution is by name first, then by operand types; any
//! mismatch is a [`PlanError`] naming the operand types, raised before
//! execution.
//!
//! | Name                         | Operands              | Node                 |
//! |------------------------------|-----------------------|----------------------|
//! | `and`, `or`                  | BOOLEAN, BOOLEAN      | `AndOperator`/`OrOperator` |
//! | `not`                        | BOOLEAN               | `NotOperator`        |
//! | `=` `!=` `<>` `<` `<=` `>` `>=` | comparable pair    | `CompareOperator`    |
//! | `=`                          | SYMBOL column, constant string | `SymEqualsOperator` |
//! | `+`                          | numeric/time pair     | `AddOperator`        |
//! | `+`, `concat`                | STRING/SYMBOL pair    | `StrConcatOperator`  |
//! | `-` (unary)                  | INT, LONG, DOUBLE     | `NegativeOperator`   |

use hashbrown::HashMap;

use super::{
    AddOperator, AndOperator, CompareOp, CompareOperator, NegativeOperator, NotOperator,
    OrOperator, RecordColumn, StrConcatOperator, SymEqualsOperator, VirtualColumn, NO_RECORD,
};
use crate::error::PlanError;
use crate::types::{ColumnType, RecordMetadata};

type Args = Vec<Box<dyn VirtualColumn>>;
type Builder = fn(&str, Args, &RecordMetadata) -> Result<Box<dyn VirtualColumn>, PlanError>;

pub struct FunctionFactory {
    builders: HashMap<&'static str, Builder>,
}

impl Default for FunctionFactory {
    fn default() -> Self {
        let mut builders: HashMap<&'static str, Builder> = HashMap::new();
        builders.insert("and", build_logical);
        builders.insert("or", build_logical);
        builders.insert("not", build_not);
        for symbol in ["=", "!=", "<>", "<", "<=", ">", ">="] {
            builders.insert(symbol, build_compare);
        }
        builders.insert("+", build_plus);
        builders.insert("concat", build_plus);
        builders.insert("-", build_negative);
        Self { builders }
    }
}

impl FunctionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds operator `name` over `args`. `metadata` is the schema the
    /// operand columns were resolved against.
    pub fn create(
        &self,
        name: &str,
        args: Args,
        metadata: &RecordMetadata,
    ) -> Result<Box<dyn VirtualColumn>, PlanError> {
        let key = name.to_ascii_lowercase();
        match self.builders.get(key.as_str()) {
            Some(build) => build(&key, args, metadata),
            None => Err(unknown(name, &args)),
        }
    }

    /// Column reference by name.
    pub fn column(
        &self,
        metadata: &RecordMetadata,
        name: &str,
    ) -> Result<Box<dyn VirtualColumn>, PlanError> {
        Ok(Box::new(RecordColumn::new(metadata, name)?))
    }
}

fn unknown(name: &str, args: &Args) -> PlanError {
    PlanError::UnknownFunction {
        name: name.to_string(),
        args: args
            .iter()
            .map(|a| a.column_type().name())
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn take2(name: &str, args: Args) -> Result<(Box<dyn VirtualColumn>, Box<dyn VirtualColumn>), PlanError> {
    if args.len() != 2 {
        return Err(unknown(name, &args));
    }
    let mut it = args.into_iter();
    match (it.next(), it.next()) {
        (Some(lhs), Some(rhs)) => Ok((lhs, rhs)),
        _ => Err(PlanError::UnknownFunction {
            name: name.to_string(),
            args: String::new(),
        }),
    }
}

fn take1(name: &str, args: Args) -> Result<Box<dyn VirtualColumn>, PlanError> {
    if args.len() != 1 {
        return Err(unknown(name, &args));
    }
    args.into_iter().next().ok_or_else(|| PlanError::UnknownFunction {
        name: name.to_string(),
        args: String::new(),
    })
}

fn build_logical(name: &str, args: Args, _: &RecordMetadata) -> Result<Box<dyn VirtualColumn>, PlanError> {
    if args.iter().any(|a| a.column_type() != ColumnType::Boolean) {
        return Err(unknown(name, &args));
    }
    let (lhs, rhs) = take2(name, args)?;
    Ok(match name {
        "and" => Box::new(AndOperator::new(lhs, rhs)),
        _ => Box::new(OrOperator::new(lhs, rhs)),
    })
}

fn build_not(name: &str, args: Args, _: &RecordMetadata) -> Result<Box<dyn VirtualColumn>, PlanError> {
    if args.iter().any(|a| a.column_type() != ColumnType::Boolean) {
        return Err(unknown(name, &args));
    }
    Ok(Box::new(NotOperator::new(take1(name, args)?)))
}

fn comparable(lhs: ColumnType, rhs: ColumnType) -> bool {
    let time = |t: ColumnType| matches!(t, ColumnType::Date | ColumnType::Timestamp);
    (lhs.is_numeric() || time(lhs)) && (rhs.is_numeric() || time(rhs))
        || lhs.is_text() && rhs.is_text()
        || lhs == rhs && lhs != ColumnType::Parameter
}

fn build_compare(
    name: &str,
    args: Args,
    metadata: &RecordMetadata,
) -> Result<Box<dyn VirtualColumn>, PlanError> {
    let op = CompareOp::from_symbol(name).ok_or_else(|| unknown(name, &args))?;
    if args.len() == 2 && !comparable(args[0].column_type(), args[1].column_type()) {
        return Err(unknown(name, &args));
    }
    let (lhs, rhs) = take2(name, args)?;

    if op == CompareOp::Eq
        && lhs.column_type() == ColumnType::Symbol
        && rhs.is_constant()
        && rhs.column_type().is_text()
    {
        if let Some(index) = lhs.column_index() {
            let column = RecordColumn::at(metadata, index)?;
            let value = rhs.get_sym(&NO_RECORD).map(str::to_string);
            return Ok(Box::new(SymEqualsOperator::new(column, value)?));
        }
    }
    Ok(Box::new(CompareOperator::new(op, lhs, rhs)))
}

fn build_plus(name: &str, args: Args, _: &RecordMetadata) -> Result<Box<dyn VirtualColumn>, PlanError> {
    if args.len() == 2 && args.iter().all(|a| a.column_type().is_text()) {
        let (lhs, rhs) = take2(name, args)?;
        return Ok(Box::new(StrConcatOperator::new(lhs, rhs)?));
    }
    if name == "concat" {
        return Err(unknown(name, &args));
    }
    let (lhs, rhs) = take2(name, args)?;
    Ok(Box::new(AddOperator::new(lhs, rhs)?))
}

fn build_negative(name: &str, args: Args, _: &RecordMetadata) -> Result<Box<dyn VirtualColumn>, PlanError> {
    Ok(Box::new(NegativeOperator::new(take1(name, args)?)?))
}
