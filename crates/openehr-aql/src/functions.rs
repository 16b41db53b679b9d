//! Scalar function registry.

use openehr_rm::{PrimitiveType, Type};

use crate::builder::SelectBuilder;
use crate::error::{BuildError, Result};
use crate::sql;
use crate::syntax::FunctionCall;

/// Supported functions with their minimum and maximum argument counts.
const FUNCTIONS: &[(&str, usize, Option<usize>)] = &[
    ("LENGTH", 1, Some(1)),
    ("LOWER", 1, Some(1)),
    ("UPPER", 1, Some(1)),
    ("CONCAT", 1, None),
    ("ABS", 1, Some(1)),
    ("ROUND", 1, Some(2)),
    ("NOW", 0, Some(0)),
    ("CURRENT_DATE", 0, Some(0)),
    ("CURRENT_DATE_TIME", 0, Some(0)),
];

fn lookup(name: &str) -> Option<(usize, Option<usize>)> {
    FUNCTIONS
        .iter()
        .find(|(candidate, _, _)| *candidate == name)
        .map(|(_, min, max)| (*min, *max))
}

impl SelectBuilder<'_> {
    pub(crate) fn lower_function(&self, call: &FunctionCall, depth: usize) -> Result<(String, Type)> {
        self.ctx.check_depth(depth)?;

        let name = call.name.to_ascii_uppercase();
        let (min, max) = lookup(&name)
            .ok_or_else(|| BuildError::not_implemented(format!("function {}", call.name)))?;
        let count = call.args.len();
        if count < min || max.is_some_and(|max| count > max) {
            return Err(BuildError::invalid_type(format!(
                "{name} does not accept {count} argument(s)"
            )));
        }

        let args = call
            .args
            .iter()
            .map(|arg| self.lower_select_expr(arg, depth + 1))
            .collect::<Result<Vec<_>>>()?;

        match (name.as_str(), args.as_slice()) {
            ("LENGTH", [arg]) => Ok((
                sql::to_jsonb(&format!("length({})", text_argument(arg)?)),
                Type::integer(),
            )),
            ("LOWER" | "UPPER", [arg]) => Ok((
                sql::to_jsonb(&format!("{}({})", name.to_lowercase(), text_argument(arg)?)),
                Type::string(),
            )),
            ("CONCAT", args) => {
                let parts = args
                    .iter()
                    .map(text_argument)
                    .collect::<Result<Vec<_>>>()?;
                Ok((
                    sql::to_jsonb(&format!("concat({})", parts.join(", "))),
                    Type::string(),
                ))
            }
            ("ABS", [arg]) => {
                let kind = numeric_kind(arg)?;
                Ok((
                    sql::to_jsonb(&format!("abs({})", sql::as_number(&arg.0, kind))),
                    arg.1.clone(),
                ))
            }
            ("ROUND", [arg]) => {
                numeric_kind(arg)?;
                Ok((
                    sql::to_jsonb(&format!("(round(({})::numeric))::bigint", arg.0)),
                    Type::integer(),
                ))
            }
            ("ROUND", [arg, digits]) => {
                numeric_kind(arg)?;
                if digits.1 != Type::integer() {
                    return Err(BuildError::type_mismatch(&digits.1, Type::integer()));
                }
                Ok((
                    sql::to_jsonb(&format!(
                        "round(({})::numeric, ({})::int)",
                        arg.0, digits.0
                    )),
                    Type::float(),
                ))
            }
            ("NOW" | "CURRENT_DATE_TIME", []) => Ok((sql::to_jsonb("now()"), Type::string())),
            ("CURRENT_DATE", []) => Ok((sql::to_jsonb("current_date"), Type::string())),
            _ => Err(BuildError::not_implemented(format!(
                "{name} with {count} argument(s)"
            ))),
        }
    }
}

fn text_argument(arg: &(String, Type)) -> Result<String> {
    if arg.1 != Type::string() {
        return Err(BuildError::type_mismatch(&arg.1, Type::string()));
    }
    Ok(sql::as_text(&arg.0))
}

fn numeric_kind(arg: &(String, Type)) -> Result<PrimitiveType> {
    arg.1
        .as_primitive()
        .filter(|kind| kind.is_numeric())
        .ok_or_else(|| BuildError::type_mismatch(&arg.1, "a numeric type"))
}
