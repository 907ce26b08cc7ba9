//! Scorer expressions: the query language of rankdb.
//!
//! An expression is a JSON array whose first element names a function and whose
//! remaining elements are its arguments:
//!
//! ```json
//! ["sum", ["field", "age"], ["scale", 2.0, ["field", "height"]]]
//! ```
//!
//! | Function | Arguments |
//! |---|---|
//! | `field` | `name` |
//! | `scale` | `factor, expr` |
//! | `sum`, `product`, `min` | `expr, expr, ...` |
//! | `pow` | `expr, exponent` |
//! | `diff` | `target, expr` |
//! | `custom_linear` | `[[x, y], ...], expr` |
//! | `custom_map` | `[[x, y], ...], default, expr` |
//! | `geo_distance` | `lat, lon, lat_field, lon_field` |
//!
//! Parsing validates names, arity and argument types, so a malformed query is
//! rejected before any storage is opened.

use std::{fmt, str::FromStr};

use rankdb_common::{Error, Result};
use rankdb_scoring::{CustomPoint, custom_linear::normalize_points};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A parsed and validated scorer expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum ScorerExpr {
    Field(String),
    Scale {
        factor: f32,
        expr: Box<ScorerExpr>,
    },
    Sum(Vec<ScorerExpr>),
    Product(Vec<ScorerExpr>),
    Min(Vec<ScorerExpr>),
    Pow {
        expr: Box<ScorerExpr>,
        exp: f32,
    },
    Diff {
        target: f32,
        expr: Box<ScorerExpr>,
    },
    CustomLinear {
        points: Vec<CustomPoint>,
        expr: Box<ScorerExpr>,
    },
    CustomMap {
        points: Vec<CustomPoint>,
        default: f32,
        expr: Box<ScorerExpr>,
    },
    GeoDistance {
        lat: f32,
        lon: f32,
        lat_field: String,
        lon_field: String,
    },
}

impl ScorerExpr {
    pub fn field(name: impl Into<String>) -> ScorerExpr {
        ScorerExpr::Field(name.into())
    }

    pub fn scale(factor: f32, expr: ScorerExpr) -> ScorerExpr {
        ScorerExpr::Scale {
            factor,
            expr: Box::new(expr),
        }
    }

    /// Parses an expression from its JSON form.
    pub fn parse(value: &Value) -> Result<ScorerExpr> {
        let Value::Array(items) = value else {
            return Err(Error::invalid_query(format!(
                "scorer must be an array such as [\"field\", \"age\"], got {value}"
            )));
        };
        let Some((head, args)) = items.split_first() else {
            return Err(Error::invalid_query("empty scorer expression"));
        };
        let Some(name) = head.as_str() else {
            return Err(Error::invalid_query(format!(
                "scoring function name must be a string, got {head}"
            )));
        };
        let expr = match name {
            "field" => {
                check_arity(name, args, 1)?;
                ScorerExpr::Field(string_arg(name, &args[0])?)
            }
            "scale" => {
                check_arity(name, args, 2)?;
                ScorerExpr::Scale {
                    factor: number_arg(name, &args[0])?,
                    expr: Box::new(ScorerExpr::parse(&args[1])?),
                }
            }
            "sum" | "product" | "min" => {
                if args.is_empty() {
                    return Err(Error::invalid_query(format!(
                        "{name} requires at least one argument"
                    )));
                }
                let exprs = args
                    .iter()
                    .map(ScorerExpr::parse)
                    .collect::<Result<Vec<_>>>()?;
                match name {
                    "sum" => ScorerExpr::Sum(exprs),
                    "product" => ScorerExpr::Product(exprs),
                    _ => ScorerExpr::Min(exprs),
                }
            }
            "pow" => {
                check_arity(name, args, 2)?;
                ScorerExpr::Pow {
                    expr: Box::new(ScorerExpr::parse(&args[0])?),
                    exp: number_arg(name, &args[1])?,
                }
            }
            "diff" => {
                check_arity(name, args, 2)?;
                ScorerExpr::Diff {
                    target: number_arg(name, &args[0])?,
                    expr: Box::new(ScorerExpr::parse(&args[1])?),
                }
            }
            "custom_linear" => {
                check_arity(name, args, 2)?;
                ScorerExpr::CustomLinear {
                    points: normalize_points(points_arg(name, &args[0])?, name)?,
                    expr: Box::new(ScorerExpr::parse(&args[1])?),
                }
            }
            "custom_map" => {
                check_arity(name, args, 3)?;
                let points = points_arg(name, &args[0])?;
                let points = if points.is_empty() {
                    points
                } else {
                    normalize_points(points, name)?
                };
                ScorerExpr::CustomMap {
                    points,
                    default: number_arg(name, &args[1])?,
                    expr: Box::new(ScorerExpr::parse(&args[2])?),
                }
            }
            "geo_distance" => {
                check_arity(name, args, 4)?;
                ScorerExpr::GeoDistance {
                    lat: number_arg(name, &args[0])?,
                    lon: number_arg(name, &args[1])?,
                    lat_field: string_arg(name, &args[2])?,
                    lon_field: string_arg(name, &args[3])?,
                }
            }
            other => {
                return Err(Error::invalid_query(format!(
                    "scoring function '{other}' is not recognized"
                )));
            }
        };
        Ok(expr)
    }

    /// The JSON form of the expression.
    pub fn to_json(&self) -> Value {
        let points_json = |points: &[CustomPoint]| {
            Value::Array(points.iter().map(|p| json!([p.x, p.y])).collect())
        };
        let list = |name: &str, exprs: &[ScorerExpr]| {
            let mut items = vec![json!(name)];
            items.extend(exprs.iter().map(ScorerExpr::to_json));
            Value::Array(items)
        };
        match self {
            ScorerExpr::Field(name) => json!(["field", name]),
            ScorerExpr::Scale { factor, expr } => json!(["scale", factor, expr.to_json()]),
            ScorerExpr::Sum(exprs) => list("sum", exprs),
            ScorerExpr::Product(exprs) => list("product", exprs),
            ScorerExpr::Min(exprs) => list("min", exprs),
            ScorerExpr::Pow { expr, exp } => json!(["pow", expr.to_json(), exp]),
            ScorerExpr::Diff { target, expr } => json!(["diff", target, expr.to_json()]),
            ScorerExpr::CustomLinear { points, expr } => {
                json!(["custom_linear", points_json(points), expr.to_json()])
            }
            ScorerExpr::CustomMap {
                points,
                default,
                expr,
            } => json!(["custom_map", points_json(points), default, expr.to_json()]),
            ScorerExpr::GeoDistance {
                lat,
                lon,
                lat_field,
                lon_field,
            } => json!(["geo_distance", lat, lon, lat_field, lon_field]),
        }
    }
}

fn check_arity(name: &str, args: &[Value], expected: usize) -> Result<()> {
    if args.len() != expected {
        return Err(Error::invalid_query(format!(
            "wrong number of arguments to {name}: expected {expected}, got {}",
            args.len()
        )));
    }
    Ok(())
}

fn number_arg(name: &str, value: &Value) -> Result<f32> {
    match value.as_f64() {
        Some(n) if (n as f32).is_finite() => Ok(n as f32),
        _ => Err(Error::invalid_query(format!(
            "invalid value ({value}) given to {name}, must be a finite number"
        ))),
    }
}

fn string_arg(name: &str, value: &Value) -> Result<String> {
    match value.as_str() {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(Error::invalid_query(format!(
            "invalid field name ({value}) given to {name}"
        ))),
    }
}

fn points_arg(name: &str, value: &Value) -> Result<Vec<CustomPoint>> {
    let invalid = || {
        Error::invalid_query(format!(
            "invalid points ({value}) given to {name}, must be a list of [x, y] pairs"
        ))
    };
    let items = value.as_array().ok_or_else(invalid)?;
    items
        .iter()
        .map(|item| match item.as_array().map(Vec::as_slice) {
            Some([x, y]) => Ok(CustomPoint::new(number_arg(name, x)?, number_arg(name, y)?)),
            _ => Err(invalid()),
        })
        .collect()
}

impl TryFrom<Value> for ScorerExpr {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        ScorerExpr::parse(&value)
    }
}

impl From<ScorerExpr> for Value {
    fn from(expr: ScorerExpr) -> Self {
        expr.to_json()
    }
}

impl FromStr for ScorerExpr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(s)
            .map_err(|e| Error::invalid_query(format!("scorer is not valid JSON: {e}")))?;
        ScorerExpr::parse(&value)
    }
}

impl fmt::Display for ScorerExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
