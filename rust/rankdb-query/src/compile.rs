//! Turns a [`ScorerExpr`] into an iterator tree over a field source.

use rankdb_common::Result;
use rankdb_scoring::{
    BoxedDocItr, CustomLinearDocItr, CustomMapDocItr, DiffDocItr, NaryDocItr, NaryOp, PowDocItr,
    ScaleDocItr, geo_distance,
};

use crate::expr::ScorerExpr;

/// Provides one fresh leaf iterator per field reference.
///
/// Unknown fields are not an error: they produce an iterator with no
/// documents, so a combinator over them simply yields nothing.
pub trait FieldSource {
    fn field_doc_itr(&self, field: &str) -> Result<BoxedDocItr>;
}

/// Builds the iterator tree for `expr`.
///
/// If building any part fails, the already-built subtrees are closed before the
/// error is returned.
pub fn compile<S: FieldSource + ?Sized>(expr: &ScorerExpr, source: &S) -> Result<BoxedDocItr> {
    let itr: BoxedDocItr = match expr {
        ScorerExpr::Field(name) => source.field_doc_itr(name)?,
        ScorerExpr::Scale { factor, expr } => {
            Box::new(ScaleDocItr::new(*factor, compile(expr, source)?))
        }
        ScorerExpr::Sum(exprs) => compile_nary(NaryOp::Sum, exprs, source)?,
        ScorerExpr::Product(exprs) => compile_nary(NaryOp::Product, exprs, source)?,
        ScorerExpr::Min(exprs) => compile_nary(NaryOp::Min, exprs, source)?,
        ScorerExpr::Pow { expr, exp } => Box::new(PowDocItr::new(compile(expr, source)?, *exp)),
        ScorerExpr::Diff { target, expr } => {
            Box::new(DiffDocItr::new(*target, compile(expr, source)?))
        }
        ScorerExpr::CustomLinear { points, expr } => Box::new(CustomLinearDocItr::new(
            points.clone(),
            compile(expr, source)?,
        )),
        ScorerExpr::CustomMap {
            points,
            default,
            expr,
        } => Box::new(CustomMapDocItr::new(
            points.clone(),
            *default,
            compile(expr, source)?,
        )),
        ScorerExpr::GeoDistance {
            lat,
            lon,
            lat_field,
            lon_field,
        } => {
            let mut lat_itr = source.field_doc_itr(lat_field)?;
            let lon_itr = match source.field_doc_itr(lon_field) {
                Ok(itr) => itr,
                Err(e) => {
                    lat_itr.close();
                    return Err(e);
                }
            };
            geo_distance(*lat, *lon, lat_itr, lon_itr)
        }
    };
    Ok(itr)
}

fn compile_nary<S: FieldSource + ?Sized>(
    op: NaryOp,
    exprs: &[ScorerExpr],
    source: &S,
) -> Result<BoxedDocItr> {
    let mut children: Vec<BoxedDocItr> = Vec::with_capacity(exprs.len());
    for expr in exprs {
        match compile(expr, source) {
            Ok(itr) => children.push(itr),
            Err(e) => {
                children.iter_mut().for_each(|child| child.close());
                return Err(e);
            }
        }
    }
    if children.len() == 1 {
        if let Some(only) = children.pop() {
            return Ok(only);
        }
    }
    Ok(Box::new(NaryDocItr::new(op, children)))
}
