//! Query expression evaluation against stored BSON documents.

use std::cmp::Ordering;
use bson::{Bson, Document};

use roster_core::{
    query::{QueryVisitor, Expr, FieldOp},
    error::{StoreError, StoreResult},
};


fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(*n as f64),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

/// Equality where an `Int32` equals the same `Int64` or `Double`, applied
/// recursively through arrays and embedded documents.
fn values_equal(left: &Bson, right: &Bson) -> bool {
    match (left, right) {
        (Bson::Array(l), Bson::Array(r)) => {
            l.len() == r.len() && l.iter().zip(r).all(|(a, b)| values_equal(a, b))
        }
        (Bson::Document(l), Bson::Document(r)) => {
            l.len() == r.len()
                && l.iter().all(|(key, a)| r.get(key).is_some_and(|b| values_equal(a, b)))
        }
        _ => match (as_number(left), as_number(right)) {
            (Some(l), Some(r)) => l == r,
            _ => left == right,
        },
    }
}

/// Equality as a filter sees it: an array field also equals any one of its
/// elements.
fn field_equals(stored: &Bson, value: &Bson) -> bool {
    values_equal(stored, value)
        || matches!(stored, Bson::Array(items) if items.iter().any(|item| values_equal(item, value)))
}

/// Ordering between two values of the same kind, `None` across kinds.
fn compare_values(left: &Bson, right: &Bson) -> Option<Ordering> {
    if let (Some(l), Some(r)) = (as_number(left), as_number(right)) {
        return l.partial_cmp(&r);
    }

    match (left, right) {
        (Bson::String(l), Bson::String(r)) => Some(l.cmp(r)),
        (Bson::Boolean(l), Bson::Boolean(r)) => Some(l.cmp(r)),
        (Bson::DateTime(l), Bson::DateTime(r)) => Some(l.cmp(r)),
        (Bson::Binary(l), Bson::Binary(r)) => Some(l.bytes.cmp(&r.bytes)),
        _ => None,
    }
}

// Missing and null first, then numbers, strings, documents, arrays, binary,
// booleans and dates.
fn type_rank(value: Option<&Bson>) -> u8 {
    match value {
        None | Some(Bson::Null) => 0,
        Some(v) if as_number(v).is_some() => 1,
        Some(Bson::String(_)) => 2,
        Some(Bson::Document(_)) => 3,
        Some(Bson::Array(_)) => 4,
        Some(Bson::Binary(_)) => 5,
        Some(Bson::Boolean(_)) => 6,
        Some(Bson::DateTime(_)) => 7,
        Some(_) => 8,
    }
}

/// Total order used for sorting on a field that may be missing.
///
/// Values of different types order by type; values of one type that have no
/// natural order tie, which a stable sort leaves in insertion order.
pub(crate) fn sort_order(left: Option<&Bson>, right: Option<&Bson>) -> Ordering {
    type_rank(left)
        .cmp(&type_rank(right))
        .then_with(|| match (left, right) {
            (Some(l), Some(r)) => compare_values(l, r).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        })
}


pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> StoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Returns true when `value` satisfies `expr`, or when there is no filter.
    pub fn matches(value: &'a Bson, expr: Option<&Expr>) -> StoreResult<bool> {
        let Some(expr) = expr else {
            return Ok(true);
        };
        let document = value
            .as_document()
            .ok_or_else(|| StoreError::InvalidDocument("stored value is not a document".into()))?;

        DocumentEvaluator::new(document).evaluate(expr)
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = StoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.evaluate(expr)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.evaluate(expr)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        self.evaluate(expr).map(|matched| !matched)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(self.document.contains_key(field) == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let Some(stored) = self.document.get(field) else {
            return Ok(*op == FieldOp::Ne);
        };

        let ordering = || compare_values(stored, value);

        Ok(match op {
            FieldOp::Eq => field_equals(stored, value),
            FieldOp::Ne => !field_equals(stored, value),
            FieldOp::Gt => ordering() == Some(Ordering::Greater),
            FieldOp::Gte => matches!(ordering(), Some(Ordering::Greater | Ordering::Equal)),
            FieldOp::Lt => ordering() == Some(Ordering::Less),
            FieldOp::Lte => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
            FieldOp::HasElement => match stored {
                Bson::Array(items) => items.iter().any(|item| values_equal(item, value)),
                _ => false,
            },
        })
    }
}
