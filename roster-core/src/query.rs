//! Query construction: filters, sorting, paging and projection.
//!
//! Backends receive a [`Query`] and translate it with a [`QueryVisitor`]. The
//! stages apply in a fixed order regardless of how the builder was called:
//! filter, sort, offset, limit, projection.
//!
//! ```ignore
//! use roster_core::query::{Filter, Projection, Query, SortDirection};
//!
//! let query = Query::builder()
//!     .filter(Filter::has_element("favoriteFoods", "burrito"))
//!     .sort("name", SortDirection::Asc)
//!     .limit(2)
//!     .projection(Projection::exclude(["age"]))
//!     .build();
//! ```

use bson::Bson;

use crate::{document::ID_FIELD, error::StoreError};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9).
    Asc,
    /// Descending order (Z to A, 9 to 0).
    Desc,
}

/// Field and direction to order results by.
#[derive(Debug, Clone)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

/// Comparison applied between a document field and a literal value.
///
/// Numbers of different widths compare by value. A missing field only
/// satisfies [`FieldOp::Ne`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Array field has at least one element equal to the value.
    HasElement,
}

/// A filter expression tree.
#[derive(Debug, Clone)]
pub enum Expr {
    /// All sub-expressions must match.
    And(Vec<Expr>),
    /// Any sub-expression must match.
    Or(Vec<Expr>),
    /// Inverts the inner expression.
    Not(Box<Expr>),
    /// Field is present (`true`) or absent (`false`).
    Exists(String, bool),
    /// Field comparison.
    Field {
        field: String,
        op: FieldOp,
        value: Bson,
    },
}

impl Expr {
    /// Logical AND, appending to `self` when it already is an AND list.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut all) => {
                all.push(other);
                Expr::And(all)
            }
            first => Expr::And(vec![first, other]),
        }
    }

    /// Logical OR, appending to `self` when it already is an OR list.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut any) => {
                any.push(other);
                Expr::Or(any)
            }
            first => Expr::Or(vec![first, other]),
        }
    }

    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }
}

/// Which fields of each matched document are returned.
///
/// Inclusion and exclusion cannot be mixed, matching what document engines
/// accept. The document identifier is always kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Return only these fields.
    Include(Vec<String>),
    /// Return everything except these fields.
    Exclude(Vec<String>),
}

impl Projection {
    pub fn include<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Projection::Include(fields.into_iter().map(Into::into).collect())
    }

    pub fn exclude<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Projection::Exclude(fields.into_iter().map(Into::into).collect())
    }

    /// Applies this projection to a stored document in place.
    pub fn apply(&self, document: &mut bson::Document) {
        match self {
            Projection::Include(fields) => {
                let keep = |key: &str| key == ID_FIELD || fields.iter().any(|f| f == key);
                let dropped = document
                    .keys()
                    .filter(|key| !keep(key))
                    .cloned()
                    .collect::<Vec<_>>();

                for key in dropped {
                    document.remove(&key);
                }
            }
            Projection::Exclude(fields) => {
                for field in fields.iter().filter(|f| f.as_str() != ID_FIELD) {
                    document.remove(field);
                }
            }
        }
    }
}

/// A structured query: filter, sort, offset, limit and projection.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filter: Option<Expr>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub sort: Option<Sort>,
    pub projection: Option<Projection>,
}

impl Query {
    /// Creates an empty query that matches every document.
    pub fn new() -> Self {
        Query::default()
    }

    /// Creates a query matching documents for which `filter` holds.
    pub fn filtered(filter: Expr) -> Self {
        Query { filter: Some(filter), ..Query::default() }
    }

    /// Creates a new query builder.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }
}

/// Shorthand constructors for filter expressions.
///
/// ```ignore
/// let adults_named_ann = Filter::eq("name", "Ann").and(Filter::gte("age", 18));
/// ```
pub struct Filter;

fn compare(field: impl Into<String>, op: FieldOp, value: impl Into<Bson>) -> Expr {
    Expr::Field { field: field.into(), op, value: value.into() }
}

impl Filter {
    /// On an array field this matches the whole array or any single element.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        compare(field, FieldOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        compare(field, FieldOp::Ne, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        compare(field, FieldOp::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        compare(field, FieldOp::Gte, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        compare(field, FieldOp::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        compare(field, FieldOp::Lte, value)
    }

    /// Matches documents whose array `field` holds an element equal to `value`.
    /// Partial strings never match: `"burr"` does not find `"burrito"`.
    pub fn has_element(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        compare(field, FieldOp::HasElement, value)
    }

    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), true)
    }

    pub fn not_exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), false)
    }

    pub fn any(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    pub fn filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(filter);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.query.offset = Some(offset);
        self
    }

    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort = Some(Sort { field: field.into(), direction });
        self
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.query.projection = Some(projection);
        self
    }

    pub fn build(self) -> Query {
        self.query
    }
}

/// Walks an [`Expr`] tree, producing one output per node.
///
/// The in-memory backend evaluates expressions to `bool`; the MongoDB backend
/// translates them into filter documents.
pub trait QueryVisitor {
    type Output;
    type Error: Into<StoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn and_flattens_into_existing_list() {
        let expr = Filter::eq("name", "Alice")
            .and(Filter::gt("age", 18))
            .and(Filter::exists("favoriteFoods"));

        match expr {
            Expr::And(list) => assert_eq!(list.len(), 3),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn builder_sets_every_stage() {
        let query = Query::builder()
            .filter(Filter::has_element("favoriteFoods", "burrito"))
            .sort("name", SortDirection::Asc)
            .offset(1)
            .limit(2)
            .projection(Projection::exclude(["age"]))
            .build();

        assert!(matches!(
            query.filter,
            Some(Expr::Field { op: FieldOp::HasElement, .. })
        ));
        assert_eq!(query.sort.unwrap().direction, SortDirection::Asc);
        assert_eq!(query.offset, Some(1));
        assert_eq!(query.limit, Some(2));
        assert_eq!(query.projection, Some(Projection::Exclude(vec!["age".into()])));
    }

    #[test]
    fn exclusion_drops_listed_fields_but_keeps_id() {
        let mut document = doc! { "id": 1, "name": "Bob", "age": 40 };
        Projection::exclude(["age", "id"]).apply(&mut document);

        assert_eq!(document, doc! { "id": 1, "name": "Bob" });
    }

    #[test]
    fn inclusion_keeps_listed_fields_and_id() {
        let mut document = doc! { "id": 1, "name": "Bob", "age": 40, "favoriteFoods": ["taco"] };
        Projection::include(["name"]).apply(&mut document);

        assert_eq!(document, doc! { "id": 1, "name": "Bob" });
    }
}
