//! Translation from roster query expressions to MongoDB filter documents.

use bson::{Document, Bson, doc};

use roster_core::{
    query::{QueryVisitor, Expr, FieldOp, Projection, Sort, SortDirection},
    document::ID_FIELD,
    error::StoreError,
};


/// Builds MongoDB filter documents from [`Expr`] trees.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// Translates an optional filter; no filter matches everything.
    pub(crate) fn filter(expr: Option<&Expr>) -> Result<Document, StoreError> {
        match expr {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }

    pub(crate) fn sort(sort: &Sort) -> Document {
        doc! {
            sort.field.clone(): match sort.direction {
                SortDirection::Asc => 1,
                SortDirection::Desc => -1,
            }
        }
    }

    /// Inclusion projections always keep the document's own ID field.
    pub(crate) fn projection(projection: &Projection) -> Document {
        match projection {
            Projection::Include(fields) => fields
                .iter()
                .map(|f| (f.clone(), Bson::Int32(1)))
                .chain([(ID_FIELD.to_string(), Bson::Int32(1))])
                .collect(),
            Projection::Exclude(fields) => fields
                .iter()
                .filter(|f| f.as_str() != ID_FIELD)
                .map(|f| (f.clone(), Bson::Int32(0)))
                .collect(),
        }
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = StoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    // $not only applies to operator expressions, $nor negates a whole filter.
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Ne => doc! { "$ne": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Gte => doc! { "$gte": value },
                FieldOp::Lt => doc! { "$lt": value },
                FieldOp::Lte => doc! { "$lte": value },
                FieldOp::HasElement => doc! { "$elemMatch": { "$eq": value } },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::query::Filter;

    #[test]
    fn has_element_uses_elem_match() {
        let filter = MongoQueryTranslator::filter(Some(&Filter::has_element("favoriteFoods", "burrito"))).unwrap();

        assert_eq!(filter, doc! { "favoriteFoods": { "$elemMatch": { "$eq": "burrito" } } });
    }

    #[test]
    fn missing_filter_matches_everything() {
        assert_eq!(MongoQueryTranslator::filter(None).unwrap(), doc! {});
    }

    #[test]
    fn negation_wraps_in_nor() {
        let filter = MongoQueryTranslator::filter(Some(&Filter::eq("name", "Mary").not())).unwrap();

        assert_eq!(filter, doc! { "$nor": [{ "name": { "$eq": "Mary" } }] });
    }

    #[test]
    fn exclusion_never_hides_the_id() {
        let projection = MongoQueryTranslator::projection(&Projection::exclude(["age", "id"]));

        assert_eq!(projection, doc! { "age": 0 });
    }

    #[test]
    fn inclusion_adds_the_id() {
        let projection = MongoQueryTranslator::projection(&Projection::include(["name"]));

        assert_eq!(projection, doc! { "name": 1, "id": 1 });
    }

    #[test]
    fn sort_direction_maps_to_sign() {
        let sort = Sort { field: "name".into(), direction: SortDirection::Desc };

        assert_eq!(MongoQueryTranslator::sort(&sort), doc! { "name": -1 });
    }
}
