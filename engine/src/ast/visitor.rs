use super::{ComparisonExpr, Expr};

/// Trait used to immutably visit all nodes in the AST.
///
/// Traversal is driven by [`Expr::walk`]; the hooks only observe nodes.
pub trait Visitor<'a>: Sized {
    /// Visit [`Expr`] node, before any of its operands.
    #[inline]
    fn visit_expr(&mut self, _: &'a Expr) {}

    /// Visit [`ComparisonExpr`] node.
    #[inline]
    fn visit_comparison_expr(&mut self, _: &'a ComparisonExpr) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::{LogicalOp, OrderingOp};

    #[derive(Default)]
    struct Counter {
        logical: usize,
        fields: Vec<String>,
    }

    impl<'a> Visitor<'a> for Counter {
        fn visit_expr(&mut self, node: &'a Expr) {
            if let Expr::Logical { .. } = node {
                self.logical += 1;
            }
        }

        fn visit_comparison_expr(&mut self, node: &'a ComparisonExpr) {
            self.fields.push(node.field.clone());
        }
    }

    fn leaf(field: &str) -> Box<Expr> {
        Box::new(Expr::Comparison(ComparisonExpr {
            field: field.to_owned(),
            op: OrderingOp::Equal,
            literal: "1".to_owned(),
        }))
    }

    #[test]
    fn test_walk_visits_every_node() {
        let expr = Expr::Logical {
            op: LogicalOp::Or,
            lhs: leaf("a"),
            rhs: Box::new(Expr::Logical {
                op: LogicalOp::And,
                lhs: leaf("b"),
                rhs: leaf("c"),
            }),
        };

        let mut counter = Counter::default();
        expr.walk(&mut counter);

        assert_eq!(counter.logical, 2);
        assert_eq!(counter.fields, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_walk_deep_chain() {
        let mut expr = *leaf("x0");
        for i in 1..50_000 {
            expr = Expr::Logical {
                op: LogicalOp::And,
                lhs: Box::new(expr),
                rhs: leaf(&format!("x{i}")),
            };
        }

        let mut counter = Counter::default();
        expr.walk(&mut counter);

        assert_eq!(counter.logical, 49_999);
        assert_eq!(counter.fields.len(), 50_000);
        assert_eq!(counter.fields[0], "x0");
        assert_eq!(counter.fields[49_999], "x49999");
    }
}
