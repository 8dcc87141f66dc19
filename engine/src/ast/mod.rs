mod parse;
mod visitor;

pub use self::{
    parse::{FilterParser, ParseError, ParserSettings},
    visitor::Visitor,
};

use crate::{
    op::{LogicalOp, OrderingOp},
    token::TokenKind,
    tokenizer::DOUBLE_QUOTE,
};
use fnv::FnvBuildHasher;
use indexmap::IndexSet;
use serde::Serialize;
use std::{
    convert::Infallible,
    fmt::{self, Debug, Display, Formatter},
    hash::{Hash, Hasher},
    mem,
};

/// A leaf comparing a field against a literal.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize)]
pub struct ComparisonExpr {
    /// Name of the field, resolved at evaluation time.
    pub field: String,
    /// Relational operator.
    pub op: OrderingOp,
    /// The literal as lexed, converted to the field's type at evaluation time.
    pub literal: String,
}

/// A node of the expression tree.
///
/// Chains of `and`/`or` grow the tree by one level per operator, so every
/// traversal here (evaluation, printing, comparison, hashing, cloning and
/// dropping) runs on an explicit heap stack and never recurses per level.
/// The exception is `Serialize`, which nests one JSON object per level.
#[derive(Serialize)]
#[serde(untagged)]
pub enum Expr {
    /// Logical combination of two sub-expressions
    Logical {
        /// Logical operator
        op: LogicalOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
    /// A comparison leaf
    Comparison(ComparisonExpr),
}

enum Frame<'a, T> {
    Rhs(LogicalOp, &'a Expr),
    Lhs(LogicalOp, T),
}

impl Expr {
    /// Visits every node in pre-order, left operand first.
    pub fn walk<'a, V: Visitor<'a>>(&'a self, visitor: &mut V) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            visitor.visit_expr(node);
            match node {
                Expr::Logical { lhs, rhs, .. } => {
                    stack.push(rhs);
                    stack.push(lhs);
                }
                Expr::Comparison(node) => visitor.visit_comparison_expr(node),
            }
        }
    }

    /// Folds the tree bottom-up, visiting leaves left to right.
    ///
    /// Stops at the first leaf that fails; every leaf before it has been
    /// visited exactly once.
    pub(crate) fn try_fold<T, E>(
        &self,
        mut leaf: impl FnMut(&ComparisonExpr) -> Result<T, E>,
        mut combine: impl FnMut(LogicalOp, T, T) -> T,
    ) -> Result<T, E> {
        let mut frames = Vec::new();
        let mut expr = self;
        loop {
            let mut value = loop {
                match expr {
                    Expr::Logical { op, lhs, rhs } => {
                        frames.push(Frame::Rhs(*op, &**rhs));
                        expr = &**lhs;
                    }
                    Expr::Comparison(node) => break leaf(node)?,
                }
            };
            loop {
                match frames.pop() {
                    None => return Ok(value),
                    Some(Frame::Rhs(op, rhs)) => {
                        frames.push(Frame::Lhs(op, value));
                        expr = rhs;
                        break;
                    }
                    Some(Frame::Lhs(op, lhs)) => value = combine(op, lhs, value),
                }
            }
        }
    }

    fn placeholder() -> Self {
        Expr::Comparison(ComparisonExpr {
            field: String::new(),
            op: OrderingOp::Equal,
            literal: String::new(),
        })
    }

    fn detach_logical_children(&mut self, stack: &mut Vec<Expr>) {
        if let Expr::Logical { lhs, rhs, .. } = self {
            for child in [lhs, rhs] {
                if let Expr::Logical { .. } = **child {
                    stack.push(mem::replace(&mut **child, Expr::placeholder()));
                }
            }
        }
    }
}

impl Drop for Expr {
    fn drop(&mut self) {
        let mut stack = Vec::new();
        self.detach_logical_children(&mut stack);
        while let Some(mut expr) = stack.pop() {
            expr.detach_logical_children(&mut stack);
        }
    }
}

impl Clone for Expr {
    fn clone(&self) -> Self {
        let cloned = self.try_fold(
            |node| Ok::<_, Infallible>(Expr::Comparison(node.clone())),
            |op, lhs, rhs| Expr::Logical {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        );
        match cloned {
            Ok(expr) => expr,
            Err(never) => match never {},
        }
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        let mut pairs = vec![(self, other)];
        while let Some(pair) = pairs.pop() {
            match pair {
                (
                    Expr::Logical { op, lhs, rhs },
                    Expr::Logical {
                        op: other_op,
                        lhs: other_lhs,
                        rhs: other_rhs,
                    },
                ) if op == other_op => {
                    pairs.push((&**rhs, &**other_rhs));
                    pairs.push((&**lhs, &**other_lhs));
                }
                (Expr::Comparison(node), Expr::Comparison(other)) if node == other => {}
                _ => return false,
            }
        }
        true
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            mem::discriminant(node).hash(state);
            match node {
                Expr::Logical { op, lhs, rhs } => {
                    op.hash(state);
                    stack.push(rhs);
                    stack.push(lhs);
                }
                Expr::Comparison(node) => node.hash(state),
            }
        }
    }
}

/// Formats as the filter text, see [`Display`].
impl Debug for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Expr")
            .field(&format_args!("{}", self))
            .finish()
    }
}

/// A parsed filter expression.
///
/// An empty tree is the result of parsing an empty expression.
#[derive(Debug, Default, PartialEq, Eq, Clone, Hash, Serialize)]
#[serde(transparent)]
pub struct FilterAst {
    root: Option<Expr>,
}

impl FilterAst {
    /// Wraps a tree root.
    pub fn new(root: Expr) -> Self {
        FilterAst { root: Some(root) }
    }

    /// The root node, `None` for an empty tree.
    pub fn root(&self) -> Option<&Expr> {
        self.root.as_ref()
    }

    /// Checks whether the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Checks whether any comparison references a field.
    pub fn uses(&self, field: &str) -> bool {
        struct UsesVisitor<'f> {
            field: &'f str,
            found: bool,
        }

        impl<'a> Visitor<'a> for UsesVisitor<'_> {
            fn visit_comparison_expr(&mut self, node: &'a ComparisonExpr) {
                self.found |= node.field == self.field;
            }
        }

        let mut visitor = UsesVisitor {
            field,
            found: false,
        };
        self.walk(&mut visitor);
        visitor.found
    }

    /// Distinct field names referenced by the tree, in order of appearance.
    pub fn fields(&self) -> Vec<&str> {
        #[derive(Default)]
        struct FieldCollector<'a> {
            fields: IndexSet<&'a str, FnvBuildHasher>,
        }

        impl<'a> Visitor<'a> for FieldCollector<'a> {
            fn visit_comparison_expr(&mut self, node: &'a ComparisonExpr) {
                self.fields.insert(&node.field);
            }
        }

        let mut visitor = FieldCollector::default();
        self.walk(&mut visitor);
        visitor.fields.into_iter().collect()
    }

    /// Visits every node, see [`Expr::walk`].
    pub fn walk<'a, V: Visitor<'a>>(&'a self, visitor: &mut V) {
        if let Some(root) = &self.root {
            root.walk(visitor);
        }
    }
}

fn needs_quotes(text: &str) -> bool {
    text.is_empty()
        || text
            .chars()
            .any(|c| c.is_whitespace() || c == '(' || c == ')' || c == DOUBLE_QUOTE)
        || TokenKind::classify(text) != TokenKind::Field
}

struct Literal<'a>(&'a str);

impl Display for Literal<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if !needs_quotes(self.0) {
            return f.write_str(self.0);
        }
        write!(f, "{DOUBLE_QUOTE}")?;
        for c in self.0.chars() {
            if c == DOUBLE_QUOTE || c == '\\' {
                write!(f, "\\")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, "{DOUBLE_QUOTE}")
    }
}

impl Display for ComparisonExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            Literal(&self.field),
            self.op,
            Literal(&self.literal)
        )
    }
}

enum Step<'a> {
    Expr(&'a Expr),
    Op(LogicalOp),
    Open,
    Close,
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // popped in reverse push order
        let mut steps = vec![Step::Expr(self)];
        while let Some(step) = steps.pop() {
            match step {
                Step::Open => f.write_str("(")?,
                Step::Close => f.write_str(")")?,
                Step::Op(op) => write!(f, " {op} ")?,
                Step::Expr(Expr::Comparison(node)) => Display::fmt(node, f)?,
                Step::Expr(Expr::Logical { op, lhs, rhs }) => {
                    // a left operand with the same operator keeps its shape
                    // through left associativity, and nothing else does
                    let group_rhs = matches!(**rhs, Expr::Logical { .. });
                    let group_lhs = matches!(&**lhs, Expr::Logical { op: lhs_op, .. } if lhs_op != op);

                    if group_rhs {
                        steps.push(Step::Close);
                    }
                    steps.push(Step::Expr(rhs));
                    if group_rhs {
                        steps.push(Step::Open);
                    }
                    steps.push(Step::Op(*op));
                    if group_lhs {
                        steps.push(Step::Close);
                    }
                    steps.push(Step::Expr(lhs));
                    if group_lhs {
                        steps.push(Step::Open);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Renders the tree as filter text that parses back into the same tree
/// with the default quote character.
impl Display for FilterAst {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.root {
            Some(root) => Display::fmt(root, f),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(field: &str, op: OrderingOp, literal: &str) -> Expr {
        Expr::Comparison(ComparisonExpr {
            field: field.to_owned(),
            op,
            literal: literal.to_owned(),
        })
    }

    fn logical(op: LogicalOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Logical {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    #[test]
    fn test_empty() {
        let ast = FilterAst::default();

        assert!(ast.is_empty());
        assert!(ast.root().is_none());
        assert!(!ast.uses("a"));
        assert!(ast.fields().is_empty());
        assert_eq!(ast.to_string(), "");
        assert_json!(ast, null);
    }

    #[test]
    fn test_fields() {
        let ast = FilterAst::new(logical(
            LogicalOp::Or,
            logical(
                LogicalOp::And,
                cmp("b", OrderingOp::Equal, "1"),
                cmp("a", OrderingOp::LessThan, "2"),
            ),
            cmp("b", OrderingOp::NotEqual, "3"),
        ));

        assert_eq!(ast.fields(), vec!["b", "a"]);
        assert!(ast.uses("a"));
        assert!(ast.uses("b"));
        assert!(!ast.uses("c"));
    }

    #[test]
    fn test_serialize() {
        let ast = FilterAst::new(logical(
            LogicalOp::And,
            cmp("a", OrderingOp::Equal, "one"),
            cmp("b", OrderingOp::GreaterThanEqual, "1"),
        ));

        assert_json!(
            ast,
            {
                "op": "And",
                "lhs": {
                    "field": "a",
                    "op": "Equal",
                    "literal": "one"
                },
                "rhs": {
                    "field": "b",
                    "op": "GreaterThanEqual",
                    "literal": "1"
                }
            }
        );
    }

    fn chain(op: LogicalOp, len: usize) -> Expr {
        (1..len).fold(cmp("f0", OrderingOp::Equal, "0"), |lhs, i| {
            logical(op, lhs, cmp(&format!("f{}", i % 3), OrderingOp::Equal, &i.to_string()))
        })
    }

    fn hash_of(expr: &Expr) -> u64 {
        use std::collections::hash_map::DefaultHasher;

        let mut hasher = DefaultHasher::new();
        expr.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_deep_chain() {
        let expr = chain(LogicalOp::Or, 100_000);
        let copy = expr.clone();

        assert_eq!(expr, copy);
        assert_eq!(hash_of(&expr), hash_of(&copy));
        assert_ne!(expr, chain(LogicalOp::And, 100_000));
        assert_ne!(hash_of(&expr), hash_of(&chain(LogicalOp::Or, 99_999)));

        let text = expr.to_string();
        assert!(text.starts_with("f0 == 0 || f1 == 1 || f2 == 2 || f0 == 3"));
        assert!(text.ends_with("|| f0 == 99999"));
        assert!(!text.contains('('));

        let ast = FilterAst::new(expr);
        assert_eq!(ast.fields(), vec!["f0", "f1", "f2"]);
        assert!(ast.uses("f2"));

        drop(ast);
        drop(copy);
    }

    #[test]
    fn test_deep_right_nesting() {
        let expr = (0..50_000).fold(cmp("r", OrderingOp::LessThan, "0"), |rhs, i| {
            let op = if i % 2 == 0 { LogicalOp::And } else { LogicalOp::Or };
            logical(op, cmp("l", OrderingOp::Equal, &i.to_string()), rhs)
        });

        let text = expr.to_string();
        assert_eq!(text.matches('(').count(), 49_999);
        assert_eq!(text.matches(')').count(), 49_999);
        assert!(text.starts_with("l == 49999 || (l == 49998 && (l == 49997 || ("));
        assert_eq!(expr.clone(), expr);
    }

    #[test]
    fn test_display() {
        use LogicalOp::*;
        use OrderingOp::*;

        assert_eq!(cmp("a", Equal, "foo").to_string(), "a == foo");
        assert_eq!(cmp("a", Equal, "foo foo").to_string(), r#"a == "foo foo""#);
        assert_eq!(cmp("a", Equal, "").to_string(), r#"a == """#);
        assert_eq!(cmp("a", NotEqual, "and").to_string(), r#"a != "and""#);
        assert_eq!(cmp("a", LessThan, r#"x"y\z"#).to_string(), r#"a < "x\"y\\z""#);
        assert_eq!(cmp("a", LessThan, r"x\y").to_string(), r"a < x\y");

        let left_nested = logical(
            Or,
            logical(Or, cmp("a", Equal, "1"), cmp("b", Equal, "2")),
            cmp("c", Equal, "3"),
        );
        assert_eq!(left_nested.to_string(), "a == 1 || b == 2 || c == 3");

        let right_nested = logical(
            And,
            cmp("a", Equal, "1"),
            logical(Or, cmp("b", Equal, "2"), cmp("c", Equal, "3")),
        );
        assert_eq!(right_nested.to_string(), "a == 1 && (b == 2 || c == 3)");

        let mixed = logical(
            Or,
            logical(And, cmp("a", Equal, "1"), cmp("b", Equal, "1")),
            logical(And, cmp("a", Equal, "2"), cmp("b", Equal, "2")),
        );
        assert_eq!(
            mixed.to_string(),
            "(a == 1 && b == 1) || (a == 2 && b == 2)"
        );
    }
}
