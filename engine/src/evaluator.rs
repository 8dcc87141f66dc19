use crate::{
    ast::{ComparisonExpr, Expr, FilterAst, FilterParser, ParseError, ParserSettings},
    op::LogicalOp,
    scheme::{Scheme, UnknownFieldError},
};
use std::fmt::{self, Debug, Formatter};
use thiserror::Error;

/// An error that occurs while evaluating a compiled filter against an object.
#[derive(Debug, PartialEq, Eq, Clone, Error)]
pub enum EvaluationError {
    /// A comparison references a field the scheme does not have.
    #[error("{0}")]
    UnknownField(#[from] UnknownFieldError),

    /// A literal cannot be converted into the type of its field.
    #[error("cannot compare field '{field}' with {literal:?}: {reason}")]
    InvalidLiteral {
        /// Name of the field.
        field: String,
        /// The literal as written in the expression.
        literal: String,
        /// Why the conversion failed.
        reason: String,
    },
}

#[derive(Debug)]
struct Compiled {
    expression: String,
    ast: FilterAst,
}

/// Compiles filter expressions and applies them to objects of type `O`.
///
/// ```
/// use fieldexpr::{Evaluator, Field, Scheme};
///
/// struct Request {
///     method: String,
///     status: u16,
/// }
///
/// let scheme = Scheme::from_fields([
///     ("method", Field::new(|req: &Request| req.method.clone())),
///     ("status", Field::new(|req: &Request| req.status)),
/// ])
/// .unwrap();
///
/// let mut evaluator = Evaluator::new(scheme);
/// assert!(evaluator.set_expression("method GET and status >= 400"));
///
/// let request = Request {
///     method: "GET".to_owned(),
///     status: 404,
/// };
/// assert_eq!(evaluator.evaluate(&request), Ok(true));
/// ```
pub struct Evaluator<O> {
    scheme: Scheme<O>,
    parser: FilterParser,
    active: Option<Compiled>,
}

impl<O> Debug for Evaluator<O> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("scheme", &self.scheme)
            .field("parser", &self.parser)
            .field("active", &self.active)
            .finish()
    }
}

impl<O> Default for Evaluator<O> {
    fn default() -> Self {
        Evaluator::new(Scheme::default())
    }
}

impl<O> Evaluator<O> {
    /// Creates an evaluator over `scheme` with default parser settings.
    pub fn new(scheme: Scheme<O>) -> Self {
        Self::with_settings(scheme, ParserSettings::default())
    }

    /// Creates an evaluator over `scheme` with the given parser settings.
    pub fn with_settings(scheme: Scheme<O>, settings: ParserSettings) -> Self {
        Evaluator {
            scheme,
            parser: FilterParser::with_settings(settings),
            active: None,
        }
    }

    /// Replaces the field registry.
    ///
    /// The active expression is kept, names are resolved on every
    /// evaluation.
    pub fn register_fields(&mut self, scheme: Scheme<O>) {
        self.scheme = scheme;
    }

    /// The field registry.
    pub fn scheme(&self) -> &Scheme<O> {
        &self.scheme
    }

    /// Parser settings used by [`Evaluator::compile`].
    pub fn settings(&self) -> &ParserSettings {
        self.parser.settings()
    }

    /// Compiles `expression` and makes it the active filter.
    ///
    /// On failure the previously active filter stays in effect.
    pub fn compile<'i>(&mut self, expression: &'i str) -> Result<(), ParseError<'i>> {
        let ast = self.parser.parse(expression).map_err(|err| {
            log::debug!("rejected filter {:?}:\n{}", expression, err);
            err
        })?;

        log::debug!("compiled filter {:?} into `{}`", expression, ast);
        self.active = Some(Compiled {
            expression: expression.to_owned(),
            ast,
        });
        Ok(())
    }

    /// Compiles `expression`, returning whether it succeeded.
    ///
    /// See [`Evaluator::compile`] for the detailed error.
    pub fn set_expression(&mut self, expression: &str) -> bool {
        self.compile(expression).is_ok()
    }

    /// Checks whether a successfully compiled, non-empty filter is active.
    pub fn is_activated(&self) -> bool {
        self.ast().map_or(false, |ast| !ast.is_empty())
    }

    /// Source text of the active filter.
    pub fn expression(&self) -> Option<&str> {
        self.active
            .as_ref()
            .map(|compiled| compiled.expression.as_str())
    }

    /// The active filter tree.
    pub fn ast(&self) -> Option<&FilterAst> {
        self.active.as_ref().map(|compiled| &compiled.ast)
    }

    /// Applies the active filter to `object`.
    ///
    /// Without an active filter, or with an empty one, nothing matches.
    pub fn evaluate(&self, object: &O) -> Result<bool, EvaluationError> {
        let root = match self.ast().and_then(FilterAst::root) {
            Some(root) => root,
            None => return Ok(false),
        };

        self.evaluate_expr(root, object).map_err(|err| {
            log::trace!("filter evaluation failed: {}", err);
            err
        })
    }

    fn evaluate_expr(&self, expr: &Expr, object: &O) -> Result<bool, EvaluationError> {
        // both operands of every node are evaluated, left first
        expr.try_fold(
            |node| self.evaluate_comparison(node, object),
            |op, lhs, rhs| match op {
                LogicalOp::And => lhs & rhs,
                LogicalOp::Or => lhs | rhs,
            },
        )
    }

    fn evaluate_comparison(
        &self,
        node: &ComparisonExpr,
        object: &O,
    ) -> Result<bool, EvaluationError> {
        let field = self.scheme.get_field(&node.field)?;
        field
            .compare(object, node.op, &node.literal)
            .map_err(|reason| EvaluationError::InvalidLiteral {
                field: node.field.clone(),
                literal: node.literal.clone(),
                reason,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lex::LexErrorKind, scheme::Field};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Item {
        name: &'static str,
        count: i64,
    }

    fn scheme() -> Scheme<Item> {
        Scheme::from_fields([
            ("name", Field::new(|item: &Item| item.name.to_owned())),
            ("count", Field::new(|item: &Item| item.count)),
        ])
        .unwrap()
    }

    const ITEM: Item = Item {
        name: "widget",
        count: 3,
    };

    #[test]
    fn test_inactive() {
        let mut evaluator = Evaluator::new(scheme());

        assert!(!evaluator.is_activated());
        assert_eq!(evaluator.expression(), None);
        assert_eq!(evaluator.evaluate(&ITEM), Ok(false));

        assert!(evaluator.set_expression("  "));
        assert!(!evaluator.is_activated());
        assert_eq!(evaluator.expression(), Some("  "));
        assert!(evaluator.ast().unwrap().is_empty());
        assert_eq!(evaluator.evaluate(&ITEM), Ok(false));
    }

    #[test]
    fn test_failed_compile_keeps_previous_filter() {
        let mut evaluator = Evaluator::new(scheme());

        assert!(!evaluator.set_expression("(name widget"));
        assert!(!evaluator.is_activated());

        assert!(evaluator.set_expression("name widget"));
        assert_eq!(evaluator.evaluate(&ITEM), Ok(true));

        let err = evaluator.compile("name widget count").unwrap_err();
        assert_eq!(err.kind(), &LexErrorKind::ExpectedName("logical operator"));
        assert!(evaluator.is_activated());
        assert_eq!(evaluator.expression(), Some("name widget"));
        assert_eq!(evaluator.evaluate(&ITEM), Ok(true));

        assert!(evaluator.set_expression(""));
        assert!(!evaluator.is_activated());
    }

    #[test]
    fn test_errors() {
        let mut evaluator = Evaluator::new(scheme());

        assert!(evaluator.set_expression("name widget or colour red"));
        let err = evaluator.evaluate(&ITEM).unwrap_err();
        assert_eq!(
            err,
            EvaluationError::UnknownField(UnknownFieldError {
                name: "colour".to_owned()
            })
        );
        assert_eq!(err.to_string(), "field 'colour' not found");

        assert!(evaluator.set_expression("count > many"));
        let err = evaluator.evaluate(&ITEM).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"cannot compare field 'count' with "many": invalid digit found in string"#
        );
    }

    #[test]
    fn test_both_sides_are_evaluated() {
        static READS: AtomicUsize = AtomicUsize::new(0);

        struct Unit;
        let scheme = Scheme::from_fields([(
            "x",
            Field::new(|_: &Unit| {
                READS.fetch_add(1, Ordering::SeqCst);
                1u8
            }),
        )])
        .unwrap();

        let mut evaluator = Evaluator::new(scheme);
        assert!(evaluator.set_expression("x 1 or x 2 or x 3"));
        assert_eq!(evaluator.evaluate(&Unit), Ok(true));
        assert_eq!(READS.load(Ordering::SeqCst), 3);

        assert!(evaluator.set_expression("x 2 and x 1 and x 1"));
        assert_eq!(evaluator.evaluate(&Unit), Ok(false));
        assert_eq!(READS.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_register_fields() {
        let mut evaluator = Evaluator::default();
        assert!(evaluator.set_expression("count 3"));
        assert!(evaluator.evaluate(&ITEM).is_err());

        evaluator.register_fields(scheme());
        assert_eq!(evaluator.scheme().len(), 2);
        assert_eq!(evaluator.evaluate(&ITEM), Ok(true));
    }

    #[test]
    fn test_settings() {
        let mut evaluator = Evaluator::with_settings(
            scheme(),
            ParserSettings {
                quote: '\'',
                ..ParserSettings::default()
            },
        );
        assert_eq!(evaluator.settings().quote, '\'');

        assert!(evaluator.set_expression("name 'widget' and count '3'"));
        assert_eq!(evaluator.evaluate(&ITEM), Ok(true));
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}

        assert_send_sync::<Evaluator<Item>>();
        assert_send_sync::<EvaluationError>();
    }
}
