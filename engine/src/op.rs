use std::{
    cmp::Ordering,
    fmt::{self, Display, Formatter},
};

const LESS: u8 = 0b001;
const GREATER: u8 = 0b010;
const EQUAL: u8 = 0b100;

lex_enum!(
    /// A relational operator of a comparison leaf.
    ///
    /// Each variant is a bitmask of the orderings it accepts.
    #[repr(u8)] OrderingOp {
        /// `eq` / `==` operator
        "eq" | "==" => Equal = EQUAL,
        /// `neq` / `!=` operator
        "neq" | "!=" => NotEqual = LESS | GREATER,
        /// `geq` / `>=` operator
        "geq" | ">=" => GreaterThanEqual = GREATER | EQUAL,
        /// `leq` / `<=` operator
        "leq" | "<=" => LessThanEqual = LESS | EQUAL,
        /// `gt` / `>` operator
        "gt" | ">" => GreaterThan = GREATER,
        /// `lt` / `<` operator
        "lt" | "<" => LessThan = LESS,
    }
);

impl OrderingOp {
    /// Checks whether `lhs <op> rhs` holds given `lhs.cmp(rhs)`.
    pub fn matches(self, ordering: Ordering) -> bool {
        let mask = self as u8;
        let flag = match ordering {
            Ordering::Less => LESS,
            Ordering::Greater => GREATER,
            Ordering::Equal => EQUAL,
        };
        mask & flag != 0
    }

    /// Same as [`OrderingOp::matches`] for partially ordered values.
    pub fn matches_opt(self, ordering: Option<Ordering>) -> bool {
        match ordering {
            Some(ordering) => self.matches(ordering),
            // only `!=` should be true for incomparable values
            None => self == OrderingOp::NotEqual,
        }
    }

    /// Symbol form of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            OrderingOp::Equal => "==",
            OrderingOp::NotEqual => "!=",
            OrderingOp::GreaterThanEqual => ">=",
            OrderingOp::LessThanEqual => "<=",
            OrderingOp::GreaterThan => ">",
            OrderingOp::LessThan => "<",
        }
    }
}

impl Display for OrderingOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

lex_enum!(
    /// A logical connective. Its ordering is defined by the operators'
    /// precedences in ascending order.
    #[derive(PartialOrd, Ord)] LogicalOp {
        /// `or` / `||` operator
        "or" | "||" => Or,
        /// `and` / `&&` operator
        "and" | "&&" => And,
    }
);

impl LogicalOp {
    /// Symbol form of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            LogicalOp::Or => "||",
            LogicalOp::And => "&&",
        }
    }
}

impl Display for LogicalOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
