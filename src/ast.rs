//! This module defines the symbolic data the interpreter works on. The main enum,
//! [`Node`], is a tagged union over the two shapes a Lisp value can take: an
//! [`Atom`] (an indivisible literal) or an [`SExpression`] (a head/tail pair cell).
//! Chains of pairs terminated by the `NIL` atom form proper lists; the empty list
//! is `NIL` itself, never a pair.
//!
//! Every node renders to a canonical string form, and equality and hashing are
//! both derived from that rendering, so `(A B)` built by the reader and `(A B)`
//! built with [`Node::list`] are interchangeable as lookup keys.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::Error;

/// Type alias for integer values in the interpreter
pub(crate) type NumberType = i64;

/// Literal of the canonical true atom
pub const T_LITERAL: &str = "T";

/// Literal of the canonical false atom and empty list
pub const NIL_LITERAL: &str = "NIL";

/// Check if a string is a legal symbol literal
/// Valid: non-empty, leading alphabetic character, remaining characters alphanumeric
pub(crate) fn is_valid_symbol(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() => chars.all(char::is_alphanumeric),
        _ => false,
    }
}

/// Check if a string is a legal signed/unsigned integer literal
pub(crate) fn is_valid_integer(text: &str) -> bool {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// An indivisible literal: a symbol, an integer, or one of the reserved `T`/`NIL` atoms.
///
/// The stored literal keeps the text it was built from (including a redundant
/// leading `+` on numbers); [`Display`](fmt::Display) yields the canonical form.
#[derive(Clone)]
pub struct Atom {
    lit: String,
}

impl Atom {
    /// Build an atom from literal text.
    ///
    /// Fails with [`Error::InvalidAtom`] unless the text is a legal symbol or a
    /// legal integer literal that fits the interpreter's integer type.
    pub fn new(lit: impl Into<String>) -> Result<Self, Error> {
        let lit = lit.into();
        if is_valid_symbol(&lit) {
            return Ok(Atom { lit });
        }
        if is_valid_integer(&lit) {
            if lit.parse::<NumberType>().is_err() {
                return Err(Error::InvalidAtom(format!(
                    "integer literal out of range: {lit}"
                )));
            }
            return Ok(Atom { lit });
        }
        Err(Error::InvalidAtom(format!("Invalid atom specified: {lit}")))
    }

    /// The `T` atom
    pub fn t() -> Self {
        Atom::from(true)
    }

    /// The `NIL` atom
    pub fn nil() -> Self {
        Atom::from(false)
    }

    /// The literal exactly as stored
    pub fn literal(&self) -> &str {
        &self.lit
    }

    pub fn is_nil(&self) -> bool {
        self.lit == NIL_LITERAL
    }

    pub fn is_t(&self) -> bool {
        self.lit == T_LITERAL
    }

    pub fn is_integer(&self) -> bool {
        is_valid_integer(&self.lit)
    }

    /// True for symbols, including the reserved `T` and `NIL`
    pub fn is_symbol(&self) -> bool {
        !self.is_integer()
    }

    /// The numeric value of an integer atom
    pub fn as_integer(&self) -> Option<NumberType> {
        if self.is_integer() {
            self.lit.parse().ok()
        } else {
            None
        }
    }

    /// Atoms are self-evaluating. Variable lookup happens in the
    /// [`Environment`](crate::evaluator::Environment), never here.
    pub fn eval(&self) -> Node {
        Node::Atom(self.clone())
    }
}

impl From<bool> for Atom {
    fn from(b: bool) -> Self {
        let lit = if b { T_LITERAL } else { NIL_LITERAL };
        Atom { lit: lit.to_owned() }
    }
}

impl From<NumberType> for Atom {
    fn from(n: NumberType) -> Self {
        Atom { lit: n.to_string() }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integer() {
            write!(f, "{}", self.lit.strip_prefix('+').unwrap_or(&self.lit))
        } else {
            write!(f, "{}", self.lit)
        }
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Atom({})", self.lit)
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for Atom {}

impl Hash for Atom {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

/// A list cell: the first element (`head`) and the remainder of the list (`tail`).
///
/// The tail is always another pair or the `NIL` atom.
#[derive(Clone)]
pub struct SExpression {
    head: Box<Node>,
    tail: Box<Node>,
}

impl SExpression {
    /// Build a pair cell, failing with [`Error::MalformedList`] if `tail` is
    /// neither a list nor `NIL`.
    pub fn new(head: Node, tail: Node) -> Result<Self, Error> {
        if !(tail.is_list() || tail.is_nil()) {
            return Err(Error::MalformedList(format!(
                "list tail must be a list or NIL, found {tail}"
            )));
        }
        Ok(Self::cons(head, tail))
    }

    /// Caller guarantees `tail` is a list or `NIL`
    fn cons(head: Node, tail: Node) -> Self {
        SExpression {
            head: Box::new(head),
            tail: Box::new(tail),
        }
    }

    pub fn head(&self) -> &Node {
        &self.head
    }

    pub fn tail(&self) -> &Node {
        &self.tail
    }
}

impl TryFrom<Node> for SExpression {
    type Error = Error;

    fn try_from(node: Node) -> Result<Self, Error> {
        match node {
            Node::Pair(pair) => Ok(pair),
            Node::Atom(atom) => Err(Error::MalformedList(format!(
                "expected a list, found {atom}"
            ))),
        }
    }
}

impl fmt::Display for SExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.head)?;
        let mut rest = self.tail.as_ref();
        while let Node::Pair(pair) = rest {
            write!(f, " {}", pair.head)?;
            rest = pair.tail.as_ref();
        }
        write!(f, ")")
    }
}

impl fmt::Debug for SExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pair({:?}, {:?})", self.head, self.tail)
    }
}

impl PartialEq for SExpression {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for SExpression {}

/// Core value type of the interpreter
///
/// To build nodes in code, use [`Node::atom`], [`Node::list`], [`Node::cons`],
/// and the `From<bool>`/`From<i64>` conversions.
#[derive(Clone)]
pub enum Node {
    /// Leaf literal
    Atom(Atom),
    /// List cell
    Pair(SExpression),
}

impl Node {
    /// Parse-and-validate an atom literal
    pub fn atom(lit: impl Into<String>) -> Result<Self, Error> {
        Atom::new(lit).map(Node::Atom)
    }

    pub fn nil() -> Self {
        Node::Atom(Atom::nil())
    }

    pub fn t() -> Self {
        Node::Atom(Atom::t())
    }

    /// Build a pair, validating the tail (see [`SExpression::new`])
    pub fn cons(head: Node, tail: Node) -> Result<Self, Error> {
        SExpression::new(head, tail).map(Node::Pair)
    }

    /// Build a proper list from its elements; an empty vector yields `NIL`
    pub fn list(items: Vec<Node>) -> Self {
        items
            .into_iter()
            .rev()
            .fold(Node::nil(), |tail, head| Node::Pair(SExpression::cons(head, tail)))
    }

    /// The sole type discriminator used by the evaluator
    pub fn is_list(&self) -> bool {
        matches!(self, Node::Pair(_))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Node::Atom(atom) if atom.is_nil())
    }

    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Node::Atom(atom) => Some(atom),
            Node::Pair(_) => None,
        }
    }

    pub fn as_pair(&self) -> Option<&SExpression> {
        match self {
            Node::Pair(pair) => Some(pair),
            Node::Atom(_) => None,
        }
    }

    /// The symbol name if this node is a symbol atom
    pub fn as_symbol(&self) -> Option<&str> {
        self.as_atom()
            .filter(|atom| atom.is_symbol())
            .map(Atom::literal)
    }

    pub fn as_integer(&self) -> Option<NumberType> {
        self.as_atom().and_then(Atom::as_integer)
    }

    /// Iterate over the elements of a list. An atom yields nothing.
    pub fn iter(&self) -> ListIter<'_> {
        ListIter { current: self }
    }

    /// Number of elements in a list; zero for atoms
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        !self.is_list()
    }
}

/// Iterator over the heads of a chain of pairs
pub struct ListIter<'a> {
    current: &'a Node,
}

impl<'a> Iterator for ListIter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        match self.current {
            Node::Pair(pair) => {
                self.current = pair.tail();
                Some(pair.head())
            }
            Node::Atom(_) => None,
        }
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::Atom(Atom::from(b))
    }
}

impl From<NumberType> for Node {
    fn from(n: NumberType) -> Self {
        Node::Atom(Atom::from(n))
    }
}

impl From<Atom> for Node {
    fn from(atom: Atom) -> Self {
        Node::Atom(atom)
    }
}

impl From<SExpression> for Node {
    fn from(pair: SExpression) -> Self {
        Node::Pair(pair)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Atom(atom) => write!(f, "{atom}"),
            Node::Pair(pair) => write!(f, "{pair}"),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Atom(atom) => write!(f, "{atom:?}"),
            Node::Pair(pair) => write!(f, "{pair:?}"),
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

/// Symbol atom for tests; skips validation
#[cfg(test)]
pub(crate) fn sym(name: &str) -> Node {
    Node::Atom(Atom {
        lit: name.to_owned(),
    })
}

/// Integer atom for tests
#[cfg(test)]
pub(crate) fn int(n: NumberType) -> Node {
    Node::from(n)
}

#[cfg(test)]
pub(crate) fn nil() -> Node {
    Node::nil()
}
