//! Runtime values for the Quill VM.
//!
//! `Value` is a closed sum type: arithmetic, comparison, indexing and
//! iteration all dispatch by exhaustive matching. Failing operations return a
//! span-less `RuntimeError`; the VM re-anchors it at the failing instruction.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::RuntimeError;
use crate::span::Span;

use super::builtins::Builtin;
use super::chunk::CompiledFunction;

pub type List = Rc<RefCell<Vec<Value>>>;
pub type Table = Rc<RefCell<IndexMap<String, Value>>>;

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Nil,
    /// Mutable list shared by reference within one VM run.
    List(List),
    /// Mutable string-keyed table, iterated in insertion order.
    Table(Table),
    /// A function body without captured variables.
    Function(Rc<CompiledFunction>),
    Closure(Rc<Closure>),
    Builtin(&'static Builtin),
    Iterator(Rc<RefCell<ValueIterator>>),
    Error(String),
}

/// A compiled function plus the values it captured when it was created.
#[derive(Debug)]
pub struct Closure {
    pub function: Rc<CompiledFunction>,
    pub free: Vec<Value>,
}

impl Closure {
    pub fn new(function: Rc<CompiledFunction>, free: Vec<Value>) -> Self {
        Self { function, free }
    }
}

/// What an iterator walks over.
#[derive(Debug)]
pub enum IterSource {
    String(String),
    List(List),
    Table(Table),
}

/// Cursor over a container. For strings the cursor is a byte offset.
#[derive(Debug)]
pub struct ValueIterator {
    source: IterSource,
    cursor: usize,
}

impl ValueIterator {
    pub fn new(source: IterSource) -> Self {
        Self { source, cursor: 0 }
    }

    /// Yield the next element, or `None` once the container is exhausted.
    pub fn next_value(&mut self) -> Option<Value> {
        match &self.source {
            IterSource::String(text) => {
                let c = text[self.cursor..].chars().next()?;
                self.cursor += c.len_utf8();
                Some(Value::String(c.to_string()))
            }
            IterSource::List(list) => {
                let value = list.borrow().get(self.cursor).cloned()?;
                self.cursor += 1;
                Some(value)
            }
            IterSource::Table(table) => {
                let key = table
                    .borrow()
                    .get_index(self.cursor)
                    .map(|(key, _)| key.clone())?;
                self.cursor += 1;
                Some(Value::String(key))
            }
        }
    }
}

fn unsupported(op: &str, a: &Value, b: &Value) -> RuntimeError {
    RuntimeError::type_error(
        format!(
            "unsupported operand types for {}: '{}' and '{}'",
            op,
            a.type_name(),
            b.type_name()
        ),
        Span::default(),
    )
}

fn overflow() -> RuntimeError {
    RuntimeError::IntegerOverflow(Span::default())
}

fn zero_division() -> RuntimeError {
    RuntimeError::division_by_zero(Span::default())
}

impl Value {
    pub fn string(s: impl Into<String>) -> Value {
        Value::String(s.into())
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn table(entries: IndexMap<String, Value>) -> Value {
        Value::Table(Rc::new(RefCell::new(entries)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Boolean(_) => "bool",
            Value::Nil => "nil",
            Value::List(_) => "list",
            Value::Table(_) => "table",
            Value::Function(_) | Value::Closure(_) => "function",
            Value::Builtin(_) => "builtin",
            Value::Iterator(_) => "iterator",
            Value::Error(_) => "error",
        }
    }

    /// `nil`, `false`, numeric zero and empty containers are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Boolean(b) => *b,
            Value::Integer(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(list) => !list.borrow().is_empty(),
            Value::Table(table) => !table.borrow().is_empty(),
            Value::Function(_)
            | Value::Closure(_)
            | Value::Builtin(_)
            | Value::Iterator(_)
            | Value::Error(_) => true,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    // --- Arithmetic ---

    pub fn add(&self, other: &Value) -> Result<Value, RuntimeError> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => {
                a.checked_add(*b).map(Value::Integer).ok_or_else(overflow)
            }
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
            (Value::String(a), b) if b.is_number() => Ok(Value::String(format!("{}{}", a, b))),
            (a, Value::String(b)) if a.is_number() => Ok(Value::String(format!("{}{}", a, b))),
            (Value::List(a), Value::List(b)) => {
                let mut items = a.borrow().clone();
                items.extend(b.borrow().iter().cloned());
                Ok(Value::list(items))
            }
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => Ok(Value::Float(x + y)),
                _ => Err(unsupported("+", a, b)),
            },
        }
    }

    pub fn sub(&self, other: &Value) -> Result<Value, RuntimeError> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => {
                a.checked_sub(*b).map(Value::Integer).ok_or_else(overflow)
            }
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => Ok(Value::Float(x - y)),
                _ => Err(unsupported("-", a, b)),
            },
        }
    }

    pub fn mul(&self, other: &Value) -> Result<Value, RuntimeError> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => {
                a.checked_mul(*b).map(Value::Integer).ok_or_else(overflow)
            }
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => Ok(Value::Float(x * y)),
                _ => Err(unsupported("*", a, b)),
            },
        }
    }

    /// Integer division truncates toward zero.
    pub fn div(&self, other: &Value) -> Result<Value, RuntimeError> {
        match (self, other) {
            (Value::Integer(_), Value::Integer(0)) => Err(zero_division()),
            (Value::Integer(a), Value::Integer(b)) => {
                a.checked_div(*b).map(Value::Integer).ok_or_else(overflow)
            }
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(_), Some(y)) if y == 0.0 => Err(zero_division()),
                (Some(x), Some(y)) => Ok(Value::Float(x / y)),
                _ => Err(unsupported("/", a, b)),
            },
        }
    }

    pub fn rem(&self, other: &Value) -> Result<Value, RuntimeError> {
        match (self, other) {
            (Value::Integer(_), Value::Integer(0)) => Err(zero_division()),
            (Value::Integer(a), Value::Integer(b)) => {
                a.checked_rem(*b).map(Value::Integer).ok_or_else(overflow)
            }
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(_), Some(y)) if y == 0.0 => Err(zero_division()),
                (Some(x), Some(y)) => Ok(Value::Float(x % y)),
                _ => Err(unsupported("%", a, b)),
            },
        }
    }

    /// A negative integer exponent yields a float. Raising zero to a negative
    /// power is a division by zero, as with `/`.
    pub fn pow(&self, other: &Value) -> Result<Value, RuntimeError> {
        match (self, other) {
            (Value::Integer(0), Value::Integer(exp)) if *exp < 0 => Err(zero_division()),
            (Value::Integer(base), Value::Integer(exp)) if *exp < 0 => {
                Ok(Value::Float((*base as f64).powf(*exp as f64)))
            }
            (Value::Integer(base @ (0 | 1)), Value::Integer(exp)) => {
                Ok(Value::Integer(if *exp == 0 { 1 } else { *base }))
            }
            (Value::Integer(-1), Value::Integer(exp)) => {
                Ok(Value::Integer(if exp % 2 == 0 { 1 } else { -1 }))
            }
            (Value::Integer(base), Value::Integer(exp)) => u32::try_from(*exp)
                .ok()
                .and_then(|exp| base.checked_pow(exp))
                .map(Value::Integer)
                .ok_or_else(overflow),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) if x == 0.0 && y < 0.0 => Err(zero_division()),
                (Some(x), Some(y)) => Ok(Value::Float(x.powf(y))),
                _ => Err(unsupported("^", a, b)),
            },
        }
    }

    pub fn negate(&self) -> Result<Value, RuntimeError> {
        match self {
            Value::Integer(n) => n.checked_neg().map(Value::Integer).ok_or_else(overflow),
            Value::Float(n) => Ok(Value::Float(-n)),
            other => Err(RuntimeError::type_error(
                format!("bad operand type for unary -: '{}'", other.type_name()),
                Span::default(),
            )),
        }
    }

    /// Ordering for numbers and strings. `Ok(None)` when a NaN is involved.
    pub fn compare(&self, other: &Value) -> Result<Option<Ordering>, RuntimeError> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(Some(a.cmp(b))),
            (Value::String(a), Value::String(b)) => Ok(Some(a.cmp(b))),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => Ok(x.partial_cmp(&y)),
                _ => Err(RuntimeError::type_error(
                    format!(
                        "cannot compare '{}' with '{}'",
                        a.type_name(),
                        b.type_name()
                    ),
                    Span::default(),
                )),
            },
        }
    }

    // --- Indexing & iteration ---

    pub fn get_index(&self, index: &Value) -> Result<Value, RuntimeError> {
        match (self, index) {
            (Value::List(list), Value::Integer(i)) => {
                let list = list.borrow();
                usize::try_from(*i)
                    .ok()
                    .and_then(|idx| list.get(idx).cloned())
                    .ok_or_else(|| RuntimeError::index_out_of_bounds(*i, list.len(), Span::default()))
            }
            (Value::String(s), Value::Integer(i)) => usize::try_from(*i)
                .ok()
                .and_then(|idx| s.chars().nth(idx))
                .map(|c| Value::String(c.to_string()))
                .ok_or_else(|| {
                    RuntimeError::index_out_of_bounds(*i, s.chars().count(), Span::default())
                }),
            (Value::Table(table), Value::String(key)) => {
                Ok(table.borrow().get(key).cloned().unwrap_or(Value::Nil))
            }
            (Value::Table(_), key) => Err(RuntimeError::InvalidTableKey(
                key.type_name(),
                Span::default(),
            )),
            (Value::List(_) | Value::String(_), other) => Err(RuntimeError::type_error(
                format!(
                    "{} indices must be integers, not '{}'",
                    self.type_name(),
                    other.type_name()
                ),
                Span::default(),
            )),
            (other, _) => Err(RuntimeError::type_error(
                format!("'{}' is not indexable", other.type_name()),
                Span::default(),
            )),
        }
    }

    pub fn set_index(&self, index: &Value, value: Value) -> Result<(), RuntimeError> {
        match (self, index) {
            (Value::List(list), Value::Integer(i)) => {
                let mut list = list.borrow_mut();
                let length = list.len();
                match usize::try_from(*i).ok().filter(|idx| *idx < length) {
                    Some(idx) => {
                        list[idx] = value;
                        Ok(())
                    }
                    None => Err(RuntimeError::index_out_of_bounds(*i, length, Span::default())),
                }
            }
            (Value::Table(table), Value::String(key)) => {
                table.borrow_mut().insert(key.clone(), value);
                Ok(())
            }
            (Value::Table(_), key) => Err(RuntimeError::InvalidTableKey(
                key.type_name(),
                Span::default(),
            )),
            (Value::List(_), other) => Err(RuntimeError::type_error(
                format!("list indices must be integers, not '{}'", other.type_name()),
                Span::default(),
            )),
            (Value::String(_), _) => Err(RuntimeError::type_error(
                "strings are immutable",
                Span::default(),
            )),
            (other, _) => Err(RuntimeError::type_error(
                format!("'{}' does not support item assignment", other.type_name()),
                Span::default(),
            )),
        }
    }

    /// An iterator over this value. Iterators return themselves.
    pub fn get_iterator(&self) -> Result<Value, RuntimeError> {
        let source = match self {
            Value::String(s) => IterSource::String(s.clone()),
            Value::List(list) => IterSource::List(Rc::clone(list)),
            Value::Table(table) => IterSource::Table(Rc::clone(table)),
            Value::Iterator(_) => return Ok(self.clone()),
            other => {
                return Err(RuntimeError::type_error(
                    format!("'{}' is not iterable", other.type_name()),
                    Span::default(),
                ))
            }
        };
        Ok(Value::Iterator(Rc::new(RefCell::new(ValueIterator::new(
            source,
        )))))
    }

    /// Write an element of a container. Strings are quoted, and a container
    /// already on `path` is written as `[...]` or `{...}`.
    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>, path: &mut Vec<*const ()>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::List(_) | Value::Table(_) => self.fmt_container(f, path),
            other => write!(f, "{}", other),
        }
    }

    fn fmt_container(&self, f: &mut fmt::Formatter<'_>, path: &mut Vec<*const ()>) -> fmt::Result {
        match self {
            Value::List(list) => {
                let id = Rc::as_ptr(list) as *const ();
                if path.contains(&id) {
                    return write!(f, "[...]");
                }
                path.push(id);
                write!(f, "[")?;
                for (i, item) in list.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt_nested(f, path)?;
                }
                path.pop();
                write!(f, "]")
            }
            Value::Table(table) => {
                let id = Rc::as_ptr(table) as *const ();
                if path.contains(&id) {
                    return write!(f, "{{...}}");
                }
                path.push(id);
                write!(f, "{{")?;
                for (i, (key, value)) in table.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{}\": ", key)?;
                    value.fmt_nested(f, path)?;
                }
                path.pop();
                write!(f, "}}")
            }
            other => write!(f, "{}", other),
        }
    }

    /// Structural equality. `pairs` holds the container pairs being compared
    /// further up; meeting one again counts as equal, so cycles terminate.
    fn equals(&self, other: &Value, pairs: &mut Vec<(*const (), *const ())>) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Integer(a), Value::Float(b)) => (*a as f64) == *b,
            (Value::Float(a), Value::Integer(b)) => *a == (*b as f64),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let pair = (Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ());
                if pairs.contains(&pair) {
                    return true;
                }
                pairs.push(pair);
                let (a, b) = (a.borrow(), b.borrow());
                let equal =
                    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y, pairs));
                pairs.pop();
                equal
            }
            (Value::Table(a), Value::Table(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let pair = (Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ());
                if pairs.contains(&pair) {
                    return true;
                }
                pairs.push(pair);
                let (a, b) = (a.borrow(), b.borrow());
                let equal = a.len() == b.len()
                    && a
                        .iter()
                        .all(|(k, v)| b.get(k).is_some_and(|w| v.equals(w, pairs)));
                pairs.pop();
                equal
            }
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a.name == b.name,
            (Value::Iterator(a), Value::Iterator(b)) => Rc::ptr_eq(a, b),
            (Value::Error(a), Value::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other, &mut Vec::new())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(n) if n.is_finite() && n.fract() == 0.0 => write!(f, "{:.1}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Nil => write!(f, "nil"),
            Value::List(_) | Value::Table(_) => self.fmt_container(f, &mut Vec::new()),
            Value::Function(function) => write!(f, "<function {}>", function.name),
            Value::Closure(closure) => write!(f, "<function {}>", closure.function.name),
            Value::Builtin(builtin) => write!(f, "<builtin {}>", builtin.name),
            Value::Iterator(_) => write!(f, "<iterator>"),
            Value::Error(message) => write!(f, "error: {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> Value {
        Value::Integer(n)
    }

    fn strings(items: &[&str]) -> Value {
        Value::list(items.iter().map(|s| Value::string(*s)).collect())
    }

    fn drain(iterator: &Value) -> Vec<Value> {
        let Value::Iterator(it) = iterator else {
            panic!("Expected iterator, got {}", iterator.type_name());
        };
        let mut out = Vec::new();
        while let Some(v) = it.borrow_mut().next_value() {
            out.push(v);
        }
        out
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(int(7).add(&int(5)).unwrap(), int(12));
        assert_eq!(int(7).sub(&int(5)).unwrap(), int(2));
        assert_eq!(int(7).mul(&int(5)).unwrap(), int(35));
        assert_eq!(int(7).div(&int(2)).unwrap(), int(3));
        assert_eq!(int(-7).div(&int(2)).unwrap(), int(-3));
        assert_eq!(int(-7).rem(&int(3)).unwrap(), int(-1));
        assert_eq!(int(2).pow(&int(10)).unwrap(), int(1024));
    }

    #[test]
    fn test_float_promotion() {
        assert!(matches!(int(1).add(&Value::Float(0.5)).unwrap(), Value::Float(f) if f == 1.5));
        assert!(matches!(Value::Float(3.0).mul(&int(2)).unwrap(), Value::Float(f) if f == 6.0));
        assert!(matches!(int(2).pow(&int(-1)).unwrap(), Value::Float(f) if f == 0.5));
    }

    #[test]
    fn test_division_by_zero_is_an_error() {
        assert!(matches!(int(1).div(&int(0)), Err(RuntimeError::DivisionByZero(_))));
        assert!(matches!(int(1).rem(&int(0)), Err(RuntimeError::DivisionByZero(_))));
        assert!(matches!(
            Value::Float(1.0).div(&Value::Float(0.0)),
            Err(RuntimeError::DivisionByZero(_))
        ));
    }

    #[test]
    fn test_overflow_is_an_error() {
        assert!(matches!(int(i64::MAX).add(&int(1)), Err(RuntimeError::IntegerOverflow(_))));
        assert!(matches!(int(i64::MIN).div(&int(-1)), Err(RuntimeError::IntegerOverflow(_))));
        assert!(matches!(int(i64::MIN).negate(), Err(RuntimeError::IntegerOverflow(_))));
        assert!(matches!(int(3).pow(&int(100)), Err(RuntimeError::IntegerOverflow(_))));
        assert!(matches!(int(2).pow(&int(5_000_000_000)), Err(RuntimeError::IntegerOverflow(_))));
    }

    #[test]
    fn test_pow_trivial_bases_with_huge_exponents() {
        let huge = int(5_000_000_000);
        assert_eq!(int(1).pow(&huge).unwrap(), int(1));
        assert_eq!(int(0).pow(&huge).unwrap(), int(0));
        assert_eq!(int(0).pow(&int(0)).unwrap(), int(1));
        assert_eq!(int(-1).pow(&huge).unwrap(), int(1));
        assert_eq!(int(-1).pow(&int(5_000_000_001)).unwrap(), int(-1));
        assert!(matches!(int(0).pow(&int(-1)), Err(RuntimeError::DivisionByZero(_))));
        assert!(matches!(
            Value::Float(0.0).pow(&Value::Float(-0.5)),
            Err(RuntimeError::DivisionByZero(_))
        ));
    }

    #[test]
    fn test_concatenation() {
        assert_eq!(Value::string("n=").add(&int(3)).unwrap(), Value::string("n=3"));
        assert_eq!(Value::Float(1.0).add(&Value::string("x")).unwrap(), Value::string("1.0x"));
        assert_eq!(
            strings(&["a"]).add(&strings(&["b"])).unwrap(),
            strings(&["a", "b"])
        );
    }

    #[test]
    fn test_unsupported_operands() {
        let err = Value::Boolean(true).add(&int(1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Type error: unsupported operand types for +: 'bool' and 'int' at line 0"
        );
        assert!(Value::string("a").sub(&Value::string("b")).is_err());
        assert!(Value::Nil.negate().is_err());
    }

    #[test]
    fn test_truthiness() {
        for falsy in [
            Value::Nil,
            Value::Boolean(false),
            int(0),
            Value::Float(0.0),
            Value::string(""),
            Value::list(vec![]),
            Value::table(IndexMap::new()),
        ] {
            assert!(!falsy.is_truthy(), "{} should be falsy", falsy);
        }
        assert!(int(-1).is_truthy());
        assert!(Value::string("0").is_truthy());
        assert!(strings(&[""]).is_truthy());
    }

    #[test]
    fn test_equality() {
        assert_eq!(int(1), Value::Float(1.0));
        assert_ne!(int(1), Value::string("1"));
        assert_ne!(Value::Nil, Value::Boolean(false));
        assert_eq!(strings(&["a", "b"]), strings(&["a", "b"]));
        let mut a = IndexMap::new();
        a.insert("x".to_string(), int(1));
        a.insert("y".to_string(), int(2));
        let mut b = IndexMap::new();
        b.insert("y".to_string(), int(2));
        b.insert("x".to_string(), int(1));
        assert_eq!(Value::table(a), Value::table(b));
    }

    #[test]
    fn test_compare() {
        assert_eq!(int(1).compare(&Value::Float(1.5)).unwrap(), Some(Ordering::Less));
        assert_eq!(
            Value::string("b").compare(&Value::string("a")).unwrap(),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::Float(f64::NAN).compare(&int(1)).unwrap(), None);
        assert!(int(1).compare(&Value::string("a")).is_err());
    }

    #[test]
    fn test_list_index_out_of_bounds_vs_table_missing_key() {
        let list = strings(&["a"]);
        assert_eq!(list.get_index(&int(0)).unwrap(), Value::string("a"));
        assert!(matches!(
            list.get_index(&int(1)),
            Err(RuntimeError::IndexOutOfBounds { index: 1, length: 1, .. })
        ));
        assert!(matches!(
            list.get_index(&int(-1)),
            Err(RuntimeError::IndexOutOfBounds { index: -1, .. })
        ));

        let table = Value::table(IndexMap::new());
        assert_eq!(table.get_index(&Value::string("missing")).unwrap(), Value::Nil);
        assert!(matches!(
            table.get_index(&int(1)),
            Err(RuntimeError::InvalidTableKey("int", _))
        ));
    }

    #[test]
    fn test_string_index_by_character() {
        let s = Value::string("héllo");
        assert_eq!(s.get_index(&int(1)).unwrap(), Value::string("é"));
        assert!(s.get_index(&int(5)).is_err());
        assert!(s.set_index(&int(0), Value::string("x")).is_err());
    }

    #[test]
    fn test_set_index() {
        let list = strings(&["a", "b"]);
        list.set_index(&int(1), int(9)).unwrap();
        assert_eq!(list.get_index(&int(1)).unwrap(), int(9));
        assert!(list.set_index(&int(2), int(0)).is_err());

        let table = Value::table(IndexMap::new());
        table.set_index(&Value::string("k"), int(1)).unwrap();
        assert_eq!(table.get_index(&Value::string("k")).unwrap(), int(1));
        assert!(int(3).set_index(&int(0), int(0)).is_err());
    }

    #[test]
    fn test_iterators() {
        assert_eq!(
            drain(&Value::string("ab").get_iterator().unwrap()),
            vec![Value::string("a"), Value::string("b")]
        );
        assert!(drain(&strings(&[]).get_iterator().unwrap()).is_empty());

        let mut entries = IndexMap::new();
        entries.insert("z".to_string(), int(1));
        entries.insert("a".to_string(), int(2));
        assert_eq!(
            drain(&Value::table(entries).get_iterator().unwrap()),
            vec![Value::string("z"), Value::string("a")]
        );

        let it = strings(&["x"]).get_iterator().unwrap();
        assert_eq!(it.get_iterator().unwrap(), it);
        assert!(int(5).get_iterator().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(0.25).to_string(), "0.25");
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::string("hi").to_string(), "hi");
        let mut entries = IndexMap::new();
        entries.insert("k".to_string(), strings(&["v"]));
        assert_eq!(Value::table(entries).to_string(), r#"{"k": ["v"]}"#);
        assert_eq!(Value::Error("boom".into()).to_string(), "error: boom");
    }

    #[test]
    fn test_self_referencing_containers() {
        let xs = strings(&["a"]);
        if let Value::List(list) = &xs {
            list.borrow_mut().push(xs.clone());
        }
        assert_eq!(xs.to_string(), r#"["a", [...]]"#);

        let table = Value::table(IndexMap::new());
        table.set_index(&Value::string("self"), table.clone()).unwrap();
        table.set_index(&Value::string("items"), xs.clone()).unwrap();
        assert_eq!(table.to_string(), r#"{"self": {...}, "items": ["a", [...]]}"#);

        let ys = strings(&["a"]);
        if let Value::List(list) = &ys {
            list.borrow_mut().push(ys.clone());
        }
        assert!(xs == ys);
        assert!(xs != strings(&["a", "b"]));
    }

    #[test]
    fn test_shared_but_acyclic_nesting_prints_in_full() {
        let inner = strings(&["x"]);
        let outer = Value::list(vec![inner.clone(), inner]);
        assert_eq!(outer.to_string(), r#"[["x"], ["x"]]"#);
    }
}
