//! Built-in functions.
//!
//! Builtins live in their own namespace of the global scope: the compiler
//! resolves them by index and the VM pushes `Value::Builtin(&BUILTINS[i])`.

use crate::error::RuntimeError;
use crate::span::Span;

use super::value::Value;

pub type BuiltinFn = fn(&[Value]) -> Result<Value, RuntimeError>;

/// A native function callable from Quill code.
#[derive(Debug)]
pub struct Builtin {
    pub name: &'static str,
    pub arity: usize,
    pub func: BuiltinFn,
}

pub static BUILTINS: [Builtin; 6] = [
    Builtin {
        name: "len",
        arity: 1,
        func: len,
    },
    Builtin {
        name: "push",
        arity: 2,
        func: push,
    },
    Builtin {
        name: "keys",
        arity: 1,
        func: keys,
    },
    Builtin {
        name: "type",
        arity: 1,
        func: type_of,
    },
    Builtin {
        name: "str",
        arity: 1,
        func: stringify,
    },
    Builtin {
        name: "error",
        arity: 1,
        func: error,
    },
];

/// Builtin names in index order, for seeding the global scope.
pub fn names() -> Vec<&'static str> {
    BUILTINS.iter().map(|builtin| builtin.name).collect()
}

pub fn lookup(index: usize) -> Option<&'static Builtin> {
    BUILTINS.get(index)
}

fn argument_error(name: &str, expected: &str, got: &Value) -> RuntimeError {
    RuntimeError::type_error(
        format!(
            "argument to '{}' must be {}, got '{}'",
            name,
            expected,
            got.type_name()
        ),
        Span::default(),
    )
}

// len(x) - characters of a string, elements of a list, entries of a table
fn len(args: &[Value]) -> Result<Value, RuntimeError> {
    let n = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::List(list) => list.borrow().len(),
        Value::Table(table) => table.borrow().len(),
        other => return Err(argument_error("len", "a string, list or table", other)),
    };
    Ok(Value::Integer(n as i64))
}

// push(list, v) - append in place, returns the list
fn push(args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::List(list) => {
            list.borrow_mut().push(args[1].clone());
            Ok(args[0].clone())
        }
        other => Err(argument_error("push", "a list", other)),
    }
}

fn keys(args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Table(table) => Ok(Value::list(
            table.borrow().keys().cloned().map(Value::String).collect(),
        )),
        other => Err(argument_error("keys", "a table", other)),
    }
}

fn type_of(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::string(args[0].type_name()))
}

fn stringify(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::String(args[0].to_string()))
}

fn error(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Error(args[0].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn call(name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        let builtin = BUILTINS.iter().find(|b| b.name == name).unwrap();
        assert_eq!(builtin.arity, args.len());
        (builtin.func)(args)
    }

    #[test]
    fn test_names_are_in_index_order() {
        let names = names();
        assert_eq!(names, vec!["len", "push", "keys", "type", "str", "error"]);
        assert_eq!(lookup(1).map(|b| b.name), Some("push"));
        assert!(lookup(names.len()).is_none());
    }

    #[test]
    fn test_len() {
        assert_eq!(call("len", &[Value::string("héllo")]).unwrap(), Value::Integer(5));
        assert_eq!(
            call("len", &[Value::list(vec![Value::Nil, Value::Nil])]).unwrap(),
            Value::Integer(2)
        );
        assert!(call("len", &[Value::Integer(3)]).is_err());
    }

    #[test]
    fn test_push_mutates_shared_list() {
        let list = Value::list(vec![]);
        let returned = call("push", &[list.clone(), Value::Integer(1)]).unwrap();
        assert_eq!(list, Value::list(vec![Value::Integer(1)]));
        assert_eq!(returned, list);
    }

    #[test]
    fn test_keys_in_insertion_order() {
        let mut entries = IndexMap::new();
        entries.insert("b".to_string(), Value::Nil);
        entries.insert("a".to_string(), Value::Nil);
        assert_eq!(
            call("keys", &[Value::table(entries)]).unwrap(),
            Value::list(vec![Value::string("b"), Value::string("a")])
        );
    }

    #[test]
    fn test_type_str_error() {
        assert_eq!(call("type", &[Value::Float(1.0)]).unwrap(), Value::string("float"));
        assert_eq!(call("str", &[Value::Float(1.0)]).unwrap(), Value::string("1.0"));
        assert_eq!(
            call("error", &[Value::string("bad")]).unwrap().to_string(),
            "error: bad"
        );
    }
}
