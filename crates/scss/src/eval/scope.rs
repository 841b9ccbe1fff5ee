//! Lexical scopes for variables, mixins and functions.
//!
//! Scopes form a parent chain from the innermost block to the global
//! scope. Scopes opened by control directives (`@if`, `@each`, `@for`,
//! `@while`) are *semi-global*: at the top level, assignments inside them
//! update existing global variables instead of shadowing them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{AssignFlags, CallableDecl};
use crate::value::Value;

pub(crate) type ScopeRef = Rc<RefCell<Scope>>;

/// A mixin or function together with the scope it was defined in.
#[derive(Clone, Debug)]
pub(crate) struct Callable {
    pub decl: Rc<CallableDecl>,
    pub closure: ScopeRef,
}

#[derive(Debug, Default)]
pub(crate) struct Scope {
    vars: HashMap<String, Value>,
    mixins: HashMap<String, Callable>,
    functions: HashMap<String, Callable>,
    parent: Option<ScopeRef>,
    semi_global: bool,
}

/// `-` and `_` are interchangeable in Sass names.
pub(crate) fn normalize(name: &str) -> String {
    name.replace('_', "-")
}

impl Scope {
    pub fn global() -> ScopeRef {
        Rc::new(RefCell::new(Scope::default()))
    }

    pub fn child(parent: &ScopeRef, semi_global: bool) -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            parent: Some(parent.clone()),
            semi_global,
            ..Scope::default()
        }))
    }
}

fn root_of(scope: &ScopeRef) -> ScopeRef {
    let mut current = scope.clone();
    loop {
        let parent = current.borrow().parent.clone();
        match parent {
            Some(parent) => current = parent,
            None => return current,
        }
    }
}

fn find<T>(scope: &ScopeRef, lookup: impl Fn(&Scope) -> Option<T>) -> Option<T> {
    let mut current = Some(scope.clone());
    while let Some(s) = current {
        let borrowed = s.borrow();
        if let Some(found) = lookup(&borrowed) {
            return Some(found);
        }
        current = borrowed.parent.clone();
    }
    None
}

pub(crate) fn get_var(scope: &ScopeRef, name: &str) -> Option<Value> {
    let key = normalize(name);
    find(scope, |s| s.vars.get(&key).cloned())
}

pub(crate) fn global_var_exists(scope: &ScopeRef, name: &str) -> bool {
    root_of(scope).borrow().vars.contains_key(&normalize(name))
}

/// Assigns a variable following `!global`/`!default` semantics.
pub(crate) fn set_var(scope: &ScopeRef, name: &str, value: Value, flags: AssignFlags) {
    let key = normalize(name);

    if flags.contains(AssignFlags::GLOBAL) {
        let root = root_of(scope);
        let mut root = root.borrow_mut();
        if flags.contains(AssignFlags::DEFAULT) && root.vars.get(&key).is_some_and(|v| !v.is_null()) {
            return;
        }
        root.vars.insert(key, value);
        return;
    }

    if flags.contains(AssignFlags::DEFAULT) && get_var(scope, name).is_some_and(|v| !v.is_null()) {
        return;
    }

    // Nearest non-global scope that already binds the name.
    let mut current = Some(scope.clone());
    let mut only_semi_global = true;
    while let Some(s) = current {
        let mut borrowed = s.borrow_mut();
        if borrowed.parent.is_none() {
            if only_semi_global && borrowed.vars.contains_key(&key) {
                borrowed.vars.insert(key, value);
                return;
            }
            break;
        }
        if let Some(slot) = borrowed.vars.get_mut(&key) {
            *slot = value;
            return;
        }
        only_semi_global &= borrowed.semi_global;
        current = borrowed.parent.clone();
    }
    scope.borrow_mut().vars.insert(key, value);
}

/// Binds a variable in exactly this scope (parameters, loop variables).
pub(crate) fn declare_var(scope: &ScopeRef, name: &str, value: Value) {
    scope.borrow_mut().vars.insert(normalize(name), value);
}

pub(crate) fn get_mixin(scope: &ScopeRef, name: &str) -> Option<Callable> {
    let key = normalize(name);
    find(scope, |s| s.mixins.get(&key).cloned())
}

pub(crate) fn set_mixin(scope: &ScopeRef, callable: Callable) {
    let key = normalize(&callable.decl.name);
    scope.borrow_mut().mixins.insert(key, callable);
}

pub(crate) fn get_function(scope: &ScopeRef, name: &str) -> Option<Callable> {
    let key = normalize(name);
    find(scope, |s| s.functions.get(&key).cloned())
}

pub(crate) fn set_function(scope: &ScopeRef, callable: Callable) {
    let key = normalize(&callable.decl.name);
    scope.borrow_mut().functions.insert(key, callable);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(v: f64) -> Value {
        Value::number(v)
    }

    #[test]
    fn local_assignment_shadows_global() {
        let global = Scope::global();
        set_var(&global, "a", num(1.0), AssignFlags::empty());
        let rule = Scope::child(&global, false);
        set_var(&rule, "a", num(2.0), AssignFlags::empty());
        assert_eq!(get_var(&global, "a"), Some(num(1.0)));
        assert_eq!(get_var(&rule, "a"), Some(num(2.0)));
    }

    #[test]
    fn global_flag_writes_root() {
        let global = Scope::global();
        let rule = Scope::child(&global, false);
        set_var(&rule, "a", num(3.0), AssignFlags::GLOBAL);
        assert_eq!(get_var(&global, "a"), Some(num(3.0)));
    }

    #[test]
    fn default_only_assigns_unbound_or_null() {
        let global = Scope::global();
        set_var(&global, "a", num(1.0), AssignFlags::empty());
        set_var(&global, "a", num(2.0), AssignFlags::DEFAULT);
        assert_eq!(get_var(&global, "a"), Some(num(1.0)));
        set_var(&global, "b", Value::Null, AssignFlags::empty());
        set_var(&global, "b", num(2.0), AssignFlags::DEFAULT);
        assert_eq!(get_var(&global, "b"), Some(num(2.0)));
    }

    #[test]
    fn control_flow_scope_updates_global() {
        let global = Scope::global();
        set_var(&global, "a", num(1.0), AssignFlags::empty());
        let each = Scope::child(&global, true);
        set_var(&each, "a", num(2.0), AssignFlags::empty());
        assert_eq!(get_var(&global, "a"), Some(num(2.0)));
    }

    #[test]
    fn enclosing_local_is_updated() {
        let global = Scope::global();
        let mixin = Scope::child(&global, false);
        declare_var(&mixin, "x", num(1.0));
        let branch = Scope::child(&mixin, true);
        set_var(&branch, "x", num(5.0), AssignFlags::empty());
        assert_eq!(get_var(&mixin, "x"), Some(num(5.0)));
    }

    #[test]
    fn underscores_and_hyphens_are_equivalent() {
        let global = Scope::global();
        set_var(&global, "my_var", num(1.0), AssignFlags::empty());
        assert_eq!(get_var(&global, "my-var"), Some(num(1.0)));
    }
}
