use crate::{EvalConfig, Evaluator};
use rhizome_sprig_ir::{Env, EvalError, Object, Value};

fn sym(s: &str) -> Value {
    Value::symbol(s)
}

fn num(n: f64) -> Value {
    Value::Number(n)
}

fn run(source: &str) -> Result<Value, crate::Error> {
    Evaluator::default().eval_string(source, &Env::new())
}

fn run_ok(source: &str) -> Value {
    run(source).unwrap_or_else(|e| panic!("{source:?} failed: {e}"))
}

fn run_err(source: &str) -> EvalError {
    match run(source) {
        Err(crate::Error::Eval(err)) => err,
        other => panic!("{source:?}: expected an evaluation error, got {other:?}"),
    }
}

fn eval(expr: Value) -> Result<Value, EvalError> {
    Evaluator::default().evaluate(&expr, &Env::new())
}

fn shallow(max_depth: usize) -> Evaluator {
    Evaluator::new(EvalConfig { max_depth })
}

#[test]
fn test_literals_and_arithmetic() {
    assert_eq!(run_ok("1 + 2 * 3"), num(7.0));
    assert_eq!(run_ok("(1 + 2) * 3"), num(9.0));
    assert_eq!(run_ok("\"a\" + 1"), Value::from("a1"));
    assert_eq!(run_ok("null"), Value::Null);
    assert_eq!(run_ok("[1, 2][1]"), num(2.0));
}

#[test]
fn test_empty_list_evaluates_to_itself() {
    assert_eq!(eval(Value::List(vec![])).unwrap(), Value::List(vec![]));
}

#[test]
fn test_quote_turns_symbols_into_strings() {
    let expr = Value::quote(Value::List(vec![sym("a"), Value::from("b"), num(1.0)]));
    assert_eq!(
        eval(expr).unwrap(),
        Value::List(vec![Value::from("a"), Value::from("b"), num(1.0)])
    );
}

#[test]
fn test_let_is_sequential() {
    let expr = Value::call(
        "let",
        vec![
            Value::List(vec![
                Value::List(vec![sym("a"), num(2.0)]),
                Value::List(vec![sym("b"), Value::call("+", vec![sym("a"), num(1.0)])]),
            ]),
            Value::call("*", vec![sym("a"), sym("b")]),
        ],
    );
    assert_eq!(eval(expr).unwrap(), num(6.0));
}

#[test]
fn test_let_bindings_do_not_leak() {
    let env = Env::new();
    let expr = Value::call(
        "let",
        vec![Value::List(vec![Value::List(vec![sym("a"), num(1.0)])]), sym("a")],
    );
    Evaluator::default().evaluate(&expr, &env).unwrap();
    assert!(!env.is_bound("a"));
}

#[test]
fn test_cond() {
    let clause = |test: Value, body: Value| Value::List(vec![test, body]);
    let expr = Value::call(
        "cond",
        vec![
            clause(Value::call("==", vec![num(1.0), num(2.0)]), Value::from("no")),
            clause(sym("else"), Value::from("yes")),
        ],
    );
    assert_eq!(eval(expr).unwrap(), Value::from("yes"));
    assert_eq!(eval(Value::call("cond", vec![])).unwrap(), Value::Null);
}

#[test]
fn test_cond_clause_without_body_passes_validation() {
    let expr = Value::call(
        "cond",
        vec![Value::List(vec![num(0.0)]), Value::List(vec![Value::from("hit")])],
    );
    rhizome_sprig_ir::validate(&expr).unwrap();
    assert_eq!(eval(expr).unwrap(), Value::from("hit"));
}

#[test]
fn test_set_this_writes_one_key() {
    let state = Env::new_state();
    state.define("a", num(0.0));
    state.define("b", num(0.0));
    let ev = Evaluator::default();
    // The value expression writes `b` before `a` is stored.
    let expr = Value::call(
        "set-this",
        vec![
            Value::quote(sym("a")),
            Value::call(
                "begin",
                vec![Value::call("define", vec![sym("b"), num(5.0)]), num(1.0)],
            ),
        ],
    );
    let this = ev.evaluate(&expr, &state.child()).unwrap();
    assert_eq!(state.lookup("a"), Some(num(1.0)));
    assert_eq!(state.lookup("b"), Some(num(5.0)));
    assert_eq!(this.as_object().unwrap().get("b"), Some(&num(5.0)));

    let err = eval(Value::call("set-this", vec![Value::quote(sym("a"))])).unwrap_err();
    assert!(matches!(err, EvalError::Arity { .. }), "{err:?}");
}

#[test]
fn test_define_forms() {
    let env = Env::new();
    let ev = Evaluator::default();
    let sugar = Value::call(
        "define",
        vec![
            Value::List(vec![sym("sq"), sym("x")]),
            Value::call("*", vec![sym("x"), sym("x")]),
        ],
    );
    ev.evaluate(&sugar, &env).unwrap();
    let defun = Value::call(
        "defun",
        vec![
            sym("inc"),
            Value::List(vec![sym("n")]),
            Value::call("+", vec![sym("n"), num(1.0)]),
        ],
    );
    ev.evaluate(&defun, &env).unwrap();

    let call = Value::call("inc", vec![Value::call("sq", vec![num(4.0)])]);
    assert_eq!(ev.evaluate(&call, &env).unwrap(), num(17.0));
}

#[test]
fn test_define_returns_value() {
    assert_eq!(run_ok("x = 5"), num(5.0));
}

#[test]
fn test_apply_form_with_primitive_value() {
    let expr = Value::call(
        "apply",
        vec![sym("+"), Value::call("list", vec![num(1.0), num(2.0), num(3.0)])],
    );
    assert_eq!(eval(expr).unwrap(), num(6.0));
}

#[test]
fn test_and_or_are_boolean() {
    assert_eq!(run_ok("1 && \"x\""), Value::Bool(true));
    assert_eq!(run_ok("0 || \"\""), Value::Bool(false));
    assert_eq!(run_ok("null || 2"), Value::Bool(true));
}

#[test]
fn test_and_short_circuits() {
    // `nope` would raise an unknown-function error if evaluated.
    assert_eq!(run_ok("false && nope()"), Value::Bool(false));
    assert_eq!(run_ok("true || nope()"), Value::Bool(true));
}

#[test]
fn test_closures_capture_lexically() {
    let source = "make = n => () => n\nf = make(5)\nn = 99\nf()";
    assert_eq!(run_ok(source), num(5.0));
}

#[test]
fn test_closure_mutates_outer_binding() {
    let source = "total = 0\nbump = () => { total = total + 1 }\nbump(); bump()\ntotal";
    assert_eq!(run_ok(source), num(2.0));
}

#[test]
fn test_closure_locals_stay_local() {
    let source = "f = () => { local = 1 }\nf()\nlocal";
    assert_eq!(
        run_err(source),
        EvalError::UnboundVariable("local".into())
    );
}

#[test]
fn test_missing_arguments_are_null() {
    assert_eq!(run_ok("f = (a, b) => b\nf(1)"), Value::Null);
    assert_eq!(run_ok("f = a => a\nf(1, 2, 3)"), num(1.0));
}

#[test]
fn test_curried_call_goes_through_apply() {
    assert_eq!(run_ok("add = x => y => x + y\nadd(1)(2)"), num(3.0));
}

#[test]
fn test_call_resolution_errors() {
    assert_eq!(run_err("nope(1)"), EvalError::UnknownFunction("nope".into()));
    assert_eq!(run_err("x = 1\nx(2)"), EvalError::NotCallable("x".into()));
    assert_eq!(run_err("missing + 1"), EvalError::UnboundVariable("missing".into()));
}

#[test]
fn test_bound_non_function_falls_back_to_primitive() {
    assert_eq!(run_ok("list = 1\nlist(1, 2)"), Value::List(vec![num(1.0), num(2.0)]));
}

#[test]
fn test_primitive_as_value() {
    assert_eq!(run_ok("f = abs\nf(-3)"), num(3.0));
}

#[test]
fn test_higher_order_with_lambda() {
    assert_eq!(
        run_ok("map([1, 2, 3], x => x * 2)"),
        Value::List(vec![num(2.0), num(4.0), num(6.0)])
    );
    assert_eq!(
        run_ok("filter([1, 2, 3, 4], (x, i) => i % 2 == 0)"),
        Value::List(vec![num(1.0), num(3.0)])
    );
    assert_eq!(run_ok("reduce([1, 2, 3], (acc, x) => acc + x, 10)"), num(16.0));
}

#[test]
fn test_higher_order_with_implicit_expression() {
    let items = Value::call("list", vec![num(1.0), num(2.0), num(3.0)]);
    let mapped = Value::call(
        "map",
        vec![items.clone(), Value::call("*", vec![sym("item"), num(10.0)])],
    );
    assert_eq!(
        eval(mapped).unwrap(),
        Value::List(vec![num(10.0), num(20.0), num(30.0)])
    );

    let later = Value::call(
        "filter",
        vec![items.clone(), Value::call(">", vec![sym("index"), num(0.0)])],
    );
    assert_eq!(eval(later).unwrap(), Value::List(vec![num(2.0), num(3.0)]));

    let sum = Value::call(
        "fold",
        vec![items, Value::call("+", vec![sym("acc"), sym("item")]), num(0.0)],
    );
    assert_eq!(eval(sum).unwrap(), num(6.0));
}

#[test]
fn test_higher_order_aliases() {
    assert_eq!(run_ok("findIndex([4, 5, 6], x => x == 5)"), num(1.0));
    assert_eq!(run_ok("find([4, 5, 6], x => x > 4)"), num(5.0));
    assert_eq!(run_ok("count([4, 5, 6], x => x > 4)"), num(2.0));
    assert_eq!(
        run_ok("sortBy([3, 1, 2], x => x)"),
        Value::List(vec![num(1.0), num(2.0), num(3.0)])
    );
    let sorted = Value::call(
        "sort-by",
        vec![
            Value::call("list", vec![num(2.0), num(1.0)]),
            Value::call("-", vec![sym("item")]),
        ],
    );
    assert_eq!(eval(sorted).unwrap(), Value::List(vec![num(2.0), num(1.0)]));
}

#[test]
fn test_higher_order_with_primitive_name() {
    assert_eq!(
        run_ok("map([-1, 2], abs)"),
        Value::List(vec![num(1.0), num(2.0)])
    );
}

#[test]
fn test_user_function_shadows_higher_order_form() {
    assert_eq!(run_ok("map = (a, b) => \"mine\"\nmap(1, 2)"), Value::from("mine"));
}

#[test]
fn test_higher_order_rejects_non_list() {
    assert!(matches!(run_err("map(5, x => x)"), EvalError::Type(_)));
}

#[test]
fn test_for_loop() {
    let source = "total = 0\nfor i = 0; i < 5; i = i + 1 { total = total + i }\ntotal";
    assert_eq!(run_ok(source), num(10.0));
}

#[test]
fn test_nested_for_loops() {
    let source = "\
total = 0
for i = 0; i < 3; i = i + 1 {
  for j = 0; j < 2; j = j + 1 {
    total = total + 1
  }
}
total";
    assert_eq!(run_ok(source), num(6.0));
}

#[test]
fn test_if_statement_value() {
    let source = "x = 3\nif x > 5 { \"big\" } elif x > 1 { \"mid\" } else { \"small\" }";
    assert_eq!(run_ok(source), Value::from("mid"));
    assert_eq!(run_ok("if false { 1 }"), Value::Null);
}

#[test]
fn test_member_assignment_copies() {
    let source = "a = { b: { c: 1 } }\nalias = a\na.b.c = 2\n[a.b.c, alias.b.c]";
    assert_eq!(run_ok(source), Value::List(vec![num(2.0), num(1.0)]));
}

#[test]
fn test_state_this_reads_and_writes() {
    let env = Env::new_state();
    env.define("x", num(1.0));
    let ev = Evaluator::default();
    ev.eval_string("this.y = this.x + 41", &env).unwrap();
    assert_eq!(env.lookup("y"), Some(num(42.0)));
}

#[test]
fn test_depth_limit() {
    let source = "deep = n => n == 0 ? 0 : 1 + deep(n - 1)\ndeep(100)";
    let err = shallow(60).eval_string(source, &Env::new()).unwrap_err();
    assert_eq!(err, crate::Error::Eval(EvalError::MaxDepth(60)));

    let ok = shallow(60).eval_string("deep = n => n == 0 ? 0 : 1 + deep(n - 1)\ndeep(3)", &Env::new());
    assert_eq!(ok.unwrap(), num(3.0));
}

#[test]
fn test_depth_limit_on_nested_data() {
    let mut expr = num(0.0);
    for _ in 0..40 {
        expr = Value::call("+", vec![num(1.0), expr]);
    }
    assert_eq!(
        shallow(20).evaluate(&expr, &Env::new()),
        Err(EvalError::MaxDepth(20))
    );
    assert_eq!(shallow(100).evaluate(&expr, &Env::new()), Ok(num(40.0)));
}

#[test]
fn test_loops_count_toward_depth() {
    let source = "for i = 0; i < 1000; i = i + 1 { }";
    let err = shallow(90).eval_string(source, &Env::new()).unwrap_err();
    assert_eq!(err, crate::Error::Eval(EvalError::MaxDepth(90)));
}

#[test]
fn test_apply_with_bindings() {
    let env = Env::new();
    let ev = Evaluator::default();
    let func = ev.eval_string("(amount) => base + amount", &env).unwrap();
    let mut bindings = Object::new();
    bindings.insert("base".into(), num(10.0));
    bindings.insert("amount".into(), num(1000.0));
    // Parameters shadow bindings.
    assert_eq!(ev.apply_with(&func, vec![num(5.0)], &bindings), Ok(num(15.0)));
}

#[test]
fn test_syntax_errors_surface() {
    assert!(matches!(run("x = "), Err(crate::Error::Syntax(_))));
}

#[test]
fn test_raised_errors() {
    assert_eq!(run_err("error(\"bad\", 1)"), EvalError::Raised("bad 1".into()));
}

#[test]
fn test_eval_config_deserializes_with_defaults() {
    let config: EvalConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config.max_depth, crate::DEFAULT_MAX_DEPTH);
}
