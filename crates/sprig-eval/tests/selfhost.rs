use rhizome_sprig_eval::selfhost::{
    BootstrapError, ENTRY_ALIAS, ENTRY_POINT, SelfHostedCompiler, compile_on_thread,
};
use rhizome_sprig_eval::{EvalConfig, Evaluator};
use rhizome_sprig_ir::{Env, EvalError, Value};
use rhizome_sprig_syntax::{SyntaxError, compile};

fn assert_parity(source: &str) {
    let native = compile(source).unwrap_or_else(|e| panic!("native compile of {source:?}: {e}"));
    let hosted =
        compile_on_thread(source).unwrap_or_else(|e| panic!("self-hosted compile of {source:?}: {e}"));
    assert_eq!(hosted, native, "outputs differ for {source:?}");
}

fn native_error(source: &str) -> String {
    match compile(source) {
        Err(SyntaxError::Lex(e)) => e.to_string(),
        Err(SyntaxError::Parse(e)) => e.to_string(),
        Err(SyntaxError::Transform(e)) => e.to_string(),
        Ok(value) => panic!("native compile of {source:?} succeeded: {value}"),
    }
}

fn hosted_error(source: &str) -> String {
    match compile_on_thread(source) {
        Err(BootstrapError::Eval(EvalError::Raised(msg))) => msg,
        other => panic!("self-hosted compile of {source:?}: expected a raised error, got {other:?}"),
    }
}

fn nested_parens(depth: usize) -> String {
    format!("x = {}1{}", "(".repeat(depth), ")".repeat(depth))
}

/// Every form the native lowering tests pin down, compiled both ways.
const LOWERING_FORMS: &[&str] = &[
    // literals
    "42",
    "\"hi\"",
    "x",
    "null",
    "[1, 'a']",
    "true\nfalse",
    // operators
    "a === b",
    "a !== b",
    "a && !b",
    "-x",
    "c ? 1 : 2",
    "!!a || -(-b)",
    // members and calls
    "this.x",
    "a[i]",
    "f(1)",
    "o.m(1)",
    "f()(2)[0].y",
    // assignment
    "x = 1",
    "this.x = 100",
    "this.a.b = v",
    "this[k] = 1",
    "a.b.c = v",
    "a[i][j] = this.x = 2",
    // arrows and objects
    "x => x + 1",
    "o = { a: 1, m() { 2 } }",
    "f = (a, b) => { a\n b }",
    // loops
    "total = 0; for i = 0; i < 5; i = i + 1 { total = total + i }",
    "for a { for b { } }\nfor c { }",
    // programs
    "{ n: 1, inc(by) { n = n + by } }",
    "{ a: 0, b: 0, bump() { this.b = 5; 1 }, action_go() { this.a = bump() } }",
];

#[test]
fn test_parity_lowering_forms() {
    for source in LOWERING_FORMS {
        assert_parity(source);
    }
}

#[test]
fn test_error_parity() {
    let mut sources: Vec<String> = [
        "1 = 2",
        "f() = 1",
        "a + b = 1",
        "true = 1",
        "f().x = 1",
        "x = (1 + )",
        "x = \"open",
        "x = 1 @ 2",
    ]
    .map(String::from)
    .to_vec();
    sources.extend([
        "(".repeat(51) + "1" + &")".repeat(51),
        nested_parens(60),
        format!("x = {}1", "-".repeat(51)),
        format!("{}{}", "if a {\n".repeat(51), "}\n".repeat(51)),
    ]);
    for source in &sources {
        assert_eq!(hosted_error(source), native_error(source), "errors differ for {source:?}");
    }
}

#[test]
fn test_self_hosted_depth_limit() {
    let err = hosted_error(&nested_parens(51));
    assert!(err.starts_with("maximum nesting depth of 50 exceeded at 1:"), "{err}");
    assert_parity(&nested_parens(45));
}

#[test]
fn test_entry_points_are_bound() {
    let compiler = SelfHostedCompiler::load(&Evaluator::default()).unwrap();
    let entry = compiler.env().lookup(ENTRY_POINT).unwrap();
    assert!(entry.is_callable());
    assert_eq!(compiler.env().lookup(ENTRY_ALIAS), Some(entry));
}

#[test]
fn test_parity_expressions() {
    assert_parity("x = 1 + 2 * 3 - 4 / 2 % 3");
    assert_parity("y = !a ? -b : c === d && e !== f || g <= h");
    assert_parity("s = \"a\\nb\" + 'it\\'s'");
    assert_parity("ratio = 3.25 >= 1");
}

#[test]
fn test_parity_functions_and_calls() {
    assert_parity("add = (a, b) => a + b\nadd(1, 2)");
    assert_parity("f = x => y => x + y\nf(1)(2)");
    assert_parity("g = () => { t = 1\n t + 1 }");
    assert_parity("(a) + 1");
}

#[test]
fn test_parity_members_and_literals() {
    assert_parity("obj = { a: 1, \"b\": [1, 2,], c(x) { x } }\nobj.a = obj[\"b\"][0]");
    assert_parity("a.b.c = 1\nthis.count = this.count + 1");
    assert_parity("items = [\n  1,\n  2\n]");
}

#[test]
fn test_parity_statements() {
    assert_parity(
        "// pick a size\nif x > 10 {\n  size = \"big\"\n}\nelif x > 5 { size = \"mid\" }\nelse {\n  size = \"small\"\n}",
    );
    assert_parity("if a { 1 } else if b { 2 }");
    assert_parity(
        "total = 0\nfor i = 0; i < 3; i = i + 1 {\n  for j = 0; j < 2; j = j + 1 { total = total + j }\n}",
    );
    assert_parity("for n < 3 { n = n + 1 }\nfor { stop() }\nfor ; ; { }");
}

#[test]
fn test_parity_programs() {
    assert_parity(
        "{\n  count: 0,\n  step: 2\n  increment() { this.count = this.count + step }\n  reset() { count = 0; log(\"reset\") }\n}",
    );
}

#[test]
fn test_self_hosted_output_evaluates() {
    let code = compile_on_thread("total = 0\nfor i = 1; i < 4; i = i + 1 { total = total + i }\ntotal")
        .unwrap();
    let result = Evaluator::default().evaluate(&code, &Env::new()).unwrap();
    assert_eq!(result, Value::Number(6.0));
}

#[test]
fn test_self_hosted_rejects_invalid_target() {
    assert!(matches!(
        compile_on_thread("1 = 2"),
        Err(BootstrapError::Eval(EvalError::Raised(_)))
    ));
}

#[test]
fn test_self_hosted_rejects_unterminated_string() {
    assert!(matches!(
        compile_on_thread("x = \"open"),
        Err(BootstrapError::Eval(EvalError::Raised(msg))) if msg.contains("unterminated")
    ));
}

#[test]
fn test_bootstrap_needs_depth() {
    // The compiler recurses per character, so the default budget runs out.
    let evaluator = Evaluator::new(EvalConfig { max_depth: 40 });
    let compiler = SelfHostedCompiler::load(&evaluator).unwrap();
    assert_eq!(
        compiler.compile("x = 1 + 2"),
        Err(EvalError::MaxDepth(40))
    );
}
