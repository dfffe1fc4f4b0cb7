//! Action dispatch and state updates through the runtime bridge, on every
//! backend.

use rhizome_sprig_ir::{Object, Value};
use rhizome_sprig_runtime::{Lang, RuntimeError, SprigConfig, Surface};
use serde_json::json;

const CALCULATOR: &str = r#"
{
  display: "5",
  memory: "0",
  operator: "",
  waitingForOperand: false,

  action_digit(d) {
    if this.waitingForOperand || this.display == "0" {
      this.display = string(d)
      this.waitingForOperand = false
    } else {
      this.display = this.display + d
    }
  }

  action_operator(op) {
    this.memory = this.display
    this.operator = op
    this.waitingForOperand = true
  }

  action_equals() {
    a = number(this.memory)
    b = number(this.display)
    result = b
    if this.operator == "+" {
      result = a + b
    } elif this.operator == "-" {
      result = a - b
    } elif this.operator == "*" {
      result = a * b
    } elif this.operator == "/" {
      result = a / b
    }
    this.display = string(result)
    this.operator = ""
    this.waitingForOperand = true
  }
}
"#;

const COUNTER: &str = r#"
{
  count: 0,
  doubled: 0,
  increment() { this.count = this.count + 1 },
  updateDerived() { this.doubled = this.count * 2 }
}
"#;

const BACKENDS: [Lang; 2] = [Lang::Surface, Lang::Native];

fn surface(source: &str, lang: Lang) -> Surface {
    let mut surface = Surface::default();
    surface
        .load_code(source, lang)
        .unwrap_or_else(|e| panic!("{lang}: load failed: {e}"));
    surface
}

fn context(json: serde_json::Value) -> Object {
    match Value::from_json(&json) {
        Value::Object(map) => map,
        other => panic!("context must be an object, got {other}"),
    }
}

fn args(values: serde_json::Value) -> Object {
    context(json!({ "args": values }))
}

#[test]
fn test_calculator_scenario() {
    for lang in BACKENDS {
        let mut calc = surface(CALCULATOR, lang);
        calc.handle_action("operator", &args(json!(["+"]))).unwrap();
        calc.handle_action("digit", &args(json!([3]))).unwrap();
        calc.handle_action("equals", &Object::new()).unwrap();
        assert_eq!(calc.get_state("display").unwrap(), Value::from("8"), "{lang}");
        assert_eq!(calc.get_state("operator").unwrap(), Value::from(""), "{lang}");
    }
}

#[test]
fn test_calculator_multi_digit() {
    for lang in BACKENDS {
        let mut calc = surface(CALCULATOR, lang);
        calc.handle_action("operator", &args(json!(["*"]))).unwrap();
        calc.handle_action("digit", &args(json!([1]))).unwrap();
        calc.handle_action("digit", &args(json!([2]))).unwrap();
        calc.handle_action("equals", &Object::new()).unwrap();
        assert_eq!(calc.get_state("display").unwrap(), Value::from("60"), "{lang}");
    }
}

#[test]
fn test_state_written_by_one_method_is_read_by_another() {
    let source = "{ x: 0, action_setX() { this.x = 100 }, getX() { this.x } }";
    for lang in BACKENDS {
        let mut s = surface(source, lang);
        s.handle_action("setX", &Object::new()).unwrap();
        assert_eq!(s.evaluate("getX()", &Object::new()).unwrap(), Value::Number(100.0), "{lang}");
    }
}

#[test]
fn test_member_store_keeps_writes_made_by_its_value() {
    let source = "{ a: 0, b: 0, bump() { this.b = 5; 1 }, action_go() { this.a = bump() } }";
    for lang in BACKENDS {
        let mut s = surface(source, lang);
        s.handle_action("go", &Object::new()).unwrap();
        assert_eq!(s.state_json(), json!({"a": 1, "b": 5}), "{lang}");
    }
}

#[test]
fn test_nested_member_store_on_this() {
    let source = r#"{ cfg: { size: 1 }, n: 0, grow() { this.n = 7; 2 }, action_go() { this.cfg.size = grow() } }"#;
    for lang in BACKENDS {
        let mut s = surface(source, lang);
        s.handle_action("go", &Object::new()).unwrap();
        assert_eq!(s.state_json(), json!({"cfg": {"size": 2}, "n": 7}), "{lang}");
    }
}

#[test]
fn test_huge_list_index_is_rejected() {
    for lang in BACKENDS {
        let mut s = surface("{ xs: [1, 2] }", lang);
        for index in ["99999999999999999999999", "1 / 0", "1000000"] {
            let source = format!("xs[{index}] = 1");
            assert!(s.evaluate(&source, &Object::new()).is_err(), "{lang}: {source}");
        }
        s.evaluate("xs[3] = 4", &Object::new()).unwrap();
        assert_eq!(s.get_state("xs").unwrap().to_json(), json!([1, 2, null, 4]), "{lang}");
    }
}

#[test]
fn test_for_loop_total() {
    let source = "for i = 0; i < 5; i = i + 1 { total = total + i }";
    for lang in BACKENDS {
        let mut s = surface("{ total: 0 }", lang);
        s.evaluate(source, &Object::new()).unwrap();
        assert_eq!(s.get_state("total").unwrap(), Value::Number(10.0), "{lang}");
        // The loop variable does not leak into the state.
        assert!(!s.state().contains_key("i"), "{lang}");
    }
}

#[test]
fn test_script_loads_into_state() {
    let mut s = surface(
        "total = 0\nfor i = 0; i < 5; i = i + 1 { total = total + i }",
        Lang::Surface,
    );
    assert_eq!(s.state_json(), json!({"total": 10, "i": 5}));
    s.evaluate("total = total * 2", &Object::new()).unwrap();
    assert_eq!(s.get_state("total").unwrap(), Value::Number(20.0));
}

#[test]
fn test_derived_action_runs_after_each_action() {
    for lang in BACKENDS {
        let mut s = surface(COUNTER, lang);
        s.handle_action("increment", &Object::new()).unwrap();
        s.handle_action("increment", &Object::new()).unwrap();
        assert_eq!(s.state_json(), json!({"count": 2, "doubled": 4}), "{lang}");
    }
}

#[test]
fn test_handler_naming_conventions() {
    let source = r#"
{
  hits: [],
  "action:go"() { this.hits = push(this.hits, "colon") }
  action_go() { this.hits = push(this.hits, "underscore") }
  go() { this.hits = push(this.hits, "bare") }
  stop() { this.hits = push(this.hits, "stop") }
}
"#;
    let mut s = surface(source, Lang::Surface);
    s.handle_action("go", &Object::new()).unwrap();
    s.handle_action("stop", &Object::new()).unwrap();
    assert_eq!(s.state_json(), json!({"hits": ["colon", "stop"]}));
}

#[test]
fn test_missing_action_is_ignored() {
    for lang in BACKENDS {
        let mut s = surface(COUNTER, lang);
        s.handle_action("nope", &Object::new()).unwrap();
        assert_eq!(s.state_json(), json!({"count": 0, "doubled": 0}), "{lang}");
    }
}

#[test]
fn test_context_is_visible_to_handlers() {
    let source = r#"{ greeting: "", action_greet() { this.greeting = "hi " + name + context.suffix } }"#;
    for lang in BACKENDS {
        let mut s = surface(source, lang);
        s.handle_action("greet", &context(json!({"name": "Ada", "suffix": "!"})))
            .unwrap();
        assert_eq!(s.get_state("greeting").unwrap(), Value::from("hi Ada!"), "{lang}");
    }
}

#[test]
fn test_context_without_args_is_the_argument() {
    let source = "{ seen: null, record(ctx) { this.seen = ctx.value } }";
    for lang in BACKENDS {
        let mut s = surface(source, lang);
        s.handle_action("record", &context(json!({"value": 7}))).unwrap();
        assert_eq!(s.get_state("seen").unwrap(), Value::Number(7.0), "{lang}");
    }
}

#[test]
fn test_returned_pairs_update_state() {
    let source = r#"{ count: 5, form: null, reset() { [["count", 0], ["form/name", "x"]] } }"#;
    for lang in BACKENDS {
        let mut s = surface(source, lang);
        s.handle_action("reset", &Object::new()).unwrap();
        assert_eq!(s.state_json(), json!({"count": 0, "form": {"name": "x"}}), "{lang}");
    }
}

#[test]
fn test_returned_object_updates_state() {
    let source = "{ a: 1, b: 2, swap() { ({ a: b, b: a }) } }";
    for lang in BACKENDS {
        let mut s = surface(source, lang);
        s.handle_action("swap", &Object::new()).unwrap();
        assert_eq!(s.state_json(), json!({"a": 2, "b": 1}), "{lang}");
    }
}

#[test]
fn test_set_state_action() {
    for lang in BACKENDS {
        let mut s = surface("{ user: { name: \"a\", tags: [\"x\", \"y\"] } }", lang);
        s.handle_action("setState", &context(json!({"user/name": "b"})))
            .unwrap();
        s.handle_action(
            "setState",
            &context(json!({"updates": [["user/tags/1", "z"], ["flag", true]]})),
        )
        .unwrap();
        assert_eq!(
            s.state_json(),
            json!({"user": {"name": "b", "tags": ["x", "z"]}, "flag": true}),
            "{lang}"
        );
    }
}

#[test]
fn test_invalid_updates() {
    let mut s = Surface::default();
    assert!(matches!(
        s.apply_update(&Value::Number(1.0)),
        Err(RuntimeError::InvalidUpdate("number"))
    ));
    assert!(matches!(
        s.set_state("/", Value::Null),
        Err(RuntimeError::InvalidPath(_))
    ));
}

#[test]
fn test_state_survives_reload() {
    let mut s = Surface::default();
    s.set_state("theme", Value::from("dark")).unwrap();
    s.load_code(COUNTER, Lang::Native).unwrap();
    assert_eq!(s.get_state("theme").unwrap(), Value::from("dark"));
    assert_eq!(s.get_state("count").unwrap(), Value::Number(0.0));
    assert_eq!(s.lang(), Lang::Native);
}

#[test]
fn test_state_excludes_functions() {
    let s = surface(COUNTER, Lang::Surface);
    let mut actions = s.actions();
    actions.sort();
    assert_eq!(actions, vec!["increment", "updateDerived"]);
    assert!(!s.state().contains_key("increment"));
}

#[test]
fn test_sexpr_programs() {
    let code = json!([
        "progn",
        ["define", "count", 0],
        ["define", "action_inc", ["lambda", [], ["define", "count", ["+", "count", 1]]]]
    ]);
    let mut s = surface(&code.to_string(), Lang::Sexpr);
    s.handle_action("inc", &Object::new()).unwrap();
    assert_eq!(s.get_state("count").unwrap(), Value::Number(1.0));
}

#[test]
fn test_sexpr_programs_are_validated() {
    let mut s = Surface::default();
    let code = json!(["lambda", "x"]).to_string();
    assert!(matches!(
        s.load_code(&code, Lang::Sexpr),
        Err(RuntimeError::Validation(_))
    ));
}

#[test]
fn test_self_hosted_programs() {
    let mut s = surface(COUNTER, Lang::SelfHosted);
    s.handle_action("increment", &Object::new()).unwrap();
    assert_eq!(s.state_json(), json!({"count": 1, "doubled": 2}));
}

#[test]
fn test_errors_surface_without_rollback() {
    let source = "{ n: 0, bad() { this.n = 1\nmissing() } }";
    for lang in BACKENDS {
        let mut s = surface(source, lang);
        let err = s.handle_action("bad", &Object::new()).unwrap_err();
        assert!(err.to_string().contains("missing"), "{lang}: {err}");
        // Writes made before the failure remain.
        assert_eq!(s.get_state("n").unwrap(), Value::Number(1.0), "{lang}");
    }
}

#[test]
fn test_default_lang_from_config() {
    let config = SprigConfig::from_toml_str("[runtime]\ndefault_lang = \"native\"").unwrap();
    let mut s = Surface::new(config);
    s.load(COUNTER).unwrap();
    assert_eq!(s.lang(), Lang::Native);
}

#[test]
fn test_syntax_errors() {
    let mut s = Surface::default();
    assert!(matches!(
        s.load_code("{ a: }", Lang::Surface),
        Err(RuntimeError::Syntax(_))
    ));
    assert!(matches!(
        s.load_code("{ a: }", Lang::Native),
        Err(RuntimeError::Native(_))
    ));
}
